use std::collections::HashMap;
use std::sync::Arc;

use kurbo::Vec2;
use xxhash_rust::xxh3::xxh3_64;

use crate::expression::bytecode::BytecodeProgram;
use crate::expression::compile::{FunctionKind, compile_source};
use crate::expression::error::{CompileError, EvalError};
use crate::expression::vm::{EvalBudget, Output, eval_program};

/// Compiled programs kept around so unchanged source is never recompiled.
const CACHE_CAPACITY: usize = 32;

/// Inputs to a path function, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionInput {
    /// Cycle progress in `[0, 1)` (or exactly 1 for a finished non-looping cycle).
    pub t: f64,
    /// Per-instance phase offset in `[0, 1)`.
    pub phase: f64,
    pub layer_index: u32,
    /// Sprite base size in pixels.
    pub base_unit: f64,
    /// Magnitude multiplier derived from motion intensity.
    pub motion_scale: f64,
}

impl MotionInput {
    pub(crate) fn as_args(&self) -> [f64; 5] {
        [
            self.t,
            self.phase,
            f64::from(self.layer_index),
            self.base_unit,
            self.motion_scale,
        ]
    }
}

/// Result of [`Sandbox::validate`], shaped for an editing surface.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An opaque compiled user function. Only the [`Sandbox`] can run it.
#[derive(Clone)]
pub struct FunctionHandle {
    kind: FunctionKind,
    source_hash: u64,
    program: Arc<BytecodeProgram>,
}

impl FunctionHandle {
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Stable hash of the source text this handle was compiled from.
    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }
}

impl std::fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionHandle")
            .field("kind", &self.kind)
            .field("source_hash", &format_args!("{:016x}", self.source_hash))
            .finish()
    }
}

impl PartialEq for FunctionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.source_hash == other.source_hash
    }
}

/// Time-bounded executor for user-authored motion functions.
///
/// User code can only read its declared parameters and call the built-in math
/// allow-list; it has no access to engine state, IO or timers.
#[derive(Debug, Default)]
pub struct Sandbox {
    budget: EvalBudget,
    cache: HashMap<(FunctionKind, u64), FunctionHandle>,
    cache_order: Vec<(FunctionKind, u64)>,
}

impl Sandbox {
    pub fn new(budget: EvalBudget) -> Self {
        Self {
            budget,
            cache: HashMap::new(),
            cache_order: Vec::new(),
        }
    }

    pub fn budget(&self) -> EvalBudget {
        self.budget
    }

    pub fn set_budget(&mut self, budget: EvalBudget) {
        self.budget = budget;
    }

    /// Check source without keeping the compiled result.
    pub fn validate(&self, source: &str, kind: FunctionKind) -> Validation {
        match compile_source(source, kind) {
            Ok(_) => Validation {
                valid: true,
                error: None,
            },
            Err(e) => Validation {
                valid: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Compile source into a handle. Identical source returns the cached handle.
    pub fn compile(&mut self, source: &str, kind: FunctionKind) -> Result<FunctionHandle, CompileError> {
        let source_hash = hash_source(source);
        let key = (kind, source_hash);
        if let Some(handle) = self.cache.get(&key) {
            return Ok(handle.clone());
        }

        let program = compile_source(source, kind)?;
        let handle = FunctionHandle {
            kind,
            source_hash,
            program: Arc::new(program),
        };
        tracing::debug!(kind = kind.name(), source_hash, "compiled motion function");

        if self.cache_order.len() >= CACHE_CAPACITY {
            let evicted = self.cache_order.remove(0);
            self.cache.remove(&evicted);
        }
        self.cache_order.push(key);
        self.cache.insert(key, handle.clone());
        Ok(handle)
    }

    /// Evaluate a path handle with this sandbox's budget.
    pub fn evaluate_path(&self, handle: &FunctionHandle, input: &MotionInput) -> Result<Vec2, EvalError> {
        self.evaluate_path_with_budget(handle, input, self.budget)
    }

    pub fn evaluate_path_with_budget(
        &self,
        handle: &FunctionHandle,
        input: &MotionInput,
        budget: EvalBudget,
    ) -> Result<Vec2, EvalError> {
        if handle.kind != FunctionKind::Path {
            return Err(EvalError::runtime("handle is not a path function"));
        }
        match eval_program(&handle.program, &input.as_args(), budget)? {
            Output::Vec2(x, y) => Ok(Vec2::new(x, y)),
            Output::Number(_) => Err(EvalError::runtime("path function returned a number")),
        }
    }

    /// Evaluate a scale handle with this sandbox's budget.
    pub fn evaluate_scale(&self, handle: &FunctionHandle, t: f64) -> Result<f64, EvalError> {
        if handle.kind != FunctionKind::Scale {
            return Err(EvalError::runtime("handle is not a scale function"));
        }
        match eval_program(&handle.program, &[t], self.budget)? {
            Output::Number(v) => Ok(v),
            Output::Vec2(..) => Err(EvalError::runtime("scale function returned a vector")),
        }
    }
}

fn hash_source(source: &str) -> u64 {
    xxh3_64(source.as_bytes())
}

#[cfg(test)]
#[path = "../../tests/unit/expression/sandbox.rs"]
mod tests;
