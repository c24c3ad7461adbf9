//! Chooses the motion source for each frame.
//!
//! Two states: `Builtin` serves the movement mode directly, `Custom` serves the
//! last successfully compiled sandbox handle. Source edits while in `Custom`
//! pass through a [`Debouncer`] before they are compiled, and a failed compile
//! never replaces what is currently on screen.

use std::time::{Duration, Instant};

use crate::animation::debounce::Debouncer;
use crate::animation::modes::MovementMode;
use crate::animation::motion::MotionSource;
use crate::expression::compile::FunctionKind;
use crate::expression::error::CompileError;
use crate::expression::sandbox::Sandbox;
use crate::state::model::{CodeFunctions, GeneratorState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverState {
    Builtin,
    /// `pending` is true while an edit waits out the debounce window.
    Custom { pending: bool },
}

/// Most recent compile failure, for the editing surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileReport {
    pub kind: FunctionKind,
    pub error: CompileError,
}

impl std::fmt::Display for CompileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.error)
    }
}

#[derive(Debug)]
pub struct AnimationResolver {
    sandbox: Sandbox,
    debouncer: Debouncer<CodeFunctions>,
    custom: bool,
    builtin: MovementMode,
    current: MotionSource,
    /// Source of the handle in `current`, when it is custom.
    compiled: Option<CodeFunctions>,
    /// Last source observed in state.
    requested: Option<CodeFunctions>,
    last_error: Option<CompileReport>,
}

impl AnimationResolver {
    pub fn new(sandbox: Sandbox, quiet: Duration) -> Self {
        let builtin = MovementMode::default();
        Self {
            sandbox,
            debouncer: Debouncer::new(quiet),
            custom: false,
            builtin,
            current: MotionSource::Builtin(builtin),
            compiled: None,
            requested: None,
            last_error: None,
        }
    }

    /// Update from this frame's snapshot and return the source to use for it.
    pub fn observe(&mut self, state: &GeneratorState, now: Instant) -> &MotionSource {
        self.builtin = state.movement_mode;
        let code = &state.code_functions;

        if !(state.use_custom_motion && code.has_path()) {
            if self.custom {
                tracing::debug!(mode = %self.builtin, "custom motion off, discarding handle");
            }
            self.custom = false;
            self.debouncer.cancel();
            self.compiled = None;
            self.requested = None;
            self.last_error = None;
            self.current = MotionSource::Builtin(self.builtin);
            return &self.current;
        }

        if !self.custom {
            self.custom = true;
            self.requested = Some(code.clone());
            self.current = MotionSource::Builtin(self.builtin);
            self.install(code.clone());
        } else {
            if self.requested.as_ref() != Some(code) {
                self.requested = Some(code.clone());
                self.debouncer.push(code.clone(), now);
            }
            if let Some(ready) = self.debouncer.poll(now) {
                self.install(ready);
            }
            if self.compiled.is_none() {
                self.current = MotionSource::Builtin(self.builtin);
            }
        }
        &self.current
    }

    pub fn current(&self) -> &MotionSource {
        &self.current
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn state(&self) -> ResolverState {
        if self.custom {
            ResolverState::Custom {
                pending: self.debouncer.is_pending(),
            }
        } else {
            ResolverState::Builtin
        }
    }

    pub fn last_error(&self) -> Option<&CompileReport> {
        self.last_error.as_ref()
    }

    /// Cancel any pending recompile. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.debouncer.cancel();
    }

    fn install(&mut self, code: CodeFunctions) {
        if self.compiled.as_ref() == Some(&code) {
            self.last_error = None;
            return;
        }
        let path = match self.sandbox.compile(&code.path, FunctionKind::Path) {
            Ok(handle) => handle,
            Err(error) => return self.reject(FunctionKind::Path, error),
        };
        let scale = match code.scale_source() {
            Some(src) => match self.sandbox.compile(src, FunctionKind::Scale) {
                Ok(handle) => Some(handle),
                Err(error) => return self.reject(FunctionKind::Scale, error),
            },
            None => None,
        };
        tracing::info!(path_hash = path.source_hash(), "custom motion installed");
        self.current = MotionSource::Custom { path, scale };
        self.compiled = Some(code);
        self.last_error = None;
    }

    fn reject(&mut self, kind: FunctionKind, error: CompileError) {
        tracing::warn!(kind = kind.name(), error = %error, "custom motion rejected, keeping current animation");
        self.last_error = Some(CompileReport { kind, error });
    }
}

impl Default for AnimationResolver {
    fn default() -> Self {
        Self::new(Sandbox::default(), crate::animation::debounce::DEFAULT_QUIET)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/resolver.rs"]
mod tests;
