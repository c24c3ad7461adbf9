//! One evaluation entry point for built-in and sandboxed motion.

use kurbo::Vec2;

use crate::animation::modes::MovementMode;
use crate::expression::error::EvalError;
use crate::expression::sandbox::{FunctionHandle, MotionInput, Sandbox};

/// Upper bound applied to every scale result.
pub const MAX_SCALE: f64 = 2.0;

/// Where the current motion comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionSource {
    Builtin(MovementMode),
    Custom {
        path: FunctionHandle,
        scale: Option<FunctionHandle>,
    },
    /// No motion: zero offset, unit scale.
    Identity,
}

/// Transform for one sprite at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    /// Normalized offset, roughly in `[-0.5, 0.5]` per axis.
    pub offset: Vec2,
    pub scale: f64,
}

impl MotionSample {
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        scale: 1.0,
    };
}

impl MotionSource {
    /// Evaluate, reporting sandbox failures.
    pub fn try_sample(&self, sandbox: &Sandbox, input: &MotionInput) -> Result<MotionSample, EvalError> {
        let (offset, scale) = match self {
            Self::Builtin(mode) => (mode.path(input), mode.scale(input.t).unwrap_or(1.0)),
            Self::Custom { path, scale } => {
                let offset = sandbox.evaluate_path(path, input)?;
                let scale = match scale {
                    Some(handle) => sandbox.evaluate_scale(handle, input.t)?,
                    None => 1.0,
                };
                (offset, scale)
            }
            Self::Identity => return Ok(MotionSample::IDENTITY),
        };
        Ok(MotionSample {
            offset,
            scale: scale.clamp(0.0, MAX_SCALE),
        })
    }

    /// Evaluate, substituting the identity transform when the sandbox fails.
    pub fn sample(&self, sandbox: &Sandbox, input: &MotionInput) -> MotionSample {
        self.try_sample(sandbox, input).unwrap_or_else(|e| {
            tracing::debug!(layer = input.layer_index, t = input.t, error = %e, "motion evaluation failed");
            MotionSample::IDENTITY
        })
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/motion.rs"]
mod tests;
