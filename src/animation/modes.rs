//! Built-in movement modes.
//!
//! Every mode honors the same `(t, phase, layerIndex, baseUnit, motionScale)`
//! contract as sandboxed path functions, and [`to_source`] emits sandbox code
//! that evaluates to the same values (the formulas are written with identical
//! operation order so results match bit-for-bit in practice).

use std::f64::consts::{PI, TAU};

use kurbo::Vec2;

use crate::expression::sandbox::MotionInput;
use crate::foundation::error::{PixliError, PixliResult};
use crate::state::model::CodeFunctions;

const ISO_COS: f64 = 0.866_025_403_784_438_6;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum MovementMode {
    Pulse,
    #[default]
    Drift,
    Ripple,
    Zigzag,
    Cascade,
    Spiral,
    Comet,
    Linear,
    Isometric,
    Triangular,
    Parallax,
    PulseMeander,
}

impl MovementMode {
    pub const ALL: [Self; 12] = [
        Self::Pulse,
        Self::Drift,
        Self::Ripple,
        Self::Zigzag,
        Self::Cascade,
        Self::Spiral,
        Self::Comet,
        Self::Linear,
        Self::Isometric,
        Self::Triangular,
        Self::Parallax,
        Self::PulseMeander,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pulse => "pulse",
            Self::Drift => "drift",
            Self::Ripple => "ripple",
            Self::Zigzag => "zigzag",
            Self::Cascade => "cascade",
            Self::Spiral => "spiral",
            Self::Comet => "comet",
            Self::Linear => "linear",
            Self::Isometric => "isometric",
            Self::Triangular => "triangular",
            Self::Parallax => "parallax",
            Self::PulseMeander => "pulse-meander",
        }
    }

    /// Parse a mode name; accepts `pulse-meander`, `pulse_meander` and `pulseMeander`.
    pub fn parse(name: &str) -> PixliResult<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().replace('-', "") == key)
            .ok_or_else(|| PixliError::validation(format!("unknown movement mode '{name}'")))
    }

    /// Offset for one sprite at one instant.
    pub fn path(self, input: &MotionInput) -> Vec2 {
        let t = input.t;
        let p = input.phase;
        let l = f64::from(input.layer_index);
        let s = input.motion_scale;
        match self {
            Self::Pulse => Vec2::new(0.0, 0.0),
            Self::Drift => Vec2::new(
                0.3 * s * (TAU * (t + p)).sin(),
                0.2 * s * (TAU * (2.0 * t + p) + 1.3).sin(),
            ),
            Self::Ripple => {
                let w = (TAU * (t - l * 0.1 + p)).sin();
                let a = TAU * p;
                let r = 0.25 * s * w;
                Vec2::new(r * a.cos(), r * a.sin())
            }
            Self::Zigzag => Vec2::new(
                0.3 * s * (TAU * (t + p) + PI / 4.0).sin(),
                0.2 * s * (TAU * (4.0 * t + p)).sin(),
            ),
            Self::Cascade => Vec2::new(
                0.05 * s * (TAU * (t + p)).sin(),
                (fract(t + p + l * 0.15) - 0.5) * s,
            ),
            Self::Spiral => {
                let angle = TAU * (2.0 * t + p);
                let radius = 0.4 * s * t;
                Vec2::new(angle.cos() * radius, angle.sin() * radius)
            }
            Self::Comet => {
                let a = TAU * (t + p) - l * 0.2;
                Vec2::new(0.4 * s * a.cos(), 0.2 * s * a.sin())
            }
            Self::Linear => Vec2::new((fract(t + p) - 0.5) * s, 0.0),
            Self::Isometric => {
                let u = 0.3 * s * (TAU * (t + p)).sin();
                let v = 0.3 * s * (TAU * (t + p)).cos();
                Vec2::new((u - v) * ISO_COS, (u + v) * 0.5)
            }
            Self::Triangular => {
                let tx = 4.0 * (fract(t + p + 0.25) - 0.5).abs() - 1.0;
                let ty = 4.0 * (fract(2.0 * t + p + 0.25) - 0.5).abs() - 1.0;
                Vec2::new(0.3 * s * tx, 0.3 * s * ty)
            }
            Self::Parallax => {
                let depth = 1.0 / (1.0 + l);
                Vec2::new(
                    0.4 * s * depth * (TAU * (t + p)).sin(),
                    0.1 * s * depth * (TAU * (t + p)).cos(),
                )
            }
            Self::PulseMeander => Vec2::new(
                0.2 * s * (TAU * (t + p)).sin(),
                0.2 * s * (TAU * (3.0 * t + p)).sin(),
            ),
        }
    }

    /// Scale multiplier, or `None` when the mode keeps a constant scale of 1.
    pub fn scale(self, t: f64) -> Option<f64> {
        match self {
            Self::Pulse => Some(1.0 + 0.5 * (TAU * t).sin()),
            Self::PulseMeander => Some(1.0 + 0.25 * (TAU * 2.0 * t).sin()),
            _ => None,
        }
    }

    /// Emit sandbox source equivalent to this mode, for "customize this animation".
    pub fn to_source(self) -> CodeFunctions {
        const SIG: &str = "fn path(t, phase, layerIndex, baseUnit, motionScale)";
        let body = match self {
            Self::Pulse => "    return { x: 0, y: 0 };".to_owned(),
            Self::Drift => [
                "    return {",
                "        x: 0.3 * motionScale * sin(TAU * (t + phase)),",
                "        y: 0.2 * motionScale * sin(TAU * (2 * t + phase) + 1.3),",
                "    };",
            ]
            .join("\n"),
            Self::Ripple => [
                "    let w = sin(TAU * (t - layerIndex * 0.1 + phase));",
                "    let a = TAU * phase;",
                "    let r = 0.25 * motionScale * w;",
                "    return { x: r * cos(a), y: r * sin(a) };",
            ]
            .join("\n"),
            Self::Zigzag => [
                "    return {",
                "        x: 0.3 * motionScale * sin(TAU * (t + phase) + PI / 4),",
                "        y: 0.2 * motionScale * sin(TAU * (4 * t + phase)),",
                "    };",
            ]
            .join("\n"),
            Self::Cascade => [
                "    return {",
                "        x: 0.05 * motionScale * sin(TAU * (t + phase)),",
                "        y: (fract(t + phase + layerIndex * 0.15) - 0.5) * motionScale,",
                "    };",
            ]
            .join("\n"),
            Self::Spiral => [
                "    let angle = TAU * (2 * t + phase);",
                "    let radius = 0.4 * motionScale * t;",
                "    return { x: cos(angle) * radius, y: sin(angle) * radius };",
            ]
            .join("\n"),
            Self::Comet => [
                "    let a = TAU * (t + phase) - layerIndex * 0.2;",
                "    return { x: 0.4 * motionScale * cos(a), y: 0.2 * motionScale * sin(a) };",
            ]
            .join("\n"),
            Self::Linear => "    return { x: (fract(t + phase) - 0.5) * motionScale, y: 0 };".to_owned(),
            Self::Isometric => format!(
                "    let u = 0.3 * motionScale * sin(TAU * (t + phase));\n    let v = 0.3 * motionScale * cos(TAU * (t + phase));\n    return {{ x: (u - v) * {ISO_COS:?}, y: (u + v) * 0.5 }};"
            ),
            Self::Triangular => [
                "    let tx = 4 * abs(fract(t + phase + 0.25) - 0.5) - 1;",
                "    let ty = 4 * abs(fract(2 * t + phase + 0.25) - 0.5) - 1;",
                "    return { x: 0.3 * motionScale * tx, y: 0.3 * motionScale * ty };",
            ]
            .join("\n"),
            Self::Parallax => [
                "    let depth = 1 / (1 + layerIndex);",
                "    return {",
                "        x: 0.4 * motionScale * depth * sin(TAU * (t + phase)),",
                "        y: 0.1 * motionScale * depth * cos(TAU * (t + phase)),",
                "    };",
            ]
            .join("\n"),
            Self::PulseMeander => [
                "    return {",
                "        x: 0.2 * motionScale * sin(TAU * (t + phase)),",
                "        y: 0.2 * motionScale * sin(TAU * (3 * t + phase)),",
                "    };",
            ]
            .join("\n"),
        };

        let scale = match self {
            Self::Pulse => Some("fn scale(t) {\n    return 1 + 0.5 * sin(TAU * t);\n}\n".to_owned()),
            Self::PulseMeander => {
                Some("fn scale(t) {\n    return 1 + 0.25 * sin(TAU * 2 * t);\n}\n".to_owned())
            }
            _ => None,
        };

        CodeFunctions {
            path: format!("// {}\n{SIG} {{\n{body}\n}}\n", self.as_str()),
            scale,
        }
    }
}

impl std::fmt::Display for MovementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fract(v: f64) -> f64 {
    v - v.floor()
}

#[cfg(test)]
#[path = "../../tests/unit/animation/modes.rs"]
mod tests;
