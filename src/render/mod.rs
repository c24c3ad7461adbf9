//! Sprite population, rasterization, the per-frame renderer and output sinks.
pub mod fingerprint;
pub mod renderer;
pub mod session;
pub mod sink;
pub mod sprites;
