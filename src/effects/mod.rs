//! Frame compositor and its stages.
pub mod blend;
pub mod compositor;
pub mod noise;
pub mod pixelate;
pub mod quantize;
