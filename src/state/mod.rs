//! Shared generator state: the record, its deltas, the fan-in owner and storage boundaries.
pub mod delta;
pub mod migrate;
pub mod model;
pub mod owner;
pub mod palette;
pub mod scenes;
