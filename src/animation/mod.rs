//! Motion: built-in modes, the per-frame resolver and timing maps.
pub mod debounce;
pub mod modes;
pub mod motion;
pub mod resolver;
pub mod timing;
