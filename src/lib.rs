#![forbid(unsafe_code)]
//! Pixli: a real-time procedural sprite generator.
//!
//! Each frame the [`StateOwner`] folds queued control changes into one immutable
//! snapshot, the [`AnimationResolver`] decides which motion source drives the
//! sprites, the [`Renderer`] places and rasterizes them, and the
//! [`FrameCompositor`] runs the fixed post-processing chain. Protocol adapters
//! (WebSocket, MIDI, OSC) feed the state queue; DMX mirrors state outward.

pub mod animation;
pub mod config;
pub mod effects;
pub mod expression;
pub mod foundation;
pub mod protocol;
pub mod render;
pub mod state;

pub use animation::modes::MovementMode;
pub use animation::motion::{MotionSample, MotionSource};
pub use animation::resolver::{AnimationResolver, ResolverState};
pub use animation::timing::CycleTiming;
pub use config::PixliConfig;
pub use effects::compositor::{CompositorPlan, FrameCompositor};
pub use expression::error::{CompileError, EvalError};
pub use expression::sandbox::{FunctionHandle, MotionInput, Sandbox, Validation};
pub use expression::vm::EvalBudget;
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRgba, Rgb8, Vec2};
pub use foundation::error::{PixliError, PixliResult};
pub use protocol::{AdapterContext, ConnectionState, ProtocolAdapter, ProtocolParseError};
pub use render::fingerprint::{FrameFingerprint, fingerprint_frame};
pub use render::renderer::{FrameReport, Renderer};
pub use render::session::{LiveSession, SessionStats, Tick};
pub use render::sink::{FrameSink, InMemorySink, MirrorSink, PngSequenceSink, SinkConfig};
pub use state::delta::{Param, StateDelta};
pub use state::model::GeneratorState;
pub use state::owner::{DeltaSource, StateHandle, StateOwner, StateSnapshot};
pub use state::scenes::{MemorySceneStore, SceneStore, SceneSummary};
