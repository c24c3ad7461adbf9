//! Protocol adapters.
//!
//! Each adapter owns one external channel, parses what arrives into
//! [`StateDelta`](crate::state::delta::StateDelta)s and enqueues them on the
//! fan-in queue. Malformed input is logged and dropped; it never reaches the
//! render loop and never affects another adapter.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::foundation::error::PixliResult;
use crate::state::owner::{DeltaSource, StateHandle};
use crate::state::scenes::SceneStore;

pub mod dmx;
pub mod midi;
pub mod osc;
pub mod reconnect;
pub mod websocket;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting to retry; `attempt` is 1-based.
    Reconnecting { attempt: u32 },
    /// Automatic retries are exhausted; only a manual `connect` recovers.
    GaveUp,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// An inbound message that could not be decoded or was out of range.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {protocol} message: {message}")]
pub struct ProtocolParseError {
    pub protocol: &'static str,
    pub message: String,
}

impl ProtocolParseError {
    pub(crate) fn new(protocol: &'static str, message: impl Into<String>) -> Self {
        Self {
            protocol,
            message: message.into(),
        }
    }
}

/// Observer invoked with every successfully parsed inbound message.
pub type MessageHandler<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// What every adapter needs from the engine.
#[derive(Clone)]
pub struct AdapterContext {
    pub state: StateHandle,
    pub scenes: Arc<dyn SceneStore>,
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext").finish_non_exhaustive()
    }
}

impl AdapterContext {
    pub fn new(state: StateHandle, scenes: Arc<dyn SceneStore>) -> Self {
        Self { state, scenes }
    }

    /// Enqueue a delta; a closed queue is logged, not raised.
    pub(crate) fn enqueue(&self, source: DeltaSource, delta: crate::state::delta::StateDelta) {
        if let Err(e) = self.state.send(source, delta) {
            tracing::warn!(source = source.as_str(), error = %e, "state queue closed, dropping delta");
        }
    }
}

/// Common surface of the protocol adapters.
pub trait ProtocolAdapter {
    type Settings;
    type Message;

    fn name(&self) -> &'static str;

    /// Open the channel. Adapters that are already connected return `Ok`.
    fn connect(&mut self) -> impl Future<Output = PixliResult<()>> + Send;

    /// Close the channel and cancel any pending timers. Safe to call repeatedly.
    fn disconnect(&mut self);

    fn on_message(&mut self, handler: MessageHandler<Self::Message>);

    /// Replace settings; takes effect on the next `connect`.
    fn update_settings(&mut self, settings: Self::Settings);

    fn connection_state(&self) -> ConnectionState;

    /// Receiver notified on every connection state change.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;
}

pub(crate) fn log_dropped(err: &ProtocolParseError) {
    tracing::warn!(protocol = err.protocol, error = %err.message, "dropped malformed message");
}

pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl From<ProtocolParseError> for crate::foundation::error::PixliError {
    fn from(e: ProtocolParseError) -> Self {
        Self::protocol(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/mod.rs"]
mod tests;
