//! The single writer of [`GeneratorState`].
//!
//! Adapters and the UI hold a [`StateHandle`] and enqueue deltas; the render loop
//! calls [`StateOwner::begin_frame`] once per tick, which drains the queue, applies
//! everything that arrived in arrival order and swaps the result in as one
//! immutable snapshot. Nothing observes a half-applied batch.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::foundation::error::{PixliError, PixliResult};
use crate::state::delta::StateDelta;
use crate::state::model::GeneratorState;
use crate::state::scenes::SceneStore;

/// Upper bound on deltas applied in one frame; the rest wait for the next tick.
const MAX_DELTAS_PER_FRAME: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeltaSource {
    Ui,
    WebSocket,
    Midi,
    Osc,
    Storage,
}

impl DeltaSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::WebSocket => "websocket",
            Self::Midi => "midi",
            Self::Osc => "osc",
            Self::Storage => "storage",
        }
    }
}

/// A read-only view of the state for one frame.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Bumped once per frame in which at least one delta was applied.
    pub version: u64,
    pub state: Arc<GeneratorState>,
}

/// Outcome of one drain.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub snapshot: StateSnapshot,
    pub applied: usize,
    pub rejected: usize,
}

/// Cloneable sender side of the fan-in queue.
#[derive(Clone, Debug)]
pub struct StateHandle {
    tx: mpsc::UnboundedSender<(DeltaSource, StateDelta)>,
    snapshots: watch::Receiver<StateSnapshot>,
}

impl StateHandle {
    pub fn send(&self, source: DeltaSource, delta: StateDelta) -> PixliResult<()> {
        self.tx
            .send((source, delta))
            .map_err(|_| PixliError::connection("state owner has shut down"))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified after every frame that changed the state.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshots.clone()
    }
}

pub struct StateOwner {
    live: StateSnapshot,
    tx: mpsc::UnboundedSender<(DeltaSource, StateDelta)>,
    rx: mpsc::UnboundedReceiver<(DeltaSource, StateDelta)>,
    publish: watch::Sender<StateSnapshot>,
    scenes: Arc<dyn SceneStore>,
}

impl std::fmt::Debug for StateOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateOwner")
            .field("version", &self.live.version)
            .finish_non_exhaustive()
    }
}

impl StateOwner {
    pub fn new(initial: GeneratorState, scenes: Arc<dyn SceneStore>) -> PixliResult<Self> {
        initial.validate()?;
        let live = StateSnapshot {
            version: 0,
            state: Arc::new(initial),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let (publish, _) = watch::channel(live.clone());
        Ok(Self {
            live,
            tx,
            rx,
            publish,
            scenes,
        })
    }

    pub fn handle(&self) -> StateHandle {
        StateHandle {
            tx: self.tx.clone(),
            snapshots: self.publish.subscribe(),
        }
    }

    pub fn scenes(&self) -> &Arc<dyn SceneStore> {
        &self.scenes
    }

    /// Current snapshot without draining.
    pub fn snapshot(&self) -> StateSnapshot {
        self.live.clone()
    }

    /// Drain queued deltas and swap in the result. Call once at the start of a frame.
    #[tracing::instrument(level = "trace", skip(self), fields(version = self.live.version))]
    pub fn begin_frame(&mut self) -> FrameState {
        let mut working: Option<GeneratorState> = None;
        let mut applied = 0usize;
        let mut rejected = 0usize;

        while applied + rejected < MAX_DELTAS_PER_FRAME {
            let Ok((source, delta)) = self.rx.try_recv() else {
                break;
            };
            let state = working.get_or_insert_with(|| (*self.live.state).clone());
            match delta.apply(state, self.scenes.as_ref()) {
                Ok(()) => applied += 1,
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(source = source.as_str(), ?delta, error = %e, "dropped state delta");
                }
            }
        }

        if applied > 0
            && let Some(next) = working
        {
            self.live = StateSnapshot {
                version: self.live.version + 1,
                state: Arc::new(next),
            };
            self.publish.send_replace(self.live.clone());
            tracing::debug!(version = self.live.version, applied, "state updated");
        }

        FrameState {
            snapshot: self.live.clone(),
            applied,
            rejected,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/owner.rs"]
mod tests;
