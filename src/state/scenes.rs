//! Scene storage collaborator boundary.

use std::sync::RwLock;

use crate::state::model::GeneratorState;

/// Number of preset slots addressable from MIDI notes and OSC.
pub const PRESET_SLOTS: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub id: String,
    pub name: String,
    /// Unix time in milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
}

/// Named configurations live outside the engine; the engine only lists them and
/// receives complete snapshots back.
pub trait SceneStore: Send + Sync {
    /// Scenes in display order.
    fn list(&self) -> Vec<SceneSummary>;

    /// A complete, current-schema snapshot for `id`.
    fn load(&self, id: &str) -> Option<GeneratorState>;

    /// Scene bound to preset `slot` (1-based): the first five scenes in list order.
    fn preset(&self, slot: u8) -> Option<SceneSummary> {
        if slot == 0 || slot > PRESET_SLOTS {
            return None;
        }
        self.list().into_iter().nth(usize::from(slot - 1))
    }
}

#[derive(Debug, Default)]
pub struct MemorySceneStore {
    scenes: RwLock<Vec<(SceneSummary, GeneratorState)>>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a scene. A replaced scene keeps its position and `created_at`.
    pub fn save(&self, summary: SceneSummary, state: GeneratorState) {
        let mut scenes = match self.scenes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut state = state;
        state.scene_id = Some(summary.id.clone());
        if let Some(slot) = scenes.iter_mut().find(|(s, _)| s.id == summary.id) {
            let created_at = slot.0.created_at;
            *slot = (
                SceneSummary {
                    created_at,
                    ..summary
                },
                state,
            );
        } else {
            scenes.push((summary, state));
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut scenes = match self.scenes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = scenes.len();
        scenes.retain(|(s, _)| s.id != id);
        scenes.len() != before
    }
}

impl SceneStore for MemorySceneStore {
    fn list(&self) -> Vec<SceneSummary> {
        match self.scenes.read() {
            Ok(guard) => guard.iter().map(|(s, _)| s.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|(s, _)| s.clone()).collect(),
        }
    }

    fn load(&self, id: &str) -> Option<GeneratorState> {
        let find = |scenes: &Vec<(SceneSummary, GeneratorState)>| {
            scenes
                .iter()
                .find(|(s, _)| s.id == id)
                .map(|(_, state)| state.clone())
        };
        match self.scenes.read() {
            Ok(guard) => find(&guard),
            Err(poisoned) => find(&poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/scenes.rs"]
mod tests;
