//! Snapshot migration from the legacy (v1) shape to the current schema.
//!
//! Legacy snapshots used dual `presetId`/`sceneId` naming, a `customCode` field,
//! flat effect keys and loosely spelled enum names. Migration maps what it
//! recognizes, drops everything else and fills the gaps with current defaults.

use serde_json::{Map, Value};

use crate::animation::modes::MovementMode;
use crate::foundation::error::{PixliError, PixliResult};
use crate::state::model::{BlendMode, GeneratorState, SCHEMA_VERSION};

/// Turn any stored snapshot (legacy or current) into a valid current state.
pub fn migrate_snapshot(raw: Value) -> PixliResult<GeneratorState> {
    let Value::Object(obj) = raw else {
        return Err(PixliError::validation("snapshot must be a JSON object"));
    };
    let version = obj
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(1);
    if version > u64::from(SCHEMA_VERSION) {
        return Err(PixliError::validation(format!(
            "snapshot schema {version} is newer than supported ({SCHEMA_VERSION})"
        )));
    }

    let obj = if version < u64::from(SCHEMA_VERSION) {
        tracing::info!(from = version, to = SCHEMA_VERSION, "migrating legacy snapshot");
        upgrade_v1(obj)
    } else {
        obj
    };

    let state = merge_onto_defaults(obj)?;
    Ok(state.normalized())
}

/// Parse a snapshot from text, migrating as needed.
pub fn migrate_json_str(s: &str) -> PixliResult<GeneratorState> {
    migrate_snapshot(serde_json::from_str(s)?)
}

fn upgrade_v1(mut legacy: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();

    let scene = legacy
        .remove("sceneId")
        .filter(|v| !v.is_null())
        .or_else(|| legacy.remove("presetId").filter(|v| !v.is_null()));
    if let Some(id) = scene {
        out.insert("sceneId".into(), stringify(id));
    }

    if let Some(seed) = legacy.remove("seed") {
        out.insert("seed".into(), stringify(seed));
    }

    match legacy.remove("codeFunctions").or_else(|| legacy.remove("customCode")) {
        Some(Value::String(path)) => {
            out.insert("codeFunctions".into(), serde_json::json!({ "path": path }));
        }
        Some(v @ Value::Object(_)) => {
            out.insert("codeFunctions".into(), v);
        }
        _ => {}
    }
    if let Some(on) = legacy
        .remove("useCustomMotion")
        .or_else(|| legacy.remove("useCustomCode"))
    {
        out.insert("useCustomMotion".into(), on);
    }

    if let Some(mode) = legacy.remove("movementMode") {
        let parsed = mode.as_str().and_then(|s| MovementMode::parse(s).ok());
        if let Some(mode) = parsed {
            out.insert("movementMode".into(), Value::String(mode.as_str().to_owned()));
        }
    }
    if let Some(mode) = legacy.remove("blendMode") {
        if let Some(Ok(mode)) = mode.as_str().and_then(BlendMode::parse).map(serde_json::to_value) {
            out.insert("blendMode".into(), mode);
        }
    }

    let mut pixelate = Map::new();
    move_key(&mut legacy, "pixelate", &mut pixelate, "enabled");
    move_key(&mut legacy, "pixelSize", &mut pixelate, "blockSize");
    move_key(&mut legacy, "showGrid", &mut pixelate, "grid");
    move_key(&mut legacy, "gridBrightness", &mut pixelate, "gridBrightness");
    let mut quantize = Map::new();
    if let Some(bits) = legacy.remove("colorDepth") {
        quantize.insert("enabled".into(), Value::Bool(bits.as_u64() != Some(24)));
        quantize.insert("bits".into(), bits);
    }
    let mut noise = Map::new();
    move_key(&mut legacy, "noiseEnabled", &mut noise, "enabled");
    move_key(&mut legacy, "noiseType", &mut noise, "type");
    move_key(&mut legacy, "noiseStrength", &mut noise, "strength");
    move_key(&mut legacy, "noiseAnimated", &mut noise, "animated");
    if let Some(Value::String(kind)) = noise.get_mut("type") {
        *kind = kind.to_ascii_lowercase().replace(['_', ' '], "-");
        if kind == "crt-noise" {
            *kind = "crt".to_owned();
        }
    }
    let mut effects = Map::new();
    for (key, section) in [("pixelate", pixelate), ("quantize", quantize), ("noise", noise)] {
        if !section.is_empty() {
            effects.insert(key.into(), Value::Object(section));
        }
    }
    if !effects.is_empty() {
        out.insert("effects".into(), Value::Object(effects));
    }

    // Remaining keys that still exist in the current schema carry over as-is.
    for (k, v) in legacy {
        out.entry(k).or_insert(v);
    }
    out.insert("schemaVersion".into(), Value::from(SCHEMA_VERSION));
    out
}

/// Overlay recognized fields onto the default state one at a time, so a single
/// malformed field falls back to its default instead of rejecting the snapshot.
fn merge_onto_defaults(incoming: Map<String, Value>) -> PixliResult<GeneratorState> {
    let Value::Object(mut merged) = serde_json::to_value(GeneratorState::default())? else {
        return Err(PixliError::serde("default state did not serialize to an object"));
    };
    let known: Vec<String> = known_keys();

    for (key, value) in incoming {
        if !known.contains(&key) {
            tracing::debug!(key = %key, "dropping obsolete snapshot field");
            continue;
        }
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        match serde_json::from_value::<GeneratorState>(Value::Object(candidate.clone())) {
            Ok(_) => merged = candidate,
            Err(e) => tracing::warn!(key = %key, error = %e, "replacing malformed snapshot field with default"),
        }
    }
    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn known_keys() -> Vec<String> {
    let mut probe = GeneratorState::default();
    probe.scene_id = Some(String::new());
    probe.thumbnail_mode = Some(Default::default());
    match serde_json::to_value(probe) {
        Ok(Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
        _ => Vec::new(),
    }
}

fn move_key(from: &mut Map<String, Value>, key: &str, to: &mut Map<String, Value>, as_key: &str) {
    if let Some(v) = from.remove(key) {
        to.insert(as_key.to_owned(), v);
    }
}

fn stringify(v: Value) -> Value {
    match v {
        Value::String(_) => v,
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/migrate.rs"]
mod tests;
