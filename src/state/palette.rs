//! Palettes and color resolution against them.

use crate::foundation::core::Rgb8;
use crate::foundation::error::{PixliError, PixliResult};
use crate::state::model::{BackgroundMode, GeneratorState};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    pub id: String,
    pub name: String,
    pub colors: Vec<Rgb8>,
}

impl Palette {
    pub fn new(id: impl Into<String>, name: impl Into<String>, colors: Vec<Rgb8>) -> PixliResult<Self> {
        let id = id.into();
        if colors.is_empty() {
            return Err(PixliError::validation(format!("palette '{id}' has no colors")));
        }
        Ok(Self {
            id,
            name: name.into(),
            colors,
        })
    }

    fn from_hex(id: &str, name: &str, hex: &[&str]) -> PixliResult<Self> {
        let colors = hex
            .iter()
            .map(|h| Rgb8::from_hex(h))
            .collect::<PixliResult<Vec<_>>>()?;
        Self::new(id, name, colors)
    }

    /// Color at `index`, wrapping around the palette.
    pub fn color(&self, index: usize) -> Rgb8 {
        self.colors[index % self.colors.len()]
    }

    pub fn darkest(&self) -> Rgb8 {
        self.colors
            .iter()
            .copied()
            .min_by_key(|c| luma(*c))
            .unwrap_or(Rgb8::BLACK)
    }
}

/// Palette collaborator. Persistence of user palettes lives outside the engine.
pub trait PaletteSource: Send + Sync {
    fn palette(&self, id: &str) -> Option<Palette>;

    fn ids(&self) -> Vec<String>;
}

/// The palettes shipped with the engine.
#[derive(Clone, Debug)]
pub struct BuiltinPalettes {
    palettes: Vec<Palette>,
}

impl BuiltinPalettes {
    pub fn new() -> PixliResult<Self> {
        let palettes = vec![
            Palette::from_hex(
                "neon",
                "Neon",
                &["#ff2a6d", "#05d9e8", "#d1f7ff", "#01012b", "#f9c80e"],
            )?,
            Palette::from_hex(
                "sunset",
                "Sunset",
                &["#355070", "#6d597a", "#b56576", "#e56b6f", "#eaac8b"],
            )?,
            Palette::from_hex(
                "forest",
                "Forest",
                &["#081c15", "#1b4332", "#2d6a4f", "#52b788", "#b7e4c7"],
            )?,
            Palette::from_hex("mono", "Mono", &["#111111", "#555555", "#aaaaaa", "#eeeeee"])?,
            Palette::from_hex(
                "gameboy",
                "Game Boy",
                &["#0f380f", "#306230", "#8bac0f", "#9bbc0f"],
            )?,
        ];
        Ok(Self { palettes })
    }

    pub fn first(&self) -> &Palette {
        &self.palettes[0]
    }
}

impl PaletteSource for BuiltinPalettes {
    fn palette(&self, id: &str) -> Option<Palette> {
        self.palettes.iter().find(|p| p.id == id).cloned()
    }

    fn ids(&self) -> Vec<String> {
        self.palettes.iter().map(|p| p.id.clone()).collect()
    }
}

/// Look up `id`, falling back to `fallback` when the source does not know it.
pub fn resolve_palette(source: &dyn PaletteSource, id: &str, fallback: &Palette) -> Palette {
    source.palette(id).unwrap_or_else(|| {
        tracing::warn!(palette_id = id, fallback = %fallback.id, "unknown palette id");
        fallback.clone()
    })
}

/// Total hue rotation in degrees at `elapsed_secs`.
pub fn hue_rotation_degrees(state: &GeneratorState, elapsed_secs: f64) -> f64 {
    state.hue_shift + state.hue_rotation_speed / 100.0 * 90.0 * elapsed_secs
}

/// Palette slot offset while palette cycling is on: one slot every half second.
pub fn cycle_offset(state: &GeneratorState, elapsed_secs: f64) -> usize {
    if state.palette_cycling {
        (elapsed_secs.max(0.0) * 2.0).floor() as usize
    } else {
        0
    }
}

/// Final color for one sprite. `jitter` holds three per-sprite values in `[-1, 1)`.
pub fn sprite_color(
    palette: &Palette,
    state: &GeneratorState,
    color_index: usize,
    jitter: [f64; 3],
    elapsed_secs: f64,
) -> Rgb8 {
    let base = palette.color(color_index + cycle_offset(state, elapsed_secs));
    let amount = state.palette_variance / 100.0 * 48.0;
    let ch = |c: u8, j: f64| (f64::from(c) + j * amount).round().clamp(0.0, 255.0) as u8;
    Rgb8::new(ch(base.r, jitter[0]), ch(base.g, jitter[1]), ch(base.b, jitter[2]))
        .hue_rotated(hue_rotation_degrees(state, elapsed_secs))
}

pub fn background_color(palette: &Palette, state: &GeneratorState) -> Rgb8 {
    let base = match state.background_mode {
        BackgroundMode::Solid => palette.color(state.background_color_index),
        BackgroundMode::Darkest => palette.darkest(),
        BackgroundMode::Black => return Rgb8::BLACK,
    };
    base.scaled(state.background_brightness / 100.0)
        .hue_rotated(state.background_hue_shift)
}

fn luma(c: Rgb8) -> u32 {
    299 * u32::from(c.r) + 587 * u32::from(c.g) + 114 * u32::from(c.b)
}

#[cfg(test)]
#[path = "../../tests/unit/state/palette.rs"]
mod tests;
