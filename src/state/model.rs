//! The shared generator state record and its enums.

use kurbo::Vec2;

use crate::animation::modes::MovementMode;
use crate::foundation::error::{PixliError, PixliResult};

/// Current snapshot schema. Older snapshots go through [`crate::state::migrate`].
pub const SCHEMA_VERSION: u32 = 2;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    #[default]
    None,
    Multiply,
    Screen,
    HardLight,
    Overlay,
    SoftLight,
    Darkest,
    Lightest,
}

impl BlendMode {
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Multiply,
        Self::Screen,
        Self::HardLight,
        Self::Overlay,
        Self::SoftLight,
        Self::Darkest,
        Self::Lightest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Multiply => "MULTIPLY",
            Self::Screen => "SCREEN",
            Self::HardLight => "HARD_LIGHT",
            Self::Overlay => "OVERLAY",
            Self::SoftLight => "SOFT_LIGHT",
            Self::Darkest => "DARKEST",
            Self::Lightest => "LIGHTEST",
        }
    }

    /// Case- and separator-insensitive: `hard-light`, `HARD_LIGHT`, `hardLight`.
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_uppercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().replace('_', "") == key)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseType {
    #[default]
    Grain,
    Crt,
    Bayer,
    Static,
    Scanlines,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    #[default]
    Solid,
    Darkest,
    Black,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SpriteShape {
    #[default]
    Square,
    Circle,
    Diamond,
}

/// Color-quantization depth. Serialized as the bit count.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColorDepth {
    Bits4,
    Bits8,
    Bits16,
    #[default]
    Bits24,
}

impl ColorDepth {
    /// Levels per channel, or `None` for full depth.
    pub fn levels(self) -> Option<u16> {
        match self {
            Self::Bits4 => Some(4),
            Self::Bits8 => Some(6),
            Self::Bits16 => Some(32),
            Self::Bits24 => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Bits4 => 4,
            Self::Bits8 => 8,
            Self::Bits16 => 16,
            Self::Bits24 => 24,
        }
    }
}

impl TryFrom<u8> for ColorDepth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            4 => Ok(Self::Bits4),
            8 => Ok(Self::Bits8),
            16 => Ok(Self::Bits16),
            24 => Ok(Self::Bits24),
            other => Err(format!("unsupported color depth {other} (expected 4, 8, 16 or 24)")),
        }
    }
}

impl From<ColorDepth> for u8 {
    fn from(depth: ColorDepth) -> Self {
        depth.bits()
    }
}

/// User source for the expression sandbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeFunctions {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
}

impl CodeFunctions {
    pub fn has_path(&self) -> bool {
        !self.path.trim().is_empty()
    }

    /// `scale` with blank source treated as absent.
    pub fn scale_source(&self) -> Option<&str> {
        self.scale.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PixelateSettings {
    pub enabled: bool,
    pub block_size: u32,
    pub grid: bool,
    /// 0 = black, 50 = reference color (or mid grey), 100 = white.
    pub grid_brightness: f64,
    /// Palette index used as the grid reference color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_color_index: Option<usize>,
}

impl Default for PixelateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            block_size: 8,
            grid: false,
            grid_brightness: 50.0,
            grid_color_index: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuantizeSettings {
    pub enabled: bool,
    pub bits: ColorDepth,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoiseSettings {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: NoiseType,
    /// 0..=100; 0 disables the stage.
    pub strength: f64,
    pub animated: bool,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: NoiseType::Grain,
            strength: 20.0,
            animated: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectSettings {
    pub pixelate: PixelateSettings,
    pub quantize: QuantizeSettings,
    pub noise: NoiseSettings,
}

/// Preview overrides: a deterministic, minimal sprite population.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailMode {
    pub primary_scale: f64,
    pub secondary_scale: f64,
    pub color_index: usize,
    pub count: u32,
    /// Normalized canvas position of the first sprite, `(0.5, 0.5)` is the center.
    pub position: Vec2,
}

impl Default for ThumbnailMode {
    fn default() -> Self {
        Self {
            primary_scale: 1.0,
            secondary_scale: 0.5,
            color_index: 0,
            count: 1,
            position: Vec2::new(0.5, 0.5),
        }
    }
}

/// Every parameter that determines a frame's appearance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorState {
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,

    pub seed: String,
    pub color_seed_suffix: String,

    pub movement_mode: MovementMode,
    pub use_custom_motion: bool,
    pub code_functions: CodeFunctions,
    /// 0..=100, mapped to `motionScale = intensity / 100`.
    pub motion_intensity: f64,
    /// 0..=100, mapped to 0..=12.5 units per second.
    pub motion_speed: f64,

    pub palette_id: String,
    pub palette_variance: f64,
    pub palette_cycling: bool,
    /// 0..=100, mapped to 0..=90 degrees of hue rotation per second.
    pub hue_rotation_speed: f64,
    /// Static hue rotation in degrees applied to sprite colors.
    pub hue_shift: f64,

    pub background_mode: BackgroundMode,
    pub background_brightness: f64,
    pub background_hue_shift: f64,
    pub background_color_index: usize,

    /// 0..=100, controls the sprite population.
    pub density: f64,
    /// 0..=100, controls the sprite base unit.
    pub sprite_size: f64,
    pub sprite_shape: SpriteShape,
    pub layer_count: u32,

    pub blend_mode: BlendMode,
    pub effects: EffectSettings,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_mode: Option<ThumbnailMode>,
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            scene_id: None,
            seed: "pixli".to_owned(),
            color_seed_suffix: String::new(),
            movement_mode: MovementMode::Drift,
            use_custom_motion: false,
            code_functions: CodeFunctions::default(),
            motion_intensity: 50.0,
            motion_speed: 50.0,
            palette_id: "neon".to_owned(),
            palette_variance: 10.0,
            palette_cycling: false,
            hue_rotation_speed: 0.0,
            hue_shift: 0.0,
            background_mode: BackgroundMode::Solid,
            background_brightness: 20.0,
            background_hue_shift: 0.0,
            background_color_index: 0,
            density: 40.0,
            sprite_size: 30.0,
            sprite_shape: SpriteShape::Square,
            layer_count: 3,
            blend_mode: BlendMode::None,
            effects: EffectSettings::default(),
            thumbnail_mode: None,
        }
    }
}

pub(crate) const MAX_LAYERS: u32 = 16;
pub(crate) const MAX_BLOCK_SIZE: u32 = 256;
pub(crate) const MAX_THUMBNAIL_SCALE: f64 = 2.0;
pub(crate) const MAX_THUMBNAIL_COUNT: u32 = 400;

impl GeneratorState {
    /// Parse a current-schema snapshot. Use [`crate::state::migrate::migrate_snapshot`]
    /// for anything that may be older.
    pub fn from_json_str(s: &str) -> PixliResult<Self> {
        let state: Self = serde_json::from_str(s)?;
        state.validate()?;
        Ok(state)
    }

    pub fn to_json_pretty(&self) -> PixliResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field range; the first violation is reported.
    pub fn validate(&self) -> PixliResult<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(PixliError::validation(format!(
                "schema version {} is not current ({SCHEMA_VERSION}); migrate first",
                self.schema_version
            )));
        }
        for (name, v) in self.percent_fields() {
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(PixliError::validation(format!(
                    "{name} must be in [0, 100], got {v}"
                )));
            }
        }
        for (name, v) in [
            ("hueShift", self.hue_shift),
            ("backgroundHueShift", self.background_hue_shift),
        ] {
            if !v.is_finite() {
                return Err(PixliError::validation(format!("{name} must be finite")));
            }
        }
        if self.layer_count == 0 || self.layer_count > MAX_LAYERS {
            return Err(PixliError::validation(format!(
                "layerCount must be in 1..={MAX_LAYERS}, got {}",
                self.layer_count
            )));
        }
        if self.effects.pixelate.block_size > MAX_BLOCK_SIZE {
            return Err(PixliError::validation(format!(
                "pixelate.blockSize must be <= {MAX_BLOCK_SIZE}, got {}",
                self.effects.pixelate.block_size
            )));
        }
        if self.use_custom_motion && !self.code_functions.has_path() {
            return Err(PixliError::validation(
                "useCustomMotion requires a non-empty codeFunctions.path",
            ));
        }
        if let Some(thumb) = &self.thumbnail_mode {
            if thumb.count == 0 || thumb.count > MAX_THUMBNAIL_COUNT {
                return Err(PixliError::validation(format!(
                    "thumbnailMode.count must be in 1..={MAX_THUMBNAIL_COUNT}, got {}",
                    thumb.count
                )));
            }
            for (name, v) in [
                ("primaryScale", thumb.primary_scale),
                ("secondaryScale", thumb.secondary_scale),
            ] {
                if !v.is_finite() || !(0.0..=MAX_THUMBNAIL_SCALE).contains(&v) {
                    return Err(PixliError::validation(format!(
                        "thumbnailMode.{name} must be in [0, {MAX_THUMBNAIL_SCALE}], got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Clamp every field into range. The result always passes [`Self::validate`].
    pub fn normalized(mut self) -> Self {
        fn pct(v: f64, default: f64) -> f64 {
            if v.is_finite() { v.clamp(0.0, 100.0) } else { default }
        }
        let d = Self::default();
        self.schema_version = SCHEMA_VERSION;
        self.motion_intensity = pct(self.motion_intensity, d.motion_intensity);
        self.motion_speed = pct(self.motion_speed, d.motion_speed);
        self.palette_variance = pct(self.palette_variance, d.palette_variance);
        self.hue_rotation_speed = pct(self.hue_rotation_speed, d.hue_rotation_speed);
        self.background_brightness = pct(self.background_brightness, d.background_brightness);
        self.density = pct(self.density, d.density);
        self.sprite_size = pct(self.sprite_size, d.sprite_size);
        self.effects.pixelate.grid_brightness =
            pct(self.effects.pixelate.grid_brightness, 50.0);
        self.effects.noise.strength = pct(self.effects.noise.strength, 0.0);
        if !self.hue_shift.is_finite() {
            self.hue_shift = 0.0;
        }
        if !self.background_hue_shift.is_finite() {
            self.background_hue_shift = 0.0;
        }
        self.layer_count = self.layer_count.clamp(1, MAX_LAYERS);
        self.effects.pixelate.block_size = self.effects.pixelate.block_size.min(MAX_BLOCK_SIZE);
        if !self.code_functions.has_path() {
            self.use_custom_motion = false;
        }
        if let Some(thumb) = &mut self.thumbnail_mode {
            thumb.count = thumb.count.clamp(1, MAX_THUMBNAIL_COUNT);
            thumb.primary_scale = if thumb.primary_scale.is_finite() {
                thumb.primary_scale.clamp(0.0, MAX_THUMBNAIL_SCALE)
            } else {
                1.0
            };
            thumb.secondary_scale = if thumb.secondary_scale.is_finite() {
                thumb.secondary_scale.clamp(0.0, MAX_THUMBNAIL_SCALE)
            } else {
                0.5
            };
        }
        self
    }

    fn percent_fields(&self) -> [(&'static str, f64); 9] {
        [
            ("motionIntensity", self.motion_intensity),
            ("motionSpeed", self.motion_speed),
            ("paletteVariance", self.palette_variance),
            ("hueRotationSpeed", self.hue_rotation_speed),
            ("backgroundBrightness", self.background_brightness),
            ("density", self.density),
            ("spriteSize", self.sprite_size),
            ("effects.pixelate.gridBrightness", self.effects.pixelate.grid_brightness),
            ("effects.noise.strength", self.effects.noise.strength),
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/model.rs"]
mod tests;
