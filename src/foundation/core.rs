use crate::foundation::error::{PixliError, PixliResult};

pub use kurbo::Vec2;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> PixliResult<Self> {
        if den == 0 {
            return Err(PixliError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(PixliError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> PixliResult<Self> {
        if width == 0 || height == 0 {
            return Err(PixliError::validation(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Byte length of an RGBA8 buffer for this canvas.
    pub fn rgba_len(self) -> PixliResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| PixliError::resource("frame buffer size overflow"))
    }

    pub fn min_side(self) -> u32 {
        self.width.min(self.height)
    }
}

/// Straight (non-premultiplied) RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> PixliResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(PixliError::validation(format!("invalid hex color '{s}'")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| PixliError::validation(format!("invalid hex color '{s}'")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Multiply every channel by `factor` (clamped to the u8 range).
    pub fn scaled(self, factor: f64) -> Self {
        let f = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Rotate hue by `degrees`, preserving saturation and value.
    pub fn hue_rotated(self, degrees: f64) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (h, s, v) = self.to_hsv();
        Self::from_hsv((h + degrees).rem_euclid(360.0), s, v)
    }

    pub fn to_hsv(self) -> (f64, f64, f64) {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let d = max - min;
        let h = if d == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / d).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / d + 2.0)
        } else {
            60.0 * ((r - g) / d + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { d / max };
        (h, s, max)
    }

    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let c = v * s;
        let hp = h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        let to_u8 = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(to_u8(r1), to_u8(g1), to_u8(b1))
    }
}

/// An RGBA8 frame (straight alpha, row-major, top-left origin).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Allocate a frame filled with an opaque color.
    pub fn filled(canvas: Canvas, color: Rgb8) -> PixliResult<Self> {
        let len = canvas.rgba_len()?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| PixliError::resource(format!("frame allocation failed: {e}")))?;
        for _ in 0..(len / 4) {
            data.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data,
        })
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> PixliResult<Self> {
        let expected = Canvas { width, height }.rgba_len()?;
        if data.len() != expected {
            return Err(PixliError::resource(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
