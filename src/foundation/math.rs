#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Hash a textual seed (plus an optional suffix) into a 64-bit RNG seed.
pub fn seed_from_str(seed: &str, suffix: &str) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(seed.as_bytes());
    h.write_bytes(&[0xff]);
    h.write_bytes(suffix.as_bytes());
    h.finish()
}

/// SplitMix64 generator; every pseudo-random choice in a frame flows through this.
#[derive(Clone, Copy, Debug)]
pub struct Rng64 {
    state: u64,
}

impl Rng64 {
    /// Seed a generator.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive an independent stream for `stream` from a base seed.
    pub fn derive(seed: u64, stream: u64) -> Self {
        let mut h = Fnv1a64::new(seed);
        h.write_u64(stream);
        Self::new(h.finish())
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_01(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform value in `[lo, hi)`.
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64_01()
    }

    /// Uniform index in `0..n` (`n` must be non-zero).
    pub fn index(&mut self, n: usize) -> usize {
        (self.next_u64() % (n.max(1) as u64)) as usize
    }
}

/// Stateless hash noise in `[0, 1)` for a 2D lattice point.
pub(crate) fn hash01(seed: u64, x: u32, y: u32) -> f64 {
    let mut rng = Rng64::new(
        seed ^ u64::from(x).wrapping_mul(0xD6E8_FEB8_6659_FD93)
            ^ u64::from(y).wrapping_mul(0xA076_1D64_78BD_642F),
    );
    rng.next_f64_01()
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
