use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::FrameRgba;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// Stable 128-bit fingerprint of a frame's pixels, used for determinism checks
/// and to skip writing repeated frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameFingerprint {
    pub hi: u64,
    pub lo: u64,
}

impl std::fmt::Display for FrameFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

pub fn fingerprint_frame(frame: &FrameRgba) -> FrameFingerprint {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(&frame.width.to_le_bytes());
    h.update(&frame.height.to_le_bytes());
    h.update(&frame.data);
    let v = h.digest128();
    FrameFingerprint {
        hi: (v >> 64) as u64,
        lo: v as u64,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fingerprint.rs"]
mod tests;
