//! Shared utilities: RNG, packed colors, easing and lookup-table trig

use once_cell::sync::Lazy;
use std::f32::consts::TAU;

/// Simple deterministic RNG using xorshift64
/// Effects reseed it in `init` so a re-initialized effect replays identically
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) } // Ensure non-zero
    }

    /// Get the next random u64
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Get a random f32 in [0, 1)
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() & 0xFFFFFF) as f32 / 0x1000000 as f32
    }

    /// Get a random f32 in [min, max)
    #[inline]
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Get a random index in [0, len); 0 when `len` is 0
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }
}

// ============================================================================
// Packed colors
// ============================================================================

/// Opaque black
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// Pack an opaque color. The value reads `0xAABBGGRR`.
#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    pack_rgba(r, g, b, 255)
}

/// Pack a color with explicit alpha
#[inline]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | r as u32
}

/// Unpack to (r, g, b, a)
#[inline]
pub const fn unpack(c: u32) -> (u8, u8, u8, u8) {
    (
        (c & 0xFF) as u8,
        ((c >> 8) & 0xFF) as u8,
        ((c >> 16) & 0xFF) as u8,
        (c >> 24) as u8,
    )
}

/// Pack float channels, clamping each into 0..=255 (NaN becomes 0)
#[inline]
pub fn pack_rgb_f32(r: f32, g: f32, b: f32) -> u32 {
    pack_rgb(channel(r), channel(g), channel(b))
}

#[inline]
fn channel(v: f32) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.clamp(0.0, 255.0) as u8
    }
}

/// Scale a color's RGB by `factor`, keeping it opaque
#[inline]
pub fn scale_color(c: u32, factor: f32) -> u32 {
    let (r, g, b, _) = unpack(c);
    pack_rgb_f32(r as f32 * factor, g as f32 * factor, b as f32 * factor)
}

/// Blend two packed colors by `t` (0 = a, 1 = b) with 8.8 fixed point.
/// The result is always opaque.
#[inline]
pub fn lerp_color(a: u32, b: u32, t: f32) -> u32 {
    let t256 = if t.is_nan() { 0 } else { (t * 256.0).clamp(0.0, 256.0) as u32 };
    let inv = 256 - t256;

    let r = ((a & 0xFF) * inv + (b & 0xFF) * t256) >> 8;
    let g = (((a >> 8) & 0xFF) * inv + ((b >> 8) & 0xFF) * t256) >> 8;
    let bl = (((a >> 16) & 0xFF) * inv + ((b >> 16) & 0xFF) * t256) >> 8;

    OPAQUE_BLACK | (bl << 16) | (g << 8) | r
}

// ============================================================================
// Easing
// ============================================================================

/// Hermite smoothstep `3t² - 2t³` with `t` clamped to [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let c = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    c * c * (3.0 - 2.0 * c)
}

// ============================================================================
// Lookup-table trig
// ============================================================================

const TRIG_TABLE_SIZE: usize = 1024;

static SIN_TABLE: Lazy<[f32; TRIG_TABLE_SIZE]> = Lazy::new(|| {
    let mut table = [0.0; TRIG_TABLE_SIZE];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (i as f32 / TRIG_TABLE_SIZE as f32 * TAU).sin();
    }
    table
});

#[inline]
fn trig_index(rad: f32) -> usize {
    let idx = (rad * (TRIG_TABLE_SIZE as f32 / TAU)) as i64;
    idx.rem_euclid(TRIG_TABLE_SIZE as i64) as usize
}

/// Table sine, input in radians
#[inline]
pub fn fast_sin(rad: f32) -> f32 {
    if !rad.is_finite() {
        return 0.0;
    }
    SIN_TABLE[trig_index(rad)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout_is_abgr() {
        assert_eq!(pack_rgb(0x11, 0x22, 0x33), 0xFF33_2211);
        assert_eq!(pack_rgba(1, 2, 3, 4).to_le_bytes(), [1, 2, 3, 4]);
        assert_eq!(unpack(0x8033_2211), (0x11, 0x22, 0x33, 0x80));
    }

    #[test]
    fn test_lerp_color_endpoints() {
        let a = pack_rgb(10, 200, 30);
        let b = pack_rgb(250, 0, 128);
        assert_eq!(lerp_color(a, b, 0.0), a);
        assert_eq!(lerp_color(a, b, 1.0), b);
        assert_eq!(lerp_color(a, b, -3.0), a);
        assert_eq!(lerp_color(a, b, f32::NAN), a);
    }

    #[test]
    fn test_lerp_color_forces_opaque() {
        let c = lerp_color(0x0000_0000, 0x0000_0000, 0.5);
        assert_eq!(c >> 24, 0xFF);
    }

    #[test]
    fn test_smoothstep_bounds() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fast_trig_tracks_std() {
        for i in -50..50 {
            let x = i as f32 * 0.37;
            assert!((fast_sin(x) - x.sin()).abs() < 0.01, "sin({})", x);
        }
        assert_eq!(fast_sin(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut zero = Rng::new(0);
        assert_ne!(zero.next_u64(), 0);
    }

    #[test]
    fn test_rng_ranges() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f));
            let r = rng.range_f32(180.0, 255.0);
            assert!((180.0..255.0).contains(&r));
            assert!(rng.index(5) < 5);
        }
        assert_eq!(rng.index(0), 0);
    }
}
