//! 256-entry packed palettes
//!
//! Palettes are pure functions of their parameters. Effects wrap the ones
//! they need in `Lazy` statics so each table is built once per process.

use crate::util::pack_rgb;

pub const PALETTE_SIZE: usize = 256;

/// A color stop for `gradient`: position in [0, 1] and RGB
#[derive(Debug, Clone, Copy)]
pub struct Stop {
    pub pos: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Stop {
    pub const fn new(pos: f32, r: u8, g: u8, b: u8) -> Self {
        Self { pos, r, g, b }
    }
}

/// Cycle hue from `hue_offset` across `hue_range` degrees at fixed S/L
pub fn hsl(hue_offset: f32, hue_range: f32, saturation: f32, lightness: f32) -> Vec<u32> {
    (0..PALETTE_SIZE)
        .map(|i| {
            let hue = (hue_offset + (i as f32 / PALETTE_SIZE as f32) * hue_range) % 360.0;
            let (r, g, b) = hsl_to_rgb(hue / 360.0, saturation, lightness);
            pack_rgb(r, g, b)
        })
        .collect()
}

/// Fire palette: black -> red -> yellow -> white in four 64-entry bands
pub fn fire() -> Vec<u32> {
    (0..PALETTE_SIZE as u32)
        .map(|i| match i {
            0..=63 => pack_rgb((i * 4) as u8, 0, 0),
            64..=127 => pack_rgb(255, ((i - 64) * 4) as u8, 0),
            128..=191 => pack_rgb(255, 255, ((i - 128) * 4) as u8),
            _ => pack_rgb(255, 255, 255),
        })
        .collect()
}

/// Piecewise-linear gradient through `stops` (sorted by position)
pub fn gradient(stops: &[Stop]) -> Vec<u32> {
    let Some((&first, &last)) = stops.first().zip(stops.last()) else {
        return vec![pack_rgb(0, 0, 0); PALETTE_SIZE];
    };

    (0..PALETTE_SIZE)
        .map(|i| {
            let t = i as f32 / (PALETTE_SIZE - 1) as f32;
            let (s0, s1) = stops
                .windows(2)
                .find(|w| t >= w[0].pos && t <= w[1].pos)
                .map_or((first, last), |w| (w[0], w[1]));
            let range = s1.pos - s0.pos;
            let f = if range <= f32::EPSILON { 0.0 } else { (t - s0.pos) / range };
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f) as u8;
            pack_rgb(mix(s0.r, s1.r), mix(s0.g, s1.g), mix(s0.b, s1.b))
        })
        .collect()
}

/// HSL (all components 0-1) to 8-bit RGB
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s <= 0.0 {
        let v = (l * 255.0) as u8;
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        (hue_to_channel(p, q, h + 1.0 / 3.0) * 255.0) as u8,
        (hue_to_channel(p, q, h) * 255.0) as u8,
        (hue_to_channel(p, q, h - 1.0 / 3.0) * 255.0) as u8,
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::unpack;

    #[test]
    fn test_fire_palette_bands() {
        let pal = fire();
        assert_eq!(pal.len(), PALETTE_SIZE);
        assert_eq!(pal[0], pack_rgb(0, 0, 0));
        assert_eq!(pal[63], pack_rgb(252, 0, 0));
        assert_eq!(pal[64], pack_rgb(255, 0, 0));
        assert_eq!(pal[128], pack_rgb(255, 255, 0));
        assert_eq!(pal[255], pack_rgb(255, 255, 255));
    }

    #[test]
    fn test_palettes_are_opaque() {
        let stops = [Stop::new(0.0, 0, 0, 0), Stop::new(1.0, 255, 255, 255)];
        for pal in [hsl(0.0, 360.0, 0.7, 0.5), fire(), gradient(&stops), gradient(&[])] {
            assert_eq!(pal.len(), PALETTE_SIZE);
            assert!(pal.iter().all(|&c| unpack(c).3 == 255));
        }
    }

    #[test]
    fn test_gradient_hits_stops() {
        let pal = gradient(&[Stop::new(0.0, 0, 0, 0), Stop::new(1.0, 255, 128, 64)]);
        assert_eq!(pal[0], pack_rgb(0, 0, 0));
        assert_eq!(pal[255], pack_rgb(255, 128, 64));
    }

    #[test]
    fn test_hsl_grey_when_unsaturated() {
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.5), (127, 127, 127));
    }
}
