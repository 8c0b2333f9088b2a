use super::{copy_endpoint, Transition};
use crate::display::PixelBuffer;
use crate::util::lerp_color;

/// Per-pixel fixed-point linear blend
pub struct Crossfade;

impl Transition for Crossfade {
    fn apply(&self, a: &PixelBuffer, b: &PixelBuffer, out: &mut PixelBuffer, progress: f32) {
        if copy_endpoint(a, b, out, progress) {
            return;
        }
        let sources = a.as_slice().iter().zip(b.as_slice());
        for (px, (&ca, &cb)) in out.as_mut_slice().iter_mut().zip(sources) {
            *px = lerp_color(ca, cb, progress);
        }
    }

    fn name(&self) -> &str {
        "Crossfade"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::pack_rgb;

    #[test]
    fn test_midpoint_averages() {
        let mut a = PixelBuffer::with_size(2, 1);
        let mut b = PixelBuffer::with_size(2, 1);
        a.fill(pack_rgb(0, 100, 200));
        b.fill(pack_rgb(200, 100, 0));
        let mut out = PixelBuffer::with_size(2, 1);
        Crossfade.apply(&a, &b, &mut out, 0.5);
        assert!(out.as_slice().iter().all(|&c| c == pack_rgb(100, 100, 100)));
    }
}
