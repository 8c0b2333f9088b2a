use super::{copy_endpoint, Transition};
use crate::display::PixelBuffer;
use crate::util::{lerp_color, smoothstep};

/// Overshoot so the soft edge has fully cleared the corners at progress 1
const REACH: f32 = 1.3;
/// Half-width of the soft edge as a share of the centre-to-corner distance
const EDGE: f32 = 0.1;

/// Radial reveal of the incoming frame from the centre outward
pub struct Wipe;

impl Transition for Wipe {
    fn apply(&self, a: &PixelBuffer, b: &PixelBuffer, out: &mut PixelBuffer, progress: f32) {
        if copy_endpoint(a, b, out, progress) {
            return;
        }

        let width = out.width() as usize;
        let cx = out.width() as f32 * 0.5;
        let cy = out.height() as f32 * 0.5;
        let max_dist = (cx * cx + cy * cy).sqrt();
        let threshold = progress * max_dist * REACH;
        let edge = (max_dist * EDGE).max(f32::EPSILON);
        let (a, b) = (a.as_slice(), b.as_slice());

        for (idx, px) in out.as_mut_slice().iter_mut().enumerate() {
            let (Some(&ca), Some(&cb)) = (a.get(idx), b.get(idx)) else {
                break;
            };
            let dx = (idx % width) as f32 - cx;
            let dy = (idx / width) as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();

            *px = if dist < threshold - edge {
                cb
            } else if dist > threshold + edge {
                ca
            } else {
                lerp_color(ca, cb, smoothstep((threshold + edge - dist) / (edge * 2.0)))
            };
        }
    }

    fn name(&self) -> &str {
        "Wipe"
    }
}
