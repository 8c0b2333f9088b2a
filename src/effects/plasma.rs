use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::palette;
use crate::util::fast_sin;
use once_cell::sync::Lazy;

static PALETTE: Lazy<Vec<u32>> = Lazy::new(|| palette::hsl(0.0, 360.0, 0.7, 0.5));

/// Classic demoscene plasma: four sine fields summed and palette-mapped
pub struct Plasma {
    time: f32,
    speed: f32,
}

impl Plasma {
    pub const DEFAULT_SPEED: f32 = 1.0;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            time: 0.0,
            speed: param_or(params, "speed", Self::DEFAULT_SPEED),
        }
    }
}

impl Effect for Plasma {
    fn init(&mut self, _width: u32, _height: u32) {
        self.time = 0.0;
    }

    fn update(&mut self, _time: f32, dt: f32) {
        // Speed scales the phase rate, so a new speed never jumps the image
        self.time += dt * self.speed;
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let width = buffer.width() as usize;
        let cx = buffer.width() as f32 * 0.5;
        let cy = buffer.height() as f32 * 0.5;
        let t = self.time;
        let shift = t * 30.0;

        for (y, row) in buffer.as_mut_slice().chunks_exact_mut(width).enumerate() {
            let fy = y as f32;
            let dy = fy - cy;
            let v2 = fast_sin(fy * 0.037 + t * 0.9);
            for (x, px) in row.iter_mut().enumerate() {
                let fx = x as f32;
                let dx = fx - cx;

                let v1 = fast_sin(fx * 0.03 + t * 1.1);
                let v3 = fast_sin((fx + fy) * 0.02 + t * 0.7);
                let v4 = fast_sin((dx * dx + dy * dy).sqrt() * 0.04 + t * 1.3);

                let v = (v1 + v2 + v3 + v4 + 4.0) * 0.125; // Normalize to 0-1
                let idx = ((v * 255.0 + shift) as i64 & 0xFF) as usize;
                *px = PALETTE[idx];
            }
        }
    }

    fn name(&self) -> &str {
        "Plasma"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.speed = param_or(params, "speed", self.speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_patch_keeps_phase() {
        let mut plasma = Plasma::new(&EffectParams::default());
        plasma.init(8, 8);
        plasma.update(0.0, 0.5);
        plasma.apply_config(&EffectParams::from([("speed", 2.0)]));
        assert_eq!(plasma.time, 0.5);
        plasma.update(0.0, 0.5);
        assert_eq!(plasma.time, 1.5);
    }

    #[test]
    fn test_frame_is_pure_function_of_phase() {
        let mut a = Plasma::new(&EffectParams::default());
        let mut b = Plasma::new(&EffectParams::from([("speed", 2.0)]));
        a.init(16, 9);
        b.init(16, 9);
        a.update(0.0, 1.0);
        b.update(0.0, 0.5);

        let mut fa = PixelBuffer::with_size(16, 9);
        let mut fb = PixelBuffer::with_size(16, 9);
        a.render(&mut fa);
        b.render(&mut fb);
        assert_eq!(fa, fb);
    }
}
