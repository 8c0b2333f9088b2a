use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::palette;
use once_cell::sync::Lazy;
use std::f32::consts::TAU;

static PALETTE: Lazy<Vec<u32>> = Lazy::new(|| palette::hsl(120.0, 180.0, 0.5, 0.45));

/// XOR texture is 256 texels wide, so scroll wraps there
const TEXTURE_SIZE: f32 = 256.0;

/// Rotating, zooming, scrolling XOR texture
pub struct Rotozoom {
    time: f32,
    angle: f32,
    scroll: f32,
    rotation_speed: f32,
    scroll_speed: f32,
}

impl Rotozoom {
    pub const DEFAULT_ROTATION_SPEED: f32 = 0.4;
    pub const DEFAULT_SCROLL_SPEED: f32 = 1.0;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            time: 0.0,
            angle: 0.0,
            scroll: 0.0,
            rotation_speed: param_or(params, "rotationSpeed", Self::DEFAULT_ROTATION_SPEED),
            scroll_speed: param_or(params, "scrollSpeed", Self::DEFAULT_SCROLL_SPEED),
        }
    }
}

impl Effect for Rotozoom {
    fn init(&mut self, _width: u32, _height: u32) {
        self.time = 0.0;
        self.angle = 0.0;
        self.scroll = 0.0;
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.time = (self.time + dt).rem_euclid(TAU / 0.3);
        self.angle = (self.angle + dt * self.rotation_speed).rem_euclid(TAU);
        // One scroll unit moves 30 texels across and 20 down
        self.scroll = (self.scroll + dt * self.scroll_speed).rem_euclid(TEXTURE_SIZE);
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let width = buffer.width() as usize;
        let cx = buffer.width() as f32 * 0.5;
        let cy = buffer.height() as f32 * 0.5;

        let zoom = 1.0 + (self.time * 0.3).sin() * 0.5;
        let cos_a = self.angle.cos() * zoom;
        let sin_a = self.angle.sin() * zoom;
        let scroll_x = self.scroll * 30.0;
        let scroll_y = self.scroll * 20.0;

        for (y, row) in buffer.as_mut_slice().chunks_exact_mut(width).enumerate() {
            let dy = y as f32 - cy;
            // Incremental stepping along the row
            let mut u = -cx * cos_a - dy * sin_a + scroll_x;
            let mut v = -cx * sin_a + dy * cos_a + scroll_y;
            for px in row.iter_mut() {
                let tu = u as i32 & 0xFF;
                let tv = v as i32 & 0xFF;
                *px = PALETTE[(tu ^ tv) as usize];
                u += cos_a;
                v += sin_a;
            }
        }
    }

    fn name(&self) -> &str {
        "Rotozoom"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.rotation_speed = param_or(params, "rotationSpeed", self.rotation_speed);
        self.scroll_speed = param_or(params, "scrollSpeed", self.scroll_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_frame_is_plain_xor() {
        let mut roto = Rotozoom::new(&EffectParams::default());
        roto.init(4, 4);
        let mut buffer = PixelBuffer::with_size(4, 4);
        roto.render(&mut buffer);
        // angle 0, zoom 1: u = x - cx, v = y - cy
        let expected = PALETTE[((-2i32 & 0xFF) ^ (-2i32 & 0xFF)) as usize];
        assert_eq!(buffer.as_slice()[0], expected);
        assert_eq!(buffer.get_pixel(2, 2), Some(PALETTE[0]));
    }

    #[test]
    fn test_rotation_patch_keeps_scroll() {
        let mut roto = Rotozoom::new(&EffectParams::default());
        roto.init(4, 4);
        roto.update(0.0, 1.0);
        roto.apply_config(&EffectParams::from([("rotationSpeed", 0.0)]));
        let angle = roto.angle;
        roto.update(0.0, 1.0);
        assert_eq!(roto.angle, angle);
        assert_eq!(roto.scroll, 2.0);
    }
}
