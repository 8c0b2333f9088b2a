use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::palette;
use once_cell::sync::Lazy;
use std::f32::consts::TAU;

static PALETTE: Lazy<Vec<u32>> = Lazy::new(|| palette::hsl(180.0, 240.0, 0.6, 0.45));

/// One full turn maps onto the 256 texel columns
const ANGLE_TO_TEXEL: f32 = 256.0 / TAU;
const DEPTH_SCALE: f32 = 200.0;
const DEPTH_TO_TEXEL: f32 = 10.0;
/// Zoom phase that advances the texture by exactly one period
const ZOOM_PERIOD: f32 = 256.0 / DEPTH_TO_TEXEL;

/// Texture-mapped tunnel from per-pixel angle and inverse-distance tables
pub struct Tunnel {
    angle_lut: Vec<f32>,
    depth_lut: Vec<f32>,
    rotation: f32,
    zoom: f32,
    rotation_speed: f32,
    zoom_speed: f32,
}

impl Tunnel {
    pub const DEFAULT_ROTATION_SPEED: f32 = 0.8;
    pub const DEFAULT_ZOOM_SPEED: f32 = 1.5;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            angle_lut: Vec::new(),
            depth_lut: Vec::new(),
            rotation: 0.0,
            zoom: 0.0,
            rotation_speed: param_or(params, "rotationSpeed", Self::DEFAULT_ROTATION_SPEED),
            zoom_speed: param_or(params, "zoomSpeed", Self::DEFAULT_ZOOM_SPEED),
        }
    }

    fn build_tables(&mut self, width: u32, height: u32) {
        let cx = width as f32 * 0.5;
        let cy = height as f32 * 0.5;
        let len = width as usize * height as usize;
        self.angle_lut = Vec::with_capacity(len);
        self.depth_lut = Vec::with_capacity(len);

        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                self.angle_lut.push(dy.atan2(dx));
                self.depth_lut.push(if dist > 0.0 { DEPTH_SCALE / dist } else { 0.0 });
            }
        }
    }
}

impl Effect for Tunnel {
    fn init(&mut self, width: u32, height: u32) {
        self.build_tables(width.max(1), height.max(1));
        self.rotation = 0.0;
        self.zoom = 0.0;
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.rotation = (self.rotation + dt * self.rotation_speed).rem_euclid(TAU);
        self.zoom = (self.zoom + dt * self.zoom_speed).rem_euclid(ZOOM_PERIOD);
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        if self.angle_lut.len() != buffer.len() {
            self.build_tables(buffer.width(), buffer.height());
        }

        let tables = self.angle_lut.iter().zip(&self.depth_lut);
        for (px, (&angle, &depth)) in buffer.as_mut_slice().iter_mut().zip(tables) {
            let u = ((angle + self.rotation) * ANGLE_TO_TEXEL) as i32 & 0xFF;
            let v = ((depth + self.zoom) * DEPTH_TO_TEXEL) as i32 & 0xFF;
            *px = PALETTE[(u ^ v) as usize];
        }
    }

    fn name(&self) -> &str {
        "Tunnel"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.rotation_speed = param_or(params, "rotationSpeed", self.rotation_speed);
        self.zoom_speed = param_or(params, "zoomSpeed", self.zoom_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_match_buffer_size() {
        let mut tunnel = Tunnel::new(&EffectParams::default());
        tunnel.init(10, 6);
        assert_eq!(tunnel.angle_lut.len(), 60);
        // Centre pixel has no depth rather than an infinite one
        assert_eq!(tunnel.depth_lut[3 * 10 + 5], 0.0);
        assert!(tunnel.depth_lut.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_render_rebuilds_tables_for_other_size() {
        let mut tunnel = Tunnel::new(&EffectParams::default());
        tunnel.init(4, 4);
        let mut buffer = PixelBuffer::with_size(9, 5);
        tunnel.render(&mut buffer);
        assert_eq!(tunnel.depth_lut.len(), 45);
    }

    #[test]
    fn test_partial_patch() {
        let mut tunnel = Tunnel::new(&EffectParams::default());
        tunnel.init(8, 8);
        tunnel.update(0.0, 0.25);
        let phase = (tunnel.rotation, tunnel.zoom);
        tunnel.apply_config(&EffectParams::from([("zoomSpeed", 3.0)]));
        assert_eq!(tunnel.rotation_speed, Tunnel::DEFAULT_ROTATION_SPEED);
        assert_eq!(tunnel.zoom_speed, 3.0);
        assert_eq!((tunnel.rotation, tunnel.zoom), phase);
    }
}
