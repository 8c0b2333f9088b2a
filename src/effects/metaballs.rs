use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::palette::{self, Stop};
use crate::util::Rng;
use once_cell::sync::Lazy;
use std::f32::consts::TAU;

static PALETTE: Lazy<Vec<u32>> = Lazy::new(|| {
    palette::gradient(&[
        Stop::new(0.0, 0, 0, 0),
        Stop::new(0.3, 10, 0, 40),
        Stop::new(0.5, 60, 10, 120),
        Stop::new(0.7, 180, 40, 200),
        Stop::new(0.85, 255, 150, 255),
        Stop::new(1.0, 255, 255, 255),
    ])
});

/// Field is sampled on a coarse grid and block-replicated
const STEP: usize = 2;
const MAX_BALLS: usize = 64;
const SEED: u64 = 0xBA11_5EED;

#[derive(Debug, Clone, Copy)]
struct Ball {
    phase_x: f32,
    phase_y: f32,
    speed_x: f32,
    speed_y: f32,
    orbit_x: f32,
    orbit_y: f32,
    radius_sq: f32,
}

/// Orbiting radial fields summed and palette-mapped
pub struct Metaballs {
    balls: Vec<Ball>,
    // Per-frame ball centres, reused between frames
    centers: Vec<(f32, f32)>,
    time: f32,
    ball_count: usize,
    speed: f32,
    rng: Rng,
}

impl Metaballs {
    pub const DEFAULT_BALL_COUNT: usize = 6;
    pub const DEFAULT_SPEED: f32 = 1.0;

    pub fn new(params: &EffectParams) -> Self {
        let mut metaballs = Self {
            balls: Vec::new(),
            centers: Vec::new(),
            time: 0.0,
            ball_count: Self::DEFAULT_BALL_COUNT,
            speed: Self::DEFAULT_SPEED,
            rng: Rng::new(SEED),
        };
        metaballs.apply_config(params);
        metaballs
    }

    fn random_ball(rng: &mut Rng) -> Ball {
        let radius = rng.range_f32(40.0, 70.0);
        Ball {
            phase_x: rng.range_f32(0.0, TAU),
            phase_y: rng.range_f32(0.0, TAU),
            speed_x: rng.range_f32(0.3, 0.9),
            speed_y: rng.range_f32(0.4, 0.9),
            orbit_x: rng.range_f32(0.2, 0.45),
            orbit_y: rng.range_f32(0.2, 0.45),
            radius_sq: radius * radius,
        }
    }

    fn field_at(&self, x: f32, y: f32) -> f32 {
        self.balls
            .iter()
            .zip(&self.centers)
            .map(|(ball, &(bx, by))| {
                let dx = x - bx;
                let dy = y - by;
                // +1 keeps the centre finite
                ball.radius_sq / (dx * dx + dy * dy + 1.0)
            })
            .sum()
    }
}

impl Effect for Metaballs {
    fn init(&mut self, _width: u32, _height: u32) {
        self.rng = Rng::new(SEED);
        self.time = 0.0;
        let rng = &mut self.rng;
        self.balls = (0..self.ball_count).map(|_| Self::random_ball(rng)).collect();
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.time += dt * self.speed;
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let w = buffer.width() as usize;
        let h = buffer.height() as usize;
        let t = self.time;

        self.centers.clear();
        self.centers.extend(self.balls.iter().map(|ball| {
            (
                (0.5 + ball.orbit_x * (t * ball.speed_x + ball.phase_x).sin()) * w as f32,
                (0.5 + ball.orbit_y * (t * ball.speed_y + ball.phase_y).cos()) * h as f32,
            )
        }));

        for y in (0..h).step_by(STEP) {
            for x in (0..w).step_by(STEP) {
                let field = self.field_at(x as f32, y as f32);
                let idx = (field * 255.0).clamp(0.0, 255.0) as usize;
                let color = PALETTE[idx];

                let block_w = STEP.min(w - x);
                for row in y..(y + STEP).min(h) {
                    let start = row * w + x;
                    buffer.as_mut_slice()[start..start + block_w].fill(color);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "Metaballs"
    }

    /// `speed` scales orbit rate immediately; `ballCount` applies on next init
    fn apply_config(&mut self, params: &EffectParams) {
        self.speed = param_or(params, "speed", self.speed);
        if let Some(count) = params.count("ballCount", 0, MAX_BALLS) {
            self.ball_count = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_balls_renders_black() {
        let mut metaballs = Metaballs::new(&EffectParams::from([("ballCount", 0.0)]));
        metaballs.init(9, 7);
        let mut buffer = PixelBuffer::with_size(9, 7);
        buffer.fill(0xFFFF_FFFF);
        metaballs.render(&mut buffer);
        assert!(buffer.as_slice().iter().all(|&c| c == PALETTE[0]));
    }

    #[test]
    fn test_blocks_are_replicated() {
        let mut metaballs = Metaballs::new(&EffectParams::default());
        metaballs.init(16, 16);
        metaballs.update(0.0, 0.3);
        let mut buffer = PixelBuffer::with_size(16, 16);
        metaballs.render(&mut buffer);
        for y in (0..16).step_by(2) {
            for x in (0..16).step_by(2) {
                let c = buffer.get_pixel(x, y);
                assert_eq!(buffer.get_pixel(x + 1, y), c);
                assert_eq!(buffer.get_pixel(x, y + 1), c);
                assert_eq!(buffer.get_pixel(x + 1, y + 1), c);
            }
        }
    }

    #[test]
    fn test_ball_count_waits_for_init() {
        let mut metaballs = Metaballs::new(&EffectParams::default());
        metaballs.init(8, 8);
        metaballs.apply_config(&EffectParams::from([("ballCount", 2.0)]));
        assert_eq!(metaballs.balls.len(), Metaballs::DEFAULT_BALL_COUNT);
        metaballs.init(8, 8);
        assert_eq!(metaballs.balls.len(), 2);
    }
}
