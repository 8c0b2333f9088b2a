use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::math3d::Vec2;
use crate::particles::{Bounds, Particle, ParticleSystem};
use crate::util::{pack_rgb_f32, Rng};
use std::f32::consts::PI;

/// Synthetic steps run in `init` so the fountain starts full
pub const WARMUP_STEPS: usize = 600;
pub const WARMUP_DT: f32 = 0.03;

/// Per-channel trail persistence (warm glow)
const FADE_RGB: (f32, f32, f32) = (0.88, 0.85, 0.87);
/// Most particles any one emitter adds per update
const BURST: usize = 4;
const MAX_PARTICLES: usize = 20_000;
const SEED: u64 = 0xF0_0171;

struct Emitter {
    pos: Vec2,
    angle: f32,
    spread: f32,
    speed: f32,
    hue: f32,
}

/// Three orbiting emitters spraying coloured sparks under gravity
pub struct Fountain {
    system: ParticleSystem,
    width: f32,
    height: f32,
    time: f32,
    max_particles: usize,
    gravity: f32,
    rng: Rng,
}

impl Fountain {
    pub const DEFAULT_MAX_PARTICLES: usize = 2500;
    pub const DEFAULT_GRAVITY: f32 = 90.0;

    pub fn new(params: &EffectParams) -> Self {
        let mut fountain = Self {
            system: ParticleSystem::new(0, Self::DEFAULT_GRAVITY, bounds_for(1.0, 1.0)),
            width: 1.0,
            height: 1.0,
            time: 0.0,
            max_particles: Self::DEFAULT_MAX_PARTICLES,
            gravity: Self::DEFAULT_GRAVITY,
            rng: Rng::new(SEED),
        };
        fountain.apply_config(params);
        fountain
    }

    fn emitters(&self) -> [Emitter; 3] {
        let (w, h, t) = (self.width, self.height, self.time);
        [
            Emitter {
                pos: Vec2::new(w * 0.5 + (t * 0.9).sin() * w * 0.2, h * 0.7),
                angle: -PI * 0.5,
                spread: 0.8,
                speed: 160.0,
                hue: t * 60.0,
            },
            Emitter {
                pos: Vec2::new(w * 0.3 + (t * 1.3 + 1.0).sin() * w * 0.1, h * 0.8),
                angle: -PI * 0.45,
                spread: 0.6,
                speed: 130.0,
                hue: t * 60.0 + 120.0,
            },
            Emitter {
                pos: Vec2::new(w * 0.7 + (t * 1.1 + 2.0).cos() * w * 0.1, h * 0.8),
                angle: -PI * 0.55,
                spread: 0.6,
                speed: 130.0,
                hue: t * 60.0 + 240.0,
            },
        ]
    }

    fn emit(&mut self) {
        for emitter in self.emitters() {
            let count = BURST.min(self.system.free() / 3);
            for _ in 0..count {
                let rng = &mut self.rng;
                let angle = emitter.angle + (rng.next_f32() - 0.5) * emitter.spread;
                let speed = emitter.speed + rng.next_f32() * 100.0;
                let color = spark_color(emitter.hue + rng.next_f32() * 40.0);
                let pos = Vec2::new(emitter.pos.x + (rng.next_f32() - 0.5) * 4.0, emitter.pos.y);
                let life = rng.range_f32(2.0, 4.5);
                let size = rng.range_f32(1.0, 3.0);
                self.system
                    .emit(Particle::new(pos, Vec2::from_angle(angle, speed), life, color).with_size(size));
            }
        }
    }

    fn step(&mut self, dt: f32) {
        self.time += dt;
        self.emit();
        self.system.update(dt);
    }
}

fn bounds_for(width: f32, height: f32) -> Bounds {
    Bounds {
        left: 2.0,
        right: width - 2.0,
        floor: height - 3.0,
    }
}

/// Saturated hue wheel with a floor of 30 so sparks never go fully dark
fn spark_color(hue: f32) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let sector = h as u32;
    let f = h - sector as f32;
    let up = (f * 255.0) as u8;
    let down = ((1.0 - f) * 255.0) as u8;
    match sector % 6 {
        0 => (255, up, 30),
        1 => (down, 255, 30),
        2 => (30, 255, up),
        3 => (30, down, 255),
        4 => (up, 30, 255),
        _ => (255, 30, down),
    }
}

impl Effect for Fountain {
    fn init(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
        self.time = 0.0;
        self.rng = Rng::new(SEED);
        self.system = ParticleSystem::new(
            self.max_particles,
            self.gravity,
            bounds_for(self.width, self.height),
        );

        for _ in 0..WARMUP_STEPS {
            self.step(WARMUP_DT);
        }
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.step(dt);
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let (fr, fg, fb) = FADE_RGB;
        buffer.fade_rgb(fr, fg, fb);

        let w = buffer.width() as i32;
        let h = buffer.height() as i32;

        for p in self.system.iter() {
            let fade = p.opacity();
            let brightness = fade * fade;
            let (r, g, b) = (
                p.color.0 as f32 * brightness,
                p.color.1 as f32 * brightness,
                p.color.2 as f32 * brightness,
            );
            let color = pack_rgb_f32(r, g, b);
            let glow = 80.0 * brightness;
            let core = pack_rgb_f32(r + glow, g + glow, b + glow);

            let ix = p.pos.x as i32;
            let iy = p.pos.y as i32;
            let size = (p.size * (0.5 + brightness * 0.5)) as i32 + 1;
            if ix < 1 || ix >= w - size || iy < 1 || iy >= h - size {
                continue;
            }

            for dy in -size..=size {
                for dx in -size..=size {
                    let dist = ((dx * dx + dy * dy) as f32).sqrt();
                    if dist > size as f32 {
                        continue;
                    }
                    let c = if dist < size as f32 * 0.5 { core } else { color };
                    buffer.set_pixel(ix + dx, iy + dy, c);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "Particle Fountain"
    }

    /// `gravity` applies immediately; `maxParticles` on next init
    fn apply_config(&mut self, params: &EffectParams) {
        self.gravity = param_or(params, "gravity", self.gravity);
        self.system.set_gravity(self.gravity);
        if let Some(count) = params.count("maxParticles", 0, MAX_PARTICLES) {
            self.max_particles = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_up_fills_pool() {
        let mut fountain = Fountain::new(&EffectParams::from([("maxParticles", 300.0)]));
        fountain.init(160, 120);
        assert!(fountain.system.count() > 100);
        assert!(fountain.system.count() <= 300);
        assert!((fountain.time - WARMUP_STEPS as f32 * WARMUP_DT).abs() < 0.01);
    }

    #[test]
    fn test_empty_pool_only_fades() {
        let mut fountain = Fountain::new(&EffectParams::from([("maxParticles", 0.0)]));
        fountain.init(20, 20);
        assert_eq!(fountain.system.count(), 0);

        let mut buffer = PixelBuffer::with_size(20, 20);
        buffer.clear(200, 200, 200);
        let mut expected = buffer.clone();
        expected.fade_rgb(0.88, 0.85, 0.87);
        fountain.update(0.0, 0.016);
        fountain.render(&mut buffer);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_particles_stay_inside_box() {
        let mut fountain = Fountain::new(&EffectParams::from([("maxParticles", 200.0)]));
        fountain.init(64, 48);
        for _ in 0..100 {
            fountain.update(0.0, 0.05);
            for p in fountain.system.iter() {
                assert!(p.pos.y <= 45.0 + 1e-3);
                assert!(p.pos.x >= 2.0 && p.pos.x <= 62.0);
            }
        }
    }

    #[test]
    fn test_gravity_patch_keeps_pool() {
        let mut fountain = Fountain::new(&EffectParams::from([("maxParticles", 100.0)]));
        fountain.init(64, 48);
        let count = fountain.system.count();
        let time = fountain.time;
        fountain.apply_config(&EffectParams::from([("gravity", 10.0)]));
        assert_eq!(fountain.system.count(), count);
        assert_eq!(fountain.time, time);
        assert_eq!(fountain.gravity, 10.0);
        assert_eq!(fountain.max_particles, 100);
    }

    #[test]
    fn test_spark_colors_cover_wheel() {
        assert_eq!(spark_color(0.0), (255, 0, 30));
        assert_eq!(spark_color(120.0), (30, 255, 0));
        assert_eq!(spark_color(240.0), (0, 30, 255));
        assert_eq!(spark_color(360.0), spark_color(0.0));
    }
}
