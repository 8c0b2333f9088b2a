//! Particle pool with gravity and box bounces
//!
//! Used by the fountain effect. Particles age from birth to `max_life` and
//! bounce off a floor and two side walls with restitution.

use crate::math3d::Vec2;

/// Vertical velocity kept (and reversed) on a floor hit
const FLOOR_RESTITUTION: f32 = -0.4;
/// Horizontal velocity kept on a floor hit
const FLOOR_FRICTION: f32 = 0.7;
/// Horizontal velocity kept (and reversed) on a wall hit
const WALL_RESTITUTION: f32 = -0.6;
/// Share of life spent fading in
const FADE_IN: f32 = 0.1;

/// A single particle
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds since emission
    pub age: f32,
    pub max_life: f32,
    pub color: (u8, u8, u8),
    pub size: f32,
}

impl Particle {
    pub fn new(pos: Vec2, vel: Vec2, max_life: f32, color: (u8, u8, u8)) -> Self {
        Self {
            pos,
            vel,
            age: 0.0,
            max_life: max_life.max(f32::EPSILON),
            color,
            size: 1.0,
        }
    }

    /// Create a particle with custom size
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Normalized age (0 = just born, 1 = about to die)
    #[inline]
    pub fn life_fraction(&self) -> f32 {
        (self.age / self.max_life).clamp(0.0, 1.0)
    }

    /// Linear fade in over the first tenth of life, then linear fade out
    #[inline]
    pub fn opacity(&self) -> f32 {
        let f = self.life_fraction();
        if f < FADE_IN {
            f / FADE_IN
        } else {
            1.0 - (f - FADE_IN) / (1.0 - FADE_IN)
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.age < self.max_life
    }
}

/// Axis-aligned box the particles bounce inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub floor: f32,
}

/// Particle pool manager
pub struct ParticleSystem {
    particles: Vec<Particle>,
    capacity: usize,
    gravity: f32,
    bounds: Bounds,
}

impl ParticleSystem {
    pub fn new(capacity: usize, gravity: f32, bounds: Bounds) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            capacity,
            gravity,
            bounds,
        }
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    /// Free slots left in the pool
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.particles.len())
    }

    /// Emit a single particle; dropped when the pool is full
    pub fn emit(&mut self, particle: Particle) {
        if self.particles.len() < self.capacity {
            self.particles.push(particle);
        }
    }

    /// Age, integrate and bounce every particle, then drop the dead ones
    pub fn update(&mut self, dt: f32) {
        let Bounds { left, right, floor } = self.bounds;
        for p in &mut self.particles {
            p.age += dt;
            if !p.is_alive() {
                continue;
            }

            p.vel.y += self.gravity * dt;
            p.pos = p.pos + p.vel * dt;

            // Bounce off floor with energy loss
            if p.pos.y > floor {
                p.pos.y = floor;
                p.vel.y *= FLOOR_RESTITUTION;
                p.vel.x *= FLOOR_FRICTION;
            }

            if p.pos.x < left || p.pos.x > right {
                p.vel.x *= WALL_RESTITUTION;
                p.pos.x = p.pos.x.clamp(left, right.max(left));
            }
        }

        self.particles.retain(Particle::is_alive);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Get particle count
    pub fn count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            left: 2.0,
            right: 98.0,
            floor: 97.0,
        }
    }

    #[test]
    fn test_opacity_ramps_in_then_out() {
        let mut p = Particle::new(Vec2::default(), Vec2::default(), 10.0, (255, 0, 0));
        assert_eq!(p.opacity(), 0.0);
        p.age = 0.5;
        assert!((p.opacity() - 0.5).abs() < 1e-6);
        p.age = 1.0;
        assert!((p.opacity() - 1.0).abs() < 1e-6);
        p.age = 10.0;
        assert!(p.opacity().abs() < 1e-6);
    }

    #[test]
    fn test_floor_bounce_loses_energy() {
        let mut system = ParticleSystem::new(4, 0.0, bounds());
        system.emit(Particle::new(Vec2::new(50.0, 96.0), Vec2::new(10.0, 100.0), 5.0, (0, 0, 0)));
        system.update(0.1);
        let p = system.iter().next().expect("alive");
        assert_eq!(p.pos.y, 97.0);
        assert!((p.vel.y + 40.0).abs() < 1e-4);
        assert!((p.vel.x - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_wall_bounce_reverses_and_clamps() {
        let mut system = ParticleSystem::new(4, 0.0, bounds());
        system.emit(Particle::new(Vec2::new(97.0, 50.0), Vec2::new(100.0, 0.0), 5.0, (0, 0, 0)));
        system.update(0.1);
        let p = system.iter().next().expect("alive");
        assert_eq!(p.pos.x, 98.0);
        assert!((p.vel.x + 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_pool_caps_and_expires() {
        let mut system = ParticleSystem::new(2, 90.0, bounds());
        for _ in 0..5 {
            system.emit(Particle::new(Vec2::new(50.0, 50.0), Vec2::default(), 1.0, (0, 0, 0)));
        }
        assert_eq!(system.count(), 2);
        assert_eq!(system.free(), 0);
        system.update(1.5);
        assert_eq!(system.count(), 0);
    }
}
