use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::util::{pack_rgb, Rng};

/// Projection focal length in pixels
const FOCAL: f32 = 180.0;
/// Per-frame trail persistence
const FADE: f32 = 0.82;
/// Stars closer than this respawn at the back
const NEAR_PLANE: f32 = 0.3;
const MAX_STREAK_STEPS: i32 = 80;
const MAX_STARS: usize = 20_000;
const SEED: u64 = 12345;

#[derive(Debug, Clone, Copy)]
struct Star {
    x: f32,
    y: f32,
    z: f32,
    prev_z: f32,
}

/// Classic 3D starfield with streaks from previous to current projection
pub struct Starfield {
    stars: Vec<Star>,
    width: f32,
    height: f32,
    star_count: usize,
    max_depth: f32,
    /// Takes over from `max_depth` at the next init
    pending_max_depth: f32,
    speed: f32,
    rng: Rng,
}

impl Starfield {
    pub const DEFAULT_STAR_COUNT: usize = 2000;
    pub const DEFAULT_MAX_DEPTH: f32 = 120.0;
    pub const DEFAULT_SPEED: f32 = 1.6;

    pub fn new(params: &EffectParams) -> Self {
        let mut starfield = Self {
            stars: Vec::new(),
            width: 1.0,
            height: 1.0,
            star_count: Self::DEFAULT_STAR_COUNT,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            pending_max_depth: Self::DEFAULT_MAX_DEPTH,
            speed: Self::DEFAULT_SPEED,
            rng: Rng::new(SEED),
        };
        starfield.apply_config(params);
        starfield.max_depth = starfield.pending_max_depth;
        starfield
    }

    fn random_star(&mut self, random_depth: bool) -> Star {
        let z = if random_depth {
            self.rng.range_f32(1.0, self.max_depth)
        } else {
            self.max_depth
        };
        Star {
            x: (self.rng.next_f32() - 0.5) * self.width * 3.0,
            y: (self.rng.next_f32() - 0.5) * self.height * 3.0,
            z,
            prev_z: z + 2.0,
        }
    }
}

impl Effect for Starfield {
    fn init(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
        self.rng = Rng::new(SEED);
        self.max_depth = self.pending_max_depth;
        self.stars = (0..self.star_count).map(|_| self.random_star(true)).collect();
    }

    fn update(&mut self, _time: f32, dt: f32) {
        let step = self.speed * dt * 60.0;
        for i in 0..self.stars.len() {
            let star = &mut self.stars[i];
            star.prev_z = star.z;
            star.z -= step;

            // Reset stars that pass the camera
            if star.z <= NEAR_PLANE {
                self.stars[i] = self.random_star(false);
            }
        }
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        // Slight fade instead of hard clear gives subtle trail persistence
        buffer.fade(FADE);

        let w = buffer.width() as i32;
        let h = buffer.height() as i32;
        let cx = buffer.width() as f32 * 0.5;
        let cy = buffer.height() as f32 * 0.5;

        for star in &self.stars {
            let sx = star.x / star.z * FOCAL + cx;
            let sy = star.y / star.z * FOCAL + cy;
            let psx = (star.x / star.prev_z * FOCAL + cx) as i32;
            let psy = (star.y / star.prev_z * FOCAL + cy) as i32;

            let ix = sx as i32;
            let iy = sy as i32;
            if ix < 1 || ix >= w - 1 || iy < 1 || iy >= h - 1 {
                continue;
            }

            let closeness = 1.0 - star.z / self.max_depth;
            let brightness = (closeness * closeness * 280.0).clamp(20.0, 255.0);
            // Slightly blue-white tint
            let (sr, sg, sb) = (brightness * 0.9, brightness * 0.92, brightness);

            let dx = (ix - psx) as f32;
            let dy = (iy - psy) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            let steps = (dist as i32).clamp(1, MAX_STREAK_STEPS);

            // Closer stars leave thicker streaks
            let thickness = if closeness > 0.5 {
                2
            } else if closeness > 0.2 {
                1
            } else {
                0
            };

            for s in 0..=steps {
                let t = s as f32 / steps as f32;
                // Bright at the head, dim at the tail
                let fade = t * t;
                let (fr, fg, fb) = (sr * fade, sg * fade, sb * fade);
                let lx = (psx as f32 + dx * t) as i32;
                let ly = (psy as f32 + dy * t) as i32;
                buffer.set_pixel(lx, ly, pack_rgb(fr as u8, fg as u8, fb as u8));

                if thickness > 0 && dist > 2.0 {
                    let nx = -dy / dist;
                    let ny = dx / dist;
                    let dim = pack_rgb((fr * 0.5) as u8, (fg * 0.5) as u8, (fb * 0.5) as u8);
                    for th in 1..=thickness {
                        let off = th as f32;
                        buffer.set_pixel((lx as f32 + nx * off) as i32, (ly as f32 + ny * off) as i32, dim);
                        buffer.set_pixel((lx as f32 - nx * off) as i32, (ly as f32 - ny * off) as i32, dim);
                    }
                }
            }

            let head_level = (brightness + 40.0).min(255.0) as u8;
            let head = pack_rgb(head_level, head_level, 255);
            buffer.set_pixel(ix, iy, head);
            if closeness > 0.3 {
                buffer.set_pixel(ix + 1, iy, head);
                buffer.set_pixel(ix, iy + 1, head);
            }
        }
    }

    fn name(&self) -> &str {
        "Starfield"
    }

    /// `speed` applies immediately; `starCount` and `maxDepth` on next init
    fn apply_config(&mut self, params: &EffectParams) {
        self.speed = param_or(params, "speed", self.speed).max(0.0);
        if let Some(count) = params.count("starCount", 0, MAX_STARS) {
            self.star_count = count;
        }
        self.pending_max_depth = param_or(params, "maxDepth", self.pending_max_depth).max(2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_respawn_at_max_depth() {
        let mut field = Starfield::new(&EffectParams::from([("starCount", 50.0)]));
        field.init(64, 48);
        assert_eq!(field.stars.len(), 50);

        // One huge step pushes every star through the camera
        field.update(0.0, 10.0);
        for star in &field.stars {
            assert_eq!(star.z, Starfield::DEFAULT_MAX_DEPTH);
            assert!(star.prev_z > star.z);
        }
    }

    #[test]
    fn test_empty_pool_renders_faded_frame() {
        let mut field = Starfield::new(&EffectParams::from([("starCount", 0.0)]));
        field.init(8, 8);
        let mut buffer = PixelBuffer::with_size(8, 8);
        buffer.fill(pack_rgb(100, 100, 100));
        let mut expected = buffer.clone();
        expected.fade(FADE);

        field.update(0.0, 0.016);
        field.render(&mut buffer);
        assert_eq!(buffer, expected);
        assert_ne!(buffer.as_slice()[0], pack_rgb(100, 100, 100));
    }

    #[test]
    fn test_speed_patch_leaves_stars_in_place() {
        let mut field = Starfield::new(&EffectParams::default());
        field.init(32, 32);
        field.update(0.0, 0.1);
        let before: Vec<f32> = field.stars.iter().map(|s| s.z).collect();
        field.apply_config(&EffectParams::from([("speed", 3.0)]));
        let after: Vec<f32> = field.stars.iter().map(|s| s.z).collect();
        assert_eq!(before, after);
        assert_eq!(field.max_depth, Starfield::DEFAULT_MAX_DEPTH);
        assert_eq!(field.star_count, Starfield::DEFAULT_STAR_COUNT);
    }

    #[test]
    fn test_depth_patch_waits_for_init() {
        let mut field = Starfield::new(&EffectParams::from([("starCount", 20.0)]));
        field.init(32, 32);
        field.apply_config(&EffectParams::from([("maxDepth", 40.0)]));
        assert_eq!(field.max_depth, Starfield::DEFAULT_MAX_DEPTH);

        field.update(0.0, 10.0);
        assert!(field.stars.iter().all(|s| s.z == Starfield::DEFAULT_MAX_DEPTH));

        field.init(32, 32);
        assert_eq!(field.max_depth, 40.0);
        assert!(field.stars.iter().all(|s| s.z <= 40.0));
    }
}
