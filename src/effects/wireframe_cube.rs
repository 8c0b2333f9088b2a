use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::math3d::{project, Projected, Vec3, CUBE_EDGES, CUBE_VERTICES};
use crate::util::{pack_rgb_f32, scale_color};

/// Eye distance from each cube's centre
const CAMERA_DISTANCE: f32 = 4.0;
const FADE: f32 = 0.92;
const GLOW: f32 = 0.3;
const VERTEX_BOOST: f32 = 1.3;
const VERTEX_RADIUS: i32 = 2;

/// One cube's motion: size relative to the short screen side, spin rates
/// per axis, and orbit as (amplitude x, rate x, phase x, amplitude y, rate y, phase y)
struct CubeSpec {
    scale: f32,
    spin: (f32, f32, f32),
    orbit: [f32; 6],
    color: (f32, f32, f32),
}

const CUBES: [CubeSpec; 3] = [
    CubeSpec {
        scale: 0.30,
        spin: (0.7, 1.1, 0.5),
        orbit: [0.0; 6],
        color: (80.0, 180.0, 255.0),
    },
    CubeSpec {
        scale: 0.18,
        spin: (-1.2, 0.6, -0.9),
        orbit: [0.15, 0.8, 0.0, 0.1, 0.6, 0.0],
        color: (255.0, 80.0, 180.0),
    },
    CubeSpec {
        scale: 0.12,
        spin: (0.9, -1.4, 1.1),
        orbit: [0.2, 1.2, 2.0, 0.15, 0.9, 1.0],
        color: (80.0, 255.0, 120.0),
    },
];

/// Brightness from depth: near edges bright, far edges dim but visible
fn depth_fade(z: f32) -> f32 {
    ((z - 2.0) / 4.0).clamp(0.3, 1.0)
}

/// Three spinning, orbiting cubes with glowing edges and trails
pub struct WireframeCube {
    phase: f32,
    rotation_speed: f32,
}

impl WireframeCube {
    pub const DEFAULT_ROTATION_SPEED: f32 = 1.0;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            phase: 0.0,
            rotation_speed: param_or(params, "rotationSpeed", Self::DEFAULT_ROTATION_SPEED),
        }
    }

    fn project_cube(&self, spec: &CubeSpec, w: f32, h: f32) -> [Option<Projected>; 8] {
        let t = self.phase;
        let base = w.min(h);
        let [ax, fx, px, ay, fy, py] = spec.orbit;
        let cx = w * 0.5 + (t * fx + px).sin() * base * ax;
        let cy = h * 0.5 + (t * fy + py).cos() * base * ay;
        let (rx, ry, rz) = spec.spin;

        CUBE_VERTICES.map(|v| {
            let r = v.rotate_xyz(t * rx, t * ry, t * rz);
            project(r + Vec3::new(0.0, 0.0, CAMERA_DISTANCE), 1.0, spec.scale * base, cx, cy)
        })
    }
}

/// Stepped line with a one-pixel glow on either side of the core
fn draw_glow_line(buffer: &mut PixelBuffer, a: Projected, b: Projected, color: u32, glow: u32) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()).max(1.0) as i32;
    let sx = dx / steps as f32;
    let sy = dy / steps as f32;
    let len = (sx * sx + sy * sy).sqrt();
    let (nx, ny) = if len > 0.0 { (-sy / len, sx / len) } else { (0.0, 0.0) };

    let (mut x, mut y) = (a.x, a.y);
    for _ in 0..=steps {
        for side in [-1.0f32, 1.0] {
            buffer.set_pixel((x + nx * side) as i32, (y + ny * side) as i32, glow);
        }
        buffer.set_pixel(x as i32, y as i32, color);
        x += sx;
        y += sy;
    }
}

impl Effect for WireframeCube {
    fn init(&mut self, _width: u32, _height: u32) {
        self.phase = 0.0;
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.phase += dt * self.rotation_speed;
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        buffer.fade(FADE);

        let w = buffer.width() as f32;
        let h = buffer.height() as f32;

        for spec in &CUBES {
            let points = self.project_cube(spec, w, h);
            let (r, g, b) = spec.color;

            for (i, j) in CUBE_EDGES {
                let (Some(pa), Some(pb)) = (points[i], points[j]) else {
                    continue;
                };
                let fade = depth_fade((pa.z + pb.z) * 0.5);
                let color = pack_rgb_f32(r * fade, g * fade, b * fade);
                draw_glow_line(buffer, pa, pb, color, scale_color(color, GLOW));
            }

            for p in points.iter().flatten() {
                let boost = depth_fade(p.z) * VERTEX_BOOST;
                let color = pack_rgb_f32(r * boost, g * boost, b * boost);
                buffer.fill_circle(p.x as i32, p.y as i32, VERTEX_RADIUS, color);
            }
        }
    }

    fn name(&self) -> &str {
        "Wireframe Cube"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.rotation_speed = param_or(params, "rotationSpeed", self.rotation_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::OPAQUE_BLACK;

    #[test]
    fn test_depth_fade_clamps() {
        assert_eq!(depth_fade(0.0), 0.3);
        assert_eq!(depth_fade(4.0), 0.5);
        assert_eq!(depth_fade(100.0), 1.0);
    }

    #[test]
    fn test_all_vertices_in_front_of_eye() {
        let mut cube = WireframeCube::new(&EffectParams::default());
        cube.init(64, 64);
        for _ in 0..50 {
            cube.update(0.0, 0.1);
            for spec in &CUBES {
                assert!(cube.project_cube(spec, 64.0, 64.0).iter().all(Option::is_some));
            }
        }
    }

    #[test]
    fn test_draws_something_near_centre() {
        let mut cube = WireframeCube::new(&EffectParams::default());
        cube.init(64, 64);
        let mut buffer = PixelBuffer::with_size(64, 64);
        cube.update(0.0, 0.3);
        cube.render(&mut buffer);
        let lit = buffer.as_slice().iter().filter(|&&c| c != OPAQUE_BLACK).count();
        assert!(lit > 50);
    }

    #[test]
    fn test_zero_speed_freezes_phase() {
        let mut cube = WireframeCube::new(&EffectParams::default());
        cube.init(8, 8);
        cube.update(0.0, 1.0);
        cube.apply_config(&EffectParams::from([("rotationSpeed", 0.0)]));
        cube.update(0.0, 1.0);
        assert_eq!(cube.phase, 1.0);
    }
}
