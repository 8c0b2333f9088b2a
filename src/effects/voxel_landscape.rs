use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::util::{pack_rgb, pack_rgb_f32, scale_color, OPAQUE_BLACK};
use once_cell::sync::Lazy;

/// Side of the square, wrapping terrain map (power of two)
const MAP_SIZE: usize = 512;
const MAP_MASK: usize = MAP_SIZE - 1;
/// Depth samples per column
const RAY_STEPS: usize = 280;
/// Horizon sits this far down the screen
const HORIZON: f32 = 0.35;

struct Terrain {
    heights: Vec<f32>,
    colors: Vec<u32>,
}

/// Height and colour fields from summed sines, built once per process
static TERRAIN: Lazy<Terrain> = Lazy::new(|| {
    let mut heights = Vec::with_capacity(MAP_SIZE * MAP_SIZE);
    let mut colors = Vec::with_capacity(MAP_SIZE * MAP_SIZE);
    for y in 0..MAP_SIZE {
        for x in 0..MAP_SIZE {
            let nx = x as f32 / MAP_SIZE as f32;
            let ny = y as f32 / MAP_SIZE as f32;
            let h = (nx * 5.0).sin() * (ny * 4.3).cos() * 50.0
                + (nx * 11.7 + 1.3).sin() * (ny * 9.1 + 2.4).cos() * 25.0
                + (nx * 23.4 + 0.7).sin() * (ny * 19.8 + 1.1).cos() * 12.0
                + ((nx + ny) * 7.5).sin() * 20.0
                + (nx * 3.1 + ny * 2.7).sin().abs() * 30.0
                - 15.0;
            heights.push(h);
            colors.push(terrain_color(h));
        }
    }
    Terrain { heights, colors }
});

/// Deep water, shallows, magenta lowlands, ridges, cyan peaks, snow
fn terrain_color(h: f32) -> u32 {
    if h < -25.0 {
        pack_rgb(10, 20, 60)
    } else if h < -5.0 {
        let f = (h + 25.0) / 20.0;
        pack_rgb_f32(10.0 + f * 40.0, 20.0 + f * 10.0, 60.0 + f * 80.0)
    } else if h < 10.0 {
        pack_rgb(200, 50, 120)
    } else if h < 30.0 {
        let f = (h - 10.0) / 20.0;
        pack_rgb_f32(200.0 - f * 100.0, 50.0 + f * 50.0, 120.0 + f * 80.0)
    } else if h < 50.0 {
        pack_rgb(60, 180, 220)
    } else {
        pack_rgb(220, 200, 255)
    }
}

/// Bilinear height at a wrapped world position
fn sample_height(terrain: &Terrain, wx: f32, wy: f32) -> f32 {
    let fx = wx.rem_euclid(MAP_SIZE as f32);
    let fy = wy.rem_euclid(MAP_SIZE as f32);
    let ix = fx as usize & MAP_MASK;
    let iy = fy as usize & MAP_MASK;
    let dx = fx - fx.floor();
    let dy = fy - fy.floor();
    let ix1 = (ix + 1) & MAP_MASK;
    let iy1 = (iy + 1) & MAP_MASK;

    let h = &terrain.heights;
    h[iy * MAP_SIZE + ix] * (1.0 - dx) * (1.0 - dy)
        + h[iy * MAP_SIZE + ix1] * dx * (1.0 - dy)
        + h[iy1 * MAP_SIZE + ix] * (1.0 - dx) * dy
        + h[iy1 * MAP_SIZE + ix1] * dx * dy
}

fn sample_color(terrain: &Terrain, wx: f32, wy: f32) -> u32 {
    let ix = (wx.floor() as i64).rem_euclid(MAP_SIZE as i64) as usize;
    let iy = (wy.floor() as i64).rem_euclid(MAP_SIZE as i64) as usize;
    terrain.colors[iy * MAP_SIZE + ix]
}

/// Comanche-style voxel terrain flown over by a swaying camera
pub struct VoxelLandscape {
    time: f32,
    /// Distance flown, in camera-speed-scaled seconds
    travel: f32,
    camera_speed: f32,
    view_distance: f32,
    y_buffer: Vec<i32>,
}

impl VoxelLandscape {
    pub const DEFAULT_CAMERA_SPEED: f32 = 1.0;
    pub const DEFAULT_VIEW_DISTANCE: f32 = 400.0;

    pub fn new(params: &EffectParams) -> Self {
        let mut voxel = Self {
            time: 0.0,
            travel: 0.0,
            camera_speed: Self::DEFAULT_CAMERA_SPEED,
            view_distance: Self::DEFAULT_VIEW_DISTANCE,
            y_buffer: Vec::new(),
        };
        voxel.apply_config(params);
        voxel
    }

    fn draw_sky(&self, buffer: &mut PixelBuffer, horizon: usize) {
        let width = buffer.width() as usize;
        let pulse = (self.time * 0.3).sin() * 10.0;
        for (y, row) in buffer
            .as_mut_slice()
            .chunks_exact_mut(width)
            .take(horizon)
            .enumerate()
        {
            let f = y as f32 / horizon as f32;
            row.fill(pack_rgb_f32(10.0 + f * 30.0 + pulse, 5.0 + f * 15.0, 30.0 + f * 60.0));
        }
    }
}

impl Effect for VoxelLandscape {
    fn init(&mut self, width: u32, _height: u32) {
        Lazy::force(&TERRAIN);
        self.time = 0.0;
        self.travel = 0.0;
        self.y_buffer = vec![0; width.max(1) as usize];
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.time += dt;
        self.travel += dt * self.camera_speed;
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let terrain = &*TERRAIN;
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let w = width as f32;
        let h = height as f32;

        let cam_x = self.travel * 35.0;
        let cam_y = self.travel * 22.0;
        let cam_height = 90.0 + (self.time * 0.4).sin() * 20.0;
        let (sin_a, cos_a) = ((self.time * 0.2).sin() * 0.3).sin_cos();
        let horizon = (h * HORIZON) as usize;

        buffer.fill(OPAQUE_BLACK);
        self.draw_sky(buffer, horizon);

        // Painter's algorithm front to back: each column only fills above
        // the highest point drawn so far
        self.y_buffer.clear();
        self.y_buffer.resize(width, height as i32);

        let max_dist = self.view_distance;
        let pixels = buffer.as_mut_slice();
        for d in 1..RAY_STEPS {
            let dist = d as f32 / RAY_STEPS as f32 * max_dist + 1.0;
            let fog = (1.0 - dist / max_dist).clamp(0.0, 1.0);
            let fog = fog * fog;

            for (x, y_top) in self.y_buffer.iter_mut().enumerate() {
                let rx = (x as f32 - w * 0.5) / w;
                let world_x = (rx * cos_a - sin_a) * dist + cam_x;
                let world_y = (rx * sin_a + cos_a) * dist + cam_y;

                let terrain_height = sample_height(terrain, world_x, world_y);
                let screen_y = ((cam_height - terrain_height) / dist * h * 0.5 + horizon as f32) as i32;
                if screen_y >= *y_top {
                    continue;
                }

                let color = scale_color(sample_color(terrain, world_x, world_y), fog);
                let top = screen_y.max(0) as usize;
                let bottom = (*y_top).clamp(0, height as i32) as usize;
                for y in top..bottom {
                    pixels[y * width + x] = color;
                }
                *y_top = screen_y;
            }
        }
    }

    fn name(&self) -> &str {
        "Voxel Landscape"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.camera_speed = param_or(params, "cameraSpeed", self.camera_speed);
        self.view_distance = param_or(params, "viewDistance", self.view_distance).max(10.0);
    }
}
