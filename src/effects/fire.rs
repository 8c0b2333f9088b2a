use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::PixelBuffer;
use crate::palette;
use crate::util::{Rng, OPAQUE_BLACK};
use once_cell::sync::Lazy;

static PALETTE: Lazy<Vec<u32>> = Lazy::new(palette::fire);

/// Fixed simulation rate (60 updates per second)
const SIM_STEP: f32 = 1.0 / 60.0;
/// Cap on catch-up steps per update
const MAX_STEPS: u32 = 4;
/// Slightly above 4 so the averaged heat cools as it rises
const COOLING_DIVISOR: f32 = 4.04;
/// Seed rows at the bottom of the grid
const SEED_ROWS: usize = 2;
/// Heat climbs one row per step, so warm-up runs this many steps per row
const WARMUP_STEPS_PER_ROW: usize = 1;
const SEED: u64 = 0x1234_ABCD;

/// Classic demoscene fire: an 8-bit heat grid cooled as it rises
pub struct Fire {
    heat: Vec<u8>,
    fire_w: usize,
    fire_h: usize,
    intensity: f32,
    sim_accum: f32,
    rng: Rng,
}

impl Fire {
    pub const DEFAULT_INTENSITY: f32 = 0.6;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            heat: vec![0; 1],
            fire_w: 1,
            fire_h: 1,
            intensity: clamp_intensity(param_or(params, "intensity", Self::DEFAULT_INTENSITY)),
            sim_accum: 0.0,
            rng: Rng::new(SEED),
        }
    }

    /// One full simulation step: reseed the bottom, then propagate upward
    fn step(&mut self) {
        self.seed_bottom();
        self.propagate();
    }

    /// Cells above the intensity threshold get hot draws, the rest embers
    fn seed_bottom(&mut self) {
        let rows = SEED_ROWS.min(self.fire_h);
        let start = (self.fire_h - rows) * self.fire_w;
        let threshold = 1.0 - self.intensity;
        for cell in &mut self.heat[start..] {
            *cell = if self.rng.next_f32() > threshold {
                (180.0 + self.rng.next_f32() * 75.0) as u8
            } else {
                (self.rng.next_f32() * 100.0) as u8
            };
        }
    }

    /// Each cell becomes the average of left/self/right one row below plus
    /// self two rows below, over `COOLING_DIVISOR`. Top-down so every read
    /// sees last step's values.
    fn propagate(&mut self) {
        let w = self.fire_w;
        let h = self.fire_h;
        if h < 3 {
            return;
        }
        for y in 0..h - 2 {
            let below = (y + 1) * w;
            let below2 = (y + 2) * w;
            for x in 0..w {
                let xl = x.saturating_sub(1);
                let xr = (x + 1).min(w - 1);
                let sum = self.heat[below + xl] as u32
                    + self.heat[below + x] as u32
                    + self.heat[below + xr] as u32
                    + self.heat[below2 + x] as u32;
                let avg = sum as f32 / COOLING_DIVISOR;
                self.heat[y * w + x] = avg.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn clamp_intensity(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

impl Effect for Fire {
    fn init(&mut self, width: u32, height: u32) {
        self.fire_w = width.max(1) as usize;
        self.fire_h = height.max(1) as usize;
        self.heat = vec![0; self.fire_w * self.fire_h];
        self.rng = Rng::new(SEED);
        self.sim_accum = 0.0;

        // Warm up so the fire is already burning on the first frame
        for _ in 0..self.fire_h * WARMUP_STEPS_PER_ROW {
            self.step();
        }
    }

    fn update(&mut self, _time: f32, dt: f32) {
        self.sim_accum += dt;

        // Fixed timestep so flame height doesn't depend on frame rate
        let mut steps = 0;
        while self.sim_accum >= SIM_STEP && steps < MAX_STEPS {
            self.sim_accum -= SIM_STEP;
            steps += 1;
            self.step();
        }

        // If we hit max steps, drain remaining accumulator to prevent buildup
        if steps >= MAX_STEPS {
            self.sim_accum = 0.0;
        }
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        let w = buffer.width() as usize;
        let h = buffer.height() as usize;
        if w != self.fire_w || h != self.fire_h {
            buffer.fill(OPAQUE_BLACK);
        }

        let cols = w.min(self.fire_w);
        let rows = h.min(self.fire_h);
        let pixels = buffer.as_mut_slice();
        for y in 0..rows {
            let src = &self.heat[y * self.fire_w..y * self.fire_w + cols];
            let dst = &mut pixels[y * w..y * w + cols];
            for (px, &heat) in dst.iter_mut().zip(src) {
                *px = PALETTE[heat as usize];
            }
        }
    }

    fn name(&self) -> &str {
        "Fire"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.intensity = clamp_intensity(param_or(params, "intensity", self.intensity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire(w: u32, h: u32) -> Fire {
        let mut fire = Fire::new(&EffectParams::default());
        fire.init(w, h);
        fire
    }

    #[test]
    fn test_saturated_heat_cools_to_252() {
        let mut fire = fire(8, 6);
        fire.heat.fill(255);
        fire.propagate();
        // 1020 / 4.04 = 252.47
        for x in 0..8 {
            assert_eq!(fire.heat[x], 252);
        }
    }

    #[test]
    fn test_propagated_rows_never_reach_seed_max() {
        let mut fire = fire(16, 12);
        for _ in 0..200 {
            fire.step();
            assert!(fire.heat[..16 * 10].iter().all(|&h| h <= 252));
        }
    }

    #[test]
    fn test_cold_grid_stays_cold_without_seed() {
        let mut fire = fire(10, 10);
        fire.heat.fill(0);
        fire.propagate();
        assert!(fire.heat.iter().all(|&h| h == 0));
    }

    #[test]
    fn test_seed_respects_intensity() {
        let mut fire = Fire::new(&EffectParams::from([("intensity", 1.0)]));
        fire.init(32, 4);
        fire.seed_bottom();
        assert!(fire.heat[2 * 32..].iter().all(|&h| h >= 180));

        fire.apply_config(&EffectParams::from([("intensity", 0.0)]));
        fire.seed_bottom();
        assert!(fire.heat[2 * 32..].iter().all(|&h| h < 100));
    }

    #[test]
    fn test_warm_up_lights_the_grid() {
        let fire = fire(20, 20);
        assert!(fire.heat[..20 * 18].iter().any(|&h| h > 0));
    }

    #[test]
    fn test_warm_up_step_count() {
        let warmed = fire(16, 12);

        let mut manual = Fire::new(&EffectParams::default());
        manual.init(16, 12);
        manual.heat.fill(0);
        manual.rng = Rng::new(SEED);
        for _ in 0..12 * WARMUP_STEPS_PER_ROW {
            manual.step();
        }
        assert_eq!(manual.heat, warmed.heat);
    }

    #[test]
    fn test_partial_patch_keeps_intensity() {
        let mut fire = Fire::new(&EffectParams::from([("intensity", 0.9)]));
        fire.apply_config(&EffectParams::from([("speed", 4.0)]));
        assert_eq!(fire.intensity, 0.9);
        fire.apply_config(&EffectParams::from([("intensity", 7.0)]));
        assert_eq!(fire.intensity, 1.0);
    }

    #[test]
    fn test_update_uses_fixed_steps() {
        let mut a = fire(12, 12);
        let mut b = fire(12, 12);
        a.update(0.0, SIM_STEP * 2.0 + 0.001);
        b.update(0.0, SIM_STEP);
        b.update(0.0, SIM_STEP + 0.001);
        assert_eq!(a.heat, b.heat);
    }
}
