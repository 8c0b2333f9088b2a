use super::{param_or, Effect};
use crate::config::EffectParams;
use crate::display::font::{glyph_bit, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::display::PixelBuffer;
use crate::util::{pack_rgb_f32, Rng};
use once_cell::sync::Lazy;

const CHAR_W: usize = 8;
const CHAR_H: usize = 12;
/// Rows of padding above each 8x8 glyph inside its cell
const GLYPH_TOP: usize = 2;
const CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ<>{}[]|/\\=+-*&@#$%";
const FADE: f32 = 0.75;
/// Seconds between random glyph swaps in a column
const CHANGE_INTERVAL: f32 = 0.08;
/// Glyph coverage below this is treated as empty
const MIN_COVERAGE: u8 = 30;
const SEED: u64 = 0x00C0_FFEE;

type Glyph = [u8; CHAR_W * CHAR_H];

/// Charset pre-rasterized into cell-sized coverage maps
static ATLAS: Lazy<Vec<Glyph>> = Lazy::new(|| {
    CHARSET
        .chars()
        .map(|ch| {
            let mut cell = [0u8; CHAR_W * CHAR_H];
            for row in 0..GLYPH_HEIGHT as usize {
                for col in 0..GLYPH_WIDTH as usize {
                    if glyph_bit(ch, col as u32, row as u32) {
                        cell[(row + GLYPH_TOP) * CHAR_W + col] = 255;
                    }
                }
            }
            cell
        })
        .collect()
});

struct Column {
    /// Head row, fractional
    y: f32,
    /// Rows per second before the global speed multiplier
    speed: f32,
    chars: Vec<usize>,
    change_timer: f32,
}

/// Falling glyph columns with a bright head and fading tail
pub struct MatrixRain {
    columns: Vec<Column>,
    rows: usize,
    speed: f32,
    rng: Rng,
}

impl MatrixRain {
    pub const DEFAULT_SPEED: f32 = 1.0;

    pub fn new(params: &EffectParams) -> Self {
        Self {
            columns: Vec::new(),
            rows: 0,
            speed: param_or(params, "speed", Self::DEFAULT_SPEED),
            rng: Rng::new(SEED),
        }
    }

    fn random_column(&mut self) -> Column {
        let length = 5 + (self.rng.next_f32() * self.rows as f32 * 0.6) as usize;
        let chars = (0..length).map(|_| self.rng.index(ATLAS.len())).collect();
        Column {
            y: -self.rng.next_f32() * self.rows as f32 * 2.0,
            speed: self.rng.range_f32(3.0, 11.0),
            chars,
            change_timer: 0.0,
        }
    }
}

impl Effect for MatrixRain {
    fn init(&mut self, width: u32, height: u32) {
        let cols = width as usize / CHAR_W;
        self.rows = height as usize / CHAR_H;
        self.rng = Rng::new(SEED);
        self.columns = (0..cols).map(|_| self.random_column()).collect();
    }

    fn update(&mut self, _time: f32, dt: f32) {
        let rows = self.rows as f32;
        for i in 0..self.columns.len() {
            let col = &mut self.columns[i];
            col.y += col.speed * self.speed * dt;
            col.change_timer += dt;

            if col.change_timer > CHANGE_INTERVAL {
                col.change_timer = 0.0;
                let slot = self.rng.index(col.chars.len());
                col.chars[slot] = self.rng.index(ATLAS.len());
            }

            // Respawn just above the top once the tail has left the screen
            if col.y - col.chars.len() as f32 > rows {
                let mut fresh = self.random_column();
                fresh.y = -(fresh.chars.len() as f32);
                self.columns[i] = fresh;
            }
        }
    }

    fn render(&mut self, buffer: &mut PixelBuffer) {
        // Darken previous frame
        buffer.fade(FADE);

        let w = buffer.width() as usize;
        let h = buffer.height() as usize;
        let pixels = buffer.as_mut_slice();

        for (col_idx, col) in self.columns.iter().enumerate() {
            let base_x = col_idx * CHAR_W;
            if base_x >= w {
                break;
            }
            let head = col.y.floor() as i64;
            let length = col.chars.len() as f32;

            for (ci, &glyph_idx) in col.chars.iter().enumerate() {
                let row = head - ci as i64;
                if row < 0 || row >= self.rows as i64 {
                    continue;
                }

                // Head character is bright white-green, rest fade to dark green
                let (cr, cg, cb) = if ci == 0 {
                    (200.0, 255.0, 200.0)
                } else {
                    let fade = (1.0 - ci as f32 / length).clamp(0.0, 1.0);
                    (fade * 30.0, fade * fade * 220.0, fade * 40.0)
                };

                let glyph = &ATLAS[glyph_idx];
                let base_y = row as usize * CHAR_H;
                for gy in 0..CHAR_H {
                    let sy = base_y + gy;
                    if sy >= h {
                        break;
                    }
                    for gx in 0..CHAR_W.min(w - base_x) {
                        let coverage = glyph[gy * CHAR_W + gx];
                        if coverage < MIN_COVERAGE {
                            continue;
                        }
                        let a = coverage as f32 / 255.0;
                        pixels[sy * w + base_x + gx] = pack_rgb_f32(cr * a, cg * a, cb * a);
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        "Matrix Rain"
    }

    fn apply_config(&mut self, params: &EffectParams) {
        self.speed = param_or(params, "speed", self.speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::pack_rgb;

    #[test]
    fn test_atlas_has_every_char() {
        assert_eq!(ATLAS.len(), CHARSET.chars().count());
        // '0' has lit pixels and the padding rows stay dark
        assert!(ATLAS[0].iter().any(|&c| c == 255));
        assert!(ATLAS[0][..GLYPH_TOP * CHAR_W].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_grid_from_size() {
        let mut rain = MatrixRain::new(&EffectParams::default());
        rain.init(100, 50);
        assert_eq!(rain.columns.len(), 12);
        assert_eq!(rain.rows, 4);
        assert!(rain.columns.iter().all(|c| c.chars.len() >= 5));
    }

    #[test]
    fn test_column_respawns_above_screen() {
        let mut rain = MatrixRain::new(&EffectParams::default());
        rain.init(16, 48);
        rain.columns[0].y = 1000.0;
        rain.update(0.0, 0.0);
        let col = &rain.columns[0];
        assert_eq!(col.y, -(col.chars.len() as f32));
    }

    #[test]
    fn test_head_glyph_is_bright() {
        let mut rain = MatrixRain::new(&EffectParams::default());
        rain.init(8, 12);
        rain.columns[0].y = 0.5;
        let mut buffer = PixelBuffer::with_size(8, 12);
        rain.render(&mut buffer);
        let head = pack_rgb(200, 255, 200);
        assert!(buffer.as_slice().iter().any(|&c| c == head));
    }

    #[test]
    fn test_speed_patch_rescales_fall() {
        let mut rain = MatrixRain::new(&EffectParams::default());
        rain.init(8, 1200);
        rain.columns[0].y = 0.0;
        let base = rain.columns[0].speed;
        rain.apply_config(&EffectParams::from([("speed", 2.0)]));
        rain.update(0.0, 0.05);
        assert!((rain.columns[0].y - base * 0.1).abs() < 1e-4);
    }
}
