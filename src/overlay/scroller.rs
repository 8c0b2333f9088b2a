//! Sine-wave text scroller
//!
//! The message is rasterized once into a glowing strip, then each frame the
//! strip is cut into narrow vertical slices that bob on a sine wave.

use crate::display::font::{draw_text_scaled, text_width_scaled, GLYPH_HEIGHT};
use crate::display::PixelBuffer;
use crate::util::{pack_rgb, pack_rgba, unpack};

pub const DEFAULT_SPEED: f32 = 120.0;

const MIN_FONT_SIZE: u32 = 16;
const FONT_SIZE_RATIO: f32 = 0.06;
/// Text baseline sits this far down the layer
const BASELINE: f32 = 0.85;
const SLICE_WIDTH: u32 = 4;
/// Sine phase step between neighbouring slices
const SLICE_PHASE: f32 = 0.08;
const WAVE_RATE: f32 = 2.0;
/// Wave amplitude as a share of the font size
const WAVE_AMPLITUDE: f32 = 0.35;
const GLOW_TINT: (u8, u8, u8) = (200, 180, 255);
const GLOW_STRENGTH: f32 = 0.3;
const TEXT_STRENGTH: f32 = 0.85;
/// Blur radius as a share of the font size
const GLOW_SPREAD: f32 = 0.2;
/// Layer opacity for lit pixels (about 90 %)
const LAYER_ALPHA: u8 = 230;

/// Scrolling message drawn into its own transparent layer
pub struct TextScroller {
    message: String,
    speed: f32,
    /// Pre-rendered message with glow; `None` until `init`
    strip: Option<PixelBuffer>,
    /// Scroll period: measured text width plus one view width
    text_width: f32,
    offset: f32,
    font_size: u32,
    view_width: u32,
    time: f32,
}

impl TextScroller {
    pub fn new(message: impl Into<String>, speed: f32) -> Self {
        Self {
            message: message.into(),
            speed,
            strip: None,
            text_width: 1.0,
            offset: 0.0,
            font_size: MIN_FONT_SIZE,
            view_width: 1,
            time: 0.0,
        }
    }

    /// Size the font to the layer and rasterize. Resets the scroll.
    pub fn init(&mut self, width: u32, height: u32) {
        self.view_width = width.max(1);
        self.font_size = MIN_FONT_SIZE.max((height as f32 * FONT_SIZE_RATIO) as u32);
        self.offset = 0.0;
        self.time = 0.0;
        self.rasterize();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Swap the message; re-rasterizes if already initialized
    pub fn set_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        if message == self.message {
            return;
        }
        self.message = message;
        if self.strip.is_some() {
            self.rasterize();
            self.offset = self.offset.rem_euclid(self.text_width);
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    fn glyph_scale(&self) -> u32 {
        (self.font_size as f32 / GLYPH_HEIGHT as f32).round().max(1.0) as u32
    }

    fn rasterize(&mut self) {
        let scale = self.glyph_scale();
        let measured = text_width_scaled(&self.message, scale);
        self.text_width = (measured + self.view_width) as f32;

        // Text starts one view width in so the strip begins blank
        let strip_w = measured + 2 * self.view_width;
        let strip_h = self.font_size * 2;
        let x = self.view_width as i32;
        let y = (strip_h as i32 - (GLYPH_HEIGHT * scale) as i32) / 2;

        let (tr, tg, tb) = GLOW_TINT;
        let mut glow = PixelBuffer::transparent(strip_w, strip_h);
        draw_text_scaled(&mut glow, x, y, &self.message, scale, pack_rgb(tr, tg, tb));
        glow.box_blur(((self.font_size as f32 * GLOW_SPREAD) as u32).max(1));

        let text_level = (255.0 * TEXT_STRENGTH) as u8;
        let mut strip = PixelBuffer::transparent(strip_w, strip_h);
        draw_text_scaled(&mut strip, x, y, &self.message, scale, pack_rgb(text_level, text_level, text_level));

        for (px, &g) in strip.as_mut_slice().iter_mut().zip(glow.as_slice()) {
            let (sr, sg, sb, _) = unpack(*px);
            let (gr, gg, gb, _) = unpack(g);
            let add = |text: u8, halo: u8| text.saturating_add((halo as f32 * GLOW_STRENGTH) as u8);
            let (r, g, b) = (add(sr, gr), add(sg, gg), add(sb, gb));
            let alpha = if (r | g | b) == 0 { 0 } else { LAYER_ALPHA };
            *px = pack_rgba(r, g, b, alpha);
        }

        self.strip = Some(strip);
    }

    /// Advance the scroll by `dt` seconds, wrapping at the text width
    pub fn update(&mut self, dt: f32) {
        if self.strip.is_none() {
            return;
        }
        self.time += dt;
        self.offset = (self.offset + self.speed * dt).rem_euclid(self.text_width);
    }

    /// Clear `layer` to transparent and draw the wavy slices into it
    pub fn render(&self, layer: &mut PixelBuffer) {
        layer.fill(0);
        let Some(strip) = &self.strip else {
            return;
        };

        let width = layer.width();
        let height = layer.height() as i32;
        let strip_w = strip.width() as i32;
        let strip_h = strip.height() as i32;
        let y_base = layer.height() as f32 * BASELINE;
        let font = self.font_size as f32;
        let src = strip.as_slice();
        let dst = layer.as_mut_slice();

        for i in 0..=width / SLICE_WIDTH {
            let src_x = self.offset as i32 + (i * SLICE_WIDTH) as i32;
            let dst_x = (i * SLICE_WIDTH) as i32;
            let wave = (self.time * WAVE_RATE + i as f32 * SLICE_PHASE).sin() * font * WAVE_AMPLITUDE;
            let dst_y = (y_base + wave - font) as i32;

            for row in 0..strip_h {
                let y = dst_y + row;
                if y < 0 || y >= height {
                    continue;
                }
                for col in 0..SLICE_WIDTH as i32 {
                    let (sx, dx) = (src_x + col, dst_x + col);
                    if sx >= strip_w || dx >= width as i32 {
                        break;
                    }
                    let c = src[(row * strip_w + sx) as usize];
                    if c >> 24 != 0 {
                        dst[(y * width as i32 + dx) as usize] = c;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_tracks_height() {
        let mut scroller = TextScroller::new("HI", DEFAULT_SPEED);
        scroller.init(320, 100);
        assert_eq!(scroller.font_size(), 16);
        scroller.init(1280, 1000);
        assert_eq!(scroller.font_size(), 60);
    }

    #[test]
    fn test_offset_wraps_at_text_width() {
        let mut scroller = TextScroller::new("ABCD", 100.0);
        scroller.init(100, 100);
        // 4 glyphs at scale 2 = 64 px, plus the view width
        assert_eq!(scroller.text_width, 164.0);
        scroller.update(1.0);
        assert_eq!(scroller.offset(), 100.0);
        scroller.update(1.0);
        assert_eq!(scroller.offset(), 36.0);
    }

    #[test]
    fn test_update_before_init_is_inert() {
        let mut scroller = TextScroller::new("X", 50.0);
        scroller.update(1.0);
        assert_eq!(scroller.offset(), 0.0);
        let mut layer = PixelBuffer::with_size(8, 8);
        scroller.render(&mut layer);
        assert!(layer.as_slice().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_text_appears_once_scrolled_in() {
        let mut scroller = TextScroller::new("HELLO", 100.0);
        scroller.init(64, 200);
        let mut layer = PixelBuffer::transparent(64, 200);

        // At offset 0 the visible window is the blank lead-in; only the
        // glow halo may bleed into its right edge
        scroller.render(&mut layer);
        for y in 0..200 {
            for x in 0..48 {
                assert_eq!(layer.get_pixel(x, y), Some(0));
            }
        }

        scroller.update(0.64);
        scroller.render(&mut layer);
        let lit: Vec<u32> = layer.as_slice().iter().copied().filter(|&c| c != 0).collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&c| c >> 24 == LAYER_ALPHA as u32));
    }

    #[test]
    fn test_set_message_rerasterizes() {
        let mut scroller = TextScroller::new("A", DEFAULT_SPEED);
        scroller.init(100, 100);
        let before = scroller.text_width;
        scroller.set_message("A LONGER MESSAGE");
        assert!(scroller.text_width > before);
        assert_eq!(scroller.message(), "A LONGER MESSAGE");
        let strip = scroller.strip.as_ref().expect("strip");
        assert_eq!(strip.width() as f32, scroller.text_width + 100.0);
    }
}
