//! 8x8 bitmap font
//!
//! Printable ASCII (32-126), one byte per row, MSB is the leftmost pixel.
//! Used by the scroller strip and the matrix rain glyph atlas.

use super::PixelBuffer;

pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 8;

const FIRST_CHAR: u32 = 32;
const LAST_CHAR: u32 = 126;

static FONT_8X8: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // Space (32)
    [0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x00], // ! (33)
    [0x6C, 0x6C, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00], // " (34)
    [0x6C, 0x6C, 0xFE, 0x6C, 0xFE, 0x6C, 0x6C, 0x00], // # (35)
    [0x18, 0x7E, 0xC0, 0x7C, 0x06, 0xFC, 0x18, 0x00], // $ (36)
    [0x00, 0xC6, 0xCC, 0x18, 0x30, 0x66, 0xC6, 0x00], // % (37)
    [0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00], // & (38)
    [0x18, 0x18, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00], // ' (39)
    [0x0C, 0x18, 0x30, 0x30, 0x30, 0x18, 0x0C, 0x00], // ( (40)
    [0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x18, 0x30, 0x00], // ) (41)
    [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // * (42)
    [0x00, 0x18, 0x18, 0x7E, 0x18, 0x18, 0x00, 0x00], // + (43)
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x30], // , (44)
    [0x00, 0x00, 0x00, 0x7E, 0x00, 0x00, 0x00, 0x00], // - (45)
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00], // . (46)
    [0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0x80, 0x00], // / (47)
    [0x7C, 0xCE, 0xDE, 0xF6, 0xE6, 0xC6, 0x7C, 0x00], // 0 (48)
    [0x18, 0x38, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00], // 1 (49)
    [0x7C, 0xC6, 0x06, 0x7C, 0xC0, 0xC0, 0xFE, 0x00], // 2 (50)
    [0xFC, 0x06, 0x06, 0x3C, 0x06, 0x06, 0xFC, 0x00], // 3 (51)
    [0x0C, 0xCC, 0xCC, 0xCC, 0xFE, 0x0C, 0x0C, 0x00], // 4 (52)
    [0xFE, 0xC0, 0xFC, 0x06, 0x06, 0xC6, 0x7C, 0x00], // 5 (53)
    [0x7C, 0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0x7C, 0x00], // 6 (54)
    [0xFE, 0x06, 0x06, 0x0C, 0x18, 0x18, 0x18, 0x00], // 7 (55)
    [0x7C, 0xC6, 0xC6, 0x7C, 0xC6, 0xC6, 0x7C, 0x00], // 8 (56)
    [0x7C, 0xC6, 0xC6, 0x7E, 0x06, 0x06, 0x7C, 0x00], // 9 (57)
    [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00], // : (58)
    [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x30], // ; (59)
    [0x0C, 0x18, 0x30, 0x60, 0x30, 0x18, 0x0C, 0x00], // < (60)
    [0x00, 0x00, 0x7E, 0x00, 0x7E, 0x00, 0x00, 0x00], // = (61)
    [0x30, 0x18, 0x0C, 0x06, 0x0C, 0x18, 0x30, 0x00], // > (62)
    [0x3C, 0x66, 0x0C, 0x18, 0x18, 0x00, 0x18, 0x00], // ? (63)
    [0x7C, 0xC6, 0xDE, 0xDE, 0xDE, 0xC0, 0x7E, 0x00], // @ (64)
    [0x38, 0x6C, 0xC6, 0xC6, 0xFE, 0xC6, 0xC6, 0x00], // A (65)
    [0xFC, 0xC6, 0xC6, 0xFC, 0xC6, 0xC6, 0xFC, 0x00], // B (66)
    [0x7C, 0xC6, 0xC0, 0xC0, 0xC0, 0xC6, 0x7C, 0x00], // C (67)
    [0xF8, 0xCC, 0xC6, 0xC6, 0xC6, 0xCC, 0xF8, 0x00], // D (68)
    [0xFE, 0xC0, 0xC0, 0xF8, 0xC0, 0xC0, 0xFE, 0x00], // E (69)
    [0xFE, 0xC0, 0xC0, 0xF8, 0xC0, 0xC0, 0xC0, 0x00], // F (70)
    [0x7C, 0xC6, 0xC0, 0xCE, 0xC6, 0xC6, 0x7C, 0x00], // G (71)
    [0xC6, 0xC6, 0xC6, 0xFE, 0xC6, 0xC6, 0xC6, 0x00], // H (72)
    [0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00], // I (73)
    [0x06, 0x06, 0x06, 0x06, 0xC6, 0xC6, 0x7C, 0x00], // J (74)
    [0xC6, 0xCC, 0xD8, 0xF0, 0xD8, 0xCC, 0xC6, 0x00], // K (75)
    [0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xFE, 0x00], // L (76)
    [0xC6, 0xEE, 0xFE, 0xD6, 0xC6, 0xC6, 0xC6, 0x00], // M (77)
    [0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00], // N (78)
    [0x7C, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00], // O (79)
    [0xFC, 0xC6, 0xC6, 0xFC, 0xC0, 0xC0, 0xC0, 0x00], // P (80)
    [0x7C, 0xC6, 0xC6, 0xC6, 0xD6, 0xDE, 0x7C, 0x06], // Q (81)
    [0xFC, 0xC6, 0xC6, 0xFC, 0xD8, 0xCC, 0xC6, 0x00], // R (82)
    [0x7C, 0xC6, 0xC0, 0x7C, 0x06, 0xC6, 0x7C, 0x00], // S (83)
    [0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x00], // T (84)
    [0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00], // U (85)
    [0xC6, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x10, 0x00], // V (86)
    [0xC6, 0xC6, 0xC6, 0xD6, 0xFE, 0xEE, 0xC6, 0x00], // W (87)
    [0xC6, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0xC6, 0x00], // X (88)
    [0x66, 0x66, 0x66, 0x3C, 0x18, 0x18, 0x18, 0x00], // Y (89)
    [0xFE, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFE, 0x00], // Z (90)
    [0x3C, 0x30, 0x30, 0x30, 0x30, 0x30, 0x3C, 0x00], // [ (91)
    [0xC0, 0x60, 0x30, 0x18, 0x0C, 0x06, 0x02, 0x00], // \ (92)
    [0x3C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x3C, 0x00], // ] (93)
    [0x10, 0x38, 0x6C, 0xC6, 0x00, 0x00, 0x00, 0x00], // ^ (94)
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFE], // _ (95)
    [0x18, 0x18, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00], // ` (96)
    [0x00, 0x00, 0x7C, 0x06, 0x7E, 0xC6, 0x7E, 0x00], // a (97)
    [0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0xC6, 0xFC, 0x00], // b (98)
    [0x00, 0x00, 0x7C, 0xC6, 0xC0, 0xC6, 0x7C, 0x00], // c (99)
    [0x06, 0x06, 0x7E, 0xC6, 0xC6, 0xC6, 0x7E, 0x00], // d (100)
    [0x00, 0x00, 0x7C, 0xC6, 0xFE, 0xC0, 0x7C, 0x00], // e (101)
    [0x1C, 0x30, 0x30, 0x7C, 0x30, 0x30, 0x30, 0x00], // f (102)
    [0x00, 0x00, 0x7E, 0xC6, 0xC6, 0x7E, 0x06, 0x7C], // g (103)
    [0xC0, 0xC0, 0xFC, 0xC6, 0xC6, 0xC6, 0xC6, 0x00], // h (104)
    [0x18, 0x00, 0x38, 0x18, 0x18, 0x18, 0x3C, 0x00], // i (105)
    [0x18, 0x00, 0x38, 0x18, 0x18, 0x18, 0x18, 0x70], // j (106)
    [0xC0, 0xC0, 0xC6, 0xCC, 0xF8, 0xCC, 0xC6, 0x00], // k (107)
    [0x38, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, 0x00], // l (108)
    [0x00, 0x00, 0xEC, 0xFE, 0xD6, 0xC6, 0xC6, 0x00], // m (109)
    [0x00, 0x00, 0xFC, 0xC6, 0xC6, 0xC6, 0xC6, 0x00], // n (110)
    [0x00, 0x00, 0x7C, 0xC6, 0xC6, 0xC6, 0x7C, 0x00], // o (111)
    [0x00, 0x00, 0xFC, 0xC6, 0xC6, 0xFC, 0xC0, 0xC0], // p (112)
    [0x00, 0x00, 0x7E, 0xC6, 0xC6, 0x7E, 0x06, 0x06], // q (113)
    [0x00, 0x00, 0xDC, 0xE6, 0xC0, 0xC0, 0xC0, 0x00], // r (114)
    [0x00, 0x00, 0x7E, 0xC0, 0x7C, 0x06, 0xFC, 0x00], // s (115)
    [0x30, 0x30, 0x7C, 0x30, 0x30, 0x30, 0x1C, 0x00], // t (116)
    [0x00, 0x00, 0xC6, 0xC6, 0xC6, 0xC6, 0x7E, 0x00], // u (117)
    [0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00], // v (118)
    [0x00, 0x00, 0xC6, 0xC6, 0xD6, 0xFE, 0x6C, 0x00], // w (119)
    [0x00, 0x00, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0x00], // x (120)
    [0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x7E, 0x06, 0x7C], // y (121)
    [0x00, 0x00, 0xFE, 0x0C, 0x38, 0x60, 0xFE, 0x00], // z (122)
    [0x0E, 0x18, 0x18, 0x70, 0x18, 0x18, 0x0E, 0x00], // { (123)
    [0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x00], // | (124)
    [0x70, 0x18, 0x18, 0x0E, 0x18, 0x18, 0x70, 0x00], // } (125)
    [0x72, 0x9C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ~ (126)
];

/// Bitmap rows for a character; anything outside printable ASCII maps to '?'
#[inline]
pub fn glyph(ch: char) -> &'static [u8; 8] {
    let code = ch as u32;
    let index = if (FIRST_CHAR..=LAST_CHAR).contains(&code) {
        code - FIRST_CHAR
    } else {
        '?' as u32 - FIRST_CHAR
    };
    &FONT_8X8[index as usize]
}

/// Whether the glyph bit at (col, row) is lit
#[inline]
pub fn glyph_bit(ch: char, col: u32, row: u32) -> bool {
    if col >= GLYPH_WIDTH || row >= GLYPH_HEIGHT {
        return false;
    }
    (glyph(ch)[row as usize] >> (7 - col)) & 1 != 0
}

/// Pixel width of a string drawn at the given integer scale
pub fn text_width_scaled(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_WIDTH * scale.max(1)
}

/// Draw one character as `scale`x`scale` blocks (bounds checked)
pub fn draw_char_scaled(buffer: &mut PixelBuffer, x: i32, y: i32, ch: char, scale: u32, color: u32) {
    let scale = scale.max(1);
    let rows = glyph(ch);
    for (row, &bits) in rows.iter().enumerate() {
        if bits == 0 {
            continue;
        }
        for col in 0..GLYPH_WIDTH {
            if (bits >> (7 - col)) & 1 != 0 {
                buffer.fill_rect(
                    x + (col * scale) as i32,
                    y + (row as u32 * scale) as i32,
                    scale,
                    scale,
                    color,
                );
            }
        }
    }
}

/// Draw a string left to right starting at (x, y)
pub fn draw_text_scaled(buffer: &mut PixelBuffer, x: i32, y: i32, text: &str, scale: u32, color: u32) {
    let advance = (GLYPH_WIDTH * scale.max(1)) as i32;
    let mut cx = x;
    for ch in text.chars() {
        if cx >= buffer.width() as i32 {
            break;
        }
        if cx + advance > 0 {
            draw_char_scaled(buffer, cx, y, ch, scale, color);
        }
        cx += advance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_chars_fall_back_to_question_mark() {
        assert_eq!(glyph('\u{263A}'), glyph('?'));
        assert_eq!(glyph('\n'), glyph('?'));
    }

    #[test]
    fn test_space_is_blank() {
        assert!(glyph(' ').iter().all(|&row| row == 0));
    }

    #[test]
    fn test_text_width_scales() {
        assert_eq!(text_width_scaled("ABC", 1), 24);
        assert_eq!(text_width_scaled("ABC", 3), 72);
        assert_eq!(text_width_scaled("", 2), 0);
    }

    #[test]
    fn test_draw_text_clips_at_edges() {
        let mut buffer = PixelBuffer::with_size(10, 10);
        draw_text_scaled(&mut buffer, -4, -4, "HELLO", 2, 0xFFFFFFFF);
        assert_eq!(buffer.as_slice().len(), 100);
    }
}
