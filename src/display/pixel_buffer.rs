use crate::util::{pack_rgb, unpack, OPAQUE_BLACK};

// ============================================================================
// PixelBuffer
// ============================================================================

/// Packed 32-bit pixel grid for software rendering.
///
/// Every pixel reads `0xAABBGGRR`; on little-endian targets that is the
/// byte sequence R, G, B, A, which SDL uploads as `ABGR8888`.
/// `pixels.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Opaque black buffer. Zero dimensions are clamped to 1.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::filled(width, height, OPAQUE_BLACK)
    }

    /// Fully transparent buffer, used for the overlay layer
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    fn filled(width: u32, height: u32, color: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            pixels: vec![color; width as usize * height as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Fill every pixel with a packed color
    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Clear to an opaque solid color
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        self.fill(pack_rgb(r, g, b));
    }

    /// Set a single pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if self.in_bounds(x, y) {
            let idx = self.index(x as u32, y as u32);
            self.pixels[idx] = color;
        }
    }

    /// Read a pixel (bounds checked)
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        if self.in_bounds(x, y) {
            Some(self.pixels[self.index(x as u32, y as u32)])
        } else {
            None
        }
    }

    /// Draw a horizontal line (inclusive endpoints)
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, color: u32) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }
        let row = self.index(0, y as u32);
        self.pixels[row + start as usize..=row + end as usize].fill(color);
    }

    /// Fill an axis-aligned rectangle (clipped)
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: u32) {
        if w == 0 {
            return;
        }
        for row in y..y + h as i32 {
            self.hline(x, x + w as i32 - 1, row, color);
        }
    }

    /// Filled disc with radius in pixels (clipped)
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        if radius <= 0 {
            self.set_pixel(cx, cy, color);
            return;
        }
        let r2 = radius * radius;
        for dy in -radius..=radius {
            let span = ((r2 - dy * dy) as f32).sqrt() as i32;
            self.hline(cx - span, cx + span, cy + dy, color);
        }
    }

    /// Darken every pixel: RGB multiplied by `factor`, alpha forced opaque.
    /// This is the trail/persistence pass, it replaces a clear.
    pub fn fade(&mut self, factor: f32) {
        self.fade_rgb(factor, factor, factor);
    }

    /// Per-channel darkening (warm/cool tinted trails)
    pub fn fade_rgb(&mut self, fr: f32, fg: f32, fb: f32) {
        // 8.8 fixed point: shift instead of float multiply per channel
        let fr = (fr.clamp(0.0, 1.0) * 256.0) as u32;
        let fg = (fg.clamp(0.0, 1.0) * 256.0) as u32;
        let fb = (fb.clamp(0.0, 1.0) * 256.0) as u32;

        for px in &mut self.pixels {
            let c = *px;
            let r = ((c & 0xFF) * fr) >> 8;
            let g = (((c >> 8) & 0xFF) * fg) >> 8;
            let b = (((c >> 16) & 0xFF) * fb) >> 8;
            *px = OPAQUE_BLACK | (b.min(255) << 16) | (g.min(255) << 8) | r.min(255);
        }
    }

    /// Separable box blur using a sliding window. O(width*height) regardless of radius.
    /// Clamps at edges (repeats border pixels). Blurs RGB, keeps each pixel's alpha.
    pub fn box_blur(&mut self, radius: u32) {
        if radius == 0 {
            return;
        }
        let w = self.width as i32;
        let h = self.height as i32;
        let r = radius as i32;
        let div = 2 * radius + 1;

        let mut temp = self.pixels.clone();

        let sum_into = |acc: &mut [u32; 3], c: u32, sign: i32| {
            let (cr, cg, cb, _) = unpack(c);
            for (slot, v) in acc.iter_mut().zip([cr, cg, cb]) {
                *slot = (*slot as i32 + sign * v as i32) as u32;
            }
        };
        let average = |acc: &[u32; 3], keep: u32| {
            (keep & 0xFF00_0000) | ((acc[2] / div) << 16) | ((acc[1] / div) << 8) | (acc[0] / div)
        };

        // Horizontal pass: pixels -> temp
        for y in 0..h {
            let row = (y * w) as usize;
            let mut acc = [0u32; 3];
            for i in -r..=r {
                sum_into(&mut acc, self.pixels[row + i.clamp(0, w - 1) as usize], 1);
            }
            temp[row] = average(&acc, self.pixels[row]);

            for x in 1..w {
                let leave = (x - 1 - r).clamp(0, w - 1) as usize;
                let enter = (x + r).clamp(0, w - 1) as usize;
                sum_into(&mut acc, self.pixels[row + leave], -1);
                sum_into(&mut acc, self.pixels[row + enter], 1);
                temp[row + x as usize] = average(&acc, self.pixels[row + x as usize]);
            }
        }

        // Vertical pass: temp -> pixels
        for x in 0..w {
            let col = x as usize;
            let stride = w as usize;
            let mut acc = [0u32; 3];
            for i in -r..=r {
                sum_into(&mut acc, temp[i.clamp(0, h - 1) as usize * stride + col], 1);
            }
            self.pixels[col] = average(&acc, temp[col]);

            for y in 1..h {
                let leave = (y - 1 - r).clamp(0, h - 1) as usize;
                let enter = (y + r).clamp(0, h - 1) as usize;
                sum_into(&mut acc, temp[leave * stride + col], -1);
                sum_into(&mut acc, temp[enter * stride + col], 1);
                let idx = y as usize * stride + col;
                self.pixels[idx] = average(&acc, temp[idx]);
            }
        }
    }

    /// Packed pixels, row-major
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable packed pixels for effects that write whole rows
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Raw bytes for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: u32 has no padding and a stricter alignment than u8; the
        // byte view covers exactly the same allocation and borrows `self`.
        unsafe {
            std::slice::from_raw_parts(
                self.pixels.as_ptr().cast::<u8>(),
                self.pixels.len() * std::mem::size_of::<u32>(),
            )
        }
    }

    /// Row pitch in bytes
    #[inline]
    pub fn pitch(&self) -> usize {
        self.width as usize * std::mem::size_of::<u32>()
    }
}
