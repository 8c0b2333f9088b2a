use super::{PixelBuffer, Presenter};

/// Internal resolution for a viewport: `floor(viewport * scale)`, at least 1x1.
/// A scale outside (0, 1] or NaN is clamped into it first.
pub fn internal_size(viewport_w: u32, viewport_h: u32, scale: f32) -> (u32, u32) {
    let scale = clamp_scale(scale);
    let w = (viewport_w as f32 * scale).floor() as u32;
    let h = (viewport_h as f32 * scale).floor() as u32;
    (w.max(1), h.max(1))
}

pub(crate) fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(0.01, 1.0)
    }
}

/// The live frame: a reduced-resolution pixel grid tied to the viewport.
///
/// Resizing never edits the grid in place; it builds a new one.
pub struct PixelSurface {
    buffer: PixelBuffer,
    viewport: (u32, u32),
    scale: f32,
}

impl PixelSurface {
    pub fn new(viewport_w: u32, viewport_h: u32, scale: f32) -> Self {
        let scale = clamp_scale(scale);
        let (w, h) = internal_size(viewport_w, viewport_h, scale);
        Self {
            buffer: PixelBuffer::with_size(w, h),
            viewport: (viewport_w, viewport_h),
            scale,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Reallocate for a new viewport; returns the new internal size
    pub fn resize(&mut self, viewport_w: u32, viewport_h: u32) -> (u32, u32) {
        self.viewport = (viewport_w, viewport_h);
        let (w, h) = internal_size(viewport_w, viewport_h, self.scale);
        self.buffer = PixelBuffer::with_size(w, h);
        (w, h)
    }

    /// Change the resolution scale; the caller follows up with `resize`
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = clamp_scale(scale);
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Hand the grid to the display
    pub fn present(&self, presenter: &mut dyn Presenter) -> anyhow::Result<()> {
        presenter.blit(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_size_floors_and_clamps() {
        assert_eq!(internal_size(1920, 1080, 0.5), (960, 540));
        assert_eq!(internal_size(801, 601, 0.5), (400, 300));
        assert_eq!(internal_size(0, 0, 0.5), (1, 1));
        assert_eq!(internal_size(1, 1, 0.25), (1, 1));
        assert_eq!(internal_size(100, 100, 4.0), (100, 100));
        assert_eq!(internal_size(100, 100, f32::NAN), (100, 100));
    }

    #[test]
    fn test_resize_replaces_buffer() {
        let mut surface = PixelSurface::new(200, 100, 0.5);
        assert_eq!(surface.buffer().len(), 100 * 50);
        surface.buffer_mut().clear(255, 0, 0);

        let (w, h) = surface.resize(64, 32);
        assert_eq!((w, h), (32, 16));
        assert_eq!(surface.buffer().len(), 32 * 16);
        assert_eq!(surface.viewport(), (64, 32));
        assert!(surface.buffer().as_slice().iter().all(|&c| c == 0xFF00_0000));
    }

    #[test]
    fn test_set_scale_applies_on_next_resize() {
        let mut surface = PixelSurface::new(100, 100, 0.5);
        surface.set_scale(0.25);
        assert_eq!(surface.width(), 50);
        let (vw, vh) = surface.viewport();
        surface.resize(vw, vh);
        assert_eq!(surface.width(), 25);
    }
}
