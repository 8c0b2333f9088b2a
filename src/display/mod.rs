pub mod font;
mod pixel_buffer;
mod surface;

pub use pixel_buffer::PixelBuffer;
pub use surface::{internal_size, PixelSurface};

use anyhow::{anyhow, Context};
use log::{debug, info};
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{BlendMode, Canvas, Texture, TextureCreator};
use sdl2::video::{FullscreenType, Window, WindowContext};
use sdl2::{EventPump, Sdl};

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

/// Where finished frames go.
///
/// A frame is `blit` (main grid, upscaled), then `draw_overlay` (text layer
/// on top), then `finish`. The engine only talks to the display through this.
pub trait Presenter {
    fn blit(&mut self, frame: &PixelBuffer) -> anyhow::Result<()>;
    fn draw_overlay(&mut self, layer: &PixelBuffer) -> anyhow::Result<()>;
    fn finish(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(Keycode),
    /// New drawable size in device pixels
    Resized { width: u32, height: u32 },
    Hidden,
    Shown,
}

pub struct Display {
    context: Sdl,
    canvas: Canvas<Window>,
    event_pump: EventPump,
}

/// Streaming textures matching the engine's internal resolution
pub struct RenderTarget<'a> {
    creator: &'a TextureCreator<WindowContext>,
    frame: Texture<'a>,
    overlay: Texture<'a>,
    width: u32,
    height: u32,
}

impl Display {
    /// Open the window. Any SDL failure here is fatal for the caller.
    pub fn with_options(
        title: &str,
        width: u32,
        height: u32,
        vsync: bool,
        fullscreen: bool,
    ) -> anyhow::Result<(Self, TextureCreator<WindowContext>)> {
        let sdl_context = sdl2::init().map_err(anyhow::Error::msg).context("SDL init")?;
        let video_subsystem = sdl_context
            .video()
            .map_err(anyhow::Error::msg)
            .context("SDL video subsystem")?;

        // Nearest-neighbour upscaling keeps the chunky pixels
        sdl2::hint::set("SDL_RENDER_SCALE_QUALITY", "0");

        let mut builder = video_subsystem.window(title, width, height);
        builder.position_centered().resizable().allow_highdpi();
        if fullscreen {
            builder.fullscreen_desktop();
        }
        let window = builder.build().context("creating window")?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder.build().context("creating canvas")?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context
            .event_pump()
            .map_err(anyhow::Error::msg)
            .context("SDL event pump")?;

        if fullscreen {
            sdl_context.mouse().show_cursor(false);
        }

        Ok((
            Self {
                context: sdl_context,
                canvas,
                event_pump,
            },
            texture_creator,
        ))
    }

    /// Drawable size in device pixels
    pub fn viewport(&self) -> (u32, u32) {
        self.canvas
            .output_size()
            .unwrap_or_else(|_| self.canvas.window().size())
    }

    pub fn toggle_fullscreen(&mut self) -> anyhow::Result<()> {
        let window = self.canvas.window_mut();
        let next = match window.fullscreen_state() {
            FullscreenType::Off => FullscreenType::Desktop,
            _ => FullscreenType::Off,
        };
        window.set_fullscreen(next).map_err(anyhow::Error::msg)?;
        self.context.mouse().show_cursor(next == FullscreenType::Off);
        info!("Fullscreen {}", if next == FullscreenType::Off { "off" } else { "on" });
        Ok(())
    }

    /// Drain pending events without blocking
    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.event_pump.poll_event() {
            if let Some(mapped) = map_event(event) {
                events.push(mapped);
            }
        }
        events
    }

    /// Block until one event arrives or the timeout passes (used while hidden)
    pub fn wait_event(&mut self, timeout_ms: u32) -> Option<InputEvent> {
        self.event_pump.wait_event_timeout(timeout_ms).and_then(map_event)
    }

    /// Presenter for one frame
    pub fn screen<'s, 'a>(&'s mut self, target: &'s mut RenderTarget<'a>) -> Screen<'s, 'a> {
        Screen {
            canvas: &mut self.canvas,
            target,
        }
    }
}

fn map_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Quit { .. } => Some(InputEvent::Quit),
        Event::KeyDown {
            keycode: Some(k),
            repeat: false,
            ..
        } => Some(InputEvent::KeyDown(k)),
        Event::Window { win_event, .. } => match win_event {
            WindowEvent::SizeChanged(w, h) => Some(InputEvent::Resized {
                width: w.max(1) as u32,
                height: h.max(1) as u32,
            }),
            WindowEvent::Hidden | WindowEvent::Minimized => Some(InputEvent::Hidden),
            WindowEvent::Shown | WindowEvent::Restored => Some(InputEvent::Shown),
            _ => None,
        },
        _ => None,
    }
}

impl<'a> RenderTarget<'a> {
    pub fn with_size(
        creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let (frame, overlay) = Self::create_textures(creator, width, height)?;
        Ok(Self {
            creator,
            frame,
            overlay,
            width,
            height,
        })
    }

    fn create_textures(
        creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<(Texture<'a>, Texture<'a>)> {
        let frame = creator
            .create_texture_streaming(PixelFormatEnum::ABGR8888, width, height)
            .context("creating frame texture")?;
        let mut overlay = creator
            .create_texture_streaming(PixelFormatEnum::ABGR8888, width, height)
            .context("creating overlay texture")?;
        // Light-only compositing: black adds nothing, text brightens the frame
        overlay.set_blend_mode(BlendMode::Add);
        Ok((frame, overlay))
    }

    /// Recreate both textures when the engine's resolution changed
    fn ensure_size(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if self.width == width && self.height == height {
            return Ok(());
        }
        let (frame, overlay) = Self::create_textures(self.creator, width, height)?;
        self.frame = frame;
        self.overlay = overlay;
        self.width = width;
        self.height = height;
        debug!("Render target resized to {}x{}", width, height);
        Ok(())
    }
}

/// One frame's view of the window: canvas plus textures
pub struct Screen<'s, 'a> {
    canvas: &'s mut Canvas<Window>,
    target: &'s mut RenderTarget<'a>,
}

impl Presenter for Screen<'_, '_> {
    fn blit(&mut self, frame: &PixelBuffer) -> anyhow::Result<()> {
        self.target.ensure_size(frame.width(), frame.height())?;
        self.target
            .frame
            .update(None, frame.as_bytes(), frame.pitch())
            .map_err(|e| anyhow!("frame upload: {e}"))?;
        self.canvas.set_draw_color(Color::RGB(0, 0, 0));
        self.canvas.clear();
        self.canvas
            .copy(&self.target.frame, None, None)
            .map_err(anyhow::Error::msg)
    }

    fn draw_overlay(&mut self, layer: &PixelBuffer) -> anyhow::Result<()> {
        if layer.width() != self.target.width || layer.height() != self.target.height {
            return Ok(());
        }
        self.target
            .overlay
            .update(None, layer.as_bytes(), layer.pitch())
            .map_err(|e| anyhow!("overlay upload: {e}"))?;
        self.canvas
            .copy(&self.target.overlay, None, None)
            .map_err(anyhow::Error::msg)
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.canvas.present();
        Ok(())
    }
}
