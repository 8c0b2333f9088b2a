//! Playback engine
//!
//! Owns the effects, the transitions, the overlay scroller and the pixel
//! buffers, and advances all of them once per display frame. The engine is
//! driven entirely by `tick(now, presenter)`, so tests can run it against a
//! recording presenter with synthetic instants.

use crate::config::RemoteConfig;
use crate::display::{PixelBuffer, PixelSurface, Presenter};
use crate::effects::{self, Effect};
use crate::overlay::{self, TextScroller};
use crate::transitions::{self, Transition};
use crate::util::{smoothstep, Rng, OPAQUE_BLACK};
use anyhow::bail;
use log::{debug, info, warn};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Longest step the animation advances in one frame, in seconds
pub const MAX_DELTA: f32 = 0.1;
/// Quiet period after the last resize signal before reallocating
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

pub const DEFAULT_EFFECT_SECS: f32 = 20.0;
pub const DEFAULT_TRANSITION_SECS: f32 = 2.5;
pub const DEFAULT_RESOLUTION_SCALE: f32 = 0.5;

// ============================================================================
// Frame clock
// ============================================================================

/// Turns wall-clock instants into clamped frame deltas
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick, clamped to `MAX_DELTA`.
    /// The first tick after construction or `rebaseline` reads 0.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt.min(MAX_DELTA)
    }

    /// Forget the previous tick so a pause does not inflate the next delta
    pub fn rebaseline(&mut self) {
        self.last = None;
    }
}

// ============================================================================
// Resize debouncer
// ============================================================================

/// Single deferred resize; every request re-arms it
#[derive(Debug)]
pub struct ResizeDebouncer {
    delay: Duration,
    /// Deadline (`None` = due now) and the viewport to apply
    pending: Option<(Option<Instant>, (u32, u32))>,
}

impl ResizeDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending resize with this one, due after the delay
    pub fn request(&mut self, now: Instant, viewport: (u32, u32)) {
        self.pending = Some((Some(now + self.delay), viewport));
    }

    /// Replace any pending resize with one due on the next poll
    pub fn request_immediate(&mut self, viewport: (u32, u32)) {
        self.pending = Some((None, viewport));
    }

    /// The viewport to apply, once its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<(u32, u32)> {
        match self.pending {
            Some((deadline, viewport)) if deadline.map_or(true, |d| now >= d) => {
                self.pending = None;
                Some(viewport)
            },
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Where the rotation currently stands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Playback {
    /// Showing the current effect straight into the surface
    Idle,
    /// Blending the current effect into `to` with `transitions[transition]`
    Transitioning {
        to: usize,
        progress: f32,
        transition: usize,
    },
}

/// One live effect and the configuration type it was built from
struct Slot {
    kind: String,
    effect: Box<dyn Effect>,
}

pub struct Engine {
    slots: Vec<Slot>,
    transitions: Vec<Box<dyn Transition>>,
    scroller: Option<TextScroller>,
    overlay_layer: PixelBuffer,
    surface: PixelSurface,
    scratch_a: PixelBuffer,
    scratch_b: PixelBuffer,

    current: usize,
    playback: Playback,
    effect_timer: f32,
    effect_duration: f32,
    transition_duration: f32,

    clock: FrameClock,
    resize: ResizeDebouncer,
    visible: bool,
    time: f32,
    rng: Rng,
}

impl Engine {
    /// Build from the enabled, recognized effects of `config`, in list order.
    /// Fails when none remain.
    pub fn new(config: &RemoteConfig, viewport_w: u32, viewport_h: u32) -> anyhow::Result<Self> {
        let mut slots = Vec::new();
        for entry in config.enabled_effects() {
            match effects::create(&entry.kind, &entry.params) {
                Some(effect) => slots.push(Slot {
                    kind: entry.kind.clone(),
                    effect,
                }),
                None => warn!("Unknown effect type '{}', skipping", entry.kind),
            }
        }
        if slots.is_empty() {
            bail!("no enabled effects in configuration");
        }

        let general = &config.general;
        let scale = general.scale().unwrap_or(DEFAULT_RESOLUTION_SCALE);
        let surface = PixelSurface::new(viewport_w, viewport_h, scale);
        let (w, h) = (surface.width(), surface.height());

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(1, |d| d.as_nanos() as u64);

        let mut engine = Self {
            slots,
            transitions: transitions::all(),
            scroller: overlay::from_config(config),
            overlay_layer: PixelBuffer::transparent(w, h),
            surface,
            scratch_a: PixelBuffer::with_size(w, h),
            scratch_b: PixelBuffer::with_size(w, h),
            current: 0,
            playback: Playback::Idle,
            effect_timer: 0.0,
            effect_duration: general.effect_secs().unwrap_or(DEFAULT_EFFECT_SECS),
            transition_duration: general.transition_secs().unwrap_or(DEFAULT_TRANSITION_SECS),
            clock: FrameClock::new(),
            resize: ResizeDebouncer::new(RESIZE_DEBOUNCE),
            visible: true,
            time: 0.0,
            rng: Rng::new(seed),
        };
        engine.init_all();

        let names: Vec<&str> = engine.slots.iter().map(|s| s.effect.name()).collect();
        info!(
            "Engine ready at {}x{} with {} effects: {}",
            w,
            h,
            names.len(),
            names.join(", ")
        );
        Ok(engine)
    }

    fn init_all(&mut self) {
        let (w, h) = (self.surface.width(), self.surface.height());
        for slot in &mut self.slots {
            slot.effect.init(w, h);
        }
        if let Some(scroller) = &mut self.scroller {
            scroller.init(w, h);
        }
    }

    /// Reallocate every buffer for a new viewport and hard-reset the effects
    fn reallocate(&mut self, viewport_w: u32, viewport_h: u32) {
        let (w, h) = self.surface.resize(viewport_w, viewport_h);
        self.scratch_a = PixelBuffer::with_size(w, h);
        self.scratch_b = PixelBuffer::with_size(w, h);
        self.overlay_layer = PixelBuffer::transparent(w, h);
        self.init_all();
        debug!("Resized to {}x{} (viewport {}x{})", w, h, viewport_w, viewport_h);
    }

    /// Advance one frame and present it
    pub fn tick(&mut self, now: Instant, presenter: &mut dyn Presenter) -> anyhow::Result<()> {
        if !self.visible {
            return Ok(());
        }
        if let Some((vw, vh)) = self.resize.poll(now) {
            self.reallocate(vw, vh);
        }

        let dt = self.clock.tick(now);
        self.time += dt;

        if let Some(scroller) = &mut self.scroller {
            scroller.update(dt);
        }

        match self.playback {
            Playback::Transitioning {
                to,
                progress,
                transition,
            } => {
                let progress = progress + dt / self.transition_duration;
                if progress >= 1.0 {
                    self.finish_transition(to);
                    self.render_current(dt);
                } else {
                    self.playback = Playback::Transitioning {
                        to,
                        progress,
                        transition,
                    };
                    self.render_blend(to, transition, progress, dt);
                }
            },
            Playback::Idle => {
                self.effect_timer += dt;
                if self.effect_timer >= self.effect_duration {
                    let to = (self.current + 1) % self.slots.len();
                    if to != self.current {
                        self.begin_transition(to);
                    } else {
                        self.effect_timer = 0.0;
                    }
                }
                self.render_current(dt);
            },
        }

        self.surface.present(presenter)?;
        if let Some(scroller) = &self.scroller {
            scroller.render(&mut self.overlay_layer);
            presenter.draw_overlay(&self.overlay_layer)?;
        }
        presenter.finish()
    }

    fn render_current(&mut self, dt: f32) {
        let effect = &mut self.slots[self.current].effect;
        effect.update(self.time, dt);
        effect.render(self.surface.buffer_mut());
    }

    fn render_blend(&mut self, to: usize, transition: usize, progress: f32, dt: f32) {
        let time = self.time;
        {
            let from = &mut self.slots[self.current].effect;
            from.update(time, dt);
            from.render(&mut self.scratch_a);
        }
        {
            let next = &mut self.slots[to].effect;
            next.update(time, dt);
            next.render(&mut self.scratch_b);
        }
        self.transitions[transition].apply(
            &self.scratch_a,
            &self.scratch_b,
            self.surface.buffer_mut(),
            smoothstep(progress),
        );
    }

    fn begin_transition(&mut self, to: usize) {
        self.scratch_a.fill(OPAQUE_BLACK);
        self.scratch_b.fill(OPAQUE_BLACK);
        let transition = self.rng.index(self.transitions.len());
        self.effect_timer = 0.0;
        self.playback = Playback::Transitioning {
            to,
            progress: 0.0,
            transition,
        };
        debug!(
            "{} -> {} via {}",
            self.slots[self.current].effect.name(),
            self.slots[to].effect.name(),
            self.transitions[transition].name()
        );
    }

    fn finish_transition(&mut self, to: usize) {
        self.current = to;
        self.playback = Playback::Idle;
        self.effect_timer = 0.0;
        info!("Now showing {}", self.slots[to].effect.name());
    }

    /// Step `direction` effects from the current target, wrapping.
    /// An in-flight transition snaps to its target first.
    fn switch(&mut self, direction: isize) {
        if let Playback::Transitioning { to, .. } = self.playback {
            self.current = to;
            self.playback = Playback::Idle;
        }
        let n = self.slots.len() as isize;
        let target = (self.current as isize + direction).rem_euclid(n) as usize;
        if target == self.current {
            return;
        }
        self.begin_transition(target);
    }

    /// Manual advance to the next effect
    pub fn next(&mut self) {
        self.switch(1);
    }

    /// Manual step back to the previous effect
    pub fn previous(&mut self) {
        self.switch(-1);
    }

    /// Pause or resume ticking. Resuming re-baselines the frame clock.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.clock.rebaseline();
            debug!("Resumed");
        } else {
            debug!("Paused while hidden");
        }
    }

    /// Note a viewport change; the reallocation waits for the burst to settle
    pub fn on_resize(&mut self, now: Instant, viewport_w: u32, viewport_h: u32) {
        self.resize.request(now, (viewport_w, viewport_h));
    }

    /// Hot-apply a configuration snapshot.
    ///
    /// Durations and per-type effect parameters are merged into the live
    /// objects; the effect list, the current index and the timers stay put.
    /// A changed resolution scale reallocates on the next tick.
    pub fn apply_config(&mut self, config: &RemoteConfig) {
        let general = &config.general;
        if let Some(secs) = general.effect_secs() {
            self.effect_duration = secs;
        }
        if let Some(secs) = general.transition_secs() {
            self.transition_duration = secs;
        }
        if let Some(scale) = general.scale() {
            if scale != self.surface.scale() {
                self.surface.set_scale(scale);
                self.resize.request_immediate(self.surface.viewport());
            }
        }

        for slot in &mut self.slots {
            if let Some(params) = config.effect_params(&slot.kind) {
                slot.effect.apply_config(params);
            }
        }

        if let Some(ticker) = config.ticker() {
            match &mut self.scroller {
                Some(scroller) => {
                    if let Some(speed) = ticker.speed.filter(|s| s.is_finite()) {
                        scroller.set_speed(speed);
                    }
                    if let Some(content) = &ticker.content {
                        scroller.set_message(content.as_str());
                    }
                },
                None => {
                    if let Some(mut scroller) = overlay::from_config(config) {
                        scroller.init(self.surface.width(), self.surface.height());
                        self.scroller = Some(scroller);
                    }
                },
            }
        }

        info!(
            "Configuration applied: {:.1}s per effect, {:.2}s transitions",
            self.effect_duration, self.transition_duration
        );
    }

    /// Shut down, releasing the surface and scratch buffers
    pub fn stop(self) {
        info!("Engine stopped after {:.1}s", self.time);
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn effect_count(&self) -> usize {
        self.slots.len()
    }

    pub fn effect_timer(&self) -> f32 {
        self.effect_timer
    }

    pub fn effect_duration(&self) -> f32 {
        self.effect_duration
    }

    pub fn transition_duration(&self) -> f32 {
        self.transition_duration
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Internal resolution of the live surface
    pub fn size(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    pub fn frame(&self) -> &PixelBuffer {
        self.surface.buffer()
    }

    pub fn scroller(&self) -> Option<&TextScroller> {
        self.scroller.as_ref()
    }
}
