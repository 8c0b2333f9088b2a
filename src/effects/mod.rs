mod fire;
mod matrix_rain;
mod metaballs;
mod particles;
mod plasma;
mod rotozoom;
mod starfield;
mod tunnel;
mod voxel_landscape;
mod wireframe_cube;

pub use fire::Fire;
pub use matrix_rain::MatrixRain;
pub use metaballs::Metaballs;
pub use particles::Fountain;
pub use plasma::Plasma;
pub use rotozoom::Rotozoom;
pub use starfield::Starfield;
pub use tunnel::Tunnel;
pub use voxel_landscape::VoxelLandscape;
pub use wireframe_cube::WireframeCube;

use crate::config::EffectParams;
use crate::display::PixelBuffer;

/// Effect type names accepted in configuration, in registry order
pub const EFFECT_TYPES: [&str; 10] = [
    "plasma",
    "starfield",
    "fire",
    "tunnel",
    "metaballs",
    "rotozoom",
    "voxel-landscape",
    "wireframe-cube",
    "particles",
    "matrix-rain",
];

/// Trait for all demoscene-style effects
///
/// An effect owns its private state sized to the last `init` call. It never
/// assumes the buffer handed to `render` is the one it drew into last frame:
/// during a transition it renders into an engine scratch buffer instead.
pub trait Effect {
    /// (Re)allocate state for `width` x `height` and reseed. Leaves the
    /// effect ready for its very first frame.
    fn init(&mut self, width: u32, height: u32);

    /// Advance by `dt` seconds. `time` is engine time since start.
    fn update(&mut self, time: f32, dt: f32);

    /// Write one full frame of opaque pixels into `buffer`
    fn render(&mut self, buffer: &mut PixelBuffer);

    /// Effect name for logs
    fn name(&self) -> &str;

    /// Merge named numeric parameters without resetting animation phase.
    /// Parameters that are absent keep their current value.
    fn apply_config(&mut self, _params: &EffectParams) {}
}

/// Build an effect from its configuration type name.
/// Unknown names return `None` and are skipped by the caller.
pub fn create(kind: &str, params: &EffectParams) -> Option<Box<dyn Effect>> {
    let effect: Box<dyn Effect> = match kind {
        "plasma" => Box::new(Plasma::new(params)),
        "starfield" => Box::new(Starfield::new(params)),
        "fire" => Box::new(Fire::new(params)),
        "tunnel" => Box::new(Tunnel::new(params)),
        "metaballs" => Box::new(Metaballs::new(params)),
        "rotozoom" => Box::new(Rotozoom::new(params)),
        "voxel-landscape" => Box::new(VoxelLandscape::new(params)),
        "wireframe-cube" => Box::new(WireframeCube::new(params)),
        "particles" => Box::new(Fountain::new(params)),
        "matrix-rain" => Box::new(MatrixRain::new(params)),
        _ => return None,
    };
    Some(effect)
}

/// Read a numeric parameter, falling back to `current`
pub(crate) fn param_or(params: &EffectParams, key: &str, current: f32) -> f32 {
    params.number(key).unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::OPAQUE_BLACK;

    fn build(kind: &str) -> Box<dyn Effect> {
        create(kind, &EffectParams::default()).expect("registered effect")
    }

    fn run_frames(effect: &mut dyn Effect, buffer: &mut PixelBuffer, frames: usize) {
        for i in 0..frames {
            let time = i as f32 / 60.0;
            effect.update(time, 1.0 / 60.0);
            effect.render(buffer);
        }
    }

    #[test]
    fn test_every_registered_type_builds() {
        for kind in EFFECT_TYPES {
            assert!(create(kind, &EffectParams::default()).is_some(), "{kind}");
        }
        assert!(create("mandelbrot", &EffectParams::default()).is_none());
        assert!(create("", &EffectParams::default()).is_none());
    }

    #[test]
    fn test_render_is_fully_opaque_at_odd_sizes() {
        let sizes = [(1, 1), (2, 3), (7, 5), (33, 17), (64, 48)];
        for kind in EFFECT_TYPES {
            for &(w, h) in &sizes {
                let mut effect = build(kind);
                effect.init(w, h);
                let mut buffer = PixelBuffer::with_size(w, h);
                run_frames(effect.as_mut(), &mut buffer, 3);
                assert_eq!(buffer.len(), (w * h) as usize, "{kind} {w}x{h}");
                assert!(
                    buffer.as_slice().iter().all(|&c| c >> 24 == 0xFF),
                    "{kind} left a transparent pixel at {w}x{h}"
                );
            }
        }
    }

    #[test]
    fn test_render_into_foreign_buffer_stays_opaque() {
        // A scratch buffer may hold another effect's frame or plain black
        for kind in EFFECT_TYPES {
            let mut effect = build(kind);
            effect.init(40, 30);
            let mut buffer = PixelBuffer::with_size(40, 30);
            buffer.fill(0xFF12_3456);
            run_frames(effect.as_mut(), &mut buffer, 2);
            assert!(buffer.as_slice().iter().all(|&c| c >> 24 == 0xFF), "{kind}");
        }
    }

    #[test]
    fn test_reinit_replays_fresh_instance() {
        for kind in EFFECT_TYPES {
            let mut fresh = build(kind);
            fresh.init(48, 32);
            let mut expected = PixelBuffer::with_size(48, 32);
            run_frames(fresh.as_mut(), &mut expected, 4);

            let mut reused = build(kind);
            reused.init(20, 20);
            let mut scratch = PixelBuffer::with_size(20, 20);
            run_frames(reused.as_mut(), &mut scratch, 10);
            reused.init(48, 32);
            let mut actual = PixelBuffer::with_size(48, 32);
            run_frames(reused.as_mut(), &mut actual, 4);

            assert_eq!(actual, expected, "{kind} carried state across init");
        }
    }

    #[test]
    fn test_apply_config_ignores_unknown_and_non_numeric() {
        let params: EffectParams =
            serde_json::from_str(r#"{ "speed": "fast", "bogus": 3 }"#).expect("params");
        for kind in EFFECT_TYPES {
            let mut patched = build(kind);
            patched.init(24, 16);
            patched.apply_config(&params);
            let mut a = PixelBuffer::with_size(24, 16);
            run_frames(patched.as_mut(), &mut a, 3);

            let mut plain = build(kind);
            plain.init(24, 16);
            let mut b = PixelBuffer::with_size(24, 16);
            run_frames(plain.as_mut(), &mut b, 3);

            assert_eq!(a, b, "{kind}");
        }
    }

    #[test]
    fn test_blank_buffer_is_opaque_black() {
        let buffer = PixelBuffer::with_size(3, 3);
        assert!(buffer.as_slice().iter().all(|&c| c == OPAQUE_BLACK));
    }
}
