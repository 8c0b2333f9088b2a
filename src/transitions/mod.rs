//! Stateless compositors that blend an outgoing and an incoming frame

mod crossfade;
mod wipe;

pub use crossfade::Crossfade;
pub use wipe::Wipe;

use crate::display::PixelBuffer;

/// Blend `a` (outgoing) and `b` (incoming) into `out`.
///
/// `progress` 0 reproduces `a` exactly and 1 reproduces `b` exactly. All three
/// buffers share one size; any excess in a longer buffer is left alone.
pub trait Transition {
    fn apply(&self, a: &PixelBuffer, b: &PixelBuffer, out: &mut PixelBuffer, progress: f32);

    fn name(&self) -> &str;
}

/// Every available transition; the engine picks one at random per cut
pub fn all() -> Vec<Box<dyn Transition>> {
    vec![Box::new(Crossfade), Box::new(Wipe)]
}

/// Endpoint short-circuit shared by every transition.
/// Returns true when `out` was filled with one side verbatim.
fn copy_endpoint(a: &PixelBuffer, b: &PixelBuffer, out: &mut PixelBuffer, progress: f32) -> bool {
    let src = if progress.is_nan() || progress <= 0.0 {
        a
    } else if progress >= 1.0 {
        b
    } else {
        return false;
    };
    let n = src.len().min(out.len());
    out.as_mut_slice()[..n].copy_from_slice(&src.as_slice()[..n]);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{pack_rgb, unpack};
    use proptest::prelude::*;

    fn buffer_from(colors: &[u32], width: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::with_size(width, colors.len() as u32 / width);
        buffer.as_mut_slice().copy_from_slice(colors);
        buffer
    }

    fn opaque_colors(len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(any::<u32>().prop_map(|c| c | 0xFF00_0000), len)
    }

    #[test]
    fn test_all_lists_both() {
        let names: Vec<String> = all().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, ["Crossfade", "Wipe"]);
    }

    #[test]
    fn test_endpoints_copy_verbatim() {
        let a = buffer_from(&[pack_rgb(10, 20, 30); 12], 4);
        let b = buffer_from(&[pack_rgb(200, 100, 0); 12], 4);
        for transition in all() {
            let mut out = PixelBuffer::with_size(4, 3);
            transition.apply(&a, &b, &mut out, 0.0);
            assert_eq!(out, a, "{} at 0", transition.name());
            transition.apply(&a, &b, &mut out, 1.0);
            assert_eq!(out, b, "{} at 1", transition.name());
            transition.apply(&a, &b, &mut out, -3.0);
            assert_eq!(out, a, "{} below 0", transition.name());
            transition.apply(&a, &b, &mut out, 7.0);
            assert_eq!(out, b, "{} above 1", transition.name());
        }
    }

    proptest! {
        #[test]
        fn endpoints_reproduce_inputs(
            a in opaque_colors(6 * 5),
            b in opaque_colors(6 * 5),
        ) {
            let a = buffer_from(&a, 6);
            let b = buffer_from(&b, 6);
            for transition in all() {
                let mut out = PixelBuffer::with_size(6, 5);
                transition.apply(&a, &b, &mut out, 0.0);
                prop_assert_eq!(&out, &a);
                transition.apply(&a, &b, &mut out, 1.0);
                prop_assert_eq!(&out, &b);
            }
        }

        #[test]
        fn crossfade_is_symmetric_under_inversion(
            a in opaque_colors(16),
            b in opaque_colors(16),
            p in 0.0f32..=1.0,
        ) {
            let a = buffer_from(&a, 4);
            let b = buffer_from(&b, 4);
            let mut forward = PixelBuffer::with_size(4, 4);
            let mut backward = PixelBuffer::with_size(4, 4);
            Crossfade.apply(&a, &b, &mut forward, p);
            Crossfade.apply(&b, &a, &mut backward, 1.0 - p);

            for (&f, &r) in forward.as_slice().iter().zip(backward.as_slice()) {
                let (fr, fg, fb, fa) = unpack(f);
                let (rr, rg, rb, ra) = unpack(r);
                prop_assert!((fr as i32 - rr as i32).abs() <= 1);
                prop_assert!((fg as i32 - rg as i32).abs() <= 1);
                prop_assert!((fb as i32 - rb as i32).abs() <= 1);
                prop_assert_eq!(fa, 0xFF);
                prop_assert_eq!(ra, 0xFF);
            }
        }

        #[test]
        fn blends_stay_between_inputs(
            a in opaque_colors(24),
            b in opaque_colors(24),
            p in 0.0f32..=1.0,
        ) {
            let a = buffer_from(&a, 6);
            let b = buffer_from(&b, 6);
            for transition in all() {
                let mut out = PixelBuffer::with_size(6, 4);
                transition.apply(&a, &b, &mut out, p);
                for ((&o, &ca), &cb) in out.as_slice().iter().zip(a.as_slice()).zip(b.as_slice()) {
                    let (or, og, ob, oa) = unpack(o);
                    let (ar, ag, ab, _) = unpack(ca);
                    let (br, bg, bb, _) = unpack(cb);
                    prop_assert_eq!(oa, 0xFF);
                    prop_assert!(or >= ar.min(br) && or <= ar.max(br));
                    prop_assert!(og >= ag.min(bg) && og <= ag.max(bg));
                    prop_assert!(ob >= ab.min(bb) && ob <= ab.max(bb));
                }
            }
        }
    }
}
