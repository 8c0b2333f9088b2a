//! Rotating software-rendered demo effects with timed transitions and a
//! scrolling text overlay.

pub mod config;
pub mod control;
pub mod display;
pub mod effects;
pub mod engine;
pub mod math3d;
pub mod mqtt;
pub mod overlay;
pub mod palette;
pub mod particles;
pub mod transitions;
pub mod util;
