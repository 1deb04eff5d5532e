//! Frame pacing, resource-state sequencing and pass orchestration.
//!
//! This crate is the synchronization core of the renderer:
//! - [`FramePacer`] bounds in-flight frames and drives
//!   acquire/submit/present
//! - [`passes`] records the fixed pass order, issuing layout transitions
//!   through the tracked images
//! - [`Renderer`] ties it together and owns resource lifetimes

pub mod environment;
pub mod frame_pacer;
pub mod passes;
pub mod renderer;
pub mod targets;
pub mod uniforms;

pub use frame_pacer::{FrameContext, FramePacer, FrameStart};
pub use renderer::{Renderer, RendererConfig};

/// Number of frames that may be in flight simultaneously.
pub const PACED_FRAMES: usize = 2;
