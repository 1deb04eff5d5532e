//! Scene data model for the Ember renderer.
//!
//! The render orchestrator treats the scene as an opaque, ordered sequence
//! of drawable batches; this crate provides that sequence plus the
//! procedural demo content that feeds it.

mod batch;
mod geometry;

pub use batch::{DrawBatch, Scene, TextureIndices};
pub use geometry::{cube_mesh, plane_mesh};
