//! Render targets and the draw pipeline.
//!
//! A [`RenderTarget`] draws vertex data into a [`RenderSurface`] through the
//! driver of its [`RenderCtx`]. Each target caches the driver state it last
//! applied and only re-issues what a draw changes.
//!
//! Convention:
//! - World geometry is mapped to the target through a [`View`](crate::coords::View).
//! - Pixel coordinates have a top-left origin, +Y down; the driver's
//!   bottom-left origin is handled when viewports and scissors are applied.

mod cache;
mod ctx;
mod drawable;
mod init;
mod pipeline;
mod registry;
mod surface;
mod target;
mod vertex;
mod vertex_array;
mod vertex_buffer;

pub use ctx::RenderCtx;
pub use drawable::Drawable;
pub use init::{GlslProfile, RenderInit};
pub use registry::{ActiveTargetRegistry, TargetId, Transition};
pub use surface::{DefaultFramebuffer, RenderSurface};
pub use target::RenderTarget;
pub use vertex::{PrimitiveType, Vertex};
pub use vertex_array::VertexArray;
pub use vertex_buffer::{VertexBuffer, VertexBufferUsage};
