//! Coordinate and geometry types consumed by the draw pipeline.
//!
//! Canonical pixel space:
//! - Origin top-left
//! - +X right, +Y down
//!
//! Views convert world coordinates to normalized device coordinates; the
//! render target converts those to driver viewport space (origin bottom-left).

mod rect;
mod transform;
mod vec2;
mod view;

pub use rect::{IntRect, Rect};
pub use transform::Transform;
pub use vec2::{Vec2, Vec2i, Vec2u};
pub use view::View;
