//! kiln graphics crate.
//!
//! 2D rendering core over an OpenGL-style driver: render state value types,
//! driver enumerant mapping, shader programs, textures, and render targets
//! that cache applied driver state so draws only issue what changed.
//!
//! Windowing and context creation live in the host application; a target is
//! handed a [`render::RenderSurface`] and a [`driver::Driver`] whose context
//! is already current.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod logging;
pub mod coords;
pub mod paint;
pub mod state;
pub mod driver;
pub mod texture;
pub mod shader;
pub mod render;
