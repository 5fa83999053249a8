//! Color model shared by vertices and clear operations.

pub mod color;

pub use color::Color;
