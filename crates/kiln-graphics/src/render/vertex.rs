use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::paint::Color;

/// Vertex as uploaded to the driver.
///
/// Layout (stride 20 bytes):
/// - `position`: 2×f32 at offset 0
/// - `color`: 4×u8 at offset 8, normalized to `[0, 1]` by the driver
/// - `tex_coords`: 2×f32 at offset 12
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Color,
    pub tex_coords: Vec2,
}

impl Vertex {
    pub const STRIDE: i32 = std::mem::size_of::<Vertex>() as i32;
    pub const POSITION_OFFSET: i32 = 0;
    pub const COLOR_OFFSET: i32 = 8;
    pub const TEX_COORDS_OFFSET: i32 = 12;

    #[inline]
    pub const fn new(position: Vec2, color: Color, tex_coords: Vec2) -> Self {
        Self {
            position,
            color,
            tex_coords,
        }
    }

    /// White vertex without texture coordinates.
    #[inline]
    pub const fn at(position: Vec2) -> Self {
        Self::new(position, Color::WHITE, Vec2::new(0.0, 0.0))
    }

    #[inline]
    pub const fn colored(position: Vec2, color: Color) -> Self {
        Self::new(position, color, Vec2::new(0.0, 0.0))
    }
}

/// How a vertex sequence is assembled into primitives.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}
