use std::ops::{Index, IndexMut};

use crate::coords::Rect;
use crate::state::RenderStates;

use super::{Drawable, PrimitiveType, RenderTarget, Vertex};

/// Host-side vertex list drawn with one primitive type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexArray {
    vertices: Vec<Vertex>,
    primitive: PrimitiveType,
}

impl VertexArray {
    pub fn new(primitive: PrimitiveType) -> Self {
        Self {
            vertices: Vec::new(),
            primitive,
        }
    }

    pub fn with_vertices(primitive: PrimitiveType, vertices: Vec<Vertex>) -> Self {
        Self { vertices, primitive }
    }

    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    pub fn set_primitive_type(&mut self, primitive: PrimitiveType) {
        self.primitive = primitive;
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn push(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Resizes to `len` vertices, padding with default vertices.
    pub fn resize(&mut self, len: usize) {
        self.vertices.resize(len, Vertex::default());
    }

    /// Smallest rectangle containing every vertex position.
    pub fn bounds(&self) -> Rect {
        Rect::bounding(self.vertices.iter().map(|v| v.position))
    }
}

impl Index<usize> for VertexArray {
    type Output = Vertex;

    fn index(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }
}

impl IndexMut<usize> for VertexArray {
    fn index_mut(&mut self, index: usize) -> &mut Vertex {
        &mut self.vertices[index]
    }
}

impl Drawable for VertexArray {
    fn draw(&self, target: &mut RenderTarget, states: &RenderStates) {
        target.draw_vertices(&self.vertices, self.primitive, states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;

    #[test]
    fn bounds_cover_all_positions() {
        let mut array = VertexArray::new(PrimitiveType::Points);
        array.push(Vertex::at(Vec2::new(2.0, -1.0)));
        array.push(Vertex::at(Vec2::new(-3.0, 4.0)));
        array.push(Vertex::at(Vec2::new(0.0, 0.0)));
        assert_eq!(array.bounds(), Rect::new(-3.0, -1.0, 5.0, 5.0));
    }

    #[test]
    fn empty_bounds_are_empty() {
        assert_eq!(VertexArray::default().bounds(), Rect::default());
    }

    #[test]
    fn resize_pads_with_default_vertices() {
        let mut array = VertexArray::new(PrimitiveType::Lines);
        array.resize(3);
        assert_eq!(array.len(), 3);
        array[1].position = Vec2::new(5.0, 5.0);
        assert_eq!(array[1].position, Vec2::new(5.0, 5.0));
        assert_eq!(array[2], Vertex::default());
    }
}
