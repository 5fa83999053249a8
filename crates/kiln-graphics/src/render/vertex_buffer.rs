use std::fmt;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::driver::{Driver, Handle};
use crate::state::RenderStates;

use super::{Drawable, PrimitiveType, RenderCtx, RenderTarget, Vertex};

/// Update-frequency hint passed to the driver.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum VertexBufferUsage {
    /// Rewritten every frame.
    Stream,
    /// Rewritten occasionally.
    Dynamic,
    /// Written once.
    #[default]
    Static,
}

impl VertexBufferUsage {
    fn to_driver(self) -> u32 {
        match self {
            VertexBufferUsage::Stream => glow::STREAM_DRAW,
            VertexBufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            VertexBufferUsage::Static => glow::STATIC_DRAW,
        }
    }
}

/// Vertices stored in driver memory, drawn without re-uploading.
pub struct VertexBuffer {
    driver: Rc<dyn Driver>,
    handle: Handle,
    vertex_count: usize,
    primitive: PrimitiveType,
    usage: VertexBufferUsage,
}

impl VertexBuffer {
    /// Allocates storage for `vertex_count` zeroed vertices.
    pub fn new(
        ctx: &RenderCtx,
        primitive: PrimitiveType,
        usage: VertexBufferUsage,
        vertex_count: usize,
    ) -> Result<Self> {
        let driver = Rc::clone(ctx.driver());
        anyhow::ensure!(
            Self::is_available(driver.as_ref()),
            "vertex buffers are not supported by this driver"
        );

        let handle = driver
            .create_buffer()
            .map_err(anyhow::Error::msg)
            .context("failed to create vertex buffer")?;

        let buffer = Self {
            driver,
            handle,
            vertex_count,
            primitive,
            usage,
        };
        buffer.with_bound(|d| {
            d.buffer_data(&vec![0u8; vertex_count * Vertex::STRIDE as usize], usage.to_driver());
        });

        log::debug!("vertex buffer {handle}: {vertex_count} vertices ({usage:?})");
        Ok(buffer)
    }

    /// Replaces the contents, growing the storage when `vertices` is longer.
    pub fn update(&mut self, vertices: &[Vertex]) -> Result<()> {
        self.update_at(vertices, 0)
    }

    /// Writes `vertices` starting at vertex `offset`.
    ///
    /// A write at offset 0 may grow the buffer; a write elsewhere must fit in
    /// the current storage.
    pub fn update_at(&mut self, vertices: &[Vertex], offset: usize) -> Result<()> {
        anyhow::ensure!(
            offset == 0 || offset + vertices.len() <= self.vertex_count,
            "write of {} vertices at {offset} exceeds buffer of {}",
            vertices.len(),
            self.vertex_count
        );
        if vertices.is_empty() {
            return Ok(());
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let usage = self.usage.to_driver();
        let grow = vertices.len() >= self.vertex_count;
        self.with_bound(|d| {
            if grow {
                d.buffer_data(bytes, usage);
            } else {
                d.buffer_sub_data(offset * Vertex::STRIDE as usize, bytes);
            }
        });
        if grow {
            self.vertex_count = vertices.len();
        }
        self.driver.flush();
        Ok(())
    }

    /// Binds `buffer` as the array buffer, or unbinds for `None`.
    pub fn bind(driver: &dyn Driver, buffer: Option<&VertexBuffer>) {
        Self::bind_raw(driver, buffer.map_or(0, |b| b.handle));
    }

    pub(super) fn bind_raw(driver: &dyn Driver, handle: Handle) {
        driver.bind_array_buffer(handle);
    }

    pub fn is_available(driver: &dyn Driver) -> bool {
        driver.capabilities().vertex_buffers
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn native_handle(&self) -> Handle {
        self.handle
    }

    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    pub fn set_primitive_type(&mut self, primitive: PrimitiveType) {
        self.primitive = primitive;
    }

    #[inline]
    pub fn usage(&self) -> VertexBufferUsage {
        self.usage
    }

    fn with_bound(&self, f: impl FnOnce(&dyn Driver)) {
        let d = self.driver.as_ref();
        d.bind_array_buffer(self.handle);
        f(d);
        d.bind_array_buffer(0);
    }
}

impl Drawable for VertexBuffer {
    fn draw(&self, target: &mut RenderTarget, states: &RenderStates) {
        target.draw_buffer(self, states);
    }
}

impl fmt::Debug for VertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexBuffer")
            .field("handle", &self.handle)
            .field("vertex_count", &self.vertex_count)
            .field("primitive", &self.primitive)
            .field("usage", &self.usage)
            .finish()
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.driver.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::driver::{Call, Capabilities, RecordingDriver};
    use crate::render::RenderInit;

    fn ctx_with(caps: Capabilities) -> (Rc<RecordingDriver>, RenderCtx) {
        let driver = Rc::new(RecordingDriver::with_capabilities(caps));
        let ctx = RenderCtx::new(driver.clone(), RenderInit::default());
        (driver, ctx)
    }

    fn quad() -> [Vertex; 4] {
        [
            Vertex::at(Vec2::new(0.0, 0.0)),
            Vertex::at(Vec2::new(1.0, 0.0)),
            Vertex::at(Vec2::new(0.0, 1.0)),
            Vertex::at(Vec2::new(1.0, 1.0)),
        ]
    }

    #[test]
    fn creation_allocates_storage() {
        let (driver, ctx) = ctx_with(Capabilities::default());
        let buffer =
            VertexBuffer::new(&ctx, PrimitiveType::Triangles, VertexBufferUsage::Stream, 3).unwrap();
        assert_eq!(buffer.vertex_count(), 3);
        assert!(driver.calls().contains(&Call::BufferData {
            len: 60,
            usage: glow::STREAM_DRAW,
        }));
    }

    #[test]
    fn unsupported_driver_is_rejected() {
        let (driver, ctx) = ctx_with(Capabilities {
            vertex_buffers: false,
            ..Capabilities::default()
        });
        assert!(VertexBuffer::new(&ctx, PrimitiveType::Points, VertexBufferUsage::Static, 1).is_err());
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn full_update_grows_the_buffer() {
        let (driver, ctx) = ctx_with(Capabilities::default());
        let mut buffer =
            VertexBuffer::new(&ctx, PrimitiveType::TriangleStrip, VertexBufferUsage::Dynamic, 2).unwrap();
        driver.take_calls();

        buffer.update(&quad()).unwrap();
        assert_eq!(buffer.vertex_count(), 4);
        assert!(driver.calls().contains(&Call::BufferData {
            len: 80,
            usage: glow::DYNAMIC_DRAW,
        }));
    }

    #[test]
    fn offset_update_writes_in_place() {
        let (driver, ctx) = ctx_with(Capabilities::default());
        let mut buffer =
            VertexBuffer::new(&ctx, PrimitiveType::Triangles, VertexBufferUsage::Static, 6).unwrap();
        driver.take_calls();

        buffer.update_at(&quad()[..2], 3).unwrap();
        assert_eq!(buffer.vertex_count(), 6);
        assert!(driver.calls().contains(&Call::BufferSubData { offset: 60, len: 40 }));
        assert_eq!(driver.calls().last(), Some(&Call::Flush));
    }

    #[test]
    fn offset_update_past_the_end_fails() {
        let (_, ctx) = ctx_with(Capabilities::default());
        let mut buffer =
            VertexBuffer::new(&ctx, PrimitiveType::Triangles, VertexBufferUsage::Static, 4).unwrap();
        assert!(buffer.update_at(&quad(), 1).is_err());
        assert_eq!(buffer.vertex_count(), 4);
    }

    #[test]
    fn drop_deletes_driver_buffer() {
        let (driver, ctx) = ctx_with(Capabilities::default());
        let buffer =
            VertexBuffer::new(&ctx, PrimitiveType::Lines, VertexBufferUsage::Static, 2).unwrap();
        let handle = buffer.native_handle();
        drop(buffer);
        assert_eq!(driver.calls().last(), Some(&Call::DeleteBuffer(handle)));
    }
}
