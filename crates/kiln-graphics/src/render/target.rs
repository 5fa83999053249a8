use std::fmt;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::coords::{IntRect, Rect, Vec2, Vec2i, Vec2u, View};
use crate::driver::{constants, Driver};
use crate::paint::Color;
use crate::state::{RenderStates, StencilValue, BLEND_ALPHA};

use super::cache::{AttribLocations, DrawStateCache};
use super::{Drawable, PrimitiveType, RenderCtx, RenderSurface, TargetId, Transition, Vertex, VertexBuffer};

/// A surface plus the driver state it last applied.
///
/// Targets sharing a driver context coordinate through the context's
/// [`ActiveTargetRegistry`](super::ActiveTargetRegistry): a target trusts its
/// cache only while it is the one recorded as active.
pub struct RenderTarget {
    pub(super) ctx: Rc<RenderCtx>,
    pub(super) surface: Box<dyn RenderSurface>,
    pub(super) id: TargetId,
    pub(super) default_view: View,
    pub(super) view: View,
    pub(super) cache: DrawStateCache,
}

impl RenderTarget {
    /// Creates a target drawing into `surface`.
    ///
    /// Allocates the streaming vertex buffer (and a vertex array object where
    /// supported). Driver state is left untouched until the first draw.
    pub fn new(ctx: Rc<RenderCtx>, surface: impl RenderSurface + 'static) -> Result<Self> {
        let d = ctx.driver();
        let mut cache = DrawStateCache::new(ctx.init().vertex_cache_capacity);

        cache.vertex_buffer = d
            .create_buffer()
            .map_err(anyhow::Error::msg)
            .context("failed to create render target vertex buffer")?;

        if d.capabilities().vertex_array_objects {
            match d.create_vertex_array().map_err(anyhow::Error::msg) {
                Ok(array) => cache.vertex_array = array,
                Err(err) => {
                    d.delete_buffer(cache.vertex_buffer);
                    return Err(err.context("failed to create render target vertex array"));
                }
            }
        }

        let size = surface.size();
        let default_view = View::from_rect(Rect::new(0.0, 0.0, size.x as f32, size.y as f32));
        let id = ctx.registry().allocate_id();

        log::debug!(
            "render target {id}: {}x{} (vertex buffer {}, vertex array {})",
            size.x,
            size.y,
            cache.vertex_buffer,
            cache.vertex_array
        );

        Ok(Self {
            ctx,
            surface: Box::new(surface),
            id,
            default_view,
            view: default_view,
            cache,
        })
    }

    // ── clearing ──────────────────────────────────────────────────────────

    pub fn clear(&mut self, color: Color) {
        if self.ensure_active() {
            let ctx = Rc::clone(&self.ctx);
            let d = &**ctx.driver();
            self.apply_texture(d, None, Default::default());
            clear_color(d, color);
            d.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    pub fn clear_stencil(&mut self, value: StencilValue) {
        if self.ensure_active() {
            let ctx = Rc::clone(&self.ctx);
            let d = &**ctx.driver();
            self.apply_texture(d, None, Default::default());
            d.clear_stencil(value.0 as i32);
            d.clear(glow::STENCIL_BUFFER_BIT);
        }
    }

    pub fn clear_with_stencil(&mut self, color: Color, value: StencilValue) {
        if self.ensure_active() {
            let ctx = Rc::clone(&self.ctx);
            let d = &**ctx.driver();
            self.apply_texture(d, None, Default::default());
            clear_color(d, color);
            d.clear_stencil(value.0 as i32);
            d.clear(glow::COLOR_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }

    // ── views ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Replaces the current view; it is applied on the next draw.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.cache.view_changed = true;
    }

    /// View covering the whole target at creation time.
    #[inline]
    pub fn default_view(&self) -> &View {
        &self.default_view
    }

    /// Pixel rectangle `view` occupies on this target.
    pub fn viewport(&self, view: &View) -> IntRect {
        self.pixel_rect(view.viewport())
    }

    /// Pixel rectangle of `view`'s scissor on this target.
    pub fn scissor(&self, view: &View) -> IntRect {
        self.pixel_rect(view.scissor())
    }

    fn pixel_rect(&self, normalized: Rect) -> IntRect {
        let size = self.size();
        let (w, h) = (size.x as f32, size.y as f32);
        IntRect::new(
            (w * normalized.origin.x).round() as i32,
            (h * normalized.origin.y).round() as i32,
            (w * normalized.size.x).round() as i32,
            (h * normalized.size.y).round() as i32,
        )
    }

    /// Converts a target pixel to world coordinates through the current view.
    pub fn map_pixel_to_coords(&self, pixel: Vec2i) -> Vec2 {
        self.map_pixel_to_coords_with(pixel, &self.view)
    }

    pub fn map_pixel_to_coords_with(&self, pixel: Vec2i, view: &View) -> Vec2 {
        let viewport = Rect::from(self.viewport(view));
        let offset = Vec2::from(pixel) - viewport.origin;
        let normalized = Vec2::new(-1.0, 1.0) + Vec2::new(2.0, -2.0).mul_elem(offset).div_elem(viewport.size);
        view.inverse_transform().transform_point(normalized)
    }

    /// Converts world coordinates to a target pixel through the current view.
    pub fn map_coords_to_pixel(&self, point: Vec2) -> Vec2i {
        self.map_coords_to_pixel_with(point, &self.view)
    }

    /// The pixel is rounded to the nearest integer, so mapping a pixel to
    /// coordinates and back yields the same pixel.
    pub fn map_coords_to_pixel_with(&self, point: Vec2, view: &View) -> Vec2i {
        let normalized = view.transform().transform_point(point);
        let viewport = Rect::from(self.viewport(view));
        let unit = (normalized.mul_elem(Vec2::new(1.0, -1.0)) + Vec2::new(1.0, 1.0)) / 2.0;
        Vec2i::from_vec2_round(unit.mul_elem(viewport.size) + viewport.origin)
    }

    // ── activation ────────────────────────────────────────────────────────

    /// Makes this target (and its surface's context) active or inactive.
    ///
    /// Returns `false` when the surface refuses the switch; the cache is left
    /// untouched in that case.
    pub fn set_active(&mut self, active: bool) -> bool {
        if !self.surface.activate(active) {
            log::error!("render target {}: surface refused activation ({active})", self.id);
            return false;
        }

        let context = self.ctx.driver().context_id();
        match self.ctx.registry().set_active(context, self.id, active) {
            Transition::Recorded => {
                self.cache.enable = false;
                self.cache.gl_states_set = false;
                log::debug!("render target {} active in context {context}", self.id);
            }
            Transition::Switched => {
                self.cache.enable = false;
                log::debug!("render target {} took over context {context}", self.id);
            }
            Transition::Unchanged => {}
            Transition::Cleared => {
                self.cache.enable = false;
                log::debug!("context {context} released by render target {}", self.id);
            }
        }
        true
    }

    /// Whether this target is the one recorded as active in its context.
    pub fn is_active(&self) -> bool {
        let context = self.ctx.driver().context_id();
        self.ctx.registry().is_active(context, self.id)
    }

    pub(super) fn ensure_active(&mut self) -> bool {
        self.is_active() || self.set_active(true)
    }

    // ── state interleaving ────────────────────────────────────────────────

    /// Prepares for foreign driver calls: activates the target and resets
    /// every state the pipeline relies on.
    pub fn push_gl_states(&mut self) {
        if !self.ensure_active() {
            return;
        }
        if cfg!(debug_assertions) {
            let error = self.ctx.driver().get_error();
            if error != 0 {
                log::error!(
                    "render target {}: driver error {error:#06x} pending before push_gl_states",
                    self.id
                );
            }
        }
        self.reset_gl_states();
    }

    /// Resumes drawing after foreign driver calls.
    pub fn pop_gl_states(&mut self) {
        self.ensure_active();
    }

    /// Re-applies the pipeline's baseline driver state and trusts the cache
    /// again.
    pub fn reset_gl_states(&mut self) {
        if !self.ensure_active() {
            return;
        }
        let ctx = Rc::clone(&self.ctx);
        let d = &**ctx.driver();
        let caps = d.capabilities();

        d.active_texture(glow::TEXTURE0);
        d.disable(glow::CULL_FACE);
        d.disable(glow::DEPTH_TEST);
        d.enable(glow::BLEND);
        for location in self.cache.attribs.iter() {
            d.disable_vertex_attrib_array(location);
        }
        // Arrays are off now; the next shader bind must re-enable them.
        self.cache.attribs = AttribLocations::default();
        self.cache.last_shader_id = 0;

        self.cache.gl_states_set = true;

        self.apply_blend_mode(d, BLEND_ALPHA);
        self.apply_stencil_mode(d, Default::default());
        self.apply_texture(d, None, Default::default());
        self.apply_shader(d, None);

        if caps.vertex_buffers {
            VertexBuffer::bind(d, None);
        }

        self.cache.tex_coords_array_enabled = true;
        self.cache.use_vertex_cache = false;
        self.cache.view_changed = true;
        self.cache.enable = true;
        log::trace!("render target {}: driver state reset", self.id);
    }

    // ── drawing ───────────────────────────────────────────────────────────

    pub fn draw(&mut self, drawable: &dyn Drawable, states: &RenderStates) {
        drawable.draw(self, states);
    }

    /// Draws `vertices` as `primitive`.
    ///
    /// Batches no larger than the vertex cache are transformed on the host;
    /// larger ones upload the transform instead.
    pub fn draw_vertices(&mut self, vertices: &[Vertex], primitive: PrimitiveType, states: &RenderStates) {
        if vertices.is_empty() || !self.ensure_active() {
            return;
        }
        let ctx = Rc::clone(&self.ctx);
        let d = &**ctx.driver();
        let caps = d.capabilities();

        let use_vertex_cache = vertices.len() <= self.cache.vertex_cache_capacity();
        if use_vertex_cache {
            for (cached, vertex) in self.cache.vertex_cache.iter_mut().zip(vertices) {
                *cached = Vertex {
                    position: states.transform.transform_point(vertex.position),
                    ..*vertex
                };
            }
        }

        if caps.vertex_array_objects {
            d.bind_vertex_array(self.cache.vertex_array);
        }

        self.setup_draw(d, use_vertex_cache, states);

        let enable_tex_coords = states.texture.is_some() || states.shader.is_some();

        let data: &[Vertex] = if use_vertex_cache {
            &self.cache.vertex_cache[..vertices.len()]
        } else {
            vertices
        };
        VertexBuffer::bind_raw(d, self.cache.vertex_buffer);
        d.buffer_data(bytemuck::cast_slice(data), glow::DYNAMIC_DRAW);
        self.attrib_pointers(d, enable_tex_coords);

        d.draw_arrays(constants::primitive_mode(primitive), 0, vertices.len() as i32);
        log::trace!(
            "render target {}: {} vertices as {primitive:?} (host transform: {use_vertex_cache})",
            self.id,
            vertices.len()
        );

        VertexBuffer::bind(d, None);
        if caps.vertex_array_objects {
            d.bind_vertex_array(0);
        }

        self.cleanup_draw(d, states);

        self.cache.use_vertex_cache = use_vertex_cache;
        self.cache.tex_coords_array_enabled = enable_tex_coords;
    }

    /// Draws every vertex of `buffer`.
    pub fn draw_buffer(&mut self, buffer: &VertexBuffer, states: &RenderStates) {
        self.draw_buffer_range(buffer, 0, buffer.vertex_count(), states);
    }

    /// Draws `count` vertices of `buffer` starting at `first`.
    ///
    /// `count` is clamped to the buffer; a `first` past the end draws
    /// nothing.
    pub fn draw_buffer_range(
        &mut self,
        buffer: &VertexBuffer,
        first: usize,
        count: usize,
        states: &RenderStates,
    ) {
        let ctx = Rc::clone(&self.ctx);
        let d = &**ctx.driver();
        let caps = d.capabilities();

        if !VertexBuffer::is_available(d) {
            log::warn!("vertex buffers are not supported by this driver; draw skipped");
            return;
        }

        let total = buffer.vertex_count();
        if first > total {
            return;
        }
        let count = count.min(total - first);
        if count == 0 || buffer.native_handle() == 0 || !self.ensure_active() {
            return;
        }

        if caps.vertex_array_objects {
            d.bind_vertex_array(self.cache.vertex_array);
        }

        self.setup_draw(d, false, states);

        VertexBuffer::bind(d, Some(buffer));

        if !self.cache.enable || !self.cache.tex_coords_array_enabled {
            if let Some(location) = self.cache.attribs.tex_coords {
                d.enable_vertex_attrib_array(location);
            }
        }
        self.attrib_pointers(d, true);

        d.draw_arrays(
            constants::primitive_mode(buffer.primitive_type()),
            first as i32,
            count as i32,
        );
        log::trace!(
            "render target {}: buffer {} vertices {first}..{}",
            self.id,
            buffer.native_handle(),
            first + count
        );

        VertexBuffer::bind(d, None);
        if caps.vertex_array_objects {
            d.bind_vertex_array(0);
        }

        self.cleanup_draw(d, states);

        self.cache.use_vertex_cache = false;
        self.cache.tex_coords_array_enabled = true;
    }

    /// Points the cached attribute locations at the bound buffer's
    /// [`Vertex`] layout.
    fn attrib_pointers(&self, d: &dyn Driver, tex_coords: bool) {
        let attribs = self.cache.attribs;
        if let Some(location) = attribs.position {
            d.vertex_attrib_pointer(location, 2, glow::FLOAT, false, Vertex::STRIDE, Vertex::POSITION_OFFSET);
        }
        if let Some(location) = attribs.color {
            d.vertex_attrib_pointer(location, 4, glow::UNSIGNED_BYTE, true, Vertex::STRIDE, Vertex::COLOR_OFFSET);
        }
        if tex_coords {
            if let Some(location) = attribs.tex_coords {
                d.vertex_attrib_pointer(
                    location,
                    2,
                    glow::FLOAT,
                    false,
                    Vertex::STRIDE,
                    Vertex::TEX_COORDS_OFFSET,
                );
            }
        }
    }

    // ── surface ───────────────────────────────────────────────────────────

    #[inline]
    pub fn size(&self) -> Vec2u {
        self.surface.size()
    }

    #[inline]
    pub fn is_srgb(&self) -> bool {
        self.surface.is_srgb()
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[inline]
    pub fn ctx(&self) -> &Rc<RenderCtx> {
        &self.ctx
    }
}

fn clear_color(d: &dyn Driver, color: Color) {
    let [r, g, b, a] = color.to_normalized();
    d.clear_color(r, g, b, a);
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("id", &self.id)
            .field("size", &self.size())
            .field("view", &self.view)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        let d = self.ctx.driver();
        if self.cache.vertex_buffer != 0 {
            d.delete_buffer(self.cache.vertex_buffer);
        }
        if self.cache.vertex_array != 0 {
            d.delete_vertex_array(self.cache.vertex_array);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coords::Transform;
    use crate::driver::{Call, Capabilities, RecordingDriver};
    use crate::render::{ActiveTargetRegistry, DefaultFramebuffer, GlslProfile, RenderInit, VertexBufferUsage};
    use crate::shader::{defaults, Shader};
    use crate::state::{
        StencilComparison, StencilMode, StencilUpdateOperation, BLEND_ADD, BLEND_MIN,
    };
    use crate::texture::Texture;

    fn setup(caps: Capabilities, size: Vec2u) -> (Rc<RecordingDriver>, Rc<RenderCtx>, RenderTarget) {
        let driver = Rc::new(RecordingDriver::with_capabilities(caps));
        let ctx = Rc::new(
            RenderCtx::new(driver.clone(), RenderInit::default())
                .with_registry(Arc::new(ActiveTargetRegistry::new())),
        );
        let target = RenderTarget::new(Rc::clone(&ctx), DefaultFramebuffer::new(size)).unwrap();
        (driver, ctx, target)
    }

    fn square() -> (Rc<RecordingDriver>, Rc<RenderCtx>, RenderTarget) {
        setup(Capabilities::default(), Vec2u::new(100, 100))
    }

    fn strip() -> [Vertex; 4] {
        [
            Vertex::at(Vec2::new(0.0, 0.0)),
            Vertex::at(Vec2::new(10.0, 0.0)),
            Vertex::at(Vec2::new(0.0, 10.0)),
            Vertex::at(Vec2::new(10.0, 10.0)),
        ]
    }

    fn draw_strip(target: &mut RenderTarget, states: &RenderStates) {
        target.draw_vertices(&strip(), PrimitiveType::TriangleStrip, states);
    }

    /// Calls recorded after the first `DrawArrays`.
    fn after_draw(calls: &[Call]) -> &[Call] {
        let at = calls
            .iter()
            .position(|c| matches!(c, Call::DrawArrays { .. }))
            .unwrap();
        &calls[at + 1..]
    }

    // ── initialization ────────────────────────────────────────────────────

    #[test]
    fn creation_allocates_buffers_and_default_view() {
        let (driver, _, target) = square();
        let calls = driver.calls();
        assert!(matches!(calls[0], Call::CreateBuffer(_)));
        assert!(matches!(calls[1], Call::CreateVertexArray(_)));
        assert_eq!(calls.len(), 2);
        assert_eq!(target.default_view().center(), Vec2::new(50.0, 50.0));
        assert_eq!(target.view(), target.default_view());
        assert!(!target.is_active());
    }

    #[test]
    fn no_vertex_array_without_support() {
        let (driver, _, _) = setup(
            Capabilities {
                vertex_array_objects: false,
                ..Capabilities::default()
            },
            Vec2u::new(8, 8),
        );
        assert!(!driver.calls().iter().any(|c| matches!(c, Call::CreateVertexArray(_))));
    }

    #[test]
    fn ids_come_from_the_registry() {
        let (_, ctx, a) = square();
        let b = RenderTarget::new(Rc::clone(&ctx), DefaultFramebuffer::new(Vec2u::new(1, 1))).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn drop_releases_buffers() {
        let (driver, _, target) = square();
        let (buffer, array) = (target.cache.vertex_buffer, target.cache.vertex_array);
        driver.take_calls();
        drop(target);
        assert_eq!(
            driver.calls(),
            vec![Call::DeleteBuffer(buffer), Call::DeleteVertexArray(array)]
        );
    }

    // ── activation ────────────────────────────────────────────────────────

    #[test]
    fn repeated_activation_is_free() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        assert!(target.cache.enable);

        driver.take_calls();
        assert!(target.set_active(true));
        assert!(driver.calls().is_empty());
        assert!(target.cache.enable);
    }

    #[test]
    fn reactivation_reenables_attribute_arrays() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        assert!(target.set_active(false));
        driver.take_calls();

        draw_strip(&mut target, &RenderStates::default());
        let calls = driver.calls();
        let draw = calls
            .iter()
            .position(|c| matches!(c, Call::DrawArrays { .. }))
            .unwrap();
        let last_disable = calls[..draw]
            .iter()
            .rposition(|c| matches!(c, Call::DisableVertexAttribArray(_)))
            .unwrap();
        let between = &calls[last_disable + 1..draw];
        assert!(between.contains(&Call::EnableVertexAttribArray(0)));
        assert!(between.contains(&Call::EnableVertexAttribArray(1)));
    }

    #[test]
    fn push_forgets_the_bound_program() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        target.push_gl_states();
        assert_eq!(target.cache.last_shader_id, 0);
        assert_eq!(target.cache.attribs.iter().count(), 0);

        target.pop_gl_states();
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default());
        assert!(driver.calls().contains(&Call::EnableVertexAttribArray(0)));
    }

    #[test]
    fn deactivation_distrusts_the_cache() {
        let (_, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        assert!(target.set_active(false));
        assert!(!target.is_active());
        assert!(!target.cache.enable);
    }

    #[test]
    fn switching_targets_reapplies_state() {
        let (driver, ctx, mut a) = square();
        let mut b = RenderTarget::new(Rc::clone(&ctx), DefaultFramebuffer::new(Vec2u::new(50, 50))).unwrap();

        draw_strip(&mut a, &RenderStates::default());
        draw_strip(&mut b, &RenderStates::default());
        assert!(b.is_active());
        assert!(!a.is_active());

        driver.take_calls();
        draw_strip(&mut a, &RenderStates::default());
        let calls = driver.calls();
        assert!(a.is_active());
        assert!(calls.contains(&Call::Viewport(0, 0, 100, 100)));
        assert!(calls.iter().any(|c| matches!(c, Call::BlendFuncSeparate(..))));
    }

    #[test]
    fn refused_surface_activation_draws_nothing() {
        struct Lost;
        impl RenderSurface for Lost {
            fn size(&self) -> Vec2u {
                Vec2u::new(4, 4)
            }
            fn activate(&mut self, _active: bool) -> bool {
                false
            }
        }

        let driver = Rc::new(RecordingDriver::new());
        let ctx = Rc::new(
            RenderCtx::new(driver.clone(), RenderInit::default())
                .with_registry(Arc::new(ActiveTargetRegistry::new())),
        );
        let mut target = RenderTarget::new(ctx, Lost).unwrap();
        driver.take_calls();

        draw_strip(&mut target, &RenderStates::default());
        assert!(driver.calls().is_empty());
    }

    // ── drawing ───────────────────────────────────────────────────────────

    #[test]
    fn empty_draw_is_a_no_op() {
        let (driver, _, mut target) = square();
        driver.take_calls();
        target.draw_vertices(&[], PrimitiveType::Triangles, &RenderStates::default());
        assert!(driver.calls().is_empty());
        assert!(!target.is_active());
    }

    #[test]
    fn strip_to_full_target() {
        let (driver, _, mut target) = square();
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default());

        let calls = driver.calls();
        assert!(calls.contains(&Call::Viewport(0, 0, 100, 100)));
        assert!(calls.contains(&Call::DrawArrays {
            mode: glow::TRIANGLE_STRIP,
            first: 0,
            count: 4,
        }));
        assert!(!calls.contains(&Call::Enable(glow::SCISSOR_TEST)));
        assert!(calls.contains(&Call::BufferData {
            len: 80,
            usage: glow::DYNAMIC_DRAW,
        }));
    }

    #[test]
    fn first_draw_resets_driver_state() {
        let (driver, _, mut target) = square();
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default());

        let calls = driver.calls();
        let reset = [
            Call::ActiveTexture(glow::TEXTURE0),
            Call::Disable(glow::CULL_FACE),
            Call::Disable(glow::DEPTH_TEST),
            Call::Enable(glow::BLEND),
        ];
        let at = calls.iter().position(|c| *c == reset[0]).unwrap();
        assert_eq!(&calls[at..at + 4], &reset);
        assert!(calls.contains(&Call::Disable(glow::FRAMEBUFFER_SRGB)));
        assert!(target.cache.gl_states_set);
    }

    #[test]
    fn srgb_surface_enables_conversion() {
        let driver = Rc::new(RecordingDriver::new());
        let ctx = Rc::new(
            RenderCtx::new(driver.clone(), RenderInit::default())
                .with_registry(Arc::new(ActiveTargetRegistry::new())),
        );
        let surface = DefaultFramebuffer::new(Vec2u::new(10, 10)).with_srgb(true);
        let mut target = RenderTarget::new(ctx, surface).unwrap();
        draw_strip(&mut target, &RenderStates::default());
        assert!(driver.calls().contains(&Call::Enable(glow::FRAMEBUFFER_SRGB)));
    }

    #[test]
    fn default_shader_attributes_are_wired() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());

        let calls = driver.calls();
        assert!(calls.contains(&Call::EnableVertexAttribArray(0)));
        assert!(calls.contains(&Call::EnableVertexAttribArray(1)));
        assert!(calls.contains(&Call::VertexAttribPointer {
            index: 0,
            size: 2,
            data_type: glow::FLOAT,
            normalized: false,
            stride: 20,
            offset: 0,
        }));
        assert!(calls.contains(&Call::VertexAttribPointer {
            index: 1,
            size: 4,
            data_type: glow::UNSIGNED_BYTE,
            normalized: true,
            stride: 20,
            offset: 8,
        }));
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::VertexAttribPointer { offset: 12, .. })));
    }

    #[test]
    fn small_batches_are_transformed_on_the_host() {
        let (driver, _, mut target) = square();
        let transform = Transform::IDENTITY.translate(Vec2::new(5.0, 5.0));
        draw_strip(&mut target, &RenderStates::default().with_transform(transform));

        assert!(target.cache.use_vertex_cache);
        assert_eq!(target.cache.vertex_cache[0].position, Vec2::new(5.0, 5.0));
        assert!(driver
            .calls()
            .contains(&Call::UniformMatrix4(0, Transform::IDENTITY.matrix().to_vec())));
    }

    #[test]
    fn large_batches_upload_the_transform() {
        let (driver, _, mut target) = square();
        let transform = Transform::IDENTITY.translate(Vec2::new(5.0, 5.0));
        let vertices = [Vertex::at(Vec2::new(1.0, 1.0)); 6];
        target.draw_vertices(
            &vertices,
            PrimitiveType::Triangles,
            &RenderStates::default().with_transform(transform),
        );

        assert!(!target.cache.use_vertex_cache);
        let calls = driver.calls();
        assert!(calls.contains(&Call::UniformMatrix4(0, transform.matrix().to_vec())));
        assert!(calls.contains(&Call::BufferData {
            len: 120,
            usage: glow::DYNAMIC_DRAW,
        }));
    }

    #[test]
    fn draw_leaves_buffer_and_vertex_array_unbound() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        let calls = driver.calls();
        let tail = after_draw(&calls);
        assert_eq!(&tail[..2], &[Call::BindArrayBuffer(0), Call::BindVertexArray(0)]);
    }

    // ── state diffing ─────────────────────────────────────────────────────

    #[test]
    fn unchanged_states_are_not_reapplied() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default());

        let calls = driver.calls();
        assert!(!calls.iter().any(|c| matches!(
            c,
            Call::BlendFuncSeparate(..)
                | Call::Viewport(..)
                | Call::Disable(_)
                | Call::Enable(_)
                | Call::EnableVertexAttribArray(_)
        )));
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, Call::DrawArrays { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn blend_change_is_applied() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default().with_blend_mode(BLEND_ADD));
        assert!(driver.calls().contains(&Call::BlendFuncSeparate(
            glow::SRC_ALPHA,
            glow::ONE,
            glow::ONE,
            glow::ONE,
        )));
    }

    #[test]
    fn minmax_blending_falls_back_without_support() {
        let (driver, _, mut target) = setup(
            Capabilities {
                blend_minmax: false,
                ..Capabilities::default()
            },
            Vec2u::new(10, 10),
        );
        draw_strip(&mut target, &RenderStates::default().with_blend_mode(BLEND_MIN));
        let calls = driver.calls();
        let last = calls
            .iter()
            .rev()
            .find(|c| matches!(c, Call::BlendEquationSeparate(..)));
        assert_eq!(last, Some(&Call::BlendEquationSeparate(glow::FUNC_ADD, glow::FUNC_ADD)));
    }

    #[test]
    fn minmax_blending_with_support() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default().with_blend_mode(BLEND_MIN));
        assert!(driver
            .calls()
            .contains(&Call::BlendEquationSeparate(glow::MIN, glow::MIN)));
    }

    #[test]
    fn stencil_mode_round_trip() {
        let (driver, _, mut target) = square();
        let mode = StencilMode {
            comparison: StencilComparison::Equal,
            update_operation: StencilUpdateOperation::Replace,
            reference: StencilValue(1),
            mask: StencilValue(0xff),
            stencil_only: false,
        };
        draw_strip(&mut target, &RenderStates::default().with_stencil_mode(mode));
        let calls = driver.take_calls();
        assert!(calls.contains(&Call::Enable(glow::STENCIL_TEST)));
        assert!(calls.contains(&Call::StencilOp(glow::KEEP, glow::REPLACE, glow::REPLACE)));
        assert!(calls.contains(&Call::StencilFunc(glow::EQUAL, 1, 0xff)));

        draw_strip(&mut target, &RenderStates::default());
        let calls = driver.calls();
        assert!(calls.contains(&Call::Disable(glow::STENCIL_TEST)));
        assert!(calls.contains(&Call::ColorMask(true, true, true, true)));
        assert!(!target.cache.stencil_enabled);
    }

    #[test]
    fn stencil_only_masks_color_for_the_draw() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        driver.take_calls();

        let mode = StencilMode {
            update_operation: StencilUpdateOperation::Replace,
            stencil_only: true,
            ..StencilMode::default()
        };
        draw_strip(&mut target, &RenderStates::default().with_stencil_mode(mode));
        let calls = driver.calls();
        let masked = calls
            .iter()
            .position(|c| *c == Call::ColorMask(false, false, false, false))
            .unwrap();
        let draw = calls
            .iter()
            .position(|c| matches!(c, Call::DrawArrays { .. }))
            .unwrap();
        assert!(masked < draw);
        assert!(after_draw(&calls).contains(&Call::ColorMask(true, true, true, true)));
    }

    // ── views ─────────────────────────────────────────────────────────────

    #[test]
    fn viewport_is_flipped_to_bottom_left_origin() {
        let (driver, _, mut target) = square();
        let mut view = *target.default_view();
        view.set_viewport(Rect::new(0.0, 0.0, 0.5, 0.25));
        target.set_view(view);
        assert_eq!(target.viewport(&view), IntRect::new(0, 0, 50, 25));

        draw_strip(&mut target, &RenderStates::default());
        assert!(driver.calls().contains(&Call::Viewport(0, 75, 50, 25)));
    }

    #[test]
    fn scissor_is_enabled_then_disabled() {
        let (driver, _, mut target) = square();
        let mut view = *target.default_view();
        view.set_scissor(Rect::new(0.25, 0.25, 0.5, 0.5));
        target.set_view(view);

        draw_strip(&mut target, &RenderStates::default());
        let calls = driver.take_calls();
        assert!(calls.contains(&Call::Scissor(25, 25, 50, 50)));
        assert!(calls.contains(&Call::Enable(glow::SCISSOR_TEST)));
        assert!(target.cache.scissor_enabled);

        draw_strip(&mut target, &RenderStates::default());
        assert!(!driver.take_calls().iter().any(|c| matches!(c, Call::Scissor(..))));

        let default = *target.default_view();
        target.set_view(default);
        draw_strip(&mut target, &RenderStates::default());
        assert!(driver.calls().contains(&Call::Disable(glow::SCISSOR_TEST)));
        assert!(!target.cache.scissor_enabled);
    }

    #[test]
    fn default_view_maps_pixels_to_equal_coords() {
        let (_, _, target) = setup(Capabilities::default(), Vec2u::new(128, 128));
        for pixel in [Vec2i::new(32, 96), Vec2i::new(0, 0), Vec2i::new(64, 16)] {
            let coords = target.map_pixel_to_coords(pixel);
            assert!((coords.x - pixel.x as f32).abs() < 1e-4);
            assert!((coords.y - pixel.y as f32).abs() < 1e-4);
            assert_eq!(target.map_coords_to_pixel(coords), pixel);
        }
    }

    #[test]
    fn coords_round_to_the_nearest_pixel() {
        let (_, _, target) = square();
        assert_eq!(target.map_coords_to_pixel(Vec2::new(10.6, 20.4)), Vec2i::new(11, 20));
        assert_eq!(target.map_coords_to_pixel(Vec2::new(9.7, 0.3)), Vec2i::new(10, 0));
    }

    #[test]
    fn pixel_round_trip_holds_under_transformed_views() {
        let (_, _, target) = square();
        let mut views = vec![*target.default_view()];
        for rotation in [0.0, 30.0, 17.0] {
            let mut view = View::new(Vec2::new(37.3, 52.9), Vec2::new(61.7, 80.2));
            view.set_rotation(rotation);
            views.push(view);
        }
        let mut inset = views[3];
        inset.set_viewport(Rect::new(0.1, 0.2, 0.7, 0.5));
        views.push(inset);

        for view in &views {
            let area = target.viewport(view);
            for y in (area.origin.y + 1..area.origin.y + area.size.y).step_by(3) {
                for x in (area.origin.x + 1..area.origin.x + area.size.x).step_by(3) {
                    let pixel = Vec2i::new(x, y);
                    let coords = target.map_pixel_to_coords_with(pixel, view);
                    assert_eq!(
                        target.map_coords_to_pixel_with(coords, view),
                        pixel,
                        "via {coords:?} under {view:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn mapping_follows_the_view() {
        let (_, _, target) = setup(Capabilities::default(), Vec2u::new(128, 128));
        let mut view = View::from_rect(Rect::new(0.0, 0.0, 256.0, 256.0));
        view.set_viewport(Rect::new(0.5, 0.0, 0.5, 1.0));

        let coords = target.map_pixel_to_coords_with(Vec2i::new(96, 64), &view);
        assert!((coords.x - 128.0).abs() < 1e-3);
        assert!((coords.y - 128.0).abs() < 1e-3);
        assert_eq!(
            target.map_coords_to_pixel_with(Vec2::new(128.0, 128.0), &view),
            Vec2i::new(96, 64)
        );
    }

    // ── textures & shaders ────────────────────────────────────────────────

    #[test]
    fn texture_is_rebound_only_when_it_changes() {
        let (driver, ctx, mut target) = square();
        let texture = Texture::new(&ctx, Vec2u::new(4, 4)).unwrap();
        let states = RenderStates::default().with_texture(&texture);

        draw_strip(&mut target, &states);
        let calls = driver.take_calls();
        assert!(calls.contains(&Call::BindTexture(texture.native_handle())));
        assert!(calls.contains(&Call::VertexAttribPointer {
            index: 2,
            size: 2,
            data_type: glow::FLOAT,
            normalized: false,
            stride: 20,
            offset: 12,
        }));
        assert_eq!(target.cache.last_texture_id, texture.cache_id());

        draw_strip(&mut target, &states);
        assert!(!driver
            .calls()
            .contains(&Call::BindTexture(texture.native_handle())));
    }

    #[test]
    fn attachment_textures_are_always_rebound_and_released() {
        let (driver, ctx, mut target) = square();
        let mut texture = Texture::new(&ctx, Vec2u::new(4, 4)).unwrap();
        texture.set_fbo_attachment(true);
        let states = RenderStates::default().with_texture(&texture);

        draw_strip(&mut target, &states);
        driver.take_calls();
        draw_strip(&mut target, &states);

        let calls = driver.calls();
        assert!(calls.contains(&Call::BindTexture(texture.native_handle())));
        assert!(after_draw(&calls).contains(&Call::BindTexture(0)));
        assert_eq!(target.cache.last_texture_id, 0);
    }

    #[test]
    fn explicit_shader_is_unbound_after_the_draw() {
        let (driver, ctx, mut target) = square();
        let source = defaults::textured(GlslProfile::Core330);
        let mut shader = Shader::new(&ctx);
        shader.load_vertex_fragment(source.vertex, source.fragment).unwrap();

        draw_strip(&mut target, &RenderStates::default().with_shader(&shader));
        let calls = driver.calls();
        assert!(calls.contains(&Call::UseProgram(shader.native_handle())));
        assert!(after_draw(&calls).contains(&Call::UseProgram(0)));
        assert!(calls.contains(&Call::VertexAttribPointer {
            index: 2,
            size: 2,
            data_type: glow::FLOAT,
            normalized: false,
            stride: 20,
            offset: 12,
        }));
        assert_eq!(target.cache.last_shader_id, shader.native_handle());
    }

    #[test]
    fn shader_change_rewires_attributes() {
        let (driver, ctx, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        let plain = target.cache.last_shader_id;

        let texture = Texture::new(&ctx, Vec2u::new(2, 2)).unwrap();
        driver.take_calls();
        draw_strip(&mut target, &RenderStates::default().with_texture(&texture));

        let calls = driver.calls();
        assert_ne!(target.cache.last_shader_id, plain);
        assert!(calls.contains(&Call::DisableVertexAttribArray(0)));
        assert!(calls.contains(&Call::EnableVertexAttribArray(2)));
        assert_eq!(target.cache.attribs.tex_coords, Some(2));
    }

    // ── vertex buffers ────────────────────────────────────────────────────

    fn buffer(ctx: &RenderCtx, count: usize) -> VertexBuffer {
        VertexBuffer::new(ctx, PrimitiveType::Triangles, VertexBufferUsage::Static, count).unwrap()
    }

    #[test]
    fn buffer_range_is_clamped() {
        let (driver, ctx, mut target) = square();
        let vb = buffer(&ctx, 6);
        driver.take_calls();

        target.draw_buffer_range(&vb, 4, 10, &RenderStates::default());
        let calls = driver.calls();
        assert!(calls.contains(&Call::BindArrayBuffer(vb.native_handle())));
        assert!(calls.contains(&Call::DrawArrays {
            mode: glow::TRIANGLES,
            first: 4,
            count: 2,
        }));
        assert!(!target.cache.use_vertex_cache);
        assert!(target.cache.tex_coords_array_enabled);
    }

    #[test]
    fn buffer_range_past_the_end_draws_nothing() {
        let (driver, ctx, mut target) = square();
        let vb = buffer(&ctx, 6);
        driver.take_calls();

        target.draw_buffer_range(&vb, 7, 1, &RenderStates::default());
        target.draw_buffer_range(&vb, 6, 3, &RenderStates::default());
        target.draw_buffer_range(&vb, 2, 0, &RenderStates::default());
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn buffer_draw_skipped_without_support() {
        let (driver, ctx, mut target) = square();
        let vb = buffer(&ctx, 3);
        driver.set_capabilities(Capabilities {
            vertex_buffers: false,
            ..Capabilities::default()
        });
        driver.take_calls();

        target.draw(&vb, &RenderStates::default());
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn drawables_forward_to_the_target() {
        let (driver, ctx, mut target) = square();
        let vb = buffer(&ctx, 3);
        target.draw(&vb, &RenderStates::default());
        assert!(driver.calls().contains(&Call::DrawArrays {
            mode: glow::TRIANGLES,
            first: 0,
            count: 3,
        }));
    }

    // ── clearing & interleaving ───────────────────────────────────────────

    #[test]
    fn clear_unbinds_texture_first() {
        let (driver, _, mut target) = square();
        driver.take_calls();
        target.clear(Color::RED);
        assert_eq!(
            driver.calls(),
            vec![
                Call::BindTexture(0),
                Call::ClearColor(1.0, 0.0, 0.0, 1.0),
                Call::Clear(glow::COLOR_BUFFER_BIT),
            ]
        );
        assert!(target.is_active());
    }

    #[test]
    fn clear_with_stencil_clears_both() {
        let (driver, _, mut target) = square();
        target.clear_stencil(StencilValue(2));
        assert!(driver.take_calls().contains(&Call::Clear(glow::STENCIL_BUFFER_BIT)));

        target.clear_with_stencil(Color::BLACK, StencilValue(3));
        let calls = driver.calls();
        assert!(calls.contains(&Call::ClearStencil(3)));
        assert!(calls.contains(&Call::Clear(glow::COLOR_BUFFER_BIT | glow::STENCIL_BUFFER_BIT)));
    }

    #[test]
    fn push_resets_and_pop_only_activates() {
        let (driver, _, mut target) = square();
        draw_strip(&mut target, &RenderStates::default());
        driver.push_error(glow::INVALID_OPERATION);
        driver.take_calls();

        target.push_gl_states();
        let calls = driver.take_calls();
        assert!(calls.contains(&Call::ActiveTexture(glow::TEXTURE0)));
        assert!(calls.contains(&Call::Enable(glow::BLEND)));
        assert!(calls.contains(&Call::UseProgram(0)));
        assert!(calls.contains(&Call::BindArrayBuffer(0)));
        assert!(target.cache.view_changed);
        assert!(target.cache.enable);

        target.pop_gl_states();
        assert!(driver.calls().is_empty());
    }
}
