//! Per-draw state application for [`RenderTarget`].
//!
//! Each `apply_*` step compares the requested state with the target's cache
//! and issues driver calls only for differences. While the cache is not
//! trusted (`enable == false`) every step re-applies unconditionally.

use std::rc::Rc;

use crate::coords::{Rect, Transform};
use crate::driver::{constants, Driver};
use crate::shader::{Shader, Uniform};
use crate::state::{BlendMode, CoordinateType, RenderStates, StencilMode};
use crate::texture::Texture;

use super::cache::AttribLocations;
use super::RenderTarget;

impl RenderTarget {
    /// Applies everything `states` needs before a draw call.
    pub(super) fn setup_draw(&mut self, d: &dyn Driver, use_vertex_cache: bool, states: &RenderStates) {
        let caps = d.capabilities();

        if !self.cache.enable && caps.framebuffer_srgb && !caps.embedded {
            if self.surface.is_srgb() {
                d.enable(glow::FRAMEBUFFER_SRGB);
            } else {
                d.disable(glow::FRAMEBUFFER_SRGB);
            }
        }

        if !self.cache.gl_states_set {
            self.reset_gl_states();
        }

        let ctx = Rc::clone(&self.ctx);
        let shader = match states.shader {
            Some(shader) => shader,
            None => ctx.default_shader(states.texture.is_some()),
        };

        let modelview = if use_vertex_cache {
            Transform::IDENTITY
        } else {
            states.transform
        };
        shader.set_uniform("u_modelview", modelview);

        if !self.cache.enable || self.cache.view_changed {
            self.apply_current_view(d);
        }
        shader.set_uniform("u_projection", self.view.transform());

        if !self.cache.enable || states.blend_mode != self.cache.last_blend_mode {
            self.apply_blend_mode(d, states.blend_mode);
        }

        if !self.cache.enable || states.stencil_mode != self.cache.last_stencil_mode {
            self.apply_stencil_mode(d, states.stencil_mode);
        }

        if states.stencil_mode.stencil_only {
            d.color_mask(false, false, false, false);
        }

        // Attachments are rebound every draw so writes from other contexts
        // become visible here.
        let rebind = !self.cache.enable
            || states.texture.is_some_and(Texture::is_fbo_attachment)
            || states.texture.map_or(0, Texture::cache_id) != self.cache.last_texture_id
            || shader.native_handle() != self.cache.last_shader_id
            || states.coordinate_type != self.cache.last_coordinate_type;

        if rebind {
            self.apply_texture(d, states.texture, states.coordinate_type);
            if let Some(texture) = states.texture {
                shader.set_uniform(
                    "u_texture_matrix",
                    Uniform::Mat4(texture.texture_matrix(states.coordinate_type)),
                );
                if let Some(factor) = texture.npot_factor() {
                    shader.set_uniform("u_npot_factor", Uniform::Vec2(factor));
                }
            }
        }

        self.apply_shader(d, Some(shader));
    }

    /// Undoes the per-draw state that must not leak into the next draw.
    pub(super) fn cleanup_draw(&mut self, d: &dyn Driver, states: &RenderStates) {
        if states.shader.is_some() {
            Shader::bind(d, None);
        }

        if states.texture.is_some_and(Texture::is_fbo_attachment) {
            self.apply_texture(d, None, CoordinateType::default());
        }

        if states.stencil_mode.stencil_only {
            d.color_mask(true, true, true, true);
        }

        self.cache.enable = true;
    }

    /// Sets the pixel viewport and scissor of the current view.
    pub(super) fn apply_current_view(&mut self, d: &dyn Driver) {
        let height = self.size().y as i32;

        let viewport = self.viewport(&self.view);
        let top = height - (viewport.origin.y + viewport.size.y);
        d.viewport(viewport.origin.x, top, viewport.size.x, viewport.size.y);

        if self.view.scissor() == Rect::UNIT {
            if !self.cache.enable || self.cache.scissor_enabled {
                d.disable(glow::SCISSOR_TEST);
                self.cache.scissor_enabled = false;
            }
        } else {
            let scissor = self.scissor(&self.view);
            let top = height - (scissor.origin.y + scissor.size.y);
            d.scissor(scissor.origin.x, top, scissor.size.x, scissor.size.y);

            if !self.cache.enable || !self.cache.scissor_enabled {
                d.enable(glow::SCISSOR_TEST);
                self.cache.scissor_enabled = true;
            }
        }

        self.cache.view_changed = false;
    }

    pub(super) fn apply_blend_mode(&mut self, d: &dyn Driver, mode: BlendMode) {
        let minmax = d.capabilities().blend_minmax;
        d.blend_func_separate(
            constants::blend_factor(mode.color_src_factor),
            constants::blend_factor(mode.color_dst_factor),
            constants::blend_factor(mode.alpha_src_factor),
            constants::blend_factor(mode.alpha_dst_factor),
        );
        d.blend_equation_separate(
            constants::blend_equation(mode.color_equation, minmax),
            constants::blend_equation(mode.alpha_equation, minmax),
        );
        self.cache.last_blend_mode = mode;
    }

    pub(super) fn apply_stencil_mode(&mut self, d: &dyn Driver, mode: StencilMode) {
        if mode.is_disabled() {
            if !self.cache.enable || self.cache.stencil_enabled {
                d.disable(glow::STENCIL_TEST);
                d.color_mask(true, true, true, true);
                self.cache.stencil_enabled = false;
            }
        } else {
            if !self.cache.enable || !self.cache.stencil_enabled {
                d.enable(glow::STENCIL_TEST);
            }
            let op = constants::stencil_operation(mode.update_operation);
            d.stencil_op(glow::KEEP, op, op);
            d.stencil_func(
                constants::stencil_function(mode.comparison),
                mode.reference.0 as i32,
                mode.mask.0,
            );
            self.cache.stencil_enabled = true;
        }
        self.cache.last_stencil_mode = mode;
    }

    pub(super) fn apply_texture(
        &mut self,
        d: &dyn Driver,
        texture: Option<&Texture>,
        coordinate_type: CoordinateType,
    ) {
        Texture::bind(d, texture);
        self.cache.last_texture_id = texture.map_or(0, Texture::cache_id);
        self.cache.last_coordinate_type = coordinate_type;
    }

    /// Binds `shader` and, when it differs from the cached program, rewires
    /// the vertex attribute arrays to its locations.
    pub(super) fn apply_shader(&mut self, d: &dyn Driver, shader: Option<&Shader>) {
        Shader::bind(d, shader);

        let Some(shader) = shader else { return };
        if shader.native_handle() == self.cache.last_shader_id {
            return;
        }
        self.cache.last_shader_id = shader.native_handle();

        for location in self.cache.attribs.iter() {
            d.disable_vertex_attrib_array(location);
        }
        self.cache.attribs = AttribLocations {
            position: shader.attrib_location("position"),
            color: shader.attrib_location("color"),
            tex_coords: shader.attrib_location("texCoord"),
        };
        for location in self.cache.attribs.iter() {
            d.enable_vertex_attrib_array(location);
        }
        log::trace!(
            "render target {}: program {} attributes {:?}",
            self.id,
            self.cache.last_shader_id,
            self.cache.attribs
        );
    }
}
