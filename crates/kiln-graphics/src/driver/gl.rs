use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use glow::HasContext;

use super::{Capabilities, ContextId, Driver, Handle, ShaderStage};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// OpenGL / GLES driver over a caller-provided `glow::Context`.
///
/// The context must be current on the calling thread whenever a method is
/// invoked; making it current is the windowing layer's job.
pub struct GlowDriver {
    gl: glow::Context,
    context_id: ContextId,
    capabilities: Capabilities,
}

impl GlowDriver {
    pub fn new(gl: glow::Context) -> Self {
        let capabilities = probe_capabilities(&gl);
        let context_id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("GlowDriver: context {context_id}, {capabilities:?}");
        Self {
            gl,
            context_id,
            capabilities,
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl std::fmt::Debug for GlowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowDriver")
            .field("context_id", &self.context_id)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

fn probe_capabilities(gl: &glow::Context) -> Capabilities {
    let version = gl.version();
    let extensions = gl.supported_extensions();
    let has = |name: &str| extensions.contains(name);
    let at_least = |major: u32, minor: u32| (version.major, version.minor) >= (major, minor);

    let embedded = version.is_embedded;
    // SAFETY: plain parameter query on the current context.
    let max_units = unsafe { gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS) };

    Capabilities {
        embedded,
        geometry_shaders: if embedded {
            at_least(3, 2) || has("GL_EXT_geometry_shader")
        } else {
            at_least(3, 2) || has("GL_ARB_geometry_shader4")
        },
        blend_minmax: !embedded || at_least(3, 0) || has("GL_EXT_blend_minmax"),
        vertex_buffers: true,
        vertex_array_objects: at_least(3, 0) || has("GL_OES_vertex_array_object"),
        framebuffer_srgb: !embedded
            && (at_least(3, 0) || has("GL_ARB_framebuffer_sRGB") || has("GL_EXT_framebuffer_sRGB")),
        npot_textures: at_least(3, 0) || has("GL_ARB_texture_non_power_of_two"),
        max_texture_units: max_units.max(1) as u32,
    }
}

fn stage_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

#[inline]
fn nz(handle: Handle) -> Option<NonZeroU32> {
    NonZeroU32::new(handle)
}

#[inline]
fn uniform(location: i32) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location as u32)
}

// SAFETY (applies to every `unsafe` block below): glow exposes raw GL entry
// points as `unsafe fn`. Handles passed in were produced by this driver for
// the same context, and slices outlive the call.
impl Driver for GlowDriver {
    fn context_id(&self) -> ContextId {
        self.context_id
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn flush(&self) {
        unsafe { self.gl.flush() }
    }

    fn enable(&self, cap: u32) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { self.gl.disable(cap) }
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.gl.color_mask(r, g, b, a) }
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe { self.gl.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha) }
    }

    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32) {
        unsafe { self.gl.blend_equation_separate(mode_rgb, mode_alpha) }
    }

    fn stencil_op(&self, stencil_fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.gl.stencil_op(stencil_fail, depth_fail, pass) }
    }

    fn stencil_func(&self, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func(func, reference, mask) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear_stencil(&self, value: i32) {
        unsafe { self.gl.clear_stencil(value) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    // ── buffers & vertex arrays ───────────────────────────────────────────

    fn create_buffer(&self) -> Result<Handle, String> {
        unsafe { self.gl.create_buffer() }.map(|b| b.0.get())
    }

    fn delete_buffer(&self, buffer: Handle) {
        if let Some(h) = nz(buffer) {
            unsafe { self.gl.delete_buffer(glow::NativeBuffer(h)) }
        }
    }

    fn bind_array_buffer(&self, buffer: Handle) {
        unsafe {
            self.gl
                .bind_buffer(glow::ARRAY_BUFFER, nz(buffer).map(glow::NativeBuffer))
        }
    }

    fn buffer_data(&self, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, usage) }
    }

    fn buffer_sub_data(&self, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, offset as i32, data)
        }
    }

    fn create_vertex_array(&self) -> Result<Handle, String> {
        unsafe { self.gl.create_vertex_array() }.map(|v| v.0.get())
    }

    fn delete_vertex_array(&self, array: Handle) {
        if let Some(h) = nz(array) {
            unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(h)) }
        }
    }

    fn bind_vertex_array(&self, array: Handle) {
        unsafe {
            self.gl
                .bind_vertex_array(nz(array).map(glow::NativeVertexArray))
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset)
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> Result<Handle, String> {
        unsafe { self.gl.create_texture() }.map(|t| t.0.get())
    }

    fn delete_texture(&self, texture: Handle) {
        if let Some(h) = nz(texture) {
            unsafe { self.gl.delete_texture(glow::NativeTexture(h)) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, texture: Handle) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, nz(texture).map(glow::NativeTexture))
        }
    }

    fn bound_texture(&self) -> Handle {
        unsafe { self.gl.get_parameter_i32(glow::TEXTURE_BINDING_2D) as Handle }
    }

    fn tex_parameter(&self, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, pname, value) }
    }

    fn tex_image_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_sub_image_rgba(&self, x: i32, y: i32, width: i32, height: i32, pixels: &[u8]) {
        unsafe {
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            )
        }
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> Result<Handle, String> {
        unsafe { self.gl.create_program() }.map(|p| p.0.get())
    }

    fn delete_program(&self, program: Handle) {
        if let Some(h) = nz(program) {
            unsafe { self.gl.delete_program(glow::NativeProgram(h)) }
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Handle, String> {
        unsafe { self.gl.create_shader(stage_type(stage)) }.map(|s| s.0.get())
    }

    fn delete_shader(&self, shader: Handle) {
        if let Some(h) = nz(shader) {
            unsafe { self.gl.delete_shader(glow::NativeShader(h)) }
        }
    }

    fn shader_source(&self, shader: Handle, source: &str) {
        if let Some(h) = nz(shader) {
            unsafe { self.gl.shader_source(glow::NativeShader(h), source) }
        }
    }

    fn compile_shader(&self, shader: Handle) {
        if let Some(h) = nz(shader) {
            unsafe { self.gl.compile_shader(glow::NativeShader(h)) }
        }
    }

    fn shader_compile_status(&self, shader: Handle) -> bool {
        nz(shader).is_some_and(|h| unsafe {
            self.gl.get_shader_compile_status(glow::NativeShader(h))
        })
    }

    fn shader_info_log(&self, shader: Handle) -> String {
        nz(shader)
            .map(|h| unsafe { self.gl.get_shader_info_log(glow::NativeShader(h)) })
            .unwrap_or_default()
    }

    fn attach_shader(&self, program: Handle, shader: Handle) {
        if let (Some(p), Some(s)) = (nz(program), nz(shader)) {
            unsafe {
                self.gl
                    .attach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            }
        }
    }

    fn link_program(&self, program: Handle) {
        if let Some(h) = nz(program) {
            unsafe { self.gl.link_program(glow::NativeProgram(h)) }
        }
    }

    fn program_link_status(&self, program: Handle) -> bool {
        nz(program).is_some_and(|h| unsafe {
            self.gl.get_program_link_status(glow::NativeProgram(h))
        })
    }

    fn program_info_log(&self, program: Handle) -> String {
        nz(program)
            .map(|h| unsafe { self.gl.get_program_info_log(glow::NativeProgram(h)) })
            .unwrap_or_default()
    }

    fn use_program(&self, program: Handle) {
        unsafe { self.gl.use_program(nz(program).map(glow::NativeProgram)) }
    }

    fn current_program(&self) -> Handle {
        unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) as Handle }
    }

    fn uniform_location(&self, program: Handle, name: &str) -> Option<i32> {
        let h = nz(program)?;
        unsafe { self.gl.get_uniform_location(glow::NativeProgram(h), name) }.map(|l| l.0 as i32)
    }

    fn attrib_location(&self, program: Handle, name: &str) -> Option<u32> {
        let h = nz(program)?;
        unsafe { self.gl.get_attrib_location(glow::NativeProgram(h), name) }
    }

    // ── uniform uploads ───────────────────────────────────────────────────

    fn uniform_f32(&self, location: i32, values: &[f32]) {
        let loc = uniform(location);
        unsafe {
            match *values {
                [x] => self.gl.uniform_1_f32(Some(&loc), x),
                [x, y] => self.gl.uniform_2_f32(Some(&loc), x, y),
                [x, y, z] => self.gl.uniform_3_f32(Some(&loc), x, y, z),
                [x, y, z, w] => self.gl.uniform_4_f32(Some(&loc), x, y, z, w),
                _ => log::warn!("uniform_f32: unsupported component count {}", values.len()),
            }
        }
    }

    fn uniform_i32(&self, location: i32, values: &[i32]) {
        let loc = uniform(location);
        unsafe {
            match *values {
                [x] => self.gl.uniform_1_i32(Some(&loc), x),
                [x, y] => self.gl.uniform_2_i32(Some(&loc), x, y),
                [x, y, z] => self.gl.uniform_3_i32(Some(&loc), x, y, z),
                [x, y, z, w] => self.gl.uniform_4_i32(Some(&loc), x, y, z, w),
                _ => log::warn!("uniform_i32: unsupported component count {}", values.len()),
            }
        }
    }

    fn uniform_f32_array(&self, location: i32, components: usize, values: &[f32]) {
        let loc = uniform(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_f32_slice(Some(&loc), values),
                2 => self.gl.uniform_2_f32_slice(Some(&loc), values),
                3 => self.gl.uniform_3_f32_slice(Some(&loc), values),
                4 => self.gl.uniform_4_f32_slice(Some(&loc), values),
                _ => log::warn!("uniform_f32_array: unsupported component count {components}"),
            }
        }
    }

    fn uniform_matrix3(&self, location: i32, values: &[f32]) {
        let loc = uniform(location);
        unsafe { self.gl.uniform_matrix_3_f32_slice(Some(&loc), false, values) }
    }

    fn uniform_matrix4(&self, location: i32, values: &[f32]) {
        let loc = uniform(location);
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&loc), false, values) }
    }
}
