//! Graphics driver abstraction.
//!
//! [`Driver`] is the GL-style surface the pipeline issues calls against. It is
//! stateful and context-scoped: every call applies to whichever driver context
//! is current on the calling thread, and the order of calls is observable.
//!
//! Conventions:
//! - object handles are plain `u32`, `0` meaning "none" (bind 0 to unbind)
//! - enumerants are the GL values re-exported by `glow`
//! - uniform locations are `i32`; lookups return `None` when the name is unknown
//!
//! Backends:
//! - [`GlowDriver`]: OpenGL / GLES / WebGL2 through `glow`
//! - [`RecordingDriver`]: headless, records every call for inspection

pub mod constants;
#[cfg(not(target_arch = "wasm32"))]
mod gl;
pub mod recording;

#[cfg(not(target_arch = "wasm32"))]
pub use gl::GlowDriver;
pub use recording::{Call, RecordingDriver};

/// Opaque identity of a driver context, unique per live context.
pub type ContextId = u64;

/// Native object handle; `0` is "no object".
pub type Handle = u32;

/// Feature set reported by a driver context.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// GLES / WebGL context (affects the built-in shader dialect).
    pub embedded: bool,
    pub geometry_shaders: bool,
    /// `Equation::Min` / `Equation::Max` support.
    pub blend_minmax: bool,
    pub vertex_buffers: bool,
    pub vertex_array_objects: bool,
    pub framebuffer_srgb: bool,
    pub npot_textures: bool,
    /// Combined texture image units across all stages.
    pub max_texture_units: u32,
}

impl Default for Capabilities {
    /// Desktop OpenGL 3.3 core.
    fn default() -> Self {
        Self {
            embedded: false,
            geometry_shaders: true,
            blend_minmax: true,
            vertex_buffers: true,
            vertex_array_objects: true,
            framebuffer_srgb: true,
            npot_textures: true,
            max_texture_units: 16,
        }
    }
}

/// Programmable stage of a shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// GL-style driver surface consumed by the draw pipeline, shaders and textures.
///
/// All methods take `&self`: the driver context is itself the mutable state.
pub trait Driver {
    // ── context ───────────────────────────────────────────────────────────

    /// Identity of the context current on the calling thread.
    fn context_id(&self) -> ContextId;

    fn capabilities(&self) -> Capabilities;

    /// Pops the oldest pending error code, `0` when none.
    fn get_error(&self) -> u32;

    fn flush(&self);

    // ── fixed-function state ──────────────────────────────────────────────

    fn enable(&self, cap: u32);
    fn disable(&self, cap: u32);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32);
    fn stencil_op(&self, stencil_fail: u32, depth_fail: u32, pass: u32);
    fn stencil_func(&self, func: u32, reference: i32, mask: u32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_stencil(&self, value: i32);
    fn clear(&self, mask: u32);

    // ── buffers & vertex arrays ───────────────────────────────────────────

    fn create_buffer(&self) -> Result<Handle, String>;
    fn delete_buffer(&self, buffer: Handle);
    fn bind_array_buffer(&self, buffer: Handle);
    fn buffer_data(&self, data: &[u8], usage: u32);
    fn buffer_sub_data(&self, offset: usize, data: &[u8]);
    fn create_vertex_array(&self) -> Result<Handle, String>;
    fn delete_vertex_array(&self, array: Handle);
    fn bind_vertex_array(&self, array: Handle);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> Result<Handle, String>;
    fn delete_texture(&self, texture: Handle);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Handle);
    /// Texture bound to the active unit, `0` when none.
    fn bound_texture(&self) -> Handle;
    fn tex_parameter(&self, pname: u32, value: i32);
    /// Allocates RGBA8 storage for the bound texture, optionally filled.
    fn tex_image_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>);
    fn tex_sub_image_rgba(&self, x: i32, y: i32, width: i32, height: i32, pixels: &[u8]);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> Result<Handle, String>;
    fn delete_program(&self, program: Handle);
    fn create_shader(&self, stage: ShaderStage) -> Result<Handle, String>;
    fn delete_shader(&self, shader: Handle);
    fn shader_source(&self, shader: Handle, source: &str);
    fn compile_shader(&self, shader: Handle);
    fn shader_compile_status(&self, shader: Handle) -> bool;
    fn shader_info_log(&self, shader: Handle) -> String;
    fn attach_shader(&self, program: Handle, shader: Handle);
    fn link_program(&self, program: Handle);
    fn program_link_status(&self, program: Handle) -> bool;
    fn program_info_log(&self, program: Handle) -> String;
    fn use_program(&self, program: Handle);
    /// Program currently in use, `0` when none.
    fn current_program(&self) -> Handle;
    fn uniform_location(&self, program: Handle, name: &str) -> Option<i32>;
    fn attrib_location(&self, program: Handle, name: &str) -> Option<u32>;

    // ── uniform uploads (to the program in use) ───────────────────────────

    fn uniform_f32(&self, location: i32, values: &[f32]);
    fn uniform_i32(&self, location: i32, values: &[i32]);
    /// `components` (1–4) floats per element, `values.len() / components` elements.
    fn uniform_f32_array(&self, location: i32, components: usize, values: &[f32]);
    fn uniform_matrix3(&self, location: i32, values: &[f32]);
    fn uniform_matrix4(&self, location: i32, values: &[f32]);
}
