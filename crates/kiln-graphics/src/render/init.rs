/// GLSL dialect used for the built-in shaders.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GlslProfile {
    /// `#version 330 core` (desktop OpenGL 3.3+).
    Core330,
    /// `#version 100` (GLES 2 / WebGL 1 and later).
    Es100,
}

/// Initialization parameters for the rendering layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct RenderInit {
    /// Largest vertex count that is transformed on the host before upload.
    ///
    /// Small batches (sprites, quads) are cheaper to pre-transform than to
    /// re-upload the model-view matrix. Larger batches upload raw vertices
    /// and the full transform.
    pub vertex_cache_capacity: usize,

    /// Dialect for the built-in shaders.
    ///
    /// `None` selects from the driver: `Es100` for embedded contexts,
    /// `Core330` otherwise.
    pub glsl_profile: Option<GlslProfile>,
}

impl Default for RenderInit {
    fn default() -> Self {
        Self {
            vertex_cache_capacity: 4,
            glsl_profile: None,
        }
    }
}
