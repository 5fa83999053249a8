use crate::driver::Handle;
use crate::render::Vertex;
use crate::state::{BlendMode, CoordinateType, StencilMode};

/// Vertex attribute locations of the program last applied.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub(crate) struct AttribLocations {
    pub position: Option<u32>,
    pub color: Option<u32>,
    pub tex_coords: Option<u32>,
}

impl AttribLocations {
    pub fn iter(self) -> impl Iterator<Item = u32> {
        [self.position, self.color, self.tex_coords].into_iter().flatten()
    }
}

/// Driver state a render target last applied, used to skip redundant calls.
///
/// While `enable` is false nothing here is trusted and every state-setting
/// step re-applies unconditionally.
#[derive(Debug)]
pub(crate) struct DrawStateCache {
    /// Cache contents reflect the driver.
    pub enable: bool,
    /// `reset_gl_states` has run since the target became active in a context.
    pub gl_states_set: bool,
    pub view_changed: bool,
    pub scissor_enabled: bool,
    pub stencil_enabled: bool,
    pub last_blend_mode: BlendMode,
    pub last_stencil_mode: StencilMode,
    /// Texture cache id, `0` for none.
    pub last_texture_id: u64,
    pub last_coordinate_type: CoordinateType,
    /// Program handle, `0` for none.
    pub last_shader_id: Handle,
    pub attribs: AttribLocations,
    /// The last draw uploaded pre-transformed vertices.
    pub use_vertex_cache: bool,
    pub tex_coords_array_enabled: bool,
    /// Pre-transform scratch space, `vertex_cache_capacity` long.
    pub vertex_cache: Vec<Vertex>,
    pub vertex_buffer: Handle,
    pub vertex_array: Handle,
}

impl DrawStateCache {
    pub fn new(vertex_cache_capacity: usize) -> Self {
        Self {
            enable: false,
            gl_states_set: false,
            view_changed: true,
            scissor_enabled: false,
            stencil_enabled: false,
            last_blend_mode: BlendMode::default(),
            last_stencil_mode: StencilMode::default(),
            last_texture_id: 0,
            last_coordinate_type: CoordinateType::default(),
            last_shader_id: 0,
            attribs: AttribLocations::default(),
            use_vertex_cache: false,
            tex_coords_array_enabled: false,
            vertex_cache: vec![Vertex::default(); vertex_cache_capacity],
            vertex_buffer: 0,
            vertex_array: 0,
        }
    }

    #[inline]
    pub fn vertex_cache_capacity(&self) -> usize {
        self.vertex_cache.len()
    }
}
