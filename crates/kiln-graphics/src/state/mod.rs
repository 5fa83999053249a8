//! Per-draw render state value types.
//!
//! Everything here is plain data; the draw pipeline diffs these values against
//! its cache to decide which driver calls a draw needs.

mod blend;
mod stencil;

pub use blend::{
    BlendMode, Equation, Factor, BLEND_ADD, BLEND_ALPHA, BLEND_MAX, BLEND_MIN, BLEND_MULTIPLY,
    BLEND_NONE,
};
pub use stencil::{StencilComparison, StencilMode, StencilUpdateOperation, StencilValue};

use crate::coords::Transform;
use crate::shader::Shader;
use crate::texture::Texture;

/// Units of texture coordinates supplied with vertices.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum CoordinateType {
    /// `[0, 1]` across the texture's logical size.
    #[default]
    Normalized,
    /// Texture pixels.
    Pixels,
}

/// Complete state for one draw call.
///
/// Texture and shader are borrowed for the duration of the draw only.
#[derive(Debug, Copy, Clone, Default)]
pub struct RenderStates<'a> {
    pub blend_mode: BlendMode,
    pub stencil_mode: StencilMode,
    pub transform: Transform,
    pub coordinate_type: CoordinateType,
    pub texture: Option<&'a Texture>,
    pub shader: Option<&'a Shader>,
}

impl<'a> RenderStates<'a> {
    pub const DEFAULT: RenderStates<'static> = RenderStates {
        blend_mode: BLEND_ALPHA,
        stencil_mode: StencilMode {
            comparison: StencilComparison::Always,
            update_operation: StencilUpdateOperation::Keep,
            reference: StencilValue(0),
            mask: StencilValue(!0),
            stencil_only: false,
        },
        transform: Transform::IDENTITY,
        coordinate_type: CoordinateType::Normalized,
        texture: None,
        shader: None,
    };

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_stencil_mode(mut self, stencil_mode: StencilMode) -> Self {
        self.stencil_mode = stencil_mode;
        self
    }

    pub fn with_texture(mut self, texture: &'a Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_coordinate_type(mut self, coordinate_type: CoordinateType) -> Self {
        self.coordinate_type = coordinate_type;
        self
    }

    pub fn with_shader(mut self, shader: &'a Shader) -> Self {
        self.shader = Some(shader);
        self
    }
}
