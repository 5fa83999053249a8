//! State enumerant → driver enumerant mapping.
//!
//! Every mapping is an exhaustive `match` over a closed enum, so there is no
//! "invalid value" path. The one runtime substitution is `Min`/`Max` blending
//! on drivers without the min/max extension, which falls back to `FUNC_ADD`.

use std::sync::Once;

use crate::render::PrimitiveType;
use crate::state::{Equation, Factor, StencilComparison, StencilUpdateOperation};

static MINMAX_FALLBACK_WARNED: Once = Once::new();

pub fn blend_factor(factor: Factor) -> u32 {
    match factor {
        Factor::Zero => glow::ZERO,
        Factor::One => glow::ONE,
        Factor::SrcColor => glow::SRC_COLOR,
        Factor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        Factor::DstColor => glow::DST_COLOR,
        Factor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        Factor::SrcAlpha => glow::SRC_ALPHA,
        Factor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        Factor::DstAlpha => glow::DST_ALPHA,
        Factor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

/// Maps a blend equation, substituting `FUNC_ADD` for `Min`/`Max` when
/// `minmax_supported` is false. The substitution is warned about once per
/// process.
pub fn blend_equation(equation: Equation, minmax_supported: bool) -> u32 {
    match equation {
        Equation::Add => glow::FUNC_ADD,
        Equation::Subtract => glow::FUNC_SUBTRACT,
        Equation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        Equation::Min | Equation::Max if !minmax_supported => {
            MINMAX_FALLBACK_WARNED.call_once(|| {
                log::warn!(
                    "min/max blend equations are not supported by this driver; \
                     falling back to additive blending"
                );
            });
            glow::FUNC_ADD
        }
        Equation::Min => glow::MIN,
        Equation::Max => glow::MAX,
    }
}

pub fn stencil_function(comparison: StencilComparison) -> u32 {
    match comparison {
        StencilComparison::Never => glow::NEVER,
        StencilComparison::Less => glow::LESS,
        StencilComparison::LessEqual => glow::LEQUAL,
        StencilComparison::Greater => glow::GREATER,
        StencilComparison::GreaterEqual => glow::GEQUAL,
        StencilComparison::Equal => glow::EQUAL,
        StencilComparison::NotEqual => glow::NOTEQUAL,
        StencilComparison::Always => glow::ALWAYS,
    }
}

pub fn stencil_operation(operation: StencilUpdateOperation) -> u32 {
    match operation {
        StencilUpdateOperation::Keep => glow::KEEP,
        StencilUpdateOperation::Zero => glow::ZERO,
        StencilUpdateOperation::Replace => glow::REPLACE,
        StencilUpdateOperation::Increment => glow::INCR,
        StencilUpdateOperation::Decrement => glow::DECR,
        StencilUpdateOperation::Invert => glow::INVERT,
    }
}

pub fn primitive_mode(primitive: PrimitiveType) -> u32 {
    match primitive {
        PrimitiveType::Points => glow::POINTS,
        PrimitiveType::Lines => glow::LINES,
        PrimitiveType::LineStrip => glow::LINE_STRIP,
        PrimitiveType::Triangles => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveType::TriangleFan => glow::TRIANGLE_FAN,
    }
}
