/// Source/destination weighting applied when blending.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Factor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// How weighted source and destination are combined.
///
/// `Min` and `Max` need driver support; without it they behave as `Add`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Equation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Separate color/alpha blend configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendMode {
    pub color_src_factor: Factor,
    pub color_dst_factor: Factor,
    pub color_equation: Equation,
    pub alpha_src_factor: Factor,
    pub alpha_dst_factor: Factor,
    pub alpha_equation: Equation,
}

impl BlendMode {
    /// Same factors and equation for color and alpha.
    pub const fn new(src: Factor, dst: Factor, equation: Equation) -> Self {
        Self {
            color_src_factor: src,
            color_dst_factor: dst,
            color_equation: equation,
            alpha_src_factor: src,
            alpha_dst_factor: dst,
            alpha_equation: equation,
        }
    }

    pub const fn separate(
        color_src_factor: Factor,
        color_dst_factor: Factor,
        color_equation: Equation,
        alpha_src_factor: Factor,
        alpha_dst_factor: Factor,
        alpha_equation: Equation,
    ) -> Self {
        Self {
            color_src_factor,
            color_dst_factor,
            color_equation,
            alpha_src_factor,
            alpha_dst_factor,
            alpha_equation,
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BLEND_ALPHA
    }
}

/// Standard "over" compositing with straight alpha.
pub const BLEND_ALPHA: BlendMode = BlendMode::separate(
    Factor::SrcAlpha,
    Factor::OneMinusSrcAlpha,
    Equation::Add,
    Factor::One,
    Factor::OneMinusSrcAlpha,
    Equation::Add,
);

/// Additive blending, weighted by source alpha.
pub const BLEND_ADD: BlendMode = BlendMode::separate(
    Factor::SrcAlpha,
    Factor::One,
    Equation::Add,
    Factor::One,
    Factor::One,
    Equation::Add,
);

pub const BLEND_MULTIPLY: BlendMode = BlendMode::new(Factor::DstColor, Factor::Zero, Equation::Add);

pub const BLEND_MIN: BlendMode = BlendMode::new(Factor::One, Factor::One, Equation::Min);

pub const BLEND_MAX: BlendMode = BlendMode::new(Factor::One, Factor::One, Equation::Max);

/// Overwrite the destination.
pub const BLEND_NONE: BlendMode = BlendMode::new(Factor::One, Factor::Zero, Equation::Add);
