/// Test applied between the reference value and the stored stencil value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilComparison {
    Never,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Always,
}

/// Update applied to the stencil buffer when a fragment is written.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilUpdateOperation {
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
}

/// Stencil reference or mask value.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct StencilValue(pub u32);

impl From<u32> for StencilValue {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Stencil configuration for one draw.
///
/// `StencilMode::default()` disables the stencil test entirely.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilMode {
    pub comparison: StencilComparison,
    pub update_operation: StencilUpdateOperation,
    pub reference: StencilValue,
    pub mask: StencilValue,
    /// Write only to the stencil buffer; the color mask is zeroed for the draw.
    pub stencil_only: bool,
}

impl StencilMode {
    #[inline]
    pub fn is_disabled(&self) -> bool {
        *self == StencilMode::default()
    }
}

impl Default for StencilMode {
    fn default() -> Self {
        Self {
            comparison: StencilComparison::Always,
            update_operation: StencilUpdateOperation::Keep,
            reference: StencilValue(0),
            mask: StencilValue(!0),
            stencil_only: false,
        }
    }
}
