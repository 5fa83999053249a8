use std::cell::Cell;
use std::rc::Rc;

use crate::coords::Vec2u;

/// What a render target draws into: a window's default framebuffer, an
/// offscreen texture, or anything else the windowing layer provides.
pub trait RenderSurface {
    /// Pixel size of the drawable area.
    fn size(&self) -> Vec2u;

    /// Whether the surface stores sRGB-encoded color. When true (and the
    /// driver supports it) sRGB conversion is enabled for draws.
    fn is_srgb(&self) -> bool {
        false
    }

    /// Makes (or stops making) the surface's context current. Returning
    /// `false` aborts target activation.
    fn activate(&mut self, _active: bool) -> bool {
        true
    }
}

/// Default framebuffer of an already-current context.
///
/// Clones share the size, so the windowing layer can keep one and report
/// resizes while the render target owns another.
#[derive(Debug, Clone)]
pub struct DefaultFramebuffer {
    size: Rc<Cell<Vec2u>>,
    srgb: bool,
}

impl DefaultFramebuffer {
    pub fn new(size: Vec2u) -> Self {
        Self {
            size: Rc::new(Cell::new(size)),
            srgb: false,
        }
    }

    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }

    pub fn resize(&self, size: Vec2u) {
        self.size.set(size);
    }
}

impl RenderSurface for DefaultFramebuffer {
    fn size(&self) -> Vec2u {
        self.size.get()
    }

    fn is_srgb(&self) -> bool {
        self.srgb
    }
}
