use super::{Rect, Transform, Vec2};

/// 2D camera: maps a world-space rectangle onto a normalized sub-rect of a
/// render target.
///
/// - `viewport` and `scissor` are expressed as fractions of the target size,
///   `Rect::UNIT` covering the whole target.
/// - A scissor equal to `Rect::UNIT` means "no scissor test".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct View {
    center: Vec2,
    size: Vec2,
    rotation: f32,
    viewport: Rect,
    scissor: Rect,
}

impl View {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size,
            rotation: 0.0,
            viewport: Rect::UNIT,
            scissor: Rect::UNIT,
        }
    }

    /// View showing exactly `rect` in world units.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.size)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Rotation in degrees, in `[0, 360)`.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    #[inline]
    pub fn scissor(&self) -> Rect {
        self.scissor
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn set_scissor(&mut self, scissor: Rect) {
        self.scissor = scissor;
    }

    pub fn move_by(&mut self, offset: Vec2) {
        self.center = self.center + offset;
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.set_rotation(self.rotation + degrees);
    }

    /// Scales the visible area; factors above 1 show more of the world.
    pub fn zoom(&mut self, factor: f32) {
        self.size = self.size * factor;
    }

    /// World → normalized device coordinates (`[-1, 1]`, Y up).
    #[rustfmt::skip]
    pub fn transform(&self) -> Transform {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let tx = -self.center.x * cos - self.center.y * sin + self.center.x;
        let ty = self.center.x * sin - self.center.y * cos + self.center.y;

        let a = 2.0 / self.size.x;
        let b = -2.0 / self.size.y;
        let c = -a * self.center.x;
        let d = -b * self.center.y;

        Transform::new(
            a * cos, a * sin, a * tx + c,
            -b * sin, b * cos, b * ty + d,
            0.0, 0.0, 1.0,
        )
    }

    pub fn inverse_transform(&self) -> Transform {
        self.transform().inverse()
    }
}

impl Default for View {
    fn default() -> Self {
        Self::from_rect(Rect::new(0.0, 0.0, 1000.0, 1000.0))
    }
}
