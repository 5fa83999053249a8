use core::ops::{Add, Div, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

/// 2D vector in world or pixel units.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise product.
    #[inline]
    pub fn mul_elem(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x * rhs.x, self.y * rhs.y)
    }

    /// Component-wise quotient.
    #[inline]
    pub fn div_elem(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl From<Vec2i> for Vec2 {
    #[inline]
    fn from(v: Vec2i) -> Self {
        Vec2::new(v.x as f32, v.y as f32)
    }
}

impl From<Vec2u> for Vec2 {
    #[inline]
    fn from(v: Vec2u) -> Self {
        Vec2::new(v.x as f32, v.y as f32)
    }
}

/// Integer 2D vector, used for pixel positions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts by rounding each component to the nearest integer, halves
    /// away from zero.
    #[inline]
    pub fn from_vec2_round(v: Vec2) -> Self {
        Self::new(v.x.round() as i32, v.y.round() as i32)
    }
}

/// Unsigned 2D vector, used for surface and texture sizes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Vec2u {
    pub x: u32,
    pub y: u32,
}

impl Vec2u {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x == 0 || self.y == 0
    }
}
