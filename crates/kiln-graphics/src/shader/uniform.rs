use crate::coords::{Transform, Vec2};
use crate::paint::Color;

/// Value for a scalar, vector or matrix uniform.
///
/// Booleans upload as integers. Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Uniform {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Bool(bool),
    BVec2([bool; 2]),
    BVec3([bool; 3]),
    BVec4([bool; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl From<f32> for Uniform {
    fn from(v: f32) -> Self {
        Uniform::Float(v)
    }
}

impl From<i32> for Uniform {
    fn from(v: i32) -> Self {
        Uniform::Int(v)
    }
}

impl From<bool> for Uniform {
    fn from(v: bool) -> Self {
        Uniform::Bool(v)
    }
}

impl From<Vec2> for Uniform {
    fn from(v: Vec2) -> Self {
        Uniform::Vec2([v.x, v.y])
    }
}

/// Normalized RGBA.
impl From<Color> for Uniform {
    fn from(c: Color) -> Self {
        Uniform::Vec4(c.to_normalized())
    }
}

/// Full 4×4 matrix of the transform.
impl From<Transform> for Uniform {
    fn from(t: Transform) -> Self {
        Uniform::Mat4(t.matrix())
    }
}

fn bools<const N: usize>(v: [bool; N]) -> [i32; N] {
    v.map(i32::from)
}

/// Driver-ready payload of a uniform value.
pub(super) enum Payload {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl Uniform {
    pub(super) fn payload(self) -> Payload {
        match self {
            Uniform::Float(v) => Payload::Floats(vec![v]),
            Uniform::Vec2(v) => Payload::Floats(v.to_vec()),
            Uniform::Vec3(v) => Payload::Floats(v.to_vec()),
            Uniform::Vec4(v) => Payload::Floats(v.to_vec()),
            Uniform::Int(v) => Payload::Ints(vec![v]),
            Uniform::IVec2(v) => Payload::Ints(v.to_vec()),
            Uniform::IVec3(v) => Payload::Ints(v.to_vec()),
            Uniform::IVec4(v) => Payload::Ints(v.to_vec()),
            Uniform::Bool(v) => Payload::Ints(vec![i32::from(v)]),
            Uniform::BVec2(v) => Payload::Ints(bools(v).to_vec()),
            Uniform::BVec3(v) => Payload::Ints(bools(v).to_vec()),
            Uniform::BVec4(v) => Payload::Ints(bools(v).to_vec()),
            Uniform::Mat3(m) => Payload::Mat3(m),
            Uniform::Mat4(m) => Payload::Mat4(m),
        }
    }
}
