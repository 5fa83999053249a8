use core::ops::Mul;

use super::{Rect, Vec2};

/// 2D affine transform stored as a row-major 3×3 matrix.
///
/// The driver consumes it as a column-major 4×4 matrix via [`Transform::matrix`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    m: [f32; 9],
}

impl Transform {
    #[rustfmt::skip]
    pub const IDENTITY: Transform = Transform::new(
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
    );

    #[rustfmt::skip]
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub const fn new(
        a00: f32, a01: f32, a02: f32,
        a10: f32, a11: f32, a12: f32,
        a20: f32, a21: f32, a22: f32,
    ) -> Self {
        Self { m: [a00, a01, a02, a10, a11, a12, a20, a21, a22] }
    }

    /// Column-major 4×4 matrix suitable for a `mat4` uniform.
    #[rustfmt::skip]
    pub fn matrix(&self) -> [f32; 16] {
        let m = &self.m;
        [
            m[0], m[3], 0.0, m[6],
            m[1], m[4], 0.0, m[7],
            0.0,  0.0,  1.0, 0.0,
            m[2], m[5], 0.0, m[8],
        ]
    }

    /// Returns the inverse, or the identity if the matrix is singular.
    pub fn inverse(&self) -> Transform {
        let m = &self.m;
        let det = m[0] * (m[8] * m[4] - m[5] * m[7])
            - m[3] * (m[8] * m[1] - m[2] * m[7])
            + m[6] * (m[5] * m[1] - m[2] * m[4]);

        if det == 0.0 {
            return Transform::IDENTITY;
        }

        Transform::new(
            (m[8] * m[4] - m[5] * m[7]) / det,
            -(m[8] * m[1] - m[2] * m[7]) / det,
            (m[5] * m[1] - m[2] * m[4]) / det,
            -(m[8] * m[3] - m[5] * m[6]) / det,
            (m[8] * m[0] - m[2] * m[6]) / det,
            -(m[5] * m[0] - m[2] * m[3]) / det,
            (m[7] * m[3] - m[4] * m[6]) / det,
            -(m[7] * m[0] - m[1] * m[6]) / det,
            (m[4] * m[0] - m[1] * m[3]) / det,
        )
    }

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let m = &self.m;
        Vec2::new(
            m[0] * p.x + m[1] * p.y + m[2],
            m[3] * p.x + m[4] * p.y + m[5],
        )
    }

    /// Bounding rect of the four transformed corners.
    pub fn transform_rect(&self, r: Rect) -> Rect {
        let max = r.max();
        Rect::bounding([
            self.transform_point(r.origin),
            self.transform_point(Vec2::new(r.origin.x, max.y)),
            self.transform_point(Vec2::new(max.x, r.origin.y)),
            self.transform_point(max),
        ])
    }

    /// `self * other`: `other` is applied first.
    pub fn combine(&self, other: &Transform) -> Transform {
        let a = &self.m;
        let b = &other.m;
        Transform::new(
            a[0] * b[0] + a[1] * b[3] + a[2] * b[6],
            a[0] * b[1] + a[1] * b[4] + a[2] * b[7],
            a[0] * b[2] + a[1] * b[5] + a[2] * b[8],
            a[3] * b[0] + a[4] * b[3] + a[5] * b[6],
            a[3] * b[1] + a[4] * b[4] + a[5] * b[7],
            a[3] * b[2] + a[4] * b[5] + a[5] * b[8],
            a[6] * b[0] + a[7] * b[3] + a[8] * b[6],
            a[6] * b[1] + a[7] * b[4] + a[8] * b[7],
            a[6] * b[2] + a[7] * b[5] + a[8] * b[8],
        )
    }

    #[rustfmt::skip]
    pub fn translate(&self, offset: Vec2) -> Transform {
        self.combine(&Transform::new(
            1.0, 0.0, offset.x,
            0.0, 1.0, offset.y,
            0.0, 0.0, 1.0,
        ))
    }

    #[rustfmt::skip]
    pub fn scale(&self, factors: Vec2) -> Transform {
        self.combine(&Transform::new(
            factors.x, 0.0, 0.0,
            0.0, factors.y, 0.0,
            0.0, 0.0, 1.0,
        ))
    }

    /// Rotation around the origin, in degrees (clockwise in a Y-down space).
    #[rustfmt::skip]
    pub fn rotate(&self, degrees: f32) -> Transform {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.combine(&Transform::new(
            cos, -sin, 0.0,
            sin, cos, 0.0,
            0.0, 0.0, 1.0,
        ))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;
    #[inline]
    fn mul(self, rhs: Transform) -> Transform {
        self.combine(&rhs)
    }
}

impl Mul<Vec2> for Transform {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: Vec2) -> Vec2 {
        self.transform_point(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn identity_matrix_is_4x4_identity() {
        let m = Transform::IDENTITY.matrix();
        for (i, v) in m.iter().enumerate() {
            let expected = if i % 5 == 0 { 1.0 } else { 0.0 };
            assert_eq!(*v, expected, "element {i}");
        }
    }

    #[test]
    fn translation_lands_in_column_three() {
        let m = Transform::IDENTITY.translate(Vec2::new(3.0, 4.0)).matrix();
        assert_eq!(m[12], 3.0);
        assert_eq!(m[13], 4.0);
    }

    #[test]
    fn inverse_undoes_transform() {
        let t = Transform::IDENTITY
            .translate(Vec2::new(10.0, -5.0))
            .rotate(30.0)
            .scale(Vec2::new(2.0, 0.5));
        let p = Vec2::new(7.0, 3.0);
        assert!(close(t.inverse().transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn singular_inverse_is_identity() {
        let t = Transform::IDENTITY.scale(Vec2::new(0.0, 1.0));
        assert_eq!(t.inverse(), Transform::IDENTITY);
    }

    #[test]
    fn combine_applies_right_first() {
        let t = Transform::IDENTITY
            .translate(Vec2::new(1.0, 0.0))
            .scale(Vec2::new(2.0, 2.0));
        assert!(close(t * Vec2::new(1.0, 1.0), Vec2::new(3.0, 2.0)));
    }
}
