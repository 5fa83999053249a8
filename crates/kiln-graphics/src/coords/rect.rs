use super::{Vec2, Vec2i};

/// Axis-aligned rectangle (top-left origin).
///
/// Used both for world-space areas and for normalized `[0, 1]` sub-rects of a
/// render target (view viewports and scissors).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    /// The full normalized rect, origin (0, 0) size (1, 1).
    pub const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y + self.size.y)
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.origin + self.size / 2.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut x = self.origin.x;
        let mut y = self.origin.y;
        let mut w = self.size.x;
        let mut h = self.size.y;

        if w < 0.0 {
            x += w;
            w = -w;
        }
        if h < 0.0 {
            y += h;
            h = -h;
        }

        Rect::new(x, y, w, h)
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let r = self.normalized();
        p.x >= r.origin.x
            && p.y >= r.origin.y
            && p.x < (r.origin.x + r.size.x)
            && p.y < (r.origin.y + r.size.y)
    }

    /// Smallest rect containing every point, or an empty rect at the origin.
    pub fn bounding(points: impl IntoIterator<Item = Vec2>) -> Rect {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Rect::default();
        };

        let (mut lo, mut hi) = (first, first);
        for p in iter {
            lo = Vec2::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Vec2::new(hi.x.max(p.x), hi.y.max(p.y));
        }

        Rect::from_origin_size(lo, hi - lo)
    }
}

impl From<IntRect> for Rect {
    #[inline]
    fn from(r: IntRect) -> Self {
        Rect::new(
            r.origin.x as f32,
            r.origin.y as f32,
            r.size.x as f32,
            r.size.y as f32,
        )
    }
}

/// Integer rectangle in target pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    pub origin: Vec2i,
    pub size: Vec2i,
}

impl IntRect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            origin: Vec2i::new(x, y),
            size: Vec2i::new(w, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_positive_is_identity() {
        let rect = r(1.0, 2.0, 10.0, 20.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_negative_width() {
        let n = r(10.0, 0.0, -4.0, 5.0).normalized();
        assert_eq!(n.origin.x, 6.0);
        assert_eq!(n.size.x, 4.0);
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_top_left_inclusive() {
        assert!(r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn contains_bottom_right_exclusive() {
        assert!(!r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(10.0, 10.0)));
    }

    // ── bounding ──────────────────────────────────────────────────────────

    #[test]
    fn bounding_of_quad() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(Rect::bounding(pts), r(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn bounding_of_nothing_is_empty() {
        assert!(Rect::bounding(std::iter::empty()).is_empty());
    }

    #[test]
    fn unit_rect_compares_equal_to_literal() {
        assert_eq!(Rect::UNIT, r(0.0, 0.0, 1.0, 1.0));
    }
}
