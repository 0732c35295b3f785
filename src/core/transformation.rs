use crate::core::geo::Point;

/// Affine scaling from projected coordinates into pixel space.
///
/// `transform(p, s) = (s * (a * p.x + b), s * (c * p.y + d))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl Transformation {
    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    pub fn transform(&self, point: &Point, scale: f64) -> Point {
        let mut result = *point;
        self.transform_mut(&mut result, scale);
        result
    }

    /// In-place variant for per-frame conversions
    pub fn transform_mut<'a>(&self, point: &'a mut Point, scale: f64) -> &'a mut Point {
        point.x = scale * (self.a * point.x + self.b);
        point.y = scale * (self.c * point.y + self.d);
        point
    }

    pub fn untransform(&self, point: &Point, scale: f64) -> Point {
        Point::new(
            (point.x / scale - self.b) / self.a,
            (point.y / scale - self.d) / self.c,
        )
    }
}
