use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Represents a bounding box in screen/pixel coordinates.
///
/// `min <= max` holds component-wise for every value built through the
/// constructors here, since they all grow the box with [`Bounds::extend`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Creates bounds covering two corner points given in any order
    pub fn new(a: Point, b: Point) -> Self {
        let mut bounds = Self { min: a, max: a };
        bounds.extend(&b);
        bounds
    }

    /// Creates the minimal bounds containing every point; `None` when empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Gets the width of the bounds
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Gets the height of the bounds
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Gets the size as a Point
    pub fn size(&self) -> Point {
        Point::new(self.width(), self.height())
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if the bounds fully contain another bounds
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    /// Checks if the bounds intersect with another bounds
    pub fn intersects(&self, other: &Bounds) -> bool {
        let x_intersects = other.max.x >= self.min.x && other.min.x <= self.max.x;
        let y_intersects = other.max.y >= self.min.y && other.min.y <= self.max.y;
        x_intersects && y_intersects
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &Point) -> &mut Self {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self
    }
}
