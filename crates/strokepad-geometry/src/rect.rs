use serde::{Deserialize, Serialize};

use crate::point::Point;

/// An axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build from two arbitrary corners, normalizing min/max.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// A rectangle anchored at the local origin. Width and height may be
    /// negative while a drag is in flight; such a rect is empty.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            min: Point::ZERO,
            max: Point::new(width, height),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Empty when either extent is not positive.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::midpoint(self.min, self.max)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Smallest rect covering all points; `None` for an empty slice.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect {
            min: first,
            max: first,
        };
        for p in iter {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_corners() {
        let r = Rect::from_points(Point::new(5.0, 1.0), Point::new(-1.0, 4.0));
        assert_eq!(r.min, Point::new(-1.0, 1.0));
        assert_eq!(r.max, Point::new(5.0, 4.0));
        assert!(!r.is_empty());
    }

    #[test]
    fn negative_drag_is_empty() {
        assert!(Rect::from_size(-10.0, 5.0).is_empty());
        assert!(Rect::from_size(10.0, 0.0).is_empty());
        assert!(!Rect::from_size(10.0, 5.0).is_empty());
    }

    #[test]
    fn bounding_covers_all_points() {
        let r = Rect::bounding([
            Point::new(1.0, 1.0),
            Point::new(-2.0, 3.0),
            Point::new(4.0, 0.0),
        ])
        .unwrap();
        assert_eq!(r.min, Point::new(-2.0, 0.0));
        assert_eq!(r.max, Point::new(4.0, 3.0));
        assert!(Rect::bounding([]).is_none());
    }
}
