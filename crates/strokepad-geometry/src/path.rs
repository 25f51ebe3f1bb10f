use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// One element of a path: a pen move, a straight segment, or a cubic curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSeg {
    MoveTo(Point),
    LineTo(Point),
    CurveTo { c1: Point, c2: Point, to: Point },
}

impl PathSeg {
    /// The on-path endpoint of this segment.
    pub fn endpoint(&self) -> Point {
        match *self {
            PathSeg::MoveTo(p) | PathSeg::LineTo(p) => p,
            PathSeg::CurveTo { to, .. } => to,
        }
    }
}

/// An ordered sequence of path segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathData {
    segs: Vec<PathSeg>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    /// A polyline starting with a move and continuing with line segments.
    pub fn from_points(points: &[Point]) -> Self {
        let mut path = Self::new();
        let mut iter = points.iter();
        if let Some(&first) = iter.next() {
            path.move_to(first);
            for &p in iter {
                path.line_to(p);
            }
        }
        path
    }

    pub fn begin_at(start: Point) -> Self {
        let mut path = Self::new();
        path.move_to(start);
        path
    }

    pub fn move_to(&mut self, p: Point) {
        self.segs.push(PathSeg::MoveTo(p));
    }

    pub fn line_to(&mut self, p: Point) {
        self.segs.push(PathSeg::LineTo(p));
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.segs.push(PathSeg::CurveTo { c1, c2, to });
    }

    /// Close the current subpath with a straight segment back to the most
    /// recent move point. Does nothing when already closed or degenerate.
    pub fn close_subpath(&mut self) {
        let Some(start) = self
            .segs
            .iter()
            .rev()
            .find_map(|seg| match *seg {
                PathSeg::MoveTo(p) => Some(p),
                _ => None,
            })
        else {
            return;
        };
        match self.segs.last() {
            Some(last) if last.endpoint() != start => self.line_to(start),
            _ => {}
        }
    }

    /// Empty means nothing drawable: no segments, or a lone pen move.
    pub fn is_empty(&self) -> bool {
        match self.segs.as_slice() {
            [] => true,
            [PathSeg::MoveTo(_)] => true,
            _ => false,
        }
    }

    pub fn seg_count(&self) -> usize {
        self.segs.len()
    }

    pub fn segs(&self) -> &[PathSeg] {
        &self.segs
    }

    /// On-path endpoints in order (control points excluded).
    pub fn points(&self) -> Vec<Point> {
        self.segs.iter().map(PathSeg::endpoint).collect()
    }

    pub fn first_point(&self) -> Option<Point> {
        self.segs.first().map(PathSeg::endpoint)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.segs.last().map(PathSeg::endpoint)
    }

    /// Replace the on-path endpoints, keeping segment kinds and control
    /// points. Silently ignores a length mismatch.
    pub fn set_points(&mut self, points: &[Point]) {
        if points.len() != self.segs.len() {
            return;
        }
        for (seg, &p) in self.segs.iter_mut().zip(points) {
            match seg {
                PathSeg::MoveTo(q) | PathSeg::LineTo(q) => *q = p,
                PathSeg::CurveTo { to, .. } => *to = p,
            }
        }
    }

    /// Bounds over every coordinate, control points included.
    pub fn bounds(&self) -> Option<Rect> {
        let mut all = Vec::with_capacity(self.segs.len());
        for seg in &self.segs {
            match *seg {
                PathSeg::MoveTo(p) | PathSeg::LineTo(p) => all.push(p),
                PathSeg::CurveTo { c1, c2, to } => {
                    all.push(c1);
                    all.push(c2);
                    all.push(to);
                }
            }
        }
        Rect::bounding(all)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_move_is_empty() {
        let mut path = PathData::new();
        assert!(path.is_empty());
        path.move_to(Point::new(1.0, 1.0));
        assert!(path.is_empty());
        path.line_to(Point::new(2.0, 2.0));
        assert!(!path.is_empty());
    }

    #[test]
    fn close_subpath_returns_to_move_point() {
        let mut path = PathData::begin_at(Point::ZERO);
        path.line_to(Point::new(4.0, 0.0));
        path.line_to(Point::new(4.0, 4.0));
        path.close_subpath();
        assert_eq!(path.last_point(), Some(Point::ZERO));
        let before = path.seg_count();
        path.close_subpath();
        assert_eq!(path.seg_count(), before);
    }

    #[test]
    fn set_points_keeps_segment_kinds() {
        let mut path = PathData::begin_at(Point::ZERO);
        path.line_to(Point::new(1.0, 0.0));
        path.curve_to(Point::new(1.0, 1.0), Point::new(2.0, 1.0), Point::new(2.0, 0.0));
        let moved: Vec<Point> = path.points().iter().map(|p| p.offset(0.0, 5.0)).collect();
        path.set_points(&moved);
        assert_eq!(path.points(), moved);
        assert!(matches!(path.segs()[2], PathSeg::CurveTo { .. }));
    }

    #[test]
    fn bounds_include_control_points() {
        let mut path = PathData::begin_at(Point::ZERO);
        path.curve_to(Point::new(0.0, 10.0), Point::new(5.0, 10.0), Point::new(5.0, 0.0));
        let b = path.bounds().unwrap();
        assert_eq!(b.max.y, 10.0);
    }
}
