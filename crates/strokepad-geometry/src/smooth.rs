use crate::path::PathData;
use crate::point::Point;

/// Inputs with fewer on-path points than this are returned unchanged.
pub const MIN_SMOOTH_POINTS: usize = 5;

/// Reduce angular noise in a point sequence by moving each interior point
/// toward the midpoint of its neighbors. `factor` is clamped to [0, 1];
/// 0 leaves the input untouched, higher values cut corners harder. The
/// first and last points are never moved.
pub fn smooth_points(points: &[Point], factor: f32) -> Vec<Point> {
    let factor = factor.clamp(0.0, 1.0);
    if factor == 0.0 || points.len() < MIN_SMOOTH_POINTS {
        return points.to_vec();
    }

    let mut out = points.to_vec();
    for i in 1..points.len() - 1 {
        let mid = Point::midpoint(points[i - 1], points[i + 1]);
        out[i] = points[i].lerp(mid, factor);
    }
    out
}

/// Smooth a path's on-path points, keeping segment kinds intact. Paths
/// below the minimum point count come back unchanged.
pub fn smooth_path(path: &PathData, factor: f32) -> PathData {
    let points = path.points();
    if factor.clamp(0.0, 1.0) == 0.0 || points.len() < MIN_SMOOTH_POINTS {
        return path.clone();
    }
    let mut out = path.clone();
    out.set_points(&smooth_points(&points, factor));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn zigzag(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(i as f32, if i % 2 == 0 { 0.0 } else { 2.0 }))
            .collect()
    }

    #[test]
    fn factor_zero_is_identity() {
        let points = zigzag(8);
        assert_eq!(smooth_points(&points, 0.0), points);
    }

    #[test]
    fn short_input_unchanged() {
        let points = zigzag(MIN_SMOOTH_POINTS - 1);
        assert_eq!(smooth_points(&points, 0.9), points);
    }

    #[test]
    fn interior_points_pull_toward_neighbors() {
        let points = zigzag(7);
        let smoothed = smooth_points(&points, 0.5);
        // Peak at index 1 moves halfway toward the neighbor midpoint (y=0).
        assert_eq!(smoothed[1].y, 1.0);
        assert_eq!(smoothed[0], points[0]);
        assert_eq!(smoothed[6], points[6]);
    }

    #[test]
    fn path_variant_matches_point_variant() {
        let points = zigzag(9);
        let path = PathData::from_points(&points);
        let smoothed = smooth_path(&path, 0.3);
        assert_eq!(smoothed.points(), smooth_points(&points, 0.3));
        assert_eq!(smoothed.seg_count(), path.seg_count());
    }

    proptest! {
        #[test]
        fn endpoints_always_preserved(
            xs in proptest::collection::vec((-1000.0f32..1000.0, -1000.0f32..1000.0), 5..40),
            factor in 0.0f32..=1.0,
        ) {
            let points: Vec<Point> = xs.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            let smoothed = smooth_points(&points, factor);
            prop_assert_eq!(smoothed.len(), points.len());
            prop_assert_eq!(smoothed[0], points[0]);
            prop_assert_eq!(smoothed[points.len() - 1], points[points.len() - 1]);
        }

        #[test]
        fn factor_zero_identity_for_any_input(
            xs in proptest::collection::vec((-100.0f32..100.0, -100.0f32..100.0), 0..30),
        ) {
            let points: Vec<Point> = xs.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            prop_assert_eq!(smooth_points(&points, 0.0), points);
        }
    }
}
