//! Geometry primitives for the strokepad document model.
//!
//! Points, rectangles, affine transforms, the path segment model, and the
//! freehand path smoother. No dependencies beyond serde.

mod path;
mod point;
mod rect;
mod smooth;
mod transform;

pub use path::{PathData, PathSeg};
pub use point::{Point, Vec2};
pub use rect::Rect;
pub use smooth::{MIN_SMOOTH_POINTS, smooth_path, smooth_points};
pub use transform::Transform;
