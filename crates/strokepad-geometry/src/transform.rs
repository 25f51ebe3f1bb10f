use serde::{Deserialize, Serialize};

use crate::point::{Point, Vec2};
use crate::rect::Rect;

/// A row-major 3x3 affine transform. Points map as row vectors, so chained
/// multiplication reads left to right: `a.then(&b)` applies `a` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m11: f32,
    pub m12: f32,
    pub m13: f32,
    pub m21: f32,
    pub m22: f32,
    pub m23: f32,
    pub m31: f32,
    pub m32: f32,
    pub m33: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m11: 1.0,
        m12: 0.0,
        m13: 0.0,
        m21: 0.0,
        m22: 1.0,
        m23: 0.0,
        m31: 0.0,
        m32: 0.0,
        m33: 1.0,
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn from_translation(dx: f32, dy: f32) -> Self {
        Transform {
            m31: dx,
            m32: dy,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(sx: f32, sy: f32) -> Self {
        Transform {
            m11: sx,
            m22: sy,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation_deg(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Transform {
            m11: cos,
            m12: sin,
            m21: -sin,
            m22: cos,
            ..Self::IDENTITY
        }
    }

    /// Post-concatenate a scale, the shape flips use: `t.scaled(-1.0, 1.0)`.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        self.then(&Transform::from_scale(sx, sy))
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        let a = self;
        let b = other;
        Transform {
            m11: a.m11 * b.m11 + a.m12 * b.m21 + a.m13 * b.m31,
            m12: a.m11 * b.m12 + a.m12 * b.m22 + a.m13 * b.m32,
            m13: a.m11 * b.m13 + a.m12 * b.m23 + a.m13 * b.m33,
            m21: a.m21 * b.m11 + a.m22 * b.m21 + a.m23 * b.m31,
            m22: a.m21 * b.m12 + a.m22 * b.m22 + a.m23 * b.m32,
            m23: a.m21 * b.m13 + a.m22 * b.m23 + a.m23 * b.m33,
            m31: a.m31 * b.m11 + a.m32 * b.m21 + a.m33 * b.m31,
            m32: a.m31 * b.m12 + a.m32 * b.m22 + a.m33 * b.m32,
            m33: a.m31 * b.m13 + a.m32 * b.m23 + a.m33 * b.m33,
        }
    }

    pub fn map(&self, p: Point) -> Point {
        Point::new(
            self.m11 * p.x + self.m21 * p.y + self.m31,
            self.m12 * p.x + self.m22 * p.y + self.m32,
        )
    }

    /// Axis-aligned hull of a rect's corners after mapping.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        Rect::bounding(rect.corners().map(|c| self.map(c))).unwrap_or(rect)
    }

    /// The local matrix of an item: scale and rotation about `origin`, the
    /// extra flip/skew matrix, then the item position.
    pub fn for_item(pos: Point, rotation_deg: f32, scale: Vec2, origin: Point, extra: &Transform) -> Transform {
        Transform::from_translation(-origin.x, -origin.y)
            .then(&Transform::from_scale(scale.x, scale.y))
            .then(&Transform::from_rotation_deg(rotation_deg))
            .then(&Transform::from_translation(origin.x, origin.y))
            .then(extra)
            .then(&Transform::from_translation(pos.x, pos.y))
    }
}
