//! The document's entity types: one closed sum type over every item
//! variant, plus the attributes shared by all of them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strokepad_geometry::{PathData, Point, Rect, Transform, Vec2};
use uuid::Uuid;

use crate::style::{FillStyle, Font, PathText, Rgba, StrokeStyle};

/// Stable item identity. Commands and the codec re-target items through
/// this id rather than holding references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document item. The shared attributes live here; everything
/// variant-specific is behind [`ItemKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    /// Position in the owner's coordinate space (scene space for
    /// top-level items, parent-local otherwise).
    pub pos: Point,
    /// Rotation in degrees, about `origin`.
    pub rotation: f32,
    /// Non-uniform scale, about `origin`.
    pub scale: Vec2,
    /// Extra affine matrix applied on top of scale/rotation; flips and
    /// skews land here.
    pub transform: Transform,
    pub origin: Point,
    /// Paint order among direct document children. Ties break by
    /// insertion order.
    pub z: f32,
    pub visible: bool,
    /// Opacity in [0, 1].
    pub opacity: f32,
    /// Free-text label shown as the item's tooltip.
    pub name: String,
    pub parent: Option<ItemId>,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            pos: Point::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            transform: Transform::IDENTITY,
            origin: Point::ZERO,
            z: 0.0,
            visible: true,
            opacity: 1.0,
            name: String::new(),
            parent: None,
        }
    }

    pub fn at(mut self, pos: Point) -> Self {
        self.pos = pos;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn child_of(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The item's matrix in its owner's coordinate space.
    pub fn local_matrix(&self) -> Transform {
        Transform::for_item(self.pos, self.rotation, self.scale, self.origin, &self.transform)
    }

    pub fn is_frame(&self) -> bool {
        matches!(self.kind, ItemKind::Frame(_))
    }
}

/// Every item variant the document can hold. Dispatch is an exhaustive
/// match wherever items are handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Path(PathItem),
    LeaderLine(LeaderLine),
    Text(TextBlock),
    Frame(CanvasFrame),
    Group(Group),
    Image(ImageAsset),
}

impl ItemKind {
    /// The record tag this variant serializes under. Also handy for logs
    /// and assertions.
    pub fn tag(&self) -> &'static str {
        match self {
            ItemKind::Path(_) => "path",
            ItemKind::LeaderLine(_) => "leader_line",
            ItemKind::Text(_) => "text",
            ItemKind::Frame(_) => "frame",
            ItemKind::Group(_) => "group",
            ItemKind::Image(_) => "image",
        }
    }
}

/// A freeform drawn path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    pub path: PathData,
    pub stroke: StrokeStyle,
    pub fill: FillStyle,
    /// Text rendered along the path, if enabled.
    pub text: Option<PathText>,
    /// Set once the path has been run through the smoother.
    pub smoothed: bool,
}

impl PathItem {
    pub fn new(path: PathData, stroke: StrokeStyle, fill: FillStyle) -> Self {
        Self {
            path,
            stroke,
            fill,
            text: None,
            smoothed: false,
        }
    }
}

/// A line with an owned text label kept at its terminal point. The label
/// is a child [`TextBlock`] item referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderLine {
    pub path: PathData,
    pub stroke: StrokeStyle,
    pub fill: FillStyle,
    pub label: ItemId,
}

/// Plain or markdown-rendered text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub content: String,
    pub markdown: bool,
    pub font: Font,
    pub color: Rgba,
}

impl TextBlock {
    pub fn new(content: impl Into<String>, font: Font, color: Rgba) -> Self {
        Self {
            content: content.into(),
            markdown: false,
            font,
            color,
        }
    }

    /// Rough extent used for hit tests and alignment; real text layout is
    /// the renderer's concern.
    pub fn approx_bounds(&self) -> Rect {
        let mut width: f32 = 0.0;
        let mut lines = 0;
        for line in self.content.lines() {
            width = width.max(line.chars().count() as f32 * self.font.size * 0.6);
            lines += 1;
        }
        let lines = lines.max(1);
        Rect::from_size(width.max(self.font.size), lines as f32 * self.font.size * 1.2)
    }
}

/// A page-like rectangular container. Its rect sits at the local origin;
/// the fixed label child renders the frame's name at the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasFrame {
    pub rect: Rect,
    pub label: ItemId,
}

/// An ordered collection of owned children. Groups never contain other
/// groups or frames.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub children: Vec<ItemId>,
}

/// An embedded raster or vector asset. The payload keeps the document
/// self-contained even when the source file disappears.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Where the asset came from; re-checked and re-read at load time.
    pub source: Option<PathBuf>,
    pub payload: ImagePayload,
    /// Pixel (or nominal) extent, captured at import.
    pub natural_size: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    /// PNG-encoded pixel data.
    Raster(Vec<u8>),
    /// Inline vector markup.
    Vector(String),
}

/// The reversible slice of an item's transform attributes, captured as a
/// unit so transform-style commands swap all of it atomically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub scale: Vec2,
    pub rotation: f32,
    pub transform: Transform,
    pub origin: Point,
}

impl TransformState {
    pub fn capture(item: &Item) -> Self {
        Self {
            scale: item.scale,
            rotation: item.rotation,
            transform: item.transform,
            origin: item.origin,
        }
    }

    pub fn apply_to(&self, item: &mut Item) {
        item.scale = self.scale;
        item.rotation = self.rotation;
        item.transform = self.transform;
        item.origin = self.origin;
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: Vec2::ONE,
            rotation: 0.0,
            transform: Transform::IDENTITY,
            origin: Point::ZERO,
        }
    }
}
