//! Stroke, fill, and font descriptors shared by items and the codec.

use serde::{Deserialize, Serialize};

/// An RGBA color. Alpha 0 is fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DashPattern {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Flat,
    Square,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// Pen settings for path outlines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f32,
    pub dash: DashPattern,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width: 3.0,
            dash: DashPattern::Solid,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }
}

/// Brush settings for path interiors. Transparency lives in the color alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillStyle {
    pub color: Rgba,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self {
            color: Rgba::TRANSPARENT,
        }
    }
}

/// A font descriptor. Size is in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub letter_spacing: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 20.0,
            bold: false,
            italic: false,
            underline: false,
            letter_spacing: 1.0,
        }
    }
}

/// Text rendered along a freeform path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathText {
    pub text: String,
    pub font: Font,
    pub color: Rgba,
    /// Extra spacing between characters, in path-length units.
    pub spacing: f32,
    /// Start at the first path point instead of distributing along it.
    pub from_beginning: bool,
}

impl Default for PathText {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: Font::default(),
            color: Rgba::BLACK,
            spacing: 3.0,
            from_beginning: false,
        }
    }
}
