//! The asset import boundary: file paths come in, constructed items
//! come out. Format decoding beyond basic raster sanity checks, and
//! bitmap tracing in particular, are external collaborators.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use strokepad_geometry::Vec2;
use tracing::info;

use crate::item::{ImageAsset, ImagePayload, Item, ItemKind, TextBlock};
use crate::style::{Font, Rgba};

/// What an imported file should become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Raster,
    Vector,
}

/// External bitmap-to-vector conversion. A failed call surfaces as an
/// error to the caller and never touches the document.
pub trait Vectorizer {
    fn vectorize(&self, path: &Path) -> Result<String>;
}

/// Import an asset file as an [`ImageAsset`] item. Raster payloads are
/// decoded once for their pixel size and normalized to PNG so the
/// embedded copy is self-contained.
pub fn import_file(path: &Path, kind: ImportKind) -> Result<Item> {
    let item = match kind {
        ImportKind::Raster => {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read image {path:?}"))?;
            let decoded = image::load_from_memory(&bytes)
                .with_context(|| format!("failed to decode image {path:?}"))?;
            let natural_size = Vec2::new(decoded.width() as f32, decoded.height() as f32);
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .with_context(|| format!("failed to encode image {path:?}"))?;
            Item::new(ItemKind::Image(ImageAsset {
                source: Some(path.to_path_buf()),
                payload: ImagePayload::Raster(png),
                natural_size,
            }))
            .named("Imported Bitmap")
        }
        ImportKind::Vector => {
            let markup = fs::read_to_string(path)
                .with_context(|| format!("failed to read vector file {path:?}"))?;
            Item::new(ItemKind::Image(ImageAsset {
                source: Some(path.to_path_buf()),
                payload: ImagePayload::Vector(markup),
                natural_size: Vec2::new(100.0, 100.0),
            }))
            .named("Imported SVG")
        }
    };
    info!(?path, ?kind, "asset imported");
    Ok(item)
}

/// Import a text or markdown file as a [`TextBlock`] item.
pub fn import_text_file(path: &Path, markdown: bool) -> Result<Item> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read text file {path:?}"))?;
    let mut block = TextBlock::new(content, Font::default(), Rgba::BLACK);
    block.markdown = markdown;
    Ok(Item::new(ItemKind::Text(block)).named(if markdown { "Imported Markdown" } else { "Imported Text" }))
}

/// Run the external tracer over a bitmap and wrap the produced markup
/// as a vector item.
pub fn vectorize_file(vectorizer: &dyn Vectorizer, path: &Path) -> Result<Item> {
    let markup = vectorizer
        .vectorize(path)
        .with_context(|| format!("failed to vectorize {path:?}"))?;
    Ok(Item::new(ItemKind::Image(ImageAsset {
        source: None,
        payload: ImagePayload::Vector(markup),
        natural_size: Vec2::new(100.0, 100.0),
    }))
    .named("Vectorized Image"))
}

/// The source path an asset item can be re-vectorized from, if any.
pub fn vectorize_source(item: &Item) -> Option<PathBuf> {
    match &item.kind {
        ItemKind::Image(ImageAsset {
            source: Some(path),
            payload: ImagePayload::Raster(_),
            ..
        }) => Some(path.clone()),
        _ => None,
    }
}
