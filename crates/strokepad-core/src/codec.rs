//! The document codec: a versioned JSON stream of typed item records.
//!
//! The first record is a metadata header; the rest are the document's
//! direct children in z-order, one record each, with owned children
//! embedded inline so ownership survives reload. Asset records carry
//! the source path only while it still resolves, plus an embedded copy
//! of the bytes so the document stays self-contained.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use strokepad_geometry::{PathData, Point, Rect, Transform, Vec2};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::DocumentError;
use crate::item::{
    CanvasFrame, Group, ImageAsset, ImagePayload, Item, ItemId, ItemKind, LeaderLine, PathItem,
    TextBlock,
};
use crate::style::{FillStyle, Font, PathText, Rgba, StrokeStyle};

const GENERATOR: &str = "strokepad";

/// The attribute block shared by every record, mirroring the common
/// item attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Attr {
    id: ItemId,
    x: f32,
    y: f32,
    rotation: f32,
    scale: Vec2,
    transform: Transform,
    origin: Point,
    z: f32,
    visible: bool,
    opacity: f32,
    name: String,
}

impl Attr {
    fn capture(item: &Item) -> Self {
        Self {
            id: item.id,
            x: item.pos.x,
            y: item.pos.y,
            rotation: item.rotation,
            scale: item.scale,
            transform: item.transform,
            origin: item.origin,
            z: item.z,
            visible: item.visible,
            opacity: item.opacity,
            name: item.name.clone(),
        }
    }

    fn restore(&self, kind: ItemKind, parent: Option<ItemId>) -> Item {
        Item {
            id: self.id,
            kind,
            pos: Point::new(self.x, self.y),
            rotation: self.rotation,
            scale: self.scale,
            transform: self.transform,
            origin: self.origin,
            z: self.z,
            visible: self.visible,
            opacity: self.opacity,
            name: self.name.clone(),
            parent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ImageData {
    Raster { data: String },
    Vector { markup: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Meta {
        format_version: String,
        generator: String,
    },
    Path {
        attr: Attr,
        path: PathData,
        stroke: StrokeStyle,
        fill: FillStyle,
        text: Option<PathText>,
        smoothed: bool,
    },
    LeaderLine {
        attr: Attr,
        path: PathData,
        stroke: StrokeStyle,
        fill: FillStyle,
        label: Box<Record>,
    },
    Text {
        attr: Attr,
        content: String,
        markdown: bool,
        font: Font,
        color: Rgba,
    },
    Frame {
        attr: Attr,
        rect: Rect,
        label: Box<Record>,
    },
    Group {
        attr: Attr,
        children: Vec<Record>,
    },
    Image {
        attr: Attr,
        source: Option<PathBuf>,
        natural_size: Vec2,
        #[serde(flatten)]
        data: ImageData,
    },
}

/// A successfully decoded document plus its repair status. Missing
/// asset files are non-fatal; the embedded copies still render.
pub struct LoadedDocument {
    pub document: Document,
    pub repair_needed: bool,
    pub missing_assets: Vec<PathBuf>,
}

/// Serialize the document as its record stream.
pub fn serialize(doc: &Document) -> Result<Vec<u8>, DocumentError> {
    let mut records = vec![Record::Meta {
        format_version: doc.format_version().to_string(),
        generator: GENERATOR.to_string(),
    }];
    for id in doc.top_level_z_ordered() {
        records.push(item_record(doc, id)?);
    }
    serde_json::to_vec_pretty(&records).map_err(|e| DocumentError::Corrupt(e.to_string()))
}

fn item_record(doc: &Document, id: ItemId) -> Result<Record, DocumentError> {
    let item = doc
        .get(id)
        .ok_or_else(|| DocumentError::Corrupt(format!("dangling item reference {id}")))?;
    let attr = Attr::capture(item);
    Ok(match &item.kind {
        ItemKind::Path(path) => Record::Path {
            attr,
            path: path.path.clone(),
            stroke: path.stroke,
            fill: path.fill,
            text: path.text.clone(),
            smoothed: path.smoothed,
        },
        ItemKind::LeaderLine(line) => Record::LeaderLine {
            attr,
            path: line.path.clone(),
            stroke: line.stroke,
            fill: line.fill,
            label: Box::new(item_record(doc, line.label)?),
        },
        ItemKind::Text(text) => Record::Text {
            attr,
            content: text.content.clone(),
            markdown: text.markdown,
            font: text.font.clone(),
            color: text.color,
        },
        ItemKind::Frame(frame) => Record::Frame {
            attr,
            rect: frame.rect,
            label: Box::new(item_record(doc, frame.label)?),
        },
        ItemKind::Group(group) => Record::Group {
            attr,
            children: group
                .children
                .iter()
                .map(|&child| item_record(doc, child))
                .collect::<Result<_, _>>()?,
        },
        ItemKind::Image(image) => Record::Image {
            attr,
            // The path is recorded only while it still resolves.
            source: image.source.clone().filter(|p| p.exists()),
            natural_size: image.natural_size,
            data: match &image.payload {
                ImagePayload::Raster(bytes) => Record::raster_data(bytes),
                ImagePayload::Vector(markup) => ImageData::Vector {
                    markup: markup.clone(),
                },
            },
        },
    })
}

impl Record {
    fn raster_data(bytes: &[u8]) -> ImageData {
        ImageData::Raster {
            data: BASE64.encode(normalize_png(bytes)),
        }
    }
}

/// Pixel payloads are stored PNG-encoded. Already-PNG bytes pass
/// through; anything else decodable is re-encoded, undecodable bytes
/// are kept as they are.
fn normalize_png(bytes: &[u8]) -> Vec<u8> {
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];
    if bytes.starts_with(PNG_MAGIC) {
        return bytes.to_vec();
    }
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let mut out = Vec::new();
            if img
                .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
                .is_ok()
            {
                out
            } else {
                bytes.to_vec()
            }
        }
        Err(_) => bytes.to_vec(),
    }
}

/// Decode a record stream. Structural problems abort with
/// [`DocumentError::Corrupt`] and expose no partial document; missing
/// asset backing files only flag the result for repair.
pub fn deserialize(bytes: &[u8]) -> Result<LoadedDocument, DocumentError> {
    let records: Vec<Record> =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::Corrupt(e.to_string()))?;
    let mut iter = records.into_iter();
    let Some(Record::Meta { format_version, .. }) = iter.next() else {
        return Err(DocumentError::Corrupt("missing metadata header".into()));
    };

    let mut document = Document::new();
    document.set_format_version(format_version);
    let mut missing = Vec::new();
    for record in iter {
        let mut items = Vec::new();
        collect_items(record, None, &mut items, &mut missing)?;
        for item in items {
            document.insert(item);
        }
    }
    document.refresh_attachments();
    document.mark_saved();

    if !missing.is_empty() {
        warn!(count = missing.len(), "asset files missing; document needs repair");
    }
    Ok(LoadedDocument {
        document,
        repair_needed: !missing.is_empty(),
        missing_assets: missing,
    })
}

fn collect_items(
    record: Record,
    parent: Option<ItemId>,
    out: &mut Vec<Item>,
    missing: &mut Vec<PathBuf>,
) -> Result<(), DocumentError> {
    match record {
        Record::Meta { .. } => {
            return Err(DocumentError::Corrupt("metadata header repeated".into()));
        }
        Record::Path { attr, path, stroke, fill, text, smoothed } => {
            out.push(attr.restore(
                ItemKind::Path(PathItem { path, stroke, fill, text, smoothed }),
                parent,
            ));
        }
        Record::LeaderLine { attr, path, stroke, fill, label } => {
            let Record::Text { .. } = label.as_ref() else {
                return Err(DocumentError::Corrupt(
                    "leader line label must be a text record".into(),
                ));
            };
            let label_id = label.attr_id();
            out.push(attr.restore(
                ItemKind::LeaderLine(LeaderLine { path, stroke, fill, label: label_id }),
                parent,
            ));
            let line_id = out.last().map(|item| item.id);
            collect_items(*label, line_id, out, missing)?;
        }
        Record::Text { attr, content, markdown, font, color } => {
            out.push(attr.restore(
                ItemKind::Text(TextBlock { content, markdown, font, color }),
                parent,
            ));
        }
        Record::Frame { attr, rect, label } => {
            let Record::Text { .. } = label.as_ref() else {
                return Err(DocumentError::Corrupt(
                    "frame label must be a text record".into(),
                ));
            };
            let label_id = label.attr_id();
            out.push(attr.restore(ItemKind::Frame(CanvasFrame { rect, label: label_id }), parent));
            let frame_id = out.last().map(|item| item.id);
            collect_items(*label, frame_id, out, missing)?;
        }
        Record::Group { attr, children } => {
            for child in &children {
                if matches!(child, Record::Meta { .. } | Record::Group { .. } | Record::Frame { .. }) {
                    return Err(DocumentError::Corrupt(
                        "group children must be leaf item records".into(),
                    ));
                }
            }
            let child_ids = children.iter().map(Record::attr_id).collect();
            out.push(attr.restore(ItemKind::Group(Group { children: child_ids }), parent));
            let group_id = out[out.len() - 1].id;
            for child in children {
                collect_items(child, Some(group_id), out, missing)?;
            }
        }
        Record::Image { attr, source, natural_size, data } => {
            let embedded = match data {
                ImageData::Raster { data } => ImagePayload::Raster(
                    BASE64
                        .decode(data.as_bytes())
                        .map_err(|e| DocumentError::Corrupt(e.to_string()))?,
                ),
                ImageData::Vector { markup } => ImagePayload::Vector(markup),
            };
            // Prefer the source file when it still resolves; otherwise
            // fall back to the embedded copy and flag the load.
            let payload = match &source {
                Some(path) => match reload_payload(path, &embedded) {
                    Some(fresh) => fresh,
                    None => {
                        missing.push(path.clone());
                        embedded
                    }
                },
                None => embedded,
            };
            out.push(attr.restore(
                ItemKind::Image(ImageAsset { source, payload, natural_size }),
                parent,
            ));
        }
    }
    Ok(())
}

fn reload_payload(path: &Path, embedded: &ImagePayload) -> Option<ImagePayload> {
    if !path.exists() {
        return None;
    }
    match embedded {
        ImagePayload::Raster(_) => fs::read(path)
            .ok()
            .map(|bytes| ImagePayload::Raster(normalize_png(&bytes))),
        ImagePayload::Vector(_) => fs::read_to_string(path).ok().map(ImagePayload::Vector),
    }
}

impl Record {
    fn attr_id(&self) -> ItemId {
        match self {
            Record::Meta { .. } => ItemId::new(),
            Record::Path { attr, .. }
            | Record::LeaderLine { attr, .. }
            | Record::Text { attr, .. }
            | Record::Frame { attr, .. }
            | Record::Group { attr, .. }
            | Record::Image { attr, .. } => attr.id,
        }
    }

    fn unresolved_source(&self) -> Option<PathBuf> {
        match self {
            Record::Image { source: Some(path), .. } if !path.exists() => Some(path.clone()),
            _ => None,
        }
    }
}

/// Rewrite a record stream, permanently dropping asset records whose
/// source files no longer resolve. Records saved without a source are
/// kept; their embedded copy is all there ever was. Returns the new
/// stream and the dropped paths.
pub fn repair(bytes: &[u8]) -> Result<(Vec<u8>, Vec<PathBuf>), DocumentError> {
    let records: Vec<Record> =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::Corrupt(e.to_string()))?;
    if !matches!(records.first(), Some(Record::Meta { .. })) {
        return Err(DocumentError::Corrupt("missing metadata header".into()));
    }

    let mut dropped = Vec::new();
    let kept: Vec<Record> = records
        .into_iter()
        .filter_map(|record| {
            if let Some(path) = record.unresolved_source() {
                dropped.push(path);
                return None;
            }
            match record {
                Record::Group { attr, children } => {
                    let children = children
                        .into_iter()
                        .filter_map(|child| match child.unresolved_source() {
                            Some(path) => {
                                dropped.push(path);
                                None
                            }
                            None => Some(child),
                        })
                        .collect();
                    Some(Record::Group { attr, children })
                }
                other => Some(other),
            }
        })
        .collect();

    let bytes =
        serde_json::to_vec_pretty(&kept).map_err(|e| DocumentError::Corrupt(e.to_string()))?;
    Ok((bytes, dropped))
}

// ----- file-level entry points -----

pub fn save_file(doc: &Document, path: &Path) -> anyhow::Result<()> {
    let bytes = serialize(doc)?;
    fs::write(path, bytes)
        .map_err(DocumentError::Io)
        .with_context(|| format!("failed to save document to {path:?}"))?;
    info!(?path, items = doc.len(), "document saved");
    Ok(())
}

pub fn load_file(path: &Path) -> anyhow::Result<LoadedDocument> {
    let bytes = fs::read(path)
        .map_err(DocumentError::Io)
        .with_context(|| format!("failed to read document from {path:?}"))?;
    let loaded = deserialize(&bytes)
        .with_context(|| format!("failed to decode document from {path:?}"))?;
    info!(?path, items = loaded.document.len(), repair = loaded.repair_needed, "document loaded");
    Ok(loaded)
}

/// Repair a document file in place; returns the dropped asset paths.
pub fn repair_file(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let bytes = fs::read(path)
        .map_err(DocumentError::Io)
        .with_context(|| format!("failed to read document from {path:?}"))?;
    let (repaired, dropped) = repair(&bytes)?;
    fs::write(path, repaired)
        .map_err(DocumentError::Io)
        .with_context(|| format!("failed to rewrite document at {path:?}"))?;
    info!(?path, dropped = dropped.len(), "document repaired");
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Font;

    fn sample_path_item(z: f32) -> Item {
        let mut item = Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(&[Point::ZERO, Point::new(10.0, 5.0), Point::new(20.0, 0.0)]),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        item.z = z;
        item.name = "Path".into();
        item
    }

    fn leader_line_doc(text: &str) -> (Document, ItemId, ItemId) {
        let mut doc = Document::new();
        let mut line_item = Item::new(ItemKind::Path(PathItem::new(
            PathData::new(),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let label = Item::new(ItemKind::Text(TextBlock::new(
            text,
            Font::default(),
            Rgba::BLACK,
        )))
        .at(Point::new(40.0, 30.0))
        .child_of(line_item.id);
        let mut path = PathData::begin_at(Point::ZERO);
        path.line_to(Point::new(40.0, 30.0));
        line_item.kind = ItemKind::LeaderLine(LeaderLine {
            path,
            stroke: StrokeStyle::default(),
            fill: FillStyle::default(),
            label: label.id,
        });
        line_item.name = "Leader Line".into();
        let (line_id, label_id) = (line_item.id, label.id);
        doc.insert(line_item);
        doc.insert(label);
        (doc, line_id, label_id)
    }

    #[test]
    fn round_trip_preserves_items_and_z_order() {
        let mut doc = Document::new();
        let a = sample_path_item(2.0);
        let b = sample_path_item(0.0);
        let (a_id, b_id) = (a.id, b.id);
        doc.insert(a);
        doc.insert(b);

        let bytes = serialize(&doc).unwrap();
        let loaded = deserialize(&bytes).unwrap();
        assert!(!loaded.repair_needed);
        assert_eq!(loaded.document.len(), 2);
        assert_eq!(loaded.document.top_level_z_ordered(), vec![b_id, a_id]);
        assert_eq!(loaded.document.get(a_id).unwrap(), doc.get(a_id).unwrap());
    }

    #[test]
    fn leader_line_label_stays_parented() {
        let (doc, line_id, label_id) = leader_line_doc("Apex");
        let bytes = serialize(&doc).unwrap();
        let loaded = deserialize(&bytes).unwrap();

        // One top-level record; the label came back as a child.
        assert_eq!(loaded.document.top_level_z_ordered(), vec![line_id]);
        let label = loaded.document.get(label_id).unwrap();
        assert_eq!(label.parent, Some(line_id));
        match &label.kind {
            ItemKind::Text(text) => assert_eq!(text.content, "Apex"),
            other => panic!("unexpected kind {}", other.tag()),
        }
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        assert!(matches!(
            deserialize(b"not json at all"),
            Err(DocumentError::Corrupt(_))
        ));
    }

    #[test]
    fn missing_header_is_corrupt() {
        let bytes = serde_json::to_vec(&vec![Record::Text {
            attr: Attr::capture(&Item::new(ItemKind::Text(TextBlock::new(
                "x",
                Font::default(),
                Rgba::BLACK,
            )))),
            content: "x".into(),
            markdown: false,
            font: Font::default(),
            color: Rgba::BLACK,
        }])
        .unwrap();
        assert!(matches!(
            deserialize(&bytes),
            Err(DocumentError::Corrupt(_))
        ));
    }

    #[test]
    fn missing_asset_flags_repair_and_keeps_embedded_copy() {
        let mut doc = Document::new();
        let gone = PathBuf::from("/nonexistent/asset.png");
        let image = Item::new(ItemKind::Image(ImageAsset {
            source: Some(gone.clone()),
            payload: ImagePayload::Vector("<svg/>".into()),
            natural_size: Vec2::new(64.0, 64.0),
        }));
        let image_id = image.id;
        doc.insert(image);

        // The path is already gone at save time, so the record carries
        // no source and loads clean.
        let bytes = serialize(&doc).unwrap();
        let loaded = deserialize(&bytes).unwrap();
        assert!(!loaded.repair_needed);

        // Force a record that still names the path to cover the
        // saved-then-deleted case.
        let json = String::from_utf8(bytes).unwrap().replace(
            "\"source\": null",
            "\"source\": \"/nonexistent/asset.png\"",
        );
        let loaded = deserialize(json.as_bytes()).unwrap();
        assert!(loaded.repair_needed);
        assert_eq!(loaded.missing_assets, vec![gone]);
        match &loaded.document.get(image_id).unwrap().kind {
            ItemKind::Image(image) => {
                assert_eq!(image.payload, ImagePayload::Vector("<svg/>".into()))
            }
            other => panic!("unexpected kind {}", other.tag()),
        }

        // Repair drops the unresolved record for good.
        let (repaired, dropped) = repair(json.as_bytes()).unwrap();
        assert_eq!(dropped, vec![PathBuf::from("/nonexistent/asset.png")]);
        let reloaded = deserialize(&repaired).unwrap();
        assert!(!reloaded.repair_needed);
        assert_eq!(reloaded.document.len(), 0);
    }

    #[test]
    fn asset_source_reread_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("asset.svg");
        fs::write(&file, "<svg>updated</svg>").unwrap();

        let mut doc = Document::new();
        doc.insert(Item::new(ItemKind::Image(ImageAsset {
            source: Some(file.clone()),
            payload: ImagePayload::Vector("<svg>stale</svg>".into()),
            natural_size: Vec2::new(32.0, 32.0),
        })));

        let bytes = serialize(&doc).unwrap();
        let loaded = deserialize(&bytes).unwrap();
        assert!(!loaded.repair_needed);
        let item = loaded.document.iter().next().unwrap();
        match &item.kind {
            ItemKind::Image(image) => {
                assert_eq!(image.payload, ImagePayload::Vector("<svg>updated</svg>".into()))
            }
            other => panic!("unexpected kind {}", other.tag()),
        }
    }

    #[test]
    fn group_children_embed_inline() {
        let mut doc = Document::new();
        let mut group = Item::new(ItemKind::Group(Group::default()));
        let child = sample_path_item(0.0).child_of(group.id);
        if let ItemKind::Group(g) = &mut group.kind {
            g.children.push(child.id);
        }
        let (group_id, child_id) = (group.id, child.id);
        doc.insert(group);
        doc.insert(child);

        let bytes = serialize(&doc).unwrap();
        let loaded = deserialize(&bytes).unwrap();
        assert_eq!(loaded.document.top_level_z_ordered(), vec![group_id]);
        assert_eq!(loaded.document.get(child_id).unwrap().parent, Some(group_id));
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_paths_round_trip(
            xs in proptest::collection::vec((-5000.0f32..5000.0, -5000.0f32..5000.0), 2..50),
            z in -10.0f32..10.0,
        ) {
            let points: Vec<Point> = xs.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            let mut doc = Document::new();
            let mut item = Item::new(ItemKind::Path(PathItem::new(
                PathData::from_points(&points),
                StrokeStyle::default(),
                FillStyle::default(),
            )));
            item.z = z;
            let id = item.id;
            doc.insert(item);

            let bytes = serialize(&doc).unwrap();
            let loaded = deserialize(&bytes).unwrap();
            proptest::prop_assert_eq!(loaded.document.get(id), doc.get(id));
        }
    }

    #[test]
    fn save_and_load_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.strokepad");
        let (doc, line_id, _) = leader_line_doc("Apex");

        save_file(&doc, &path).unwrap();
        let loaded = load_file(&path).unwrap();
        assert!(loaded.document.contains(line_id));
        assert!(!loaded.document.is_modified());
    }
}
