//! The document: an id-addressed arena of items with explicit parent
//! links, a z-ordered top-level listing, and the spatial queries tools
//! and commands run against.

use std::collections::HashMap;

use strokepad_geometry::{Point, Rect, Transform};
use tracing::info;

use crate::item::{Item, ItemId, ItemKind};

pub const FORMAT_VERSION: &str = "1.0.0";

struct Entry {
    item: Item,
    /// Monotonic insertion sequence; breaks z-index ties so paint order
    /// is a total order over direct children.
    seq: u64,
}

/// An item plus the sequence slot it occupied, captured so removal can
/// be reverted into the exact same paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub item: Item,
    pub seq: Option<u64>,
}

impl ItemSnapshot {
    pub fn new(item: Item) -> Self {
        Self { item, seq: None }
    }
}

/// The root of the in-memory model. Owns every item; mutation outside a
/// command is a contract violation since it would desynchronize history.
pub struct Document {
    items: HashMap<ItemId, Entry>,
    next_seq: u64,
    format_version: String,
    modified: bool,
}

impl Document {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_seq: 0,
            format_version: FORMAT_VERSION.to_string(),
            modified: false,
        }
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn set_format_version(&mut self, version: impl Into<String>) {
        self.format_version = version.into();
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id).map(|e| &e.item)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id).map(|e| &mut e.item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values().map(|e| &e.item)
    }

    /// Insert an item, assigning the next sequence slot; returns it.
    pub fn insert(&mut self, item: Item) -> u64 {
        self.insert_snapshot(ItemSnapshot::new(item))
    }

    /// Insert a snapshot. A recorded sequence is reused so reverted
    /// removals land back in their original paint order; otherwise a
    /// fresh slot is assigned.
    pub fn insert_snapshot(&mut self, snap: ItemSnapshot) -> u64 {
        let seq = match snap.seq {
            Some(seq) => {
                self.next_seq = self.next_seq.max(seq + 1);
                seq
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.items.insert(snap.item.id, Entry { item: snap.item, seq });
        seq
    }

    /// Remove an item and all of its descendants, returning snapshots in
    /// parent-before-child order.
    pub fn remove_subtree(&mut self, id: ItemId) -> Vec<ItemSnapshot> {
        let mut order = vec![id];
        self.collect_descendants(id, &mut order);
        let mut snaps = Vec::with_capacity(order.len());
        for id in order {
            if let Some(entry) = self.items.remove(&id) {
                snaps.push(ItemSnapshot {
                    item: entry.item,
                    seq: Some(entry.seq),
                });
            }
        }
        snaps
    }

    /// Snapshot subtrees without removing anything, parent-before-child.
    pub fn snapshot_subtrees(&self, roots: &[ItemId]) -> Vec<ItemSnapshot> {
        let mut order = Vec::new();
        for &root in roots {
            order.push(root);
            self.collect_descendants(root, &mut order);
        }
        order
            .into_iter()
            .filter_map(|id| {
                self.items.get(&id).map(|entry| ItemSnapshot {
                    item: entry.item.clone(),
                    seq: Some(entry.seq),
                })
            })
            .collect()
    }

    fn collect_descendants(&self, id: ItemId, out: &mut Vec<ItemId>) {
        let child_ids: Vec<ItemId> = self
            .items
            .values()
            .filter(|e| e.item.parent == Some(id))
            .map(|e| e.item.id)
            .collect();
        for child in child_ids {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    pub fn children_of(&self, id: ItemId) -> Vec<ItemId> {
        let mut children: Vec<(u64, ItemId)> = self
            .items
            .values()
            .filter(|e| e.item.parent == Some(id))
            .map(|e| (e.seq, e.item.id))
            .collect();
        children.sort_by_key(|&(seq, _)| seq);
        children.into_iter().map(|(_, id)| id).collect()
    }

    /// Direct document children, bottom-most first. z-index orders them;
    /// equal z falls back to insertion sequence.
    pub fn top_level_z_ordered(&self) -> Vec<ItemId> {
        let mut top: Vec<(&Entry, ItemId)> = self
            .items
            .values()
            .filter(|e| e.item.parent.is_none())
            .map(|e| (e, e.item.id))
            .collect();
        top.sort_by(|a, b| a.0.item.z.total_cmp(&b.0.item.z).then(a.0.seq.cmp(&b.0.seq)));
        top.into_iter().map(|(_, id)| id).collect()
    }

    /// Highest z-index anywhere in the document, 0 when empty.
    pub fn max_z(&self) -> f32 {
        self.items
            .values()
            .map(|e| e.item.z)
            .fold(0.0f32, f32::max)
    }

    /// True when `id` lives (directly or transitively) under a frame.
    pub fn is_frame_nested(&self, id: ItemId) -> bool {
        let mut current = self.get(id).and_then(|item| item.parent);
        while let Some(parent) = current {
            match self.get(parent) {
                Some(item) if item.is_frame() => return true,
                Some(item) => current = item.parent,
                None => return false,
            }
        }
        false
    }

    /// True when `id` is the fixed label of a frame.
    pub fn is_frame_label(&self, id: ItemId) -> bool {
        self.get(id)
            .and_then(|item| item.parent)
            .and_then(|parent| self.get(parent))
            .is_some_and(|parent| match &parent.kind {
                ItemKind::Frame(frame) => frame.label == id,
                _ => false,
            })
    }

    /// The leader line owning `id` as its label, if any.
    pub fn leader_line_of_label(&self, id: ItemId) -> Option<ItemId> {
        let parent = self.get(id)?.parent?;
        match &self.get(parent)?.kind {
            ItemKind::LeaderLine(line) if line.label == id => Some(parent),
            _ => None,
        }
    }

    /// The item's matrix in scene space, composed up the parent chain.
    pub fn scene_matrix(&self, id: ItemId) -> Transform {
        let Some(item) = self.get(id) else {
            return Transform::IDENTITY;
        };
        let local = item.local_matrix();
        match item.parent {
            Some(parent) => local.then(&self.scene_matrix(parent)),
            None => local,
        }
    }

    /// Bounds in the item's own coordinate space.
    pub fn local_bounds(&self, id: ItemId) -> Option<Rect> {
        let item = self.get(id)?;
        match &item.kind {
            ItemKind::Path(path) => path.path.bounds(),
            ItemKind::LeaderLine(line) => line.path.bounds(),
            ItemKind::Text(text) => Some(text.approx_bounds()),
            ItemKind::Frame(frame) => Some(frame.rect),
            ItemKind::Image(image) => {
                Some(Rect::from_size(image.natural_size.x, image.natural_size.y))
            }
            ItemKind::Group(group) => {
                let mut bounds: Option<Rect> = None;
                for &child in &group.children {
                    let Some(child_item) = self.get(child) else {
                        continue;
                    };
                    if let Some(b) = self.local_bounds(child) {
                        let mapped = child_item.local_matrix().map_rect(b);
                        bounds = Some(match bounds {
                            Some(acc) => acc.union(&mapped),
                            None => mapped,
                        });
                    }
                }
                bounds
            }
        }
    }

    /// Axis-aligned bounds in scene space.
    pub fn scene_bounds(&self, id: ItemId) -> Option<Rect> {
        let local = self.local_bounds(id)?;
        Some(self.scene_matrix(id).map_rect(local))
    }

    /// Topmost visible item whose scene bounds contain `pos`. Top-level
    /// items are walked in reverse paint order; their subtrees are
    /// checked child-first so nested items win over their parent.
    pub fn item_at(&self, pos: Point) -> Option<ItemId> {
        for id in self.top_level_z_ordered().into_iter().rev() {
            if let Some(hit) = self.hit_in_subtree(id, pos) {
                return Some(hit);
            }
        }
        None
    }

    fn hit_in_subtree(&self, id: ItemId, pos: Point) -> Option<ItemId> {
        let item = self.get(id)?;
        if !item.visible {
            return None;
        }
        for child in self.children_of(id).into_iter().rev() {
            if let Some(hit) = self.hit_in_subtree(child, pos) {
                return Some(hit);
            }
        }
        match self.scene_bounds(id) {
            Some(bounds) if bounds.contains(pos) => Some(id),
            _ => None,
        }
    }

    /// Re-pin owned child labels: a leader line's label follows the
    /// line's terminal point, a frame's label sits at the frame's
    /// top-left and mirrors its name. Run after every command apply or
    /// revert, since path and transform swaps move the anchor.
    pub fn refresh_attachments(&mut self) {
        let mut updates: Vec<(ItemId, Point, Option<String>)> = Vec::new();
        for entry in self.items.values() {
            match &entry.item.kind {
                ItemKind::LeaderLine(line) => {
                    if let Some(end) = line.path.last_point() {
                        updates.push((line.label, end, None));
                    }
                }
                ItemKind::Frame(frame) => {
                    updates.push((frame.label, frame.rect.min, Some(entry.item.name.clone())));
                }
                _ => {}
            }
        }
        for (label, pos, name) in updates {
            if let Some(label_item) = self.get_mut(label) {
                label_item.pos = pos;
                if let Some(name) = name {
                    if let ItemKind::Text(text) = &mut label_item.kind {
                        text.content = name;
                    }
                }
            }
        }
    }

    /// Discard every item. Used on new/load; not undoable, the
    /// in-memory document is replaced wholesale.
    pub fn clear(&mut self) {
        info!(items = self.items.len(), "clearing document");
        self.items.clear();
        self.next_seq = 0;
        self.modified = false;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Group, LeaderLine, PathItem, TextBlock};
    use crate::style::{FillStyle, Font, Rgba, StrokeStyle};
    use strokepad_geometry::PathData;

    fn path_item(points: &[Point]) -> Item {
        Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(points),
            StrokeStyle::default(),
            FillStyle::default(),
        )))
    }

    #[test]
    fn z_order_breaks_ties_by_insertion() {
        let mut doc = Document::new();
        let a = path_item(&[Point::ZERO, Point::new(1.0, 1.0)]);
        let b = path_item(&[Point::ZERO, Point::new(2.0, 2.0)]);
        let (a_id, b_id) = (a.id, b.id);
        doc.insert(a);
        doc.insert(b);
        assert_eq!(doc.top_level_z_ordered(), vec![a_id, b_id]);

        doc.get_mut(a_id).unwrap().z = 5.0;
        assert_eq!(doc.top_level_z_ordered(), vec![b_id, a_id]);
    }

    #[test]
    fn removal_snapshot_restores_paint_order() {
        let mut doc = Document::new();
        let a = path_item(&[Point::ZERO, Point::new(1.0, 1.0)]);
        let b = path_item(&[Point::ZERO, Point::new(2.0, 2.0)]);
        let c = path_item(&[Point::ZERO, Point::new(3.0, 3.0)]);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        doc.insert(a);
        doc.insert(b);
        doc.insert(c);

        let snaps = doc.remove_subtree(b_id);
        assert_eq!(doc.len(), 2);
        for snap in snaps {
            doc.insert_snapshot(snap);
        }
        assert_eq!(doc.top_level_z_ordered(), vec![a_id, b_id, c_id]);
    }

    #[test]
    fn remove_subtree_takes_descendants() {
        let mut doc = Document::new();
        let mut group = Item::new(ItemKind::Group(Group::default()));
        let child = path_item(&[Point::ZERO, Point::new(1.0, 0.0)]).child_of(group.id);
        if let ItemKind::Group(g) = &mut group.kind {
            g.children.push(child.id);
        }
        let group_id = group.id;
        doc.insert(group);
        doc.insert(child);

        let snaps = doc.remove_subtree(group_id);
        assert_eq!(snaps.len(), 2);
        assert!(doc.is_empty());
        assert_eq!(snaps[0].item.id, group_id);
    }

    #[test]
    fn leader_label_follows_line_end() {
        let mut doc = Document::new();
        let mut line_item = Item::new(ItemKind::Path(PathItem::new(
            PathData::new(),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let label = Item::new(ItemKind::Text(TextBlock::new(
            "note",
            Font::default(),
            Rgba::BLACK,
        )))
        .child_of(line_item.id);
        let mut path = PathData::begin_at(Point::ZERO);
        path.line_to(Point::new(40.0, 25.0));
        line_item.kind = ItemKind::LeaderLine(LeaderLine {
            path,
            stroke: StrokeStyle::default(),
            fill: FillStyle::default(),
            label: label.id,
        });
        let label_id = label.id;
        doc.insert(line_item);
        doc.insert(label);

        doc.refresh_attachments();
        assert_eq!(doc.get(label_id).unwrap().pos, Point::new(40.0, 25.0));
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut doc = Document::new();
        let low = path_item(&[Point::ZERO, Point::new(10.0, 10.0)]);
        let mut high = path_item(&[Point::ZERO, Point::new(10.0, 10.0)]);
        high.z = 2.0;
        let high_id = high.id;
        doc.insert(low);
        doc.insert(high);
        assert_eq!(doc.item_at(Point::new(5.0, 5.0)), Some(high_id));
        assert_eq!(doc.item_at(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn hidden_items_are_not_hit() {
        let mut doc = Document::new();
        let mut item = path_item(&[Point::ZERO, Point::new(10.0, 10.0)]);
        item.visible = false;
        doc.insert(item);
        assert_eq!(doc.item_at(Point::new(5.0, 5.0)), None);
    }
}
