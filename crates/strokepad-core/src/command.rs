//! Reversible commands and the bounded history that applies them.
//!
//! Every document mutation is expressed as a [`Command`] holding exactly
//! the data its forward and reverse effects need. The [`CommandStack`]
//! applies commands, keeps a linear undo/redo history capped at
//! [`HISTORY_CAPACITY`] entries, and coalesces continuous move gestures
//! through an explicit merge window.

use strokepad_geometry::{PathData, Point};
use tracing::debug;

use crate::document::{Document, ItemSnapshot};
use crate::item::{ItemId, ItemKind, TransformState};
use crate::style::{FillStyle, Font, StrokeStyle};

/// Maximum number of undoable entries. Pushing beyond this silently
/// evicts the oldest entry; that history is gone for good.
pub const HISTORY_CAPACITY: usize = 200;

/// One reversible unit of document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a forest of items (each root plus its owned descendants,
    /// parents before children) as one undo step.
    AddItem { items: Vec<ItemSnapshot> },
    /// Remove whole subtrees, snapshotted up front so revert restores
    /// them in their original paint order.
    RemoveItems { items: Vec<ItemSnapshot> },
    /// Reposition a single item. The only mergeable command.
    MoveItem { id: ItemId, old: Point, new: Point },
    /// Reposition several items atomically.
    MoveItems { moves: Vec<(ItemId, Point, Point)> },
    /// Swap the full transform state (scale, rotation, matrix, origin).
    Transform {
        changes: Vec<(ItemId, TransformState, TransformState)>,
    },
    /// Swap z-indices.
    LayerChange { changes: Vec<(ItemId, f32, f32)> },
    /// Swap pen and brush.
    StyleChange {
        changes: Vec<(ItemId, StrokeStyle, StrokeStyle, FillStyle, FillStyle)>,
    },
    FontChange { changes: Vec<(ItemId, Font, Font)> },
    OpacityChange { changes: Vec<(ItemId, f32, f32)> },
    VisibilityChange { changes: Vec<(ItemId, bool, bool)> },
    /// Swap path data. Smoothing sets the smoothed flag; sculpting
    /// leaves it alone (`set_smoothed: None`).
    SmoothPath {
        changes: Vec<(ItemId, PathData, PathData, bool)>,
        set_smoothed: Option<bool>,
    },
    CloseSubpath {
        changes: Vec<(ItemId, PathData, PathData)>,
    },
    /// Position change along one axis from an align operation.
    AlignItem { id: ItemId, old: Point, new: Point },
    /// Restore default transform state; the old state is kept for undo.
    ResetItem { changes: Vec<(ItemId, TransformState)> },
    EditText { id: ItemId, old: String, new: String },
    Rename { id: ItemId, old: String, new: String },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddItem { .. } => "add_item",
            Command::RemoveItems { .. } => "remove_items",
            Command::MoveItem { .. } => "move_item",
            Command::MoveItems { .. } => "move_items",
            Command::Transform { .. } => "transform",
            Command::LayerChange { .. } => "layer_change",
            Command::StyleChange { .. } => "style_change",
            Command::FontChange { .. } => "font_change",
            Command::OpacityChange { .. } => "opacity_change",
            Command::VisibilityChange { .. } => "visibility_change",
            Command::SmoothPath { .. } => "smooth_path",
            Command::CloseSubpath { .. } => "close_subpath",
            Command::AlignItem { .. } => "align_item",
            Command::ResetItem { .. } => "reset_item",
            Command::EditText { .. } => "edit_text",
            Command::Rename { .. } => "rename",
        }
    }

    /// Forward effect. Commands targeting an id that is gone, or an item
    /// of the wrong variant, skip that target silently.
    pub fn apply(&mut self, doc: &mut Document) {
        match self {
            Command::AddItem { items } => {
                for snap in items.iter_mut() {
                    let seq = doc.insert_snapshot(snap.clone());
                    // Remember the slot so redo lands in the same order.
                    snap.seq = Some(seq);
                }
            }
            Command::RemoveItems { items } => {
                for snap in items.iter() {
                    if snap.item.parent.is_none() || doc.contains(snap.item.id) {
                        doc.remove_subtree(snap.item.id);
                    }
                }
            }
            Command::MoveItem { id, new, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.pos = *new;
                }
            }
            Command::MoveItems { moves } => {
                for (id, _, new) in moves.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.pos = *new;
                    }
                }
            }
            Command::Transform { changes } => {
                for (id, _, new) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        new.apply_to(item);
                    }
                }
            }
            Command::LayerChange { changes } => {
                for (id, _, new) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.z = *new;
                    }
                }
            }
            Command::StyleChange { changes } => {
                for (id, _, new_stroke, _, new_fill) in changes.iter() {
                    set_style(doc, *id, *new_stroke, *new_fill);
                }
            }
            Command::FontChange { changes } => {
                for (id, _, new) in changes.iter() {
                    set_font(doc, *id, new.clone());
                }
            }
            Command::OpacityChange { changes } => {
                for (id, _, new) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.opacity = *new;
                    }
                }
            }
            Command::VisibilityChange { changes } => {
                for (id, _, new) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.visible = *new;
                    }
                }
            }
            Command::SmoothPath { changes, set_smoothed } => {
                for (id, _, new, _) in changes.iter() {
                    set_path(doc, *id, new.clone(), *set_smoothed);
                }
            }
            Command::CloseSubpath { changes } => {
                for (id, _, new) in changes.iter() {
                    set_path(doc, *id, new.clone(), None);
                }
            }
            Command::AlignItem { id, new, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.pos = *new;
                }
            }
            Command::ResetItem { changes } => {
                for (id, _) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        TransformState::default().apply_to(item);
                    }
                }
            }
            Command::EditText { id, new, .. } => {
                set_text(doc, *id, new.clone());
            }
            Command::Rename { id, new, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.name = new.clone();
                }
            }
        }
    }

    /// Reverse effect, undoing exactly what [`Command::apply`] did.
    pub fn revert(&mut self, doc: &mut Document) {
        match self {
            Command::AddItem { items } => {
                for snap in items.iter().rev() {
                    doc.remove_subtree(snap.item.id);
                }
            }
            Command::RemoveItems { items } => {
                for snap in items.iter() {
                    doc.insert_snapshot(snap.clone());
                }
            }
            Command::MoveItem { id, old, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.pos = *old;
                }
            }
            Command::MoveItems { moves } => {
                for (id, old, _) in moves.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.pos = *old;
                    }
                }
            }
            Command::Transform { changes } => {
                for (id, old, _) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        old.apply_to(item);
                    }
                }
            }
            Command::LayerChange { changes } => {
                for (id, old, _) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.z = *old;
                    }
                }
            }
            Command::StyleChange { changes } => {
                for (id, old_stroke, _, old_fill, _) in changes.iter() {
                    set_style(doc, *id, *old_stroke, *old_fill);
                }
            }
            Command::FontChange { changes } => {
                for (id, old, _) in changes.iter() {
                    set_font(doc, *id, old.clone());
                }
            }
            Command::OpacityChange { changes } => {
                for (id, old, _) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.opacity = *old;
                    }
                }
            }
            Command::VisibilityChange { changes } => {
                for (id, old, _) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        item.visible = *old;
                    }
                }
            }
            Command::SmoothPath { changes, set_smoothed } => {
                for (id, old, _, old_flag) in changes.iter() {
                    let restore = set_smoothed.map(|_| *old_flag);
                    set_path(doc, *id, old.clone(), restore);
                }
            }
            Command::CloseSubpath { changes } => {
                for (id, old, _) in changes.iter() {
                    set_path(doc, *id, old.clone(), None);
                }
            }
            Command::AlignItem { id, old, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.pos = *old;
                }
            }
            Command::ResetItem { changes } => {
                for (id, old) in changes.iter() {
                    if let Some(item) = doc.get_mut(*id) {
                        old.apply_to(item);
                    }
                }
            }
            Command::EditText { id, old, .. } => {
                set_text(doc, *id, old.clone());
            }
            Command::Rename { id, old, .. } => {
                if let Some(item) = doc.get_mut(*id) {
                    item.name = old.clone();
                }
            }
        }
    }
}

fn set_style(doc: &mut Document, id: ItemId, stroke: StrokeStyle, fill: FillStyle) {
    if let Some(item) = doc.get_mut(id) {
        match &mut item.kind {
            ItemKind::Path(path) => {
                path.stroke = stroke;
                path.fill = fill;
            }
            ItemKind::LeaderLine(line) => {
                line.stroke = stroke;
                line.fill = fill;
            }
            _ => {}
        }
    }
}

fn set_font(doc: &mut Document, id: ItemId, font: Font) {
    if let Some(item) = doc.get_mut(id) {
        match &mut item.kind {
            ItemKind::Text(text) => text.font = font,
            ItemKind::Path(path) => {
                if let Some(path_text) = &mut path.text {
                    path_text.font = font;
                }
            }
            _ => {}
        }
    }
}

fn set_path(doc: &mut Document, id: ItemId, path: PathData, set_smoothed: Option<bool>) {
    if let Some(item) = doc.get_mut(id) {
        match &mut item.kind {
            ItemKind::Path(p) => {
                p.path = path;
                if let Some(flag) = set_smoothed {
                    p.smoothed = flag;
                }
            }
            ItemKind::LeaderLine(line) => line.path = path,
            _ => {}
        }
    }
}

fn set_text(doc: &mut Document, id: ItemId, content: String) {
    if let Some(item) = doc.get_mut(id) {
        if let ItemKind::Text(text) = &mut item.kind {
            text.content = content;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    Push,
    Undo,
    Redo,
}

/// Fired after every successful push/undo/redo so the UI layer can
/// refresh selection panels and the title's modified marker.
pub trait HistoryObserver {
    fn history_changed(&mut self, event: HistoryEvent);
}

/// The linear, bounded undo/redo ledger. Not safe for concurrent use;
/// it assumes exclusive access from the single editing thread.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    capacity: usize,
    /// Whether the top entry still accepts move merges. Opened by a
    /// merging push, closed by anything else.
    merge_open: bool,
    observer: Option<Box<dyn HistoryObserver>>,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity,
            merge_open: false,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn HistoryObserver>) {
        self.observer = Some(observer);
    }

    /// Apply `command` and make it the new top. Clears the redo list
    /// and closes any open merge window.
    pub fn push(&mut self, command: Command, doc: &mut Document) {
        self.merge_open = false;
        self.push_inner(command, doc);
    }

    /// Apply a command, merging a `MoveItem` into the top entry when the
    /// window is open and both target the same item. Used while a drag
    /// gesture is in flight; call [`CommandStack::seal`] at gesture end.
    pub fn push_merging(&mut self, mut command: Command, doc: &mut Document) {
        let merge_target = if self.merge_open {
            match (&command, self.undo_stack.last()) {
                (
                    Command::MoveItem { id, new, .. },
                    Some(Command::MoveItem { id: top_id, .. }),
                ) if id == top_id => Some(*new),
                _ => None,
            }
        } else {
            None
        };
        if let Some(endpoint) = merge_target {
            command.apply(doc);
            if let Some(Command::MoveItem { new: top_new, .. }) = self.undo_stack.last_mut() {
                *top_new = endpoint;
            }
            self.finish_mutation(doc, HistoryEvent::Push);
            return;
        }
        self.push_inner(command, doc);
        self.merge_open = matches!(self.undo_stack.last(), Some(Command::MoveItem { .. }));
    }

    fn push_inner(&mut self, mut command: Command, doc: &mut Document) {
        debug!(command = command.name(), "push");
        command.apply(doc);
        self.redo_stack.clear();
        self.undo_stack.push(command);
        // Silently drop the oldest entries past capacity.
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.remove(0);
        }
        self.finish_mutation(doc, HistoryEvent::Push);
    }

    /// Close the merge window; the top entry is final.
    pub fn seal(&mut self) {
        self.merge_open = false;
    }

    pub fn undo(&mut self, doc: &mut Document) -> bool {
        self.merge_open = false;
        let Some(mut command) = self.undo_stack.pop() else {
            return false;
        };
        debug!(command = command.name(), "undo");
        command.revert(doc);
        self.redo_stack.push(command);
        self.finish_mutation(doc, HistoryEvent::Undo);
        true
    }

    pub fn redo(&mut self, doc: &mut Document) -> bool {
        self.merge_open = false;
        let Some(mut command) = self.redo_stack.pop() else {
            return false;
        };
        debug!(command = command.name(), "redo");
        command.apply(doc);
        self.undo_stack.push(command);
        self.finish_mutation(doc, HistoryEvent::Redo);
        true
    }

    fn finish_mutation(&mut self, doc: &mut Document, event: HistoryEvent) {
        doc.refresh_attachments();
        doc.mark_modified();
        if let Some(observer) = &mut self.observer {
            observer.history_changed(event);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.merge_open = false;
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}
