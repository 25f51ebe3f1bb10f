//! The scene: owns the document and its command stack, tracks the
//! active tool and selection, routes pointer input to the per-tool state
//! machines, and exposes the command-mediated operation suite.

use std::collections::HashSet;

use strokepad_geometry::{Point, Rect, smooth_path};
use tracing::debug;

use crate::command::{Command, CommandStack, HistoryObserver};
use crate::document::{Document, ItemSnapshot};
use crate::item::{Item, ItemId, ItemKind, TransformState};
use crate::style::{FillStyle, Font, Rgba, StrokeStyle};
use crate::tools;

/// The active editing mode. Exactly one tool is active at a time;
/// switching cancels any in-flight gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Path,
    SmoothPath,
    Label,
    Text,
    Scale,
    Frame,
    Sculpt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl PointerModifiers {
    pub const NONE: PointerModifiers = PointerModifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: PointerModifiers = PointerModifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// A pointer event in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: Point,
    pub modifiers: PointerModifiers,
}

impl PointerEvent {
    pub fn at(pos: Point) -> Self {
        Self {
            pos,
            modifiers: PointerModifiers::NONE,
        }
    }

    pub fn with_shift(pos: Point) -> Self {
        Self {
            pos,
            modifiers: PointerModifiers::SHIFT,
        }
    }
}

/// Per-scene tool configuration, the counterpart of the original's
/// toolbar widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Close drawn subpaths on commit.
    pub close_subpath: bool,
    /// Smoothing factor in [0, 1] used by the pen tool and the smooth
    /// action.
    pub smoothing_factor: f32,
    pub sculpt_radius: f32,
    pub stroke: StrokeStyle,
    pub fill: FillStyle,
    pub font: Font,
    pub font_color: Rgba,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            close_subpath: false,
            smoothing_factor: 0.1,
            sculpt_radius: 100.0,
            stroke: StrokeStyle::default(),
            fill: FillStyle::default(),
            font: Font::default(),
            font_color: Rgba::BLACK,
        }
    }
}

impl ToolSettings {
    pub fn set_sculpt_radius(&mut self, radius: f32) {
        self.sculpt_radius = radius.clamp(10.0, 500.0);
    }
}

/// One alignment axis/edge for [`Scene::align_selected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    HCenter,
    Top,
    Bottom,
    VMiddle,
}

/// State of a select-mode move gesture.
pub(crate) struct DragState {
    pub last: Point,
    /// Positions at pointer-down, for the multi-item commit diff.
    pub origins: Vec<(ItemId, Point)>,
    pub moved: bool,
}

pub struct Scene {
    pub(crate) document: Document,
    pub(crate) stack: CommandStack,
    tool: Tool,
    pub settings: ToolSettings,
    pub(crate) selection: Vec<ItemId>,
    frame_mode: bool,
    pub(crate) drag_state: Option<DragState>,
    pub(crate) path_state: Option<tools::path::PathDrawState>,
    pub(crate) label_state: Option<tools::label::LabelState>,
    pub(crate) scale_state: Option<tools::scale::ScaleState>,
    pub(crate) frame_state: Option<tools::frame::FrameDragState>,
    pub(crate) sculpt_state: Option<tools::sculpt::SculptState>,
    pub(crate) text_edit: Option<tools::text::TextEditState>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            document: Document::new(),
            stack: CommandStack::new(),
            tool: Tool::default(),
            settings: ToolSettings::default(),
            selection: Vec::new(),
            frame_mode: false,
            drag_state: None,
            path_state: None,
            label_state: None,
            scale_state: None,
            frame_state: None,
            sculpt_state: None,
            text_edit: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Replace the document wholesale (new/load). Clears history,
    /// selection, and any in-flight gesture; there is no undoing back
    /// to the old document.
    pub fn replace_document(&mut self, document: Document) {
        self.cancel_gesture();
        self.document = document;
        self.document.refresh_attachments();
        self.stack.clear();
        self.selection.clear();
        self.frame_mode = false;
    }

    pub fn set_history_observer(&mut self, observer: Box<dyn HistoryObserver>) {
        self.stack.set_observer(observer);
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. The single entry point for activation, so tools are
    /// mutually exclusive and an in-flight gesture never leaks across.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.cancel_gesture();
            debug!(?tool, "tool change");
            self.tool = tool;
        }
    }

    /// Drop any in-flight gesture, restoring live-mutated items.
    pub fn cancel_gesture(&mut self) {
        self.path_state = None;
        self.label_state = None;
        self.frame_state = None;
        if let Some(state) = self.scale_state.take() {
            state.restore(&mut self.document);
        }
        if let Some(state) = self.sculpt_state.take() {
            state.restore(&mut self.document);
        }
        if let Some(drag) = self.drag_state.take() {
            for (id, pos) in drag.origins {
                if let Some(item) = self.document.get_mut(id) {
                    item.pos = pos;
                }
            }
        }
        if let Some(edit) = self.text_edit.take() {
            edit.restore(&mut self.document);
        }
        self.stack.seal();
    }

    pub fn frame_mode(&self) -> bool {
        self.frame_mode
    }

    /// Toggle frame editing. While active, only frames and frame-nested
    /// items are selectable; everything else is locked out scene-wide.
    pub fn set_frame_mode(&mut self, on: bool) {
        self.frame_mode = on;
        let kept: Vec<ItemId> = self
            .selection
            .iter()
            .copied()
            .filter(|&id| self.is_selectable(id))
            .collect();
        self.selection = kept;
    }

    /// Whether `id` can be selected or moved under the current mode.
    /// Frames are interactive only while frame mode is on; everything
    /// else only while it is off, except items nested under frames.
    /// Fixed frame labels never are.
    pub fn is_selectable(&self, id: ItemId) -> bool {
        if self.document.is_frame_label(id) {
            return false;
        }
        let Some(item) = self.document.get(id) else {
            return false;
        };
        if self.frame_mode {
            item.is_frame() || self.document.is_frame_nested(id)
        } else {
            !item.is_frame() && !self.document.is_frame_nested(id)
        }
    }

    pub fn selection(&self) -> &[ItemId] {
        &self.selection
    }

    pub fn select_only(&mut self, id: ItemId) {
        if self.is_selectable(id) {
            self.selection = vec![id];
        }
    }

    pub fn extend_selection(&mut self, id: ItemId) {
        if self.is_selectable(id) && !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self
            .document
            .top_level_z_ordered()
            .into_iter()
            .filter(|&id| self.is_selectable(id))
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids that still exist, frames filtered out. The working
    /// set for every generic transform-style operation.
    fn selected_content(&self) -> Vec<ItemId> {
        self.selection
            .iter()
            .copied()
            .filter(|&id| self.document.get(id).is_some_and(|item| !item.is_frame()))
            .collect()
    }

    // ----- input dispatch -----

    pub fn pointer_down(&mut self, event: PointerEvent) {
        match self.tool {
            Tool::Select => self.select_pointer_down(event),
            Tool::Path | Tool::SmoothPath => tools::path::on_pointer_down(self, event),
            Tool::Label => tools::label::on_pointer_down(self, event),
            Tool::Text => tools::text::on_pointer_down(self, event),
            Tool::Scale => tools::scale::on_pointer_down(self, event),
            Tool::Frame => tools::frame::on_pointer_down(self, event),
            Tool::Sculpt => tools::sculpt::on_pointer_down(self, event),
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        match self.tool {
            Tool::Select => self.select_pointer_move(event),
            Tool::Path | Tool::SmoothPath => tools::path::on_pointer_move(self, event),
            Tool::Label => tools::label::on_pointer_move(self, event),
            Tool::Text => {}
            Tool::Scale => tools::scale::on_pointer_move(self, event),
            Tool::Frame => tools::frame::on_pointer_move(self, event),
            Tool::Sculpt => tools::sculpt::on_pointer_move(self, event),
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        match self.tool {
            Tool::Select => self.select_pointer_up(event),
            Tool::Path | Tool::SmoothPath => tools::path::on_pointer_up(self, event),
            Tool::Label => tools::label::on_pointer_up(self, event),
            Tool::Text => {}
            Tool::Scale => tools::scale::on_pointer_up(self, event),
            Tool::Frame => tools::frame::on_pointer_up(self, event),
            Tool::Sculpt => tools::sculpt::on_pointer_up(self, event),
        }
    }

    fn select_pointer_down(&mut self, event: PointerEvent) {
        let hit = self
            .document
            .item_at(event.pos)
            .map(|id| self.resolve_selection_target(id))
            .filter(|&id| self.is_selectable(id));
        match hit {
            Some(id) => {
                if event.modifiers.shift {
                    self.extend_selection(id);
                } else if !self.selection.contains(&id) {
                    self.select_only(id);
                }
                let origins = self
                    .selection
                    .iter()
                    .filter_map(|&id| self.document.get(id).map(|item| (id, item.pos)))
                    .collect();
                self.drag_state = Some(DragState {
                    last: event.pos,
                    origins,
                    moved: false,
                });
            }
            None => {
                if !event.modifiers.shift {
                    self.clear_selection();
                }
            }
        }
    }

    fn select_pointer_move(&mut self, event: PointerEvent) {
        let Some(drag) = &mut self.drag_state else {
            return;
        };
        let delta = event.pos - drag.last;
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        drag.last = event.pos;
        drag.moved = true;
        if drag.origins.len() == 1 {
            // Single-item drags stream merged move commands, one undo
            // step for the whole gesture.
            let (id, _) = drag.origins[0];
            if let Some(item) = self.document.get(id) {
                let old = item.pos;
                let new = old + delta;
                self.stack
                    .push_merging(Command::MoveItem { id, old, new }, &mut self.document);
            }
        } else {
            // Multi-item drags move live and commit one atomic command
            // at release.
            for (id, _) in drag.origins.clone() {
                if let Some(item) = self.document.get_mut(id) {
                    item.pos = item.pos + delta;
                }
            }
        }
    }

    fn select_pointer_up(&mut self, _event: PointerEvent) {
        let Some(drag) = self.drag_state.take() else {
            return;
        };
        self.stack.seal();
        if drag.origins.len() > 1 && drag.moved {
            let moves: Vec<(ItemId, Point, Point)> = drag
                .origins
                .iter()
                .filter_map(|&(id, old)| {
                    let current = self.document.get(id)?.pos;
                    (current != old).then_some((id, old, current))
                })
                .collect();
            if !moves.is_empty() {
                // Rewind the live positions so the command's forward
                // effect is the single source of the change.
                for &(id, old, _) in &moves {
                    if let Some(item) = self.document.get_mut(id) {
                        item.pos = old;
                    }
                }
                self.stack.push(Command::MoveItems { moves }, &mut self.document);
            }
        }
    }

    /// Clicking a leader line's label acts on the line itself.
    fn resolve_selection_target(&self, id: ItemId) -> ItemId {
        self.document.leader_line_of_label(id).unwrap_or(id)
    }

    // ----- text editing -----

    pub fn active_text_edit(&self) -> Option<ItemId> {
        self.text_edit.as_ref().map(|edit| edit.id)
    }

    pub fn commit_text_edit(&mut self, content: impl Into<String>) {
        tools::text::commit_edit(self, content.into());
    }

    pub fn cancel_text_edit(&mut self) {
        tools::text::cancel_edit(self);
    }

    // ----- previews (read by the rendering layer, never committed) -----

    pub fn preview_path(&self) -> Option<std::borrow::Cow<'_, strokepad_geometry::PathData>> {
        tools::path::preview(self)
            .map(std::borrow::Cow::Owned)
            .or_else(|| {
                self.label_state
                    .as_ref()
                    .map(|state| std::borrow::Cow::Borrowed(&state.line))
            })
    }

    pub fn preview_frame_rect(&self) -> Option<Rect> {
        self.frame_state.as_ref().map(|state| state.rect())
    }

    // ----- history -----

    pub fn undo(&mut self) -> bool {
        self.stack.undo(&mut self.document)
    }

    pub fn redo(&mut self) -> bool {
        self.stack.redo(&mut self.document)
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.stack.push(command, &mut self.document);
    }

    // ----- operations -----

    /// Remove the selected items. Selecting a leader line's label counts
    /// as selecting the line; removing a parent removes its subtree, so
    /// doubly-covered children are dropped from the set.
    pub fn delete_selected(&mut self) {
        let mut roots: Vec<ItemId> = Vec::new();
        for &id in &self.selection {
            let id = self.resolve_selection_target(id);
            if !roots.contains(&id) {
                roots.push(id);
            }
        }
        let root_set: HashSet<ItemId> = roots.iter().copied().collect();
        roots.retain(|&id| {
            let mut parent = self.document.get(id).and_then(|item| item.parent);
            while let Some(p) = parent {
                if root_set.contains(&p) {
                    return false;
                }
                parent = self.document.get(p).and_then(|item| item.parent);
            }
            true
        });
        if roots.is_empty() {
            return;
        }
        let items = self.document.snapshot_subtrees(&roots);
        self.push(Command::RemoveItems { items });
        self.clear_selection();
    }

    /// Clone the selected items (subtrees included) with fresh ids,
    /// offset slightly, as one undo step. Frames are structural and stay
    /// out.
    pub fn duplicate_selected(&mut self) {
        let mut snapshots = Vec::new();
        let mut new_roots = Vec::new();
        for id in self.selected_content() {
            let subtree = self.document.snapshot_subtrees(&[id]);
            let clones = clone_subtree(&subtree);
            if let Some(first) = clones.first() {
                new_roots.push(first.item.id);
            }
            snapshots.extend(clones);
        }
        if snapshots.is_empty() {
            return;
        }
        self.push(Command::AddItem { items: snapshots });
        self.selection = new_roots;
    }

    pub fn raise_selected(&mut self) {
        let changes: Vec<(ItemId, f32, f32)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id).map(|item| (id, item.z, item.z + 1.0)))
            .collect();
        if !changes.is_empty() {
            self.push(Command::LayerChange { changes });
        }
    }

    /// Lower by one layer. Items already at z 0 refuse to go lower.
    pub fn lower_selected(&mut self) {
        let changes: Vec<(ItemId, f32, f32)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .filter(|item| item.z > 0.0)
            .map(|item| (item.id, item.z, item.z - 1.0))
            .collect();
        if !changes.is_empty() {
            self.push(Command::LayerChange { changes });
        }
    }

    pub fn bring_selected_to_front(&mut self) {
        let ids = self.selected_content();
        if ids.is_empty() {
            return;
        }
        let top = self.document.max_z() + 1.0;
        let changes: Vec<(ItemId, f32, f32)> = ids
            .iter()
            .filter_map(|&id| self.document.get(id).map(|item| (id, item.z, top)))
            .collect();
        self.push(Command::LayerChange { changes });
    }

    /// Align selected items along one axis. With several items the first
    /// selected is the anchor (centers average); a single item aligns to
    /// the frame it overlaps, if any.
    pub fn align_selected(&mut self, alignment: Alignment) {
        let ids = self.selected_content();
        let commands: Vec<Command> = if ids.len() > 1 {
            self.multi_align_commands(&ids, alignment)
        } else if let Some(&id) = ids.first() {
            self.frame_align_commands(id, alignment)
        } else {
            Vec::new()
        };
        for command in commands {
            self.push(command);
        }
    }

    fn multi_align_commands(&self, ids: &[ItemId], alignment: Alignment) -> Vec<Command> {
        let bounds: Vec<(ItemId, Rect)> = ids
            .iter()
            .filter_map(|&id| self.document.scene_bounds(id).map(|b| (id, b)))
            .collect();
        if bounds.len() < 2 {
            return Vec::new();
        }
        let anchor = bounds[0].1;
        let avg_x = bounds.iter().map(|(_, b)| b.center().x).sum::<f32>() / bounds.len() as f32;
        let avg_y = bounds.iter().map(|(_, b)| b.center().y).sum::<f32>() / bounds.len() as f32;
        bounds
            .iter()
            .filter_map(|&(id, b)| {
                let (dx, dy) = match alignment {
                    Alignment::Left => (anchor.min.x - b.min.x, 0.0),
                    Alignment::Right => (anchor.max.x - b.max.x, 0.0),
                    Alignment::HCenter => (avg_x - b.center().x, 0.0),
                    Alignment::Top => (0.0, anchor.min.y - b.min.y),
                    Alignment::Bottom => (0.0, anchor.max.y - b.max.y),
                    Alignment::VMiddle => (0.0, avg_y - b.center().y),
                };
                if dx == 0.0 && dy == 0.0 {
                    return None;
                }
                let old = self.document.get(id)?.pos;
                Some(Command::AlignItem { id, old, new: old.offset(dx, dy) })
            })
            .collect()
    }

    fn frame_align_commands(&self, id: ItemId, alignment: Alignment) -> Vec<Command> {
        let Some(item_bounds) = self.document.scene_bounds(id) else {
            return Vec::new();
        };
        // The first frame whose page rect overlaps the item wins.
        let frame_bounds = self.document.top_level_z_ordered().into_iter().find_map(|fid| {
            let frame = self.document.get(fid)?;
            if !frame.is_frame() {
                return None;
            }
            let bounds = self.document.scene_bounds(fid)?;
            let overlaps = bounds.contains(item_bounds.min)
                || bounds.contains(item_bounds.max)
                || item_bounds.contains(bounds.min);
            overlaps.then_some(bounds)
        });
        let Some(frame) = frame_bounds else {
            return Vec::new();
        };
        let (dx, dy) = match alignment {
            Alignment::Left => (frame.min.x - item_bounds.min.x, 0.0),
            Alignment::Right => (frame.max.x - item_bounds.max.x, 0.0),
            Alignment::HCenter => (frame.center().x - item_bounds.center().x, 0.0),
            Alignment::Top => (0.0, frame.min.y - item_bounds.min.y),
            Alignment::Bottom => (0.0, frame.max.y - item_bounds.max.y),
            Alignment::VMiddle => (0.0, frame.center().y - item_bounds.center().y),
        };
        if dx == 0.0 && dy == 0.0 {
            return Vec::new();
        }
        let Some(old) = self.document.get(id).map(|item| item.pos) else {
            return Vec::new();
        };
        vec![Command::AlignItem { id, old, new: old.offset(dx, dy) }]
    }

    pub fn flip_selected_horizontal(&mut self) {
        self.flip_selected(-1.0, 1.0);
    }

    pub fn flip_selected_vertical(&mut self) {
        self.flip_selected(1.0, -1.0);
    }

    fn flip_selected(&mut self, sx: f32, sy: f32) {
        let changes: Vec<(ItemId, TransformState, TransformState)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .map(|item| {
                let old = TransformState::capture(item);
                let mut new = old;
                new.transform = old.transform.scaled(sx, sy);
                new.origin = self
                    .document
                    .local_bounds(item.id)
                    .map(|b| b.center())
                    .unwrap_or(old.origin);
                (item.id, old, new)
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::Transform { changes });
        }
    }

    pub fn rotate_selected_to(&mut self, degrees: f32) {
        let changes: Vec<(ItemId, TransformState, TransformState)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .filter(|item| item.rotation != degrees)
            .map(|item| {
                let old = TransformState::capture(item);
                let mut new = old;
                new.rotation = degrees;
                (item.id, old, new)
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::Transform { changes });
        }
    }

    pub fn rotate_selected_by(&mut self, degrees: f32) {
        let changes: Vec<(ItemId, TransformState, TransformState)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .map(|item| {
                let old = TransformState::capture(item);
                let mut new = old;
                new.rotation = old.rotation + degrees;
                (item.id, old, new)
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::Transform { changes });
        }
    }

    /// Restore default transform, scale, and rotation.
    pub fn reset_selected(&mut self) {
        let changes: Vec<(ItemId, TransformState)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .map(|item| (item.id, TransformState::capture(item)))
            .filter(|(_, state)| *state != TransformState::default())
            .collect();
        if !changes.is_empty() {
            self.push(Command::ResetItem { changes });
        }
    }

    pub fn hide_selected(&mut self) {
        let changes: Vec<(ItemId, bool, bool)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .filter(|item| item.visible)
            .map(|item| (item.id, true, false))
            .collect();
        if !changes.is_empty() {
            self.push(Command::VisibilityChange { changes });
        }
    }

    pub fn unhide_all(&mut self) {
        let changes: Vec<(ItemId, bool, bool)> = self
            .document
            .iter()
            .filter(|item| !item.visible)
            .map(|item| (item.id, false, true))
            .collect();
        if !changes.is_empty() {
            self.push(Command::VisibilityChange { changes });
        }
    }

    pub fn set_selected_opacity(&mut self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        let changes: Vec<(ItemId, f32, f32)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| self.document.get(id))
            .filter(|item| item.opacity != opacity)
            .map(|item| (item.id, item.opacity, opacity))
            .collect();
        if !changes.is_empty() {
            self.push(Command::OpacityChange { changes });
        }
    }

    /// Restyle selected paths and leader lines; other variants no-op.
    pub fn restyle_selected(&mut self, stroke: StrokeStyle, fill: FillStyle) {
        let changes: Vec<_> = self
            .selected_content()
            .iter()
            .filter_map(|&id| {
                let item = self.document.get(id)?;
                let (old_stroke, old_fill) = match &item.kind {
                    ItemKind::Path(p) => (p.stroke, p.fill),
                    ItemKind::LeaderLine(l) => (l.stroke, l.fill),
                    _ => return None,
                };
                Some((id, old_stroke, stroke, old_fill, fill))
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::StyleChange { changes });
        }
    }

    pub fn set_selected_font(&mut self, font: Font) {
        let changes: Vec<(ItemId, Font, Font)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| {
                let item = self.document.get(id)?;
                let old = match &item.kind {
                    ItemKind::Text(text) => text.font.clone(),
                    ItemKind::Path(path) => path.text.as_ref()?.font.clone(),
                    _ => return None,
                };
                Some((id, old, font.clone()))
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::FontChange { changes });
        }
    }

    /// Smooth selected freeform paths at the configured factor. Paths
    /// already smoothed are skipped, as are paths too short to change.
    pub fn smooth_selected(&mut self) {
        let factor = self.settings.smoothing_factor;
        let changes: Vec<_> = self
            .selected_content()
            .iter()
            .filter_map(|&id| {
                let item = self.document.get(id)?;
                let ItemKind::Path(path) = &item.kind else {
                    return None;
                };
                if path.smoothed {
                    return None;
                }
                let smoothed = smooth_path(&path.path, factor);
                (smoothed != path.path).then(|| (id, path.path.clone(), smoothed, path.smoothed))
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::SmoothPath { changes, set_smoothed: Some(true) });
        }
    }

    pub fn close_selected_subpaths(&mut self) {
        let changes: Vec<_> = self
            .selected_content()
            .iter()
            .filter_map(|&id| {
                let item = self.document.get(id)?;
                let ItemKind::Path(path) = &item.kind else {
                    return None;
                };
                let mut closed = path.path.clone();
                closed.close_subpath();
                (closed != path.path).then(|| (id, path.path.clone(), closed))
            })
            .collect();
        if !changes.is_empty() {
            self.push(Command::CloseSubpath { changes });
        }
    }

    /// Trace selected raster assets through the external vectorizer and
    /// add the results as vector items, one undo step. A failed call
    /// propagates without touching the document.
    pub fn vectorize_selected(
        &mut self,
        vectorizer: &dyn crate::assets::Vectorizer,
    ) -> anyhow::Result<()> {
        let sources: Vec<(std::path::PathBuf, Point)> = self
            .selected_content()
            .iter()
            .filter_map(|&id| {
                let item = self.document.get(id)?;
                crate::assets::vectorize_source(item).map(|path| (path, item.pos))
            })
            .collect();
        let mut snapshots = Vec::new();
        for (path, pos) in sources {
            let item = crate::assets::vectorize_file(vectorizer, &path)?.at(pos);
            snapshots.push(ItemSnapshot::new(item));
        }
        if !snapshots.is_empty() {
            self.push(Command::AddItem { items: snapshots });
        }
        Ok(())
    }

    pub fn rename_item(&mut self, id: ItemId, name: impl Into<String>) {
        let name = name.into();
        let Some(item) = self.document.get(id) else {
            return;
        };
        if item.name != name {
            let old = item.name.clone();
            self.push(Command::Rename { id, old, new: name });
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-copy a snapshot forest with fresh ids, remapping parent links
/// and owned-child references, offsetting root positions.
fn clone_subtree(snapshots: &[ItemSnapshot]) -> Vec<ItemSnapshot> {
    let id_map: std::collections::HashMap<ItemId, ItemId> = snapshots
        .iter()
        .map(|snap| (snap.item.id, ItemId::new()))
        .collect();
    snapshots
        .iter()
        .map(|snap| {
            let mut item: Item = snap.item.clone();
            item.id = id_map[&item.id];
            match item.parent {
                Some(parent) => item.parent = id_map.get(&parent).copied(),
                None => item.pos = item.pos.offset(10.0, 10.0),
            }
            match &mut item.kind {
                ItemKind::LeaderLine(line) => {
                    if let Some(&mapped) = id_map.get(&line.label) {
                        line.label = mapped;
                    }
                }
                ItemKind::Frame(frame) => {
                    if let Some(&mapped) = id_map.get(&frame.label) {
                        frame.label = mapped;
                    }
                }
                ItemKind::Group(group) => {
                    for child in &mut group.children {
                        if let Some(&mapped) = id_map.get(child) {
                            *child = mapped;
                        }
                    }
                }
                _ => {}
            }
            ItemSnapshot::new(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::PathItem;
    use strokepad_geometry::PathData;

    fn scene_with_path() -> (Scene, ItemId) {
        let mut scene = Scene::new();
        let item = Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(&[Point::ZERO, Point::new(20.0, 20.0)]),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let id = item.id;
        scene.push(Command::AddItem {
            items: vec![ItemSnapshot::new(item)],
        });
        (scene, id)
    }

    #[test]
    fn select_drag_merges_into_one_undo_step() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);

        scene.pointer_down(PointerEvent::at(Point::new(5.0, 5.0)));
        for i in 1..=4 {
            scene.pointer_move(PointerEvent::at(Point::new(5.0 + i as f32 * 3.0, 5.0)));
        }
        scene.pointer_up(PointerEvent::at(Point::new(17.0, 5.0)));

        // One AddItem + one merged move.
        assert_eq!(scene.stack.undo_count(), 2);
        assert_eq!(scene.document.get(id).unwrap().pos, Point::new(12.0, 0.0));

        scene.undo();
        assert_eq!(scene.document.get(id).unwrap().pos, Point::ZERO);
    }

    #[test]
    fn multi_item_drag_commits_one_atomic_move() {
        let (mut scene, a) = scene_with_path();
        let mut second = Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(&[Point::ZERO, Point::new(20.0, 20.0)]),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        second.pos = Point::new(100.0, 0.0);
        let b = second.id;
        scene.push(Command::AddItem { items: vec![ItemSnapshot::new(second)] });
        scene.select_only(a);
        scene.extend_selection(b);

        scene.pointer_down(PointerEvent::at(Point::new(5.0, 5.0)));
        scene.pointer_move(PointerEvent::at(Point::new(5.0, 25.0)));
        scene.pointer_move(PointerEvent::at(Point::new(5.0, 45.0)));
        scene.pointer_up(PointerEvent::at(Point::new(5.0, 45.0)));

        // Two adds + one atomic multi-move.
        assert_eq!(scene.stack.undo_count(), 3);
        assert_eq!(scene.document.get(a).unwrap().pos, Point::new(0.0, 40.0));
        assert_eq!(scene.document.get(b).unwrap().pos, Point::new(100.0, 40.0));

        // Undo moves both back together.
        scene.undo();
        assert_eq!(scene.document.get(a).unwrap().pos, Point::ZERO);
        assert_eq!(scene.document.get(b).unwrap().pos, Point::new(100.0, 0.0));
    }

    #[test]
    fn font_change_applies_and_reverts() {
        let mut scene = Scene::new();
        let item = Item::new(ItemKind::Text(crate::item::TextBlock::new(
            "note",
            Font::default(),
            Rgba::BLACK,
        )));
        let id = item.id;
        scene.push(Command::AddItem { items: vec![ItemSnapshot::new(item)] });
        scene.select_only(id);

        let bigger = Font { size: 48.0, bold: true, ..Font::default() };
        scene.set_selected_font(bigger.clone());
        match &scene.document.get(id).unwrap().kind {
            ItemKind::Text(text) => assert_eq!(text.font, bigger),
            _ => unreachable!(),
        }

        scene.undo();
        match &scene.document.get(id).unwrap().kind {
            ItemKind::Text(text) => assert_eq!(text.font, Font::default()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn frames_select_only_in_frame_mode() {
        let mut scene = Scene::new();
        let label = Item::new(ItemKind::Text(crate::item::TextBlock::new(
            "Canvas",
            Font::default(),
            Rgba::BLACK,
        )));
        let mut frame = Item::new(ItemKind::Frame(crate::item::CanvasFrame {
            rect: strokepad_geometry::Rect::from_size(100.0, 100.0),
            label: label.id,
        }));
        frame.z = -1.0;
        let label = label.child_of(frame.id);
        let frame_id = frame.id;
        scene.push(Command::AddItem {
            items: vec![ItemSnapshot::new(frame), ItemSnapshot::new(label)],
        });

        assert!(!scene.is_selectable(frame_id));
        scene.set_frame_mode(true);
        assert!(scene.is_selectable(frame_id));
    }

    #[test]
    fn zero_movement_drag_pushes_nothing() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);
        let before = scene.stack.undo_count();

        scene.pointer_down(PointerEvent::at(Point::new(5.0, 5.0)));
        scene.pointer_up(PointerEvent::at(Point::new(5.0, 5.0)));

        assert_eq!(scene.stack.undo_count(), before);
    }

    #[test]
    fn delete_redirects_leader_label_to_line() {
        let mut scene = Scene::new();
        let mut line_item = Item::new(ItemKind::Path(PathItem::new(
            PathData::new(),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let label = Item::new(ItemKind::Text(crate::item::TextBlock::new(
            "note",
            Font::default(),
            Rgba::BLACK,
        )))
        .child_of(line_item.id);
        let mut path = PathData::begin_at(Point::ZERO);
        path.line_to(Point::new(10.0, 10.0));
        line_item.kind = ItemKind::LeaderLine(crate::item::LeaderLine {
            path,
            stroke: StrokeStyle::default(),
            fill: FillStyle::default(),
            label: label.id,
        });
        let (line_id, label_id) = (line_item.id, label.id);
        scene.push(Command::AddItem {
            items: vec![ItemSnapshot::new(line_item), ItemSnapshot::new(label)],
        });

        scene.selection = vec![label_id];
        scene.delete_selected();
        assert!(!scene.document.contains(line_id));
        assert!(!scene.document.contains(label_id));

        scene.undo();
        assert!(scene.document.contains(line_id));
        assert!(scene.document.contains(label_id));
    }

    #[test]
    fn lower_layer_refuses_below_zero() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);
        let before = scene.stack.undo_count();
        scene.lower_selected();
        assert_eq!(scene.stack.undo_count(), before);
        assert_eq!(scene.document.get(id).unwrap().z, 0.0);

        scene.raise_selected();
        scene.lower_selected();
        assert_eq!(scene.document.get(id).unwrap().z, 0.0);
    }

    #[test]
    fn duplicate_clones_with_fresh_ids() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);
        scene.duplicate_selected();

        assert_eq!(scene.document.len(), 2);
        let new_id = scene.selection()[0];
        assert_ne!(new_id, id);
        assert_eq!(scene.document.get(new_id).unwrap().pos, Point::new(10.0, 10.0));

        scene.undo();
        assert_eq!(scene.document.len(), 1);
    }

    #[test]
    fn flip_swaps_matrix_and_reverts() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);
        scene.flip_selected_horizontal();
        assert!(!scene.document.get(id).unwrap().transform.is_identity());

        scene.undo();
        assert!(scene.document.get(id).unwrap().transform.is_identity());
    }

    #[test]
    fn frame_mode_locks_out_plain_items() {
        let (mut scene, id) = scene_with_path();
        scene.select_only(id);
        assert_eq!(scene.selection(), &[id]);

        scene.set_frame_mode(true);
        assert!(scene.selection().is_empty());
        assert!(!scene.is_selectable(id));

        scene.set_frame_mode(false);
        assert!(scene.is_selectable(id));
    }

    #[test]
    fn smooth_selected_skips_already_smoothed() {
        let points: Vec<Point> = (0..8)
            .map(|i| Point::new(i as f32 * 10.0, if i % 2 == 0 { 0.0 } else { 20.0 }))
            .collect();
        let mut scene = Scene::new();
        let item = Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(&points),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let id = item.id;
        scene.push(Command::AddItem { items: vec![ItemSnapshot::new(item)] });
        scene.select_only(id);

        scene.smooth_selected();
        let count = scene.stack.undo_count();
        match &scene.document.get(id).unwrap().kind {
            ItemKind::Path(path) => assert!(path.smoothed),
            _ => unreachable!(),
        }

        scene.smooth_selected();
        assert_eq!(scene.stack.undo_count(), count);
    }

    #[test]
    fn sculpt_radius_is_clamped() {
        let mut settings = ToolSettings::default();
        settings.set_sculpt_radius(2.0);
        assert_eq!(settings.sculpt_radius, 10.0);
        settings.set_sculpt_radius(1000.0);
        assert_eq!(settings.sculpt_radius, 500.0);
    }
}
