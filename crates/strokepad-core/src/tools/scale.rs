//! Scale-by-drag. The drag live-updates the selected items' transforms
//! without touching the command stack; release commits one transform
//! command, or nothing when the drag produced no net change.

use strokepad_geometry::{Point, Vec2};

use crate::command::Command;
use crate::document::Document;
use crate::item::{ItemId, TransformState};
use crate::scene::{PointerEvent, Scene};

pub struct ScaleState {
    pub start: Point,
    /// Transform state at pointer-down, the command's "old" values.
    pub initial: Vec<(ItemId, TransformState)>,
}

impl ScaleState {
    pub(crate) fn restore(&self, doc: &mut Document) {
        for (id, state) in &self.initial {
            if let Some(item) = doc.get_mut(*id) {
                state.apply_to(item);
            }
        }
    }
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    // Frames are structural and sit out generic transform tools.
    let initial: Vec<(ItemId, TransformState)> = scene
        .selection
        .iter()
        .filter_map(|&id| scene.document.get(id))
        .filter(|item| !item.is_frame())
        .map(|item| (item.id, TransformState::capture(item)))
        .collect();
    if !initial.is_empty() {
        scene.scale_state = Some(ScaleState {
            start: event.pos,
            initial,
        });
    }
}

pub fn on_pointer_move(scene: &mut Scene, event: PointerEvent) {
    let Some(state) = &scene.scale_state else {
        return;
    };
    let factor = 1.0 + (event.pos.y - state.start.y) / 100.0;
    let updates: Vec<(ItemId, TransformState)> = state.initial.clone();
    for (id, initial) in updates {
        let center = scene.document.local_bounds(id).map(|b| b.center());
        if let Some(item) = scene.document.get_mut(id) {
            item.scale = Vec2::new(initial.scale.x * factor, initial.scale.y * factor);
            if let Some(center) = center {
                item.origin = center;
            }
        }
    }
}

pub fn on_pointer_up(scene: &mut Scene, _event: PointerEvent) {
    let Some(state) = scene.scale_state.take() else {
        return;
    };
    let changes: Vec<(ItemId, TransformState, TransformState)> = state
        .initial
        .iter()
        .filter_map(|&(id, old)| {
            let current = TransformState::capture(scene.document.get(id)?);
            (current != old).then_some((id, old, current))
        })
        .collect();
    // Rewind the live preview; the command re-applies the new state so
    // undo lands exactly on the pre-gesture document.
    state.restore(&mut scene.document);
    if !changes.is_empty() {
        scene.push(Command::Transform { changes });
    }
}
