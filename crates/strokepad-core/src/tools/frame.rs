//! Canvas frame placement: a shift-drag in scene coordinates sizes the
//! page rectangle. A zero-size result discards the frame and its label.

use strokepad_geometry::{Point, Rect};

use crate::command::Command;
use crate::document::ItemSnapshot;
use crate::item::{CanvasFrame, Item, ItemKind, TextBlock};
use crate::scene::{PointerEvent, Scene};

const DEFAULT_NAME: &str = "Canvas";

pub struct FrameDragState {
    pub start: Point,
    pub current: Point,
}

impl FrameDragState {
    /// The frame rect in local coordinates. Extents go negative while
    /// the drag runs up or left; such a rect is empty and won't commit.
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.current.x - self.start.x, self.current.y - self.start.y)
    }
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    // The modifier is required; a plain press is not a frame gesture.
    if event.modifiers.shift {
        scene.frame_state = Some(FrameDragState {
            start: event.pos,
            current: event.pos,
        });
    }
}

pub fn on_pointer_move(scene: &mut Scene, event: PointerEvent) {
    if let Some(state) = &mut scene.frame_state {
        state.current = event.pos;
    }
}

pub fn on_pointer_up(scene: &mut Scene, event: PointerEvent) {
    let Some(mut state) = scene.frame_state.take() else {
        return;
    };
    state.current = event.pos;
    let rect = state.rect();
    if rect.is_empty() {
        return;
    }

    let mut frame_item = Item::new(ItemKind::Frame(CanvasFrame {
        rect,
        label: crate::item::ItemId::new(),
    }))
    .at(state.start)
    .named(DEFAULT_NAME)
    // Frames paint under content by default.
    .with_z(-1.0);
    let label = Item::new(ItemKind::Text(TextBlock::new(
        DEFAULT_NAME,
        scene.settings.font.clone(),
        scene.settings.font_color,
    )))
    .at(rect.min)
    .child_of(frame_item.id);
    if let ItemKind::Frame(frame) = &mut frame_item.kind {
        frame.label = label.id;
    }

    scene.push(Command::AddItem {
        items: vec![ItemSnapshot::new(frame_item), ItemSnapshot::new(label)],
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, Tool};

    #[test]
    fn shift_drag_adds_frame_with_label() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Frame);
        scene.pointer_down(PointerEvent::with_shift(Point::new(10.0, 10.0)));
        scene.pointer_move(PointerEvent::with_shift(Point::new(200.0, 150.0)));
        scene.pointer_up(PointerEvent::with_shift(Point::new(200.0, 150.0)));

        assert_eq!(scene.document().len(), 2);
        let frame = scene
            .document()
            .iter()
            .find(|item| item.is_frame())
            .unwrap();
        assert_eq!(frame.pos, Point::new(10.0, 10.0));
        assert_eq!(frame.z, -1.0);
        let ItemKind::Frame(data) = &frame.kind else {
            unreachable!()
        };
        assert_eq!(data.rect.width(), 190.0);
        assert_eq!(data.rect.height(), 140.0);
        let label = scene.document().get(data.label).unwrap();
        assert_eq!(label.parent, Some(frame.id));
        // The label pins to the frame's top-left.
        assert_eq!(label.pos, data.rect.min);
    }

    #[test]
    fn zero_drag_discards_frame_and_label() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Frame);
        scene.pointer_down(PointerEvent::with_shift(Point::new(10.0, 10.0)));
        scene.pointer_up(PointerEvent::with_shift(Point::new(10.0, 10.0)));

        assert_eq!(scene.document().len(), 0);
        assert!(!scene.can_undo());
    }

    #[test]
    fn press_without_modifier_is_ignored() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Frame);
        scene.pointer_down(PointerEvent::at(Point::new(10.0, 10.0)));
        scene.pointer_move(PointerEvent::at(Point::new(100.0, 100.0)));
        scene.pointer_up(PointerEvent::at(Point::new(100.0, 100.0)));

        assert_eq!(scene.document().len(), 0);
    }
}
