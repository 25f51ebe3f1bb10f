//! Leader line drawing: one drag creates the line together with its
//! attached editable label, committed as a single compound command.

use strokepad_geometry::{PathData, Point};

use crate::command::Command;
use crate::document::ItemSnapshot;
use crate::item::{Item, ItemKind, LeaderLine, TextBlock};
use crate::scene::{PointerEvent, Scene};

const DEFAULT_LABEL: &str = "An Editable Text Block";

pub struct LabelState {
    pub line: PathData,
    pub start: Point,
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    scene.label_state = Some(LabelState {
        line: PathData::begin_at(event.pos),
        start: event.pos,
    });
}

pub fn on_pointer_move(scene: &mut Scene, event: PointerEvent) {
    if let Some(state) = &mut scene.label_state {
        state.line.line_to(event.pos);
    }
}

pub fn on_pointer_up(scene: &mut Scene, event: PointerEvent) {
    let Some(mut state) = scene.label_state.take() else {
        return;
    };
    state.line.line_to(event.pos);

    // A line that never left its start point is discarded whole, label
    // included.
    if state.line.points().iter().all(|p| *p == state.start) {
        return;
    }

    let end = state.line.last_point().unwrap_or(state.start);
    let mut line_item = Item::new(ItemKind::Path(crate::item::PathItem::new(
        PathData::new(),
        scene.settings.stroke,
        scene.settings.fill,
    )));
    let label = Item::new(ItemKind::Text(TextBlock::new(
        DEFAULT_LABEL,
        scene.settings.font.clone(),
        scene.settings.font_color,
    )))
    .at(end)
    .named("Text")
    .child_of(line_item.id);
    line_item.kind = ItemKind::LeaderLine(LeaderLine {
        path: state.line,
        stroke: scene.settings.stroke,
        fill: scene.settings.fill,
        label: label.id,
    });
    line_item.name = "Leader Line".to_string();

    scene.push(Command::AddItem {
        items: vec![ItemSnapshot::new(line_item), ItemSnapshot::new(label)],
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, Tool};

    #[test]
    fn drag_creates_line_with_attached_label() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Label);
        scene.pointer_down(PointerEvent::at(Point::ZERO));
        scene.pointer_move(PointerEvent::at(Point::new(30.0, 10.0)));
        scene.pointer_up(PointerEvent::at(Point::new(60.0, 20.0)));

        assert_eq!(scene.document().len(), 2);
        let line = scene
            .document()
            .iter()
            .find(|item| matches!(item.kind, ItemKind::LeaderLine(_)))
            .unwrap();
        let ItemKind::LeaderLine(leader) = &line.kind else {
            unreachable!()
        };
        let label = scene.document().get(leader.label).unwrap();
        assert_eq!(label.parent, Some(line.id));
        // The label sits at the line's terminal point.
        assert_eq!(label.pos, Point::new(60.0, 20.0));
        match &label.kind {
            ItemKind::Text(text) => assert_eq!(text.content, DEFAULT_LABEL),
            other => panic!("unexpected kind {}", other.tag()),
        }
    }

    #[test]
    fn empty_line_discards_the_compound_item() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Label);
        scene.pointer_down(PointerEvent::at(Point::new(5.0, 5.0)));
        scene.pointer_up(PointerEvent::at(Point::new(5.0, 5.0)));

        assert_eq!(scene.document().len(), 0);
        assert!(!scene.can_undo());
    }

    #[test]
    fn undo_removes_line_and_label_together() {
        let mut scene = Scene::new();
        scene.set_tool(Tool::Label);
        scene.pointer_down(PointerEvent::at(Point::ZERO));
        scene.pointer_up(PointerEvent::at(Point::new(40.0, 0.0)));
        assert_eq!(scene.document().len(), 2);

        scene.undo();
        assert_eq!(scene.document().len(), 0);
        scene.redo();
        assert_eq!(scene.document().len(), 2);
    }
}
