//! Text placement and editing. A click activates an existing text block
//! under the cursor or commits a new default-content block; edits commit
//! through the command stack, so they undo like any other change.

use crate::command::Command;
use crate::document::{Document, ItemSnapshot};
use crate::item::{Item, ItemId, ItemKind, TextBlock};
use crate::scene::{PointerEvent, Scene};

const DEFAULT_CONTENT: &str = "Lorem Ipsum";

pub struct TextEditState {
    pub id: ItemId,
    pub original: String,
}

impl TextEditState {
    pub(crate) fn restore(&self, doc: &mut Document) {
        if let Some(item) = doc.get_mut(self.id) {
            if let ItemKind::Text(text) = &mut item.kind {
                text.content = self.original.clone();
            }
        }
    }
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    // An edit already in flight is dropped; the UI commits explicitly
    // through the keyboard path.
    if scene.text_edit.is_some() {
        cancel_edit(scene);
    }

    let existing = scene.document.item_at(event.pos).filter(|&id| {
        matches!(scene.document.get(id).map(|item| &item.kind), Some(ItemKind::Text(_)))
            && !scene.document.is_frame_label(id)
    });

    let id = match existing {
        Some(id) => id,
        None => {
            let item = Item::new(ItemKind::Text(TextBlock::new(
                DEFAULT_CONTENT,
                scene.settings.font.clone(),
                scene.settings.font_color,
            )))
            .at(event.pos)
            .named("Text");
            let id = item.id;
            scene.push(Command::AddItem {
                items: vec![ItemSnapshot::new(item)],
            });
            id
        }
    };

    let original = match scene.document.get(id).map(|item| &item.kind) {
        Some(ItemKind::Text(text)) => text.content.clone(),
        _ => return,
    };
    scene.text_edit = Some(TextEditState { id, original });
}

/// Keyboard commit: push an edit command when the content changed.
pub fn commit_edit(scene: &mut Scene, content: String) {
    let Some(edit) = scene.text_edit.take() else {
        return;
    };
    if content != edit.original {
        scene.push(Command::EditText {
            id: edit.id,
            old: edit.original,
            new: content,
        });
    }
}

/// Keyboard cancel: drop the edit, restoring the original content.
pub fn cancel_edit(scene: &mut Scene) {
    if let Some(edit) = scene.text_edit.take() {
        edit.restore(&mut scene.document);
    }
}
