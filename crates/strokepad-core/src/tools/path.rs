//! Freeform path drawing, plain and smoothed. Both variants share one
//! lifecycle; the pen variant runs the preview and the committed path
//! through the smoother.

use strokepad_geometry::{MIN_SMOOTH_POINTS, PathData, smooth_path};

use crate::command::Command;
use crate::document::ItemSnapshot;
use crate::item::{Item, ItemKind, PathItem};
use crate::scene::{PointerEvent, Scene, Tool};

pub struct PathDrawState {
    pub path: PathData,
    /// Pen (smooth) variant of the tool.
    pub smooth: bool,
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    scene.path_state = Some(PathDrawState {
        path: PathData::begin_at(event.pos),
        smooth: scene.tool() == Tool::SmoothPath,
    });
}

pub fn on_pointer_move(scene: &mut Scene, event: PointerEvent) {
    if let Some(state) = &mut scene.path_state {
        state.path.line_to(event.pos);
    }
}

pub fn on_pointer_up(scene: &mut Scene, event: PointerEvent) {
    let Some(mut state) = scene.path_state.take() else {
        return;
    };
    // The final segment lands even with zero net movement; a degenerate
    // path is accepted input.
    state.path.line_to(event.pos);
    if scene.settings.close_subpath {
        state.path.close_subpath();
    }

    let path = if state.smooth {
        smooth_path(&state.path, scene.settings.smoothing_factor)
    } else {
        state.path
    };

    let mut path_item = PathItem::new(path, scene.settings.stroke, scene.settings.fill);
    path_item.smoothed = state.smooth;
    let item = Item::new(ItemKind::Path(path_item)).named("Path");
    scene.push(Command::AddItem {
        items: vec![ItemSnapshot::new(item)],
    });
}

/// The in-flight path for rendering, smoothed live once it has enough
/// points for the smoother to act on.
pub fn preview(scene: &Scene) -> Option<PathData> {
    let state = scene.path_state.as_ref()?;
    if state.smooth && state.path.seg_count() >= MIN_SMOOTH_POINTS {
        Some(smooth_path(&state.path, scene.settings.smoothing_factor))
    } else {
        Some(state.path.clone())
    }
}
