//! Path sculpting: grab the control points near the cursor and drag
//! them, displacement falling off linearly toward the sculpt radius.
//! The whole stroke commits as one path-data swap.

use strokepad_geometry::{PathData, Point};

use crate::command::Command;
use crate::document::Document;
use crate::item::{ItemId, ItemKind};
use crate::scene::{PointerEvent, Scene};

pub struct SculptState {
    pub id: ItemId,
    pub old_path: PathData,
    /// Per-point pull strength, `1 - d/radius` at pointer-down, zero
    /// outside the radius.
    pub weights: Vec<f32>,
    pub last: Point,
}

impl SculptState {
    pub(crate) fn restore(&self, doc: &mut Document) {
        if let Some(item) = doc.get_mut(self.id) {
            match &mut item.kind {
                ItemKind::Path(path) => path.path = self.old_path.clone(),
                ItemKind::LeaderLine(line) => line.path = self.old_path.clone(),
                _ => {}
            }
        }
    }
}

pub fn on_pointer_down(scene: &mut Scene, event: PointerEvent) {
    let radius = scene.settings.sculpt_radius;
    // Topmost path whose outline comes within the radius.
    let target = scene
        .document
        .top_level_z_ordered()
        .into_iter()
        .rev()
        .find_map(|id| {
            let item = scene.document.get(id)?;
            if !item.visible {
                return None;
            }
            let path = match &item.kind {
                ItemKind::Path(p) => &p.path,
                ItemKind::LeaderLine(l) => &l.path,
                _ => return None,
            };
            let matrix = scene.document.scene_matrix(id);
            let weights: Vec<f32> = path
                .points()
                .iter()
                .map(|&p| {
                    let d = matrix.map(p).distance(event.pos);
                    (1.0 - d / radius).max(0.0)
                })
                .collect();
            weights
                .iter()
                .any(|&w| w > 0.0)
                .then(|| (id, path.clone(), weights))
        });

    if let Some((id, old_path, weights)) = target {
        scene.sculpt_state = Some(SculptState {
            id,
            old_path,
            weights,
            last: event.pos,
        });
    }
}

pub fn on_pointer_move(scene: &mut Scene, event: PointerEvent) {
    let Some(state) = &mut scene.sculpt_state else {
        return;
    };
    let delta = event.pos - state.last;
    state.last = event.pos;
    let weights = state.weights.clone();
    let id = state.id;
    if let Some(item) = scene.document.get_mut(id) {
        let path = match &mut item.kind {
            ItemKind::Path(p) => &mut p.path,
            ItemKind::LeaderLine(l) => &mut l.path,
            _ => return,
        };
        let moved: Vec<Point> = path
            .points()
            .iter()
            .zip(&weights)
            .map(|(&p, &w)| p.offset(delta.x * w, delta.y * w))
            .collect();
        path.set_points(&moved);
    }
}

pub fn on_pointer_up(scene: &mut Scene, _event: PointerEvent) {
    let Some(state) = scene.sculpt_state.take() else {
        return;
    };
    let sculpted = match scene.document.get(state.id).map(|item| &item.kind) {
        Some(ItemKind::Path(p)) => p.path.clone(),
        Some(ItemKind::LeaderLine(l)) => l.path.clone(),
        _ => return,
    };
    state.restore(&mut scene.document);
    if sculpted != state.old_path {
        let old_smoothed = match scene.document.get(state.id).map(|item| &item.kind) {
            Some(ItemKind::Path(p)) => p.smoothed,
            _ => false,
        };
        // A sculpt swaps path data but says nothing about smoothness.
        scene.push(Command::SmoothPath {
            changes: vec![(state.id, state.old_path, sculpted, old_smoothed)],
            set_smoothed: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::document::ItemSnapshot;
    use crate::item::{Item, PathItem};
    use crate::scene::{Scene, Tool};
    use crate::style::{FillStyle, StrokeStyle};

    fn scene_with_line(points: &[Point]) -> (Scene, ItemId) {
        let mut scene = Scene::new();
        let item = Item::new(ItemKind::Path(PathItem::new(
            PathData::from_points(points),
            StrokeStyle::default(),
            FillStyle::default(),
        )));
        let id = item.id;
        scene.push(Command::AddItem {
            items: vec![ItemSnapshot::new(item)],
        });
        scene.set_tool(Tool::Sculpt);
        (scene, id)
    }

    fn path_points(scene: &Scene, id: ItemId) -> Vec<Point> {
        match &scene.document().get(id).unwrap().kind {
            ItemKind::Path(p) => p.path.points(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn drag_displaces_near_points_more_than_far_ones() {
        let points: Vec<Point> = (0..5).map(|i| Point::new(i as f32 * 50.0, 0.0)).collect();
        let (mut scene, id) = scene_with_line(&points);
        scene.settings.set_sculpt_radius(60.0);

        scene.pointer_down(PointerEvent::at(Point::ZERO));
        scene.pointer_move(PointerEvent::at(Point::new(0.0, 30.0)));
        scene.pointer_up(PointerEvent::at(Point::new(0.0, 30.0)));

        let moved = path_points(&scene, id);
        // Point under the cursor takes the full displacement.
        assert_eq!(moved[0], Point::new(0.0, 30.0));
        // Next point sits at d=50 of radius 60 and moves a sixth as far.
        assert!((moved[1].y - 5.0).abs() < 1e-4);
        // Points outside the radius stay put.
        assert_eq!(moved[2], points[2]);

        scene.undo();
        assert_eq!(path_points(&scene, id), points);
    }

    #[test]
    fn press_far_from_any_path_is_a_no_op() {
        let points = [Point::ZERO, Point::new(10.0, 0.0)];
        let (mut scene, _) = scene_with_line(&points);
        scene.settings.set_sculpt_radius(10.0);
        let count = scene.stack.undo_count();

        scene.pointer_down(PointerEvent::at(Point::new(500.0, 500.0)));
        scene.pointer_move(PointerEvent::at(Point::new(510.0, 510.0)));
        scene.pointer_up(PointerEvent::at(Point::new(510.0, 510.0)));

        assert_eq!(scene.stack.undo_count(), count);
    }

    #[test]
    fn sculpt_leaves_smoothed_flag_alone() {
        let points: Vec<Point> = (0..6).map(|i| Point::new(i as f32 * 20.0, 0.0)).collect();
        let (mut scene, id) = scene_with_line(&points);
        if let ItemKind::Path(p) = &mut scene.document.get_mut(id).unwrap().kind {
            p.smoothed = true;
        }

        scene.pointer_down(PointerEvent::at(Point::ZERO));
        scene.pointer_move(PointerEvent::at(Point::new(0.0, 15.0)));
        scene.pointer_up(PointerEvent::at(Point::new(0.0, 15.0)));

        match &scene.document().get(id).unwrap().kind {
            ItemKind::Path(p) => assert!(p.smoothed),
            _ => unreachable!(),
        }
    }
}
