//! Pointer-event boundary.
//!
//! Gesture capture and dispatch live in the embedding application; what
//! arrives here are discrete down/move/up events with a device identifier
//! and a 2D position. The engine's share of the work is bounds hit-testing
//! and the per-node click notification.

use crate::scene::{rect_contains, SceneGraph};
use crate::types::NodeId;
use skia_safe::Point;
use std::collections::HashMap;
use tracing::debug;

/// Routes discrete pointer events into the scene, tracking which node each
/// active pointer went down on.
#[derive(Debug, Default)]
pub struct TouchRouter {
    captures: HashMap<i64, NodeId>,
}

impl TouchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer `id` went down at `(x, y)`; captures the topmost visible
    /// node under it.
    pub fn pointer_down(&mut self, scene: &mut SceneGraph, root: NodeId, id: i64, x: f32, y: f32) {
        if let Some(hit) = scene.hit_test(root, Point::new(x, y)) {
            debug!(pointer = id, node = hit, "pointer captured");
            self.captures.insert(id, hit);
        }
    }

    /// Pointer `id` moved. Movement does not transfer capture; drag
    /// semantics are the collaborator's concern.
    pub fn pointer_move(&mut self, _scene: &mut SceneGraph, _root: NodeId, _id: i64, _x: f32, _y: f32) {
    }

    /// Pointer `id` lifted; fires the captured node's click listeners when
    /// the release still lands inside that node's bounds.
    pub fn pointer_up(&mut self, scene: &mut SceneGraph, _root: NodeId, id: i64, x: f32, y: f32) {
        let Some(captured) = self.captures.remove(&id) else {
            return;
        };
        let point = Point::new(x, y);
        let inside = scene
            .node_bounds(captured)
            .is_some_and(|b| rect_contains(&b, point));
        if inside {
            scene.fire_click(captured, point);
        }
    }

    /// Number of pointers currently held down.
    pub fn active_pointers(&self) -> usize {
        self.captures.len()
    }
}
