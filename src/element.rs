use crate::errors::RenderError;
use crate::renderer::RenderContext;
use crate::scene::SceneGraph;
use skia_safe::{Canvas, Rect};
use std::any::Any;

/// The draw-phase capability attached to a scene node.
///
/// A plain node draws nothing of its own and simply recurses into its
/// children. Attaching an `Element` lets a node paint leaf content (boxes,
/// images) or take over the whole subtree pass, as layers and containers do
/// when they redirect drawing into an off-screen target.
pub trait Element: std::fmt::Debug {
    /// Returns self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Returns mutable self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Type tag used by the diagnostic export.
    fn type_name(&self) -> &'static str;

    /// Renders the element.
    ///
    /// # Arguments
    /// * `scene` - The graph, for elements that re-present other subtrees.
    /// * `ctx` - Ambient render state (off-screen target orientation, depth).
    /// * `canvas` - The Skia canvas to draw on, already translated to the
    ///   node's origin.
    /// * `rect` - The node's local bounds (origin at 0,0).
    /// * `draw_children` - A closure to trigger rendering of children nodes.
    ///   An element that never calls it suppresses its subtree; an element
    ///   may call it against a different canvas to redirect the subtree into
    ///   an off-screen target.
    fn render(
        &self,
        scene: &SceneGraph,
        ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError>;

    /// Appends element-specific fields to the diagnostic export record.
    fn export_fields(&self, _out: &mut serde_json::Map<String, serde_json::Value>) {}
}
