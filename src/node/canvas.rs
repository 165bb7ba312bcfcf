//! Canvas working with layers and blend modes like in Photoshop.
//!
//! The canvas owns the ordered layer stack and keeps it in lockstep with
//! its hosting container's child order. The stack operations live on
//! [`SceneGraph`] because every one of them touches the arena; the
//! `CanvasNode` element itself only gates rendering on setup.

use crate::element::Element;
use crate::errors::RenderError;
use crate::node::ContainerNode;
use crate::renderer::{self, RenderContext, TargetOrigin};
use crate::scene::{SceneGraph, SceneNode};
use crate::types::{scale_mode_rect, NodeId, ScaleMode};
use skia_safe::{Canvas, Rect, Size, Surface};
use std::any::Any;
use tracing::{error, warn};

/// Document-level compositor: an ordered stack of named layers rendered
/// inside one border-masking container.
#[derive(Debug)]
pub struct CanvasNode {
    container: Option<NodeId>,
    layers: Vec<NodeId>,
}

impl CanvasNode {
    pub fn new() -> Self {
        Self {
            container: None,
            layers: Vec::new(),
        }
    }

    /// Creates a scene node carrying a fresh, not-yet-set-up canvas.
    pub fn spawn(scene: &mut SceneGraph, name: &str) -> NodeId {
        let mut node = SceneNode::with_element(Box::new(Self::new()));
        node.name = name.to_string();
        scene.add_node(node)
    }

    /// A canvas is ready once `canvas_setup` gave it a container.
    pub fn is_ready(&self) -> bool {
        self.container.is_some()
    }

    /// The hosting container node, if set up.
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// The layer stack, bottom to top.
    pub fn layers(&self) -> &[NodeId] {
        &self.layers
    }

    fn get(scene: &SceneGraph, id: NodeId) -> Option<&CanvasNode> {
        scene.get_node(id)?.element.as_deref()?.as_any().downcast_ref()
    }

    fn get_mut(scene: &mut SceneGraph, id: NodeId) -> Option<&mut CanvasNode> {
        scene
            .get_node_mut(id)?
            .element
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut()
    }
}

impl Default for CanvasNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for CanvasNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Canvas"
    }

    fn render(
        &self,
        _scene: &SceneGraph,
        _ctx: &RenderContext,
        canvas: &Canvas,
        _rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        if !self.is_ready() {
            error!("canvas drawn before setup, call canvas_setup first");
            return Ok(());
        }
        draw_children(canvas)
    }
}

impl SceneGraph {
    /// Sets up `canvas` with dimensions and its hosting container. Must be
    /// called before the canvas renders; resizing the canvas afterwards
    /// resizes the container and every layer automatically.
    pub fn canvas_setup(
        &mut self,
        canvas: NodeId,
        width: f32,
        height: f32,
        mask_border_elements: bool,
    ) {
        match CanvasNode::get(self, canvas) {
            Some(state) if state.is_ready() => {
                warn!(canvas, "canvas_setup called twice, ignoring");
                return;
            }
            Some(_) => {}
            None => {
                warn!(canvas, "canvas_setup on a node without a canvas element");
                return;
            }
        }

        if let Some(node) = self.get_node_mut(canvas) {
            node.size = Size::new(width, height);
        }

        let mut container_node = SceneNode::with_element(Box::new(ContainerNode::new(
            mask_border_elements,
        )));
        container_node.name = "container".into();
        container_node.size = Size::new(width, height);
        let container = self.add_node(container_node);
        self.add_child(canvas, container);

        if let Some(state) = CanvasNode::get_mut(self, canvas) {
            state.container = Some(container);
        }

        self.on_size_changed(canvas, |scene, id| {
            scene.canvas_sync_size(id);
        });
    }

    /// Propagates the canvas dimensions to its container and every layer in
    /// the stack; all of them share the canvas's dimensions.
    pub(crate) fn canvas_sync_size(&mut self, canvas: NodeId) {
        let Some(node) = self.get_node(canvas) else {
            return;
        };
        let (width, height) = (node.size.width, node.size.height);
        let Some(state) = CanvasNode::get(self, canvas) else {
            return;
        };
        let container = state.container;
        let layers = state.layers.clone();

        if let Some(container) = container {
            self.set_node_size(container, width, height);
        }
        for layer in layers {
            self.set_node_size(layer, width, height);
        }
    }

    /// Inserts `layer` into the canvas stack and the container's child
    /// order at the same position. An `insert_at` outside `[0, len)`,
    /// including the `-1` default, appends at the top.
    pub fn canvas_add_layer(&mut self, canvas: NodeId, layer: NodeId, insert_at: i32) {
        let Some(state) = CanvasNode::get(self, canvas) else {
            warn!(canvas, "add_layer on a node without a canvas element");
            return;
        };
        let Some(container) = state.container else {
            warn!(canvas, "add_layer before canvas_setup");
            return;
        };
        let len = state.layers.len();
        let index = if insert_at < 0 || insert_at as usize >= len {
            len
        } else {
            insert_at as usize
        };

        self.add_child_at(container, layer, index);
        if let Some(state) = CanvasNode::get_mut(self, canvas) {
            state.layers.insert(index, layer);
        }
    }

    /// Removes the first occurrence of `layer` from the stack and the
    /// container. The layer node itself keeps existing.
    pub fn canvas_remove_layer(&mut self, canvas: NodeId, layer: NodeId) {
        let Some(state) = CanvasNode::get(self, canvas) else {
            return;
        };
        let Some(index) = state.layers.iter().position(|&l| l == layer) else {
            return;
        };
        let container = state.container;
        if let Some(state) = CanvasNode::get_mut(self, canvas) {
            state.layers.remove(index);
        }
        if let Some(container) = container {
            self.remove_child(container, layer);
        }
    }

    /// Removes the first layer whose node name matches, bottom-most first.
    /// Duplicate names are allowed; the first match wins, same as
    /// [`canvas_get_layer`](Self::canvas_get_layer).
    pub fn canvas_remove_layer_named(&mut self, canvas: NodeId, name: &str) {
        if let Some(layer) = self.canvas_get_layer(canvas, name) {
            self.canvas_remove_layer(canvas, layer);
        }
    }

    /// Removes the layer at `index`; out-of-range indices are ignored.
    pub fn canvas_remove_layer_at(&mut self, canvas: NodeId, index: usize) {
        let Some(state) = CanvasNode::get(self, canvas) else {
            return;
        };
        let Some(&layer) = state.layers.get(index) else {
            return;
        };
        self.canvas_remove_layer(canvas, layer);
    }

    /// First-match lookup by layer name, bottom-most first. Returns `None`
    /// when no layer matches.
    pub fn canvas_get_layer(&self, canvas: NodeId, name: &str) -> Option<NodeId> {
        let state = CanvasNode::get(self, canvas)?;
        state
            .layers
            .iter()
            .copied()
            .find(|&l| self.get_node(l).is_some_and(|n| n.name == name))
    }

    /// The layer stack, bottom to top.
    pub fn canvas_layers(&self, canvas: NodeId) -> Vec<NodeId> {
        CanvasNode::get(self, canvas)
            .map(|s| s.layers.clone())
            .unwrap_or_default()
    }

    /// Renders the composited canvas into a freshly allocated off-screen
    /// target of the given size, scaled per `mode`. Independent of the
    /// canvas's own on-screen draw; this is how external code obtains the
    /// composited result as a reusable image.
    pub fn canvas_render_in_fbo(
        &self,
        ctx: &RenderContext,
        canvas: NodeId,
        dst_width: i32,
        dst_height: i32,
        mode: ScaleMode,
    ) -> Result<Surface, RenderError> {
        let mut surface =
            renderer::new_raster_target(dst_width, dst_height).ok_or(RenderError::SurfaceFailure)?;
        self.canvas_render_into(ctx, canvas, &mut surface, mode)?;
        Ok(surface)
    }

    /// Zero-argument form: snapshots at the canvas's own dimensions.
    pub fn canvas_snapshot(
        &self,
        ctx: &RenderContext,
        canvas: NodeId,
    ) -> Result<Surface, RenderError> {
        let node = self
            .get_node(canvas)
            .ok_or(RenderError::NodeNotFound(canvas))?;
        self.canvas_render_in_fbo(
            ctx,
            canvas,
            node.size.width.round() as i32,
            node.size.height.round() as i32,
            ScaleMode::Fit,
        )
    }

    /// Renders the composited canvas into a caller-supplied target, scaled
    /// per `mode` into the target's dimensions. The remaining area is
    /// cleared.
    pub fn canvas_render_into(
        &self,
        ctx: &RenderContext,
        canvas: NodeId,
        surface: &mut Surface,
        mode: ScaleMode,
    ) -> Result<(), RenderError> {
        let node = self
            .get_node(canvas)
            .ok_or(RenderError::NodeNotFound(canvas))?;
        let ready = CanvasNode::get(self, canvas).is_some_and(|s| s.is_ready());
        if !ready {
            error!("canvas snapshot before setup");
            return Err(RenderError::CanvasNotReady);
        }

        let (src_w, src_h) = (node.size.width, node.size.height);
        let dst_h = surface.height() as f32;
        let dst = Rect::from_wh(surface.width() as f32, dst_h);
        let scaled = scale_mode_rect(src_w, src_h, dst, mode);

        let c = surface.canvas();
        c.save();
        if ctx.offscreen_origin == TargetOrigin::BottomLeft {
            c.translate((0.0, dst_h));
            c.scale((1.0, -1.0));
        }
        c.clear(skia_safe::Color::TRANSPARENT);
        c.translate((scaled.left, scaled.top));
        if src_w > 0.0 && src_h > 0.0 {
            c.scale((scaled.width() / src_w, scaled.height() / src_h));
        }
        let result = renderer::render_node_content(self, ctx, canvas, c);
        c.restore();
        result
    }
}
