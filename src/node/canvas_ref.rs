use crate::element::Element;
use crate::errors::RenderError;
use crate::renderer::{self, draw_target_image, ensure_raster_target, RenderContext, TargetOrigin};
use crate::scene::{SceneGraph, SceneNode};
use crate::types::{align_rect, scale_mode_rect, HAlign, NodeId, ScaleMode, VAlign};
use serde_json::json;
use skia_safe::{Canvas, Paint, Point, Rect, Size, Surface};
use std::any::Any;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

// --- Canvas Ref Node ---
/// A node that draws another canvas's composited output at its own position
/// and size, without owning or mutating the source.
///
/// The source subtree is re-rendered into a private target whose dimensions
/// follow the source size and the scale mode: `Fit` keeps the full source,
/// `Fill` crops it to this node's aspect ratio. The target is then drawn
/// fitted and aligned into the node's bounds. Several refs may point at the
/// same canvas within a frame.
pub struct CanvasRefNode {
    canvas: NodeId,
    scale_mode: ScaleMode,
    h_align: HAlign,
    v_align: VAlign,
    target: Mutex<Option<Surface>>,
    /// Offset applied while re-rendering the source so a fill crop stays
    /// centered on it.
    draw_offset: Mutex<Point>,
}

impl CanvasRefNode {
    pub fn new(canvas: NodeId) -> Self {
        Self {
            canvas,
            scale_mode: ScaleMode::Fit,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            target: Mutex::new(None),
            draw_offset: Mutex::new(Point::new(0.0, 0.0)),
        }
    }

    /// Creates a scene node re-presenting `canvas` at the given size.
    pub fn spawn(
        scene: &mut SceneGraph,
        canvas: NodeId,
        width: f32,
        height: f32,
        scale_mode: ScaleMode,
        h_align: HAlign,
        v_align: VAlign,
    ) -> NodeId {
        let mut element = Self::new(canvas);
        element.scale_mode = scale_mode;
        element.h_align = h_align;
        element.v_align = v_align;
        let mut node = SceneNode::with_element(Box::new(element));
        node.size = Size::new(width, height);
        scene.add_node(node)
    }

    /// Convenience downcast for a node known to carry a canvas ref.
    pub fn get_mut(scene: &mut SceneGraph, id: NodeId) -> Option<&mut CanvasRefNode> {
        scene
            .get_node_mut(id)?
            .element
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    pub fn source(&self) -> NodeId {
        self.canvas
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.scale_mode = mode;
    }

    pub fn set_alignment(&mut self, h: HAlign, v: VAlign) {
        self.h_align = h;
        self.v_align = v;
    }

    /// Recomputes the private target's dimensions and the source draw
    /// offset from the current inputs, reallocating only on a mismatch.
    /// Calling it again with unchanged inputs changes nothing.
    fn check_fbo(&self, slot: &mut Option<Surface>, src_w: f32, src_h: f32, own: Rect) -> bool {
        let (target_w, target_h, offset) = match self.scale_mode {
            ScaleMode::Fit => (src_w, src_h, Point::new(0.0, 0.0)),
            ScaleMode::Fill => {
                // The crop window: this node's bounds fitted inside the source.
                let crop = scale_mode_rect(
                    own.width(),
                    own.height(),
                    Rect::from_wh(src_w, src_h),
                    ScaleMode::Fit,
                );
                (
                    crop.width(),
                    crop.height(),
                    Point::new(-crop.left, -crop.top),
                )
            }
        };
        *self.draw_offset.lock().unwrap() = offset;
        ensure_raster_target(slot, target_w.round() as i32, target_h.round() as i32).is_some()
    }
}

impl fmt::Debug for CanvasRefNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasRefNode")
            .field("canvas", &self.canvas)
            .field("scale_mode", &self.scale_mode)
            .field("h_align", &self.h_align)
            .field("v_align", &self.v_align)
            .finish()
    }
}

impl Element for CanvasRefNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "CanvasRef"
    }

    fn render(
        &self,
        scene: &SceneGraph,
        ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        let Some(source) = scene.get_node(self.canvas) else {
            warn!(canvas = self.canvas, "canvas ref points at a missing node");
            return draw_children(canvas);
        };
        let (src_w, src_h) = (source.size.width, source.size.height);
        if src_w <= 0.0 || src_h <= 0.0 {
            return draw_children(canvas);
        }

        let mut slot = self.target.lock().unwrap();
        if !self.check_fbo(&mut slot, src_w, src_h, rect) {
            warn!("ref target unavailable, skipping draw");
            return draw_children(canvas);
        }
        let target = slot.as_mut().unwrap();
        let target_h = target.height() as f32;

        let offset = *self.draw_offset.lock().unwrap();
        let c = target.canvas();
        c.save();
        if ctx.offscreen_origin == TargetOrigin::BottomLeft {
            c.translate((0.0, target_h));
            c.scale((1.0, -1.0));
        }
        c.clear(skia_safe::Color::TRANSPARENT);
        c.translate((offset.x, offset.y));
        let result = renderer::render_node_content(scene, ctx, self.canvas, c);
        c.restore();
        result?;

        // The target's aspect already matches the chosen mode, so a plain
        // fit fills the bounds exactly for Fill and letterboxes for Fit.
        let image = target.image_snapshot();
        let fitted = scale_mode_rect(
            image.width() as f32,
            image.height() as f32,
            rect,
            ScaleMode::Fit,
        );
        let dst = align_rect(fitted, rect, self.h_align, self.v_align);
        let mut paint = Paint::default();
        paint.set_anti_alias(true);
        draw_target_image(canvas, ctx, &image, dst, &paint);

        draw_children(canvas)
    }

    fn export_fields(&self, out: &mut serde_json::Map<String, serde_json::Value>) {
        out.insert("sourceCanvas".into(), json!(self.canvas));
        out.insert("scaleMode".into(), json!(self.scale_mode));
    }
}
