//! # Renderer System
//!
//! Handles visual output via Skia.
//!
//! ## Responsibilities
//! - **Scene Traversal**: Recursively paints nodes to a canvas
//!   (`render_recursive`).
//! - **Off-screen targets**: Lazy, size-checked allocation of the raster
//!   surfaces the compositing elements redirect into.
//! - **Blend isolation**: A scoped save-layer wrapper so a blend mode never
//!   leaks past the subtree it was applied to.

use crate::errors::RenderError;
use crate::scene::SceneGraph;
use crate::types::NodeId;
use skia_safe::{
    AlphaType, BlendMode, Canvas, ColorSpace, ColorType, Image, ImageInfo, Paint, Rect, Surface,
};
use tracing::warn;

/// Maximum traversal depth before a cycle is assumed.
const MAX_DEPTH: usize = 100;

/// Vertical orientation of off-screen render targets.
///
/// Raster targets match the screen orientation, but some GPU backends hand
/// out bottom-up targets. Every off-screen blit consults this so results
/// stay backend-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// Ambient state threaded through a render traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext {
    /// Orientation of off-screen targets on the active backend.
    pub offscreen_origin: TargetOrigin,
    depth: usize,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offscreen_origin(origin: TargetOrigin) -> Self {
        Self {
            offscreen_origin: origin,
            depth: 0,
        }
    }

    fn descend(&self) -> Result<Self, RenderError> {
        if self.depth >= MAX_DEPTH {
            return Err(RenderError::RecursionLimit);
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// Clears `canvas` and renders `root` with its whole subtree onto it.
pub fn render_frame(
    scene: &SceneGraph,
    ctx: &RenderContext,
    root: NodeId,
    canvas: &Canvas,
) -> Result<(), RenderError> {
    canvas.clear(skia_safe::Color::TRANSPARENT);
    render_recursive(scene, ctx, root, canvas)
}

/// Recursively renders a node and its children to the canvas.
///
/// Applies the node's position and rotation, then hands control to the
/// node's element (or straight to the children when there is none).
pub fn render_recursive(
    scene: &SceneGraph,
    ctx: &RenderContext,
    node_id: NodeId,
    canvas: &Canvas,
) -> Result<(), RenderError> {
    let ctx = ctx.descend()?;
    let Some(node) = scene.get_node(node_id) else {
        return Ok(());
    };
    if !node.visible {
        return Ok(());
    }

    canvas.save();
    canvas.translate((node.position.x, node.position.y));
    if node.rotation != 0.0 {
        canvas.rotate(node.rotation, None);
    }

    let result = render_node_content(scene, &ctx, node_id, canvas);
    canvas.restore();
    result
}

/// Renders a node's element and children without applying the node's own
/// position. Canvas snapshots and reference views use this to re-present a
/// subtree at a foreign origin.
pub(crate) fn render_node_content(
    scene: &SceneGraph,
    ctx: &RenderContext,
    node_id: NodeId,
    canvas: &Canvas,
) -> Result<(), RenderError> {
    let ctx = ctx.descend()?;
    let Some(node) = scene.get_node(node_id) else {
        return Ok(());
    };

    let local_rect = Rect::from_wh(node.size.width, node.size.height);
    let mut draw_children = |canvas: &Canvas| -> Result<(), RenderError> {
        // Children render strictly in their stored sequence order, so
        // stacking order equals draw order.
        for &child_id in &node.children {
            render_recursive(scene, &ctx, child_id, canvas)?;
        }
        Ok(())
    };

    match &node.element {
        Some(element) => element.render(scene, &ctx, canvas, local_rect, &mut draw_children),
        None => draw_children(canvas),
    }
}

/// Allocates a premultiplied RGBA raster target.
pub(crate) fn new_raster_target(width: i32, height: i32) -> Option<Surface> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let info = ImageInfo::new(
        (width, height),
        ColorType::RGBA8888,
        AlphaType::Premul,
        Some(ColorSpace::new_srgb()),
    );
    skia_safe::surfaces::raster(&info, None, None)
}

/// Returns a surface of exactly `width` x `height` from `slot`,
/// (re)allocating when the cached one is missing or its dimensions are
/// stale. Reallocation discards the previous target's contents
/// unconditionally; a second call with unchanged dimensions is a no-op.
pub(crate) fn ensure_raster_target(
    slot: &mut Option<Surface>,
    width: i32,
    height: i32,
) -> Option<&mut Surface> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let stale = match slot.as_ref() {
        Some(s) => s.width() != width || s.height() != height,
        None => true,
    };
    if stale {
        *slot = new_raster_target(width, height);
        if slot.is_none() {
            warn!(width, height, "failed to allocate off-screen target");
        }
    }
    slot.as_mut()
}

/// Draws an off-screen target's snapshot into `dst`, flipping vertically
/// when the backend stores off-screen images bottom-up.
pub(crate) fn draw_target_image(
    canvas: &Canvas,
    ctx: &RenderContext,
    image: &Image,
    dst: Rect,
    paint: &Paint,
) {
    match ctx.offscreen_origin {
        TargetOrigin::TopLeft => {
            canvas.draw_image_rect(image, None, dst, paint);
        }
        TargetOrigin::BottomLeft => {
            canvas.save();
            canvas.translate((0.0, dst.top + dst.bottom));
            canvas.scale((1.0, -1.0));
            canvas.draw_image_rect(image, None, dst, paint);
            canvas.restore();
        }
    }
}

/// Scoped blend-mode isolation.
///
/// Opens an isolated layer whose contents composite against the canvas with
/// `mode`; the layer is closed again when the scope drops, on every exit
/// path. Nested scopes restore independently, so an inner subtree's blend
/// mode cannot leak into the enclosing draw.
pub struct BlendScope<'a> {
    canvas: &'a Canvas,
}

impl<'a> BlendScope<'a> {
    pub fn new(canvas: &'a Canvas, mode: BlendMode) -> Self {
        let mut paint = Paint::default();
        paint.set_blend_mode(mode);
        canvas.save_layer(&skia_safe::canvas::SaveLayerRec::default().paint(&paint));
        Self { canvas }
    }
}

impl Drop for BlendScope<'_> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}
