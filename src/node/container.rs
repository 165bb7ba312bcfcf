use crate::element::Element;
use crate::errors::RenderError;
use crate::renderer::{draw_target_image, ensure_raster_target, RenderContext};
use crate::scene::SceneGraph;
use skia_safe::{Canvas, Paint, Rect, Surface};
use std::any::Any;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

// --- Layer Container ---
/// Container that hosts a canvas's layers and can hard-clip every
/// descendant pixel to its own rectangle.
///
/// With border masking enabled the subtree renders through an intermediate
/// target sized to the container, so anything drawn outside the target's
/// extents is discarded. Disabled, both hooks vanish and children draw
/// straight into the active target.
pub struct ContainerNode {
    mask_border_elements: bool,
    border_target: Mutex<Option<Surface>>,
}

impl ContainerNode {
    pub fn new(mask_border_elements: bool) -> Self {
        Self {
            mask_border_elements,
            border_target: Mutex::new(None),
        }
    }

    /// Returns mask status of border elements.
    pub fn mask_border_elements(&self) -> bool {
        self.mask_border_elements
    }

    /// Enable/disable masking of elements outside of the node border.
    pub fn set_mask_border_elements(&mut self, on: bool) {
        self.mask_border_elements = on;
    }
}

impl fmt::Debug for ContainerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerNode")
            .field("mask_border_elements", &self.mask_border_elements)
            .finish()
    }
}

impl Element for ContainerNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "LayerContainer"
    }

    fn render(
        &self,
        _scene: &SceneGraph,
        ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        if !self.mask_border_elements {
            return draw_children(canvas);
        }

        let width = rect.width().round() as i32;
        let height = rect.height().round() as i32;

        let mut slot = self.border_target.lock().unwrap();
        let Some(target) = ensure_raster_target(&mut slot, width, height) else {
            warn!("border target unavailable, drawing subtree unclipped");
            return draw_children(canvas);
        };

        target.canvas().clear(skia_safe::Color::TRANSPARENT);
        draw_children(target.canvas())?;

        let image = target.image_snapshot();
        draw_target_image(
            canvas,
            ctx,
            &image,
            Rect::from_wh(rect.width(), rect.height()),
            &Paint::default(),
        );
        Ok(())
    }
}
