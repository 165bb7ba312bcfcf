use crate::element::Element;
use crate::errors::RenderError;
use crate::renderer::RenderContext;
use crate::scene::SceneGraph;
use crate::types::Color;
use serde_json::json;
use skia_safe::{Canvas, Paint, Rect};
use std::any::Any;

// --- Box Node ---
/// A solid-color rectangle filling the node's bounds.
#[derive(Debug, Clone)]
pub struct BoxNode {
    pub color: Color,
}

impl BoxNode {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Element for BoxNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Box"
    }

    fn render(
        &self,
        _scene: &SceneGraph,
        _ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        let mut paint = Paint::default();
        paint.set_anti_alias(true);
        paint.set_color4f(self.color.to_color4f(), None);
        canvas.draw_rect(rect, &paint);
        draw_children(canvas)
    }

    fn export_fields(&self, out: &mut serde_json::Map<String, serde_json::Value>) {
        out.insert(
            "color".into(),
            json!([self.color.r, self.color.g, self.color.b, self.color.a]),
        );
    }
}
