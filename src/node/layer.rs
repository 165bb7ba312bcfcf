//! Photoshop-like layer that renders its subtree with masking options and
//! blend modes.
//!
//! A layer turns opacity and masking into whole-subtree operations: the
//! children are composited into an off-screen target first, the mask (if
//! any) replaces the composite's alpha with its own red channel, and only
//! the finished image is blended into the parent target.

use crate::element::Element;
use crate::errors::RenderError;
use crate::renderer::{draw_target_image, ensure_raster_target, BlendScope, RenderContext};
use crate::scene::{SceneGraph, SceneNode};
use crate::types::NodeId;
use serde_json::json;
use skia_safe::{
    runtime_effect::ChildPtr, BlendMode, Canvas, Data, Image, Paint, Rect, RuntimeEffect,
    SamplingOptions, Size, Surface,
};
use std::any::Any;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

/// Alpha-replacement shader: the subtree's color with the mask's red channel
/// as coverage. Both textures are sampled at matching pixel coordinates.
/// Surfaces carry premultiplied alpha, so the math runs in straight alpha
/// and premultiplies again on the way out.
const MASK_SKSL: &str = r#"
    uniform shader content;
    uniform shader mask_tex;

    half4 main(float2 p) {
        half4 c = content.eval(p);
        half4 m = mask_tex.eval(p);
        half3 rgb = c.a > 0.0 ? c.rgb / c.a : half3(0.0);
        half coverage = m.a > 0.0 ? m.r / m.a : m.r;
        return half4(rgb * coverage, coverage);
    }
"#;

/// Configuration copied into a [`LayerNode`] at creation time; mutating the
/// settings object afterwards has no effect on the layer.
#[derive(Debug, Clone)]
pub struct LayerSettings {
    pub width: f32,
    pub height: f32,
    pub name: String,
    pub opacity: f32,
    pub mask: Option<Image>,
    /// Diagnostic provenance string for the mask; never used for loading.
    pub mask_path: String,
    pub blend_mode: BlendMode,
}

impl LayerSettings {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            name: String::new(),
            opacity: 1.0,
            mask: None,
            mask_path: String::new(),
            blend_mode: BlendMode::SrcOver,
        }
    }
}

/// Compositing unit applying opacity, an optional alpha mask and a blend
/// mode to an entire subtree.
pub struct LayerNode {
    opacity: f32,
    blend_mode: BlendMode,
    mask: Option<Image>,
    mask_path: String,
    /// Holds the subtree rendered for masking (the masked intermediate).
    subtree_target: Mutex<Option<Surface>>,
    /// Holds the mask-weighted composite that gets blended into the parent.
    composite_target: Mutex<Option<Surface>>,
    mask_effect: Mutex<Option<RuntimeEffect>>,
}

impl LayerNode {
    pub fn new(settings: LayerSettings) -> Self {
        Self {
            opacity: settings.opacity.clamp(0.0, 1.0),
            blend_mode: settings.blend_mode,
            mask: settings.mask,
            mask_path: settings.mask_path,
            subtree_target: Mutex::new(None),
            composite_target: Mutex::new(None),
            mask_effect: Mutex::new(None),
        }
    }

    /// Creates a scene node carrying a fresh layer; the node's name and size
    /// come from the settings.
    pub fn spawn(scene: &mut SceneGraph, settings: LayerSettings) -> NodeId {
        let mut node = SceneNode::new();
        node.name = settings.name.clone();
        node.size = Size::new(settings.width, settings.height);
        node.element = Some(Box::new(Self::new(settings)));
        scene.add_node(node)
    }

    /// Convenience downcast for a node known to carry a layer element.
    pub fn get(scene: &SceneGraph, id: NodeId) -> Option<&LayerNode> {
        scene.get_node(id)?.element.as_deref()?.as_any().downcast_ref()
    }

    /// Mutable counterpart of [`get`](Self::get).
    pub fn get_mut(scene: &mut SceneGraph, id: NodeId) -> Option<&mut LayerNode> {
        scene
            .get_node_mut(id)?
            .element
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn mask(&self) -> Option<&Image> {
        self.mask.as_ref()
    }

    pub fn set_mask(&mut self, mask: Option<Image>) {
        self.mask = mask;
    }

    /// Current dimensions of the composite target, if it has been allocated.
    /// Targets allocate lazily on the first composited draw.
    pub fn target_dimensions(&self) -> Option<(i32, i32)> {
        let slot = self.composite_target.lock().unwrap();
        slot.as_ref().map(|s| (s.width(), s.height()))
    }

    /// Runs the two-texture alpha-replacement pass: samples the subtree and
    /// mask at matching coordinates and writes the result into `composite`.
    /// Returns false when the shader pipeline is unavailable.
    fn composite_mask(
        &self,
        subtree: &mut Surface,
        mask: &Image,
        composite: &mut Surface,
        rect: Rect,
    ) -> bool {
        let mut effect_slot = self.mask_effect.lock().unwrap();
        if effect_slot.is_none() {
            match RuntimeEffect::make_for_shader(MASK_SKSL, None) {
                Ok(effect) => *effect_slot = Some(effect),
                Err(e) => {
                    warn!("mask shader compilation failed: {e}");
                    return false;
                }
            }
        }
        let effect = effect_slot.as_ref().unwrap();

        let content = subtree.image_snapshot();
        let Some(content_shader) = content.to_shader(None, SamplingOptions::default(), None) else {
            return false;
        };
        let Some(mask_shader) = mask.to_shader(None, SamplingOptions::default(), None) else {
            return false;
        };

        let children = [ChildPtr::Shader(content_shader), ChildPtr::Shader(mask_shader)];
        // No uniforms, the effect only samples its two children.
        let Some(shader) = effect.make_shader(Data::new_copy(&[]), &children, None) else {
            return false;
        };

        let mut paint = Paint::default();
        paint.set_shader(shader);
        // The mask decides coverage outright, including zero.
        paint.set_blend_mode(BlendMode::Src);
        composite
            .canvas()
            .draw_rect(Rect::from_wh(rect.width(), rect.height()), &paint);
        true
    }
}

impl fmt::Debug for LayerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerNode")
            .field("opacity", &self.opacity)
            .field("blend_mode", &self.blend_mode)
            .field("has_mask", &self.mask.is_some())
            .field("mask_path", &self.mask_path)
            .finish()
    }
}

impl Element for LayerNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Layer"
    }

    fn render(
        &self,
        _scene: &SceneGraph,
        ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        // Fast path: nothing to composite, the subtree draws straight into
        // the parent target. A non-standard blend mode still gets an
        // isolation scope, but no off-screen target is allocated.
        if self.mask.is_none() && self.opacity == 1.0 {
            if self.blend_mode == BlendMode::SrcOver {
                return draw_children(canvas);
            }
            let _scope = BlendScope::new(canvas, self.blend_mode);
            return draw_children(canvas);
        }

        let width = rect.width().round() as i32;
        let height = rect.height().round() as i32;

        let mut composite_slot = self.composite_target.lock().unwrap();
        let Some(composite) = ensure_raster_target(&mut composite_slot, width, height) else {
            warn!("layer target unavailable, drawing subtree directly");
            return draw_children(canvas);
        };

        let mut masked = false;
        if let Some(mask) = self.mask.as_ref() {
            let mut subtree_slot = self.subtree_target.lock().unwrap();
            match ensure_raster_target(&mut subtree_slot, width, height) {
                Some(subtree) => {
                    subtree.canvas().clear(skia_safe::Color::TRANSPARENT);
                    draw_children(subtree.canvas())?;

                    composite.canvas().clear(skia_safe::Color::TRANSPARENT);
                    // On shader failure the subtree re-renders unmasked below.
                    masked = self.composite_mask(subtree, mask, composite, rect);
                }
                None => warn!("mask target unavailable, masking skipped"),
            }
        }

        if !masked {
            composite.canvas().clear(skia_safe::Color::TRANSPARENT);
            draw_children(composite.canvas())?;
        }

        // Opacity attenuates the whole composited subtree uniformly through
        // the draw tint; the blend mode rides the same paint, scoped to this
        // single draw call.
        let image = composite.image_snapshot();
        let mut paint = Paint::default();
        paint.set_alpha_f(self.opacity);
        paint.set_blend_mode(self.blend_mode);
        draw_target_image(
            canvas,
            ctx,
            &image,
            Rect::from_wh(rect.width(), rect.height()),
            &paint,
        );
        Ok(())
    }

    fn export_fields(&self, out: &mut serde_json::Map<String, serde_json::Value>) {
        out.insert("opacity".into(), json!(self.opacity));
        out.insert("maskPath".into(), json!(self.mask_path));
    }
}
