use crate::element::Element;
use crate::errors::RenderError;
use crate::renderer::RenderContext;
use crate::scene::SceneGraph;
use skia_safe::{
    AlphaType, Canvas, ColorType, Data, FilterMode, Image, ImageInfo, MipmapMode, Paint, Rect,
    SamplingOptions,
};
use std::any::Any;

// --- Image Node ---
/// A node that renders an already-decoded raster image, stretched to the
/// node's bounds.
///
/// Decoding happens outside the engine; pixels arrive either as a ready
/// `skia_safe::Image` or as a tightly packed RGBA8888 buffer.
#[derive(Debug, Clone)]
pub struct ImageNode {
    pub image: Option<Image>,
}

impl ImageNode {
    pub fn new(image: Image) -> Self {
        Self { image: Some(image) }
    }

    /// Wraps a decoded RGBA8888 pixel buffer. Returns `None` when the buffer
    /// does not match `width * height * 4`.
    pub fn from_rgba_bytes(width: i32, height: i32, bytes: &[u8]) -> Option<Self> {
        image_from_rgba_bytes(width, height, bytes).map(Self::new)
    }
}

/// Uploads a decoded RGBA8888 buffer as a Skia image.
///
/// This is the whole image-resource boundary: content images and layer
/// masks both enter the engine through it.
pub fn image_from_rgba_bytes(width: i32, height: i32, bytes: &[u8]) -> Option<Image> {
    if width <= 0 || height <= 0 {
        return None;
    }
    if bytes.len() != width as usize * height as usize * 4 {
        return None;
    }
    let data = Data::new_copy(bytes);
    let info = ImageInfo::new((width, height), ColorType::RGBA8888, AlphaType::Unpremul, None);
    skia_safe::images::raster_from_data(&info, data, width as usize * 4)
}

impl Element for ImageNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "Image"
    }

    fn render(
        &self,
        _scene: &SceneGraph,
        _ctx: &RenderContext,
        canvas: &Canvas,
        rect: Rect,
        draw_children: &mut dyn FnMut(&Canvas) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        if let Some(img) = &self.image {
            let mut paint = Paint::default();
            paint.set_anti_alias(true);
            let sampling = SamplingOptions::new(FilterMode::Linear, MipmapMode::Linear);
            canvas.draw_image_rect_with_sampling_options(img, None, rect, sampling, &paint);
        }
        draw_children(canvas)
    }
}
