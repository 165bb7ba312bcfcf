#![allow(dead_code)]

use canvas_engine::{BoxNode, Color, NodeId, SceneGraph, SceneNode};
use skia_safe::{AlphaType, ColorSpace, ColorType, ImageInfo, Point, Size, Surface};

/// Max channel difference (0-255) to consider "equal". Allows small
/// rendering noises from premultiplied rounding.
pub const TOLERANCE: u8 = 3;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

pub fn make_surface(width: i32, height: i32) -> Surface {
    let info = ImageInfo::new(
        (width, height),
        ColorType::RGBA8888,
        AlphaType::Premul,
        Some(ColorSpace::new_srgb()),
    );
    skia_safe::surfaces::raster(&info, None, None).expect("Failed to create Skia surface")
}

/// Reads one pixel back in straight (unpremultiplied) alpha.
pub fn pixel_at(surface: &mut Surface, x: i32, y: i32) -> [u8; 4] {
    let info = ImageInfo::new((1, 1), ColorType::RGBA8888, AlphaType::Unpremul, None);
    let mut buf = [0u8; 4];
    assert!(surface.read_pixels(&info, &mut buf, 4, (x, y)));
    buf
}

/// Reads the whole surface back in straight alpha.
pub fn snapshot_bytes(surface: &mut Surface) -> Vec<u8> {
    let (w, h) = (surface.width(), surface.height());
    let info = ImageInfo::new((w, h), ColorType::RGBA8888, AlphaType::Unpremul, None);
    let mut buf = vec![0u8; (w * h * 4) as usize];
    assert!(surface.read_pixels(&info, &mut buf, (w * 4) as usize, (0, 0)));
    buf
}

pub fn assert_pixel_near(actual: [u8; 4], expected: [u8; 4], label: &str) {
    for i in 0..4 {
        assert!(
            actual[i].abs_diff(expected[i]) <= TOLERANCE,
            "{label}: channel {i} differs, got {actual:?}, expected {expected:?}"
        );
    }
}

pub fn plain_node(scene: &mut SceneGraph, width: f32, height: f32) -> NodeId {
    let mut node = SceneNode::new();
    node.size = Size::new(width, height);
    scene.add_node(node)
}

pub fn box_node(
    scene: &mut SceneGraph,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Color,
) -> NodeId {
    let mut node = SceneNode::with_element(Box::new(BoxNode::new(color)));
    node.position = Point::new(x, y);
    node.size = Size::new(width, height);
    scene.add_node(node)
}

/// Builds an opaque mask buffer whose red channel is produced per pixel.
pub fn mask_bytes(width: usize, height: usize, red: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    let mut bytes = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 4;
            bytes[i] = red(x, y);
            bytes[i + 3] = 255;
        }
    }
    bytes
}
