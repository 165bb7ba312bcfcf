pub mod box_node;
pub use box_node::BoxNode;

pub mod image_node;
pub use image_node::{image_from_rgba_bytes, ImageNode};

pub mod layer;
pub use layer::{LayerNode, LayerSettings};

pub mod container;
pub use container::ContainerNode;

pub mod canvas;
pub use canvas::CanvasNode;

pub mod canvas_ref;
pub use canvas_ref::CanvasRefNode;
