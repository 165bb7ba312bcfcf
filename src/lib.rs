//! # Canvas Engine
//!
//! A retained-mode scene graph with a Photoshop-style layer-compositing
//! subsystem, rendered with Skia.
//!
//! Nodes live in an arena ([`SceneGraph`]) and are addressed by stable
//! [`NodeId`] handles. A node on its own is pure hierarchy; attaching an
//! [`Element`] gives it a draw-phase capability. The compositing elements
//! redirect their subtree into off-screen render targets:
//!
//! - [`LayerNode`] applies opacity, an optional alpha mask and a blend mode
//!   to its entire subtree as one unit.
//! - [`CanvasNode`] stacks named layers like a multi-layer document and
//!   hard-clips them through its [`ContainerNode`].
//! - [`CanvasRefNode`] re-presents an existing canvas at a different size
//!   without touching the source.
//!
//! The owning application drives one `render_frame` per frame; traversal is
//! single-threaded and synchronous, and target redirection nests like a
//! stack.

pub mod element;
pub mod errors;
pub mod input;
pub mod node;
pub mod renderer;
pub mod scene;
pub mod types;

pub use element::Element;
pub use errors::RenderError;
pub use input::TouchRouter;
pub use node::{
    image_from_rgba_bytes, BoxNode, CanvasNode, CanvasRefNode, ContainerNode, ImageNode, LayerNode,
    LayerSettings,
};
pub use renderer::{render_frame, render_recursive, BlendScope, RenderContext, TargetOrigin};
pub use scene::{SceneGraph, SceneNode};
pub use types::{Color, HAlign, ListenerToken, NodeId, ScaleMode, VAlign};
