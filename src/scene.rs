use crate::element::Element;
use crate::types::{ListenerToken, NodeId};
use serde_json::{json, Map, Value};
use skia_safe::{Point, Rect, Size};

/// A single element of the retained scene tree.
///
/// `SceneNode` is the only node type in the graph; the behaviors that were
/// historically expressed as subclasses (layers, containers, canvas views)
/// are `Element` capabilities attached to it.
pub struct SceneNode {
    /// Identifier used by name lookups and the diagnostic export.
    pub name: String,
    /// Position relative to the parent's origin.
    pub position: Point,
    /// Rendered bounds of the node.
    pub size: Size,
    /// Rotation in degrees, applied about the node's origin.
    pub rotation: f32,
    /// Invisible nodes are skipped entirely during traversal.
    pub visible: bool,
    /// Indices of child nodes, in stacking order (later entries draw on top).
    pub children: Vec<NodeId>,
    /// Index of the parent node.
    pub parent: Option<NodeId>,
    /// Optional draw-phase capability.
    pub element: Option<Box<dyn Element>>,
}

impl SceneNode {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            position: Point::new(0.0, 0.0),
            size: Size::new(0.0, 0.0),
            rotation: 0.0,
            visible: true,
            children: Vec::new(),
            parent: None,
            element: None,
        }
    }

    pub fn with_element(element: Box<dyn Element>) -> Self {
        let mut node = Self::new();
        node.element = Some(element);
        node
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

type SizeCallback = Box<dyn FnMut(&mut SceneGraph, NodeId)>;
type ClickCallback = Box<dyn FnMut(&mut SceneGraph, NodeId, Point)>;

struct SizeListener {
    token: ListenerToken,
    node: NodeId,
    callback: SizeCallback,
}

struct ClickListener {
    token: ListenerToken,
    node: NodeId,
    callback: ClickCallback,
}

/// The scene graph data structure.
///
/// Manages the arena of nodes, their relationships, and the observer lists
/// for size-changed and click notifications. All inter-node references are
/// stable `NodeId` handles into the arena.
pub struct SceneGraph {
    /// The arena of all nodes. `None` slots belong to destroyed nodes.
    pub nodes: Vec<Option<SceneNode>>,
    /// Indices of nodes that have been removed and can be reused.
    pub free_indices: Vec<NodeId>,
    size_listeners: Vec<SizeListener>,
    click_listeners: Vec<ClickListener>,
    next_token: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_indices: Vec::new(),
            size_listeners: Vec::new(),
            click_listeners: Vec::new(),
            next_token: 0,
        }
    }

    /// Adds a node to the arena and returns its ID.
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        if let Some(id) = self.free_indices.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Recursively destroys a node and its children, freeing their indices
    /// for reuse and dropping any listeners subscribed to them.
    pub fn destroy_node(&mut self, id: NodeId) {
        if id >= self.nodes.len() || self.nodes[id].is_none() {
            return;
        }

        let (parent_id, children_ids) = {
            let node = self.nodes[id].as_ref().unwrap();
            (node.parent, node.children.clone())
        };

        if let Some(pid) = parent_id {
            self.remove_child(pid, id);
        }

        for child_id in children_ids {
            self.destroy_node(child_id);
        }

        self.nodes[id] = None;
        self.free_indices.push(id);
        self.size_listeners.retain(|l| l.node != id);
        self.click_listeners.retain(|l| l.node != id);
    }

    /// Establishes a parent-child relationship, appending at the top of the
    /// parent's stacking order.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p_node) = self.nodes.get_mut(parent).and_then(|n| n.as_mut()) {
            p_node.children.push(child);
        }
        if let Some(c_node) = self.nodes.get_mut(child).and_then(|n| n.as_mut()) {
            c_node.parent = Some(parent);
        }
    }

    /// Like [`add_child`](Self::add_child), but inserts at `index` in the
    /// parent's stacking order. Indices past the end append.
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(p_node) = self.nodes.get_mut(parent).and_then(|n| n.as_mut()) {
            let index = index.min(p_node.children.len());
            p_node.children.insert(index, child);
        }
        if let Some(c_node) = self.nodes.get_mut(child).and_then(|n| n.as_mut()) {
            c_node.parent = Some(parent);
        }
    }

    /// Detaches `child` from `parent`. The child node keeps existing in the
    /// arena; use [`destroy_node`](Self::destroy_node) to delete it.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p_node) = self.nodes.get_mut(parent).and_then(|n| n.as_mut()) {
            if let Some(pos) = p_node.children.iter().position(|&x| x == child) {
                p_node.children.remove(pos);
            }
        }
        if let Some(c_node) = self.nodes.get_mut(child).and_then(|n| n.as_mut()) {
            if c_node.parent == Some(parent) {
                c_node.parent = None;
            }
        }
    }

    /// Returns a mutable reference to the node.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    /// Returns a shared reference to the node.
    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    /// Mutates a node's size and synchronously notifies every size-changed
    /// listener subscribed to it before returning.
    pub fn set_node_size(&mut self, id: NodeId, width: f32, height: f32) {
        match self.get_node_mut(id) {
            Some(node) => node.size = Size::new(width, height),
            None => return,
        }
        self.dispatch_size_changed(id);
    }

    /// Subscribes to size changes of `node`.
    pub fn on_size_changed<F>(&mut self, node: NodeId, callback: F) -> ListenerToken
    where
        F: FnMut(&mut SceneGraph, NodeId) + 'static,
    {
        let token = self.make_token();
        self.size_listeners.push(SizeListener {
            token,
            node,
            callback: Box::new(callback),
        });
        token
    }

    /// Subscribes to click/tap notifications of `node` (fired by the touch
    /// router when a pointer goes down and up inside its bounds).
    pub fn on_click<F>(&mut self, node: NodeId, callback: F) -> ListenerToken
    where
        F: FnMut(&mut SceneGraph, NodeId, Point) + 'static,
    {
        let token = self.make_token();
        self.click_listeners.push(ClickListener {
            token,
            node,
            callback: Box::new(callback),
        });
        token
    }

    /// Drops the listener registered under `token`, if it still exists.
    pub fn remove_listener(&mut self, token: ListenerToken) {
        self.size_listeners.retain(|l| l.token != token);
        self.click_listeners.retain(|l| l.token != token);
    }

    fn make_token(&mut self) -> ListenerToken {
        let token = ListenerToken(self.next_token);
        self.next_token += 1;
        token
    }

    fn dispatch_size_changed(&mut self, id: NodeId) {
        // The listener list is detached during dispatch; listeners registered
        // or removed from inside a callback take effect on later events.
        let mut listeners = std::mem::take(&mut self.size_listeners);
        for l in listeners.iter_mut() {
            if l.node == id {
                (l.callback)(self, id);
            }
        }
        let added = std::mem::replace(&mut self.size_listeners, listeners);
        self.size_listeners.extend(added);
    }

    pub(crate) fn fire_click(&mut self, id: NodeId, at: Point) {
        let mut listeners = std::mem::take(&mut self.click_listeners);
        for l in listeners.iter_mut() {
            if l.node == id {
                (l.callback)(self, id, at);
            }
        }
        let added = std::mem::replace(&mut self.click_listeners, listeners);
        self.click_listeners.extend(added);
    }

    /// The node's origin in root coordinates (the sum of ancestor positions;
    /// rotation is ignored, bounds are axis-aligned by contract).
    pub fn global_position(&self, id: NodeId) -> Option<Point> {
        let mut node = self.get_node(id)?;
        let mut p = node.position;
        while let Some(pid) = node.parent {
            node = self.get_node(pid)?;
            p.x += node.position.x;
            p.y += node.position.y;
        }
        Some(p)
    }

    /// Depth-first name lookup in `root`'s subtree; first match wins.
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let node = self.get_node(root)?;
        if node.name == name {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_name(child, name))
    }

    /// The node's axis-aligned bounds in root coordinates.
    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        let node = self.get_node(id)?;
        let origin = self.global_position(id)?;
        Some(Rect::from_xywh(
            origin.x,
            origin.y,
            node.size.width,
            node.size.height,
        ))
    }

    /// Finds the topmost visible node under `point`, preferring the deepest
    /// match. Later siblings draw on top, so they are scanned first.
    pub fn hit_test(&self, root: NodeId, point: Point) -> Option<NodeId> {
        let node = self.get_node(root)?;
        if !node.visible {
            return None;
        }
        for &child in node.children.iter().rev() {
            if let Some(hit) = self.hit_test(child, point) {
                return Some(hit);
            }
        }
        let bounds = self.node_bounds(root)?;
        if rect_contains(&bounds, point) {
            Some(root)
        } else {
            None
        }
    }

    /// Serializes a node to a flat diagnostic record. Best effort and
    /// additive per element type; there is no deserialization counterpart.
    pub fn node_json(&self, id: NodeId) -> Option<Value> {
        let node = self.get_node(id)?;
        let mut out = Map::new();
        out.insert(
            "nodeType".into(),
            json!(node.element.as_ref().map_or("Node", |e| e.type_name())),
        );
        out.insert("name".into(), json!(node.name));
        out.insert("width".into(), json!(node.size.width));
        out.insert("height".into(), json!(node.size.height));
        out.insert("x".into(), json!(node.position.x));
        out.insert("y".into(), json!(node.position.y));
        out.insert("visible".into(), json!(node.visible));
        if let Some(element) = &node.element {
            element.export_fields(&mut out);
        }
        Some(Value::Object(out))
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn rect_contains(r: &Rect, p: Point) -> bool {
    p.x >= r.left && p.x < r.right && p.y >= r.top && p.y < r.bottom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_ids_are_recycled() {
        let mut scene = SceneGraph::new();
        let a = scene.add_node(SceneNode::new());
        let b = scene.add_node(SceneNode::new());
        scene.add_child(a, b);

        scene.destroy_node(b);
        assert!(scene.get_node(b).is_none());
        assert!(scene.get_node(a).unwrap().children.is_empty());

        let c = scene.add_node(SceneNode::new());
        assert_eq!(c, b);
    }

    #[test]
    fn size_event_fires_synchronously() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut scene = SceneGraph::new();
        let n = scene.add_node(SceneNode::new());
        let fired = Rc::new(Cell::new(0));
        let observed = fired.clone();
        scene.on_size_changed(n, move |scene, id| {
            assert_eq!(scene.get_node(id).unwrap().size.width, 64.0);
            observed.set(observed.get() + 1);
        });

        scene.set_node_size(n, 64.0, 32.0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn removed_listener_stops_firing() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut scene = SceneGraph::new();
        let n = scene.add_node(SceneNode::new());
        let fired = Rc::new(Cell::new(0));
        let observed = fired.clone();
        let token = scene.on_size_changed(n, move |_, _| observed.set(observed.get() + 1));

        scene.set_node_size(n, 10.0, 10.0);
        scene.remove_listener(token);
        scene.set_node_size(n, 20.0, 20.0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn find_by_name_walks_depth_first() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(SceneNode::new());
        let mut child = SceneNode::new();
        child.name = "panel".into();
        let child = scene.add_node(child);
        let mut leaf = SceneNode::new();
        leaf.name = "button".into();
        let leaf = scene.add_node(leaf);
        scene.add_child(root, child);
        scene.add_child(child, leaf);

        assert_eq!(scene.find_by_name(root, "button"), Some(leaf));
        assert_eq!(scene.find_by_name(root, "missing"), None);
    }

    #[test]
    fn global_position_sums_ancestors() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(SceneNode::new());
        let mut child = SceneNode::new();
        child.position = Point::new(10.0, 20.0);
        let child = scene.add_node(child);
        let mut leaf = SceneNode::new();
        leaf.position = Point::new(5.0, 5.0);
        let leaf = scene.add_node(leaf);
        scene.add_child(root, child);
        scene.add_child(child, leaf);

        assert_eq!(scene.global_position(leaf), Some(Point::new(15.0, 25.0)));
    }
}
