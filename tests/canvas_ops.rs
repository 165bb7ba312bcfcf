mod common;

use canvas_engine::{CanvasNode, LayerNode, LayerSettings, SceneGraph};
use common::*;

fn canvas_with_layers(names: &[&str]) -> (SceneGraph, usize, Vec<usize>) {
    let mut scene = SceneGraph::new();
    let canvas = CanvasNode::spawn(&mut scene, "canvas");
    scene.canvas_setup(canvas, 100.0, 100.0, true);

    let mut layers = Vec::new();
    for name in names {
        let mut settings = LayerSettings::new(100.0, 100.0);
        settings.name = (*name).to_string();
        let layer = LayerNode::spawn(&mut scene, settings);
        scene.canvas_add_layer(canvas, layer, -1);
        layers.push(layer);
    }
    (scene, canvas, layers)
}

fn container_children(scene: &SceneGraph, canvas: usize) -> Vec<usize> {
    let container = scene
        .canvas_layers(canvas)
        .first()
        .and_then(|&l| scene.get_node(l))
        .and_then(|n| n.parent);
    match container {
        Some(c) => scene.get_node(c).unwrap().children.clone(),
        None => Vec::new(),
    }
}

#[test]
fn stack_order_and_named_removal() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["a", "b", "c"]);

    assert_eq!(scene.canvas_layers(canvas), layers);
    assert_eq!(container_children(&scene, canvas), layers);

    scene.canvas_remove_layer_named(canvas, "b");
    assert_eq!(scene.canvas_layers(canvas), vec![layers[0], layers[2]]);
    assert_eq!(
        container_children(&scene, canvas),
        vec![layers[0], layers[2]]
    );

    // The removed layer node still exists, it is just detached.
    assert!(scene.get_node(layers[1]).is_some());
    assert_eq!(scene.get_node(layers[1]).unwrap().parent, None);
}

#[test]
fn insertion_index_places_layer_mid_stack() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["a", "b", "c"]);

    let mut settings = LayerSettings::new(100.0, 100.0);
    settings.name = "d".into();
    let d = LayerNode::spawn(&mut scene, settings);
    scene.canvas_add_layer(canvas, d, 1);
    assert_eq!(
        scene.canvas_layers(canvas),
        vec![layers[0], d, layers[1], layers[2]]
    );
    assert_eq!(
        container_children(&scene, canvas),
        vec![layers[0], d, layers[1], layers[2]]
    );

    let mut settings = LayerSettings::new(100.0, 100.0);
    settings.name = "e".into();
    let e = LayerNode::spawn(&mut scene, settings);
    scene.canvas_add_layer(canvas, e, -1);
    assert_eq!(*scene.canvas_layers(canvas).last().unwrap(), e);

    // An index past the end also appends.
    let f = LayerNode::spawn(&mut scene, LayerSettings::new(100.0, 100.0));
    scene.canvas_add_layer(canvas, f, 99);
    assert_eq!(*scene.canvas_layers(canvas).last().unwrap(), f);
}

#[test]
fn duplicate_names_resolve_to_first_match() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["dup", "x", "dup"]);

    assert_eq!(scene.canvas_get_layer(canvas, "dup"), Some(layers[0]));

    // Removal uses the same tie-break as lookup.
    scene.canvas_remove_layer_named(canvas, "dup");
    assert_eq!(scene.canvas_layers(canvas), vec![layers[1], layers[2]]);
    assert_eq!(scene.canvas_get_layer(canvas, "dup"), Some(layers[2]));
}

#[test]
fn lookup_miss_returns_none() {
    init_tracing();
    let (scene, canvas, _) = canvas_with_layers(&["a"]);
    assert_eq!(scene.canvas_get_layer(canvas, "missing"), None);
}

#[test]
fn remove_layer_at_ignores_out_of_range() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["a", "b"]);

    scene.canvas_remove_layer_at(canvas, 5);
    assert_eq!(scene.canvas_layers(canvas), layers);

    scene.canvas_remove_layer_at(canvas, 0);
    assert_eq!(scene.canvas_layers(canvas), vec![layers[1]]);
}

#[test]
fn resize_propagates_to_container_and_layers() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["a", "b"]);

    scene.set_node_size(canvas, 200.0, 150.0);

    let container = scene.get_node(layers[0]).unwrap().parent.unwrap();
    let container_size = scene.get_node(container).unwrap().size;
    assert_eq!((container_size.width, container_size.height), (200.0, 150.0));

    for layer in layers {
        let size = scene.get_node(layer).unwrap().size;
        assert_eq!((size.width, size.height), (200.0, 150.0));
    }
}

#[test]
fn canvas_ops_on_plain_node_are_noops() {
    init_tracing();
    let mut scene = SceneGraph::new();
    let plain = plain_node(&mut scene, 10.0, 10.0);
    let layer = LayerNode::spawn(&mut scene, LayerSettings::new(10.0, 10.0));

    scene.canvas_setup(plain, 100.0, 100.0, true);
    scene.canvas_add_layer(plain, layer, -1);
    assert!(scene.canvas_layers(plain).is_empty());
    assert_eq!(scene.canvas_get_layer(plain, "x"), None);
}

#[test]
fn setup_twice_keeps_first_container() {
    init_tracing();
    let (mut scene, canvas, layers) = canvas_with_layers(&["a"]);
    let container = scene.get_node(layers[0]).unwrap().parent.unwrap();

    scene.canvas_setup(canvas, 300.0, 300.0, false);
    assert_eq!(scene.get_node(layers[0]).unwrap().parent, Some(container));
    // The ignored second setup leaves the dimensions alone too.
    let size = scene.get_node(canvas).unwrap().size;
    assert_eq!((size.width, size.height), (100.0, 100.0));
}

#[test]
fn node_json_records_type_and_layer_fields() {
    init_tracing();
    let mut scene = SceneGraph::new();

    let canvas = CanvasNode::spawn(&mut scene, "doc");
    scene.canvas_setup(canvas, 100.0, 100.0, true);

    let mut settings = LayerSettings::new(100.0, 100.0);
    settings.name = "hat".into();
    settings.opacity = 0.7;
    settings.mask_path = "masks/hat.png".into();
    let layer = LayerNode::spawn(&mut scene, settings);
    scene.canvas_add_layer(canvas, layer, -1);

    let json = scene.node_json(layer).unwrap();
    assert_eq!(json["nodeType"], "Layer");
    assert_eq!(json["name"], "hat");
    assert_eq!(json["maskPath"], "masks/hat.png");
    assert!((json["opacity"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(json["width"], 100.0);

    let json = scene.node_json(canvas).unwrap();
    assert_eq!(json["nodeType"], "Canvas");
    assert_eq!(json["name"], "doc");

    let plain = plain_node(&mut scene, 5.0, 5.0);
    assert_eq!(scene.node_json(plain).unwrap()["nodeType"], "Node");
}

#[test]
fn layer_opacity_accessors_clamp() {
    init_tracing();
    let mut scene = SceneGraph::new();
    let layer = LayerNode::spawn(&mut scene, LayerSettings::new(10.0, 10.0));

    let l = LayerNode::get_mut(&mut scene, layer).unwrap();
    l.set_opacity(1.5);
    assert_eq!(l.opacity(), 1.0);
    l.set_opacity(-0.5);
    assert_eq!(l.opacity(), 0.0);
}
