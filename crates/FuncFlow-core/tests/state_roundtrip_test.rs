use funcflow_core::flow::FlowDocument;
use funcflow_core::{
    ConstantKind, FunctionNode, GlobalConstants, NodeId, NodeIdAllocator, StateError,
};
use glam::Vec2;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

fn configured(ids: &NodeIdAllocator) -> FunctionNode {
    let mut node = FunctionNode::new(ids);
    node.set_inputs(vec!["price".into(), "qty".into(), "discount".into()])
        .unwrap();
    node.rename_output("total").unwrap();
    node.set_code_body(
        "let gross = price * qty;\n\nif discount == () {\n    return gross;\n}\nreturn gross - discount;",
    );
    node.title = "Invoice".to_string();
    node.position = Vec2::new(120.0, -40.0);
    node
}

fn order() -> HashMap<String, Value> {
    HashMap::from([
        ("price".to_string(), json!(4)),
        ("qty".to_string(), json!(5)),
        ("discount".to_string(), json!(3)),
    ])
}

#[test]
fn test_state_round_trip_preserves_behaviour() {
    let ids = NodeIdAllocator::new();
    let mut original = configured(&ids);
    let state = original.get_state().to_value().unwrap();

    let mut copy = FunctionNode::new(&ids);
    copy.set_state(&state).unwrap();

    assert_eq!(copy.inputs(), original.inputs());
    assert_eq!(copy.output_name(), "total");
    assert_eq!(copy.code_body(), original.code_body());
    assert_eq!(copy.title, "Invoice");
    assert_eq!(copy.position, Vec2::new(120.0, -40.0));
    assert_eq!(copy.sockets().output().name, "total");

    original.evaluate(&order()).unwrap();
    copy.evaluate(&order()).unwrap();
    assert_eq!(original.output_value(), Some(&json!(17)));
    assert_eq!(copy.output_value(), original.output_value());
}

#[test]
fn test_set_state_never_changes_id() {
    let ids = NodeIdAllocator::new();
    let mut node = FunctionNode::new(&ids);
    let id = node.id();

    node.set_state(&json!({ "id": 999, "title": "Renamed" }))
        .unwrap();

    assert_eq!(node.id(), id);
    assert_eq!(node.title, "Renamed");
}

#[test]
fn test_invalid_state_is_rejected_whole() {
    let ids = NodeIdAllocator::new();
    let mut node = configured(&ids);
    let before = node.get_state();

    let err = node
        .set_state(&json!({ "title": "Broken", "inputs": ["a", "a"] }))
        .unwrap_err();
    assert!(matches!(err, StateError::Descriptor(_)));

    let err = node.set_state(&json!({ "inputs": "not a list" })).unwrap_err();
    assert!(matches!(err, StateError::Json(_)));

    assert_eq!(node.get_state(), before);
}

#[test]
fn test_state_reconciles_sockets() {
    let ids = NodeIdAllocator::new();
    let mut node = configured(&ids);
    let qty_socket = node.sockets().find_input("qty").unwrap().id;
    let output_socket = node.sockets().output_id();

    node.set_state(&json!({
        "inputs": ["qty", "rate"],
        "input_types": { "rate": "number" },
        "output_name": "cost"
    }))
    .unwrap();

    let names: Vec<&str> = node.sockets().inputs().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["qty", "rate"]);
    assert_eq!(node.sockets().find_input("qty").unwrap().id, qty_socket);
    assert_eq!(node.input_type("rate"), Some("number"));
    assert_eq!(node.sockets().output_id(), output_socket);
    assert_eq!(node.sockets().output().name, "cost");
}

#[test]
fn test_flow_document_round_trip() {
    let ids = NodeIdAllocator::new();
    let mut constants = GlobalConstants::new();
    constants.insert("TAX", json!(2)).unwrap();
    constants.insert("REGION", json!("eu")).unwrap();

    let mut invoice = configured(&ids);
    invoice.set_code_body("return price * qty + TAX;");
    let mut label = FunctionNode::new(&ids);
    label.set_code_body("return REGION + \"-\" + input1;");

    let text = FlowDocument::capture([&invoice, &label], &constants)
        .to_json()
        .unwrap();
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["global_constants"], json!({ "REGION": "eu", "TAX": 2 }));
    assert_eq!(parsed["editor_state"]["nodes"][0]["function_body"], json!("return price * qty + TAX;"));

    let reloaded = NodeIdAllocator::new();
    let doc = FlowDocument::from_json(&text).unwrap();
    let (mut nodes, shared) = doc.restore(&reloaded).unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(shared.value("TAX"), Some(&json!(2)));
    // Nodes created after a restore never collide with saved ids
    assert!(reloaded.peek() > NodeId(1));
    let fresh = FunctionNode::new(&reloaded);
    assert!(nodes.iter().all(|n| n.id() != fresh.id()));

    nodes[0].evaluate(&order()).unwrap();
    nodes[1]
        .evaluate(&HashMap::from([("input1".to_string(), json!("north"))]))
        .unwrap();
    assert_eq!(nodes[0].output_value(), Some(&json!(22)));
    assert_eq!(nodes[1].output_value(), Some(&json!("eu-north")));
    assert!(nodes.iter().all(|n| Arc::ptr_eq(n.globals_env.as_ref().unwrap(), &shared)));
}

#[test]
fn test_malformed_document_is_an_error() {
    let err = FlowDocument::from_json("{ \"editor_state\": 5 }").unwrap_err();
    assert!(err.to_string().contains("flow document"));
}

#[test]
fn test_document_with_last_possible_id_fails_cleanly() {
    let text = json!({
        "editor_state": { "nodes": [{
            "id": u64::MAX,
            "title": "Script Function",
            "inputs": ["input1"],
            "output_name": "result",
            "function_name": "function_0",
            "function_body": ""
        }]}
    })
    .to_string();
    let doc = FlowDocument::from_json(&text).unwrap();
    let ids = NodeIdAllocator::new();

    let err = doc.restore(&ids).unwrap_err();

    assert!(format!("{err:#}").contains("no room for new nodes"));
    assert_eq!(ids.peek(), NodeId(0));
}

#[test]
fn test_declared_constant_kinds_survive_reload() {
    let mut constants = GlobalConstants::new();
    constants
        .insert_typed("SCALE", json!(2), ConstantKind::Float)
        .unwrap();
    constants
        .insert_typed("CODE", json!("7"), ConstantKind::Str)
        .unwrap();

    let text = FlowDocument::capture(std::iter::empty::<&FunctionNode>(), &constants)
        .to_json()
        .unwrap();
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["constant_types"], json!({ "CODE": "str", "SCALE": "float" }));

    let (_, restored) = FlowDocument::from_json(&text)
        .unwrap()
        .restore(&NodeIdAllocator::new())
        .unwrap();
    assert_eq!(restored.get("SCALE").unwrap().kind, ConstantKind::Float);
    assert_eq!(*restored, constants);

    // Documents without the types map fall back to inference
    let legacy = r#"{ "global_constants": { "SCALE": 2 } }"#;
    let (_, inferred) = FlowDocument::from_json(legacy)
        .unwrap()
        .restore(&NodeIdAllocator::new())
        .unwrap();
    assert_eq!(inferred.get("SCALE").unwrap().kind, ConstantKind::Int);
}
