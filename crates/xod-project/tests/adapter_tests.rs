use pretty_assertions::assert_eq;
use serde_json::json;
use xod_project::adapter::{merge_patches_and_node_types, to_v2, to_v2_str};
use xod_project::{
    AdapterError, DataType, DataValue, Node, PinKey, Position, Project, ProjectError,
    ValidationError,
};
use xod_test_utils::{key, legacy_bundle, path};

fn migrated() -> Project {
    to_v2(&legacy_bundle()).unwrap()
}

fn node_at(project: &Project, x: f64, y: f64) -> Node {
    project
        .patch(&path("1"))
        .unwrap()
        .list_nodes()
        .find(|node| node.position() == Position::new(x, y))
        .cloned()
        .unwrap()
}

#[test]
fn every_merged_entry_becomes_a_patch() {
    let bundle = legacy_bundle();
    let merged = merge_patches_and_node_types(&bundle).unwrap();
    let project = migrated();

    assert_eq!(project.patch_count(), merged.len());
    let paths: Vec<_> = project.list_patch_paths().map(ToString::to_string).collect();
    assert_eq!(paths, ["1", "xod/core/button", "xod/core/led", "xod/core/pot"]);
    assert_eq!(project.authors(), ["Amperka".to_string()]);
}

#[test]
fn patch_and_node_type_fields_are_merged() {
    let project = migrated();
    let main = project.patch(&path("1")).unwrap();

    assert_eq!(main.label(), Some("Main"));
    assert_eq!(main.node_count(), 4);
    assert_eq!(main.link_count(), 2);
    // the terminal-derived pin "3" is replaced by the terminal node itself
    assert_eq!(main.custom_pins().len(), 1);
}

#[test]
fn bool_pins_become_boolean() {
    let project = migrated();
    let en = project
        .patch(&path("1"))
        .unwrap()
        .pin(&key("EN"))
        .unwrap();
    assert_eq!(en.data_type(), &DataType::Boolean);
    assert_eq!(en.order(), 1);

    let prs = project
        .patch(&path("xod/core/button"))
        .unwrap()
        .pin(&key("PRS"))
        .unwrap();
    assert_eq!(prs.data_type(), &DataType::Boolean);
    assert!(prs.is_output());
}

#[test]
fn injected_values_are_curried() {
    let project = migrated();

    let led = node_at(&project, 100.0, 200.0);
    assert_eq!(led.node_type(), &path("xod/core/led"));
    assert_eq!(led.bound_value(&key("PORT")), Some(&DataValue::from(13.0)));
    assert!(!led.is_pin_curried(&key("BRT")));

    // injected without a value: default of the declared number type
    let second = node_at(&project, 300.0, 200.0);
    assert_eq!(second.bound_value(&key("PORT")), Some(&DataValue::from(0.0)));
}

#[test]
fn link_endpoints_are_remapped() {
    let project = migrated();
    let main = project.patch(&path("1")).unwrap();
    let pot = node_at(&project, 100.0, 50.0);
    let led = node_at(&project, 100.0, 200.0);

    let link = main.links_to_node(led.id()).next().unwrap();
    assert_eq!(link.output_node_id(), pot.id());
    assert_eq!(link.output_pin_key(), &key("VAL"));
    assert_eq!(link.input_pin_key(), &key("BRT"));
}

#[test]
fn terminal_endpoint_is_translated() {
    let project = migrated();
    let main = project.patch(&path("1")).unwrap();
    let terminal = node_at(&project, 300.0, 0.0);
    assert!(terminal.is_terminal());

    let link = main.links_from_node(terminal.id()).next().unwrap();
    assert_eq!(link.output_pin_key(), &PinKey::from(terminal.id().clone()));

    // and it is part of the patch interface
    let input = main.pin(&PinKey::from(terminal.id().clone())).unwrap();
    assert_eq!(input.data_type(), &DataType::Number);
}

#[test]
fn impl_and_labels_are_copied() {
    let project = migrated();
    let led = project.patch(&path("xod/core/led")).unwrap();
    assert_eq!(led.label(), Some("LED"));
    assert_eq!(
        led.impl_for("js"),
        Some("module.exports.evaluate = () => {};")
    );
    assert!(project.patch(&path("xod/core/pot")).unwrap().impls().is_empty());
}

#[test]
fn migrated_project_passes_validation() {
    assert_eq!(migrated().validate(), Ok(()));
}

#[test]
fn unknown_link_node_aborts_conversion() {
    let mut bundle = legacy_bundle();
    *bundle
        .pointer_mut("/patches/1/links/1/pins/1/nodeId")
        .unwrap() = json!(99);

    let err = to_v2(&bundle).unwrap_err();
    match err {
        AdapterError::UnknownNode { patch, node, .. } => {
            assert_eq!(patch, "1");
            assert_eq!(node, "99");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn conflicting_bindings_abort_conversion() {
    let mut bundle = legacy_bundle();
    *bundle
        .pointer_mut("/patches/1/nodes/1/pins/BRT/injected")
        .unwrap() = json!(true);

    assert!(matches!(
        to_v2(&bundle),
        Err(AdapterError::Project(_))
    ));
}

#[test]
fn minimal_bundle_is_accepted() {
    let project = to_v2_str(r#"{ "patches": { "@/main": {} } }"#).unwrap();
    let main = project.patch(&path("@/main")).unwrap();
    assert_eq!(main.label(), None);
    assert_eq!(main.node_count(), 0);
    assert!(project.authors().is_empty());

    assert_eq!(to_v2_str("{}").unwrap(), Project::new());
}

#[test]
fn invalid_json_is_reported() {
    assert!(matches!(to_v2_str("{ nope"), Err(AdapterError::Json(_))));
}

#[test]
fn migration_output_is_a_loadable_document() {
    let project = migrated();
    let document = serde_json::to_string(&project).unwrap();
    let reloaded: Project = serde_json::from_str(&document).unwrap();
    assert_eq!(reloaded, project);
}

#[test]
fn conversion_is_deterministic() {
    assert_eq!(to_v2(&legacy_bundle()).unwrap(), to_v2(&legacy_bundle()).unwrap());
}

#[test]
fn mistyped_injected_value_aborts_conversion() {
    let mut bundle = legacy_bundle();
    *bundle
        .pointer_mut("/patches/1/nodes/1/pins/PORT/value")
        .unwrap() = json!("not a number");

    assert!(matches!(
        to_v2(&bundle),
        Err(AdapterError::Project(ProjectError::Validation(
            ValidationError::ValueTypeMismatch { .. }
        )))
    ));
}
