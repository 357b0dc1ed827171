//! Testing utilities for the XOD workspace
//!
//! Shared fixtures: a small standard library, a flattened sample project and
//! a v1 bundle.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use serde_json::{json, Value};
use xod_project::{
    DataValue, Link, LinkId, Node, NodeId, Patch, PatchPath, Pin, PinDirection, PinKey, Position, Project,
};

pub fn path(s: &str) -> PatchPath {
    PatchPath::new(s).unwrap()
}

pub fn key(s: &str) -> PinKey {
    PinKey::new(s).unwrap()
}

pub fn node_id(s: &str) -> NodeId {
    NodeId::new(s).unwrap()
}

pub fn link_id(s: &str) -> LinkId {
    LinkId::new(s).unwrap()
}

/// Node with a fixed id, handy for asserting on specific nodes
pub fn node(id: &str, node_type: &str) -> Node {
    Node::with_id(node_id(id), path(node_type), Position::ORIGIN)
}

/// Patch at `patch_path` declaring `(key, type, direction)` pins in order
pub fn patch_with_pins(patch_path: &str, pins: &[(&str, &str, PinDirection)]) -> Patch {
    pins.iter()
        .enumerate()
        .fold(Patch::new(path(patch_path)), |patch, (i, (k, t, d))| {
            let order = u32::try_from(i).unwrap();
            patch
                .assoc_pin(Pin::new(k, t, *d).unwrap().with_order(order))
                .unwrap()
        })
}

pub const CONSTANT_NUMBER: &str = "xod/core/constant-number";
pub const CONSTANT_BOOLEAN: &str = "xod/core/constant-boolean";
pub const CONSTANT_STRING: &str = "xod/core/constant-string";

/// The three constant producers, each with a single `VAL` output
pub fn constants_library() -> Project {
    [
        (CONSTANT_NUMBER, "number"),
        (CONSTANT_BOOLEAN, "boolean"),
        (CONSTANT_STRING, "string"),
    ]
    .into_iter()
    .fold(Project::new(), |project, (p, t)| {
        project.assoc_patch(
            path(p),
            patch_with_pins(p, &[("VAL", t, PinDirection::Output)]),
        )
    })
}

/// Constants plus a handful of ordinary node types
pub fn standard_library() -> Project {
    use PinDirection::{Input, Output};

    [
        patch_with_pins("xod/core/pot", &[("VAL", "number", Output)]),
        patch_with_pins(
            "xod/math/add",
            &[("X", "number", Input), ("Y", "number", Input), ("SUM", "number", Output)],
        ),
        patch_with_pins(
            "xod/core/led",
            &[("PORT", "number", Input), ("BRT", "number", Input)],
        ),
        patch_with_pins(
            "xod/core/flip-flop",
            &[
                ("SET", "pulse", Input),
                ("TGL", "pulse", Input),
                ("RST", "pulse", Input),
                ("MEM", "boolean", Output),
            ],
        ),
        patch_with_pins("xod/core/log", &[("MSG", "string", Input), ("EN", "boolean", Input)]),
        patch_with_pins("xod/color/paint", &[("COLOR", "xod/color/rgb", Input)]),
    ]
    .into_iter()
    .fold(constants_library(), |project, patch| {
        project.assoc_patch(patch.path().clone(), patch)
    })
}

/// Flattened `@/main`:
///
/// ```text
/// pot.VAL ──▶ adder.X      adder.Y = 42
/// adder.SUM ─▶ led.BRT     led.PORT = 13
/// ff.TGL = false (pulse)   log.MSG = "hello", log.EN = true
/// ```
///
/// Links carry fixed ids so separately built fixtures compare equal.
pub fn main_patch() -> Patch {
    Patch::new(path("@/main"))
        .assoc_node(node("pot", "xod/core/pot"))
        .unwrap()
        .assoc_node(node("adder", "xod/math/add").set_bound_value(key("Y"), DataValue::from(42.0)))
        .unwrap()
        .assoc_node(node("led", "xod/core/led").set_bound_value(key("PORT"), DataValue::from(13.0)))
        .unwrap()
        .assoc_node(node("ff", "xod/core/flip-flop").set_bound_value(key("TGL"), DataValue::from(false)))
        .unwrap()
        .assoc_node(
            node("log", "xod/core/log")
                .set_bound_value(key("MSG"), DataValue::from("hello"))
                .set_bound_value(key("EN"), DataValue::from(true)),
        )
        .unwrap()
        .assoc_link(
            Link::create("X", "adder", "VAL", "pot")
                .unwrap()
                .with_id(link_id("pot-adder")),
        )
        .unwrap()
        .assoc_link(
            Link::create("BRT", "led", "SUM", "adder")
                .unwrap()
                .with_id(link_id("adder-led")),
        )
        .unwrap()
}

/// Flattened project: ordinary node types plus `@/main`, without constants
pub fn flat_project() -> Project {
    let library = standard_library();
    let project = library
        .list_patches()
        .filter(|patch| !patch.path().as_str().starts_with("xod/core/constant-"))
        .cloned()
        .fold(Project::new(), |project, patch| {
            project.assoc_patch(patch.path().clone(), patch)
        });
    project.assoc_patch(path("@/main"), main_patch())
}

/// v1 bundle exercising merged entries, numeric ids, injected pins, a
/// terminal link endpoint, `bool` pins and `impl`
pub fn legacy_bundle() -> Value {
    json!({
        "meta": { "name": "blink", "author": "Amperka" },
        "patches": {
            "1": {
                "id": "1",
                "label": "Main",
                "nodes": {
                    "1": {
                        "id": 1,
                        "typeId": "xod/core/led",
                        "position": { "x": 100, "y": 200 },
                        "pins": {
                            "PORT": { "injected": true, "value": 13 },
                            "BRT": { "injected": false }
                        }
                    },
                    "2": {
                        "id": 2,
                        "typeId": "xod/core/pot",
                        "position": { "x": 100, "y": 50 },
                        "pins": {}
                    },
                    "3": {
                        "id": 3,
                        "typeId": "xod/built-in/input-number",
                        "position": { "x": 300, "y": 0 },
                        "pins": {}
                    },
                    "4": {
                        "id": 4,
                        "typeId": "xod/core/led",
                        "position": { "x": 300, "y": 200 },
                        "pins": {
                            "PORT": { "injected": true }
                        }
                    }
                },
                "links": {
                    "1": { "id": 1, "pins": [
                        { "nodeId": 1, "pinKey": "BRT" },
                        { "nodeId": 2, "pinKey": "VAL" }
                    ] },
                    "2": { "id": 2, "pins": [
                        { "nodeId": 4, "pinKey": "BRT" },
                        { "nodeId": 3, "pinKey": 3 }
                    ] }
                }
            }
        },
        "nodeTypes": {
            "1": {
                "pins": {
                    "3": { "key": "3", "nodeId": 3, "type": "number", "direction": "input", "index": 0 },
                    "EN": { "key": "EN", "type": "bool", "direction": "input", "index": 1 }
                }
            },
            "xod/core/led": {
                "label": "LED",
                "pins": {
                    "PORT": { "key": "PORT", "type": "number", "direction": "input", "index": 0 },
                    "BRT": { "key": "BRT", "type": "number", "direction": "input", "index": 1 }
                },
                "impl": { "js": "module.exports.evaluate = () => {};" }
            },
            "xod/core/pot": {
                "pins": {
                    "VAL": { "key": "VAL", "type": "number", "direction": "output", "index": 0 }
                }
            },
            "xod/core/button": {
                "pins": {
                    "PRS": { "key": "PRS", "type": "bool", "direction": "output", "index": 0 }
                }
            }
        },
        "folders": {},
        "counter": { "patches": 1, "nodes": 4, "links": 2 }
    })
}
