//! Nodes: instances of a patch type placed inside another patch

use crate::types::{DataValue, NodeId, PatchPath, PinKey, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance of a patch type
///
/// `bound_values` holds the curried pins: a pin with a bound value behaves
/// as a constant and may not also receive a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: PatchPath,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    bound_values: BTreeMap<PinKey, DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Node {
    /// New node with a freshly generated id
    #[must_use]
    pub fn new(node_type: PatchPath, position: Position) -> Self {
        Self::with_id(NodeId::generate(), node_type, position)
    }

    #[must_use]
    pub fn with_id(id: NodeId, node_type: PatchPath, position: Position) -> Self {
        Self {
            id,
            node_type,
            position,
            bound_values: BTreeMap::new(),
            label: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Path of the patch this node instantiates
    #[inline]
    #[must_use]
    pub fn node_type(&self) -> &PatchPath {
        &self.node_type
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Whether this node is an I/O terminal of its patch
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.node_type.terminal().is_some()
    }

    /// Bind a literal to a pin, overwriting any previous binding
    ///
    /// The value is not checked against the pin's declared type; callers
    /// validate it against the node's type patch first.
    #[must_use]
    pub fn set_bound_value(mut self, key: PinKey, value: DataValue) -> Self {
        self.bound_values.insert(key, value);
        self
    }

    /// Mark a pin as curried or not
    ///
    /// When `injected`, an existing binding is kept and `fallback` is bound
    /// otherwise. When not injected, the binding is dropped.
    #[must_use]
    pub fn curry_pin(mut self, key: PinKey, injected: bool, fallback: DataValue) -> Self {
        if injected {
            self.bound_values.entry(key).or_insert(fallback);
        } else {
            self.bound_values.remove(&key);
        }
        self
    }

    /// Drop a binding; no-op when the pin is not bound
    #[must_use]
    pub fn remove_bound_value(mut self, key: &PinKey) -> Self {
        self.bound_values.remove(key);
        self
    }

    #[inline]
    #[must_use]
    pub fn bound_value(&self, key: &PinKey) -> Option<&DataValue> {
        self.bound_values.get(key)
    }

    #[inline]
    #[must_use]
    pub fn bound_values(&self) -> &BTreeMap<PinKey, DataValue> {
        &self.bound_values
    }

    /// Whether any pin of this node is curried
    #[inline]
    #[must_use]
    pub fn has_bound_values(&self) -> bool {
        !self.bound_values.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_pin_curried(&self, key: &PinKey) -> bool {
        self.bound_values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PinKey {
        PinKey::new(s).unwrap()
    }

    fn led() -> Node {
        Node::new(PatchPath::new("xod/core/led").unwrap(), Position::new(10.0, 20.0))
    }

    #[test]
    fn fresh_nodes_get_distinct_ids() {
        assert_ne!(led().id(), led().id());
    }

    #[test]
    fn set_bound_value_overwrites() {
        let node = led()
            .set_bound_value(key("in"), DataValue::Number(1.0))
            .set_bound_value(key("in"), DataValue::Number(2.0));
        assert_eq!(node.bound_value(&key("in")), Some(&DataValue::Number(2.0)));
        assert!(node.has_bound_values());
    }

    #[test]
    fn remove_bound_value_is_noop_when_absent() {
        let node = led();
        let same = node.clone().remove_bound_value(&key("missing"));
        assert_eq!(node, same);
    }

    #[test]
    fn curry_pin_keeps_existing_value() {
        let node = led()
            .set_bound_value(key("in"), DataValue::Number(5.0))
            .curry_pin(key("in"), true, DataValue::Number(0.0))
            .curry_pin(key("en"), true, DataValue::Boolean(false));
        assert_eq!(node.bound_value(&key("in")), Some(&DataValue::Number(5.0)));
        assert_eq!(node.bound_value(&key("en")), Some(&DataValue::Boolean(false)));

        let node = node.curry_pin(key("in"), false, DataValue::Number(0.0));
        assert!(!node.is_pin_curried(&key("in")));
    }

    #[test]
    fn serializes_bound_values_in_camel_case() {
        let node = led().set_bound_value(key("in"), DataValue::Number(42.0));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "xod/core/led");
        assert_eq!(json["boundValues"]["in"], 42.0);
        assert_eq!(json["position"]["x"], 10.0);
    }
}
