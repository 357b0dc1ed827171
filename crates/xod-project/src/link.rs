//! Links: directed edges from an output pin to an input pin

use crate::error::ValidationError;
use crate::types::{LinkId, NodeId, PinKey};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One end of a link
///
/// A lookup into the owning patch, not an ownership edge. A missing node is
/// a detectable error rather than a dangling pointer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEndpoint {
    node_id: NodeId,
    pin_key: PinKey,
}

impl LinkEndpoint {
    #[inline]
    #[must_use]
    pub fn new(node_id: NodeId, pin_key: PinKey) -> Self {
        Self { node_id, pin_key }
    }

    /// Parse both parts from raw strings
    ///
    /// # Errors
    /// Fails when either part is empty.
    pub fn parse(node_id: &str, pin_key: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(NodeId::new(node_id)?, PinKey::new(pin_key)?))
    }

    #[inline]
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[inline]
    #[must_use]
    pub fn pin_key(&self) -> &PinKey {
        &self.pin_key
    }
}

impl Display for LinkEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.pin_key)
    }
}

/// Dataflow edge within a single patch
///
/// `output` produces the value, `input` consumes it. An input pin accepts at
/// most one link; an output may feed any number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    id: LinkId,
    input: LinkEndpoint,
    output: LinkEndpoint,
}

impl Link {
    /// New link with a freshly generated id
    #[must_use]
    pub fn new(input: LinkEndpoint, output: LinkEndpoint) -> Self {
        Self {
            id: LinkId::generate(),
            input,
            output,
        }
    }

    /// Create a link from raw ids
    ///
    /// Argument order follows the stored document: input side first.
    ///
    /// # Errors
    /// Fails when any id or key is empty.
    pub fn create(
        input_pin: &str,
        input_node: &str,
        output_pin: &str,
        output_node: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(
            LinkEndpoint::parse(input_node, input_pin)?,
            LinkEndpoint::parse(output_node, output_pin)?,
        ))
    }

    #[must_use]
    pub fn with_id(mut self, id: LinkId) -> Self {
        self.id = id;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &LinkId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn input(&self) -> &LinkEndpoint {
        &self.input
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> &LinkEndpoint {
        &self.output
    }

    #[inline]
    #[must_use]
    pub fn input_node_id(&self) -> &NodeId {
        &self.input.node_id
    }

    #[inline]
    #[must_use]
    pub fn input_pin_key(&self) -> &PinKey {
        &self.input.pin_key
    }

    #[inline]
    #[must_use]
    pub fn output_node_id(&self) -> &NodeId {
        &self.output.node_id
    }

    #[inline]
    #[must_use]
    pub fn output_pin_key(&self) -> &PinKey {
        &self.output.pin_key
    }

    /// Whether either end touches `node`
    #[inline]
    #[must_use]
    pub fn connects(&self, node: &NodeId) -> bool {
        &self.input.node_id == node || &self.output.node_id == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_orders_input_first() {
        let link = Link::create("in", "b", "out", "a").unwrap();
        assert_eq!(link.input_node_id().as_str(), "b");
        assert_eq!(link.input_pin_key().as_str(), "in");
        assert_eq!(link.output_node_id().as_str(), "a");
        assert_eq!(link.output_pin_key().as_str(), "out");
    }

    #[test]
    fn create_rejects_empty_parts() {
        assert!(matches!(
            Link::create("in", "", "out", "a"),
            Err(ValidationError::InvalidNodeId(_))
        ));
        assert!(matches!(
            Link::create("in", "b", "", "a"),
            Err(ValidationError::InvalidPinKey(_))
        ));
    }

    #[test]
    fn document_shape() {
        let link = Link::create("in", "b", "out", "a")
            .unwrap()
            .with_id(LinkId::new("l1").unwrap());
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "l1",
                "input": { "nodeId": "b", "pinKey": "in" },
                "output": { "nodeId": "a", "pinKey": "out" },
            })
        );
    }
}
