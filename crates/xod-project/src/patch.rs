//! Patches: path-addressed node graphs
//!
//! A [`Patch`] owns its nodes, links and custom pins. Every mutator consumes
//! the patch and returns a new one, or fails without producing a value, so a
//! patch holding a broken link is never observable.
//!
//! Checked on every mutation:
//! - both link endpoints name nodes of this patch
//! - an input pin has at most one link and is not also curried
//! - custom pin keys are unique, including against terminal pins
//!
//! Whether pin keys exist on the linked nodes' types needs the owning project
//! and is checked lazily by [`Project::validate`](crate::Project::validate).

use crate::error::{LookupError, ProjectError, StructuralError, ValidationError};
use crate::link::Link;
use crate::node::Node;
use crate::pin::Pin;
use crate::types::{LinkId, NodeId, PatchPath, PinDirection, PinKey};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Reusable node graph, addressed by path
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    path: PatchPath,
    label: Option<String>,
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    pins: BTreeMap<PinKey, Pin>,
    impls: BTreeMap<String, String>,
}

impl Patch {
    /// Empty patch at `path`
    #[must_use]
    pub fn new(path: PatchPath) -> Self {
        Self {
            path,
            label: None,
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            pins: BTreeMap::new(),
            impls: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &PatchPath {
        &self.path
    }

    #[must_use]
    pub(crate) fn with_path(mut self, path: PatchPath) -> Self {
        self.path = path;
        self
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

    /// Attach implementation source for a target platform
    #[must_use]
    pub fn with_impl(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.impls.insert(target.into(), source.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn impls(&self) -> &BTreeMap<String, String> {
        &self.impls
    }

    #[inline]
    #[must_use]
    pub fn impl_for(&self, target: &str) -> Option<&str> {
        self.impls.get(target).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert or replace a node by id
    ///
    /// # Errors
    /// - [`StructuralError::DuplicateInputBinding`] when a replacement binds a
    ///   value to an input pin that already has a link
    /// - [`StructuralError::DuplicatePinKey`] when a terminal node's id is
    ///   already a custom pin key
    pub fn assoc_node(mut self, node: Node) -> Result<Self, StructuralError> {
        if node.is_terminal() && self.pins.contains_key(node.id().as_str()) {
            return Err(StructuralError::DuplicatePinKey(node.id().clone().into()));
        }
        if let Some(pin) = node
            .bound_values()
            .keys()
            .find(|key| self.is_input_linked(node.id(), key))
        {
            return Err(StructuralError::DuplicateInputBinding {
                node: node.id().clone(),
                pin: pin.clone(),
            });
        }
        self.nodes.insert(node.id().clone(), node);
        Ok(self)
    }

    /// Remove a node together with every link touching it
    #[must_use]
    pub fn dissoc_node(mut self, id: &NodeId) -> Self {
        if self.nodes.remove(id).is_some() {
            self.links.retain(|_, link| !link.connects(id));
        }
        self
    }

    /// Insert or replace a link by id
    ///
    /// # Errors
    /// - [`StructuralError::DanglingLinkEndpoint`] if an endpoint node is absent
    /// - [`StructuralError::DuplicateInputBinding`] if the input pin already has
    ///   another link or a bound value
    ///
    /// Endpoint pin keys are not resolved here; [`Project::validate`](crate::Project::validate)
    /// reports pins missing from the node types.
    pub fn assoc_link(mut self, link: Link) -> Result<Self, StructuralError> {
        for endpoint in [link.input(), link.output()] {
            if !self.nodes.contains_key(endpoint.node_id()) {
                return Err(StructuralError::DanglingLinkEndpoint {
                    link: link.id().clone(),
                    node: endpoint.node_id().clone(),
                });
            }
        }

        let already_linked = self
            .links
            .values()
            .any(|other| other.id() != link.id() && other.input() == link.input());
        let curried = self
            .nodes
            .get(link.input_node_id())
            .is_some_and(|node| node.is_pin_curried(link.input_pin_key()));
        if already_linked || curried {
            return Err(StructuralError::DuplicateInputBinding {
                node: link.input_node_id().clone(),
                pin: link.input_pin_key().clone(),
            });
        }

        self.links.insert(link.id().clone(), link);
        Ok(self)
    }

    #[must_use]
    pub fn dissoc_link(mut self, id: &LinkId) -> Self {
        self.links.remove(id);
        self
    }

    /// Add a custom pin
    ///
    /// # Errors
    /// [`StructuralError::DuplicatePinKey`] if the key is taken by a custom or
    /// terminal pin.
    pub fn assoc_pin(mut self, pin: Pin) -> Result<Self, StructuralError> {
        let taken = self.pins.contains_key(pin.key())
            || self
                .nodes
                .get(pin.key().as_str())
                .is_some_and(Node::is_terminal);
        if taken {
            return Err(StructuralError::DuplicatePinKey(pin.key().clone()));
        }
        self.pins.insert(pin.key().clone(), pin);
        Ok(self)
    }

    #[must_use]
    pub fn dissoc_pin(mut self, key: &PinKey) -> Self {
        self.pins.remove(key);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn list_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn list_links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// # Errors
    /// [`LookupError::NodeNotFound`] when absent.
    pub fn try_node(&self, id: &NodeId) -> Result<&Node, LookupError> {
        self.nodes.get(id).ok_or_else(|| LookupError::NodeNotFound {
            patch: self.path.clone(),
            node: id.clone(),
        })
    }

    #[inline]
    #[must_use]
    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// Custom pins only, keyed by pin key
    #[inline]
    #[must_use]
    pub fn custom_pins(&self) -> &BTreeMap<PinKey, Pin> {
        &self.pins
    }

    /// Full pin interface: custom pins plus pins defined by terminal nodes
    ///
    /// Inputs come first, then outputs, each sorted by order.
    #[must_use]
    pub fn list_pins(&self) -> Vec<Pin> {
        let mut pins: Vec<Pin> = self.pins.values().cloned().collect();
        pins.extend(self.terminal_pins());
        pins.sort_by(|a, b| {
            a.direction()
                .cmp(&b.direction())
                .then(a.order().cmp(&b.order()))
                .then_with(|| a.key().cmp(b.key()))
        });
        pins
    }

    #[must_use]
    pub fn list_input_pins(&self) -> Vec<Pin> {
        self.list_pins().into_iter().filter(Pin::is_input).collect()
    }

    #[must_use]
    pub fn list_output_pins(&self) -> Vec<Pin> {
        self.list_pins().into_iter().filter(Pin::is_output).collect()
    }

    #[must_use]
    pub fn pin(&self, key: &PinKey) -> Option<Pin> {
        self.list_pins().into_iter().find(|pin| pin.key() == key)
    }

    // Terminals of one direction are ordered left to right on the canvas.
    fn terminal_pins(&self) -> Vec<Pin> {
        let mut terminals: Vec<_> = self
            .nodes
            .values()
            .filter_map(|node| node.node_type().terminal().map(|(d, t)| (d, t, node)))
            .collect();
        terminals.sort_by(|(da, _, a), (db, _, b)| {
            da.cmp(db)
                .then(a.position().x.total_cmp(&b.position().x))
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut next_order: BTreeMap<PinDirection, u32> = BTreeMap::new();
        terminals
            .into_iter()
            .map(|(direction, data_type, node)| {
                let order = next_order.entry(direction).or_insert(0);
                let pin = Pin::typed(PinKey::from(node.id().clone()), data_type, direction)
                    .with_order(*order);
                *order += 1;
                match node.label() {
                    Some(label) => pin.with_label(label),
                    None => pin,
                }
            })
            .collect()
    }

    /// Links ending at `node`
    pub fn links_to_node<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .values()
            .filter(move |link| link.input_node_id() == node)
    }

    /// Links starting at `node`
    pub fn links_from_node<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .values()
            .filter(move |link| link.output_node_id() == node)
    }

    /// Input pin keys of `node` that receive a link
    #[must_use]
    pub fn linked_input_pins(&self, node: &NodeId) -> BTreeSet<PinKey> {
        self.links_to_node(node)
            .map(|link| link.input_pin_key().clone())
            .collect()
    }

    #[must_use]
    pub fn is_input_linked(&self, node: &NodeId, pin: &PinKey) -> bool {
        self.links_to_node(node)
            .any(|link| link.input_pin_key() == pin)
    }

    /// Nodes ordered so every node comes after the nodes feeding it
    ///
    /// # Errors
    /// [`StructuralError::CycleDetected`] when links form a cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, StructuralError> {
        let mut graph: DiGraph<&NodeId, ()> = DiGraph::new();
        let indices: HashMap<&NodeId, NodeIndex> = self
            .nodes
            .keys()
            .map(|id| (id, graph.add_node(id)))
            .collect();

        for link in self.links.values() {
            if let (Some(&from), Some(&to)) = (
                indices.get(link.output_node_id()),
                indices.get(link.input_node_id()),
            ) {
                graph.add_edge(from, to, ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|ix| graph[ix].clone()).collect()),
            Err(cycle) => Err(StructuralError::CycleDetected(
                graph[cycle.node_id()].clone(),
            )),
        }
    }
}

/// Stored form of a patch; the path is the key in the project document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PatchDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    nodes: BTreeMap<NodeId, Node>,
    #[serde(default)]
    links: BTreeMap<LinkId, Link>,
    #[serde(default)]
    pins: BTreeMap<PinKey, Pin>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    impls: BTreeMap<String, String>,
}

/// Map keys must equal the ids embedded in their entries
fn check_keys<'a, K, V>(
    entries: &'a BTreeMap<K, V>,
    embedded: impl Fn(&'a V) -> &'a str,
) -> Result<(), ValidationError>
where
    K: Borrow<str> + 'a,
{
    match entries
        .iter()
        .find(|&(key, value)| Borrow::<str>::borrow(key) != embedded(value))
    {
        Some((key, value)) => Err(ValidationError::KeyMismatch {
            key: Borrow::<str>::borrow(key).to_string(),
            embedded: embedded(value).to_string(),
        }),
        None => Ok(()),
    }
}

impl PatchDocument {
    /// Rebuild a patch through the validating mutators
    ///
    /// # Errors
    /// Besides mutator failures, a nodes, links or pins entry whose map key
    /// differs from its embedded id is rejected.
    pub(crate) fn into_patch(self, path: PatchPath) -> Result<Patch, ProjectError> {
        check_keys(&self.nodes, |node| node.id().as_str())?;
        check_keys(&self.links, |link| link.id().as_str())?;
        check_keys(&self.pins, |pin| pin.key().as_str())?;

        let mut patch = Patch::new(path);
        patch.label = self.label;
        patch.impls = self.impls;
        let patch = self
            .nodes
            .into_values()
            .try_fold(patch, Patch::assoc_node)?;
        let patch = self.pins.into_values().try_fold(patch, Patch::assoc_pin)?;
        let patch = self
            .links
            .into_values()
            .try_fold(patch, Patch::assoc_link)?;
        Ok(patch)
    }
}

impl From<Patch> for PatchDocument {
    fn from(patch: Patch) -> Self {
        Self {
            label: patch.label,
            nodes: patch.nodes,
            links: patch.links,
            pins: patch.pins,
            impls: patch.impls,
        }
    }
}
