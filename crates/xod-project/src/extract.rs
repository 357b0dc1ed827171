//! Bound-input extraction
//!
//! Code generation only understands values that flow through links. Before
//! compiling, every value curried onto a node input of the entry patch is
//! replaced by a dedicated constant node wired to that input.
//!
//! Pins that are already occupied are left alone:
//! - inputs that have an incoming link
//! - output pins of the node's type (constant nodes carry their value there)
//!
//! The second rule is what makes a repeated pass a no-op.

use crate::config::ExtractConfig;
use crate::error::{LookupError, StructuralError};
use crate::link::{Link, LinkEndpoint};
use crate::node::Node;
use crate::patch::Patch;
use crate::project::{PatchLibrary, Project};
use crate::types::{DataType, DataValue, LinkId, NodeId, PatchPath, PinKey};
use std::collections::{BTreeMap, BTreeSet};

/// Errors during extraction; the input project is never partially rewritten
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A generated link or node could not be attached
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Curried key is not a pin of the node's type
    #[error("pin '{pin}' is not declared by node type '{node_type}'")]
    UnknownPin { node_type: PatchPath, pin: PinKey },

    /// Custom types have no constant producer
    #[error("no constant node for pin '{pin}' of type '{data_type}'")]
    NoConstantForType { pin: PinKey, data_type: DataType },

    #[error("constant patch '{0}' has no output pin")]
    ConstantWithoutOutput(PatchPath),
}

/// One curried pin to be replaced
#[derive(Debug)]
struct BoundInput<'a> {
    node: &'a Node,
    pin: &'a PinKey,
    value: &'a DataValue,
    constant: PatchPath,
}

/// Replace curried input values of `entry` with constant nodes
///
/// `flat` is the flattened project and supplies declared pin types.
/// `library` supplies node type outputs and the constant patch definitions,
/// which are copied into the result.
///
/// Returns `flat` unchanged when there is nothing to extract.
///
/// # Errors
/// - [`ExtractError::Lookup`] when the entry patch, a node type or a constant
///   patch is missing
/// - [`ExtractError::UnknownPin`] / [`ExtractError::NoConstantForType`] for
///   bound values that cannot be turned into constants
/// - [`ExtractError::ConstantWithoutOutput`] for an unusable constant patch
/// - [`ExtractError::Structural`] if the rewritten patch would be invalid
pub fn extract_bound_inputs<L: PatchLibrary + ?Sized>(
    flat: &Project,
    entry: &PatchPath,
    library: &L,
    config: &ExtractConfig,
) -> Result<Project, ExtractError> {
    let patch = flat.try_patch(entry)?;
    let bound = find_bound_inputs(flat, patch, library, config)?;
    if bound.is_empty() {
        tracing::debug!("No bound inputs to extract in {}", entry);
        return Ok(flat.clone());
    }

    let mut constants: BTreeMap<PatchPath, (PinKey, Patch)> = BTreeMap::new();
    let mut uncurried: BTreeMap<NodeId, Node> = BTreeMap::new();
    let mut constant_nodes = Vec::with_capacity(bound.len());
    let mut links = Vec::with_capacity(bound.len());

    for input in &bound {
        let output_key = match constants.get(&input.constant) {
            Some((key, _)) => key.clone(),
            None => {
                let (key, definition) = constant_output(library, &input.constant)?;
                constants.insert(input.constant.clone(), (key.clone(), definition));
                key
            }
        };

        let node = uncurried
            .remove(input.node.id())
            .unwrap_or_else(|| input.node.clone())
            .remove_bound_value(input.pin);
        uncurried.insert(node.id().clone(), node);

        let seed = format!("{entry}/{}/{}", input.node.id(), input.pin);
        let constant = Node::with_id(
            NodeId::derived(&seed),
            input.constant.clone(),
            config.placeholder,
        )
        .set_bound_value(output_key.clone(), input.value.clone());
        let link = Link::new(
            LinkEndpoint::new(input.node.id().clone(), input.pin.clone()),
            LinkEndpoint::new(constant.id().clone(), output_key),
        )
        .with_id(LinkId::derived(&seed));

        constant_nodes.push(constant);
        links.push(link);
    }

    let rewritten = uncurried
        .into_values()
        .try_fold(patch.clone(), Patch::assoc_node)?;
    let rewritten = constant_nodes
        .into_iter()
        .try_fold(rewritten, Patch::assoc_node)?;
    let rewritten = links.into_iter().try_fold(rewritten, Patch::assoc_link)?;

    tracing::info!(
        "Extracted {} bound inputs of {} into constant nodes",
        bound.len(),
        entry
    );

    let project = constants
        .into_iter()
        .fold(flat.clone(), |project, (path, (_, definition))| {
            project.assoc_patch(path, definition)
        });
    Ok(project.assoc_patch(entry.clone(), rewritten))
}

fn find_bound_inputs<'p, L: PatchLibrary + ?Sized>(
    flat: &Project,
    patch: &'p Patch,
    library: &L,
    config: &ExtractConfig,
) -> Result<Vec<BoundInput<'p>>, ExtractError> {
    let mut bound = Vec::new();

    for node in patch
        .list_nodes()
        .filter(|node| node.has_bound_values() && !node.is_terminal())
    {
        let mut occupied: BTreeSet<PinKey> = patch.linked_input_pins(node.id());
        occupied.extend(
            library
                .require(node.node_type())?
                .list_output_pins()
                .into_iter()
                .map(|pin| pin.key().clone()),
        );

        let mut free = node
            .bound_values()
            .iter()
            .filter(|(key, _)| !occupied.contains(*key))
            .peekable();
        if free.peek().is_none() {
            continue;
        }

        let node_type = flat.try_patch(node.node_type())?;
        for (pin, value) in free {
            let declared = node_type
                .pin(pin)
                .ok_or_else(|| ExtractError::UnknownPin {
                    node_type: node_type.path().clone(),
                    pin: pin.clone(),
                })?;
            let constant = config
                .constant_for(declared.data_type())
                .ok_or_else(|| ExtractError::NoConstantForType {
                    pin: pin.clone(),
                    data_type: declared.data_type().clone(),
                })?
                .clone();
            bound.push(BoundInput {
                node,
                pin,
                value,
                constant,
            });
        }
    }

    Ok(bound)
}

/// First output pin key of a constant patch, with the patch itself
fn constant_output<L: PatchLibrary + ?Sized>(
    library: &L,
    path: &PatchPath,
) -> Result<(PinKey, Patch), ExtractError> {
    let definition = library.require(path)?;
    let key = definition
        .list_output_pins()
        .into_iter()
        .next()
        .map(|pin| pin.key().clone())
        .ok_or_else(|| ExtractError::ConstantWithoutOutput(path.clone()))?;
    Ok((key, definition.clone()))
}
