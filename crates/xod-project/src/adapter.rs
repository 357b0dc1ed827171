//! Legacy bundle migration (v1 → v2)
//!
//! v1 bundles keep `patches` and `nodeTypes` as separate flat collections
//! with numeric ids, and store injected values on per-node pin descriptors.
//! [`to_v2`] turns such a bundle into a [`Project`] in one pass. Any failure
//! aborts the conversion; no partial project is ever returned.
//!
//! Conversion is deterministic: new node and link ids are derived from the
//! patch id and the old id, so the same bundle always yields the same
//! project.
//!
//! Missing labels, pins, implementations or author are not errors.

use crate::error::{LookupError, ProjectError, StructuralError, ValidationError};
use crate::link::{Link, LinkEndpoint};
use crate::node::Node;
use crate::patch::Patch;
use crate::pin::Pin;
use crate::project::Project;
use crate::types::{
    DataType, DataValue, LinkId, NodeId, PatchPath, PinDirection, PinKey, Position,
};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Errors while migrating a legacy bundle
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Bundle is not valid JSON or an entry has the wrong shape
    #[error("invalid bundle json: {0}")]
    Json(#[from] serde_json::Error),

    /// Bundle structure is wrong outside what serde checks
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    /// Link endpoint names a node that does not exist in its patch
    #[error("link '{link}' in patch '{patch}' refers to unknown node '{node}'")]
    UnknownNode {
        patch: String,
        link: String,
        node: String,
    },

    /// The converted data violates a model invariant
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl From<ValidationError> for AdapterError {
    fn from(err: ValidationError) -> Self {
        Self::Project(err.into())
    }
}

impl From<StructuralError> for AdapterError {
    fn from(err: StructuralError) -> Self {
        Self::Project(err.into())
    }
}

impl From<LookupError> for AdapterError {
    fn from(err: LookupError) -> Self {
        Self::Project(err.into())
    }
}

// ----------------------------------------------------------------------
// v1 shapes
// ----------------------------------------------------------------------

/// v1 ids are numbers or strings; both become strings
fn legacy_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected id, found {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    nodes: BTreeMap<String, LegacyNode>,
    #[serde(default)]
    links: BTreeMap<String, LegacyLink>,
    #[serde(default)]
    pins: BTreeMap<String, LegacyPin>,
    #[serde(default, rename = "impl")]
    implementation: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LegacyNode {
    #[serde(rename = "typeId", deserialize_with = "legacy_id")]
    type_id: String,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    pins: BTreeMap<String, LegacyNodePin>,
}

#[derive(Debug, Deserialize)]
struct LegacyNodePin {
    #[serde(default)]
    injected: bool,
    #[serde(default)]
    value: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct LegacyPin {
    #[serde(default)]
    key: Option<String>,
    #[serde(rename = "type", default)]
    pin_type: Option<String>,
    direction: PinDirection,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    label: Option<String>,
    /// Present on pins derived from terminal nodes
    #[serde(rename = "nodeId", default)]
    node_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct LegacyLink {
    pins: Vec<LegacyEndpoint>,
}

#[derive(Debug, Deserialize)]
struct LegacyEndpoint {
    #[serde(rename = "nodeId", deserialize_with = "legacy_id")]
    node_id: String,
    #[serde(rename = "pinKey", deserialize_with = "legacy_id")]
    pin_key: String,
}

/// Link endpoint resolved against the old→new node id mapping
///
/// Patch pins defined by terminal nodes are keyed by the terminal's id, so a
/// pin key that names a known node is a patch pin reference and gets
/// translated too. Any other key is a pin of the node's own type.
///
/// Both variants carry the endpoint node. `PatchPin` holds the already
/// translated key of a terminal-defined pin; `NodeLocal` holds the raw key,
/// validated only when the endpoint is built.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EndpointRef {
    NodeLocal { node: NodeId, pin: String },
    PatchPin { node: NodeId, pin: PinKey },
}

impl EndpointRef {
    fn resolve(raw: &LegacyEndpoint, mapping: &HashMap<String, NodeId>) -> Option<Self> {
        let node = mapping.get(&raw.node_id)?.clone();
        Some(match mapping.get(&raw.pin_key) {
            Some(terminal) => Self::PatchPin {
                node,
                pin: terminal.clone().into(),
            },
            None => Self::NodeLocal {
                node,
                pin: raw.pin_key.clone(),
            },
        })
    }

    fn into_endpoint(self) -> Result<LinkEndpoint, ValidationError> {
        match self {
            Self::NodeLocal { node, pin } => Ok(LinkEndpoint::new(node, PinKey::new(pin)?)),
            Self::PatchPin { node, pin } => Ok(LinkEndpoint::new(node, pin)),
        }
    }
}

// ----------------------------------------------------------------------
// Conversion
// ----------------------------------------------------------------------

/// Old `bool` type name becomes `boolean`; everything else passes through
#[must_use]
pub fn convert_pin_type(name: &str) -> &str {
    match name {
        "bool" => "boolean",
        other => other,
    }
}

/// Merge `patches` and `nodeTypes` into one collection keyed by id
///
/// An id present in both is merged field by field, `nodeTypes` winning.
///
/// # Errors
/// [`AdapterError::MalformedBundle`] if the bundle or either collection is
/// not a JSON object.
pub fn merge_patches_and_node_types(
    bundle: &Value,
) -> Result<BTreeMap<String, Map<String, Value>>, AdapterError> {
    if !bundle.is_object() {
        return Err(AdapterError::MalformedBundle("bundle must be an object".into()));
    }

    let mut merged: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for section in ["patches", "nodeTypes"] {
        let Some(value) = bundle.get(section) else {
            continue;
        };
        let entries = value.as_object().ok_or_else(|| {
            AdapterError::MalformedBundle(format!("'{section}' must be an object"))
        })?;
        for (id, entry) in entries {
            let fields = entry.as_object().ok_or_else(|| {
                AdapterError::MalformedBundle(format!("{section} entry '{id}' must be an object"))
            })?;
            merged
                .entry(id.clone())
                .or_default()
                .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    Ok(merged)
}

/// Convert a v1 bundle into a project
///
/// # Errors
/// Any malformed entry or violated invariant aborts the whole conversion.
pub fn to_v2(bundle: &Value) -> Result<Project, AdapterError> {
    let entries = merge_patches_and_node_types(bundle)?
        .into_iter()
        .map(|(id, fields)| {
            let entry: LegacyEntry = serde_json::from_value(Value::Object(fields))?;
            Ok::<_, AdapterError>((id, entry))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let project = match bundle.pointer("/meta/author").and_then(Value::as_str) {
        Some(author) => Project::new().with_author(author),
        None => Project::new(),
    };

    let project = entries.iter().try_fold(project, |project, (id, entry)| {
        let patch = convert_patch(id, entry, &entries)?;
        tracing::debug!(
            "Converted legacy patch {}: {} nodes, {} links",
            id,
            patch.node_count(),
            patch.link_count()
        );
        Ok::<_, AdapterError>(project.assoc_patch(patch.path().clone(), patch))
    })?;

    tracing::info!("Migrated legacy bundle into {} patches", project.patch_count());
    Ok(project)
}

/// Parse and convert a v1 bundle from JSON text
///
/// # Errors
/// See [`to_v2`].
pub fn to_v2_str(source: &str) -> Result<Project, AdapterError> {
    let bundle: Value = serde_json::from_str(source)?;
    to_v2(&bundle)
}

fn convert_patch(
    id: &str,
    entry: &LegacyEntry,
    entries: &BTreeMap<String, LegacyEntry>,
) -> Result<Patch, AdapterError> {
    let patch = Patch::new(PatchPath::new(id)?);
    let patch = match &entry.label {
        Some(label) => patch.with_label(label.as_str()),
        None => patch,
    };

    let patch = entry
        .pins
        .iter()
        .filter(|(_, pin)| pin.node_id.is_none())
        .try_fold(patch, |patch, (key, pin)| {
            Ok::<_, AdapterError>(patch.assoc_pin(convert_pin(key, pin)?)?)
        })?;

    let mut mapping: HashMap<String, NodeId> = HashMap::with_capacity(entry.nodes.len());
    let mut patch = patch;
    for (old_id, old) in &entry.nodes {
        let node = convert_node(id, old_id, old, entries)?;
        mapping.insert(old_id.clone(), node.id().clone());
        patch = patch.assoc_node(node)?;
    }

    let patch = entry
        .implementation
        .iter()
        .fold(patch, |patch, (target, source)| patch.with_impl(target.as_str(), source.as_str()));

    entry.links.iter().try_fold(patch, |patch, (link_id, old)| {
        let [input, output] = old.pins.as_slice() else {
            return Err(AdapterError::MalformedBundle(format!(
                "link '{link_id}' in patch '{id}' must have two pins, found {}",
                old.pins.len()
            )));
        };
        let resolve = |raw: &LegacyEndpoint| {
            EndpointRef::resolve(raw, &mapping).ok_or_else(|| AdapterError::UnknownNode {
                patch: id.to_string(),
                link: link_id.clone(),
                node: raw.node_id.clone(),
            })
        };
        let link = Link::new(
            resolve(input)?.into_endpoint()?,
            resolve(output)?.into_endpoint()?,
        )
        .with_id(LinkId::derived(&format!("{id}/{link_id}")));
        Ok(patch.assoc_link(link)?)
    })
}

fn convert_pin(key: &str, old: &LegacyPin) -> Result<Pin, ValidationError> {
    let key = old.key.as_deref().unwrap_or(key);
    let type_name = old.pin_type.as_deref().map(convert_pin_type).unwrap_or_default();
    let pin = Pin::new(key, type_name, old.direction)?.with_order(old.index);
    Ok(match &old.label {
        Some(label) => pin.with_label(label.as_str()),
        None => pin,
    })
}

fn convert_node(
    patch_id: &str,
    old_id: &str,
    old: &LegacyNode,
    entries: &BTreeMap<String, LegacyEntry>,
) -> Result<Node, AdapterError> {
    let node = Node::with_id(
        NodeId::derived(&format!("{patch_id}/{old_id}")),
        PatchPath::new(old.type_id.as_str())?,
        old.position,
    );
    old.pins
        .iter()
        .filter(|(_, pin)| pin.injected)
        .try_fold(node, |node, (key, pin)| {
            let pin_key = PinKey::new(key.as_str())?;
            let declared = declared_type(entries, &old.type_id, key);
            let node = match &pin.value {
                Some(value) => {
                    if let Some(ty) = declared.as_ref().filter(|ty| ty.is_primitive()) {
                        if !value.fits(ty) {
                            return Err(AdapterError::from(ValidationError::ValueTypeMismatch {
                                key: pin_key,
                                expected: ty.to_string(),
                            }));
                        }
                    }
                    node.set_bound_value(pin_key, value.clone())
                }
                None => {
                    let fallback = declared
                        .as_ref()
                        .and_then(DataType::default_value)
                        .unwrap_or_else(|| {
                            tracing::warn!(
                                "Injected pin {} of {} has no value and no known type, binding false",
                                key,
                                old.type_id
                            );
                            DataValue::Boolean(false)
                        });
                    node.curry_pin(pin_key, true, fallback)
                }
            };
            Ok::<_, AdapterError>(node)
        })
}

/// Declared type of `pin` on node type `type_id`, if the bundle has it
fn declared_type(
    entries: &BTreeMap<String, LegacyEntry>,
    type_id: &str,
    pin: &str,
) -> Option<DataType> {
    let type_name = entries.get(type_id)?.pins.get(pin)?.pin_type.as_deref()?;
    DataType::parse(convert_pin_type(type_name)).ok()
}
