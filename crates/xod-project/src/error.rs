//! Error types for the project model
//!
//! Three families, wrapped by [`ProjectError`]:
//! - [`ValidationError`]: malformed construction arguments
//! - [`StructuralError`]: dangling references, duplicate keys or bindings
//! - [`LookupError`]: a path or id that does not resolve

use crate::types::{LinkId, NodeId, PatchPath, PinKey};

/// Malformed arguments to a constructor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Pin key is empty
    #[error("invalid pin key: {0:?}")]
    InvalidPinKey(String),

    /// Type name outside the known enumeration
    #[error("invalid pin type: {0:?}")]
    InvalidPinType(String),

    /// Patch path is not a valid library-style path
    #[error("invalid patch path {path:?}: {reason}")]
    InvalidPatchPath { path: String, reason: String },

    /// Node id is empty
    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    /// Link id is empty
    #[error("invalid link id: {0:?}")]
    InvalidLinkId(String),

    /// Value does not parse as the pin's declared type
    #[error("value for pin '{key}' does not fit type {expected}")]
    ValueTypeMismatch { key: PinKey, expected: String },

    /// Document map key differs from the id stored in the entry
    #[error("document key {key:?} does not match embedded id {embedded:?}")]
    KeyMismatch { key: String, embedded: String },
}

impl ValidationError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPatchPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A mutation would break a structural invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Link endpoint refers to a node missing from the patch
    #[error("link '{link}' refers to missing node '{node}'")]
    DanglingLinkEndpoint { link: LinkId, node: NodeId },

    /// Input pin already has a link or a bound value
    #[error("input pin '{pin}' of node '{node}' is already bound")]
    DuplicateInputBinding { node: NodeId, pin: PinKey },

    /// Pin key already taken in the patch
    #[error("duplicate pin key: '{0}'")]
    DuplicatePinKey(PinKey),

    /// Patch path already taken in the project
    #[error("patch path already exists: '{0}'")]
    PathConflict(PatchPath),

    /// Links form a cycle through the given node
    #[error("cycle detected at node '{0}'")]
    CycleDetected(NodeId),
}

/// A path or id did not resolve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("patch not found: '{0}'")]
    PatchNotFound(PatchPath),

    #[error("node '{node}' not found in patch '{patch}'")]
    NodeNotFound { patch: PatchPath, node: NodeId },

    #[error("link '{link}' not found in patch '{patch}'")]
    LinkNotFound { patch: PatchPath, link: LinkId },

    #[error("pin '{pin}' not found on patch '{patch}'")]
    PinNotFound { patch: PatchPath, pin: PinKey },
}

/// Any project model error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Lazily checked link endpoint points at a pin with the wrong direction
    #[error("link '{link}' in patch '{patch}' connects pin '{pin}' in the wrong direction")]
    DirectionMismatch {
        patch: PatchPath,
        link: LinkId,
        pin: PinKey,
    },
}

impl ProjectError {
    /// Validation and structural failures can be reported to the user and
    /// skipped. Lookup failures mean a caller asserted existence wrongly.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Structural(_) | Self::DirectionMismatch { .. } => true,
            Self::Lookup(_) => false,
        }
    }
}

/// Convenience result alias
pub type ProjectResult<T> = Result<T, ProjectError>;
