//! XOD Project - graph model for visual dataflow programs
//!
//! Provides:
//! - Immutable [`Project`] / [`Patch`] / [`Node`] / [`Link`] / [`Pin`] values
//!   whose mutators return a new value or an error
//! - Structural invariants checked on every mutation (no dangling links,
//!   at most one binding per input pin)
//! - [`adapter`]: migration of v1 bundles to the current document format
//! - [`extract`]: rewriting curried input values into constant nodes
//!
//! # Example
//!
//! ```rust,ignore
//! use xod_project::prelude::*;
//!
//! let led = Node::new(PatchPath::new("xod/core/led")?, Position::ORIGIN)
//!     .set_bound_value(PinKey::new("brightness")?, DataValue::from(0.5));
//! let main = Patch::new(PatchPath::new("@/main")?).assoc_node(led)?;
//! let project = Project::new().assoc_patch(main.path().clone(), main);
//!
//! let flat = extract_bound_inputs(&project, &PatchPath::new("@/main")?, &library, &ExtractConfig::default())?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod link;
mod node;
mod patch;
mod pin;
mod project;
mod types;

pub mod adapter;
pub mod config;
pub mod extract;

pub use adapter::{to_v2, to_v2_str, AdapterError};
pub use config::{ConfigError, ConstantPatches, ExtractConfig};
pub use error::{LookupError, ProjectError, ProjectResult, StructuralError, ValidationError};
pub use extract::{extract_bound_inputs, ExtractError};
pub use link::{Link, LinkEndpoint};
pub use node::Node;
pub use patch::Patch;
pub use pin::Pin;
pub use project::{PatchLibrary, Project};
pub use types::{
    DataType, DataValue, LinkId, NodeId, PatchPath, PinDirection, PinKey, Position,
    TERMINAL_PREFIX,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with XOD projects
    pub use crate::{
        extract_bound_inputs, DataType, DataValue, ExtractConfig, Link, LinkEndpoint, Node,
        NodeId, Patch, PatchLibrary, PatchPath, Pin, PinDirection, PinKey, Position, Project,
        ProjectError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
