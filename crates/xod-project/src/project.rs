//! Projects: the top-level immutable document
//!
//! Patches live in a persistent ordered map, so replacing one patch shares
//! the others with the previous project value.

use crate::error::{LookupError, ProjectError, StructuralError};
use crate::patch::{Patch, PatchDocument};
use crate::pin::Pin;
use crate::types::{DataType, NodeId, PatchPath, PinDirection, PinKey};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolves patch paths to canonical patch definitions
///
/// Implemented by [`Project`] and by plain maps, e.g. a loaded standard
/// library index.
pub trait PatchLibrary {
    /// Patch stored at `path`, if any
    fn lookup(&self, path: &PatchPath) -> Option<&Patch>;

    /// Like [`lookup`](Self::lookup) but reports a missing path
    ///
    /// # Errors
    /// [`LookupError::PatchNotFound`] when absent.
    fn require(&self, path: &PatchPath) -> Result<&Patch, LookupError> {
        self.lookup(path)
            .ok_or_else(|| LookupError::PatchNotFound(path.clone()))
    }
}

/// Collection of patches plus metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectDocument", into = "ProjectDocument")]
pub struct Project {
    patches: OrdMap<PatchPath, Patch>,
    authors: Vec<String>,
}

impl Project {
    /// Empty project
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Patches in path order
    pub fn list_patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.values()
    }

    pub fn list_patch_paths(&self) -> impl Iterator<Item = &PatchPath> {
        self.patches.keys()
    }

    #[inline]
    #[must_use]
    pub fn patch(&self, path: &PatchPath) -> Option<&Patch> {
        self.patches.get(path)
    }

    /// # Errors
    /// [`LookupError::PatchNotFound`] when absent.
    pub fn try_patch(&self, path: &PatchPath) -> Result<&Patch, LookupError> {
        self.require(path)
    }

    /// Patch at a path the caller has already checked
    ///
    /// # Panics
    /// Panics when `path` is absent. A missing patch here means the caller's
    /// precondition was wrong and the current operation cannot continue.
    #[must_use]
    pub fn patch_unchecked(&self, path: &PatchPath) -> &Patch {
        match self.patches.get(path) {
            Some(patch) => patch,
            None => panic!("patch '{path}' expected in project but not found"),
        }
    }

    #[inline]
    #[must_use]
    pub fn contains_patch(&self, path: &PatchPath) -> bool {
        self.patches.contains_key(path)
    }

    /// Store `patch` at `path`, replacing any previous patch there
    ///
    /// The stored patch takes `path` as its own path.
    #[must_use]
    pub fn assoc_patch(mut self, path: PatchPath, patch: Patch) -> Self {
        let patch = patch.with_path(path.clone());
        self.patches.insert(path, patch);
        self
    }

    /// Store `patch` at its own path, refusing to overwrite
    ///
    /// # Errors
    /// [`StructuralError::PathConflict`] if the path is taken.
    pub fn insert_patch(self, patch: Patch) -> Result<Self, StructuralError> {
        if self.patches.contains_key(patch.path()) {
            return Err(StructuralError::PathConflict(patch.path().clone()));
        }
        let path = patch.path().clone();
        Ok(self.assoc_patch(path, patch))
    }

    #[must_use]
    pub fn dissoc_patch(mut self, path: &PatchPath) -> Self {
        self.patches.remove(path);
        self
    }

    // ------------------------------------------------------------------
    // Cross-patch queries
    // ------------------------------------------------------------------

    /// Patch that a node inside `patch` instantiates
    ///
    /// # Errors
    /// Fails when the patch, the node or the node's type is missing.
    pub fn resolve_node_type(
        &self,
        patch: &PatchPath,
        node: &NodeId,
    ) -> Result<&Patch, LookupError> {
        let node = self.try_patch(patch)?.try_node(node)?;
        self.try_patch(node.node_type())
    }

    /// Pin `pin` of node `node` inside `patch`
    ///
    /// # Errors
    /// Fails when any part of the chain is missing.
    pub fn resolve_pin(
        &self,
        patch: &PatchPath,
        node: &NodeId,
        pin: &PinKey,
    ) -> Result<Pin, LookupError> {
        let node_type = self.resolve_node_type(patch, node)?;
        node_type.pin(pin).ok_or_else(|| LookupError::PinNotFound {
            patch: node_type.path().clone(),
            pin: pin.clone(),
        })
    }

    /// # Errors
    /// See [`resolve_pin`](Self::resolve_pin).
    pub fn resolve_pin_type(
        &self,
        patch: &PatchPath,
        node: &NodeId,
        pin: &PinKey,
    ) -> Result<DataType, LookupError> {
        self.resolve_pin(patch, node, pin)
            .map(|pin| pin.data_type().clone())
    }

    /// Checks deferred from patch-level mutation
    ///
    /// Every node type must resolve, and every link must run from an output
    /// pin to an input pin that exist on the linked nodes' types.
    /// Terminal node types are built in and need no definition.
    ///
    /// # Errors
    /// Every problem found, in patch order.
    pub fn validate(&self) -> Result<(), Vec<ProjectError>> {
        let mut problems: Vec<ProjectError> = Vec::new();

        for patch in self.patches.values() {
            for node in patch.list_nodes() {
                if !node.is_terminal() && !self.contains_patch(node.node_type()) {
                    problems.push(LookupError::PatchNotFound(node.node_type().clone()).into());
                }
            }

            for link in patch.list_links() {
                let ends = [
                    (link.output(), PinDirection::Output),
                    (link.input(), PinDirection::Input),
                ];
                for (endpoint, expected) in ends {
                    let Some(node) = patch.node(endpoint.node_id()) else {
                        continue;
                    };
                    let Some(node_type) = self.patch(node.node_type()) else {
                        continue;
                    };
                    match node_type.pin(endpoint.pin_key()) {
                        Some(pin) if pin.direction() == expected => {}
                        Some(_) => problems.push(ProjectError::DirectionMismatch {
                            patch: patch.path().clone(),
                            link: link.id().clone(),
                            pin: endpoint.pin_key().clone(),
                        }),
                        None => problems.push(
                            LookupError::PinNotFound {
                                patch: node_type.path().clone(),
                                pin: endpoint.pin_key().clone(),
                            }
                            .into(),
                        ),
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

impl PatchLibrary for Project {
    fn lookup(&self, path: &PatchPath) -> Option<&Patch> {
        self.patches.get(path)
    }
}

impl PatchLibrary for BTreeMap<PatchPath, Patch> {
    fn lookup(&self, path: &PatchPath) -> Option<&Patch> {
        self.get(path)
    }
}

/// Stored project document: `{"patches": {path: patch}, "authors": [..]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ProjectDocument {
    #[serde(default)]
    patches: BTreeMap<PatchPath, PatchDocument>,
    #[serde(default)]
    authors: Vec<String>,
}

impl TryFrom<ProjectDocument> for Project {
    type Error = ProjectError;

    fn try_from(document: ProjectDocument) -> Result<Self, Self::Error> {
        let project = Project {
            patches: OrdMap::new(),
            authors: document.authors,
        };
        document
            .patches
            .into_iter()
            .try_fold(project, |project, (path, patch)| {
                let patch = patch.into_patch(path.clone())?;
                Ok(project.assoc_patch(path, patch))
            })
    }
}

impl From<Project> for ProjectDocument {
    fn from(project: Project) -> Self {
        Self {
            patches: project
                .patches
                .into_iter()
                .map(|(path, patch)| (path, PatchDocument::from(patch)))
                .collect(),
            authors: project.authors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use crate::node::Node;
    use crate::types::Position;

    fn path(s: &str) -> PatchPath {
        PatchPath::new(s).unwrap()
    }

    fn led_patch() -> Patch {
        Patch::new(path("xod/core/led"))
            .assoc_pin(Pin::new("in", "number", PinDirection::Input).unwrap())
            .unwrap()
    }

    fn pot_patch() -> Patch {
        Patch::new(path("xod/core/pot"))
            .assoc_pin(Pin::new("out", "number", PinDirection::Output).unwrap())
            .unwrap()
    }

    fn wired_main() -> Patch {
        let pot = Node::with_id(NodeId::new("p").unwrap(), path("xod/core/pot"), Position::ORIGIN);
        let led = Node::with_id(NodeId::new("l").unwrap(), path("xod/core/led"), Position::ORIGIN);
        Patch::new(path("@/main"))
            .assoc_node(pot)
            .unwrap()
            .assoc_node(led)
            .unwrap()
            .assoc_link(Link::create("in", "l", "out", "p").unwrap())
            .unwrap()
    }

    fn project() -> Project {
        Project::new()
            .assoc_patch(path("xod/core/led"), led_patch())
            .assoc_patch(path("xod/core/pot"), pot_patch())
            .assoc_patch(path("@/main"), wired_main())
    }

    #[test]
    fn assoc_patch_overwrites_and_sets_path() {
        let project = Project::new()
            .assoc_patch(path("@/a"), Patch::new(path("@/elsewhere")).with_label("one"))
            .assoc_patch(path("@/a"), Patch::new(path("@/a")).with_label("two"));
        assert_eq!(project.patch_count(), 1);
        let patch = project.patch(&path("@/a")).unwrap();
        assert_eq!(patch.label(), Some("two"));
        assert_eq!(patch.path(), &path("@/a"));
    }

    #[test]
    fn insert_patch_refuses_conflicts() {
        let project = Project::new().insert_patch(led_patch()).unwrap();
        assert_eq!(
            project.insert_patch(led_patch()).unwrap_err(),
            StructuralError::PathConflict(path("xod/core/led"))
        );
    }

    #[test]
    fn older_values_are_untouched() {
        let before = project();
        let after = before.clone().dissoc_patch(&path("@/main"));
        assert!(before.contains_patch(&path("@/main")));
        assert!(!after.contains_patch(&path("@/main")));
    }

    #[test]
    fn missing_patch_lookup() {
        assert!(project().patch(&path("@/nope")).is_none());
        assert_eq!(
            project().try_patch(&path("@/nope")).unwrap_err(),
            LookupError::PatchNotFound(path("@/nope"))
        );
    }

    #[test]
    #[should_panic(expected = "@/nope")]
    fn unchecked_lookup_panics_on_missing_patch() {
        let _ = project().patch_unchecked(&path("@/nope"));
    }

    #[test]
    fn resolves_pin_types_through_node_types() {
        let project = project();
        let ty = project
            .resolve_pin_type(
                &path("@/main"),
                &NodeId::new("l").unwrap(),
                &PinKey::new("in").unwrap(),
            )
            .unwrap();
        assert_eq!(ty, DataType::Number);
    }

    #[test]
    fn validate_accepts_consistent_project() {
        assert!(project().validate().is_ok());
    }

    #[test]
    fn validate_reports_missing_types_and_pins() {
        let main = wired_main()
            .assoc_link(Link::create("nope", "l", "out", "p").unwrap())
            .unwrap()
            .assoc_node(Node::new(path("xod/core/missing"), Position::ORIGIN))
            .unwrap();
        let project = project().assoc_patch(path("@/main"), main);
        let problems = project.validate().unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems
            .iter()
            .any(|p| matches!(p, ProjectError::Lookup(LookupError::PatchNotFound(_)))));
        assert!(problems
            .iter()
            .any(|p| matches!(p, ProjectError::Lookup(LookupError::PinNotFound { .. }))));
    }

    #[test]
    fn validate_reports_reversed_links() {
        let pot = Node::with_id(NodeId::new("p").unwrap(), path("xod/core/pot"), Position::ORIGIN);
        let led = Node::with_id(NodeId::new("l").unwrap(), path("xod/core/led"), Position::ORIGIN);
        let main = Patch::new(path("@/main"))
            .assoc_node(pot)
            .unwrap()
            .assoc_node(led)
            .unwrap()
            .assoc_link(Link::create("out", "p", "in", "l").unwrap())
            .unwrap();
        let problems = project()
            .assoc_patch(path("@/main"), main)
            .validate()
            .unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems
            .iter()
            .all(|p| matches!(p, ProjectError::DirectionMismatch { .. })));
    }

    #[test]
    fn document_round_trip() {
        let project = project().with_author("Amperka");
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["authors"][0], "Amperka");
        assert!(json["patches"]["@/main"]["nodes"]["l"].is_object());

        let back: Project = serde_json::from_value(json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn loading_rejects_invalid_documents() {
        let json = serde_json::json!({
            "patches": {
                "@/main": {
                    "nodes": {},
                    "links": {
                        "l1": {
                            "id": "l1",
                            "input": { "nodeId": "x", "pinKey": "in" },
                            "output": { "nodeId": "y", "pinKey": "out" }
                        }
                    }
                }
            }
        });
        let err = serde_json::from_value::<Project>(json).unwrap_err();
        assert!(err.to_string().contains("missing node"));
    }

    #[test]
    fn plain_maps_serve_as_libraries() {
        let mut library = BTreeMap::new();
        library.insert(path("xod/core/led"), led_patch());
        assert!(library.lookup(&path("xod/core/led")).is_some());
        assert!(library.require(&path("xod/core/pot")).is_err());
    }
}
