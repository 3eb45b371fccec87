use serde::{Deserialize, Serialize};

use crate::model::{ElementId, RelationPayload, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Create,
    Modify,
    Delete,
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChangeOperation::Create => write!(f, "create"),
            ChangeOperation::Modify => write!(f, "modify"),
            ChangeOperation::Delete => write!(f, "delete"),
        }
    }
}

/// One element inside a create/modify/delete block of an osmChange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAction {
    pub operation: ChangeOperation,
    /// Only meaningful for deletes: skip elements that are still in use
    pub if_unused: bool,
    pub relation: RelationPayload,
}

/// Parsed osmChange document, actions in document order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmChange {
    pub actions: Vec<ChangeAction>,
}

impl OsmChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, relation: RelationPayload) -> Self {
        self.push(ChangeOperation::Create, relation, false);
        self
    }

    pub fn modify(mut self, relation: RelationPayload) -> Self {
        self.push(ChangeOperation::Modify, relation, false);
        self
    }

    pub fn delete(mut self, relation: RelationPayload, if_unused: bool) -> Self {
        self.push(ChangeOperation::Delete, relation, if_unused);
        self
    }

    fn push(&mut self, operation: ChangeOperation, relation: RelationPayload, if_unused: bool) {
        self.actions.push(ChangeAction {
            operation,
            if_unused,
            relation,
        });
    }
}

/// Per-element outcome of a diff upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub old_id: ElementId,
    pub new_id: Option<ElementId>,
    pub new_version: Option<Version>,
}
