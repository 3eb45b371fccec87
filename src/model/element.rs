use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ChangesetId, ElementId, ElementKind, ElementRef, Version};

/// Key/value tags; keys are unique per element
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ElementId,
    pub version: Version,
    pub visible: bool,
    pub changeset_id: ChangesetId,
    pub timestamp: DateTime<Utc>,
    /// Scaled latitude, see `COORDINATE_SCALE`
    pub lat: i64,
    /// Scaled longitude
    pub lon: i64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: ElementId,
    pub version: Version,
    pub visible: bool,
    pub changeset_id: ChangesetId,
    pub timestamp: DateTime<Utc>,
    pub nodes: Vec<ElementId>,
    pub tags: Tags,
}

/// One entry of a relation's member list. Its sequence is its position in
/// the list; the same (kind, ref, role) may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub kind: ElementKind,
    #[serde(rename = "ref")]
    pub reference: ElementId,
    pub role: String,
}

impl Member {
    pub fn new(kind: ElementKind, reference: ElementId, role: impl Into<String>) -> Self {
        Self {
            kind,
            reference,
            role: role.into(),
        }
    }

    pub fn element(&self) -> ElementRef {
        ElementRef::new(self.kind, self.reference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: ElementId,
    pub version: Version,
    pub visible: bool,
    pub changeset_id: ChangesetId,
    pub timestamp: DateTime<Utc>,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl Relation {
    pub fn new(
        id: ElementId,
        changeset_id: ChangesetId,
        members: Vec<Member>,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            version: 1,
            visible: true,
            changeset_id,
            timestamp,
            members,
            tags,
        }
    }

    /// The version that follows this one with new content
    pub fn next_version(
        &self,
        changeset_id: ChangesetId,
        members: Vec<Member>,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: self.id,
            version: self.version + 1,
            visible: true,
            changeset_id,
            timestamp,
            members,
            tags,
        }
    }

    /// The deleted version that follows this one
    pub fn tombstone(&self, changeset_id: ChangesetId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            version: self.version + 1,
            visible: false,
            changeset_id,
            timestamp,
            members: Vec::new(),
            tags: Tags::new(),
        }
    }
}

/// A relation as submitted by a client. Every field is optional on the wire;
/// the operations decide which ones they need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationPayload {
    pub id: Option<ElementId>,
    pub version: Option<Version>,
    pub changeset: Option<ChangesetId>,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl RelationPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn in_changeset(mut self, changeset: ChangesetId) -> Self {
        self.changeset = Some(changeset);
        self
    }

    pub fn member(mut self, kind: ElementKind, reference: ElementId, role: &str) -> Self {
        self.members.push(Member::new(kind, reference, role));
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn without_members(mut self) -> Self {
        self.members.clear();
        self
    }

    pub fn without_member(mut self, kind: ElementKind, reference: ElementId) -> Self {
        self.members
            .retain(|m| !(m.kind == kind && m.reference == reference));
        self
    }
}

impl From<&Relation> for RelationPayload {
    fn from(relation: &Relation) -> Self {
        Self {
            id: Some(relation.id),
            version: Some(relation.version),
            changeset: Some(relation.changeset_id),
            members: relation.members.clone(),
            tags: relation.tags.clone(),
        }
    }
}
