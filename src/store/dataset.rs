use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::{
    BoundingBox, Changeset, ChangesetId, ElementId, ElementKind, ElementRef, Member, Node,
    Relation, Tags, User, UserId, Version, Way,
};
use crate::store::MembershipIndex;

/// Default number of edits a changeset accepts before it is considered closed
pub const DEFAULT_MAX_CHANGESET_ELEMENTS: u64 = 10_000;

#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i64,
    changeset: i64,
    node: i64,
    way: i64,
    relation: i64,
}

impl Sequences {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// The versioned entity store. Each element id maps to its full history,
/// oldest first; the last entry is the current version. Nothing is ever
/// physically removed.
#[derive(Debug, Clone)]
pub struct Dataset {
    max_changeset_elements: u64,
    users: BTreeMap<UserId, User>,
    changesets: BTreeMap<ChangesetId, Changeset>,
    nodes: BTreeMap<ElementId, Vec<Node>>,
    ways: BTreeMap<ElementId, Vec<Way>>,
    relations: BTreeMap<ElementId, Vec<Relation>>,
    memberships: MembershipIndex,
    sequences: Sequences,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHANGESET_ELEMENTS)
    }
}

impl Dataset {
    pub fn new(max_changeset_elements: u64) -> Self {
        Self {
            max_changeset_elements,
            users: BTreeMap::new(),
            changesets: BTreeMap::new(),
            nodes: BTreeMap::new(),
            ways: BTreeMap::new(),
            relations: BTreeMap::new(),
            memberships: MembershipIndex::new(),
            sequences: Sequences::default(),
        }
    }

    pub fn max_changeset_elements(&self) -> u64 {
        self.max_changeset_elements
    }

    // Users

    pub fn insert_user(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
        data_public: bool,
    ) -> User {
        let id = Sequences::next(&mut self.sequences.user);
        let user = User::new(
            id,
            display_name.to_string(),
            email.to_string(),
            password,
            data_public,
        );
        self.users.insert(id, user.clone());
        user
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn find_user_by_login(&self, login: &str) -> Option<&User> {
        self.users.values().find(|u| u.matches_login(login))
    }

    // Changesets

    pub fn create_changeset(&mut self, user_id: UserId, tags: Tags, now: DateTime<Utc>) -> ChangesetId {
        let id = Sequences::next(&mut self.sequences.changeset);
        self.changesets
            .insert(id, Changeset::new(id, user_id, tags, now));
        id
    }

    pub fn changeset(&self, id: ChangesetId) -> Option<&Changeset> {
        self.changesets.get(&id)
    }

    pub fn changeset_mut(&mut self, id: ChangesetId) -> Option<&mut Changeset> {
        self.changesets.get_mut(&id)
    }

    /// Owner of the changeset an element version was written in
    pub fn author_of(&self, changeset_id: ChangesetId) -> Option<&User> {
        self.changeset(changeset_id)
            .and_then(|c| self.user(c.user_id))
    }

    // Nodes and ways. These are only written by fixtures and seed data.

    pub fn create_node(
        &mut self,
        changeset_id: ChangesetId,
        lat: i64,
        lon: i64,
        tags: Tags,
        now: DateTime<Utc>,
    ) -> ElementId {
        let id = Sequences::next(&mut self.sequences.node);
        let node = Node {
            id,
            version: 1,
            visible: true,
            changeset_id,
            timestamp: now,
            lat,
            lon,
            tags,
        };
        self.nodes.insert(id, vec![node]);
        id
    }

    pub fn create_way(
        &mut self,
        changeset_id: ChangesetId,
        nodes: Vec<ElementId>,
        tags: Tags,
        now: DateTime<Utc>,
    ) -> ElementId {
        let id = Sequences::next(&mut self.sequences.way);
        let way = Way {
            id,
            version: 1,
            visible: true,
            changeset_id,
            timestamp: now,
            nodes,
            tags,
        };
        self.ways.insert(id, vec![way]);
        id
    }

    /// Append a deleted version of a node; returns false if it doesn't exist
    pub fn delete_node(&mut self, id: ElementId, changeset_id: ChangesetId, now: DateTime<Utc>) -> bool {
        let Some(history) = self.nodes.get_mut(&id) else {
            return false;
        };
        let Some(current) = history.last() else {
            return false;
        };
        let deleted = Node {
            version: current.version + 1,
            visible: false,
            changeset_id,
            timestamp: now,
            tags: Tags::new(),
            ..current.clone()
        };
        history.push(deleted);
        true
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id).and_then(|h| h.last())
    }

    pub fn way(&self, id: ElementId) -> Option<&Way> {
        self.ways.get(&id).and_then(|h| h.last())
    }

    // Relations

    pub fn allocate_relation_id(&mut self) -> ElementId {
        Sequences::next(&mut self.sequences.relation)
    }

    pub fn relation(&self, id: ElementId) -> Option<&Relation> {
        self.relations.get(&id).and_then(|h| h.last())
    }

    pub fn relation_version(&self, id: ElementId, version: Version) -> Option<&Relation> {
        self.relations
            .get(&id)
            .and_then(|h| h.iter().find(|r| r.version == version))
    }

    pub fn relation_history(&self, id: ElementId) -> Option<&[Relation]> {
        self.relations.get(&id).map(|h| h.as_slice())
    }

    /// Append `relation` as the new current version of its id and re-point
    /// the membership index at it. Version checks are the caller's job.
    pub fn put_relation(&mut self, relation: Relation) {
        let history = self.relations.entry(relation.id).or_default();
        let previous: &[Member] = history.last().map(|r| r.members.as_slice()).unwrap_or(&[]);
        self.memberships
            .replace(relation.id, previous, &relation.members);
        log::debug!(
            "stored relation {} v{} ({} members)",
            relation.id,
            relation.version,
            relation.members.len()
        );
        history.push(relation);
    }

    /// Visible relations whose current version lists `element` directly,
    /// ordered by id
    pub fn relations_with_member(&self, element: &ElementRef) -> Vec<&Relation> {
        self.memberships
            .relations_for(element)
            .filter_map(|id| self.relation(id))
            .filter(|r| r.visible)
            .collect()
    }

    // Shared element queries

    /// `Some(visible)` for a known element, `None` for an unknown one
    pub fn element_visibility(&self, element: &ElementRef) -> Option<bool> {
        match element.kind {
            ElementKind::Node => self.node(element.id).map(|n| n.visible),
            ElementKind::Way => self.way(element.id).map(|w| w.visible),
            ElementKind::Relation => self.relation(element.id).map(|r| r.visible),
        }
    }

    /// Box of a way's current, visible nodes
    pub fn way_bbox(&self, way: &Way) -> Option<BoundingBox> {
        BoundingBox::enclosing(
            way.nodes
                .iter()
                .filter_map(|id| self.node(*id))
                .filter(|n| n.visible)
                .map(|n| BoundingBox::point(n.lat, n.lon)),
        )
    }

    /// The area a member covers. Relations cover nothing; their own members
    /// are not followed.
    pub fn member_bbox(&self, member: &Member) -> Option<BoundingBox> {
        match member.kind {
            ElementKind::Node => self
                .node(member.reference)
                .filter(|n| n.visible)
                .map(|n| BoundingBox::point(n.lat, n.lon)),
            ElementKind::Way => self
                .way(member.reference)
                .filter(|w| w.visible)
                .and_then(|w| self.way_bbox(w)),
            ElementKind::Relation => None,
        }
    }
}
