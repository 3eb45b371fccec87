use chrono::{DateTime, Utc};

use crate::model::{
    scale_coordinate, ChangesetId, Credentials, ElementId, ElementKind, Member, Relation, Tags,
    User,
};
use crate::store::{Dataset, MemoryStore};

/// Password given to every user created through a [`Fixture`]
pub const FIXTURE_PASSWORD: &str = "test";

/// Builds a dataset directly, skipping the checks the API applies. Nodes,
/// ways and relations without an explicit author go into a changeset owned
/// by a `fixtures` user.
#[derive(Debug)]
pub struct Fixture {
    dataset: Dataset,
    now: DateTime<Utc>,
    system_changeset: Option<ChangesetId>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_dataset(Dataset::default())
    }

    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset,
            now: Utc::now(),
            system_changeset: None,
        }
    }

    pub fn user(&mut self, name: &str) -> User {
        self.dataset
            .insert_user(name, &format!("{name}@example.com"), FIXTURE_PASSWORD, true)
    }

    /// A user whose edits are not public
    pub fn private_user(&mut self, name: &str) -> User {
        self.dataset
            .insert_user(name, &format!("{name}@example.com"), FIXTURE_PASSWORD, false)
    }

    pub fn credentials(user: &User) -> Credentials {
        Credentials::new(user.email.clone(), FIXTURE_PASSWORD)
    }

    pub fn changeset(&mut self, owner: &User) -> ChangesetId {
        self.dataset
            .create_changeset(owner.id, Tags::new(), self.now)
    }

    pub fn closed_changeset(&mut self, owner: &User) -> ChangesetId {
        let id = self.changeset(owner);
        if let Some(changeset) = self.dataset.changeset_mut(id) {
            changeset.close(self.now);
        }
        id
    }

    fn system_changeset(&mut self) -> ChangesetId {
        if let Some(id) = self.system_changeset {
            return id;
        }
        let owner = self.user("fixtures");
        let id = self.changeset(&owner);
        self.system_changeset = Some(id);
        id
    }

    pub fn node(&mut self, lat: f64, lon: f64) -> ElementId {
        self.tagged_node(lat, lon, Tags::new())
    }

    pub fn tagged_node(&mut self, lat: f64, lon: f64, tags: Tags) -> ElementId {
        let changeset = self.system_changeset();
        self.dataset.create_node(
            changeset,
            scale_coordinate(lat),
            scale_coordinate(lon),
            tags,
            self.now,
        )
    }

    pub fn deleted_node(&mut self, lat: f64, lon: f64) -> ElementId {
        let id = self.node(lat, lon);
        let changeset = self.system_changeset();
        self.dataset.delete_node(id, changeset, self.now);
        id
    }

    pub fn way(&mut self, nodes: &[ElementId]) -> ElementId {
        self.tagged_way(nodes, Tags::new())
    }

    pub fn tagged_way(&mut self, nodes: &[ElementId], tags: Tags) -> ElementId {
        let changeset = self.system_changeset();
        self.dataset
            .create_way(changeset, nodes.to_vec(), tags, self.now)
    }

    pub fn relation(&mut self) -> RelationBuilder<'_> {
        RelationBuilder {
            fixture: self,
            changeset: None,
            members: Vec::new(),
            tags: Tags::new(),
            deleted: false,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    pub fn into_store(self) -> MemoryStore {
        MemoryStore::with_dataset(self.dataset)
    }
}

/// A relation under construction; stored by [`RelationBuilder::build`]
pub struct RelationBuilder<'a> {
    fixture: &'a mut Fixture,
    changeset: Option<ChangesetId>,
    members: Vec<Member>,
    tags: Tags,
    deleted: bool,
}

impl RelationBuilder<'_> {
    pub fn member(mut self, kind: ElementKind, reference: ElementId, role: &str) -> Self {
        self.members.push(Member::new(kind, reference, role));
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Write the relation in a fresh changeset owned by `author`
    pub fn by(mut self, author: &User) -> Self {
        self.changeset = Some(self.fixture.changeset(author));
        self
    }

    /// Store a second, deleted version after the first
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn build(self) -> ElementId {
        let changeset = match self.changeset {
            Some(id) => id,
            None => self.fixture.system_changeset(),
        };
        let now = self.fixture.now;
        let dataset = &mut self.fixture.dataset;

        let id = dataset.allocate_relation_id();
        let relation = Relation::new(id, changeset, self.members, self.tags, now);
        let tombstone = self.deleted.then(|| relation.tombstone(changeset, now));
        dataset.put_relation(relation);
        if let Some(tombstone) = tombstone {
            dataset.put_relation(tombstone);
        }
        id
    }
}
