use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::logic::changeset_ops::{check_writable, members_bbox, record_change};
use crate::logic::ApiError;
use crate::model::{
    BoundingBox, ElementId, ElementKind, ElementRef, Member, Relation, RelationPayload, User,
    Version,
};
use crate::store::Dataset;
use crate::xml;

/// What happened to a relation named in a delete
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(Relation),
    /// `if-unused` delete of a relation that is still referenced
    Kept(Relation),
}

/// Every member must point at an existing, visible element
fn check_members(dataset: &Dataset, relation_id: Option<ElementId>, members: &[Member]) -> Result<(), ApiError> {
    for member in members {
        if dataset.element_visibility(&member.element()) != Some(true) {
            return Err(ApiError::PreconditionFailed(format!(
                "Relation with id {} cannot be saved due to {}",
                relation_id.map(|id| id.to_string()).unwrap_or_default(),
                member.element()
            )));
        }
    }
    Ok(())
}

fn check_path_id(path_id: ElementId, payload: &RelationPayload) -> Result<(), ApiError> {
    if payload.id == Some(path_id) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "The id in the url ({path_id}) is not the same as provided in the xml ({})",
        payload.id.map(|id| id.to_string()).unwrap_or_default()
    )))
}

fn current_relation(dataset: &Dataset, id: ElementId) -> Result<Relation, ApiError> {
    dataset
        .relation(id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(ElementKind::Relation, id))
}

fn check_version(current: &Relation, provided: Option<Version>, action: &str) -> Result<(), ApiError> {
    let provided = provided
        .ok_or_else(|| ApiError::BadRequest(format!("Version is required when {action}")))?;
    if provided != current.version {
        return Err(ApiError::version_mismatch(
            ElementRef::relation(current.id),
            provided,
            current.version,
        ));
    }
    Ok(())
}

/// Area an update touched. A tag change touches every member of both
/// versions; otherwise only members that were added or removed count.
fn update_bbox(dataset: &Dataset, old: &Relation, new: &Relation) -> Option<BoundingBox> {
    if old.tags != new.tags {
        return members_bbox(dataset, old.members.iter().chain(new.members.iter()));
    }
    let before: HashSet<&Member> = old.members.iter().collect();
    let after: HashSet<&Member> = new.members.iter().collect();
    let removed = old.members.iter().filter(|m| !after.contains(m));
    let added = new.members.iter().filter(|m| !before.contains(m));
    members_bbox(dataset, removed.chain(added))
}

/// PUT /relation/create
pub fn create(dataset: &mut Dataset, actor: &User, body: &str, now: DateTime<Utc>) -> Result<ElementId, ApiError> {
    let payload = xml::parse_relation(body)?;
    apply_create(dataset, actor, payload, now).map(|r| r.id)
}

/// PUT /relation/{id}
pub fn update(
    dataset: &mut Dataset,
    actor: &User,
    id: ElementId,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Version, ApiError> {
    current_relation(dataset, id)?;
    let payload = xml::parse_relation(body)?;
    check_path_id(id, &payload)?;
    apply_update(dataset, actor, id, payload, now).map(|r| r.version)
}

/// DELETE /relation/{id}
pub fn delete(
    dataset: &mut Dataset,
    actor: &User,
    id: ElementId,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Version, ApiError> {
    current_relation(dataset, id)?;
    let payload = xml::parse_relation(body)?;
    check_path_id(id, &payload)?;
    match apply_delete(dataset, actor, id, payload, false, now)? {
        DeleteOutcome::Deleted(relation) | DeleteOutcome::Kept(relation) => Ok(relation.version),
    }
}

pub fn apply_create(
    dataset: &mut Dataset,
    actor: &User,
    payload: RelationPayload,
    now: DateTime<Utc>,
) -> Result<Relation, ApiError> {
    let changeset_id = check_writable(dataset, payload.changeset, actor)?;
    check_members(dataset, None, &payload.members)?;

    let id = dataset.allocate_relation_id();
    let relation = Relation::new(id, changeset_id, payload.members, payload.tags, now);
    let bbox = members_bbox(dataset, &relation.members);
    dataset.put_relation(relation.clone());
    record_change(dataset, changeset_id, bbox)?;

    log::info!(
        "created relation {} with {} members in changeset {}",
        id,
        relation.members.len(),
        changeset_id
    );
    Ok(relation)
}

pub fn apply_update(
    dataset: &mut Dataset,
    actor: &User,
    id: ElementId,
    payload: RelationPayload,
    now: DateTime<Utc>,
) -> Result<Relation, ApiError> {
    let current = current_relation(dataset, id)?;
    if !current.visible {
        return Err(ApiError::gone(ElementKind::Relation, id));
    }
    let changeset_id = check_writable(dataset, payload.changeset, actor)?;
    check_version(&current, payload.version, "updating")?;
    check_members(dataset, Some(id), &payload.members)?;

    let next = current.next_version(changeset_id, payload.members, payload.tags, now);
    let bbox = update_bbox(dataset, &current, &next);
    dataset.put_relation(next.clone());
    record_change(dataset, changeset_id, bbox)?;

    log::info!(
        "updated relation {} to v{} in changeset {}",
        id,
        next.version,
        changeset_id
    );
    Ok(next)
}

pub fn apply_delete(
    dataset: &mut Dataset,
    actor: &User,
    id: ElementId,
    payload: RelationPayload,
    if_unused: bool,
    now: DateTime<Utc>,
) -> Result<DeleteOutcome, ApiError> {
    let current = current_relation(dataset, id)?;
    if !current.visible {
        return Err(ApiError::gone(ElementKind::Relation, id));
    }
    let changeset_id = check_writable(dataset, payload.changeset, actor)?;
    check_version(&current, payload.version, "deleting")?;

    let parent = dataset
        .relations_with_member(&ElementRef::relation(id))
        .first()
        .map(|r| r.id);
    if let Some(parent) = parent {
        if if_unused {
            log::debug!("kept relation {} still used by relation {}", id, parent);
            return Ok(DeleteOutcome::Kept(current));
        }
        return Err(ApiError::PreconditionFailed(format!(
            "The relation {id} is used in relation {parent}."
        )));
    }

    let tombstone = current.tombstone(changeset_id, now);
    let bbox = members_bbox(dataset, &current.members);
    dataset.put_relation(tombstone.clone());
    record_change(dataset, changeset_id, bbox)?;

    log::info!(
        "deleted relation {} at v{} in changeset {}",
        id,
        tombstone.version,
        changeset_id
    );
    Ok(DeleteOutcome::Deleted(tombstone))
}
