use chrono::{DateTime, Utc};

use crate::logic::{attribute, ApiError};
use crate::model::{BoundingBox, ChangesetId, Member, User};
use crate::store::Dataset;
use crate::xml::{self, OsmDocument};

fn changeset_not_found(id: ChangesetId) -> ApiError {
    ApiError::NotFound(format!("The changeset with the id {id} was not found"))
}

fn not_owner() -> ApiError {
    ApiError::Conflict("The user doesn't own that changeset".to_string())
}

/// Check that `actor` may add an edit to the changeset named in a payload:
/// it must be given, exist, belong to the actor and be open
pub fn check_writable(
    dataset: &Dataset,
    changeset_id: Option<ChangesetId>,
    actor: &User,
) -> Result<ChangesetId, ApiError> {
    let id = changeset_id.ok_or_else(ApiError::changeset_missing)?;
    let changeset = dataset
        .changeset(id)
        .filter(|c| c.user_id == actor.id)
        .ok_or_else(not_owner)?;

    if let Some(closed_at) = changeset.closed_at {
        return Err(ApiError::Conflict(format!(
            "The changeset {id} was closed at {}",
            closed_at.to_rfc3339()
        )));
    }
    let max = dataset.max_changeset_elements();
    if !changeset.is_open(max) {
        return Err(ApiError::Conflict(format!(
            "The changeset {id} has reached its limit of {max} changes"
        )));
    }
    Ok(id)
}

/// Count one edit against the changeset and grow its box
pub fn record_change(
    dataset: &mut Dataset,
    changeset_id: ChangesetId,
    bbox: Option<BoundingBox>,
) -> Result<(), ApiError> {
    let changeset = dataset
        .changeset_mut(changeset_id)
        .ok_or_else(|| anyhow::anyhow!("changeset {changeset_id} vanished during an edit"))?;
    changeset.record_change(bbox);
    Ok(())
}

/// Box covering the nodes and ways among `members`
pub fn members_bbox<'a, I>(dataset: &Dataset, members: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a Member>,
{
    BoundingBox::enclosing(members.into_iter().filter_map(|m| dataset.member_bbox(m)))
}

pub fn create(
    dataset: &mut Dataset,
    actor: &User,
    body: &str,
    now: DateTime<Utc>,
) -> Result<ChangesetId, ApiError> {
    let payload = xml::parse_changeset(body)?;
    let id = dataset.create_changeset(actor.id, payload.tags, now);
    log::info!("user {} opened changeset {}", actor.id, id);
    Ok(id)
}

pub fn read(dataset: &Dataset, id: ChangesetId) -> Result<OsmDocument, ApiError> {
    let changeset = dataset
        .changeset(id)
        .cloned()
        .ok_or_else(|| changeset_not_found(id))?;
    let mut document = OsmDocument {
        changesets: vec![changeset],
        ..OsmDocument::default()
    };
    attribute(dataset, &mut document);
    Ok(document)
}

pub fn close(
    dataset: &mut Dataset,
    actor: &User,
    id: ChangesetId,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let changeset = dataset
        .changeset_mut(id)
        .ok_or_else(|| changeset_not_found(id))?;
    if changeset.user_id != actor.id {
        return Err(not_owner());
    }
    if let Some(closed_at) = changeset.closed_at {
        return Err(ApiError::Conflict(format!(
            "The changeset {id} was closed at {}",
            closed_at.to_rfc3339()
        )));
    }
    changeset.close(now);
    log::info!("user {} closed changeset {}", actor.id, id);
    Ok(())
}
