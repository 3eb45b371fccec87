use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::logic::relation_ops::{apply_create, apply_delete, apply_update, DeleteOutcome};
use crate::logic::{changeset_ops, ApiError};
use crate::model::{ChangeOperation, ChangesetId, DiffResult, ElementId, ElementKind, RelationPayload, User};
use crate::store::Dataset;
use crate::xml;

/// Ids handed out for the placeholders of one upload
#[derive(Debug, Default)]
struct Placeholders {
    assigned: HashMap<ElementId, ElementId>,
}

impl Placeholders {
    fn assign(&mut self, placeholder: ElementId, id: ElementId) -> Result<(), ApiError> {
        if self.assigned.insert(placeholder, id).is_some() {
            return Err(ApiError::BadRequest(format!(
                "Placeholder id {placeholder} is used by more than one created relation"
            )));
        }
        Ok(())
    }

    /// Map a negative id to the relation created for it
    fn resolve(&self, id: ElementId) -> Result<ElementId, ApiError> {
        if id >= 0 {
            return Ok(id);
        }
        self.assigned.get(&id).copied().ok_or_else(|| {
            ApiError::BadRequest(format!("Placeholder relation not found for reference {id}"))
        })
    }

    fn resolve_members(&self, payload: &mut RelationPayload) -> Result<(), ApiError> {
        for member in payload
            .members
            .iter_mut()
            .filter(|m| m.kind == ElementKind::Relation)
        {
            member.reference = self.resolve(member.reference)?;
        }
        Ok(())
    }
}

fn check_changeset(payload: &RelationPayload, changeset_id: ChangesetId) -> Result<(), ApiError> {
    match payload.changeset {
        Some(provided) if provided == changeset_id => Ok(()),
        Some(provided) => Err(ApiError::Conflict(format!(
            "Changeset mismatch: Provided {provided} but only {changeset_id} is allowed"
        ))),
        None => Err(ApiError::changeset_missing()),
    }
}

fn existing_id(payload: &RelationPayload) -> Result<ElementId, ApiError> {
    payload.id.ok_or_else(|| {
        ApiError::BadRequest("Relations in modify and delete blocks need an id".to_string())
    })
}

/// Apply an osmChange document to the changeset. Elements are processed in
/// document order on a copy of the dataset, which replaces the live one only
/// if every element succeeds.
pub fn upload(
    dataset: &mut Dataset,
    actor: &User,
    changeset_id: ChangesetId,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Vec<DiffResult>, ApiError> {
    if dataset.changeset(changeset_id).is_none() {
        return Err(ApiError::NotFound(format!(
            "The changeset with the id {changeset_id} was not found"
        )));
    }
    changeset_ops::check_writable(dataset, Some(changeset_id), actor)?;
    let change = xml::parse_osm_change(body)?;

    let mut scratch = dataset.clone();
    let mut placeholders = Placeholders::default();
    let mut results = Vec::with_capacity(change.actions.len());

    for action in change.actions {
        let mut payload = action.relation;
        check_changeset(&payload, changeset_id)?;
        placeholders.resolve_members(&mut payload)?;

        let result = match action.operation {
            ChangeOperation::Create => {
                let old_id = payload.id.unwrap_or_default();
                let created = apply_create(&mut scratch, actor, payload, now)?;
                placeholders.assign(old_id, created.id)?;
                DiffResult {
                    old_id,
                    new_id: Some(created.id),
                    new_version: Some(created.version),
                }
            }
            ChangeOperation::Modify => {
                let old_id = existing_id(&payload)?;
                let id = placeholders.resolve(old_id)?;
                let updated = apply_update(&mut scratch, actor, id, payload, now)?;
                DiffResult {
                    old_id,
                    new_id: Some(updated.id),
                    new_version: Some(updated.version),
                }
            }
            ChangeOperation::Delete => {
                let old_id = existing_id(&payload)?;
                let id = placeholders.resolve(old_id)?;
                match apply_delete(&mut scratch, actor, id, payload, action.if_unused, now)? {
                    DeleteOutcome::Deleted(_) => DiffResult {
                        old_id,
                        new_id: None,
                        new_version: None,
                    },
                    DeleteOutcome::Kept(current) => DiffResult {
                        old_id,
                        new_id: Some(current.id),
                        new_version: Some(current.version),
                    },
                }
            }
        };
        results.push(result);
    }

    *dataset = scratch;
    log::info!(
        "user {} uploaded {} relation changes to changeset {}",
        actor.id,
        results.len(),
        changeset_id
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::relation_queries;
    use crate::model::{Member, OsmChange};
    use crate::seed::Fixture;
    use crate::xml::render_osm_change;

    struct Upload {
        fx: Fixture,
        user: User,
        changeset: ChangesetId,
    }

    fn setup() -> Upload {
        let mut fx = Fixture::new();
        let user = fx.user("uploader");
        let changeset = fx.changeset(&user);
        Upload { fx, user, changeset }
    }

    impl Upload {
        fn send(&mut self, change: &OsmChange) -> Result<Vec<DiffResult>, ApiError> {
            let body = render_osm_change(change).unwrap();
            upload(self.fx.dataset_mut(), &self.user, self.changeset, &body, Utc::now())
        }

        fn payload(&self, id: ElementId) -> RelationPayload {
            RelationPayload::from(self.fx.dataset().relation(id).unwrap()).in_changeset(self.changeset)
        }
    }

    #[test]
    fn placeholders_resolve_to_new_ids_within_one_upload() {
        let mut up = setup();
        let node = up.fx.node(1.0, 2.0);
        let change = OsmChange::new()
            .create(
                RelationPayload::new()
                    .with_id(-1)
                    .in_changeset(up.changeset)
                    .member(ElementKind::Node, node, "stop"),
            )
            .create(
                RelationPayload::new()
                    .with_id(-2)
                    .in_changeset(up.changeset)
                    .member(ElementKind::Relation, -1, "child"),
            );

        let results = up.send(&change).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].old_id, -1);
        let child = results[0].new_id.unwrap();
        let parent = results[1].new_id.unwrap();
        assert_eq!(results[1].new_version, Some(1));

        let members = &up.fx.dataset().relation(parent).unwrap().members;
        assert_eq!(members, &vec![Member::new(ElementKind::Relation, child, "child")]);
        let changeset = up.fx.dataset().changeset(up.changeset).unwrap();
        assert_eq!(changeset.num_changes, 2);
    }

    #[test]
    fn modify_and_delete_report_versions() {
        let mut up = setup();
        let modified = up.fx.relation().tag("name", "old").build();
        let deleted = up.fx.relation().build();

        let change = OsmChange::new()
            .modify(up.payload(modified).tag("name", "new"))
            .delete(up.payload(deleted), false);
        let results = up.send(&change).unwrap();

        assert_eq!(
            results,
            vec![
                DiffResult { old_id: modified, new_id: Some(modified), new_version: Some(2) },
                DiffResult { old_id: deleted, new_id: None, new_version: None },
            ]
        );
        let ds = up.fx.dataset();
        let read = relation_queries::read(ds, modified).unwrap();
        assert_eq!(read.relations[0].tags["name"], "new");
        let history = relation_queries::history(ds, modified).unwrap();
        assert_eq!(history.relations[1].tags["name"], "new");
        assert!(matches!(relation_queries::read(ds, deleted), Err(ApiError::Gone(_))));
    }

    #[test]
    fn failed_upload_leaves_the_store_untouched() {
        let mut up = setup();
        let existing = up.fx.relation().tag("name", "before").build();
        let change = OsmChange::new()
            .modify(up.payload(existing).tag("name", "after"))
            .create(
                RelationPayload::new()
                    .with_id(-1)
                    .in_changeset(up.changeset)
                    .member(ElementKind::Node, 4242, ""),
            );

        assert!(matches!(up.send(&change), Err(ApiError::PreconditionFailed(_))));
        let ds = up.fx.dataset();
        assert_eq!(ds.relation(existing).unwrap().tags["name"], "before");
        assert_eq!(ds.relation(existing).unwrap().version, 1);
        assert_eq!(ds.changeset(up.changeset).unwrap().num_changes, 0);
    }

    #[test]
    fn elements_must_name_the_upload_changeset() {
        let mut up = setup();
        let other = up.fx.changeset(&up.user);
        let change = OsmChange::new().create(RelationPayload::new().with_id(-1).in_changeset(other));

        let err = up.send(&change).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(err.to_string().starts_with("Changeset mismatch"), "{err}");
    }

    #[test]
    fn if_unused_delete_keeps_referenced_relations() {
        let mut up = setup();
        let used = up.fx.relation().build();
        up.fx.relation().member(ElementKind::Relation, used, "").build();

        let results = up
            .send(&OsmChange::new().delete(up.payload(used), true))
            .unwrap();
        assert_eq!(results[0].new_id, Some(used));
        assert_eq!(results[0].new_version, Some(1));
        assert!(up.fx.dataset().relation(used).unwrap().visible);

        let err = up
            .send(&OsmChange::new().delete(up.payload(used), false))
            .unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed(_)));
    }

    #[test]
    fn unknown_placeholders_and_changesets_are_rejected() {
        let mut up = setup();
        let change = OsmChange::new().create(
            RelationPayload::new()
                .with_id(-1)
                .in_changeset(up.changeset)
                .member(ElementKind::Relation, -7, ""),
        );
        assert!(matches!(up.send(&change), Err(ApiError::BadRequest(_))));

        let body = render_osm_change(&OsmChange::new()).unwrap();
        let err = upload(up.fx.dataset_mut(), &up.user, 999, &body, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn node_elements_are_not_accepted() {
        let mut up = setup();
        let body = format!(
            "<osmChange><create><node id='-1' changeset='{}' lat='0' lon='0'/></create></osmChange>",
            up.changeset
        );
        let err = upload(up.fx.dataset_mut(), &up.user, up.changeset, &body, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
