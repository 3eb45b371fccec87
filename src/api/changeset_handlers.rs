use axum::extract::{Path, State};
use chrono::Utc;

use crate::api::auth::BasicAuth;
use crate::api::handlers::AppState;
use crate::api::response::Xml;
use crate::logic::{auth, changeset_ops, diff_upload, ApiError};
use crate::model::ChangesetId;
use crate::store::traits::Store;

pub async fn create_changeset<S: Store>(
    State(store): State<AppState<S>>,
    BasicAuth(credentials): BasicAuth,
    body: String,
) -> Result<String, ApiError> {
    let id = store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            changeset_ops::create(ds, &actor, &body, Utc::now())
        })
        .await?;
    Ok(id.to_string())
}

pub async fn get_changeset<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ChangesetId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&changeset_ops::read(ds, id)?, ds.max_changeset_elements()))
        .await
}

pub async fn close_changeset<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ChangesetId>,
    BasicAuth(credentials): BasicAuth,
) -> Result<(), ApiError> {
    store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            changeset_ops::close(ds, &actor, id, Utc::now())
        })
        .await
}

/// POST /changeset/{id}/upload with an osmChange body
pub async fn upload_changeset<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ChangesetId>,
    BasicAuth(credentials): BasicAuth,
    body: String,
) -> Result<Xml, ApiError> {
    let results = store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            diff_upload::upload(ds, &actor, id, &body, Utc::now())
        })
        .await?;
    Xml::diff_result(&results)
}
