use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;

use crate::api::auth::BasicAuth;
use crate::api::handlers::AppState;
use crate::api::response::Xml;
use crate::logic::{auth, relation_ops, relation_queries, ApiError};
use crate::model::{ElementId, Version};
use crate::store::traits::Store;

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub relations: Option<String>,
}

pub async fn create_relation<S: Store>(
    State(store): State<AppState<S>>,
    BasicAuth(credentials): BasicAuth,
    body: String,
) -> Result<String, ApiError> {
    let id = store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            relation_ops::create(ds, &actor, &body, Utc::now())
        })
        .await?;
    Ok(id.to_string())
}

pub async fn get_relation<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&relation_queries::read(ds, id)?, ds.max_changeset_elements()))
        .await
}

pub async fn update_relation<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
    BasicAuth(credentials): BasicAuth,
    body: String,
) -> Result<String, ApiError> {
    let version = store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            relation_ops::update(ds, &actor, id, &body, Utc::now())
        })
        .await?;
    Ok(version.to_string())
}

pub async fn delete_relation<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
    BasicAuth(credentials): BasicAuth,
    body: String,
) -> Result<String, ApiError> {
    let version = store
        .write(move |ds| {
            let actor = auth::editor(ds, credentials.as_ref())?;
            relation_ops::delete(ds, &actor, id, &body, Utc::now())
        })
        .await?;
    Ok(version.to_string())
}

pub async fn get_relation_full<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&relation_queries::full(ds, id)?, ds.max_changeset_elements()))
        .await
}

pub async fn get_relation_history<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&relation_queries::history(ds, id)?, ds.max_changeset_elements()))
        .await
}

pub async fn get_relation_version<S: Store>(
    State(store): State<AppState<S>>,
    Path((id, version)): Path<(ElementId, Version)>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| {
            let document = relation_queries::version(ds, id, version)?;
            Xml::document(&document, ds.max_changeset_elements())
        })
        .await
}

/// GET /relations?relations=1,2,3
pub async fn get_relations<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<BatchQuery>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| {
            let document = relation_queries::batch(ds, query.relations.as_deref())?;
            Xml::document(&document, ds.max_changeset_elements())
        })
        .await
}
