use axum::extract::{Path, State};

use crate::api::handlers::AppState;
use crate::api::response::Xml;
use crate::logic::{relation_queries, ApiError};
use crate::model::{ElementId, ElementRef};
use crate::store::traits::Store;

pub async fn get_node<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&relation_queries::read_node(ds, id)?, ds.max_changeset_elements()))
        .await
}

pub async fn get_way<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    store
        .read(move |ds| Xml::document(&relation_queries::read_way(ds, id)?, ds.max_changeset_elements()))
        .await
}

async fn relations_for<S: Store>(store: AppState<S>, element: ElementRef) -> Result<Xml, ApiError> {
    store
        .read(move |ds| {
            let document = relation_queries::for_member(ds, element);
            Xml::document(&document, ds.max_changeset_elements())
        })
        .await
}

pub async fn relations_for_node<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    relations_for(store, ElementRef::node(id)).await
}

pub async fn relations_for_way<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    relations_for(store, ElementRef::way(id)).await
}

pub async fn relations_for_relation<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<ElementId>,
) -> Result<Xml, ApiError> {
    relations_for(store, ElementRef::relation(id)).await
}
