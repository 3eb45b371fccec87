use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::{changeset_handlers, element_handlers, handlers, relation_handlers};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .nest("/api/0.6", api_routes::<S>())
}

fn api_routes<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Relations
        .route("/relation/create", put(relation_handlers::create_relation::<S>))
        .route(
            "/relation/:id",
            get(relation_handlers::get_relation::<S>)
                .put(relation_handlers::update_relation::<S>)
                .delete(relation_handlers::delete_relation::<S>),
        )
        .route("/relation/:id/full", get(relation_handlers::get_relation_full::<S>))
        .route("/relation/:id/history", get(relation_handlers::get_relation_history::<S>))
        .route(
            "/relation/:id/relations",
            get(element_handlers::relations_for_relation::<S>),
        )
        .route("/relation/:id/:version", get(relation_handlers::get_relation_version::<S>))
        .route("/relations", get(relation_handlers::get_relations::<S>))
        // Nodes and ways
        .route("/node/:id", get(element_handlers::get_node::<S>))
        .route("/node/:id/relations", get(element_handlers::relations_for_node::<S>))
        .route("/way/:id", get(element_handlers::get_way::<S>))
        .route("/way/:id/relations", get(element_handlers::relations_for_way::<S>))
        // Changesets
        .route("/changeset/create", put(changeset_handlers::create_changeset::<S>))
        .route("/changeset/:id", get(changeset_handlers::get_changeset::<S>))
        .route("/changeset/:id/close", put(changeset_handlers::close_changeset::<S>))
        .route("/changeset/:id/upload", post(changeset_handlers::upload_changeset::<S>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::AUTHORIZATION, Method, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::model::{ChangesetId, ElementId, ElementKind, RelationPayload, User};
    use crate::seed::{Fixture, FIXTURE_PASSWORD};
    use crate::store::MemoryStore;
    use crate::xml::render_relation_payload;

    struct TestApp {
        router: Router,
        user: User,
        private: User,
        changeset: ChangesetId,
        used: ElementId,
        parent: ElementId,
        deleted: ElementId,
        node: ElementId,
    }

    fn app() -> TestApp {
        let mut fx = Fixture::new();
        let user = fx.user("mapper");
        let private = fx.private_user("hidden");
        let changeset = fx.changeset(&user);
        let node = fx.node(1.0, 1.0);
        let used = fx
            .relation()
            .member(ElementKind::Node, node, "stop")
            .tag("type", "route")
            .build();
        let parent = fx
            .relation()
            .member(ElementKind::Relation, used, "")
            .tag("type", "route_master")
            .build();
        let deleted = fx.relation().deleted().build();

        let router = create_router::<MemoryStore>().with_state(Arc::new(fx.into_store()));
        TestApp {
            router,
            user,
            private,
            changeset,
            used,
            parent,
            deleted,
            node,
        }
    }

    fn basic(user: &User) -> String {
        let pair = format!("{}:{}", user.email, FIXTURE_PASSWORD);
        format!("Basic {}", STANDARD.encode(pair))
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        auth: Option<&User>,
        body: String,
    ) -> (StatusCode, String) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = auth {
            request = request.header(AUTHORIZATION, basic(user));
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get_uri(router: &Router, uri: &str) -> (StatusCode, String) {
        send(router, Method::GET, uri, None, String::new()).await
    }

    fn payload_xml(payload: &RelationPayload) -> String {
        render_relation_payload(payload).unwrap()
    }

    #[tokio::test]
    async fn health_is_outside_the_api_prefix() {
        let app = app();
        let (status, body) = get_uri(&app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["api_version"], "0.6");
        assert!(health["timestamp"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, _) = get_uri(&app.router, "/api/0.6/health").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reads_map_visibility_to_status() {
        let app = app();
        let (status, body) = get_uri(&app.router, &format!("/api/0.6/relation/{}", app.used)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(&format!("<relation id=\"{}\"", app.used)), "{body}");

        let (status, _) = get_uri(&app.router, &format!("/api/0.6/relation/{}", app.deleted)).await;
        assert_eq!(status, StatusCode::GONE);
        let (status, _) = get_uri(&app.router, "/api/0.6/relation/0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn static_segments_win_over_versions() {
        let app = app();
        let base = format!("/api/0.6/relation/{}", app.used);
        for suffix in ["full", "history", "relations", "1"] {
            let (status, _) = get_uri(&app.router, &format!("{base}/{suffix}")).await;
            assert_eq!(status, StatusCode::OK, "{suffix}");
        }
        let (status, body) = get_uri(&app.router, &format!("{base}/relations")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(&format!("<relation id=\"{}\"", app.parent)), "{body}");
    }

    #[tokio::test]
    async fn batch_read_statuses() {
        let app = app();
        let uri = format!("/api/0.6/relations?relations={},{}", app.used, app.deleted);
        let (status, body) = get_uri(&app.router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("visible=\"false\""));

        for bad in ["/api/0.6/relations", "/api/0.6/relations?relations=", "/api/0.6/relations?relations=x"] {
            assert_eq!(get_uri(&app.router, bad).await.0, StatusCode::BAD_REQUEST, "{bad}");
        }
        let missing = format!("/api/0.6/relations?relations={},400", app.used);
        assert_eq!(get_uri(&app.router, &missing).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_needs_credentials_and_a_public_user() {
        let app = app();
        let payload = RelationPayload::new()
            .in_changeset(app.changeset)
            .member(ElementKind::Node, app.node, "stop");

        let (status, _) = send(&app.router, Method::PUT, "/api/0.6/relation/create", None, payload_xml(&payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app.router,
            Method::PUT,
            "/api/0.6/relation/create",
            Some(&app.private),
            payload_xml(&payload),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/api/0.6/relation/create",
            Some(&app.user),
            payload_xml(&payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id: ElementId = body.parse().unwrap();
        assert_eq!(get_uri(&app.router, &format!("/api/0.6/relation/{id}")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_of_a_used_relation_fails_precondition() {
        let app = app();
        let payload = RelationPayload::new()
            .with_id(app.used)
            .with_version(1)
            .in_changeset(app.changeset);
        let uri = format!("/api/0.6/relation/{}", app.used);

        let (status, body) = send(&app.router, Method::DELETE, &uri, Some(&app.user), payload_xml(&payload)).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(
            body,
            format!("Precondition failed: The relation {} is used in relation {}.", app.used, app.parent)
        );

        let parent = RelationPayload::new()
            .with_id(app.parent)
            .with_version(1)
            .in_changeset(app.changeset);
        let parent_uri = format!("/api/0.6/relation/{}", app.parent);
        let (status, body) = send(&app.router, Method::DELETE, &parent_uri, Some(&app.user), payload_xml(&parent)).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "2"));

        let (status, body) = send(&app.router, Method::DELETE, &uri, Some(&app.user), payload_xml(&payload)).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "2"));
    }

    #[tokio::test]
    async fn private_users_are_forbidden_before_anything_else() {
        let app = app();
        let uri = format!("/api/0.6/relation/{}", app.deleted);
        let (status, _) = send(&app.router, Method::DELETE, &uri, Some(&app.private), String::new()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn changeset_lifecycle() {
        let app = app();
        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/api/0.6/changeset/create",
            Some(&app.user),
            "<osm><changeset><tag k='comment' v='test'/></changeset></osm>".to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id: ChangesetId = body.parse().unwrap();

        let uri = format!("/api/0.6/changeset/{id}/close");
        assert_eq!(send(&app.router, Method::PUT, &uri, Some(&app.private), String::new()).await.0, StatusCode::FORBIDDEN);
        assert_eq!(send(&app.router, Method::PUT, &uri, Some(&app.user), String::new()).await.0, StatusCode::OK);
        assert_eq!(send(&app.router, Method::PUT, &uri, Some(&app.user), String::new()).await.0, StatusCode::CONFLICT);

        let (status, body) = get_uri(&app.router, &format!("/api/0.6/changeset/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("open=\"false\""), "{body}");
    }

    #[tokio::test]
    async fn upload_returns_a_diff_result() {
        let app = app();
        let body = format!(
            "<osmChange version='0.6'><create>\
             <relation id='-1' changeset='{cs}'><member type='node' ref='{node}' role=''/></relation>\
             </create></osmChange>",
            cs = app.changeset,
            node = app.node
        );
        let uri = format!("/api/0.6/changeset/{}/upload", app.changeset);
        let (status, response) = send(&app.router, Method::POST, &uri, Some(&app.user), body).await;
        assert_eq!(status, StatusCode::OK, "{response}");
        assert!(response.contains("<diffResult"));
        assert!(response.contains("old_id=\"-1\""));
        assert!(response.contains("new_version=\"1\""));
    }
}
