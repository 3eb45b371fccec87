pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;
pub mod xml;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use logic::ApiError;

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{Dataset, MemoryStore, Store};

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// The full application: API routes, body limit and state
pub fn build_app<S: Store>(store: Arc<S>, config: &config::ApiConfig) -> Router {
    api::routes::create_router::<S>()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(store)
}

/// Start the server described by `config` and serve until shutdown
pub async fn run_server(config: config::AppConfig) -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::net::TcpListener;

    let store = Arc::new(MemoryStore::new(config.api.max_changeset_elements));

    if config.seed.load_demo_data {
        let summary = seed::load_seed_data(&*store).await;
        println!(
            "Demo data loaded: {} relations, users {}",
            summary.relations,
            summary.users.join(", ")
        );
    }

    let app = build_app(store, &config.api);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    log::info!("relation API listening on http://{}/api/0.6", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
