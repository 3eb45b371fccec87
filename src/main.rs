use relation_api::config::AppConfig;
use relation_api::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Info by default; RUST_LOG overrides
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Relation API: OSM 0.6 relation server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, max changeset elements={}",
        config.server.host, config.server.port, config.api.max_changeset_elements
    );

    run_server(config).await
}
