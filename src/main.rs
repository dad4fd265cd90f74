use tracing::{error, info};

use cloudvault::{Config, Database, FileBlobStore, NodeRepository, NodeService};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = cloudvault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        cloudvault::logging::init_console_only(&config.logging.level);
    }

    info!("cloudvault - personal cloud file vault");

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let blobs = match FileBlobStore::new(&config.storage.blob_path) {
        Ok(blobs) => blobs,
        Err(e) => {
            error!("Failed to open blob store {}: {}", config.storage.blob_path, e);
            std::process::exit(1);
        }
    };

    let service = NodeService::with_config(
        NodeRepository::new(db.pool().clone()),
        blobs,
        &config.storage,
    );

    match service.storage_usage().await {
        Ok(usage) => info!(
            "Storage: {} of {} bytes used ({:.1}%)",
            usage.used_bytes, usage.quota_bytes, usage.percent
        ),
        Err(e) => error!("Failed to read storage usage: {}", e),
    }
}
