use crate::config::VERSION;
use crate::game::store::GameStore;
use crate::services::events::{ConnectionStatus, ProxyListener};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal;

mod config;
mod database;
mod game;
mod parser;
mod proxy;
mod script;
mod services;
mod utils;

/// Default UI embedding: everything of interest goes to the log; the
/// decoded stream itself reaches the terminal through the client
/// socket.
struct ConsoleListener;

impl ProxyListener for ConsoleListener {
    fn on_connection_status_changed(&self, status: ConnectionStatus, address: &str) {
        info!("Connection {status:?}: {address}");
    }

    fn on_connection_error(&self, error: &str) {
        error!("Connection error: {error}");
    }

    fn on_script_error(&self, name: &str, error: &str) {
        warn!("Script '{name}' error: {error}");
    }

    fn on_script_status_changed(&self, status: &crate::services::events::ScriptStatusInfo) {
        info!(
            "Scripts: {} active of {} loaded",
            status.active_count, status.total_count
        );
    }
}

#[tokio::main]
async fn main() {
    // Load configuration
    let config = config::load_config().unwrap_or_default();

    // Initialize logging
    utils::logging::setup(config.logging, &config.logging_dir);

    info!("Starting sector-relay v{VERSION}");

    let db = match database::connect(&config.database_file).await {
        Ok(db) => db,
        Err(err) => {
            error!("Failed to open database: {err}");
            return;
        }
    };
    let store = GameStore::new(db);

    let config = Arc::new(config);
    let handle = match proxy::server::serve(config, store, Arc::new(ConsoleListener)).await {
        Ok(handle) => handle,
        Err(err) => {
            error!("Failed to start proxy: {err}");
            return;
        }
    };

    // Run until interrupted
    _ = signal::ctrl_c().await;
    info!("Shutting down");
    handle.disconnect();
}
