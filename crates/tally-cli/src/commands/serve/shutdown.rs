use std::sync::Arc;
use tally_database::DbConnection;
use tracing::{debug, info, warn};

/// Resolves on Ctrl+C, or right away if the handler cannot be installed.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
    }
}

/// Close the pool if nothing else still holds it.
pub async fn close_database(db: Arc<DbConnection>) {
    match Arc::try_unwrap(db) {
        Ok(db) => {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                debug!("Database connection closed successfully");
            }
        }
        Err(_) => {
            debug!("Database still has other references, skipping close");
        }
    }
}
