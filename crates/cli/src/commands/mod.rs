//! CLI subcommand implementations.

pub mod init;
pub mod run;
pub mod state;

use std::sync::Arc;
use stepwise_config::AppConfig;
use stepwise_core::StateStore;
use stepwise_store::{InMemoryStateStore, SqliteStateStore};

/// Open the configured state store.
///
/// The `memory` backend lives only as long as the process, which is only
/// useful for one-off `run` invocations.
pub async fn open_store(
    config: &AppConfig,
) -> Result<Arc<dyn StateStore>, Box<dyn std::error::Error>> {
    if config.store.backend == "memory" {
        return Ok(Arc::new(InMemoryStateStore::new()));
    }

    let path = config.store.sqlite_path();
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!(path = %path, "Opening SQLite state store");
    Ok(Arc::new(SqliteStateStore::new(&path).await?))
}
