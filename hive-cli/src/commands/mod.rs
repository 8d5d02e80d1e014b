pub mod config;
pub mod load;
pub mod refs;
pub mod run;

use std::sync::Arc;

use hive_core::{FileReferenceDatabase, HiveConfig, PackageEnvironment, ReferenceStore};
use tokio_util::sync::CancellationToken;

use crate::builtin;

/// Package environment for the effective configuration
pub(crate) fn environment(config: &HiveConfig) -> Arc<PackageEnvironment> {
    Arc::new(config.environment(Some(builtin::registration())))
}

/// Reference store backed by the configured document
pub(crate) fn store(config: &HiveConfig, environment: Arc<PackageEnvironment>) -> ReferenceStore {
    ReferenceStore::new(
        Arc::new(FileReferenceDatabase::new(&config.paths.references_file)),
        environment,
    )
}

/// Token that fires on Ctrl+C
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling");
            trigger.cancel();
        }
    });

    cancel
}
