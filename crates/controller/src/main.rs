use std::sync::Arc;

use anyhow::Context as _;

use crier_infra::{ControllerConfig, InMemoryJobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ControllerConfig::from_env()?;
    crier_observability::init(config.log_format);

    let store = Arc::new(InMemoryJobStore::new());

    if let Some(path) = &config.seed_file {
        let seeded = crier_controller::seed_from_file(&store, path)?;
        tracing::info!(jobs = seeded, path = %path.display(), "seeded job store");
    }

    let handles = crier_controller::start_controllers(&config, store.clone())?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    store.close_watch();

    // Joining worker threads blocks; keep it off the async runtime.
    tokio::task::spawn_blocking(move || {
        for handle in handles {
            handle.shutdown();
        }
    })
    .await?;

    Ok(())
}
