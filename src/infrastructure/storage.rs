use crate::config::ScannerConfig;
use crate::services::fetcher::{ObjectFetcher, SeaweedFetcher};
use crate::services::temp_files::TempFileManager;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Connect to the SeaweedFS master and make sure it answers before serving.
pub async fn setup_fetcher(config: &ScannerConfig) -> anyhow::Result<Arc<dyn ObjectFetcher>> {
    info!("☁️  SeaweedFS master: {}", config.seaweed_master_url);

    let fetcher = SeaweedFetcher::new(&config.seaweed_master_url, config.seaweed_connect_timeout)
        .context("failed to build SeaweedFS client")?;

    fetcher
        .ping()
        .await
        .context("failed to ping SeaweedFS master")?;

    Ok(Arc::new(fetcher))
}

/// Create the scratch directory once, before any request is accepted.
pub fn setup_scratch(config: &ScannerConfig) -> anyhow::Result<Arc<TempFileManager>> {
    let manager = TempFileManager::new(&config.scratch_root).with_context(|| {
        format!(
            "failed to create scratch directory under {}",
            config.scratch_root.display()
        )
    })?;
    Ok(Arc::new(manager))
}
