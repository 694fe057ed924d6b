use crate::config::ScannerConfig;
use crate::services::notifier::{Notifier, WebhookNotifier};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

pub fn setup_notifier(config: &ScannerConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    let notifier = WebhookNotifier::new(config.webhook_url.clone(), config.webhook_timeout)
        .context("failed to build webhook client")?;

    if notifier.is_enabled() {
        info!("🔔 Webhook notifications enabled");
    } else {
        info!("🔕 No webhook configured, notifications disabled");
    }

    Ok(Arc::new(notifier))
}
