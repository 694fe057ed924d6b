use crate::config::ScannerConfig;
use crate::services::scanner::VirusScanner;
use std::sync::Arc;
use tracing::info;

pub async fn setup_scanner(config: &ScannerConfig) -> Arc<dyn VirusScanner> {
    let scanner_service = crate::services::scanner::create_scanner(config);

    if scanner_service.health_check().await {
        info!("🦠 Virus scanner ({}) is reachable", config.virus_scanner_type);
    } else {
        tracing::warn!(
            "⚠️  Virus scanner ({}) unreachable! Scans will fail until it comes back.",
            config.virus_scanner_type
        );
    }

    scanner_service.into()
}
