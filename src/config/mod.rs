use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the scanning service
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// TCP address to listen on (default: "0.0.0.0:8080")
    pub listen_address: String,

    /// Debug logging (default: false)
    pub debug: bool,

    /// Slack-compatible webhook for error and positive-file alerts.
    /// Notifications are disabled when unset.
    pub webhook_url: Option<String>,

    /// Timeout for a single webhook delivery (default: 5 minutes)
    pub webhook_timeout: Duration,

    /// SeaweedFS master URL (default: "http://localhost:9333")
    pub seaweed_master_url: String,

    /// Connect timeout towards the SeaweedFS cluster (default: 5s)
    pub seaweed_connect_timeout: Duration,

    /// Virus scanner type: "clamav", "clamscan" or "noop" (default: "clamav")
    pub virus_scanner_type: String,

    /// ClamAV host (default: "127.0.0.1")
    pub clamav_host: String,

    /// ClamAV port (default: 3310)
    pub clamav_port: u16,

    /// clamscan binary used by the process scanner (default: "clamscan")
    pub clamscan_path: PathBuf,

    /// Parent directory of the scratch directory (default: system temp dir)
    pub scratch_root: PathBuf,

    /// Maximum number of scans running at once (default: 64)
    pub max_concurrent_scans: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            debug: false,
            webhook_url: None,
            webhook_timeout: Duration::from_secs(5 * 60),
            seaweed_master_url: "http://localhost:9333".to_string(),
            seaweed_connect_timeout: Duration::from_secs(5),
            virus_scanner_type: "clamav".to_string(),
            clamav_host: "127.0.0.1".to_string(),
            clamav_port: 3310,
            clamscan_path: PathBuf::from("clamscan"),
            scratch_root: env::temp_dir(),
            max_concurrent_scans: 64,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            listen_address: env::var("HTTP_LISTEN_ADDRESS").unwrap_or(default.listen_address),

            debug: env::var("DEBUG")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.debug),

            webhook_url: env::var("SLACK_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            webhook_timeout: env::var("WEBHOOK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.webhook_timeout),

            seaweed_master_url: env::var("SEAWEED_MASTER_URL")
                .unwrap_or(default.seaweed_master_url),

            seaweed_connect_timeout: env::var("SEAWEED_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.seaweed_connect_timeout),

            virus_scanner_type: env::var("VIRUS_SCANNER_TYPE")
                .unwrap_or(default.virus_scanner_type),

            clamav_host: env::var("CLAMAV_HOST").unwrap_or(default.clamav_host),

            clamav_port: env::var("CLAMAV_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.clamav_port),

            clamscan_path: env::var("CLAMSCAN_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.clamscan_path),

            scratch_root: env::var("SCRATCH_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_root),

            max_concurrent_scans: env::var("MAX_CONCURRENT_SCANS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_concurrent_scans),
        }
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_scans == 0 {
            anyhow::bail!("MAX_CONCURRENT_SCANS must be greater than 0");
        }

        if self.webhook_timeout.is_zero() || self.seaweed_connect_timeout.is_zero() {
            anyhow::bail!("timeouts must be greater than 0");
        }

        let master = url::Url::parse(&self.seaweed_master_url)
            .map_err(|e| anyhow::anyhow!("invalid SEAWEED_MASTER_URL: {}", e))?;
        if master.scheme() != "http" && master.scheme() != "https" {
            anyhow::bail!("SEAWEED_MASTER_URL must be an http(s) URL");
        }

        if let Some(webhook) = &self.webhook_url {
            url::Url::parse(webhook)
                .map_err(|e| anyhow::anyhow!("invalid SLACK_WEBHOOK_URL: {}", e))?;
        }

        Ok(())
    }

    /// Default `EnvFilter` directive, honouring the debug flag
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "object_scanner=debug,tower_http=debug"
        } else {
            "object_scanner=info,tower_http=info"
        }
    }
}
