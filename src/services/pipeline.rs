use crate::models::ScanRequest;
use crate::services::fetcher::{FetchError, ObjectFetcher};
use crate::services::notifier::{AlertColor, Notifier};
use crate::services::scanner::{ScanError, ScanResult, VirusScanner};
use crate::services::temp_files::TempFileManager;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Why a scan could not produce a verdict.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("object has no backend file id")]
    MissingBackendFileId,

    #[error("failed to prepare temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to write temporary file: {0}")]
    Stage(#[source] std::io::Error),

    #[error("failed to get file from SeaweedFS backend: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to scan file: {0}")]
    ScanEngine(#[from] ScanError),

    #[error("scan engine reported an error: {0}")]
    EngineReported(String),
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Clean,
    Detected { threat_name: String },
    FetchFailed,
    ScanFailed,
}

impl ScanOutcome {
    fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::MissingBackendFileId
            | PipelineError::TempFile(_)
            | PipelineError::Stage(_)
            | PipelineError::Fetch(_) => {
                ScanOutcome::FetchFailed
            }
            PipelineError::ScanEngine(_) | PipelineError::EngineReported(_) => {
                ScanOutcome::ScanFailed
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Clean => "clean",
            ScanOutcome::Detected { .. } => "detected",
            ScanOutcome::FetchFailed => "fetch_failed",
            ScanOutcome::ScanFailed => "scan_failed",
        }
    }
}

/// Fetch, scan, classify and alert for a single object.
#[derive(Clone)]
pub struct ScanPipeline {
    temp_files: Arc<TempFileManager>,
    fetcher: Arc<dyn ObjectFetcher>,
    scanner: Arc<dyn VirusScanner>,
    notifier: Arc<dyn Notifier>,
}

impl ScanPipeline {
    pub fn new(
        temp_files: Arc<TempFileManager>,
        fetcher: Arc<dyn ObjectFetcher>,
        scanner: Arc<dyn VirusScanner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            temp_files,
            fetcher,
            scanner,
            notifier,
        }
    }

    /// Run the whole pipeline. Failures are reported through the notifier, never returned.
    pub async fn run(&self, request: &ScanRequest) -> ScanOutcome {
        let result = match self.scan(request).await {
            Ok(ScanResult::Error { reason }) => Err(PipelineError::EngineReported(reason)),
            other => other,
        };

        match result {
            Err(err) => {
                self.alert(
                    &format!("Error scanning `{}`", request.bucket_key),
                    &format!("```\n{}```", err),
                    AlertColor::Danger,
                )
                .await;
                ScanOutcome::from_error(&err)
            }
            Ok(ScanResult::Infected { threat_name }) => {
                tracing::info!(
                    bucket_key = %request.bucket_key,
                    virus = %threat_name,
                    md5_hash = %request.md5_display(),
                    "found virus in a file"
                );
                self.alert(
                    &format!("Positive file found: `{}`", request.bucket_key),
                    &format!(
                        "`{}` (`{}`) returned positive during scan with virus `{}`.\n\n\
                         It has not been deleted from storage backend.",
                        request.bucket_key,
                        request.md5_display(),
                        threat_name
                    ),
                    AlertColor::Info,
                )
                .await;
                ScanOutcome::Detected { threat_name }
            }
            Ok(_) => {
                tracing::debug!(bucket_key = %request.bucket_key, "object is clean");
                ScanOutcome::Clean
            }
        }
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, PipelineError> {
        let fid = request
            .backend_file_id
            .as_deref()
            .ok_or(PipelineError::MissingBackendFileId)?;

        let mut staged = self
            .temp_files
            .create(&request.key_extension())
            .await
            .map_err(PipelineError::TempFile)?;

        let written = self
            .fetcher
            .fetch(fid, &mut staged.file)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %staged.path.display(),
                    "failed to get file from SeaweedFS backend"
                );
            })?;
        staged.file.flush().await.map_err(PipelineError::Stage)?;
        drop(staged.file);

        tracing::debug!(
            bucket_key = %request.bucket_key,
            path = %staged.path.display(),
            bytes = written,
            "object staged for scanning"
        );

        self.scanner.scan(&staged.path).await.map_err(|e| {
            tracing::error!(error = %e, path = %staged.path.display(), "failed to scan file");
            PipelineError::from(e)
        })
    }

    async fn alert(&self, title: &str, text: &str, color: AlertColor) {
        if let Err(e) = self.notifier.notify(title, text, color).await {
            tracing::error!(error = %e, "failed to invoke webhook");
        }
    }
}
