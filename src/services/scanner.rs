use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Result of a virus scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// File is clean (no threats detected)
    Clean,
    /// File is infected with malware
    Infected { threat_name: String },
    /// The engine answered but could not scan the file
    Error { reason: String },
}

/// The scan engine itself could not be driven to a verdict.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to connect to scan engine at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("scan engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected scan engine response: {0}")]
    Protocol(String),

    #[error("scan engine exited with status {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },
}

/// Trait for virus scanning implementations
#[async_trait::async_trait]
pub trait VirusScanner: Send + Sync {
    /// Scan the file at `path`. Blocks for as long as the engine takes.
    async fn scan(&self, path: &Path) -> Result<ScanResult, ScanError>;

    /// Check if the scanner is available/healthy
    async fn health_check(&self) -> bool;
}

/// ClamAV scanner using TCP socket (clamd)
///
/// Docker command to run ClamAV:
/// ```bash
/// docker run -d --name clamav -p 3310:3310 clamav/clamav:latest
/// ```
pub struct ClamAvScanner {
    host: String,
    port: u16,
}

impl ClamAvScanner {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    async fn connect(&self) -> Result<TcpStream, ScanError> {
        let addr = format!("{}:{}", self.host, self.port);
        TcpStream::connect(&addr)
            .await
            .map_err(|source| ScanError::Connect { addr, source })
    }
}

#[async_trait::async_trait]
impl VirusScanner for ClamAvScanner {
    async fn scan(&self, path: &Path) -> Result<ScanResult, ScanError> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut stream = self.connect().await?;

        // Format: zINSTREAM\0 <length:u32 big-endian> <data> ... <0:u32>
        stream.write_all(b"zINSTREAM\0").await?;

        const CHUNK_SIZE: usize = 1024 * 1024;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut total_sent = 0usize;

        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            let len = (n as u32).to_be_bytes();
            stream.write_all(&len).await?;
            stream.write_all(&buffer[..n]).await?;
            total_sent += n;
        }

        stream.write_all(&0u32.to_be_bytes()).await?;
        stream.flush().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;

        let response = String::from_utf8_lossy(&response);
        tracing::debug!(
            path = %path.display(),
            bytes = total_sent,
            response = %response.trim_end_matches('\0').trim(),
            "ClamAV response"
        );

        parse_clamd_response(&response)
    }

    async fn health_check(&self) -> bool {
        match self.connect().await {
            Ok(mut stream) => {
                if stream.write_all(b"zPING\0").await.is_err() {
                    return false;
                }
                if stream.flush().await.is_err() {
                    return false;
                }

                let mut response = [0u8; 16];
                match stream.read(&mut response).await {
                    Ok(n) => {
                        let resp = String::from_utf8_lossy(&response[..n]);
                        resp.contains("PONG")
                    }
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }
}

/// Parse a clamd reply such as `stream: OK` or `stream: Eicar-Test-Signature FOUND`.
pub fn parse_clamd_response(response: &str) -> Result<ScanResult, ScanError> {
    let response = response.trim_end_matches('\0').trim();
    let body = response
        .split_once(": ")
        .map(|(_, rest)| rest)
        .unwrap_or(response);

    if body == "OK" {
        Ok(ScanResult::Clean)
    } else if let Some(name) = body.strip_suffix(" FOUND") {
        Ok(ScanResult::Infected {
            threat_name: name.trim().to_string(),
        })
    } else if let Some(reason) = body.strip_suffix(" ERROR") {
        Ok(ScanResult::Error {
            reason: reason.trim().to_string(),
        })
    } else {
        Err(ScanError::Protocol(response.to_string()))
    }
}

/// Scanner that shells out to the `clamscan` command line tool.
///
/// Exit status 0 means clean, 1 means a signature matched, anything else is an
/// engine failure.
pub struct ClamScanScanner {
    binary: PathBuf,
}

impl ClamScanScanner {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[async_trait::async_trait]
impl VirusScanner for ClamScanScanner {
    async fn scan(&self, path: &Path) -> Result<ScanResult, ScanError> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--no-summary")
            .arg(path)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match output.status.code() {
            Some(0) => Ok(ScanResult::Clean),
            Some(1) => {
                let threat_name = stdout
                    .lines()
                    .find_map(|line| line.trim().strip_suffix(" FOUND"))
                    .and_then(|line| line.rsplit_once(": "))
                    .map(|(_, name)| name.trim().to_string())
                    .unwrap_or_else(|| "Unknown threat".to_string());
                Ok(ScanResult::Infected { threat_name })
            }
            code => Err(ScanError::Process {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// No-op scanner for development/testing
pub struct NoOpScanner;

#[async_trait::async_trait]
impl VirusScanner for NoOpScanner {
    async fn scan(&self, path: &Path) -> Result<ScanResult, ScanError> {
        tracing::warn!(path = %path.display(), "NoOpScanner: Skipping virus scan (development mode)");
        Ok(ScanResult::Clean)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create appropriate scanner based on config
pub fn create_scanner(config: &crate::config::ScannerConfig) -> Box<dyn VirusScanner> {
    match config.virus_scanner_type.to_lowercase().as_str() {
        "clamav" | "clamd" => Box::new(ClamAvScanner::new(
            config.clamav_host.clone(),
            config.clamav_port,
        )),
        "clamscan" => Box::new(ClamScanScanner::new(config.clamscan_path.clone())),
        "noop" | "none" | "disabled" => Box::new(NoOpScanner),
        other => {
            tracing::warn!("Unknown scanner type '{}', using NoOpScanner", other);
            Box::new(NoOpScanner)
        }
    }
}
