use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Failure to retrieve an object from the backing store.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid backend file id: {0}")]
    InvalidFileId(String),

    #[error("volume lookup failed: {0}")]
    Lookup(String),

    #[error("object store returned status {status} for {fid}")]
    Status { fid: String, status: u16 },

    #[error("object store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to write object body: {0}")]
    Write(#[from] std::io::Error),
}

/// Source of object bytes, keyed by backend file id.
#[async_trait::async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Stream the full object body into `dest`, returning the number of bytes written.
    async fn fetch(
        &self,
        backend_file_id: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, FetchError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), FetchError>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    locations: Vec<VolumeLocation>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeLocation {
    url: String,
}

/// Fetches objects from a SeaweedFS cluster: the master resolves the volume,
/// then the body is streamed from a volume server.
pub struct SeaweedFetcher {
    client: reqwest::Client,
    master_url: String,
}

impl SeaweedFetcher {
    pub fn new(master_url: &str, connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            master_url: master_url.trim_end_matches('/').to_string(),
        })
    }

    async fn lookup_volume(&self, volume_id: &str) -> Result<String, FetchError> {
        let url = format!("{}/dir/lookup", self.master_url);
        let response = self
            .client
            .get(&url)
            .query(&[("volumeId", volume_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Lookup(format!(
                "master returned status {} for volume {}",
                response.status().as_u16(),
                volume_id
            )));
        }

        let lookup: LookupResponse = response.json().await?;
        if let Some(err) = lookup.error.filter(|e| !e.is_empty()) {
            return Err(FetchError::Lookup(err));
        }

        lookup
            .locations
            .into_iter()
            .next()
            .map(|loc| loc.url)
            .ok_or_else(|| FetchError::Lookup(format!("no locations for volume {}", volume_id)))
    }
}

/// Split a SeaweedFS file id (`<volume>,<needle><cookie>`) and return the volume id.
pub fn volume_id(fid: &str) -> Result<&str, FetchError> {
    match fid.split_once(',') {
        Some((volume, needle))
            if !volume.is_empty()
                && !needle.is_empty()
                && volume.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(volume)
        }
        _ => Err(FetchError::InvalidFileId(fid.to_string())),
    }
}

fn with_scheme(location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", location.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl ObjectFetcher for SeaweedFetcher {
    async fn fetch(
        &self,
        backend_file_id: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, FetchError> {
        let volume = volume_id(backend_file_id)?;
        let location = self.lookup_volume(volume).await?;
        let url = format!("{}/{}", with_scheme(&location), backend_file_id);

        tracing::debug!(fid = %backend_file_id, url = %url, "Fetching object from volume server");

        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                fid: backend_file_id.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            dest.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        dest.flush().await?;

        Ok(written)
    }

    async fn ping(&self) -> Result<(), FetchError> {
        let url = format!("{}/cluster/status", self.master_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                fid: "cluster/status".to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
