#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use object_scanner::config::ScannerConfig;
use object_scanner::services::dispatcher::ScanDispatcher;
use object_scanner::services::fetcher::{FetchError, ObjectFetcher};
use object_scanner::services::notifier::{AlertColor, NotificationError, Notifier};
use object_scanner::services::pipeline::ScanPipeline;
use object_scanner::services::scanner::{ScanError, ScanResult, VirusScanner};
use object_scanner::services::temp_files::TempFileManager;
use object_scanner::{AppState, create_app};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const EICAR: &[u8] = b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// In-memory object store keyed by backend file id.
#[derive(Default)]
pub struct MemoryFetcher {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub calls: AtomicUsize,
}

impl MemoryFetcher {
    pub fn with(objects: &[(&str, &[u8])]) -> Arc<Self> {
        let fetcher = Self::default();
        {
            let mut map = fetcher.objects.lock().unwrap();
            for (fid, body) in objects {
                map.insert(fid.to_string(), body.to_vec());
            }
        }
        Arc::new(fetcher)
    }
}

#[async_trait]
impl ObjectFetcher for MemoryFetcher {
    async fn fetch(
        &self,
        backend_file_id: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.objects.lock().unwrap().get(backend_file_id).cloned();
        match body {
            Some(body) => {
                dest.write_all(&body).await?;
                dest.flush().await?;
                Ok(body.len() as u64)
            }
            None => Err(FetchError::Status {
                fid: backend_file_id.to_string(),
                status: 404,
            }),
        }
    }

    async fn ping(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Flags anything containing the EICAR marker, like a real engine would.
#[derive(Default)]
pub struct EicarScanner {
    pub scanned: Mutex<Vec<std::path::PathBuf>>,
}

#[async_trait]
impl VirusScanner for EicarScanner {
    async fn scan(&self, path: &FsPath) -> Result<ScanResult, ScanError> {
        let content = tokio::fs::read(path).await?;
        self.scanned.lock().unwrap().push(path.to_path_buf());

        let needle = b"EICAR-STANDARD-ANTIVIRUS-TEST-FILE";
        if content.windows(needle.len()).any(|w| w == needle) {
            Ok(ScanResult::Infected {
                threat_name: "Eicar-Test-Signature".to_string(),
            })
        } else {
            Ok(ScanResult::Clean)
        }
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, AlertColor)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        title: &str,
        text: &str,
        color: AlertColor,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), text.to_string(), color));
        Ok(())
    }
}

pub struct TestApp {
    pub root: tempfile::TempDir,
    pub temp_files: Arc<TempFileManager>,
    pub fetcher: Arc<MemoryFetcher>,
    pub scanner: Arc<EicarScanner>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: ScanDispatcher,
    pub app: Router,
}

pub fn test_app(objects: &[(&str, &[u8])], capacity: usize) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let temp_files = Arc::new(TempFileManager::new(root.path()).unwrap());
    let fetcher = MemoryFetcher::with(objects);
    let scanner = Arc::new(EicarScanner::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let pipeline = ScanPipeline::new(
        temp_files.clone(),
        fetcher.clone(),
        scanner.clone(),
        notifier.clone(),
    );
    let dispatcher = ScanDispatcher::new(pipeline, capacity);

    let state = AppState {
        dispatcher: dispatcher.clone(),
        scanner: scanner.clone(),
        config: ScannerConfig {
            max_concurrent_scans: capacity,
            ..ScannerConfig::default()
        },
    };

    TestApp {
        root,
        temp_files,
        fetcher,
        scanner,
        notifier,
        dispatcher,
        app: create_app(state),
    }
}

/// Poll until `done` holds or the deadline passes.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Single-node SeaweedFS stand-in serving both master and volume endpoints.
pub async fn fake_seaweed(objects: &[(&str, &[u8])]) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let self_url = addr.to_string();
    let objects: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        objects
            .iter()
            .map(|(fid, body)| (fid.to_string(), body.to_vec()))
            .collect(),
    );

    let app = Router::new()
        .route("/cluster/status", get(|| async { "{}" }))
        .route(
            "/dir/lookup",
            get(move |Query(_q): Query<HashMap<String, String>>| {
                let self_url = self_url.clone();
                async move {
                    Json(serde_json::json!({
                        "locations": [{ "url": self_url, "publicUrl": self_url }]
                    }))
                }
            }),
        )
        .route(
            "/:fid",
            get(
                |State(objects): State<Arc<HashMap<String, Vec<u8>>>>, Path(fid): Path<String>| async move {
                    objects.get(&fid).cloned().ok_or(StatusCode::NOT_FOUND)
                },
            ),
        )
        .with_state(objects);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub type WebhookInbox = Arc<Mutex<Vec<serde_json::Value>>>;

/// Webhook receiver that records every payload.
pub async fn fake_webhook() -> (String, WebhookInbox) {
    let inbox: WebhookInbox = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/hook",
            post(
                |State(inbox): State<WebhookInbox>, Json(body): Json<serde_json::Value>| async move {
                    inbox.lock().unwrap().push(body);
                    StatusCode::OK
                },
            ),
        )
        .with_state(inbox.clone());

    let addr = serve(app).await;
    (format!("http://{}/hook", addr), inbox)
}
