use clap::Parser;
use dotenvy::dotenv;
use object_scanner::config::ScannerConfig;
use object_scanner::infrastructure::{notifications, scanner, storage};
use object_scanner::services::dispatcher::ScanDispatcher;
use object_scanner::services::pipeline::ScanPipeline;
use object_scanner::{AppState, create_app};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on, overrides HTTP_LISTEN_ADDRESS
    #[arg(short, long)]
    listen: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = ScannerConfig::from_env();
    if let Some(listen) = args.listen {
        config.listen_address = listen;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    if args.check_config {
        info!("Configuration is valid");
        return Ok(());
    }

    info!("🚀 Starting object scanner v{}...", env!("CARGO_PKG_VERSION"));
    info!(
        "🛡️  Scanner={}, Max concurrent scans={}, Webhook={}",
        config.virus_scanner_type,
        config.max_concurrent_scans,
        if config.webhook_url.is_some() { "on" } else { "off" }
    );

    let temp_files = storage::setup_scratch(&config)?;
    let fetcher = storage::setup_fetcher(&config).await?;
    let scanner_service = scanner::setup_scanner(&config).await;
    let notifier = notifications::setup_notifier(&config)?;

    let pipeline = ScanPipeline::new(temp_files, fetcher, scanner_service.clone(), notifier);
    let dispatcher = ScanDispatcher::new(pipeline, config.max_concurrent_scans);

    let state = AppState {
        dispatcher,
        scanner: scanner_service,
        config: config.clone(),
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;

    info!("✅ Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
