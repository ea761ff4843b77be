use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use nchan_exporter::client::HttpFetcher;
use nchan_exporter::collector::{NchanCollector, NginxCollector};

/// Prometheus exporter for Nchan publish/subscribe servers.
#[derive(Parser)]
#[command(name = "nchan-exporter", version, about)]
struct Cli {
    /// Address to listen on for the web interface and telemetry.
    #[arg(
        long = "web.listen-address",
        env = "LISTEN_ADDRESS",
        default_value = ":9113"
    )]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        env = "TELEMETRY_PATH",
        default_value = "/metrics"
    )]
    telemetry_path: String,

    /// URI for scraping Nchan metrics; the nchan_stub_status page must be
    /// available through it.
    #[arg(
        long = "scrape-uri",
        env = "SCRAPE_URI",
        default_value = "http://127.0.0.1:8080/nchan_stub_status"
    )]
    scrape_uri: String,

    /// Also export NGINX stub_status metrics.
    #[arg(long, env = "NGINX")]
    nginx: bool,

    /// URI for scraping NGINX metrics; the stub_status page must be
    /// available through it.
    #[arg(
        long = "nginx.scrape-uri",
        env = "NGINX_SCRAPE_URI",
        default_value = "http://127.0.0.1:8080/stub_status"
    )]
    nginx_scrape_uri: String,

    /// Perform SSL certificate verification when scraping.
    #[arg(
        long = "ssl-verify",
        env = "SSL_VERIFY",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    ssl_verify: bool,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing.
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    if !cli.telemetry_path.starts_with('/') || cli.telemetry_path == "/" {
        bail!("telemetry path must start with '/' and not shadow the landing page");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scrape_uri = %cli.scrape_uri,
        "starting nchan exporter",
    );

    // One HTTP client is shared by all scrape targets. Its request timeout is
    // the only timeout policy in the exporter; collection runs to completion
    // within it.
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(!cli.ssl_verify)
        .build()
        .context("building scrape HTTP client")?;

    let registry = Registry::new();

    // Collector construction probes each target once, so an unreachable or
    // misconfigured URI aborts startup here rather than on the first scrape.
    let nchan = NchanCollector::new(HttpFetcher::new(http.clone(), &cli.scrape_uri), "nchan")
        .context("could not create Nchan collector")?;
    registry
        .register(Box::new(nchan))
        .context("registering Nchan collector")?;

    if cli.nginx {
        let nginx = NginxCollector::new(HttpFetcher::new(http, &cli.nginx_scrape_uri), "nginx")
            .context("could not create NGINX collector")?;
        registry
            .register(Box::new(nginx))
            .context("registering NGINX collector")?;
    }

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(serve(cli, registry))
}

/// Shared state for axum handlers.
struct AppState {
    registry: Registry,
    landing_page: String,
}

async fn serve(cli: Cli, registry: Registry) -> Result<()> {
    // Parse address, handling ":port" shorthand.
    let bind_addr = if cli.listen_address.starts_with(':') {
        format!("0.0.0.0{}", cli.listen_address)
    } else {
        cli.listen_address.clone()
    };

    let state = Arc::new(AppState {
        registry,
        landing_page: landing_page(&cli.telemetry_path),
    });

    let app = Router::new()
        .route(&cli.telemetry_path, get(metrics_handler))
        .route("/", get(index_handler))
        .with_state(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("listening on {bind_addr}"))?;

    let local_addr = listener.local_addr().context("getting local address")?;

    tracing::info!(addr = %local_addr, path = %cli.telemetry_path, "telemetry server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving telemetry")?;

    tracing::info!("nchan exporter stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

/// GET <telemetry-path> - Prometheus text format.
///
/// Collection blocks on the scrape fetches, so gathering and encoding run
/// off the async worker threads.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.clone();

    let gathered = tokio::task::spawn_blocking(move || {
        let encoder = TextEncoder::new();
        let metric_families = registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok::<_, prometheus::Error>(buffer)
    })
    .await;

    match gathered {
        Ok(Ok(buffer)) => match String::from_utf8(buffer) {
            Ok(text) => (StatusCode::OK, text),
            Err(e) => {
                tracing::error!(error = %e, "converting metrics to string");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "encoding error".to_string(),
                )
            }
        },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "encoding metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding error".to_string(),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "metrics collection task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "collection failed".to_string(),
            )
        }
    }
}

/// GET / - Landing page linking to the telemetry path.
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.landing_page.clone())
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Nchan Exporter</title></head>\n\
         <body>\n\
         <h1>Nchan Exporter</h1>\n\
         <p><a href='{telemetry_path}'>Metrics</a></p>\n\
         </body>\n\
         </html>"
    )
}
