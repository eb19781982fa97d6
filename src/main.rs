use anyhow::{Context, Result};
use predledger::datasource::{fetch_all, LimitlessDataSource};
use predledger::ingest::{load_records, IngestMode, NormalizeOptions, RecordSource};
use predledger::{api, config::Config, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Load every configured input into one session.
async fn build_session(config: &Config) -> Result<Session> {
    let mut session: Option<Session> = None;

    if let Some(path) = &config.trades_file {
        let records = load_records(path)
            .with_context(|| format!("reading trades from {}", path.display()))?;
        let options = NormalizeOptions::new(config.ingest_mode, RecordSource::Detect);
        let loaded = Session::from_records(&records, options)
            .with_context(|| format!("normalizing {}", path.display()))?;
        session = Some(loaded);
    }

    if let Some(cookie) = &config.session_cookie {
        let source = LimitlessDataSource::new(config.api_base_url.clone(), cookie.clone());
        let fetch = fetch_all(&source, config.max_pages, config.page_limit)
            .await
            .context("fetching portfolio history")?;
        let options = NormalizeOptions::new(config.ingest_mode, RecordSource::Api);
        let fetched = Session::from_fetch(&fetch, options).context("normalizing API records")?;
        match session.as_mut() {
            Some(existing) => existing.extend(fetched),
            None => session = Some(fetched),
        }
    }

    session.context("no trade input configured")
}

/// `RUST_LOG` directives when given and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let session = match build_session(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load trades: {:#}", e);
            std::process::exit(1);
        }
    };

    if config.ingest_mode == IngestMode::Lenient && !session.ingest_errors().is_empty() {
        tracing::warn!(
            "{} records were skipped during ingestion",
            session.ingest_errors().len()
        );
    }
    if !session.is_complete() {
        tracing::warn!("Trade history is incomplete; summaries cover a partial dataset");
    }

    let port = config.port;
    let app = api::create_router(api::AppState::new(Arc::new(session), config));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
