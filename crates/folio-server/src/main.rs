mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use folio::cache::{BookCache, BookCacheConfig, InMemoryStore, KeyValueStore};
use folio::callbacks::TracingCallback;
use folio::core::EventSink;
use folio::gutenberg::{GutenbergConfig, GutenbergSource};
use folio::models::HttpBackend;
use folio::openai::{OpenAiConfig, OpenAiEnricher};
use folio::redis::RedisStore;
use folio::service::BookService;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CacheBackend, ServerCli};
use crate::routes::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = ServerCli::parse();
    let books = build_service(&cli).await?;
    let app = routes::router(AppState {
        books: Arc::new(books),
    });

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "folio-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn build_service(cli: &ServerCli) -> Result<BookService> {
    let root = EventSink::new("BookService", Arc::new(TracingCallback::new()));
    let cache_config = BookCacheConfig::default().with_ttl_secs(cli.cache_ttl_secs);
    cache_config.validate()?;
    let http = Arc::new(HttpBackend::new(Duration::from_secs(cli.request_timeout_secs))?);

    let store: Arc<dyn KeyValueStore> = match cli.cache {
        CacheBackend::Redis => {
            let store = RedisStore::from_url(&cli.redis_url)?;
            store
                .ping()
                .await
                .with_context(|| format!("Redis is not reachable at {}", cli.redis_url))?;
            Arc::new(store)
        }
        CacheBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            InMemoryStore::spawn_purger(&store, PURGE_INTERVAL);
            store
        }
    };

    let cache = BookCache::new(store, cache_config, root.scoped("BookCache"));
    let source = GutenbergSource::new(
        GutenbergConfig::new().with_base_url(&cli.gutenberg_base_url),
        http.clone(),
        root.scoped("GutenbergSource"),
    );
    let enricher = OpenAiEnricher::new(
        OpenAiConfig::new(&cli.openai_api_key, &cli.openai_model)
            .with_base_url(&cli.openai_base_url),
        http,
        root.scoped("OpenAiEnricher"),
    )
    .context("enrichment provider is not configured")?;

    Ok(BookService::new(
        cache,
        Arc::new(source),
        Arc::new(enricher),
        root,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
