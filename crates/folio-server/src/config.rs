use clap::{Parser, ValueEnum};
use folio::core::{DEFAULT_CACHE_TTL_SECS, MAX_CACHE_TTL_SECS};
use folio::redis::DEFAULT_REDIS_URL;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Shared Redis instance.
    Redis,
    /// Process-local store; entries are lost on restart.
    Memory,
}

#[derive(Parser, Debug)]
#[command(
    name = "folio-server",
    about = "HTTP API serving AI-enriched public-domain books"
)]
pub struct ServerCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "FOLIO_BIND", default_value = "0.0.0.0:4000")]
    pub bind: String,

    /// OpenAI API key used for enrichment. Required.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Chat model identifier.
    #[arg(long, env = "FOLIO_OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(
        long,
        env = "FOLIO_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Cache backend.
    #[arg(long, env = "FOLIO_CACHE", value_enum, default_value_t = CacheBackend::Redis)]
    pub cache: CacheBackend,

    /// Redis connection string, used when `--cache redis`.
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Base URL of the Project Gutenberg mirror.
    #[arg(
        long,
        env = "FOLIO_GUTENBERG_BASE",
        default_value = "https://www.gutenberg.org"
    )]
    pub gutenberg_base_url: String,

    /// Seconds before any single outbound request times out.
    #[arg(
        long,
        env = "FOLIO_REQUEST_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_secs: u64,

    /// Lifetime of cached books and not-found markers, at most one year.
    #[arg(
        long,
        env = "FOLIO_CACHE_TTL_SECS",
        default_value_t = DEFAULT_CACHE_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CACHE_TTL_SECS)
    )]
    pub cache_ttl_secs: u64,
}
