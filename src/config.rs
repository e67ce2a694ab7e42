//! Configuration
//!
//! CLI arguments with environment variable fallbacks, parsed with clap.

use crate::projection::types::{RecordSchema, SchemaCatalog};
use crate::sync::dispatcher::DeliveryPolicy;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Keeps a search index in sync with a document store and serves hydrated search results.
#[derive(Parser, Debug, Clone)]
#[command(name = "search-sync")]
pub struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Log filter (trace, debug, info, warn, error or a full EnvFilter directive)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Index holding question projections
    #[arg(long, env = "QUESTIONS_INDEX", default_value = "questions")]
    pub questions_index: String,

    /// Index holding user projections
    #[arg(long, env = "USERS_INDEX", default_value = "users")]
    pub users_index: String,

    /// Base URL of an Algolia-compatible index provider. Uses the in-memory index when unset.
    #[arg(long, env = "INDEX_URL")]
    pub index_url: Option<String>,

    /// Application id sent to the index provider
    #[arg(long, env = "INDEX_APP_ID", default_value = "")]
    pub index_app_id: String,

    /// API key sent to the index provider
    #[arg(long, env = "INDEX_API_KEY", default_value = "", hide_env_values = true)]
    pub index_api_key: String,

    /// Request timeout for index provider calls, in milliseconds
    #[arg(long, env = "INDEX_TIMEOUT_MS", default_value_t = 5000)]
    pub index_timeout_ms: u64,

    /// Number of sync workers consuming the change feed
    #[arg(long, env = "DISPATCH_WORKERS", default_value_t = 4)]
    pub dispatch_workers: usize,

    /// Delivery attempts per change event before it is dropped
    #[arg(long, env = "MAX_DELIVERY_ATTEMPTS", default_value_t = 5)]
    pub max_delivery_attempts: usize,
}

impl Args {
    /// Schemas of the synchronized collections.
    pub fn catalog(&self) -> SchemaCatalog {
        SchemaCatalog::new()
            .with(RecordSchema::questions(&self.questions_index))
            .with(RecordSchema::users(&self.users_index))
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts: self.max_delivery_attempts,
            ..DeliveryPolicy::default()
        }
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms)
    }
}
