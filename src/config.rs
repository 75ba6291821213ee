use std::{net::SocketAddr, path::PathBuf};

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on. Defaults to 127.0.0.1:8000.
    pub listen_address: Option<SocketAddr>,
    /// Database connection string, e.g. `sqlite://data/adspace.db`.
    pub db: String,
    /// Proof-image blob storage.
    pub blob: BlobConfig,
    /// Session token lifetime.
    #[serde(default)]
    pub session: SessionConfig,
    /// Optional metrics exporter.
    pub metrics: Option<MetricConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlobConfig {
    /// Directory that uploaded proof images are written to.
    pub path: PathBuf,
    /// Maximum accepted upload size, in bytes.
    pub limit: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl(),
        }
    }
}

fn default_session_ttl() -> i64 {
    72
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "exporter", rename_all = "snake_case")]
pub enum MetricConfig {
    /// Push metrics to a Prometheus push gateway at the given URL.
    PrometheusPush { url: String },
}
