// oVirt Engine API access
//
// The collector only talks to the engine through the `EngineApi` trait, and
// sessions are created through a `Connector`. `client` holds the HTTP
// implementation; tests plug in the fake engine instead.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod model;

#[cfg(test)]
pub mod fake;

pub use client::EngineConnector;
pub use model::{Api, Cluster, DataCenter, Host, Link, StorageDomain, Vm};

/// Errors returned by the engine API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("could not decode engine response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid engine URL: {0}")]
    Url(String),

    #[error("could not read CA bundle {path}: {source}")]
    CaBundle {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Entity-list access to one engine session
///
/// List operations return `Ok(None)` when the engine answered without the
/// collection element, which it does for empty collections.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Lightweight liveness call
    async fn test(&self) -> Result<(), ApiError>;

    /// Engine root document with product info and summary counters
    async fn api(&self) -> Result<Api, ApiError>;

    async fn datacenters(&self) -> Result<Option<Vec<DataCenter>>, ApiError>;

    /// Clusters, with their gluster volumes inlined
    async fn clusters(&self) -> Result<Option<Vec<Cluster>>, ApiError>;

    async fn hosts(&self) -> Result<Option<Vec<Host>>, ApiError>;

    async fn storage_domains(&self) -> Result<Option<Vec<StorageDomain>>, ApiError>;

    async fn vms(&self) -> Result<Option<Vec<Vm>>, ApiError>;

    /// Ends the session on the engine side; errors are ignored
    async fn close(&self);
}

/// Opens engine sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Engine URL, for messages
    fn endpoint(&self) -> &str;

    async fn connect(&self, timeout: Duration) -> Result<Box<dyn EngineApi>, ApiError>;
}
