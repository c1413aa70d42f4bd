//! Access to the Proxmox VE HTTP API.
//!
//! The collector only needs "GET this path, give me the body", so the
//! network side sits behind the [`Upstream`] trait. [`PveClient`] is the
//! real implementation; tests drive the collector with in-memory fakes.

mod client;
mod token;

pub use client::{PveClient, UpstreamConfig};
pub use token::ApiToken;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {path} returned {status}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid authorization header: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
}

/// Source of raw upstream payloads.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetches `path` (relative to `/api2/json`) and returns the body.
    async fn get(&self, path: &str) -> Result<Bytes, UpstreamError>;
}

/// The upstream listings a scrape reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    VirtualMachines,
    Storage,
}

impl Resource {
    /// Path of this listing on `node`, relative to `/api2/json`.
    pub fn path(self, node: &str) -> String {
        match self {
            Resource::VirtualMachines => format!("/nodes/{node}/qemu/"),
            Resource::Storage => format!("/nodes/{node}/storage/"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::VirtualMachines => f.write_str("qemu"),
            Resource::Storage => f.write_str("storage"),
        }
    }
}
