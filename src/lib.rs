//! Proxmox VE Prometheus Exporter Library
//!
//! Bridges the Proxmox VE HTTP API to Prometheus. Each scrape of the
//! metrics endpoint queries the API for the node's QEMU virtual machines
//! and storage volumes and exposes them as gauges.
//!
//! # Architecture
//!
//! The system follows an explicit data flow, once per scrape:
//!
//! ```text
//! upstream → decode → metrics::Collector → metrics::exposition
//!   (bytes)  (records)     (samples)             (text)
//! ```
//!
//! # Design Principles
//!
//! - **All-or-nothing**: a scrape either exports every metric or only `pve_up 0`
//! - **No state between scrapes**: every scrape is a fresh upstream round-trip
//! - **Faithful values**: upstream numbers are exported as reported, unclamped
//! - **Explicit trust**: TLS verification is only skipped when asked for
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pve_exporter::{
//!     metrics::{Collector, MetricSchema, MetricsServer, MetricsServerConfig},
//!     upstream::{ApiToken, PveClient, UpstreamConfig},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let upstream = UpstreamConfig {
//!     endpoint: "https://pve.example.com:8006".into(),
//!     token: ApiToken::new("monitor@pve!exporter", "secret"),
//!     insecure_skip_verify: true,
//!     ..Default::default()
//! };
//!
//! let client = Arc::new(PveClient::new(&upstream)?);
//! let collector = Collector::new(client, Arc::new(MetricSchema::default()), &upstream.node);
//!
//! MetricsServer::new(MetricsServerConfig::default(), Arc::new(collector))
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod decode;
pub mod metrics;
pub mod upstream;

// Re-export commonly used types at crate root
pub use config::{CliArgs, ConfigError, ExporterConfig};
pub use decode::{DatastoreRecord, DecodeError, VirtualMachineRecord};
pub use metrics::{Collector, MetricSample, MetricSchema, ScrapeOutcome};
pub use upstream::{ApiToken, PveClient, Upstream, UpstreamConfig, UpstreamError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
