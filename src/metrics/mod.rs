//! Prometheus exporter for Proxmox VE.
//!
//! Every scrape of the metrics endpoint runs one fresh collection cycle
//! against the upstream API. Nothing is cached between scrapes.
//!
//! # Metrics Exposed
//!
//! ## Availability
//! - `pve_up` - 1 if both listings were fetched and decoded, 0 otherwise
//!
//! ## Virtual Machine Metrics (labels `vm_id`, `vm_name`)
//! - `pve_cpu_usage` - CPU utilization as a fraction of allocated CPUs
//! - `pve_net_in` - Bytes received since VM start
//! - `pve_net_out` - Bytes sent since VM start
//! - `pve_mem_usage` - Memory in use, in bytes
//! - `pve_mem_max` - Configured memory, in bytes
//!
//! ## Datastore Metrics (label `storage`)
//! - `pve_datastore_total` - Total capacity
//! - `pve_datastore_avail` - Available capacity
//! - `pve_datastore_used` - Used capacity
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pve_exporter::metrics::{exposition, Collector, MetricSchema};
//! use pve_exporter::upstream::{ApiToken, PveClient, UpstreamConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpstreamConfig {
//!     endpoint: "https://pve.example.com:8006".into(),
//!     token: ApiToken::new("monitor@pve!exporter", "secret"),
//!     ..Default::default()
//! };
//! let client = PveClient::new(&config)?;
//! let collector = Collector::new(Arc::new(client), Arc::new(MetricSchema::default()), "localhost");
//!
//! let samples = collector.collect().await;
//! println!("{}", exposition::render(collector.schema(), &samples)?);
//! # Ok(())
//! # }
//! ```

mod collector;
pub mod exposition;
mod schema;
mod server;

pub use collector::{Collector, MetricSample, ScrapeError, ScrapeOutcome};
pub use exposition::{render, ExpositionError};
pub use schema::{Metric, MetricDesc, MetricSchema, DEFAULT_NAMESPACE};
pub use server::{MetricsServer, MetricsServerConfig, ServerError, HEALTH_PATH};
