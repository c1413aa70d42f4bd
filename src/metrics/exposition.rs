//! Rendering of scrape samples in the Prometheus text format.

use super::collector::MetricSample;
use super::schema::MetricSchema;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors that can occur while rendering samples.
#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Renders one scrape's samples.
///
/// A fresh registry is built per call, so nothing from a previous scrape
/// can leak into this one. Metrics without samples are left out entirely.
/// If two samples share a metric and label set, the later one wins.
pub fn render(schema: &MetricSchema, samples: &[MetricSample]) -> Result<String, ExpositionError> {
    let registry = Registry::new();

    for (metric, desc) in schema.iter() {
        let mut family = samples.iter().filter(|s| s.metric == metric).peekable();
        if family.peek().is_none() {
            continue;
        }

        let gauge = GaugeVec::new(Opts::new(desc.name.as_str(), desc.help), desc.labels)?;
        for sample in family {
            let values: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
            gauge.get_metric_with_label_values(&values)?.set(sample.value);
        }
        registry.register(Box::new(gauge))?;
    }

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
