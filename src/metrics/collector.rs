//! Scrape orchestration.
//!
//! One call to [`Collector::scrape`] is one scrape cycle: fetch and decode
//! the VM listing, then fetch and decode the storage listing, then turn the
//! records into samples. Any failure aborts the cycle and discards whatever
//! was decoded so far, so a scrape is either complete or reports `up 0`
//! alone.

use super::schema::{Metric, MetricSchema};
use crate::decode::{
    decode_datastore_list, decode_vm_list, DatastoreRecord, DecodeError, VirtualMachineRecord,
};
use crate::upstream::{Resource, Upstream, UpstreamError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Why a scrape was aborted.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetching {resource} listing failed: {source}")]
    Fetch {
        resource: Resource,
        #[source]
        source: UpstreamError,
    },

    #[error("decoding {resource} listing failed: {source}")]
    Decode {
        resource: Resource,
        #[source]
        source: DecodeError,
    },
}

impl ScrapeError {
    /// The listing being processed when the scrape failed.
    pub fn resource(&self) -> Resource {
        match self {
            ScrapeError::Fetch { resource, .. } | ScrapeError::Decode { resource, .. } => {
                *resource
            }
        }
    }

    /// The step that failed: `fetch` or `decode`.
    pub fn step(&self) -> &'static str {
        match self {
            ScrapeError::Fetch { .. } => "fetch",
            ScrapeError::Decode { .. } => "decode",
        }
    }
}

/// One gauge value: a metric, its label values in schema order, and the value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric: Metric,
    pub labels: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(metric: Metric, labels: Vec<String>, value: f64) -> Self {
        Self {
            metric,
            labels,
            value,
        }
    }

    fn up(healthy: bool) -> Self {
        Self::new(Metric::Up, Vec::new(), if healthy { 1.0 } else { 0.0 })
    }
}

/// Result of one scrape cycle.
///
/// Always carries exactly one `up` sample, as the last sample. On failure
/// it is the only sample.
#[derive(Debug)]
pub struct ScrapeOutcome {
    samples: Vec<MetricSample>,
    failure: Option<ScrapeError>,
}

impl ScrapeOutcome {
    fn succeeded(mut samples: Vec<MetricSample>) -> Self {
        samples.push(MetricSample::up(true));
        Self {
            samples,
            failure: None,
        }
    }

    fn failed(cause: ScrapeError) -> Self {
        Self {
            samples: vec![MetricSample::up(false)],
            failure: Some(cause),
        }
    }

    /// Whether every upstream step succeeded.
    pub fn is_up(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&ScrapeError> {
        self.failure.as_ref()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}

/// Runs scrape cycles against an [`Upstream`].
///
/// Holds no per-scrape state, so one instance can serve concurrent scrapes.
pub struct Collector {
    upstream: Arc<dyn Upstream>,
    schema: Arc<MetricSchema>,
    node: String,
}

impl Collector {
    /// Creates a collector reading listings of `node`.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        schema: Arc<MetricSchema>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            schema,
            node: node.into(),
        }
    }

    /// The schema samples produced by this collector refer to.
    pub fn schema(&self) -> &MetricSchema {
        &self.schema
    }

    /// Runs one scrape cycle.
    ///
    /// A failure is logged here, once, with the resource and step that
    /// failed. It never surfaces in the samples beyond `up 0`.
    pub async fn scrape(&self) -> ScrapeOutcome {
        let started = Instant::now();

        match self.collect_from_api().await {
            Ok(samples) => {
                tracing::debug!(
                    node = %self.node,
                    samples = samples.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scrape succeeded"
                );
                ScrapeOutcome::succeeded(samples)
            }
            Err(e) => {
                tracing::warn!(
                    node = %self.node,
                    resource = %e.resource(),
                    step = e.step(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Scrape failed"
                );
                ScrapeOutcome::failed(e)
            }
        }
    }

    /// Runs one scrape cycle and returns its samples.
    pub async fn collect(&self) -> Vec<MetricSample> {
        self.scrape().await.into_samples()
    }

    async fn collect_from_api(&self) -> Result<Vec<MetricSample>, ScrapeError> {
        let vms = self
            .fetch(Resource::VirtualMachines, decode_vm_list)
            .await?;
        let stores = self.fetch(Resource::Storage, decode_datastore_list).await?;

        tracing::trace!(vms = vms.len(), datastores = stores.len(), "Decoded listings");

        let mut samples = Vec::with_capacity(vms.len() * 5 + stores.len() * 3 + 1);
        for vm in &vms {
            push_vm_samples(&mut samples, vm);
        }
        for store in &stores {
            push_datastore_samples(&mut samples, store);
        }

        Ok(samples)
    }

    async fn fetch<T>(
        &self,
        resource: Resource,
        decode: fn(&[u8]) -> Result<Vec<T>, DecodeError>,
    ) -> Result<Vec<T>, ScrapeError> {
        let body = self
            .upstream
            .get(&resource.path(&self.node))
            .await
            .map_err(|source| ScrapeError::Fetch { resource, source })?;

        decode(&body).map_err(|source| ScrapeError::Decode { resource, source })
    }
}

fn push_vm_samples(samples: &mut Vec<MetricSample>, vm: &VirtualMachineRecord) {
    let labels = vec![vm.id_label(), vm.name.clone()];

    // Emission order is stable across scrapes.
    for (metric, value) in [
        (Metric::NetIn, vm.netin as f64),
        (Metric::NetOut, vm.netout as f64),
        (Metric::MemMax, vm.maxmem as f64),
        (Metric::MemUsage, vm.mem as f64),
        (Metric::CpuUsage, vm.cpu),
    ] {
        samples.push(MetricSample::new(metric, labels.clone(), value));
    }
}

fn push_datastore_samples(samples: &mut Vec<MetricSample>, store: &DatastoreRecord) {
    for (metric, value) in [
        (Metric::DatastoreTotal, store.total as f64),
        (Metric::DatastoreAvail, store.available as f64),
        (Metric::DatastoreUsed, store.used as f64),
    ] {
        samples.push(MetricSample::new(metric, vec![store.name.clone()], value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const VM_PATH: &str = "/nodes/localhost/qemu/";
    const STORAGE_PATH: &str = "/nodes/localhost/storage/";

    const VM_BODY: &str = r#"{"data":[{"vmid":100,"name":"web1","cpu":0.42,"mem":512,
        "maxmem":1024,"netin":10,"netout":20,"status":"running"}]}"#;
    const STORAGE_BODY: &str =
        r#"{"data":[{"storage":"local","total":1000,"avail":400,"used":600}]}"#;

    enum Reply {
        Body(&'static str),
        Status(u16),
        Unreachable,
    }

    /// In-memory upstream that records every requested path.
    #[derive(Default)]
    struct FakeUpstream {
        replies: HashMap<&'static str, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeUpstream {
        fn with(mut self, path: &'static str, reply: Reply) -> Self {
            self.replies.insert(path, reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn get(&self, path: &str) -> Result<Bytes, UpstreamError> {
            self.calls.lock().unwrap().push(path.to_string());
            match self.replies.get(path) {
                Some(Reply::Body(body)) => Ok(Bytes::from_static(body.as_bytes())),
                Some(Reply::Status(code)) => Err(UpstreamError::Status {
                    path: path.to_string(),
                    status: reqwest::StatusCode::from_u16(*code).unwrap(),
                }),
                Some(Reply::Unreachable) | None => Err(UpstreamError::Transport {
                    path: path.to_string(),
                    // An unparseable URL is the cheapest way to get a reqwest::Error.
                    source: reqwest::Client::new().get("http://[::1").build().unwrap_err(),
                }),
            }
        }
    }

    fn collector(upstream: Arc<FakeUpstream>) -> Collector {
        Collector::new(upstream, Arc::new(MetricSchema::default()), "localhost")
    }

    fn healthy() -> Arc<FakeUpstream> {
        Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body(VM_BODY))
                .with(STORAGE_PATH, Reply::Body(STORAGE_BODY)),
        )
    }

    fn sample(metric: Metric, labels: &[&str], value: f64) -> MetricSample {
        MetricSample::new(metric, labels.iter().map(|s| s.to_string()).collect(), value)
    }

    #[tokio::test]
    async fn test_successful_scrape() {
        let upstream = healthy();
        let outcome = collector(upstream.clone()).scrape().await;

        assert!(outcome.is_up());
        let vm = ["100", "web1"];
        let local = ["local"];
        assert_eq!(
            outcome.samples(),
            [
                sample(Metric::NetIn, &vm, 10.0),
                sample(Metric::NetOut, &vm, 20.0),
                sample(Metric::MemMax, &vm, 1024.0),
                sample(Metric::MemUsage, &vm, 512.0),
                sample(Metric::CpuUsage, &vm, 0.42),
                sample(Metric::DatastoreTotal, &local, 1000.0),
                sample(Metric::DatastoreAvail, &local, 400.0),
                sample(Metric::DatastoreUsed, &local, 600.0),
                sample(Metric::Up, &[], 1.0),
            ]
        );
        assert_eq!(upstream.calls(), [VM_PATH, STORAGE_PATH]);
    }

    #[tokio::test]
    async fn test_sample_counts_scale_with_records() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(
                    VM_PATH,
                    Reply::Body(r#"{"data":[{"vmid":1},{"vmid":2,"name":"b"},{"vmid":3}]}"#),
                )
                .with(
                    STORAGE_PATH,
                    Reply::Body(r#"{"data":[{"storage":"a"},{"storage":"b"}]}"#),
                ),
        );
        let samples = collector(upstream).collect().await;

        let count = |metrics: &[Metric]| {
            samples
                .iter()
                .filter(|s| metrics.contains(&s.metric))
                .count()
        };
        assert_eq!(
            count(&[
                Metric::CpuUsage,
                Metric::NetIn,
                Metric::NetOut,
                Metric::MemUsage,
                Metric::MemMax,
            ]),
            15
        );
        assert_eq!(
            count(&[
                Metric::DatastoreTotal,
                Metric::DatastoreAvail,
                Metric::DatastoreUsed,
            ]),
            6
        );
        assert_eq!(count(&[Metric::Up]), 1);
    }

    #[tokio::test]
    async fn test_empty_node_reports_up_only() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body(r#"{"data":[]}"#))
                .with(STORAGE_PATH, Reply::Body(r#"{"data":null}"#)),
        );
        let outcome = collector(upstream).scrape().await;

        assert!(outcome.is_up());
        assert_eq!(outcome.samples(), [sample(Metric::Up, &[], 1.0)]);
    }

    #[tokio::test]
    async fn test_unreachable_vm_endpoint_skips_storage() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Unreachable)
                .with(STORAGE_PATH, Reply::Body(STORAGE_BODY)),
        );
        let outcome = collector(upstream.clone()).scrape().await;

        assert!(!outcome.is_up());
        assert_eq!(outcome.samples(), [sample(Metric::Up, &[], 0.0)]);
        assert_eq!(upstream.calls(), [VM_PATH]);

        let cause = outcome.failure().unwrap();
        assert_eq!(cause.resource(), Resource::VirtualMachines);
        assert_eq!(cause.step(), "fetch");
    }

    #[tokio::test]
    async fn test_invalid_vm_json_reports_down() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body("{\"data\": [ nope"))
                .with(STORAGE_PATH, Reply::Body(STORAGE_BODY)),
        );
        let outcome = collector(upstream.clone()).scrape().await;

        assert_eq!(outcome.samples(), [sample(Metric::Up, &[], 0.0)]);
        assert!(matches!(
            outcome.failure(),
            Some(ScrapeError::Decode {
                resource: Resource::VirtualMachines,
                ..
            })
        ));
        assert_eq!(upstream.calls(), [VM_PATH]);
    }

    #[tokio::test]
    async fn test_storage_failure_discards_vm_samples() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body(VM_BODY))
                .with(STORAGE_PATH, Reply::Status(500)),
        );
        let outcome = collector(upstream.clone()).scrape().await;

        assert_eq!(outcome.samples(), [sample(Metric::Up, &[], 0.0)]);
        assert_eq!(upstream.calls(), [VM_PATH, STORAGE_PATH]);

        let cause = outcome.failure().unwrap();
        assert_eq!(cause.resource(), Resource::Storage);
        assert_eq!(cause.step(), "fetch");
        assert!(cause.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_zero_values_and_empty_names_are_emitted() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body(r#"{"data":[{"vmid":0}]}"#))
                .with(STORAGE_PATH, Reply::Body(r#"{"data":[]}"#)),
        );
        let samples = collector(upstream).collect().await;

        assert_eq!(samples.len(), 6);
        for s in &samples[..5] {
            assert_eq!(s.labels, ["0", ""]);
            assert_eq!(s.value, 0.0);
        }
    }

    #[tokio::test]
    async fn test_null_record_fields_keep_node_up() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(
                    VM_PATH,
                    Reply::Body(r#"{"data":[{"vmid":100,"name":null,"cpu":0.1}]}"#),
                )
                .with(
                    STORAGE_PATH,
                    Reply::Body(r#"{"data":[{"storage":"local","total":null}]}"#),
                ),
        );
        let samples = collector(upstream).collect().await;

        assert_eq!(samples.len(), 9);
        assert_eq!(samples[4], sample(Metric::CpuUsage, &["100", ""], 0.1));
        assert_eq!(samples[5], sample(Metric::DatastoreTotal, &["local"], 0.0));
        assert_eq!(samples[8], sample(Metric::Up, &[], 1.0));
    }

    #[tokio::test]
    async fn test_scrapes_are_independent() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with(VM_PATH, Reply::Body(VM_BODY))
                .with(STORAGE_PATH, Reply::Body(STORAGE_BODY)),
        );
        let collector = collector(upstream.clone());

        let (a, b) = tokio::join!(collector.collect(), collector.collect());
        assert_eq!(a, b);
        assert_eq!(upstream.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_custom_node_paths() {
        let upstream = Arc::new(
            FakeUpstream::default()
                .with("/nodes/pve2/qemu/", Reply::Body(r#"{"data":[]}"#))
                .with("/nodes/pve2/storage/", Reply::Body(r#"{"data":[]}"#)),
        );
        let collector = Collector::new(upstream.clone(), Arc::new(MetricSchema::default()), "pve2");

        assert!(collector.scrape().await.is_up());
        assert_eq!(upstream.calls(), ["/nodes/pve2/qemu/", "/nodes/pve2/storage/"]);
    }
}
