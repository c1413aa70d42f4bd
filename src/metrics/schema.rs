//! The catalog of exported metrics.

const NO_LABELS: &[&str] = &[];
/// Label dimensions shared by all per-VM metrics.
pub const VM_LABELS: &[&str] = &["vm_id", "vm_name"];
/// Label dimensions shared by all per-datastore metrics.
pub const DATASTORE_LABELS: &[&str] = &["storage"];

/// Namespace prefixed to every production metric name.
pub const DEFAULT_NAMESPACE: &str = "pve";

/// Every metric the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Up,
    CpuUsage,
    NetIn,
    NetOut,
    MemUsage,
    MemMax,
    DatastoreTotal,
    DatastoreAvail,
    DatastoreUsed,
}

impl Metric {
    /// All metrics, in catalog order.
    pub const ALL: [Metric; 9] = [
        Metric::Up,
        Metric::CpuUsage,
        Metric::NetIn,
        Metric::NetOut,
        Metric::MemUsage,
        Metric::MemMax,
        Metric::DatastoreTotal,
        Metric::DatastoreAvail,
        Metric::DatastoreUsed,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Name, help text and label dimensions of one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    /// Fully-qualified name, namespace included.
    pub name: String,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// Immutable catalog mapping each [`Metric`] to its descriptor.
///
/// Built once at startup and shared by the collector and the exposition
/// adapter. A schema with a different namespace can be constructed for
/// tests or for running several exporters side by side.
#[derive(Debug, Clone)]
pub struct MetricSchema {
    namespace: String,
    descs: Vec<MetricDesc>,
}

impl MetricSchema {
    /// Creates the catalog under the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let descs = Metric::ALL
            .into_iter()
            .map(|metric| {
                let (name, help, labels) = Self::definition(metric);
                MetricDesc {
                    name: fq_name(&namespace, name),
                    help,
                    labels,
                }
            })
            .collect();

        Self { namespace, descs }
    }

    fn definition(metric: Metric) -> (&'static str, &'static str, &'static [&'static str]) {
        match metric {
            Metric::Up => ("up", "Was the last query successful.", NO_LABELS),
            Metric::CpuUsage => ("cpu_usage", "CPU Usage", VM_LABELS),
            Metric::NetIn => ("net_in", "Incoming network traffic", VM_LABELS),
            Metric::NetOut => ("net_out", "Outgoing network traffic", VM_LABELS),
            Metric::MemUsage => ("mem_usage", "VM memory usage", VM_LABELS),
            Metric::MemMax => ("mem_max", "VM memory max", VM_LABELS),
            Metric::DatastoreTotal => (
                "datastore_total",
                "Total datastore capacity",
                DATASTORE_LABELS,
            ),
            Metric::DatastoreAvail => (
                "datastore_avail",
                "Available datastore capacity",
                DATASTORE_LABELS,
            ),
            Metric::DatastoreUsed => (
                "datastore_used",
                "Used datastore capacity",
                DATASTORE_LABELS,
            ),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Descriptor of `metric`.
    pub fn desc(&self, metric: Metric) -> &MetricDesc {
        &self.descs[metric.index()]
    }

    /// Iterates over all descriptors in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricDesc)> {
        Metric::ALL.into_iter().zip(self.descs.iter())
    }
}

impl Default for MetricSchema {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

fn fq_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}_{name}")
    }
}
