//! Virtual machine listing (`/nodes/{node}/qemu/`).

use super::{decode_envelope, null_as_default, DecodeError};
use serde::Deserialize;

/// A QEMU virtual machine as reported by the upstream API.
///
/// Only `vmid`, `name`, `cpu`, `mem`, `maxmem`, `netin` and `netout` are
/// projected into metrics. The remaining fields are decoded for completeness
/// and dropped by the collector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VirtualMachineRecord {
    /// Numeric VM identifier, unique within a node.
    #[serde(deserialize_with = "null_as_default")]
    pub vmid: u64,
    /// Display name. Empty when the VM has none.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Power state (`running`, `stopped`, ...). Informational only.
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// CPU utilization as a fraction of the allocated CPUs.
    #[serde(deserialize_with = "null_as_default")]
    pub cpu: f64,
    /// Number of allocated CPUs.
    #[serde(deserialize_with = "null_as_default")]
    pub cpus: u64,
    /// Memory currently used, in bytes.
    #[serde(deserialize_with = "null_as_default")]
    pub mem: u64,
    /// Configured memory, in bytes.
    #[serde(deserialize_with = "null_as_default")]
    pub maxmem: u64,
    /// Bytes received since VM start.
    #[serde(deserialize_with = "null_as_default")]
    pub netin: u64,
    /// Bytes sent since VM start.
    #[serde(deserialize_with = "null_as_default")]
    pub netout: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub disk: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub maxdisk: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub diskread: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub diskwrite: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub pid: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub uptime: u64,
}

impl VirtualMachineRecord {
    /// The `vm_id` label value: the decimal form of `vmid`.
    pub fn id_label(&self) -> String {
        self.vmid.to_string()
    }
}

/// Decodes a VM listing payload.
pub fn decode_vm_list(bytes: &[u8]) -> Result<Vec<VirtualMachineRecord>, DecodeError> {
    decode_envelope("virtual machine", bytes)
}
