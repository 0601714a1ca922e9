//! Per-resource-type waste detection.
//!
//! `detect` is a total function: it never fails and never flags a resource it
//! cannot evaluate. Missing metric fields default with a deliberate
//! asymmetry: utilization-style fields assume the wasteful value (0), safety
//! fields assume the healthy value (memory 100, lifecycle policy present).
//! Non-finite values (NaN, infinities) always evaluate healthy so malformed
//! collector data cannot produce a false positive.

use reclaim_core::{ResourceMetrics, ResourceSnapshot, ResourceType};

/// CPU / memory utilization threshold for instances, databases and clusters.
const UTILIZATION_THRESHOLD: f64 = 20.0;

/// Memory utilization threshold for serverless functions.
const FUNCTION_MEMORY_THRESHOLD: f64 = 50.0;

/// Snapshots older than this are cleanup candidates.
const SNAPSHOT_MAX_AGE_DAYS: f64 = 90.0;

/// Gateways processing less than this over the window are idle (1 GiB).
const GATEWAY_BYTES_THRESHOLD: f64 = 1_073_741_824.0;

/// The previous-generation volume class flagged for migration.
pub const LEGACY_VOLUME_CLASS: &str = "gp2";

/// The result of evaluating one resource snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteVerdict {
    /// Whether the resource is likely wasteful.
    pub wasteful: bool,
    /// Human-readable explanation citing the offending values.
    pub reason: String,
}

impl WasteVerdict {
    fn wasteful(reason: impl Into<String>) -> Self {
        Self {
            wasteful: true,
            reason: reason.into(),
        }
    }

    fn healthy(reason: impl Into<String>) -> Self {
        Self {
            wasteful: false,
            reason: reason.into(),
        }
    }
}

/// `value < threshold`, with `default` substituted for a missing value.
/// Non-finite values never satisfy the comparison.
fn below(value: Option<f64>, default: f64, threshold: f64) -> bool {
    let v = value.unwrap_or(default);
    v.is_finite() && v < threshold
}

/// `value > threshold`, with `default` substituted for a missing value.
fn above(value: Option<f64>, default: f64, threshold: f64) -> bool {
    let v = value.unwrap_or(default);
    v.is_finite() && v > threshold
}

/// `value == 0`, with `default` substituted for a missing value.
fn is_zero(value: Option<f64>, default: f64) -> bool {
    let v = value.unwrap_or(default);
    v.is_finite() && v == 0.0
}

/// Evaluate a resource snapshot against the per-type waste rules.
///
/// A snapshot without metrics, or whose metrics variant does not match its
/// resource type, yields `wasteful = false` with reason `"no metrics"`.
#[must_use]
pub fn detect(snapshot: &ResourceSnapshot) -> WasteVerdict {
    let Some(metrics) = &snapshot.metrics else {
        return WasteVerdict::healthy("no metrics");
    };

    match (&snapshot.resource_type, metrics) {
        (
            ResourceType::ComputeInstance,
            ResourceMetrics::Instance {
                cpu_percent,
                memory_percent,
            },
        )
        | (
            ResourceType::Other(_),
            ResourceMetrics::Generic {
                cpu_percent,
                memory_percent,
            },
        ) => detect_instance(*cpu_percent, *memory_percent),

        (ResourceType::ManagedDatabase, ResourceMetrics::Database { cpu_percent })
        | (ResourceType::WarehouseCluster, ResourceMetrics::Warehouse { cpu_percent }) => {
            detect_low_cpu(*cpu_percent)
        }

        (
            ResourceType::BlockVolume,
            ResourceMetrics::Volume {
                attachment_id,
                volume_class,
            },
        ) => detect_volume(attachment_id.as_deref(), volume_class.as_deref()),

        (
            ResourceType::VolumeSnapshot,
            ResourceMetrics::Snapshot {
                source_volume_id,
                age_days,
            },
        ) => detect_snapshot(source_volume_id.as_deref(), *age_days),

        (ResourceType::StaticIp, ResourceMetrics::Address { association_id }) => {
            if association_id.is_none() {
                WasteVerdict::wasteful("address is not associated")
            } else {
                WasteVerdict::healthy("address is in use")
            }
        }

        (ResourceType::NatGateway, ResourceMetrics::Gateway { bytes_processed }) => {
            if below(*bytes_processed, 0.0, GATEWAY_BYTES_THRESHOLD) {
                let bytes = bytes_processed.unwrap_or(0.0);
                WasteVerdict::wasteful(format!(
                    "low traffic: {bytes:.0} bytes processed < 1 GiB"
                ))
            } else {
                WasteVerdict::healthy("within thresholds")
            }
        }

        (ResourceType::LoadBalancer, ResourceMetrics::LoadBalancer { request_count }) => {
            if is_zero(*request_count, 0.0) {
                WasteVerdict::wasteful("no requests in measurement window")
            } else {
                WasteVerdict::healthy("within thresholds")
            }
        }

        (ResourceType::ObjectBucket, ResourceMetrics::Bucket { has_lifecycle_policy }) => {
            if has_lifecycle_policy.unwrap_or(true) {
                WasteVerdict::healthy("lifecycle policy configured")
            } else {
                WasteVerdict::wasteful("no lifecycle policy configured")
            }
        }

        (
            ResourceType::ServerlessFunction,
            ResourceMetrics::Function {
                memory_percent,
                invocations,
            },
        ) => detect_function(*memory_percent, *invocations),

        // Metrics variant does not match the resource type: cannot evaluate.
        _ => WasteVerdict::healthy("no metrics"),
    }
}

fn detect_instance(cpu_percent: Option<f64>, memory_percent: Option<f64>) -> WasteVerdict {
    let cpu_low = below(cpu_percent, 0.0, UTILIZATION_THRESHOLD);
    let memory_low = below(memory_percent, 100.0, UTILIZATION_THRESHOLD);

    if cpu_low && memory_low {
        let cpu = cpu_percent.unwrap_or(0.0);
        let memory = memory_percent.unwrap_or(100.0);
        WasteVerdict::wasteful(format!(
            "low utilization: cpu {cpu:.1}% < {UTILIZATION_THRESHOLD:.0}%, \
             memory {memory:.1}% < {UTILIZATION_THRESHOLD:.0}%"
        ))
    } else {
        WasteVerdict::healthy("within thresholds")
    }
}

fn detect_low_cpu(cpu_percent: Option<f64>) -> WasteVerdict {
    if below(cpu_percent, 0.0, UTILIZATION_THRESHOLD) {
        let cpu = cpu_percent.unwrap_or(0.0);
        WasteVerdict::wasteful(format!(
            "low cpu utilization: {cpu:.1}% < {UTILIZATION_THRESHOLD:.0}%"
        ))
    } else {
        WasteVerdict::healthy("within thresholds")
    }
}

fn detect_volume(attachment_id: Option<&str>, volume_class: Option<&str>) -> WasteVerdict {
    if attachment_id.is_none() {
        return WasteVerdict::wasteful("volume is unattached");
    }
    if volume_class == Some(LEGACY_VOLUME_CLASS) {
        return WasteVerdict::wasteful(format!(
            "legacy volume class {LEGACY_VOLUME_CLASS}"
        ));
    }
    WasteVerdict::healthy("volume attached and current generation")
}

fn detect_snapshot(source_volume_id: Option<&str>, age_days: Option<f64>) -> WasteVerdict {
    if source_volume_id.is_none() {
        return WasteVerdict::wasteful("orphaned snapshot: source volume missing");
    }
    if above(age_days, 0.0, SNAPSHOT_MAX_AGE_DAYS) {
        let age = age_days.unwrap_or(0.0);
        return WasteVerdict::wasteful(format!(
            "snapshot age {age:.0} days > {SNAPSHOT_MAX_AGE_DAYS:.0} days"
        ));
    }
    WasteVerdict::healthy("snapshot has a live source and is recent")
}

fn detect_function(memory_percent: Option<f64>, invocations: Option<f64>) -> WasteVerdict {
    if is_zero(invocations, 0.0) {
        return WasteVerdict::wasteful("zero invocations");
    }
    if below(memory_percent, 100.0, FUNCTION_MEMORY_THRESHOLD) {
        let memory = memory_percent.unwrap_or(100.0);
        return WasteVerdict::wasteful(format!(
            "low memory utilization: {memory:.1}% < {FUNCTION_MEMORY_THRESHOLD:.0}%"
        ));
    }
    WasteVerdict::healthy("within thresholds")
}
