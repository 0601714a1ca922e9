use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of cloud resource a snapshot describes.
///
/// The set of known types is fixed; anything else is carried verbatim in
/// [`ResourceType::Other`] so ingestion never drops a resource on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    ComputeInstance,
    ManagedDatabase,
    WarehouseCluster,
    BlockVolume,
    VolumeSnapshot,
    StaticIp,
    NatGateway,
    LoadBalancer,
    ObjectBucket,
    ServerlessFunction,
    /// A type the agent does not know. Evaluated with the conservative
    /// compute-instance rule.
    Other(String),
}

impl ResourceType {
    /// Return the canonical string tag for this resource type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ComputeInstance => "compute-instance",
            Self::ManagedDatabase => "managed-database",
            Self::WarehouseCluster => "warehouse-cluster",
            Self::BlockVolume => "block-volume",
            Self::VolumeSnapshot => "volume-snapshot",
            Self::StaticIp => "static-ip",
            Self::NatGateway => "nat-gateway",
            Self::LoadBalancer => "load-balancer",
            Self::ObjectBucket => "object-bucket",
            Self::ServerlessFunction => "serverless-function",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        match s {
            "compute-instance" => Self::ComputeInstance,
            "managed-database" => Self::ManagedDatabase,
            "warehouse-cluster" => Self::WarehouseCluster,
            "block-volume" => Self::BlockVolume,
            "volume-snapshot" => Self::VolumeSnapshot,
            "static-ip" => Self::StaticIp,
            "nat-gateway" => Self::NatGateway,
            "load-balancer" => Self::LoadBalancer,
            "object-bucket" => Self::ObjectBucket,
            "serverless-function" => Self::ServerlessFunction,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Serialize for ResourceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Utilization metrics for a resource, keyed by resource family.
///
/// Each variant carries only the fields its detection rule reads. Fields are
/// optional so that per-field defaulting stays explicit in the detector
/// instead of being smeared across ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceMetrics {
    /// Compute instance utilization (percentages, 0-100).
    Instance {
        cpu_percent: Option<f64>,
        memory_percent: Option<f64>,
    },
    /// Managed database utilization.
    Database { cpu_percent: Option<f64> },
    /// Data-warehouse cluster utilization.
    Warehouse { cpu_percent: Option<f64> },
    /// Block volume attachment state and storage class.
    Volume {
        attachment_id: Option<String>,
        volume_class: Option<String>,
    },
    /// Volume snapshot provenance and age.
    Snapshot {
        source_volume_id: Option<String>,
        age_days: Option<f64>,
    },
    /// Static IP association state.
    Address { association_id: Option<String> },
    /// Gateway traffic over the measurement window.
    Gateway { bytes_processed: Option<f64> },
    /// Load balancer request volume over the measurement window.
    LoadBalancer { request_count: Option<f64> },
    /// Object storage bucket lifecycle configuration.
    Bucket { has_lifecycle_policy: Option<bool> },
    /// Serverless function utilization.
    Function {
        memory_percent: Option<f64>,
        invocations: Option<f64>,
    },
    /// Metrics for a resource type the agent does not know.
    Generic {
        cpu_percent: Option<f64>,
        memory_percent: Option<f64>,
    },
}

/// A point-in-time observation of one cloud resource.
///
/// Snapshots are produced by the ingestion collaborator and are read-only to
/// the agent. A snapshot with `metrics: None` cannot be evaluated and is
/// always treated as healthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Provider-assigned resource identifier.
    pub id: String,

    /// Tenant that owns the resource.
    pub tenant: String,

    /// The resource type.
    pub resource_type: ResourceType,

    /// Type-specific configuration as reported by the provider.
    pub config: serde_json::Value,

    /// Utilization metrics, when the collector could gather them.
    pub metrics: Option<ResourceMetrics>,

    /// Monthly cost of the resource in account currency.
    pub monthly_cost: f64,

    /// When the snapshot was collected.
    pub collected_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// Create a snapshot with empty config and no metrics.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        tenant: impl Into<String>,
        resource_type: ResourceType,
        monthly_cost: f64,
    ) -> Self {
        Self {
            id: id.into(),
            tenant: tenant.into(),
            resource_type,
            config: serde_json::Value::Null,
            metrics: None,
            monthly_cost,
            collected_at: Utc::now(),
        }
    }

    /// Attach utilization metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: ResourceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Attach provider configuration.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}
