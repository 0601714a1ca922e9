//! Mapping from wasteful resources to remediation types and risk scores.

use reclaim_core::{RecommendationType, ResourceMetrics, ResourceSnapshot, ResourceType};

/// Fixed risk score (0-10) for each remediation type.
///
/// Deletion-style remediations score lowest (the resource is already idle);
/// configuration changes sit in the middle; anything that can shift live
/// traffic scores highest.
#[must_use]
pub fn risk_of(recommendation_type: RecommendationType) -> u8 {
    match recommendation_type {
        RecommendationType::DeleteUnattached | RecommendationType::ReleaseAddress => 2,
        RecommendationType::DeleteOrphaned | RecommendationType::DeleteUnused => 3,
        RecommendationType::SnapshotCleanup
        | RecommendationType::VolumeRightsizing
        | RecommendationType::LambdaRightsizing => 4,
        RecommendationType::StorageTiering => 5,
        RecommendationType::Rightsizing | RecommendationType::Scheduling => 6,
        RecommendationType::GatewayConsolidation => 7,
        RecommendationType::LbConsolidation => 8,
    }
}

/// Pick the remediation type for a wasteful resource.
///
/// Volumes and snapshots are disambiguated by their metrics (an unattached
/// volume is deleted, a legacy-class one is rightsized; an orphaned snapshot
/// is deleted, an old one is cleaned up). Everything else maps directly from
/// the resource type. Unknown types get the conservative rightsizing tag.
#[must_use]
pub fn classify(snapshot: &ResourceSnapshot) -> RecommendationType {
    match &snapshot.resource_type {
        ResourceType::ComputeInstance
        | ResourceType::ManagedDatabase
        | ResourceType::WarehouseCluster
        | ResourceType::Other(_) => RecommendationType::Rightsizing,

        ResourceType::BlockVolume => match &snapshot.metrics {
            Some(ResourceMetrics::Volume {
                attachment_id: Some(_),
                ..
            }) => RecommendationType::VolumeRightsizing,
            _ => RecommendationType::DeleteUnattached,
        },

        ResourceType::VolumeSnapshot => match &snapshot.metrics {
            Some(ResourceMetrics::Snapshot {
                source_volume_id: Some(_),
                ..
            }) => RecommendationType::SnapshotCleanup,
            _ => RecommendationType::DeleteOrphaned,
        },

        ResourceType::StaticIp => RecommendationType::ReleaseAddress,
        ResourceType::NatGateway => RecommendationType::GatewayConsolidation,
        ResourceType::LoadBalancer => RecommendationType::DeleteUnused,
        ResourceType::ObjectBucket => RecommendationType::StorageTiering,
        ResourceType::ServerlessFunction => RecommendationType::LambdaRightsizing,
    }
}
