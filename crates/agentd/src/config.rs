use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use reclaim_core::{AgentConfig, RecommendationType};

/// Top-level daemon configuration, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ReclaimConfig {
    /// Cycle scheduling.
    #[serde(default)]
    pub agent: AgentSection,
    /// Autonomous-execution policy.
    #[serde(default)]
    pub policy: PolicySection,
}

/// `[agent]` section: what to scan and how often.
#[derive(Debug, Deserialize)]
pub struct AgentSection {
    /// Tenant the daemon runs cycles for.
    pub tenant: String,
    /// Seconds between optimization cycles.
    pub interval_seconds: u64,
    /// Optional path to a JSON file with resource snapshots. The file is
    /// re-read at every cycle, so a fleet can be edited live.
    pub resources_file: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            tenant: "default".into(),
            interval_seconds: 300,
            resources_file: None,
        }
    }
}

impl AgentSection {
    /// Cycle interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// `[policy]` section: the initial [`AgentConfig`].
#[derive(Debug, Deserialize)]
pub struct PolicySection {
    pub autonomous_enabled: bool,
    pub max_autonomous_risk: u8,
    pub approval_ceiling: f64,
    /// Recommendation type tags, e.g. `["delete-unattached"]`.
    pub allowed_types: Vec<String>,
}

impl Default for PolicySection {
    fn default() -> Self {
        let defaults = AgentConfig::default();
        Self {
            autonomous_enabled: defaults.autonomous_enabled,
            max_autonomous_risk: defaults.max_autonomous_risk,
            approval_ceiling: defaults.approval_ceiling,
            allowed_types: Vec::new(),
        }
    }
}

impl PolicySection {
    /// Convert into the runtime policy, rejecting unknown type tags.
    pub fn to_agent_config(&self) -> Result<AgentConfig, String> {
        let allowed_types = self
            .allowed_types
            .iter()
            .map(|tag| RecommendationType::from_str(tag))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AgentConfig {
            autonomous_enabled: self.autonomous_enabled,
            max_autonomous_risk: self.max_autonomous_risk,
            approval_ceiling: self.approval_ceiling,
            allowed_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ReclaimConfig = toml::from_str("").unwrap();
        assert_eq!(config.agent.tenant, "default");
        assert_eq!(config.agent.interval_seconds, 300);
        assert!(!config.policy.autonomous_enabled);
    }

    #[test]
    fn full_config_parses() {
        let config: ReclaimConfig = toml::from_str(
            r#"
            [agent]
            tenant = "prod"
            interval_seconds = 60
            resources_file = "fleet.json"

            [policy]
            autonomous_enabled = true
            max_autonomous_risk = 4
            approval_ceiling = 20000.0
            allowed_types = ["delete-unattached", "release-address"]
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.tenant, "prod");
        assert_eq!(config.agent.interval(), Duration::from_secs(60));

        let policy = config.policy.to_agent_config().unwrap();
        assert!(policy.autonomous_enabled);
        assert_eq!(policy.max_autonomous_risk, 4);
        assert_eq!(
            policy.allowed_types,
            vec![
                RecommendationType::DeleteUnattached,
                RecommendationType::ReleaseAddress,
            ]
        );
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let config: ReclaimConfig = toml::from_str(
            r#"
            [policy]
            autonomous_enabled = true
            max_autonomous_risk = 3
            approval_ceiling = 1000.0
            allowed_types = ["delete-everything"]
            "#,
        )
        .unwrap();
        assert!(config.policy.to_agent_config().is_err());
    }
}
