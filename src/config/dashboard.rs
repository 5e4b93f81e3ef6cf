// ABOUTME: Dashboard configuration: auxiliary stages, merge gating, and history policy.
// ABOUTME: Plan stages come from the layer registry; everything else is configured here.

use serde::Deserialize;
use std::collections::HashSet;

use crate::dashboard::HistoryPolicy;
use crate::error::{Error, Result};
use crate::registry::LayerRegistry;

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Whether the apply stage must succeed before the PR is reported ready.
    #[serde(default = "default_true")]
    pub require_apply: bool,

    /// Carry the action history over when a new commit starts a fresh dashboard.
    #[serde(default = "default_true")]
    pub carry_history: bool,

    #[serde(default)]
    pub history_policy: HistoryPolicy,

    #[serde(default = "default_auxiliary_stages")]
    pub stages: Vec<AuxiliaryStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuxiliaryStage {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl AuxiliaryStage {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            required: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_auxiliary_stages() -> Vec<AuxiliaryStage> {
    vec![
        AuxiliaryStage::new("e2e", "E2E Tests"),
        AuxiliaryStage::new("review", "AI Review"),
    ]
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            require_apply: true,
            carry_history: true,
            history_policy: HistoryPolicy::default(),
            stages: default_auxiliary_stages(),
        }
    }
}

impl DashboardConfig {
    /// Auxiliary keys must not collide with generated plan/apply keys or each other.
    pub(super) fn validate(&self, registry: &LayerRegistry) -> Result<()> {
        let mut keys: HashSet<String> = registry.names().map(|n| n.plan_stage_key()).collect();
        keys.insert(crate::dashboard::APPLY_STAGE.to_string());

        for stage in &self.stages {
            if stage.key.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "dashboard stage key cannot be empty".to_string(),
                ));
            }
            if !keys.insert(stage.key.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate dashboard stage key: {}",
                    stage.key
                )));
            }
        }

        Ok(())
    }
}
