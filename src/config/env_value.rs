// ABOUTME: Layer environment values with interpolation from the CI environment.
// ABOUTME: Literal strings or references to variables populated from the secret store.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }

    /// Log-safe description that never includes the resolved value.
    pub fn describe(&self) -> String {
        match self {
            EnvValue::Literal(_) => "<literal>".to_string(),
            EnvValue::FromEnv { var, .. } => format!("${var}"),
        }
    }
}

/// Resolve every entry, sorted by key so process environments are deterministic.
pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<Vec<(String, String)>> {
    let mut resolved = map
        .iter()
        .map(|(k, v)| v.resolve().map(|value| (k.clone(), value)))
        .collect::<Result<Vec<_>>>()?;
    resolved.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(resolved)
}
