// ABOUTME: Validated infrastructure layer names.
// ABOUTME: Lowercase alphanumerics and hyphens; "all" is reserved as the selection sentinel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Sentinel token selecting every layer in the registry.
pub const ALL_LAYERS: &str = "all";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerNameError {
    #[error("layer name cannot be empty")]
    Empty,

    #[error("layer name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("layer name cannot start or end with a hyphen")]
    EdgeHyphen,

    #[error("layer name \"all\" is reserved")]
    Reserved,

    #[error("invalid character in layer name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerName(String);

impl LayerName {
    pub fn new(value: &str) -> Result<Self, LayerNameError> {
        if value.is_empty() {
            return Err(LayerNameError::Empty);
        }

        if value.len() > 63 {
            return Err(LayerNameError::TooLong);
        }

        if value.starts_with('-') || value.ends_with('-') {
            return Err(LayerNameError::EdgeHyphen);
        }

        if value == ALL_LAYERS {
            return Err(LayerNameError::Reserved);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(LayerNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dashboard stage key for this layer's plan stage.
    pub fn plan_stage_key(&self) -> String {
        format!("plan-{}", self.0)
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for LayerName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LayerName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LayerName::new(&s).map_err(serde::de::Error::custom)
    }
}
