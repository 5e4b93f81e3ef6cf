// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Builds the validated layer registry from the `layers` list.

use serde::Deserialize;

use crate::registry::{Layer, LayerRegistry};

pub fn deserialize_registry<'de, D>(deserializer: D) -> Result<LayerRegistry, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let layers: Vec<Layer> = Vec::deserialize(deserializer)?;
    LayerRegistry::new(layers).map_err(serde::de::Error::custom)
}
