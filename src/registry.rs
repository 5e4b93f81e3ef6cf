// ABOUTME: Ordered catalog of deployable infrastructure layers.
// ABOUTME: Resolves layer selections ("all" or explicit names) into registry order.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::config::EnvValue;
use crate::error::{Error, Result};
use crate::types::{ALL_LAYERS, LayerName};

/// IaC tool that drives a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Terraform,
    Terragrunt,
}

impl EngineKind {
    /// Default executable name for this engine.
    pub fn binary_name(&self) -> &'static str {
        match self {
            EngineKind::Terraform => "terraform",
            EngineKind::Terragrunt => "terragrunt",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// One independently deployable unit of infrastructure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Layer {
    pub name: LayerName,
    pub path: PathBuf,
    pub engine: EngineKind,
    pub order: u32,
    #[serde(default)]
    pub state_key: Option<String>,
    /// Extra environment for engine invocations (usually `TF_VAR_*`).
    #[serde(default)]
    pub env: HashMap<String, EnvValue>,
}

impl Layer {
    /// Convenience constructor for statically known layers.
    ///
    /// Panics if `name` is not a valid layer name.
    pub fn new(name: &str, path: &str, engine: EngineKind, order: u32) -> Self {
        Self {
            name: LayerName::new(name).expect("static layer names are valid"),
            path: PathBuf::from(path),
            engine,
            order,
            state_key: None,
            env: HashMap::new(),
        }
    }

    pub fn with_state_key(mut self, key: &str) -> Self {
        self.state_key = Some(key.to_string());
        self
    }
}

/// Which layers a command targets, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSelection {
    All,
    Named(Vec<String>),
}

impl LayerSelection {
    /// Build a selection from raw tokens. Any "all" token, or no tokens at all, selects everything.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if names.is_empty() || names.iter().any(|n| n == ALL_LAYERS) {
            LayerSelection::All
        } else {
            LayerSelection::Named(names)
        }
    }

    /// Parse a comma or whitespace separated list, as passed through workflow inputs.
    pub fn from_list(list: &str) -> Self {
        Self::from_tokens(list.split(|c: char| c == ',' || c.is_whitespace()))
    }

    pub fn tokens(&self) -> Vec<String> {
        match self {
            LayerSelection::All => vec![ALL_LAYERS.to_string()],
            LayerSelection::Named(names) => names.clone(),
        }
    }
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(","))
    }
}

/// Immutable, order-sorted set of layers loaded once at startup.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    layers: NonEmpty<Layer>,
}

impl LayerRegistry {
    /// Build a registry, rejecting duplicates and non-unique orders.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        let mut layers = layers;
        layers.sort_by_key(|l| l.order);

        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.name.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate layer name: {}",
                    layer.name
                )));
            }
        }

        for pair in layers.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(Error::InvalidConfig(format!(
                    "layers {} and {} share order {}",
                    pair[0].name, pair[1].name, pair[0].order
                )));
            }
        }

        let layers = NonEmpty::from_vec(layers)
            .ok_or_else(|| Error::InvalidConfig("at least one layer is required".to_string()))?;

        Ok(Self { layers })
    }

    /// The stock four-layer stack.
    pub fn builtin() -> Self {
        Self {
            layers: NonEmpty {
                head: Layer::new("bootstrap", "bootstrap", EngineKind::Terraform, 1)
                    .with_state_key("k3s/terraform.tfstate"),
                tail: vec![
                    Layer::new("platform", "platform", EngineKind::Terragrunt, 2),
                    Layer::new("data-staging", "envs/staging/data", EngineKind::Terragrunt, 3),
                    Layer::new("data-prod", "envs/prod/data", EngineKind::Terragrunt, 4),
                ],
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All layers, ascending by `order`.
    pub fn all_ordered(&self) -> &NonEmpty<Layer> {
        &self.layers
    }

    pub fn names(&self) -> impl Iterator<Item = &LayerName> {
        self.layers.iter().map(|l| &l.name)
    }

    /// Resolve a selection into layers in registry order, dropping unknown names.
    pub fn resolve(&self, selection: &LayerSelection) -> Result<NonEmpty<&Layer>> {
        let picked: Vec<&Layer> = match selection {
            LayerSelection::All => self.layers.iter().collect(),
            LayerSelection::Named(names) => self
                .layers
                .iter()
                .filter(|l| names.iter().any(|n| n == l.name.as_str()))
                .collect(),
        };

        NonEmpty::from_vec(picked).ok_or_else(|| Error::NoValidLayers(selection.tokens()))
    }
}
