// ABOUTME: Test support utilities.
// ABOUTME: Scripted fake engine and pull request fixtures for pipeline and router tests.

use async_trait::async_trait;
use layerci::dashboard::{JsonCodec, StateCodec, Status, extract_state_block};
use layerci::engine::{Engine, ExecutionResult, Operation};
use layerci::github::MemoryForge;
use layerci::registry::{EngineKind, Layer, LayerRegistry};
use layerci::types::{CommitSha, PrNumber};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("layerci=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const HEAD_SHA: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

#[allow(dead_code)]
pub fn sha() -> CommitSha {
    CommitSha::new(HEAD_SHA).unwrap()
}

/// In-memory forge with one open pull request at `HEAD_SHA`.
#[allow(dead_code)]
pub fn forge_with_pr(number: u64) -> MemoryForge {
    let forge = MemoryForge::new("acme/infra");
    forge.add_pull_request(PrNumber::new(number), sha(), "feature/layers");
    forge
}

/// Stage statuses in the stored dashboard for `HEAD_SHA`, as another process would read them.
#[allow(dead_code)]
pub fn stored_stages(forge: &MemoryForge, pr: PrNumber) -> BTreeMap<String, Status> {
    forge
        .comments(pr)
        .iter()
        .find_map(|c| {
            let (sha, blob) = extract_state_block(&c.body)?;
            if sha != HEAD_SHA {
                return None;
            }
            JsonCodec.decode(blob).ok()
        })
        .map(|state| {
            state
                .stages
                .into_iter()
                .map(|(key, stage)| (key, stage.status))
                .collect()
        })
        .unwrap_or_default()
}

/// Two-layer registry: bootstrap (terraform, 1) and platform (terragrunt, 2).
#[allow(dead_code)]
pub fn two_layers() -> LayerRegistry {
    LayerRegistry::new(vec![
        Layer::new("bootstrap", "bootstrap", EngineKind::Terraform, 1),
        Layer::new("platform", "platform", EngineKind::Terragrunt, 2),
    ])
    .unwrap()
}

/// Engine returning scripted exit codes per layer and operation.
///
/// Unscripted operations succeed; unscripted plans report no changes.
#[derive(Default)]
pub struct FakeEngine {
    exits: Mutex<HashMap<(String, &'static str), i32>>,
    calls: Mutex<Vec<(String, &'static str, EngineKind)>>,
    observer: Option<Observer>,
}

type Observer = Box<dyn Fn(&str, &'static str) + Send + Sync>;

#[allow(dead_code)]
impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the exit code for `operation` ("init", "plan", "apply", "validate") on `layer`.
    pub fn exit(self, layer: &str, operation: &'static str, code: i32) -> Self {
        self.exits
            .lock()
            .insert((layer.to_string(), operation), code);
        self
    }

    /// Call `observer` with the layer and operation before each execution.
    pub fn observe(mut self, observer: impl Fn(&str, &'static str) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn calls(&self) -> Vec<(String, &'static str)> {
        self.calls
            .lock()
            .iter()
            .map(|(layer, op, _)| (layer.clone(), *op))
            .collect()
    }

    pub fn engines_used(&self) -> Vec<EngineKind> {
        self.calls.lock().iter().map(|(_, _, e)| *e).collect()
    }

    pub fn attempted(&self, layer: &str) -> bool {
        self.calls.lock().iter().any(|(l, _, _)| l == layer)
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn execute(&self, layer: &Layer, operation: Operation) -> ExecutionResult {
        let name = operation.name();
        if let Some(observer) = &self.observer {
            observer(layer.name.as_str(), name);
        }
        self.calls
            .lock()
            .push((layer.name.to_string(), name, layer.engine));

        let code = self
            .exits
            .lock()
            .get(&(layer.name.to_string(), name))
            .copied()
            .unwrap_or(0);

        let stdout = match (name, code) {
            ("plan", 0) => "No changes. Your infrastructure matches the configuration.".to_string(),
            ("plan", 2) => "  # null_resource.a will be created\n  + resource \"null_resource\" \"a\" {}\n\nPlan: 1 to add, 0 to change, 0 to destroy.".to_string(),
            (op, _) => format!("{op} output for {}", layer.name),
        };
        let stderr = if code == 0 || (name == "plan" && code == 2) {
            String::new()
        } else {
            format!("{name} failed for {}", layer.name)
        };

        ExecutionResult::from_exit(operation, code, stdout, stderr)
    }
}
