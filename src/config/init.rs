// ABOUTME: Config scaffolding for new repositories.
// ABOUTME: Writes a layerci.yml describing the built-in layer stack.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Error, Result};
use crate::registry::LayerRegistry;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::default());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let mut out = String::new();
    out.push_str("# Layers are planned and applied in ascending `order`.\n");
    out.push_str("layers:\n");
    write_layers(&mut out, &config.layers);

    let _ = write!(
        out,
        r#"
trunk_branch: {}
status_context: {}

timeouts:
  engine: 30m
  api: 30s

dashboard:
  require_apply: {}
  carry_history: {}
  history_policy: change-or-terminal
  stages:
    - key: e2e
      name: E2E Tests
    - key: review
      name: AI Review

workflows:
  e2e: e2e-tests.yml
  # health: health-check.yml
  # review: ai-review.yml
"#,
        config.trunk_branch,
        config.status_context,
        config.dashboard.require_apply,
        config.dashboard.carry_history,
    );
    out
}

fn write_layers(out: &mut String, registry: &LayerRegistry) {
    for layer in registry.all_ordered() {
        let _ = writeln!(out, "  - name: {}", layer.name);
        let _ = writeln!(out, "    path: {}", layer.path.display());
        let _ = writeln!(out, "    engine: {}", layer.engine);
        let _ = writeln!(out, "    order: {}", layer.order);
        if let Some(key) = &layer.state_key {
            let _ = writeln!(out, "    state_key: {key}");
        }
    }
}
