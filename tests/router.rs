// ABOUTME: Integration tests for event routing.
// ABOUTME: Covers acknowledgement, commit statuses, auxiliary workflows and the end-to-end PR flow.

mod support;

use layerci::config::{Config, DashboardConfig, WorkflowConfig};
use layerci::dashboard::Status;
use layerci::github::{CommitState, ForgeOp, GitHubEnv, MemoryForge, Reaction};
use layerci::router::{Context, DispatchTable, Event, RouteOutcome, Router};
use layerci::types::{CommentId, PrNumber};
use std::collections::BTreeMap;
use support::{FakeEngine, forge_with_pr, init_tracing, two_layers};

const PR: u64 = 21;

fn config() -> Config {
    Config {
        layers: two_layers(),
        ..Config::default()
    }
}

fn env() -> GitHubEnv {
    GitHubEnv {
        repository: "acme/infra".to_string(),
        server_url: "https://github.com".to_string(),
        run_id: Some("555".to_string()),
        ..GitHubEnv::default()
    }
}

fn comment(body: &str) -> Event {
    Event::Comment {
        pr: Some(PrNumber::new(PR)),
        comment_id: CommentId::new(77),
        body: body.to_string(),
        user: "octo".to_string(),
    }
}

async fn route(config: &Config, engine: &FakeEngine, forge: &MemoryForge, event: &Event) -> RouteOutcome {
    let env = env();
    let table = DispatchTable::from_config(config);
    let ctx = Context::new(config, engine, forge, &env);
    Router::new(ctx, &table).route(event).await
}

fn states(forge: &MemoryForge) -> Vec<CommitState> {
    forge.statuses().into_iter().map(|(_, s)| s.state).collect()
}

#[tokio::test]
async fn comment_plan_is_acknowledged_and_bracketed_by_statuses() {
    init_tracing();
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/plan platform")).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(forge.reactions(), vec![(CommentId::new(77), Reaction::Eyes)]);
    assert_eq!(states(&forge), vec![CommitState::Pending, CommitState::Success]);

    let statuses = forge.statuses();
    let (sha, status) = &statuses[1];
    assert_eq!(sha.as_str(), support::HEAD_SHA);
    assert_eq!(status.context, "CI");
    assert_eq!(status.target_url, "https://github.com/acme/infra/actions/runs/555");

    let comments = forge.comments(PrNumber::new(PR));
    assert!(comments.iter().any(|c| c.body.starts_with("⏳ **/plan** running...")
        && c.body.contains("Triggered by @octo")));
    assert!(!engine.attempted("bootstrap"));

    let dashboard = outcome.execution.unwrap().dashboard.unwrap();
    assert_eq!(dashboard.stage("plan-platform").unwrap().status, Status::Success);
    assert_eq!(dashboard.stage("plan-bootstrap").unwrap().status, Status::Pending);
    assert_eq!(dashboard.history().last().unwrap().trigger, "@octo");
}

#[tokio::test]
async fn failed_apply_sets_failure_status() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new()
        .exit("bootstrap", "plan", 2)
        .exit("bootstrap", "apply", 1);

    let outcome = route(&config, &engine, &forge, &comment("/apply")).await;

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(states(&forge), vec![CommitState::Pending, CommitState::Failure]);
    assert!(!engine.attempted("platform"));
}

#[tokio::test]
async fn unknown_commands_have_no_side_effects() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    for body in ["/deploy everything", "thanks, looks good"] {
        let outcome = route(&config, &engine, &forge, &comment(body)).await;
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.execution.is_none());
    }

    assert!(forge.reactions().is_empty());
    assert!(forge.statuses().is_empty());
    assert!(forge.comments(PrNumber::new(PR)).is_empty());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn legacy_alias_routes_to_plan() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("digger plan bootstrap")).await;

    assert_eq!(outcome.exit_code, 0);
    assert!(engine.attempted("bootstrap"));
    assert!(!engine.attempted("platform"));
}

#[tokio::test]
async fn reporting_failures_never_change_the_exit_code() {
    let config = config();
    let forge = forge_with_pr(PR);
    forge.fail(ForgeOp::AddReaction);
    forge.fail(ForgeOp::SetStatus);
    forge.fail(ForgeOp::CreateComment);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/plan")).await;

    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.diagnostics.has_warnings());
    assert!(outcome.execution.unwrap().diagnostics.dashboard_stale());
}

#[tokio::test]
async fn unresolvable_layers_fail_the_run() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();
    let inputs = BTreeMap::from([
        ("command".to_string(), "plan".to_string()),
        ("layers".to_string(), "nope".to_string()),
        ("pr_number".to_string(), PR.to_string()),
    ]);

    let outcome = route(&config, &engine, &forge, &Event::Dispatch { inputs }).await;

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(states(&forge), vec![CommitState::Pending, CommitState::Failure]);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn push_to_trunk_runs_drift_sweep() {
    let config = config();
    let forge = MemoryForge::new("acme/infra");
    let engine = FakeEngine::new().exit("platform", "plan", 2);
    let push = Event::Push {
        git_ref: "refs/heads/main".to_string(),
    };

    let outcome = route(&config, &engine, &forge, &push).await;

    assert_eq!(outcome.exit_code, 0);
    let report = outcome.execution.unwrap().report.unwrap();
    assert_eq!(report.drifted().count(), 1);
    assert!(!engine.calls().iter().any(|(_, op)| *op == "apply"));
    assert!(forge.statuses().is_empty());
}

#[tokio::test]
async fn e2e_dispatches_workflow_and_tracks_stage() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/e2e")).await;

    assert_eq!(outcome.exit_code, 0);
    let dispatches = forge.dispatches();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].workflow, "e2e-tests.yml");
    assert_eq!(dispatches[0].git_ref, "feature/layers");
    assert_eq!(dispatches[0].inputs["pr_number"], PR.to_string());

    let dashboard = outcome.execution.unwrap().dashboard.unwrap();
    let stage = dashboard.stage("e2e").unwrap();
    assert_eq!(stage.status, Status::Success);
    assert_eq!(
        stage.link.as_deref(),
        Some("https://github.com/acme/infra/actions/workflows/e2e-tests.yml")
    );
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn failed_dispatch_marks_stage_failed() {
    let config = config();
    let forge = forge_with_pr(PR);
    forge.fail(ForgeOp::DispatchWorkflow);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/e2e")).await;

    assert_eq!(outcome.exit_code, 1);
    let dashboard = outcome.execution.unwrap().dashboard.unwrap();
    assert_eq!(dashboard.stage("e2e").unwrap().status, Status::Failure);
}

#[tokio::test]
async fn review_without_workflow_posts_placeholder() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/review")).await;

    assert_eq!(outcome.exit_code, 0);
    assert!(forge.dispatches().is_empty());
    assert!(
        forge
            .comments(PrNumber::new(PR))
            .iter()
            .any(|c| c.body.contains("AI Review triggered"))
    );
}

#[tokio::test]
async fn health_without_workflow_fails() {
    let config = Config {
        workflows: WorkflowConfig {
            e2e: None,
            health: None,
            review: None,
        },
        ..config()
    };
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/health")).await;
    assert_eq!(outcome.exit_code, 1);
}

#[tokio::test]
async fn help_posts_command_table() {
    let config = config();
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new();

    let outcome = route(&config, &engine, &forge, &comment("/help")).await;

    assert_eq!(outcome.exit_code, 0);
    let comments = forge.comments(PrNumber::new(PR));
    let help = comments.iter().find(|c| c.body.contains("💬 Commands")).unwrap();
    assert!(help.body.contains("/plan [layer...]"));
    assert!(help.body.contains("`platform`"));
}

#[tokio::test]
async fn opened_pull_request_plans_to_ready() {
    let config = Config {
        dashboard: DashboardConfig {
            require_apply: false,
            ..DashboardConfig::default()
        },
        ..config()
    };
    let forge = forge_with_pr(PR);
    let engine = FakeEngine::new().exit("bootstrap", "plan", 2);
    let opened = Event::PullRequest {
        number: PrNumber::new(PR),
        action: "opened".to_string(),
        head_sha: Some(support::sha()),
    };

    let outcome = route(&config, &engine, &forge, &opened).await;
    assert_eq!(outcome.exit_code, 0);

    let execution = outcome.execution.unwrap();
    let report = execution.report.unwrap();
    assert_eq!(
        report.outcome_of("bootstrap"),
        Some(layerci::pipeline::LayerOutcome::HasChanges)
    );
    assert_eq!(
        report.outcome_of("platform"),
        Some(layerci::pipeline::LayerOutcome::NoChanges)
    );

    let dashboard = execution.dashboard.unwrap();
    let stages: Vec<(&str, Status)> = dashboard
        .stages()
        .iter()
        .map(|(key, stage)| (key, stage.status))
        .collect();
    assert_eq!(
        stages,
        vec![
            ("plan-bootstrap", Status::Success),
            ("plan-platform", Status::Success),
            ("apply", Status::Pending),
            ("e2e", Status::Pending),
            ("review", Status::Pending),
        ]
    );

    let next = dashboard.next_step();
    assert_eq!(next, "✅ **Ready to merge!**");
    assert!(!next.contains("Waiting"));
    assert_eq!(states(&forge), vec![CommitState::Pending, CommitState::Success]);
}
