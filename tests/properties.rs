// ABOUTME: Property tests for the pure building blocks.
// ABOUTME: State block embedding, comment parsing, stage transitions, layer order and exit codes.

use chrono::{DateTime, TimeZone, Utc};
use layerci::command::{AliasTable, CommandParser};
use layerci::config::Config;
use layerci::dashboard::{
    ActionHistoryItem, Dashboard, JsonCodec, PersistedStage, PersistedState, StateCodec, Status,
    extract_state_block, state_block,
};
use layerci::engine::{ExecutionResult, Operation, PlanResult};
use layerci::pipeline::{LayerOutcome, LayerReport, RunKind, RunReport};
use layerci::registry::{EngineKind, Layer, LayerRegistry, LayerSelection};
use layerci::types::{CommitSha, LayerName, PrNumber};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Pending),
        Just(Status::Running),
        Just(Status::Success),
        Just(Status::Failure),
        Just(Status::Skipped),
    ]
}

fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
    (1577836800i64..1893456000i64).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    })
}

/// Free text that may try to close the surrounding HTML comment.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9 :/._-]{0,24}",
        Just("-->".to_string()),
        Just("<!-- infra-dashboard-state: x /infra-dashboard-state -->".to_string()),
        Just("<script>alert(1)</script>".to_string()),
    ]
}

fn arb_state() -> impl Strategy<Value = PersistedState> {
    let stage = (arb_status(), proptest::option::of(arb_text()), proptest::option::of(arb_time()))
        .prop_map(|(status, link, time)| PersistedStage { status, link, time });
    let item = (arb_text(), arb_text(), arb_status(), proptest::option::of(arb_text()), arb_time())
        .prop_map(|(action, trigger, status, link, time)| ActionHistoryItem {
            action,
            trigger,
            status,
            link,
            time,
        });
    (
        0u64..1000,
        proptest::collection::btree_map("[a-z-]{1,12}", stage, 0..6),
        proptest::collection::vec(item, 0..6),
    )
        .prop_map(|(revision, stages, history)| PersistedState {
            revision,
            stages,
            history,
            ..PersistedState::default()
        })
}

fn arb_outcome() -> impl Strategy<Value = LayerOutcome> {
    prop_oneof![
        Just(LayerOutcome::NoChanges),
        Just(LayerOutcome::HasChanges),
        Just(LayerOutcome::Applied),
        Just(LayerOutcome::Error),
    ]
}

/// Layers with distinct orders, in arbitrary input order.
fn arb_layers() -> impl Strategy<Value = Vec<Layer>> {
    proptest::collection::btree_set(0u32..10_000, 1..10)
        .prop_flat_map(|orders| Just(orders.into_iter().collect::<Vec<_>>()).prop_shuffle())
        .prop_map(|orders| {
            orders
                .into_iter()
                .map(|order| {
                    let name = format!("layer-{order}");
                    let engine = if order % 2 == 0 {
                        EngineKind::Terraform
                    } else {
                        EngineKind::Terragrunt
                    };
                    Layer::new(&name, &name, engine, order)
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn state_block_survives_hostile_text(state in arb_state()) {
        let sha = CommitSha::new("0123456789abcdef").unwrap();
        let blob = JsonCodec.encode(&state).unwrap();
        prop_assert!(!blob.contains("-->"));
        prop_assert!(!blob.contains('\n'));

        let body = format!("## Dashboard\n\n{}\n\ntrailing text", state_block(&sha, &blob));
        let (found_sha, found_blob) = extract_state_block(&body).unwrap();
        prop_assert_eq!(found_sha, sha.as_str());
        prop_assert_eq!(JsonCodec.decode(found_blob).unwrap(), state);
    }

    #[test]
    fn text_without_prefix_is_never_a_command(text in "[a-zA-Z0-9 ,.!?]{0,40}") {
        let parser = CommandParser::new(&LayerRegistry::builtin(), AliasTable::default());
        let lowered = text.trim().to_lowercase();
        prop_assume!(!lowered.starts_with("digger ") && !lowered.starts_with("atlantis "));
        prop_assume!(lowered != "digger" && lowered != "atlantis");
        prop_assert!(parser.parse(&text).is_none());
    }

    #[test]
    fn parsed_layers_are_known_or_all(words in proptest::collection::vec("[a-z-]{1,12}", 0..6)) {
        let registry = LayerRegistry::builtin();
        let parser = CommandParser::new(&registry, AliasTable::default());
        let comment = format!("/plan {}", words.join(" "));
        let parsed = parser.parse(&comment).unwrap();
        prop_assert!(!parsed.layers.is_empty());
        for layer in &parsed.layers {
            prop_assert!(layer == "all" || registry.contains(layer));
        }
        for word in &words {
            prop_assert!(parsed.layers.contains(word) || parsed.args.contains(word));
        }
    }

    #[test]
    fn stages_never_return_to_pending(updates in proptest::collection::vec(arb_status(), 1..12)) {
        let mut dash = Dashboard::from_config(
            PrNumber::new(1),
            CommitSha::new("abcdef0").unwrap(),
            &Config::default(),
        );
        let mut left_pending = false;
        for status in updates {
            let _ = dash.update_stage("apply", status, None);
            let current = dash.stage("apply").unwrap().status;
            if left_pending {
                prop_assert_ne!(current, Status::Pending);
            }
            left_pending |= current != Status::Pending;
        }
    }

    #[test]
    fn exit_code_is_one_iff_a_layer_errored(outcomes in proptest::collection::vec(arb_outcome(), 0..8)) {
        let mut report = RunReport::new(RunKind::Apply);
        for (i, outcome) in outcomes.iter().enumerate() {
            let name = LayerName::new(&format!("layer-{i}")).unwrap();
            report.push(LayerReport::new(name, *outcome, String::new()));
        }
        let errored = outcomes.iter().any(|o| *o == LayerOutcome::Error);
        prop_assert_eq!(report.exit_code(), i32::from(errored));
        prop_assert_eq!(report.success(), !errored);
    }

    #[test]
    fn plan_exit_codes_are_tri_state(code in prop_oneof![Just(0), Just(2), any::<i32>()]) {
        let expected = match code {
            0 => PlanResult::NoChanges,
            2 => PlanResult::HasChanges,
            _ => PlanResult::Error,
        };
        prop_assert_eq!(PlanResult::from_exit_code(code), expected);

        let detailed = ExecutionResult::from_exit(
            Operation::Plan { detailed_exitcode: true },
            code,
            String::new(),
            String::new(),
        );
        prop_assert_eq!(detailed.success, code == 0 || code == 2);
        prop_assert_eq!(detailed.plan_result, Some(expected));

        let plain = ExecutionResult::from_exit(
            Operation::Plan { detailed_exitcode: false },
            code,
            String::new(),
            String::new(),
        );
        prop_assert_eq!(plain.success, code == 0);
        prop_assert_eq!(plain.plan_result, None);
    }

    #[test]
    fn resolved_layers_are_strictly_ordered(layers in arb_layers()) {
        let count = layers.len();
        let registry = LayerRegistry::new(layers).unwrap();
        let resolved = registry.resolve(&LayerSelection::All).unwrap();

        prop_assert_eq!(resolved.len(), count);
        let orders: Vec<u32> = resolved.iter().map(|l| l.order).collect();
        prop_assert!(orders.windows(2).all(|pair| pair[0] < pair[1]));
        let names: std::collections::HashSet<&str> =
            resolved.iter().map(|l| l.name.as_str()).collect();
        prop_assert_eq!(names.len(), count);
    }
}
