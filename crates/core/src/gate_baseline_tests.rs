use super::*;
use chrono::Duration;

fn baseline_at(now: DateTime<Utc>, results: Vec<GateResult>) -> GateBaseline {
    GateBaseline::new(CommitHash::from_str_id("abc123"), "main", results, now)
}

#[test]
fn all_passed_is_derived_from_results() {
    let now = Utc::now();
    let passing = baseline_at(
        now,
        vec![GateResult {
            gate_name: "test".into(),
            passed: true,
            output: "ok".into(),
            error: None,
        }],
    );
    assert!(passing.all_passed);

    let failing = baseline_at(
        now,
        vec![GateResult {
            gate_name: "lint".into(),
            passed: false,
            output: "".into(),
            error: Some("boom".into()),
        }],
    );
    assert!(!failing.all_passed);
}

#[test]
fn is_fresh_respects_ttl() {
    let now = Utc::now();
    let baseline = baseline_at(now, vec![]);
    assert!(baseline.is_fresh(now + Duration::minutes(4), Duration::minutes(5)));
    assert!(!baseline.is_fresh(now + Duration::minutes(6), Duration::minutes(5)));
}

#[test]
fn failing_gates_excludes_passed() {
    let now = Utc::now();
    let baseline = baseline_at(
        now,
        vec![
            GateResult {
                gate_name: "test".into(),
                passed: false,
                output: "".into(),
                error: Some("fail".into()),
            },
            GateResult {
                gate_name: "lint".into(),
                passed: true,
                output: "ok".into(),
                error: None,
            },
        ],
    );
    let failing = baseline.failing_gates();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].gate_name, "test");
}
