use super::*;
use chrono::Duration;

fn instance_at(now: DateTime<Utc>) -> ExecutorInstance {
    ExecutorInstance::new(ExecutorId::from_str_id("e1"), "host".into(), 1234, "0.1.0".into(), now)
}

#[test]
fn is_stale_respects_threshold() {
    let start = Utc::now();
    let mut inst = instance_at(start);
    inst.last_heartbeat = start;

    let just_under = start + Duration::seconds(29);
    let just_over = start + Duration::seconds(31);

    assert!(!inst.is_stale(just_under, Duration::seconds(30)));
    assert!(inst.is_stale(just_over, Duration::seconds(30)));
}
