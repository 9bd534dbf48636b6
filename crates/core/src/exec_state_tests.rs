use super::*;

#[test]
fn sequence_is_linear_and_forward_only() {
    assert_eq!(ExecState::Claimed.next(), Some(ExecState::Assessing));
    assert_eq!(ExecState::Gates.next(), Some(ExecState::Committing));
    assert_eq!(ExecState::Completed.next(), None);
    assert_eq!(ExecState::Pending.next(), None);
}

#[test]
fn cannot_skip_states() {
    assert!(!ExecState::Claimed.can_advance_to(ExecState::Executing));
    assert!(ExecState::Claimed.can_advance_to(ExecState::Assessing));
}

#[test]
fn completed_is_terminal() {
    assert!(ExecState::Completed.is_terminal());
    assert!(!ExecState::Gates.is_terminal());
}

#[yare::parameterized(
    claimed    = { ExecState::Claimed, Some(ExecState::Assessing) },
    assessing  = { ExecState::Assessing, Some(ExecState::Executing) },
    executing  = { ExecState::Executing, Some(ExecState::Analyzing) },
    analyzing  = { ExecState::Analyzing, Some(ExecState::Gates) },
    gates      = { ExecState::Gates, Some(ExecState::Committing) },
    committing = { ExecState::Committing, Some(ExecState::Completed) },
    completed  = { ExecState::Completed, None },
    pending    = { ExecState::Pending, None },
)]
fn next_matches_canonical_order(state: ExecState, expected: Option<ExecState>) {
    assert_eq!(state.next(), expected);
}

#[test]
fn property_state_sequence_is_a_prefix_of_canonical_order() {
    // Property 2 (§8): the recorded sequence for any successful attempt is
    // a prefix of the canonical order with no skips or reversals.
    let mut state = ExecState::Claimed;
    let mut visited = vec![state];
    while let Some(next) = state.next() {
        visited.push(next);
        state = next;
    }
    assert_eq!(visited, ExecState::SEQUENCE.to_vec());
}
