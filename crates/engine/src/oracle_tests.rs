use super::*;
use vc_core::{Issue, IssueId};

#[tokio::test]
async fn noop_supervisor_reports_unavailable_everywhere() {
    let oracle = NoopSupervisor;
    let issue = Issue::new(IssueId::from_str_id("vc-1"), "t", chrono::Utc::now());

    assert!(matches!(oracle.pre_assess(&issue).await, Err(OracleError::Unavailable(_))));
    assert!(matches!(
        oracle.analyze_execution(&issue, "", "").await,
        Err(OracleError::Unavailable(_))
    ));
    assert!(matches!(
        oracle.assess_completion(&issue, &[]).await,
        Err(OracleError::Unavailable(_))
    ));
    assert!(matches!(oracle.detect_loop(&[]).await, Err(OracleError::Unavailable(_))));
}
