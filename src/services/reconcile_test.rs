use super::*;
use crate::edits::{EditEvent, EditState};
use crate::error::ErrorCode;
use crate::state::test_helpers::{MockApply, page_url, pages};
use serde_json::json;

/// pages [a,b,c,d]; rotate(b,90), delete(d), reorder(a: 0→2). The live
/// collection after those gestures is [b,c,a].
fn scripted_state() -> (EditState, Vec<Page>) {
    let mut state = EditState::new();
    state.apply(&EditEvent::RotateBy { page_id: "b".into(), delta: 90 }, 1);
    state.apply(&EditEvent::Delete { page_id: "d".into(), url: page_url("d"), index: Some(3) }, 2);
    state.apply(&EditEvent::Reorder { page_id: "a".into(), old_index: 0, new_index: 2 }, 3);
    (state, pages(&["b", "c", "a"]))
}

// =============================================================================
// build_plan
// =============================================================================

#[test]
fn plan_matches_end_to_end_example() {
    let (state, live) = scripted_state();
    let plan = build_plan(state.log(), &live);

    assert_eq!(serde_json::to_value(&plan.rotations).unwrap(), json!({ page_url("b"): 90 }));
    assert_eq!(serde_json::to_value(&plan.deletions).unwrap(), json!({ page_url("d"): true }));
    assert_eq!(plan.order.0, vec![page_url("b"), page_url("c"), page_url("a")]);
    assert_eq!(plan.reorder_count, 1);
}

#[test]
fn plan_order_comes_from_live_collection_not_deltas() {
    let mut state = EditState::new();
    state.apply(&EditEvent::Reorder { page_id: "a".into(), old_index: 0, new_index: 2 }, 1);
    // The collaborator's live order disagrees with the recorded delta.
    let live = pages(&["c", "a", "b"]);
    let plan = build_plan(state.log(), &live);
    assert_eq!(plan.order.0, vec![page_url("c"), page_url("a"), page_url("b")]);
}

#[test]
fn plan_drops_rotations_for_unresolvable_pages() {
    let mut state = EditState::new();
    state.apply(&EditEvent::Rotate { page_id: "ghost".into(), angle: 90 }, 1);
    state.apply(&EditEvent::Rotate { page_id: "a".into(), angle: 180 }, 2);
    let plan = build_plan(state.log(), &pages(&["a"]));
    assert_eq!(plan.rotations.0.len(), 1);
    assert_eq!(plan.rotations.0.get(&page_url("a")), Some(&180));
}

#[test]
fn plan_deletions_use_captured_url() {
    let mut state = EditState::new();
    state.apply(&EditEvent::Delete { page_id: "x".into(), url: "https://old/x.png".into(), index: None }, 1);
    let plan = build_plan(state.log(), &pages(&["a"]));
    assert!(plan.deletions.contains("https://old/x.png"));
}

// =============================================================================
// execute
// =============================================================================

#[tokio::test]
async fn execute_calls_stages_in_fixed_order() {
    let (state, live) = scripted_state();
    let plan = build_plan(state.log(), &live);
    let mock = MockApply::new(Some("https://x/out.tiff"));

    let report = execute(&plan, &mock, PartialFailurePolicy::Abort).await.unwrap();

    assert_eq!(mock.stages(), vec![SaveStage::Rotate, SaveStage::Delete, SaveStage::Reorder]);
    assert_eq!(report.download_url.as_deref(), Some("https://x/out.tiff"));
    assert!(report.warnings.is_empty());
    assert_eq!(
        mock.payload(SaveStage::Reorder),
        Some(json!([page_url("b"), page_url("c"), page_url("a")]))
    );
}

#[tokio::test]
async fn execute_skips_empty_side_payloads() {
    let plan = SavePlan { order: OrderPayload(vec![page_url("a")]), ..SavePlan::default() };
    let mock = MockApply::new(None);
    let report = execute(&plan, &mock, PartialFailurePolicy::Abort).await.unwrap();
    assert_eq!(mock.stages(), vec![SaveStage::Reorder]);
    assert!(report.download_url.is_none());
}

#[tokio::test]
async fn abort_policy_stops_at_first_failed_stage() {
    let (state, live) = scripted_state();
    let plan = build_plan(state.log(), &live);
    let mock = MockApply::new(None).failing_on(SaveStage::Rotate);

    let err = execute(&plan, &mock, PartialFailurePolicy::Abort).await.unwrap_err();

    assert_eq!(err.stage, SaveStage::Rotate);
    assert_eq!(err.error_code(), "E_ROTATE_APPLY_FAILED");
    assert!(err.retryable());
    assert_eq!(mock.stages(), vec![SaveStage::Rotate]);
}

#[tokio::test]
async fn continue_policy_reports_warning_and_still_orders() {
    let (state, live) = scripted_state();
    let plan = build_plan(state.log(), &live);
    let mock = MockApply::new(Some("https://x/out.tiff")).failing_on(SaveStage::Delete);

    let report = execute(&plan, &mock, PartialFailurePolicy::Continue).await.unwrap();

    assert_eq!(mock.stages(), vec![SaveStage::Rotate, SaveStage::Delete, SaveStage::Reorder]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].stage, SaveStage::Delete);
    assert_eq!(report.download_url.as_deref(), Some("https://x/out.tiff"));
}

#[tokio::test]
async fn reorder_failure_is_fatal_under_any_policy() {
    let (state, live) = scripted_state();
    let plan = build_plan(state.log(), &live);
    let mock = MockApply::new(None).failing_on(SaveStage::Reorder);

    let err = execute(&plan, &mock, PartialFailurePolicy::Continue).await.unwrap_err();

    assert_eq!(err.stage, SaveStage::Reorder);
    assert_eq!(err.to_string(), "reorder apply failed: apply response error: status 503");
}
