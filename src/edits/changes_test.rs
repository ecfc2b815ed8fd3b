use super::*;

fn kinds(log: &ChangeLog) -> Vec<(ChangeKind, String)> {
    log.iter()
        .map(|c| (c.payload.kind(), c.payload.image_id().to_owned()))
        .collect()
}

fn reorder_of<'a>(log: &'a ChangeLog, id: &str) -> (usize, usize, &'a [AffectedPosition]) {
    log.iter()
        .find_map(|c| match &c.payload {
            ChangePayload::Reorder { image_id, old_index, new_index, affected } if image_id == id => {
                Some((*old_index, *new_index, affected.as_slice()))
            }
            _ => None,
        })
        .expect("reorder entry should exist")
}

// =============================================================================
// normalize_angle
// =============================================================================

#[test]
fn normalize_angle_wraps_into_range() {
    assert_eq!(normalize_angle(0), 0);
    assert_eq!(normalize_angle(90), 90);
    assert_eq!(normalize_angle(360), 0);
    assert_eq!(normalize_angle(450), 90);
    assert_eq!(normalize_angle(-90), 270);
    assert_eq!(normalize_angle(-720), 0);
}

// =============================================================================
// Rotate
// =============================================================================

#[test]
fn rotating_twice_coalesces_to_one_entry_in_place() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.rotate_by("b", 90, 1);
    log.record_reorder(&mut positions, "a", 0, 2, 2);
    log.rotate_by("b", 90, 3);

    assert_eq!(log.len(), 2);
    assert_eq!(kinds(&log), vec![(ChangeKind::Rotate, "b".into()), (ChangeKind::Reorder, "a".into())]);
    assert_eq!(log.pending_rotation("b"), Some(180));
    let first = log.iter().next().unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(first.recorded_at, 3);
}

#[test]
fn rotating_back_to_zero_removes_entry() {
    let mut log = ChangeLog::new();
    log.record_rotate("p", 270, 1);
    log.rotate_by("p", 90, 2);
    assert!(log.is_empty());
    assert_eq!(log.pending_rotation("p"), None);
}

#[test]
fn absolute_rotate_replaces_angle() {
    let mut log = ChangeLog::new();
    log.record_rotate("p", 90, 1);
    log.record_rotate("p", -90, 2);
    assert_eq!(log.len(), 1);
    assert_eq!(log.pending_rotation("p"), Some(270));
}

#[test]
fn zero_rotate_without_pending_entry_is_noop() {
    let mut log = ChangeLog::new();
    assert!(log.record_rotate("p", 720, 1));
    assert!(log.is_empty());
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn delete_purges_pending_rotate_and_reorder() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_rotate("p", 90, 1);
    log.record_reorder(&mut positions, "p", 1, 3, 2);
    log.record_rotate("q", 180, 3);

    log.record_delete(&mut positions, "p", "https://cdn.test/p.png", None, 4);

    assert_eq!(kinds(&log), vec![(ChangeKind::Rotate, "q".into()), (ChangeKind::Delete, "p".into())]);
    let delete = log.iter().last().unwrap();
    assert_eq!(
        delete.payload,
        ChangePayload::Delete { image_id: "p".into(), image_url: "https://cdn.test/p.png".into() }
    );
}

#[test]
fn edits_after_delete_are_ignored() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_delete(&mut positions, "p", "u", None, 1);

    assert!(!log.record_rotate("p", 90, 2));
    assert!(!log.rotate_by("p", 90, 3));
    assert!(!log.record_reorder(&mut positions, "p", 0, 1, 4));
    assert!(!log.record_delete(&mut positions, "p", "u", None, 5));
    assert_eq!(log.len(), 1);
    assert!(log.is_deleted("p"));
}

#[test]
fn delete_shifts_tracked_positions_after_deleted_page() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "x", 0, 2, 1);
    log.record_reorder(&mut positions, "y", 1, 4, 2);
    log.record_reorder(&mut positions, "z", 5, 1, 3);

    log.record_delete(&mut positions, "x", "ux", None, 4);

    assert_eq!(positions.current("y"), Some(3));
    assert_eq!(positions.current("z"), Some(1));
}

#[test]
fn delete_of_unmoved_page_uses_index_hint() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "y", 0, 5, 1);

    log.record_delete(&mut positions, "d", "ud", Some(2), 2);
    assert_eq!(positions.current("y"), Some(4));

    log.record_delete(&mut positions, "e", "ue", None, 3);
    assert_eq!(positions.current("y"), Some(4));
}

// =============================================================================
// Reorder
// =============================================================================

#[test]
fn repeated_moves_pin_the_first_original_index() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "p", 3, 5, 1);
    log.record_reorder(&mut positions, "p", 5, 1, 2);

    assert_eq!(log.len(), 1);
    let (old_index, new_index, _) = reorder_of(&log, "p");
    assert_eq!((old_index, new_index), (3, 1));
}

#[test]
fn reorder_moves_to_end_of_log() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "p", 0, 1, 1);
    log.record_rotate("q", 90, 2);
    log.record_reorder(&mut positions, "p", 1, 2, 3);

    assert_eq!(kinds(&log), vec![(ChangeKind::Rotate, "q".into()), (ChangeKind::Reorder, "p".into())]);
    assert_eq!(log.iter().last().unwrap().id, 3);
}

#[test]
fn reorder_snapshots_other_tracked_pages() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "a", 0, 3, 1);
    log.record_reorder(&mut positions, "b", 2, 0, 2);

    let (_, _, affected) = reorder_of(&log, "b");
    assert_eq!(
        affected,
        &[AffectedPosition { image_id: "a".into(), original_position: 0, current_position: 3 }]
    );
}

#[test]
fn reorder_snapshot_excludes_deleted_pages() {
    let mut log = ChangeLog::new();
    let mut positions = PositionTracker::new();
    log.record_reorder(&mut positions, "a", 0, 3, 1);
    log.record_delete(&mut positions, "a", "ua", None, 2);
    log.record_reorder(&mut positions, "b", 2, 0, 3);

    let (_, _, affected) = reorder_of(&log, "b");
    assert!(affected.is_empty());
}

// =============================================================================
// clear / serialization
// =============================================================================

#[test]
fn clear_empties_log_but_tokens_keep_increasing() {
    let mut log = ChangeLog::new();
    log.record_rotate("p", 90, 1);
    log.clear();
    assert!(log.is_empty());
    assert!(!log.is_deleted("p"));
    log.record_rotate("p", 90, 2);
    assert_eq!(log.iter().next().unwrap().id, 2);
}

#[test]
fn change_serializes_flat_with_kind_tag() {
    let mut log = ChangeLog::new();
    log.record_rotate("p", 90, 1_700_000_000_000);
    let json = serde_json::to_value(log.iter().next().unwrap()).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["kind"], "rotate");
    assert_eq!(json["image_id"], "p");
    assert_eq!(json["angle_degrees"], 90);
    assert_eq!(json["recorded_at"], 1_700_000_000_000_i64);
}
