use stickynote_core::service::gesture::{ActiveGesture, DragTarget};
use stickynote_core::service::session::EndedGesture;
use stickynote_core::{
    ManualClock, MemoryKeyValueStore, NoteConfig, NoteDraft, NoteId, Point, ResizeEdge,
    SessionController, Size,
};

type Session = SessionController<MemoryKeyValueStore, ManualClock>;

fn running_with(titles: &[&str]) -> (Session, ManualClock, Vec<NoteId>) {
    let clock = ManualClock::new();
    let mut session = SessionController::with_seed(
        MemoryKeyValueStore::new(),
        NoteConfig::default(),
        clock.clone(),
        9,
    );
    session.load().unwrap();
    session.start().unwrap();

    let mut ids = session.registry().ids();
    for title in titles {
        ids.push(session.new_note_with(NoteDraft::titled(*title)).unwrap());
    }
    (session, clock, ids)
}

fn placed(session: &mut Session, x: f64, y: f64) -> NoteId {
    session
        .new_note_with(NoteDraft {
            position: Some(Point::new(x, y)),
            size: Some(Size::new(250.0, 200.0)),
            ..NoteDraft::default()
        })
        .unwrap()
}

fn panel_ids(session: &Session) -> Vec<NoteId> {
    session.panel_view().into_iter().map(|row| row.id).collect()
}

#[test]
fn dragging_a_note_moves_it_by_pointer_delta_and_raises_it() {
    let (mut session, _clock, _ids) = running_with(&[]);
    let id = placed(&mut session, 100.0, 80.0);
    let other = session.new_note().unwrap();
    let writes = session.store().write_count();

    session
        .begin_gesture(&id, None, Point::new(110.0, 90.0))
        .unwrap();
    let top = session.canvas_view().last().unwrap().id.clone();
    assert_eq!(top, id);
    assert_ne!(top, other);

    session.update_gesture(Point::new(130.0, 60.0)).unwrap();
    session.update_gesture(Point::new(160.0, 150.0)).unwrap();
    assert_eq!(session.note(&id).unwrap().position, Point::new(150.0, 140.0));
    assert_eq!(session.store().write_count(), writes);

    let ended = session.end_gesture().unwrap();
    assert_eq!(
        ended,
        Some(EndedGesture {
            kind: "drag_note",
            note_id: Some(id.clone()),
        })
    );
    assert!(!session.active_gesture().is_active());
    assert_eq!(session.store().write_count(), writes + 2);
    assert_eq!(session.end_gesture().unwrap(), None);
}

#[test]
fn left_edge_resize_keeps_right_edge_fixed_and_respects_minimum() {
    let (mut session, _clock, _ids) = running_with(&[]);
    let id = placed(&mut session, 100.0, 80.0);

    session
        .begin_gesture(&id, Some(ResizeEdge::Left), Point::new(100.0, 150.0))
        .unwrap();
    session.update_gesture(Point::new(60.0, 150.0)).unwrap();
    let note = session.note(&id).unwrap();
    assert_eq!((note.position.x, note.size.width), (60.0, 290.0));

    session.update_gesture(Point::new(400.0, 150.0)).unwrap();
    let note = session.note(&id).unwrap();
    assert_eq!(note.size.width, 150.0);
    assert_eq!(note.position.x + note.size.width, 350.0);
    session.end_gesture().unwrap();
}

#[test]
fn bottom_resize_of_collapsed_note_uses_collapsed_minimum() {
    let (mut session, _clock, _ids) = running_with(&[]);
    let id = placed(&mut session, 0.0, 0.0);
    session.toggle_collapse(&id).unwrap();

    session
        .begin_gesture(&id, Some(ResizeEdge::Bottom), Point::new(0.0, 30.0))
        .unwrap();
    session.update_gesture(Point::new(0.0, -500.0)).unwrap();
    assert_eq!(session.note(&id).unwrap().size.height, 30.0);
    session.end_gesture().unwrap();

    session
        .begin_gesture(&id, Some(ResizeEdge::Right), Point::new(250.0, 0.0))
        .unwrap();
    session.update_gesture(Point::new(0.0, 0.0)).unwrap();
    assert_eq!(session.note(&id).unwrap().size.width, 150.0);
}

#[test]
fn starting_a_second_gesture_ends_the_first() {
    let (mut session, _clock, ids) = running_with(&["b"]);
    let writes = session.store().write_count();

    session
        .begin_gesture(&ids[0], None, Point::new(0.0, 0.0))
        .unwrap();
    session.update_gesture(Point::new(5.0, 5.0)).unwrap();
    session
        .begin_gesture(&ids[1], Some(ResizeEdge::Right), Point::new(0.0, 0.0))
        .unwrap();

    assert_eq!(session.active_gesture().note_id(), Some(&ids[1]));
    assert_eq!(session.store().write_count(), writes + 2);
}

#[test]
fn deleting_the_dragged_note_cancels_the_gesture() {
    let (mut session, _clock, ids) = running_with(&["b"]);
    session
        .begin_gesture(&ids[1], None, Point::new(0.0, 0.0))
        .unwrap();
    session.delete_note(&ids[1]).unwrap();

    assert_eq!(*session.active_gesture(), ActiveGesture::None);
    assert_eq!(session.update_gesture(Point::new(9.0, 9.0)).unwrap(), None);
}

#[test]
fn gesture_on_unknown_note_is_rejected_without_side_effects() {
    let (mut session, _clock, ids) = running_with(&[]);
    session
        .begin_gesture(&ids[0], None, Point::new(0.0, 0.0))
        .unwrap();
    let ghost = NoteId::parse("ghost").unwrap();

    assert!(session.begin_gesture(&ghost, None, Point::new(0.0, 0.0)).is_err());
    assert_eq!(session.active_gesture().note_id(), Some(&ids[0]));
}

#[test]
fn panel_and_control_bar_drags_persist_positions() {
    let (mut session, _clock, _ids) = running_with(&[]);
    session
        .begin_panel_drag(Point::new(500.0, 20.0), Point::new(480.0, 10.0))
        .unwrap();
    assert!(matches!(
        session.active_gesture(),
        ActiveGesture::Dragging {
            target: DragTarget::Panel,
            ..
        }
    ));
    session.update_gesture(Point::new(400.0, 60.0)).unwrap();
    session.end_gesture().unwrap();

    session
        .begin_control_bar_drag(Point::new(0.0, 0.0), Point::new(700.0, 20.0))
        .unwrap();
    session.update_gesture(Point::new(-100.0, 5.0)).unwrap();
    session.end_gesture().unwrap();

    let state = session.session_state();
    assert_eq!(state.panel_position, Some(Point::new(380.0, 50.0)));
    assert_eq!(state.control_position, Some(Point::new(600.0, 25.0)));
    let stored = session
        .store()
        .raw("sticky_notes_global_v2_state")
        .unwrap();
    assert!(stored.contains("\"panelLeft\":380"));
    assert!(stored.contains("\"controlTop\":25"));
}

#[test]
fn panel_reorder_changes_canonical_order_but_not_stacking() {
    let (mut session, _clock, ids) = running_with(&["b", "c"]);
    let z_before: Vec<u64> = ids
        .iter()
        .map(|id| session.note(id).unwrap().z_order)
        .collect();

    assert!(session.reorder_panel(&ids[2], &ids[0], false).unwrap());
    let expected = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    assert_eq!(panel_ids(&session), expected);
    assert_eq!(session.registry().ids(), expected);

    let z_after: Vec<u64> = ids
        .iter()
        .map(|id| session.note(id).unwrap().z_order)
        .collect();
    assert_eq!(z_before, z_after);

    let stored = session.store().raw("sticky_notes_global_v2").unwrap();
    let c_at = stored.find(ids[2].as_str()).unwrap();
    let a_at = stored.find(ids[0].as_str()).unwrap();
    assert!(c_at < a_at);
}

#[test]
fn drop_side_follows_drag_direction() {
    let (mut session, _clock, ids) = running_with(&["b", "c"]);

    assert!(session.drop_on_panel(&ids[0], &ids[2]).unwrap());
    assert_eq!(
        panel_ids(&session),
        vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]
    );

    assert!(session.drop_on_panel(&ids[0], &ids[1]).unwrap());
    assert_eq!(
        panel_ids(&session),
        vec![ids[0].clone(), ids[1].clone(), ids[2].clone()]
    );
}

#[test]
fn reorder_with_unknown_ids_is_silent() {
    let (mut session, _clock, ids) = running_with(&["b"]);
    let writes = session.store().write_count();
    let ghost = NoteId::parse("ghost").unwrap();

    assert!(!session.reorder_panel(&ghost, &ids[0], true).unwrap());
    assert!(!session.reorder_panel(&ids[0], &ids[0], true).unwrap());
    assert!(!session.drop_on_panel(&ids[0], &ghost).unwrap());
    assert_eq!(session.store().write_count(), writes);
    assert_eq!(panel_ids(&session), ids);
}

#[test]
fn panel_order_survives_reload() {
    let (mut session, _clock, ids) = running_with(&["b", "c"]);
    session.reorder_panel(&ids[0], &ids[2], true).unwrap();
    session.shutdown().unwrap();

    let mut reloaded = SessionController::with_seed(
        session.store().clone(),
        NoteConfig::default(),
        ManualClock::new(),
        1,
    );
    reloaded.load().unwrap();
    assert_eq!(
        reloaded
            .panel_view()
            .into_iter()
            .map(|row| row.id)
            .collect::<Vec<_>>(),
        vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]
    );
}

#[test]
fn panel_click_raises_and_highlights_briefly() {
    let (mut session, clock, ids) = running_with(&["b", "c"]);

    session.panel_click(&ids[0]).unwrap();
    let view = session.canvas_view();
    let top = view.last().unwrap();
    assert_eq!(top.id, ids[0]);
    assert!(top.highlighted);

    session.panel_click(&ids[1]).unwrap();
    let highlighted: Vec<_> = session
        .canvas_view()
        .into_iter()
        .filter(|view| view.highlighted)
        .map(|view| view.id)
        .collect();
    assert_eq!(highlighted, vec![ids[1].clone()]);

    clock.advance(1500);
    session.tick();
    assert!(session.canvas_view().iter().all(|view| !view.highlighted));
}

#[test]
fn panel_toggle_and_labels() {
    let (mut session, _clock, _ids) = running_with(&["Shopping"]);
    assert!(session.toggle_panel().unwrap());
    assert!(session.session_state().panel_open);
    let labels: Vec<_> = session
        .panel_view()
        .into_iter()
        .map(|row| row.label)
        .collect();
    assert_eq!(labels, vec!["(untitled)".to_string(), "Shopping".to_string()]);
    assert!(!session.toggle_panel().unwrap());
}

#[test]
fn focus_note_only_changes_stacking() {
    let (mut session, _clock, ids) = running_with(&["b"]);
    let writes = session.store().write_count();
    let z = session.focus_note(&ids[0]).unwrap();
    assert!(z > session.note(&ids[1]).unwrap().z_order);
    assert_eq!(session.store().write_count(), writes);
}
