use stickynote_core::repo::snapshot::LoadStatus;
use stickynote_core::service::session::SessionPhase;
use stickynote_core::{
    Clock, ManualClock, MemoryKeyValueStore, NoteColor, NoteConfig, NoteDraft, NoteId, SessionController,
    SessionError,
};

const NOTES_KEY: &str = "sticky_notes_global_v2";
const SESSION_KEY: &str = "sticky_notes_global_v2_state";

type Session = SessionController<MemoryKeyValueStore, ManualClock>;

fn session_over(store: MemoryKeyValueStore) -> (Session, ManualClock) {
    let clock = ManualClock::new();
    let session = SessionController::with_seed(store, NoteConfig::default(), clock.clone(), 42);
    (session, clock)
}

fn running(store: MemoryKeyValueStore) -> (Session, ManualClock) {
    let (mut session, clock) = session_over(store);
    session.load().unwrap();
    session.start().unwrap();
    (session, clock)
}

#[test]
fn empty_store_bootstraps_one_default_note_and_persists_it() {
    let (mut session, _clock) = session_over(MemoryKeyValueStore::new());

    let summary = session.load().unwrap();
    assert!(summary.bootstrapped);
    assert_eq!(summary.notes_status, LoadStatus::Missing);
    assert_eq!(summary.session_status, LoadStatus::Missing);
    assert_eq!(session.phase(), SessionPhase::Loaded);

    let notes: Vec<_> = session.registry().iter().collect();
    assert_eq!(notes.len(), 1);
    let note = notes[0];
    assert_eq!(note.color, NoteColor::Palette(0));
    assert_eq!((note.size.width, note.size.height), (250.0, 200.0));
    assert_eq!(note.opacity, 0.99);
    assert!((50.0..150.0).contains(&note.position.x));
    assert!((50.0..150.0).contains(&note.position.y));
    assert_eq!(session.session_state().next_color_index, 0);

    assert!(session.store().raw(NOTES_KEY).is_some());
    assert!(session.store().raw(SESSION_KEY).is_some());
    assert!(!session.has_unsaved_changes());
}

#[test]
fn corrupt_notes_blob_is_treated_as_empty() {
    let mut store = MemoryKeyValueStore::new();
    store.seed(NOTES_KEY, "{not json");
    store.seed(SESSION_KEY, "[1, 2]");
    let (mut session, _clock) = session_over(store);

    let summary = session.load().unwrap();
    assert_eq!(summary.notes_status, LoadStatus::Corrupt);
    assert_eq!(summary.session_status, LoadStatus::Corrupt);
    assert!(summary.bootstrapped);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn stored_notes_and_session_state_are_restored_without_writing() {
    let mut store = MemoryKeyValueStore::new();
    store.seed(
        NOTES_KEY,
        r##"[
            {"id":"a","left":"120px","top":40,"width":300,"height":220,"content":"<b>hi</b>","title":"First","colorIndex":2,"isCollapsed":false,"opacity":0.5},
            "junk",
            {"id":"b","left":10,"top":10,"content":"","title":"","customColor":"#ABCDEF","isCollapsed":true}
        ]"##,
    );
    store.seed(
        SESSION_KEY,
        r#"{"nextColorIndex":3,"panelLeft":15,"panelTop":25}"#,
    );
    let (mut session, _clock) = session_over(store);

    let summary = session.load().unwrap();
    assert!(!summary.bootstrapped);
    assert_eq!(summary.notes_status, LoadStatus::Loaded { skipped: 1 });
    assert_eq!(summary.restore.restored, 2);
    assert_eq!(session.store().write_count(), 0);

    let first = session.note(&NoteId::parse("a").unwrap()).unwrap();
    assert_eq!(first.position.x, 120.0);
    assert_eq!(first.title, "First");
    assert_eq!(first.color, NoteColor::Palette(2));
    assert_eq!(first.opacity, 0.5);

    let second = session.note(&NoteId::parse("b").unwrap()).unwrap();
    assert!(second.collapsed);
    assert_eq!(second.color, NoteColor::Custom("#abcdef".to_string()));
    assert_eq!(second.size.width, 250.0);

    let state = session.session_state();
    assert_eq!(state.next_color_index, 3);
    assert_eq!(state.panel_position.map(|p| (p.x, p.y)), Some((15.0, 25.0)));
    assert_eq!(state.control_position, None);
    assert!(!state.panel_open);
}

#[test]
fn commands_require_running_phase() {
    let (mut session, _clock) = session_over(MemoryKeyValueStore::new());
    assert!(matches!(
        session.new_note(),
        Err(SessionError::InvalidState {
            operation: "new_note",
            phase: SessionPhase::Uninitialized
        })
    ));

    session.load().unwrap();
    assert!(session.load().is_err());
    assert!(session.close_all().is_err());
    session.start().unwrap();
    session.shutdown().unwrap();
    assert_eq!(session.phase(), SessionPhase::Stopped);
    assert!(session.new_note().is_err());
    assert!(session.shutdown().is_err());
}

#[test]
fn eleventh_note_is_rejected_with_user_message() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    for _ in 1..10 {
        session.new_note().unwrap();
    }
    assert_eq!(session.registry().len(), 10);
    let writes = session.store().write_count();

    let err = session.new_note().unwrap_err();
    assert_eq!(err, SessionError::CapacityExceeded { limit: 10 });
    assert_eq!(err.to_string(), "Max 10 notes allowed.");
    assert_eq!(session.registry().len(), 10);
    assert_eq!(session.store().write_count(), writes);

    let victim = session.registry().ids()[4].clone();
    assert!(session.delete_note(&victim).unwrap());
    session.new_note().unwrap();
    assert_eq!(session.registry().len(), 10);
}

#[test]
fn new_notes_cycle_palette_and_stack_on_top() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let second = session.new_note().unwrap();
    let third = session.new_note().unwrap();

    assert_eq!(session.note(&second).unwrap().color, NoteColor::Palette(0));
    assert_eq!(session.note(&third).unwrap().color, NoteColor::Palette(1));

    let view = session.canvas_view();
    assert_eq!(view.len(), 3);
    assert!(view.windows(2).all(|pair| pair[0].z_order < pair[1].z_order));
    assert_eq!(view[2].id, third);
    assert_eq!(view[2].color, NoteConfig::default().palette[1]);
}

#[test]
fn bootstrap_note_takes_first_color_and_keeps_restored_cursor() {
    let mut store = MemoryKeyValueStore::new();
    store.seed(NOTES_KEY, "[]");
    store.seed(SESSION_KEY, r#"{"nextColorIndex":3}"#);
    let (mut session, _clock) = running(store);

    let bootstrap = session.registry().ids()[0].clone();
    assert_eq!(session.note(&bootstrap).unwrap().color, NoteColor::Palette(0));
    assert_eq!(session.session_state().next_color_index, 3);

    let next = session.new_note().unwrap();
    assert_eq!(session.note(&next).unwrap().color, NoteColor::Palette(3));
}

#[test]
fn content_edits_are_debounced_until_quiet() {
    let (mut session, clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();
    let writes = session.store().write_count();
    let started = clock.now_ms();
    assert_eq!(session.autosave_deadline_ms(), None);

    session.set_title(&id, "Groceries").unwrap();
    assert!(session.has_unsaved_changes());
    assert_eq!(session.autosave_deadline_ms(), Some(started + 500));
    assert_eq!(session.store().write_count(), writes);

    clock.advance(400);
    session.set_body(&id, "milk").unwrap();
    assert_eq!(session.autosave_deadline_ms(), Some(started + 900));
    clock.advance(400);
    assert!(!session.tick());
    assert_eq!(session.store().write_count(), writes);

    clock.advance(100);
    assert!(session.tick());
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.autosave_deadline_ms(), None);
    assert_eq!(session.store().write_count(), writes + 2);
    let stored = session.store().raw(NOTES_KEY).unwrap();
    assert!(stored.contains("Groceries"));
    assert!(stored.contains("milk"));
}

#[test]
fn shutdown_flushes_pending_debounced_edit() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();
    session.set_opacity(&id, 0.4).unwrap();
    assert!(session.has_unsaved_changes());

    assert!(session.shutdown().unwrap());
    assert!(session.store().raw(NOTES_KEY).unwrap().contains("0.4"));
}

#[test]
fn failed_write_keeps_memory_state_and_retries_on_flush() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    session.store_mut().set_quota(Some(16));

    let id = session.new_note().unwrap();
    assert!(session.note(&id).is_some());
    assert_eq!(session.registry().len(), 2);
    assert!(session.has_unsaved_changes());
    assert!(session
        .last_persist_error()
        .unwrap()
        .contains("quota exceeded"));

    session.store_mut().set_quota(None);
    assert!(session.flush());
    assert_eq!(session.last_persist_error(), None);
    assert!(session.store().raw(NOTES_KEY).unwrap().contains(id.as_str()));
}

#[test]
fn opacity_and_color_are_normalized() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();

    assert_eq!(session.set_opacity(&id, 5.0).unwrap(), 0.99);
    assert_eq!(session.set_opacity(&id, -1.0).unwrap(), 0.01);
    assert_eq!(
        session
            .set_color(&id, NoteColor::Custom("#ABCDEF".to_string()))
            .unwrap(),
        NoteColor::Custom("#abcdef".to_string())
    );
    assert_eq!(
        session
            .set_color(&id, NoteColor::Custom("teal".to_string()))
            .unwrap(),
        NoteColor::Palette(0)
    );
    assert_eq!(
        session.set_color(&id, NoteColor::Palette(99)).unwrap(),
        NoteColor::Palette(0)
    );
}

#[test]
fn delete_of_unknown_note_is_silent() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let writes = session.store().write_count();
    let ghost = NoteId::parse("ghost").unwrap();

    assert!(!session.delete_note(&ghost).unwrap());
    assert_eq!(session.store().write_count(), writes);
    assert!(matches!(
        session.toggle_collapse(&ghost),
        Err(SessionError::NotFound(_))
    ));
}

#[test]
fn deleting_last_note_leaves_empty_canvas_until_reload() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();
    assert!(session.delete_note(&id).unwrap());
    assert!(session.registry().is_empty());
    assert!(session.panel_view().is_empty());
    assert_eq!(session.store().raw(NOTES_KEY), Some("[]"));

    let store = session.store().clone();
    let (mut reloaded, _clock) = session_over(store);
    assert!(reloaded.load().unwrap().bootstrapped);
}

#[test]
fn close_all_hides_without_persisting_and_open_note_restores() {
    let (mut session, clock) = running(MemoryKeyValueStore::new());
    let second = session.new_note().unwrap();
    let writes = session.store().write_count();

    assert_eq!(session.close_all().unwrap(), 2);
    assert!(session.canvas_view().is_empty());
    let rows = session.panel_view();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| !row.visible));
    assert_eq!(session.store().write_count(), writes);

    session.open_note(&second).unwrap();
    let view = session.canvas_view();
    assert_eq!(view.len(), 1);
    assert!(view[0].emphasized);

    clock.advance(1000);
    session.tick();
    assert!(!session.canvas_view()[0].emphasized);
}

#[test]
fn minimize_keeps_note_in_panel() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();
    session.minimize(&id).unwrap();
    assert!(session.canvas_view().is_empty());
    assert_eq!(session.panel_view()[0].label, "(untitled)");
    assert!(!session.panel_view()[0].visible);
}

#[test]
fn collapse_toggle_switches_heights() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session.registry().ids()[0].clone();

    assert!(session.toggle_collapse(&id).unwrap());
    assert_eq!(session.canvas_view()[0].size.height, 30.0);
    assert!(session.canvas_view()[0].collapsed);

    assert!(!session.toggle_collapse(&id).unwrap());
    assert_eq!(session.note(&id).unwrap().size.height, 200.0);
}

#[test]
fn clipboard_text_strips_markup() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let id = session
        .new_note_with(NoteDraft {
            title: Some("Todo".to_string()),
            body: Some("<div>one</div><div>two &amp; three</div>".to_string()),
            ..NoteDraft::default()
        })
        .unwrap();

    let text = session.clipboard_text(&id).unwrap();
    assert!(text.starts_with("[Todo]\n\n"));
    assert!(text.contains("one"));
    assert!(text.contains("two & three"));

    let untitled = session.registry().ids()[0].clone();
    assert!(session
        .clipboard_text(&untitled)
        .unwrap()
        .starts_with("[Untitled]"));
}

#[test]
fn state_survives_a_full_restart() {
    let (mut session, _clock) = running(MemoryKeyValueStore::new());
    let first = session.registry().ids()[0].clone();
    let second = session.new_note_with(NoteDraft::titled("Plan")).unwrap();
    session.set_body(&second, "<p>ship it</p>").unwrap();
    session.toggle_collapse(&first).unwrap();
    session
        .set_color(&second, NoteColor::Custom("#112233".to_string()))
        .unwrap();
    session.shutdown().unwrap();

    let before: Vec<_> = session.registry().iter().cloned().collect();
    let (mut reloaded, _clock) = session_over(session.store().clone());
    reloaded.load().unwrap();
    let after: Vec<_> = reloaded.registry().iter().cloned().collect();

    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.position, new.position);
        assert_eq!(old.size, new.size);
        assert_eq!(old.title, new.title);
        assert_eq!(old.body, new.body);
        assert_eq!(old.color, new.color);
        assert_eq!(old.opacity, new.opacity);
        assert_eq!(old.collapsed, new.collapsed);
    }
    assert_eq!(
        reloaded.session_state().next_color_index,
        session.session_state().next_color_index
    );
}

#[test]
fn unreadable_store_loads_defaults_and_saves_once_access_returns() {
    let mut store = MemoryKeyValueStore::new();
    store.seed(NOTES_KEY, "[]");
    store.deny_access(Some("denied".to_string()));
    let (mut session, _clock) = session_over(store);

    let summary = session.load().unwrap();
    assert_eq!(summary.notes_status, LoadStatus::ReadFailed);
    assert_eq!(summary.session_status, LoadStatus::ReadFailed);
    assert!(summary.bootstrapped);
    assert!(session
        .last_persist_error()
        .unwrap()
        .contains("storage unavailable"));

    session.store_mut().deny_access(None);
    session.start().unwrap();
    assert!(session.flush());
    assert_ne!(session.store().raw(NOTES_KEY), Some("[]"));
}

#[test]
fn notes_unreadable_at_load_survive_once_access_returns() {
    let (mut original, _clock) = running(MemoryKeyValueStore::new());
    for _ in 0..4 {
        original.new_note().unwrap();
    }
    let titled = original.registry().ids()[2].clone();
    original.set_title(&titled, "keep me").unwrap();
    assert!(original.shutdown().unwrap());
    let saved_ids = original.registry().ids();
    let saved_blob = original.store().raw(NOTES_KEY).unwrap().to_string();
    assert_eq!(saved_ids.len(), 5);

    let mut store = original.store().clone();
    store.deny_access(Some("locked".to_string()));
    let (mut session, _clock) = session_over(store);
    let summary = session.load().unwrap();
    assert_eq!(summary.notes_status, LoadStatus::ReadFailed);
    assert!(summary.bootstrapped);
    assert_eq!(session.registry().len(), 1);
    assert!(session.has_unsaved_changes());

    assert!(!session.flush());
    assert_eq!(session.store().raw(NOTES_KEY), Some(saved_blob.as_str()));

    session.store_mut().deny_access(None);
    session.start().unwrap();
    assert!(session.shutdown().unwrap());

    assert_eq!(session.registry().ids(), saved_ids);
    assert_eq!(session.panel_view().len(), 5);
    let (mut reloaded, _clock) = session_over(session.store().clone());
    reloaded.load().unwrap();
    assert_eq!(reloaded.registry().ids(), saved_ids);
    assert_eq!(reloaded.note(&saved_ids[2]).unwrap().title, "keep me");
}
