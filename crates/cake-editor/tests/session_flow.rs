//! Integration tests: a full customizer session (cake-editor).
//!
//! Upload → analysis → edits → regeneration gating → new upload.

use cake_core::model::*;
use cake_core::{ElementId, ManualClock, PromptCache};
use cake_editor::{DesignSession, EditorConfig, ElementPatch};
use cake_render::{Placement, Size};
use pretty_assertions::assert_eq;
use std::rc::Rc;
use std::time::Duration;

const ANALYSIS: &str = include_str!("fixtures/birthday_analysis.json");

fn session() -> DesignSession {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = DesignSession::new(EditorConfig::default());
    session.load_analysis("upload-1", ANALYSIS).unwrap();
    session
}

fn topper(id: &str) -> ElementId {
    ElementId::intern(id)
}

// ─── Regeneration gating ────────────────────────────────────────────────

#[test]
fn untouched_analysis_is_clean() {
    let mut session = session();
    assert!(!session.dirty().is_dirty());
    assert_eq!(session.regeneration_request(), None);
}

#[test]
fn material_change_then_revert() {
    let mut session = session();
    assert!(session.update_element(
        ItemCategory::MainTopper,
        topper("t1"),
        ElementPatch {
            kind: Some("printout".into()),
            ..Default::default()
        },
    ));
    let request = session.regeneration_request().unwrap();
    assert_eq!(request.keyword, "dinosaur birthday");
    assert_eq!(
        request.descriptions,
        vec![
            "change the main topper \"green dinosaur\" (t1) material type from toy to printout"
                .to_string()
        ]
    );

    assert!(session.revert_element(ItemCategory::MainTopper, topper("t1")));
    assert_eq!(session.regeneration_request(), None);
}

#[test]
fn toggling_drip_off_and_on_is_clean() {
    let mut session = session();
    let mut icing = (*session.working().icing_design).clone();
    icing.set_feature(IcingFeature::Drip, false);
    session.set_icing_design(icing.clone());
    assert!(session.dirty().icing);
    assert_eq!(session.dirty().descriptions, vec!["remove the drip".to_string()]);

    icing.set_feature(IcingFeature::Drip, true);
    session.set_icing_design(icing);
    assert!(!session.dirty().is_dirty());
}

#[test]
fn message_removed_and_restored_in_place() {
    let mut session = session();
    let first = session.working().cake_messages[0].id;
    let second = session.working().cake_messages[1].id;

    assert!(session.remove_element(ItemCategory::CakeMessage, first));
    assert_eq!(session.working().cake_messages.len(), 1);
    assert!(session.dirty().messages);
    assert_eq!(
        session.dirty().descriptions,
        vec!["remove the message \"Happy 5th Birthday\"".to_string()]
    );

    assert!(session.revert_element(ItemCategory::CakeMessage, first));
    let ids: Vec<ElementId> = session.working().cake_messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(!session.dirty().is_dirty());
}

#[test]
fn added_message_is_described() {
    let mut session = session();
    let mut messages = (*session.working().cake_messages).clone();
    messages.push(CakeMessage::new(ElementId::generate("msg"), "Roar!"));
    session.set_messages(messages);

    let report = session.dirty();
    assert!(report.messages);
    assert_eq!(report.descriptions, vec!["add the message \"Roar!\"".to_string()]);
}

#[test]
fn cake_info_patch_keeps_other_fields() {
    let mut session = session();
    session.set_cake_info(CakeInfoPatch {
        size: Some("8 in".into()),
        ..Default::default()
    });
    let info = session.working().cake_info.clone();
    assert_eq!(info.cake_type, "2 Tier");
    assert_eq!(info.size, "8 in");
    assert_eq!(
        session.dirty().descriptions,
        vec!["change the cake size from none to 8 in".to_string()]
    );
}

#[test]
fn dirty_report_is_memoised() {
    let mut session = session();
    let first = session.dirty() as *const _;
    let second = session.dirty() as *const _;
    assert_eq!(first, second);
    assert!(!session.dirty().is_dirty());
}

// ─── Markers ────────────────────────────────────────────────────────────

#[test]
fn markers_wait_for_image_dimensions() {
    let mut session = session();
    session.resize(Size::new(800.0, 600.0));
    assert!(
        session
            .markers()
            .iter()
            .all(|m| m.placement == Placement::Centered)
    );

    // Late load for an image that was never shown.
    assert!(!session.image_loaded("upload-0", Size::new(400.0, 300.0)));
    assert!(session.image_loaded("upload-1", Size::new(400.0, 300.0)));
    assert!(
        session
            .markers()
            .iter()
            .all(|m| matches!(m.placement, Placement::Pixel { .. }))
    );

    let hit = session.hit_test(320.0, 170.0).unwrap();
    assert_eq!(hit.marker.key(), "t1");
}

#[test]
fn disabled_topper_loses_its_marker() {
    let mut session = session();
    let before = session.markers().len();
    session.remove_element(ItemCategory::MainTopper, topper("t1"));
    assert_eq!(session.markers().len(), before - 1);
    session.undo();
    assert_eq!(session.markers().len(), before);
}

// ─── Lifecycle ──────────────────────────────────────────────────────────

#[test]
fn failed_ingest_keeps_current_design() {
    let mut session = session();
    session.remove_element(ItemCategory::MainTopper, topper("t1"));
    assert!(session.load_analysis("upload-2", "").is_err());
    assert!(session.dirty().toppers);
    assert_eq!(session.store().image_key(), Some("upload-1"));
}

#[test]
fn new_upload_replaces_everything() {
    let mut session = session();
    session.remove_element(ItemCategory::MainTopper, topper("t1"));
    session
        .load_analysis("upload-2", r#"{ "cakeType": "Square", "keyword": "cars" }"#)
        .unwrap();
    assert!(!session.can_undo());
    assert!(session.working().main_toppers.is_empty());
    assert_eq!(session.working().cake_info.cake_type, "Square");
    assert!(session.markers().is_empty());
}

#[test]
fn prompt_cache_expires_and_clears_independently() {
    let clock = Rc::new(ManualClock::new());
    let prompts = PromptCache::with_clock(Duration::from_secs(600), Rc::clone(&clock));
    let mut session = DesignSession::with_prompt_cache(EditorConfig::default(), prompts);
    session.load_analysis("upload-1", ANALYSIS).unwrap();
    session.remove_element(ItemCategory::MainTopper, topper("t1"));

    let mut loads = 0;
    let mut fetch = |session: &mut DesignSession<Rc<ManualClock>>| {
        session
            .prompts_mut()
            .type_enum("main_topper_types", || {
                loads += 1;
                Ok::<_, ()>(vec!["toy".to_string(), "printout".to_string()])
            })
            .unwrap()
    };

    fetch(&mut session);
    fetch(&mut session);
    clock.advance(Duration::from_secs(601));
    fetch(&mut session);
    session.clear_prompt_cache();
    fetch(&mut session);
    assert_eq!(loads, 3);

    // Clearing caches never touches the design.
    assert!(session.dirty().toppers);
    assert!(session.can_undo());
}

#[test]
fn config_change_applies_new_prompt_ttl() {
    let clock = Rc::new(ManualClock::new());
    let prompts = PromptCache::with_clock(Duration::from_secs(600), Rc::clone(&clock));
    let mut session = DesignSession::with_prompt_cache(EditorConfig::default(), prompts);

    let mut loads = 0;
    let mut fetch = |session: &mut DesignSession<Rc<ManualClock>>| {
        session
            .prompts_mut()
            .prompt("analysis", || {
                loads += 1;
                Ok::<_, ()>("describe the cake".to_string())
            })
            .unwrap()
    };

    fetch(&mut session);
    clock.advance(Duration::from_secs(120));
    fetch(&mut session);

    session.set_config(EditorConfig {
        prompt_ttl_secs: 60,
        ..Default::default()
    });
    fetch(&mut session);
    fetch(&mut session);
    assert_eq!(loads, 2);
    assert_eq!(session.config().prompt_ttl(), Duration::from_secs(60));
}
