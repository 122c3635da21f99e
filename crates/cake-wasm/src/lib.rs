//! WASM bridge for Cake Studio. Exposes the design session to the web app.
//!
//! Compiled via `wasm-pack build --target web`. Structured results cross the
//! boundary as JSON strings; fallible calls return `{"ok":true,...}` or
//! `{"ok":false,"error":"..."}`.

use cake_core::ElementId;
use cake_core::model::{CakeInfoPatch, CakeMessage, IcingDesign, ItemCategory};
use cake_editor::{DesignSession, EditorConfig, ElementPatch};
use cake_render::Size;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// The main WASM-facing controller for one customizer page.
#[wasm_bindgen]
pub struct CakeDesigner {
    session: DesignSession,
}

#[wasm_bindgen]
impl CakeDesigner {
    /// Create a designer. `config_json` may be empty or a partial config.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_error_panic_hook_setup();

        let config = parse_config(config_json).unwrap_or_else(|e| {
            log::warn!("ignoring invalid config: {e}");
            EditorConfig::default()
        });
        Self {
            session: DesignSession::new(config),
        }
    }

    // ─── Analysis lifecycle ──────────────────────────────────────────────

    /// Ingest an analysis result for the uploaded image `image_key`.
    pub fn load_analysis(&mut self, image_key: &str, json: &str) -> String {
        match self.session.load_analysis(image_key, json) {
            Ok(()) => ok_json(),
            Err(e) => error_json(&e.to_string()),
        }
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Switch the displayed image. Pass an empty key for "no image".
    pub fn set_image(&mut self, image_key: &str) -> bool {
        let key = Some(image_key).filter(|k| !k.is_empty());
        self.session.set_image(key)
    }

    /// `onload` of the displayed `<img>`.
    pub fn image_loaded(&mut self, image_key: &str, natural_width: f64, natural_height: f64) -> bool {
        self.session
            .image_loaded(image_key, Size::new(natural_width, natural_height))
    }

    /// Resize observer callback for the image container.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.session.resize(Size::new(width, height))
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Patch one element. `patch_json` is a partial element object.
    pub fn update_element(&mut self, category: &str, id: &str, patch_json: &str) -> String {
        let Some(category) = ItemCategory::from_name(category) else {
            return error_json(&format!("unknown category: {category}"));
        };
        let patch: ElementPatch = match serde_json::from_str(patch_json) {
            Ok(p) => p,
            Err(e) => return error_json(&format!("invalid patch: {e}")),
        };
        applied_json(
            self.session
                .update_element(category, ElementId::intern(id), patch),
        )
    }

    pub fn remove_element(&mut self, category: &str, id: &str) -> String {
        match ItemCategory::from_name(category) {
            Some(category) => {
                applied_json(self.session.remove_element(category, ElementId::intern(id)))
            }
            None => error_json(&format!("unknown category: {category}")),
        }
    }

    /// Restore one element to its analysed state.
    pub fn revert_element(&mut self, category: &str, id: &str) -> String {
        match ItemCategory::from_name(category) {
            Some(category) => {
                applied_json(self.session.revert_element(category, ElementId::intern(id)))
            }
            None => error_json(&format!("unknown category: {category}")),
        }
    }

    pub fn set_icing_design(&mut self, json: &str) -> String {
        match serde_json::from_str::<IcingDesign>(json) {
            Ok(design) => applied_json(self.session.set_icing_design(design)),
            Err(e) => error_json(&format!("invalid icing design: {e}")),
        }
    }

    pub fn set_cake_info(&mut self, json: &str) -> String {
        match serde_json::from_str::<CakeInfoPatch>(json) {
            Ok(patch) => applied_json(self.session.set_cake_info(patch)),
            Err(e) => error_json(&format!("invalid cake info: {e}")),
        }
    }

    /// Replace the message list. Messages use the shape returned by
    /// [`working_json`](Self::working_json).
    pub fn set_messages(&mut self, json: &str) -> String {
        match serde_json::from_str::<Vec<CakeMessage>>(json) {
            Ok(messages) => applied_json(self.session.set_messages(messages)),
            Err(e) => error_json(&format!("invalid messages: {e}")),
        }
    }

    pub fn begin_gesture(&mut self) {
        self.session.begin_gesture();
    }

    pub fn end_gesture(&mut self, description: &str) {
        self.session.end_gesture(description);
    }

    /// Undo the last edit. Returns `true` if something was undone.
    pub fn undo(&mut self) -> bool {
        self.session.undo().is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo().is_some()
    }

    // ─── Derived state ───────────────────────────────────────────────────

    pub fn working_json(&self) -> String {
        to_json(self.session.working())
    }

    /// Dirty flags and change descriptions.
    pub fn dirty_json(&mut self) -> String {
        to_json(self.session.dirty())
    }

    /// Positioned markers, including clusters.
    pub fn markers_json(&mut self) -> String {
        to_json(self.session.markers())
    }

    /// Marker under the pointer as JSON, or `null`.
    pub fn hit_test(&mut self, x: f64, y: f64) -> String {
        match self.session.hit_test(x, y) {
            Some(marker) => to_json(&marker),
            None => "null".to_string(),
        }
    }

    /// Regeneration request as JSON, or `null` when nothing changed.
    pub fn regeneration_prompt(&mut self) -> String {
        match self.session.regeneration_request() {
            Some(request) => to_json(&request),
            None => "null".to_string(),
        }
    }

    // ─── Settings ────────────────────────────────────────────────────────

    pub fn clear_prompt_cache(&mut self) {
        self.session.clear_prompt_cache();
    }

    pub fn set_config(&mut self, json: &str) -> String {
        match parse_config(json) {
            Ok(config) => {
                self.session.set_config(config);
                ok_json()
            }
            Err(e) => error_json(&format!("invalid config: {e}")),
        }
    }
}

// ─── JSON envelopes ──────────────────────────────────────────────────────

fn parse_config(json: &str) -> Result<EditorConfig, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(EditorConfig::default());
    }
    EditorConfig::from_json(json)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&format!("Serialization error: {e}")))
}

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn applied_json(applied: bool) -> String {
    format!(r#"{{"ok":true,"applied":{applied}}}"#)
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "ok": false, "error": message }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Cake Studio WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ANALYSIS: &str = r##"{
        "cakeType": "1 Tier",
        "cakeThickness": "4 in",
        "keyword": "unicorn",
        "main_toppers": [
            { "id": "t1", "type": "toy", "description": "unicorn", "size": "medium", "x": 0, "y": 0 }
        ],
        "support_elements": [],
        "cake_messages": [
            { "id": "m1", "type": "icing_script", "text": "Happy Birthday", "position": "top", "color": "#FFFFFF" }
        ],
        "icing_design": { "base": "soft_icing", "color_type": "single", "drip": false,
                          "colors": { "top": "#FFFFFF", "side": "#FFC0CB" } }
    }"##;

    fn designer() -> CakeDesigner {
        let mut designer = CakeDesigner::new("");
        assert_eq!(designer.load_analysis("img-1", ANALYSIS), r#"{"ok":true}"#);
        designer
    }

    #[test]
    fn invalid_payload_reports_error() {
        let mut designer = CakeDesigner::new("");
        let out: serde_json::Value =
            serde_json::from_str(&designer.load_analysis("img", "{ nope")).unwrap();
        assert_eq!(out["ok"], false);
        assert!(out["error"].as_str().unwrap().contains("invalid analysis payload"));
    }

    #[test]
    fn clean_analysis_needs_no_regeneration() {
        let mut designer = designer();
        assert_eq!(designer.regeneration_prompt(), "null");
    }

    #[test]
    fn edit_then_undo() {
        let mut designer = designer();
        assert_eq!(
            designer.update_element("main_topper", "t1", r#"{"type":"printout"}"#),
            r#"{"ok":true,"applied":true}"#
        );
        let dirty: serde_json::Value = serde_json::from_str(&designer.dirty_json()).unwrap();
        assert_eq!(dirty["toppers"], true);
        assert!(designer.regeneration_prompt().contains("unicorn"));

        assert!(designer.undo());
        let dirty: serde_json::Value = serde_json::from_str(&designer.dirty_json()).unwrap();
        assert_eq!(dirty["toppers"], false);
    }

    #[test]
    fn edited_messages_round_trip_and_revert() {
        let mut designer = designer();
        let working: serde_json::Value = serde_json::from_str(&designer.working_json()).unwrap();
        let mut messages = working["cake_messages"].clone();
        messages[0]["text"] = serde_json::json!({ "current": "Happy 6th", "original": "forged" });

        assert_eq!(
            designer.set_messages(&messages.to_string()),
            r#"{"ok":true,"applied":true}"#
        );
        let dirty: serde_json::Value = serde_json::from_str(&designer.dirty_json()).unwrap();
        assert_eq!(dirty["messages"], true);

        designer.revert_element("message", "m1");
        let working: serde_json::Value = serde_json::from_str(&designer.working_json()).unwrap();
        assert_eq!(working["cake_messages"][0]["text"]["current"], "Happy Birthday");
        let dirty: serde_json::Value = serde_json::from_str(&designer.dirty_json()).unwrap();
        assert_eq!(dirty["messages"], false);
    }

    #[test]
    fn unknown_category_and_id() {
        let mut designer = designer();
        let out: serde_json::Value =
            serde_json::from_str(&designer.remove_element("sprinkles", "t1")).unwrap();
        assert_eq!(out["ok"], false);
        assert_eq!(
            designer.remove_element("main_topper", "missing"),
            r#"{"ok":true,"applied":false}"#
        );
    }

    #[test]
    fn markers_follow_viewport() {
        let mut designer = designer();
        let markers: serde_json::Value = serde_json::from_str(&designer.markers_json()).unwrap();
        assert_eq!(markers[0]["placement"]["kind"], "centered");

        designer.set_config(r#"{"projection":{"y_bias_ratio":0.0}}"#);
        designer.image_loaded("img-1", 200.0, 100.0);
        designer.resize(200.0, 100.0);
        let markers: serde_json::Value = serde_json::from_str(&designer.markers_json()).unwrap();
        assert_eq!(markers[0]["placement"]["x"], 100.0);
        assert_eq!(markers[0]["placement"]["y"], 50.0);
        assert_ne!(designer.hit_test(100.0, 50.0), "null");
    }

    #[test]
    fn bad_config_is_rejected() {
        let mut designer = designer();
        let out: serde_json::Value =
            serde_json::from_str(&designer.set_config(r#"{"undo_depth":"lots"}"#)).unwrap();
        assert_eq!(out["ok"], false);
    }
}
