//! Design state store: the frozen baseline and the editable working copy.
//!
//! The store owns two things:
//!
//! - **Baseline**: the analysis of the current image, set once per upload and
//!   only ever replaced wholesale (new upload or explicit clear).
//! - **Working state**: what the shopper is editing. Mutations never write
//!   through a shared `Arc`; each one builds a new category value and swaps
//!   the pointer, so downstream memoised derivations see an identity change.

use cake_core::model::*;
use cake_core::{AnalysisBaseline, ElementId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The store: single source of truth for the design being edited.
#[derive(Debug, Default)]
pub struct DesignStore {
    baseline: Option<Arc<AnalysisBaseline>>,
    working: WorkingState,
    /// Key of the image the baseline was produced from.
    image_key: Option<String>,
    /// Bumped on every successful change.
    revision: u64,
}

impl DesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Baseline lifecycle ──────────────────────────────────────────────

    /// Install the analysis of a newly uploaded image and start a fresh
    /// working copy from it.
    pub fn load_baseline(&mut self, image_key: &str, baseline: AnalysisBaseline) {
        log::debug!(
            "loading baseline for {image_key}: {} toppers, {} support, {} messages",
            baseline.main_toppers.len(),
            baseline.support_elements.len(),
            baseline.cake_messages.len()
        );
        self.working = baseline.working_copy();
        self.baseline = Some(Arc::new(baseline));
        self.image_key = Some(image_key.to_string());
        self.revision += 1;
    }

    /// Forget the baseline and the working copy.
    pub fn clear(&mut self) {
        self.baseline = None;
        self.working = WorkingState::default();
        self.image_key = None;
        self.revision += 1;
    }

    /// Replace the working state wholesale (undo/redo).
    pub fn restore(&mut self, working: WorkingState) {
        self.working = working;
        self.revision += 1;
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a mutation. Returns `false` if it addressed an unknown element
    /// or did not apply to the given category.
    pub fn apply_mutation(&mut self, mutation: DesignMutation) -> bool {
        let applied = match mutation {
            DesignMutation::UpdateElement {
                category,
                id,
                patch,
            } => self.update_element(category, id, &patch),
            DesignMutation::RemoveElement { category, id } => self.remove_element(category, id),
            DesignMutation::RevertElement { category, id } => self.revert_element(category, id),
            DesignMutation::SetIcingDesign(design) => {
                self.working.icing_design = Arc::new(design);
                true
            }
            DesignMutation::SetCakeInfo(patch) => {
                self.working.cake_info = Arc::new(self.working.cake_info.patched(&patch));
                true
            }
            DesignMutation::SetMessages(messages) => {
                self.working.cake_messages = Arc::new(self.rebased_messages(messages));
                true
            }
        };
        if applied {
            self.revision += 1;
        }
        applied
    }

    /// Messages arriving from outside carry no trustworthy originals; take
    /// them from the baseline message with the same id.
    fn rebased_messages(&self, mut messages: Vec<CakeMessage>) -> Vec<CakeMessage> {
        if let Some(baseline) = &self.baseline {
            for message in &mut messages {
                if let Some(analysed) = baseline.message(message.id) {
                    message.rebase_on(analysed);
                }
            }
        }
        messages
    }

    fn update_element(&mut self, category: ItemCategory, id: ElementId, patch: &ElementPatch) -> bool {
        let found = match category {
            ItemCategory::CakeMessage => replace_matching(
                &mut self.working.cake_messages,
                id,
                |m| m.id,
                |m| patch.apply_to_message(m),
            ),
            ItemCategory::MainTopper => replace_matching(
                &mut self.working.main_toppers,
                id,
                |e| e.id,
                |e| patch.apply_to_element(e),
            ),
            ItemCategory::SupportElement => replace_matching(
                &mut self.working.support_elements,
                id,
                |e| e.id,
                |e| patch.apply_to_element(e),
            ),
        };
        if !found {
            log::warn!("update: no {} with id {id}", category.label());
        }
        found
    }

    /// Toppers and support elements are switched off (the record survives so
    /// it can be restored); messages are dropped from the list.
    fn remove_element(&mut self, category: ItemCategory, id: ElementId) -> bool {
        let found = match category {
            ItemCategory::CakeMessage => {
                let current = &self.working.cake_messages;
                if current.iter().any(|m| m.id == id) {
                    let kept: Vec<CakeMessage> =
                        current.iter().filter(|m| m.id != id).cloned().collect();
                    self.working.cake_messages = Arc::new(kept);
                    true
                } else {
                    false
                }
            }
            ItemCategory::MainTopper => {
                replace_matching(&mut self.working.main_toppers, id, |e| e.id, |e| {
                    e.enabled = false
                })
            }
            ItemCategory::SupportElement => {
                replace_matching(&mut self.working.support_elements, id, |e| e.id, |e| {
                    e.enabled = false
                })
            }
        };
        if !found {
            log::warn!("remove: no {} with id {id}", category.label());
        }
        found
    }

    /// Restore an element to its analysed state. A message that was removed
    /// from the list is re-inserted from the baseline at its original index.
    fn revert_element(&mut self, category: ItemCategory, id: ElementId) -> bool {
        let found = match category {
            ItemCategory::MainTopper => {
                replace_matching(&mut self.working.main_toppers, id, |e| e.id, DecorElement::revert)
            }
            ItemCategory::SupportElement => replace_matching(
                &mut self.working.support_elements,
                id,
                |e| e.id,
                DecorElement::revert,
            ),
            ItemCategory::CakeMessage => self.revert_message(id),
        };
        if !found {
            log::warn!("revert: no {} with id {id}", category.label());
        }
        found
    }

    fn revert_message(&mut self, id: ElementId) -> bool {
        if self.working.cake_messages.iter().any(|m| m.id == id) {
            return replace_matching(
                &mut self.working.cake_messages,
                id,
                |m| m.id,
                CakeMessage::revert,
            );
        }
        let Some(baseline) = &self.baseline else {
            return false;
        };
        let Some(index) = baseline.cake_messages.iter().position(|m| m.id == id) else {
            return false;
        };
        let mut messages = (*self.working.cake_messages).clone();
        let at = index.min(messages.len());
        messages.insert(at, baseline.cake_messages[index].clone());
        self.working.cake_messages = Arc::new(messages);
        true
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn baseline(&self) -> Option<&Arc<AnalysisBaseline>> {
        self.baseline.as_ref()
    }

    pub fn working(&self) -> &WorkingState {
        &self.working
    }

    pub fn image_key(&self) -> Option<&str> {
        self.image_key.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn element(&self, category: ItemCategory, id: ElementId) -> Option<&DecorElement> {
        self.working
            .elements(category)
            .and_then(|list| list.iter().find(|e| e.id == id))
    }

    pub fn message(&self, id: ElementId) -> Option<&CakeMessage> {
        self.working.cake_messages.iter().find(|m| m.id == id)
    }
}

/// Clone `list`, edit the entry with `id`, and swap in the new `Arc`.
/// Leaves `list` untouched when no entry matches.
fn replace_matching<T: Clone>(
    list: &mut Arc<Vec<T>>,
    id: ElementId,
    id_of: impl Fn(&T) -> ElementId,
    edit: impl FnOnce(&mut T),
) -> bool {
    let Some(index) = list.iter().position(|item| id_of(item) == id) else {
        return false;
    };
    let mut items = (**list).clone();
    edit(&mut items[index]);
    *list = Arc::new(items);
    true
}

/// A mutation of the working state.
#[derive(Debug, Clone)]
pub enum DesignMutation {
    UpdateElement {
        category: ItemCategory,
        id: ElementId,
        patch: ElementPatch,
    },
    RemoveElement {
        category: ItemCategory,
        id: ElementId,
    },
    RevertElement {
        category: ItemCategory,
        id: ElementId,
    },
    SetIcingDesign(IcingDesign),
    SetCakeInfo(CakeInfoPatch),
    SetMessages(Vec<CakeMessage>),
}

/// A partial element update; `None` fields are left unchanged.
///
/// Blank `color` / `replacement_image` strings clear the value. Fields that
/// don't exist on the target category (e.g. `text` on a topper) are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub colors: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub text: Option<String>,
    pub placement: Option<String>,
    pub position: Option<Position>,
    pub replacement_image: Option<String>,
}

impl ElementPatch {
    pub fn apply_to_element(&self, element: &mut DecorElement) {
        if let Some(kind) = &self.kind {
            element.kind.set(kind.clone());
        }
        if let Some(size) = &self.size {
            element.size = size.clone();
        }
        if let Some(color) = &self.color {
            element
                .color
                .set(Some(color.clone()).filter(|c| !c.trim().is_empty()));
        }
        if let Some(colors) = &self.colors {
            element.colors.set(colors.iter().cloned().collect());
        }
        if let Some(enabled) = self.enabled {
            element.enabled = enabled;
        }
        if let Some(position) = self.position {
            element.position = Some(position);
        }
        if let Some(image) = &self.replacement_image {
            element.replacement_image = Some(image.clone()).filter(|i| !i.trim().is_empty());
        }
    }

    pub fn apply_to_message(&self, message: &mut CakeMessage) {
        if let Some(kind) = &self.kind {
            message.kind.set(kind.clone());
        }
        if let Some(text) = &self.text {
            message.text.set(text.clone());
        }
        if let Some(color) = &self.color {
            message.color.set(color.clone());
        }
        if let Some(enabled) = self.enabled {
            message.enabled = enabled;
        }
        if let Some(placement) = &self.placement {
            message.placement.set(placement.clone());
        }
        if let Some(position) = self.position {
            message.position.set(Some(position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cake_core::compute_dirty;

    fn store() -> DesignStore {
        let mut baseline = AnalysisBaseline::default();
        let mut t1 = DecorElement::new(ElementId::intern("t1"), "toy", "unicorn");
        t1.position = Some(Position::new(0.0, 30.0));
        baseline.main_toppers.push(t1);
        baseline
            .support_elements
            .push(DecorElement::new(ElementId::intern("s1"), "edible_flowers", "roses"));
        baseline
            .cake_messages
            .push(CakeMessage::new(ElementId::intern("m1"), "Happy Birthday"));
        baseline
            .cake_messages
            .push(CakeMessage::new(ElementId::intern("m2"), "Mia"));

        let mut store = DesignStore::new();
        store.load_baseline("img-1", baseline);
        store
    }

    fn dirty(store: &DesignStore) -> cake_core::DirtyReport {
        compute_dirty(store.baseline().map(|b| b.as_ref()), store.working())
    }

    #[test]
    fn load_starts_clean() {
        let store = store();
        assert_eq!(store.image_key(), Some("img-1"));
        assert!(!dirty(&store).is_dirty());
    }

    #[test]
    fn update_swaps_only_the_touched_category() {
        let mut store = store();
        let before = store.working().clone();
        let applied = store.apply_mutation(DesignMutation::UpdateElement {
            category: ItemCategory::MainTopper,
            id: ElementId::intern("t1"),
            patch: ElementPatch {
                kind: Some("printout".into()),
                ..Default::default()
            },
        });
        assert!(applied);
        let after = store.working();
        assert!(!Arc::ptr_eq(&before.main_toppers, &after.main_toppers));
        assert!(Arc::ptr_eq(&before.support_elements, &after.support_elements));
        assert!(Arc::ptr_eq(&before.cake_messages, &after.cake_messages));
        // The old snapshot is untouched.
        assert_eq!(before.main_toppers[0].kind.current(), "toy");
        assert_eq!(after.main_toppers[0].kind.current(), "printout");
        assert!(dirty(&store).toppers);
    }

    #[test]
    fn unknown_id_is_a_noop() {
        let mut store = store();
        let rev = store.revision();
        let applied = store.apply_mutation(DesignMutation::RemoveElement {
            category: ItemCategory::SupportElement,
            id: ElementId::intern("missing"),
        });
        assert!(!applied);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn remove_disables_toppers_but_drops_messages() {
        let mut store = store();
        store.apply_mutation(DesignMutation::RemoveElement {
            category: ItemCategory::MainTopper,
            id: ElementId::intern("t1"),
        });
        let t1 = store
            .element(ItemCategory::MainTopper, ElementId::intern("t1"))
            .unwrap();
        assert!(!t1.enabled);

        store.apply_mutation(DesignMutation::RemoveElement {
            category: ItemCategory::CakeMessage,
            id: ElementId::intern("m1"),
        });
        assert!(store.message(ElementId::intern("m1")).is_none());
        assert_eq!(store.working().cake_messages.len(), 1);
        assert!(dirty(&store).messages);
    }

    #[test]
    fn revert_restores_removed_message_in_place() {
        let mut store = store();
        store.apply_mutation(DesignMutation::RemoveElement {
            category: ItemCategory::CakeMessage,
            id: ElementId::intern("m1"),
        });
        assert!(store.apply_mutation(DesignMutation::RevertElement {
            category: ItemCategory::CakeMessage,
            id: ElementId::intern("m1"),
        }));
        let ids: Vec<&str> = store
            .working()
            .cake_messages
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert!(!dirty(&store).is_dirty());
    }

    #[test]
    fn revert_restores_moved_message() {
        let mut store = store();
        let id = ElementId::intern("m1");
        store.apply_mutation(DesignMutation::UpdateElement {
            category: ItemCategory::CakeMessage,
            id,
            patch: ElementPatch {
                position: Some(Position::new(30.0, 0.0)),
                placement: Some("side".into()),
                ..Default::default()
            },
        });
        assert!(dirty(&store).messages);

        assert!(store.apply_mutation(DesignMutation::RevertElement {
            category: ItemCategory::CakeMessage,
            id,
        }));
        let m1 = store.message(id).unwrap();
        assert_eq!(*m1.position.current(), None);
        assert_eq!(m1.placement.current(), "top");
        assert!(!dirty(&store).is_dirty());
    }

    #[test]
    fn set_messages_ignores_supplied_originals() {
        let mut store = store();
        let messages: Vec<CakeMessage> = serde_json::from_str(
            r#"[{
                "id": "m1",
                "kind": { "current": "icing_script", "original": "icing_script" },
                "text": { "current": "Happy 40th", "original": "Happy 40th" },
                "placement": { "current": "top", "original": "top" },
                "color": { "current": "", "original": "" },
                "position": { "current": null, "original": null },
                "enabled": true
            }]"#,
        )
        .unwrap();
        assert!(store.apply_mutation(DesignMutation::SetMessages(messages)));

        let m1 = store.message(ElementId::intern("m1")).unwrap();
        assert_eq!(m1.text.current(), "Happy 40th");
        assert_eq!(m1.text.original(), "Happy Birthday");
        assert!(dirty(&store).messages);

        store.apply_mutation(DesignMutation::RevertElement {
            category: ItemCategory::CakeMessage,
            id: ElementId::intern("m1"),
        });
        assert_eq!(
            store.message(ElementId::intern("m1")).map(|m| m.text.current().as_str()),
            Some("Happy Birthday")
        );
    }

    #[test]
    fn revert_element_undoes_all_edits() {
        let mut store = store();
        let id = ElementId::intern("s1");
        store.apply_mutation(DesignMutation::UpdateElement {
            category: ItemCategory::SupportElement,
            id,
            patch: ElementPatch {
                color: Some("#00FF00".into()),
                replacement_image: Some("https://img.example/r.png".into()),
                ..Default::default()
            },
        });
        assert!(dirty(&store).toppers);
        store.apply_mutation(DesignMutation::RevertElement {
            category: ItemCategory::SupportElement,
            id,
        });
        assert!(!dirty(&store).is_dirty());
    }

    #[test]
    fn set_cake_info_is_partial() {
        let mut store = store();
        store.apply_mutation(DesignMutation::SetCakeInfo(CakeInfoPatch {
            size: Some("8\" Round".into()),
            ..Default::default()
        }));
        assert_eq!(store.working().cake_info.size, "8\" Round");
        assert!(dirty(&store).cake_info);
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = store();
        store.clear();
        assert!(store.baseline().is_none());
        assert!(store.working().main_toppers.is_empty());
        assert!(!dirty(&store).is_dirty());
    }

    #[test]
    fn patch_deserializes_from_wire_names() {
        let patch: ElementPatch =
            serde_json::from_str(r##"{ "type": "edible_3d", "colors": ["#FFF", ""] }"##).unwrap();
        assert_eq!(patch.kind.as_deref(), Some("edible_3d"));
        assert_eq!(patch.colors.map(|c| c.len()), Some(2));
        assert_eq!(patch.enabled, None);
    }
}
