//! Design session: store + history + marker view + dirty tracking.
//!
//! This is the object the UI talks to. It exposes the store's mutation
//! operations (recorded for undo), the memoised dirty report that gates
//! image regeneration, and the memoised marker layout.

use crate::commands::CommandStack;
use crate::config::EditorConfig;
use crate::store::{DesignMutation, DesignStore, ElementPatch};
use crate::view::MarkerView;
use cake_core::model::*;
use cake_core::{
    AnalysisError, Clock, DirtyMemo, DirtyReport, ElementId, PromptCache, SystemClock,
};
use cake_render::{PlacedMarker, Size};
use serde::Serialize;

/// What to send to the image regeneration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegenerationRequest {
    pub keyword: String,
    pub descriptions: Vec<String>,
    pub summary: String,
}

pub struct DesignSession<C: Clock + Clone = SystemClock> {
    store: DesignStore,
    commands: CommandStack,
    view: MarkerView,
    dirty: DirtyMemo,
    prompts: PromptCache<C>,
    config: EditorConfig,
}

impl DesignSession<SystemClock> {
    pub fn new(config: EditorConfig) -> Self {
        let prompts = PromptCache::new(config.prompt_ttl());
        Self::with_prompt_cache(config, prompts)
    }
}

impl<C: Clock + Clone> DesignSession<C> {
    /// Build a session around an externally constructed prompt cache.
    pub fn with_prompt_cache(config: EditorConfig, prompts: PromptCache<C>) -> Self {
        Self {
            store: DesignStore::new(),
            commands: CommandStack::new(config.undo_depth),
            view: MarkerView::new(config.projection, config.clustering),
            dirty: DirtyMemo::new(),
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Replace the configuration. History and cached prompts are kept, but
    /// a smaller undo depth drops the oldest steps and the new prompt
    /// lifetime applies to entries already cached.
    pub fn set_config(&mut self, config: EditorConfig) {
        self.view.set_config(config.projection, config.clustering);
        self.commands.set_max_depth(config.undo_depth);
        self.prompts.set_ttl(config.prompt_ttl());
        self.config = config;
    }

    // ─── Baseline lifecycle ──────────────────────────────────────────────

    /// Parse an analysis payload for `image_key` and make it the baseline.
    ///
    /// # Errors
    /// Returns the ingest error; the current baseline is kept in that case.
    pub fn load_analysis(&mut self, image_key: &str, json: &str) -> Result<(), AnalysisError> {
        let baseline = AnalysisBaseline::from_json(json)?;
        self.load_baseline(image_key, baseline);
        Ok(())
    }

    pub fn load_baseline(&mut self, image_key: &str, baseline: AnalysisBaseline) {
        self.view.set_image(Some(image_key));
        self.store.load_baseline(image_key, baseline);
        self.commands.clear();
    }

    /// Drop the baseline, the working copy and the history.
    pub fn clear(&mut self) {
        self.store.clear();
        self.commands.clear();
        self.view.set_image(None);
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply and record a mutation. Returns whether it applied.
    pub fn apply(&mut self, mutation: DesignMutation, description: &str) -> bool {
        self.commands.execute(&mut self.store, mutation, description)
    }

    pub fn update_element(&mut self, category: ItemCategory, id: ElementId, patch: ElementPatch) -> bool {
        self.apply(
            DesignMutation::UpdateElement {
                category,
                id,
                patch,
            },
            &format!("Edit {}", category.label()),
        )
    }

    pub fn remove_element(&mut self, category: ItemCategory, id: ElementId) -> bool {
        self.apply(
            DesignMutation::RemoveElement { category, id },
            &format!("Remove {}", category.label()),
        )
    }

    pub fn revert_element(&mut self, category: ItemCategory, id: ElementId) -> bool {
        self.apply(
            DesignMutation::RevertElement { category, id },
            &format!("Revert {}", category.label()),
        )
    }

    pub fn set_icing_design(&mut self, design: IcingDesign) -> bool {
        self.apply(DesignMutation::SetIcingDesign(design), "Edit icing")
    }

    pub fn set_cake_info(&mut self, patch: CakeInfoPatch) -> bool {
        self.apply(DesignMutation::SetCakeInfo(patch), "Edit cake info")
    }

    pub fn set_messages(&mut self, messages: Vec<CakeMessage>) -> bool {
        self.apply(DesignMutation::SetMessages(messages), "Edit messages")
    }

    pub fn begin_gesture(&mut self) {
        self.commands.begin_batch(&self.store);
    }

    pub fn end_gesture(&mut self, description: &str) {
        self.commands.end_batch(&self.store, description);
    }

    pub fn undo(&mut self) -> Option<String> {
        self.commands.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.commands.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // ─── Viewport inputs ─────────────────────────────────────────────────

    /// Show a different image. Image dimensions reset to unknown at once.
    pub fn set_image(&mut self, image_key: Option<&str>) -> bool {
        self.view.set_image(image_key)
    }

    pub fn image_loaded(&mut self, image_key: &str, size: Size) -> bool {
        self.view.image_loaded(image_key, size)
    }

    pub fn resize(&mut self, size: Size) -> bool {
        self.view.resize(size)
    }

    // ─── Derivations ─────────────────────────────────────────────────────

    pub fn store(&self) -> &DesignStore {
        &self.store
    }

    pub fn working(&self) -> &WorkingState {
        self.store.working()
    }

    pub fn dirty(&mut self) -> &DirtyReport {
        self.dirty.get(self.store.baseline(), self.store.working())
    }

    pub fn markers(&mut self) -> &[PlacedMarker] {
        self.view.markers(self.store.working())
    }

    pub fn hit_test(&mut self, px: f64, py: f64) -> Option<PlacedMarker> {
        let radius = self.config.hit_radius_px;
        self.view.hit_test(self.store.working(), px, py, radius)
    }

    /// The regeneration request, or `None` when the working state still
    /// matches the analysis (no call should be made).
    pub fn regeneration_request(&mut self) -> Option<RegenerationRequest> {
        let keyword = self
            .store
            .baseline()
            .map(|b| b.keyword.clone())
            .unwrap_or_default();
        let report = self.dirty();
        if !report.is_dirty() {
            return None;
        }
        Some(RegenerationRequest {
            keyword,
            descriptions: report.descriptions.clone(),
            summary: report.summary(),
        })
    }

    // ─── Service caches ──────────────────────────────────────────────────

    /// The prompt cache handed to the AI service collaborator.
    pub fn prompts_mut(&mut self) -> &mut PromptCache<C> {
        &mut self.prompts
    }

    /// Drop cached prompts and type enums. The design state is untouched.
    pub fn clear_prompt_cache(&mut self) {
        self.prompts.clear();
    }
}
