//! Dirty-field tracking: baseline vs. working state.
//!
//! Answers, per category, whether the working copy has diverged from the
//! analysis, and describes each divergence in plain language. The result
//! gates the (expensive) image regeneration call and doubles as the change
//! summary sent along with it.
//!
//! Every function here is total: an absent baseline, empty lists and
//! partially-filled records all produce a report, never a panic.

use crate::model::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Per-category dirty flags plus human-readable change descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DirtyReport {
    pub icing: bool,
    pub messages: bool,
    pub toppers: bool,
    pub cake_info: bool,
    pub descriptions: Vec<String>,
}

impl DirtyReport {
    /// Any category differs from the baseline.
    pub fn is_dirty(&self) -> bool {
        self.icing || self.messages || self.toppers || self.cake_info
    }

    /// Numbered change list suitable for a regeneration prompt.
    /// Empty when nothing changed.
    pub fn summary(&self) -> String {
        self.descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {d}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compare `working` against `baseline`.
///
/// Without a baseline (no analysis yet) every flag is `false`.
pub fn compute_dirty(baseline: Option<&AnalysisBaseline>, working: &WorkingState) -> DirtyReport {
    let Some(baseline) = baseline else {
        return DirtyReport::default();
    };

    let mut descriptions = Vec::new();
    let cake_info = cake_info_changes(&baseline.cake_info, &working.cake_info, &mut descriptions);
    let icing = icing_changes(&baseline.icing_design, &working.icing_design, &mut descriptions);
    let main = element_changes(
        ItemCategory::MainTopper,
        &working.main_toppers,
        &mut descriptions,
    );
    let support = element_changes(
        ItemCategory::SupportElement,
        &working.support_elements,
        &mut descriptions,
    );
    let messages = message_changes(
        &baseline.cake_messages,
        &working.cake_messages,
        &mut descriptions,
    );

    DirtyReport {
        icing,
        messages,
        toppers: main || support,
        cake_info,
        descriptions,
    }
}

// ─── Cake info ───────────────────────────────────────────────────────────

fn cake_info_changes(base: &CakeInfo, work: &CakeInfo, out: &mut Vec<String>) -> bool {
    let mut dirty = false;
    let mut field = |name: &str, before: &str, after: &str| {
        if before != after {
            dirty = true;
            out.push(format!("change the cake {name} from {} to {}", or_none(before), or_none(after)));
        }
    };
    field("type", &base.cake_type, &work.cake_type);
    field("thickness", &base.thickness, &work.thickness);
    field("size", &base.size, &work.size);
    if base.flavors != work.flavors {
        dirty = true;
        out.push(format!(
            "change the cake flavors from {} to {}",
            or_none(&base.flavors.join(", ")),
            or_none(&work.flavors.join(", "))
        ));
    }
    dirty
}

// ─── Icing ───────────────────────────────────────────────────────────────

fn icing_changes(base: &IcingDesign, work: &IcingDesign, out: &mut Vec<String>) -> bool {
    let mut dirty = false;
    let mut toggled = BTreeSet::new();

    for feature in IcingFeature::ALL {
        let (before, after) = (base.feature(feature), work.feature(feature));
        if before == after {
            continue;
        }
        dirty = true;
        toggled.insert(feature.slot());
        if after {
            match work.effective_color(feature.slot()) {
                Some(color) => out.push(format!("add a {} in {color}", feature.label())),
                None => out.push(format!("add a {}", feature.label())),
            }
        } else {
            out.push(format!("remove the {}", feature.label()));
        }
    }

    let slots: BTreeSet<IcingSlot> = base.colors.keys().chain(work.colors.keys()).copied().collect();
    for slot in slots {
        let before = base.colors.get(&slot).map(String::as_str);
        let after = work.colors.get(&slot).map(String::as_str);
        if colors_match(before, after) {
            continue;
        }
        dirty = true;
        if toggled.contains(&slot) {
            continue;
        }
        let after_blank = after.and_then(normalize_color).is_none();
        if after_blank {
            out.push(format!("clear the {} color", slot.label()));
        } else {
            out.push(format!(
                "change the {} color from {} to {}",
                slot.label(),
                or_none(before.unwrap_or_default()),
                after.unwrap_or_default()
            ));
        }
    }

    dirty
}

// ─── Toppers & support elements ──────────────────────────────────────────

fn element_changes(category: ItemCategory, items: &[DecorElement], out: &mut Vec<String>) -> bool {
    let mut dirty = false;
    for item in items {
        if !item.is_modified() {
            continue;
        }
        dirty = true;
        let label = category.label();
        let name = item.display_name();
        let id = item.id;

        if !item.enabled {
            out.push(format!("remove the {label} \"{name}\" ({id})"));
            continue;
        }
        if item.kind.is_modified() {
            out.push(format!(
                "change the {label} \"{name}\" ({id}) material type from {} to {}",
                or_none(item.kind.original()),
                or_none(item.kind.current())
            ));
        }
        if item.color_changed() {
            out.push(format!(
                "change the {label} \"{name}\" ({id}) color from {} to {}",
                or_none(item.color.original().as_deref().unwrap_or_default()),
                or_none(item.color.current().as_deref().unwrap_or_default())
            ));
        }
        if item.colors_changed() {
            let colors: Vec<&str> = item
                .colors
                .current()
                .iter()
                .map(String::as_str)
                .filter(|c| !c.trim().is_empty())
                .collect();
            out.push(format!(
                "recolor the {label} \"{name}\" ({id}) using {}",
                or_none(&colors.join(", "))
            ));
        }
        if item.replacement_image.is_some() {
            out.push(format!(
                "replace the {label} \"{name}\" ({id}) with the uploaded image"
            ));
        }
    }
    dirty
}

// ─── Messages ────────────────────────────────────────────────────────────

fn message_changes(base: &[CakeMessage], work: &[CakeMessage], out: &mut Vec<String>) -> bool {
    let mut dirty = base.len() != work.len();

    for msg in work {
        let Some(orig) = base.iter().find(|b| b.id == msg.id) else {
            dirty = true;
            if msg.enabled {
                out.push(format!("add the message \"{}\"", msg.text.current()));
            }
            continue;
        };

        if orig.enabled && !msg.enabled {
            dirty = true;
            out.push(format!("remove the message \"{}\"", orig.text.current()));
            continue;
        }
        if !orig.enabled && msg.enabled {
            dirty = true;
            out.push(format!("restore the message \"{}\"", msg.text.current()));
        }
        if orig.text.current() != msg.text.current() {
            dirty = true;
            out.push(format!(
                "change the message \"{}\" to \"{}\"",
                orig.text.current(),
                msg.text.current()
            ));
        }
        if !colors_match(Some(orig.color.current()), Some(msg.color.current())) {
            dirty = true;
            out.push(format!(
                "change the color of the message \"{}\" from {} to {}",
                msg.text.current(),
                or_none(orig.color.current()),
                or_none(msg.color.current())
            ));
        }
        if orig.position.current() != msg.position.current() {
            dirty = true;
            out.push(format!("move the message \"{}\"", msg.text.current()));
        }
    }

    for orig in base {
        if orig.enabled && !work.iter().any(|m| m.id == orig.id) {
            dirty = true;
            out.push(format!("remove the message \"{}\"", orig.text.current()));
        }
    }

    dirty
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() { "none" } else { s }
}

// ─── Memoisation ─────────────────────────────────────────────────────────

/// Caches the last [`DirtyReport`], keyed by pointer identity of the baseline
/// and the five working-state `Arc`s.
///
/// The key holds `Arc` clones, so a pointer cannot be freed and reused by a
/// different value while it is still the cached key.
#[derive(Debug, Default)]
pub struct DirtyMemo {
    key: Option<(Option<Arc<AnalysisBaseline>>, WorkingState)>,
    report: DirtyReport,
    recomputations: u64,
}

impl DirtyMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached report, recomputing only if an input identity changed.
    pub fn get(
        &mut self,
        baseline: Option<&Arc<AnalysisBaseline>>,
        working: &WorkingState,
    ) -> &DirtyReport {
        let hit = self.key.as_ref().is_some_and(|(b, w)| {
            let same_baseline = match (b, baseline) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            same_baseline && w.same_identity(working)
        });

        if !hit {
            self.report = compute_dirty(baseline.map(Arc::as_ref), working);
            self.key = Some((baseline.cloned(), working.clone()));
            self.recomputations += 1;
        }
        &self.report
    }

    /// How many times the report was actually recomputed.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
