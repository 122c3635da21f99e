//! Core design data model.
//!
//! An uploaded cake photo is decomposed (by an external AI analysis) into
//! toppers, support elements, messages, an icing treatment and general cake
//! info. The decomposition is frozen into an [`AnalysisBaseline`]; every user
//! edit is applied to a separate [`WorkingState`] of the same shape.
//!
//! Fields that can be reverted are stored as [`Tracked`] pairs so the
//! original AI value travels with the element and "revert" is a single
//! operation instead of per-field bookkeeping.

use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ─── Colors ──────────────────────────────────────────────────────────────

/// A small list of hex colours. Most elements carry one to three.
pub type ColorList = SmallVec<[String; 4]>;

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Canonical comparison key for a colour string.
///
/// Hex colours (`#RGB`, `#RRGGBB`, `#RRGGBBAA`, with or without `#`) become
/// uppercase `#RRGGBB[AA]`. Anything else (e.g. a CSS colour name) is
/// trimmed and uppercased. Blank strings yield `None`.
pub fn normalize_color(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let bytes = hex.as_bytes();
    if !bytes.iter().all(|b| hex_val(*b).is_some()) {
        return Some(trimmed.to_ascii_uppercase());
    }
    match bytes.len() {
        3 => {
            let mut out = String::with_capacity(7);
            out.push('#');
            for b in bytes {
                let c = b.to_ascii_uppercase() as char;
                out.push(c);
                out.push(c);
            }
            Some(out)
        }
        6 | 8 => Some(format!("#{}", hex.to_ascii_uppercase())),
        _ => Some(trimmed.to_ascii_uppercase()),
    }
}

/// Case-insensitive colour equality. Two blank/missing colours are equal.
pub fn colors_match(a: Option<&str>, b: Option<&str>) -> bool {
    a.and_then(normalize_color) == b.and_then(normalize_color)
}

/// Set equality over colour lists: order-insensitive, case-insensitive,
/// blank slots ignored.
pub fn color_sets_match(a: &[String], b: &[String]) -> bool {
    let set = |list: &[String]| -> BTreeSet<String> {
        list.iter().filter_map(|c| normalize_color(c)).collect()
    };
    set(a) == set(b)
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// A model-space coordinate reported by the analysis.
///
/// Origin is the image centre, `x` grows rightward and `y` grows upward.
/// Units are image-relative, not screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both components are finite (not NaN, not infinite).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ─── Tracked values ──────────────────────────────────────────────────────

/// A `(current, original)` pair. The original is fixed at construction.
///
/// Serialises both halves, but deserialises only `current`: an original
/// supplied from outside is ignored, so callers cannot forge one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    current: T,
    original: T,
}

impl<'de, T> Deserialize<'de> for Tracked<T>
where
    T: Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Current<T> {
            current: T,
        }
        Current::deserialize(deserializer).map(|c| Tracked::new(c.current))
    }
}

impl<T: Clone + PartialEq> Tracked<T> {
    /// Start tracking a value; current and original are both `value`.
    pub fn new(value: T) -> Self {
        Self {
            current: value.clone(),
            original: value,
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    pub fn set(&mut self, value: T) {
        self.current = value;
    }

    /// Structural inequality between current and original.
    pub fn is_modified(&self) -> bool {
        self.current != self.original
    }

    pub fn revert(&mut self) {
        self.current = self.original.clone();
    }

    /// Re-anchor on the analysed value, keeping the current one.
    fn rebase(&mut self, original: &T) {
        self.original = original.clone();
    }
}

impl<T: Default + Clone + PartialEq> Default for Tracked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ─── Categories ──────────────────────────────────────────────────────────

/// The element categories that can be addressed by store mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    MainTopper,
    SupportElement,
    CakeMessage,
}

impl ItemCategory {
    /// Human-readable label used in change descriptions.
    pub fn label(self) -> &'static str {
        match self {
            ItemCategory::MainTopper => "main topper",
            ItemCategory::SupportElement => "support element",
            ItemCategory::CakeMessage => "message",
        }
    }

    /// Prefix for generated element IDs.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ItemCategory::MainTopper => "topper",
            ItemCategory::SupportElement => "support",
            ItemCategory::CakeMessage => "msg",
        }
    }

    /// Parse the wire name (`main_topper`, `support_element`, `cake_message`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "main_topper" | "main_toppers" => Some(ItemCategory::MainTopper),
            "support_element" | "support_elements" => Some(ItemCategory::SupportElement),
            "cake_message" | "cake_messages" | "message" => Some(ItemCategory::CakeMessage),
            _ => None,
        }
    }
}

// ─── Toppers & support elements ──────────────────────────────────────────

/// A main topper or support element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorElement {
    pub id: ElementId,
    /// Material type (e.g. `toy`, `printout`, `edible_3d`).
    pub kind: Tracked<String>,
    pub description: String,
    pub size: String,
    /// Coverage level, reported for support elements only.
    pub coverage: Option<String>,
    pub color: Tracked<Option<String>>,
    pub colors: Tracked<ColorList>,
    pub position: Option<Position>,
    pub enabled: bool,
    /// User-supplied replacement image (URL or data URI).
    pub replacement_image: Option<String>,
}

impl DecorElement {
    pub fn new(id: ElementId, kind: &str, description: &str) -> Self {
        Self {
            id,
            kind: Tracked::new(kind.to_string()),
            description: description.to_string(),
            size: String::new(),
            coverage: None,
            color: Tracked::new(None),
            colors: Tracked::new(ColorList::new()),
            position: None,
            enabled: true,
            replacement_image: None,
        }
    }

    /// Whether this element diverges from what the analysis reported.
    pub fn is_modified(&self) -> bool {
        !self.enabled
            || self.kind.is_modified()
            || self.color_changed()
            || self.colors_changed()
            || self.replacement_image.is_some()
    }

    pub fn color_changed(&self) -> bool {
        !colors_match(
            self.color.current().as_deref(),
            self.color.original().as_deref(),
        )
    }

    pub fn colors_changed(&self) -> bool {
        !color_sets_match(self.colors.current(), self.colors.original())
    }

    /// Restore every tracked field, re-enable, and drop any replacement image.
    pub fn revert(&mut self) {
        self.kind.revert();
        self.color.revert();
        self.colors.revert();
        self.enabled = true;
        self.replacement_image = None;
    }

    /// Position used for spatial markers: only enabled elements with a
    /// finite coordinate are markable.
    pub fn marker_position(&self) -> Option<Position> {
        self.position.filter(|p| self.enabled && p.is_finite())
    }

    /// Short label for change descriptions (`description`, falling back to id).
    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            self.id.as_str()
        } else {
            self.description.as_str()
        }
    }
}

// ─── Messages ────────────────────────────────────────────────────────────

/// A text message written on the cake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CakeMessage {
    pub id: ElementId,
    /// Technique (e.g. `gumpaste_letters`, `icing_script`, `printout`).
    pub kind: Tracked<String>,
    pub text: Tracked<String>,
    /// Where on the cake the message sits (`top`, `side`, `base_board`).
    pub placement: Tracked<String>,
    pub color: Tracked<String>,
    pub position: Tracked<Option<Position>>,
    pub enabled: bool,
}

impl CakeMessage {
    pub fn new(id: ElementId, text: &str) -> Self {
        Self {
            id,
            kind: Tracked::new("icing_script".to_string()),
            text: Tracked::new(text.to_string()),
            placement: Tracked::new("top".to_string()),
            color: Tracked::new(String::new()),
            position: Tracked::new(None),
            enabled: true,
        }
    }

    /// Back to the analysed state, including where the message sits.
    pub fn revert(&mut self) {
        self.kind.revert();
        self.text.revert();
        self.placement.revert();
        self.color.revert();
        self.position.revert();
        self.enabled = true;
    }

    /// Take every original from `analysed`, the baseline message with the
    /// same id. Current values are kept.
    pub fn rebase_on(&mut self, analysed: &CakeMessage) {
        self.kind.rebase(analysed.kind.current());
        self.text.rebase(analysed.text.current());
        self.placement.rebase(analysed.placement.current());
        self.color.rebase(analysed.color.current());
        self.position.rebase(analysed.position.current());
    }

    pub fn marker_position(&self) -> Option<Position> {
        self.position
            .current()
            .filter(|p| self.enabled && p.is_finite())
    }
}

// ─── Icing ───────────────────────────────────────────────────────────────

/// Boolean icing features that can be switched on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IcingFeature {
    #[serde(rename = "drip")]
    Drip,
    #[serde(rename = "border_top")]
    BorderTop,
    #[serde(rename = "border_base")]
    BorderBase,
    #[serde(rename = "gumpasteBaseBoard")]
    GumpasteBaseBoard,
}

impl IcingFeature {
    pub const ALL: [IcingFeature; 4] = [
        IcingFeature::Drip,
        IcingFeature::BorderTop,
        IcingFeature::BorderBase,
        IcingFeature::GumpasteBaseBoard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IcingFeature::Drip => "drip",
            IcingFeature::BorderTop => "top border",
            IcingFeature::BorderBase => "base border",
            IcingFeature::GumpasteBaseBoard => "gumpaste base board",
        }
    }

    /// The colour slot owned by this feature.
    pub fn slot(self) -> IcingSlot {
        match self {
            IcingFeature::Drip => IcingSlot::Drip,
            IcingFeature::BorderTop => IcingSlot::BorderTop,
            IcingFeature::BorderBase => IcingSlot::BorderBase,
            IcingFeature::GumpasteBaseBoard => IcingSlot::GumpasteBaseBoard,
        }
    }
}

/// Keys of the icing colour map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IcingSlot {
    #[serde(rename = "top")]
    Top,
    #[serde(rename = "side")]
    Side,
    #[serde(rename = "drip")]
    Drip,
    #[serde(rename = "borderTop")]
    BorderTop,
    #[serde(rename = "borderBase")]
    BorderBase,
    #[serde(rename = "gumpasteBaseBoardColor")]
    GumpasteBaseBoard,
}

impl IcingSlot {
    pub fn label(self) -> &'static str {
        match self {
            IcingSlot::Top => "top icing",
            IcingSlot::Side => "side icing",
            IcingSlot::Drip => "drip",
            IcingSlot::BorderTop => "top border",
            IcingSlot::BorderBase => "base border",
            IcingSlot::GumpasteBaseBoard => "base board",
        }
    }

    /// The feature flag gating this slot. `Top` and `Side` are always shown.
    pub fn feature(self) -> Option<IcingFeature> {
        match self {
            IcingSlot::Top | IcingSlot::Side => None,
            IcingSlot::Drip => Some(IcingFeature::Drip),
            IcingSlot::BorderTop => Some(IcingFeature::BorderTop),
            IcingSlot::BorderBase => Some(IcingFeature::BorderBase),
            IcingSlot::GumpasteBaseBoard => Some(IcingFeature::GumpasteBaseBoard),
        }
    }
}

/// The icing treatment of the cake.
///
/// A slot's colour is only meaningful while its feature flag is on, but the
/// value is kept when the flag is switched off so it can be restored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IcingDesign {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub color_type: String,
    #[serde(default)]
    pub drip: bool,
    #[serde(default)]
    pub border_top: bool,
    #[serde(default)]
    pub border_base: bool,
    #[serde(default, rename = "gumpasteBaseBoard")]
    pub gumpaste_base_board: bool,
    #[serde(default)]
    pub colors: BTreeMap<IcingSlot, String>,
    #[serde(default)]
    pub prices: BTreeMap<IcingFeature, f64>,
}

impl IcingDesign {
    pub fn feature(&self, feature: IcingFeature) -> bool {
        match feature {
            IcingFeature::Drip => self.drip,
            IcingFeature::BorderTop => self.border_top,
            IcingFeature::BorderBase => self.border_base,
            IcingFeature::GumpasteBaseBoard => self.gumpaste_base_board,
        }
    }

    /// Toggle a feature flag. The slot colour is left untouched.
    pub fn set_feature(&mut self, feature: IcingFeature, on: bool) {
        match feature {
            IcingFeature::Drip => self.drip = on,
            IcingFeature::BorderTop => self.border_top = on,
            IcingFeature::BorderBase => self.border_base = on,
            IcingFeature::GumpasteBaseBoard => self.gumpaste_base_board = on,
        }
    }

    pub fn set_color(&mut self, slot: IcingSlot, color: &str) {
        self.colors.insert(slot, color.to_string());
    }

    /// The colour for `slot`, or `None` when blank or its feature is off.
    pub fn effective_color(&self, slot: IcingSlot) -> Option<&str> {
        if let Some(feature) = slot.feature()
            && !self.feature(feature)
        {
            return None;
        }
        self.colors
            .get(&slot)
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }
}

// ─── Cake info ───────────────────────────────────────────────────────────

/// General cake parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CakeInfo {
    #[serde(rename = "type")]
    pub cake_type: String,
    pub thickness: String,
    pub size: String,
    pub flavors: Vec<String>,
}

/// A partial update to [`CakeInfo`]; `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CakeInfoPatch {
    #[serde(rename = "type")]
    pub cake_type: Option<String>,
    pub thickness: Option<String>,
    pub size: Option<String>,
    pub flavors: Option<Vec<String>>,
}

impl CakeInfo {
    /// Return a new `CakeInfo` with `patch` applied.
    pub fn patched(&self, patch: &CakeInfoPatch) -> CakeInfo {
        CakeInfo {
            cake_type: patch
                .cake_type
                .clone()
                .unwrap_or_else(|| self.cake_type.clone()),
            thickness: patch
                .thickness
                .clone()
                .unwrap_or_else(|| self.thickness.clone()),
            size: patch.size.clone().unwrap_or_else(|| self.size.clone()),
            flavors: patch
                .flavors
                .clone()
                .unwrap_or_else(|| self.flavors.clone()),
        }
    }
}

// ─── Item union ──────────────────────────────────────────────────────────

/// Any markable design element, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "item", rename_all = "snake_case")]
pub enum DesignItem {
    MainTopper(DecorElement),
    SupportElement(DecorElement),
    Message(CakeMessage),
}

impl DesignItem {
    pub fn id(&self) -> ElementId {
        match self {
            DesignItem::MainTopper(e) | DesignItem::SupportElement(e) => e.id,
            DesignItem::Message(m) => m.id,
        }
    }

    pub fn category(&self) -> ItemCategory {
        match self {
            DesignItem::MainTopper(_) => ItemCategory::MainTopper,
            DesignItem::SupportElement(_) => ItemCategory::SupportElement,
            DesignItem::Message(_) => ItemCategory::CakeMessage,
        }
    }

    /// Markable position (enabled, finite), if any.
    pub fn marker_position(&self) -> Option<Position> {
        match self {
            DesignItem::MainTopper(e) | DesignItem::SupportElement(e) => e.marker_position(),
            DesignItem::Message(m) => m.marker_position(),
        }
    }
}

// ─── Baseline & working state ────────────────────────────────────────────

/// The frozen AI analysis of one uploaded image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisBaseline {
    pub keyword: String,
    pub cake_info: CakeInfo,
    pub main_toppers: Vec<DecorElement>,
    pub support_elements: Vec<DecorElement>,
    pub cake_messages: Vec<CakeMessage>,
    pub icing_design: IcingDesign,
    /// Outline points of the base board, when detected.
    pub base_board: Vec<Position>,
}

impl AnalysisBaseline {
    /// Deep copy of the baseline into a fresh working state.
    pub fn working_copy(&self) -> WorkingState {
        WorkingState {
            cake_info: Arc::new(self.cake_info.clone()),
            main_toppers: Arc::new(self.main_toppers.clone()),
            support_elements: Arc::new(self.support_elements.clone()),
            cake_messages: Arc::new(self.cake_messages.clone()),
            icing_design: Arc::new(self.icing_design.clone()),
        }
    }

    pub fn message(&self, id: ElementId) -> Option<&CakeMessage> {
        self.cake_messages.iter().find(|m| m.id == id)
    }
}

/// The user-editable copy of a baseline.
///
/// Each category sits behind its own `Arc`. Mutations never write through an
/// existing `Arc`; they build a new value and swap the pointer, so pointer
/// identity doubles as a change stamp for memoised derivations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkingState {
    pub cake_info: Arc<CakeInfo>,
    pub main_toppers: Arc<Vec<DecorElement>>,
    pub support_elements: Arc<Vec<DecorElement>>,
    pub cake_messages: Arc<Vec<CakeMessage>>,
    pub icing_design: Arc<IcingDesign>,
}

impl WorkingState {
    /// The topper/element list for a category. `CakeMessage` has none.
    pub fn elements(&self, category: ItemCategory) -> Option<&Arc<Vec<DecorElement>>> {
        match category {
            ItemCategory::MainTopper => Some(&self.main_toppers),
            ItemCategory::SupportElement => Some(&self.support_elements),
            ItemCategory::CakeMessage => None,
        }
    }

    /// All elements as tagged items, in paint order: main toppers, support
    /// elements, then messages.
    pub fn design_items(&self) -> Vec<DesignItem> {
        self.main_toppers
            .iter()
            .cloned()
            .map(DesignItem::MainTopper)
            .chain(
                self.support_elements
                    .iter()
                    .cloned()
                    .map(DesignItem::SupportElement),
            )
            .chain(self.cake_messages.iter().cloned().map(DesignItem::Message))
            .collect()
    }

    /// Pointer-identity equality across all five categories.
    pub fn same_identity(&self, other: &WorkingState) -> bool {
        Arc::ptr_eq(&self.cake_info, &other.cake_info)
            && Arc::ptr_eq(&self.main_toppers, &other.main_toppers)
            && Arc::ptr_eq(&self.support_elements, &other.support_elements)
            && Arc::ptr_eq(&self.cake_messages, &other.cake_messages)
            && Arc::ptr_eq(&self.icing_design, &other.icing_design)
    }
}
