//! Analysis ingest: the AI service's JSON payload → [`AnalysisBaseline`].
//!
//! The payload shape is owned by the external analysis service. Everything
//! optional there stays optional here; missing coordinates simply make an
//! element non-markable.

use crate::id::ElementId;
use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Errors raised while ingesting an analysis payload.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The payload was not valid analysis JSON.
    #[error("invalid analysis payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was empty or whitespace.
    #[error("analysis payload is empty")]
    Empty,
}

// ─── Wire types ──────────────────────────────────────────────────────────

/// The analysis result as produced by the vision service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "cakeType", default)]
    pub cake_type: String,
    #[serde(rename = "cakeThickness", default)]
    pub cake_thickness: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub main_toppers: Vec<DetectedDecor>,
    #[serde(default)]
    pub support_elements: Vec<DetectedDecor>,
    #[serde(default)]
    pub cake_messages: Vec<DetectedMessage>,
    #[serde(default)]
    pub icing_design: IcingDesign,
    #[serde(default)]
    pub base_board: Option<Vec<Position>>,
}

/// A topper or support element as reported by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedDecor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub coverage: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub colors: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

/// A cake message as reported by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    /// Placement on the cake (`top`, `side`, `base_board`).
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

// ─── Ingest ──────────────────────────────────────────────────────────────

/// Parse an analysis payload.
///
/// # Errors
/// Returns [`AnalysisError::Empty`] for a blank payload and
/// [`AnalysisError::Json`] when the JSON does not match the analysis shape.
pub fn parse_analysis(json: &str) -> Result<AnalysisResult, AnalysisError> {
    if json.trim().is_empty() {
        return Err(AnalysisError::Empty);
    }
    Ok(serde_json::from_str(json)?)
}

fn position_of(x: Option<f64>, y: Option<f64>) -> Option<Position> {
    match (x, y) {
        (Some(x), Some(y)) => Some(Position::new(x, y)).filter(Position::is_finite),
        _ => None,
    }
}

/// Hands out element IDs, keeping service-provided IDs when they are
/// present and unique within the analysis.
struct IdAllocator {
    seen: HashSet<ElementId>,
}

impl IdAllocator {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    fn allocate(&mut self, provided: Option<&str>, category: ItemCategory) -> ElementId {
        if let Some(id) = provided.and_then(ElementId::from_payload) {
            if self.seen.insert(id) {
                return id;
            }
            log::warn!("duplicate {} id `{id}` in analysis; generating a new one", category.label());
        }
        loop {
            let id = ElementId::generate(category.id_prefix());
            if self.seen.insert(id) {
                return id;
            }
        }
    }
}

fn decor_from_detection(
    det: DetectedDecor,
    category: ItemCategory,
    ids: &mut IdAllocator,
) -> DecorElement {
    let id = ids.allocate(det.id.as_deref(), category);
    let mut element = DecorElement::new(id, &det.kind, &det.description);
    element.size = det.size;
    element.coverage = det.coverage;
    element.color = Tracked::new(det.color.filter(|c| !c.trim().is_empty()));
    let colors: ColorList = det
        .colors
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    element.colors = Tracked::new(colors);
    element.position = position_of(det.x, det.y);
    element
}

fn message_from_detection(det: DetectedMessage, ids: &mut IdAllocator) -> CakeMessage {
    let id = ids.allocate(det.id.as_deref(), ItemCategory::CakeMessage);
    let mut message = CakeMessage::new(id, &det.text);
    if !det.kind.is_empty() {
        message.kind = Tracked::new(det.kind);
    }
    if !det.position.is_empty() {
        message.placement = Tracked::new(det.position);
    }
    message.color = Tracked::new(det.color);
    message.position = Tracked::new(position_of(det.x, det.y));
    message
}

impl AnalysisBaseline {
    /// Freeze an analysis result into a baseline, assigning stable IDs.
    pub fn from_analysis(result: AnalysisResult) -> Self {
        let mut ids = IdAllocator::new();

        let main_toppers = result
            .main_toppers
            .into_iter()
            .map(|d| decor_from_detection(d, ItemCategory::MainTopper, &mut ids))
            .collect();
        let support_elements = result
            .support_elements
            .into_iter()
            .map(|d| decor_from_detection(d, ItemCategory::SupportElement, &mut ids))
            .collect();
        let cake_messages = result
            .cake_messages
            .into_iter()
            .map(|d| message_from_detection(d, &mut ids))
            .collect();

        let base_board = result
            .base_board
            .unwrap_or_default()
            .into_iter()
            .filter(Position::is_finite)
            .collect();

        Self {
            keyword: result.keyword,
            cake_info: CakeInfo {
                cake_type: result.cake_type,
                thickness: result.cake_thickness,
                size: String::new(),
                flavors: Vec::new(),
            },
            main_toppers,
            support_elements,
            cake_messages,
            icing_design: result.icing_design,
            base_board,
        }
    }

    /// Parse and freeze an analysis payload in one step.
    ///
    /// # Errors
    /// See [`parse_analysis`].
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        parse_analysis(json).map(Self::from_analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r##"{
        "cakeType": "1 Tier",
        "cakeThickness": "4 in",
        "keyword": "unicorn",
        "main_toppers": [
            { "id": "t1", "type": "toy", "description": "unicorn figure", "size": "large",
              "color": "#FFFFFF", "colors": ["#FFFFFF", null, "#F9A8D4"], "x": 12.5, "y": 40 }
        ],
        "support_elements": [
            { "type": "edible_flowers", "description": "roses", "size": "medium", "coverage": "light" }
        ],
        "cake_messages": [
            { "type": "gumpaste_letters", "text": "Happy 5th", "position": "top", "color": "#000000", "x": 0, "y": -20 }
        ],
        "icing_design": {
            "base": "soft_icing", "color_type": "single", "drip": true, "border_top": false,
            "border_base": true, "gumpasteBaseBoard": false,
            "colors": { "top": "#FFC0CB", "drip": "#EF4444" }
        },
        "base_board": [{ "x": -100, "y": -90 }, { "x": 100, "y": -90 }]
    }"##;

    #[test]
    fn ingest_full_payload() {
        let baseline = AnalysisBaseline::from_json(SAMPLE).unwrap();
        assert_eq!(baseline.cake_info.cake_type, "1 Tier");
        assert_eq!(baseline.cake_info.thickness, "4 in");
        assert_eq!(baseline.keyword, "unicorn");

        let topper = &baseline.main_toppers[0];
        assert_eq!(topper.id, ElementId::intern("t1"));
        assert_eq!(topper.kind.current(), "toy");
        assert_eq!(topper.kind.original(), "toy");
        assert_eq!(topper.colors.current().len(), 3);
        assert_eq!(topper.colors.current()[1], "");
        assert_eq!(topper.position, Some(Position::new(12.5, 40.0)));

        let support = &baseline.support_elements[0];
        assert!(support.id.as_str().starts_with("support_"));
        assert_eq!(support.coverage.as_deref(), Some("light"));
        assert_eq!(support.position, None);

        let msg = &baseline.cake_messages[0];
        assert_eq!(msg.text.current(), "Happy 5th");
        assert_eq!(msg.placement.current(), "top");

        assert!(baseline.icing_design.drip);
        assert_eq!(
            baseline.icing_design.colors.get(&IcingSlot::Drip).map(String::as_str),
            Some("#EF4444")
        );
        assert_eq!(baseline.base_board.len(), 2);
    }

    #[test]
    fn blank_payload_is_an_error() {
        assert!(matches!(parse_analysis("   "), Err(AnalysisError::Empty)));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = parse_analysis("{\"main_toppers\": 3}").unwrap_err();
        assert!(matches!(err, AnalysisError::Json(_)));
        assert!(err.to_string().starts_with("invalid analysis payload"));
    }

    #[test]
    fn half_specified_coordinates_are_not_markable() {
        let json = r#"{ "main_toppers": [ { "type": "toy", "x": 10 } ] }"#;
        let baseline = AnalysisBaseline::from_json(json).unwrap();
        assert_eq!(baseline.main_toppers[0].position, None);
    }

    #[test]
    fn duplicate_ids_are_reassigned() {
        let json = r#"{
            "main_toppers": [ { "id": "dup", "type": "toy" }, { "id": "dup", "type": "printout" } ]
        }"#;
        let baseline = AnalysisBaseline::from_json(json).unwrap();
        assert_eq!(baseline.main_toppers[0].id, ElementId::intern("dup"));
        assert_ne!(baseline.main_toppers[1].id, ElementId::intern("dup"));
    }
}
