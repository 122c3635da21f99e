//! Model space → viewport pixels.
//!
//! The analysis reports element positions relative to the image centre with
//! `y` pointing up. The image is shown "contain"-fit inside a container whose
//! aspect ratio may differ, so the projection has to account for the
//! letterbox bars on either the top/bottom or the left/right.

use cake_core::model::Position;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A measured width/height pair (image natural pixels or container pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Finite and strictly positive in both dimensions.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Fraction of the rendered image height subtracted from every projected `y`.
///
/// Calibration data: the analysis model reports positions with a small
/// systematic vertical offset. Its sign and magnitude depend on the model in
/// use and must be re-measured when that model changes.
pub const DEFAULT_Y_BIAS_RATIO: f64 = 0.02;

/// Projection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// See [`DEFAULT_Y_BIAS_RATIO`]. Positive values move markers up.
    pub y_bias_ratio: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            y_bias_ratio: DEFAULT_Y_BIAS_RATIO,
        }
    }
}

impl ProjectionConfig {
    /// Pure geometry, no bias correction.
    pub const fn uncalibrated() -> Self {
        Self { y_bias_ratio: 0.0 }
    }
}

/// Where a marker goes inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Pixel offset from the container's top-left corner.
    Pixel { x: f64, y: f64 },
    /// Dimensions not measured yet: render at the container centre.
    Centered,
}

impl Placement {
    /// CSS `(left, top)` values.
    pub fn css(&self) -> (String, String) {
        match self {
            Placement::Pixel { x, y } => (format!("{x:.2}px"), format!("{y:.2}px")),
            Placement::Centered => ("50%".to_string(), "50%".to_string()),
        }
    }

    /// Resolve to a concrete point. `Centered` needs the container size.
    pub fn resolve(&self, container: Option<Size>) -> Option<Point> {
        match self {
            Placement::Pixel { x, y } => Some(Point::new(*x, *y)),
            Placement::Centered => container
                .filter(Size::is_usable)
                .map(|c| Point::new(c.width / 2.0, c.height / 2.0)),
        }
    }
}

/// The rectangle occupied by a "contain"-fit image inside the container.
pub fn fit_contain(image: Size, container: Size) -> Rect {
    let image_aspect = image.aspect();
    if image_aspect > container.aspect() {
        // Width-constrained: bars above and below.
        let height = container.width / image_aspect;
        let top = (container.height - height) / 2.0;
        Rect::new(0.0, top, container.width, top + height)
    } else {
        // Height-constrained: bars left and right.
        let width = container.height * image_aspect;
        let left = (container.width - width) / 2.0;
        Rect::new(left, 0.0, left + width, container.height)
    }
}

/// Project a model-space position into container pixels.
///
/// Unknown (or degenerate) dimensions and non-finite positions yield
/// [`Placement::Centered`] rather than NaN.
pub fn project(
    point: Position,
    image: Option<Size>,
    container: Option<Size>,
    config: &ProjectionConfig,
) -> Placement {
    let (Some(image), Some(container)) = (
        image.filter(Size::is_usable),
        container.filter(Size::is_usable),
    ) else {
        return Placement::Centered;
    };
    if !point.is_finite() {
        return Placement::Centered;
    }

    let frame = fit_contain(image, container);
    let nx = (point.x + image.width / 2.0) / image.width;
    let ny = (-point.y + image.height / 2.0) / image.height;

    let x = frame.x0 + nx * frame.width();
    let y = frame.y0 + ny * frame.height() - config.y_bias_ratio * frame.height();
    log::trace!("project ({}, {}) -> ({x:.1}, {y:.1})", point.x, point.y);
    Placement::Pixel { x, y }
}
