//! Edge/contour based detection of button-like and input-field regions.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;

use crate::config::ClassifierConfig;
use crate::perception::types::{Point, Region, ScreenImage};

/// Interactive-looking regions found on a capture, in screen coordinates and
/// detection order (top to bottom).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutSummary {
    pub buttons: Vec<Region>,
    pub inputs: Vec<Region>,
}

impl LayoutSummary {
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.inputs.is_empty()
    }

    /// Two buttons whose centres sit on the same row.
    pub fn buttons_aligned(&self, tolerance: u32) -> bool {
        match self.buttons.as_slice() {
            [first, second] => {
                first.center().y.abs_diff(second.center().y) < tolerance
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutAnalyzer {
    config: ClassifierConfig,
}

impl LayoutAnalyzer {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Grayscale, edge detection, dilation, outer contours, bounding boxes.
    pub fn analyze(&self, image: &ScreenImage) -> LayoutSummary {
        let gray = image::imageops::grayscale(image.pixels());
        let edges = imageproc::edges::canny(&gray, self.config.canny_low, self.config.canny_high);
        let closed = imageproc::morphology::dilate(&edges, Norm::LInf, 1);

        let mut summary = LayoutSummary::default();
        for contour in outer_contours(&closed) {
            let Some(bbox) = bounding_box(&contour, image.origin()) else {
                continue;
            };
            if self.is_input_field(&bbox) {
                summary.inputs.push(bbox);
            } else if self.is_button(polygon_area(&contour), &bbox) {
                summary.buttons.push(bbox);
            }
        }

        tracing::debug!(
            buttons = summary.buttons.len(),
            inputs = summary.inputs.len(),
            "layout analyzed"
        );
        summary
    }

    /// Wide and short: width several times the height, height in input bounds.
    pub fn is_input_field(&self, bbox: &Region) -> bool {
        let c = &self.config;
        let aspect = bbox.aspect_ratio();
        bbox.width > c.input_min_width
            && bbox.height > c.input_min_height
            && bbox.height < c.input_max_height
            && aspect >= c.input_min_aspect
            && aspect <= c.input_max_aspect
    }

    pub fn is_button(&self, area: f64, bbox: &Region) -> bool {
        let c = &self.config;
        let aspect = bbox.aspect_ratio();
        area > c.button_min_area as f64
            && area < c.button_max_area as f64
            && aspect > c.button_min_aspect
            && aspect < c.button_max_aspect
    }
}

fn outer_contours(binary: &GrayImage) -> impl Iterator<Item = Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
}

fn bounding_box(contour: &Contour<i32>, origin: Point) -> Option<Region> {
    let xs = contour.points.iter().map(|p| p.x);
    let ys = contour.points.iter().map(|p| p.y);
    let (min_x, max_x) = (xs.clone().min()?, xs.max()?);
    let (min_y, max_y) = (ys.clone().min()?, ys.max()?);
    Some(Region::new(
        origin.x + min_x,
        origin.y + min_y,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Shoelace area of the traced border polygon.
fn polygon_area(contour: &Contour<i32>) -> f64 {
    let pts = &contour.points;
    if pts.len() < 3 {
        return 0.0;
    }
    let twice: i64 = pts
        .iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}
