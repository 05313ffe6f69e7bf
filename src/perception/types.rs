use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A point in physical screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle `(x, y, width, height)` in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Square window of side `size` centred on `p`.
    pub fn around(p: Point, size: u32) -> Self {
        let half = (size / 2) as i32;
        Self::new(p.x - half, p.y - half, size, size)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Width divided by height; zero for degenerate boxes.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Intersection with a `bounds_w` x `bounds_h` surface anchored at the origin.
    /// Returns `None` when nothing overlaps.
    pub fn clamp_to(&self, bounds_w: u32, bounds_h: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width as i32).min(bounds_w as i32);
        let y2 = (self.y + self.height as i32).min(bounds_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

/// One word reported by the text extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedToken {
    pub text: String,
    /// 0 to 100, as reported by the OCR engine.
    pub confidence: u8,
    pub bbox: Region,
}

impl RecognizedToken {
    pub fn new(text: impl Into<String>, confidence: u8, bbox: Region) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }
}

/// Immutable RGB capture of (part of) the display.
///
/// `origin` is the screen position of pixel `(0, 0)`, so coordinates found in a
/// region capture can be mapped back to the full screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenImage {
    pixels: Arc<image::RgbImage>,
    origin: Point,
}

impl ScreenImage {
    pub fn new(pixels: image::RgbImage, origin: Point) -> Self {
        Self {
            pixels: Arc::new(pixels),
            origin,
        }
    }

    /// Plain-colour image, mostly useful for tests and placeholders.
    pub fn blank(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(
            image::RgbImage::from_pixel(width, height, image::Rgb(rgb)),
            Point::new(0, 0),
        )
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn pixels(&self) -> &image::RgbImage {
        &self.pixels
    }

    /// Crop a screen-space region out of this capture.
    pub fn crop(&self, region: Region) -> Option<ScreenImage> {
        let local = Region::new(
            region.x - self.origin.x,
            region.y - self.origin.y,
            region.width,
            region.height,
        );
        let clamped = local.clamp_to(self.width(), self.height())?;
        let view = image::imageops::crop_imm(
            self.pixels.as_ref(),
            clamped.x as u32,
            clamped.y as u32,
            clamped.width,
            clamped.height,
        )
        .to_image();
        Some(ScreenImage::new(
            view,
            Point::new(self.origin.x + clamped.x, self.origin.y + clamped.y),
        ))
    }

    /// Fraction of pixels whose channels differ by more than `tolerance`.
    /// Images of different size count as fully changed.
    pub fn difference(&self, other: &ScreenImage, tolerance: u8) -> f64 {
        if self.width() != other.width() || self.height() != other.height() {
            return 1.0;
        }
        let total = self.pixels.pixels().len();
        if total == 0 {
            return 0.0;
        }
        let changed = self
            .pixels
            .pixels()
            .zip(other.pixels.pixels())
            .filter(|(a, b)| {
                a.0.iter()
                    .zip(b.0.iter())
                    .any(|(x, y)| x.abs_diff(*y) > tolerance)
            })
            .count();
        changed as f64 / total as f64
    }
}

/// Text extractor configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Uniform block of text.
    #[default]
    Block,
    SingleWord,
    SingleLine,
    /// Sparse text scattered over the image.
    Sparse,
    /// Raw line, no layout analysis.
    RawLine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_keeps_screen_origin() {
        let img = ScreenImage::blank(100, 80, [255, 255, 255]);
        let part = img.crop(Region::new(10, 20, 30, 40)).unwrap();
        assert_eq!(part.origin(), Point::new(10, 20));
        assert_eq!((part.width(), part.height()), (30, 40));

        // Partially outside: clamped.
        let edge = img.crop(Region::new(90, 70, 50, 50)).unwrap();
        assert_eq!((edge.width(), edge.height()), (10, 10));
        assert!(img.crop(Region::new(200, 200, 5, 5)).is_none());
    }

    #[test]
    fn difference_counts_changed_pixels() {
        let a = ScreenImage::blank(10, 10, [0, 0, 0]);
        let mut raw = image::RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0]));
        for x in 0..10 {
            raw.put_pixel(x, 0, image::Rgb([200, 0, 0]));
        }
        let b = ScreenImage::new(raw, Point::new(0, 0));
        assert!((a.difference(&b, 10) - 0.1).abs() < 1e-9);
        assert_eq!(a.difference(&a.clone(), 0), 0.0);
    }

    #[test]
    fn window_around_point_is_centred() {
        let r = Region::around(Point::new(100, 100), 60);
        assert_eq!(r, Region::new(70, 70, 60, 60));
        assert_eq!(r.center(), Point::new(100, 100));
    }
}
