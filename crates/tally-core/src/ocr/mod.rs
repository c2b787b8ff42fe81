//! OCR input model handed over by the upstream recognizer.
//!
//! The OCR engine itself lives outside this crate. It supplies recognized
//! lines with optional geometry and word-level elements; everything here is
//! read-only input.

mod layout;

pub use layout::{group_rows, Row, RowSegment};

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Axis-aligned bounding box in image coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoxRepr")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Boxes arrive either as `[x, y, w, h]` or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoxRepr {
    Array([f32; 4]),
    Object {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl From<BoxRepr> for BoundingBox {
    fn from(repr: BoxRepr) -> Self {
        match repr {
            BoxRepr::Array([x, y, width, height]) => Self::new(x, y, width, height),
            BoxRepr::Object {
                x,
                y,
                width,
                height,
            } => Self::new(x, y, width, height),
        }
    }
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// A recognized sub-word with its own box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    pub bbox: BoundingBox,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

impl TextElement {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// One OCR-recognized line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text content.
    pub text: String,

    /// Line box, if the recognizer reported geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// Recognition confidence (0.0 - 1.0).
    #[serde(default = "full_confidence")]
    pub confidence: f32,

    /// Sub-word elements in reading order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<TextElement>,
}

fn full_confidence() -> f32 {
    1.0
}

impl TextLine {
    /// A geometry-less line, as produced from flat text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox: None,
            confidence: 1.0,
            elements: Vec::new(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_elements(mut self, elements: Vec<TextElement>) -> Self {
        self.elements = elements;
        self
    }

    /// Check the line against the upstream contract.
    pub fn validate(&self, index: usize) -> Result<(), ExtractionError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ExtractionError::InvalidLine {
                index,
                reason: format!("confidence {} outside [0, 1]", self.confidence),
            });
        }
        let boxes = self.bbox.iter().chain(self.elements.iter().map(|e| &e.bbox));
        for bbox in boxes {
            if !bbox.is_valid() {
                return Err(ExtractionError::InvalidLine {
                    index,
                    reason: format!("degenerate bounding box {:?}", bbox),
                });
            }
        }
        Ok(())
    }
}

/// Everything the OCR collaborator hands over for one receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptInput {
    /// Recognized lines in reading order.
    #[serde(default)]
    pub lines: Vec<TextLine>,

    /// Flat recognized text, used when no lines are supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Detected language code. Only a hint: matching is language-union based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ReceiptInput {
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Lines to work on: the supplied lines, or the flat text split into
    /// geometry-less lines.
    pub fn effective_lines(&self) -> Vec<TextLine> {
        if !self.lines.is_empty() {
            return self.lines.clone();
        }
        self.text
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(TextLine::plain)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_array_and_object() {
        let line: TextLine =
            serde_json::from_str(r#"{"text": "Total 5.00", "bbox": [10, 20, 100, 12]}"#).unwrap();
        assert_eq!(line.bbox, Some(BoundingBox::new(10.0, 20.0, 100.0, 12.0)));
        assert_eq!(line.confidence, 1.0);

        let element: TextElement = serde_json::from_str(
            r#"{"text": "5.00", "bbox": {"x": 80, "y": 20, "width": 30, "height": 12}, "confidence": 0.8}"#,
        )
        .unwrap();
        assert_eq!(element.bbox.right(), 110.0);
        assert_eq!(element.bbox.center_y(), 26.0);
    }

    #[test]
    fn test_effective_lines_from_text() {
        let input = ReceiptInput::from_text("Subtotal 1.00\n\n  Total 1.20  \n");
        let lines = input.effective_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "Total 1.20");
        assert!(lines[1].bbox.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let line = TextLine::plain("Total").with_confidence(1.5);
        assert!(matches!(
            line.validate(3),
            Err(ExtractionError::InvalidLine { index: 3, .. })
        ));

        let line = TextLine::plain("Total").with_bbox(BoundingBox::new(0.0, 0.0, -4.0, 2.0));
        assert!(line.validate(0).is_err());
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 5.0, 10.0, 10.0);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, 0.0, 30.0, 15.0));
    }
}
