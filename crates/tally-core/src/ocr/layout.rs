//! Row grouping: lines sharing a vertical centre form one visual row.
//!
//! Recognizers often split a visual row into several lines ("Total" on the
//! left, "€15.60" on the right), and table columns always arrive that way.
//! Rows put them back together left-to-right while keeping a map from row
//! text offsets back to the source lines and their word boxes.

use std::cmp::Ordering;

use super::{BoundingBox, TextElement, TextLine};

/// One source line inside a row, with its byte span in the row text.
#[derive(Debug, Clone)]
pub struct RowSegment<'a> {
    /// Index of the line in the input.
    pub line_index: usize,
    pub line: &'a TextLine,
    /// Byte offset of the line text within the row text.
    pub start: usize,
}

impl<'a> RowSegment<'a> {
    fn end(&self) -> usize {
        self.start + self.line.text.len()
    }

    /// Element spans in line-text byte offsets, located by sequential search.
    fn element_spans(&self) -> Vec<(usize, usize, &'a TextElement)> {
        let line: &'a TextLine = self.line;
        let mut spans = Vec::with_capacity(line.elements.len());
        let mut cursor = 0;
        for element in &line.elements {
            if element.text.is_empty() {
                continue;
            }
            if let Some(found) = line.text[cursor..].find(&element.text) {
                let start = cursor + found;
                let end = start + element.text.len();
                spans.push((start, end, element));
                cursor = end;
            }
        }
        spans
    }
}

/// A visual row of one or more lines.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub segments: Vec<RowSegment<'a>>,
    /// Line texts joined left-to-right with single spaces.
    pub text: String,
    /// Relative vertical position in the document, 0.0 (top) to 1.0 (bottom).
    pub position: f32,
}

impl<'a> Row<'a> {
    fn from_lines(mut members: Vec<(usize, &'a TextLine)>) -> Self {
        members.sort_by(|a, b| {
            let ax = a.1.bbox.map(|b| b.x).unwrap_or(0.0);
            let bx = b.1.bbox.map(|b| b.x).unwrap_or(0.0);
            ax.partial_cmp(&bx).unwrap_or(Ordering::Equal)
        });

        let mut text = String::new();
        let mut segments = Vec::with_capacity(members.len());
        for (line_index, line) in members {
            if !text.is_empty() {
                text.push(' ');
            }
            segments.push(RowSegment {
                line_index,
                line,
                start: text.len(),
            });
            text.push_str(&line.text);
        }

        Self {
            segments,
            text,
            position: 0.0,
        }
    }

    /// Smallest input index among the row's lines.
    pub fn first_line(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.line_index)
            .min()
            .unwrap_or_default()
    }

    /// Mean recognition confidence of the row's lines.
    pub fn confidence(&self) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.segments.iter().map(|s| s.line.confidence).sum();
        sum / self.segments.len() as f32
    }

    /// Union of the line boxes, if any line has one.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.segments
            .iter()
            .filter_map(|s| s.line.bbox)
            .reduce(|a, b| a.union(&b))
    }

    /// Whether every line in the row carries a box.
    pub fn has_geometry(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.line.bbox.is_some())
    }

    /// Whether any line in the row carries word-level elements.
    pub fn has_elements(&self) -> bool {
        self.segments.iter().any(|s| !s.line.elements.is_empty())
    }

    /// Number of word elements (or lines, when elements are missing).
    pub fn element_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.line.elements.len().max(1))
            .sum()
    }

    fn segment_at(&self, offset: usize) -> Option<&RowSegment<'a>> {
        self.segments
            .iter()
            .find(|s| offset >= s.start && offset < s.end())
    }

    /// The word element covering a row-text byte offset.
    pub fn element_at(&self, offset: usize) -> Option<&'a TextElement> {
        let segment = self.segment_at(offset)?;
        let local = offset - segment.start;
        segment
            .element_spans()
            .into_iter()
            .find(|(start, end, _)| local >= *start && local < *end)
            .map(|(_, _, element)| element)
    }

    /// Estimated X coordinate of a row-text byte offset.
    ///
    /// Uses the covering word box when available, otherwise interpolates the
    /// character position across the line box.
    pub fn x_at(&self, offset: usize) -> Option<f32> {
        let segment = self.segment_at(offset)?;
        let local = offset - segment.start;

        for (start, end, element) in segment.element_spans() {
            if local >= start && local < end {
                let fraction = (local - start) as f32 / (end - start).max(1) as f32;
                return Some(element.bbox.x + fraction * element.bbox.width);
            }
        }

        let bbox = segment.line.bbox?;
        let chars = segment.line.text.chars().count().max(1);
        let before = segment.line.text[..local].chars().count();
        Some(bbox.x + bbox.width * before as f32 / chars as f32)
    }
}

/// Group lines into rows, top-down.
///
/// When every line has a box, lines whose vertical centres lie within
/// `tolerance` of a row's first line join that row. Otherwise each line is
/// its own row, in input order.
pub fn group_rows(lines: &[TextLine], tolerance: f32) -> Vec<Row<'_>> {
    let geometric = !lines.is_empty() && lines.iter().all(|l| l.bbox.is_some());

    let mut rows = if geometric {
        let mut ordered: Vec<(usize, &TextLine, f32)> = lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.bbox.map(|b| (i, l, b.center_y())))
            .collect();
        ordered.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));

        let mut groups: Vec<(f32, Vec<(usize, &TextLine)>)> = Vec::new();
        for (index, line, center) in ordered {
            let joins = groups
                .last()
                .is_some_and(|(anchor, _)| (center - anchor).abs() <= tolerance);
            if let (true, Some((_, members))) = (joins, groups.last_mut()) {
                members.push((index, line));
            } else {
                groups.push((center, vec![(index, line)]));
            }
        }

        let (top, bottom) = match (groups.first(), groups.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => (0.0, 0.0),
        };
        let span = bottom - top;

        groups
            .into_iter()
            .enumerate()
            .map(|(ordinal, (anchor, members))| {
                let mut row = Row::from_lines(members);
                row.position = if span > f32::EPSILON {
                    (anchor - top) / span
                } else {
                    ordinal_position(ordinal, 1)
                };
                row
            })
            .collect::<Vec<_>>()
    } else {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| Row::from_lines(vec![(i, l)]))
            .collect()
    };

    if !geometric {
        let count = rows.len();
        for (ordinal, row) in rows.iter_mut().enumerate() {
            row.position = ordinal_position(ordinal, count);
        }
    }

    rows
}

fn ordinal_position(ordinal: usize, count: usize) -> f32 {
    if count <= 1 {
        0.5
    } else {
        ordinal as f32 / (count - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(text: &str, x: f32, y: f32, w: f32) -> TextLine {
        TextLine::plain(text).with_bbox(BoundingBox::new(x, y, w, 12.0))
    }

    #[test]
    fn test_groups_same_row_left_to_right() {
        let lines = vec![
            boxed("€15.60", 250.0, 101.0, 50.0),
            boxed("Subtotal", 50.0, 60.0, 80.0),
            boxed("TOTAL:", 50.0, 100.0, 60.0),
        ];
        let rows = group_rows(&lines, 10.0);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "Subtotal");
        assert_eq!(rows[1].text, "TOTAL: €15.60");
        assert_eq!(rows[1].first_line(), 0);
        assert_eq!(rows[0].position, 0.0);
        assert_eq!(rows[1].position, 1.0);
    }

    #[test]
    fn test_plain_lines_keep_input_order() {
        let lines = vec![
            TextLine::plain("a"),
            TextLine::plain("b"),
            TextLine::plain("c"),
        ];
        let rows = group_rows(&lines, 10.0);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].text, "c");
        assert_eq!(rows[1].position, 0.5);
        assert!(!rows[0].has_geometry());
    }

    #[test]
    fn test_x_at_uses_elements_then_interpolates() {
        let line = TextLine::plain("VAT 24% 3.02")
            .with_bbox(BoundingBox::new(0.0, 0.0, 120.0, 10.0))
            .with_elements(vec![
                TextElement::new("VAT", BoundingBox::new(0.0, 0.0, 30.0, 10.0), 0.9),
                TextElement::new("24%", BoundingBox::new(40.0, 0.0, 30.0, 10.0), 0.9),
                TextElement::new("3.02", BoundingBox::new(90.0, 0.0, 30.0, 10.0), 0.9),
            ]);
        let lines = vec![line];
        let rows = group_rows(&lines, 10.0);
        let row = &rows[0];

        assert_eq!(row.x_at(8), Some(90.0));
        assert_eq!(row.element_at(4).map(|e| e.text.as_str()), Some("24%"));

        let bare = vec![boxed("abcd", 100.0, 0.0, 40.0)];
        let rows = group_rows(&bare, 10.0);
        assert_eq!(rows[0].x_at(2), Some(120.0));
    }
}
