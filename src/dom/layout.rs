//! Line layout of a [`Document`] for row-based surfaces.
//!
//! Block elements (`div`) own lines: the inline children and text of a block
//! form one line, block children follow on their own lines. A `margin-left`
//! style indents the block's children by one level, `display: none` removes a
//! subtree from layout.

use std::collections::HashMap;

use super::{Document, ElementId, MARKUP_TAG};

/// Half-open range of layout rows covered by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub top: usize,
    pub bottom: usize,
}

impl RowSpan {
    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }
}

/// The visible window of a surface, in layout rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(top: usize, height: usize) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    /// Fraction of `span` inside the viewport, in `[0, 1]`.
    pub fn intersection_ratio(&self, span: RowSpan) -> f64 {
        let height = span.height();
        if height == 0 || self.height == 0 {
            return 0.0;
        }
        let overlap = span
            .bottom
            .min(self.bottom())
            .saturating_sub(span.top.max(self.top));
        overlap as f64 / height as f64
    }

    /// Whether `span` lies entirely inside the viewport.
    pub fn contains(&self, span: RowSpan) -> bool {
        span.height() > 0 && span.top >= self.top && span.bottom <= self.bottom()
    }

    /// Top offset that brings `span` into view, aligning it to the bottom
    /// edge when it lies below.
    pub fn scroll_to(&self, span: RowSpan) -> usize {
        if span.top < self.top {
            span.top
        } else if span.bottom > self.bottom() {
            span.bottom.saturating_sub(self.height)
        } else {
            self.top
        }
    }
}

/// A single laid-out line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRow {
    /// The block element that owns the line.
    pub element: ElementId,
    /// Indentation level.
    pub depth: usize,
    /// Last displayed block among its siblings.
    pub is_last: bool,
    /// Line index within the owning element (multi-line markup).
    pub line: usize,
}

/// Rows and bounding spans of every displayed element under a root.
#[derive(Debug, Default)]
pub struct Layout {
    rows: Vec<LayoutRow>,
    spans: HashMap<ElementId, RowSpan>,
}

impl Layout {
    pub fn compute(doc: &Document, root: ElementId) -> Self {
        let mut layout = Self::default();
        if doc.is_displayed(root) {
            layout.block(doc, root, 0, true);
        }
        layout
    }

    fn block(&mut self, doc: &Document, el: ElementId, depth: usize, is_last: bool) {
        let Some(element) = doc.get(el) else {
            return;
        };
        if element.is_hidden() {
            return;
        }
        let top = self.rows.len();

        if element.tag() == MARKUP_TAG {
            let text = element.text().unwrap_or_default();
            for (line, _) in text.lines().enumerate() {
                self.rows.push(LayoutRow {
                    element: el,
                    depth,
                    is_last,
                    line,
                });
            }
        } else {
            let inline: Vec<ElementId> = element
                .children()
                .iter()
                .copied()
                .filter(|c| doc.get(*c).is_some_and(|e| !e.is_block() && !e.is_hidden()))
                .collect();
            if element.text().is_some() || !inline.is_empty() {
                let row = self.rows.len();
                self.rows.push(LayoutRow {
                    element: el,
                    depth,
                    is_last,
                    line: 0,
                });
                for child in inline {
                    self.spans.insert(
                        child,
                        RowSpan {
                            top: row,
                            bottom: row + 1,
                        },
                    );
                }
            }

            let child_depth = if element.style("margin-left").is_some() {
                depth + 1
            } else {
                depth
            };
            let blocks: Vec<ElementId> = element
                .children()
                .iter()
                .copied()
                .filter(|c| doc.get(*c).is_some_and(|e| e.is_block() && !e.is_hidden()))
                .collect();
            let count = blocks.len();
            for (i, child) in blocks.into_iter().enumerate() {
                self.block(doc, child, child_depth, i + 1 == count);
            }
        }

        let bottom = self.rows.len();
        if bottom > top {
            self.spans.insert(el, RowSpan { top, bottom });
        }
    }

    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&LayoutRow> {
        self.rows.get(index)
    }

    /// Bounding span, or `None` when the element takes no rows.
    pub fn span(&self, el: ElementId) -> Option<RowSpan> {
        self.spans.get(&el).copied()
    }
}
