use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use json_tree::dom::layout::{Layout, LayoutRow};
use json_tree::dom::{Document, ElementId, MARKUP_TAG};
use json_tree::tree::controller::{
    row_part, CLOSED_CLASS, ICON_CLASS, LABEL_CLASS, LOAD_MORE_CLASS, OPEN_CLASS, ROW_CLASS,
    TOGGLE_CLASS,
};

use crate::theme::ThemeColors;

/// Width of one indentation level in the guide prefix.
pub const INDENT_WIDTH: u16 = 3;

/// What a laid-out line shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind<'a> {
    Node {
        name: &'a str,
        label: ElementId,
        /// Present only for nodes with visible children.
        toggle: Option<ElementId>,
        open: bool,
        icon: bool,
    },
    LoadMore {
        element: ElementId,
        text: &'a str,
    },
    Text(&'a str),
}

/// Read a layout row back into something drawable.
pub fn classify<'a>(doc: &'a Document, row: &LayoutRow) -> RowKind<'a> {
    let el = row.element;
    if doc.has_class(el, ROW_CLASS) {
        let label = row_part(doc, el, LABEL_CLASS);
        let toggle = row_part(doc, el, TOGGLE_CLASS).filter(|t| {
            doc.has_class(*t, OPEN_CLASS) || doc.has_class(*t, CLOSED_CLASS)
        });
        if let Some(label) = label {
            return RowKind::Node {
                name: doc.text(label).unwrap_or_default(),
                label,
                toggle,
                open: toggle.is_some_and(|t| doc.has_class(t, OPEN_CLASS)),
                icon: row_part(doc, el, ICON_CLASS).is_some(),
            };
        }
    }
    if doc.has_class(el, LOAD_MORE_CLASS) {
        return RowKind::LoadMore {
            element: el,
            text: doc.text(el).unwrap_or_default(),
        };
    }
    let text = doc.text(el).unwrap_or_default();
    match doc.get(el).map(|e| e.tag()) {
        Some(MARKUP_TAG) => RowKind::Text(text.lines().nth(row.line).unwrap_or_default()),
        _ => RowKind::Text(text),
    }
}

/// Tree widget that draws the rendered document with box-drawing guides.
pub struct TreeViewWidget<'a> {
    doc: &'a Document,
    layout: &'a Layout,
    theme: &'a ThemeColors,
    cursor: usize,
    scroll: usize,
    selected: Option<ElementId>,
    block: Option<Block<'a>>,
}

impl<'a> TreeViewWidget<'a> {
    pub fn new(doc: &'a Document, layout: &'a Layout, theme: &'a ThemeColors) -> Self {
        Self {
            doc,
            layout,
            theme,
            cursor: 0,
            scroll: 0,
            selected: None,
            block: None,
        }
    }

    pub fn cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Label element of the selected node.
    pub fn selected(mut self, selected: Option<ElementId>) -> Self {
        self.selected = selected;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Build the guide prefix for a row from the `is_last` flags of its
    /// ancestors, found by walking back to the nearest shallower rows.
    pub fn build_prefix(rows: &[LayoutRow], index: usize) -> String {
        let row = &rows[index];
        if row.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..row.depth {
            let ancestor_is_last = rows[..index]
                .iter()
                .rev()
                .take_while(|r| r.depth >= d)
                .find(|r| r.depth == d && r.line == 0)
                .is_some_and(|r| r.is_last);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if row.is_last { "└──" } else { "├──" });
        prefix
    }

    fn toggle_glyph(toggle: Option<ElementId>, open: bool) -> &'static str {
        match (toggle, open) {
            (None, _) => "  ",
            (Some(_), true) => "▾ ",
            (Some(_), false) => "▸ ",
        }
    }
}

impl<'a> Widget for TreeViewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let rows = self.layout.rows();
        let visible_height = inner_area.height as usize;
        if rows.is_empty() || visible_height == 0 {
            return;
        }

        for (i, (idx, row)) in rows
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible_height)
            .enumerate()
        {
            let y = inner_area.y + i as u16;
            let is_cursor = idx == self.cursor;
            let base = if is_cursor {
                Style::default()
                    .bg(self.theme.tree_cursor_bg)
                    .fg(self.theme.tree_fg)
            } else {
                Style::default().bg(self.theme.tree_bg).fg(self.theme.tree_fg)
            };

            let mut spans = vec![Span::styled(
                Self::build_prefix(rows, idx),
                base.fg(self.theme.tree_guide_fg),
            )];
            match classify(self.doc, row) {
                RowKind::Node {
                    name,
                    label,
                    toggle,
                    open,
                    icon,
                } => {
                    spans.push(Span::styled(
                        Self::toggle_glyph(toggle, open),
                        base.fg(self.theme.tree_branch_fg),
                    ));
                    if icon {
                        spans.push(Span::styled("• ", base.fg(self.theme.dim_fg)));
                    }
                    let style = if self.selected == Some(label) {
                        base.fg(self.theme.tree_selected_fg)
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                    } else if toggle.is_some() {
                        base.fg(self.theme.tree_branch_fg)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        base
                    };
                    spans.push(Span::styled(name.to_string(), style));
                }
                RowKind::LoadMore { text, .. } => {
                    spans.push(Span::styled(
                        format!("⋯ {text}"),
                        base.fg(self.theme.load_more_fg)
                            .add_modifier(Modifier::ITALIC),
                    ));
                }
                RowKind::Text(text) => {
                    spans.push(Span::styled(text.to_string(), base.fg(self.theme.dim_fg)));
                }
            }

            if is_cursor {
                let used: usize = spans.iter().map(|s| s.width()).sum();
                let pad = (inner_area.width as usize).saturating_sub(used);
                spans.push(Span::styled(" ".repeat(pad), base));
            }
            buf.set_line(inner_area.x, y, &Line::from(spans), inner_area.width);
        }
    }
}
