use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::FilterInput;
use crate::theme::ThemeColors;

/// The filter input line.
pub struct FilterBarWidget<'a> {
    input: &'a FilterInput,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> FilterBarWidget<'a> {
    pub fn new(input: &'a FilterInput, theme: &'a ThemeColors) -> Self {
        Self {
            input,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl<'a> Widget for FilterBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let prompt_style = Style::default()
            .fg(self.theme.accent_fg)
            .add_modifier(Modifier::BOLD);
        let input_style = Style::default()
            .bg(self.theme.filter_bg)
            .fg(self.theme.filter_fg);
        let mut spans = vec![Span::styled("/ ", prompt_style)];

        let text = self.input.text.as_str();
        if self.input.focused {
            let pos = self.input.cursor_position.min(text.len());
            let (before, rest) = text.split_at(pos);
            let mut rest_chars = rest.chars();
            let cursor_char = rest_chars
                .next()
                .map(|c| c.to_string())
                .unwrap_or_else(|| " ".to_string());
            let cursor_style = Style::default()
                .bg(self.theme.filter_fg)
                .fg(self.theme.status_bg)
                .add_modifier(Modifier::BOLD);
            spans.push(Span::styled(before.to_string(), input_style));
            spans.push(Span::styled(cursor_char, cursor_style));
            spans.push(Span::styled(rest_chars.as_str().to_string(), input_style));
        } else if text.is_empty() {
            spans.push(Span::styled(
                "press / to filter",
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::ITALIC),
            ));
        } else {
            spans.push(Span::styled(text.to_string(), input_style));
        }

        if self.input.is_pending() {
            spans.push(Span::styled(" …", Style::default().fg(self.theme.dim_fg)));
        }

        buf.set_line(inner.x, inner.y, &Line::from(spans), inner.width);
    }
}
