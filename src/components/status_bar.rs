use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " /:filter  space:toggle  enter:select  q:quit ";

/// Status bar widget: match summary, current selection and key hints, or a
/// transient status message.
pub struct StatusBarWidget<'a> {
    summary: &'a str,
    selection: Option<&'a str>,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(summary: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            summary,
            selection: None,
            theme,
            status_message: None,
            is_error: false,
        }
    }

    pub fn selection(mut self, selection: &'a str) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

/// Keep at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };
            let display = format!("{:<width$}", truncate(msg, width), width = width);
            buf.set_line(area.x, area.y, &Line::from(Span::styled(display, style)), area.width);
            return;
        }

        let base = Style::default()
            .bg(self.theme.status_bg)
            .fg(self.theme.status_fg);
        // Hints give way on narrow terminals.
        let hints_len = KEY_HINTS.chars().count();
        let show_hints = width >= hints_len + 10;
        let remaining = if show_hints { width - hints_len } else { width };

        let summary = truncate(self.summary, remaining);
        let summary_len = summary.chars().count();
        let selection = self
            .selection
            .map(|s| truncate(s, remaining.saturating_sub(summary_len + 1)))
            .unwrap_or_default();
        let selection_len = selection.chars().count();

        let mut spans = vec![Span::styled(summary, base.add_modifier(Modifier::BOLD))];
        if selection_len > 0 {
            spans.push(Span::styled(" ", base));
            spans.push(Span::styled(selection, base.fg(self.theme.accent_fg)));
        }

        let used = summary_len + if selection_len > 0 { selection_len + 1 } else { 0 };
        let pad = remaining.saturating_sub(used);
        if pad > 0 {
            spans.push(Span::styled(" ".repeat(pad), base));
        }
        if show_hints {
            spans.push(Span::styled(KEY_HINTS, base.fg(self.theme.dim_fg)));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
