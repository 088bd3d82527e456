use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use json_tree::config::AppConfig;
use json_tree::dom::layout::{Layout, Viewport};
use json_tree::dom::{Document, ElementId};
use json_tree::error::Result;
use json_tree::tree::{fuzzy_predicate, Node, Tree, TreeCallbacks};

use crate::components::tree_view::{classify, RowKind, INDENT_WIDTH};
use crate::theme::{resolve_theme, ThemeColors};

/// DOM id of the element the tree renders into.
pub const TREE_TARGET: &str = "tree";

/// How long a status message stays on screen.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// The node last picked by the user, as reported by the select callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: String,
    pub name: String,
}

/// Text input state of the filter bar.
#[derive(Debug, Default)]
pub struct FilterInput {
    pub text: String,
    pub cursor_position: usize,
    pub focused: bool,
    /// Set on every edit; the filter runs once the debounce has elapsed.
    pub pending_since: Option<Instant>,
}

impl FilterInput {
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char(&mut self) {
        if let Some(prev) = self.text[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
            self.text.remove(self.cursor_position);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.text[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.text[self.cursor_position..].chars().next() {
            self.cursor_position += next.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn end(&mut self) {
        self.cursor_position = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_position = 0;
    }
}

/// What a toggle key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMode {
    Flip,
    Open,
    Close,
}

/// Main application state.
pub struct App {
    pub tree: Tree,
    pub theme: ThemeColors,
    pub title: String,
    pub filter: FilterInput,
    pub debounce: Duration,
    /// Cursor row in the current layout.
    pub cursor: usize,
    /// First visible layout row.
    pub scroll: usize,
    pub viewport_height: usize,
    /// Inner area of the tree panel from the last draw, for mouse hits.
    pub tree_area: Rect,
    pub selection: Rc<RefCell<Option<Selection>>>,
    pub status_message: Option<(String, bool, Instant)>,
    pub should_quit: bool,
}

impl App {
    /// Build the tree for `root` from the merged configuration.
    pub fn new(root: Node, config: &AppConfig, title: impl Into<String>) -> Result<Self> {
        let mut doc = Document::new();
        let target = doc.create_element("div");
        doc.set_id(target, TREE_TARGET);
        doc.append_child(doc.body(), target);

        let selection: Rc<RefCell<Option<Selection>>> = Rc::default();
        let sink = Rc::clone(&selection);
        let mut callbacks = TreeCallbacks::default().with_on_node_select(move |_, node, _, _| {
            info!(node = %node.id, name = node.display_name(), "node selected");
            *sink.borrow_mut() = Some(Selection {
                id: node.id.to_string(),
                name: node.display_name().to_string(),
            });
        });
        if config.fuzzy_filter() {
            callbacks = callbacks.with_filter(fuzzy_predicate());
        }

        let tree = Tree::new(root, doc, config.tree_options(TREE_TARGET), callbacks)?;
        let mut status_message = None;
        if let Some(id) = tree.selected_node_id() {
            match tree.node(id) {
                Some(node) => {
                    *selection.borrow_mut() = Some(Selection {
                        id: node.id.to_string(),
                        name: node.display_name().to_string(),
                    });
                }
                None => {
                    warn!(node = %id, "selected node not in tree");
                    status_message = Some((format!("No node with id {id}"), true, Instant::now()));
                }
            }
        }

        Ok(Self {
            tree,
            theme: resolve_theme(&config.theme),
            title: title.into(),
            filter: FilterInput::default(),
            debounce: Duration::from_millis(config.debounce_ms()),
            cursor: 0,
            scroll: 0,
            viewport_height: 0,
            tree_area: Rect::default(),
            selection,
            status_message,
            should_quit: false,
        })
    }

    // ── Layout helpers ──────────────────────────────────────────────────

    pub fn layout(&self) -> Layout {
        self.tree.layout()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.scroll, self.viewport_height)
    }

    /// Summary line for the status bar.
    pub fn summary(&self) -> String {
        let matches = self.tree.total_matches();
        let term = self.tree.search_string();
        if term.is_empty() {
            format!(" {matches} nodes")
        } else {
            format!(" {matches} matches for \"{term}\"")
        }
    }

    // ── Cursor movement ─────────────────────────────────────────────────

    fn row_count(&self) -> usize {
        self.layout().len()
    }

    /// Move cursor down by one row.
    pub fn select_next(&mut self) {
        let len = self.row_count();
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    /// Move cursor up by one row.
    pub fn select_previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.cursor = 0;
    }

    pub fn select_last(&mut self) {
        self.cursor = self.row_count().saturating_sub(1);
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        let step = self.viewport_height.max(1);
        self.cursor = (self.cursor + step).min(len.saturating_sub(1));
    }

    pub fn page_up(&mut self) {
        let step = self.viewport_height.max(1);
        self.cursor = self.cursor.saturating_sub(step);
    }

    /// Scroll the view without moving past either end; the cursor follows.
    pub fn scroll_by(&mut self, delta: isize) {
        let len = self.row_count();
        let max_scroll = len.saturating_sub(self.viewport_height);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max_scroll);
        let bottom = self.scroll + self.viewport_height.max(1);
        self.cursor = self.cursor.clamp(self.scroll, bottom.saturating_sub(1));
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Keep the cursor visible and inside the layout.
    pub fn update_scroll(&mut self, visible_height: usize) {
        self.viewport_height = visible_height;
        let len = self.row_count();
        self.cursor = self.cursor.min(len.saturating_sub(1));
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if visible_height > 0 && self.cursor >= self.scroll + visible_height {
            self.scroll = self.cursor + 1 - visible_height;
        }
        self.scroll = self.scroll.min(len.saturating_sub(visible_height.max(1)));
    }

    // ── Row actions ─────────────────────────────────────────────────────

    /// Expand or collapse the node under the cursor.
    pub fn toggle_at_cursor(&mut self, mode: ToggleMode) {
        let layout = self.layout();
        let Some(row) = layout.row(self.cursor) else {
            return;
        };
        let toggle = match classify(self.tree.document(), row) {
            RowKind::Node {
                toggle: Some(toggle),
                open,
                ..
            } => match mode {
                ToggleMode::Flip => Some(toggle),
                ToggleMode::Open => (!open).then_some(toggle),
                ToggleMode::Close => open.then_some(toggle),
            },
            _ => None,
        };
        if let Some(toggle) = toggle {
            self.tree.click(toggle);
        }
    }

    /// Select the node under the cursor, or load more on a "load more" row.
    pub fn activate_at_cursor(&mut self) {
        let layout = self.layout();
        let Some(row) = layout.row(self.cursor) else {
            return;
        };
        let (el, is_label) = match classify(self.tree.document(), row) {
            RowKind::Node { label, .. } => (label, true),
            RowKind::LoadMore { element, .. } => (element, false),
            RowKind::Text(_) => return,
        };
        self.tree.click(el);
        if !is_label {
            return;
        }
        let message = self
            .selection
            .borrow()
            .as_ref()
            .map(|s| format!("Selected {} ({})", s.name, s.id));
        if let Some(message) = message {
            self.set_status_message(message, false);
        }
    }

    /// Handle a left click at terminal coordinates.
    pub fn click_at(&mut self, column: u16, row: u16) {
        let area = self.tree_area;
        if row < area.y || row >= area.y + area.height || column < area.x {
            return;
        }
        let index = self.scroll + (row - area.y) as usize;
        let layout = self.layout();
        let Some(layout_row) = layout.row(index) else {
            return;
        };
        self.cursor = index;

        // The toggle glyph sits right after the guide prefix.
        let toggle_x = area.x + INDENT_WIDTH * layout_row.depth as u16;
        if (toggle_x..toggle_x + 2).contains(&column) {
            self.toggle_at_cursor(ToggleMode::Flip);
        } else {
            self.activate_at_cursor();
        }
    }

    // ── Filter ──────────────────────────────────────────────────────────

    pub fn focus_filter(&mut self) {
        self.filter.focused = true;
        self.filter.end();
    }

    /// Leave the filter input, applying any pending edit right away.
    pub fn unfocus_filter(&mut self) {
        self.filter.focused = false;
        if self.filter.is_pending() {
            self.apply_filter();
        }
    }

    /// Record an edit; the filter runs after the debounce interval.
    pub fn filter_edited(&mut self) {
        self.filter.pending_since = Some(Instant::now());
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.apply_filter();
    }

    pub fn apply_filter(&mut self) {
        self.filter.pending_since = None;
        if self.tree.set_search_string(&self.filter.text) {
            self.cursor = 0;
            self.scroll = 0;
        }
    }

    // ── Timers ──────────────────────────────────────────────────────────

    /// Drive the debounce, the tree's timers and status expiry.
    pub fn tick(&mut self, now: Instant) {
        if let Some(since) = self.filter.pending_since {
            if now.duration_since(since) >= self.debounce {
                self.apply_filter();
            }
        }
        if let Some(el) = self.tree.tick(now, self.viewport()) {
            self.reveal(el);
        }
        self.clear_expired_status(now);
    }

    /// Feed the current viewport to the tree after a draw.
    pub fn sync_viewport(&mut self) {
        let loaded = self.tree.on_viewport_change(self.viewport());
        if loaded > 0 {
            debug!(loaded, "load more rows activated by scrolling");
        }
    }

    /// Move the cursor to `el` and scroll it into view.
    pub fn reveal(&mut self, el: ElementId) {
        let layout = self.layout();
        if let Some(span) = layout.span(el) {
            self.cursor = span.top;
            self.scroll = self.viewport().scroll_to(span);
        }
    }

    // ── Status ──────────────────────────────────────────────────────────

    pub fn set_status_message(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some((msg.into(), is_error, Instant::now()));
    }

    pub fn clear_expired_status(&mut self, now: Instant) {
        if let Some((_, _, created)) = &self.status_message {
            if now.duration_since(*created) > STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    /// One-line description of the current selection.
    pub fn selection_label(&self) -> Option<String> {
        self.selection
            .borrow()
            .as_ref()
            .map(|s| format!("● {} ({})", s.name, s.id))
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn dispose(&mut self) {
        self.tree.dispose();
    }
}
