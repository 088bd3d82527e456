//! The tree controller.
//!
//! [`Tree`] owns the data, the filter state and the rendered [`Document`]
//! subtree under the render target. Every search change re-runs the filter
//! and rebuilds the view; large result sets are materialized in chunks
//! behind "load more" rows that a [`ViewportObserver`] activates as they
//! scroll into view.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::dom::layout::{Layout, Viewport};
use crate::dom::{Action, Document, ElementId};
use crate::error::{AppError, Result};

use super::filter::{default_predicate, filter, FilterResult};
use super::node::{Node, NodeId};
use super::observer::{observer_for, ObserverStrategy, ViewportSnapshot, ViewportObserver};
use super::paging::PagingPolicy;

pub const ROW_CLASS: &str = "treeNode";
pub const TOGGLE_CLASS: &str = "treeToggle";
pub const OPEN_CLASS: &str = "tree_open_icon";
pub const CLOSED_CLASS: &str = "tree_close_icon";
pub const ICON_CLASS: &str = "objectImgIcon";
pub const LABEL_CLASS: &str = "treeLabel";
pub const CHILDREN_CLASS: &str = "childrenDIV";
pub const LOAD_MORE_CLASS: &str = "loadMore";
pub const LOAD_MORE_TEXT: &str = "Load more";
pub const DEFAULT_SELECTED_CLASS: &str = "selected";
pub const DEFAULT_RENDER_TARGET: &str = "tree";
pub const DEFAULT_NODE_ICON: &str = "node";
/// Delay between a search change and scrolling the selected node into view.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(1000);

/// DOM id of a node's label.
pub fn label_dom_id(id: &NodeId) -> String {
    format!("nodeID{id}")
}

/// DOM id of a node's children container.
pub fn children_dom_id(id: &NodeId) -> String {
    format!("subContainer_nodeID{id}")
}

/// The direct child of a node row carrying `class` (toggle, icon, label or
/// children container).
pub fn row_part(doc: &Document, row: ElementId, class: &str) -> Option<ElementId> {
    doc.children(row)
        .iter()
        .copied()
        .find(|c| doc.has_class(*c, class))
}

/// Content shown in the render target when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchPlaceholder {
    /// Literal markup.
    Markup(String),
    /// DOM id of a live element, serialized once at construction.
    Element(String),
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// DOM id of the element the tree renders into.
    pub render_target: String,
    pub include_root: bool,
    /// Icon suffix; empty disables the icon element.
    pub node_icon: String,
    pub selected_node_id: Option<NodeId>,
    /// Class marking the selected label; `None` adds no class.
    pub selected_node_class: Option<String>,
    pub selected_node_style: BTreeMap<String, String>,
    pub no_match: Option<NoMatchPlaceholder>,
    pub paging: PagingPolicy,
    pub observer: ObserverStrategy,
    pub poll_interval: Duration,
    pub reveal_delay: Duration,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            render_target: DEFAULT_RENDER_TARGET.to_string(),
            include_root: true,
            node_icon: DEFAULT_NODE_ICON.to_string(),
            selected_node_id: None,
            selected_node_class: Some(DEFAULT_SELECTED_CLASS.to_string()),
            selected_node_style: BTreeMap::new(),
            no_match: None,
            paging: PagingPolicy::default(),
            observer: ObserverStrategy::Auto,
            poll_interval: super::observer::DEFAULT_POLL_INTERVAL,
            reveal_delay: DEFAULT_REVEAL_DELAY,
        }
    }
}

/// The event handed to the selection callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: ElementId,
}

pub type Predicate = Box<dyn Fn(&Node, &str) -> bool>;
pub type RenderNodeTemplate = Box<dyn FnMut(&mut Document, ElementId, &Node)>;
/// Receives the event, the node, its label and the previously selected label.
pub type OnNodeSelect = Box<dyn FnMut(&ClickEvent, &Node, ElementId, Option<ElementId>)>;

/// Caller hooks. All optional.
#[derive(Default)]
pub struct TreeCallbacks {
    pub filter: Option<Predicate>,
    pub render_node_template: Option<RenderNodeTemplate>,
    pub on_node_select: Option<OnNodeSelect>,
}

impl TreeCallbacks {
    pub fn with_filter(mut self, f: impl Fn(&Node, &str) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    pub fn with_render_node_template(
        mut self,
        f: impl FnMut(&mut Document, ElementId, &Node) + 'static,
    ) -> Self {
        self.render_node_template = Some(Box::new(f));
        self
    }

    pub fn with_on_node_select(
        mut self,
        f: impl FnMut(&ClickEvent, &Node, ElementId, Option<ElementId>) + 'static,
    ) -> Self {
        self.on_node_select = Some(Box::new(f));
        self
    }
}

pub struct Tree {
    root: Node,
    doc: Document,
    target: ElementId,
    options: TreeOptions,
    callbacks: TreeCallbacks,
    search_string: Option<String>,
    result: FilterResult,
    selected_node_id: Option<NodeId>,
    selected_element: Option<ElementId>,
    observer: Box<dyn ViewportObserver>,
    no_match_markup: Option<String>,
    pending_reveal: Option<Instant>,
}

impl Tree {
    /// Build a tree rendering into `options.render_target` and run the
    /// initial empty search.
    pub fn new(
        root: Node,
        doc: Document,
        options: TreeOptions,
        callbacks: TreeCallbacks,
    ) -> Result<Self> {
        let target = doc
            .get_element_by_id(&options.render_target)
            .ok_or_else(|| AppError::MissingRenderTarget(options.render_target.clone()))?;

        let no_match_markup = match &options.no_match {
            Some(NoMatchPlaceholder::Markup(markup)) => Some(markup.clone()),
            Some(NoMatchPlaceholder::Element(dom_id)) => match doc.get_element_by_id(dom_id) {
                Some(el) => Some(doc.outer_html(el)),
                None => {
                    warn!(dom_id = %dom_id, "no-match element not found");
                    None
                }
            },
            None => None,
        };

        let observer = observer_for(
            options.observer,
            doc.supports_intersection(),
            options.poll_interval,
        );
        debug!(
            strategy = observer.strategy().label(),
            nodes = root.count(),
            "tree created"
        );

        let mut tree = Self {
            root,
            doc,
            target,
            selected_node_id: options.selected_node_id.clone(),
            options,
            callbacks,
            search_string: None,
            result: FilterResult::default(),
            selected_element: None,
            observer,
            no_match_markup,
            pending_reveal: None,
        };
        tree.set_search_string("");
        Ok(tree)
    }

    // ── Search ──────────────────────────────────────────────────────────

    /// Re-filter and re-render. Returns `false` when `term` equals the
    /// current search string and nothing was done.
    pub fn set_search_string(&mut self, term: &str) -> bool {
        if self.search_string.as_deref() == Some(term) {
            return false;
        }
        self.search_string = Some(term.to_string());

        let started = Instant::now();
        let predicate = self.callbacks.filter.as_ref();
        self.result = filter(&self.root, |node| match predicate {
            Some(p) => p(node, term),
            None => default_predicate(node, term),
        });
        debug!(
            term,
            matches = self.result.total_matches(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "filter pass"
        );

        self.open_selected_chain();
        self.render();
        true
    }

    pub fn search_string(&self) -> &str {
        self.search_string.as_deref().unwrap_or_default()
    }

    /// Force the selected node and its ancestors open and schedule the
    /// reveal.
    fn open_selected_chain(&mut self) {
        let Some(selected) = self.selected_node_id.clone() else {
            return;
        };
        for id in self.result.ancestor_chain(&selected) {
            if let Some(path) = self.result.path_of(&id) {
                if let Some(node) = self.root.at_path_mut(path) {
                    node.close = Some(false);
                }
            }
        }
        self.pending_reveal = Some(Instant::now() + self.options.reveal_delay);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Rebuild the view from the current filter result.
    pub fn render(&mut self) {
        self.observer.disconnect();
        self.doc.clear_children(self.target);
        self.observer.connect(Instant::now());
        self.selected_element = None;
        for state in self.result.states_mut() {
            state.loaded_count = 0;
            state.load_more = None;
            state.children_loaded = false;
        }

        let total = self.result.total_matches();
        match self.result.root().cloned() {
            Some(root) if total > 0 => {
                if self.options.include_root {
                    self.render_node(self.target, &root, 0);
                } else {
                    // Top-level rows stand where the root's children would.
                    let children = self.result.filtered_children(&root).to_vec();
                    for child in &children {
                        self.render_node(self.target, child, 1);
                    }
                    if let Some(state) = self.result.state_mut(&root) {
                        state.loaded_count = children.len();
                        state.children_loaded = !children.is_empty();
                    }
                }
            }
            _ => {
                let markup = self.no_match_markup.clone().unwrap_or_default();
                self.doc.set_inner_html(self.target, &markup);
            }
        }
        debug!(matches = total, elements = self.doc.len(), "render");
    }

    /// Build one node row under `parent`. `depth` counts levels below the
    /// start of the current materialization pass.
    fn render_node(&mut self, parent: ElementId, id: &NodeId, depth: usize) {
        let Some(node) = self.node(id) else {
            return;
        };
        let name = node.display_name().to_string();
        let closed = node.is_closed();
        let parent_id = node.parent_id.as_ref().map(ToString::to_string);
        let has_children = !self.result.filtered_children(id).is_empty();

        let row = self.doc.create_element("div");
        self.doc.add_class(row, ROW_CLASS);
        self.doc.set_style(row, "white-space", "nowrap");
        self.doc.append_child(parent, row);

        let toggle = self.doc.create_element("span");
        self.doc.add_class(toggle, TOGGLE_CLASS);
        if has_children {
            self.doc
                .add_class(toggle, if closed { CLOSED_CLASS } else { OPEN_CLASS });
            self.doc.set_on_click(toggle, Action::Toggle(id.clone()));
        }
        self.doc.append_child(row, toggle);

        if !self.options.node_icon.is_empty() {
            let icon = self.doc.create_element("i");
            self.doc.add_class(icon, ICON_CLASS);
            self.doc
                .add_class(icon, &format!("icon_{}", self.options.node_icon));
            self.doc.append_child(row, icon);
        }

        let label = self.doc.create_element("span");
        self.doc.set_id(label, label_dom_id(id));
        self.doc.add_class(label, LABEL_CLASS);
        self.doc.set_attr(label, "value", &id.to_string());
        if let Some(parent_id) = &parent_id {
            self.doc.set_attr(label, "parentID", parent_id);
        }
        self.doc.set_style(label, "cursor", "pointer");
        self.doc.set_text(label, name);
        self.doc.append_child(row, label);

        if let Some(hook) = self.callbacks.render_node_template.as_mut() {
            if let Some(node) = self.result.path_of(id).and_then(|p| self.root.at_path(p)) {
                hook(&mut self.doc, label, node);
            }
        }
        if self.callbacks.on_node_select.is_some() {
            self.doc.set_on_click(label, Action::Select(id.clone()));
        }
        if self.selected_node_id.as_ref() == Some(id) {
            self.mark_selected(label);
            self.selected_element = Some(label);
        }

        let container = self.doc.create_element("div");
        self.doc.set_id(container, children_dom_id(id));
        self.doc.add_class(container, CHILDREN_CLASS);
        self.doc.set_style(container, "margin-left", "16px");
        self.doc
            .set_style(container, "display", if closed { "none" } else { "block" });
        self.doc.append_child(row, container);

        if has_children {
            self.render_children(id, container, depth + 1);
        }
    }

    /// Materialize the next window of a node's children, or defer them
    /// entirely behind a "load more" row when `depth` is too deep.
    fn render_children(&mut self, id: &NodeId, container: ElementId, depth: usize) {
        let total = self.result.total_matches();
        let paging = self.options.paging;
        let (len, loaded, existing) = match self.result.state(id) {
            Some(s) => (s.filtered_children.len(), s.loaded_count, s.load_more),
            None => return,
        };
        if len == 0 {
            return;
        }

        if paging.defers_at(depth, total) {
            if existing.is_none() {
                self.install_load_more(id, container);
            }
            trace!(node = %id, depth, "children deferred");
            return;
        }

        let window = paging.window(loaded, len, total);
        let chunk = self.result.filtered_children(id)[window.clone()].to_vec();
        for child in &chunk {
            self.render_node(container, child, depth);
        }
        if let Some(state) = self.result.state_mut(id) {
            state.loaded_count = window.end;
            state.children_loaded |= !chunk.is_empty();
        }
        trace!(node = %id, from = window.start, to = window.end, of = len, "children rendered");

        if window.end < len {
            match existing {
                Some(el) => self.doc.append_child(container, el),
                None => {
                    self.install_load_more(id, container);
                }
            }
        } else if let Some(el) = existing {
            self.retire_load_more(id, el);
        }
    }

    fn install_load_more(&mut self, id: &NodeId, container: ElementId) -> ElementId {
        let el = self.doc.create_element("div");
        self.doc.add_class(el, LOAD_MORE_CLASS);
        self.doc.set_text(el, LOAD_MORE_TEXT);
        self.doc.set_on_click(el, Action::LoadMore(id.clone()));
        self.doc.append_child(container, el);
        if let Some(state) = self.result.state_mut(id) {
            state.load_more = Some(el);
        }
        self.observer.observe(el);
        el
    }

    fn retire_load_more(&mut self, id: &NodeId, el: ElementId) {
        self.observer.unobserve(el);
        self.doc.remove(el);
        if let Some(state) = self.result.state_mut(id) {
            state.load_more = None;
        }
    }

    /// Render the next chunk in front of the "load more" row `el`.
    ///
    /// The chunk starts at the number of siblings preceding `el` and is
    /// built off-document, then spliced in one step.
    fn activate_load_more(&mut self, id: &NodeId, el: ElementId) {
        let Some(container) = self.doc.parent(el) else {
            return;
        };
        let len = self.result.filtered_children(id).len();
        let start = self.doc.index_in_parent(el).unwrap_or_default();
        let window = self.options.paging.next_chunk(start, len);
        let chunk = self.result.filtered_children(id)[window.clone()].to_vec();

        let fragment = self.doc.create_fragment();
        for child in &chunk {
            self.render_node(fragment, child, 1);
        }
        if let Some(state) = self.result.state_mut(id) {
            state.loaded_count = window.end;
            state.children_loaded = true;
        }

        if window.end >= len {
            self.retire_load_more(id, el);
        } else {
            self.doc.append_child(fragment, el);
            // Re-register so a row that is still visible fires again.
            self.observer.unobserve(el);
            self.observer.observe(el);
        }
        self.doc.append_fragment(container, fragment);
        debug!(node = %id, from = window.start, to = window.end, of = len, "load more");
    }

    // ── Interaction ─────────────────────────────────────────────────────

    /// Dispatch a click on `el` to its listener, if it has one.
    pub fn click(&mut self, el: ElementId) {
        let Some(action) = self.doc.click(el) else {
            return;
        };
        match action {
            Action::Toggle(id) => self.toggle(&id, el),
            Action::LoadMore(id) => self.activate_load_more(&id, el),
            Action::Select(id) => self.select(&id, el, ClickEvent { target: el }),
        }
    }

    fn toggle(&mut self, id: &NodeId, toggle: ElementId) {
        if let Some(pending) = self.result.state(id).and_then(|s| s.load_more) {
            self.activate_load_more(id, pending);
        }

        let opening = self.doc.has_class(toggle, CLOSED_CLASS);
        // The toggle's own row, not a DOM id lookup: ids may format alike.
        let container = self
            .doc
            .parent(toggle)
            .and_then(|row| row_part(&self.doc, row, CHILDREN_CLASS));
        if opening {
            self.doc.remove_class(toggle, CLOSED_CLASS);
            self.doc.add_class(toggle, OPEN_CLASS);
        } else {
            self.doc.remove_class(toggle, OPEN_CLASS);
            self.doc.add_class(toggle, CLOSED_CLASS);
        }
        if let Some(container) = container {
            self.doc
                .set_style(container, "display", if opening { "block" } else { "none" });
        }
        if let Some(path) = self.result.path_of(id) {
            if let Some(node) = self.root.at_path_mut(path) {
                node.close = Some(!opening);
            }
        }
        trace!(node = %id, open = opening, "toggle");
    }

    fn select(&mut self, id: &NodeId, label: ElementId, event: ClickEvent) {
        if self.callbacks.on_node_select.is_none() {
            return;
        }
        let previous = self.selected_element;
        self.mark_selected(label);
        self.selected_node_id = Some(id.clone());

        if let Some(callback) = self.callbacks.on_node_select.as_mut() {
            if let Some(node) = self.result.path_of(id).and_then(|p| self.root.at_path(p)) {
                callback(&event, node, label, previous);
            }
        }

        self.selected_element = Some(label);
        if let Some(previous) = previous.filter(|p| *p != label) {
            self.unmark_selected(previous);
        }
        debug!(node = %id, "select");
    }

    fn mark_selected(&mut self, el: ElementId) {
        if let Some(class) = &self.options.selected_node_class {
            self.doc.add_class(el, class);
        }
        for (property, value) in &self.options.selected_node_style {
            self.doc.set_style(el, property, value);
        }
    }

    fn unmark_selected(&mut self, el: ElementId) {
        if let Some(class) = &self.options.selected_node_class {
            self.doc.remove_class(el, class);
        }
        for property in self.options.selected_node_style.keys() {
            self.doc.remove_style(el, property);
        }
    }

    // ── Viewport ────────────────────────────────────────────────────────

    /// Report a scroll or layout change. Returns how many "load more" rows
    /// were activated.
    pub fn on_viewport_change(&mut self, viewport: Viewport) -> usize {
        let layout = self.layout();
        let triggered = self.observer.on_viewport_change(&ViewportSnapshot {
            doc: &self.doc,
            layout: &layout,
            root: self.target,
            viewport,
        });
        let count = triggered.len();
        for el in triggered {
            self.click(el);
        }
        count
    }

    /// Drive timers. Returns the selected label once the reveal delay has
    /// elapsed, for the host to scroll into view.
    pub fn tick(&mut self, now: Instant, viewport: Viewport) -> Option<ElementId> {
        let layout = self.layout();
        let triggered = self.observer.on_tick(
            &ViewportSnapshot {
                doc: &self.doc,
                layout: &layout,
                root: self.target,
                viewport,
            },
            now,
        );
        for el in triggered {
            self.click(el);
        }

        match self.pending_reveal {
            Some(due) if now >= due => {
                self.pending_reveal = None;
                let id = self.selected_node_id.as_ref()?;
                self.doc.get_element_by_id(&label_dom_id(id))
            }
            _ => None,
        }
    }

    /// Stop observation and pending timers.
    pub fn dispose(&mut self) {
        self.observer.dispose();
        self.pending_reveal = None;
        debug!("tree disposed");
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn layout(&self) -> Layout {
        Layout::compute(&self.doc, self.target)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Any node of the data tree, kept or not.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        match self.result.path_of(id) {
            Some(path) => self.root.at_path(path),
            None => self.root.find(id),
        }
    }

    pub fn filter_result(&self) -> &FilterResult {
        &self.result
    }

    pub fn total_matches(&self) -> usize {
        self.result.total_matches()
    }

    pub fn loaded_count(&self, id: &NodeId) -> usize {
        self.result.state(id).map_or(0, |s| s.loaded_count)
    }

    pub fn load_more_element(&self, id: &NodeId) -> Option<ElementId> {
        self.result.state(id).and_then(|s| s.load_more)
    }

    pub fn selected_node_id(&self) -> Option<&NodeId> {
        self.selected_node_id.as_ref()
    }

    pub fn selected_element(&self) -> Option<ElementId> {
        self.selected_element
    }

    pub fn observer_strategy(&self) -> ObserverStrategy {
        self.observer.strategy()
    }

    pub fn has_pending_reveal(&self) -> bool {
        self.pending_reveal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn id(n: i64) -> NodeId {
        NodeId::Int(n)
    }

    fn surface() -> Document {
        let mut doc = Document::new();
        let target = doc.create_element("div");
        doc.set_id(target, DEFAULT_RENDER_TARGET);
        doc.append_child(doc.body(), target);
        doc
    }

    fn sample() -> Node {
        Node::new(1, "root")
            .child(Node::new(2, "alpha"))
            .child(Node::new(3, "beta").child(Node::new(4, "alphaSub")))
    }

    /// root(0) > [A(1) with 250 leaves, B(2) with 1800 leaves]: 2053 nodes.
    fn wide() -> Node {
        let mut a = Node::new(1, "A");
        for i in 0..250 {
            a = a.child(Node::new(1000 + i, format!("a{i}")));
        }
        let mut b = Node::new(2, "B");
        for i in 0..1800 {
            b = b.child(Node::new(5000 + i, format!("b{i}")));
        }
        Node::new(0, "root").child(a).child(b)
    }

    fn tree(root: Node) -> Tree {
        Tree::new(root, surface(), TreeOptions::default(), TreeCallbacks::default()).unwrap()
    }

    fn label(tree: &Tree, n: i64) -> Option<ElementId> {
        tree.document().get_element_by_id(&label_dom_id(&id(n)))
    }

    fn toggle_of(tree: &Tree, n: i64) -> ElementId {
        let label = label(tree, n).unwrap();
        let row = tree.document().parent(label).unwrap();
        row_part(tree.document(), row, TOGGLE_CLASS).unwrap()
    }

    fn container_of(tree: &Tree, n: i64) -> ElementId {
        tree.document()
            .get_element_by_id(&children_dom_id(&id(n)))
            .unwrap()
    }

    /// Every rendered node with children has `loaded <= len`, and an
    /// affordance exactly when `loaded < len`.
    fn assert_paging_invariant(tree: &Tree, node: &Node) {
        let rendered = tree
            .document()
            .get_element_by_id(&children_dom_id(&node.id))
            .is_some();
        if let Some(state) = tree.filter_result().state(&node.id).filter(|_| rendered) {
            let len = state.filtered_children.len();
            if len > 0 {
                assert!(state.loaded_count <= len, "node {}", node.id);
                assert_eq!(
                    state.loaded_count == len,
                    state.load_more.is_none(),
                    "node {}",
                    node.id
                );
            }
        }
        for child in &node.children {
            assert_paging_invariant(tree, child);
        }
    }

    #[test]
    fn initial_render_shows_everything() {
        let tree = tree(sample());
        assert_eq!(tree.search_string(), "");
        assert_eq!(tree.total_matches(), 4);
        for n in 1..=4 {
            assert!(label(&tree, n).is_some(), "label {n}");
        }
        let root_label = label(&tree, 1).unwrap();
        assert_eq!(tree.document().text(root_label), Some("root"));
        assert_eq!(tree.document().attr(root_label, "value"), Some("1"));
        // Nodes start closed.
        assert_eq!(tree.document().style(container_of(&tree, 1), "display"), Some("none"));
    }

    #[test]
    fn search_keeps_matches_and_ancestors() {
        let mut tree = tree(sample());
        assert!(tree.set_search_string("alpha"));
        assert_eq!(tree.total_matches(), 4);
        assert!(label(&tree, 2).is_some());
        assert!(label(&tree, 3).is_some());

        tree.set_search_string("Sub");
        assert_eq!(tree.total_matches(), 3);
        assert!(label(&tree, 2).is_none());
        assert!(label(&tree, 4).is_some());
    }

    #[test]
    fn same_search_string_is_a_no_op() {
        let mut tree = tree(sample());
        tree.set_search_string("beta");
        let before = label(&tree, 3);
        assert!(!tree.set_search_string("beta"));
        assert_eq!(label(&tree, 3), before);
    }

    #[test]
    fn label_carries_parent_id_attribute() {
        let mut child = Node::new(2, "child");
        child.parent_id = Some(id(1));
        let tree = tree(Node::new(1, "root").child(child));
        let el = label(&tree, 2).unwrap();
        assert_eq!(tree.document().attr(el, "parentID"), Some("1"));
        assert_eq!(tree.document().attr(label(&tree, 1).unwrap(), "parentID"), None);
    }

    #[test]
    fn no_match_renders_placeholder_markup() {
        let options = TreeOptions {
            no_match: Some(NoMatchPlaceholder::Markup("Nothing here".into())),
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(sample(), surface(), options, TreeCallbacks::default()).unwrap();
        tree.set_search_string("zzz");
        assert_eq!(tree.total_matches(), 0);
        let layout = tree.layout();
        assert_eq!(layout.len(), 1);
        let children = tree.document().children(tree.target());
        assert_eq!(children.len(), 1);
        assert_eq!(tree.document().text(children[0]), Some("Nothing here"));
    }

    #[test]
    fn no_match_element_is_serialized_once() {
        let mut doc = surface();
        let hint = doc.create_element("p");
        doc.set_id(hint, "hint");
        doc.set_text(hint, "No results");
        doc.append_child(doc.body(), hint);
        let options = TreeOptions {
            no_match: Some(NoMatchPlaceholder::Element("hint".into())),
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(sample(), doc, options, TreeCallbacks::default()).unwrap();
        tree.set_search_string("zzz");
        let children = tree.document().children(tree.target());
        let markup = tree.document().text(children[0]).unwrap();
        assert!(markup.contains("No results"), "{markup}");
    }

    #[test]
    fn no_match_without_placeholder_leaves_target_empty() {
        let mut tree = tree(sample());
        tree.set_search_string("zzz");
        assert!(tree.document().children(tree.target()).is_empty());
        assert!(tree.layout().is_empty());
    }

    #[test]
    fn missing_render_target_is_an_error() {
        let options = TreeOptions {
            render_target: "nowhere".into(),
            ..TreeOptions::default()
        };
        let err = Tree::new(sample(), surface(), options, TreeCallbacks::default())
            .err()
            .unwrap();
        assert!(matches!(err, AppError::MissingRenderTarget(ref t) if t == "nowhere"));
    }

    #[test]
    fn hidden_root_renders_children_at_top() {
        let options = TreeOptions {
            include_root: false,
            ..TreeOptions::default()
        };
        let tree = Tree::new(sample(), surface(), options, TreeCallbacks::default()).unwrap();
        assert!(label(&tree, 1).is_none());
        assert_eq!(tree.document().children(tree.target()).len(), 2);
        assert_eq!(tree.loaded_count(&id(1)), 2);
    }

    /// 1 > 2 > 3 > 4 > 5 > 6, always chunking.
    fn chain_tree(include_root: bool) -> Tree {
        let mut node = Node::new(6, "f");
        for n in (1..=5).rev() {
            node = Node::new(n, format!("n{n}")).child(node);
        }
        let options = TreeOptions {
            include_root,
            paging: PagingPolicy {
                chunk_size: 100,
                eager_threshold: 0,
                max_eager_depth: 3,
            },
            ..TreeOptions::default()
        };
        Tree::new(node, surface(), options, TreeCallbacks::default()).unwrap()
    }

    #[test]
    fn hidden_root_defers_at_the_same_level() {
        for include_root in [true, false] {
            let tree = chain_tree(include_root);
            assert!(label(&tree, 4).is_some(), "include_root={include_root}");
            assert!(label(&tree, 5).is_none(), "include_root={include_root}");
            assert!(tree.load_more_element(&id(4)).is_some());
        }
    }

    #[test]
    fn toggle_opens_its_own_row_when_ids_format_alike() {
        let root = Node::new(1, "root")
            .child(Node::new(7, "int").child(Node::new(70, "x")))
            .child(Node::new("7", "str").child(Node::new(71, "y")));
        let mut tree = tree(root);
        let rows = tree.document().children(container_of(&tree, 1)).to_vec();
        assert_eq!(rows.len(), 2);
        let part = |tree: &Tree, row, class| row_part(tree.document(), row, class).unwrap();

        tree.click(part(&tree, rows[0], TOGGLE_CLASS));
        let doc = tree.document();
        assert_eq!(doc.style(part(&tree, rows[0], CHILDREN_CLASS), "display"), Some("block"));
        assert_eq!(doc.style(part(&tree, rows[1], CHILDREN_CLASS), "display"), Some("none"));
        assert_eq!(tree.node(&id(7)).and_then(|n| n.close), Some(false));
        assert_eq!(tree.node(&NodeId::from("7")).and_then(|n| n.close), None);
    }

    #[test]
    fn rerenders_reuse_freed_elements() {
        let mut root = Node::new(0, "top");
        for i in 0..100 {
            root = root.child(Node::new(1 + i, format!("n{i}")));
        }
        let mut tree = tree(root);
        let live = tree.document().len();
        let before = tree.document().capacity();
        for round in 0..200 {
            tree.set_search_string(if round % 2 == 0 { "n" } else { "" });
        }
        assert_eq!(tree.document().len(), live);
        assert!(tree.document().capacity() < before * 3);
    }

    #[test]
    fn surface_without_intersection_falls_back_to_polling() {
        let doc = surface().with_intersection(false);
        let mut tree = Tree::new(wide(), doc, TreeOptions::default(), TreeCallbacks::default())
            .unwrap();
        assert_eq!(tree.options().observer, ObserverStrategy::Auto);
        assert_eq!(tree.observer_strategy(), ObserverStrategy::Polling);

        tree.click(toggle_of(&tree, 0));
        tree.click(toggle_of(&tree, 1));
        assert_eq!(tree.loaded_count(&id(1)), 200);
        // Scrolling alone does nothing; the due tick does.
        assert_eq!(tree.on_viewport_change(Viewport::new(190, 20)), 0);
        assert_eq!(tree.loaded_count(&id(1)), 200);
        tree.tick(Instant::now() + Duration::from_secs(1), Viewport::new(190, 20));
        assert_eq!(tree.loaded_count(&id(1)), 250);
    }

    #[test]
    fn icon_is_optional() {
        let tree1 = tree(sample());
        let row = tree1.document().parent(label(&tree1, 1).unwrap()).unwrap();
        let icon = row_part(tree1.document(), row, ICON_CLASS).unwrap();
        assert!(tree1.document().has_class(icon, "icon_node"));

        let options = TreeOptions {
            node_icon: String::new(),
            ..TreeOptions::default()
        };
        let tree2 = Tree::new(sample(), surface(), options, TreeCallbacks::default()).unwrap();
        let row = tree2.document().parent(label(&tree2, 1).unwrap()).unwrap();
        assert!(row_part(tree2.document(), row, ICON_CLASS).is_none());
    }

    #[test]
    fn toggle_flips_classes_display_and_close_flag() {
        let mut tree = tree(sample());
        let toggle = toggle_of(&tree, 3);
        assert!(tree.document().has_class(toggle, CLOSED_CLASS));

        tree.click(toggle);
        assert!(tree.document().has_class(toggle, OPEN_CLASS));
        assert!(!tree.document().has_class(toggle, CLOSED_CLASS));
        assert_eq!(tree.document().style(container_of(&tree, 3), "display"), Some("block"));
        assert_eq!(tree.node(&id(3)).unwrap().close, Some(false));

        tree.click(toggle);
        assert!(tree.document().has_class(toggle, CLOSED_CLASS));
        assert_eq!(tree.document().style(container_of(&tree, 3), "display"), Some("none"));
        assert_eq!(tree.node(&id(3)).unwrap().close, Some(true));
    }

    #[test]
    fn leaves_get_an_inert_toggle() {
        let mut tree = tree(sample());
        let toggle = toggle_of(&tree, 2);
        assert!(!tree.document().has_class(toggle, CLOSED_CLASS));
        assert!(!tree.document().has_class(toggle, OPEN_CLASS));
        tree.click(toggle);
        assert!(!tree.document().has_class(toggle, OPEN_CLASS));
    }

    #[test]
    fn open_state_survives_refiltering() {
        let mut tree = tree(sample());
        tree.click(toggle_of(&tree, 1));
        tree.set_search_string("a");
        assert!(tree.document().has_class(toggle_of(&tree, 1), OPEN_CLASS));
        assert_eq!(tree.document().style(container_of(&tree, 1), "display"), Some("block"));
    }

    #[test]
    fn at_threshold_everything_is_eager() {
        let mut root = Node::new(0, "root");
        for i in 0..1999 {
            root = root.child(Node::new(i + 1, format!("n{i}")));
        }
        let tree = tree(root);
        assert_eq!(tree.total_matches(), 2000);
        assert_eq!(tree.loaded_count(&id(0)), 1999);
        assert!(tree.load_more_element(&id(0)).is_none());
        assert!(tree
            .document()
            .query_class(tree.target(), LOAD_MORE_CLASS)
            .is_empty());
    }

    #[test]
    fn large_results_are_chunked() {
        let mut tree = tree(wide());
        assert_eq!(tree.total_matches(), 2053);
        assert_eq!(tree.loaded_count(&id(1)), 100);
        assert_eq!(tree.loaded_count(&id(2)), 100);
        assert_paging_invariant(&tree, &wide());

        let more = tree.load_more_element(&id(1)).unwrap();
        let container = container_of(&tree, 1);
        assert_eq!(tree.document().children(container).len(), 101);
        assert_eq!(tree.document().children(container).last(), Some(&more));

        tree.click(more);
        assert_eq!(tree.loaded_count(&id(1)), 200);
        assert_eq!(tree.document().children(container).len(), 201);
        assert_eq!(tree.document().children(container).last(), Some(&more));
        assert_eq!(tree.load_more_element(&id(1)), Some(more));

        tree.click(more);
        assert_eq!(tree.loaded_count(&id(1)), 250);
        assert!(tree.load_more_element(&id(1)).is_none());
        assert_eq!(tree.document().children(container).len(), 250);
        assert!(tree.document().get(more).is_none());
        assert_paging_invariant(&tree, &wide());

        // Children stay in filtered order.
        let names: Vec<&str> = tree
            .document()
            .children(container)
            .iter()
            .take(3)
            .filter_map(|row| row_part(tree.document(), *row, LABEL_CLASS))
            .filter_map(|l| tree.document().text(l))
            .collect();
        assert_eq!(names, vec!["a0", "a1", "a2"]);
    }

    #[test]
    fn refiltering_restarts_pagination() {
        let mut tree = tree(wide());
        let more = tree.load_more_element(&id(1)).unwrap();
        tree.click(more);
        assert_eq!(tree.loaded_count(&id(1)), 200);

        tree.set_search_string("a1");
        // Few matches: eager.
        assert!(tree.total_matches() < 2000);
        assert_eq!(
            tree.loaded_count(&id(1)),
            tree.filter_result().filtered_children(&id(1)).len()
        );
        tree.set_search_string("");
        assert_eq!(tree.loaded_count(&id(1)), 100);
    }

    #[test]
    fn deep_levels_are_deferred_and_loaded_by_toggle() {
        let root = Node::new(0, "r").child(
            Node::new(1, "a").child(Node::new(2, "b").child(Node::new(3, "c"))),
        );
        let options = TreeOptions {
            paging: PagingPolicy {
                chunk_size: 2,
                eager_threshold: 0,
                max_eager_depth: 1,
            },
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(root, surface(), options, TreeCallbacks::default()).unwrap();

        // Level 1 (a) is rendered, level 2 (b) is behind an affordance.
        assert!(label(&tree, 1).is_some());
        assert!(label(&tree, 2).is_none());
        assert_eq!(tree.loaded_count(&id(1)), 0);
        let more = tree.load_more_element(&id(1)).unwrap();
        assert_eq!(tree.document().children(container_of(&tree, 1)), &[more]);

        tree.click(toggle_of(&tree, 1));
        assert!(label(&tree, 2).is_some());
        assert_eq!(tree.loaded_count(&id(1)), 1);
        assert!(tree.load_more_element(&id(1)).is_none());
        // The next level is deferred again.
        assert!(label(&tree, 3).is_none());
        assert!(tree.load_more_element(&id(2)).is_some());
    }

    #[test]
    fn selected_node_is_marked_and_ancestors_open() {
        let options = TreeOptions {
            selected_node_id: Some(id(4)),
            ..TreeOptions::default()
        };
        let tree = Tree::new(sample(), surface(), options, TreeCallbacks::default()).unwrap();
        let el = label(&tree, 4).unwrap();
        assert!(tree.document().has_class(el, DEFAULT_SELECTED_CLASS));
        assert_eq!(tree.selected_element(), Some(el));
        assert!(tree.document().is_displayed(el));
        assert_eq!(tree.node(&id(3)).unwrap().close, Some(false));
        assert_eq!(tree.node(&id(1)).unwrap().close, Some(false));
        assert!(tree.has_pending_reveal());
    }

    #[test]
    fn selection_is_exclusive_and_reports_previous() {
        let calls: Rc<RefCell<Vec<(NodeId, Option<ElementId>)>>> = Rc::default();
        let sink = Rc::clone(&calls);
        let callbacks = TreeCallbacks::default().with_on_node_select(move |_, node, _, prev| {
            sink.borrow_mut().push((node.id.clone(), prev));
        });
        let mut style = BTreeMap::new();
        style.insert("font-weight".to_string(), "bold".to_string());
        let options = TreeOptions {
            selected_node_style: style,
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(sample(), surface(), options, callbacks).unwrap();

        let first = label(&tree, 2).unwrap();
        let second = label(&tree, 3).unwrap();
        tree.click(first);
        tree.click(second);

        assert_eq!(
            *calls.borrow(),
            vec![(id(2), None), (id(3), Some(first))]
        );
        let selected = tree
            .document()
            .query_class(tree.target(), DEFAULT_SELECTED_CLASS);
        assert_eq!(selected, vec![second]);
        assert_eq!(tree.document().style(second, "font-weight"), Some("bold"));
        assert_eq!(tree.document().style(first, "font-weight"), None);
        assert_eq!(tree.selected_node_id(), Some(&id(3)));
    }

    #[test]
    fn labels_are_inert_without_select_callback() {
        let mut tree = tree(sample());
        let el = label(&tree, 2).unwrap();
        tree.click(el);
        assert!(!tree.document().has_class(el, DEFAULT_SELECTED_CLASS));
        assert!(tree.selected_node_id().is_none());
    }

    #[test]
    fn custom_filter_and_template_hooks() {
        let mut root = sample();
        root.children[0]
            .extra
            .insert("tag".into(), serde_json::Value::from("x"));
        let callbacks = TreeCallbacks::default()
            .with_filter(|node, term| {
                term.is_empty() || node.extra.get("tag").and_then(|v| v.as_str()) == Some(term)
            })
            .with_render_node_template(|doc, label, node| {
                doc.set_attr(label, "title", node.display_name());
            });
        let mut tree = Tree::new(root, surface(), TreeOptions::default(), callbacks).unwrap();
        tree.set_search_string("x");
        assert_eq!(tree.total_matches(), 2);
        let el = label(&tree, 2).unwrap();
        assert_eq!(tree.document().attr(el, "title"), Some("alpha"));
    }

    #[test]
    fn intersection_loads_more_when_scrolled_into_view() {
        let mut tree = tree(wide());
        assert_eq!(tree.observer_strategy(), ObserverStrategy::Intersection);
        tree.click(toggle_of(&tree, 0));
        // Opening A drives its pending affordance once.
        tree.click(toggle_of(&tree, 1));
        assert_eq!(tree.loaded_count(&id(1)), 200);

        // root, A, 200 children, affordance at row 202.
        assert_eq!(tree.on_viewport_change(Viewport::new(0, 20)), 0);
        assert_eq!(tree.on_viewport_change(Viewport::new(190, 20)), 1);
        assert_eq!(tree.loaded_count(&id(1)), 250);
        assert!(tree.load_more_element(&id(1)).is_none());
    }

    #[test]
    fn polling_loads_the_first_fully_visible_affordance() {
        let options = TreeOptions {
            observer: ObserverStrategy::Polling,
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(wide(), surface(), options, TreeCallbacks::default()).unwrap();
        assert_eq!(tree.observer_strategy(), ObserverStrategy::Polling);
        tree.click(toggle_of(&tree, 0));
        tree.click(toggle_of(&tree, 1));
        assert_eq!(tree.loaded_count(&id(1)), 200);

        let later = Instant::now() + Duration::from_secs(1);
        tree.tick(later, Viewport::new(190, 20));
        assert_eq!(tree.loaded_count(&id(1)), 250);

        tree.dispose();
        let before = tree.loaded_count(&id(2));
        tree.click(toggle_of(&tree, 2));
        let after_toggle = tree.loaded_count(&id(2));
        tree.tick(later + Duration::from_secs(10), Viewport::new(0, 5000));
        assert_eq!(tree.loaded_count(&id(2)), after_toggle);
        assert!(after_toggle > before);
    }

    #[test]
    fn reveal_fires_once_after_delay() {
        let options = TreeOptions {
            selected_node_id: Some(id(4)),
            reveal_delay: Duration::from_secs(60),
            ..TreeOptions::default()
        };
        let mut tree = Tree::new(sample(), surface(), options, TreeCallbacks::default()).unwrap();
        let now = Instant::now();
        assert_eq!(tree.tick(now, Viewport::new(0, 10)), None);
        let later = now + Duration::from_secs(61);
        assert_eq!(tree.tick(later, Viewport::new(0, 10)), label(&tree, 4));
        assert_eq!(tree.tick(later, Viewport::new(0, 10)), None);
    }
}
