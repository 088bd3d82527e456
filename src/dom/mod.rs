//! In-memory rendering surface.
//!
//! A [`Document`] is an arena of [`Element`]s forming a retained element tree.
//! Click listeners are stored as [`Action`] values and dispatched by whoever
//! owns the document, so listeners never hold references into the tree.

pub mod layout;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use slotmap::{new_key_type, SlotMap};

use crate::tree::NodeId;

/// Tag used for detached fragments whose children are spliced on insert.
pub const FRAGMENT_TAG: &str = "#fragment";
/// Tag used for raw markup inserted via [`Document::set_inner_html`].
pub const MARKUP_TAG: &str = "#markup";

new_key_type! {
    /// Handle to an element in a [`Document`]. A handle to a freed element
    /// stays dead even after its slot is reused.
    pub struct ElementId;
}

/// What a click on an element asks its owner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Expand or collapse the node's children.
    Toggle(NodeId),
    /// Materialize the next chunk of the node's children.
    LoadMore(NodeId),
    /// Select the node.
    Select(NodeId),
}

/// A single element of the retained tree.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    dom_id: Option<String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
    on_click: Option<Action>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            dom_id: None,
            classes: Vec::new(),
            style: BTreeMap::new(),
            attrs: BTreeMap::new(),
            text: None,
            children: Vec::new(),
            parent: None,
            on_click: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn dom_id(&self) -> Option<&str> {
        self.dom_id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn on_click(&self) -> Option<&Action> {
        self.on_click.as_ref()
    }

    /// Block elements own lines in the layout; everything else is inline.
    pub fn is_block(&self) -> bool {
        self.tag == "div" || self.tag == MARKUP_TAG
    }

    pub fn is_hidden(&self) -> bool {
        self.style("display") == Some("none")
    }
}

/// Arena-backed element tree rooted at a `body` element.
#[derive(Debug)]
pub struct Document {
    elements: SlotMap<ElementId, Element>,
    by_dom_id: HashMap<String, ElementId>,
    body: ElementId,
    supports_intersection: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `body` element.
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let body = elements.insert(Element::new("body"));
        Self {
            elements,
            by_dom_id: HashMap::new(),
            body,
            supports_intersection: true,
        }
    }

    /// Declare whether this surface can report element intersections.
    pub fn with_intersection(mut self, supported: bool) -> Self {
        self.supports_intersection = supported;
        self
    }

    pub fn supports_intersection(&self) -> bool {
        self.supports_intersection
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn get(&self, el: ElementId) -> Option<&Element> {
        self.elements.get(el)
    }

    fn get_mut(&mut self, el: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(el)
    }

    /// Number of live elements, `body` included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Slots allocated by the arena, live or free.
    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.elements.insert(Element::new(tag))
    }

    /// Create a detached fragment; see [`Document::append_fragment`].
    pub fn create_fragment(&mut self) -> ElementId {
        self.create_element(FRAGMENT_TAG)
    }

    /// Assign a DOM id, replacing any previous one.
    pub fn set_id(&mut self, el: ElementId, dom_id: impl Into<String>) {
        let dom_id = dom_id.into();
        let Some(element) = self.get_mut(el) else {
            return;
        };
        let previous = element.dom_id.replace(dom_id.clone());
        if let Some(previous) = previous {
            if self.by_dom_id.get(&previous) == Some(&el) {
                self.by_dom_id.remove(&previous);
            }
        }
        self.by_dom_id.insert(dom_id, el);
    }

    pub fn get_element_by_id(&self, dom_id: &str) -> Option<ElementId> {
        self.by_dom_id.get(dom_id).copied()
    }

    pub fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(element) = self.get_mut(el) {
            if !element.has_class(class) {
                element.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(element) = self.get_mut(el) {
            element.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.get(el).is_some_and(|e| e.has_class(class))
    }

    pub fn set_style(&mut self, el: ElementId, property: &str, value: &str) {
        if let Some(element) = self.get_mut(el) {
            element
                .style
                .insert(property.to_string(), value.to_string());
        }
    }

    pub fn remove_style(&mut self, el: ElementId, property: &str) {
        if let Some(element) = self.get_mut(el) {
            element.style.remove(property);
        }
    }

    pub fn style(&self, el: ElementId, property: &str) -> Option<&str> {
        self.get(el).and_then(|e| e.style(property))
    }

    pub fn set_attr(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(element) = self.get_mut(el) {
            element.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attr(&self, el: ElementId, name: &str) -> Option<&str> {
        self.get(el).and_then(|e| e.attr(name))
    }

    pub fn set_text(&mut self, el: ElementId, text: impl Into<String>) {
        if let Some(element) = self.get_mut(el) {
            element.text = Some(text.into());
        }
    }

    pub fn text(&self, el: ElementId) -> Option<&str> {
        self.get(el).and_then(Element::text)
    }

    pub fn set_on_click(&mut self, el: ElementId, action: Action) {
        if let Some(element) = self.get_mut(el) {
            element.on_click = Some(action);
        }
    }

    // ── Structure ───────────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(element) = self.get_mut(child) {
            element.parent = Some(parent);
        }
        if let Some(element) = self.get_mut(parent) {
            element.children.push(child);
        }
    }

    /// Move every child of `fragment` to the end of `parent`, in order,
    /// then discard the fragment.
    pub fn append_fragment(&mut self, parent: ElementId, fragment: ElementId) {
        let children = self.children(fragment).to_vec();
        for child in children {
            self.append_child(parent, child);
        }
        self.remove(fragment);
    }

    /// Unlink an element from its parent without freeing it.
    pub fn detach(&mut self, el: ElementId) {
        let Some(parent) = self.get(el).and_then(Element::parent) else {
            return;
        };
        if let Some(element) = self.get_mut(parent) {
            element.children.retain(|c| *c != el);
        }
        if let Some(element) = self.get_mut(el) {
            element.parent = None;
        }
    }

    /// Detach an element and free its whole subtree.
    pub fn remove(&mut self, el: ElementId) {
        if el == self.body {
            return;
        }
        self.detach(el);
        self.free_subtree(el);
    }

    pub fn clear_children(&mut self, el: ElementId) {
        let children = match self.get_mut(el) {
            Some(element) => std::mem::take(&mut element.children),
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
    }

    fn free_subtree(&mut self, el: ElementId) {
        let Some(element) = self.elements.remove(el) else {
            return;
        };
        if let Some(dom_id) = element.dom_id {
            if self.by_dom_id.get(&dom_id) == Some(&el) {
                self.by_dom_id.remove(&dom_id);
            }
        }
        for child in element.children {
            self.free_subtree(child);
        }
    }

    pub fn children(&self, el: ElementId) -> &[ElementId] {
        self.get(el).map(Element::children).unwrap_or(&[])
    }

    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.get(el).and_then(Element::parent)
    }

    pub fn index_in_parent(&self, el: ElementId) -> Option<usize> {
        let parent = self.parent(el)?;
        self.children(parent).iter().position(|c| *c == el)
    }

    /// Whether the element is connected to `body`.
    pub fn is_attached(&self, el: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attached and not inside a `display: none` subtree.
    pub fn is_displayed(&self, el: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            match self.get(id) {
                Some(element) if element.is_hidden() => return false,
                Some(_) if id == self.body => return true,
                Some(element) => current = element.parent,
                None => return false,
            }
        }
        false
    }

    /// Descendants of `root` carrying `class`, in document order.
    pub fn query_class(&self, root: ElementId, class: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.children(root).iter().rev().copied().collect();
        while let Some(el) = stack.pop() {
            if self.has_class(el, class) {
                found.push(el);
            }
            stack.extend(self.children(el).iter().rev().copied());
        }
        found
    }

    /// The click listener of an attached element.
    pub fn click(&self, el: ElementId) -> Option<Action> {
        if !self.is_attached(el) {
            return None;
        }
        self.get(el).and_then(|e| e.on_click.clone())
    }

    // ── Markup ──────────────────────────────────────────────────────────

    /// Replace all children of `el` with a raw markup child.
    pub fn set_inner_html(&mut self, el: ElementId, markup: &str) {
        self.clear_children(el);
        if markup.is_empty() {
            return;
        }
        let raw = self.create_element(MARKUP_TAG);
        self.set_text(raw, markup);
        self.append_child(el, raw);
    }

    /// Serialize an element and its subtree.
    pub fn outer_html(&self, el: ElementId) -> String {
        let mut out = String::new();
        self.write_html(el, &mut out);
        out
    }

    fn write_html(&self, el: ElementId, out: &mut String) {
        let Some(element) = self.get(el) else {
            return;
        };
        match element.tag.as_str() {
            MARKUP_TAG => {
                out.push_str(element.text().unwrap_or_default());
                return;
            }
            FRAGMENT_TAG => {
                for child in &element.children {
                    self.write_html(*child, out);
                }
                return;
            }
            _ => {}
        }

        let _ = write!(out, "<{}", element.tag);
        if let Some(dom_id) = &element.dom_id {
            let _ = write!(out, " id=\"{}\"", escape(dom_id));
        }
        if !element.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&element.classes.join(" ")));
        }
        if !element.style.is_empty() {
            let style: Vec<String> = element
                .style
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            let _ = write!(out, " style=\"{}\"", escape(&style.join("; ")));
        }
        for (name, value) in &element.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        out.push('>');
        if let Some(text) = &element.text {
            out.push_str(&escape(text));
        }
        for child in &element.children {
            self.write_html(*child, out);
        }
        let _ = write!(out, "</{}>", element.tag);
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
