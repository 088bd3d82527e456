//! Ancestor-preserving filtering.
//!
//! A single depth-first pass records parent links for every node and runs the
//! predicate. Each match walks up its ancestor chain, keeping every node on
//! the way and appending it to its parent's filtered list, until it meets a
//! node that is already kept. A second pass hands each kept node its list.

use std::collections::{HashMap, HashSet};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::dom::ElementId;

use super::node::{Node, NodeId};

/// Per-node state owned by the controller, rebuilt on every filter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    /// Kept children, in original order.
    pub filtered_children: Vec<NodeId>,
    /// How many of `filtered_children` are materialized.
    pub loaded_count: usize,
    /// The installed "load more" element, if any.
    pub load_more: Option<ElementId>,
    /// At least one chunk has been materialized.
    pub children_loaded: bool,
}

/// Lookup-only link from a node to its parent and its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeLink {
    parent: Option<NodeId>,
    path: Vec<usize>,
}

/// Outcome of one filter pass.
#[derive(Debug, Default)]
pub struct FilterResult {
    root: Option<NodeId>,
    total_matches: usize,
    states: HashMap<NodeId, NodeState>,
    links: HashMap<NodeId, NodeLink>,
}

impl FilterResult {
    /// The filtered root, or `None` when nothing matched.
    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    /// Number of kept nodes (matches plus preserved ancestors).
    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    pub fn is_kept(&self, id: &NodeId) -> bool {
        self.states.contains_key(id)
    }

    pub fn state(&self, id: &NodeId) -> Option<&NodeState> {
        self.states.get(id)
    }

    pub fn state_mut(&mut self, id: &NodeId) -> Option<&mut NodeState> {
        self.states.get_mut(id)
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut NodeState> {
        self.states.values_mut()
    }

    /// Kept children of a node; empty for nodes outside the filtered tree.
    pub fn filtered_children(&self, id: &NodeId) -> &[NodeId] {
        self.states
            .get(id)
            .map(|s| s.filtered_children.as_slice())
            .unwrap_or(&[])
    }

    /// Parent of any visited node, kept or not.
    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.links.get(id).and_then(|l| l.parent.as_ref())
    }

    /// Child indices leading from the root to a visited node.
    pub fn path_of(&self, id: &NodeId) -> Option<&[usize]> {
        self.links.get(id).map(|l| l.path.as_slice())
    }

    /// The node itself followed by its ancestors up to the root.
    pub fn ancestor_chain(&self, id: &NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        if !self.links.contains_key(id) {
            return chain;
        }
        let mut current = Some(id.clone());
        while let Some(node) = current {
            current = self.parent_of(&node).cloned();
            chain.push(node);
        }
        chain
    }
}

/// Run one filter pass over `root`.
///
/// The predicate sees every node exactly once, in depth-first order.
pub fn filter<P>(root: &Node, mut predicate: P) -> FilterResult
where
    P: FnMut(&Node) -> bool,
{
    let mut pass = Pass {
        links: HashMap::new(),
        kept: HashSet::new(),
        matched_children: HashMap::new(),
    };
    let mut path = Vec::new();
    pass.visit(root, None, &mut path, &mut predicate);

    let mut states = HashMap::new();
    if pass.kept.contains(&root.id) {
        assign(&root.id, &mut pass.matched_children, &mut states);
    }

    let total_matches = pass.kept.len();
    FilterResult {
        root: (total_matches > 0).then(|| root.id.clone()),
        total_matches,
        states,
        links: pass.links,
    }
}

struct Pass {
    links: HashMap<NodeId, NodeLink>,
    kept: HashSet<NodeId>,
    matched_children: HashMap<NodeId, Vec<NodeId>>,
}

impl Pass {
    fn visit<P>(
        &mut self,
        node: &Node,
        parent: Option<&NodeId>,
        path: &mut Vec<usize>,
        predicate: &mut P,
    ) where
        P: FnMut(&Node) -> bool,
    {
        self.links.insert(
            node.id.clone(),
            NodeLink {
                parent: parent.cloned(),
                path: path.clone(),
            },
        );

        if predicate(node) {
            self.keep_chain(&node.id);
        }

        for (i, child) in node.children.iter().enumerate() {
            path.push(i);
            self.visit(child, Some(&node.id), path, predicate);
            path.pop();
        }
    }

    fn keep_chain(&mut self, id: &NodeId) {
        let mut current = Some(id.clone());
        while let Some(node) = current {
            if !self.kept.insert(node.clone()) {
                break;
            }
            let parent = self.links.get(&node).and_then(|l| l.parent.clone());
            if let Some(parent) = &parent {
                self.matched_children
                    .entry(parent.clone())
                    .or_default()
                    .push(node);
            }
            current = parent;
        }
    }
}

fn assign(
    id: &NodeId,
    matched_children: &mut HashMap<NodeId, Vec<NodeId>>,
    states: &mut HashMap<NodeId, NodeState>,
) {
    let children = matched_children.remove(id).unwrap_or_default();
    for child in &children {
        assign(child, matched_children, states);
    }
    states.insert(
        id.clone(),
        NodeState {
            filtered_children: children,
            ..NodeState::default()
        },
    );
}

/// Case-insensitive substring match on `name`; a blank term matches all.
pub fn default_predicate(node: &Node, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    match &node.name {
        Some(name) => name.to_lowercase().contains(&term.to_lowercase()),
        None => false,
    }
}

/// Skim-style fuzzy match on `name`; a blank term matches all.
pub fn fuzzy_predicate() -> impl Fn(&Node, &str) -> bool {
    let matcher = SkimMatcherV2::default().ignore_case();
    move |node, term| {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        node.name
            .as_deref()
            .is_some_and(|name| matcher.fuzzy_match(name, term).is_some())
    }
}
