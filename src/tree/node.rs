use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Identifier of a node: JSON ids may be integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl NodeId {
    /// Parse user input: integers become [`NodeId::Int`], anything else a string id.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => NodeId::Int(n),
            Err(_) => NodeId::Str(s.to_string()),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(n) => write!(f, "{n}"),
            NodeId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId::Int(n)
    }
}

impl From<i32> for NodeId {
    fn from(n: i32) -> Self {
        NodeId::Int(i64::from(n))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::Str(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::Str(s)
    }
}

/// A record in the caller's hierarchy.
///
/// Unknown JSON fields are kept in `extra` and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Only `Some(false)` renders expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: Some(name.into()),
            children: Vec::new(),
            close: None,
            extra: Map::new(),
        }
    }

    /// Builder-style child append.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.close.unwrap_or(true)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Total number of nodes in this subtree, self included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Follow child indices from this node.
    pub fn at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// Decode a tree from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode either a nested tree (JSON object) or flat records with
    /// `parentId` (JSON array). Arrays are assembled under `root`.
    pub fn from_reader(reader: impl Read, root: Node) -> Result<Self> {
        let value: Value = serde_json::from_reader(reader)?;
        match value {
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<Vec<Node>, _>>()?;
                Node::assemble(root, records)
            }
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Place flat records under their `parentId`, preserving record order.
    ///
    /// Records without a parent, or whose parent is not among the records,
    /// attach to `root`. Records that can never reach `root` are an error.
    pub fn assemble(mut root: Node, records: Vec<Node>) -> Result<Self> {
        let known: HashSet<NodeId> = records.iter().map(|r| r.id.clone()).collect();
        let mut groups: HashMap<NodeId, Vec<Node>> = HashMap::new();
        for record in records {
            let parent = match &record.parent_id {
                Some(p) if known.contains(p) && *p != record.id => p.clone(),
                _ => root.id.clone(),
            };
            groups.entry(parent).or_default().push(record);
        }

        attach_groups(&mut root, &mut groups);

        if !groups.is_empty() {
            let mut stranded: Vec<String> = groups
                .into_values()
                .flatten()
                .map(|n| n.id.to_string())
                .collect();
            stranded.sort();
            return Err(AppError::UnreachableRecords(stranded));
        }
        Ok(root)
    }
}

fn attach_groups(node: &mut Node, groups: &mut HashMap<NodeId, Vec<Node>>) {
    if let Some(children) = groups.remove(&node.id) {
        node.children.extend(children);
    }
    for child in node.children.iter_mut() {
        attach_groups(child, groups);
    }
}
