//! The tree view core: data model, filtering, paging, observation and the
//! [`Tree`] controller that ties them together.

pub mod controller;
pub mod filter;
pub mod node;
pub mod observer;
pub mod paging;

pub use controller::{
    children_dom_id, label_dom_id, row_part, ClickEvent, NoMatchPlaceholder, Tree,
    TreeCallbacks, TreeOptions,
};
pub use filter::{default_predicate, filter, fuzzy_predicate, FilterResult, NodeState};
pub use node::{Node, NodeId};
pub use observer::{ObserverStrategy, ViewportObserver};
pub use paging::PagingPolicy;
