#![forbid(unsafe_code)]

//! Hierarchical index over tree-shaped option data.
//!
//! [`TreeIndex`] builds an immutable, arena-backed view of a list of
//! [`NodeData`] records: every node gets a stable integer handle
//! ([`NodeId`]), parent/sibling navigation, and derived attributes (merged
//! disabled state, leaf-ness, whether children have been fetched). On top of
//! that it offers flattening to the visible-row sequence for a given
//! expanded-key set, and bulk check-state computation with cascade rules.
//!
//! # Example
//!
//! ```
//! use std::collections::HashSet;
//! use treeline_index::{NodeData, NodeKey, TreeIndex};
//!
//! let data = vec![NodeData::new(1, "root")
//!     .child(NodeData::new(2, "a"))
//!     .child(NodeData::new(3, "b"))];
//! let index = TreeIndex::build(&data);
//!
//! let expanded: HashSet<NodeKey> = [NodeKey::new(1)].into_iter().collect();
//! let rows = index.flatten(&expanded);
//! assert_eq!(rows.len(), 3);
//! ```

mod check;
mod filter;
mod index;
mod node;

pub use check::{CheckPolicy, CheckState};
pub use filter::{FilterResult, default_filter, keys_with_filter};
pub use index::{NodeId, NodeRef, TreeIndex};
pub use node::{NodeData, NodeKey, find_node_mut};
