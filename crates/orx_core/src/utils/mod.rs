//! # Utilities
//!
//! Index-linked containers over caller-owned nodes:
//! - [`Tree`]: n-ary tree with cycle-checked moves
//! - [`LinkList`]: doubly-linked list

mod link_list;
mod tree;

pub use link_list::{LinkList, ListId, ListNode, ListStorage};
pub use tree::{DepthFirst, NodeId, Tree, TreeId, TreeNode, TreeStorage};
