//! # Tree
//!
//! Generic n-ary tree over nodes owned by the caller.
//!
//! Nodes are addressed by [`NodeId`] and live in any storage implementing
//! [`TreeStorage`]. A node knows its tree, its parent, its first child and
//! both siblings:
//!
//! ```text
//!            root
//!             |  child
//!             v
//!   None <- [C] <-> [B] <-> [A] -> None     (left/right siblings)
//! ```
//!
//! A node is either unlinked (every link empty) or linked into exactly one
//! tree. A tree has a single root, the only node without a parent.

use tracing::{trace, warn};

use crate::error::{TreeError, TreeResult};

/// Identifier of a tree, chosen by its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TreeId(pub u32);

/// Identifier of a node inside its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the raw storage index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tree links of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeNode {
    tree: Option<TreeId>,
    parent: Option<NodeId>,
    child: Option<NodeId>,
    left_sibling: Option<NodeId>,
    right_sibling: Option<NodeId>,
}

impl TreeNode {
    /// Creates an unlinked node.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree: None,
            parent: None,
            child: None,
            left_sibling: None,
            right_sibling: None,
        }
    }

    /// Tree this node is linked into.
    #[inline]
    #[must_use]
    pub const fn tree(&self) -> Option<TreeId> {
        self.tree
    }

    /// Parent node, `None` for a root or an unlinked node.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// First child.
    #[inline]
    #[must_use]
    pub const fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Previous sibling.
    #[inline]
    #[must_use]
    pub const fn left_sibling(&self) -> Option<NodeId> {
        self.left_sibling
    }

    /// Next sibling.
    #[inline]
    #[must_use]
    pub const fn right_sibling(&self) -> Option<NodeId> {
        self.right_sibling
    }

    /// Checks whether the node belongs to a tree.
    #[inline]
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.tree.is_some()
    }
}

/// Storage holding the tree nodes.
///
/// Accessing an id that designates no node is an invariant violation and
/// implementations panic.
pub trait TreeStorage {
    /// Returns the links of `id`.
    fn node(&self, id: NodeId) -> &TreeNode;

    /// Returns the links of `id` mutably.
    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode;
}

impl TreeStorage for Vec<TreeNode> {
    #[inline]
    fn node(&self, id: NodeId) -> &TreeNode {
        &self[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self[id.index()]
    }
}

impl TreeStorage for [TreeNode] {
    #[inline]
    fn node(&self, id: NodeId) -> &TreeNode {
        &self[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self[id.index()]
    }
}

/// Tree header: identity, root and node count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    id: TreeId,
    root: Option<NodeId>,
    count: u32,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new(id: TreeId) -> Self {
        Self {
            id,
            root: None,
            count: 0,
        }
    }

    /// Returns the tree id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TreeId {
        self.id
    }

    /// Returns the root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the number of linked nodes.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Adds `node` as root.
    ///
    /// If the tree already has a root, `node` is added as its parent and
    /// becomes the new root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadyLinked`] if `node` is in a tree.
    pub fn add_root<S>(&mut self, nodes: &mut S, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        if let Some(root) = self.root {
            return self.add_parent(nodes, root, node);
        }

        Self::check_unlinked(nodes, node)?;
        assert_eq!(self.count, 0, "tree {:?} has nodes but no root", self.id);

        *nodes.node_mut(node) = TreeNode {
            tree: Some(self.id),
            ..TreeNode::new()
        };
        self.root = Some(node);
        self.count = 1;

        trace!(tree = self.id.0, node = node.0, "tree root added");
        Ok(())
    }

    /// Inserts `node` right above `reference`.
    ///
    /// `node` takes over the parent and sibling links of `reference`, which
    /// becomes its only child. Adding a parent to the root makes a new root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadyLinked`] if `node` is in a tree, or
    /// [`TreeError::ForeignTree`] if `reference` isn't in this one.
    pub fn add_parent<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.check_member(nodes, reference)?;

        let ref_links = *nodes.node(reference);
        *nodes.node_mut(node) = TreeNode {
            tree: Some(self.id),
            parent: ref_links.parent,
            child: Some(reference),
            left_sibling: ref_links.left_sibling,
            right_sibling: ref_links.right_sibling,
        };

        match ref_links.left_sibling {
            Some(left) => nodes.node_mut(left).right_sibling = Some(node),
            None => {
                if let Some(parent) = ref_links.parent {
                    nodes.node_mut(parent).child = Some(node);
                }
            }
        }
        if let Some(right) = ref_links.right_sibling {
            nodes.node_mut(right).left_sibling = Some(node);
        }

        let reference_node = nodes.node_mut(reference);
        reference_node.parent = Some(node);
        reference_node.left_sibling = None;
        reference_node.right_sibling = None;

        if self.root == Some(reference) {
            self.root = Some(node);
        }
        self.count += 1;

        trace!(tree = self.id.0, node = node.0, reference = reference.0, "tree parent added");
        Ok(())
    }

    /// Inserts `node` right after `reference` in its sibling chain.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadyLinked`] if `node` is in a tree,
    /// [`TreeError::ForeignTree`] if `reference` isn't in this one, or
    /// [`TreeError::RootSibling`] if `reference` is the root.
    pub fn add_sibling<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.check_member(nodes, reference)?;

        let ref_links = *nodes.node(reference);
        let Some(parent) = ref_links.parent else {
            warn!(tree = self.id.0, "can't add a node as a sibling of the root node");
            return Err(TreeError::RootSibling);
        };

        *nodes.node_mut(node) = TreeNode {
            tree: Some(self.id),
            parent: Some(parent),
            child: None,
            left_sibling: Some(reference),
            right_sibling: ref_links.right_sibling,
        };
        if let Some(right) = ref_links.right_sibling {
            nodes.node_mut(right).left_sibling = Some(node);
        }
        nodes.node_mut(reference).right_sibling = Some(node);
        self.count += 1;

        trace!(tree = self.id.0, node = node.0, reference = reference.0, "tree sibling added");
        Ok(())
    }

    /// Inserts `node` as the first child of `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadyLinked`] if `node` is in a tree, or
    /// [`TreeError::ForeignTree`] if `reference` isn't in this one.
    pub fn add_child<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.check_member(nodes, reference)?;

        *nodes.node_mut(node) = TreeNode {
            tree: Some(self.id),
            ..TreeNode::new()
        };
        Self::link_first_child(nodes, reference, node);
        self.count += 1;

        trace!(tree = self.id.0, node = node.0, reference = reference.0, "tree child added");
        Ok(())
    }

    /// Moves `node` and its whole branch to the front of `reference`'s children.
    ///
    /// The ancestors of `reference` are walked first; the move is refused if
    /// `node` is one of them, which would turn the tree into a cyclic graph.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ForeignTree`] if either node isn't in this tree,
    /// or [`TreeError::Cycle`] if `node` is `reference` or one of its ancestors.
    pub fn move_as_child<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        self.check_member(nodes, reference)?;
        self.check_member(nodes, node)?;

        if self.is_ancestor_or_self(nodes, node, reference) {
            warn!(tree = self.id.0, node = node.0, reference = reference.0, "graph cycle found, invalid move");
            return Err(TreeError::Cycle);
        }

        // A root is an ancestor of every node, so `node` has a parent here
        Self::detach_branch(nodes, node);
        Self::link_first_child(nodes, reference, node);

        trace!(tree = self.id.0, node = node.0, reference = reference.0, "tree branch moved");
        Ok(())
    }

    /// Removes a single node.
    ///
    /// The children of a removed node take its place, in order, among its
    /// former siblings. The root can only be removed when it's the last node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ForeignTree`] if `node` isn't in this tree, or
    /// [`TreeError::RootNotAlone`] if it's the root of a larger tree.
    pub fn remove<S>(&mut self, nodes: &mut S, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        self.check_member(nodes, node)?;

        let links = *nodes.node(node);
        let Some(parent) = links.parent else {
            if self.count != 1 {
                warn!(
                    tree = self.id.0,
                    count = self.count,
                    "can't remove node: node is root and not the last one in the tree"
                );
                return Err(TreeError::RootNotAlone);
            }
            *nodes.node_mut(node) = TreeNode::new();
            self.root = None;
            self.count = 0;
            trace!(tree = self.id.0, node = node.0, "tree root removed");
            return Ok(());
        };

        // Children are spliced where the node was
        let new_child = match links.child {
            Some(first) => {
                let mut last = first;
                loop {
                    let child = nodes.node_mut(last);
                    child.parent = Some(parent);
                    match child.right_sibling {
                        Some(next) => last = next,
                        None => break,
                    }
                }
                nodes.node_mut(last).right_sibling = links.right_sibling;
                if let Some(right) = links.right_sibling {
                    nodes.node_mut(right).left_sibling = Some(last);
                }
                Some(first)
            }
            None => {
                if let Some(right) = links.right_sibling {
                    nodes.node_mut(right).left_sibling = links.left_sibling;
                }
                links.right_sibling
            }
        };

        if let Some(first) = new_child {
            nodes.node_mut(first).left_sibling = links.left_sibling;
        }
        match links.left_sibling {
            Some(left) => nodes.node_mut(left).right_sibling = new_child,
            None => nodes.node_mut(parent).child = new_child,
        }

        *nodes.node_mut(node) = TreeNode::new();
        self.count -= 1;

        trace!(tree = self.id.0, node = node.0, "tree node removed");
        Ok(())
    }

    /// Removes every node, then resets the tree.
    ///
    /// # Panics
    ///
    /// Panics if the links are corrupted so that a node can't be removed.
    pub fn clean<S>(&mut self, nodes: &mut S)
    where
        S: TreeStorage + ?Sized,
    {
        if let Some(root) = self.root {
            while let Some(child) = nodes.node(root).child {
                if let Err(error) = self.remove(nodes, child) {
                    panic!("tree {:?} is corrupted, can't clean it: {error}", self.id);
                }
            }
            if let Err(error) = self.remove(nodes, root) {
                panic!("tree {:?} is corrupted, can't clean it: {error}", self.id);
            }
        }

        *self = Self::new(self.id);
    }

    /// Iterates over the children of `node`, first to last.
    pub fn children<'a, S>(nodes: &'a S, node: NodeId) -> impl Iterator<Item = NodeId> + 'a
    where
        S: TreeStorage + ?Sized,
    {
        std::iter::successors(nodes.node(node).child, move |&child| {
            nodes.node(child).right_sibling
        })
    }

    /// Iterates over every node in pre-order, starting from the root.
    pub fn depth_first<'a, S>(&self, nodes: &'a S) -> DepthFirst<'a, S>
    where
        S: TreeStorage + ?Sized,
    {
        DepthFirst {
            nodes,
            next: self.root,
            top: self.root,
        }
    }

    /// Checks whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self<S>(&self, nodes: &S, ancestor: NodeId, node: NodeId) -> bool
    where
        S: TreeStorage + ?Sized,
    {
        let mut walk = 0;
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            walk += 1;
            assert!(walk <= self.count, "tree {:?} has a cycle above node {}", self.id, node.0);
            current = nodes.node(id).parent;
        }
        false
    }

    fn check_unlinked<S>(nodes: &S, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        if nodes.node(node).is_linked() {
            warn!(node = node.0, "node is already in a tree");
            return Err(TreeError::AlreadyLinked);
        }
        Ok(())
    }

    fn check_member<S>(&self, nodes: &S, node: NodeId) -> TreeResult<()>
    where
        S: TreeStorage + ?Sized,
    {
        match nodes.node(node).tree {
            Some(tree) if tree == self.id => Ok(()),
            Some(_) => {
                warn!(tree = self.id.0, node = node.0, "node belongs to another tree");
                Err(TreeError::ForeignTree)
            }
            None => {
                warn!(tree = self.id.0, node = node.0, "node is not linked into a tree");
                Err(TreeError::NotLinked)
            }
        }
    }

    /// Unhooks `node` from its parent and siblings, keeping its children.
    fn detach_branch<S>(nodes: &mut S, node: NodeId)
    where
        S: TreeStorage + ?Sized,
    {
        let links = *nodes.node(node);
        match links.left_sibling {
            Some(left) => nodes.node_mut(left).right_sibling = links.right_sibling,
            None => {
                if let Some(parent) = links.parent {
                    nodes.node_mut(parent).child = links.right_sibling;
                }
            }
        }
        if let Some(right) = links.right_sibling {
            nodes.node_mut(right).left_sibling = links.left_sibling;
        }

        let detached = nodes.node_mut(node);
        detached.parent = None;
        detached.left_sibling = None;
        detached.right_sibling = None;
    }

    fn link_first_child<S>(nodes: &mut S, parent: NodeId, node: NodeId)
    where
        S: TreeStorage + ?Sized,
    {
        let first = nodes.node(parent).child;
        {
            let linked = nodes.node_mut(node);
            linked.parent = Some(parent);
            linked.left_sibling = None;
            linked.right_sibling = first;
        }
        if let Some(first) = first {
            nodes.node_mut(first).left_sibling = Some(node);
        }
        nodes.node_mut(parent).child = Some(node);
    }
}

/// Pre-order traversal returned by [`Tree::depth_first`].
pub struct DepthFirst<'a, S: ?Sized> {
    nodes: &'a S,
    next: Option<NodeId>,
    top: Option<NodeId>,
}

impl<S> Iterator for DepthFirst<'_, S>
where
    S: TreeStorage + ?Sized,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let links = self.nodes.node(current);

        self.next = links.child.or_else(|| {
            // Climb until a node with a right sibling shows up
            let mut climb = Some(current);
            while let Some(id) = climb {
                if Some(id) == self.top {
                    return None;
                }
                let node = self.nodes.node(id);
                if let Some(right) = node.right_sibling {
                    return Some(right);
                }
                climb = node.parent;
            }
            None
        });

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: NodeId = NodeId(0);
    const A: NodeId = NodeId(1);
    const B: NodeId = NodeId(2);
    const C: NodeId = NodeId(3);
    const D: NodeId = NodeId(4);
    const E: NodeId = NodeId(5);

    fn setup(len: usize) -> (Tree, Vec<TreeNode>) {
        (Tree::new(TreeId(7)), vec![TreeNode::new(); len])
    }

    fn children(nodes: &[TreeNode], node: NodeId) -> Vec<NodeId> {
        Tree::children(nodes, node).collect()
    }

    #[test]
    fn test_add_child_prepends() {
        let (mut tree, mut nodes) = setup(4);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, R, B).unwrap();
        tree.add_child(&mut nodes, R, C).unwrap();
        assert_eq!(children(&nodes, R), vec![C, B, A]);
        assert_eq!(tree.count(), 4);

        tree.remove(&mut nodes, B).unwrap();
        assert_eq!(children(&nodes, R), vec![C, A]);
        assert_eq!(nodes[A.index()].left_sibling(), Some(C));
        assert!(!nodes[B.index()].is_linked());
        assert_eq!(tree.count(), 3);
    }

    #[test]
    fn test_add_root_twice_makes_parent() {
        let (mut tree, mut nodes) = setup(2);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_root(&mut nodes, A).unwrap();
        assert_eq!(tree.root(), Some(A));
        assert_eq!(nodes[R.index()].parent(), Some(A));
        assert_eq!(nodes[A.index()].child(), Some(R));
    }

    #[test]
    fn test_add_parent_in_middle_of_siblings() {
        let (mut tree, mut nodes) = setup(6);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, R, B).unwrap();
        tree.add_child(&mut nodes, R, C).unwrap();

        tree.add_parent(&mut nodes, B, D).unwrap();
        assert_eq!(children(&nodes, R), vec![C, D, A]);
        assert_eq!(children(&nodes, D), vec![B]);
        assert_eq!(nodes[B.index()].left_sibling(), None);
        assert_eq!(nodes[B.index()].right_sibling(), None);

        tree.add_parent(&mut nodes, C, E).unwrap();
        assert_eq!(nodes[R.index()].child(), Some(E));
        assert_eq!(children(&nodes, R), vec![E, D, A]);
    }

    #[test]
    fn test_add_sibling() {
        let (mut tree, mut nodes) = setup(4);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_sibling(&mut nodes, A, B).unwrap();
        tree.add_sibling(&mut nodes, A, C).unwrap();
        assert_eq!(children(&nodes, R), vec![A, C, B]);
        assert_eq!(nodes[C.index()].parent(), Some(R));
    }

    #[test]
    fn test_root_sibling_refused() {
        let (mut tree, mut nodes) = setup(2);
        tree.add_root(&mut nodes, R).unwrap();
        assert_eq!(tree.add_sibling(&mut nodes, R, A), Err(TreeError::RootSibling));
        assert!(!nodes[A.index()].is_linked());
        assert_eq!(tree.count(), 1);
    }

    #[test]
    fn test_linked_node_refused() {
        let (mut tree, mut nodes) = setup(4);
        let mut other = Tree::new(TreeId(8));
        tree.add_root(&mut nodes, R).unwrap();
        other.add_root(&mut nodes, A).unwrap();

        assert_eq!(tree.add_child(&mut nodes, R, A), Err(TreeError::AlreadyLinked));
        assert_eq!(tree.add_child(&mut nodes, A, B), Err(TreeError::ForeignTree));
        assert_eq!(tree.add_child(&mut nodes, B, C), Err(TreeError::NotLinked));
        assert_eq!(tree.move_as_child(&mut nodes, R, A), Err(TreeError::ForeignTree));
    }

    #[test]
    fn test_remove_reattaches_children_in_place() {
        let (mut tree, mut nodes) = setup(6);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, R, B).unwrap();
        tree.add_child(&mut nodes, R, C).unwrap();
        tree.add_child(&mut nodes, B, D).unwrap();
        tree.add_child(&mut nodes, B, E).unwrap();

        tree.remove(&mut nodes, B).unwrap();
        assert_eq!(children(&nodes, R), vec![C, E, D, A]);
        assert_eq!(nodes[E.index()].left_sibling(), Some(C));
        assert_eq!(nodes[A.index()].left_sibling(), Some(D));
        assert_eq!(nodes[D.index()].parent(), Some(R));
        assert_eq!(tree.count(), 5);
    }

    #[test]
    fn test_remove_first_child_with_children() {
        let (mut tree, mut nodes) = setup(4);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, A, B).unwrap();
        tree.add_child(&mut nodes, A, C).unwrap();

        tree.remove(&mut nodes, A).unwrap();
        assert_eq!(nodes[R.index()].child(), Some(C));
        assert_eq!(children(&nodes, R), vec![C, B]);
        assert_eq!(nodes[C.index()].left_sibling(), None);
    }

    #[test]
    fn test_remove_root() {
        let (mut tree, mut nodes) = setup(2);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        assert_eq!(tree.remove(&mut nodes, R), Err(TreeError::RootNotAlone));

        tree.remove(&mut nodes, A).unwrap();
        tree.remove(&mut nodes, R).unwrap();
        assert_eq!(tree.root(), None);
        assert_eq!(tree.count(), 0);
        assert_eq!(nodes[R.index()], TreeNode::new());
    }

    #[test]
    fn test_move_as_child_carries_branch() {
        let (mut tree, mut nodes) = setup(5);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, R, B).unwrap();
        tree.add_child(&mut nodes, B, C).unwrap();
        tree.add_child(&mut nodes, A, D).unwrap();

        tree.move_as_child(&mut nodes, D, B).unwrap();
        assert_eq!(children(&nodes, R), vec![A]);
        assert_eq!(children(&nodes, D), vec![B]);
        assert_eq!(children(&nodes, B), vec![C]);
        assert_eq!(tree.count(), 5);
    }

    #[test]
    fn test_move_into_own_branch_refused() {
        let (mut tree, mut nodes) = setup(3);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, A, B).unwrap();
        let before = nodes.clone();

        assert_eq!(tree.move_as_child(&mut nodes, B, A), Err(TreeError::Cycle));
        assert_eq!(tree.move_as_child(&mut nodes, A, A), Err(TreeError::Cycle));
        assert_eq!(tree.move_as_child(&mut nodes, B, R), Err(TreeError::Cycle));
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_clean() {
        let (mut tree, mut nodes) = setup(5);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, A, B).unwrap();
        tree.add_child(&mut nodes, R, C).unwrap();
        tree.add_child(&mut nodes, C, D).unwrap();

        tree.clean(&mut nodes);
        assert_eq!(tree, Tree::new(TreeId(7)));
        assert!(nodes.iter().all(|node| *node == TreeNode::new()));
    }

    #[test]
    fn test_depth_first_order() {
        let (mut tree, mut nodes) = setup(6);
        tree.add_root(&mut nodes, R).unwrap();
        tree.add_child(&mut nodes, R, A).unwrap();
        tree.add_child(&mut nodes, R, B).unwrap();
        tree.add_child(&mut nodes, B, C).unwrap();
        tree.add_child(&mut nodes, C, D).unwrap();
        tree.add_child(&mut nodes, A, E).unwrap();

        let order: Vec<NodeId> = tree.depth_first(&nodes).collect();
        assert_eq!(order, vec![R, B, C, D, A, E]);
    }

    #[test]
    fn test_depth_first_empty() {
        let (tree, nodes) = setup(1);
        assert_eq!(tree.depth_first(&nodes).count(), 0);
    }
}
