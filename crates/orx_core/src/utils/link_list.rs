//! # Linked List
//!
//! Doubly-linked list over nodes owned by the caller, addressed the same way
//! as tree nodes. Used as the list backend of structure storage.

use tracing::{trace, warn};

use super::tree::NodeId;
use crate::error::{ListError, ListResult};

/// Identifier of a list, chosen by its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ListId(pub u32);

/// List links of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListNode {
    list: Option<ListId>,
    previous: Option<NodeId>,
    next: Option<NodeId>,
}

impl ListNode {
    /// Creates an unlinked node.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            list: None,
            previous: None,
            next: None,
        }
    }

    /// List this node is linked into.
    #[inline]
    #[must_use]
    pub const fn list(&self) -> Option<ListId> {
        self.list
    }

    /// Previous node.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    /// Next node.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Checks whether the node belongs to a list.
    #[inline]
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.list.is_some()
    }
}

/// Storage holding the list nodes.
pub trait ListStorage {
    /// Returns the links of `id`.
    fn node(&self, id: NodeId) -> &ListNode;

    /// Returns the links of `id` mutably.
    fn node_mut(&mut self, id: NodeId) -> &mut ListNode;
}

impl ListStorage for Vec<ListNode> {
    #[inline]
    fn node(&self, id: NodeId) -> &ListNode {
        &self[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut ListNode {
        &mut self[id.index()]
    }
}

/// List header: identity, both ends and node count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkList {
    id: ListId,
    first: Option<NodeId>,
    last: Option<NodeId>,
    count: u32,
}

impl LinkList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new(id: ListId) -> Self {
        Self {
            id,
            first: None,
            last: None,
            count: 0,
        }
    }

    /// Returns the list id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ListId {
        self.id
    }

    /// Returns the head node.
    #[inline]
    #[must_use]
    pub const fn first(&self) -> Option<NodeId> {
        self.first
    }

    /// Returns the tail node.
    #[inline]
    #[must_use]
    pub const fn last(&self) -> Option<NodeId> {
        self.last
    }

    /// Returns the number of linked nodes.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Links `node` at the head.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `node` is in a list.
    pub fn add_start<S>(&mut self, nodes: &mut S, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.link(nodes, node, None, self.first);
        Ok(())
    }

    /// Links `node` at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `node` is in a list.
    pub fn add_end<S>(&mut self, nodes: &mut S, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.link(nodes, node, self.last, None);
        Ok(())
    }

    /// Links `node` right before `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `node` is in a list, or an
    /// error if `reference` isn't in this one.
    pub fn add_before<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.check_member(nodes, reference)?;
        let previous = nodes.node(reference).previous;
        self.link(nodes, node, previous, Some(reference));
        Ok(())
    }

    /// Links `node` right after `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `node` is in a list, or an
    /// error if `reference` isn't in this one.
    pub fn add_after<S>(&mut self, nodes: &mut S, reference: NodeId, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        Self::check_unlinked(nodes, node)?;
        self.check_member(nodes, reference)?;
        let next = nodes.node(reference).next;
        self.link(nodes, node, Some(reference), next);
        Ok(())
    }

    /// Unlinks `node`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotLinked`] or [`ListError::ForeignList`] if
    /// `node` isn't in this list.
    pub fn remove<S>(&mut self, nodes: &mut S, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        self.check_member(nodes, node)?;

        let links = *nodes.node(node);
        match links.previous {
            Some(previous) => nodes.node_mut(previous).next = links.next,
            None => self.first = links.next,
        }
        match links.next {
            Some(next) => nodes.node_mut(next).previous = links.previous,
            None => self.last = links.previous,
        }
        *nodes.node_mut(node) = ListNode::new();
        self.count -= 1;

        trace!(list = self.id.0, node = node.0, "list node removed");
        Ok(())
    }

    /// Unlinks every node, then resets the list.
    pub fn clean<S>(&mut self, nodes: &mut S)
    where
        S: ListStorage + ?Sized,
    {
        let mut current = self.first;
        while let Some(node) = current {
            current = nodes.node(node).next;
            *nodes.node_mut(node) = ListNode::new();
        }
        *self = Self::new(self.id);
    }

    /// Iterates from head to tail.
    pub fn iter<'a, S>(&self, nodes: &'a S) -> impl Iterator<Item = NodeId> + 'a
    where
        S: ListStorage + ?Sized,
    {
        std::iter::successors(self.first, move |&node| nodes.node(node).next)
    }

    fn link<S>(&mut self, nodes: &mut S, node: NodeId, previous: Option<NodeId>, next: Option<NodeId>)
    where
        S: ListStorage + ?Sized,
    {
        *nodes.node_mut(node) = ListNode {
            list: Some(self.id),
            previous,
            next,
        };
        match previous {
            Some(previous) => nodes.node_mut(previous).next = Some(node),
            None => self.first = Some(node),
        }
        match next {
            Some(next) => nodes.node_mut(next).previous = Some(node),
            None => self.last = Some(node),
        }
        self.count += 1;

        trace!(list = self.id.0, node = node.0, "list node added");
    }

    fn check_unlinked<S>(nodes: &S, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        if nodes.node(node).is_linked() {
            warn!(node = node.0, "node is already in a list");
            return Err(ListError::AlreadyLinked);
        }
        Ok(())
    }

    fn check_member<S>(&self, nodes: &S, node: NodeId) -> ListResult<()>
    where
        S: ListStorage + ?Sized,
    {
        match nodes.node(node).list {
            Some(list) if list == self.id => Ok(()),
            Some(_) => {
                warn!(list = self.id.0, node = node.0, "node belongs to another list");
                Err(ListError::ForeignList)
            }
            None => {
                warn!(list = self.id.0, node = node.0, "node is not linked into a list");
                Err(ListError::NotLinked)
            }
        }
    }
}
