// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;
use core::slice;

use super::id::NodeId;
use super::tree::NodeTree;

/// An iterator over the active children of a node, in order.
///
/// Disappearing children are not yielded. Created by [`NodeTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a NodeTree,
    inner: slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a NodeTree, children: &'a [u32]) -> Self {
        Self {
            tree,
            inner: children.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.inner.next().map(|&idx| self.tree.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.inner.next_back().map(|&idx| self.tree.id_at(idx))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// A pre-order walk over a subtree, including its root.
///
/// Disappearing children are visited after the active children of their
/// parent. Created by [`NodeTree::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a NodeTree,
    stack: Vec<u32>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(tree: &'a NodeTree, root: Option<u32>) -> Self {
        Self {
            tree,
            stack: root.into_iter().collect(),
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let idx = self.stack.pop()?;
        let i = idx as usize;
        self.stack
            .extend(self.tree.disappearing[i].iter().rev().map(|&(d, _)| d));
        self.stack.extend(self.tree.children[i].iter().rev());
        Some(self.tree.id_at(idx))
    }
}
