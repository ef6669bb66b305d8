// src/branch.rs

//! Ordered group of leaves sharing one bus segment.

use crate::common::address::XerxesAddr;
use crate::leaves::Node;
use crate::network::Channel;
use std::fmt;
use std::sync::Arc;

/// Leaves are polled in the order they were pushed. The branch holds shared
/// handles, so the caller keeps access to each leaf's readings.
pub struct Branch<C: Channel> {
    leaves: Vec<Arc<dyn Node<C>>>,
}

impl<C: Channel> Branch<C> {
    pub fn new() -> Self {
        Branch { leaves: Vec::new() }
    }

    pub fn push(&mut self, leaf: Arc<dyn Node<C>>) {
        self.leaves.push(leaf);
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Arc<dyn Node<C>>> {
        self.leaves.iter()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn addresses(&self) -> Vec<XerxesAddr> {
        self.leaves.iter().map(|leaf| leaf.address()).collect()
    }
}

impl<C: Channel> Default for Branch<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Channel> Clone for Branch<C> {
    fn clone(&self) -> Self {
        Branch { leaves: self.leaves.clone() }
    }
}

impl<C: Channel> fmt::Debug for Branch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch").field("leaves", &self.addresses()).finish()
    }
}

impl<C: Channel> FromIterator<Arc<dyn Node<C>>> for Branch<C> {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Node<C>>>>(iter: I) -> Self {
        Branch { leaves: iter.into_iter().collect() }
    }
}

impl<'a, C: Channel> IntoIterator for &'a Branch<C> {
    type Item = &'a Arc<dyn Node<C>>;
    type IntoIter = core::slice::Iter<'a, Arc<dyn Node<C>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaves.iter()
    }
}
