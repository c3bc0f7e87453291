//! Bounded, duplicate-free cache of neighbor entries owned by one node.
use super::entry::Entry;
use crate::node::NodeId;

/// A node's view of the overlay.
///
/// Holds at most `capacity` entries, never two entries for the same peer,
/// and never an entry for its owner.
#[derive(Clone, Debug)]
pub struct View {
    owner: NodeId,
    capacity: usize,
    entries: Vec<Entry>,
}

impl View {
    pub fn new(owner: NodeId, capacity: usize) -> Self {
        Self {
            owner,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, peer: NodeId) -> bool {
        self.entries.iter().any(|e| e.peer() == peer)
    }

    /// Append a fresh entry for `peer`.
    ///
    /// Returns false without touching the view if the peer is already
    /// present, is the owner, or the view is full.
    pub fn try_add(&mut self, peer: NodeId) -> bool {
        if peer == self.owner || self.is_full() || self.contains(peer) {
            return false;
        }
        self.entries.push(Entry::new(peer));
        true
    }

    /// Callers must stay within `0..len()`.
    pub fn entry_at(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    pub(crate) fn entry_at_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }

    /// Remove the first entry for the same peer as `entry`.
    pub fn remove(&mut self, entry: &Entry) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e == entry)?;
        Some(self.entries.remove(index))
    }

    pub fn clear_all_sent_to(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.set_sent_to(None);
        }
    }

    /// Position of the oldest entry earmarked as offered to `target`.
    pub fn oldest_sent_to(&self, target: NodeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.sent_to() == Some(target))
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Entry {
        self.entries.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn peers(&self) -> Vec<NodeId> {
        self.entries.iter().map(|e| e.peer()).collect()
    }
}
