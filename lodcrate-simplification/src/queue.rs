//! Cost-ordered collapse queues

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use priority_queue::PriorityQueue;

use crate::config::QueueStrategy;
use crate::edge_registry::EdgeId;

/// A queued collapse candidate.
#[derive(Debug, Clone, Copy)]
pub struct QueueEntry {
    pub edge: EdgeId,
    pub cost: f64,
    /// Edge generation at the time of queuing
    pub generation: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first, ties broken by lowest edge id
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

/// Min-priority queue of collapse candidates.
pub trait CollapseQueue: Send {
    /// Queue a candidate, superseding any earlier entry for the same edge.
    fn push(&mut self, entry: QueueEntry);

    /// Remove the cheapest entry. May return superseded entries.
    fn pop(&mut self) -> Option<QueueEntry>;

    /// Drop an edge from the queue if the implementation supports it.
    fn remove(&mut self, edge: EdgeId);

    /// Entries currently held, superseded ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary heap with lazy deletion: superseded entries stay until popped.
#[derive(Debug, Default)]
pub struct LazyQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl CollapseQueue for LazyQueue {
    fn push(&mut self, entry: QueueEntry) {
        self.heap.push(entry);
    }

    fn pop(&mut self) -> Option<QueueEntry> {
        self.heap.pop()
    }

    fn remove(&mut self, _edge: EdgeId) {}

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Indexed heap holding at most one entry per edge.
#[derive(Debug, Default)]
pub struct IndexedQueue {
    queue: PriorityQueue<EdgeId, QueueEntry>,
}

impl CollapseQueue for IndexedQueue {
    fn push(&mut self, entry: QueueEntry) {
        // Updates the priority in place when the edge is already queued
        self.queue.push(entry.edge, entry);
    }

    fn pop(&mut self) -> Option<QueueEntry> {
        self.queue.pop().map(|(_, entry)| entry)
    }

    fn remove(&mut self, edge: EdgeId) {
        self.queue.remove(&edge);
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

pub fn new_queue(strategy: QueueStrategy) -> Box<dyn CollapseQueue> {
    match strategy {
        QueueStrategy::Indexed => Box::new(IndexedQueue::default()),
        QueueStrategy::Lazy => Box::new(LazyQueue::default()),
    }
}
