//! Capacity-limited resources with FIFO admission.

use std::collections::VecDeque;
use std::fmt;

use crate::process::ProcessId;

/// Unique identifier of a resource within a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(usize);

impl ResourceId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A pool of identical slots, such as the processing slots of a host.
///
/// A slot that is released while processes are waiting is handed to the
/// oldest waiter, so the number of slots in use never drops in that case.
#[derive(Debug)]
pub struct Resource {
    name: String,
    capacity: usize,
    in_use: usize,
    waiters: VecDeque<ProcessId>,
}

impl Resource {
    pub(crate) fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            in_use: 0,
            waiters: VecDeque::new(),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of processes waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Takes a slot if one is free, otherwise queues the process and returns
    /// `false`.
    pub(crate) fn acquire(&mut self, process: ProcessId) -> bool {
        if self.in_use < self.capacity {
            self.in_use += 1;

            true
        } else {
            self.waiters.push_back(process);

            false
        }
    }

    /// Releases a slot and returns the waiter it was handed to, if any.
    pub(crate) fn release(&mut self) -> Option<ProcessId> {
        debug_assert!(self.in_use > 0);

        let next = self.waiters.pop_front();
        if next.is_none() {
            self.in_use = self.in_use.saturating_sub(1);
        }

        next
    }
}
