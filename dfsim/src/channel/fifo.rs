use std::collections::VecDeque;
use std::fmt;

use crate::process::ProcessId;
use crate::record::Record;

/// The capacity of a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Capacity {
    /// At most the given number of records can be stored.
    Bounded(usize),
    /// Puts never block.
    Unbounded,
}

impl Capacity {
    /// Checks whether a store holding `len` records has room for one more.
    pub fn admits(self, len: usize) -> bool {
        match self {
            Self::Bounded(capacity) => len < capacity,
            Self::Unbounded => true,
        }
    }

    /// Returns the bound, if any.
    pub fn bound(self) -> Option<usize> {
        match self {
            Self::Bounded(capacity) => Some(capacity),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(capacity) => write!(f, "{capacity}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Outcome of a put.
#[derive(Debug, PartialEq)]
pub(crate) enum PutOutcome {
    /// The record was handed directly to a process blocked on a get, which
    /// must be woken with it.
    HandedOff(ProcessId, Record),
    /// The record was appended to the store.
    Stored,
    /// The store is full and the putter was queued.
    Blocked,
}

/// Outcome of a get.
#[derive(Debug, PartialEq)]
pub(crate) enum GetOutcome {
    /// The oldest record was removed. If a putter was blocked, its record
    /// was admitted into the freed slot and the putter must be woken.
    Ready {
        record: Record,
        admitted: Option<ProcessId>,
    },
    /// The store is empty and the getter was queued.
    Blocked,
}

/// A FIFO record store with blocking semantics.
///
/// The store never holds more records than its capacity. A non-empty store
/// has no get-waiters and a store with room has no put-waiters.
#[derive(Debug)]
pub(crate) struct Fifo {
    capacity: Capacity,
    items: VecDeque<Record>,
    put_waiters: VecDeque<(ProcessId, Record)>,
    get_waiters: VecDeque<ProcessId>,
}

impl Fifo {
    pub(crate) fn new(capacity: Capacity) -> Self {
        Self {
            capacity,
            items: VecDeque::new(),
            put_waiters: VecDeque::new(),
            get_waiters: VecDeque::new(),
        }
    }

    pub(crate) fn put(&mut self, process: ProcessId, record: Record) -> PutOutcome {
        if let Some(getter) = self.get_waiters.pop_front() {
            debug_assert!(self.items.is_empty());

            return PutOutcome::HandedOff(getter, record);
        }

        if self.capacity.admits(self.items.len()) {
            self.items.push_back(record);

            PutOutcome::Stored
        } else {
            self.put_waiters.push_back((process, record));

            PutOutcome::Blocked
        }
    }

    pub(crate) fn get(&mut self, process: ProcessId) -> GetOutcome {
        let Some(record) = self.items.pop_front() else {
            self.get_waiters.push_back(process);

            return GetOutcome::Blocked;
        };

        let admitted = self.put_waiters.pop_front().map(|(putter, record)| {
            self.items.push_back(record);

            putter
        });

        GetOutcome::Ready { record, admitted }
    }

    pub(crate) fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn items(&self) -> impl Iterator<Item = &Record> {
        self.items.iter()
    }

    pub(crate) fn put_waiter_count(&self) -> usize {
        self.put_waiters.len()
    }

    pub(crate) fn get_waiter_count(&self) -> usize {
        self.get_waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SimTime;

    fn rec(id: &str) -> Record {
        Record::new(id, "test", SimTime::ZERO)
    }

    fn pid(id: usize) -> ProcessId {
        ProcessId::from_index(id)
    }

    #[test]
    fn fifo_order() {
        let mut fifo = Fifo::new(Capacity::Bounded(3));

        for id in ["a", "b", "c"] {
            assert_eq!(fifo.put(pid(0), rec(id)), PutOutcome::Stored);
        }
        for id in ["a", "b", "c"] {
            assert_eq!(
                fifo.get(pid(1)),
                GetOutcome::Ready {
                    record: rec(id),
                    admitted: None
                }
            );
        }
    }

    #[test]
    fn fifo_full_blocks_put_until_get() {
        let mut fifo = Fifo::new(Capacity::Bounded(1));

        assert_eq!(fifo.put(pid(0), rec("a")), PutOutcome::Stored);
        assert_eq!(fifo.put(pid(1), rec("b")), PutOutcome::Blocked);
        assert_eq!(fifo.put(pid(2), rec("c")), PutOutcome::Blocked);
        assert_eq!(fifo.len(), 1);
        assert_eq!(fifo.put_waiter_count(), 2);

        // Putters are admitted in FIFO order.
        assert_eq!(
            fifo.get(pid(3)),
            GetOutcome::Ready {
                record: rec("a"),
                admitted: Some(pid(1))
            }
        );
        assert_eq!(fifo.len(), 1);
        assert_eq!(
            fifo.get(pid(3)),
            GetOutcome::Ready {
                record: rec("b"),
                admitted: Some(pid(2))
            }
        );
        assert_eq!(
            fifo.get(pid(3)),
            GetOutcome::Ready {
                record: rec("c"),
                admitted: None
            }
        );
        assert_eq!(fifo.len(), 0);
    }

    #[test]
    fn fifo_empty_blocks_get_until_put() {
        let mut fifo = Fifo::new(Capacity::Bounded(2));

        assert_eq!(fifo.get(pid(0)), GetOutcome::Blocked);
        assert_eq!(fifo.get(pid(1)), GetOutcome::Blocked);
        assert_eq!(fifo.get_waiter_count(), 2);

        // Records bypass the store when a getter is waiting.
        assert_eq!(fifo.put(pid(2), rec("a")), PutOutcome::HandedOff(pid(0), rec("a")));
        assert_eq!(fifo.put(pid(2), rec("b")), PutOutcome::HandedOff(pid(1), rec("b")));
        assert_eq!(fifo.len(), 0);
        assert_eq!(fifo.put(pid(2), rec("c")), PutOutcome::Stored);
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn fifo_unbounded_never_blocks() {
        let mut fifo = Fifo::new(Capacity::Unbounded);

        for i in 0..1000 {
            assert_eq!(fifo.put(pid(0), rec(&i.to_string())), PutOutcome::Stored);
        }
        assert_eq!(fifo.len(), 1000);
        assert_eq!(fifo.capacity().bound(), None);
    }
}
