//! Stable priority queue.

use slab::Slab;

/// A container optimized for extraction of the value with the lowest key, with
/// same-key values extracted in insertion order.
///
/// Under the hood, the priority queue relies on a binary heap of small
/// `(key, sequence, slot)` items cross-indexed with values stored in a slab
/// allocator. Each heap item carries a unique sequence number assigned at
/// insertion time, which is what makes the ordering of same-key values
/// deterministic. Values are never moved from the moment they are inserted
/// until they are pulled, only the heap items are sifted.
///
/// The sequence number of a value is returned by [`pull`](Self::pull) so that
/// callers can observe the exact `(key, sequence)` order of extraction.
pub(crate) struct PriorityQueue<K, V>
where
    K: Copy + Ord,
{
    heap: Vec<Item<K>>,
    slab: Slab<V>,
    next_sequence: u64,
}

impl<K: Copy + Ord, V> PriorityQueue<K, V> {
    /// Creates an empty `PriorityQueue`.
    pub(crate) fn new() -> Self {
        Self {
            heap: Vec::new(),
            slab: Slab::new(),
            next_sequence: 0,
        }
    }

    /// Returns the number of key-value pairs in the priority queue.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Checks whether the queue is empty.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts a new key-value pair and returns its sequence number.
    ///
    /// This operation has *O*(log(*N*)) amortized worse-case theoretical
    /// complexity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> u64 {
        let sequence = self.next_sequence;
        assert_ne!(sequence, u64::MAX);
        self.next_sequence += 1;

        let slot = self.slab.insert(value);
        let item = Item {
            key: UniqueKey { key, sequence },
            slot,
        };

        // Add the item at the bottom of the heap and sift it up.
        let heap_idx = self.heap.len();
        self.heap.push(item);
        self.sift_up(item, heap_idx);

        sequence
    }

    /// Pulls the value with the lowest key together with its key and sequence
    /// number.
    ///
    /// If there are several equal lowest keys, the value which was inserted
    /// first is returned.
    ///
    /// This operation has *O*(log(N)) non-amortized theoretical complexity.
    pub(crate) fn pull(&mut self) -> Option<(K, u64, V)> {
        let top = *self.heap.first()?;
        let value = self.slab.remove(top.slot);

        // Sift the last item of the heap down from the top of the heap.
        if let Some(last_item) = self.heap.pop() {
            if !self.heap.is_empty() {
                self.sift_down(last_item, 0);
            }
        }

        Some((top.key.key, top.key.sequence, value))
    }

    /// Peeks a reference to the lowest key, leaving it in the queue.
    ///
    /// This operation has *O*(1) non-amortized theoretical complexity.
    pub(crate) fn peek_key(&self) -> Option<&K> {
        self.heap.first().map(|item| &item.key.key)
    }

    /// Take a heap item and, starting at `heap_idx`, move it up the heap while
    /// a parent has a larger key.
    #[inline]
    fn sift_up(&mut self, item: Item<K>, heap_idx: usize) {
        let mut child_heap_idx = heap_idx;

        while child_heap_idx != 0 {
            let parent_heap_idx = (child_heap_idx - 1) / 2;

            // Stop when the key is larger or equal to the parent's.
            if item.key >= self.heap[parent_heap_idx].key {
                break;
            }

            // Move the parent down one level.
            self.heap[child_heap_idx] = self.heap[parent_heap_idx];
            child_heap_idx = parent_heap_idx;
        }

        self.heap[child_heap_idx] = item;
    }

    /// Take a heap item and, starting at `heap_idx`, move it down the heap
    /// while a child has a smaller key.
    #[inline]
    fn sift_down(&mut self, item: Item<K>, heap_idx: usize) {
        let mut parent_heap_idx = heap_idx;
        let mut child_heap_idx = 2 * parent_heap_idx + 1;

        while child_heap_idx < self.heap.len() {
            // If the sibling exists and has a smaller key, make it the
            // candidate for swapping.
            if let Some(other_child) = self.heap.get(child_heap_idx + 1) {
                child_heap_idx += (self.heap[child_heap_idx].key > other_child.key) as usize;
            }

            // Stop when the key is smaller or equal to the child with the smallest key.
            if item.key <= self.heap[child_heap_idx].key {
                break;
            }

            // Move the child up one level.
            self.heap[parent_heap_idx] = self.heap[child_heap_idx];
            parent_heap_idx = child_heap_idx;
            child_heap_idx = 2 * parent_heap_idx + 1;
        }

        self.heap[parent_heap_idx] = item;
    }
}

/// A heap entry pointing to a slab-allocated value.
#[derive(Copy, Clone)]
struct Item<K: Copy> {
    key: UniqueKey<K>,
    slot: usize,
}

/// A unique key made of the user-provided key complemented by the insertion
/// sequence number.
///
/// Implementation note: `UniqueKey` derives `PartialOrd`, so the field order
/// must keep `key` ahead of `sequence`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UniqueKey<K: Copy> {
    key: K,
    sequence: u64,
}
