//! Bounded FIFO channels connecting the processes of a network.
//!
//! A [`Channel`] decorates a raw FIFO record store with the counters reported
//! by the monitor and by the end-of-run summary. Channels are owned by the
//! [`Simulation`](crate::simulation::Simulation) and are only mutated through
//! the puts and gets issued by processes.

mod fifo;

use std::fmt;

pub use fifo::Capacity;
pub(crate) use fifo::{Fifo, GetOutcome, PutOutcome};

use crate::process::ProcessId;
use crate::record::Record;

/// Unique identifier of a channel within a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(usize);

impl ChannelId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An instrumented FIFO channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    host: String,
    fifo: Fifo,
    put_count: u64,
    get_count: u64,
    high_water: usize,
    peak_len: usize,
}

impl Channel {
    pub(crate) fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        capacity: Capacity,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            fifo: Fifo::new(capacity),
            put_count: 0,
            get_count: 0,
            high_water: 0,
            peak_len: 0,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host to which the channel is attached.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Channel capacity.
    pub fn capacity(&self) -> Capacity {
        self.fifo.capacity()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    /// Checks whether the channel stores no record.
    pub fn is_empty(&self) -> bool {
        self.fifo.len() == 0
    }

    /// Number of records that were successfully put into the channel,
    /// including records handed directly to a waiting getter.
    pub fn put_count(&self) -> u64 {
        self.put_count
    }

    /// Number of records that were successfully taken from the channel.
    pub fn get_count(&self) -> u64 {
        self.get_count
    }

    /// Largest length observed at a sampling instant.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Largest length ever reached.
    pub fn peak_len(&self) -> usize {
        self.peak_len
    }

    /// Number of processes blocked on a put.
    pub fn blocked_putters(&self) -> usize {
        self.fifo.put_waiter_count()
    }

    /// Number of processes blocked on a get.
    pub fn blocked_getters(&self) -> usize {
        self.fifo.get_waiter_count()
    }

    /// Iterator over the stored records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.fifo.items()
    }

    /// Path under which the channel occupancy is reported.
    pub fn metric_path(&self) -> String {
        format!("dataq.{}.{}", self.host, self.name)
    }

    pub(crate) fn put(&mut self, process: ProcessId, record: Record) -> PutOutcome {
        let outcome = self.fifo.put(process, record);
        match outcome {
            PutOutcome::HandedOff(..) => {
                self.put_count += 1;
                self.get_count += 1;
            }
            PutOutcome::Stored => {
                self.put_count += 1;
                self.peak_len = self.peak_len.max(self.fifo.len());
            }
            PutOutcome::Blocked => {}
        }

        outcome
    }

    pub(crate) fn get(&mut self, process: ProcessId) -> GetOutcome {
        let outcome = self.fifo.get(process);
        if let GetOutcome::Ready { admitted, .. } = &outcome {
            self.get_count += 1;
            if admitted.is_some() {
                self.put_count += 1;
            }
        }

        outcome
    }

    /// Records a sampling instant and returns the current length.
    pub(crate) fn sample(&mut self) -> usize {
        let len = self.fifo.len();
        self.high_water = self.high_water.max(len);

        len
    }
}
