//! Resumable processes and their execution context.
//!
//! A process is a state machine driven by the scheduler. Each time it is
//! resumed, it performs some work and returns a [`Suspend`] value describing
//! the operation it waits on. Operations that can complete immediately (a get
//! on a non-empty channel, a put on a channel with room, an acquisition of a
//! free resource) are completed by the scheduler within the same turn, and the
//! process is resumed again right away with the outcome.
//!
//! # Example
//!
//! A process which moves records from one channel to another, one record per
//! second:
//!
//! ```
//! use dfsim::channel::{Capacity, ChannelId};
//! use dfsim::process::{Context, Process, Resume, Suspend};
//! use dfsim::record::Record;
//! use dfsim::simulation::{Simulation, SimulationError};
//!
//! struct Mover {
//!     input: ChannelId,
//!     output: ChannelId,
//!     holding: Option<Record>,
//! }
//!
//! impl Process for Mover {
//!     fn resume(
//!         &mut self,
//!         _: &mut Context<'_>,
//!         resume: Resume,
//!     ) -> Result<Suspend, SimulationError> {
//!         Ok(match resume {
//!             Resume::Start | Resume::Put => Suspend::Get(self.input),
//!             Resume::Got(record) => {
//!                 self.holding = Some(record);
//!                 Suspend::Timeout(1.0)
//!             }
//!             Resume::Timeout => match self.holding.take() {
//!                 Some(record) => Suspend::Put(self.output, record),
//!                 None => Suspend::Done,
//!             },
//!             Resume::Acquired => Suspend::Done,
//!         })
//!     }
//! }
//!
//! let mut simulation = Simulation::new(0);
//! let input = simulation.add_channel("in", "h1", Capacity::Unbounded);
//! let output = simulation.add_channel("out", "h1", Capacity::Unbounded);
//! simulation.spawn("mover", Mover { input, output, holding: None });
//! ```

use std::fmt;

use crate::channel::{Channel, ChannelId};
use crate::record::Record;
use crate::resource::{Resource, ResourceId};
use crate::simulation::{SimRng, SimulationError};
use crate::time::SimTime;

/// Unique identifier of a process within a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(usize);

impl ProcessId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The operation a process suspends on.
#[derive(Clone, Debug, PartialEq)]
pub enum Suspend {
    /// Wait for the given number of seconds.
    Timeout(f64),
    /// Take the oldest record of a channel.
    Get(ChannelId),
    /// Append a record to a channel.
    Put(ChannelId, Record),
    /// Take a slot of a resource.
    Acquire(ResourceId),
    /// Terminate the process.
    Done,
}

/// The value a process is resumed with.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    /// First resumption after the process was spawned.
    Start,
    /// The requested timeout has elapsed.
    Timeout,
    /// The requested get has completed with this record.
    Got(Record),
    /// The requested put has completed.
    Put,
    /// A slot of the requested resource is now held by the process.
    Acquired,
}

/// The reason why a process is suspended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SuspendReason {
    /// Waiting for a timeout.
    WaitingOnTimeout,
    /// Blocked on a get from an empty channel.
    WaitingOnGet(ChannelId),
    /// Blocked on a put to a full channel.
    WaitingOnPut(ChannelId),
    /// Blocked on the acquisition of a busy resource.
    WaitingOnAcquire(ResourceId),
}

/// The scheduling state of a process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// The process has a pending resumption.
    Runnable,
    /// The process waits on an operation.
    Suspended(SuspendReason),
    /// The process has terminated and its body was dropped.
    Done,
}

/// A suspendable unit of work driven by the scheduler.
pub trait Process {
    /// Resumes the process with the outcome of its last suspension.
    ///
    /// Returning an error halts the simulation.
    fn resume(&mut self, cx: &mut Context<'_>, resume: Resume) -> Result<Suspend, SimulationError>;
}

impl fmt::Debug for dyn Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process").finish_non_exhaustive()
    }
}

/// The part of the simulation state visible to a process being resumed.
pub struct Context<'a> {
    pub(crate) now: SimTime,
    pub(crate) process: ProcessId,
    pub(crate) rng: &'a mut SimRng,
    pub(crate) channels: &'a mut [Channel],
    pub(crate) resources: &'a mut [Resource],
    pub(crate) wakeups: &'a mut Vec<(ProcessId, Resume)>,
}

impl<'a> Context<'a> {
    /// Returns the current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Returns the random number generator of the simulation.
    ///
    /// All random draws must go through this generator for runs to be
    /// reproducible.
    pub fn rng(&mut self) -> &mut SimRng {
        self.rng
    }

    /// Returns a read-only view of a channel.
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.index())
    }

    /// Samples the length of a channel, updating its high-water mark.
    pub fn sample_channel(&mut self, id: ChannelId) -> Option<usize> {
        self.channels.get_mut(id.index()).map(Channel::sample)
    }

    /// Releases a slot of a resource held by the process.
    ///
    /// If processes are waiting on the resource, the oldest one takes over
    /// the slot and is resumed at the current time.
    pub fn release(&mut self, id: ResourceId) -> Result<(), SimulationError> {
        let resource = self
            .resources
            .get_mut(id.index())
            .ok_or(SimulationError::UnknownResource(id))?;

        if let Some(next) = resource.release() {
            self.wakeups.push((next, Resume::Acquired));
        }

        Ok(())
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("now", &self.now)
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}
