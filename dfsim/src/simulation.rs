//! Discrete-event simulation management.
//!
//! This module contains most notably the [`Simulation`] scheduler, which owns
//! the event queue, the processes, the channels and the resources of a
//! simulation, together with the random number generator used for every
//! random draw.
//!
//! # Simulation lifecycle
//!
//! 1. creation of a [`Simulation`] with a seed,
//! 2. creation of the channels and resources with [`Simulation::add_channel`]
//!    and [`Simulation::add_resource`],
//! 3. registration of the processes with [`Simulation::spawn`], which
//!    schedules their first resumption at the current simulation time,
//! 4. discrete-event simulation with [`Simulation::run`] or
//!    [`Simulation::step`].
//!
//! Networks described by a graph are normally assembled with the
//! [`NetworkBuilder`](crate::network::NetworkBuilder) rather than by hand.
//!
//! # Determinism
//!
//! Events are processed in `(time, sequence)` order, where the sequence is a
//! counter incremented at each insertion in the event queue. Wake-ups caused
//! by a put, a get or a resource release are scheduled at the current time in
//! the order they occurred. Given the same seed and the same sequence of
//! process creations, two runs therefore yield identical event orderings and
//! channel contents.
//!
//! # Blocked processes
//!
//! There is no cancellation: a process blocked on a channel or a resource
//! remains blocked until it is woken by another process, or forever if the
//! simulation reaches its horizon first. Processes which loop forever on
//! timeouts are simply abandoned at the horizon.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info_span, trace};

use crate::channel::{Capacity, Channel, ChannelId, GetOutcome, PutOutcome};
use crate::process::{
    Context, Process, ProcessId, ProcessState, Resume, Suspend, SuspendReason,
};
use crate::resource::{Resource, ResourceId};
use crate::time::SimTime;
use crate::tracing::TimeScope;
use crate::util::priority_queue::PriorityQueue;

/// The random number generator owned by a simulation.
pub type SimRng = ChaCha8Rng;

/// A scheduled resumption.
#[derive(Debug)]
struct Wakeup {
    process: ProcessId,
    resume: Resume,
}

struct ProcessSlot {
    name: String,
    state: ProcessState,
    body: Option<Box<dyn Process>>,
}

/// Simulation environment.
///
/// A `Simulation` is a single-threaded cooperative scheduler: processes are
/// resumed one at a time in event order and run until they suspend.
pub struct Simulation {
    time: SimTime,
    queue: PriorityQueue<SimTime, Wakeup>,
    processes: Vec<ProcessSlot>,
    channels: Vec<Channel>,
    resources: Vec<Resource>,
    rng: SimRng,
    wakeups: Vec<(ProcessId, Resume)>,
    events_processed: u64,
}

impl Simulation {
    /// Creates an empty simulation at time zero.
    pub fn new(seed: u64) -> Self {
        Self {
            time: SimTime::ZERO,
            queue: PriorityQueue::new(),
            processes: Vec::new(),
            channels: Vec::new(),
            resources: Vec::new(),
            rng: SimRng::seed_from_u64(seed),
            wakeups: Vec::new(),
            events_processed: 0,
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Creates a channel.
    pub fn add_channel(
        &mut self,
        name: impl Into<String>,
        host: impl Into<String>,
        capacity: Capacity,
    ) -> ChannelId {
        let id = ChannelId::from_index(self.channels.len());
        self.channels.push(Channel::new(name, host, capacity));

        id
    }

    /// Creates a resource with the given number of slots.
    pub fn add_resource(&mut self, name: impl Into<String>, capacity: usize) -> ResourceId {
        let id = ResourceId::from_index(self.resources.len());
        self.resources.push(Resource::new(name, capacity));

        id
    }

    /// Registers a process and schedules its first resumption at the current
    /// simulation time.
    pub fn spawn(&mut self, name: impl Into<String>, process: impl Process + 'static) -> ProcessId {
        let id = ProcessId::from_index(self.processes.len());
        self.processes.push(ProcessSlot {
            name: name.into(),
            state: ProcessState::Runnable,
            body: Some(Box::new(process)),
        });
        self.queue.insert(
            self.time,
            Wakeup {
                process: id,
                resume: Resume::Start,
            },
        );

        id
    }

    /// Schedules a timeout resumption of a process `delay` seconds from now.
    ///
    /// The delay must be finite and non-negative.
    pub fn schedule_timeout(
        &mut self,
        delay: f64,
        process: ProcessId,
    ) -> Result<(), SimulationError> {
        if process.index() >= self.processes.len() {
            return Err(SimulationError::UnknownProcess(process));
        }
        let deadline = self
            .time
            .checked_add(delay)
            .ok_or(SimulationError::InvalidDelay { delay })?;

        self.queue.insert(
            deadline,
            Wakeup {
                process,
                resume: Resume::Timeout,
            },
        );

        Ok(())
    }

    /// Processes the earliest pending event, if any.
    ///
    /// Returns `false` if the event queue was empty.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        let Some(&next) = self.queue.peek_key() else {
            return Ok(false);
        };

        let _scope = TimeScope::enter(next);
        self.process_next()?;

        Ok(true)
    }

    /// Processes events in order until the event queue is empty or the next
    /// event is scheduled later than `until`.
    ///
    /// Events scheduled after `until` are left in the queue, so the
    /// simulation can be continued with another call. On success, the
    /// simulation time is advanced to `until`, unless `until` is
    /// [`SimTime::MAX`] or lies in the past.
    ///
    /// If a process fails, the run stops at the time of the failing event
    /// and the error is returned.
    pub fn run(&mut self, until: SimTime) -> Result<(), SimulationError> {
        let scope = TimeScope::enter(self.time);

        while let Some(&next) = self.queue.peek_key() {
            if next > until {
                break;
            }
            scope.update(next);
            self.process_next()?;
        }

        if until != SimTime::MAX && until > self.time {
            self.time = until;
        }

        Ok(())
    }

    /// Returns a channel.
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.index())
    }

    /// Returns all channels in creation order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Samples the length of a channel, updating its high-water mark.
    pub fn sample_channel(&mut self, id: ChannelId) -> Option<usize> {
        self.channels.get_mut(id.index()).map(Channel::sample)
    }

    /// Returns a resource.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Returns the scheduling state of a process.
    pub fn process_state(&self, id: ProcessId) -> Option<ProcessState> {
        self.processes.get(id.index()).map(|slot| slot.state)
    }

    /// Returns the name of a process.
    pub fn process_name(&self, id: ProcessId) -> Option<&str> {
        self.processes.get(id.index()).map(|slot| slot.name.as_str())
    }

    /// Returns the number of spawned processes, including terminated ones.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Returns the number of events waiting in the event queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Returns the number of events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Pulls the earliest event and resumes its process.
    fn process_next(&mut self) -> Result<(), SimulationError> {
        let Some((time, sequence, wakeup)) = self.queue.pull() else {
            return Ok(());
        };
        self.time = time;
        self.events_processed += 1;
        trace!(time = %time, sequence, process = %wakeup.process, "processing event");

        self.drive(wakeup.process, wakeup.resume)
    }

    /// Resumes a process and completes its non-blocking operations until it
    /// suspends, terminates or fails.
    fn drive(&mut self, id: ProcessId, mut resume: Resume) -> Result<(), SimulationError> {
        let slot = self
            .processes
            .get_mut(id.index())
            .ok_or(SimulationError::UnknownProcess(id))?;
        let Some(mut body) = slot.body.take() else {
            return Ok(());
        };
        slot.state = ProcessState::Runnable;

        let span = info_span!("process", name = %slot.name);
        let _enter = span.enter();

        let result = loop {
            trace!(?resume, "resuming");
            let mut cx = Context {
                now: self.time,
                process: id,
                rng: &mut self.rng,
                channels: &mut self.channels,
                resources: &mut self.resources,
                wakeups: &mut self.wakeups,
            };
            let suspend = match body.resume(&mut cx, resume) {
                Ok(suspend) => suspend,
                Err(e) => break Err(e),
            };

            match suspend {
                Suspend::Timeout(delay) => {
                    break self
                        .schedule_timeout(delay, id)
                        .map(|_| ProcessState::Suspended(SuspendReason::WaitingOnTimeout));
                }
                Suspend::Get(channel) => {
                    let Some(ch) = self.channels.get_mut(channel.index()) else {
                        break Err(SimulationError::UnknownChannel(channel));
                    };
                    match ch.get(id) {
                        GetOutcome::Ready { record, admitted } => {
                            if let Some(putter) = admitted {
                                self.wakeups.push((putter, Resume::Put));
                            }
                            resume = Resume::Got(record);
                        }
                        GetOutcome::Blocked => {
                            break Ok(ProcessState::Suspended(SuspendReason::WaitingOnGet(
                                channel,
                            )));
                        }
                    }
                }
                Suspend::Put(channel, record) => {
                    let Some(ch) = self.channels.get_mut(channel.index()) else {
                        break Err(SimulationError::UnknownChannel(channel));
                    };
                    match ch.put(id, record) {
                        PutOutcome::HandedOff(getter, record) => {
                            self.wakeups.push((getter, Resume::Got(record)));
                            resume = Resume::Put;
                        }
                        PutOutcome::Stored => resume = Resume::Put,
                        PutOutcome::Blocked => {
                            break Ok(ProcessState::Suspended(SuspendReason::WaitingOnPut(
                                channel,
                            )));
                        }
                    }
                }
                Suspend::Acquire(resource) => {
                    let Some(res) = self.resources.get_mut(resource.index()) else {
                        break Err(SimulationError::UnknownResource(resource));
                    };
                    if res.acquire(id) {
                        resume = Resume::Acquired;
                    } else {
                        break Ok(ProcessState::Suspended(SuspendReason::WaitingOnAcquire(
                            resource,
                        )));
                    }
                }
                Suspend::Done => break Ok(ProcessState::Done),
            }
        };

        // Processes woken up by this turn run at the current time, after the
        // events already scheduled for it.
        for (process, resume) in self.wakeups.drain(..) {
            self.queue.insert(self.time, Wakeup { process, resume });
        }

        let slot = &mut self.processes[id.index()];
        match result {
            Ok(state) => {
                slot.state = state;
                if state != ProcessState::Done {
                    slot.body = Some(body);
                } else {
                    trace!("process terminated");
                }

                Ok(())
            }
            Err(e) => {
                slot.state = ProcessState::Done;

                Err(e)
            }
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time)
            .field("processes", &self.processes.len())
            .field("channels", &self.channels.len())
            .field("resources", &self.resources.len())
            .field("pending_events", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// An error returned when a simulation cannot proceed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A timeout was requested with a negative or non-finite delay, or a
    /// delay that overflows the simulation time.
    #[error("invalid delay: {delay}")]
    InvalidDelay {
        /// The requested delay.
        delay: f64,
    },
    /// The simulated transformation of an action failed.
    #[error("action `{action_name}` failed on node `{node}`")]
    ActionExecutionFailed {
        /// Name of the transformation.
        action_name: String,
        /// Id of the action node.
        node: String,
    },
    /// The process does not belong to this simulation.
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    /// The channel does not belong to this simulation.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),
    /// The resource does not belong to this simulation.
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
}
