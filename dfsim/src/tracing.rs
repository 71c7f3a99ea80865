//! Support for structured logging.
//!
//! # Overview
//!
//! Each resumption of a process by the scheduler is wrapped in a
//! [`tracing::Span`] with the following metadata:
//!
//! - name: `process`,
//! - target: `dfsim::simulation`,
//! - verbosity level: [`Level::INFO`](tracing::Level::INFO),
//! - a unique field called `name`, associated to the process name provided in
//!   [`Simulation::spawn`](crate::simulation::Simulation::spawn).
//!
//! Processes created by the network builder are named after their node, with
//! a `.p<N>` suffix for the instruments of a source with several outgoing
//! pipes. The monitor process is named `monitor`.
//!
//! By default, the [`tracing_subscriber::fmt`][mod@tracing_subscriber::fmt]
//! subscriber stamps events with the wall clock time. This module provides a
//! [`SimulationTime`] timer which stamps events emitted while the scheduler
//! runs with the simulation time instead:
//!
//! ```
//! use dfsim::tracing::SimulationTime;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!     .with_timer(SimulationTime::with_system_timer())
//!     .init();
//! ```
//!
//! Events emitted outside the scheduler fall back to the system timer:
//!
//! ```text
//! [12.000000]  WARN process{name="cal"}: dfsim::network::action: action failed, record dropped record="src.id2"
//! 2024-09-10T14:39:24.670921Z  INFO dfsim: simulation completed
//! ```
//!
//! # Event filtering examples
//!
//! Only let warnings through, but keep the process span information:
//!
//! ```text
//! $ RUST_LOG="warn,[process]=info" dfsim graph.yaml -
//! ```
//!
//! Follow the records handled by a single node:
//!
//! ```text
//! $ RUST_LOG="[process{name=cal}]=debug" dfsim graph.yaml -
//! ```

use std::cell::Cell;
use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

use crate::time::SimTime;

thread_local! {
    static CURRENT_TIME: Cell<Option<SimTime>> = const { Cell::new(None) };
}

/// Publishes the simulation time to the [`SimulationTime`] timer of the
/// current thread until dropped.
pub(crate) struct TimeScope {
    previous: Option<SimTime>,
}

impl TimeScope {
    pub(crate) fn enter(time: SimTime) -> Self {
        Self {
            previous: CURRENT_TIME.with(|t| t.replace(Some(time))),
        }
    }

    pub(crate) fn update(&self, time: SimTime) {
        CURRENT_TIME.with(|t| t.set(Some(time)));
    }
}

impl Drop for TimeScope {
    fn drop(&mut self) {
        CURRENT_TIME.with(|t| t.set(self.previous));
    }
}

/// Returns the simulation time published by the scheduler running on this
/// thread, if any.
pub fn current_time() -> Option<SimTime> {
    CURRENT_TIME.with(Cell::get)
}

/// A timer that can be used in conjunction with the
/// [`tracing-subscriber`][tracing_subscriber] crate to log events using the
/// simulation time instead of (or on top of) the wall clock time.
///
/// See the [module-level documentation][crate::tracing] for more details.
#[derive(Default, Debug)]
pub struct SimulationTime<T> {
    sys_timer: T,
}

impl SimulationTime<SystemTime> {
    /// Constructs a new simulation timer which falls back to the [`SystemTime`]
    /// timer for events generated outside the scheduler.
    pub fn with_system_timer() -> Self {
        Self::default()
    }
}

impl<T: FormatTime> SimulationTime<T> {
    /// Constructs a new simulation timer which falls back to the provided
    /// timer for tracing events generated outside the scheduler.
    pub fn with_custom_timer(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<T: FormatTime> FormatTime for SimulationTime<T> {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match current_time() {
            Some(time) => write!(w, "[{time:.6}]"),
            None => self.sys_timer.format_time(w),
        }
    }
}
