//! Simulation time, delays and cron-like triggers.
//!
//! This module provides most notably:
//!
//! * [`SimTime`]: a non-negative timestamp expressed in virtual seconds,
//! * [`Delay`]: a fixed or uniformly distributed delay specification,
//! * [`CronSpec`]: a minimal two-field `"<minute> <hour>"` trigger expression.
//!
//! # Examples
//!
//! ```
//! use dfsim::time::{CronSpec, SimTime};
//!
//! // Fire every 10 minutes, at any hour.
//! let cron: CronSpec = "*/10 *".parse().unwrap();
//!
//! // 7 minutes into the simulation, the next trigger is 3 minutes away.
//! let now = SimTime::from_secs(7.0 * 60.0).unwrap();
//! assert_eq!(cron.next_offset(now), 180.0);
//! ```

mod cron;
mod delay;

use std::cmp::Ordering;
use std::fmt;

pub use cron::{CronField, CronParseError, CronSpec};
pub use delay::{Delay, DelayError};

/// A non-negative simulation timestamp, in virtual seconds.
///
/// Timestamps are always finite, which makes it possible to give them a total
/// order and use them as event queue keys.
#[derive(Copy, Clone, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: Self = Self(0.0);
    /// The largest representable timestamp.
    pub const MAX: Self = Self(f64::MAX);

    /// Creates a timestamp from a number of seconds.
    ///
    /// Returns `None` if `secs` is negative, infinite or NaN.
    pub fn from_secs(secs: f64) -> Option<Self> {
        if secs.is_finite() && secs >= 0.0 {
            // Adding positive zero normalizes a negative zero.
            Some(Self(secs + 0.0))
        } else {
            None
        }
    }

    /// Returns the timestamp in seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Returns the timestamp shifted by `delay` seconds.
    ///
    /// Returns `None` if the delay is negative, not finite, or if the result
    /// would overflow.
    pub fn checked_add(self, delay: f64) -> Option<Self> {
        if !(delay.is_finite() && delay >= 0.0) {
            return None;
        }

        Self::from_secs(self.0 + delay)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for SimTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({})", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(precision) => write!(f, "{:.*}", precision, self.0),
            None => write!(f, "{:.3}", self.0),
        }
    }
}
