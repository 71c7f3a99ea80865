//! Metric samples and sinks.
//!
//! The monitor reports channel occupancy as [`Sample`]s through the
//! [`MetricsSink`] trait. Two sinks are provided:
//!
//! * [`LineWriter`], which writes samples in the plain-text line protocol
//!   `<metric-path> <value> <unix-timestamp>` to any [`io::Write`],
//! * [`MetricsBuffer`], an in-memory buffer whose [`MetricsBufferWriter`]
//!   handle can be handed to a network while the buffer itself is kept for
//!   reading the samples back.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A single metric observation.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Dot-separated metric path, such as `dataq.host1.queue2`.
    pub path: String,
    /// Observed value.
    pub value: f64,
    /// Unix timestamp of the observation, in seconds.
    pub timestamp: u64,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.value, self.timestamp)
    }
}

/// A destination for metric samples.
pub trait MetricsSink {
    /// Records a sample.
    fn record(&mut self, sample: &Sample) -> io::Result<()>;

    /// Flushes buffered samples, if any.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn record(&mut self, sample: &Sample) -> io::Result<()> {
        (**self).record(sample)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// A sink writing one line per sample.
#[derive(Debug)]
pub struct LineWriter<W: Write> {
    writer: W,
}

impl<W: Write> LineWriter<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MetricsSink for LineWriter<W> {
    fn record(&mut self, sample: &Sample) -> io::Result<()> {
        writeln!(self.writer, "{sample}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A shared, bounded in-memory sample buffer.
///
/// If the maximum capacity is exceeded, older samples are overwritten.
/// Samples are returned in first-in-first-out order. Note that even if the
/// iterator returns `None`, it may still produce more items in the future (in
/// other words, it is not a [`FusedIterator`](std::iter::FusedIterator)).
pub struct MetricsBuffer {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: usize,
    buffer: Mutex<VecDeque<Sample>>,
}

impl MetricsBuffer {
    /// Default capacity when constructed with `new`.
    pub const DEFAULT_CAPACITY: usize = 1 << 16;

    /// Creates a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a buffer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                buffer: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Returns a producer handle to the buffer.
    pub fn writer(&self) -> MetricsBufferWriter {
        MetricsBufferWriter {
            inner: self.inner.clone(),
        }
    }

    /// Returns the number of buffered samples.
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().unwrap().len()
    }

    /// Checks whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for MetricsBuffer {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.buffer.lock().unwrap().pop_front()
    }
}

impl Default for MetricsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsBuffer").finish_non_exhaustive()
    }
}

/// A producer handle of a [`MetricsBuffer`].
#[derive(Clone)]
pub struct MetricsBufferWriter {
    inner: Arc<Inner>,
}

impl MetricsSink for MetricsBufferWriter {
    fn record(&mut self, sample: &Sample) -> io::Result<()> {
        let mut buffer = self.inner.buffer.lock().unwrap();
        if buffer.len() == self.inner.capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample.clone());

        Ok(())
    }
}

impl fmt::Debug for MetricsBufferWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsBufferWriter").finish_non_exhaustive()
    }
}
