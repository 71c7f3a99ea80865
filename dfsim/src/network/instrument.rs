use tracing::debug;

use crate::channel::ChannelId;
use crate::process::{Context, Process, Resume, Suspend};
use crate::record::Record;
use crate::simulation::SimulationError;
use crate::time::Delay;

/// Process emitting records into one outgoing pipe of a source node.
///
/// Each record is emitted after an inter-arrival delay. Record ids are
/// `<label>.id<N>`, with `N` counting from 0.
pub(crate) struct Instrument {
    label: String,
    origin: String,
    output: ChannelId,
    interval: Delay,
    remaining: Option<u64>,
    emitted: u64,
}

impl Instrument {
    pub(crate) fn new(
        label: String,
        origin: String,
        output: ChannelId,
        interval: Delay,
        count: Option<u64>,
    ) -> Self {
        Self {
            label,
            origin,
            output,
            interval,
            remaining: count,
            emitted: 0,
        }
    }
}

impl Process for Instrument {
    fn resume(&mut self, cx: &mut Context<'_>, resume: Resume) -> Result<Suspend, SimulationError> {
        if let Resume::Timeout = resume {
            let record = Record::new(
                format!("{}.id{}", self.label, self.emitted),
                self.origin.as_str(),
                cx.now(),
            );
            self.emitted += 1;
            if let Some(remaining) = &mut self.remaining {
                *remaining -= 1;
            }
            debug!(record = %record, "record generated");

            return Ok(Suspend::Put(self.output, record));
        }

        if self.remaining == Some(0) {
            debug!(emitted = self.emitted, "instrument exhausted");
            return Ok(Suspend::Done);
        }

        Ok(Suspend::Timeout(self.interval.sample(cx.rng())))
    }
}
