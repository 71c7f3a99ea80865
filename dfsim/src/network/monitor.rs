use tracing::{debug, warn};

use crate::channel::ChannelId;
use crate::metrics::{MetricsSink, Sample};
use crate::process::{Context, Process, Resume, Suspend};
use crate::simulation::SimulationError;

/// Process periodically reporting the occupancy of channels.
pub(crate) struct Monitor {
    channels: Vec<ChannelId>,
    interval: f64,
    epoch: u64,
    sink: Box<dyn MetricsSink>,
}

impl Monitor {
    pub(crate) fn new(
        channels: Vec<ChannelId>,
        interval: f64,
        epoch: u64,
        sink: Box<dyn MetricsSink>,
    ) -> Self {
        Self {
            channels,
            interval,
            epoch,
            sink,
        }
    }

    fn report(&mut self, cx: &mut Context<'_>) -> std::io::Result<()> {
        let timestamp = self.epoch + cx.now().as_secs() as u64;

        for &id in &self.channels {
            let Some(len) = cx.sample_channel(id) else {
                continue;
            };
            let path = cx.channel(id).map(|c| c.metric_path()).unwrap_or_default();
            debug!(%path, len, "channel sampled");

            self.sink.record(&Sample {
                path,
                value: len as f64,
                timestamp,
            })?;
        }

        self.sink.flush()
    }
}

impl Process for Monitor {
    fn resume(&mut self, cx: &mut Context<'_>, resume: Resume) -> Result<Suspend, SimulationError> {
        if let Resume::Timeout = resume {
            if let Err(e) = self.report(cx) {
                warn!(error = %e, "metrics sink failed, monitor stopped");
                return Ok(Suspend::Done);
            }
        }

        Ok(Suspend::Timeout(self.interval))
    }
}
