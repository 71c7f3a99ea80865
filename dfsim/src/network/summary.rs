use std::fmt;

use serde::Serialize;

const BANNER_WIDTH: usize = 55;

/// Final state of a channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelSummary {
    /// Channel name.
    pub name: String,
    /// Host to which the channel is attached.
    pub host: String,
    /// Channel capacity, or `None` if unbounded.
    pub capacity: Option<usize>,
    /// Final number of stored records.
    pub len: usize,
    /// Number of records put into the channel.
    pub put_count: u64,
    /// Number of records taken from the channel.
    pub get_count: u64,
    /// Largest length observed at a sampling instant, including the final one.
    pub high_water: usize,
    /// Ids of the stored records in sorted order, for channels nominated for
    /// a full listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<String>>,
}

/// End-of-run report of a network.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Simulation time at which the summary was taken, in seconds.
    pub time: f64,
    /// Channels, in registry order.
    pub channels: Vec<ChannelSummary>,
    /// Number of nodes and edges which were skipped when the network was
    /// built.
    pub without_simulation: usize,
    /// Number of records dropped after a failed action.
    pub dropped_failures: u64,
    /// Number of events processed by the scheduler.
    pub events_processed: u64,
}

impl Summary {
    /// Returns the summary of the channel with the given name.
    pub fn channel(&self, name: &str) -> Option<&ChannelSummary> {
        self.channels.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let banner = "#".repeat(BANNER_WIDTH);

        writeln!(f, "{banner}")?;
        writeln!(f, "###  Simulation done at t={:.3}", self.time)?;
        for c in &self.channels {
            let capacity = c
                .capacity
                .map_or_else(|| "unbounded".to_owned(), |c| c.to_string());
            writeln!(
                f,
                "dataq.{}.{}: {} of {} slots allocated, {} puts, {} gets, high-water {}",
                c.host, c.name, c.len, capacity, c.put_count, c.get_count, c.high_water
            )?;
            if let Some(records) = &c.records {
                writeln!(f, "    Queued {} ITEMS: [{}]", records.len(), records.join(", "))?;
            }
        }
        writeln!(f, "{} nodes/edges without simulation", self.without_simulation)?;
        writeln!(f, "{} failed records dropped", self.dropped_failures)?;
        writeln!(f, "{} events processed", self.events_processed)?;
        writeln!(f, "{banner}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_display() {
        let summary = Summary {
            time: 100.0,
            channels: vec![
                ChannelSummary {
                    name: "A".to_owned(),
                    host: "h1".to_owned(),
                    capacity: Some(10),
                    len: 0,
                    put_count: 5,
                    get_count: 5,
                    high_water: 1,
                    records: None,
                },
                ChannelSummary {
                    name: "B".to_owned(),
                    host: "h1".to_owned(),
                    capacity: None,
                    len: 2,
                    put_count: 2,
                    get_count: 0,
                    high_water: 2,
                    records: Some(vec!["src.id0".to_owned(), "src.id1".to_owned()]),
                },
            ],
            without_simulation: 1,
            dropped_failures: 0,
            events_processed: 42,
        };

        let text = summary.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "#".repeat(55));
        assert_eq!(lines[1], "###  Simulation done at t=100.000");
        assert_eq!(
            lines[2],
            "dataq.h1.A: 0 of 10 slots allocated, 5 puts, 5 gets, high-water 1"
        );
        assert_eq!(
            lines[3],
            "dataq.h1.B: 2 of unbounded slots allocated, 2 puts, 0 gets, high-water 2"
        );
        assert_eq!(lines[4], "    Queued 2 ITEMS: [src.id0, src.id1]");
        assert_eq!(lines[5], "1 nodes/edges without simulation");
        assert_eq!(summary.channel("B").unwrap().len, 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["channels"][0]["put_count"], 5);
        assert!(json["channels"][0].get("records").is_none());
    }
}
