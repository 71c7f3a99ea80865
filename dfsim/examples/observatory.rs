//! Example: nightly image pipeline of an observatory.
//!
//! This example demonstrates in particular:
//!
//! * the use of a custom transformation in the action table,
//! * an action triggered by a cron expression,
//! * host slots limiting concurrent actions,
//! * channel monitoring with an in-memory metrics buffer.
//!
//! ```text
//!  cam1 ●──┐   ┌─────┐         ┌────────────┐          ┌─────────┐         ┌─────────┐
//!          ├──►│ raw ├──► stb ─►│ calibrated ├─► bundle ─►│ bundles ├─► submit ─►│ archive │
//!  cam2 ●──┘   └─────┘         └────────────┘          └─────────┘ (cron)  └─────────┘
//! ```
use dfsim::config::SimConfig;
use dfsim::graph::{Graph, Node};
use dfsim::metrics::MetricsBuffer;
use dfsim::network::{ActionTable, NetworkBuilder};
use dfsim::record::Record;
use dfsim::time::Delay;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // -------------------
    // Network description.
    // -------------------

    let graph = Graph::new()
        .with_node(Node::source("cam1", "tel").with_count(40))
        .with_node(Node::source("cam2", "tel").with_count(40))
        .with_node(Node::queue("raw", "tel").with_capacity(10))
        .with_node(
            Node::action("stb", "tel", "stb").with_delay(Delay::Uniform { min: 2, max: 8 }),
        )
        .with_node(Node::queue("calibrated", "proc"))
        .with_node(Node::action("bundle", "proc", "bundle").with_delay(Delay::Fixed(3.0)))
        .with_node(Node::queue("bundles", "proc").with_capacity(20))
        .with_node(Node::action("submit", "arch", "submit_to_archive").with_cron("*/10 *"))
        .with_node(Node::terminal("archive", "arch").summarized())
        .with_edge("cam1", "raw")
        .with_edge("cam2", "raw")
        .with_edge("raw", "stb")
        .with_edge("stb", "calibrated")
        .with_edge("calibrated", "bundle")
        .with_edge("bundle", "bundles")
        .with_edge("bundles", "submit")
        .with_edge("submit", "archive");

    // Calibration renames each exposure to its output image.
    let mut actions = ActionTable::with_builtins();
    actions.insert("stb", |r: &Record| {
        Record::new(format!("{}.png", r.id()), r.origin(), r.created())
    });

    // ---------
    // Assembly.
    // ---------

    let config = SimConfig {
        horizon: 4.0 * 3600.0,
        seed: 2024,
        host_slots: Some(1),
        monitor_interval: Some(60.0),
        ..Default::default()
    };
    let metrics = MetricsBuffer::new();
    let mut network = NetworkBuilder::new(config)
        .with_actions(actions)
        .with_metrics(metrics.writer())
        .build(&graph)?;

    // ----------
    // Execution.
    // ----------

    network.run_to_horizon()?;
    let summary = network.summary();
    print!("{summary}");

    let archive = summary.channel("archive").ok_or("no archive channel")?;
    assert_eq!(archive.len, 80);
    assert!(archive
        .records
        .iter()
        .flatten()
        .all(|id| id.ends_with(".png")));

    let raw_peak = metrics
        .filter(|s| s.path == "dataq.tel.raw")
        .map(|s| s.value)
        .fold(0.0, f64::max);
    println!("peak occupancy of the raw queue: {raw_peak}");

    Ok(())
}
