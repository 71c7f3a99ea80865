//! Periodic channel sampling.

use std::collections::HashMap;

use dfsim::config::SimConfig;
use dfsim::graph::{Graph, Node};
use dfsim::metrics::{MetricsBuffer, Sample};
use dfsim::network::NetworkBuilder;
use dfsim::time::Delay;

fn congested_graph() -> Graph {
    Graph::new()
        .with_node(
            Node::source("cam", "h1")
                .with_count(20)
                .with_interval(Delay::Uniform { min: 1, max: 2 }),
        )
        .with_node(Node::queue("raw", "h1").with_capacity(8))
        .with_node(Node::action("stb", "h2", "stb").with_delay(Delay::Uniform { min: 2, max: 6 }))
        .with_node(Node::terminal("out", "h2"))
        .with_edge("cam", "raw")
        .with_edge("raw", "stb")
        .with_edge("stb", "out")
}

#[test]
fn samples_are_periodic() {
    let config = SimConfig {
        horizon: 10.0,
        monitor_interval: Some(2.0),
        epoch: 1_000,
        ..Default::default()
    };
    let metrics = MetricsBuffer::new();
    let mut network = NetworkBuilder::new(config)
        .with_metrics(metrics.writer())
        .build(&congested_graph())
        .unwrap();

    network.run_to_horizon().unwrap();

    let samples: Vec<Sample> = metrics.collect();
    let raw: Vec<_> = samples
        .iter()
        .filter(|s| s.path == "dataq.h1.raw")
        .map(|s| s.timestamp)
        .collect();
    assert_eq!(raw, [1_002, 1_004, 1_006, 1_008, 1_010]);
    assert_eq!(samples.len(), 10);
    assert_eq!(samples[1].path, "dataq.h2.out");
}

#[test]
fn high_water_matches_samples() {
    let config = SimConfig {
        horizon: 200.0,
        ..Default::default()
    };
    let metrics = MetricsBuffer::new();
    let mut network = NetworkBuilder::new(config)
        .with_metrics(metrics.writer())
        .build(&congested_graph())
        .unwrap();

    network.run_to_horizon().unwrap();
    let summary = network.summary();

    let mut peaks: HashMap<String, f64> = HashMap::new();
    for sample in metrics {
        let peak = peaks.entry(sample.path).or_default();
        *peak = peak.max(sample.value);
    }
    for channel in &summary.channels {
        let path = format!("dataq.{}.{}", channel.host, channel.name);
        let sampled = peaks[&path] as usize;
        assert_eq!(channel.high_water, sampled.max(channel.len), "{path}");
    }
    assert!(summary.channel("raw").unwrap().high_water > 0);
}

#[test]
fn monitor_disabled() {
    let config = SimConfig {
        horizon: 50.0,
        monitor_interval: None,
        ..Default::default()
    };
    let metrics = MetricsBuffer::new();
    let mut network = NetworkBuilder::new(config)
        .with_metrics(metrics.writer())
        .build(&congested_graph())
        .unwrap();

    network.run_to_horizon().unwrap();

    assert!(metrics.is_empty());
}
