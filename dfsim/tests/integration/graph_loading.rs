//! Networks built from description files.

use std::io::Write;

use dfsim::config::{FailurePolicy, SimConfig};
use dfsim::graph_file;
use dfsim::network::NetworkBuilder;
use tempfile::NamedTempFile;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const GRAPH_YAML: &str = "\
nodes:
  - { id: src, kind: s, host: h1, count: 5, interval: 1 }
  - { id: A, kind: q, host: h1, capacity: 10 }
  - { id: cal, host: h1, action: nop, delay: 1 }
  - { id: B, kind: t, host: h1, summarize: true }
edges:
  - { from: src, to: A }
  - { from: A, to: cal }
  - { from: cal, to: B }
";

#[test]
fn yaml_graph_and_config() {
    let graph_file = temp_file(".yaml", GRAPH_YAML);
    let config_file = temp_file(
        ".yml",
        "horizon: 100\nseed: 7\nfailure_policy: drop\nmonitor_interval: null\n",
    );

    let graph = graph_file::load(graph_file.path()).unwrap();
    let config = SimConfig::from_path(config_file.path()).unwrap();
    assert_eq!(config.failure_policy, FailurePolicy::Drop);

    let mut network = NetworkBuilder::new(config).build(&graph).unwrap();
    network.run_to_horizon().unwrap();
    let summary = network.summary();

    assert_eq!(summary.time, 100.0);
    let b = summary.channel("B").unwrap();
    assert_eq!(b.len, 5);
    assert_eq!(
        b.records.as_deref().unwrap(),
        ["src.id0", "src.id1", "src.id2", "src.id3", "src.id4"]
    );
    assert_eq!(summary.channel("A").unwrap().records, None);

    let report = summary.to_string();
    assert!(report.contains("dataq.h1.B: 5 of unbounded slots allocated"));
    assert!(report.contains("Queued 5 ITEMS: [src.id0, src.id1, src.id2, src.id3, src.id4]"));
}

#[test]
fn json_graph() {
    let graph_file = temp_file(
        ".json",
        r#"{
            "nodes": [
                {"id": "src", "kind": "s", "host": "h1", "count": 3, "interval": {"min": 1, "max": 3}},
                {"id": "cal", "type": "a", "host": "h1", "action_name": "bundle"},
                {"id": "B", "kind": "t", "host": "h2"}
            ],
            "edges": [
                {"from": "src", "to": "cal"},
                {"from": "cal", "to": "B"}
            ]
        }"#,
    );

    let graph = graph_file::load(graph_file.path()).unwrap();
    let config = SimConfig {
        horizon: 1_000.0,
        ..Default::default()
    };
    let mut network = NetworkBuilder::new(config).build(&graph).unwrap();
    network.run_to_horizon().unwrap();

    assert_eq!(network.channel("B").unwrap().len(), 3);
    assert_eq!(network.channel("src-cal").unwrap().put_count(), 3);
}
