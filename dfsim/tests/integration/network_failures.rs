//! Action failures, validation errors and build warnings.

use dfsim::config::{FailurePolicy, SimConfig};
use dfsim::graph::{Graph, Node, NodeKind};
use dfsim::network::{BuildWarning, GraphValidationError, NetworkBuilder};
use dfsim::simulation::SimulationError;
use dfsim::time::{Delay, SimTime};

fn failing_graph(p: f64) -> Graph {
    Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(5)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("A", "h1"))
        .with_node(
            Node::action("cal", "h1", "iclient")
                .with_delay(Delay::Fixed(1.0))
                .with_failure_probability(p),
        )
        .with_node(Node::terminal("B", "h1"))
        .with_edge("src", "A")
        .with_edge("A", "cal")
        .with_edge("cal", "B")
}

#[test]
fn failure_aborts_run() {
    let mut network = NetworkBuilder::new(SimConfig::default())
        .build(&failing_graph(1.0))
        .unwrap();

    let err = network
        .run(SimTime::from_secs(100.0).unwrap())
        .unwrap_err();

    assert_eq!(
        err,
        SimulationError::ActionExecutionFailed {
            action_name: "iclient".to_owned(),
            node: "cal".to_owned(),
        }
    );
    // The first record arrived at t=1 and failed after a 1s delay.
    assert_eq!(network.simulation().time(), SimTime::from_secs(2.0).unwrap());
}

#[test]
fn failure_drops_record() {
    let config = SimConfig {
        failure_policy: FailurePolicy::Drop,
        ..Default::default()
    };
    let mut network = NetworkBuilder::new(config)
        .build(&failing_graph(1.0))
        .unwrap();

    network.run(SimTime::from_secs(100.0).unwrap()).unwrap();

    assert_eq!(network.dropped_failures(), 5);
    assert!(network.channel("B").unwrap().is_empty());
    assert_eq!(network.channel("A").unwrap().get_count(), 5);
    assert_eq!(network.summary().dropped_failures, 5);
}

#[test]
fn reliable_action_never_fails() {
    let config = SimConfig {
        failure_policy: FailurePolicy::Drop,
        ..Default::default()
    };
    let mut network = NetworkBuilder::new(config)
        .build(&failing_graph(0.0))
        .unwrap();

    network.run(SimTime::from_secs(100.0).unwrap()).unwrap();

    assert_eq!(network.dropped_failures(), 0);
    assert_eq!(network.channel("B").unwrap().len(), 5);
}

#[test]
fn action_without_name_is_rejected() {
    let graph = Graph::new()
        .with_node(Node::queue("A", "h1"))
        .with_node(Node::new("cal", NodeKind::Action, "h1"))
        .with_edge("A", "cal");

    let err = NetworkBuilder::new(SimConfig::default())
        .build(&graph)
        .unwrap_err();

    assert!(matches!(
        err,
        GraphValidationError::MissingActionName { ref node } if node == "cal"
    ));
    assert_eq!(err.to_string(), "action node `cal` has no action name");
}

#[test]
fn unsupported_parts_are_skipped() {
    let graph = Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(2)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("A", "h1"))
        .with_node(Node::queue("C", "h1"))
        .with_node(Node::new("disk", NodeKind::from("d"), "h1"))
        .with_node(Node::action("cal", "h1", "nop").with_delay(Delay::Fixed(1.0)))
        .with_node(Node::terminal("B", "h1"))
        .with_edge("src", "A")
        .with_edge("A", "C")
        .with_edge("C", "disk")
        .with_edge("A", "cal")
        .with_edge("cal", "B");

    let mut network = NetworkBuilder::new(SimConfig::default())
        .build(&graph)
        .unwrap();
    network.run(SimTime::from_secs(50.0).unwrap()).unwrap();

    assert_eq!(
        network.warnings(),
        [
            BuildWarning::UnsupportedEdgeShape {
                from: "A".to_owned(),
                to: "C".to_owned()
            },
            BuildWarning::UnsupportedEdgeShape {
                from: "C".to_owned(),
                to: "disk".to_owned()
            },
            BuildWarning::UnsupportedNodeKind {
                node: "disk".to_owned(),
                kind: "d".to_owned()
            },
        ]
    );
    // The rest of the network runs normally.
    assert_eq!(network.channel("B").unwrap().len(), 2);
    assert_eq!(network.summary().without_simulation, 3);
}
