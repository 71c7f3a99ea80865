//! Record flow through assembled networks.

use dfsim::config::SimConfig;
use dfsim::graph::{Graph, Node};
use dfsim::network::{Network, NetworkBuilder};
use dfsim::time::{Delay, SimTime};

fn at(secs: f64) -> SimTime {
    SimTime::from_secs(secs).unwrap()
}

fn build(config: SimConfig, graph: &Graph) -> Network {
    NetworkBuilder::new(config).build(graph).unwrap()
}

fn record_ids(network: &Network, channel: &str) -> Vec<String> {
    network
        .channel(channel)
        .unwrap()
        .records()
        .map(|r| r.id().to_owned())
        .collect()
}

/// Source emitting 5 records one second apart into a queue drained by a
/// single action writing to a terminal.
fn linear_graph() -> Graph {
    Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(5)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("A", "h1").with_capacity(10))
        .with_node(
            Node::action("cal", "h1", "nop")
                .with_delay(Delay::Fixed(1.0))
                .with_failure_probability(0.0),
        )
        .with_node(Node::terminal("B", "h1"))
        .with_edge("src", "A")
        .with_edge("A", "cal")
        .with_edge("cal", "B")
}

#[test]
fn end_to_end_linear_network() {
    let config = SimConfig {
        horizon: 100.0,
        ..Default::default()
    };
    let mut network = build(config, &linear_graph());

    network.run_to_horizon().unwrap();

    assert_eq!(network.simulation().time(), at(100.0));
    let a = network.channel("A").unwrap();
    assert_eq!(a.len(), 0);
    assert_eq!(a.put_count(), 5);
    assert_eq!(a.get_count(), 5);
    let b = network.channel("B").unwrap();
    assert_eq!(b.len(), 5);
    assert_eq!(
        record_ids(&network, "B"),
        ["src.id0", "src.id1", "src.id2", "src.id3", "src.id4"]
    );

    let summary = network.summary();
    assert_eq!(summary.channel("B").unwrap().len, 5);
    assert_eq!(summary.without_simulation, 0);
    assert_eq!(summary.dropped_failures, 0);
}

#[test]
fn records_leave_in_arrival_order() {
    // Random action delays and inter-arrival times.
    let graph = Graph::new()
        .with_node(Node::source("src", "h1").with_count(20))
        .with_node(Node::queue("A", "h1").with_capacity(3))
        .with_node(Node::action("cal", "h1", "stb"))
        .with_node(Node::terminal("B", "h1"))
        .with_edge("src", "A")
        .with_edge("A", "cal")
        .with_edge("cal", "B");
    let mut network = build(SimConfig::default(), &graph);

    network.run(at(10_000.0)).unwrap();

    let expected: Vec<_> = (0..20).map(|i| format!("src.id{i}")).collect();
    assert_eq!(record_ids(&network, "B"), expected);
}

#[test]
fn full_queue_blocks_upstream() {
    let graph = Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(10)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("A", "h1").with_capacity(2))
        .with_node(Node::action("cal", "h1", "nop").with_delay(Delay::Fixed(100.0)))
        .with_node(Node::terminal("B", "h1"))
        .with_edge("src", "A")
        .with_edge("A", "cal")
        .with_edge("cal", "B");
    let mut network = build(SimConfig::default(), &graph);

    network.run(at(50.0)).unwrap();

    // The first record went straight to the action, the next two filled the
    // queue and the fourth one is held by the blocked instrument.
    let a = network.channel("A").unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a.blocked_putters(), 1);
    assert_eq!(a.put_count(), 3);
    assert_eq!(a.get_count(), 1);
    assert!(network.channel("B").unwrap().is_empty());
}

#[test]
fn bounded_channels_never_overflow() {
    let graph = Graph::new()
        .with_node(Node::source("cam1", "h1").with_count(30))
        .with_node(
            Node::source("cam2", "h1")
                .with_count(30)
                .with_interval(Delay::Uniform { min: 1, max: 3 }),
        )
        .with_node(Node::queue("raw", "h1").with_capacity(2))
        .with_node(Node::action("stb", "h1", "stb").with_delay(Delay::Uniform { min: 1, max: 4 }))
        .with_node(Node::action("bundle", "h2", "bundle"))
        .with_node(Node::queue("bundled", "h2").with_capacity(1))
        .with_node(Node::action("archive", "h2", "submit_to_archive"))
        .with_node(Node::terminal("archived", "h2"))
        .with_edge("cam1", "raw")
        .with_edge("cam2", "raw")
        .with_edge("raw", "stb")
        .with_edge("stb", "bundle")
        .with_edge("bundle", "bundled")
        .with_edge("bundled", "archive")
        .with_edge("archive", "archived");
    let mut network = build(SimConfig::default(), &graph);

    while network.simulation_mut().step().unwrap() {
        for channel in network.simulation().channels() {
            if let Some(bound) = channel.capacity().bound() {
                assert!(
                    channel.len() <= bound,
                    "channel {} holds {} records",
                    channel.name(),
                    channel.len()
                );
            }
        }
    }

    // Once all events are exhausted, every record has reached the terminal.
    assert_eq!(network.channel("archived").unwrap().len(), 60);
}

#[test]
fn fan_out_and_join() {
    let graph = Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(3)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("in", "h1"))
        .with_node(Node::action("split", "h1", "unbundle").with_delay(Delay::Fixed(1.0)))
        .with_node(Node::queue("left", "h1"))
        .with_node(Node::queue("right", "h2"))
        .with_node(Node::action("join", "h2", "bundle").with_delay(Delay::Fixed(1.0)))
        .with_node(Node::terminal("out", "h2"))
        .with_edge("src", "in")
        .with_edge("in", "split")
        .with_edge("split", "left")
        .with_edge("split", "right")
        .with_edge("left", "join")
        .with_edge("right", "join")
        .with_edge("join", "out");
    let mut network = build(SimConfig::default(), &graph);

    network.run(at(100.0)).unwrap();

    assert_eq!(
        record_ids(&network, "out"),
        ["src.id0+src.id0", "src.id1+src.id1", "src.id2+src.id2"]
    );
    assert_eq!(network.channel("left").unwrap().put_count(), 3);
    assert_eq!(network.channel("right").unwrap().put_count(), 3);
}

#[test]
fn chained_actions_use_dedicated_pipes() {
    let graph = Graph::new()
        .with_node(
            Node::source("src", "h1")
                .with_count(4)
                .with_interval(Delay::Fixed(2.0)),
        )
        .with_node(Node::action("client", "h1", "client").with_delay(Delay::Fixed(1.0)))
        .with_node(Node::action("resubmit", "h2", "resubmit").with_delay(Delay::Fixed(1.0)))
        .with_node(Node::terminal("done", "h2"))
        .with_edge("src", "client")
        .with_edge("client", "resubmit")
        .with_edge("resubmit", "done");
    let mut network = build(SimConfig::default(), &graph);

    network.run(at(100.0)).unwrap();

    let names: Vec<_> = network.registry().iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["done", "src-client", "client-resubmit"]);
    assert_eq!(network.channel("client-resubmit").unwrap().put_count(), 4);
    assert_eq!(network.channel("done").unwrap().len(), 4);
}

#[test]
fn host_slots_serialize_actions() {
    let graph = Graph::new()
        .with_node(
            Node::source("src1", "h0")
                .with_count(1)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(
            Node::source("src2", "h0")
                .with_count(1)
                .with_interval(Delay::Fixed(1.0)),
        )
        .with_node(Node::queue("Q1", "h1"))
        .with_node(Node::queue("Q2", "h1"))
        .with_node(Node::action("a1", "h1", "nop").with_delay(Delay::Fixed(10.0)))
        .with_node(Node::action("a2", "h1", "nop").with_delay(Delay::Fixed(10.0)))
        .with_node(Node::terminal("T", "h1"))
        .with_edge("src1", "Q1")
        .with_edge("src2", "Q2")
        .with_edge("Q1", "a1")
        .with_edge("Q2", "a2")
        .with_edge("a1", "T")
        .with_edge("a2", "T");

    let mut free = build(SimConfig::default(), &graph);
    free.run(at(15.0)).unwrap();
    assert_eq!(free.channel("T").unwrap().len(), 2);

    let config = SimConfig {
        host_slots: Some(1),
        ..Default::default()
    };
    let mut limited = build(config, &graph);
    limited.run(at(15.0)).unwrap();
    assert_eq!(limited.channel("T").unwrap().len(), 1);
    limited.run(at(25.0)).unwrap();
    assert_eq!(limited.channel("T").unwrap().len(), 2);
}

#[test]
fn same_seed_same_run() {
    let graph = Graph::new()
        .with_node(Node::source("cam", "h1").with_count(50))
        .with_node(Node::queue("raw", "h1").with_capacity(4))
        .with_node(Node::action("stb", "h1", "stb").with_failure_probability(0.2))
        .with_node(Node::terminal("out", "h1"))
        .with_edge("cam", "raw")
        .with_edge("raw", "stb")
        .with_edge("stb", "out");
    let config = SimConfig {
        seed: 1234,
        failure_policy: dfsim::config::FailurePolicy::Drop,
        summarize: vec!["out".to_owned()],
        ..Default::default()
    };

    let run = || {
        let mut network = build(config.clone(), &graph);
        network.run(at(5_000.0)).unwrap();
        network.summary()
    };
    let first = run();
    let second = run();

    assert_eq!(first, second);
    assert!(first.dropped_failures > 0);
    let out = first.channel("out").unwrap();
    assert_eq!(out.len as u64 + first.dropped_failures, 50);
}
