//! A discrete-event simulator for data-flow networks.
//!
//! dfsim simulates the flow of data records through a network of bounded
//! queues and processing stages spread over a set of hosts. It is meant to
//! answer capacity-planning questions such as "which queue fills up first?"
//! or "how many records are still pending at the end of the night?" before a
//! processing pipeline is deployed.
//!
//! # A practical overview
//!
//! Simulating a network involves three activities:
//!
//! 1. the description of the network as a [`Graph`](graph::Graph), either
//!    built programmatically or loaded from a YAML or JSON file with
//!    [`graph_file::load`],
//! 2. the assembly of a live [`Network`](network::Network) with a
//!    [`NetworkBuilder`](network::NetworkBuilder), which validates the graph
//!    against a [`SimConfig`](config::SimConfig),
//! 3. the execution of the simulation up to a horizon, followed by the
//!    inspection of the channels or of the end-of-run
//!    [`Summary`](network::Summary).
//!
//! ## Describing the network
//!
//! A graph is made of four kinds of nodes:
//!
//! * _sources_ emit records at random intervals, one instrument per outgoing
//!   edge,
//! * _queues_ are bounded FIFO buffers,
//! * _actions_ take one record from each of their inputs, wait for a
//!   processing delay, apply a named transformation and put the result into
//!   each of their outputs,
//! * _terminals_ are unbounded buffers collecting the final records.
//!
//! A put into a full queue suspends the producer until a slot frees up, so
//! congestion propagates upstream.
//!
//! ```text
//!                 ┌───────┐         ┌─────┐         ┌───────┐
//!   src ●────────▶│   A   ├────────▶│ cal ├────────▶│   B   │
//!    (source)     │ queue │         │     │         │ term. │
//!                 └───────┘         └─────┘         └───────┘
//! ```
//!
//! ## Running the simulation
//!
//! ```
//! use dfsim::config::SimConfig;
//! use dfsim::graph::{Graph, Node};
//! use dfsim::metrics::MetricsBuffer;
//! use dfsim::network::NetworkBuilder;
//! use dfsim::time::Delay;
//!
//! let graph = Graph::new()
//!     .with_node(Node::source("src", "h1").with_count(5).with_interval(Delay::Fixed(1.0)))
//!     .with_node(Node::queue("A", "h1").with_capacity(10))
//!     .with_node(Node::action("cal", "h1", "nop").with_delay(Delay::Fixed(1.0)))
//!     .with_node(Node::terminal("B", "h1").summarized())
//!     .with_edge("src", "A")
//!     .with_edge("A", "cal")
//!     .with_edge("cal", "B");
//!
//! let config = SimConfig {
//!     horizon: 100.0,
//!     ..Default::default()
//! };
//! let metrics = MetricsBuffer::new();
//! let mut network = NetworkBuilder::new(config)
//!     .with_metrics(metrics.writer())
//!     .build(&graph)?;
//!
//! network.run_to_horizon()?;
//!
//! let summary = network.summary();
//! let terminal = summary.channel("B").unwrap();
//! assert_eq!(terminal.len, 5);
//! assert_eq!(terminal.records.as_deref().unwrap()[0], "src.id0");
//! assert_eq!(summary.channel("A").unwrap().len, 0);
//!
//! // The monitor sampled both channels every second.
//! assert!(metrics.into_iter().any(|s| s.path == "dataq.h1.B" && s.value == 5.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Determinism
//!
//! All random draws go through a single pseudo-random generator seeded from
//! [`SimConfig::seed`](config::SimConfig::seed), and events scheduled for the
//! same time are processed in the order they were scheduled. Two runs with
//! the same graph, configuration and seed therefore produce identical
//! summaries and metric streams.
//!
//! # Custom processes
//!
//! Nodes are backed by processes implementing the [`Process`](process::Process)
//! trait, which can also be spawned directly on a
//! [`Simulation`](simulation::Simulation). See the [`process`] module.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod channel;
pub mod config;
pub mod graph;
pub mod graph_file;
pub mod metrics;
pub mod network;
pub mod process;
pub mod record;
pub mod resource;
pub mod simulation;
pub mod time;
pub mod tracing;
mod util;
