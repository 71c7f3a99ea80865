//! Declarative description of a data-flow network.
//!
//! A [`Graph`] is a list of typed [`Node`]s and directed [`Edge`]s. It is a
//! plain data structure: it is only validated when it is turned into a live
//! network by the [`NetworkBuilder`](crate::network::NetworkBuilder).
//!
//! # Examples
//!
//! ```
//! use dfsim::graph::{Graph, Node};
//! use dfsim::time::Delay;
//!
//! let graph = Graph::new()
//!     .with_node(Node::source("src", "h1").with_count(5).with_interval(Delay::Fixed(1.0)))
//!     .with_node(Node::queue("A", "h1").with_capacity(10))
//!     .with_node(Node::action("cal", "h1", "nop").with_delay(Delay::Fixed(1.0)))
//!     .with_node(Node::terminal("B", "h1"))
//!     .with_edge("src", "A")
//!     .with_edge("A", "cal")
//!     .with_edge("cal", "B");
//!
//! assert_eq!(graph.successors("A").collect::<Vec<_>>(), ["cal"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Delay;

/// The role of a node in the network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// Instrument emitting records (tag `s`).
    Source,
    /// Bounded FIFO queue (tag `q`).
    Queue,
    /// Transformation stage (tag `a`).
    Action,
    /// Unbounded sink (tag `t`).
    Terminal,
    /// Any other tag, which has no simulated counterpart.
    Unsupported(String),
}

impl NodeKind {
    /// Returns the single-letter tag of the kind.
    pub fn tag(&self) -> &str {
        match self {
            Self::Source => "s",
            Self::Queue => "q",
            Self::Action => "a",
            Self::Terminal => "t",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "s" => Self::Source,
            "q" => Self::Queue,
            "a" => Self::Action,
            "t" => Self::Terminal,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.tag().to_owned()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A node of the network.
///
/// Apart from `id`, all fields are optional at this stage; missing mandatory
/// fields are reported when the network is built and missing parameters fall
/// back to the [`SimConfig`](crate::config::SimConfig) defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// Node kind.
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Host on which the node runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Name of the transformation applied by an action.
    #[serde(default, alias = "action", skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    /// Capacity of a queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Processing delay of an action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
    /// Cron-like `"<minute> <hour>"` trigger of an action, replacing `delay`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    /// Failure probability of an action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_probability: Option<f64>,
    /// Number of records emitted by each instrument of a source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Inter-arrival delay of the instruments of a source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Delay>,
    /// Whether the full content of a queue or terminal is listed in the
    /// summary.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub summarize: bool,
}

impl Node {
    /// Creates a node of the given kind.
    pub fn new(id: impl Into<String>, kind: NodeKind, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Creates a source node.
    pub fn source(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Source, host)
    }

    /// Creates a queue node.
    pub fn queue(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Queue, host)
    }

    /// Creates an action node applying transformation `action_name`.
    pub fn action(
        id: impl Into<String>,
        host: impl Into<String>,
        action_name: impl Into<String>,
    ) -> Self {
        Self {
            action_name: Some(action_name.into()),
            ..Self::new(id, NodeKind::Action, host)
        }
    }

    /// Creates a terminal node.
    pub fn terminal(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Terminal, host)
    }

    /// Sets the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the action delay.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the action cron trigger.
    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }

    /// Sets the action failure probability.
    pub fn with_failure_probability(mut self, p: f64) -> Self {
        self.failure_probability = Some(p);
        self
    }

    /// Sets the number of records per instrument.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the inter-arrival delay of instruments.
    pub fn with_interval(mut self, interval: Delay) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Lists the full content of the channel in the summary.
    pub fn summarized(mut self) -> Self {
        self.summarize = true;
        self
    }
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the upstream node.
    pub from: String,
    /// Id of the downstream node.
    pub to: String,
}

impl Edge {
    /// Creates an edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A data-flow network description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes, in declaration order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges, in declaration order.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds an edge.
    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Iterates over the ids of the nodes downstream of `id`, in edge
    /// declaration order.
    pub fn successors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.from == id)
            .map(|edge| edge.to.as_str())
    }

    /// Marks nodes which name a transformation but declare no kind as
    /// actions.
    pub fn infer_kinds(&mut self) {
        for node in &mut self.nodes {
            if node.kind.is_none() && node.action_name.is_some() {
                node.kind = Some(NodeKind::Action);
            }
        }
    }
}
