//! Assembly of live networks from graph descriptions.
//!
//! The [`NetworkBuilder`] validates a [`Graph`] and instantiates its runtime
//! entities on a fresh [`Simulation`]:
//!
//! * each queue node becomes a bounded [`Channel`],
//! * each terminal node becomes an unbounded [`Channel`],
//! * each source node becomes one instrument process per outgoing pipe,
//! * each action node becomes an action runner process reading from its
//!   incoming pipes and writing to its outgoing pipes.
//!
//! The pipe of an edge depends on the kinds of its endpoints:
//!
//! | from     | to       | pipe                              |
//! |----------|----------|-----------------------------------|
//! | queue    | action   | the queue channel                 |
//! | action   | queue    | the queue channel                 |
//! | source   | queue    | the queue channel                 |
//! | source   | terminal | the terminal channel              |
//! | action   | terminal | the terminal channel              |
//! | source   | action   | a dedicated channel of capacity 1 |
//! | action   | action   | a dedicated channel of capacity 1 |
//!
//! Dedicated channels are named `<from>-<to>`. Such a name must not be taken
//! by another node or channel.
//!
//! Other edges, nodes of unknown kinds and nodes which end up with nothing to
//! do are reported as [`BuildWarning`]s and skipped. All other
//! inconsistencies abort the build with a [`GraphValidationError`] before any
//! process is created.
//!
//! # Examples
//!
//! ```
//! use dfsim::config::SimConfig;
//! use dfsim::graph::{Graph, Node};
//! use dfsim::network::NetworkBuilder;
//! use dfsim::time::{Delay, SimTime};
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
//! let mut network = NetworkBuilder::new(SimConfig::default()).build(&graph)?;
//! network.run(SimTime::from_secs(100.0).unwrap())?;
//!
//! assert_eq!(network.channel("B").unwrap().len(), 5);
//! assert_eq!(network.channel("A").unwrap().put_count(), 5);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod action;
mod instrument;
mod monitor;
mod summary;

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::{info, warn};

use crate::channel::{Capacity, Channel, ChannelId};
use crate::config::{ConfigError, SimConfig};
use crate::graph::{Graph, Node, NodeKind};
use crate::metrics::MetricsSink;
use crate::process::ProcessId;
use crate::resource::ResourceId;
use crate::simulation::{Simulation, SimulationError};
use crate::time::{CronSpec, Delay, SimTime};

pub use action::{ActionTable, Transform, BUILTIN_ACTIONS};
pub use summary::{ChannelSummary, Summary};

use action::{ActionRunner, ActionSettings, Trigger};
use instrument::Instrument;
use monitor::Monitor;

/// Builder for a [`Network`].
pub struct NetworkBuilder {
    config: SimConfig,
    actions: ActionTable,
    metrics: Option<Box<dyn MetricsSink>>,
}

impl NetworkBuilder {
    /// Creates a builder with the built-in action table and no metrics sink.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            actions: ActionTable::with_builtins(),
            metrics: None,
        }
    }

    /// Replaces the action table.
    pub fn with_actions(mut self, actions: ActionTable) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the sink receiving the monitor samples.
    ///
    /// The monitor only runs if a sink is set and
    /// [`SimConfig::monitor_interval`] is not `None`.
    pub fn with_metrics(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.metrics = Some(Box::new(sink));
        self
    }

    /// Validates the graph and instantiates the network.
    pub fn build(self, graph: &Graph) -> Result<Network, GraphValidationError> {
        self.config.validate()?;

        let mut seen = BTreeSet::new();
        let mut specs = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphValidationError::DuplicateNode {
                    node: node.id.clone(),
                });
            }
            specs.push(NodeSpec::validate(node, &self.actions, &self.config)?);
        }
        let kinds: HashMap<&str, &NodeKind> = specs.iter().map(|s| (s.id, s.kind)).collect();
        for edge in &graph.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !kinds.contains_key(endpoint.as_str()) {
                    return Err(GraphValidationError::UnknownEndpoint {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        let mut simulation = Simulation::new(self.config.seed);
        let mut registry = ChannelRegistry::default();
        let mut warnings = Vec::new();
        let mut summarize: BTreeSet<String> = self.config.summarize.iter().cloned().collect();

        // Channels of queues and terminals, in declaration order.
        let mut stores: HashMap<&str, ChannelId> = HashMap::new();
        for spec in &specs {
            let capacity = match spec.role {
                Role::Queue { capacity } => Capacity::Bounded(capacity),
                Role::Terminal => Capacity::Unbounded,
                _ => continue,
            };
            let id = simulation.add_channel(spec.id, spec.host, capacity);
            registry.register(spec.id, id);
            stores.insert(spec.id, id);
            if spec.summarize {
                summarize.insert(spec.id.to_owned());
            }
        }

        let mut host_slots: BTreeMap<&str, ResourceId> = BTreeMap::new();
        if let Some(slots) = self.config.host_slots {
            for spec in specs.iter().filter(|s| matches!(s.role, Role::Action { .. })) {
                host_slots
                    .entry(spec.host)
                    .or_insert_with(|| simulation.add_resource(spec.host, slots));
            }
        }

        let hosts: HashMap<&str, &str> = specs.iter().map(|s| (s.id, s.host)).collect();
        let mut inputs: HashMap<&str, Vec<ChannelId>> = HashMap::new();
        let mut outputs: HashMap<&str, Vec<ChannelId>> = HashMap::new();
        for edge in &graph.edges {
            let (from, to) = (edge.from.as_str(), edge.to.as_str());

            match (kinds[from], kinds[to]) {
                (NodeKind::Queue, NodeKind::Action) => {
                    inputs.entry(to).or_default().push(stores[from]);
                }
                (NodeKind::Source | NodeKind::Action, NodeKind::Queue | NodeKind::Terminal) => {
                    outputs.entry(from).or_default().push(stores[to]);
                }
                (NodeKind::Source | NodeKind::Action, NodeKind::Action) => {
                    let name = format!("{from}-{to}");
                    if registry.get(&name).is_some() || hosts.contains_key(name.as_str()) {
                        return Err(GraphValidationError::DuplicateChannel {
                            from: edge.from.clone(),
                            to: edge.to.clone(),
                            name,
                        });
                    }
                    let pipe =
                        simulation.add_channel(name.as_str(), hosts[from], Capacity::Bounded(1));
                    registry.register(name, pipe);
                    outputs.entry(from).or_default().push(pipe);
                    inputs.entry(to).or_default().push(pipe);
                }
                _ => warnings.push(BuildWarning::UnsupportedEdgeShape {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                }),
            }
        }

        let dropped_failures = Rc::new(Cell::new(0));
        let mut nodes = Vec::with_capacity(specs.len());
        for spec in &specs {
            let runtime = match &spec.role {
                Role::Queue { .. } | Role::Terminal => NodeRuntime::Channel(stores[spec.id]),
                Role::Unsupported(kind) => {
                    warnings.push(BuildWarning::UnsupportedNodeKind {
                        node: spec.id.to_owned(),
                        kind: (*kind).to_owned(),
                    });
                    NodeRuntime::Idle
                }
                Role::Source { interval, count } => {
                    let pipes = outputs.remove(spec.id).unwrap_or_default();
                    if pipes.is_empty() {
                        warnings.push(BuildWarning::IdleSource {
                            node: spec.id.to_owned(),
                        });
                        NodeRuntime::Idle
                    } else {
                        let several = pipes.len() > 1;
                        let instruments = pipes
                            .into_iter()
                            .enumerate()
                            .map(|(i, pipe)| {
                                let label = if several {
                                    format!("{}.p{i}", spec.id)
                                } else {
                                    spec.id.to_owned()
                                };
                                let instrument = Instrument::new(
                                    label.clone(),
                                    spec.id.to_owned(),
                                    pipe,
                                    *interval,
                                    *count,
                                );
                                simulation.spawn(label, instrument)
                            })
                            .collect();
                        NodeRuntime::Instruments(instruments)
                    }
                }
                Role::Action {
                    action_name,
                    trigger,
                    failure_probability,
                } => {
                    let node_inputs = inputs.remove(spec.id).unwrap_or_default();
                    let node_outputs = outputs.remove(spec.id).unwrap_or_default();
                    match self.actions.instantiate(action_name) {
                        Some(transform) if !node_inputs.is_empty() => {
                            if node_inputs.len() > 1 {
                                info!(
                                    node = spec.id,
                                    inputs = node_inputs.len(),
                                    "action joins several inputs"
                                );
                            }
                            if node_outputs.is_empty() {
                                info!(
                                    node = spec.id,
                                    "action has no output, results will be discarded"
                                );
                            }
                            let settings = ActionSettings {
                                trigger: *trigger,
                                failure_probability: *failure_probability,
                                policy: self.config.failure_policy,
                                slot: host_slots.get(spec.host).copied(),
                            };
                            let runner = ActionRunner::new(
                                spec.id.to_owned(),
                                (*action_name).to_owned(),
                                transform,
                                node_inputs,
                                node_outputs,
                                settings,
                                dropped_failures.clone(),
                            );
                            NodeRuntime::Action(simulation.spawn(spec.id, runner))
                        }
                        _ => {
                            warnings.push(BuildWarning::IdleAction {
                                node: spec.id.to_owned(),
                            });
                            NodeRuntime::Idle
                        }
                    }
                }
            };
            nodes.push((spec.id.to_owned(), runtime));
        }

        for name in &summarize {
            if registry.get(name).is_none() {
                warn!(channel = %name, "channel nominated for the summary does not exist");
            }
        }

        if let (Some(sink), Some(interval)) = (self.metrics, self.config.monitor_interval) {
            let monitor =
                Monitor::new(registry.ids().collect(), interval, self.config.epoch, sink);
            simulation.spawn("monitor", monitor);
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            channels = registry.len(),
            processes = simulation.process_count(),
            warnings = warnings.len(),
            "network built"
        );

        Ok(Network {
            simulation,
            registry,
            nodes,
            warnings,
            dropped_failures,
            summarize,
            horizon: self.config.horizon(),
        })
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl fmt::Debug for NetworkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkBuilder")
            .field("config", &self.config)
            .field("actions", &self.actions)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// The simulated role of a validated node, with its resolved parameters.
enum Role<'g> {
    Source {
        interval: Delay,
        count: Option<u64>,
    },
    Queue {
        capacity: usize,
    },
    Action {
        action_name: &'g str,
        trigger: Trigger,
        failure_probability: f64,
    },
    Terminal,
    Unsupported(&'g str),
}

struct NodeSpec<'g> {
    id: &'g str,
    kind: &'g NodeKind,
    host: &'g str,
    summarize: bool,
    role: Role<'g>,
}

impl<'g> NodeSpec<'g> {
    fn validate(
        node: &'g Node,
        actions: &ActionTable,
        config: &SimConfig,
    ) -> Result<Self, GraphValidationError> {
        let id = node.id.as_str();
        let invalid = |reason: String| GraphValidationError::InvalidParameter {
            node: id.to_owned(),
            reason,
        };

        let kind = node
            .kind
            .as_ref()
            .ok_or_else(|| GraphValidationError::MissingKind { node: id.to_owned() })?;
        let host = node
            .host
            .as_deref()
            .ok_or_else(|| GraphValidationError::MissingHost { node: id.to_owned() })?;

        if node.capacity == Some(0) {
            return Err(invalid("capacity must be at least 1".to_owned()));
        }
        if let Some(p) = node.failure_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("failure probability {p} is not in [0, 1]")));
            }
        }
        if let Some(delay) = &node.delay {
            delay.validate().map_err(|e| invalid(format!("delay: {e}")))?;
        }
        if let Some(interval) = &node.interval {
            interval.validate().map_err(|e| invalid(format!("interval: {e}")))?;
        }
        let cron = node
            .cron
            .as_deref()
            .map(|cron| {
                cron.parse::<CronSpec>()
                    .map_err(|e| invalid(format!("cron expression `{cron}`: {e}")))
            })
            .transpose()?;

        let role = match kind {
            NodeKind::Source => Role::Source {
                interval: node.interval.unwrap_or(config.default_interarrival),
                count: node.count.or(config.instrument_records),
            },
            NodeKind::Queue => Role::Queue {
                capacity: node.capacity.unwrap_or(config.default_capacity),
            },
            NodeKind::Action => {
                let action_name = node
                    .action_name
                    .as_deref()
                    .ok_or_else(|| GraphValidationError::MissingActionName {
                        node: id.to_owned(),
                    })?;
                if !actions.contains(action_name) {
                    return Err(GraphValidationError::UnknownAction {
                        node: id.to_owned(),
                        action_name: action_name.to_owned(),
                    });
                }
                let trigger = match cron {
                    Some(cron) => Trigger::Cron(cron),
                    None => Trigger::Delay(node.delay.unwrap_or(config.default_action_delay)),
                };

                Role::Action {
                    action_name,
                    trigger,
                    failure_probability: node
                        .failure_probability
                        .unwrap_or(config.default_failure_probability),
                }
            }
            NodeKind::Terminal => Role::Terminal,
            NodeKind::Unsupported(tag) => Role::Unsupported(tag.as_str()),
        };

        Ok(Self {
            id,
            kind,
            host,
            summarize: node.summarize,
            role,
        })
    }
}

/// Ordered map from channel names to channel ids.
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    entries: Vec<(String, ChannelId)>,
}

impl ChannelRegistry {
    fn register(&mut self, name: impl Into<String>, id: ChannelId) {
        self.entries.push((name.into(), id));
    }

    /// Returns the id of the channel with the given name.
    pub fn get(&self, name: &str) -> Option<ChannelId> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, id)| id)
    }

    /// Iterates over the channels in build order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ChannelId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Iterates over the channel ids in build order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.entries.iter().map(|&(_, id)| id)
    }

    /// Returns the number of channels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The runtime entity of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRuntime {
    /// The channel of a queue or terminal.
    Channel(ChannelId),
    /// The instrument processes of a source, one per outgoing pipe.
    Instruments(Vec<ProcessId>),
    /// The runner process of an action.
    Action(ProcessId),
    /// The node has no runtime entity.
    Idle,
}

/// A live network.
pub struct Network {
    simulation: Simulation,
    registry: ChannelRegistry,
    nodes: Vec<(String, NodeRuntime)>,
    warnings: Vec<BuildWarning>,
    dropped_failures: Rc<Cell<u64>>,
    summarize: BTreeSet<String>,
    horizon: SimTime,
}

impl Network {
    /// Runs the simulation until the given time.
    ///
    /// See [`Simulation::run`].
    pub fn run(&mut self, until: SimTime) -> Result<(), SimulationError> {
        self.simulation.run(until)?;
        info!(time = %self.simulation.time(), "simulation run completed");

        Ok(())
    }

    /// Runs the simulation until the configured horizon.
    pub fn run_to_horizon(&mut self) -> Result<(), SimulationError> {
        self.run(self.horizon)
    }

    /// Returns the configured horizon.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Returns the channel with the given name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.registry
            .get(name)
            .and_then(|id| self.simulation.channel(id))
    }

    /// Returns the channel registry.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Returns the runtime entity of a node.
    pub fn node(&self, id: &str) -> Option<&NodeRuntime> {
        self.nodes
            .iter()
            .find(|(node, _)| node == id)
            .map(|(_, runtime)| runtime)
    }

    /// Returns the underlying simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Returns the underlying simulation mutably.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Returns the warnings emitted when the network was built.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Returns the number of records dropped after a failed action.
    pub fn dropped_failures(&self) -> u64 {
        self.dropped_failures.get()
    }

    /// Takes a final sample of all channels and reports their state.
    pub fn summary(&mut self) -> Summary {
        let mut channels = Vec::with_capacity(self.registry.len());
        for (name, id) in self.registry.iter() {
            self.simulation.sample_channel(id);
            let Some(channel) = self.simulation.channel(id) else {
                continue;
            };
            let records = self.summarize.contains(name).then(|| {
                let mut ids: Vec<_> = channel.records().map(|r| r.id().to_owned()).collect();
                ids.sort();
                ids
            });

            channels.push(ChannelSummary {
                name: name.to_owned(),
                host: channel.host().to_owned(),
                capacity: channel.capacity().bound(),
                len: channel.len(),
                put_count: channel.put_count(),
                get_count: channel.get_count(),
                high_water: channel.high_water(),
                records,
            });
        }

        Summary {
            time: self.simulation.time().as_secs(),
            channels,
            without_simulation: self.warnings.len(),
            dropped_failures: self.dropped_failures.get(),
            events_processed: self.simulation.events_processed(),
        }
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("simulation", &self.simulation)
            .field("registry", &self.registry)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

/// A recoverable inconsistency found while building a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildWarning {
    /// The node kind has no simulated counterpart.
    UnsupportedNodeKind {
        /// Node id.
        node: String,
        /// Kind tag.
        kind: String,
    },
    /// No pipe exists for this pair of endpoint kinds.
    UnsupportedEdgeShape {
        /// Id of the upstream node.
        from: String,
        /// Id of the downstream node.
        to: String,
    },
    /// The action has no input and is never started.
    IdleAction {
        /// Node id.
        node: String,
    },
    /// The source has no outgoing pipe and emits nothing.
    IdleSource {
        /// Node id.
        node: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedNodeKind { node, kind } => {
                write!(f, "node `{node}` has unsupported kind `{kind}`, skipped")
            }
            Self::UnsupportedEdgeShape { from, to } => {
                write!(f, "edge `{from}` -> `{to}` has an unsupported shape, skipped")
            }
            Self::IdleAction { node } => write!(f, "action `{node}` has no input, not started"),
            Self::IdleSource { node } => {
                write!(f, "source `{node}` has no outgoing pipe, not started")
            }
        }
    }
}

/// A fatal inconsistency found while building a network.
#[derive(Debug, thiserror::Error)]
pub enum GraphValidationError {
    /// The run parameters are invalid.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// Two nodes share the same id.
    #[error("duplicate node `{node}`")]
    DuplicateNode {
        /// Node id.
        node: String,
    },
    /// The node does not declare its kind.
    #[error("node `{node}` has no kind")]
    MissingKind {
        /// Node id.
        node: String,
    },
    /// The node does not declare its host.
    #[error("node `{node}` has no host")]
    MissingHost {
        /// Node id.
        node: String,
    },
    /// The action node does not name its transformation.
    #[error("action node `{node}` has no action name")]
    MissingActionName {
        /// Node id.
        node: String,
    },
    /// The transformation of the action node is not in the action table.
    #[error("action node `{node}` uses unknown action `{action_name}`")]
    UnknownAction {
        /// Node id.
        node: String,
        /// Transformation name.
        action_name: String,
    },
    /// A parameter of the node is out of range or malformed.
    #[error("node `{node}`: {reason}")]
    InvalidParameter {
        /// Node id.
        node: String,
        /// What is wrong with the parameter.
        reason: String,
    },
    /// An edge references an undeclared node.
    #[error("edge `{from}` -> `{to}` references unknown node `{node}`")]
    UnknownEndpoint {
        /// Id of the upstream node.
        from: String,
        /// Id of the downstream node.
        to: String,
        /// The undeclared node.
        node: String,
    },
    /// The pipe created for an edge would share its name with another
    /// channel or node.
    #[error("edge `{from}` -> `{to}` needs a pipe named `{name}`, which is already taken")]
    DuplicateChannel {
        /// Id of the upstream node.
        from: String,
        /// Id of the downstream node.
        to: String,
        /// Name of the pipe.
        name: String,
    },
}
