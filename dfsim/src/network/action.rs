use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::rc::Rc;

use dyn_clone::DynClone;
use rand::Rng;
use tracing::{debug, warn};

use crate::channel::ChannelId;
use crate::config::FailurePolicy;
use crate::process::{Context, Process, Resume, Suspend};
use crate::record::Record;
use crate::resource::ResourceId;
use crate::simulation::SimulationError;
use crate::time::{CronSpec, Delay};

/// Names of the built-in pass-through transformations.
pub const BUILTIN_ACTIONS: &[&str] = &[
    "nop",
    "stb",
    "client",
    "bundle",
    "unbundle",
    "submit_to_archive",
    "resubmit",
    "iclient",
    "ibundle",
    "iunbundle",
    "submit_to_archive2",
];

/// A record transformation applied by an action.
///
/// Any `Fn(&Record) -> Record` closure which is `Clone` is a transformation.
pub trait Transform: DynClone {
    /// Produces the output record of the action.
    fn apply(&self, record: &Record) -> Record;
}

dyn_clone::clone_trait_object!(Transform);

impl<F> Transform for F
where
    F: Fn(&Record) -> Record + Clone,
{
    fn apply(&self, record: &Record) -> Record {
        self(record)
    }
}

fn pass_through(record: &Record) -> Record {
    record.clone()
}

/// Map from action names to transformations.
#[derive(Clone, Default)]
pub struct ActionTable {
    actions: BTreeMap<String, Box<dyn Transform>>,
}

impl ActionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with all [`BUILTIN_ACTIONS`].
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for name in BUILTIN_ACTIONS {
            table.insert(*name, pass_through);
        }

        table
    }

    /// Registers a transformation, replacing any previous one with the same
    /// name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        transform: impl Transform + 'static,
    ) -> &mut Self {
        self.actions.insert(name.into(), Box::new(transform));
        self
    }

    /// Returns the transformation registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn Transform> {
        self.actions.get(name).map(|t| t.as_ref())
    }

    pub(crate) fn instantiate(&self, name: &str) -> Option<Box<dyn Transform>> {
        self.actions.get(name).cloned()
    }

    /// Checks whether a transformation is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Iterates over the registered names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// What an action waits for before executing.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Trigger {
    Delay(Delay),
    Cron(CronSpec),
}

/// Draws the outcome of an execution with failure probability `p`.
pub(crate) fn draw_failure<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < p
}

#[derive(Debug)]
enum State {
    AwaitingInput,
    Acquiring(Record),
    Delaying(Record),
    Dispatching { record: Record, next: usize },
}

pub(crate) struct ActionSettings {
    pub(crate) trigger: Trigger,
    pub(crate) failure_probability: f64,
    pub(crate) policy: FailurePolicy,
    pub(crate) slot: Option<ResourceId>,
}

/// Process running an action node.
///
/// The runner cycles through the following states:
///
/// * awaiting input: one record is taken from each input, in declaration
///   order, and the records are joined,
/// * acquiring: a slot of the host resource is taken, if host slots are
///   configured,
/// * delaying: the runner waits for the action delay or the next cron match,
/// * executing: the failure draw is made and the transformation is applied,
///   releasing the host slot,
/// * dispatching: the result is put into each output in declaration order.
pub(crate) struct ActionRunner {
    node: String,
    action_name: String,
    transform: Box<dyn Transform>,
    inputs: Vec<ChannelId>,
    outputs: Vec<ChannelId>,
    settings: ActionSettings,
    dropped_failures: Rc<Cell<u64>>,
    received: Vec<Record>,
    state: State,
}

impl ActionRunner {
    pub(crate) fn new(
        node: String,
        action_name: String,
        transform: Box<dyn Transform>,
        inputs: Vec<ChannelId>,
        outputs: Vec<ChannelId>,
        settings: ActionSettings,
        dropped_failures: Rc<Cell<u64>>,
    ) -> Self {
        Self {
            node,
            action_name,
            transform,
            inputs,
            outputs,
            settings,
            dropped_failures,
            received: Vec::new(),
            state: State::AwaitingInput,
        }
    }

    fn await_input(&mut self) -> Suspend {
        self.received.clear();
        self.state = State::AwaitingInput;

        match self.inputs.first() {
            Some(&input) => Suspend::Get(input),
            None => Suspend::Done,
        }
    }

    fn receive(&mut self, cx: &mut Context<'_>, record: Record) -> Suspend {
        self.received.push(record);
        if let Some(&input) = self.inputs.get(self.received.len()) {
            return Suspend::Get(input);
        }

        let Some(record) = Record::join(&self.received, cx.now()) else {
            return self.await_input();
        };
        if self.received.len() > 1 {
            debug!(record = %record, inputs = self.received.len(), "inputs joined");
        }
        self.received.clear();

        match self.settings.slot {
            Some(slot) => {
                self.state = State::Acquiring(record);
                Suspend::Acquire(slot)
            }
            None => self.delay(cx, record),
        }
    }

    fn delay(&mut self, cx: &mut Context<'_>, record: Record) -> Suspend {
        let secs = match self.settings.trigger {
            Trigger::Delay(delay) => delay.sample(cx.rng()),
            Trigger::Cron(cron) => cron.next_offset(cx.now()),
        };
        debug!(record = %record, delay = secs, "processing record");
        self.state = State::Delaying(record);

        Suspend::Timeout(secs)
    }

    fn execute(
        &mut self,
        cx: &mut Context<'_>,
        record: Record,
    ) -> Result<Suspend, SimulationError> {
        if let Some(slot) = self.settings.slot {
            cx.release(slot)?;
        }

        if draw_failure(self.settings.failure_probability, cx.rng()) {
            return match self.settings.policy {
                FailurePolicy::Abort => Err(SimulationError::ActionExecutionFailed {
                    action_name: self.action_name.clone(),
                    node: self.node.clone(),
                }),
                FailurePolicy::Drop => {
                    warn!(
                        record = %record,
                        action = %self.action_name,
                        "action failed, record dropped"
                    );
                    self.dropped_failures.set(self.dropped_failures.get() + 1);

                    Ok(self.await_input())
                }
            };
        }

        let result = self.transform.apply(&record);
        if self.outputs.is_empty() {
            debug!(record = %result, "no output, result discarded");
        }

        Ok(self.dispatch(result, 0))
    }

    fn dispatch(&mut self, record: Record, next: usize) -> Suspend {
        match self.outputs.get(next) {
            Some(&output) => {
                let suspend = Suspend::Put(output, record.clone());
                self.state = State::Dispatching { record, next };

                suspend
            }
            None => {
                if next > 0 {
                    debug!(record = %record, outputs = next, "record dispatched");
                }
                self.await_input()
            }
        }
    }
}

impl Process for ActionRunner {
    fn resume(&mut self, cx: &mut Context<'_>, resume: Resume) -> Result<Suspend, SimulationError> {
        let state = mem::replace(&mut self.state, State::AwaitingInput);

        Ok(match (state, resume) {
            (_, Resume::Start) => self.await_input(),
            (State::AwaitingInput, Resume::Got(record)) => self.receive(cx, record),
            (State::Acquiring(record), Resume::Acquired) => self.delay(cx, record),
            (State::Delaying(record), Resume::Timeout) => return self.execute(cx, record),
            (State::Dispatching { record, next }, Resume::Put) => self.dispatch(record, next + 1),
            (state, resume) => {
                // Resumptions are always paired with the pending suspension.
                warn!(?state, ?resume, "unexpected resumption, action stopped");
                Suspend::Done
            }
        })
    }
}
