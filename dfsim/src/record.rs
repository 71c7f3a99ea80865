//! Data records flowing through the network.

use std::fmt;
use std::sync::Arc;

use crate::time::SimTime;

/// Separator between the constituent ids of a joined record.
pub const JOIN_SEPARATOR: &str = "+";

/// An immutable data record.
///
/// Records are cheap to clone: fan-out delivers the same record to several
/// outputs without copying its payload.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    id: Arc<str>,
    origin: Arc<str>,
    created: SimTime,
}

impl Record {
    /// Creates a record originating from node `origin` at time `created`.
    pub fn new(id: impl Into<Arc<str>>, origin: impl Into<Arc<str>>, created: SimTime) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            created,
        }
    }

    /// Returns the record identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the id of the node that created the record.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the simulation time at which the record was created.
    pub fn created(&self) -> SimTime {
        self.created
    }

    /// Merges the records received on the inputs of a join into a composite
    /// record created at `now`.
    ///
    /// A single record is passed through unchanged. Returns `None` if `parts`
    /// is empty.
    pub fn join(parts: &[Record], now: SimTime) -> Option<Record> {
        match parts {
            [] => None,
            [single] => Some(single.clone()),
            _ => {
                let id = parts
                    .iter()
                    .map(Record::id)
                    .collect::<Vec<_>>()
                    .join(JOIN_SEPARATOR);
                let origin = parts
                    .iter()
                    .map(Record::origin)
                    .collect::<Vec<_>>()
                    .join(JOIN_SEPARATOR);

                Some(Record::new(id, origin, now))
            }
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
