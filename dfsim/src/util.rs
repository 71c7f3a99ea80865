pub(crate) mod document;
pub(crate) mod priority_queue;
