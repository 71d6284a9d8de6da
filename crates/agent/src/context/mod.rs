//! Per-question reasoning state for the tool router.

pub mod working_memory;

pub use working_memory::{ToolInvocationRecord, TraceEntry, TraceKind, WorkingMemory};
