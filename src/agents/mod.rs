// Agent system modules
//
// The Coordinator decomposes user requests and delegates subtasks over the
// protocol; the Worker executes them against the weather capability.

pub mod coordinator;
pub mod errors;
pub mod prompts;
pub mod state;
pub mod types;
pub mod worker;

// Re-export main types
pub use coordinator::{CoordinatorAgent, DelegationPolicy};
pub use errors::{AgentError, AgentResult};
pub use types::{AggregatedReport, OutcomeStatus, SubtaskOutcome, SubtaskRequest, WorkerReport};
pub use worker::{WorkerAgent, DEFAULT_WORKER_CONCURRENCY};
