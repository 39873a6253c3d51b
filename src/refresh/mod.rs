pub mod orchestrator;
pub mod result;
pub mod scheduler;

pub use orchestrator::RefreshOrchestrator;
pub use result::{IndexOutcome, OutcomeStatus, RefreshResult, Trigger};
pub use scheduler::Scheduler;
