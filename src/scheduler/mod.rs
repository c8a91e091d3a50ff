pub mod round_robin;
pub mod scheduler;
pub mod types;

pub use round_robin::RoundRobin;
pub use scheduler::SchedulerRegistry;
pub use types::{Scheduler, SchedulerError, SchedulerResult};
