pub mod periodic;
pub mod retry;

pub use periodic::run_periodic;
pub use retry::{RetryPolicy, with_retry};
