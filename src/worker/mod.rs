pub mod api;
pub mod client;
pub mod stats;
pub mod types;
pub mod worker;

pub use client::{ProtocolError, WorkerClient};
pub use types::{Stats, TaskServer, Worker, WorkerError, WorkerResult};
