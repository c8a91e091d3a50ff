//! A small cluster orchestrator: a manager that places containerized tasks
//! on workers, and workers that run them through a container runtime.

pub mod api;
pub mod config;
pub mod manager;
pub mod node;
pub mod scheduler;
pub mod shutdown;
pub mod tasks;
pub mod utils;
pub mod worker;
