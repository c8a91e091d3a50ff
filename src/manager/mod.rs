pub mod api;
pub mod assignments;
pub mod manager;
pub mod types;

pub use assignments::Assignments;
pub use types::{Dispatch, Manager, ManagerError, ManagerResult, ManagerServer, ManagerState};
