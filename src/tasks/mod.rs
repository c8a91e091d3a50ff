pub mod docker;
pub mod runtime;
pub mod state;
pub mod types;

pub use docker::DockerRuntime;
pub use runtime::{MockRuntime, Runtime};
pub use state::valid_state_transition;
pub use types::{Config, Inspection, PortBinding, PortMap, RuntimeError, State, Task, TaskEvent};
