use std::collections::BTreeMap;

use super::round_robin::RoundRobin;
use super::types::{Scheduler, SchedulerError, SchedulerResult};

type Constructor = fn() -> Box<dyn Scheduler>;

/// Strategy name to constructor.
pub struct SchedulerRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl SchedulerRegistry {
    pub fn empty() -> Self {
        SchedulerRegistry {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, constructor: Constructor) -> &mut Self {
        self.constructors.insert(name.to_ascii_lowercase(), constructor);
        self
    }

    pub fn build(&self, name: &str) -> SchedulerResult<Box<dyn Scheduler>> {
        self.constructors
            .get(&name.to_ascii_lowercase())
            .map(|constructor| constructor())
            .ok_or_else(|| SchedulerError::Unknown(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(RoundRobin::NAME, || Box::new(RoundRobin::new()));
        registry
    }
}
