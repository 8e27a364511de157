mod context;
mod error;
mod events;
mod persist;
mod resources;
mod runner;
mod state;
mod steps;
#[cfg(test)]
pub(crate) mod testing;

pub use context::ScenarioState;
pub use error::{ActionError, ScenarioError};
pub use events::EngineEvent;
pub use persist::{load_state_step, save_state_step};
pub use resources::RunContext;
pub use runner::{RunOutcome, Scenario};
pub use steps::{Message, Step};

#[cfg(test)]
pub(crate) use persist::load_state;
#[cfg(test)]
pub(crate) use state::StepStatus;
