//! The agent orchestrator for relay.
//!
//! One call to [`Agent::run`] is one turn:
//!
//! 1. **Start**: record the user message
//! 2. **Stream**: ask the model, forwarding text deltas as they arrive
//! 3. **Dispatch**: run every tool call the model issued, in order
//! 4. **End**: append the tool results and report the final text
//!
//! The model is not re-queried with the tool results inside the same turn;
//! the next `run` call carries them to the model.

pub mod agent;
pub mod setup;

pub use agent::{Agent, TurnOutcome};
pub use setup::build_agent;
