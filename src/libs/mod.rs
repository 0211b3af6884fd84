// Core engine modules: idempotency decisions, state persistence, workflow
// outputs, and shared utilities.

pub mod idempotency;
pub mod outputs;
pub mod state_management;
pub mod utilities;
