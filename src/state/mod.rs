pub mod cycle_gate;
pub mod manager;
pub mod session;

pub use cycle_gate::{CycleGate, CycleGuard};
pub use manager::StateManager;
pub use session::{CredentialSlot, NudgeSlot};
