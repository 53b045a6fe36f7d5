use crate::types::BidderState;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<BidderState>>,
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(BidderState::Idle)),
        }
    }

    pub fn get(&self) -> BidderState {
        *self.state.read()
    }

    pub fn set(&self, new_state: BidderState) {
        let mut state = self.state.write();
        if *state != new_state {
            tracing::debug!("State changed: {:?} -> {:?}", *state, new_state);
            *state = new_state;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.get().is_busy()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
