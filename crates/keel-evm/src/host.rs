//! Collaborators an operation can reach besides its own frame

use crate::config::EvmConfig;
use crate::context::Environment;
use crate::gas::GasCalculator;
use crate::state::{SnapshotId, WorldState};
use crate::substate::{Checkpoint, Substate};

/// Shared view handed to gas and execute functions.
///
/// Lives for one dispatch step; the engine rebuilds it around the frame on
/// top of the call stack.
pub struct Host<'a> {
    /// World state
    pub state: &'a mut dyn WorldState,
    /// Transaction substate
    pub substate: &'a mut Substate,
    /// Block and transaction environment
    pub env: &'a Environment,
    /// Protocol configuration
    pub config: &'a EvmConfig,
}

impl Host<'_> {
    /// Active gas calculator
    pub fn gas(&self) -> &dyn GasCalculator {
        self.config.gas_calculator()
    }

    /// Open a world-state snapshot and a substate checkpoint together
    pub(crate) fn open_checkpoint(&mut self) -> (SnapshotId, Checkpoint) {
        (self.state.snapshot(), self.substate.checkpoint())
    }

    /// Keep everything since `checkpoint`
    pub(crate) fn commit(&mut self, checkpoint: (SnapshotId, Checkpoint)) {
        self.state.commit(checkpoint.0);
        self.substate.commit(checkpoint.1);
    }

    /// Drop everything since `checkpoint`
    pub(crate) fn revert(&mut self, checkpoint: (SnapshotId, Checkpoint)) {
        self.state.discard(checkpoint.0);
        self.substate.revert(checkpoint.1);
    }
}
