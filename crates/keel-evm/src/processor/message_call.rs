use crate::frame::{Frame, FrameState};
use crate::host::Host;
use crate::precompile::Precompile;
use crate::state::transfer;
use tracing::debug;

/// Runs existing code, or a precompile, against a recipient.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCallProcessor;

impl MessageCallProcessor {
    /// Create a processor
    pub fn new() -> Self {
        Self
    }

    /// Open the frame's snapshot, move the value and decide how the frame
    /// proceeds. Balance sufficiency is checked by whoever issued the call.
    pub fn start(&self, frame: &mut Frame, host: &mut Host<'_>) {
        frame.checkpoint = Some(host.open_checkpoint());

        if frame.transfers_value && !frame.value.is_zero() {
            if let Err(reason) = transfer(&mut *host.state, &frame.caller, &frame.address, frame.value)
            {
                frame.halt(reason);
                return;
            }
        }

        let config = host.config;
        if let Some(precompile) = config.precompiles().get(&frame.code_address) {
            self.run_precompile(frame, host, precompile);
        } else if frame.code.is_empty() {
            frame.state = FrameState::CompletedSuccess;
        } else {
            frame.state = FrameState::CodeExecuting;
        }
    }

    fn run_precompile(&self, frame: &mut Frame, host: &mut Host<'_>, precompile: &Precompile) {
        match precompile.execute(&frame.input, frame.gas_remaining, host.gas()) {
            Ok(result) => {
                frame.gas_remaining = frame.gas_remaining.saturating_sub(result.gas_used);
                frame.output = result.output;
                frame.state = FrameState::CompletedSuccess;
            }
            Err(reason) => {
                debug!(
                    precompile = precompile.name(),
                    address = %frame.code_address,
                    %reason,
                    "precompile failed"
                );
                frame.halt(reason);
            }
        }
    }
}
