use crate::error::HaltReason;
use crate::frame::{Frame, FrameState};
use crate::host::Host;
use crate::state::WorldState;
use keel_primitives::{keccak256, word_to_bytes, Address, U256};
use rlp::RlpStream;
use tracing::trace;

/// Check run against returned code before it is deposited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractValidationRule {
    /// Code longer than this many bytes halts with `CodeTooLarge` (EIP-170)
    MaxCodeSize(usize),
    /// Code starting with this byte halts with `InvalidCode` (EIP-3541)
    RejectPrefix(u8),
}

impl ContractValidationRule {
    /// The reason `code` fails this rule, if it does
    pub fn validate(&self, code: &[u8]) -> Option<HaltReason> {
        match *self {
            ContractValidationRule::MaxCodeSize(limit) if code.len() > limit => {
                Some(HaltReason::CodeTooLarge)
            }
            ContractValidationRule::RejectPrefix(byte) if code.first() == Some(&byte) => {
                Some(HaltReason::InvalidCode)
            }
            _ => None,
        }
    }
}

/// CREATE address: `keccak256(rlp([sender, nonce]))[12..]`
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    address_from_hash(&stream.out())
}

/// CREATE2 address: `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`
pub fn create2_address(sender: &Address, salt: U256, init_code: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&word_to_bytes(salt));
    preimage.extend_from_slice(keccak256(init_code).as_bytes());
    address_from_hash(&preimage)
}

fn address_from_hash(preimage: &[u8]) -> Address {
    let hash = keccak256(preimage);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

/// Initializes a new account, runs its init code and deposits the result.
#[derive(Debug, Clone)]
pub struct ContractCreationProcessor {
    require_code_deposit_to_succeed: bool,
    validation_rules: Vec<ContractValidationRule>,
    initial_contract_nonce: u64,
}

impl ContractCreationProcessor {
    /// Create a processor
    pub fn new(
        require_code_deposit_to_succeed: bool,
        validation_rules: Vec<ContractValidationRule>,
        initial_contract_nonce: u64,
    ) -> Self {
        Self {
            require_code_deposit_to_succeed,
            validation_rules,
            initial_contract_nonce,
        }
    }

    /// Registered validation rules, in evaluation order
    pub fn validation_rules(&self) -> &[ContractValidationRule] {
        &self.validation_rules
    }

    fn account_exists(state: &dyn WorldState, address: &Address) -> bool {
        match state.account(address) {
            Some(account) => {
                account.nonce != 0 || !account.code.is_empty() || !state.is_storage_empty(address)
            }
            None => false,
        }
    }

    /// Move the value, refuse an existing target and initialize the new
    /// account. No init code runs if the target is taken.
    pub fn start(&self, frame: &mut Frame, host: &mut Host<'_>) {
        frame.checkpoint = Some(host.open_checkpoint());

        let sender_balance = host.state.balance(&frame.caller);
        let Some(remaining) = sender_balance.checked_sub(frame.value) else {
            frame.halt(HaltReason::InsufficientBalance);
            return;
        };
        host.state.set_balance(&frame.caller, remaining);

        if Self::account_exists(&*host.state, &frame.address) {
            trace!(address = %frame.address, "contract creation failed: account already exists");
            frame.halt(HaltReason::IllegalStateChange);
            return;
        }

        host.substate.add_created(frame.address);
        let balance = host.state.balance(&frame.address).saturating_add(frame.value);
        host.state.set_balance(&frame.address, balance);
        host.state.set_nonce(&frame.address, self.initial_contract_nonce);
        host.state.clear_storage(&frame.address);
        frame.state = FrameState::CodeExecuting;
    }

    /// Charge the deposit, validate and store the returned code.
    pub fn code_success(&self, frame: &mut Frame, host: &mut Host<'_>) {
        let code = frame.output.clone();
        let deposit_fee = host.gas().code_deposit_cost(code.len());

        if frame.gas_remaining < deposit_fee {
            trace!(
                address = %frame.address,
                deposit_fee,
                gas_remaining = frame.gas_remaining,
                "not enough gas to deposit code"
            );
            if self.require_code_deposit_to_succeed {
                frame.halt(HaltReason::InsufficientGas);
            } else {
                frame.state = FrameState::CompletedSuccess;
            }
            return;
        }

        if let Some(reason) = self
            .validation_rules
            .iter()
            .find_map(|rule| rule.validate(&code))
        {
            trace!(address = %frame.address, %reason, "contract validation failed");
            frame.halt(reason);
            return;
        }

        frame.gas_remaining -= deposit_fee;
        host.state.set_code(&frame.address, code);
        trace!(
            address = %frame.address,
            code_size = frame.output.len(),
            gas_remaining = frame.gas_remaining,
            "contract created"
        );
        frame.state = FrameState::CompletedSuccess;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_address_known_vector() {
        // sender 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0
        let sender = Address::from_hex("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            create_address(&sender, 0).to_hex(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            create_address(&sender, 1).to_hex(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_create2_address_eip1014_vector() {
        // EIP-1014 example 0
        let address = create2_address(&Address::ZERO, U256::zero(), &[0x00]);
        assert_eq!(address.to_hex(), "0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38");
    }

    #[test]
    fn test_validation_rules() {
        let size = ContractValidationRule::MaxCodeSize(2);
        assert_eq!(size.validate(&[1, 2]), None);
        assert_eq!(size.validate(&[1, 2, 3]), Some(HaltReason::CodeTooLarge));

        let prefix = ContractValidationRule::RejectPrefix(0xef);
        assert_eq!(prefix.validate(&[0xef, 0x00]), Some(HaltReason::InvalidCode));
        assert_eq!(prefix.validate(&[0x60, 0xef]), None);
        assert_eq!(prefix.validate(&[]), None);
    }
}
