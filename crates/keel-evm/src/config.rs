//! Protocol configuration.
//!
//! An [`EvmConfig`] is assembled once per fork and then shared read-only,
//! by reference, by every execution that uses it.

use crate::gas::{GasCalculator, GasSchedule, StandardGasCalculator};
use crate::operation::OperationTable;
use crate::precompile::{ModExpBackend, PrecompileRegistry};
use crate::processor::{ContractCreationProcessor, ContractValidationRule, MessageCallProcessor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default maximum call depth
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
/// Maximum deployed code size (EIP-170)
pub const MAX_CODE_SIZE: usize = 24_576;
/// Maximum init code size (EIP-3860)
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;
/// Leading byte reserved by EIP-3541
pub const RESERVED_CODE_PREFIX: u8 = 0xef;

/// Protocol upgrades, in activation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fork {
    /// Access lists (EIP-2929)
    Berlin,
    /// BASEFEE, reduced refunds, 0xEF code rejection
    London,
    /// PUSH0, init code limits, warm coinbase
    Shanghai,
    /// Transient storage, MCOPY, same-transaction SELFDESTRUCT
    #[default]
    Cancun,
    /// CLZ, bounded MODEXP input
    Osaka,
}

impl Fork {
    /// Gas constants for this fork
    pub fn gas_schedule(self) -> GasSchedule {
        match self {
            Fork::Berlin => GasSchedule::berlin(),
            Fork::London => GasSchedule::london(),
            Fork::Shanghai | Fork::Cancun | Fork::Osaka => GasSchedule::shanghai(),
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fork::Berlin => "berlin",
            Fork::London => "london",
            Fork::Shanghai => "shanghai",
            Fork::Cancun => "cancun",
            Fork::Osaka => "osaka",
        };
        f.write_str(name)
    }
}

/// Serializable engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmSettings {
    /// Active fork
    #[serde(default)]
    pub fork: Fork,
    /// MODEXP backend
    #[serde(default)]
    pub modexp_backend: ModExpBackend,
    /// Maximum call depth
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Whether a creation that cannot pay the code deposit fails
    #[serde(default = "default_require_code_deposit")]
    pub require_code_deposit: bool,
}

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_require_code_deposit() -> bool {
    true
}

impl Default for EvmSettings {
    fn default() -> Self {
        Self {
            fork: Fork::default(),
            modexp_backend: ModExpBackend::default(),
            max_call_depth: default_max_call_depth(),
            require_code_deposit: default_require_code_deposit(),
        }
    }
}

/// Resolved collaborators for one fork
#[derive(Clone)]
pub struct EvmConfig {
    fork: Fork,
    gas_calculator: Arc<dyn GasCalculator>,
    operations: Arc<OperationTable>,
    precompiles: PrecompileRegistry,
    message_call: MessageCallProcessor,
    contract_creation: ContractCreationProcessor,
    modexp_backend: ModExpBackend,
    max_call_depth: usize,
}

impl fmt::Debug for EvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmConfig")
            .field("fork", &self.fork)
            .field("gas_calculator", &self.gas_calculator)
            .field("modexp_backend", &self.modexp_backend)
            .field("max_call_depth", &self.max_call_depth)
            .finish_non_exhaustive()
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self::new(Fork::default())
    }
}

impl EvmConfig {
    /// Standard configuration for `fork`
    pub fn new(fork: Fork) -> Self {
        let modexp_backend = ModExpBackend::default();
        Self {
            fork,
            gas_calculator: Arc::new(StandardGasCalculator::new(fork.gas_schedule())),
            operations: Arc::new(OperationTable::for_fork(fork)),
            precompiles: PrecompileRegistry::for_fork(fork, modexp_backend),
            message_call: MessageCallProcessor::new(),
            contract_creation: Self::creation_processor(fork, true),
            modexp_backend,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Build from deserialized settings
    pub fn from_settings(settings: &EvmSettings) -> Self {
        Self::new(settings.fork)
            .with_modexp_backend(settings.modexp_backend)
            .with_max_call_depth(settings.max_call_depth)
            .with_require_code_deposit(settings.require_code_deposit)
    }

    fn creation_processor(fork: Fork, require_code_deposit: bool) -> ContractCreationProcessor {
        let mut rules = vec![ContractValidationRule::MaxCodeSize(MAX_CODE_SIZE)];
        if fork >= Fork::London {
            rules.push(ContractValidationRule::RejectPrefix(RESERVED_CODE_PREFIX));
        }
        ContractCreationProcessor::new(require_code_deposit, rules, 1)
    }

    /// Replace the gas calculator
    pub fn with_gas_calculator(mut self, calculator: impl GasCalculator + 'static) -> Self {
        self.gas_calculator = Arc::new(calculator);
        self
    }

    /// Select the MODEXP backend
    pub fn with_modexp_backend(mut self, backend: ModExpBackend) -> Self {
        self.modexp_backend = backend;
        self.precompiles = PrecompileRegistry::for_fork(self.fork, backend);
        self
    }

    /// Override the maximum call depth
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Whether a creation that cannot pay the code deposit fails
    pub fn with_require_code_deposit(mut self, required: bool) -> Self {
        self.contract_creation = Self::creation_processor(self.fork, required);
        self
    }

    /// Replace the precompile registry
    pub fn with_precompiles(mut self, precompiles: PrecompileRegistry) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Active fork
    pub fn fork(&self) -> Fork {
        self.fork
    }

    /// Gas calculator
    pub fn gas_calculator(&self) -> &dyn GasCalculator {
        self.gas_calculator.as_ref()
    }

    /// Operation table
    pub fn operations(&self) -> &OperationTable {
        &self.operations
    }

    /// Precompile registry
    pub fn precompiles(&self) -> &PrecompileRegistry {
        &self.precompiles
    }

    /// Message call processor
    pub fn message_call_processor(&self) -> &MessageCallProcessor {
        &self.message_call
    }

    /// Contract creation processor
    pub fn contract_creation_processor(&self) -> &ContractCreationProcessor {
        &self.contract_creation
    }

    /// MODEXP backend
    pub fn modexp_backend(&self) -> ModExpBackend {
        self.modexp_backend
    }

    /// Maximum call depth
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Init code size limit, if the fork has one
    pub fn max_initcode_size(&self) -> Option<usize> {
        (self.fork >= Fork::Shanghai).then_some(MAX_INITCODE_SIZE)
    }

    /// Whether the coinbase starts warm
    pub fn warm_coinbase(&self) -> bool {
        self.fork >= Fork::Shanghai
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::NoopGasCalculator;
    use crate::opcode::{CLZ, PUSH0, TLOAD};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_config_is_shareable() {
        assert_send_sync::<EvmConfig>();
    }

    #[test]
    fn test_fork_ordering() {
        assert!(Fork::Berlin < Fork::London);
        assert!(Fork::Cancun < Fork::Osaka);
        assert_eq!(Fork::Shanghai.to_string(), "shanghai");
    }

    #[test]
    fn test_fork_selects_features() {
        let berlin = EvmConfig::new(Fork::Berlin);
        assert!(berlin.operations().get(PUSH0).is_invalid());
        assert_eq!(berlin.max_initcode_size(), None);
        assert_eq!(berlin.contract_creation_processor().validation_rules().len(), 1);
        assert!(!berlin.warm_coinbase());

        let osaka = EvmConfig::new(Fork::Osaka);
        assert!(!osaka.operations().get(CLZ).is_invalid());
        assert!(!osaka.operations().get(TLOAD).is_invalid());
        assert_eq!(osaka.max_initcode_size(), Some(49_152));
        assert_eq!(osaka.contract_creation_processor().validation_rules().len(), 2);
    }

    #[test]
    fn test_settings_defaults() {
        let settings: EvmSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, EvmSettings::default());
        assert_eq!(settings.max_call_depth, 1024);
        assert!(settings.require_code_deposit);
    }

    #[test]
    fn test_from_settings() {
        let settings: EvmSettings = serde_json::from_str(
            r#"{"fork":"osaka","modexp_backend":"accelerated","max_call_depth":16}"#,
        )
        .unwrap();
        let config = EvmConfig::from_settings(&settings);
        assert_eq!(config.fork(), Fork::Osaka);
        assert_eq!(config.modexp_backend(), ModExpBackend::Accelerated);
        assert_eq!(config.max_call_depth(), 16);
    }

    #[test]
    fn test_with_gas_calculator() {
        let config = EvmConfig::new(Fork::London).with_gas_calculator(NoopGasCalculator);
        assert_eq!(config.gas_calculator().create_cost(), 0);
    }
}
