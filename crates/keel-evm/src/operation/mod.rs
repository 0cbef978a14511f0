//! Operation dispatch table.
//!
//! Every opcode byte maps to an [`Operation`]: an immutable record of its
//! mnemonic, stack arity, a gas function and an execute function. Bytes
//! with no defined operation map to a sentinel that halts with
//! [`HaltReason::InvalidOperation`]. Tables are built per [`Fork`].

mod arithmetic;
mod bitwise;
mod environment;
mod flow;
mod system;

use crate::config::Fork;
use crate::error::{HaltReason, OpResult};
use crate::frame::Frame;
use crate::gas::Tier;
use crate::host::Host;
use crate::memory::MemoryRange;
use crate::message::Message;
use crate::opcode::*;
use std::fmt;

/// Gas function: cost of the operation in the current frame state.
///
/// Runs before anything is mutated. May also halt, for checks that must
/// precede charging.
pub type GasFn = fn(&Frame, &Host<'_>) -> OpResult<u64>;

/// Execute function
pub type ExecuteFn = fn(&mut Frame, &mut Host<'_>) -> OpResult<Control>;

/// What the interpreter does after an operation
#[derive(Debug)]
pub enum Control {
    /// Advance to the next opcode
    Continue,
    /// Advance past `n` immediate bytes as well
    Skip(usize),
    /// Continue at a validated jump destination
    Jump(usize),
    /// Finish successfully with `frame.output`
    Success,
    /// Revert with `frame.output`
    Revert,
    /// Suspend and run a child frame
    Spawn(Box<Message>),
    /// A call or create failed before a child frame existed; the failure
    /// word is already pushed and the reserved gas returned.
    Rejected(HaltReason),
}

const UNDEFINED: &str = "UNDEFINED";

/// Operation descriptor
#[derive(Clone, Copy)]
pub struct Operation {
    /// Opcode byte
    pub opcode: u8,
    /// Mnemonic
    pub name: &'static str,
    /// Stack items consumed
    pub inputs: usize,
    /// Stack items produced
    pub outputs: usize,
    /// Gas function
    pub gas: GasFn,
    /// Execute function
    pub execute: ExecuteFn,
}

impl Operation {
    /// Build a descriptor
    pub fn new(
        opcode: u8,
        name: &'static str,
        inputs: usize,
        outputs: usize,
        gas: GasFn,
        execute: ExecuteFn,
    ) -> Self {
        Self {
            opcode,
            name,
            inputs,
            outputs,
            gas,
            execute,
        }
    }

    /// Sentinel for an undefined opcode
    pub fn invalid(opcode: u8) -> Self {
        let name = if opcode == INVALID { "INVALID" } else { UNDEFINED };
        Self::new(opcode, name, 0, 0, zero_gas, flow::invalid)
    }

    /// Whether this is the invalid sentinel
    pub fn is_invalid(&self) -> bool {
        self.opcode == INVALID || self.name == UNDEFINED
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("opcode", &format_args!("0x{:02x}", self.opcode))
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Opcode-indexed table of operations
#[derive(Clone)]
pub struct OperationTable {
    operations: Box<[Operation; 256]>,
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defined = self.operations.iter().filter(|op| !op.is_invalid()).count();
        f.debug_struct("OperationTable")
            .field("defined", &defined)
            .finish()
    }
}

impl OperationTable {
    /// A table where every byte is invalid
    pub fn empty() -> Self {
        Self {
            operations: Box::new(std::array::from_fn(|i| Operation::invalid(i as u8))),
        }
    }

    /// Operation for `opcode`
    pub fn get(&self, opcode: u8) -> &Operation {
        &self.operations[opcode as usize]
    }

    /// Install or replace an operation
    pub fn insert(&mut self, operation: Operation) {
        self.operations[operation.opcode as usize] = operation;
    }

    /// Table for a fork
    pub fn for_fork(fork: Fork) -> Self {
        let mut table = Self::empty();
        table.register_berlin();
        if fork >= Fork::London {
            table.insert(Operation::new(BASEFEE, "BASEFEE", 0, 1, base_gas, environment::basefee));
        }
        if fork >= Fork::Shanghai {
            table.insert(Operation::new(PUSH0, "PUSH0", 0, 1, base_gas, flow::push0));
        }
        if fork >= Fork::Cancun {
            table.insert(Operation::new(TLOAD, "TLOAD", 1, 1, flow::transient_gas, flow::tload));
            table.insert(Operation::new(TSTORE, "TSTORE", 2, 0, flow::tstore_gas, flow::tstore));
            table.insert(Operation::new(MCOPY, "MCOPY", 3, 0, flow::mcopy_gas, flow::mcopy));
        }
        if fork >= Fork::Osaka {
            table.insert(Operation::new(CLZ, "CLZ", 1, 1, verylow_gas, bitwise::clz));
        }
        table
    }

    fn register_berlin(&mut self) {
        use arithmetic as a;
        use bitwise as b;
        use environment as e;
        use flow as f;
        use system as s;

        let ops = [
            Operation::new(STOP, "STOP", 0, 0, zero_gas, f::stop),
            Operation::new(ADD, "ADD", 2, 1, verylow_gas, a::add),
            Operation::new(MUL, "MUL", 2, 1, low_gas, a::mul),
            Operation::new(SUB, "SUB", 2, 1, verylow_gas, a::sub),
            Operation::new(DIV, "DIV", 2, 1, low_gas, a::div),
            Operation::new(SDIV, "SDIV", 2, 1, low_gas, a::sdiv),
            Operation::new(MOD, "MOD", 2, 1, low_gas, a::modulo),
            Operation::new(SMOD, "SMOD", 2, 1, low_gas, a::smod),
            Operation::new(ADDMOD, "ADDMOD", 3, 1, mid_gas, a::addmod),
            Operation::new(MULMOD, "MULMOD", 3, 1, mid_gas, a::mulmod),
            Operation::new(EXP, "EXP", 2, 1, a::exp_gas, a::exp),
            Operation::new(SIGNEXTEND, "SIGNEXTEND", 2, 1, low_gas, a::sign_extend),
            Operation::new(LT, "LT", 2, 1, verylow_gas, b::lt),
            Operation::new(GT, "GT", 2, 1, verylow_gas, b::gt),
            Operation::new(SLT, "SLT", 2, 1, verylow_gas, b::slt),
            Operation::new(SGT, "SGT", 2, 1, verylow_gas, b::sgt),
            Operation::new(EQ, "EQ", 2, 1, verylow_gas, b::eq),
            Operation::new(ISZERO, "ISZERO", 1, 1, verylow_gas, b::iszero),
            Operation::new(AND, "AND", 2, 1, verylow_gas, b::and),
            Operation::new(OR, "OR", 2, 1, verylow_gas, b::or),
            Operation::new(XOR, "XOR", 2, 1, verylow_gas, b::xor),
            Operation::new(NOT, "NOT", 1, 1, verylow_gas, b::not),
            Operation::new(BYTE, "BYTE", 2, 1, verylow_gas, b::byte),
            Operation::new(SHL, "SHL", 2, 1, verylow_gas, b::shl),
            Operation::new(SHR, "SHR", 2, 1, verylow_gas, b::shr),
            Operation::new(SAR, "SAR", 2, 1, verylow_gas, b::sar),
            Operation::new(KECCAK256, "KECCAK256", 2, 1, e::keccak256_gas, e::keccak),
            Operation::new(ADDRESS, "ADDRESS", 0, 1, base_gas, e::address),
            Operation::new(BALANCE, "BALANCE", 1, 1, e::account_access_gas, e::balance),
            Operation::new(ORIGIN, "ORIGIN", 0, 1, base_gas, e::origin),
            Operation::new(CALLER, "CALLER", 0, 1, base_gas, e::caller),
            Operation::new(CALLVALUE, "CALLVALUE", 0, 1, base_gas, e::callvalue),
            Operation::new(CALLDATALOAD, "CALLDATALOAD", 1, 1, verylow_gas, e::calldataload),
            Operation::new(CALLDATASIZE, "CALLDATASIZE", 0, 1, base_gas, e::calldatasize),
            Operation::new(CALLDATACOPY, "CALLDATACOPY", 3, 0, e::copy_gas, e::calldatacopy),
            Operation::new(CODESIZE, "CODESIZE", 0, 1, base_gas, e::codesize),
            Operation::new(CODECOPY, "CODECOPY", 3, 0, e::copy_gas, e::codecopy),
            Operation::new(GASPRICE, "GASPRICE", 0, 1, base_gas, e::gasprice),
            Operation::new(EXTCODESIZE, "EXTCODESIZE", 1, 1, e::account_access_gas, e::extcodesize),
            Operation::new(EXTCODECOPY, "EXTCODECOPY", 4, 0, e::extcodecopy_gas, e::extcodecopy),
            Operation::new(RETURNDATASIZE, "RETURNDATASIZE", 0, 1, base_gas, e::returndatasize),
            Operation::new(RETURNDATACOPY, "RETURNDATACOPY", 3, 0, e::returndatacopy_gas, e::returndatacopy),
            Operation::new(EXTCODEHASH, "EXTCODEHASH", 1, 1, e::account_access_gas, e::extcodehash),
            Operation::new(BLOCKHASH, "BLOCKHASH", 1, 1, blockhash_gas, e::blockhash),
            Operation::new(COINBASE, "COINBASE", 0, 1, base_gas, e::coinbase),
            Operation::new(TIMESTAMP, "TIMESTAMP", 0, 1, base_gas, e::timestamp),
            Operation::new(NUMBER, "NUMBER", 0, 1, base_gas, e::number),
            Operation::new(PREVRANDAO, "PREVRANDAO", 0, 1, base_gas, e::prevrandao),
            Operation::new(GASLIMIT, "GASLIMIT", 0, 1, base_gas, e::gaslimit),
            Operation::new(CHAINID, "CHAINID", 0, 1, base_gas, e::chainid),
            Operation::new(SELFBALANCE, "SELFBALANCE", 0, 1, low_gas, e::selfbalance),
            Operation::new(POP, "POP", 1, 0, base_gas, f::pop),
            Operation::new(MLOAD, "MLOAD", 1, 1, f::word_access_gas, f::mload),
            Operation::new(MSTORE, "MSTORE", 2, 0, f::word_access_gas, f::mstore),
            Operation::new(MSTORE8, "MSTORE8", 2, 0, f::byte_access_gas, f::mstore8),
            Operation::new(SLOAD, "SLOAD", 1, 1, f::sload_gas, f::sload),
            Operation::new(SSTORE, "SSTORE", 2, 0, f::sstore_gas, f::sstore),
            Operation::new(JUMP, "JUMP", 1, 0, mid_gas, f::jump),
            Operation::new(JUMPI, "JUMPI", 2, 0, high_gas, f::jumpi),
            Operation::new(PC, "PC", 0, 1, base_gas, f::pc),
            Operation::new(MSIZE, "MSIZE", 0, 1, base_gas, f::msize),
            Operation::new(GAS, "GAS", 0, 1, base_gas, f::gas),
            Operation::new(JUMPDEST, "JUMPDEST", 0, 0, jumpdest_gas, f::jumpdest),
            Operation::new(CREATE, "CREATE", 3, 1, s::create_gas, s::create),
            Operation::new(CALL, "CALL", 7, 1, s::call_gas, s::call),
            Operation::new(CALLCODE, "CALLCODE", 7, 1, s::call_gas, s::callcode),
            Operation::new(RETURN, "RETURN", 2, 0, s::halt_with_data_gas, s::return_),
            Operation::new(DELEGATECALL, "DELEGATECALL", 6, 1, s::call_gas, s::delegatecall),
            Operation::new(CREATE2, "CREATE2", 4, 1, s::create_gas, s::create2),
            Operation::new(STATICCALL, "STATICCALL", 6, 1, s::call_gas, s::staticcall),
            Operation::new(REVERT, "REVERT", 2, 0, s::halt_with_data_gas, s::revert),
            Operation::new(SELFDESTRUCT, "SELFDESTRUCT", 1, 0, s::selfdestruct_gas, s::selfdestruct),
        ];
        for op in ops {
            self.insert(op);
        }

        for opcode in PUSH1..=PUSH32 {
            let name = PUSH_NAMES[(opcode - PUSH1) as usize];
            self.insert(Operation::new(opcode, name, 0, 1, verylow_gas, f::push));
        }
        for opcode in DUP1..=DUP16 {
            let n = (opcode - DUP1) as usize + 1;
            let name = DUP_NAMES[n - 1];
            self.insert(Operation::new(opcode, name, n, n + 1, verylow_gas, f::dup));
        }
        for opcode in SWAP1..=SWAP16 {
            let n = (opcode - SWAP1) as usize + 1;
            let name = SWAP_NAMES[n - 1];
            self.insert(Operation::new(opcode, name, n + 1, n + 1, verylow_gas, f::swap));
        }
        for opcode in LOG0..=LOG4 {
            let topics = (opcode - LOG0) as usize;
            let name = LOG_NAMES[topics];
            self.insert(Operation::new(opcode, name, topics + 2, 0, s::log_gas, s::log));
        }
    }
}

const PUSH_NAMES: [&str; 32] = [
    "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9", "PUSH10",
    "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18", "PUSH19",
    "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27", "PUSH28",
    "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP_NAMES: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
    "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP_NAMES: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
    "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];

const LOG_NAMES: [&str; 5] = ["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"];

macro_rules! tier_gas {
    ($($name:ident => $tier:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(_frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
                Ok(host.gas().tier_cost(Tier::$tier))
            }
        )*
    };
}

tier_gas! {
    zero_gas => Zero,
    base_gas => Base,
    verylow_gas => VeryLow,
    low_gas => Low,
    mid_gas => Mid,
    high_gas => High,
    jumpdest_gas => JumpDest,
    blockhash_gas => BlockHash,
}

/// Memory growth cost for touching any of `ranges`
pub(crate) fn expansion_cost(frame: &Frame, host: &Host<'_>, ranges: &[Option<MemoryRange>]) -> u64 {
    let end = ranges.iter().flatten().map(MemoryRange::end).max();
    match end {
        Some(end) => host.gas().memory_expansion_cost(frame.memory.len(), end),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_bytes_are_invalid() {
        let table = OperationTable::for_fork(Fork::Osaka);
        for opcode in [0x0c, 0x21, 0x49, 0xa5, 0xef, 0xfe] {
            assert!(table.get(opcode).is_invalid(), "0x{opcode:02x}");
        }
        assert_eq!(table.get(0xfe).name, "INVALID");
    }

    #[test]
    fn test_fork_gating() {
        let berlin = OperationTable::for_fork(Fork::Berlin);
        assert!(berlin.get(PUSH0).is_invalid());
        assert!(berlin.get(BASEFEE).is_invalid());
        assert!(berlin.get(CLZ).is_invalid());

        let cancun = OperationTable::for_fork(Fork::Cancun);
        assert_eq!(cancun.get(PUSH0).name, "PUSH0");
        assert_eq!(cancun.get(MCOPY).name, "MCOPY");
        assert!(cancun.get(CLZ).is_invalid());

        let osaka = OperationTable::for_fork(Fork::Osaka);
        assert_eq!(osaka.get(CLZ).name, "CLZ");
    }

    #[test]
    fn test_arity_of_families() {
        let table = OperationTable::for_fork(Fork::Osaka);
        assert_eq!(table.get(0x7f).name, "PUSH32");
        let dup16 = table.get(DUP16);
        assert_eq!((dup16.inputs, dup16.outputs), (16, 17));
        let swap16 = table.get(SWAP16);
        assert_eq!((swap16.inputs, swap16.outputs), (17, 17));
        let log4 = table.get(LOG4);
        assert_eq!((log4.name, log4.inputs), ("LOG4", 6));
        assert_eq!(table.get(CALL).inputs, 7);
        assert_eq!(table.get(STATICCALL).inputs, 6);
    }

    #[test]
    fn test_every_opcode_byte_is_mapped() {
        let table = OperationTable::for_fork(Fork::Berlin);
        for byte in 0..=255u8 {
            assert_eq!(table.get(byte).opcode, byte);
        }
    }
}
