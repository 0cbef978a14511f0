//! Precompiled contracts.
//!
//! A precompile runs native code in place of bytecode when a message call
//! targets its address. It charges gas up front from the input alone and
//! either succeeds with output or halts the frame.

pub mod modexp;

pub use modexp::{ModExp, ModExpBackend};

use crate::config::Fork;
use crate::error::{HaltReason, OpResult};
use crate::gas::GasCalculator;
use bytes::Bytes;
use keel_primitives::Address;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// SHA-256 address
pub const SHA256_ADDRESS: Address = Address::from_low_u8(0x02);
/// Identity address
pub const IDENTITY_ADDRESS: Address = Address::from_low_u8(0x04);
/// MODEXP address
pub const MODEXP_ADDRESS: Address = Address::from_low_u8(0x05);

/// Successful precompile run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas charged
    pub gas_used: u64,
    /// Returned bytes
    pub output: Bytes,
}

/// A supported precompiled contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precompile {
    /// SHA-256 digest of the input
    Sha256,
    /// Echo the input
    Identity,
    /// Big-integer modular exponentiation
    ModExp(ModExp),
}

impl Precompile {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Precompile::Sha256 => "SHA256",
            Precompile::Identity => "IDENTITY",
            Precompile::ModExp(_) => "MODEXP",
        }
    }

    /// Charge gas and run against `input`
    pub fn execute(
        &self,
        input: &[u8],
        gas_limit: u64,
        calc: &dyn GasCalculator,
    ) -> OpResult<PrecompileOutput> {
        if let Precompile::ModExp(modexp) = self {
            modexp.check_bounds(input)?;
        }

        let gas_used = match self {
            Precompile::Sha256 => calc.sha256_cost(input.len()),
            Precompile::Identity => calc.identity_cost(input.len()),
            Precompile::ModExp(_) => calc.modexp_cost(input),
        };
        if gas_used > gas_limit {
            return Err(HaltReason::InsufficientGas);
        }

        let output = match self {
            Precompile::Sha256 => Bytes::copy_from_slice(&Sha256::digest(input)),
            Precompile::Identity => Bytes::copy_from_slice(input),
            Precompile::ModExp(modexp) => Bytes::from(modexp.compute(input)),
        };
        Ok(PrecompileOutput { gas_used, output })
    }
}

/// Precompiles keyed by address
#[derive(Debug, Clone, Default)]
pub struct PrecompileRegistry {
    contracts: HashMap<Address, Precompile>,
}

impl PrecompileRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for `fork`, with MODEXP computed by `backend`
    pub fn for_fork(fork: Fork, backend: ModExpBackend) -> Self {
        let upper_bound = if fork >= Fork::Osaka { 1024 } else { u64::MAX };
        let mut registry = Self::new();
        registry.insert(SHA256_ADDRESS, Precompile::Sha256);
        registry.insert(IDENTITY_ADDRESS, Precompile::Identity);
        registry.insert(
            MODEXP_ADDRESS,
            Precompile::ModExp(ModExp::new(upper_bound, backend)),
        );
        registry
    }

    /// Register or replace
    pub fn insert(&mut self, address: Address, precompile: Precompile) {
        self.contracts.insert(address, precompile);
    }

    /// Precompile at `address`
    pub fn get(&self, address: &Address) -> Option<&Precompile> {
        self.contracts.get(address)
    }

    /// Whether `address` is a precompile
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Registered addresses
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.contracts.keys()
    }

    /// Number of registered precompiles
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
