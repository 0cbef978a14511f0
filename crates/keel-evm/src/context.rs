//! Block and transaction environment

use keel_primitives::{Address, H256, U256};
use std::collections::HashMap;

/// Number of recent block hashes BLOCKHASH can see
pub const BLOCK_HASH_HISTORY: u64 = 256;

/// Block-level context
#[derive(Clone, Debug)]
pub struct BlockContext {
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Fee recipient
    pub coinbase: Address,
    /// Previous RANDAO mix
    pub prevrandao: H256,
    /// Chain id
    pub chain_id: u64,
    /// Base fee (EIP-1559)
    pub base_fee: U256,
    /// Known ancestor hashes by block number
    pub block_hashes: HashMap<u64, H256>,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            prevrandao: H256::ZERO,
            chain_id: 1,
            base_fee: U256::zero(),
            block_hashes: HashMap::new(),
        }
    }
}

impl BlockContext {
    /// Hash of an ancestor within the last 256 blocks, zero otherwise
    pub fn block_hash(&self, number: U256) -> H256 {
        if number >= U256::from(self.number) {
            return H256::ZERO;
        }
        let number = number.low_u64();
        if self.number - number > BLOCK_HASH_HISTORY {
            return H256::ZERO;
        }
        self.block_hashes.get(&number).copied().unwrap_or(H256::ZERO)
    }
}

/// Transaction-level context
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    /// Transaction origin (EOA)
    pub origin: Address,
    /// Effective gas price
    pub gas_price: U256,
}

/// Execution environment shared by all frames of a transaction
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Block context
    pub block: BlockContext,
    /// Transaction context
    pub tx: TxContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_window() {
        let mut block = BlockContext {
            number: 300,
            ..Default::default()
        };
        let hash = H256::from_bytes([7u8; 32]);
        block.block_hashes.insert(299, hash);
        block.block_hashes.insert(43, hash);
        block.block_hashes.insert(44, hash);

        assert_eq!(block.block_hash(U256::from(299)), hash);
        assert_eq!(block.block_hash(U256::from(44)), hash);
        assert_eq!(block.block_hash(U256::from(43)), H256::ZERO);
        assert_eq!(block.block_hash(U256::from(300)), H256::ZERO);
        assert_eq!(block.block_hash(U256::MAX), H256::ZERO);
    }
}
