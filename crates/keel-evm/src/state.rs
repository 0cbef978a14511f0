//! World-state view.
//!
//! The engine reads and writes accounts only through [`WorldState`]. How
//! the data is persisted, or how it is committed to a trie, is the
//! implementor's business. The view must support nested snapshots: one is
//! opened per frame and either committed or discarded when the frame ends.

use crate::error::{HaltReason, OpResult};
use bytes::Bytes;
use keel_primitives::{keccak256, Address, H256, KECCAK_EMPTY, U256};
use std::collections::HashMap;

/// Account data visible to the engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Balance in wei
    pub balance: U256,
    /// Nonce
    pub nonce: u64,
    /// Runtime code
    pub code: Bytes,
}

impl Account {
    /// Account holding only a balance
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Check if account is empty (EIP-161)
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }

    /// Keccak-256 of the code
    pub fn code_hash(&self) -> H256 {
        if self.code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&self.code)
        }
    }
}

/// Marker returned by [`WorldState::snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub usize);

/// Account and storage access for the engine.
pub trait WorldState {
    /// Account at `address`, `None` if it does not exist
    fn account(&self, address: &Address) -> Option<Account>;

    /// Current value of a storage slot
    fn storage(&self, address: &Address, key: U256) -> U256;

    /// Value of a storage slot at the start of the transaction
    fn original_storage(&self, address: &Address, key: U256) -> U256;

    /// Whether the account has no nonzero storage
    fn is_storage_empty(&self, address: &Address) -> bool;

    /// Write a storage slot
    fn set_storage(&mut self, address: &Address, key: U256, value: U256);

    /// Remove every storage slot of an account
    fn clear_storage(&mut self, address: &Address);

    /// Set the balance, creating the account if needed
    fn set_balance(&mut self, address: &Address, balance: U256);

    /// Set the nonce, creating the account if needed
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// Set the code, creating the account if needed
    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Remove an account and its storage
    fn delete_account(&mut self, address: &Address);

    /// Open a nested snapshot
    fn snapshot(&mut self) -> SnapshotId;

    /// Keep every change made since `id` and close it
    fn commit(&mut self, id: SnapshotId);

    /// Undo every change made since `id` and close it
    fn discard(&mut self, id: SnapshotId);

    /// Whether an account exists
    fn exists(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Whether an account is absent or empty (EIP-161)
    fn is_dead(&self, address: &Address) -> bool {
        self.account(address).map_or(true, |a| a.is_empty())
    }

    /// Balance, zero for a missing account
    fn balance(&self, address: &Address) -> U256 {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    /// Nonce, zero for a missing account
    fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.nonce).unwrap_or_default()
    }

    /// Code, empty for a missing account
    fn code(&self, address: &Address) -> Bytes {
        self.account(address).map(|a| a.code).unwrap_or_default()
    }
}

/// Move `value` from one account to another.
///
/// Fails without touching anything if the sender cannot cover it.
pub fn transfer(
    state: &mut dyn WorldState,
    from: &Address,
    to: &Address,
    value: U256,
) -> OpResult<()> {
    let from_balance = state.balance(from);
    let remaining = from_balance
        .checked_sub(value)
        .ok_or(HaltReason::InsufficientBalance)?;
    if from == to {
        return Ok(());
    }
    state.set_balance(from, remaining);
    let to_balance = state.balance(to);
    state.set_balance(to, to_balance.saturating_add(value));
    Ok(())
}

#[derive(Debug, Clone)]
enum JournalEntry {
    Account {
        address: Address,
        previous: Option<Account>,
    },
    Storage {
        address: Address,
        key: U256,
        previous: U256,
    },
    StorageCleared {
        address: Address,
        previous: HashMap<U256, U256>,
    },
}

/// In-memory world state with an undo journal.
///
/// Cloning yields an independent copy, which is how concurrent executions
/// get isolated views.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorldState {
    accounts: HashMap<Address, Account>,
    storage: HashMap<Address, HashMap<U256, U256>>,
    original: HashMap<(Address, U256), U256>,
    journal: Vec<JournalEntry>,
    open_snapshots: usize,
}

impl InMemoryWorldState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account outside of any snapshot
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Seed a storage slot outside of any snapshot
    pub fn insert_storage(&mut self, address: Address, key: U256, value: U256) {
        if value.is_zero() {
            if let Some(slots) = self.storage.get_mut(&address) {
                slots.remove(&key);
            }
        } else {
            self.storage.entry(address).or_default().insert(key, value);
        }
    }

    /// Forget transaction-start storage values; call between transactions.
    pub fn finish_transaction(&mut self) {
        self.original.clear();
        self.journal.clear();
        self.open_snapshots = 0;
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn touch_account(&mut self, address: &Address) -> &mut Account {
        self.journal.push(JournalEntry::Account {
            address: *address,
            previous: self.accounts.get(address).cloned(),
        });
        self.accounts.entry(*address).or_default()
    }

    fn remember_original(&mut self, address: &Address, key: U256) {
        if !self.original.contains_key(&(*address, key)) {
            let current = self.storage(address, key);
            self.original.insert((*address, key), current);
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Account { address, previous } => match previous {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Storage {
                address,
                key,
                previous,
            } => self.insert_storage(address, key, previous),
            JournalEntry::StorageCleared { address, previous } => {
                if previous.is_empty() {
                    self.storage.remove(&address);
                } else {
                    self.storage.insert(address, previous);
                }
            }
        }
    }
}

impl WorldState for InMemoryWorldState {
    fn account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: U256) -> U256 {
        self.storage
            .get(address)
            .and_then(|slots| slots.get(&key))
            .copied()
            .unwrap_or_default()
    }

    fn original_storage(&self, address: &Address, key: U256) -> U256 {
        match self.original.get(&(*address, key)) {
            Some(value) => *value,
            None => self.storage(address, key),
        }
    }

    fn is_storage_empty(&self, address: &Address) -> bool {
        self.storage.get(address).map_or(true, |slots| slots.is_empty())
    }

    fn set_storage(&mut self, address: &Address, key: U256, value: U256) {
        self.remember_original(address, key);
        let previous = self.storage(address, key);
        self.journal.push(JournalEntry::Storage {
            address: *address,
            key,
            previous,
        });
        self.insert_storage(*address, key, value);
    }

    fn clear_storage(&mut self, address: &Address) {
        let previous = self.storage.remove(address).unwrap_or_default();
        for (key, value) in &previous {
            self.original.entry((*address, *key)).or_insert(*value);
        }
        self.journal.push(JournalEntry::StorageCleared {
            address: *address,
            previous,
        });
    }

    fn set_balance(&mut self, address: &Address, balance: U256) {
        self.touch_account(address).balance = balance;
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        self.touch_account(address).nonce = nonce;
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        self.touch_account(address).code = code;
    }

    fn delete_account(&mut self, address: &Address) {
        self.journal.push(JournalEntry::Account {
            address: *address,
            previous: self.accounts.remove(address),
        });
        self.clear_storage(address);
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.open_snapshots += 1;
        SnapshotId(self.journal.len())
    }

    fn commit(&mut self, _id: SnapshotId) {
        self.open_snapshots = self.open_snapshots.saturating_sub(1);
        if self.open_snapshots == 0 {
            self.journal.clear();
        }
    }

    fn discard(&mut self, id: SnapshotId) {
        while self.journal.len() > id.0 {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.open_snapshots = self.open_snapshots.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_low_u8(n)
    }

    #[test]
    fn test_discard_restores_everything() {
        let mut state = InMemoryWorldState::new();
        state.insert_account(addr(1), Account::with_balance(U256::from(100)));
        state.insert_storage(addr(1), U256::one(), U256::from(7));

        let snap = state.snapshot();
        state.set_balance(&addr(1), U256::from(5));
        state.set_storage(&addr(1), U256::one(), U256::from(9));
        state.set_nonce(&addr(2), 3);
        state.clear_storage(&addr(1));
        state.discard(snap);

        assert_eq!(state.balance(&addr(1)), U256::from(100));
        assert_eq!(state.storage(&addr(1), U256::one()), U256::from(7));
        assert!(!state.exists(&addr(2)));
    }

    #[test]
    fn test_nested_commit_then_outer_discard() {
        let mut state = InMemoryWorldState::new();
        let outer = state.snapshot();
        let inner = state.snapshot();
        state.set_balance(&addr(1), U256::from(10));
        state.commit(inner);
        assert_eq!(state.balance(&addr(1)), U256::from(10));
        state.discard(outer);
        assert!(!state.exists(&addr(1)));
    }

    #[test]
    fn test_original_storage_tracks_first_write() {
        let mut state = InMemoryWorldState::new();
        state.insert_storage(addr(1), U256::one(), U256::from(1));
        state.set_storage(&addr(1), U256::one(), U256::from(2));
        state.set_storage(&addr(1), U256::one(), U256::from(3));
        assert_eq!(state.original_storage(&addr(1), U256::one()), U256::from(1));
        assert_eq!(state.storage(&addr(1), U256::one()), U256::from(3));
        state.finish_transaction();
        assert_eq!(state.original_storage(&addr(1), U256::one()), U256::from(3));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut state = InMemoryWorldState::new();
        state.insert_account(addr(1), Account::with_balance(U256::from(5)));
        assert_eq!(
            transfer(&mut state, &addr(1), &addr(2), U256::from(6)),
            Err(HaltReason::InsufficientBalance)
        );
        transfer(&mut state, &addr(1), &addr(2), U256::from(5)).unwrap();
        assert_eq!(state.balance(&addr(1)), U256::zero());
        assert_eq!(state.balance(&addr(2)), U256::from(5));
    }

    #[test]
    fn test_account_emptiness() {
        assert!(Account::default().is_empty());
        assert!(!Account::with_balance(U256::one()).is_empty());
        assert_eq!(Account::default().code_hash(), KECCAK_EMPTY);
    }
}
