//! Accrued transaction substate.
//!
//! Logs, refunds, access lists (EIP-2929), transient storage (EIP-1153),
//! created accounts and pending self-destructs. Changes are journaled so a
//! failing frame rolls back exactly what it added, in step with the world
//! state snapshot opened for the same frame.

use bytes::Bytes;
use keel_primitives::{Address, H256, U256};
use std::collections::{HashMap, HashSet};

/// Event emitted by LOG0..LOG4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Unindexed data
    pub data: Bytes,
}

/// Position in the substate journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
enum Change {
    Log,
    Refund(i64),
    WarmAddress(Address),
    WarmSlot(Address, U256),
    Transient(Address, U256, U256),
    Created(Address),
    SelfDestruct,
}

/// Per-transaction substate
#[derive(Debug, Clone, Default)]
pub struct Substate {
    logs: Vec<Log>,
    refund: i64,
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    transient: HashMap<(Address, U256), U256>,
    created: HashSet<Address>,
    selfdestructs: Vec<Address>,
    journal: Vec<Change>,
}

impl Substate {
    /// Create an empty substate
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the current journal position
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Keep changes since `checkpoint`. They stay journaled so an
    /// enclosing revert still undoes them.
    pub fn commit(&mut self, _checkpoint: Checkpoint) {}

    /// Undo changes since `checkpoint`
    pub fn revert(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(change) = self.journal.pop() else {
                break;
            };
            match change {
                Change::Log => {
                    self.logs.pop();
                }
                Change::Refund(previous) => self.refund = previous,
                Change::WarmAddress(address) => {
                    self.warm_addresses.remove(&address);
                }
                Change::WarmSlot(address, key) => {
                    self.warm_slots.remove(&(address, key));
                }
                Change::Transient(address, key, previous) => {
                    self.put_transient(address, key, previous);
                }
                Change::Created(address) => {
                    self.created.remove(&address);
                }
                Change::SelfDestruct => {
                    self.selfdestructs.pop();
                }
            }
        }
    }

    /// Record a log
    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
        self.journal.push(Change::Log);
    }

    /// Logs emitted so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Take the logs, leaving none
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Adjust the refund counter
    pub fn add_refund(&mut self, delta: i64) {
        if delta == 0 {
            return;
        }
        self.journal.push(Change::Refund(self.refund));
        self.refund += delta;
    }

    /// Refund counter
    pub fn refund(&self) -> i64 {
        self.refund
    }

    /// Whether an address is warm
    pub fn is_warm(&self, address: &Address) -> bool {
        self.warm_addresses.contains(address)
    }

    /// Warm an address; returns whether it was already warm
    pub fn warm_address(&mut self, address: Address) -> bool {
        if self.warm_addresses.insert(address) {
            self.journal.push(Change::WarmAddress(address));
            false
        } else {
            true
        }
    }

    /// Whether a storage slot is warm
    pub fn is_slot_warm(&self, address: &Address, key: U256) -> bool {
        self.warm_slots.contains(&(*address, key))
    }

    /// Warm a storage slot; returns whether it was already warm
    pub fn warm_slot(&mut self, address: Address, key: U256) -> bool {
        if self.warm_slots.insert((address, key)) {
            self.journal.push(Change::WarmSlot(address, key));
            false
        } else {
            true
        }
    }

    /// Read transient storage
    pub fn transient(&self, address: &Address, key: U256) -> U256 {
        self.transient
            .get(&(*address, key))
            .copied()
            .unwrap_or_default()
    }

    /// Write transient storage
    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        let previous = self.transient(&address, key);
        self.journal.push(Change::Transient(address, key, previous));
        self.put_transient(address, key, value);
    }

    fn put_transient(&mut self, address: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.transient.remove(&(address, key));
        } else {
            self.transient.insert((address, key), value);
        }
    }

    /// Record an account created in this transaction
    pub fn add_created(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(Change::Created(address));
        }
    }

    /// Whether the account was created in this transaction
    pub fn was_created(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    /// Schedule an account for deletion; returns false if already scheduled
    pub fn add_selfdestruct(&mut self, address: Address) -> bool {
        if self.selfdestructs.contains(&address) {
            return false;
        }
        self.selfdestructs.push(address);
        self.journal.push(Change::SelfDestruct);
        true
    }

    /// Accounts scheduled for deletion
    pub fn selfdestructs(&self) -> &[Address] {
        &self.selfdestructs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_low_u8(n)
    }

    #[test]
    fn test_revert_rolls_back_everything_after_checkpoint() {
        let mut substate = Substate::new();
        substate.warm_address(addr(1));
        substate.add_refund(100);

        let cp = substate.checkpoint();
        substate.warm_address(addr(2));
        substate.warm_slot(addr(1), U256::one());
        substate.add_refund(-40);
        substate.set_transient(addr(1), U256::one(), U256::from(5));
        substate.add_log(Log {
            address: addr(1),
            topics: vec![],
            data: Bytes::new(),
        });
        substate.add_created(addr(3));
        substate.add_selfdestruct(addr(3));
        substate.revert(cp);

        assert!(substate.is_warm(&addr(1)));
        assert!(!substate.is_warm(&addr(2)));
        assert!(!substate.is_slot_warm(&addr(1), U256::one()));
        assert_eq!(substate.refund(), 100);
        assert_eq!(substate.transient(&addr(1), U256::one()), U256::zero());
        assert!(substate.logs().is_empty());
        assert!(!substate.was_created(&addr(3)));
        assert!(substate.selfdestructs().is_empty());
    }

    #[test]
    fn test_warm_reports_previous_state() {
        let mut substate = Substate::new();
        assert!(!substate.warm_address(addr(1)));
        assert!(substate.warm_address(addr(1)));
        assert!(!substate.warm_slot(addr(1), U256::zero()));
        assert!(substate.warm_slot(addr(1), U256::zero()));
    }

    #[test]
    fn test_committed_changes_survive_until_outer_revert() {
        let mut substate = Substate::new();
        let outer = substate.checkpoint();
        let inner = substate.checkpoint();
        substate.add_refund(10);
        substate.commit(inner);
        assert_eq!(substate.refund(), 10);
        substate.revert(outer);
        assert_eq!(substate.refund(), 0);
    }

    #[test]
    fn test_revert_keeps_earlier_selfdestructs_in_order() {
        let mut substate = Substate::new();
        assert!(substate.add_selfdestruct(addr(1)));
        let cp = substate.checkpoint();
        assert!(!substate.add_selfdestruct(addr(1)));
        assert!(substate.add_selfdestruct(addr(2)));
        assert!(substate.add_selfdestruct(addr(3)));
        assert_eq!(substate.selfdestructs(), &[addr(1), addr(2), addr(3)]);
        substate.revert(cp);
        assert_eq!(substate.selfdestructs(), &[addr(1)]);
    }
}
