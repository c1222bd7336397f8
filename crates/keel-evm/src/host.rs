//! External state access for executing frames

use crate::error::Log;
use crate::keccak::{keccak256, KECCAK_EMPTY};
use keel_primitives::{Address, H256, U256};
use std::collections::{HashMap, HashSet};

/// Flavour of a message call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// CALL
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
}

/// Message call request handed to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInputs {
    /// Call flavour
    pub kind: CallKind,
    /// Caller seen by the callee
    pub caller: Address,
    /// Address whose storage the callee acts on
    pub address: Address,
    /// Address whose code runs
    pub code_address: Address,
    /// Value (apparent value for DELEGATECALL)
    pub value: U256,
    /// Call data
    pub input: Vec<u8>,
    /// Gas forwarded, stipend included
    pub gas: u64,
    /// Callee runs read-only
    pub is_static: bool,
}

/// Result of a message call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOutcome {
    /// Whether the callee succeeded
    pub success: bool,
    /// Unused gas returned to the caller
    pub gas_left: u64,
    /// Return or revert data
    pub output: Vec<u8>,
}

/// Address derivation scheme for contract creation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateKind {
    /// CREATE (sender + nonce)
    Create,
    /// CREATE2 (sender + salt + init code hash)
    Create2 {
        /// Salt
        salt: U256,
    },
}

/// Contract creation request handed to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateInputs {
    /// Derivation scheme
    pub kind: CreateKind,
    /// Creating contract
    pub caller: Address,
    /// Endowment
    pub value: U256,
    /// Init code
    pub init_code: Vec<u8>,
    /// Gas forwarded
    pub gas: u64,
}

/// Result of a contract creation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    /// New contract address, None on failure
    pub address: Option<Address>,
    /// Unused gas returned to the caller
    pub gas_left: u64,
    /// Revert data on failure
    pub output: Vec<u8>,
}

/// State and effects an executing frame needs from its surroundings
///
/// Every query is a single synchronous lookup.
pub trait Host {
    /// Account balance
    fn balance(&self, address: &Address) -> U256;
    /// Account code (empty if none)
    fn code(&self, address: &Address) -> &[u8];
    /// Account code length
    fn code_size(&self, address: &Address) -> usize {
        self.code(address).len()
    }
    /// Code hash; zero for empty accounts
    fn code_hash(&self, address: &Address) -> H256;
    /// Empty per EIP-161 (no nonce, no balance, no code)
    fn is_empty(&self, address: &Address) -> bool;
    /// Hash of a recent block
    fn block_hash(&self, number: u64) -> H256;

    /// Current storage value
    fn storage(&self, address: &Address, key: &H256) -> U256;
    /// Storage value at the start of the transaction
    fn committed_storage(&self, address: &Address, key: &H256) -> U256;
    /// Write storage
    fn set_storage(&mut self, address: Address, key: H256, value: U256);

    /// Transient storage value (EIP-1153)
    fn transient(&self, address: &Address, key: &H256) -> U256;
    /// Write transient storage
    fn set_transient(&mut self, address: Address, key: H256, value: U256);

    /// Whether the address is in the access set (EIP-2929)
    fn is_warm_address(&self, address: &Address) -> bool;
    /// Add an address to the access set
    fn warm_address(&mut self, address: Address);
    /// Whether the slot is in the access set
    fn is_warm_slot(&self, address: &Address, key: &H256) -> bool;
    /// Add a slot to the access set
    fn warm_slot(&mut self, address: Address, key: H256);

    /// Increase the refund counter
    fn add_refund(&mut self, gas: u64);
    /// Decrease the refund counter
    fn sub_refund(&mut self, gas: u64);
    /// Current refund counter
    fn refund(&self) -> u64;

    /// Record a log
    fn log(&mut self, log: Log);
    /// Schedule `address` for destruction, sending its balance to `beneficiary`
    fn selfdestruct(&mut self, address: Address, beneficiary: Address);
    /// Whether `address` already self-destructed in this transaction
    fn has_selfdestructed(&self, address: &Address) -> bool;
    /// Run a nested message call
    fn call(&mut self, inputs: CallInputs) -> CallOutcome;
    /// Run a nested contract creation
    fn create(&mut self, inputs: CreateInputs) -> CreateOutcome;
}

/// Account data held by [`MemoryHost`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// Contract code
    pub code: Vec<u8>,
}

impl Account {
    /// Check if account is empty (EIP-161)
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }
}

/// In-memory host
///
/// Nested frames are not executed: `call` and `create` record their inputs
/// and return the configured outcome.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    accounts: HashMap<Address, Account>,
    storage: HashMap<(Address, H256), U256>,
    committed: HashMap<(Address, H256), U256>,
    transient: HashMap<(Address, H256), U256>,
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, H256)>,
    refund: u64,
    logs: Vec<Log>,
    destructed: HashMap<Address, Address>,
    block_hashes: HashMap<u64, H256>,
    call_outcome: CallOutcome,
    create_outcome: CreateOutcome,
    calls: Vec<CallInputs>,
    creates: Vec<CreateInputs>,
}

impl MemoryHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Set an account balance, creating the account if needed
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Set account code, creating the account if needed
    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        self.accounts.entry(address).or_default().code = code;
    }

    /// Seed storage as committed pre-transaction state
    pub fn insert_storage(&mut self, address: Address, key: H256, value: U256) {
        self.storage.insert((address, key), value);
        self.committed.insert((address, key), value);
    }

    /// Register a block hash
    pub fn set_block_hash(&mut self, number: u64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }

    /// Outcome returned by every nested call
    pub fn set_call_outcome(&mut self, outcome: CallOutcome) {
        self.call_outcome = outcome;
    }

    /// Outcome returned by every nested creation
    pub fn set_create_outcome(&mut self, outcome: CreateOutcome) {
        self.create_outcome = outcome;
    }

    /// End the transaction: current storage becomes committed, transient
    /// storage, access sets, refunds and self-destructs are cleared
    pub fn commit(&mut self) {
        self.committed = self.storage.clone();
        self.transient.clear();
        self.warm_addresses.clear();
        self.warm_slots.clear();
        self.refund = 0;
        for (address, beneficiary) in std::mem::take(&mut self.destructed) {
            let balance = self
                .accounts
                .remove(&address)
                .map(|a| a.balance)
                .unwrap_or_default();
            if address != beneficiary {
                let target = self.accounts.entry(beneficiary).or_default();
                target.balance = target.balance.saturating_add(balance);
            }
            self.storage.retain(|(owner, _), _| *owner != address);
            self.committed.retain(|(owner, _), _| *owner != address);
        }
    }

    /// Account, if present
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Logs recorded so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Nested calls requested so far
    pub fn calls(&self) -> &[CallInputs] {
        &self.calls
    }

    /// Nested creations requested so far
    pub fn creates(&self) -> &[CreateInputs] {
        &self.creates
    }
}

impl Host for MemoryHost {
    fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn code(&self, address: &Address) -> &[u8] {
        self.accounts
            .get(address)
            .map(|a| a.code.as_slice())
            .unwrap_or(&[])
    }

    fn code_hash(&self, address: &Address) -> H256 {
        match self.accounts.get(address) {
            Some(account) if !account.is_empty() => {
                if account.code.is_empty() {
                    KECCAK_EMPTY
                } else {
                    keccak256(&account.code)
                }
            }
            _ => H256::ZERO,
        }
    }

    fn is_empty(&self, address: &Address) -> bool {
        self.accounts.get(address).map_or(true, Account::is_empty)
    }

    fn block_hash(&self, number: u64) -> H256 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn storage(&self, address: &Address, key: &H256) -> U256 {
        self.storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn committed_storage(&self, address: &Address, key: &H256) -> U256 {
        self.committed
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        self.storage.insert((address, key), value);
    }

    fn transient(&self, address: &Address, key: &H256) -> U256 {
        self.transient
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn set_transient(&mut self, address: Address, key: H256, value: U256) {
        self.transient.insert((address, key), value);
    }

    fn is_warm_address(&self, address: &Address) -> bool {
        self.warm_addresses.contains(address)
    }

    fn warm_address(&mut self, address: Address) {
        self.warm_addresses.insert(address);
    }

    fn is_warm_slot(&self, address: &Address, key: &H256) -> bool {
        self.warm_slots.contains(&(*address, *key))
    }

    fn warm_slot(&mut self, address: Address, key: H256) {
        self.warm_slots.insert((address, key));
    }

    fn add_refund(&mut self, gas: u64) {
        self.refund = self.refund.saturating_add(gas);
    }

    fn sub_refund(&mut self, gas: u64) {
        if gas > self.refund {
            tracing::warn!("refund counter below zero ({} - {})", self.refund, gas);
        }
        self.refund = self.refund.saturating_sub(gas);
    }

    fn refund(&self) -> u64 {
        self.refund
    }

    fn log(&mut self, log: Log) {
        self.logs.push(log);
    }

    fn selfdestruct(&mut self, address: Address, beneficiary: Address) {
        self.destructed.entry(address).or_insert(beneficiary);
    }

    fn has_selfdestructed(&self, address: &Address) -> bool {
        self.destructed.contains_key(address)
    }

    fn call(&mut self, inputs: CallInputs) -> CallOutcome {
        tracing::debug!(
            "nested call {:?} to {} with {} gas",
            inputs.kind,
            inputs.code_address,
            inputs.gas
        );
        self.calls.push(inputs);
        self.call_outcome.clone()
    }

    fn create(&mut self, inputs: CreateInputs) -> CreateOutcome {
        tracing::debug!("nested create {:?} with {} gas", inputs.kind, inputs.gas);
        self.creates.push(inputs);
        self.create_outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn key(v: u64) -> H256 {
        H256::from_word(U256::from(v))
    }

    #[test]
    fn test_missing_account_defaults() {
        let host = MemoryHost::new();
        assert!(host.balance(&addr(1)).is_zero());
        assert!(host.code(&addr(1)).is_empty());
        assert_eq!(host.code_size(&addr(1)), 0);
        assert_eq!(host.code_hash(&addr(1)), H256::ZERO);
        assert!(host.is_empty(&addr(1)));
    }

    #[test]
    fn test_nonce_only_account_is_not_empty() {
        let mut host = MemoryHost::new();
        host.insert_account(
            addr(1),
            Account {
                nonce: 1,
                ..Account::default()
            },
        );
        assert!(!host.is_empty(&addr(1)));
        assert_eq!(host.account(&addr(1)).map(|a| a.nonce), Some(1));
    }

    #[test]
    fn test_code_hash() {
        let mut host = MemoryHost::new();
        host.set_balance(addr(1), U256::from(1u64));
        assert_eq!(host.code_hash(&addr(1)), KECCAK_EMPTY);

        host.set_code(addr(2), vec![0x00]);
        assert_eq!(host.code_hash(&addr(2)), keccak256(&[0x00]));
        assert!(!host.is_empty(&addr(2)));
    }

    #[test]
    fn test_storage_committed_vs_current() {
        let mut host = MemoryHost::new();
        host.insert_storage(addr(1), key(1), U256::from(5u64));
        host.set_storage(addr(1), key(1), U256::from(6u64));

        assert_eq!(host.storage(&addr(1), &key(1)), U256::from(6u64));
        assert_eq!(host.committed_storage(&addr(1), &key(1)), U256::from(5u64));

        host.commit();
        assert_eq!(host.committed_storage(&addr(1), &key(1)), U256::from(6u64));
    }

    #[test]
    fn test_transient_cleared_on_commit() {
        let mut host = MemoryHost::new();
        host.set_transient(addr(1), key(1), U256::from(9u64));
        assert_eq!(host.transient(&addr(1), &key(1)), U256::from(9u64));
        // Transient storage is separate from persistent storage
        assert!(host.storage(&addr(1), &key(1)).is_zero());

        host.commit();
        assert!(host.transient(&addr(1), &key(1)).is_zero());
    }

    #[test]
    fn test_access_sets() {
        let mut host = MemoryHost::new();
        assert!(!host.is_warm_address(&addr(1)));
        host.warm_address(addr(1));
        assert!(host.is_warm_address(&addr(1)));

        assert!(!host.is_warm_slot(&addr(1), &key(3)));
        host.warm_slot(addr(1), key(3));
        assert!(host.is_warm_slot(&addr(1), &key(3)));
        assert!(!host.is_warm_slot(&addr(2), &key(3)));
    }

    #[test]
    fn test_refund_counter() {
        let mut host = MemoryHost::new();
        host.add_refund(15000);
        host.sub_refund(4800);
        assert_eq!(host.refund(), 10200);
        host.sub_refund(20000);
        assert_eq!(host.refund(), 0);
    }

    #[test]
    fn test_selfdestruct_settles_on_commit() {
        let mut host = MemoryHost::new();
        host.set_balance(addr(1), U256::from(100u64));
        host.insert_storage(addr(1), key(1), U256::from(1u64));

        host.selfdestruct(addr(1), addr(2));
        assert!(host.has_selfdestructed(&addr(1)));

        host.commit();
        assert!(host.account(&addr(1)).is_none());
        assert_eq!(host.balance(&addr(2)), U256::from(100u64));
        assert!(host.storage(&addr(1), &key(1)).is_zero());
        assert!(!host.has_selfdestructed(&addr(1)));
    }

    #[test]
    fn test_call_records_inputs() {
        let mut host = MemoryHost::new();
        host.set_call_outcome(CallOutcome {
            success: true,
            gas_left: 10,
            output: vec![1],
        });
        let outcome = host.call(CallInputs {
            kind: CallKind::StaticCall,
            caller: addr(1),
            address: addr(2),
            code_address: addr(2),
            value: U256::zero(),
            input: vec![],
            gas: 100,
            is_static: true,
        });
        assert!(outcome.success);
        assert_eq!(host.calls().len(), 1);
        assert_eq!(host.calls()[0].kind, CallKind::StaticCall);
    }
}
