//! Execution environment and per-frame shared context

use crate::config::InterpreterConfig;
use crate::host::Host;
use keel_primitives::{Address, U256};

/// Block environment information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block coinbase (miner/validator)
    pub coinbase: Address,
    /// Block difficulty
    pub difficulty: U256,
    /// Chain ID (EIP-1344)
    pub chain_id: u64,
    /// Base fee (EIP-3198)
    pub base_fee: U256,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            difficulty: U256::zero(),
            chain_id: 1,
            base_fee: U256::zero(),
        }
    }
}

/// Transaction environment information
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxContext {
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
}

/// Complete execution environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    /// Block context
    pub block: BlockContext,
    /// Transaction context
    pub tx: TxContext,
}

impl Environment {
    /// Create new environment
    pub fn new(block: BlockContext, tx: TxContext) -> Self {
        Self { block, tx }
    }
}

/// State shared by every step of a frame
pub struct Context<'a> {
    /// Block and transaction environment
    pub env: &'a Environment,
    /// External state
    pub host: &'a mut dyn Host,
    /// Interpreter configuration
    pub config: &'a InterpreterConfig,
}

impl<'a> Context<'a> {
    /// Bundle the frame collaborators
    pub fn new(
        env: &'a Environment,
        host: &'a mut dyn Host,
        config: &'a InterpreterConfig,
    ) -> Self {
        Self { env, host, config }
    }
}
