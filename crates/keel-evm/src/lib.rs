//! # keel-evm
//!
//! Instruction dispatch and feature activation core for the keel VM.
//!
//! This crate provides:
//! - A 256-slot [`JumpTable`] of [`Operation`] descriptors
//! - EIP activation on owned tables ([`enable_eip`], [`JumpTable::with_eips`])
//! - Hardfork instruction sets ([`Hardfork`])
//! - Gas constants and dynamic gas functions for state access
//! - Section control flow (`RJUMP`, `RJUMPI`, `CALLF`, `RETF`)
//! - A reference [`Interpreter`] loop driving a [`Host`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bytecode;
pub mod config;
pub mod context;
pub mod contract;
pub mod dynamic_gas;
pub mod eips;
pub mod error;
pub mod fork;
pub mod gas;
pub mod host;
pub mod instructions;
pub mod interpreter;
pub mod keccak;
pub mod memory;
pub mod opcode;
pub mod scope;
pub mod stack;
pub mod table;

pub use config::{InterpreterConfig, JumpTargetCheck};
pub use context::{BlockContext, Context, Environment, TxContext};
pub use contract::{Container, Contract, SectionType};
pub use eips::{activatable_eips, enable_eip, is_valid_eip};
pub use error::{EvmError, EvmResult, ExecutionResult, Log};
pub use fork::Hardfork;
pub use host::{
    Account, CallInputs, CallKind, CallOutcome, CreateInputs, CreateKind, CreateOutcome, Host,
    MemoryHost,
};
pub use interpreter::Interpreter;
pub use memory::Memory;
pub use opcode::Opcode;
pub use scope::{ReturnFrame, ReturnStack, Scope};
pub use stack::Stack;
pub use table::{DynamicGasFn, ExecuteFn, JumpTable, Next, Operation};

pub use keel_primitives::{Address, H256, U256};
