//! Per-frame execution state

use crate::contract::Contract;
use crate::error::{EvmError, EvmResult};
use crate::gas::cost::MAX_RETURN_STACK;
use crate::memory::Memory;
use crate::stack::Stack;

/// Saved caller state for a section call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReturnFrame {
    /// Section to resume
    pub section: usize,
    /// Caller's stack floor
    pub stack_floor: usize,
    /// Where execution resumes in `section`
    pub return_pc: usize,
}

/// Section call frames (max 1024)
#[derive(Clone, Debug, Default)]
pub struct ReturnStack {
    frames: Vec<ReturnFrame>,
}

impl ReturnStack {
    /// Create an empty return stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame
    pub fn push(&mut self, frame: ReturnFrame) -> EvmResult<()> {
        if self.frames.len() >= MAX_RETURN_STACK {
            return Err(EvmError::ReturnStackTooDeep);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the innermost frame
    pub fn pop(&mut self) -> EvmResult<ReturnFrame> {
        self.frames.pop().ok_or(EvmError::ReturnStackUnderflow)
    }

    /// Innermost frame
    pub fn last(&self) -> Option<&ReturnFrame> {
        self.frames.last()
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is pushed
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether another push would fail
    pub fn is_full(&self) -> bool {
        self.frames.len() >= MAX_RETURN_STACK
    }
}

/// Mutable state of one call frame
#[derive(Debug)]
pub struct Scope<'a> {
    /// Operand stack
    pub stack: Stack,
    /// Memory
    pub memory: Memory,
    /// Code and call inputs
    pub contract: &'a Contract,
    /// Active code section
    pub section: usize,
    /// Section call frames
    pub return_stack: ReturnStack,
    /// Gas remaining
    pub gas: u64,
    /// State modifications forbidden
    pub read_only: bool,
    /// Output of the last nested call
    pub return_data: Vec<u8>,
}

impl<'a> Scope<'a> {
    /// Fresh frame starting in section 0
    pub fn new(contract: &'a Contract, gas: u64, read_only: bool) -> Self {
        Self {
            stack: Stack::new(),
            memory: Memory::new(),
            contract,
            section: 0,
            return_stack: ReturnStack::new(),
            gas,
            read_only,
            return_data: Vec::new(),
        }
    }

    /// Use gas, returning error if insufficient
    pub fn use_gas(&mut self, amount: u64) -> EvmResult<()> {
        if self.gas < amount {
            return Err(EvmError::OutOfGas);
        }
        self.gas -= amount;
        Ok(())
    }

    /// Give back gas a nested frame left unused
    pub fn return_gas(&mut self, amount: u64) {
        self.gas = self.gas.saturating_add(amount);
    }

    /// Code of the active section
    pub fn code(&self) -> EvmResult<&'a [u8]> {
        self.contract.section_code(self.section)
    }
}
