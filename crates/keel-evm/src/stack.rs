//! EVM operand stack with a movable floor

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::MAX_STACK_SIZE;
use keel_primitives::U256;

/// EVM stack (max 1024 items, 256-bit each)
///
/// Items below `floor` belong to calling sections and are invisible to
/// pop, peek, dup and swap. `height()` is the number of visible items.
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
    floor: usize,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_STACK_SIZE),
            floor: 0,
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        if self.data.len() <= self.floor {
            return Err(EvmError::StackUnderflow);
        }
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Peek at the top of the stack
    pub fn peek(&self) -> EvmResult<&U256> {
        self.peek_at(0)
    }

    /// Peek at a specific depth (0 = top)
    pub fn peek_at(&self, depth: usize) -> EvmResult<&U256> {
        if depth >= self.height() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(&self.data[self.data.len() - 1 - depth])
    }

    /// Swap top with item at depth (1 = swap with second item)
    pub fn swap(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth >= self.height() {
            return Err(EvmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate item at depth to top (1 = dup top)
    pub fn dup(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth > self.height() {
            return Err(EvmError::StackUnderflow);
        }
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        let value = self.data[self.data.len() - depth];
        self.data.push(value);
        Ok(())
    }

    /// Total number of items, including those below the floor
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of items above the floor
    pub fn height(&self) -> usize {
        self.data.len() - self.floor
    }

    /// Current floor
    pub fn floor(&self) -> usize {
        self.floor
    }

    /// Move the floor. It may never rise above the current length.
    pub fn set_floor(&mut self, floor: usize) -> EvmResult<()> {
        if floor > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        self.floor = floor;
        Ok(())
    }

    /// Raw items, bottom first
    pub fn data(&self) -> &[U256] {
        &self.data
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Try to convert a word to usize (None if it does not fit)
pub fn u256_to_usize(value: U256) -> Option<usize> {
    u256_to_u64(value).and_then(|v| usize::try_from(v).ok())
}

/// Try to convert a word to u64 (None if it does not fit)
pub fn u256_to_u64(value: U256) -> Option<u64> {
    if value.bits() > 64 {
        return None;
    }
    Some(value.low_u64())
}

/// Convert a word to usize, clamping at usize::MAX
pub fn u256_to_usize_saturating(value: U256) -> usize {
    u256_to_usize(value).unwrap_or(usize::MAX)
}

/// 1 for true, 0 for false
pub fn u256_from_bool(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}
