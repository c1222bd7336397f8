//! EVM error types

use keel_primitives::{Address, H256};
use thiserror::Error;

/// EVM errors: table configuration, execution faults and reverts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// No activator registered for this EIP
    #[error("undefined eip {0}")]
    UndefinedEip(u32),

    /// Hardfork name not recognised
    #[error("unknown hardfork: {0}")]
    UnknownHardfork(String),

    /// Malformed code section metadata
    #[error("invalid container: {0}")]
    InvalidContainer(&'static str),

    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Visible stack too shallow for a section's arity
    #[error("too few stack items: have {have}, need {need}")]
    TooFewStackItems {
        /// Items above the floor
        have: usize,
        /// Items required
        need: usize,
    },

    /// Return stack already holds 1024 frames
    #[error("return stack too deep (max 1024)")]
    ReturnStackTooDeep,

    /// RETF with no frame to return to
    #[error("return stack underflow")]
    ReturnStackUnderflow,

    /// Immediate operand runs past the end of the section
    #[error("truncated immediate at pc {pc}")]
    TruncatedImmediate {
        /// Position of the opcode owning the immediate
        pc: usize,
    },

    /// Unknown or negative code section index
    #[error("invalid code section: {0}")]
    InvalidSection(i32),

    /// Relative jump target outside the section
    #[error("invalid relative jump target: {0}")]
    InvalidRelativeJump(isize),

    /// Invalid jump destination
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Invalid opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Legacy-only opcode inside sectioned code
    #[error("opcode 0x{0:02x} is not allowed in sectioned code")]
    LegacyOnlyOpcode(u8),

    /// Invalid memory access
    #[error("invalid memory access")]
    InvalidMemoryAccess,

    /// State modification in a read-only frame
    #[error("write protection")]
    WriteProtection,

    /// Return data out of bounds
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Revert with data
    #[error("execution reverted")]
    Revert(Vec<u8>),
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// Outcome of running one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Gas used
    pub gas_used: u64,
    /// Return data (or revert data)
    pub output: Vec<u8>,
    /// Fault that aborted the frame, if any
    pub error: Option<EvmError>,
    /// Gas refund granted after the cap; zero unless the frame succeeded
    pub refund: u64,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(gas_used: u64, output: Vec<u8>) -> Self {
        Self {
            success: true,
            gas_used,
            output,
            error: None,
            refund: 0,
        }
    }

    /// Create a failed result
    pub fn failure(gas_used: u64, error: EvmError) -> Self {
        Self {
            success: false,
            gas_used,
            output: Vec::new(),
            error: Some(error),
            refund: 0,
        }
    }

    /// Create a revert result
    pub fn revert(gas_used: u64, output: Vec<u8>) -> Self {
        Self {
            success: false,
            gas_used,
            output: output.clone(),
            error: Some(EvmError::Revert(output)),
            refund: 0,
        }
    }

    /// Attach the granted refund
    pub fn with_refund(mut self, refund: u64) -> Self {
        self.refund = refund;
        self
    }

    /// Whether the frame ended with REVERT
    pub fn is_revert(&self) -> bool {
        matches!(self.error, Some(EvmError::Revert(_)))
    }
}

/// Log entry emitted by LOG opcodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (0-4)
    pub topics: Vec<H256>,
    /// Log data
    pub data: Vec<u8>,
}
