//! Gas cost constants and pure cost formulas

use keel_primitives::U256;

/// Gas costs for EVM operations
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;
    /// Between very low and mid (RJUMPI)
    pub const FASTISH: u64 = 4;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp byte gas (EIP-160)
    pub const EXP_BYTE: u64 = 50;
    /// KECCAK256 base gas
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 word gas
    pub const KECCAK256_WORD: u64 = 6;
    /// Blockhash gas
    pub const BLOCKHASH: u64 = 20;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Quadratic memory divisor
    pub const MEMORY_QUAD_DIVISOR: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Create2 gas
    pub const CREATE2: u64 = 32000;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;
    /// Call new account gas
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Call stipend
    pub const CALL_STIPEND: u64 = 2300;

    /// Selfdestruct gas (EIP-150)
    pub const SELFDESTRUCT: u64 = 5000;
    /// Selfdestruct new account gas
    pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;
    /// Selfdestruct refund (removed by EIP-3529)
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    // Petersburg state access

    /// Sload gas
    pub const SLOAD_PETERSBURG: u64 = 200;
    /// Balance gas
    pub const BALANCE_PETERSBURG: u64 = 400;
    /// Ext code hash gas
    pub const EXTCODEHASH_PETERSBURG: u64 = 400;
    /// Ext code size / copy gas
    pub const EXTCODE_PETERSBURG: u64 = 700;
    /// Call family gas
    pub const CALL_PETERSBURG: u64 = 700;
    /// Sstore set gas (zero to non-zero)
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore reset gas
    pub const SSTORE_RESET: u64 = 5000;
    /// Sstore clear refund
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;

    // EIP-1884

    /// Sload gas
    pub const SLOAD_EIP1884: u64 = 800;
    /// Balance gas
    pub const BALANCE_EIP1884: u64 = 700;
    /// Ext code hash gas
    pub const EXTCODEHASH_EIP1884: u64 = 700;
    /// Self balance gas
    pub const SELFBALANCE: u64 = 5;

    // EIP-2200

    /// Sload gas, also the no-op sstore cost
    pub const SLOAD_EIP2200: u64 = 800;
    /// Sstore fails unless more than this is left
    pub const SSTORE_SENTRY_EIP2200: u64 = 2300;
    /// Fresh slot set
    pub const SSTORE_SET_EIP2200: u64 = 20000;
    /// Fresh slot reset
    pub const SSTORE_RESET_EIP2200: u64 = 5000;
    /// Clearing refund
    pub const SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200: u64 = 15000;

    // EIP-2929

    /// Cold account surcharge base
    pub const COLD_ACCOUNT_ACCESS_EIP2929: u64 = 2600;
    /// Cold slot load
    pub const COLD_SLOAD_EIP2929: u64 = 2100;
    /// Warm read
    pub const WARM_STORAGE_READ_EIP2929: u64 = 100;
    /// Sstore reset with the cold load priced separately
    pub const SSTORE_RESET_EIP2929: u64 = SSTORE_RESET_EIP2200 - COLD_SLOAD_EIP2929;
    /// Clearing refund under EIP-2929
    pub const SSTORE_CLEARS_SCHEDULE_REFUND_EIP2929: u64 = SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200;

    // EIP-3529

    /// Clearing refund under EIP-3529
    pub const SSTORE_CLEARS_SCHEDULE_REFUND_EIP3529: u64 =
        SSTORE_RESET_EIP2929 + ACCESS_LIST_STORAGE_KEY;
    /// Access list storage key gas
    pub const ACCESS_LIST_STORAGE_KEY: u64 = 1900;

    // Transient storage and section control flow

    /// TLOAD / TSTORE gas
    pub const TRANSIENT: u64 = WARM_STORAGE_READ_EIP2929;
    /// RJUMP gas
    pub const RJUMP: u64 = BASE;
    /// RJUMPI gas
    pub const RJUMPI: u64 = FASTISH;
    /// CALLF / RETF gas
    pub const CALLF: u64 = MID;

    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
    /// Max return stack depth
    pub const MAX_RETURN_STACK: usize = 1024;
    /// Largest addressable memory end
    pub const MAX_MEMORY_SIZE: u64 = 0x1F_FFFF_FFE0;
}

/// Max refund divisor before EIP-3529
pub const REFUND_QUOTIENT: u64 = 2;
/// Max refund divisor after EIP-3529
pub const REFUND_QUOTIENT_EIP3529: u64 = 5;

/// Calculate memory expansion cost
pub fn memory_gas(current_size: usize, new_size: usize) -> u64 {
    if new_size <= current_size {
        return 0;
    }

    let new_words = new_size.div_ceil(32);
    let old_words = current_size.div_ceil(32);

    memory_word_cost(new_words).saturating_sub(memory_word_cost(old_words))
}

/// Calculate memory cost for a number of words
fn memory_word_cost(words: usize) -> u64 {
    let words = words as u64;
    cost::MEMORY
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / cost::MEMORY_QUAD_DIVISOR)
}

/// Calculate copy cost (for CALLDATACOPY, CODECOPY, etc.)
pub fn copy_gas(length: u64) -> u64 {
    cost::COPY.saturating_mul(length.div_ceil(32))
}

/// Calculate EXP dynamic cost
pub fn exp_gas(exponent: U256) -> u64 {
    let byte_size = exponent.bits().div_ceil(8) as u64;
    cost::EXP_BYTE * byte_size
}

/// Calculate KECCAK256 dynamic cost (without memory)
pub fn keccak256_gas(length: u64) -> u64 {
    cost::KECCAK256_WORD.saturating_mul(length.div_ceil(32))
}

/// Calculate LOG cost (without memory)
pub fn log_gas(topics: usize, data_len: u64) -> u64 {
    cost::LOG
        .saturating_add(cost::LOG_TOPIC * topics as u64)
        .saturating_add(cost::LOG_DATA.saturating_mul(data_len))
}

/// Gas forwarded to a sub-call: all but one 64th of what is left (EIP-150)
pub fn call_gas(available: u64, requested: U256) -> u64 {
    let max = available - available / 64;
    if requested < U256::from(max) {
        requested.low_u64()
    } else {
        max
    }
}

/// Refund actually granted at the end of a transaction
pub fn capped_refund(gas_used: u64, refund: u64, quotient: u64) -> u64 {
    refund.min(gas_used / quotient)
}
