//! Operation descriptors and the 256-slot jump table

use crate::context::Context;
use crate::dynamic_gas;
use crate::error::EvmResult;
use crate::gas::cost::{self, MAX_STACK_SIZE};
use crate::instructions::{
    arithmetic, bitwise, control, environment, host, memory, stack, system,
};
use crate::opcode::Opcode;
use crate::scope::Scope;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

/// What the loop does after an executor returns
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Next {
    /// Continue at this pc of the active section
    Continue(usize),
    /// Halt with empty output
    Stop,
    /// Halt with output
    Return(Vec<u8>),
}

/// Executor: receives the pc of its opcode and returns what comes next
pub type ExecuteFn = fn(usize, &mut Context<'_>, &mut Scope<'_>) -> EvmResult<Next>;

/// Dynamic gas: may warm addresses/slots and adjust refunds
pub type DynamicGasFn = fn(&mut Context<'_>, &Scope<'_>) -> EvmResult<u64>;

/// Descriptor of one opcode slot
#[derive(Clone, Copy)]
pub struct Operation {
    /// Executor; None marks an undefined opcode
    pub execute: Option<ExecuteFn>,
    /// Gas charged before anything else
    pub constant_gas: u64,
    /// Gas computed from operands and state
    pub dynamic_gas: Option<DynamicGasFn>,
    /// Minimum visible stack height
    pub min_stack: u16,
    /// Maximum total stack length before execution
    pub max_stack: u16,
    /// Rejected in sectioned code
    pub legacy_only: bool,
    /// Undefined in legacy code
    pub eof_only: bool,
}

impl Operation {
    /// An undefined slot
    pub const UNDEFINED: Operation = Operation {
        execute: None,
        constant_gas: 0,
        dynamic_gas: None,
        min_stack: 0,
        max_stack: 0,
        legacy_only: false,
        eof_only: false,
    };

    /// Defined opcode popping `pops` and pushing `pushes` items
    pub fn new(execute: ExecuteFn, constant_gas: u64, pops: u16, pushes: u16) -> Self {
        Self {
            execute: Some(execute),
            constant_gas,
            dynamic_gas: None,
            min_stack: pops,
            max_stack: MAX_STACK_SIZE as u16 + pops - pushes,
            legacy_only: false,
            eof_only: false,
        }
    }

    /// Attach a dynamic gas function
    pub fn with_dynamic_gas(mut self, dynamic_gas: DynamicGasFn) -> Self {
        self.dynamic_gas = Some(dynamic_gas);
        self
    }

    /// Mark as valid only in sectioned code
    pub fn eof_only(mut self) -> Self {
        self.eof_only = true;
        self
    }

    /// Whether the slot holds an executor
    pub fn is_defined(&self) -> bool {
        self.execute.is_some()
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.execute.map(|f| f as usize) == other.execute.map(|f| f as usize)
            && self.dynamic_gas.map(|f| f as usize) == other.dynamic_gas.map(|f| f as usize)
            && self.constant_gas == other.constant_gas
            && self.min_stack == other.min_stack
            && self.max_stack == other.max_stack
            && self.legacy_only == other.legacy_only
            && self.eof_only == other.eof_only
    }
}

impl Eq for Operation {}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_defined() {
            return f.write_str("Operation(undefined)");
        }
        f.debug_struct("Operation")
            .field("constant_gas", &self.constant_gas)
            .field("dynamic_gas", &self.dynamic_gas.is_some())
            .field("min_stack", &self.min_stack)
            .field("max_stack", &self.max_stack)
            .field("legacy_only", &self.legacy_only)
            .field("eof_only", &self.eof_only)
            .finish()
    }
}

/// Opcode byte to descriptor
///
/// Patched only while owned; [`JumpTable::freeze`] hands out a shared,
/// immutable copy.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JumpTable([Operation; 256]);

impl JumpTable {
    /// All 256 slots undefined
    pub fn empty() -> Self {
        Self([Operation::UNDEFINED; 256])
    }

    /// Petersburg instruction set
    pub fn baseline() -> Self {
        let mut t = Self::empty();
        use Opcode::*;

        t[STOP] = Operation::new(control::stop, cost::ZERO, 0, 0);

        // Arithmetic
        t[ADD] = Operation::new(arithmetic::add, cost::VERYLOW, 2, 1);
        t[MUL] = Operation::new(arithmetic::mul, cost::LOW, 2, 1);
        t[SUB] = Operation::new(arithmetic::sub, cost::VERYLOW, 2, 1);
        t[DIV] = Operation::new(arithmetic::div, cost::LOW, 2, 1);
        t[SDIV] = Operation::new(arithmetic::sdiv, cost::LOW, 2, 1);
        t[MOD] = Operation::new(arithmetic::modulo, cost::LOW, 2, 1);
        t[SMOD] = Operation::new(arithmetic::smod, cost::LOW, 2, 1);
        t[ADDMOD] = Operation::new(arithmetic::addmod, cost::MID, 3, 1);
        t[MULMOD] = Operation::new(arithmetic::mulmod, cost::MID, 3, 1);
        t[EXP] = Operation::new(arithmetic::exp, cost::EXP, 2, 1)
            .with_dynamic_gas(dynamic_gas::exp);
        t[SIGNEXTEND] = Operation::new(arithmetic::signextend, cost::LOW, 2, 1);

        // Comparison & bitwise
        t[LT] = Operation::new(bitwise::lt, cost::VERYLOW, 2, 1);
        t[GT] = Operation::new(bitwise::gt, cost::VERYLOW, 2, 1);
        t[SLT] = Operation::new(bitwise::slt, cost::VERYLOW, 2, 1);
        t[SGT] = Operation::new(bitwise::sgt, cost::VERYLOW, 2, 1);
        t[EQ] = Operation::new(bitwise::eq, cost::VERYLOW, 2, 1);
        t[ISZERO] = Operation::new(bitwise::iszero, cost::VERYLOW, 1, 1);
        t[AND] = Operation::new(bitwise::and, cost::VERYLOW, 2, 1);
        t[OR] = Operation::new(bitwise::or, cost::VERYLOW, 2, 1);
        t[XOR] = Operation::new(bitwise::xor, cost::VERYLOW, 2, 1);
        t[NOT] = Operation::new(bitwise::not, cost::VERYLOW, 1, 1);
        t[BYTE] = Operation::new(bitwise::byte, cost::VERYLOW, 2, 1);
        t[SHL] = Operation::new(bitwise::shl, cost::VERYLOW, 2, 1);
        t[SHR] = Operation::new(bitwise::shr, cost::VERYLOW, 2, 1);
        t[SAR] = Operation::new(bitwise::sar, cost::VERYLOW, 2, 1);

        t[KECCAK256] = Operation::new(environment::keccak256, cost::KECCAK256, 2, 1)
            .with_dynamic_gas(dynamic_gas::keccak256);

        // Environment
        t[ADDRESS] = Operation::new(environment::address, cost::BASE, 0, 1);
        t[BALANCE] = Operation::new(host::balance, cost::BALANCE_PETERSBURG, 1, 1);
        t[ORIGIN] = Operation::new(environment::origin, cost::BASE, 0, 1);
        t[CALLER] = Operation::new(environment::caller, cost::BASE, 0, 1);
        t[CALLVALUE] = Operation::new(environment::callvalue, cost::BASE, 0, 1);
        t[CALLDATALOAD] = Operation::new(environment::calldataload, cost::VERYLOW, 1, 1);
        t[CALLDATASIZE] = Operation::new(environment::calldatasize, cost::BASE, 0, 1);
        t[CALLDATACOPY] = Operation::new(environment::calldatacopy, cost::VERYLOW, 3, 0)
            .with_dynamic_gas(dynamic_gas::copy_to_memory);
        t[CODESIZE] = Operation::new(environment::codesize, cost::BASE, 0, 1);
        t[CODECOPY] = Operation::new(environment::codecopy, cost::VERYLOW, 3, 0)
            .with_dynamic_gas(dynamic_gas::copy_to_memory);
        t[GASPRICE] = Operation::new(environment::gasprice, cost::BASE, 0, 1);
        t[EXTCODESIZE] = Operation::new(host::extcodesize, cost::EXTCODE_PETERSBURG, 1, 1);
        t[EXTCODECOPY] = Operation::new(host::extcodecopy, cost::EXTCODE_PETERSBURG, 4, 0)
            .with_dynamic_gas(dynamic_gas::extcodecopy);
        t[RETURNDATASIZE] = Operation::new(environment::returndatasize, cost::BASE, 0, 1);
        t[RETURNDATACOPY] = Operation::new(environment::returndatacopy, cost::VERYLOW, 3, 0)
            .with_dynamic_gas(dynamic_gas::copy_to_memory);
        t[EXTCODEHASH] = Operation::new(host::extcodehash, cost::EXTCODEHASH_PETERSBURG, 1, 1);

        // Block
        t[BLOCKHASH] = Operation::new(host::blockhash, cost::BLOCKHASH, 1, 1);
        t[COINBASE] = Operation::new(environment::coinbase, cost::BASE, 0, 1);
        t[TIMESTAMP] = Operation::new(environment::timestamp, cost::BASE, 0, 1);
        t[NUMBER] = Operation::new(environment::number, cost::BASE, 0, 1);
        t[DIFFICULTY] = Operation::new(environment::difficulty, cost::BASE, 0, 1);
        t[GASLIMIT] = Operation::new(environment::gaslimit, cost::BASE, 0, 1);

        // Stack, memory, storage and flow
        t[POP] = Operation::new(stack::pop, cost::BASE, 1, 0);
        t[MLOAD] = Operation::new(memory::mload, cost::VERYLOW, 1, 1)
            .with_dynamic_gas(dynamic_gas::memory_word);
        t[MSTORE] = Operation::new(memory::mstore, cost::VERYLOW, 2, 0)
            .with_dynamic_gas(dynamic_gas::memory_word);
        t[MSTORE8] = Operation::new(memory::mstore8, cost::VERYLOW, 2, 0)
            .with_dynamic_gas(dynamic_gas::memory_byte);
        t[SLOAD] = Operation::new(host::sload, cost::SLOAD_PETERSBURG, 1, 1);
        t[SSTORE] = Operation::new(host::sstore, cost::ZERO, 2, 0)
            .with_dynamic_gas(dynamic_gas::sstore);
        t[JUMP] = Operation::new(control::jump, cost::MID, 1, 0);
        t[JUMPI] = Operation::new(control::jumpi, cost::HIGH, 2, 0);
        t[PC] = Operation::new(control::pc, cost::BASE, 0, 1);
        t[MSIZE] = Operation::new(memory::msize, cost::BASE, 0, 1);
        t[GAS] = Operation::new(control::gas, cost::BASE, 0, 1);
        t[JUMPDEST] = Operation::new(control::jumpdest, cost::JUMPDEST, 0, 0);

        macro_rules! push_ops {
            ($($n:literal),*) => {
                $(t[(0x5F + $n) as u8] = Operation::new(stack::push::<$n>, cost::VERYLOW, 0, 1);)*
            };
        }
        push_ops!(
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24, 25, 26, 27, 28, 29, 30, 31, 32
        );

        macro_rules! dup_swap_ops {
            ($($n:literal),*) => {
                $(
                    t[(0x7F + $n) as u8] = Operation::new(stack::dup::<$n>, cost::VERYLOW, $n, $n + 1);
                    t[(0x8F + $n) as u8] = Operation::new(stack::swap::<$n>, cost::VERYLOW, $n + 1, $n + 1);
                )*
            };
        }
        dup_swap_ops!(1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16);

        macro_rules! log_ops {
            ($($n:literal),*) => {
                $(
                    t[(0xA0 + $n) as u8] = Operation::new(host::log::<$n>, cost::ZERO, $n + 2, 0)
                        .with_dynamic_gas(dynamic_gas::log::<$n>);
                )*
            };
        }
        log_ops!(0, 1, 2, 3, 4);

        // System
        t[CREATE] = Operation::new(system::create, cost::CREATE, 3, 1)
            .with_dynamic_gas(dynamic_gas::create);
        t[CALL] = Operation::new(system::call, cost::CALL_PETERSBURG, 7, 1)
            .with_dynamic_gas(dynamic_gas::call);
        t[CALLCODE] = Operation::new(system::callcode, cost::CALL_PETERSBURG, 7, 1)
            .with_dynamic_gas(dynamic_gas::callcode);
        t[RETURN] = Operation::new(control::ret, cost::ZERO, 2, 0)
            .with_dynamic_gas(dynamic_gas::memory_return);
        t[DELEGATECALL] = Operation::new(system::delegatecall, cost::CALL_PETERSBURG, 6, 1)
            .with_dynamic_gas(dynamic_gas::delegatecall);
        t[CREATE2] = Operation::new(system::create2, cost::CREATE2, 4, 1)
            .with_dynamic_gas(dynamic_gas::create2);
        t[STATICCALL] = Operation::new(system::staticcall, cost::CALL_PETERSBURG, 6, 1)
            .with_dynamic_gas(dynamic_gas::delegatecall);
        t[REVERT] = Operation::new(control::revert, cost::ZERO, 2, 0)
            .with_dynamic_gas(dynamic_gas::memory_return);
        t[SELFDESTRUCT] = Operation::new(host::selfdestruct, cost::SELFDESTRUCT, 1, 0)
            .with_dynamic_gas(dynamic_gas::selfdestruct);

        t
    }

    /// Apply EIP patches in order, failing on the first unknown identifier
    pub fn with_eips(mut self, eips: &[u32]) -> EvmResult<Self> {
        for &eip in eips {
            crate::eips::enable_eip(eip, &mut self)?;
        }
        Ok(self)
    }

    /// Finish patching and share read-only
    pub fn freeze(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Iterate `(opcode byte, descriptor)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Operation)> {
        (0u8..=255).zip(self.0.iter())
    }
}

impl Index<u8> for JumpTable {
    type Output = Operation;

    fn index(&self, opcode: u8) -> &Operation {
        &self.0[opcode as usize]
    }
}

impl IndexMut<u8> for JumpTable {
    fn index_mut(&mut self, opcode: u8) -> &mut Operation {
        &mut self.0[opcode as usize]
    }
}

impl Index<Opcode> for JumpTable {
    type Output = Operation;

    fn index(&self, opcode: Opcode) -> &Operation {
        &self.0[opcode as usize]
    }
}

impl IndexMut<Opcode> for JumpTable {
    fn index_mut(&mut self, opcode: Opcode) -> &mut Operation {
        &mut self.0[opcode as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_bounds_consistent() {
        let table = JumpTable::baseline();
        for (byte, op) in table.iter() {
            if op.is_defined() {
                assert!(op.min_stack <= op.max_stack, "opcode 0x{:02x}", byte);
            }
        }
    }

    #[test]
    fn test_every_named_baseline_opcode_defined() {
        let table = JumpTable::baseline();
        let later = [
            Opcode::CHAINID,
            Opcode::SELFBALANCE,
            Opcode::BASEFEE,
            Opcode::TLOAD,
            Opcode::TSTORE,
            Opcode::PUSH0,
            Opcode::RJUMP,
            Opcode::RJUMPI,
            Opcode::CALLF,
            Opcode::RETF,
            Opcode::INVALID,
        ];
        for byte in 0u8..=255 {
            match Opcode::from_byte(byte) {
                Some(op) if later.contains(&op) => {
                    assert!(!table[op].is_defined(), "{} should be undefined", op)
                }
                Some(op) => assert!(table[op].is_defined(), "{} should be defined", op),
                None => assert!(!table[byte].is_defined(), "0x{:02x} unassigned", byte),
            }
        }
    }

    #[test]
    fn test_baseline_costs() {
        let table = JumpTable::baseline();
        assert_eq!(table[Opcode::SLOAD].constant_gas, 200);
        assert_eq!(table[Opcode::BALANCE].constant_gas, 400);
        assert_eq!(table[Opcode::EXTCODEHASH].constant_gas, 400);
        assert_eq!(table[Opcode::EXTCODESIZE].constant_gas, 700);
        assert_eq!(table[Opcode::EXTCODECOPY].constant_gas, 700);
        assert_eq!(table[Opcode::CALL].constant_gas, 700);
        assert_eq!(table[Opcode::SELFDESTRUCT].constant_gas, 5000);
        assert!(table[Opcode::SLOAD].dynamic_gas.is_none());
    }

    #[test]
    fn test_stack_shape() {
        let table = JumpTable::baseline();
        assert_eq!(table[Opcode::ADD].min_stack, 2);
        assert_eq!(table[Opcode::ADD].max_stack, 1025);
        assert_eq!(table[Opcode::PUSH1].max_stack, 1023);
        assert_eq!(table[Opcode::DUP16].min_stack, 16);
        assert_eq!(table[Opcode::DUP16].max_stack, 1023);
        assert_eq!(table[Opcode::SWAP16].min_stack, 17);
        assert_eq!(table[Opcode::SWAP16].max_stack, 1024);
        assert_eq!(table[Opcode::LOG4].min_stack, 6);
        assert_eq!(table[Opcode::CALL].min_stack, 7);
    }

    #[test]
    fn test_index_by_byte_and_opcode_agree() {
        let table = JumpTable::baseline();
        assert_eq!(table[0x01u8], table[Opcode::ADD]);
        assert_ne!(table[Opcode::ADD], table[Opcode::MUL]);
    }

    #[test]
    fn test_clone_compares_equal() {
        let table = JumpTable::baseline();
        let copy = table.clone();
        assert_eq!(table, copy);
    }

    #[test]
    fn test_index_mut() {
        let mut table = JumpTable::baseline();
        table[Opcode::SLOAD].constant_gas = 800;
        assert_eq!(table[0x54u8].constant_gas, 800);
        assert_ne!(table, JumpTable::baseline());
    }

    #[test]
    fn test_freeze_shares() {
        let frozen = JumpTable::baseline().freeze();
        let other = Arc::clone(&frozen);
        assert!(Arc::ptr_eq(&frozen, &other));
        assert_eq!(frozen[Opcode::STOP].constant_gas, 0);
    }

    #[test]
    fn test_table_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JumpTable>();
        assert_send_sync::<Arc<JumpTable>>();
    }

    #[test]
    fn test_operation_debug() {
        assert_eq!(format!("{:?}", Operation::UNDEFINED), "Operation(undefined)");
        let debug = format!("{:?}", JumpTable::baseline()[Opcode::ADD]);
        assert!(debug.contains("constant_gas: 3"));
    }
}
