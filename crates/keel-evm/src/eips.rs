//! EIP activation registry
//!
//! Each activator patches a [`JumpTable`] in place. The registry is a
//! static slice so lookups never need initialization or locking.

use crate::dynamic_gas;
use crate::error::{EvmError, EvmResult};
use crate::gas::cost;
use crate::instructions::{control, environment, host, stack};
use crate::opcode::Opcode;
use crate::table::{JumpTable, Operation};

/// Patch applied to a jump table
pub type Activator = fn(&mut JumpTable);

static ACTIVATORS: &[(u32, Activator)] = &[
    (1153, enable_1153),
    (1344, enable_1344),
    (1884, enable_1884),
    (2200, enable_2200),
    (2929, enable_2929),
    (3198, enable_3198),
    (3529, enable_3529),
    (3855, enable_3855),
    (4200, enable_4200),
    (4750, enable_4750),
];

fn activator(eip: u32) -> Option<Activator> {
    ACTIVATORS
        .iter()
        .find(|(id, _)| *id == eip)
        .map(|(_, f)| *f)
}

/// Apply the patch registered for `eip`
///
/// An unknown identifier leaves the table untouched.
pub fn enable_eip(eip: u32, table: &mut JumpTable) -> EvmResult<()> {
    match activator(eip) {
        Some(enable) => {
            enable(table);
            tracing::debug!("enabled eip {}", eip);
            Ok(())
        }
        None => {
            tracing::warn!("undefined eip {}", eip);
            Err(EvmError::UndefinedEip(eip))
        }
    }
}

/// Whether `eip` has a registered activator
pub fn is_valid_eip(eip: u32) -> bool {
    activator(eip).is_some()
}

/// Registered identifiers as decimal strings, sorted ascending
pub fn activatable_eips() -> Vec<String> {
    let mut ids: Vec<u32> = ACTIVATORS.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    ids.into_iter().map(|id| id.to_string()).collect()
}

/// EIP-1884: reprice trie-size-dependent opcodes, add SELFBALANCE
pub(crate) fn enable_1884(t: &mut JumpTable) {
    t[Opcode::SLOAD].constant_gas = cost::SLOAD_EIP1884;
    t[Opcode::BALANCE].constant_gas = cost::BALANCE_EIP1884;
    t[Opcode::EXTCODEHASH].constant_gas = cost::EXTCODEHASH_EIP1884;
    t[Opcode::SELFBALANCE] = Operation::new(host::selfbalance, cost::SELFBALANCE, 0, 1);
}

/// EIP-1344: CHAINID
pub(crate) fn enable_1344(t: &mut JumpTable) {
    t[Opcode::CHAINID] = Operation::new(environment::chainid, cost::BASE, 0, 1);
}

/// EIP-2200: net gas metering for SSTORE
pub(crate) fn enable_2200(t: &mut JumpTable) {
    t[Opcode::SLOAD].constant_gas = cost::SLOAD_EIP2200;
    t[Opcode::SSTORE].dynamic_gas = Some(dynamic_gas::sstore_eip2200);
}

/// EIP-2929: cold/warm state access
pub(crate) fn enable_2929(t: &mut JumpTable) {
    t[Opcode::SSTORE].dynamic_gas = Some(dynamic_gas::sstore_eip2929);

    t[Opcode::SLOAD].constant_gas = 0;
    t[Opcode::SLOAD].dynamic_gas = Some(dynamic_gas::sload_eip2929);

    for op in [Opcode::BALANCE, Opcode::EXTCODESIZE, Opcode::EXTCODEHASH] {
        t[op].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
        t[op].dynamic_gas = Some(dynamic_gas::account_access_eip2929);
    }

    t[Opcode::EXTCODECOPY].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
    t[Opcode::EXTCODECOPY].dynamic_gas = Some(dynamic_gas::extcodecopy_eip2929);

    t[Opcode::CALL].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
    t[Opcode::CALL].dynamic_gas = Some(dynamic_gas::call_eip2929);

    t[Opcode::CALLCODE].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
    t[Opcode::CALLCODE].dynamic_gas = Some(dynamic_gas::callcode_eip2929);

    t[Opcode::STATICCALL].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
    t[Opcode::STATICCALL].dynamic_gas = Some(dynamic_gas::delegatecall_eip2929);

    t[Opcode::DELEGATECALL].constant_gas = cost::WARM_STORAGE_READ_EIP2929;
    t[Opcode::DELEGATECALL].dynamic_gas = Some(dynamic_gas::delegatecall_eip2929);

    // Base cost unchanged, cold beneficiary surcharge added
    t[Opcode::SELFDESTRUCT].constant_gas = cost::SELFDESTRUCT;
    t[Opcode::SELFDESTRUCT].dynamic_gas = Some(dynamic_gas::selfdestruct_eip2929);
}

/// EIP-3529: reduced refunds
pub(crate) fn enable_3529(t: &mut JumpTable) {
    t[Opcode::SSTORE].dynamic_gas = Some(dynamic_gas::sstore_eip3529);
    t[Opcode::SELFDESTRUCT].dynamic_gas = Some(dynamic_gas::selfdestruct_eip3529);
}

/// EIP-3198: BASEFEE
pub(crate) fn enable_3198(t: &mut JumpTable) {
    t[Opcode::BASEFEE] = Operation::new(environment::basefee, cost::BASE, 0, 1);
}

/// EIP-3855: PUSH0
pub(crate) fn enable_3855(t: &mut JumpTable) {
    t[Opcode::PUSH0] = Operation::new(stack::push0, cost::BASE, 0, 1);
}

/// EIP-1153: transient storage
pub(crate) fn enable_1153(t: &mut JumpTable) {
    t[Opcode::TLOAD] = Operation::new(host::tload, cost::TRANSIENT, 1, 1);
    t[Opcode::TSTORE] = Operation::new(host::tstore, cost::TRANSIENT, 2, 0);
}

/// EIP-4200: static relative jumps
pub(crate) fn enable_4200(t: &mut JumpTable) {
    t[Opcode::RJUMP] = Operation::new(control::rjump, cost::RJUMP, 0, 0).eof_only();
    // max_stack derives to 1025 from the pop/push counts; the 1024 push cap
    // keeps the stack below it, so the looser bound never decides anything.
    t[Opcode::RJUMPI] = Operation::new(control::rjumpi, cost::RJUMPI, 1, 0).eof_only();
}

/// EIP-4750: code section calls; dynamic jumps become legacy only
pub(crate) fn enable_4750(t: &mut JumpTable) {
    t[Opcode::CALLF] = Operation::new(control::callf, cost::CALLF, 0, 0).eof_only();
    t[Opcode::RETF] = Operation::new(control::retf, cost::CALLF, 0, 0).eof_only();
    t[Opcode::JUMP].legacy_only = true;
    t[Opcode::JUMPI].legacy_only = true;
}
