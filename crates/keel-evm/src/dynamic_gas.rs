//! Dynamic gas functions
//!
//! Each function reads its operands from the stack without popping them,
//! may warm addresses/slots and adjust the refund counter through the host,
//! and returns the gas to charge on top of the constant cost. Memory
//! expansion is priced here; executors expand memory afterwards.

use crate::context::Context;
use crate::error::{EvmError, EvmResult};
use crate::gas::{self, cost};
use crate::scope::Scope;
use crate::stack::u256_to_u64;
use keel_primitives::{Address, H256, U256};

fn add(a: u64, b: u64) -> EvmResult<u64> {
    a.checked_add(b).ok_or(EvmError::OutOfGas)
}

fn operand(scope: &Scope<'_>, depth: usize) -> EvmResult<U256> {
    scope.stack.peek_at(depth).copied()
}

/// Expansion cost for the furthest end among `(offset, size)` ranges.
/// Zero-size ranges never expand memory.
fn expansion(scope: &Scope<'_>, ranges: &[(U256, U256)]) -> EvmResult<u64> {
    let mut end = 0u64;
    for &(offset, size) in ranges {
        if size.is_zero() {
            continue;
        }
        let range_end = offset.checked_add(size).ok_or(EvmError::OutOfGas)?;
        let range_end = u256_to_u64(range_end).ok_or(EvmError::OutOfGas)?;
        if range_end > cost::MAX_MEMORY_SIZE {
            return Err(EvmError::OutOfGas);
        }
        end = end.max(range_end);
    }
    Ok(gas::memory_gas(scope.memory.size(), end as usize))
}

/// Length operand as u64; anything larger cannot be paid for
fn length(value: U256) -> EvmResult<u64> {
    u256_to_u64(value).ok_or(EvmError::OutOfGas)
}

// ==================== Memory ====================

/// MLOAD / MSTORE: one word at the offset on top
pub fn memory_word(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    expansion(scope, &[(operand(scope, 0)?, U256::from(32u64))])
}

/// MSTORE8: one byte at the offset on top
pub fn memory_byte(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    expansion(scope, &[(operand(scope, 0)?, U256::one())])
}

/// RETURN / REVERT: offset, size
pub fn memory_return(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    expansion(scope, &[(operand(scope, 0)?, operand(scope, 1)?)])
}

/// KECCAK256: memory plus 6 per hashed word
pub fn keccak256(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let (offset, size) = (operand(scope, 0)?, operand(scope, 1)?);
    let mem = expansion(scope, &[(offset, size)])?;
    add(mem, gas::keccak256_gas(length(size)?))
}

/// CALLDATACOPY / CODECOPY / RETURNDATACOPY: dest, _, size
pub fn copy_to_memory(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let (dest, size) = (operand(scope, 0)?, operand(scope, 2)?);
    let mem = expansion(scope, &[(dest, size)])?;
    add(mem, gas::copy_gas(length(size)?))
}

/// EXTCODECOPY: address, dest, _, size
pub fn extcodecopy(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let (dest, size) = (operand(scope, 1)?, operand(scope, 3)?);
    let mem = expansion(scope, &[(dest, size)])?;
    add(mem, gas::copy_gas(length(size)?))
}

/// EXP: 50 per exponent byte (EIP-160)
pub fn exp(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    Ok(gas::exp_gas(operand(scope, 1)?))
}

/// LOG0..LOG4: memory plus topic and data charges
pub fn log<const N: usize>(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let (offset, size) = (operand(scope, 0)?, operand(scope, 1)?);
    let mem = expansion(scope, &[(offset, size)])?;
    add(mem, gas::log_gas(N, length(size)?))
}

// ==================== Create / Call ====================

/// CREATE: value, offset, size
pub fn create(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    expansion(scope, &[(operand(scope, 1)?, operand(scope, 2)?)])
}

/// CREATE2: memory plus hashing the init code
pub fn create2(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let (offset, size) = (operand(scope, 1)?, operand(scope, 2)?);
    let mem = expansion(scope, &[(offset, size)])?;
    add(mem, gas::keccak256_gas(length(size)?))
}

/// CALL: new account, value transfer and memory for input and output
pub fn call(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let target = Address::from_word(operand(scope, 1)?);
    let transfers_value = !operand(scope, 2)?.is_zero();

    let mut gas = 0;
    if transfers_value && ctx.host.is_empty(&target) {
        gas = add(gas, cost::CALL_NEW_ACCOUNT)?;
    }
    let mem = expansion(
        scope,
        &[
            (operand(scope, 3)?, operand(scope, 4)?),
            (operand(scope, 5)?, operand(scope, 6)?),
        ],
    )?;
    gas = add(gas, mem)?;
    if transfers_value {
        gas = add(gas, cost::CALL_VALUE)?;
    }
    Ok(gas)
}

/// CALLCODE: value transfer and memory, never creates an account
pub fn callcode(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let mut gas = expansion(
        scope,
        &[
            (operand(scope, 3)?, operand(scope, 4)?),
            (operand(scope, 5)?, operand(scope, 6)?),
        ],
    )?;
    if !operand(scope, 2)?.is_zero() {
        gas = add(gas, cost::CALL_VALUE)?;
    }
    Ok(gas)
}

/// DELEGATECALL / STATICCALL: memory for input and output
pub fn delegatecall(_ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    expansion(
        scope,
        &[
            (operand(scope, 2)?, operand(scope, 3)?),
            (operand(scope, 4)?, operand(scope, 5)?),
        ],
    )
}

// ==================== Storage ====================

fn storage_operands(scope: &Scope<'_>) -> EvmResult<(H256, U256)> {
    Ok((H256::from_word(operand(scope, 0)?), operand(scope, 1)?))
}

/// SSTORE before Istanbul: set 20000, otherwise 5000, clearing refunds 15000
pub fn sstore(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    let (key, value) = storage_operands(scope)?;
    let current = ctx.host.storage(&scope.contract.address, &key);

    if current.is_zero() && !value.is_zero() {
        return Ok(cost::SSTORE_SET);
    }
    if !current.is_zero() && value.is_zero() {
        ctx.host.add_refund(cost::SSTORE_CLEAR_REFUND);
    }
    Ok(cost::SSTORE_RESET)
}

/// SSTORE with net gas metering (EIP-2200)
pub fn sstore_eip2200(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    // Must leave room for the reentrancy sentry
    if scope.gas <= cost::SSTORE_SENTRY_EIP2200 {
        return Err(EvmError::OutOfGas);
    }
    let address = scope.contract.address;
    let (key, value) = storage_operands(scope)?;
    let current = ctx.host.storage(&address, &key);

    if current == value {
        return Ok(cost::SLOAD_EIP2200);
    }
    let original = ctx.host.committed_storage(&address, &key);
    if original == current {
        if original.is_zero() {
            return Ok(cost::SSTORE_SET_EIP2200);
        }
        if value.is_zero() {
            ctx.host
                .add_refund(cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200);
        }
        return Ok(cost::SSTORE_RESET_EIP2200);
    }
    if !original.is_zero() {
        if current.is_zero() {
            ctx.host
                .sub_refund(cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200);
        } else if value.is_zero() {
            ctx.host
                .add_refund(cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200);
        }
    }
    if original == value {
        if original.is_zero() {
            ctx.host
                .add_refund(cost::SSTORE_SET_EIP2200 - cost::SLOAD_EIP2200);
        } else {
            ctx.host
                .add_refund(cost::SSTORE_RESET_EIP2200 - cost::SLOAD_EIP2200);
        }
    }
    Ok(cost::SLOAD_EIP2200)
}

fn sstore_access_list(
    ctx: &mut Context<'_>,
    scope: &Scope<'_>,
    clearing_refund: u64,
) -> EvmResult<u64> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    if scope.gas <= cost::SSTORE_SENTRY_EIP2200 {
        return Err(EvmError::OutOfGas);
    }
    let address = scope.contract.address;
    let (key, value) = storage_operands(scope)?;

    let mut gas = 0;
    if !ctx.host.is_warm_slot(&address, &key) {
        gas = cost::COLD_SLOAD_EIP2929;
        ctx.host.warm_slot(address, key);
    }

    let current = ctx.host.storage(&address, &key);
    if current == value {
        return Ok(gas + cost::WARM_STORAGE_READ_EIP2929);
    }
    let original = ctx.host.committed_storage(&address, &key);
    if original == current {
        if original.is_zero() {
            return Ok(gas + cost::SSTORE_SET_EIP2200);
        }
        if value.is_zero() {
            ctx.host.add_refund(clearing_refund);
        }
        return Ok(gas + cost::SSTORE_RESET_EIP2929);
    }
    if !original.is_zero() {
        if current.is_zero() {
            ctx.host.sub_refund(clearing_refund);
        } else if value.is_zero() {
            ctx.host.add_refund(clearing_refund);
        }
    }
    if original == value {
        if original.is_zero() {
            ctx.host
                .add_refund(cost::SSTORE_SET_EIP2200 - cost::WARM_STORAGE_READ_EIP2929);
        } else {
            ctx.host
                .add_refund(cost::SSTORE_RESET_EIP2929 - cost::WARM_STORAGE_READ_EIP2929);
        }
    }
    Ok(gas + cost::WARM_STORAGE_READ_EIP2929)
}

/// SSTORE with cold slot surcharge (EIP-2929)
pub fn sstore_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    sstore_access_list(ctx, scope, cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP2929)
}

/// SSTORE with reduced clearing refund (EIP-3529)
pub fn sstore_eip3529(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    sstore_access_list(ctx, scope, cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP3529)
}

/// SLOAD: 2100 cold, 100 warm (EIP-2929)
pub fn sload_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let address = scope.contract.address;
    let key = H256::from_word(operand(scope, 0)?);
    if ctx.host.is_warm_slot(&address, &key) {
        return Ok(cost::WARM_STORAGE_READ_EIP2929);
    }
    ctx.host.warm_slot(address, key);
    Ok(cost::COLD_SLOAD_EIP2929)
}

// ==================== Account access (EIP-2929) ====================

/// Warm `address`, returning the cold surcharge if it was cold
fn cold_account_surcharge(ctx: &mut Context<'_>, address: Address) -> u64 {
    if ctx.host.is_warm_address(&address) {
        return 0;
    }
    ctx.host.warm_address(address);
    cost::COLD_ACCOUNT_ACCESS_EIP2929 - cost::WARM_STORAGE_READ_EIP2929
}

/// BALANCE / EXTCODESIZE / EXTCODEHASH: address on top
pub fn account_access_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let address = Address::from_word(operand(scope, 0)?);
    Ok(cold_account_surcharge(ctx, address))
}

/// EXTCODECOPY with cold surcharge
pub fn extcodecopy_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let base = extcodecopy(ctx, scope)?;
    let address = Address::from_word(operand(scope, 0)?);
    add(base, cold_account_surcharge(ctx, address))
}

/// CALL with cold surcharge on the target
pub fn call_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let address = Address::from_word(operand(scope, 1)?);
    let surcharge = cold_account_surcharge(ctx, address);
    add(surcharge, call(ctx, scope)?)
}

/// CALLCODE with cold surcharge on the target
pub fn callcode_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let address = Address::from_word(operand(scope, 1)?);
    let surcharge = cold_account_surcharge(ctx, address);
    add(surcharge, callcode(ctx, scope)?)
}

/// DELEGATECALL / STATICCALL with cold surcharge on the target
pub fn delegatecall_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    let address = Address::from_word(operand(scope, 1)?);
    let surcharge = cold_account_surcharge(ctx, address);
    add(surcharge, delegatecall(ctx, scope)?)
}

// ==================== Selfdestruct ====================

fn selfdestruct_cost(
    ctx: &mut Context<'_>,
    scope: &Scope<'_>,
    access_list: bool,
    refund: bool,
) -> EvmResult<u64> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    let address = scope.contract.address;
    let beneficiary = Address::from_word(operand(scope, 0)?);

    let mut gas = 0;
    if access_list && !ctx.host.is_warm_address(&beneficiary) {
        ctx.host.warm_address(beneficiary);
        gas = cost::COLD_ACCOUNT_ACCESS_EIP2929;
    }
    if ctx.host.is_empty(&beneficiary) && !ctx.host.balance(&address).is_zero() {
        gas += cost::SELFDESTRUCT_NEW_ACCOUNT;
    }
    if refund && !ctx.host.has_selfdestructed(&address) {
        ctx.host.add_refund(cost::SELFDESTRUCT_REFUND);
    }
    Ok(gas)
}

/// SELFDESTRUCT before Berlin
pub fn selfdestruct(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    selfdestruct_cost(ctx, scope, false, true)
}

/// SELFDESTRUCT with cold beneficiary surcharge (EIP-2929)
pub fn selfdestruct_eip2929(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    selfdestruct_cost(ctx, scope, true, true)
}

/// SELFDESTRUCT without refund (EIP-3529)
pub fn selfdestruct_eip3529(ctx: &mut Context<'_>, scope: &Scope<'_>) -> EvmResult<u64> {
    selfdestruct_cost(ctx, scope, true, false)
}
