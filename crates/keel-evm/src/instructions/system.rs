//! Nested frames: CREATE, CREATE2 and the CALL family
//!
//! The host runs the nested frame. Forwarded gas is taken from this frame
//! up front and whatever the callee leaves is given back.

use super::memory_range;
use crate::context::Context;
use crate::error::{EvmError, EvmResult};
use crate::gas::{self, cost};
use crate::host::{CallInputs, CallKind, CreateInputs, CreateKind};
use crate::scope::Scope;
use crate::stack::u256_from_bool;
use crate::table::Next;
use keel_primitives::{Address, U256};

fn read_memory(scope: &mut Scope<'_>, offset: U256, size: U256) -> EvmResult<Vec<u8>> {
    Ok(match memory_range(offset, size)? {
        Some((offset, size)) => {
            scope.memory.expand(offset, size);
            scope.memory.load_slice(offset, size)
        }
        None => Vec::new(),
    })
}

fn create_inner(
    pc: usize,
    ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
    salted: bool,
) -> EvmResult<Next> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    let value = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let kind = if salted {
        CreateKind::Create2 {
            salt: scope.stack.pop()?,
        }
    } else {
        CreateKind::Create
    };
    let init_code = read_memory(scope, offset, size)?;

    // All but one 64th (EIP-150)
    let forwarded = scope.gas - scope.gas / 64;
    scope.use_gas(forwarded)?;

    let outcome = ctx.host.create(CreateInputs {
        kind,
        caller: scope.contract.address,
        value,
        init_code,
        gas: forwarded,
    });
    scope.return_gas(outcome.gas_left);

    let address = match outcome.address {
        Some(address) => {
            scope.return_data.clear();
            address.to_word()
        }
        None => {
            scope.return_data = outcome.output;
            U256::zero()
        }
    };
    scope.stack.push(address)?;
    Ok(Next::Continue(pc + 1))
}

/// CREATE
pub fn create(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    create_inner(pc, ctx, scope, false)
}

/// CREATE2
pub fn create2(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    create_inner(pc, ctx, scope, true)
}

fn call_inner(
    pc: usize,
    ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
    kind: CallKind,
) -> EvmResult<Next> {
    let requested = scope.stack.pop()?;
    let target = Address::from_word(scope.stack.pop()?);
    let value = match kind {
        CallKind::Call | CallKind::CallCode => scope.stack.pop()?,
        CallKind::DelegateCall => scope.contract.value,
        CallKind::StaticCall => U256::zero(),
    };
    let in_offset = scope.stack.pop()?;
    let in_size = scope.stack.pop()?;
    let out_offset = scope.stack.pop()?;
    let out_size = scope.stack.pop()?;

    let transfers_value = !value.is_zero() && matches!(kind, CallKind::Call | CallKind::CallCode);
    if transfers_value && kind == CallKind::Call && scope.read_only {
        return Err(EvmError::WriteProtection);
    }

    let input = read_memory(scope, in_offset, in_size)?;
    let out_range = memory_range(out_offset, out_size)?;
    if let Some((offset, size)) = out_range {
        scope.memory.expand(offset, size);
    }

    let mut forwarded = gas::call_gas(scope.gas, requested);
    scope.use_gas(forwarded)?;
    if transfers_value {
        forwarded += cost::CALL_STIPEND;
    }

    let this = scope.contract.address;
    let (caller, address) = match kind {
        CallKind::Call | CallKind::StaticCall => (this, target),
        CallKind::CallCode => (this, this),
        CallKind::DelegateCall => (scope.contract.caller, this),
    };
    let outcome = ctx.host.call(CallInputs {
        kind,
        caller,
        address,
        code_address: target,
        value,
        input,
        gas: forwarded,
        is_static: scope.read_only || kind == CallKind::StaticCall,
    });
    scope.return_gas(outcome.gas_left);

    if let Some((offset, size)) = out_range {
        let len = size.min(outcome.output.len());
        scope.memory.store_slice(offset, &outcome.output[..len]);
    }
    scope.return_data = outcome.output;
    scope.stack.push(u256_from_bool(outcome.success))?;
    Ok(Next::Continue(pc + 1))
}

/// CALL
pub fn call(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    call_inner(pc, ctx, scope, CallKind::Call)
}

/// CALLCODE
pub fn callcode(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    call_inner(pc, ctx, scope, CallKind::CallCode)
}

/// DELEGATECALL
pub fn delegatecall(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    call_inner(pc, ctx, scope, CallKind::DelegateCall)
}

/// STATICCALL
pub fn staticcall(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    call_inner(pc, ctx, scope, CallKind::StaticCall)
}
