//! Stack instructions: POP, PUSH0..PUSH32, DUP1..16, SWAP1..16

use crate::bytecode::read_push;
use crate::context::Context;
use crate::error::EvmResult;
use crate::scope::Scope;
use crate::table::Next;
use keel_primitives::U256;

/// POP
pub fn pop(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    scope.stack.pop()?;
    Ok(Next::Continue(pc + 1))
}

/// PUSH0 (EIP-3855)
pub fn push0(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    scope.stack.push(U256::zero())?;
    Ok(Next::Continue(pc + 1))
}

/// PUSH1..PUSH32; immediates past the end of code read as zero
pub fn push<const N: usize>(
    pc: usize,
    _ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
) -> EvmResult<Next> {
    let value = read_push(scope.code()?, pc, N);
    scope.stack.push(value)?;
    Ok(Next::Continue(pc + 1 + N))
}

/// DUP1..DUP16
pub fn dup<const N: usize>(
    pc: usize,
    _ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
) -> EvmResult<Next> {
    scope.stack.dup(N)?;
    Ok(Next::Continue(pc + 1))
}

/// SWAP1..SWAP16
pub fn swap<const N: usize>(
    pc: usize,
    _ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
) -> EvmResult<Next> {
    scope.stack.swap(N)?;
    Ok(Next::Continue(pc + 1))
}
