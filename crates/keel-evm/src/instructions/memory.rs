//! Memory instructions: MLOAD, MSTORE, MSTORE8, MSIZE

use super::memory_range;
use crate::context::Context;
use crate::error::EvmResult;
use crate::scope::Scope;
use crate::table::Next;
use keel_primitives::U256;

fn word_offset(offset: U256, size: u64) -> EvmResult<usize> {
    // Never None: size is non-zero
    Ok(memory_range(offset, U256::from(size))?.map_or(0, |(o, _)| o))
}

/// MLOAD
pub fn mload(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let offset = word_offset(scope.stack.pop()?, 32)?;
    scope.memory.expand(offset, 32);
    let value = scope.memory.load(offset);
    scope.stack.push(value)?;
    Ok(Next::Continue(pc + 1))
}

/// MSTORE
pub fn mstore(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let offset = word_offset(scope.stack.pop()?, 32)?;
    let value = scope.stack.pop()?;
    scope.memory.store(offset, value);
    Ok(Next::Continue(pc + 1))
}

/// MSTORE8: lowest byte of the value
pub fn mstore8(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let offset = word_offset(scope.stack.pop()?, 1)?;
    let value = scope.stack.pop()?;
    scope.memory.store8(offset, value.byte(0));
    Ok(Next::Continue(pc + 1))
}

/// MSIZE
pub fn msize(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let size = scope.memory.size();
    scope.stack.push(U256::from(size))?;
    Ok(Next::Continue(pc + 1))
}
