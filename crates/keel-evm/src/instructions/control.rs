//! Control flow: halting, dynamic jumps, relative jumps and section calls

use super::memory_range;
use crate::bytecode::read_i16;
use crate::config::JumpTargetCheck;
use crate::context::Context;
use crate::error::{EvmError, EvmResult};
use crate::scope::{ReturnFrame, Scope};
use crate::stack::u256_to_usize;
use crate::table::Next;
use keel_primitives::U256;

/// STOP
pub fn stop(_pc: usize, _ctx: &mut Context<'_>, _scope: &mut Scope<'_>) -> EvmResult<Next> {
    Ok(Next::Stop)
}

fn jump_target(scope: &Scope<'_>, dest: U256) -> EvmResult<usize> {
    let dest = u256_to_usize(dest).ok_or(EvmError::InvalidJump(usize::MAX))?;
    if !scope.contract.is_jump_dest(dest) {
        return Err(EvmError::InvalidJump(dest));
    }
    Ok(dest)
}

/// JUMP to a JUMPDEST
pub fn jump(_pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let dest = scope.stack.pop()?;
    Ok(Next::Continue(jump_target(scope, dest)?))
}

/// JUMPI: jump when the condition is non-zero
pub fn jumpi(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let dest = scope.stack.pop()?;
    let condition = scope.stack.pop()?;
    if condition.is_zero() {
        return Ok(Next::Continue(pc + 1));
    }
    Ok(Next::Continue(jump_target(scope, dest)?))
}

/// PC
pub fn pc(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    scope.stack.push(U256::from(pc))?;
    Ok(Next::Continue(pc + 1))
}

/// GAS: remaining gas after this instruction's cost
pub fn gas(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    scope.stack.push(U256::from(scope.gas))?;
    Ok(Next::Continue(pc + 1))
}

/// JUMPDEST
pub fn jumpdest(pc: usize, _ctx: &mut Context<'_>, _scope: &mut Scope<'_>) -> EvmResult<Next> {
    Ok(Next::Continue(pc + 1))
}

fn output(scope: &mut Scope<'_>) -> EvmResult<Vec<u8>> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    Ok(match memory_range(offset, size)? {
        Some((offset, size)) => {
            scope.memory.expand(offset, size);
            scope.memory.load_slice(offset, size)
        }
        None => Vec::new(),
    })
}

/// RETURN
pub fn ret(_pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    Ok(Next::Return(output(scope)?))
}

/// REVERT; unused gas is kept by the caller
pub fn revert(_pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    Err(EvmError::Revert(output(scope)?))
}

// ==================== Relative jumps (EIP-4200) ====================

/// Target of a relative jump at `pc`; the offset counts from the next
/// instruction
fn relative_target(
    ctx: &Context<'_>,
    section_len: usize,
    pc: usize,
    offset: i16,
) -> EvmResult<usize> {
    let target = (pc + 3) as isize + offset as isize;
    if target < 0 {
        return Err(EvmError::InvalidRelativeJump(target));
    }
    if ctx.config.jump_targets == JumpTargetCheck::Verify && target as usize >= section_len {
        return Err(EvmError::InvalidRelativeJump(target));
    }
    Ok(target as usize)
}

/// RJUMP
pub fn rjump(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let code = scope.code()?;
    let offset = read_i16(code, pc)?;
    Ok(Next::Continue(relative_target(ctx, code.len(), pc, offset)?))
}

/// RJUMPI: branch when the condition is non-zero
///
/// The immediate is decoded before the condition is looked at, so a
/// truncated immediate faults on both paths.
pub fn rjumpi(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let code = scope.code()?;
    let offset = read_i16(code, pc)?;
    let condition = scope.stack.pop()?;
    if condition.is_zero() {
        return Ok(Next::Continue(pc + 3));
    }
    Ok(Next::Continue(relative_target(ctx, code.len(), pc, offset)?))
}

// ==================== Section calls (EIP-4750) ====================

/// CALLF: enter a code section with its inputs as the visible stack
pub fn callf(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let raw = read_i16(scope.code()?, pc)?;
    let section = usize::try_from(raw).map_err(|_| EvmError::InvalidSection(i32::from(raw)))?;
    let callee = scope
        .contract
        .section_type(section)
        .ok_or(EvmError::InvalidSection(i32::from(raw)))?;

    let inputs = usize::from(callee.inputs);
    let have = scope.stack.height();
    if have < inputs {
        return Err(EvmError::TooFewStackItems { have, need: inputs });
    }
    scope.return_stack.push(ReturnFrame {
        section: scope.section,
        stack_floor: scope.stack.floor(),
        return_pc: pc + 3,
    })?;
    scope.stack.set_floor(scope.stack.len() - inputs)?;
    scope.section = section;
    tracing::trace!("callf section {} at depth {}", section, scope.return_stack.len());
    Ok(Next::Continue(0))
}

/// RETF: resume the caller section after its CALLF
pub fn retf(_pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let section = scope.section;
    let outputs = scope
        .contract
        .section_type(section)
        .map(|t| usize::from(t.outputs))
        .ok_or(EvmError::InvalidSection(i32::try_from(section).unwrap_or(i32::MAX)))?;
    let have = scope.stack.height();
    if have < outputs {
        return Err(EvmError::TooFewStackItems { have, need: outputs });
    }
    let frame = scope.return_stack.pop()?;
    scope.stack.set_floor(frame.stack_floor)?;
    scope.section = frame.section;
    Ok(Next::Continue(frame.return_pc))
}
