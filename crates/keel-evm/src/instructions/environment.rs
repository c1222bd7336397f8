//! Environment and block information instructions

use super::memory_range;
use crate::context::Context;
use crate::error::{EvmError, EvmResult};
use crate::keccak;
use crate::scope::Scope;
use crate::stack::{u256_to_usize, u256_to_usize_saturating};
use crate::table::Next;
use keel_primitives::U256;

/// Word at `offset` of `data`, zero past the end
fn padded_word(data: &[u8], offset: usize) -> U256 {
    let mut buf = [0u8; 32];
    if offset < data.len() {
        let end = offset.saturating_add(32).min(data.len());
        buf[..end - offset].copy_from_slice(&data[offset..end]);
    }
    U256::from_big_endian(&buf)
}

fn push(pc: usize, scope: &mut Scope<'_>, value: U256) -> EvmResult<Next> {
    scope.stack.push(value)?;
    Ok(Next::Continue(pc + 1))
}

/// KECCAK256 over a memory range
pub fn keccak256(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let data = match memory_range(offset, size)? {
        Some((offset, size)) => {
            scope.memory.expand(offset, size);
            scope.memory.load_slice(offset, size)
        }
        None => Vec::new(),
    };
    push(pc, scope, keccak::keccak256(&data).to_word())
}

/// ADDRESS
pub fn address(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let value = scope.contract.address.to_word();
    push(pc, scope, value)
}

/// ORIGIN
pub fn origin(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, ctx.env.tx.origin.to_word())
}

/// CALLER
pub fn caller(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let value = scope.contract.caller.to_word();
    push(pc, scope, value)
}

/// CALLVALUE
pub fn callvalue(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let value = scope.contract.value;
    push(pc, scope, value)
}

/// CALLDATALOAD; bytes past the end read as zero
pub fn calldataload(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let offset = u256_to_usize_saturating(scope.stack.pop()?);
    let value = padded_word(&scope.contract.input, offset);
    push(pc, scope, value)
}

/// CALLDATASIZE
pub fn calldatasize(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let size = scope.contract.input.len();
    push(pc, scope, U256::from(size))
}

/// Shared body of CALLDATACOPY and CODECOPY
fn copy_padded(scope: &mut Scope<'_>, src: &[u8]) -> EvmResult<()> {
    let dest = scope.stack.pop()?;
    let offset = u256_to_usize_saturating(scope.stack.pop()?);
    let size = scope.stack.pop()?;
    if let Some((dest, size)) = memory_range(dest, size)? {
        scope.memory.store_padded(dest, src, offset, size);
    }
    Ok(())
}

/// CALLDATACOPY
pub fn calldatacopy(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let contract = scope.contract;
    copy_padded(scope, &contract.input)?;
    Ok(Next::Continue(pc + 1))
}

/// CODESIZE: the whole code, containers included
pub fn codesize(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let size = scope.contract.code.len();
    push(pc, scope, U256::from(size))
}

/// CODECOPY
pub fn codecopy(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let contract = scope.contract;
    copy_padded(scope, &contract.code)?;
    Ok(Next::Continue(pc + 1))
}

/// GASPRICE
pub fn gasprice(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, ctx.env.tx.gas_price)
}

/// RETURNDATASIZE
pub fn returndatasize(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let size = scope.return_data.len();
    push(pc, scope, U256::from(size))
}

/// RETURNDATACOPY; reading past the return data is a fault, not padding
pub fn returndatacopy(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let dest = scope.stack.pop()?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;

    let offset = u256_to_usize(offset).ok_or(EvmError::ReturnDataOutOfBounds)?;
    let len = u256_to_usize(size).ok_or(EvmError::ReturnDataOutOfBounds)?;
    let end = offset
        .checked_add(len)
        .ok_or(EvmError::ReturnDataOutOfBounds)?;
    if end > scope.return_data.len() {
        return Err(EvmError::ReturnDataOutOfBounds);
    }
    if let Some((dest, size)) = memory_range(dest, size)? {
        let data = scope.return_data[offset..end].to_vec();
        scope.memory.store_padded(dest, &data, 0, size);
    }
    Ok(Next::Continue(pc + 1))
}

/// COINBASE
pub fn coinbase(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, ctx.env.block.coinbase.to_word())
}

/// TIMESTAMP
pub fn timestamp(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, U256::from(ctx.env.block.timestamp))
}

/// NUMBER
pub fn number(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, U256::from(ctx.env.block.number))
}

/// DIFFICULTY
pub fn difficulty(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, ctx.env.block.difficulty)
}

/// GASLIMIT
pub fn gaslimit(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, U256::from(ctx.env.block.gas_limit))
}

/// CHAINID (EIP-1344)
pub fn chainid(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, U256::from(ctx.env.block.chain_id))
}

/// BASEFEE (EIP-3198)
pub fn basefee(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    push(pc, scope, ctx.env.block.base_fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockContext, Environment, TxContext};
    use crate::host::MemoryHost;
    use crate::instructions::test_support::{run, run_with, ADDRESS, CALLER};
    use crate::keccak::KECCAK_EMPTY;
    use keel_primitives::Address;

    fn env() -> Environment {
        Environment::new(
            BlockContext {
                number: 100,
                timestamp: 1_700_000_000,
                gas_limit: 15_000_000,
                coinbase: Address::from_bytes([0x0C; 20]),
                difficulty: U256::from(7u64),
                chain_id: 137,
                base_fee: U256::from(1_000_000_000u64),
            },
            TxContext {
                origin: Address::from_bytes([0x0F; 20]),
                gas_price: U256::from(30u64),
            },
        )
    }

    fn eval_env(op: u8) -> U256 {
        let out = run_with(&[op], MemoryHost::new(), env(), false);
        out.result.as_ref().unwrap();
        out.top()
    }

    // ==================== Context Tests ====================

    #[test]
    fn test_block_values() {
        assert_eq!(eval_env(0x41), Address::from_bytes([0x0C; 20]).to_word());
        assert_eq!(eval_env(0x42), U256::from(1_700_000_000u64));
        assert_eq!(eval_env(0x43), U256::from(100u64));
        assert_eq!(eval_env(0x44), U256::from(7u64));
        assert_eq!(eval_env(0x45), U256::from(15_000_000u64));
    }

    #[test]
    fn test_chainid_basefee() {
        assert_eq!(eval_env(0x46), U256::from(137u64));
        assert_eq!(eval_env(0x48), U256::from(1_000_000_000u64));
        let out = run_with(&[0x46, 0x48], MemoryHost::new(), env(), false);
        assert_eq!(out.gas_used, 4);
    }

    #[test]
    fn test_tx_and_call_values() {
        assert_eq!(eval_env(0x32), Address::from_bytes([0x0F; 20]).to_word());
        assert_eq!(eval_env(0x3A), U256::from(30u64));
        assert_eq!(eval_env(0x30), ADDRESS.to_word());
        assert_eq!(eval_env(0x33), CALLER.to_word());
        assert_eq!(eval_env(0x34), U256::zero());
    }

    // ==================== Data Tests ====================

    #[test]
    fn test_keccak256_empty_range() {
        let out = run(&[0x60, 0x00, 0x60, 0x00, 0x20]);
        assert_eq!(out.top(), KECCAK_EMPTY.to_word());
        assert!(out.memory.is_empty());
        // 2 pushes + 30
        assert_eq!(out.gas_used, 36);
    }

    #[test]
    fn test_codesize_codecopy() {
        // PUSH1 4 PUSH1 0 PUSH1 0 CODECOPY CODESIZE
        let code = [0x60, 0x04, 0x60, 0x00, 0x60, 0x00, 0x39, 0x38];
        let out = run(&code);
        assert_eq!(out.top(), U256::from(8u64));
        assert_eq!(&out.memory[..4], &code[..4]);
        assert_eq!(out.memory[4], 0);
    }

    #[test]
    fn test_padded_word() {
        assert_eq!(padded_word(&[0x01], 0), U256::from(0x01u64) << 248);
        assert_eq!(padded_word(&[0x01], 1), U256::zero());
        assert_eq!(padded_word(&[0x01], usize::MAX), U256::zero());
    }

    #[test]
    fn test_returndata_empty() {
        let out = run(&[0x3D]);
        assert_eq!(out.top(), U256::zero());
        // RETURNDATACOPY 1 byte from empty return data
        let out = run(&[0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0x3E]);
        assert_eq!(out.result, Err(EvmError::ReturnDataOutOfBounds));
    }
}
