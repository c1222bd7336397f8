//! State-access instructions served by the [`Host`](crate::host::Host)

use super::memory_range;
use crate::context::Context;
use crate::error::{EvmError, EvmResult, Log};
use crate::scope::Scope;
use crate::stack::{u256_to_u64, u256_to_usize_saturating};
use crate::table::Next;
use keel_primitives::{Address, H256, U256};

/// Blocks reachable by BLOCKHASH below the current one
const BLOCKHASH_WINDOW: u64 = 256;

fn require_writable(scope: &Scope<'_>) -> EvmResult<()> {
    if scope.read_only {
        return Err(EvmError::WriteProtection);
    }
    Ok(())
}

/// BALANCE
pub fn balance(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let address = Address::from_word(scope.stack.pop()?);
    scope.stack.push(ctx.host.balance(&address))?;
    Ok(Next::Continue(pc + 1))
}

/// SELFBALANCE (EIP-1884)
pub fn selfbalance(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let balance = ctx.host.balance(&scope.contract.address);
    scope.stack.push(balance)?;
    Ok(Next::Continue(pc + 1))
}

/// EXTCODESIZE
pub fn extcodesize(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let address = Address::from_word(scope.stack.pop()?);
    scope.stack.push(U256::from(ctx.host.code_size(&address)))?;
    Ok(Next::Continue(pc + 1))
}

/// EXTCODECOPY
pub fn extcodecopy(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let address = Address::from_word(scope.stack.pop()?);
    let dest = scope.stack.pop()?;
    let offset = u256_to_usize_saturating(scope.stack.pop()?);
    let size = scope.stack.pop()?;
    if let Some((dest, size)) = memory_range(dest, size)? {
        scope
            .memory
            .store_padded(dest, ctx.host.code(&address), offset, size);
    }
    Ok(Next::Continue(pc + 1))
}

/// EXTCODEHASH; zero for empty accounts
pub fn extcodehash(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let address = Address::from_word(scope.stack.pop()?);
    scope.stack.push(ctx.host.code_hash(&address).to_word())?;
    Ok(Next::Continue(pc + 1))
}

/// BLOCKHASH for the 256 most recent blocks, zero otherwise
pub fn blockhash(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let requested = scope.stack.pop()?;
    let current = ctx.env.block.number;
    let hash = match u256_to_u64(requested) {
        Some(n) if n < current && current - n <= BLOCKHASH_WINDOW => ctx.host.block_hash(n),
        _ => H256::ZERO,
    };
    scope.stack.push(hash.to_word())?;
    Ok(Next::Continue(pc + 1))
}

/// SLOAD
pub fn sload(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let key = H256::from_word(scope.stack.pop()?);
    let value = ctx.host.storage(&scope.contract.address, &key);
    scope.stack.push(value)?;
    Ok(Next::Continue(pc + 1))
}

/// SSTORE
pub fn sstore(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    require_writable(scope)?;
    let key = H256::from_word(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    ctx.host.set_storage(scope.contract.address, key, value);
    Ok(Next::Continue(pc + 1))
}

/// TLOAD (EIP-1153); unset slots read as zero
pub fn tload(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let key = H256::from_word(scope.stack.pop()?);
    let value = ctx.host.transient(&scope.contract.address, &key);
    scope.stack.push(value)?;
    Ok(Next::Continue(pc + 1))
}

/// TSTORE (EIP-1153)
pub fn tstore(pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    require_writable(scope)?;
    let key = H256::from_word(scope.stack.pop()?);
    let value = scope.stack.pop()?;
    ctx.host.set_transient(scope.contract.address, key, value);
    Ok(Next::Continue(pc + 1))
}

/// LOG0..LOG4
pub fn log<const N: usize>(
    pc: usize,
    ctx: &mut Context<'_>,
    scope: &mut Scope<'_>,
) -> EvmResult<Next> {
    require_writable(scope)?;
    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let mut topics = Vec::with_capacity(N);
    for _ in 0..N {
        topics.push(H256::from_word(scope.stack.pop()?));
    }
    let data = match memory_range(offset, size)? {
        Some((offset, size)) => {
            scope.memory.expand(offset, size);
            scope.memory.load_slice(offset, size)
        }
        None => Vec::new(),
    };
    ctx.host.log(Log {
        address: scope.contract.address,
        topics,
        data,
    });
    Ok(Next::Continue(pc + 1))
}

/// SELFDESTRUCT; halts the frame
pub fn selfdestruct(_pc: usize, ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    require_writable(scope)?;
    let beneficiary = Address::from_word(scope.stack.pop()?);
    tracing::debug!("selfdestruct {} -> {}", scope.contract.address, beneficiary);
    ctx.host.selfdestruct(scope.contract.address, beneficiary);
    Ok(Next::Stop)
}
