//! Comparison and bitwise instructions (0x10 - 0x1D)

use super::arithmetic::is_negative;
use crate::context::Context;
use crate::error::EvmResult;
use crate::scope::Scope;
use crate::stack::u256_from_bool;
use crate::table::Next;
use keel_primitives::U256;
use std::cmp::Ordering;

fn signed_cmp(a: U256, b: U256) -> Ordering {
    match (is_negative(a), is_negative(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.cmp(&b),
    }
}

fn binary(scope: &mut Scope<'_>, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<()> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    scope.stack.push(f(a, b))
}

/// Shift amount, None when it clears every bit
fn shift_amount(shift: U256) -> Option<usize> {
    if shift >= U256::from(256u64) {
        None
    } else {
        Some(shift.low_u64() as usize)
    }
}

/// LT
pub fn lt(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| u256_from_bool(a < b))?;
    Ok(Next::Continue(pc + 1))
}

/// GT
pub fn gt(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| u256_from_bool(a > b))?;
    Ok(Next::Continue(pc + 1))
}

/// SLT
pub fn slt(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| u256_from_bool(signed_cmp(a, b) == Ordering::Less))?;
    Ok(Next::Continue(pc + 1))
}

/// SGT
pub fn sgt(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| u256_from_bool(signed_cmp(a, b) == Ordering::Greater))?;
    Ok(Next::Continue(pc + 1))
}

/// EQ
pub fn eq(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| u256_from_bool(a == b))?;
    Ok(Next::Continue(pc + 1))
}

/// ISZERO
pub fn iszero(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let a = scope.stack.pop()?;
    scope.stack.push(u256_from_bool(a.is_zero()))?;
    Ok(Next::Continue(pc + 1))
}

/// AND
pub fn and(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a & b)?;
    Ok(Next::Continue(pc + 1))
}

/// OR
pub fn or(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a | b)?;
    Ok(Next::Continue(pc + 1))
}

/// XOR
pub fn xor(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a ^ b)?;
    Ok(Next::Continue(pc + 1))
}

/// NOT
pub fn not(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let a = scope.stack.pop()?;
    scope.stack.push(!a)?;
    Ok(Next::Continue(pc + 1))
}

/// BYTE: byte `i` of `x`, counting from the most significant
pub fn byte(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |i, x| {
        if i >= U256::from(32u64) {
            return U256::zero();
        }
        U256::from(x.byte(31 - i.low_u64() as usize))
    })?;
    Ok(Next::Continue(pc + 1))
}

/// SHL (EIP-145)
pub fn shl(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |shift, value| match shift_amount(shift) {
        Some(n) => value << n,
        None => U256::zero(),
    })?;
    Ok(Next::Continue(pc + 1))
}

/// SHR (EIP-145)
pub fn shr(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |shift, value| match shift_amount(shift) {
        Some(n) => value >> n,
        None => U256::zero(),
    })?;
    Ok(Next::Continue(pc + 1))
}

/// SAR (EIP-145): arithmetic shift filling with the sign bit
pub fn sar(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |shift, value| {
        let negative = is_negative(value);
        match shift_amount(shift) {
            None if negative => U256::MAX,
            None => U256::zero(),
            Some(0) => value,
            Some(n) if negative => (value >> n) | (U256::MAX << (256 - n)),
            Some(n) => value >> n,
        }
    })?;
    Ok(Next::Continue(pc + 1))
}

#[cfg(test)]
mod tests {
    use crate::instructions::arithmetic::negate;
    use crate::instructions::test_support::run;
    use keel_primitives::U256;

    /// Run `PUSH1 b PUSH1 a op`, so `a` is on top
    fn eval(op: u8, a: u8, b: u8) -> U256 {
        let out = run(&[0x60, b, 0x60, a, op]);
        out.result.as_ref().unwrap();
        out.top()
    }

    // ==================== Comparison Tests ====================

    #[test]
    fn test_unsigned_compare() {
        assert_eq!(eval(0x10, 1, 2), U256::one());
        assert_eq!(eval(0x10, 2, 1), U256::zero());
        assert_eq!(eval(0x11, 2, 1), U256::one());
        assert_eq!(eval(0x14, 5, 5), U256::one());
    }

    #[test]
    fn test_signed_compare() {
        // PUSH1 1, PUSH1 0, NOT (-1 on top), SLT: -1 < 1
        let out = run(&[0x60, 0x01, 0x60, 0x00, 0x19, 0x12]);
        assert_eq!(out.top(), U256::one());
        let out = run(&[0x60, 0x01, 0x60, 0x00, 0x19, 0x13]);
        assert_eq!(out.top(), U256::zero());
    }

    #[test]
    fn test_iszero_not() {
        let out = run(&[0x60, 0x00, 0x15]);
        assert_eq!(out.top(), U256::one());
        let out = run(&[0x60, 0x00, 0x19]);
        assert_eq!(out.top(), U256::MAX);
    }

    // ==================== Bitwise Tests ====================

    #[test]
    fn test_and_or_xor() {
        assert_eq!(eval(0x16, 0b1100, 0b1010), U256::from(0b1000u64));
        assert_eq!(eval(0x17, 0b1100, 0b1010), U256::from(0b1110u64));
        assert_eq!(eval(0x18, 0b1100, 0b1010), U256::from(0b0110u64));
    }

    #[test]
    fn test_byte() {
        assert_eq!(eval(0x1A, 31, 0xAB), U256::from(0xABu64));
        assert_eq!(eval(0x1A, 30, 0xAB), U256::zero());
        assert_eq!(eval(0x1A, 32, 0xAB), U256::zero());
    }

    // ==================== Shift Tests ====================

    #[test]
    fn test_shl_shr() {
        assert_eq!(eval(0x1B, 4, 1), U256::from(16u64));
        assert_eq!(eval(0x1C, 4, 0xFF), U256::from(0x0Fu64));
        // shift of 256 or more clears
        let out = run(&[0x60, 0x01, 0x61, 0x01, 0x00, 0x1B]);
        assert_eq!(out.top(), U256::zero());
    }

    #[test]
    fn test_sar() {
        // -16 >> 2 == -4
        let mut code = vec![0x7F];
        let mut buf = [0u8; 32];
        negate(U256::from(16u64)).to_big_endian(&mut buf);
        code.extend_from_slice(&buf);
        code.extend_from_slice(&[0x60, 0x02, 0x1D]);
        assert_eq!(run(&code).top(), negate(U256::from(4u64)));

        assert_eq!(eval(0x1D, 2, 16), U256::from(4u64));
        // PUSH1 0, NOT, PUSH2 0x0100, SAR
        let out = run(&[0x60, 0x00, 0x19, 0x61, 0x01, 0x00, 0x1D]);
        assert_eq!(out.top(), U256::MAX);
    }
}
