//! Arithmetic instructions (0x01 - 0x0B)

use crate::context::Context;
use crate::error::EvmResult;
use crate::scope::Scope;
use crate::table::Next;
use keel_primitives::U256;
use primitive_types::U512;

/// Sign bit of a two's complement word
pub(crate) fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's complement negation
pub(crate) fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

fn binary(scope: &mut Scope<'_>, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<()> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    scope.stack.push(f(a, b))
}

/// ADD (wrapping)
pub fn add(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a.overflowing_add(b).0)?;
    Ok(Next::Continue(pc + 1))
}

/// MUL (wrapping)
pub fn mul(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a.overflowing_mul(b).0)?;
    Ok(Next::Continue(pc + 1))
}

/// SUB (wrapping)
pub fn sub(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| a.overflowing_sub(b).0)?;
    Ok(Next::Continue(pc + 1))
}

/// DIV; division by zero yields zero
pub fn div(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| if b.is_zero() { U256::zero() } else { a / b })?;
    Ok(Next::Continue(pc + 1))
}

/// SDIV; the quotient is negative when the signs differ
pub fn sdiv(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| {
        if b.is_zero() {
            return U256::zero();
        }
        let quotient = abs(a) / abs(b);
        if is_negative(a) != is_negative(b) {
            negate(quotient)
        } else {
            quotient
        }
    })?;
    Ok(Next::Continue(pc + 1))
}

/// MOD; modulo zero yields zero
pub fn modulo(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| if b.is_zero() { U256::zero() } else { a % b })?;
    Ok(Next::Continue(pc + 1))
}

/// SMOD; the result takes the sign of the dividend
pub fn smod(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |a, b| {
        if b.is_zero() {
            return U256::zero();
        }
        let rem = abs(a) % abs(b);
        if is_negative(a) {
            negate(rem)
        } else {
            rem
        }
    })?;
    Ok(Next::Continue(pc + 1))
}

/// ADDMOD without intermediate overflow
pub fn addmod(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    let n = scope.stack.pop()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        let (sum, overflow) = (a % n).overflowing_add(b % n);
        if overflow || sum >= n {
            sum.overflowing_sub(n).0
        } else {
            sum
        }
    };
    scope.stack.push(result)?;
    Ok(Next::Continue(pc + 1))
}

/// MULMOD over the full 512-bit product
pub fn mulmod(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    let a = scope.stack.pop()?;
    let b = scope.stack.pop()?;
    let n = scope.stack.pop()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        let product = a.full_mul(b) % U512::from(n);
        let mut buf = [0u8; 64];
        product.to_big_endian(&mut buf);
        U256::from_big_endian(&buf[32..])
    };
    scope.stack.push(result)?;
    Ok(Next::Continue(pc + 1))
}

/// EXP (wrapping)
pub fn exp(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |base, exponent| base.overflowing_pow(exponent).0)?;
    Ok(Next::Continue(pc + 1))
}

/// SIGNEXTEND from byte `b` (0 = least significant)
pub fn signextend(pc: usize, _ctx: &mut Context<'_>, scope: &mut Scope<'_>) -> EvmResult<Next> {
    binary(scope, |b, x| {
        if b >= U256::from(31u64) {
            return x;
        }
        let bit = b.low_u64() as usize * 8 + 7;
        let mask = (U256::one() << (bit + 1)) - U256::one();
        if x.bit(bit) {
            x | !mask
        } else {
            x & mask
        }
    })?;
    Ok(Next::Continue(pc + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::test_support::run;

    fn neg(v: u64) -> U256 {
        negate(U256::from(v))
    }

    /// PUSH32 each operand (last pushed ends on top), then run `op`
    fn eval(op: u8, operands: &[U256]) -> U256 {
        let mut code = Vec::new();
        for v in operands.iter().rev() {
            let mut buf = [0u8; 32];
            v.to_big_endian(&mut buf);
            code.push(0x7F);
            code.extend_from_slice(&buf);
        }
        code.push(op);
        let out = run(&code);
        out.result.as_ref().unwrap();
        out.top()
    }

    // ==================== Wrapping Tests ====================

    #[test]
    fn test_add_wraps() {
        assert_eq!(eval(0x01, &[U256::MAX, U256::one()]), U256::zero());
        assert_eq!(eval(0x01, &[U256::from(2u64), U256::from(3u64)]), U256::from(5u64));
    }

    #[test]
    fn test_sub_operand_order() {
        // top - second
        assert_eq!(eval(0x03, &[U256::from(10u64), U256::from(4u64)]), U256::from(6u64));
        assert_eq!(eval(0x03, &[U256::zero(), U256::one()]), U256::MAX);
    }

    #[test]
    fn test_mul_and_exp() {
        assert_eq!(eval(0x02, &[U256::from(6u64), U256::from(7u64)]), U256::from(42u64));
        assert_eq!(eval(0x0A, &[U256::from(2u64), U256::from(10u64)]), U256::from(1024u64));
        assert_eq!(eval(0x0A, &[U256::from(2u64), U256::from(256u64)]), U256::zero());
    }

    // ==================== Division Tests ====================

    #[test]
    fn test_div_mod_by_zero() {
        assert_eq!(eval(0x04, &[U256::from(7u64), U256::zero()]), U256::zero());
        assert_eq!(eval(0x06, &[U256::from(7u64), U256::zero()]), U256::zero());
        assert_eq!(eval(0x05, &[U256::from(7u64), U256::zero()]), U256::zero());
        assert_eq!(eval(0x07, &[U256::from(7u64), U256::zero()]), U256::zero());
    }

    #[test]
    fn test_sdiv() {
        assert_eq!(eval(0x05, &[neg(10), U256::from(3u64)]), neg(3));
        assert_eq!(eval(0x05, &[neg(10), neg(2)]), U256::from(5u64));
        let min = U256::one() << 255;
        assert_eq!(eval(0x05, &[min, U256::MAX]), min);
    }

    #[test]
    fn test_smod_follows_dividend() {
        assert_eq!(eval(0x07, &[neg(10), U256::from(3u64)]), neg(1));
        assert_eq!(eval(0x07, &[U256::from(10u64), neg(3)]), U256::one());
    }

    #[test]
    fn test_addmod_mulmod_wide() {
        let n = U256::from(7u64);
        assert_eq!(eval(0x08, &[U256::MAX, U256::MAX, n]), (U256::MAX % n + U256::MAX % n) % n);
        assert_eq!(eval(0x09, &[U256::MAX, U256::MAX, U256::MAX]), U256::zero());
        assert_eq!(eval(0x09, &[U256::MAX, U256::from(2u64), n]), (U256::MAX % n * 2) % n);
        assert_eq!(eval(0x08, &[U256::one(), U256::one(), U256::zero()]), U256::zero());
    }

    // ==================== Sign Extension Tests ====================

    #[test]
    fn test_signextend() {
        assert_eq!(eval(0x0B, &[U256::zero(), U256::from(0xFFu64)]), U256::MAX);
        assert_eq!(eval(0x0B, &[U256::zero(), U256::from(0x7Fu64)]), U256::from(0x7Fu64));
        assert_eq!(eval(0x0B, &[U256::one(), U256::from(0x1_80FFu64)]), neg(0x7F01));
        assert_eq!(eval(0x0B, &[U256::from(31u64), U256::from(0xFFu64)]), U256::from(0xFFu64));
    }
}
