//! Bounds-checked bytecode readers

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use keel_primitives::U256;
use std::collections::HashSet;

/// Read the big-endian `i16` immediate of the instruction at `pc`
///
/// The immediate occupies `code[pc + 1..pc + 3]`; a section that ends
/// before that yields `TruncatedImmediate` instead of a read past the end.
pub fn read_i16(code: &[u8], pc: usize) -> EvmResult<i16> {
    let start = pc.checked_add(1).ok_or(EvmError::TruncatedImmediate { pc })?;
    let bytes = code
        .get(start..start + 2)
        .ok_or(EvmError::TruncatedImmediate { pc })?;
    Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read the `size`-byte PUSH immediate at `pc`, zero-padding past the end
/// of code (legacy semantics)
pub fn read_push(code: &[u8], pc: usize, size: usize) -> U256 {
    let mut buf = [0u8; 32];
    let start = (pc + 1).min(code.len());
    let end = (pc + 1 + size).min(code.len());
    let available = end - start;
    buf[32 - size..32 - size + available].copy_from_slice(&code[start..end]);
    U256::from_big_endian(&buf)
}

/// Collect JUMPDEST positions, skipping PUSH immediates
pub fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;

    while i < code.len() {
        let opcode = code[i];
        if opcode == Opcode::JUMPDEST as u8 {
            dests.insert(i);
        }
        // Skip PUSH operands
        i += Opcode::from_byte(opcode).map_or(0, Opcode::push_size) + 1;
    }

    dests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_i16() {
        assert_eq!(read_i16(&[0xE0, 0x00, 0x00], 0).unwrap(), 0);
        assert_eq!(read_i16(&[0xE0, 0x00, 0x05], 0).unwrap(), 5);
        assert_eq!(read_i16(&[0xE0, 0xFF, 0xFD], 0).unwrap(), -3);
        assert_eq!(read_i16(&[0x00, 0xE0, 0x7F, 0xFF], 1).unwrap(), i16::MAX);
    }

    #[test]
    fn test_read_i16_truncated() {
        assert_eq!(
            read_i16(&[0xE0, 0x00], 0),
            Err(EvmError::TruncatedImmediate { pc: 0 })
        );
        assert_eq!(read_i16(&[0xE0], 0), Err(EvmError::TruncatedImmediate { pc: 0 }));
        assert_eq!(
            read_i16(&[0xE0, 0, 0], 5),
            Err(EvmError::TruncatedImmediate { pc: 5 })
        );
        assert_eq!(
            read_i16(&[], usize::MAX),
            Err(EvmError::TruncatedImmediate { pc: usize::MAX })
        );
    }

    #[test]
    fn test_read_push() {
        assert_eq!(read_push(&[0x60, 0x42], 0, 1), U256::from(0x42u64));
        assert_eq!(read_push(&[0x61, 0x01, 0x02], 0, 2), U256::from(0x0102u64));
    }

    #[test]
    fn test_read_push_truncated_pads_right() {
        // PUSH2 with one byte left reads as 0x0100
        assert_eq!(read_push(&[0x61, 0x01], 0, 2), U256::from(0x0100u64));
        assert_eq!(read_push(&[0x7F], 0, 32), U256::zero());
    }

    #[test]
    fn test_analyze_jump_dests() {
        // PUSH1 0x5b, JUMPDEST
        let dests = analyze_jump_dests(&[0x60, 0x5B, 0x5B]);
        assert!(!dests.contains(&1));
        assert!(dests.contains(&2));
    }
}
