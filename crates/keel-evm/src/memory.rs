//! EVM memory implementation

use keel_primitives::U256;

/// EVM memory (byte-addressable, expandable)
///
/// Callers charge expansion gas before touching memory; every write
/// expands to the next 32-byte boundary.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Get current memory size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Ensure `offset..offset + size` is addressable
    pub fn expand(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let end = offset.saturating_add(size);
        if end > self.data.len() {
            let aligned = end.div_ceil(32) * 32;
            self.data.resize(aligned, 0);
        }
    }

    /// Load a 32-byte word from memory
    pub fn load(&self, offset: usize) -> U256 {
        let mut buf = [0u8; 32];
        let end = offset.saturating_add(32).min(self.data.len());
        if offset < end {
            buf[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        U256::from_big_endian(&buf)
    }

    /// Store a 32-byte word to memory
    pub fn store(&mut self, offset: usize, value: U256) {
        self.expand(offset, 32);
        value.to_big_endian(&mut self.data[offset..offset + 32]);
    }

    /// Store a single byte to memory
    pub fn store8(&mut self, offset: usize, value: u8) {
        self.expand(offset, 1);
        self.data[offset] = value;
    }

    /// Load a byte slice from memory
    pub fn load_slice(&self, offset: usize, size: usize) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        let mut result = vec![0u8; size];
        let end = offset.saturating_add(size).min(self.data.len());
        if offset < end {
            result[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        result
    }

    /// Store a byte slice to memory
    pub fn store_slice(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.expand(offset, data.len());
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Write `size` bytes of `src` starting at `src_offset`, zero-padding
    /// whatever lies past the end of `src`
    pub fn store_padded(&mut self, offset: usize, src: &[u8], src_offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        self.expand(offset, size);
        let dest = &mut self.data[offset..offset + size];
        let available = src.len().saturating_sub(src_offset).min(size);
        if available > 0 {
            dest[..available].copy_from_slice(&src[src_offset..src_offset + available]);
        }
        dest[available..].fill(0);
    }

    /// Get raw data slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_expand() {
        let mut mem = Memory::new();
        assert_eq!(mem.size(), 0);

        mem.expand(0, 32);
        assert_eq!(mem.size(), 32);

        // Aligned to 32 bytes
        mem.expand(0, 65);
        assert_eq!(mem.size(), 96);

        // Never shrinks
        mem.expand(0, 1);
        assert_eq!(mem.size(), 96);
    }

    #[test]
    fn test_zero_size_does_not_expand() {
        let mut mem = Memory::new();
        mem.expand(1_000_000, 0);
        assert_eq!(mem.size(), 0);
    }

    #[test]
    fn test_memory_store_load() {
        let mut mem = Memory::new();
        let value = U256::from(0x1234567890ABCDEFu64);
        mem.store(0, value);
        assert_eq!(mem.load(0), value);
        assert_eq!(mem.data()[31], 0xEF);
    }

    #[test]
    fn test_memory_store8() {
        let mut mem = Memory::new();
        mem.store8(33, 0x42);
        assert_eq!(mem.size(), 64);
        assert_eq!(mem.data()[33], 0x42);
    }

    #[test]
    fn test_memory_load_uninitialized() {
        let mem = Memory::new();
        assert_eq!(mem.load(0), U256::zero());
    }

    #[test]
    fn test_memory_load_slice() {
        let mut mem = Memory::new();
        mem.store_slice(0, &[1, 2, 3, 4, 5]);
        assert_eq!(mem.load_slice(0, 5), vec![1, 2, 3, 4, 5]);
        // Load beyond data returns zeros
        assert_eq!(mem.load_slice(30, 4), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_store_padded() {
        let mut mem = Memory::new();
        mem.store_slice(0, &[0xff; 8]);
        mem.store_padded(0, &[1, 2, 3], 1, 6);
        assert_eq!(mem.load_slice(0, 8), vec![2, 3, 0, 0, 0, 0, 0xff, 0xff]);
    }

    #[test]
    fn test_store_padded_offset_past_source() {
        let mut mem = Memory::new();
        mem.store_padded(0, &[1, 2, 3], usize::MAX, 4);
        assert_eq!(mem.load_slice(0, 4), vec![0, 0, 0, 0]);
    }
}
