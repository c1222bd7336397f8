//! Executing code and its section layout

use crate::bytecode::analyze_jump_dests;
use crate::error::{EvmError, EvmResult};
use keel_primitives::{Address, U256};
use std::collections::HashSet;
use std::ops::Range;

/// Input and output arity of a code section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionType {
    /// Items the section consumes from its caller
    pub inputs: u8,
    /// Items the section leaves for its caller
    pub outputs: u8,
}

impl SectionType {
    /// Create a section type
    pub const fn new(inputs: u8, outputs: u8) -> Self {
        Self { inputs, outputs }
    }
}

/// Section metadata of a sectioned (EOF) contract
///
/// Header parsing happens elsewhere; this only holds the decoded tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    types: Vec<SectionType>,
    code_offsets: Vec<usize>,
    code_sizes: Vec<usize>,
}

impl Container {
    /// Build from per-section tables, all indexed by section id
    pub fn new(
        types: Vec<SectionType>,
        code_offsets: Vec<usize>,
        code_sizes: Vec<usize>,
    ) -> EvmResult<Self> {
        if types.is_empty() {
            return Err(EvmError::InvalidContainer("no code sections"));
        }
        if types.len() != code_offsets.len() || types.len() != code_sizes.len() {
            return Err(EvmError::InvalidContainer("section table length mismatch"));
        }
        if code_offsets
            .iter()
            .zip(&code_sizes)
            .any(|(offset, size)| offset.checked_add(*size).is_none())
        {
            return Err(EvmError::InvalidContainer("section range overflows"));
        }
        Ok(Self {
            types,
            code_offsets,
            code_sizes,
        })
    }

    /// Number of code sections
    pub fn section_count(&self) -> usize {
        self.types.len()
    }

    /// Type of a section
    pub fn section_type(&self, id: usize) -> Option<SectionType> {
        self.types.get(id).copied()
    }

    /// Byte range of a section within the contract code
    pub fn section_range(&self, id: usize) -> Option<Range<usize>> {
        let offset = *self.code_offsets.get(id)?;
        let size = *self.code_sizes.get(id)?;
        Some(offset..offset + size)
    }
}

/// Code running in a frame plus its call inputs
#[derive(Clone, Debug)]
pub struct Contract {
    /// Address whose storage the code acts on
    pub address: Address,
    /// Caller address
    pub caller: Address,
    /// Call value in wei
    pub value: U256,
    /// Call data
    pub input: Vec<u8>,
    /// Full code
    pub code: Vec<u8>,
    container: Option<Container>,
    jump_dests: HashSet<usize>,
}

impl Contract {
    /// Legacy (unsectioned) contract
    pub fn new(
        address: Address,
        caller: Address,
        value: U256,
        input: Vec<u8>,
        code: Vec<u8>,
    ) -> Self {
        let jump_dests = analyze_jump_dests(&code);
        Self {
            address,
            caller,
            value,
            input,
            code,
            container: None,
            jump_dests,
        }
    }

    /// Attach section metadata, making this a sectioned contract
    pub fn with_container(mut self, container: Container) -> EvmResult<Self> {
        for id in 0..container.section_count() {
            match container.section_range(id) {
                Some(range) if range.end <= self.code.len() => {}
                _ => return Err(EvmError::InvalidContainer("section exceeds code")),
            }
        }
        self.container = Some(container);
        Ok(self)
    }

    /// Whether the code carries section metadata
    pub fn is_eof(&self) -> bool {
        self.container.is_some()
    }

    /// Section metadata, if any
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    /// Code of a section. Legacy code is a single section 0.
    pub fn section_code(&self, id: usize) -> EvmResult<&[u8]> {
        let range = match &self.container {
            Some(container) => container.section_range(id),
            None if id == 0 => Some(0..self.code.len()),
            None => None,
        };
        range
            .and_then(|r| self.code.get(r))
            .ok_or_else(|| EvmError::InvalidSection(i32::try_from(id).unwrap_or(i32::MAX)))
    }

    /// Type of a section (None for legacy code)
    pub fn section_type(&self, id: usize) -> Option<SectionType> {
        self.container.as_ref()?.section_type(id)
    }

    /// Whether `pc` is a JUMPDEST outside PUSH data
    pub fn is_jump_dest(&self, pc: usize) -> bool {
        self.jump_dests.contains(&pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(code: Vec<u8>) -> Contract {
        Contract::new(Address::ZERO, Address::ZERO, U256::zero(), Vec::new(), code)
    }

    #[test]
    fn test_legacy_single_section() {
        let contract = legacy(vec![0x60, 0x01, 0x00]);
        assert!(!contract.is_eof());
        assert_eq!(contract.section_code(0).unwrap(), &[0x60, 0x01, 0x00]);
        assert_eq!(contract.section_code(1), Err(EvmError::InvalidSection(1)));
        assert_eq!(contract.section_type(0), None);
    }

    #[test]
    fn test_sectioned_contract() {
        let container = Container::new(
            vec![SectionType::new(0, 0), SectionType::new(2, 1)],
            vec![0, 3],
            vec![3, 2],
        )
        .unwrap();
        let contract = legacy(vec![0xE3, 0x00, 0x01, 0x01, 0xE4])
            .with_container(container)
            .unwrap();

        assert!(contract.is_eof());
        assert_eq!(contract.section_code(0).unwrap(), &[0xE3, 0x00, 0x01]);
        assert_eq!(contract.section_code(1).unwrap(), &[0x01, 0xE4]);
        assert_eq!(contract.section_type(1), Some(SectionType::new(2, 1)));
        assert!(contract.section_code(2).is_err());
    }

    #[test]
    fn test_container_rejects_bad_tables() {
        assert!(Container::new(vec![], vec![], vec![]).is_err());
        assert!(Container::new(vec![SectionType::default()], vec![0, 1], vec![1]).is_err());
        assert!(Container::new(vec![SectionType::default()], vec![usize::MAX], vec![1]).is_err());
    }

    #[test]
    fn test_container_must_fit_code() {
        let container = Container::new(vec![SectionType::default()], vec![0], vec![10]).unwrap();
        assert_eq!(
            legacy(vec![0x00]).with_container(container).unwrap_err(),
            EvmError::InvalidContainer("section exceeds code")
        );
    }

    #[test]
    fn test_jump_dests() {
        let contract = legacy(vec![0x5B, 0x60, 0x5B]);
        assert!(contract.is_jump_dest(0));
        assert!(!contract.is_jump_dest(2));
    }
}
