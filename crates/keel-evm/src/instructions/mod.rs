//! Opcode executors
//!
//! Every executor has the [`ExecuteFn`](crate::table::ExecuteFn) shape: it
//! receives the pc of its own opcode and returns the next pc. Gas, stack
//! bounds and opcode validity were already checked by the loop.

pub mod arithmetic;
pub mod bitwise;
pub mod control;
pub mod environment;
pub mod host;
pub mod memory;
pub mod stack;
pub mod system;

use crate::error::{EvmError, EvmResult};
use crate::stack::u256_to_usize;
use keel_primitives::U256;

/// Convert a memory operand pair to `(offset, size)`, None for empty ranges
///
/// Dynamic gas has already priced the range, so values that do not fit a
/// `usize` only reach here for zero sizes.
pub fn memory_range(offset: U256, size: U256) -> EvmResult<Option<(usize, usize)>> {
    if size.is_zero() {
        return Ok(None);
    }
    let offset = u256_to_usize(offset).ok_or(EvmError::InvalidMemoryAccess)?;
    let size = u256_to_usize(size).ok_or(EvmError::InvalidMemoryAccess)?;
    Ok(Some((offset, size)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::InterpreterConfig;
    use crate::context::Environment;
    use crate::contract::{Container, Contract, SectionType};
    use crate::error::EvmResult;
    use crate::host::MemoryHost;
    use crate::interpreter::Interpreter;
    use crate::scope::Scope;
    use keel_primitives::{Address, U256};

    pub(crate) const GAS: u64 = 1_000_000;
    pub(crate) const ADDRESS: Address = Address::from_bytes([0xAA; 20]);
    pub(crate) const CALLER: Address = Address::from_bytes([0xCC; 20]);

    /// Frame state after execution
    pub(crate) struct Outcome {
        pub stack: Vec<U256>,
        pub result: EvmResult<Vec<u8>>,
        pub gas_used: u64,
        pub memory: Vec<u8>,
        pub host: MemoryHost,
    }

    impl Outcome {
        pub(crate) fn top(&self) -> U256 {
            *self.stack.last().expect("empty stack")
        }
    }

    pub(crate) fn contract(code: &[u8]) -> Contract {
        Contract::new(ADDRESS, CALLER, U256::zero(), Vec::new(), code.to_vec())
    }

    /// Sectioned contract from `(inputs, outputs, code)` triples
    pub(crate) fn sectioned(sections: &[(u8, u8, &[u8])]) -> Contract {
        let mut code = Vec::new();
        let mut types = Vec::new();
        let mut offsets = Vec::new();
        let mut sizes = Vec::new();
        for (inputs, outputs, section) in sections {
            types.push(SectionType::new(*inputs, *outputs));
            offsets.push(code.len());
            sizes.push(section.len());
            code.extend_from_slice(section);
        }
        let container = Container::new(types, offsets, sizes).expect("valid container");
        contract(&code)
            .with_container(container)
            .expect("sections inside code")
    }

    /// Run sectioned code with relative jumps and section calls enabled
    pub(crate) fn run_sectioned(sections: &[(u8, u8, &[u8])]) -> Outcome {
        run_contract(
            InterpreterConfig::default().with_eips([4200, 4750]),
            &sectioned(sections),
            MemoryHost::new(),
            Environment::default(),
            false,
        )
    }

    pub(crate) fn run(code: &[u8]) -> Outcome {
        run_with(code, MemoryHost::new(), Environment::default(), false)
    }

    pub(crate) fn run_with(
        code: &[u8],
        host: MemoryHost,
        env: Environment,
        read_only: bool,
    ) -> Outcome {
        run_contract(
            InterpreterConfig::default(),
            &contract(code),
            host,
            env,
            read_only,
        )
    }

    pub(crate) fn run_contract(
        config: InterpreterConfig,
        contract: &Contract,
        mut host: MemoryHost,
        env: Environment,
        read_only: bool,
    ) -> Outcome {
        let interpreter = Interpreter::from_config(env, config).expect("valid config");
        let mut scope = Scope::new(contract, GAS, read_only);
        let result = interpreter.execute(&mut scope, &mut host);
        Outcome {
            stack: scope.stack.data().to_vec(),
            result,
            gas_used: GAS - scope.gas,
            memory: scope.memory.data().to_vec(),
            host,
        }
    }
}
