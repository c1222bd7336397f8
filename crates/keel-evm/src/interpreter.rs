//! Reference interpreter loop

use crate::config::InterpreterConfig;
use crate::context::{Context, Environment};
use crate::contract::Contract;
use crate::error::{EvmError, EvmResult, ExecutionResult};
use crate::gas;
use crate::host::Host;
use crate::opcode::Opcode;
use crate::scope::Scope;
use crate::table::{JumpTable, Next};
use std::sync::Arc;

/// Drives frames against a frozen jump table
///
/// The table is shared: many interpreters may hold the same `Arc`.
#[derive(Clone, Debug)]
pub struct Interpreter {
    /// Frozen instruction set
    table: Arc<JumpTable>,
    /// Block and transaction environment
    env: Environment,
    /// Configuration the table was built from
    config: InterpreterConfig,
}

impl Interpreter {
    /// Create an interpreter over an already built table
    pub fn new(table: Arc<JumpTable>, env: Environment, config: InterpreterConfig) -> Self {
        Self { table, env, config }
    }

    /// Build the table described by `config` and wrap it
    pub fn from_config(env: Environment, config: InterpreterConfig) -> EvmResult<Self> {
        let table = config.build_table()?;
        Ok(Self::new(table, env, config))
    }

    /// Shared jump table
    pub fn table(&self) -> &Arc<JumpTable> {
        &self.table
    }

    /// Environment
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Configuration
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run a frame until it halts, returning its output
    ///
    /// Running off the end of the active section is an implicit STOP.
    pub fn execute(&self, scope: &mut Scope<'_>, host: &mut dyn Host) -> EvmResult<Vec<u8>> {
        let mut ctx = Context::new(&self.env, host, &self.config);
        let eof = scope.contract.is_eof();
        let mut pc = 0;

        loop {
            let code = scope.code()?;
            let Some(&byte) = code.get(pc) else {
                return Ok(Vec::new());
            };
            let op = &self.table[byte];
            let execute = op.execute.ok_or(EvmError::InvalidOpcode(byte))?;

            if eof && op.legacy_only {
                return Err(EvmError::LegacyOnlyOpcode(byte));
            }
            if !eof && op.eof_only {
                return Err(EvmError::InvalidOpcode(byte));
            }

            // Stack bounds
            if scope.stack.height() < usize::from(op.min_stack) {
                return Err(EvmError::StackUnderflow);
            }
            if scope.stack.len() > usize::from(op.max_stack) {
                return Err(EvmError::StackOverflow);
            }

            scope.use_gas(op.constant_gas)?;
            if let Some(dynamic_gas) = op.dynamic_gas {
                let cost = dynamic_gas(&mut ctx, scope)?;
                scope.use_gas(cost)?;
            }

            tracing::trace!(
                "pc={} section={} op={} gas={} stack={}",
                pc,
                scope.section,
                Opcode::from_byte(byte).map_or("UNKNOWN", Opcode::name),
                scope.gas,
                scope.stack.height()
            );

            match execute(pc, &mut ctx, scope)? {
                Next::Continue(next) => pc = next,
                Next::Stop => return Ok(Vec::new()),
                Next::Return(output) => return Ok(output),
            }
        }
    }

    /// Run `contract` with `gas` and settle the outcome
    ///
    /// REVERT keeps unused gas; any other fault consumes all of it. On success
    /// the host's refund counter is capped against the gas used.
    pub fn run(
        &self,
        contract: &Contract,
        gas: u64,
        read_only: bool,
        host: &mut dyn Host,
    ) -> ExecutionResult {
        let mut scope = Scope::new(contract, gas, read_only);
        match self.execute(&mut scope, host) {
            Ok(output) => {
                let gas_used = gas - scope.gas;
                let refund =
                    gas::capped_refund(gas_used, host.refund(), self.config.refund_quotient());
                ExecutionResult::success(gas_used, output).with_refund(refund)
            }
            Err(EvmError::Revert(output)) => ExecutionResult::revert(gas - scope.gas, output),
            Err(err) => {
                tracing::debug!("frame of {} aborted: {}", contract.address, err);
                ExecutionResult::failure(gas, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Container, SectionType};
    use crate::fork::Hardfork;
    use crate::host::MemoryHost;
    use keel_primitives::{Address, H256, U256};

    const ADDRESS: Address = Address::from_bytes([0xAA; 20]);

    fn contract(code: Vec<u8>) -> Contract {
        Contract::new(ADDRESS, Address::ZERO, U256::zero(), Vec::new(), code)
    }

    fn interpreter(fork: Hardfork) -> Interpreter {
        Interpreter::from_config(Environment::default(), InterpreterConfig::new(fork)).unwrap()
    }

    fn run(code: Vec<u8>, gas: u64) -> ExecutionResult {
        let mut host = MemoryHost::new();
        interpreter(Hardfork::Cancun).run(&contract(code), gas, false, &mut host)
    }

    // ==================== Halting Tests ====================

    #[test]
    fn test_stop() {
        let result = run(vec![0x00], 100);
        assert!(result.success);
        assert_eq!(result.gas_used, 0);
    }

    #[test]
    fn test_empty_code() {
        let result = run(Vec::new(), 100);
        assert!(result.success);
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_end_of_code_is_stop() {
        let result = run(vec![0x60, 0x01, 0x60, 0x02, 0x01], 100);
        assert!(result.success);
        assert_eq!(result.gas_used, 9);
    }

    #[test]
    fn test_return() {
        // PUSH1 0x42 PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let result = run(
            vec![0x60, 0x42, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3],
            1000,
        );
        assert!(result.success);
        assert_eq!(result.output.len(), 32);
        assert_eq!(result.output[31], 0x42);
    }

    #[test]
    fn test_revert_keeps_unused_gas() {
        // PUSH1 0 PUSH1 0 REVERT
        let result = run(vec![0x60, 0x00, 0x60, 0x00, 0xFD], 1000);
        assert!(!result.success);
        assert!(result.is_revert());
        assert_eq!(result.gas_used, 6);
    }

    #[test]
    fn test_fault_consumes_all_gas() {
        let result = run(vec![0x60, 0x01, 0xFE], 1000);
        assert!(!result.success);
        assert_eq!(result.gas_used, 1000);
        assert_eq!(result.error, Some(EvmError::InvalidOpcode(0xFE)));
    }

    // ==================== Refund Tests ====================

    fn clear_slot(fork: Hardfork, code: Vec<u8>) -> (ExecutionResult, MemoryHost) {
        let mut host = MemoryHost::new();
        host.insert_storage(ADDRESS, H256::ZERO, U256::one());
        let result = interpreter(fork).run(&contract(code), 100_000, false, &mut host);
        (result, host)
    }

    #[test]
    fn test_refund_capped_by_fork_quotient() {
        // PUSH1 0 PUSH1 0 SSTORE
        let code = vec![0x60, 0x00, 0x60, 0x00, 0x55];

        let (result, host) = clear_slot(Hardfork::London, code.clone());
        assert!(result.success);
        assert_eq!(host.refund(), 4800);
        assert_eq!(result.refund, result.gas_used / 5);

        let (result, host) = clear_slot(Hardfork::Berlin, code);
        assert_eq!(host.refund(), 15000);
        assert_eq!(result.refund, result.gas_used / 2);
    }

    #[test]
    fn test_no_refund_after_revert() {
        // PUSH1 0 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 REVERT
        let code = vec![0x60, 0x00, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xFD];
        let (result, host) = clear_slot(Hardfork::London, code);
        assert!(result.is_revert());
        assert_eq!(host.refund(), 4800);
        assert_eq!(result.refund, 0);
    }

    // ==================== Loop Check Tests ====================

    #[test]
    fn test_out_of_gas() {
        let result = run(vec![0x60, 0x01, 0x60, 0x02, 0x01], 5);
        assert_eq!(result.error, Some(EvmError::OutOfGas));
        assert_eq!(result.gas_used, 5);
    }

    #[test]
    fn test_stack_underflow_before_gas() {
        let mut host = MemoryHost::new();
        let contract = contract(vec![0x01]);
        let mut scope = Scope::new(&contract, 100, false);
        let err = interpreter(Hardfork::Cancun)
            .execute(&mut scope, &mut host)
            .unwrap_err();
        assert_eq!(err, EvmError::StackUnderflow);
        assert_eq!(scope.gas, 100);
    }

    #[test]
    fn test_stack_overflow() {
        // 1025 PUSH0
        let result = run(vec![0x5F; 1025], 10_000);
        assert_eq!(result.error, Some(EvmError::StackOverflow));
    }

    #[test]
    fn test_fork_gates_opcodes() {
        let mut host = MemoryHost::new();
        let push0 = contract(vec![0x5F]);
        let result = interpreter(Hardfork::London).run(&push0, 100, false, &mut host);
        assert_eq!(result.error, Some(EvmError::InvalidOpcode(0x5F)));
        let result = interpreter(Hardfork::Shanghai).run(&push0, 100, false, &mut host);
        assert!(result.success);
    }

    #[test]
    fn test_next_pc_adopted_verbatim() {
        // PUSH2 0x0005 JUMP STOP JUMPDEST PUSH1 1
        let result = run(vec![0x61, 0x00, 0x05, 0x56, 0x00, 0x5B, 0x60, 0x01], 100);
        assert!(result.success);
        assert_eq!(result.gas_used, 3 + 8 + 1 + 3);
    }

    #[test]
    fn test_sections_share_one_table() {
        let config = InterpreterConfig::default().with_eips([4200, 4750]);
        let table = config.build_table().unwrap();
        let a = Interpreter::new(Arc::clone(&table), Environment::default(), config.clone());
        let b = Interpreter::new(Arc::clone(&table), Environment::default(), config);
        assert!(Arc::ptr_eq(a.table(), b.table()));

        let container = Container::new(
            vec![SectionType::new(0, 0), SectionType::new(0, 0)],
            vec![0, 3],
            vec![3, 1],
        )
        .unwrap();
        let contract = contract(vec![0xE3, 0x00, 0x01, 0xE4])
            .with_container(container)
            .unwrap();
        let mut host = MemoryHost::new();
        let result = a.run(&contract, 100, false, &mut host);
        assert!(result.success);
        assert_eq!(result.gas_used, 16);
    }
}
