//! Interpreter configuration

use crate::error::EvmResult;
use crate::fork::Hardfork;
use crate::gas::{REFUND_QUOTIENT, REFUND_QUOTIENT_EIP3529};
use crate::table::JumpTable;
use std::sync::Arc;

/// How relative jump targets are checked at run time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JumpTargetCheck {
    /// Reject targets outside the active section
    #[default]
    Verify,
    /// Code was validated on deployment; only negative targets are rejected
    TrustValidation,
}

/// Interpreter configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InterpreterConfig {
    /// Instruction set to start from
    pub fork: Hardfork,
    /// EIPs applied on top of the fork, in order
    pub extra_eips: Vec<u32>,
    /// Relative jump target checking
    pub jump_targets: JumpTargetCheck,
}

impl InterpreterConfig {
    /// Configuration for `fork` with no extra EIPs
    pub fn new(fork: Hardfork) -> Self {
        Self {
            fork,
            ..Default::default()
        }
    }

    /// Add extra EIPs
    pub fn with_eips(mut self, eips: impl IntoIterator<Item = u32>) -> Self {
        self.extra_eips.extend(eips);
        self
    }

    /// Set jump target checking
    pub fn with_jump_targets(mut self, check: JumpTargetCheck) -> Self {
        self.jump_targets = check;
        self
    }

    /// Divisor capping the refund against gas used (EIP-3529 from London)
    pub fn refund_quotient(&self) -> u64 {
        if self.fork >= Hardfork::London || self.extra_eips.contains(&3529) {
            REFUND_QUOTIENT_EIP3529
        } else {
            REFUND_QUOTIENT
        }
    }

    /// Build and freeze the configured jump table
    pub fn build_table(&self) -> EvmResult<Arc<JumpTable>> {
        let table = self.fork.instruction_set().with_eips(&self.extra_eips)?;
        tracing::debug!(
            "built jump table for {} with {} extra eips",
            self.fork,
            self.extra_eips.len()
        );
        Ok(table.freeze())
    }
}
