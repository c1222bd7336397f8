//! Hardfork instruction sets
//!
//! Each fork is the baseline table plus the EIPs of every fork up to and
//! including it, applied in activation order.

use crate::eips::{self, Activator};
use crate::error::EvmError;
use crate::table::JumpTable;
use std::fmt;
use std::str::FromStr;

static ISTANBUL: &[(u32, Activator)] = &[
    (1344, eips::enable_1344),
    (1884, eips::enable_1884),
    (2200, eips::enable_2200),
];
static BERLIN: &[(u32, Activator)] = &[(2929, eips::enable_2929)];
static LONDON: &[(u32, Activator)] = &[(3529, eips::enable_3529), (3198, eips::enable_3198)];
static SHANGHAI: &[(u32, Activator)] = &[(3855, eips::enable_3855)];
static CANCUN: &[(u32, Activator)] = &[(1153, eips::enable_1153)];

/// Supported hardforks, oldest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Hardfork {
    /// Baseline instruction set
    Petersburg,
    /// EIP-1344, EIP-1884, EIP-2200
    Istanbul,
    /// EIP-2929
    Berlin,
    /// EIP-3529, EIP-3198
    London,
    /// EIP-3855
    Shanghai,
    /// EIP-1153
    #[default]
    Cancun,
}

impl Hardfork {
    /// All forks in activation order
    pub const ALL: [Hardfork; 6] = [
        Hardfork::Petersburg,
        Hardfork::Istanbul,
        Hardfork::Berlin,
        Hardfork::London,
        Hardfork::Shanghai,
        Hardfork::Cancun,
    ];

    /// EIPs introduced by this fork alone
    pub fn eips(self) -> impl Iterator<Item = u32> {
        self.activators().iter().map(|(id, _)| *id)
    }

    /// Activators introduced by this fork alone
    pub fn activators(self) -> &'static [(u32, Activator)] {
        match self {
            Hardfork::Petersburg => &[],
            Hardfork::Istanbul => ISTANBUL,
            Hardfork::Berlin => BERLIN,
            Hardfork::London => LONDON,
            Hardfork::Shanghai => SHANGHAI,
            Hardfork::Cancun => CANCUN,
        }
    }

    /// Owned table for this fork, ready for further patching
    pub fn instruction_set(self) -> JumpTable {
        let mut table = JumpTable::baseline();
        for fork in Self::ALL.into_iter().take_while(|f| *f <= self) {
            for (_, enable) in fork.activators() {
                enable(&mut table);
            }
        }
        table
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Hardfork::Petersburg => "petersburg",
            Hardfork::Istanbul => "istanbul",
            Hardfork::Berlin => "berlin",
            Hardfork::London => "london",
            Hardfork::Shanghai => "shanghai",
            Hardfork::Cancun => "cancun",
        }
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hardfork {
    type Err = EvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| EvmError::UnknownHardfork(s.to_string()))
    }
}
