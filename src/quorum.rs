//! Quorum parameters and their resolution
//!
//! Every quorum-bearing operation resolves its six consistency knobs
//! (R, W, DW, RW, PR, PW) independently:
//!
//! ```text
//!   call-site value ──► bucket override ──► client default
//!        (Some?)            (Some?)          (always set)
//! ```
//!
//! The client tier starts out as [`Quorum::Default`], which lets the node
//! apply its own bucket-type defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiakError};

/// A single consistency value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quorum {
    /// Explicit replica count
    Count(u32),
    One,
    Quorum,
    All,
    /// Defer to the node's configured value
    Default,
}

impl Quorum {
    // Reserved values the node reads as symbolic quorums.
    const ONE: u32 = u32::MAX - 1;
    const QUORUM: u32 = u32::MAX - 2;
    const ALL: u32 = u32::MAX - 3;
    const DEFAULT: u32 = u32::MAX - 4;

    /// Encode for the wire
    pub fn to_wire(self) -> u32 {
        match self {
            Quorum::Count(n) => n,
            Quorum::One => Self::ONE,
            Quorum::Quorum => Self::QUORUM,
            Quorum::All => Self::ALL,
            Quorum::Default => Self::DEFAULT,
        }
    }

    /// Decode from the wire
    pub fn from_wire(value: u32) -> Self {
        match value {
            Self::ONE => Quorum::One,
            Self::QUORUM => Quorum::Quorum,
            Self::ALL => Quorum::All,
            Self::DEFAULT => Quorum::Default,
            n => Quorum::Count(n),
        }
    }
}

impl From<u32> for Quorum {
    fn from(n: u32) -> Self {
        Quorum::Count(n)
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quorum::Count(n) => write!(f, "{}", n),
            Quorum::One => write!(f, "one"),
            Quorum::Quorum => write!(f, "quorum"),
            Quorum::All => write!(f, "all"),
            Quorum::Default => write!(f, "default"),
        }
    }
}

impl FromStr for Quorum {
    type Err = RiakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "one" => Ok(Quorum::One),
            "quorum" => Ok(Quorum::Quorum),
            "all" => Ok(Quorum::All),
            "default" => Ok(Quorum::Default),
            other => other
                .parse::<u32>()
                .map(Quorum::Count)
                .map_err(|_| RiakError::Config(format!("invalid quorum value: {}", s))),
        }
    }
}

/// Names of the six consistency parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuorumParam {
    R,
    W,
    DW,
    RW,
    PR,
    PW,
}

impl QuorumParam {
    pub const ALL: [QuorumParam; 6] = [
        QuorumParam::R,
        QuorumParam::W,
        QuorumParam::DW,
        QuorumParam::RW,
        QuorumParam::PR,
        QuorumParam::PW,
    ];

    /// Bucket property name for this parameter
    pub fn name(self) -> &'static str {
        match self {
            QuorumParam::R => "r",
            QuorumParam::W => "w",
            QuorumParam::DW => "dw",
            QuorumParam::RW => "rw",
            QuorumParam::PR => "pr",
            QuorumParam::PW => "pw",
        }
    }
}

/// Optional per-parameter overrides (one tier of the fallback chain)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuorumSet {
    pub r: Option<Quorum>,
    pub w: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub rw: Option<Quorum>,
    pub pr: Option<Quorum>,
    pub pw: Option<Quorum>,
}

impl QuorumSet {
    pub fn get(&self, param: QuorumParam) -> Option<Quorum> {
        match param {
            QuorumParam::R => self.r,
            QuorumParam::W => self.w,
            QuorumParam::DW => self.dw,
            QuorumParam::RW => self.rw,
            QuorumParam::PR => self.pr,
            QuorumParam::PW => self.pw,
        }
    }

    pub fn set(&mut self, param: QuorumParam, value: Option<Quorum>) {
        let slot = match param {
            QuorumParam::R => &mut self.r,
            QuorumParam::W => &mut self.w,
            QuorumParam::DW => &mut self.dw,
            QuorumParam::RW => &mut self.rw,
            QuorumParam::PR => &mut self.pr,
            QuorumParam::PW => &mut self.pw,
        };
        *slot = value;
    }
}

/// Client-level defaults: the last tier, always populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumDefaults {
    values: [Quorum; 6],
}

impl Default for QuorumDefaults {
    fn default() -> Self {
        Self {
            values: [Quorum::Default; 6],
        }
    }
}

impl QuorumDefaults {
    pub fn get(&self, param: QuorumParam) -> Quorum {
        self.values[Self::slot(param)]
    }

    pub fn set(&mut self, param: QuorumParam, value: Quorum) {
        self.values[Self::slot(param)] = value;
    }

    fn slot(param: QuorumParam) -> usize {
        match param {
            QuorumParam::R => 0,
            QuorumParam::W => 1,
            QuorumParam::DW => 2,
            QuorumParam::RW => 3,
            QuorumParam::PR => 4,
            QuorumParam::PW => 5,
        }
    }
}

/// Resolve the effective value of one parameter.
///
/// Pure: no I/O, and each parameter resolves without looking at the others.
pub fn resolve(
    param: QuorumParam,
    call: Option<Quorum>,
    bucket: &QuorumSet,
    client: &QuorumDefaults,
) -> Quorum {
    call.or_else(|| bucket.get(param))
        .unwrap_or_else(|| client.get(param))
}
