//! # riakwire
//!
//! A client-side transport for Riak-style, eventually consistent, replicated
//! key-value clusters:
//! - Bounded connection pool with fail-fast (or opt-in blocking) exhaustion
//! - Length-prefixed, type-tagged binary framing
//! - Per-call quorum resolution (call → bucket → client)
//! - Retry of idempotent reads; single attempt for writes
//! - Bucket properties, secondary indexes, convergent datatypes, batch purge
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Bucket / RiakObject facade                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Client                                  │
//! │        (quorum resolution, request building)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Retry Controller                             │
//! │      (fixed-delay retry for idempotent operations)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Pool     │─────────►│ Connection  │
//!   │ (bounded)   │          │ 1 in flight │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Codec     │
//!                           │ (framing)   │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod quorum;
pub mod retry;
pub mod content;
pub mod datatype;
pub mod client;
pub mod bucket;
pub mod object;
pub mod purge;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ProtocolErrorKind, Result, RiakError};
pub use config::{ClientConfig, ExhaustionPolicy};
pub use client::Client;
pub use bucket::Bucket;
pub use object::RiakObject;
pub use quorum::{Quorum, QuorumParam};
pub use purge::PurgeReport;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of riakwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
