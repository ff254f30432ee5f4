//! Transport Module
//!
//! Pooled TCP connections to a cluster node.
//!
//! ## Architecture
//! - One request in flight per connection (no multiplexing)
//! - The pool, not the connection, is the unit of concurrency
//! - Broken connections are discarded, never reused

mod connection;
mod pool;

pub use connection::Connection;
pub use pool::{CloseReport, ConnectionPool, PooledConnection};
