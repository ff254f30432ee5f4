//! Configuration for riakwire
//!
//! Centralized client configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, RiakError};

/// Main configuration for a riakwire client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Cluster node host name or IP
    pub host: String,

    /// Protocol buffers port of the node
    pub port: u16,

    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Hard ceiling on simultaneously checked-out connections
    pub max_transports: usize,

    /// What `acquire` does once `max_transports` connections are out
    pub exhaustion_policy: ExhaustionPolicy,

    /// Connect timeout (milliseconds, 0 = none)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// How long `quit` waits for in-flight operations before force-closing
    pub shutdown_grace: Duration,

    // -------------------------------------------------------------------------
    // Retry Configuration
    // -------------------------------------------------------------------------
    /// Retry ceiling for idempotent operations
    pub max_retries: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,

    // -------------------------------------------------------------------------
    // Batch Configuration
    // -------------------------------------------------------------------------
    /// Default chunk size for parallel bucket purges
    pub purge_chunk_size: usize,
}

/// Pool behavior when every transport is checked out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Fail immediately with `PoolExhausted` (default)
    FailFast,

    /// Wait up to `timeout` for a release, then fail with `PoolExhausted`
    Block { timeout: Duration },
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8087,
            max_transports: 16,
            exhaustion_policy: ExhaustionPolicy::FailFast,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            shutdown_grace: Duration::from_secs(5),
            max_retries: 10,
            retry_delay: Duration::from_secs(2),
            purge_chunk_size: 5,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` of the node
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject configurations the pool cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_transports == 0 {
            return Err(RiakError::Config("max_transports must be at least 1".to_string()));
        }
        if self.host.is_empty() {
            return Err(RiakError::Config("host must not be empty".to_string()));
        }
        if self.purge_chunk_size == 0 {
            return Err(RiakError::Config("purge_chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: ClientConfig,
}

impl ConfigBuilder {
    /// Set the node host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the node port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the transport ceiling
    pub fn max_transports(mut self, count: usize) -> Self {
        self.config.max_transports = count;
        self
    }

    /// Set the pool exhaustion policy
    pub fn exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.config.exhaustion_policy = policy;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Set the retry ceiling for idempotent operations
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the fixed delay between retries
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the default purge chunk size
    pub fn purge_chunk_size(mut self, size: usize) -> Self {
        self.config.purge_chunk_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
