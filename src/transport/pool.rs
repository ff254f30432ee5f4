//! # Connection Pool
//!
//! Bounded set of node connections shared by every operation of a client.
//!
//! - At most `max_transports` connections are checked out at once.
//! - Connections are created lazily and reused after release.
//! - Exhaustion fails fast by default, or blocks with a timeout when
//!   configured with [`ExhaustionPolicy::Block`].
//! - A connection that saw an I/O or protocol failure is discarded on release,
//!   freeing its slot for a fresh connection.
//! - [`ConnectionPool::close`] drains in-flight operations, then force-closes
//!   whatever is still out.

use std::collections::{HashMap, VecDeque};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::{ClientConfig, ExhaustionPolicy};
use crate::error::{Result, RiakError};
use crate::protocol::{Request, Response};

use super::connection::Connection;

struct PoolState {
    idle: VecDeque<Connection>,
    checked_out: usize,
    closed: bool,
    next_id: u64,
    /// Socket handles of checked-out connections, for force-close
    active: HashMap<u64, TcpStream>,
}

struct PoolInner {
    config: ClientConfig,
    state: Mutex<PoolState>,
    released: Condvar,
}

/// Connection pool handle
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

/// Outcome of a pool close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// Operations that finished during the grace period
    pub drained: usize,
    /// Connections whose sockets were shut down under in-flight operations
    pub forced: usize,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_transports),
            checked_out: 0,
            closed: false,
            next_id: 0,
            active: HashMap::new(),
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                released: Condvar::new(),
            }),
        })
    }

    /// Acquires a connection from the pool.
    pub fn acquire(&self) -> Result<PooledConnection> {
        let (reused, id) = self.reserve()?;

        let conn = match reused {
            Some(conn) => conn,
            None => match Connection::connect(&self.inner.config, id) {
                Ok(conn) => conn,
                Err(err) => {
                    self.release_slot(id);
                    return Err(err);
                }
            },
        };

        match conn.shutdown_handle() {
            Ok(handle) => {
                let mut state = self.inner.state.lock();
                if state.closed {
                    drop(state);
                    self.release_slot(id);
                    return Err(RiakError::PoolClosed);
                }
                state.active.insert(id, handle);
            }
            Err(err) => {
                self.release_slot(id);
                return Err(err);
            }
        }

        Ok(PooledConnection {
            pool: self.inner.clone(),
            conn: Some(conn),
            broken: false,
        })
    }

    /// Returns a connection to the pool. Same as dropping it.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Claim a slot: returns an idle connection to reuse, or the id for a new one.
    fn reserve(&self) -> Result<(Option<Connection>, u64)> {
        let max = self.inner.config.max_transports;
        let mut state = self.inner.state.lock();
        let deadline = match self.inner.config.exhaustion_policy {
            ExhaustionPolicy::FailFast => None,
            ExhaustionPolicy::Block { timeout } => Some(Instant::now() + timeout),
        };

        loop {
            if state.closed {
                return Err(RiakError::PoolClosed);
            }
            if state.checked_out < max {
                break;
            }
            match deadline {
                None => {
                    tracing::debug!("Pool exhausted ({} of {} checked out)", state.checked_out, max);
                    return Err(RiakError::PoolExhausted { max });
                }
                Some(deadline) => {
                    if self.inner.released.wait_until(&mut state, deadline).timed_out()
                        && state.checked_out >= max
                    {
                        return Err(RiakError::PoolExhausted { max });
                    }
                }
            }
        }

        state.checked_out += 1;
        match state.idle.pop_front() {
            Some(conn) => {
                let id = conn.id();
                Ok((Some(conn), id))
            }
            None => {
                let id = state.next_id;
                state.next_id += 1;
                Ok((None, id))
            }
        }
    }

    fn release_slot(&self, id: u64) {
        let mut state = self.inner.state.lock();
        state.active.remove(&id);
        state.checked_out = state.checked_out.saturating_sub(1);
        self.inner.released.notify_all();
    }

    /// Close the pool.
    ///
    /// New acquires fail with `PoolClosed` immediately. Idle connections are
    /// dropped. In-flight operations get `grace` to finish. After that their
    /// sockets are shut down and they fail with `PoolClosed`.
    pub fn close(&self, grace: Duration) -> CloseReport {
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.idle.clear();

        let in_flight = state.checked_out;
        let deadline = Instant::now() + grace;
        while state.checked_out > 0 {
            if self.inner.released.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        let mut forced = 0;
        for (id, handle) in state.active.drain() {
            if let Err(e) = handle.shutdown(Shutdown::Both) {
                tracing::debug!("Shutdown of connection {} failed: {}", id, e);
            }
            forced += 1;
        }
        if forced > 0 {
            tracing::warn!("Pool closed with {} operations still in flight", forced);
        }
        self.inner.released.notify_all();

        CloseReport {
            drained: in_flight - forced.min(in_flight),
            forced,
        }
    }

    /// Number of connections currently checked out
    pub fn checked_out(&self) -> usize {
        self.inner.state.lock().checked_out
    }

    /// Number of idle connections ready for reuse
    pub fn idle(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    pub fn max_transports(&self) -> usize {
        self.inner.config.max_transports
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    broken: bool,
}

impl PooledConnection {
    /// Executes a request and returns the single reply.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        let conn = self.conn.as_mut().ok_or(RiakError::PoolClosed)?;
        let result = conn.call(request);
        self.settle(result)
    }

    /// Executes a request whose reply is streamed over several frames.
    pub fn call_streaming<F>(&mut self, request: &Request, on_frame: F) -> Result<()>
    where
        F: FnMut(Response) -> Result<()>,
    {
        let conn = self.conn.as_mut().ok_or(RiakError::PoolClosed)?;
        let result = conn.call_streaming(request, on_frame);
        self.settle(result)
    }

    /// Prevent this connection from going back to the idle set
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn id(&self) -> Option<u64> {
        self.conn.as_ref().map(Connection::id)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.breaks_connection() {
                    // The stream position is unknown now; never reuse it.
                    self.broken = true;
                    if self.pool.state.lock().closed {
                        return Err(RiakError::PoolClosed);
                    }
                    if let Some(conn) = &self.conn {
                        tracing::debug!(
                            "Connection {} to {} broken: {}",
                            conn.id(),
                            conn.peer_addr(),
                            err
                        );
                    }
                }
                Err(err)
            }
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        let mut state = self.pool.state.lock();
        state.active.remove(&conn.id());
        state.checked_out = state.checked_out.saturating_sub(1);
        if !self.broken && !state.closed {
            state.idle.push_back(conn);
        }
        self.pool.released.notify_all();
    }
}
