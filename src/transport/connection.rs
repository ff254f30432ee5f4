//! Node Connection
//!
//! One TCP channel to a cluster node. Requests and responses are strictly
//! paired: a request is written, then its full reply is read before the
//! connection can carry anything else.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Result, RiakError};
use crate::protocol::{read_response, write_request, Request, Response};

/// A single connection to a node
pub struct Connection {
    /// Pool-assigned id, used for logging and force-close bookkeeping
    id: u64,

    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Open a connection to the configured endpoint
    ///
    /// Tries every resolved address in turn and applies the configured timeouts.
    pub fn connect(config: &ClientConfig, id: u64) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| RiakError::Config(format!("cannot resolve {}: {}", config.endpoint(), e)))?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            let attempt = if config.connect_timeout_ms > 0 {
                TcpStream::connect_timeout(&addr, Duration::from_millis(config.connect_timeout_ms))
            } else {
                TcpStream::connect(addr)
            };
            match attempt {
                Ok(stream) => return Self::from_stream(stream, config, id),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => RiakError::Transient(e),
            None => RiakError::Config(format!("{} resolved to no addresses", config.endpoint())),
        })
    }

    fn from_stream(stream: TcpStream, config: &ClientConfig, id: u64) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let read_stream = stream.try_clone()?;

        tracing::debug!("Connection {} established to {}", id, peer_addr);

        Ok(Self {
            id,
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
        })
    }

    /// A second handle on the socket that can shut it down from another thread
    pub fn shutdown_handle(&self) -> Result<TcpStream> {
        Ok(self.writer.get_ref().try_clone()?)
    }

    /// Send one request and read its single-frame reply
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        tracing::trace!("Connection {} sending {:?}", self.id, request.message_code());
        write_request(&mut self.writer, request)?;
        let response = read_response(&mut self.reader)?;
        check_response(request, response)
    }

    /// Send one request and feed every reply frame to `on_frame` until the
    /// node marks the stream done
    pub fn call_streaming<F>(&mut self, request: &Request, mut on_frame: F) -> Result<()>
    where
        F: FnMut(Response) -> Result<()>,
    {
        tracing::trace!("Connection {} streaming {:?}", self.id, request.message_code());
        write_request(&mut self.writer, request)?;
        loop {
            let response = check_response(request, read_response(&mut self.reader)?)?;
            let done = response.is_done();
            on_frame(response)?;
            if done {
                return Ok(());
            }
        }
    }

    /// Get the pool-assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Turn error replies into `Server` errors and reject mismatched codes
fn check_response(request: &Request, response: Response) -> Result<Response> {
    if let Response::Error(err) = response {
        return Err(RiakError::Server {
            code: err.errcode,
            message: err.errmsg,
        });
    }
    if response.message_code() != request.expected_response() {
        return Err(RiakError::malformed(format!(
            "expected {:?} in reply to {:?}, got {:?}",
            request.expected_response(),
            request.message_code(),
            response.message_code()
        )));
    }
    Ok(response)
}
