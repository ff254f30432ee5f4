//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Code (1) │      Payload (bincode)      │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! `Len` is big-endian and counts the code byte plus the payload. Messages
//! without a body (ping, delete ack, bucket set/reset acks) have an empty
//! payload.
//!
//! Both directions are available so that a node (or a test double) can be
//! built on the same codec.

use std::convert::TryFrom;
use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::message::MessageCode;
use super::request::Request;
use super::response::Response;
use crate::error::{Result, RiakError};

/// Length prefix size
pub const LENGTH_SIZE: usize = 4;

/// Header size: 4 bytes length + 1 byte message code
pub const HEADER_SIZE: usize = LENGTH_SIZE + 1;

/// Maximum frame length (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

/// Build a frame from a code and an already-encoded body.
///
/// Fails with `Malformed` when the frame would exceed `MAX_FRAME_SIZE`.
pub fn frame(code: MessageCode, body: &[u8]) -> Result<Bytes> {
    let frame_len = body.len() as u64 + 1;
    if frame_len > u64::from(MAX_FRAME_SIZE) {
        return Err(RiakError::malformed(format!(
            "{:?}: frame too large: {} bytes (max {})",
            code, frame_len, MAX_FRAME_SIZE
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u32(frame_len as u32);
    buf.put_u8(code as u8);
    buf.extend_from_slice(body);
    Ok(buf.freeze())
}

/// Validate a raw frame and split it into (code, payload)
pub fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(RiakError::truncated());
    }

    let frame_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    validate_length(frame_len)?;

    let total_len = LENGTH_SIZE + frame_len as usize;
    if bytes.len() < total_len {
        return Err(RiakError::truncated());
    }
    if bytes.len() > total_len {
        return Err(RiakError::malformed(format!(
            "{} trailing bytes after frame",
            bytes.len() - total_len
        )));
    }

    Ok((bytes[LENGTH_SIZE], &bytes[HEADER_SIZE..total_len]))
}

fn validate_length(frame_len: u32) -> Result<()> {
    if frame_len == 0 {
        return Err(RiakError::malformed("zero-length frame has no message code"));
    }
    if frame_len > MAX_FRAME_SIZE {
        return Err(RiakError::malformed(format!(
            "frame too large: {} bytes (max {})",
            frame_len, MAX_FRAME_SIZE
        )));
    }
    Ok(())
}

fn body<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn parse<T: DeserializeOwned>(code: MessageCode, payload: &[u8]) -> Result<T> {
    bincode::deserialize(payload)
        .map_err(|e| RiakError::malformed(format!("{:?} payload: {}", code, e)))
}

fn expect_empty(code: MessageCode, payload: &[u8]) -> Result<()> {
    if !payload.is_empty() {
        return Err(RiakError::malformed(format!(
            "{:?}: unexpected payload of {} bytes",
            code,
            payload.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to a frame
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let payload = match request {
        Request::Ping | Request::ServerInfo => Vec::new(),
        Request::Get(req) => body(req)?,
        Request::Put(req) => body(req)?,
        Request::Delete(req) => body(req)?,
        Request::ListKeys(req) | Request::GetBucket(req) | Request::ResetBucket(req) => body(req)?,
        Request::SetBucket(req) => body(req)?,
        Request::Index(req) => body(req)?,
        Request::DtFetch(req) => body(req)?,
        Request::DtUpdate(req) => body(req)?,
    };
    frame(request.message_code(), &payload)
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (raw_code, payload) = split_frame(bytes)?;
    let code = MessageCode::try_from(raw_code)?;

    let request = match code {
        MessageCode::PingReq => {
            expect_empty(code, payload)?;
            Request::Ping
        }
        MessageCode::GetServerInfoReq => {
            expect_empty(code, payload)?;
            Request::ServerInfo
        }
        MessageCode::GetReq => Request::Get(parse(code, payload)?),
        MessageCode::PutReq => Request::Put(parse(code, payload)?),
        MessageCode::DelReq => Request::Delete(parse(code, payload)?),
        MessageCode::ListKeysReq => Request::ListKeys(parse(code, payload)?),
        MessageCode::GetBucketReq => Request::GetBucket(parse(code, payload)?),
        MessageCode::SetBucketReq => Request::SetBucket(parse(code, payload)?),
        MessageCode::ResetBucketReq => Request::ResetBucket(parse(code, payload)?),
        MessageCode::IndexReq => Request::Index(parse(code, payload)?),
        MessageCode::DtFetchReq => Request::DtFetch(parse(code, payload)?),
        MessageCode::DtUpdateReq => Request::DtUpdate(parse(code, payload)?),
        other => {
            return Err(RiakError::malformed(format!(
                "{:?} is a response code, expected a request",
                other
            )))
        }
    };
    Ok(request)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to a frame
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let payload = match response {
        Response::Pong | Response::Deleted | Response::SetBucket | Response::ResetBucket => {
            Vec::new()
        }
        Response::Error(resp) => body(resp)?,
        Response::ServerInfo(resp) => body(resp)?,
        Response::Get(resp) => body(resp)?,
        Response::Put(resp) => body(resp)?,
        Response::ListKeys(resp) => body(resp)?,
        Response::GetBucket(resp) => body(resp)?,
        Response::Index(resp) => body(resp)?,
        Response::DtFetch(resp) => body(resp)?,
        Response::DtUpdate(resp) => body(resp)?,
    };
    frame(response.message_code(), &payload)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (raw_code, payload) = split_frame(bytes)?;
    let code = MessageCode::try_from(raw_code)?;

    let response = match code {
        MessageCode::ErrorResp => Response::Error(parse(code, payload)?),
        MessageCode::PingResp => {
            expect_empty(code, payload)?;
            Response::Pong
        }
        MessageCode::GetServerInfoResp => Response::ServerInfo(parse(code, payload)?),
        MessageCode::GetResp => Response::Get(parse(code, payload)?),
        MessageCode::PutResp => Response::Put(parse(code, payload)?),
        MessageCode::DelResp => {
            expect_empty(code, payload)?;
            Response::Deleted
        }
        MessageCode::ListKeysResp => Response::ListKeys(parse(code, payload)?),
        MessageCode::GetBucketResp => Response::GetBucket(parse(code, payload)?),
        MessageCode::SetBucketResp => {
            expect_empty(code, payload)?;
            Response::SetBucket
        }
        MessageCode::ResetBucketResp => {
            expect_empty(code, payload)?;
            Response::ResetBucket
        }
        MessageCode::IndexResp => Response::Index(parse(code, payload)?),
        MessageCode::DtFetchResp => Response::DtFetch(parse(code, payload)?),
        MessageCode::DtUpdateResp => Response::DtUpdate(parse(code, payload)?),
        other => {
            return Err(RiakError::malformed(format!(
                "{:?} is a request code, expected a response",
                other
            )))
        }
    };
    Ok(response)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one raw frame (header + payload) from a stream.
///
/// A clean EOF before the first byte is a closed connection and surfaces as
/// an I/O error. EOF anywhere inside the frame is `Truncated`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; LENGTH_SIZE];
    match read_full(reader, &mut header)? {
        0 => {
            return Err(RiakError::Transient(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )))
        }
        n if n < LENGTH_SIZE => return Err(RiakError::truncated()),
        _ => {}
    }

    let frame_len = u32::from_be_bytes(header);
    validate_length(frame_len)?;

    let mut frame = vec![0u8; LENGTH_SIZE + frame_len as usize];
    frame[..LENGTH_SIZE].copy_from_slice(&header);
    if read_full(reader, &mut frame[LENGTH_SIZE..])? < frame_len as usize {
        return Err(RiakError::truncated());
    }
    Ok(frame)
}

/// Fill `buf` as far as the stream allows; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    decode_request(&read_frame(reader)?)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
