//! Protocol Module
//!
//! Defines the wire protocol between the client and a cluster node.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Code (1) │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Message Codes
//! - 0:      ErrorResp
//! - 1 / 2:  Ping
//! - 7 / 8:  GetServerInfo
//! - 9 / 10: Get
//! - 11 / 12: Put
//! - 13 / 14: Delete
//! - 17 / 18: ListKeys (streamed until `done`)
//! - 19 / 20: GetBucket
//! - 21 / 22: SetBucket
//! - 25 / 26: Index
//! - 29 / 30: ResetBucket
//! - 80 / 81: DtFetch
//! - 82 / 83: DtUpdate
//!
//! Exactly one request is in flight per connection.

mod codec;
mod message;
mod request;
mod response;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, frame, read_frame,
    read_request, read_response, split_frame, write_request, write_response, HEADER_SIZE,
    LENGTH_SIZE, MAX_FRAME_SIZE,
};
pub use message::{BucketProps, Content, IndexRange, MessageCode, PropValue};
pub use request::{
    BucketReq, DelReq, DtFetchReq, DtUpdateReq, GetReq, IndexReq, PutReq, Request, SetBucketReq,
};
pub use response::{
    DtFetchResp, DtUpdateResp, ErrorResp, GetBucketResp, GetResp, IndexResp, ListKeysResp,
    PutResp, Response, ServerInfoResp,
};
