//! Request definitions
//!
//! Messages a client sends to a node. Quorum fields carry the already-resolved
//! wire value (`None` omits the field).

use serde::{Deserialize, Serialize};

use super::message::{BucketProps, Content, IndexRange, MessageCode};
use crate::datatype::DtOp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetReq {
    pub bucket_type: String,
    pub bucket: String,
    pub key: String,
    pub r: Option<u32>,
    pub pr: Option<u32>,
    pub basic_quorum: Option<bool>,
    pub notfound_ok: Option<bool>,
    pub if_modified: Option<Vec<u8>>,
    /// Return metadata only
    pub head: bool,
    pub deleted_vclock: bool,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutReq {
    pub bucket_type: String,
    pub bucket: String,
    /// `None` lets the node assign a key
    pub key: Option<String>,
    pub vclock: Option<Vec<u8>>,
    pub content: Content,
    pub w: Option<u32>,
    pub dw: Option<u32>,
    pub pw: Option<u32>,
    pub return_body: bool,
    pub return_head: bool,
    pub if_not_modified: bool,
    pub if_none_match: bool,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelReq {
    pub bucket_type: String,
    pub bucket: String,
    pub key: String,
    pub vclock: Option<Vec<u8>>,
    pub rw: Option<u32>,
    pub r: Option<u32>,
    pub w: Option<u32>,
    pub pr: Option<u32>,
    pub pw: Option<u32>,
    pub dw: Option<u32>,
    pub timeout: Option<u32>,
}

/// Identifies a bucket for list-keys, get/reset bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketReq {
    pub bucket_type: String,
    pub bucket: String,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetBucketReq {
    pub bucket_type: String,
    pub bucket: String,
    pub props: BucketProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReq {
    pub bucket_type: String,
    pub bucket: String,
    pub index: String,
    pub range: IndexRange,
    pub return_terms: bool,
    pub max_results: Option<u32>,
    pub continuation: Option<Vec<u8>>,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DtFetchReq {
    pub bucket_type: String,
    pub bucket: String,
    pub key: String,
    pub r: Option<u32>,
    pub pr: Option<u32>,
    pub basic_quorum: Option<bool>,
    pub notfound_ok: Option<bool>,
    pub timeout: Option<u32>,
    pub include_context: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtUpdateReq {
    pub bucket_type: String,
    pub bucket: String,
    pub key: Option<String>,
    pub context: Option<Vec<u8>>,
    pub op: DtOp,
    pub w: Option<u32>,
    pub dw: Option<u32>,
    pub pw: Option<u32>,
    pub return_body: bool,
    pub timeout: Option<u32>,
    pub include_context: Option<bool>,
}

/// A request to a node
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    ServerInfo,
    Get(GetReq),
    Put(PutReq),
    Delete(DelReq),
    ListKeys(BucketReq),
    GetBucket(BucketReq),
    SetBucket(SetBucketReq),
    ResetBucket(BucketReq),
    Index(IndexReq),
    DtFetch(DtFetchReq),
    DtUpdate(DtUpdateReq),
}

impl Request {
    /// Get the message code
    pub fn message_code(&self) -> MessageCode {
        match self {
            Request::Ping => MessageCode::PingReq,
            Request::ServerInfo => MessageCode::GetServerInfoReq,
            Request::Get(_) => MessageCode::GetReq,
            Request::Put(_) => MessageCode::PutReq,
            Request::Delete(_) => MessageCode::DelReq,
            Request::ListKeys(_) => MessageCode::ListKeysReq,
            Request::GetBucket(_) => MessageCode::GetBucketReq,
            Request::SetBucket(_) => MessageCode::SetBucketReq,
            Request::ResetBucket(_) => MessageCode::ResetBucketReq,
            Request::Index(_) => MessageCode::IndexReq,
            Request::DtFetch(_) => MessageCode::DtFetchReq,
            Request::DtUpdate(_) => MessageCode::DtUpdateReq,
        }
    }

    /// Response code a well-behaved node answers with
    pub fn expected_response(&self) -> MessageCode {
        match self {
            Request::Ping => MessageCode::PingResp,
            Request::ServerInfo => MessageCode::GetServerInfoResp,
            Request::Get(_) => MessageCode::GetResp,
            Request::Put(_) => MessageCode::PutResp,
            Request::Delete(_) => MessageCode::DelResp,
            Request::ListKeys(_) => MessageCode::ListKeysResp,
            Request::GetBucket(_) => MessageCode::GetBucketResp,
            Request::SetBucket(_) => MessageCode::SetBucketResp,
            Request::ResetBucket(_) => MessageCode::ResetBucketResp,
            Request::Index(_) => MessageCode::IndexResp,
            Request::DtFetch(_) => MessageCode::DtFetchResp,
            Request::DtUpdate(_) => MessageCode::DtUpdateResp,
        }
    }

    /// Whether the node answers with a sequence of frames ending in `done`
    pub fn is_streaming(&self) -> bool {
        matches!(self, Request::ListKeys(_) | Request::Index(_))
    }
}
