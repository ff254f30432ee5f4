//! Response definitions
//!
//! Messages a node sends back.

use serde::{Deserialize, Serialize};

use super::message::{BucketProps, Content, MessageCode};
use crate::datatype::Datatype;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResp {
    pub errmsg: String,
    pub errcode: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfoResp {
    pub node: Option<String>,
    pub server_version: Option<String>,
}

/// An empty `content` means not found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResp {
    pub content: Vec<Content>,
    pub vclock: Option<Vec<u8>>,
    pub unchanged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResp {
    pub content: Vec<Content>,
    pub vclock: Option<Vec<u8>>,
    /// Set when the node assigned the key
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListKeysResp {
    pub keys: Vec<String>,
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBucketResp {
    pub props: BucketProps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResp {
    pub keys: Vec<String>,
    /// (term, key) pairs when terms were requested
    pub results: Vec<(String, String)>,
    pub continuation: Option<Vec<u8>>,
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtFetchResp {
    pub context: Option<Vec<u8>>,
    /// `None` when the key holds no datatype yet
    pub value: Option<Datatype>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtUpdateResp {
    pub key: Option<String>,
    pub context: Option<Vec<u8>>,
    pub value: Option<Datatype>,
}

/// A response from a node
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Error(ErrorResp),
    Pong,
    ServerInfo(ServerInfoResp),
    Get(GetResp),
    Put(PutResp),
    Deleted,
    ListKeys(ListKeysResp),
    GetBucket(GetBucketResp),
    SetBucket,
    ResetBucket,
    Index(IndexResp),
    DtFetch(DtFetchResp),
    DtUpdate(DtUpdateResp),
}

impl Response {
    /// Create an error response
    pub fn error(code: u32, message: &str) -> Self {
        Response::Error(ErrorResp {
            errmsg: message.to_string(),
            errcode: code,
        })
    }

    /// Get the message code
    pub fn message_code(&self) -> MessageCode {
        match self {
            Response::Error(_) => MessageCode::ErrorResp,
            Response::Pong => MessageCode::PingResp,
            Response::ServerInfo(_) => MessageCode::GetServerInfoResp,
            Response::Get(_) => MessageCode::GetResp,
            Response::Put(_) => MessageCode::PutResp,
            Response::Deleted => MessageCode::DelResp,
            Response::ListKeys(_) => MessageCode::ListKeysResp,
            Response::GetBucket(_) => MessageCode::GetBucketResp,
            Response::SetBucket => MessageCode::SetBucketResp,
            Response::ResetBucket => MessageCode::ResetBucketResp,
            Response::Index(_) => MessageCode::IndexResp,
            Response::DtFetch(_) => MessageCode::DtFetchResp,
            Response::DtUpdate(_) => MessageCode::DtUpdateResp,
        }
    }

    /// Whether this is the last frame of a streamed reply
    pub fn is_done(&self) -> bool {
        match self {
            Response::ListKeys(resp) => resp.done,
            Response::Index(resp) => resp.done,
            _ => true,
        }
    }
}
