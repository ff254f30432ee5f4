//! Message codes and payload types shared by requests and responses

use std::collections::BTreeMap;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::RiakError;

/// One-byte message type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    ErrorResp = 0,
    PingReq = 1,
    PingResp = 2,
    GetServerInfoReq = 7,
    GetServerInfoResp = 8,
    GetReq = 9,
    GetResp = 10,
    PutReq = 11,
    PutResp = 12,
    DelReq = 13,
    DelResp = 14,
    ListKeysReq = 17,
    ListKeysResp = 18,
    GetBucketReq = 19,
    GetBucketResp = 20,
    SetBucketReq = 21,
    SetBucketResp = 22,
    IndexReq = 25,
    IndexResp = 26,
    ResetBucketReq = 29,
    ResetBucketResp = 30,
    DtFetchReq = 80,
    DtFetchResp = 81,
    DtUpdateReq = 82,
    DtUpdateResp = 83,
}

impl MessageCode {
    /// True for codes a client sends
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageCode::PingReq
                | MessageCode::GetServerInfoReq
                | MessageCode::GetReq
                | MessageCode::PutReq
                | MessageCode::DelReq
                | MessageCode::ListKeysReq
                | MessageCode::GetBucketReq
                | MessageCode::SetBucketReq
                | MessageCode::IndexReq
                | MessageCode::ResetBucketReq
                | MessageCode::DtFetchReq
                | MessageCode::DtUpdateReq
        )
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = RiakError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        let message = match code {
            0 => MessageCode::ErrorResp,
            1 => MessageCode::PingReq,
            2 => MessageCode::PingResp,
            7 => MessageCode::GetServerInfoReq,
            8 => MessageCode::GetServerInfoResp,
            9 => MessageCode::GetReq,
            10 => MessageCode::GetResp,
            11 => MessageCode::PutReq,
            12 => MessageCode::PutResp,
            13 => MessageCode::DelReq,
            14 => MessageCode::DelResp,
            17 => MessageCode::ListKeysReq,
            18 => MessageCode::ListKeysResp,
            19 => MessageCode::GetBucketReq,
            20 => MessageCode::GetBucketResp,
            21 => MessageCode::SetBucketReq,
            22 => MessageCode::SetBucketResp,
            25 => MessageCode::IndexReq,
            26 => MessageCode::IndexResp,
            29 => MessageCode::ResetBucketReq,
            30 => MessageCode::ResetBucketResp,
            80 => MessageCode::DtFetchReq,
            81 => MessageCode::DtFetchResp,
            82 => MessageCode::DtUpdateReq,
            83 => MessageCode::DtUpdateResp,
            other => return Err(RiakError::unknown_message(other)),
        };
        Ok(message)
    }
}

/// One stored value (a sibling, when a key has several)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub value: Vec<u8>,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub content_encoding: Option<String>,
    pub vtag: Option<String>,
    pub last_mod: Option<u32>,
    pub usermeta: Vec<(String, String)>,
    pub indexes: Vec<(String, String)>,
    pub deleted: bool,
}

impl Content {
    pub fn new(value: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            content_type: Some(content_type.into()),
            ..Default::default()
        }
    }
}

/// A single bucket property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropValue {
    /// `true`, or any positive integer
    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Bool(b) => *b,
            PropValue::Int(n) => *n > 0,
            PropValue::Str(s) => s == "true",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

/// Bucket properties by name
pub type BucketProps = BTreeMap<String, PropValue>;

/// Secondary-index match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexRange {
    /// Exact match on a single value
    Eq(String),
    /// Inclusive range
    Range { start: String, end: String },
}
