//! Per-call options
//!
//! Quorum fields here are the *call-site* tier. Anything left `None` falls
//! back to the bucket override, then to the client default.

use crate::datatype::Datatype;
use crate::protocol::IndexRange;
use crate::quorum::Quorum;

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub r: Option<Quorum>,
    pub pr: Option<Quorum>,
    pub basic_quorum: Option<bool>,
    pub notfound_ok: Option<bool>,
    pub timeout: Option<u32>,
    /// Fetch metadata only
    pub head: bool,
}

impl GetOptions {
    pub fn r(mut self, r: impl Into<Quorum>) -> Self {
        self.r = Some(r.into());
        self
    }

    pub fn pr(mut self, pr: impl Into<Quorum>) -> Self {
        self.pr = Some(pr.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub w: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub pw: Option<Quorum>,
    pub return_body: bool,
    /// Fail instead of overwriting an existing key
    pub if_none_match: bool,
    pub timeout: Option<u32>,
}

impl PutOptions {
    pub fn w(mut self, w: impl Into<Quorum>) -> Self {
        self.w = Some(w.into());
        self
    }

    pub fn return_body(mut self) -> Self {
        self.return_body = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub rw: Option<Quorum>,
    pub r: Option<Quorum>,
    pub w: Option<Quorum>,
    pub pr: Option<Quorum>,
    pub pw: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub vclock: Option<Vec<u8>>,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub r: Option<Quorum>,
    pub pr: Option<Quorum>,
    pub basic_quorum: Option<bool>,
    pub notfound_ok: Option<bool>,
    pub timeout: Option<u32>,
    /// Return the opaque context needed for removals from sets and maps
    pub include_context: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub w: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub pw: Option<Quorum>,
    pub return_body: bool,
    pub timeout: Option<u32>,
    pub include_context: Option<bool>,
    /// Context from a previous fetch
    pub context: Option<Vec<u8>>,
}

/// A secondary-index query
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub index: String,
    pub range: IndexRange,
    pub return_terms: bool,
    pub max_results: Option<u32>,
    pub continuation: Option<Vec<u8>>,
    pub timeout: Option<u32>,
}

impl IndexQuery {
    /// Exact match when `end` is `None`, inclusive range otherwise
    pub fn new(index: impl Into<String>, start: impl Into<String>, end: Option<String>) -> Self {
        let start = start.into();
        let range = match end {
            Some(end) => IndexRange::Range { start, end },
            None => IndexRange::Eq(start),
        };
        Self {
            index: index.into(),
            range,
            return_terms: false,
            max_results: None,
            continuation: None,
            timeout: None,
        }
    }

    pub fn return_terms(mut self, on: bool) -> Self {
        self.return_terms = on;
        self
    }

    pub fn max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn continuation(mut self, token: Vec<u8>) -> Self {
        self.continuation = Some(token);
        self
    }
}

/// One page of index results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    pub keys: Vec<String>,
    /// (term, key) pairs, filled when terms were requested
    pub terms: Vec<(String, String)>,
    /// Pass back in the next query to continue a paginated scan
    pub continuation: Option<Vec<u8>>,
}

/// Result of a datatype fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatatypeValue {
    pub value: Option<Datatype>,
    pub context: Option<Vec<u8>>,
}

/// Result of a datatype update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatatypeUpdate {
    /// Key assigned by the node when none was given
    pub key: Option<String>,
    pub value: Option<Datatype>,
    pub context: Option<Vec<u8>>,
}
