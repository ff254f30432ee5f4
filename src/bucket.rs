//! Bucket facade
//!
//! A bucket is identified by `(bucket_type, name)`. It carries per-bucket
//! quorum overrides and content codecs that sit between the call site and
//! the client defaults. Properties live on the cluster and are fetched or
//! pushed on demand; nothing but the overrides is cached here.

use std::fmt;

use serde_json::Value;

use crate::client::{
    Client, DatatypeUpdate, DatatypeValue, DeleteOptions, FetchOptions, GetOptions, IndexPage,
    IndexQuery, UpdateOptions,
};
use crate::content::{self, ContentCodecs, Decoder, Encoder};
use crate::datatype::DtOp;
use crate::error::{Result, RiakError};
use crate::object::RiakObject;
use crate::protocol::{BucketProps, PropValue};
use crate::purge::{self, PurgeReport};
use crate::quorum::{resolve, Quorum, QuorumParam, QuorumSet};
use crate::retry::RetryPolicy;

const SEARCH_INDEX_PROP: &str = "search_index";
const SEARCH_PROP: &str = "search";

#[derive(Clone)]
pub struct Bucket {
    client: Client,
    bucket_type: String,
    name: String,
    quorum: QuorumSet,
    codecs: ContentCodecs,
}

impl Bucket {
    pub(crate) fn new(client: Client, bucket_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_type: bucket_type.into(),
            name: name.into(),
            quorum: QuorumSet::default(),
            codecs: ContentCodecs::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bucket_type(&self) -> &str {
        &self.bucket_type
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // =========================================================================
    // Quorum Overrides
    // =========================================================================

    /// Effective value of `param` for a call that passed `call`
    pub fn resolve_quorum(&self, param: QuorumParam, call: Option<Quorum>) -> Quorum {
        resolve(param, call, &self.quorum, &self.client.quorum_defaults())
    }

    /// Set or clear (`None`) this bucket's override for `param`
    pub fn set_quorum(&mut self, param: QuorumParam, value: Option<Quorum>) -> &mut Self {
        self.quorum.set(param, value);
        self
    }

    pub fn quorum_overrides(&self) -> &QuorumSet {
        &self.quorum
    }

    // =========================================================================
    // Content Codecs
    // =========================================================================

    /// Bucket encoder for `content_type`, falling back to the client's
    pub fn encoder(&self, content_type: &str) -> Option<Encoder> {
        self.codecs
            .encoder(content_type)
            .or_else(|| self.client.encoder(content_type))
    }

    pub fn set_encoder<F>(&mut self, content_type: &str, encoder: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.codecs.set_encoder(content_type, encoder);
        self
    }

    /// Bucket decoder for `content_type`, falling back to the client's
    pub fn decoder(&self, content_type: &str) -> Option<Decoder> {
        self.codecs
            .decoder(content_type)
            .or_else(|| self.client.decoder(content_type))
    }

    pub fn set_decoder<F>(&mut self, content_type: &str, decoder: F) -> &mut Self
    where
        F: Fn(&[u8]) -> Result<Value> + Send + Sync + 'static,
    {
        self.codecs.set_decoder(content_type, decoder);
        self
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// New JSON object (not stored until `store`)
    pub fn new_object(&self, key: Option<&str>, data: &Value) -> Result<RiakObject> {
        self.new_object_as(key, data, content::JSON)
    }

    /// New object encoded with the codec registered for `content_type`
    pub fn new_object_as(
        &self,
        key: Option<&str>,
        data: &Value,
        content_type: &str,
    ) -> Result<RiakObject> {
        let mut obj = RiakObject::new(self.clone(), key.map(str::to_string), true);
        obj.set_content_type(content_type);
        obj.set_data(data)?;
        Ok(obj)
    }

    /// New object holding raw bytes
    pub fn new_binary(
        &self,
        key: Option<&str>,
        data: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> RiakObject {
        let mut obj = RiakObject::new(self.clone(), key.map(str::to_string), false);
        obj.set_content_type(content_type);
        obj.set_encoded_data(data);
        obj
    }

    /// Fetch an object whose value decodes through the codec registry
    pub fn get(&self, key: &str, opts: &GetOptions) -> Result<RiakObject> {
        let mut obj = RiakObject::new(self.clone(), Some(key.to_string()), true);
        obj.reload(opts)?;
        Ok(obj)
    }

    /// Fetch an object as raw bytes
    pub fn get_binary(&self, key: &str, opts: &GetOptions) -> Result<RiakObject> {
        let mut obj = RiakObject::new(self.clone(), Some(key.to_string()), false);
        obj.reload(opts)?;
        Ok(obj)
    }

    /// Fetch metadata only (vclock, content type, indexes)
    pub fn head(&self, key: &str, opts: &GetOptions) -> Result<RiakObject> {
        let opts = GetOptions {
            head: true,
            ..opts.clone()
        };
        self.get(key, &opts)
    }

    pub fn delete(&self, key: &str, opts: &DeleteOptions) -> Result<()> {
        self.client.delete(self, key, opts)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn get_properties(&self) -> Result<BucketProps> {
        self.client.get_bucket_props(self)
    }

    pub fn set_properties(&self, props: BucketProps) -> Result<()> {
        self.client.set_bucket_props(self, props)
    }

    /// Reset every property to the bucket type's defaults
    pub fn reset_properties(&self) -> Result<()> {
        self.client.reset_bucket_props(self)
    }

    pub fn get_property(&self, name: &str) -> Result<Option<PropValue>> {
        Ok(self.get_properties()?.remove(name))
    }

    pub fn set_property(&self, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let mut props = BucketProps::new();
        props.insert(name.to_string(), value.into());
        self.set_properties(props)
    }

    /// `true` when the property is `true` or a positive integer
    pub fn get_bool_property(&self, name: &str) -> Result<bool> {
        Ok(self
            .get_property(name)?
            .map(|value| value.is_truthy())
            .unwrap_or(false))
    }

    /// Number of replicas per object.
    ///
    /// Set this once before writing data and never change it afterwards.
    pub fn set_n_val(&self, n_val: u32) -> Result<()> {
        self.set_property("n_val", i64::from(n_val))
    }

    pub fn n_val(&self) -> Result<Option<u32>> {
        Ok(self
            .get_property("n_val")?
            .and_then(|value| value.as_int())
            .and_then(|n| u32::try_from(n).ok()))
    }

    /// Store conflicting writes as siblings instead of last-write-wins
    pub fn set_allow_multiples(&self, allow: bool) -> Result<()> {
        self.set_property("allow_mult", allow)
    }

    pub fn allow_multiples(&self) -> Result<bool> {
        self.get_bool_property("allow_mult")
    }

    /// Push a quorum default into the cluster-side bucket properties
    pub fn set_default_quorum(&self, param: QuorumParam, value: Quorum) -> Result<()> {
        self.set_property(param.name(), quorum_prop(value))
    }

    /// Cluster-side default for `param`, if set
    pub fn default_quorum(&self, param: QuorumParam) -> Result<Option<Quorum>> {
        match self.get_property(param.name())? {
            Some(value) => prop_quorum(&value).map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Bind this bucket to a search index.
    ///
    /// Retried on any failure (up to the client's retry ceiling, with a fixed
    /// delay), since rebinding the same index converges to the same state.
    pub fn set_search_index(&self, index: &str) -> Result<()> {
        let policy = RetryPolicy::search_index(self.client.config());
        let mut props = BucketProps::new();
        props.insert(SEARCH_INDEX_PROP.to_string(), PropValue::from(index));
        tracing::debug!("Binding search index {} to {}", index, self.name);
        self.client.set_bucket_props_with_policy(self, props, &policy)
    }

    pub fn get_search_index(&self) -> Result<Option<String>> {
        Ok(self
            .get_property(SEARCH_INDEX_PROP)?
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|index| !index.is_empty()))
    }

    /// True if the search precommit hook is enabled
    pub fn search_enabled(&self) -> Result<bool> {
        self.get_bool_property(SEARCH_PROP)
    }

    // =========================================================================
    // Keys and Indexes
    // =========================================================================

    /// Every key in the bucket.
    ///
    /// This is a full cluster scan and is very expensive. Use with caution.
    pub fn get_keys(&self) -> Result<Vec<String>> {
        self.client.get_keys(self)
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        self.get_keys()
    }

    /// Query a secondary index; exact match when `end` is `None`
    pub fn get_index(&self, index: &str, start: &str, end: Option<&str>) -> Result<IndexPage> {
        let query = IndexQuery::new(index, start, end.map(str::to_string));
        self.client.get_index(self, &query)
    }

    pub fn query_index(&self, query: &IndexQuery) -> Result<IndexPage> {
        self.client.get_index(self, query)
    }

    /// Delete every key, then reset the bucket's properties.
    ///
    /// `parallel: None` deletes one key at a time; `Some(n)` deletes in
    /// chunks of `n` concurrent deletes. IRREVERSIBLE.
    pub fn purge_keys(&self, parallel: Option<usize>) -> Result<PurgeReport> {
        purge::purge(self, parallel)
    }

    /// Parallel purge with the configured default chunk size
    pub fn purge_keys_parallel(&self) -> Result<PurgeReport> {
        purge::purge(self, Some(self.client.config().purge_chunk_size))
    }

    // =========================================================================
    // Datatypes
    // =========================================================================

    pub fn fetch_datatype(&self, key: &str, opts: &FetchOptions) -> Result<DatatypeValue> {
        self.client.fetch_datatype(self, key, opts)
    }

    pub fn update_datatype(
        &self,
        key: Option<&str>,
        op: DtOp,
        opts: &UpdateOptions,
    ) -> Result<DatatypeUpdate> {
        self.client.update_datatype(self, key, op, opts)
    }

    /// Fetch, update and return the locally updated value
    pub fn modify_datatype(
        &self,
        key: &str,
        op: DtOp,
        opts: &UpdateOptions,
    ) -> Result<DatatypeValue> {
        self.client.modify_datatype(self, key, op, opts)
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("bucket_type", &self.bucket_type)
            .field("name", &self.name)
            .field("quorum", &self.quorum)
            .field("codecs", &self.codecs)
            .finish()
    }
}

fn quorum_prop(value: Quorum) -> PropValue {
    match value {
        Quorum::Count(n) => PropValue::Int(i64::from(n)),
        symbolic => PropValue::Str(symbolic.to_string()),
    }
}

fn prop_quorum(value: &PropValue) -> Result<Quorum> {
    match value {
        PropValue::Int(n) => u32::try_from(*n)
            .map(Quorum::Count)
            .map_err(|_| RiakError::malformed(format!("quorum property out of range: {}", n))),
        PropValue::Str(s) => s.parse(),
        PropValue::Bool(b) => Err(RiakError::malformed(format!("quorum property is a bool: {}", b))),
    }
}
