//! # Client
//!
//! Turns logical operations into pooled wire exchanges.
//!
//! Every quorum-bearing call resolves its parameters once (call, then bucket,
//! then client) and hands the finished request to the retry controller. Reads
//! are retried under the client's budget. Writes get a single attempt.
//!
//! ```text
//!   Bucket / RiakObject facade
//!            │
//!   Client ── resolve quorum ── retry::run ── pool.acquire ── Connection
//! ```

mod options;

pub use options::{
    DatatypeUpdate, DatatypeValue, DeleteOptions, FetchOptions, GetOptions, IndexPage, IndexQuery,
    PutOptions, UpdateOptions,
};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::bucket::Bucket;
use crate::config::ClientConfig;
use crate::content::{ContentCodecs, Decoder, Encoder};
use crate::datatype::{Datatype, DtOp};
use crate::error::{Result, RiakError};
use crate::protocol::{
    BucketProps, BucketReq, Content, DelReq, DtFetchReq, DtUpdateReq, GetReq, GetResp, IndexReq,
    PutReq, PutResp, Request, Response, ServerInfoResp, SetBucketReq,
};
use crate::quorum::{resolve, Quorum, QuorumDefaults, QuorumParam};
use crate::retry::{self, RetryPolicy};
use crate::transport::{CloseReport, ConnectionPool};

struct ClientInner {
    config: ClientConfig,
    pool: ConnectionPool,
    quorum: RwLock<QuorumDefaults>,
    codecs: RwLock<ContentCodecs>,
}

/// Pooled client for one cluster endpoint.
///
/// Cheap to clone; clones share the pool, defaults and codec registry.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client. Connections are opened lazily on first use.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let pool = ConnectionPool::new(config.clone())?;
        tracing::debug!(
            "Client for {} (max_transports={}, policy={:?})",
            config.endpoint(),
            config.max_transports,
            config.exhaustion_policy
        );
        Ok(Client {
            inner: Arc::new(ClientInner {
                config,
                pool,
                quorum: RwLock::new(QuorumDefaults::default()),
                codecs: RwLock::new(ContentCodecs::with_defaults()),
            }),
        })
    }

    /// Client for `host:port` with default configuration
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::new(ClientConfig::builder().host(host).port(port).build())
    }

    /// Handle for a bucket of the `default` type
    pub fn bucket(&self, name: impl Into<String>) -> Bucket {
        Bucket::new(self.clone(), "default", name)
    }

    /// Handle for a bucket of a specific bucket type
    pub fn bucket_type(&self, bucket_type: impl Into<String>, name: impl Into<String>) -> Bucket {
        Bucket::new(self.clone(), bucket_type, name)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.inner.pool
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    /// Client-level default for one quorum parameter
    pub fn default_quorum(&self, param: QuorumParam) -> Quorum {
        self.inner.quorum.read().get(param)
    }

    pub fn set_default_quorum(&self, param: QuorumParam, value: Quorum) {
        self.inner.quorum.write().set(param, value);
    }

    pub fn quorum_defaults(&self) -> QuorumDefaults {
        *self.inner.quorum.read()
    }

    pub fn encoder(&self, content_type: &str) -> Option<Encoder> {
        self.inner.codecs.read().encoder(content_type)
    }

    pub fn set_encoder<F>(&self, content_type: &str, encoder: F)
    where
        F: Fn(&serde_json::Value) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.inner.codecs.write().set_encoder(content_type, encoder);
    }

    pub fn decoder(&self, content_type: &str) -> Option<Decoder> {
        self.inner.codecs.read().decoder(content_type)
    }

    pub fn set_decoder<F>(&self, content_type: &str, decoder: F)
    where
        F: Fn(&[u8]) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.inner.codecs.write().set_decoder(content_type, decoder);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the pool, giving in-flight operations the configured grace period
    pub fn quit(&self) -> CloseReport {
        self.quit_with_grace(self.inner.config.shutdown_grace)
    }

    pub fn quit_with_grace(&self, grace: Duration) -> CloseReport {
        let report = self.inner.pool.close(grace);
        tracing::info!(
            "Client for {} closed ({} drained, {} forced)",
            self.inner.config.endpoint(),
            report.drained,
            report.forced
        );
        report
    }

    // =========================================================================
    // Server Operations
    // =========================================================================

    pub fn ping(&self) -> Result<()> {
        match self.execute("ping", &self.read_policy(), &Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn server_info(&self) -> Result<ServerInfoResp> {
        match self.execute("server_info", &self.read_policy(), &Request::ServerInfo)? {
            Response::ServerInfo(info) => Ok(info),
            other => Err(unexpected(other)),
        }
    }

    // =========================================================================
    // Object Operations
    // =========================================================================

    /// Fetch a key. An empty `content` in the reply means not found.
    pub fn get(&self, bucket: &Bucket, key: &str, opts: &GetOptions) -> Result<GetResp> {
        let request = Request::Get(GetReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            key: key.to_string(),
            r: Some(self.resolve(bucket, QuorumParam::R, opts.r)),
            pr: Some(self.resolve(bucket, QuorumParam::PR, opts.pr)),
            basic_quorum: opts.basic_quorum,
            notfound_ok: opts.notfound_ok,
            if_modified: None,
            head: opts.head,
            deleted_vclock: false,
            timeout: opts.timeout,
        });
        let operation = if opts.head { "head" } else { "get" };
        match self.execute(operation, &self.read_policy(), &request)? {
            Response::Get(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    /// Store a value. `key: None` lets the node assign one.
    pub fn put(
        &self,
        bucket: &Bucket,
        key: Option<&str>,
        content: Content,
        vclock: Option<Vec<u8>>,
        opts: &PutOptions,
    ) -> Result<PutResp> {
        let request = Request::Put(PutReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            key: key.map(str::to_string),
            vclock,
            content,
            w: Some(self.resolve(bucket, QuorumParam::W, opts.w)),
            dw: Some(self.resolve(bucket, QuorumParam::DW, opts.dw)),
            pw: Some(self.resolve(bucket, QuorumParam::PW, opts.pw)),
            return_body: opts.return_body,
            return_head: false,
            if_not_modified: false,
            if_none_match: opts.if_none_match,
            timeout: opts.timeout,
        });
        match self.execute("put", &RetryPolicy::non_idempotent(), &request)? {
            Response::Put(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    pub fn delete(&self, bucket: &Bucket, key: &str, opts: &DeleteOptions) -> Result<()> {
        let request = Request::Delete(DelReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            key: key.to_string(),
            vclock: opts.vclock.clone(),
            rw: Some(self.resolve(bucket, QuorumParam::RW, opts.rw)),
            r: Some(self.resolve(bucket, QuorumParam::R, opts.r)),
            w: Some(self.resolve(bucket, QuorumParam::W, opts.w)),
            pr: Some(self.resolve(bucket, QuorumParam::PR, opts.pr)),
            pw: Some(self.resolve(bucket, QuorumParam::PW, opts.pw)),
            dw: Some(self.resolve(bucket, QuorumParam::DW, opts.dw)),
            timeout: opts.timeout,
        });
        match self.execute("delete", &RetryPolicy::non_idempotent(), &request)? {
            Response::Deleted => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// List every key in a bucket.
    ///
    /// This is a full, non-indexed scan on the cluster. Use with caution.
    pub fn get_keys(&self, bucket: &Bucket) -> Result<Vec<String>> {
        let request = Request::ListKeys(bucket_req(bucket));
        let keys = retry::run("list_keys", &self.read_policy(), |_| {
            let mut keys = Vec::new();
            let mut conn = self.inner.pool.acquire()?;
            conn.call_streaming(&request, |frame| match frame {
                Response::ListKeys(resp) => {
                    keys.extend(resp.keys);
                    Ok(())
                }
                other => Err(unexpected(other)),
            })?;
            Ok(keys)
        })?;
        tracing::debug!("Listed {} keys in {}/{}", keys.len(), bucket.bucket_type(), bucket.name());
        Ok(keys)
    }

    // =========================================================================
    // Bucket Operations
    // =========================================================================

    pub fn get_bucket_props(&self, bucket: &Bucket) -> Result<BucketProps> {
        let request = Request::GetBucket(bucket_req(bucket));
        match self.execute("get_bucket_props", &self.read_policy(), &request)? {
            Response::GetBucket(resp) => Ok(resp.props),
            other => Err(unexpected(other)),
        }
    }

    pub fn set_bucket_props(&self, bucket: &Bucket, props: BucketProps) -> Result<()> {
        self.set_bucket_props_with_policy(bucket, props, &RetryPolicy::non_idempotent())
    }

    /// Push properties under a caller-chosen policy (for writes the caller
    /// knows to be idempotent, such as binding a search index)
    pub fn set_bucket_props_with_policy(
        &self,
        bucket: &Bucket,
        props: BucketProps,
        policy: &RetryPolicy,
    ) -> Result<()> {
        let request = Request::SetBucket(SetBucketReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            props,
        });
        match self.execute("set_bucket_props", policy, &request)? {
            Response::SetBucket => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn reset_bucket_props(&self, bucket: &Bucket) -> Result<()> {
        let request = Request::ResetBucket(bucket_req(bucket));
        match self.execute("reset_bucket_props", &RetryPolicy::non_idempotent(), &request)? {
            Response::ResetBucket => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Query a secondary index
    pub fn get_index(&self, bucket: &Bucket, query: &IndexQuery) -> Result<IndexPage> {
        let request = Request::Index(IndexReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            index: query.index.clone(),
            range: query.range.clone(),
            return_terms: query.return_terms,
            max_results: query.max_results,
            continuation: query.continuation.clone(),
            timeout: query.timeout,
        });
        retry::run("get_index", &self.read_policy(), |_| {
            let mut page = IndexPage::default();
            let mut conn = self.inner.pool.acquire()?;
            conn.call_streaming(&request, |frame| match frame {
                Response::Index(resp) => {
                    page.keys.extend(resp.keys);
                    page.terms.extend(resp.results);
                    if resp.continuation.is_some() {
                        page.continuation = resp.continuation;
                    }
                    Ok(())
                }
                other => Err(unexpected(other)),
            })?;
            Ok(page)
        })
    }

    // =========================================================================
    // Datatype Operations
    // =========================================================================

    /// Fetch a datatype. Retried on transient failures.
    pub fn fetch_datatype(
        &self,
        bucket: &Bucket,
        key: &str,
        opts: &FetchOptions,
    ) -> Result<DatatypeValue> {
        let request = Request::DtFetch(DtFetchReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            key: key.to_string(),
            r: Some(self.resolve(bucket, QuorumParam::R, opts.r)),
            pr: Some(self.resolve(bucket, QuorumParam::PR, opts.pr)),
            basic_quorum: opts.basic_quorum,
            notfound_ok: opts.notfound_ok,
            timeout: opts.timeout,
            include_context: opts.include_context,
        });
        match self.execute("fetch_datatype", &self.read_policy(), &request)? {
            Response::DtFetch(resp) => Ok(DatatypeValue {
                value: resp.value,
                context: resp.context,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Apply an update to a datatype. Not idempotent, so never retried.
    pub fn update_datatype(
        &self,
        bucket: &Bucket,
        key: Option<&str>,
        op: DtOp,
        opts: &UpdateOptions,
    ) -> Result<DatatypeUpdate> {
        if !op.is_top_level() {
            return Err(RiakError::InvalidOperation(format!(
                "{:?} values can only be updated inside a map",
                op.kind()
            )));
        }
        let request = Request::DtUpdate(DtUpdateReq {
            bucket_type: bucket.bucket_type().to_string(),
            bucket: bucket.name().to_string(),
            key: key.map(str::to_string),
            context: opts.context.clone(),
            op,
            w: Some(self.resolve(bucket, QuorumParam::W, opts.w)),
            dw: Some(self.resolve(bucket, QuorumParam::DW, opts.dw)),
            pw: Some(self.resolve(bucket, QuorumParam::PW, opts.pw)),
            return_body: opts.return_body,
            timeout: opts.timeout,
            include_context: opts.include_context,
        });
        match self.execute("update_datatype", &RetryPolicy::non_idempotent(), &request)? {
            Response::DtUpdate(resp) => Ok(DatatypeUpdate {
                key: resp.key,
                value: resp.value,
                context: resp.context,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch a datatype, update it under the fetched context, and return the
    /// value with the update applied locally, so the node never has to send
    /// the body back.
    ///
    /// An op whose kind does not match the stored value is rejected before
    /// anything is written.
    pub fn modify_datatype(
        &self,
        bucket: &Bucket,
        key: &str,
        op: DtOp,
        opts: &UpdateOptions,
    ) -> Result<DatatypeValue> {
        let fetched = self.fetch_datatype(
            bucket,
            key,
            &FetchOptions {
                include_context: Some(true),
                ..Default::default()
            },
        )?;

        let mut value = fetched
            .value
            .unwrap_or_else(|| Datatype::empty(op.kind()));
        value.apply(&op)?;

        let update = self.update_datatype(
            bucket,
            Some(key),
            op,
            &UpdateOptions {
                context: opts.context.clone().or_else(|| fetched.context.clone()),
                return_body: false,
                ..opts.clone()
            },
        )?;

        Ok(DatatypeValue {
            value: Some(value),
            context: update.context.or(fetched.context),
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn resolve(&self, bucket: &Bucket, param: QuorumParam, call: Option<Quorum>) -> u32 {
        let defaults = self.inner.quorum.read();
        resolve(param, call, bucket.quorum_overrides(), &defaults).to_wire()
    }

    fn read_policy(&self) -> RetryPolicy {
        RetryPolicy::reads(&self.inner.config)
    }

    /// One pooled round trip per attempt
    fn execute(&self, operation: &str, policy: &RetryPolicy, request: &Request) -> Result<Response> {
        retry::run(operation, policy, |attempt| {
            let mut conn = self.inner.pool.acquire()?;
            tracing::trace!("{} attempt {} on connection {:?}", operation, attempt, conn.id());
            conn.call(request)
        })
    }
}

fn bucket_req(bucket: &Bucket) -> BucketReq {
    BucketReq {
        bucket_type: bucket.bucket_type().to_string(),
        bucket: bucket.name().to_string(),
        timeout: None,
    }
}

fn unexpected(response: Response) -> RiakError {
    RiakError::malformed(format!("unexpected {:?} reply", response.message_code()))
}
