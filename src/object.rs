//! Object facade
//!
//! A key's value plus the metadata the node needs to reconcile writes
//! (vclock, siblings). JSON-aware objects encode and decode through the
//! bucket's codec registry; binary objects carry raw bytes.

use serde_json::Value;

use crate::bucket::Bucket;
use crate::client::{DeleteOptions, GetOptions, PutOptions};
use crate::content;
use crate::error::{Result, RiakError};
use crate::protocol::{Content, GetResp, PutResp};

#[derive(Debug, Clone)]
pub struct RiakObject {
    bucket: Bucket,
    key: Option<String>,
    content: Content,
    siblings: Vec<Content>,
    vclock: Option<Vec<u8>>,
    exists: bool,
    /// Whether `data`/`set_data` go through the codec registry
    encode_data: bool,
}

impl RiakObject {
    pub(crate) fn new(bucket: Bucket, key: Option<String>, encode_data: bool) -> Self {
        Self {
            bucket,
            key,
            content: Content::default(),
            siblings: Vec::new(),
            vclock: None,
            exists: false,
            encode_data,
        }
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Whether the last fetch or store found/produced a value
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn vclock(&self) -> Option<&[u8]> {
        self.vclock.as_deref()
    }

    pub fn content_type(&self) -> &str {
        self.content.content_type.as_deref().unwrap_or(content::BINARY)
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.content.content_type = Some(content_type.to_string());
        self
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Decoded value
    pub fn data(&self) -> Result<Value> {
        if !self.encode_data {
            return Err(RiakError::Codec(
                "binary object; use encoded_data() for its bytes".to_string(),
            ));
        }
        let decoder = self.bucket.decoder(self.content_type()).ok_or_else(|| {
            RiakError::Codec(format!("no decoder for content type {}", self.content_type()))
        })?;
        decoder(self.content.value.as_slice())
    }

    /// Encode and replace the value
    pub fn set_data(&mut self, data: &Value) -> Result<&mut Self> {
        if !self.encode_data {
            return Err(RiakError::Codec(
                "binary object; use set_encoded_data() for its bytes".to_string(),
            ));
        }
        let encoder = self.bucket.encoder(self.content_type()).ok_or_else(|| {
            RiakError::Codec(format!("no encoder for content type {}", self.content_type()))
        })?;
        self.content.value = encoder(data)?;
        Ok(self)
    }

    /// Stored bytes
    pub fn encoded_data(&self) -> &[u8] {
        &self.content.value
    }

    pub fn set_encoded_data(&mut self, data: impl Into<Vec<u8>>) -> &mut Self {
        self.content.value = data.into();
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Add a secondary-index entry (`*_bin` or `*_int` field)
    pub fn add_index(&mut self, field: &str, value: impl ToString) -> &mut Self {
        let entry = (field.to_string(), value.to_string());
        if !self.content.indexes.contains(&entry) {
            self.content.indexes.push(entry);
        }
        self
    }

    /// Remove index entries for `field`, or just one value when given
    pub fn remove_index(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        self.content
            .indexes
            .retain(|(f, v)| f != field || value.map_or(false, |value| v != value));
        self
    }

    pub fn indexes(&self) -> &[(String, String)] {
        &self.content.indexes
    }

    pub fn set_usermeta(&mut self, key: &str, value: &str) -> &mut Self {
        self.content.usermeta.retain(|(k, _)| k != key);
        self.content.usermeta.push((key.to_string(), value.to_string()));
        self
    }

    pub fn usermeta(&self) -> &[(String, String)] {
        &self.content.usermeta
    }

    /// True when the node returned conflicting values
    pub fn has_siblings(&self) -> bool {
        self.siblings.len() > 1
    }

    pub fn siblings(&self) -> &[Content] {
        &self.siblings
    }

    /// Pick one sibling as the object's value (resolve on next store)
    pub fn choose_sibling(&mut self, index: usize) -> Result<&mut Self> {
        let chosen = self
            .siblings
            .get(index)
            .cloned()
            .ok_or_else(|| RiakError::InvalidOperation(format!("no sibling {}", index)))?;
        self.content = chosen;
        self.siblings = vec![self.content.clone()];
        Ok(self)
    }

    // =========================================================================
    // Wire Operations
    // =========================================================================

    /// Write the object. Carries the vclock from the last fetch, if any.
    pub fn store(&mut self, opts: &PutOptions) -> Result<&mut Self> {
        let resp = self.bucket.client().put(
            &self.bucket,
            self.key.as_deref(),
            self.content.clone(),
            self.vclock.clone(),
            opts,
        )?;
        self.absorb_put(resp);
        Ok(self)
    }

    /// Re-fetch from the cluster
    pub fn reload(&mut self, opts: &GetOptions) -> Result<&mut Self> {
        let key = self
            .key
            .clone()
            .ok_or_else(|| RiakError::InvalidOperation("cannot reload an object without a key".into()))?;
        let resp = self.bucket.client().get(&self.bucket, &key, opts)?;
        self.absorb_get(resp);
        Ok(self)
    }

    /// Delete the object and clear local state
    pub fn delete(&mut self, opts: &DeleteOptions) -> Result<()> {
        let key = self
            .key
            .clone()
            .ok_or_else(|| RiakError::InvalidOperation("cannot delete an object without a key".into()))?;
        let opts = DeleteOptions {
            vclock: opts.vclock.clone().or_else(|| self.vclock.clone()),
            ..opts.clone()
        };
        self.bucket.client().delete(&self.bucket, &key, &opts)?;
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.clear_content();
        self.vclock = None;
    }

    /// Drop the value and siblings but keep the causal context
    fn clear_content(&mut self) {
        let content_type = self.content.content_type.take();
        self.content = Content {
            content_type,
            ..Default::default()
        };
        self.siblings.clear();
        self.exists = false;
    }

    fn absorb_get(&mut self, resp: GetResp) {
        if resp.unchanged {
            return;
        }
        self.vclock = resp.vclock;
        self.set_siblings(resp.content);
    }

    fn absorb_put(&mut self, resp: PutResp) {
        if let Some(key) = resp.key {
            self.key = Some(key);
        }
        if resp.vclock.is_some() {
            self.vclock = resp.vclock;
        }
        if resp.content.is_empty() {
            self.exists = true;
        } else {
            self.set_siblings(resp.content);
        }
    }

    fn set_siblings(&mut self, mut content: Vec<Content>) {
        content.retain(|c| !c.deleted);
        // All tombstones: keep the vclock so the next store supersedes them.
        if content.is_empty() {
            self.clear_content();
            return;
        }
        self.exists = true;
        self.content = content[0].clone();
        self.siblings = content;
    }
}
