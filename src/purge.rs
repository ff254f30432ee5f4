//! Batch Purge
//!
//! Deletes every key in a bucket, then resets its properties.
//!
//! 1. List all keys (a full scan).
//! 2. For each key, fetch it to obtain its vclock, then delete it. Either
//!    - one key at a time, in listing order, or
//!    - in consecutive chunks of `parallel` keys, each chunk fanned out on
//!      scoped threads and joined before the next chunk starts.
//! 3. Reset the bucket's properties.
//!
//! A failed delete is logged and recorded but never stops the batch. There is
//! no rollback: a purge that errors out mid-way leaves the bucket partially
//! purged.

use crate::bucket::Bucket;
use crate::client::{DeleteOptions, GetOptions};
use crate::error::{Result, RiakError};

/// What a purge did
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Keys returned by the listing
    pub listed: usize,
    /// Keys deleted successfully
    pub deleted: usize,
    /// Keys whose fetch or delete failed, with the error
    pub failed: Vec<(String, RiakError)>,
}

impl PurgeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.deleted == self.listed
    }

    fn record(&mut self, key: &str, result: Result<()>) {
        match result {
            Ok(()) => self.deleted += 1,
            Err(err) => {
                tracing::warn!("Purge: delete of {} failed: {}", key, err);
                self.failed.push((key.to_string(), err));
            }
        }
    }
}

/// Purge `bucket`. `parallel: None` is sequential; `Some(n)` bounds the
/// number of concurrent deletes to `n` (0 is treated as 1), further capped
/// at the pool's `max_transports`.
pub fn purge(bucket: &Bucket, parallel: Option<usize>) -> Result<PurgeReport> {
    let chunk_size = parallel.map(|n| effective_chunk_size(bucket, n));
    let keys = bucket.get_keys()?;
    let mut report = PurgeReport {
        listed: keys.len(),
        ..Default::default()
    };

    tracing::info!(
        "Purging {} keys from {}/{} ({})",
        keys.len(),
        bucket.bucket_type(),
        bucket.name(),
        match chunk_size {
            Some(n) => format!("chunks of {}", n),
            None => "sequential".to_string(),
        }
    );

    match chunk_size {
        None => {
            for key in &keys {
                report.record(key, delete_one(bucket, key));
            }
        }
        Some(chunk_size) => {
            for chunk in keys.chunks(chunk_size) {
                for (key, result) in delete_chunk(bucket, chunk)? {
                    report.record(key, result);
                }
            }
        }
    }

    bucket.reset_properties()?;

    tracing::info!(
        "Purged {}/{} keys from {} ({} failed)",
        report.deleted,
        report.listed,
        bucket.name(),
        report.failed.len()
    );
    Ok(report)
}

/// Effective chunk size: at least 1, at most the pool's transport ceiling
fn effective_chunk_size(bucket: &Bucket, requested: usize) -> usize {
    let max_transports = bucket.client().pool().max_transports();
    let requested = requested.max(1);
    if requested > max_transports {
        tracing::warn!(
            "Purge: chunk size {} exceeds max_transports {}, using {}",
            requested,
            max_transports,
            max_transports
        );
        return max_transports;
    }
    requested
}

/// Fan out one chunk and wait for every delete in it
fn delete_chunk<'k>(bucket: &Bucket, chunk: &'k [String]) -> Result<Vec<(&'k str, Result<()>)>> {
    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = chunk
            .iter()
            .map(|key| (key.as_str(), scope.spawn(move |_| delete_one(bucket, key))))
            .collect();

        handles
            .into_iter()
            .map(|(key, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(RiakError::InvalidOperation(format!("delete worker for {} panicked", key)))
                });
                (key, result)
            })
            .collect()
    })
    .map_err(|_| RiakError::InvalidOperation("purge chunk worker panicked".to_string()))
}

fn delete_one(bucket: &Bucket, key: &str) -> Result<()> {
    let mut obj = bucket.get_binary(key, &GetOptions::default())?;
    obj.delete(&DeleteOptions::default())
}
