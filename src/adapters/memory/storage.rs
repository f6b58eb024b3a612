//! In-memory object storage and mail outbox. Implement StoragePort and MailPort.

use crate::domain::DomainError;
use crate::ports::{MailPort, StoragePort};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Buckets held in memory. Objects are keyed by `(bucket, path)`.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    rejecting: Mutex<HashSet<String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload to `bucket` fail (missing bucket, policy error).
    pub fn reject_bucket(&self, bucket: &str) {
        lock(&self.rejecting).insert(bucket.to_string());
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_string(), path.to_string()))
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }
}

#[async_trait]
impl StoragePort for InMemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> Result<(), DomainError> {
        if lock(&self.rejecting).contains(bucket) {
            return Err(DomainError::Storage(format!("bucket '{}' not found", bucket)));
        }
        let key = (bucket.to_string(), path.to_string());
        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(DomainError::Storage(format!(
                "object '{}/{}' already exists",
                bucket, path
            )));
        }
        objects.insert(key, bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: String,
}

/// Records mail instead of sending it.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl MailPort for MemoryOutbox {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        reply_to: &str,
    ) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Mail("outbox unavailable".into()));
        }
        lock(&self.sent).push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            reply_to: reply_to.to_string(),
        });
        Ok(())
    }
}
