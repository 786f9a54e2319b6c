//! Audit trail for answered and rejected queries
//!
//! Every request is stored with a SHA-256 fingerprint of the original
//! request so later tampering is detectable.

use crate::error::RouterError;
use crate::models::{QueryRecord, QueryRequest, QueryResponse};
use crate::telemetry::preview;
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const ANSWER_PREVIEW_CHARS: usize = 280;

/// In-memory audit store, cheap to clone
#[derive(Clone)]
pub struct AuditLog {
    records: Arc<RwLock<HashMap<Uuid, QueryRecord>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a record, keyed by its request id
    pub async fn record(&self, record: QueryRecord) -> Result<Uuid> {
        let request_id = record.request_id;
        let mut records = self.records.write().await;
        if records.contains_key(&request_id) {
            return Err(RouterError::AuditError(format!(
                "request {} already recorded",
                request_id
            )));
        }
        records.insert(request_id, record);
        Ok(request_id)
    }

    /// Build and store the record for a finished request
    pub async fn record_response(
        &self,
        request: &QueryRequest,
        response: &QueryResponse,
    ) -> Result<Uuid> {
        let record = QueryRecord {
            request_id: response.request_id,
            user_id: response.user_id.clone(),
            request_hash: compute_request_hash(request)?,
            request: request.clone(),
            status: response.status,
            route: response.route,
            answer_preview: preview(&response.answer, ANSWER_PREVIEW_CHARS),
            reasoning_trace: response.reasoning_trace.clone(),
            created_at: response.created_at,
            elapsed_ms: response.elapsed_ms,
        };
        self.record(record).await
    }

    pub async fn get(&self, request_id: Uuid) -> Result<Option<QueryRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&request_id).cloned())
    }

    /// Request ids for a user, oldest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Uuid>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .values()
            .filter(|record| record.user_id == user_id)
            .map(|record| (record.request_id, record.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);

        Ok(items.into_iter().map(|(id, _)| id).collect())
    }

    /// Recompute the request hash; unknown ids verify as false
    pub async fn verify_integrity(&self, request_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        match records.get(&request_id) {
            Some(record) => Ok(compute_request_hash(&record.request)? == record.request_hash),
            None => Ok(false),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of the serialized request, hex encoded.
/// Streams JSON straight into the hasher.
pub fn compute_request_hash(request: &QueryRequest) -> Result<String> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut HashWriter(&mut hasher), request)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryStatus;
    use chrono::{Duration, Utc};

    fn record_for(user: &str, query: &str, offset_secs: i64) -> QueryRecord {
        let request = QueryRequest::new(query).with_user(user);
        QueryRecord {
            request_id: Uuid::new_v4(),
            user_id: user.to_string(),
            request_hash: compute_request_hash(&request).unwrap(),
            request,
            status: QueryStatus::Answered,
            route: None,
            answer_preview: String::new(),
            reasoning_trace: vec![],
            created_at: Utc::now() + Duration::seconds(offset_secs),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = QueryRequest::new("What is AAPL trading at?");
        let b = QueryRequest::new("What is AAPL trading at?");
        let c = QueryRequest::new("What is MSFT trading at?");

        let hash = compute_request_hash(&a).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_request_hash(&b).unwrap());
        assert_ne!(hash, compute_request_hash(&c).unwrap());
    }

    #[tokio::test]
    async fn test_list_for_user_is_chronological() {
        let log = AuditLog::new();
        let later = record_for("alice", "second", 10);
        let earlier = record_for("alice", "first", 0);
        let other = record_for("bob", "other", 5);

        let later_id = log.record(later).await.unwrap();
        let earlier_id = log.record(earlier).await.unwrap();
        log.record(other).await.unwrap();

        assert_eq!(
            log.list_for_user("alice").await.unwrap(),
            vec![earlier_id, later_id]
        );
        assert!(log.list_for_user("carol").await.unwrap().is_empty());
        assert_eq!(log.len().await, 3);
    }

    #[tokio::test]
    async fn test_verify_integrity_detects_tampering() {
        let log = AuditLog::new();
        let id = log.record(record_for("alice", "GDP trend", 0)).await.unwrap();
        assert!(log.verify_integrity(id).await.unwrap());

        {
            let mut records = log.records.write().await;
            if let Some(record) = records.get_mut(&id) {
                record.request.query = "something else".to_string();
            }
        }

        assert!(!log.verify_integrity(id).await.unwrap());
        assert!(!log.verify_integrity(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_request_id_is_rejected() {
        let log = AuditLog::new();
        let record = record_for("alice", "q", 0);
        log.record(record.clone()).await.unwrap();

        tokio_test::assert_err!(log.record(record).await);
    }
}
