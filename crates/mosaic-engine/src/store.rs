//! # Artifact persistence boundary
//!
//! The engine persists accepted artifacts and their analytics through the
//! [`ArtifactStore`] trait — an opaque key-value collaborator keyed by
//! artifact id. The in-memory implementation backs tests and demos; a real
//! deployment plugs its database in behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mosaic_core::ids::ArtifactId;

use crate::analytics::TokenAnalytics;

/// One persisted artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// Lineage id.
    pub id: ArtifactId,
    /// The prompt that produced it.
    pub prompt: String,
    /// Model ID used.
    pub model: String,
    /// Final normalized artifact text.
    pub code: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn new(id: ArtifactId, prompt: impl Into<String>, model: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            model: model.into(),
            code: code.into(),
            created_at: Utc::now(),
        }
    }
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record under that id.
    #[error("artifact not found: {id}")]
    NotFound {
        /// The missing id.
        id: ArtifactId,
    },
    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Opaque persistence collaborator.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write (or overwrite) an artifact record.
    async fn save_artifact(&self, record: ArtifactRecord) -> Result<(), StoreError>;

    /// Load an artifact record.
    async fn load_artifact(&self, id: &ArtifactId) -> Result<ArtifactRecord, StoreError>;

    /// Create or update the analytics row for an artifact.
    async fn upsert_analytics(
        &self,
        id: &ArtifactId,
        analytics: TokenAnalytics,
    ) -> Result<(), StoreError>;

    /// Load the analytics row for an artifact, if present.
    async fn load_analytics(&self, id: &ArtifactId) -> Result<Option<TokenAnalytics>, StoreError>;
}

/// In-memory [`ArtifactStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<String, ArtifactRecord>>,
    analytics: Mutex<HashMap<String, TokenAnalytics>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn save_artifact(&self, record: ArtifactRecord) -> Result<(), StoreError> {
        let mut artifacts = self
            .artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = artifacts.insert(record.id.as_str().to_owned(), record);
        Ok(())
    }

    async fn load_artifact(&self, id: &ArtifactId) -> Result<ArtifactRecord, StoreError> {
        let artifacts = self
            .artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        artifacts
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn upsert_analytics(
        &self,
        id: &ArtifactId,
        analytics: TokenAnalytics,
    ) -> Result<(), StoreError> {
        let mut rows = self
            .analytics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = rows.insert(id.as_str().to_owned(), analytics);
        Ok(())
    }

    async fn load_analytics(&self, id: &ArtifactId) -> Result<Option<TokenAnalytics>, StoreError> {
        let rows = self
            .analytics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(rows.get(id.as_str()).cloned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn analytics() -> TokenAnalytics {
        TokenAnalytics {
            model_name: "GPT-4o".into(),
            provider: "openai".into(),
            prompt_tokens: 10,
            response_tokens: 20,
            total_tokens: 30,
            max_tokens: 128_000,
            utilization_percentage: 0.02,
        }
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let store = MemoryStore::new();
        let id = ArtifactId::new();
        let record = ArtifactRecord::new(id.clone(), "prompt", "gpt-4o", "code");
        store.save_artifact(record.clone()).await.unwrap();

        let loaded = store.load_artifact(&id).await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn load_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.load_artifact(&ArtifactId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn save_overwrites_same_id() {
        let store = MemoryStore::new();
        let id = ArtifactId::new();
        store
            .save_artifact(ArtifactRecord::new(id.clone(), "p", "m", "v1"))
            .await
            .unwrap();
        store
            .save_artifact(ArtifactRecord::new(id.clone(), "p", "m", "v2"))
            .await
            .unwrap();
        assert_eq!(store.load_artifact(&id).await.unwrap().code, "v2");
    }

    #[tokio::test]
    async fn analytics_upsert_and_load() {
        let store = MemoryStore::new();
        let id = ArtifactId::new();
        assert!(store.load_analytics(&id).await.unwrap().is_none());

        store.upsert_analytics(&id, analytics()).await.unwrap();
        let loaded = store.load_analytics(&id).await.unwrap().unwrap();
        assert_eq!(loaded.total_tokens, 30);

        let mut updated = analytics();
        updated.total_tokens = 60;
        store.upsert_analytics(&id, updated).await.unwrap();
        assert_eq!(
            store.load_analytics(&id).await.unwrap().unwrap().total_tokens,
            60
        );
    }
}
