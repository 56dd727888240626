use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::error::ServiceError;

/// IdentificationRecord
///
/// One successful analysis, as written to the results log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationRecord {
    pub objects: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn record(&self, record: &IdentificationRecord) -> Result<(), ServiceError>;
}

pub type ResultStoreState = Arc<dyn ResultStore>;

/// FirebaseResultStore
///
/// Appends records under `identifiedObjects` in a Realtime Database through its REST API.
/// `POST` on a list location generates a push key server-side.
#[derive(Clone)]
pub struct FirebaseResultStore {
    http: reqwest::Client,
    database_url: String,
}

impl FirebaseResultStore {
    pub fn new(database_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            database_url: database_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResultStore for FirebaseResultStore {
    async fn record(&self, record: &IdentificationRecord) -> Result<(), ServiceError> {
        let url = format!("{}/identifiedObjects.json", self.database_url);

        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({
                "objects": record.objects,
                "capturedAt": record.captured_at.to_rfc3339(),
                "timestamp": { ".sv": "timestamp" },
            }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ServiceError::PermissionDenied),
            status => Err(ServiceError::Upstream {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_else(|_| status.to_string()),
            }),
        }
    }
}

/// MockResultStore
///
/// Keeps written records in memory so tests can assert on what was logged.
#[derive(Default)]
pub struct MockResultStore {
    records: Mutex<Vec<IdentificationRecord>>,
    pub failure: Option<MockStoreFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStoreFailure {
    PermissionDenied,
    Unavailable,
}

impl MockResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(failure: MockStoreFailure) -> Self {
        Self {
            records: Mutex::default(),
            failure: Some(failure),
        }
    }

    pub fn records(&self) -> Vec<IdentificationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ResultStore for MockResultStore {
    async fn record(&self, record: &IdentificationRecord) -> Result<(), ServiceError> {
        match self.failure {
            Some(MockStoreFailure::PermissionDenied) => Err(ServiceError::PermissionDenied),
            Some(MockStoreFailure::Unavailable) => Err(ServiceError::Upstream {
                status: 503,
                message: "Mock Store Error: Simulation requested".to_string(),
            }),
            None => {
                self.records
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(record.clone());
                Ok(())
            }
        }
    }
}
