use crate::error::SyncError;
use async_trait::async_trait;
use serde_json::Value;

pub use reqwest::Method;

/// Issues one JSON request against the backend.
///
/// `path` is relative to the API root (`auth/login`, `posts/42`, ...).
/// Success resolves with the decoded body, or `Value::Null` for an empty one;
/// a non-2xx answer resolves with [`SyncError::Api`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SyncError>;
}
