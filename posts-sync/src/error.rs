use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    // Сетевые ошибки (ответа нет)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    // Ошибки, о которых сообщил сервер
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    // Локальные ошибки
    #[error("Nothing changed")]
    NothingChanged,

    #[error("Record has no identifier")]
    MissingId,

    #[error("Invalid page locator: {0}")]
    InvalidLocator(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    // Ошибки сериализации/десериализации
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl SyncError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Api { status, .. } => Some(*status),
            SyncError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// True for failures that never reached the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::NothingChanged
                | SyncError::MissingId
                | SyncError::InvalidLocator(_)
                | SyncError::InvalidCredentials(_)
        )
    }
}
