// Test doubles injected through SyncContext.

use crate::error::SyncError;
use crate::notify::{BusyIndicator, Notification, NotificationKind, Notifier};
use crate::store::MemoryStore;
use crate::transport::{Method, Transport};
use crate::SyncContext;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// =============================================================================
// Mock Transport
// =============================================================================

/// One request seen by the mock transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Answers requests from a FIFO of canned responses.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, SyncError>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<Value, SyncError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn ok(self, body: Value) -> Self {
        self.respond(Ok(body))
    }

    pub fn fail(self, status: u16, message: &str) -> Self {
        self.respond(Err(api_error(status, message)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SyncError> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(api_error(503, "no response queued")))
    }
}

pub fn api_error(status: u16, message: &str) -> SyncError {
    SyncError::Api {
        status,
        message: message.to_string(),
    }
}

/// A transport failure with no response at all (connection refused).
pub async fn network_error() -> SyncError {
    match reqwest::Client::new().get("http://127.0.0.1:1/").send().await {
        Err(e) => SyncError::HttpError(e),
        Ok(response) => panic!("nothing should listen on port 1: {}", response.status()),
    }
}

// =============================================================================
// Recording Notifier / Busy Indicator
// =============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.sent().iter().filter(|n| n.kind == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingBusy {
    events: Mutex<Vec<bool>>,
}

impl RecordingBusy {
    pub fn events(&self) -> Vec<bool> {
        self.events.lock().unwrap().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.events().last().copied().unwrap_or(false)
    }
}

impl BusyIndicator for RecordingBusy {
    fn show(&self) {
        self.events.lock().unwrap().push(true);
    }

    fn hide(&self) {
        self.events.lock().unwrap().push(false);
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub busy: Arc<RecordingBusy>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(transport: MockTransport) -> Self {
        Self::with_store(transport, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(transport: MockTransport, store: Arc<MemoryStore>) -> Self {
        Self {
            transport: Arc::new(transport),
            notifier: Arc::new(RecordingNotifier::default()),
            busy: Arc::new(RecordingBusy::default()),
            store,
        }
    }

    pub fn context(&self) -> SyncContext {
        SyncContext::new(
            self.transport.clone(),
            self.notifier.clone(),
            self.busy.clone(),
            self.store.clone(),
        )
    }
}
