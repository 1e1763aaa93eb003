pub mod diff;
pub mod error;
pub mod http_client;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod posts;
pub mod session;
pub mod store;
pub mod transport;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use error::SyncError;
use notify::{BusyIndicator, Notification, Notifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::StateStore;
use transport::Transport;

/// Collaborators shared by every manager.
#[derive(Clone)]
pub struct SyncContext {
    pub transport: Arc<dyn Transport>,
    pub notifier: Arc<dyn Notifier>,
    pub busy: Arc<dyn BusyIndicator>,
    pub store: Arc<dyn StateStore>,
}

impl SyncContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        busy: Arc<dyn BusyIndicator>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            transport,
            notifier,
            busy,
            store,
        }
    }

    /// Context talking to a real backend through [`http_client::HttpClient`].
    /// With `cookie_file` the auth cookies survive between runs.
    pub fn http(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        cookie_file: Option<PathBuf>,
        notifier: Arc<dyn Notifier>,
        busy: Arc<dyn BusyIndicator>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, SyncError> {
        let transport = match cookie_file {
            Some(path) => http_client::HttpClient::with_cookie_file(base_url, timeout, path)?,
            None => http_client::HttpClient::with_timeout(base_url, timeout)?,
        };
        Ok(Self::new(Arc::new(transport), notifier, busy, store))
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }
}

/// Both managers built over one shared context.
pub struct PostsClient {
    pub session: session::SessionManager,
    pub posts: posts::PostsManager,
}

impl PostsClient {
    /// Builds both managers, restoring whatever state the store holds.
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            session: session::SessionManager::new(ctx.clone()),
            posts: posts::PostsManager::new(ctx),
        }
    }
}
