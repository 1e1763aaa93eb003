use crate::error::SyncError;
use crate::models::{ExternalTokenRequest, LoginRequest, Session};
use crate::notify::Notification;
use crate::store;
use crate::transport::Method;
use crate::SyncContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const SESSION_STORE_KEY: &str = "session";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub user: Option<Session>,
    pub status: SessionStatus,
    pub is_loading: bool,
}

/// Owns the single authenticated-user record.
///
/// Every awaited operation shows the busy indicator on entry and hides it on
/// completion, notifies the user, and also hands the outcome back to the
/// caller. Concurrent logins are not serialized beyond `&mut self`.
pub struct SessionManager {
    ctx: SyncContext,
    state: SessionState,
}

impl SessionManager {
    pub fn new(ctx: SyncContext) -> Self {
        let mut state: SessionState = store::load_state(ctx.store.as_ref(), SESSION_STORE_KEY);
        // An interrupted login is not resumable
        if state.status == SessionStatus::Authenticating || state.is_loading {
            state.status = if state.user.is_some() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Unauthenticated
            };
            state.is_loading = false;
        }
        Self { ctx, state }
    }

    pub fn user(&self) -> Option<&Session> {
        self.state.user.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn login_with_credentials(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<Session, SyncError> {
        tracing::debug!("Login called for email: {}", email);
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.authenticate("auth/login", body).await
    }

    /// Authenticates with a token issued by a third-party identity provider.
    pub async fn login_with_external_token(&mut self, token: &str) -> Result<Session, SyncError> {
        tracing::debug!("External token login called");
        let body = serde_json::to_value(ExternalTokenRequest {
            atoken: token.to_string(),
        })?;
        self.authenticate("auth/google", body).await
    }

    /// Silent startup login. A 404 means "no session on the server" and
    /// resolves to `Ok(None)` without notifying anyone.
    pub async fn attempt_session_restore(&mut self) -> Result<Option<Session>, SyncError> {
        self.begin(SessionStatus::Authenticating);

        let result = self.fetch_session("auth/autologin", None).await;
        let outcome = match result {
            Ok(session) => {
                self.set_user(Some(session.clone()));
                self.ctx.notify(Notification::positive(format!(
                    "Auto login success with {}",
                    display_or_unknown(&session.email)
                )));
                Ok(Some(session))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("No session to restore");
                self.set_user(None);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Session restore failed: {}", e);
                self.set_user(None);
                self.ctx.notify(Notification::negative(format!(
                    "Auto login not available! {}",
                    e
                )));
                Err(e)
            }
        };

        self.finish();
        outcome
    }

    /// Server-side logout. The local session is cleared whatever the outcome.
    pub async fn end_session(&mut self, notify: bool) -> Result<(), SyncError> {
        let status = self.state.status;
        self.begin(status);

        let result = self
            .ctx
            .transport
            .request(Method::POST, "auth/logout", None)
            .await
            .map(|_| ());
        self.set_user(None);

        match &result {
            Ok(()) => {
                tracing::info!("Session ended");
                if notify {
                    self.ctx.notify(Notification::positive("Successful logout"));
                }
            }
            Err(e) => {
                tracing::warn!("Logout failed: {}", e);
                self.ctx
                    .notify(Notification::negative(format!("Error on log out: {}", e)));
            }
        }

        self.finish();
        result
    }

    /// Best-effort teardown for process exit.
    ///
    /// The local session is cleared at once; the `auth/closeapp` request runs
    /// on a spawned task whose result nobody inspects. The handle may be
    /// dropped. Must be called from within a tokio runtime.
    pub fn terminate_remote_session(&mut self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.ctx.transport);
        let handle = tokio::spawn(async move {
            if let Err(e) = transport.request(Method::POST, "auth/closeapp", None).await {
                tracing::debug!("Close app request failed: {}", e);
            }
        });

        self.set_user(None);
        handle
    }

    async fn authenticate(&mut self, path: &str, body: Value) -> Result<Session, SyncError> {
        self.begin(SessionStatus::Authenticating);

        let result = self.fetch_session(path, Some(body)).await;
        match &result {
            Ok(session) => {
                tracing::info!("Logged in: {}", display_or_unknown(&session.email));
                self.set_user(Some(session.clone()));
                self.ctx.notify(Notification::positive(format!(
                    "{} with {} e-mail is logged in",
                    display_or_unknown(&session.name),
                    display_or_unknown(&session.email)
                )));
            }
            Err(e) => {
                tracing::warn!("Authentication failed: {}", e);
                self.set_user(None);
                self.ctx.notify(Notification::negative(format!(
                    "Error on authentication: {}",
                    e
                )));
            }
        }

        self.finish();
        result
    }

    async fn fetch_session(&self, path: &str, body: Option<Value>) -> Result<Session, SyncError> {
        let value = self.ctx.transport.request(Method::POST, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn begin(&mut self, status: SessionStatus) {
        self.ctx.busy.show();
        self.state.is_loading = true;
        self.state.status = status;
        self.persist();
    }

    fn finish(&mut self) {
        self.ctx.busy.hide();
        self.state.is_loading = false;
        self.persist();
    }

    fn set_user(&mut self, user: Option<Session>) {
        self.state.status = if user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        };
        self.state.user = user;
        self.persist();
    }

    fn persist(&self) {
        store::persist(self.ctx.store.as_ref(), SESSION_STORE_KEY, &self.state);
    }
}

fn display_or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}
