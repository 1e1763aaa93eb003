use crate::error::SyncError;
use crate::models::ErrorResponse;
use crate::store::write_private;
use crate::transport::{Method, Transport};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// reqwest-backed [`Transport`].
///
/// Cookies set by the `auth/*` endpoints are kept in a jar and replayed on
/// every later request. With a cookie file the jar also outlives the process:
/// it is loaded on construction and rewritten after every response.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    cookies: Arc<Jar>,
    cookie_file: Option<PathBuf>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SyncError> {
        Self::build(base_url.into(), timeout, None)
    }

    /// Client whose cookies are kept in `path` between runs.
    pub fn with_cookie_file(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, SyncError> {
        let client = Self::build(base_url.into(), timeout, Some(path.into()))?;
        client.restore_cookies()?;
        Ok(client)
    }

    fn build(
        base_url: String,
        timeout: Option<Duration>,
        cookie_file: Option<PathBuf>,
    ) -> Result<Self, SyncError> {
        let cookies = Arc::new(Jar::default());
        let mut builder = Client::builder().cookie_provider(cookies.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            cookies,
            cookie_file,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Cookie` header the jar would send to the base URL, if any.
    pub fn session_cookies(&self) -> Option<String> {
        let url = self.cookie_url().ok()?;
        let header = self.cookies.cookies(&url)?;
        header.to_str().ok().map(str::to_string)
    }

    fn cookie_url(&self) -> Result<Url, SyncError> {
        Url::parse(&self.base_url).map_err(|e| {
            SyncError::StorageError(format!("Invalid base URL {}: {}", self.base_url, e))
        })
    }

    fn restore_cookies(&self) -> Result<(), SyncError> {
        let Some(path) = &self.cookie_file else {
            return Ok(());
        };
        let header = match fs::read_to_string(path) {
            Ok(header) => header,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(SyncError::StorageError(format!(
                    "Failed to read {:?}: {}",
                    path, e
                )))
            }
        };

        let url = self.cookie_url()?;
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies.add_cookie_str(pair, &url);
        }
        tracing::debug!("Restored cookies from {:?}", path);
        Ok(())
    }

    fn save_cookies(&self, path: &Path) -> Result<(), SyncError> {
        match self.session_cookies() {
            Some(header) => write_private(path, &header),
            None => match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(
                    SyncError::StorageError(format!("Failed to remove {:?}: {}", path, e)),
                ),
                _ => Ok(()),
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, SyncError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(ErrorResponse {
                message: Some(message),
                ..
            }) => message,
            _ if !text.trim().is_empty() => text,
            _ => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        Err(SyncError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SyncError> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if let Some(path) = &self.cookie_file {
            if let Err(e) = self.save_cookies(path) {
                tracing::warn!("Failed to save cookies: {}", e);
            }
        }
        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::HttpClient;
    use crate::error::SyncError;
    use crate::transport::Transport;
    use httpmock::prelude::*;
    use reqwest::Method as HttpMethod;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn posts_json_and_decodes_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({"email": "ann@example.com", "password": "Secret#123"}));
                then.status(200)
                    .json_body(json!({"_id": "u1", "name": "Ann", "email": "ann@example.com"}));
            })
            .await;

        let client = HttpClient::new(server.url("/api/")).unwrap();
        let body = client
            .request(
                HttpMethod::POST,
                "auth/login",
                Some(json!({"email": "ann@example.com", "password": "Secret#123"})),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["name"], "Ann");
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/posts/a");
                then.status(204);
            })
            .await;

        let client = HttpClient::new(server.base_url()).unwrap();
        let body = client.request(HttpMethod::DELETE, "posts/a", None).await.unwrap();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/posts");
                then.status(400)
                    .json_body(json!({"status": 400, "message": "bad title"}));
            })
            .await;

        let client = HttpClient::new(server.base_url()).unwrap();
        let err = client
            .request(HttpMethod::POST, "posts", Some(json!({"title": ""})))
            .await
            .unwrap_err();

        match err {
            SyncError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad title");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_is_kept_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/autologin");
                then.status(404).body("no session");
            })
            .await;

        let client = HttpClient::new(server.base_url()).unwrap();
        let err = client
            .request(HttpMethod::POST, "auth/autologin", None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404: no session");
    }

    #[tokio::test]
    async fn cookies_carry_over_to_a_new_client() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200)
                    .header("set-cookie", "sid=abc; Path=/")
                    .json_body(json!({"_id": "u1", "name": "Ann"}));
            })
            .await;
        let authorized = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/posts").header("cookie", "sid=abc");
                then.status(200).json_body(json!({"post": {"_id": "p1"}}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies");

        let first =
            HttpClient::with_cookie_file(server.url("/api/"), None, &cookie_file).unwrap();
        first
            .request(HttpMethod::POST, "auth/login", Some(json!({"email": "ann@example.com"})))
            .await
            .unwrap();
        login.assert_async().await;
        assert_eq!(first.session_cookies().as_deref(), Some("sid=abc"));
        drop(first);

        let second =
            HttpClient::with_cookie_file(server.url("/api/"), None, &cookie_file).unwrap();
        let body = second
            .request(HttpMethod::POST, "posts", Some(json!({"title": "T"})))
            .await
            .unwrap();

        authorized.assert_async().await;
        assert_eq!(body["post"]["_id"], "p1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cookie_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/login");
                then.status(200).header("set-cookie", "sid=abc; Path=/");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies");
        let client = HttpClient::with_cookie_file(server.base_url(), None, &cookie_file).unwrap();
        client.request(HttpMethod::POST, "auth/login", None).await.unwrap();

        let mode = std::fs::metadata(&cookie_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&cookie_file).unwrap(), "sid=abc");
    }

    #[tokio::test]
    async fn without_cookies_the_file_is_removed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/logout");
                then.status(200)
                    .header("set-cookie", "sid=; Path=/; Max-Age=0");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies");
        std::fs::write(&cookie_file, "sid=abc").unwrap();

        let client = HttpClient::with_cookie_file(server.base_url(), None, &cookie_file).unwrap();
        assert_eq!(client.session_cookies().as_deref(), Some("sid=abc"));
        client.request(HttpMethod::POST, "auth/logout", None).await.unwrap();

        assert_eq!(client.session_cookies(), None);
        assert!(!cookie_file.exists());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let client = HttpClient::new("http://127.0.0.1:1").unwrap();
        let err = client.request(HttpMethod::GET, "posts/a", None).await.unwrap_err();

        assert!(matches!(err, SyncError::HttpError(_)));
        assert_eq!(err.status(), None);
    }
}
