use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const STATE_DIR_NAME: &str = ".posts-sync";
const COOKIE_FILE_NAME: &str = "cookies";

/// Resolved runtime settings. Flags win over environment (which includes
/// whatever `.env` provided), and both win over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub state_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Settings {
    pub fn resolve(
        server: Option<String>,
        state_dir: Option<PathBuf>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                home.join(STATE_DIR_NAME)
            }
        };

        Ok(Self {
            api_url: server.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            state_dir,
            timeout: timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }

    /// Where the auth cookies are kept between runs.
    pub fn cookie_file(&self) -> PathBuf {
        self.state_dir.join(COOKIE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(
            Some("http://api.test".into()),
            Some(dir.path().to_path_buf()),
            Some(30),
        )
        .unwrap();

        assert_eq!(settings.api_url, "http://api.test");
        assert_eq!(settings.state_dir, dir.path());
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.cookie_file(), dir.path().join("cookies"));
    }

    #[test]
    fn defaults_have_no_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(None, Some(dir.path().to_path_buf()), Some(0)).unwrap();

        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.timeout, None);
    }
}
