use anyhow::{Result, anyhow};
use dotenv::dotenv;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://whisper-transcriber-backend.onrender.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const BASE_URL_VAR: &str = "TRANSCRIBE_API_URL";
const TIMEOUT_VAR: &str = "TRANSCRIBE_TIMEOUT_SECS";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Flags win over the environment, which wins over the built-in defaults.
    pub fn resolve(server_url: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        dotenv().ok();
        Self::resolve_with(server_url, timeout_secs, |key| std::env::var(key).ok())
    }

    /// `resolve` with an explicit variable lookup. Blank values count as unset.
    pub fn resolve_with<F>(
        server_url: Option<String>,
        timeout_secs: Option<u64>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env_var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = server_url
            .or_else(|| get_env_var(BASE_URL_VAR))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = match timeout_secs {
            Some(secs) => secs,
            None => match get_env_var(TIMEOUT_VAR) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("{} must be a number of seconds", TIMEOUT_VAR))?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        Ok(Self::new(base_url, timeout_secs))
    }

    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            base_url,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    pub fn transcribe_url(&self) -> String {
        format!("{}/transcribe", self.base_url.trim_end_matches('/'))
    }
}
