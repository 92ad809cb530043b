use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 30;

/// WebDAV connection configuration for one driver instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDAVConfig {
    pub server_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// "nextcloud", "owncloud", "generic" (Synology and plain servers)
    pub server_type: Option<String>,
    /// Path probed by the diagnostic auth/read/write stages
    #[serde(default = "default_path")]
    pub default_path: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECONDS
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECONDS
}

impl WebDAVConfig {
    pub fn new(server_url: &str, username: &str, password: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            server_type: None,
            default_path: default_path(),
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            read_timeout_seconds: DEFAULT_READ_TIMEOUT_SECONDS,
        }
    }

    /// Load configuration from `WEBDAV_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = lookup("WEBDAV_SERVER_URL")
            .ok_or_else(|| anyhow!("WEBDAV_SERVER_URL must be set"))?;

        let parse_seconds = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, raw, e)),
                None => Ok(default),
            }
        };

        let config = Self {
            server_url,
            username: lookup("WEBDAV_USERNAME").unwrap_or_default(),
            password: lookup("WEBDAV_PASSWORD").unwrap_or_default(),
            server_type: lookup("WEBDAV_SERVER_TYPE").filter(|s| !s.trim().is_empty()),
            default_path: lookup("WEBDAV_DEFAULT_PATH").unwrap_or_else(default_path),
            connect_timeout_seconds: parse_seconds(
                "WEBDAV_CONNECT_TIMEOUT_SECONDS",
                DEFAULT_CONNECT_TIMEOUT_SECONDS,
            )?,
            read_timeout_seconds: parse_seconds(
                "WEBDAV_READ_TIMEOUT_SECONDS",
                DEFAULT_READ_TIMEOUT_SECONDS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let server_url = self.server_url.trim();
        if server_url.is_empty() {
            return Err(anyhow!("Server URL is required"));
        }
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(anyhow!(
                "Server URL must start with http:// or https://: {}",
                server_url
            ));
        }
        url::Url::parse(server_url)
            .map_err(|e| anyhow!("Invalid server URL '{}': {}", server_url, e))?;
        if self.connect_timeout_seconds == 0 || self.read_timeout_seconds == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }
        Ok(())
    }

    pub fn normalize_server_url(url: &str) -> String {
        url.trim().trim_end_matches('/').to_string()
    }

    /// Base URL of the DAV root for the configured server type, without trailing slash
    pub fn webdav_url(&self) -> String {
        let base = Self::normalize_server_url(&self.server_url);
        if base.contains("/remote.php/") {
            return base;
        }

        match self.server_type.as_deref() {
            Some("nextcloud") => format!(
                "{}/remote.php/dav/files/{}",
                base,
                urlencoding::encode(&self.username)
            ),
            Some("owncloud") => format!("{}/remote.php/webdav", base),
            _ => base,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.webdav_url(), &self.username, &self.password)
    }
}

/// Decrypted credentials owned by a single driver instance
#[derive(Clone)]
pub struct Credentials {
    server_base_url: String,
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(server_base_url: &str, username: &str, password: &str) -> Self {
        Self {
            server_base_url: server_base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn server_base_url(&self) -> &str {
        &self.server_base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn masked_password(&self) -> String {
        if self.password.chars().count() <= 4 {
            return "****".to_string();
        }
        let prefix: String = self.password.chars().take(2).collect();
        format!("{}****", prefix)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_base_url", &self.server_base_url)
            .field("username", &self.username)
            .field("password", &self.masked_password())
            .finish()
    }
}
