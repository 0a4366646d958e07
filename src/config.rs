use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Shorter poll intervals are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Runtime settings for the chat client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat server, without a trailing slash
    pub server_url: String,
    /// How often the open conversation is re-fetched
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Directory holding `session.json`; `None` means the user config dir
    pub config_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        ClientConfig {
            server_url: normalize_url(&server_url.into()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            config_dir: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config_dir = dir;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
        assert!(config.config_dir.is_none());
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let config = ClientConfig::new(" https://chat.example.com/ ");
        assert_eq!(config.server_url, "https://chat.example.com");
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let config = ClientConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);

        let config = ClientConfig::default().with_poll_interval(Duration::from_millis(500));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }
}
