//! Configuration types for conversion, playback, and the device connection.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Default frame rate used when converting videos.
pub const DEFAULT_FRAME_RATE: u8 = 16;

fn default_frame_rate() -> u8 {
    DEFAULT_FRAME_RATE
}

fn default_seek_step_secs() -> u64 {
    5
}

fn default_ffmpeg_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_use_cache() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5000
}

/// Top-level configuration shared by the converter and the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Frame rate (fps) for newly converted videos.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u8,
    /// Seconds skipped by a single seek forward or backward.
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: u64,
    /// ffmpeg executable used to decode videos.
    #[serde(default = "default_ffmpeg_program")]
    pub ffmpeg_program: PathBuf,
    /// Load and store converted streams next to their source.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Timeout for a single device request in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            seek_step_secs: default_seek_step_secs(),
            ffmpeg_program: default_ffmpeg_program(),
            use_cache: default_use_cache(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl StreamConfig {
    #[inline]
    pub fn seek_step(&self) -> Duration {
        Duration::from_secs(self.seek_step_secs)
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.seek_step_secs == 0 {
            return Err(ConfigError::InvalidSeekStep);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Address of the display device, reduced to `scheme://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceHost(String);

impl DeviceHost {
    /// Parse and validate a device address such as `http://192.168.1.170`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidHost {
            input: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(Self(url.origin().ascii_serialization()))
    }

    /// Full URL for an API path such as `/api/notify`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceHost {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceHost {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceHost> for String {
    fn from(host: DeviceHost) -> Self {
        host.0
    }
}

impl fmt::Display for DeviceHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid device host `{input}`: {reason}")]
    InvalidHost { input: String, reason: String },
    #[error("Frame rate must be between 1 and 255")]
    InvalidFrameRate,
    #[error("Seek step must be positive")]
    InvalidSeekStep,
    #[error("Request timeout must be positive")]
    InvalidTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_rate, 16);
        assert_eq!(config.seek_step(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StreamConfig = serde_json::from_str(r#"{"frame_rate": 10}"#).unwrap();
        assert_eq!(config.frame_rate, 10);
        assert_eq!(config.seek_step_secs, 5);
        assert!(config.use_cache);
        assert_eq!(config.ffmpeg_program, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = StreamConfig {
            frame_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFrameRate)
        ));
    }

    #[test]
    fn test_host_normalized_to_origin() {
        let host = DeviceHost::parse("http://192.168.1.170/some/path?q=1").unwrap();
        assert_eq!(host.as_str(), "http://192.168.1.170");
        assert_eq!(host.endpoint("/api/notify"), "http://192.168.1.170/api/notify");

        let host: DeviceHost = "https://clock.local:8443".parse().unwrap();
        assert_eq!(host.as_str(), "https://clock.local:8443");
    }

    #[test]
    fn test_bare_address_with_scheme() {
        // The form used in the crate docs and CLI help
        let host = DeviceHost::parse("http://192.168.1.170").unwrap();
        assert_eq!(host.to_string(), "http://192.168.1.170");
        assert_eq!(host.endpoint("/api/screen"), "http://192.168.1.170/api/screen");
    }

    #[test]
    fn test_invalid_hosts() {
        for raw in ["", "192.168.1.170", "ftp://clock.local", "mailto:me@example.com"] {
            assert!(
                matches!(DeviceHost::parse(raw), Err(ConfigError::InvalidHost { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_host_serde() {
        let host: DeviceHost = serde_json::from_str(r#""http://10.0.0.2""#).unwrap();
        assert_eq!(host.to_string(), "http://10.0.0.2");
        assert!(serde_json::from_str::<DeviceHost>(r#""nope""#).is_err());
    }
}
