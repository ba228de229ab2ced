//! Input Configuration
//!
//! Where the header bytes come from and how long to wait for them.

use serde::Deserialize;
use std::time::Duration;

/// Header acquisition settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Address to bind when a port is given on the command line
    pub bind_address: String,

    /// Timeout for receiving the PROXY header in seconds.
    /// 0 waits forever. Default: 0
    pub timeout: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            timeout: 0,
        }
    }
}

impl InputConfig {
    /// Get timeout as Duration, `None` when disabled
    pub fn timeout_duration(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_disables() {
        let config = InputConfig::default();
        assert_eq!(config.timeout_duration(), None);

        let config = InputConfig {
            timeout: 5,
            ..Default::default()
        };
        assert_eq!(config.timeout_duration(), Some(Duration::from_secs(5)));
    }
}
