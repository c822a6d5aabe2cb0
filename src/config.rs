//! Claimer configuration.
//!
//! Defaults target the live Mojang / Minecraft services endpoints. Every
//! field can be overridden through [`crate::NameClaimerBuilder`] or loaded
//! from JSON with [`ClaimerConfig::from_json_str`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ClaimError, ClaimResult};

pub const DEFAULT_LEAD_TIME: Duration = Duration::from_secs(20);
pub const DEFAULT_CLAIM_PORT: u16 = 443;
/// `HTTP/x.y SSS` is twelve bytes.
pub const DEFAULT_STATUS_PREFIX_LEN: usize = 12;
/// Upper bound on the status read buffer.
pub const MAX_STATUS_PREFIX_LEN: usize = 64;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub authenticate: String,
    pub security_challenges: String,
    pub security_location: String,
    pub profile: String,
    pub name_change: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            authenticate: "https://authserver.mojang.com/authenticate".into(),
            security_challenges: "https://api.mojang.com/user/security/challenges".into(),
            security_location: "https://api.mojang.com/user/security/location".into(),
            profile: "https://api.minecraftservices.com/minecraft/profile".into(),
            name_change: "https://api.minecraftservices.com/minecraft/profile/namechange".into(),
        }
    }
}

/// Configuration used by [`crate::NameClaimer`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClaimerConfig {
    pub endpoints: ProviderEndpoints,
    pub claim_host: String,
    pub claim_port: u16,
    #[serde(with = "duration_secs")]
    pub lead_time: Duration,
    pub status_prefix_len: usize,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for ClaimerConfig {
    fn default() -> Self {
        Self {
            endpoints: ProviderEndpoints::default(),
            claim_host: "api.minecraftservices.com".into(),
            claim_port: DEFAULT_CLAIM_PORT,
            lead_time: DEFAULT_LEAD_TIME,
            status_prefix_len: DEFAULT_STATUS_PREFIX_LEN,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: None,
        }
    }
}

impl ClaimerConfig {
    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json_str(raw: &str) -> ClaimResult<Self> {
        let config: ClaimerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClaimResult<()> {
        if self.claim_host.trim().is_empty() {
            return Err(ClaimError::Config("claim_host must not be empty".into()));
        }
        if !(DEFAULT_STATUS_PREFIX_LEN..=MAX_STATUS_PREFIX_LEN).contains(&self.status_prefix_len) {
            return Err(ClaimError::Config(format!(
                "status_prefix_len must be between {DEFAULT_STATUS_PREFIX_LEN} and {MAX_STATUS_PREFIX_LEN}"
            )));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(D::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_live_service() {
        let config = ClaimerConfig::default();
        assert_eq!(config.claim_port, 443);
        assert_eq!(config.lead_time, Duration::from_secs(20));
        assert_eq!(config.status_prefix_len, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_partial_json() {
        let config = ClaimerConfig::from_json_str(
            r#"{"lead_time": 5.5, "claim_host": "profiles.example.com"}"#,
        )
        .unwrap();
        assert_eq!(config.lead_time, Duration::from_millis(5500));
        assert_eq!(config.claim_host, "profiles.example.com");
        assert_eq!(config.claim_port, DEFAULT_CLAIM_PORT);
        assert_eq!(config.endpoints, ProviderEndpoints::default());
    }

    #[test]
    fn rejects_short_status_prefix() {
        let err = ClaimerConfig::from_json_str(r#"{"status_prefix_len": 4}"#).unwrap_err();
        assert!(matches!(err, ClaimError::Config(_)));
    }

    #[test]
    fn bounds_status_prefix() {
        let config = ClaimerConfig::from_json_str(r#"{"status_prefix_len": 64}"#).unwrap();
        assert_eq!(config.status_prefix_len, MAX_STATUS_PREFIX_LEN);

        let err = ClaimerConfig::from_json_str(r#"{"status_prefix_len": 1000000000}"#).unwrap_err();
        assert!(matches!(err, ClaimError::Config(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        assert!(ClaimerConfig::from_json_str(r#"{"lead_time": -1}"#).is_err());
    }
}
