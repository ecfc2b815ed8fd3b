//! Apply configuration parsed from environment variables.

pub const DEFAULT_APPLY_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_APPLY_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },

    #[error("config parse failed: {0}")]
    Parse(String),
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Parse(_) => "E_CONFIG_PARSE",
        }
    }
}

/// What the save pipeline does when the rotate or delete call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialFailurePolicy {
    /// Stop before the order call and report the failed stage.
    #[default]
    Abort,
    /// Log the failure, keep going, and report it as a warning.
    Continue,
}

impl PartialFailurePolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ApplyTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_APPLY_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_APPLY_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyConfig {
    pub base_url: String,
    pub timeouts: ApplyTimeouts,
    pub partial_failure: PartialFailurePolicy,
}

impl ApplyConfig {
    /// Build typed apply config from environment variables.
    ///
    /// Required:
    /// - `APPLY_BASE_URL`
    ///
    /// Optional:
    /// - `APPLY_REQUEST_TIMEOUT_SECS`: default 60
    /// - `APPLY_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SAVE_PARTIAL_FAILURE`: `abort` (default) or `continue`
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the base url is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApplyConfig::from_env`] but reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the base url is missing or a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("APPLY_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { var: "APPLY_BASE_URL" })?;

        let timeouts = ApplyTimeouts {
            request_secs: parse_u64(&lookup, "APPLY_REQUEST_TIMEOUT_SECS", DEFAULT_APPLY_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "APPLY_CONNECT_TIMEOUT_SECS", DEFAULT_APPLY_CONNECT_TIMEOUT_SECS),
        };
        let partial_failure = parse_partial_failure(lookup("SAVE_PARTIAL_FAILURE").as_deref())?;

        Ok(Self { base_url, timeouts, partial_failure })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_partial_failure(raw: Option<&str>) -> Result<PartialFailurePolicy, ConfigError> {
    match raw.map(str::trim).unwrap_or("abort") {
        "abort" => Ok(PartialFailurePolicy::Abort),
        "continue" => Ok(PartialFailurePolicy::Continue),
        other => Err(ConfigError::Parse(format!(
            "unsupported SAVE_PARTIAL_FAILURE '{other}' (expected 'abort' or 'continue')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
