//! Connection settings for the Azure DevOps adapter.

use std::str::FromStr;
use std::time::Duration;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Read an optional variable through `lookup`, falling back to `default`.
pub fn parse_var<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

/// Organization, credentials, and HTTP settings.
#[derive(Clone)]
pub struct AzdoConfig {
    /// Organization name, e.g. `contoso`.
    pub organization: String,
    /// Personal access token sent as the basic-auth password.
    pub pat: String,
    /// Organization URL (default: `https://dev.azure.com/{organization}`).
    pub base_url: String,
    /// REST `api-version` query value (default: `7.1`).
    pub api_version: String,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl AzdoConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                     | Default                              |
    /// |-----------------------------|--------------------------------------|
    /// | `AZDO_ORGANIZATION`         | required                             |
    /// | `AZDO_PAT`                  | required                             |
    /// | `AZDO_BASE_URL`             | `https://dev.azure.com/{org}`        |
    /// | `AZDO_API_VERSION`          | `7.1`                                |
    /// | `AZDO_REQUEST_TIMEOUT_SECS` | `30`                                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let organization = required(&lookup, "AZDO_ORGANIZATION")?;
        let pat = required(&lookup, "AZDO_PAT")?;
        let base_url = lookup("AZDO_BASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("https://dev.azure.com/{organization}"));
        let api_version = lookup("AZDO_API_VERSION").unwrap_or_else(|| "7.1".into());
        let request_timeout_secs = parse_var(&lookup, "AZDO_REQUEST_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            organization,
            pat,
            base_url,
            api_version,
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// The token must never end up in logs.
impl std::fmt::Debug for AzdoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzdoConfig")
            .field("organization", &self.organization)
            .field("pat", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
