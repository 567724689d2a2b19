//! Resource configuration and the closed set of resource kinds.
//!
//! A [`ResourceConfig`] is plain data supplied by whatever loads test
//! settings. It carries the kind as a raw string so that an unsupported
//! value is rejected at acquire time with a [`ConfigurationError`] rather
//! than at deserialization time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigurationError;

/// Environment variable holding the resource kind.
pub const ENV_KIND: &str = "HANDLEKEEPER_KIND";
/// Environment variable holding the target endpoint.
pub const ENV_ENDPOINT: &str = "HANDLEKEEPER_ENDPOINT";
/// Environment variable holding the creation timeout in milliseconds.
pub const ENV_CREATION_TIMEOUT_MS: &str = "HANDLEKEEPER_CREATION_TIMEOUT_MS";

/// Default creation timeout handed to factories.
pub const DEFAULT_CREATION_TIMEOUT_MS: u64 = 30_000;

/// The kinds of resource a factory may be asked to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A locally launched Chromium-family session.
    Chromium,
    /// A locally launched Firefox session.
    Firefox,
    /// A locally launched WebKit session.
    Webkit,
    /// A session on a remote endpoint. Requires `endpoint`.
    Remote,
}

impl ResourceKind {
    /// All supported kinds.
    pub const ALL: [Self; 4] = [Self::Chromium, Self::Firefox, Self::Webkit, Self::Remote];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
            Self::Remote => "remote",
        }
    }

    /// Returns true if this kind needs an endpoint to be created.
    #[must_use]
    pub const fn requires_endpoint(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigurationError::unsupported_kind(trimmed))
    }
}

fn default_creation_timeout_ms() -> u64 {
    DEFAULT_CREATION_TIMEOUT_MS
}

/// Description of the resource to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource kind name, validated against [`ResourceKind`].
    pub kind: String,
    /// Target endpoint for remote kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// How long the factory may spend creating the resource.
    #[serde(default = "default_creation_timeout_ms")]
    pub creation_timeout_ms: u64,
}

impl ResourceConfig {
    /// Creates a configuration for the given kind name.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            endpoint: None,
            creation_timeout_ms: DEFAULT_CREATION_TIMEOUT_MS,
        }
    }

    /// Creates a configuration for a known kind.
    #[must_use]
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self::new(kind.as_str())
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the creation timeout.
    #[must_use]
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The creation timeout as a [`Duration`].
    #[must_use]
    pub const fn creation_timeout(&self) -> Duration {
        Duration::from_millis(self.creation_timeout_ms)
    }

    /// Checks the configuration and resolves its kind.
    pub fn validate(&self) -> Result<ResourceKind, ConfigurationError> {
        let kind: ResourceKind = self.kind.parse()?;

        if kind.requires_endpoint() {
            match self.endpoint.as_deref().map(str::trim) {
                Some(endpoint) if !endpoint.is_empty() => {}
                _ => return Err(ConfigurationError::missing("endpoint")),
            }
        }

        if self.creation_timeout_ms == 0 {
            return Err(ConfigurationError::new(
                "creation_timeout_ms",
                "creation timeout must be greater than zero",
            )
            .with_value("0"));
        }

        Ok(kind)
    }

    /// Loads a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads a configuration using `lookup` in place of the environment.
    pub fn from_env_with<L>(lookup: L) -> Result<Self, ConfigurationError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let kind = lookup(ENV_KIND).ok_or_else(|| ConfigurationError::missing(ENV_KIND))?;
        let mut config = Self::new(kind);

        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|e| !e.trim().is_empty()) {
            config.endpoint = Some(endpoint);
        }

        if let Some(raw) = lookup(ENV_CREATION_TIMEOUT_MS) {
            config.creation_timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigurationError::new(ENV_CREATION_TIMEOUT_MS, "expected a number of milliseconds")
                    .with_value(raw.clone())
            })?;
        }

        Ok(config)
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigurationError::new("json", format!("invalid configuration: {e}")))
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::new("path", format!("cannot read configuration: {e}"))
                .with_value(path.display().to_string())
        })?;
        Self::from_json_str(&contents)
    }
}
