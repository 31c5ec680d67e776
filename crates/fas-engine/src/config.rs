//! Supervisor and generator configuration, and their validation.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use fas_core::{ResourceNames, DEFAULT_RESOURCES};
use fas_shm::{RingConfig, ShmError};

/// How long the supervisor blocks on an empty ring before it re-checks
/// for a stop request and for a producer that died mid-push.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by `validate()` before any system object is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Ring names or capacity are invalid.
    Ring(ShmError),
    /// A solution limit of zero would stop before reading anything.
    ZeroSolutionLimit,
    /// The poll interval must be positive.
    ZeroPollInterval,
    /// An iteration limit of zero would stop before searching.
    ZeroIterations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ring(e) => write!(f, "ring: {e}"),
            Self::ZeroSolutionLimit => write!(f, "solution limit must be at least 1"),
            Self::ZeroPollInterval => write!(f, "poll interval must be positive"),
            Self::ZeroIterations => write!(f, "iteration limit must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ring(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShmError> for ConfigError {
    fn from(e: ShmError) -> Self {
        Self::Ring(e)
    }
}

// ── SupervisorConfig ───────────────────────────────────────────────

/// Configuration for a [`Supervisor`](crate::Supervisor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Names and capacity of the ring to create.
    pub ring: RingConfig,
    /// Stop after this many slots have been read. `None` runs until a
    /// signal or an acyclicity proof.
    pub solution_limit: Option<u64>,
    /// Upper bound on a single blocking pop. Default: 1s.
    pub poll_interval: Duration,
}

impl SupervisorConfig {
    /// Check all fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ring.validate()?;
        if self.solution_limit == Some(0) {
            return Err(ConfigError::ZeroSolutionLimit);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            solution_limit: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ── GeneratorConfig ────────────────────────────────────────────────

/// Configuration for a [`Generator`](crate::Generator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Names of the ring to attach to.
    pub names: ResourceNames,
    /// Seed for the vertex shuffles. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Stop after this many candidates. `None` runs until shutdown.
    pub max_iterations: Option<u64>,
}

impl GeneratorConfig {
    /// Check all fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.names.validate().map_err(|name| {
            ConfigError::Ring(ShmError::InvalidName {
                name: name.to_string(),
            })
        })?;
        if self.max_iterations == Some(0) {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            names: DEFAULT_RESOURCES,
            seed: None,
            max_iterations: None,
        }
    }
}
