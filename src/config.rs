use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_EXECUTION_TIME_SECS: u64 = 30;
pub const DEFAULT_MAX_MEMORY_MB: u64 = 512;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainPaths {
    pub python: PathBuf,
    pub node: PathBuf,
    pub gcc: PathBuf,
    pub gxx: PathBuf,
    pub javac: PathBuf,
    pub java: PathBuf,
}

impl Default for ToolchainPaths {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            node: "node".into(),
            gcc: "gcc".into(),
            gxx: "g++".into(),
            javac: "javac".into(),
            java: "java".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_execution_time: Duration,
    /// Accepted for compatibility with existing deployments. Not enforced
    /// against child processes.
    pub max_memory_mb: u64,
    pub max_output_bytes: usize,
    pub workspace_dir: PathBuf,
    pub toolchains: ToolchainPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_execution_time: Duration::from_secs(DEFAULT_MAX_EXECUTION_TIME_SECS),
            max_memory_mb: DEFAULT_MAX_MEMORY_MB,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            workspace_dir: std::env::temp_dir().join("coderunner"),
            toolchains: ToolchainPaths::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("MAX_EXECUTION_TIME") {
            config.max_execution_time = parse_seconds("MAX_EXECUTION_TIME", &value)?;
        }
        if let Some(value) = lookup("MAX_MEMORY") {
            config.max_memory_mb = parse_positive("MAX_MEMORY", &value)?;
        }
        if let Some(value) = lookup("CODERUNNER_MAX_OUTPUT_BYTES") {
            config.max_output_bytes = parse_positive("CODERUNNER_MAX_OUTPUT_BYTES", &value)?;
        }
        if let Some(value) = lookup("CODERUNNER_WORKSPACE_DIR") {
            config.workspace_dir = non_empty("CODERUNNER_WORKSPACE_DIR", value)?.into();
        }

        let toolchains = &mut config.toolchains;
        for (key, slot) in [
            ("CODERUNNER_PYTHON", &mut toolchains.python),
            ("CODERUNNER_NODE", &mut toolchains.node),
            ("CODERUNNER_GCC", &mut toolchains.gcc),
            ("CODERUNNER_GXX", &mut toolchains.gxx),
            ("CODERUNNER_JAVAC", &mut toolchains.javac),
            ("CODERUNNER_JAVA", &mut toolchains.java),
        ] {
            if let Some(value) = lookup(key) {
                *slot = non_empty(key, value)?.into();
            }
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parses a positive, finite number of seconds; `key` names the setting in
/// the error.
pub fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid(key, value, e.to_string()))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(key, value, "must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, value, e.to_string()))
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, e.to_string()))?;
    if parsed <= T::default() {
        return Err(invalid(key, value, "must be greater than zero"));
    }
    Ok(parsed)
}

fn non_empty(key: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(key, &value, "must not be empty"));
    }
    Ok(value)
}
