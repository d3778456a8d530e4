use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// How the external writer is launched.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Executable to run (default: `java`).
    pub program: String,
    /// Leading arguments; the target file path is appended after them.
    pub args: Vec<String>,
    /// Wall-clock limit for one invocation.
    pub timeout: Duration,
}

/// Write job expiry settings.
#[derive(Debug, Clone, Copy)]
pub struct JobConfig {
    /// Period of the expiry sweep.
    pub sweep_interval: Duration,
    /// Completed jobs are kept at least this long after completion.
    pub completed_grace: Duration,
    /// Any job is removed once it is this old.
    pub max_age: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            completed_grace: Duration::from_secs(10),
            max_age: Duration::from_secs(30 * 60),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`).
    pub request_timeout_secs: u64,
    /// Root for project stores and output files when a request gives no `dir`.
    pub data_root: PathBuf,
    pub writer: WriterConfig,
    pub jobs: JobConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `5000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `300`                   |
    /// | `DATA_ROOT`                | `./data`                |
    /// | `DSS_WRITER_PROGRAM`       | `java`                  |
    /// | `DSS_WRITER_ARGS`          | `-cp . DssWriter`       |
    /// | `DSS_WRITER_TIMEOUT_SECS`  | `600`                   |
    /// | `JOB_SWEEP_INTERVAL_SECS`  | `60`                    |
    /// | `JOB_COMPLETED_GRACE_SECS` | `10`                    |
    /// | `JOB_MAX_AGE_SECS`         | `1800`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port: u16 = parse_env("PORT", "5000", "u16")?;

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", "300", "u64")?;
        let data_root = PathBuf::from(env_or("DATA_ROOT", "./data"));

        let writer = WriterConfig {
            program: env_or("DSS_WRITER_PROGRAM", "java"),
            args: env_or("DSS_WRITER_ARGS", "-cp . DssWriter")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            timeout: Duration::from_secs(parse_env("DSS_WRITER_TIMEOUT_SECS", "600", "u64")?),
        };

        let jobs = JobConfig {
            sweep_interval: Duration::from_secs(parse_env("JOB_SWEEP_INTERVAL_SECS", "60", "u64")?),
            completed_grace: Duration::from_secs(parse_env("JOB_COMPLETED_GRACE_SECS", "10", "u64")?),
            max_age: Duration::from_secs(parse_env("JOB_MAX_AGE_SECS", "1800", "u64")?),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_root,
            writer,
            jobs,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T: FromStr>(
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = env_or(name, default);
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn job_defaults_match_sweep_policy() {
        let jobs = JobConfig::default();
        assert_eq!(jobs.sweep_interval, Duration::from_secs(60));
        assert_eq!(jobs.completed_grace, Duration::from_secs(10));
        assert_eq!(jobs.max_age, Duration::from_secs(1800));
    }

    #[test]
    fn unparseable_value_names_the_variable() {
        // A variable name nothing else in the test process sets.
        std::env::set_var("HYDROLINK_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16, _> = parse_env("HYDROLINK_TEST_BAD_PORT", "1", "u16");
        std::env::remove_var("HYDROLINK_TEST_BAD_PORT");

        assert_matches!(result, Err(ConfigError::Invalid { name: "HYDROLINK_TEST_BAD_PORT", .. }));
    }
}
