use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::pipeline::ClusterParams;
use crate::pipeline::config::{
    DEFAULT_DECAY_HOURS, DEFAULT_POINTS_PER_SOURCE, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_WINDOW_HOURS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    db_dsn: String,
    db_max_connections: u32,
    db_acquire_timeout: Duration,
    cluster_params: ClusterParams,
    cluster_interval: Option<Duration>,
    trigger_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から Story Worker の設定値を読み込み、検証する。
    ///
    /// # Errors
    /// 数値／アドレスのパースに失敗した場合、またはクラスタリングパラメータが範囲外の場合は
    /// [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let db_dsn = vars.string_or("STORY_DB_DSN", "sqlite://data/news.db?mode=rwc");
        if db_dsn.trim().is_empty() {
            return Err(ConfigError::Missing("STORY_DB_DSN"));
        }
        let http_bind = vars.parse_or("STORY_WORKER_HTTP_BIND", "0.0.0.0:9010".parse().ok())?;
        let db_max_connections = vars.parse_or("STORY_DB_MAX_CONNECTIONS", Some(5_u32))?;
        let db_acquire_timeout =
            Duration::from_secs(vars.parse_or("STORY_DB_ACQUIRE_TIMEOUT_SECS", Some(30_u64))?);

        // Clustering defaults (overridable per run)
        let cluster_params = ClusterParams {
            window_hours: vars.parse_or("STORY_WINDOW_HOURS", Some(DEFAULT_WINDOW_HOURS))?,
            similarity_threshold: vars.parse_or(
                "STORY_SIMILARITY_THRESHOLD",
                Some(DEFAULT_SIMILARITY_THRESHOLD),
            )?,
            points_per_source: vars
                .parse_or("STORY_POINTS_PER_SOURCE", Some(DEFAULT_POINTS_PER_SOURCE))?,
            decay_hours: vars.parse_or("STORY_DECAY_HOURS", Some(DEFAULT_DECAY_HOURS))?,
        };
        cluster_params
            .validate()
            .map_err(|error| ConfigError::Invalid {
                name: "STORY_* cluster parameters",
                source: error.into(),
            })?;

        // 0 disables the in-process daemon
        let interval_minutes: u64 = vars.parse_or("STORY_CLUSTER_INTERVAL_MINUTES", Some(30))?;
        let cluster_interval = match interval_minutes {
            0 => None,
            minutes => Some(cluster_interval_from_minutes(minutes)?),
        };

        let trigger_token = vars
            .optional("STORY_TRIGGER_TOKEN")
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            http_bind,
            db_dsn,
            db_max_connections,
            db_acquire_timeout,
            cluster_params,
            cluster_interval,
            trigger_token,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn db_dsn(&self) -> &str {
        &self.db_dsn
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    #[must_use]
    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    #[must_use]
    pub fn cluster_params(&self) -> ClusterParams {
        self.cluster_params
    }

    #[must_use]
    pub fn cluster_interval(&self) -> Option<Duration> {
        self.cluster_interval
    }

    #[must_use]
    pub fn trigger_token(&self) -> Option<&str> {
        self.trigger_token.as_deref()
    }
}

/// Upper bound for the daemon interval: one year.
pub const MAX_CLUSTER_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn cluster_interval_from_minutes(minutes: u64) -> Result<Duration, ConfigError> {
    minutes
        .checked_mul(60)
        .filter(|_| minutes <= MAX_CLUSTER_INTERVAL_MINUTES)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name: "STORY_CLUSTER_INTERVAL_MINUTES",
            source: anyhow::anyhow!(
                "{minutes} exceeds the maximum of {MAX_CLUSTER_INTERVAL_MINUTES} minutes"
            ),
        })
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn string_or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(name) {
            Some(raw) => raw.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
                name,
                source: error.into(),
            }),
            None => default.ok_or(ConfigError::Missing(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("config loads");

        assert_eq!(config.db_dsn(), "sqlite://data/news.db?mode=rwc");
        assert_eq!(config.http_bind(), "0.0.0.0:9010".parse().unwrap());
        assert_eq!(config.cluster_params(), ClusterParams::default());
        assert_eq!(config.cluster_interval(), Some(Duration::from_secs(1800)));
        assert_eq!(config.trigger_token(), None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("STORY_DB_DSN", "sqlite::memory:"),
            ("STORY_WINDOW_HOURS", "48"),
            ("STORY_SIMILARITY_THRESHOLD", "80"),
            ("STORY_DECAY_HOURS", "12.5"),
            ("STORY_CLUSTER_INTERVAL_MINUTES", "0"),
            ("STORY_TRIGGER_TOKEN", "secret"),
        ])
        .expect("config loads");

        assert_eq!(config.db_dsn(), "sqlite::memory:");
        assert_eq!(config.cluster_params().window_hours, 48);
        assert_eq!(config.cluster_params().similarity_threshold, 80);
        assert!((config.cluster_params().decay_hours - 12.5).abs() < f64::EPSILON);
        assert_eq!(config.cluster_interval(), None);
        assert_eq!(config.trigger_token(), Some("secret"));
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let error = load(&[("STORY_WINDOW_HOURS", "three days")]).unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "STORY_WINDOW_HOURS",
                ..
            }
        ));
    }

    #[test]
    fn rejects_threshold_above_one_hundred() {
        let error = load(&[("STORY_SIMILARITY_THRESHOLD", "150")]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { .. }));
    }

    #[test]
    fn oversized_interval_is_rejected() {
        for raw in ["18446744073709551615", "153722867280912931", "525601"] {
            let error = load(&[("STORY_CLUSTER_INTERVAL_MINUTES", raw)]).unwrap_err();
            assert!(
                matches!(
                    error,
                    ConfigError::Invalid {
                        name: "STORY_CLUSTER_INTERVAL_MINUTES",
                        ..
                    }
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn largest_interval_is_accepted() {
        let config = load(&[("STORY_CLUSTER_INTERVAL_MINUTES", "525600")]).expect("config loads");
        assert_eq!(
            config.cluster_interval(),
            Some(Duration::from_secs(MAX_CLUSTER_INTERVAL_MINUTES * 60))
        );
    }

    #[test]
    fn blank_token_counts_as_unset() {
        let config = load(&[("STORY_TRIGGER_TOKEN", "  ")]).expect("config loads");
        assert_eq!(config.trigger_token(), None);
    }
}
