use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// ログの出力形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    min_documents: usize,
    max_documents: usize,
    request_timeout: Duration,
    clustering_enabled: bool,
    kmeans_restarts: usize,
    kmeans_max_iter: usize,
    kmeans_seed: u64,
    max_features: usize,
    max_df: f64,
    keywords_path: Option<PathBuf>,
    stopwords_path: Option<PathBuf>,
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([0, 0, 0, 0], 9010)),
            min_documents: 3,
            max_documents: 5000,
            request_timeout: Duration::from_millis(30_000),
            clustering_enabled: true,
            kmeans_restarts: 15,
            kmeans_max_iter: 300,
            kmeans_seed: 42,
            max_features: 1000,
            max_df: 0.8,
            keywords_path: None,
            stopwords_path: None,
            log_format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から分類ワーカーの設定値を読み込み、検証する。
    ///
    /// すべての変数は省略可能で、未設定ならデフォルト値を使う。
    ///
    /// # Errors
    /// 数値／アドレスのパースに失敗した場合や、範囲外の値が与えられた場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let http_bind = parse_socket_addr("NEWS_TOPIC_HTTP_BIND", "0.0.0.0:9010")?;

        // Batch limits
        let min_documents = parse_usize("NEWS_TOPIC_MIN_DOCUMENTS", defaults.min_documents)?;
        let max_documents = parse_usize("NEWS_TOPIC_MAX_DOCUMENTS", defaults.max_documents)?;
        if max_documents == 0 || max_documents < min_documents {
            return Err(ConfigError::Invalid {
                name: "NEWS_TOPIC_MAX_DOCUMENTS",
                source: anyhow::anyhow!(
                    "must be positive and at least NEWS_TOPIC_MIN_DOCUMENTS ({min_documents})"
                ),
            });
        }
        let request_timeout = parse_duration_ms("NEWS_TOPIC_REQUEST_TIMEOUT_MS", 30_000)?;

        // Clustering settings
        let clustering_enabled =
            parse_bool("NEWS_TOPIC_CLUSTERING_ENABLED", defaults.clustering_enabled)?;
        let kmeans_restarts = parse_positive("NEWS_TOPIC_KMEANS_RESTARTS", defaults.kmeans_restarts)?;
        let kmeans_max_iter = parse_positive("NEWS_TOPIC_KMEANS_MAX_ITER", defaults.kmeans_max_iter)?;
        let kmeans_seed = parse_u64("NEWS_TOPIC_KMEANS_SEED", defaults.kmeans_seed)?;
        let max_features = parse_positive("NEWS_TOPIC_MAX_FEATURES", defaults.max_features)?;
        let max_df = parse_f64("NEWS_TOPIC_MAX_DF", defaults.max_df)?;
        if !(max_df > 0.0 && max_df <= 1.0) {
            return Err(ConfigError::Invalid {
                name: "NEWS_TOPIC_MAX_DF",
                source: anyhow::anyhow!("must be in (0, 1], got {max_df}"),
            });
        }

        // Resource overrides
        let keywords_path = parse_path("NEWS_TOPIC_KEYWORDS_PATH");
        let stopwords_path = parse_path("NEWS_TOPIC_STOPWORDS_PATH");

        let log_format = parse_log_format("NEWS_TOPIC_LOG_FORMAT")?;

        Ok(Self {
            http_bind,
            min_documents,
            max_documents,
            request_timeout,
            clustering_enabled,
            kmeans_restarts,
            kmeans_max_iter,
            kmeans_seed,
            max_features,
            max_df,
            keywords_path,
            stopwords_path,
            log_format,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn min_documents(&self) -> usize {
        self.min_documents
    }

    #[must_use]
    pub fn max_documents(&self) -> usize {
        self.max_documents
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn clustering_enabled(&self) -> bool {
        self.clustering_enabled
    }

    #[must_use]
    pub fn kmeans_restarts(&self) -> usize {
        self.kmeans_restarts
    }

    #[must_use]
    pub fn kmeans_max_iter(&self) -> usize {
        self.kmeans_max_iter
    }

    #[must_use]
    pub fn kmeans_seed(&self) -> u64 {
        self.kmeans_seed
    }

    #[must_use]
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    #[must_use]
    pub fn max_df(&self) -> f64 {
        self.max_df
    }

    #[must_use]
    pub fn keywords_path(&self) -> Option<&std::path::Path> {
        self.keywords_path.as_deref()
    }

    #[must_use]
    pub fn stopwords_path(&self) -> Option<&std::path::Path> {
        self.stopwords_path.as_deref()
    }

    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// テストやベンチで一部の値だけ差し替えるためのビルダー的更新。
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_document_limits(mut self, min_documents: usize, max_documents: usize) -> Self {
        self.min_documents = min_documents;
        self.max_documents = max_documents;
        self
    }

    #[must_use]
    pub fn with_clustering_enabled(mut self, enabled: bool) -> Self {
        self.clustering_enabled = enabled;
        self
    }
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_u64(name, default_ms)?;
    if ms == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("timeout must be positive"),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_positive(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let value = parse_usize(name, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be greater than zero"),
        });
    }
    Ok(value)
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

fn parse_path(name: &'static str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_log_format(name: &'static str) -> Result<LogFormat, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(LogFormat::default());
    };
    match raw.trim().to_lowercase().as_str() {
        "json" | "" => Ok(LogFormat::Json),
        "pretty" | "text" => Ok(LogFormat::Pretty),
        other => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("unknown log format: {other}"),
        }),
    }
}
