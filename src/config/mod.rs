// Configuration loading and management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "adsync")]
    pub adsync: AdsyncBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdsyncBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub freshness: Option<Freshness>,
    pub locks: Option<Locks>,
    pub backoff: Option<Backoff>,
    pub dispatch: Option<Dispatch>,
    pub queue: Option<Queue>,
    pub auth: Option<Auth>,
    pub metrics: Option<Metrics>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Freshness {
    #[serde(rename = "fresh_threshold", with = "humantime_serde")]
    pub fresh_threshold: Duration,
    #[serde(rename = "stale_threshold", with = "humantime_serde")]
    pub stale_threshold: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Locks {
    #[serde(with = "humantime_serde", default)]
    pub ttl: Option<Duration>,
    #[serde(rename = "contention_wait", with = "humantime_serde", default)]
    pub contention_wait: Option<Duration>,
    #[serde(rename = "poll_interval", with = "humantime_serde", default)]
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Backoff {
    #[serde(with = "humantime_serde", default)]
    pub fallback: Option<Duration>,
    #[serde(rename = "error_cooldown", with = "humantime_serde", default)]
    pub error_cooldown: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Dispatch {
    #[serde(rename = "fetch_timeout", with = "humantime_serde", default)]
    pub fetch_timeout: Option<Duration>,
    #[serde(rename = "max_background_tasks")]
    pub max_background_tasks: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Queue {
    pub workers: Option<usize>,
    #[serde(rename = "rate_limit_per_sec")]
    pub rate_limit_per_sec: Option<u32>,
    #[serde(rename = "heartbeat_interval", with = "humantime_serde", default)]
    pub heartbeat_interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Auth {
    #[serde(rename = "operator_token")]
    pub operator_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metrics {
    pub enabled: bool,
}

/// Accessors with defaults for optional sections.
pub trait ConfigTrait {
    fn env(&self) -> &str;
    fn is_prod(&self) -> bool;
    fn logs(&self) -> Option<&Logs>;
    fn api(&self) -> Option<&Api>;
    fn fresh_threshold(&self) -> Duration;
    fn stale_threshold(&self) -> Duration;
    fn lock_ttl(&self) -> Duration;
    fn contention_wait(&self) -> Duration;
    fn contention_poll_interval(&self) -> Duration;
    fn backoff_fallback(&self) -> Duration;
    fn error_cooldown(&self) -> Duration;
    fn fetch_timeout(&self) -> Duration;
    fn max_background_tasks(&self) -> usize;
    fn queue_workers(&self) -> usize;
    fn queue_rate_limit(&self) -> u32;
    fn heartbeat_interval(&self) -> Duration;
    fn operator_token(&self) -> Option<&str>;
    fn metrics_enabled(&self) -> bool;
}

impl Config {
    /// Loads and validates config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let cfg: Config = serde_yaml::from_str(&raw).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Builds an in-memory config for tests and embedded use.
    pub fn for_env(env: &str) -> Self {
        Self {
            adsync: AdsyncBox {
                env: env.to_string(),
                logs: None,
                api: None,
                freshness: None,
                locks: None,
                backoff: None,
                dispatch: None,
                queue: None,
                auth: None,
                metrics: None,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref freshness) = self.adsync.freshness {
            if freshness.fresh_threshold >= freshness.stale_threshold {
                bail!(
                    "freshness.fresh_threshold ({:?}) must be below stale_threshold ({:?})",
                    freshness.fresh_threshold,
                    freshness.stale_threshold
                );
            }
        }
        if self.fresh_threshold() >= self.stale_threshold() {
            bail!("fresh threshold must be below stale threshold");
        }
        Ok(())
    }
}

impl ConfigTrait for Config {
    fn env(&self) -> &str {
        &self.adsync.env
    }

    fn is_prod(&self) -> bool {
        self.adsync.env == PROD
    }

    fn logs(&self) -> Option<&Logs> {
        self.adsync.logs.as_ref()
    }

    fn api(&self) -> Option<&Api> {
        self.adsync.api.as_ref()
    }

    fn fresh_threshold(&self) -> Duration {
        self.adsync
            .freshness
            .as_ref()
            .map(|f| f.fresh_threshold)
            .unwrap_or(Duration::from_secs(15 * 60))
    }

    fn stale_threshold(&self) -> Duration {
        self.adsync
            .freshness
            .as_ref()
            .map(|f| f.stale_threshold)
            .unwrap_or(Duration::from_secs(6 * 3600))
    }

    fn lock_ttl(&self) -> Duration {
        self.adsync
            .locks
            .as_ref()
            .and_then(|l| l.ttl)
            .unwrap_or(Duration::from_secs(180))
    }

    fn contention_wait(&self) -> Duration {
        self.adsync
            .locks
            .as_ref()
            .and_then(|l| l.contention_wait)
            .unwrap_or(Duration::from_secs(2))
    }

    fn contention_poll_interval(&self) -> Duration {
        self.adsync
            .locks
            .as_ref()
            .and_then(|l| l.poll_interval)
            .unwrap_or(Duration::from_millis(100))
    }

    fn backoff_fallback(&self) -> Duration {
        self.adsync
            .backoff
            .as_ref()
            .and_then(|b| b.fallback)
            .unwrap_or(Duration::from_secs(60))
    }

    fn error_cooldown(&self) -> Duration {
        self.adsync
            .backoff
            .as_ref()
            .and_then(|b| b.error_cooldown)
            .unwrap_or(Duration::from_secs(15))
    }

    fn fetch_timeout(&self) -> Duration {
        self.adsync
            .dispatch
            .as_ref()
            .and_then(|d| d.fetch_timeout)
            .unwrap_or(Duration::from_secs(30))
    }

    fn max_background_tasks(&self) -> usize {
        self.adsync
            .dispatch
            .as_ref()
            .and_then(|d| d.max_background_tasks)
            .unwrap_or(64)
    }

    fn queue_workers(&self) -> usize {
        self.adsync.queue.as_ref().and_then(|q| q.workers).unwrap_or(2)
    }

    fn queue_rate_limit(&self) -> u32 {
        self.adsync
            .queue
            .as_ref()
            .and_then(|q| q.rate_limit_per_sec)
            .unwrap_or(5)
    }

    fn heartbeat_interval(&self) -> Duration {
        self.adsync
            .queue
            .as_ref()
            .and_then(|q| q.heartbeat_interval)
            .unwrap_or(Duration::from_secs(10))
    }

    fn operator_token(&self) -> Option<&str> {
        self.adsync
            .auth
            .as_ref()
            .and_then(|a| a.operator_token.as_deref())
    }

    fn metrics_enabled(&self) -> bool {
        self.adsync.metrics.as_ref().map(|m| m.enabled).unwrap_or(true)
    }
}
