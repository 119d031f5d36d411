use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_CACHE_CAPACITY};
use crate::handler::action::DEFAULT_ACTION_DELAY;
use crate::layout::LayoutSpacing;

/// Worker settings. Defaults match the canvas; every field can be overridden from the
/// environment with [`WorkerConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Simulated latency of each `action` node.
    pub action_delay: Duration,
    pub cache: CacheConfig,
    pub spacing: LayoutSpacing,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            action_delay: DEFAULT_ACTION_DELAY,
            cache: CacheConfig::default(),
            spacing: LayoutSpacing::default(),
        }
    }
}

impl WorkerConfig {
    /// Read `FLOWCANVAS_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = LayoutSpacing::default();
        Self {
            action_delay: Duration::from_millis(get_env_or(
                &lookup,
                "FLOWCANVAS_ACTION_DELAY_MS",
                DEFAULT_ACTION_DELAY.as_millis() as u64,
            )),
            cache: CacheConfig {
                capacity: get_env_or(&lookup, "FLOWCANVAS_RESULT_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY),
                ttl: get_env::<u64>(&lookup, "FLOWCANVAS_RESULT_CACHE_TTL_SECS").map(Duration::from_secs),
            },
            spacing: LayoutSpacing {
                node_sep: get_env_or(&lookup, "FLOWCANVAS_LAYOUT_NODE_SEP", defaults.node_sep),
                rank_sep: get_env_or(&lookup, "FLOWCANVAS_LAYOUT_RANK_SEP", defaults.rank_sep),
                ..defaults
            },
        }
    }
}

/// Parsed value of `key`, or `None` when unset or unparseable (logged).
fn get_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(val) => Some(val),
        Err(_) => {
            tracing::warn!(key, value = %raw, "error parsing environment variable, using default");
            None
        }
    }
}

fn get_env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get_env(lookup, key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = WorkerConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, WorkerConfig::default());
        assert_eq!(cfg.action_delay, Duration::from_millis(500));
        assert_eq!(cfg.cache.capacity, 128);
        assert_eq!(cfg.cache.ttl, None);
        assert_eq!(cfg.spacing.node_sep, 26.0);
        assert_eq!(cfg.spacing.rank_sep, 100.0);
    }

    #[test]
    fn overrides_from_environment() {
        let cfg = WorkerConfig::from_lookup(lookup(&[
            ("FLOWCANVAS_ACTION_DELAY_MS", "0"),
            ("FLOWCANVAS_RESULT_CACHE_CAPACITY", " 8 "),
            ("FLOWCANVAS_RESULT_CACHE_TTL_SECS", "60"),
            ("FLOWCANVAS_LAYOUT_RANK_SEP", "40.5"),
        ]));
        assert_eq!(cfg.action_delay, Duration::ZERO);
        assert_eq!(cfg.cache.capacity, 8);
        assert_eq!(cfg.cache.ttl, Some(Duration::from_secs(60)));
        assert_eq!(cfg.spacing.rank_sep, 40.5);
        assert_eq!(cfg.spacing.node_sep, 26.0);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let cfg = WorkerConfig::from_lookup(lookup(&[
            ("FLOWCANVAS_ACTION_DELAY_MS", "soon"),
            ("FLOWCANVAS_RESULT_CACHE_TTL_SECS", "-1"),
        ]));
        assert_eq!(cfg.action_delay, Duration::from_millis(500));
        assert_eq!(cfg.cache.ttl, None);
    }
}
