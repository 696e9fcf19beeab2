//! Runtime knobs for planning and routing.
//!
//! `Default` reads `HOLO_ROUTE_*` environment variables and silently falls
//! back on malformed values; `from_env` rejects them instead.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};

pub const ENV_MAX_POINT_RANGES: &str = "HOLO_ROUTE_MAX_POINT_RANGES";
pub const ENV_PREFER_COVERING_INDEX: &str = "HOLO_ROUTE_PREFER_COVERING_INDEX";
pub const ENV_PARALLEL_THRESHOLD: &str = "HOLO_ROUTE_PARALLEL_THRESHOLD";

const DEFAULT_MAX_POINT_RANGES: usize = 1024;
const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPlannerConfig {
    /// Cap on point combinations an index prefix may fan out into. Columns
    /// that would exceed it are left out of the prefix.
    pub max_point_ranges: usize,
    /// Break ties between equally selective paths in favor of one that needs
    /// no second read of the row.
    pub prefer_covering_index: bool,
}

impl Default for ScanPlannerConfig {
    fn default() -> Self {
        Self {
            max_point_ranges: DEFAULT_MAX_POINT_RANGES,
            prefer_covering_index: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRouterConfig {
    /// Range count at which routing fans out over the rayon pool; 0 keeps
    /// routing on the calling thread.
    pub parallel_threshold: usize,
}

impl Default for RangeRouterConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRuntimeConfig {
    pub planner: ScanPlannerConfig,
    pub router: RangeRouterConfig,
}

impl Default for RouteRuntimeConfig {
    fn default() -> Self {
        Self {
            planner: ScanPlannerConfig {
                max_point_ranges: parse_usize_env(ENV_MAX_POINT_RANGES, DEFAULT_MAX_POINT_RANGES)
                    .max(1),
                prefer_covering_index: parse_bool_env(ENV_PREFER_COVERING_INDEX, true),
            },
            router: RangeRouterConfig {
                parallel_threshold: parse_usize_env(
                    ENV_PARALLEL_THRESHOLD,
                    DEFAULT_PARALLEL_THRESHOLD,
                ),
            },
        }
    }
}

impl RouteRuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`RouteRuntimeConfig::from_env`] with a caller-supplied variable
    /// source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ScanPlannerConfig::default();
        let config = Self {
            planner: ScanPlannerConfig {
                max_point_ranges: parse_strict(&lookup, ENV_MAX_POINT_RANGES)?
                    .unwrap_or(defaults.max_point_ranges),
                prefer_covering_index: parse_strict(&lookup, ENV_PREFER_COVERING_INDEX)?
                    .unwrap_or(defaults.prefer_covering_index),
            },
            router: RangeRouterConfig {
                parallel_threshold: parse_strict(&lookup, ENV_PARALLEL_THRESHOLD)?
                    .unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.planner.max_point_ranges == 0 {
            return Err(RouteError::InvalidConfig(
                "max_point_ranges must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_strict<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RouteError::InvalidConfig(format!("{name} has malformed value '{raw}'"))
        }),
    }
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn lookup_without_overrides_yields_defaults() {
        let config = RouteRuntimeConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.planner, ScanPlannerConfig::default());
        assert_eq!(config.router, RangeRouterConfig::default());
    }

    #[test]
    fn lookup_applies_overrides() {
        let config = RouteRuntimeConfig::from_lookup(lookup(&[
            (ENV_MAX_POINT_RANGES, "16"),
            (ENV_PREFER_COVERING_INDEX, "false"),
            (ENV_PARALLEL_THRESHOLD, " 0 "),
        ]))
        .expect("config");
        assert_eq!(config.planner.max_point_ranges, 16);
        assert!(!config.planner.prefer_covering_index);
        assert_eq!(config.router.parallel_threshold, 0);
    }

    #[test]
    fn malformed_or_zero_values_are_rejected() {
        let err = RouteRuntimeConfig::from_lookup(lookup(&[(ENV_PARALLEL_THRESHOLD, "many")]))
            .expect_err("malformed");
        assert!(matches!(err, RouteError::InvalidConfig(_)));

        let err = RouteRuntimeConfig::from_lookup(lookup(&[(ENV_MAX_POINT_RANGES, "0")]))
            .expect_err("zero cap");
        assert!(matches!(err, RouteError::InvalidConfig(_)));
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: RouteRuntimeConfig =
            serde_json::from_str(r#"{"router": {"parallel_threshold": 8}}"#).expect("json");
        assert_eq!(config.router.parallel_threshold, 8);
        assert_eq!(config.planner.max_point_ranges, 1024);
    }
}
