use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deployment environment. Governs auth mode defaults and fatal-condition
/// checks at startup (missing signing secret outside `dev`, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformEnv {
    Dev,
    Staging,
    Prod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Dev,
    Oidc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStoreKind {
    Local,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSize {
    Small,
    Medium,
    Large,
}

/// A cluster template: worker count and $/s rate. The planner looks these up
/// by size but never constructs cluster specs itself (spec.md §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClusterTemplate {
    pub workers: u32,
    pub cost_per_second_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub burst_multiplier: f64,
    pub default_limit: u32,
    pub auth_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            burst_multiplier: 1.5,
            default_limit: 60,
            auth_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBudgetConfig {
    pub daily_cap_usd: f64,
    pub monthly_cap_usd: f64,
    pub input_cost_per_million_usd: f64,
    pub output_cost_per_million_usd: f64,
}

impl Default for LlmBudgetConfig {
    fn default() -> Self {
        Self {
            daily_cap_usd: 10.0,
            monthly_cap_usd: 200.0,
            input_cost_per_million_usd: 3.0,
            output_cost_per_million_usd: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_classify_secs: u64,
    pub ttl_cost_prediction_secs: u64,
    pub ttl_sql_optimization_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl_classify_secs: 3600,
            ttl_cost_prediction_secs: 900,
            ttl_sql_optimization_secs: 1800,
        }
    }
}

/// Every configurable knob enumerated in spec.md §6. No untyped attribute
/// bag: each field is explicit, typed, and documented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform_env: PlatformEnv,
    pub auth_mode: AuthMode,
    pub state_store: StateStoreKind,
    pub default_cluster_size: ClusterSize,
    pub cluster_templates: HashMap<String, ClusterTemplate>,
    pub max_retries: u32,
    pub lookback_days: u32,
    pub lock_ttl_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub csrf_cookie_max_age_secs: u64,
    pub llm_budget: LlmBudgetConfig,
    pub cache: CacheConfig,
    pub raw_event_retention_days: u32,
    pub hourly_aggregate_retention_days: u32,
    pub jwt_signing_secret: Option<String>,
    pub encryption_key: Option<String>,
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut cluster_templates = HashMap::new();
        cluster_templates.insert(
            "small".to_string(),
            ClusterTemplate {
                workers: 2,
                cost_per_second_usd: 0.0005,
            },
        );
        cluster_templates.insert(
            "medium".to_string(),
            ClusterTemplate {
                workers: 8,
                cost_per_second_usd: 0.002,
            },
        );
        cluster_templates.insert(
            "large".to_string(),
            ClusterTemplate {
                workers: 32,
                cost_per_second_usd: 0.008,
            },
        );

        Self {
            platform_env: PlatformEnv::Dev,
            auth_mode: AuthMode::Dev,
            state_store: StateStoreKind::Local,
            default_cluster_size: ClusterSize::Medium,
            cluster_templates,
            max_retries: 3,
            lookback_days: 7,
            lock_ttl_secs: 30,
            rate_limit: RateLimitConfig::default(),
            csrf_cookie_max_age_secs: 86_400,
            llm_budget: LlmBudgetConfig::default(),
            cache: CacheConfig::default(),
            raw_event_retention_days: 30,
            hourly_aggregate_retention_days: 365,
            jwt_signing_secret: None,
            encryption_key: None,
            database_url: None,
        }
    }
}

impl Config {
    /// Fatal-condition check run at process start. Refuses to start rather
    /// than run with missing secrets outside dev (spec.md §7).
    pub fn validate_for_startup(&self) -> Result<(), String> {
        if self.platform_env != PlatformEnv::Dev {
            if self.jwt_signing_secret.is_none() {
                return Err("missing JWT signing secret outside dev".to_string());
            }
            if self.encryption_key.is_none() {
                return Err("missing encryption key outside dev".to_string());
            }
            if self.state_store == StateStoreKind::Postgres && self.database_url.is_none() {
                return Err("database URL absent".to_string());
            }
        }
        Ok(())
    }

    pub fn cluster_template(&self, size: ClusterSize) -> ClusterTemplate {
        let key = match size {
            ClusterSize::Small => "small",
            ClusterSize::Medium => "medium",
            ClusterSize::Large => "large",
        };
        self.cluster_templates
            .get(key)
            .copied()
            .unwrap_or(ClusterTemplate {
                workers: 4,
                cost_per_second_usd: 0.001,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_config_validates_without_secrets() {
        let cfg = Config::default();
        assert!(cfg.validate_for_startup().is_ok());
    }

    #[test]
    fn prod_config_requires_secrets() {
        let mut cfg = Config::default();
        cfg.platform_env = PlatformEnv::Prod;
        assert!(cfg.validate_for_startup().is_err());
        cfg.jwt_signing_secret = Some("s".into());
        cfg.encryption_key = Some("k".into());
        assert!(cfg.validate_for_startup().is_ok());
    }
}
