// kiroboard-config - Settings shared by every kiroboard command
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Explicit file path (--config flag)
// 3. Config file path from KIROBOARD_CONFIG env var
// 4. Default config file location (./config.yaml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};

/// Top-level settings loaded from `config.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub quicksight: QuickSightConfig,

    #[serde(default)]
    pub glue: GlueConfig,

    #[serde(default)]
    pub s3: S3Config,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_center: Option<IdentityCenterConfig>,

    #[serde(default)]
    pub athena: AthenaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickSightConfig {
    /// Principal granted permissions on every created resource
    #[serde(default)]
    pub user_arn: String,
    #[serde(default)]
    pub data_source_name: String,
    /// Display name of the behavioral dataset
    #[serde(default)]
    pub dataset_name: String,
    #[serde(default)]
    pub dashboards: Vec<DashboardEntry>,
}

/// One analysis to provision; the analysis id is `{id}-analysis`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlueConfig {
    #[serde(default)]
    pub database_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub bucket_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCenterConfig {
    pub identity_store_id: String,
}

/// Athena workgroup and polling behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    #[serde(default = "default_workgroup")]
    pub workgroup: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 0 waits for a terminal state forever
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_views_sql_path")]
    pub views_sql_path: String,
}

fn default_workgroup() -> String {
    "kiro-analytics-workgroup".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_query_timeout_secs() -> u64 {
    600
}

fn default_views_sql_path() -> String {
    "sql/create_views.sql".to_string()
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            workgroup: default_workgroup(),
            poll_interval_secs: default_poll_interval_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            views_sql_path: default_views_sql_path(),
        }
    }
}

impl AthenaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// `None` when polling is unbounded
    pub fn query_timeout(&self) -> Option<Duration> {
        match self.query_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl AppConfig {
    /// Load from `path` if given, otherwise from the default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => sources::load_from_file_path(path),
            None => sources::load_config(),
        }
    }

    /// Parse YAML text without consulting the environment (useful for testing)
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validate fields every command needs
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Non-fatal findings from validation, for logging once tracing is up
    pub fn warnings(&self) -> Vec<String> {
        validation::collect_warnings(self)
    }

    /// Principal granted permissions on every QuickSight resource
    pub fn user_arn(&self) -> Result<&str> {
        required(&self.quicksight.user_arn, "quicksight.user_arn", "QUICKSIGHT_USER_ARN")
    }

    pub fn database_name(&self) -> Result<&str> {
        required(&self.glue.database_name, "glue.database_name", "GLUE_DATABASE")
    }

    pub fn bucket_name(&self) -> Result<&str> {
        required(&self.s3.bucket_name, "s3.bucket_name", "S3_BUCKET")
    }

    /// Identity store id, required only by the user mapping sync
    pub fn identity_store_id(&self) -> Result<&str> {
        self.identity_center
            .as_ref()
            .map(|ic| ic.identity_store_id.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "identity_center.identity_store_id is required to resolve user names \
                    (set it in config.yaml or KIROBOARD_IDENTITY_STORE_ID)"
                )
            })
    }
}

fn required<'a>(value: &'a str, field: &str, env_key: &str) -> Result<&'a str> {
    if value.is_empty() {
        anyhow::bail!(
            "{} is required for this command (set it in config.yaml or {}{})",
            field,
            ENV_PREFIX,
            env_key
        );
    }
    Ok(value)
}
