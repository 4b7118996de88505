// Configuration source loading.
//
// Priority order:
// 1. Environment variables (KIROBOARD_* prefix)
// 2. Config file path from --config or KIROBOARD_CONFIG
// 3. Default config file (./config.yaml)

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::AppConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATHS: &[&str] = &["./config.yaml", "./config.yml"];

/// Load configuration from the default locations plus environment overrides.
pub fn load_config() -> Result<AppConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<AppConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        return read_yaml(Path::new(&path)).map(Some);
    }

    for path in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_yaml(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<AppConfig> {
    let mut config = read_yaml(path.as_ref())?;

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn read_yaml(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_yaml_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "aws:\n  region: us-east-1\n  account_id: '111122223333'\nglue:\n  database_name: kiro"
        )
        .unwrap();

        let config = read_yaml(file.path()).unwrap();
        assert_eq!(config.aws.account_id, "111122223333");
        assert_eq!(config.glue.database_name, "kiro");
        assert!(config.quicksight.dashboards.is_empty());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_yaml(Path::new("/nonexistent/kiroboard.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/kiroboard.yaml"));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "aws: [unterminated").unwrap();
        assert!(read_yaml(file.path()).is_err());
    }
}
