use super::{AppConfig, IdentityCenterConfig, LogFormat};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "KIROBOARD_";

/// Abstraction over environment-variable lookups so tests can supply
/// their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the KIROBOARD_ prefix
    /// Used for AWS standard variables (AWS_REGION, etc.)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut AppConfig, env: &E) -> Result<()> {
    // AWS account
    if let Some(region) = get_env_string(env, "AWS_REGION")? {
        config.aws.region = region;
    } else if config.aws.region.is_empty() {
        // Fall back to the standard AWS variable only when the file left it blank
        if let Some(region) = get_raw_env_string(env, "AWS_REGION")? {
            config.aws.region = region;
        }
    }
    if let Some(account_id) = get_env_string(env, "AWS_ACCOUNT_ID")? {
        config.aws.account_id = account_id;
    }

    // QuickSight
    if let Some(user_arn) = get_env_string(env, "QUICKSIGHT_USER_ARN")? {
        config.quicksight.user_arn = user_arn;
    }

    // Storage + catalog
    if let Some(bucket) = get_env_string(env, "S3_BUCKET")? {
        config.s3.bucket_name = bucket;
    }
    if let Some(database) = get_env_string(env, "GLUE_DATABASE")? {
        config.glue.database_name = database;
    }
    if let Some(store_id) = get_env_string(env, "IDENTITY_STORE_ID")? {
        config.identity_center = Some(IdentityCenterConfig {
            identity_store_id: store_id,
        });
    }

    // Athena
    if let Some(workgroup) = get_env_string(env, "ATHENA_WORKGROUP")? {
        config.athena.workgroup = workgroup;
    }
    if let Some(secs) = get_env_u64(env, "POLL_INTERVAL_SECS")? {
        config.athena.poll_interval_secs = secs;
    }
    if let Some(secs) = get_env_u64(env, "QUERY_TIMEOUT_SECS")? {
        config.athena.query_timeout_secs = secs;
    }
    if let Some(path) = get_env_string(env, "VIEWS_SQL_PATH")? {
        config.athena.views_sql_path = path;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid KIROBOARD_LOG_FORMAT value")?;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key).filter(|val| !val.trim().is_empty()))
}

/// Get a raw environment variable without the KIROBOARD_ prefix
fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get_raw(key).filter(|val| !val.trim().is_empty()))
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
