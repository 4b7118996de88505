use anyhow::{Context, Result};
use kiroboard_config::AppConfig;
use kiroboard_core::views::{create_views, parse_statements};
use kiroboard_core::{ViewReport, ViewStatement};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use crate::Services;

/// Read and split the views script
pub fn load_statements(path: &Path) -> Result<Vec<ViewStatement>> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read views script: {}", path.display()))?;
    Ok(parse_statements(&script))
}

pub(super) async fn run(config: &AppConfig, services: &Services) -> Result<ExitCode> {
    let statements = load_statements(Path::new(&config.athena.views_sql_path))?;
    info!(
        path = %config.athena.views_sql_path,
        workgroup = %config.athena.workgroup,
        "Loaded {} view statements",
        statements.len()
    );

    let runner = services.query_runner(config);
    let report = create_views(&runner, &statements).await;

    Ok(exit_code(&report))
}

/// Any failed statement fails the process
fn exit_code(report: &ViewReport) -> ExitCode {
    if report.is_success() {
        info!(created = report.created.len(), "All views created");
        ExitCode::SUCCESS
    } else {
        error!(
            created = report.created.len(),
            failed = report.failure_count(),
            "Some views could not be created"
        );
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_statements_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "-- views\nCREATE OR REPLACE VIEW a AS SELECT 1;\nCREATE OR REPLACE VIEW b AS SELECT 2;"
        )
        .unwrap();

        let statements = load_statements(file.path()).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].name, "b");
    }

    #[test]
    fn test_one_failed_view_fails_the_process() {
        let report = ViewReport {
            created: vec!["daily_user_activity".to_string(), "user_credit_summary".to_string()],
            failed: vec![(
                "feature_adoption".to_string(),
                "SYNTAX_ERROR: line 1:8".to_string(),
            )],
        };
        assert_eq!(report.failure_count(), 1);
        assert_eq!(exit_code(&report), ExitCode::FAILURE);
    }

    #[test]
    fn test_all_views_created_succeeds() {
        let report = ViewReport {
            created: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            failed: vec![],
        };
        assert_eq!(exit_code(&report), ExitCode::SUCCESS);
    }

    #[test]
    fn test_missing_script_is_an_error() {
        let err = load_statements(Path::new("/nonexistent/create_views.sql")).unwrap_err();
        assert!(err.to_string().contains("Failed to read views script"));
    }
}
