//! Athena view creation from a SQL script

use crate::query::{QueryRunner, QueryService};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{error, info};

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)--.*$").expect("line comment pattern is valid"));

/// One `CREATE ...` statement and the view it defines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStatement {
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Default)]
pub struct ViewReport {
    pub created: Vec<String>,
    /// View name and failure reason
    pub failed: Vec<(String, String)>,
}

impl ViewReport {
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Split a script into statements
///
/// `--` comments are dropped and a new statement starts at every `CREATE`.
/// Text before the first `CREATE` is ignored, as is a trailing `;`.
pub fn parse_statements(script: &str) -> Vec<ViewStatement> {
    let content = LINE_COMMENT.replace_all(script, "");

    let starts: Vec<usize> = content.match_indices("CREATE").map(|(i, _)| i).collect();
    let mut statements = Vec::with_capacity(starts.len());

    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(content.len());
        let sql = content[start..end]
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_string();
        statements.push(ViewStatement {
            name: view_name(&sql),
            sql,
        });
    }

    statements
}

/// Text before the first `AS`, minus the `CREATE OR REPLACE VIEW` prefix
fn view_name(sql: &str) -> String {
    let head = sql.split("AS").next().unwrap_or(sql);
    head.replace("CREATE OR REPLACE VIEW", "").trim().to_string()
}

/// Run each statement in order, counting failures instead of stopping
pub async fn create_views<Q: QueryService>(
    runner: &QueryRunner<Q>,
    statements: &[ViewStatement],
) -> ViewReport {
    let mut report = ViewReport::default();
    info!(count = statements.len(), "Creating views");

    for statement in statements {
        match runner.execute(&statement.sql).await {
            Ok(execution_id) => {
                info!(view = %statement.name, execution_id = %execution_id, "View created");
                report.created.push(statement.name.clone());
            }
            Err(e) => {
                error!(view = %statement.name, error = %e, "View creation failed");
                report.failed.push((statement.name.clone(), e.to_string()));
            }
        }
    }

    report
}
