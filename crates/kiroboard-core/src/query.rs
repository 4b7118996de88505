//! Athena query execution: submit, poll to a terminal state, page results

use async_trait::async_trait;
use kiroboard_aws::{
    AthenaClient, AwsError, HttpClient, QueryExecutionState, QueryExecutionStatus, ResultPage,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query {execution_id} failed: {reason}")]
    Failed {
        execution_id: String,
        reason: String,
    },

    #[error("Query {execution_id} was cancelled")]
    Cancelled { execution_id: String },

    #[error("Query {execution_id} did not finish within {timeout:?}")]
    TimedOut {
        execution_id: String,
        timeout: Duration,
    },

    #[error(transparent)]
    Aws(#[from] AwsError),
}

/// The four query operations the runner needs
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn start(&self, sql: &str) -> Result<String, AwsError>;
    async fn status(&self, execution_id: &str) -> Result<QueryExecutionStatus, AwsError>;
    async fn results_page(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AwsError>;
    async fn stop(&self, execution_id: &str) -> Result<(), AwsError>;
}

/// Athena, bound to one workgroup
pub struct AthenaQueryService<H: HttpClient> {
    client: AthenaClient<H>,
    workgroup: String,
}

impl<H: HttpClient> AthenaQueryService<H> {
    pub fn new(client: AthenaClient<H>, workgroup: impl Into<String>) -> Self {
        Self {
            client,
            workgroup: workgroup.into(),
        }
    }

    pub fn workgroup(&self) -> &str {
        &self.workgroup
    }
}

#[async_trait]
impl<H: HttpClient> QueryService for AthenaQueryService<H> {
    async fn start(&self, sql: &str) -> Result<String, AwsError> {
        self.client.start_query_execution(sql, &self.workgroup).await
    }

    async fn status(&self, execution_id: &str) -> Result<QueryExecutionStatus, AwsError> {
        self.client.get_query_execution(execution_id).await
    }

    async fn results_page(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AwsError> {
        self.client.get_query_results(execution_id, next_token).await
    }

    async fn stop(&self, execution_id: &str) -> Result<(), AwsError> {
        self.client.stop_query_execution(execution_id).await
    }
}

/// How often to poll and how long to wait overall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until a terminal state, however long that takes
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

pub struct QueryRunner<Q> {
    service: Q,
    policy: PollPolicy,
}

impl<Q: QueryService> QueryRunner<Q> {
    pub fn new(service: Q, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &Q {
        &self.service
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Run `sql` to completion and return its execution id
    #[instrument(skip(self, sql))]
    pub async fn execute(&self, sql: &str) -> Result<String, QueryError> {
        let execution_id = self.service.start(sql).await?;
        debug!(execution_id = %execution_id, "Query submitted");

        self.wait(&execution_id).await?;
        Ok(execution_id)
    }

    /// Run `sql` and return every result row except the header
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Vec<String>>, QueryError> {
        let execution_id = self.execute(sql).await?;
        let mut rows = self.fetch_rows(&execution_id).await?;
        if !rows.is_empty() {
            rows.remove(0);
        }
        Ok(rows)
    }

    async fn wait(&self, execution_id: &str) -> Result<(), QueryError> {
        let started = Instant::now();

        loop {
            let status = self.service.status(execution_id).await?;
            match status.state {
                QueryExecutionState::Succeeded => return Ok(()),
                QueryExecutionState::Failed => {
                    return Err(QueryError::Failed {
                        execution_id: execution_id.to_string(),
                        reason: status
                            .state_change_reason
                            .unwrap_or_else(|| "unknown".to_string()),
                    })
                }
                QueryExecutionState::Cancelled => {
                    return Err(QueryError::Cancelled {
                        execution_id: execution_id.to_string(),
                    })
                }
                state => debug!(execution_id, ?state, "Query still running"),
            }

            if let Some(timeout) = self.policy.timeout {
                if started.elapsed() >= timeout {
                    if let Err(e) = self.service.stop(execution_id).await {
                        warn!(execution_id, error = %e, "Failed to stop timed out query");
                    }
                    return Err(QueryError::TimedOut {
                        execution_id: execution_id.to_string(),
                        timeout,
                    });
                }
            }

            tokio::time::sleep(self.policy.interval).await;
        }
    }

    async fn fetch_rows(&self, execution_id: &str) -> Result<Vec<Vec<String>>, QueryError> {
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .service
                .results_page(execution_id, next_token.as_deref())
                .await?;
            rows.extend(page.rows);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(rows)
    }
}
