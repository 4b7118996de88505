//! Athena query execution API

use crate::error::Result;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::protocol::{Empty, JsonRpcClient};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const SERVICE: &str = "athena";
const TARGET_PREFIX: &str = "AmazonAthena";

/// Lifecycle state reported by `GetQueryExecution`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl QueryExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryExecutionStatus {
    pub state: QueryExecutionState,
    #[serde(default)]
    pub state_change_reason: Option<String>,
}

/// One page of `GetQueryResults`, flattened to string cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Vec<String>>,
    pub next_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionRequest<'a> {
    query_string: &'a str,
    work_group: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionResponse {
    query_execution_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionIdRequest<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionResponse {
    query_execution: QueryExecution,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: QueryExecutionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsResponse {
    result_set: ResultSet,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Row {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    #[serde(default)]
    var_char_value: Option<String>,
}

/// Athena client
pub struct AthenaClient<H: HttpClient> {
    rpc: JsonRpcClient<H>,
}

impl<H: HttpClient> AthenaClient<H> {
    pub fn new(http: H, endpoint: String) -> Self {
        Self {
            rpc: JsonRpcClient::new(http, endpoint, SERVICE, TARGET_PREFIX),
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self {
            rpc: self.rpc.with_retry_policy(retry),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    /// Submit `sql` and return the execution id
    #[instrument(skip(self, sql))]
    pub async fn start_query_execution(&self, sql: &str, workgroup: &str) -> Result<String> {
        let response: StartQueryExecutionResponse = self
            .rpc
            .call(
                "StartQueryExecution",
                &StartQueryExecutionRequest {
                    query_string: sql,
                    work_group: workgroup,
                },
            )
            .await?;
        Ok(response.query_execution_id)
    }

    pub async fn get_query_execution(&self, execution_id: &str) -> Result<QueryExecutionStatus> {
        let response: GetQueryExecutionResponse = self
            .rpc
            .call(
                "GetQueryExecution",
                &QueryExecutionIdRequest {
                    query_execution_id: execution_id,
                    next_token: None,
                },
            )
            .await?;
        Ok(response.query_execution.status)
    }

    /// Fetch one page of results; missing `VarCharValue` cells become ""
    pub async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let response: GetQueryResultsResponse = self
            .rpc
            .call(
                "GetQueryResults",
                &QueryExecutionIdRequest {
                    query_execution_id: execution_id,
                    next_token,
                },
            )
            .await?;

        let rows = response
            .result_set
            .rows
            .into_iter()
            .map(|row| {
                row.data
                    .into_iter()
                    .map(|datum| datum.var_char_value.unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(ResultPage {
            rows,
            next_token: response.next_token,
        })
    }

    pub async fn stop_query_execution(&self, execution_id: &str) -> Result<()> {
        let _: Empty = self
            .rpc
            .call(
                "StopQueryExecution",
                &QueryExecutionIdRequest {
                    query_execution_id: execution_id,
                    next_token: None,
                },
            )
            .await?;
        Ok(())
    }
}
