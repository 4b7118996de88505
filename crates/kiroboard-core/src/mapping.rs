//! User id to display name mapping, published as a CSV-backed Glue table
//!
//! Raw ids are collected from the source tables, resolved through the
//! identity directory, written to S3 and exposed as `user_mapping` so the
//! datasets can LEFT JOIN on them.

use crate::query::{QueryRunner, QueryService};
use crate::reconcile::{reconcile, Reconciled};
use async_trait::async_trait;
use kiroboard_aws::{AwsError, GlueClient, HttpClient, IdentityStoreClient};
use opendal::Operator;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MAPPING_TABLE: &str = "user_mapping";
pub const MAPPING_PREFIX: &str = "user-mapping/";
pub const MAPPING_KEY: &str = "user-mapping/user_mapping.csv";

/// Tables whose `userid` column feeds the mapping
pub const SOURCE_TABLES: &[&str] = &["by_user_analytic", "user_report"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to render mapping CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to upload {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: opendal::Error,
    },

    #[error("Failed to register table {table}: {source}")]
    Table {
        table: String,
        #[source]
        source: AwsError,
    },
}

/// Resolves opaque user ids to human-readable names
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Preferred name for `user_id`, `None` when the user has no usable name
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, AwsError>;
}

/// Where external tables get registered
#[async_trait]
pub trait TableCatalog: Send + Sync {
    async fn create_table(&self, database: &str, table: &TableInput) -> Result<(), AwsError>;
    async fn update_table(&self, database: &str, table: &TableInput) -> Result<(), AwsError>;
}

/// Identity Center store lookups
pub struct IdentityStoreDirectory<H: HttpClient> {
    client: IdentityStoreClient<H>,
    identity_store_id: String,
}

impl<H: HttpClient> IdentityStoreDirectory<H> {
    pub fn new(client: IdentityStoreClient<H>, identity_store_id: impl Into<String>) -> Self {
        Self {
            client,
            identity_store_id: identity_store_id.into(),
        }
    }
}

#[async_trait]
impl<H: HttpClient> IdentityDirectory for IdentityStoreDirectory<H> {
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, AwsError> {
        let user = self
            .client
            .describe_user(&self.identity_store_id, user_id)
            .await?;
        Ok(user.preferred_name().map(str::to_string))
    }
}

#[async_trait]
impl<H: HttpClient> TableCatalog for GlueClient<H> {
    async fn create_table(&self, database: &str, table: &TableInput) -> Result<(), AwsError> {
        GlueClient::create_table(self, database, table).await
    }

    async fn update_table(&self, database: &str, table: &TableInput) -> Result<(), AwsError> {
        GlueClient::update_table(self, database, table).await
    }
}

/// Glue `TableInput` for an external table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableInput {
    pub name: String,
    pub storage_descriptor: StorageDescriptor,
    pub table_type: String,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageDescriptor {
    pub columns: Vec<TableColumn>,
    pub location: String,
    pub input_format: String,
    pub output_format: String,
    pub serde_info: SerDeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "Type")]
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SerDeInfo {
    pub serialization_library: String,
    pub parameters: BTreeMap<String, String>,
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// CSV external table over `s3://{bucket}/user-mapping/`, header row skipped
pub fn mapping_table_input(bucket: &str) -> TableInput {
    TableInput {
        name: MAPPING_TABLE.to_string(),
        storage_descriptor: StorageDescriptor {
            columns: ["userid", "username"]
                .iter()
                .map(|name| TableColumn {
                    name: name.to_string(),
                    column_type: "string".to_string(),
                })
                .collect(),
            location: format!("s3://{}/{}", bucket, MAPPING_PREFIX),
            input_format: "org.apache.hadoop.mapred.TextInputFormat".to_string(),
            output_format: "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat"
                .to_string(),
            serde_info: SerDeInfo {
                serialization_library: "org.apache.hadoop.hive.serde2.OpenCSVSerde".to_string(),
                parameters: string_map(&[
                    ("separatorChar", ","),
                    ("quoteChar", "\""),
                    ("escapeChar", "\\"),
                ]),
            },
        },
        table_type: "EXTERNAL_TABLE".to_string(),
        parameters: string_map(&[("skip.header.line.count", "1"), ("classification", "csv")]),
    }
}

/// One row of the mapping file; `user_id` is kept exactly as the source tables store it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMapping {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug)]
pub struct SyncReport {
    pub mappings: Vec<UserMapping>,
    /// Source tables whose query failed
    pub skipped_tables: Vec<String>,
    pub location: String,
    pub table: Reconciled,
    /// First rows read back from the table, empty if verification failed
    pub preview: Vec<Vec<String>>,
}

/// Strip quotes the CSV serde may keep, then whitespace
pub fn clean_user_id(raw: &str) -> &str {
    raw.trim_matches('"').trim()
}

/// `userid,username` header plus one record per mapping
pub fn render_csv(mappings: &[UserMapping]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["userid", "username"])?;
    for mapping in mappings {
        writer.write_record([mapping.user_id.as_str(), mapping.display_name.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Regenerates the mapping file and table from scratch
pub struct UserMappingSync<'a, Q, D, C> {
    runner: &'a QueryRunner<Q>,
    directory: &'a D,
    catalog: &'a C,
    store: &'a Operator,
    database: String,
    bucket: String,
}

impl<'a, Q, D, C> UserMappingSync<'a, Q, D, C>
where
    Q: QueryService,
    D: IdentityDirectory,
    C: TableCatalog,
{
    pub fn new(
        runner: &'a QueryRunner<Q>,
        directory: &'a D,
        catalog: &'a C,
        store: &'a Operator,
        database: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            directory,
            catalog,
            store,
            database: database.into(),
            bucket: bucket.into(),
        }
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let (raw_ids, skipped_tables) = self.collect_user_ids().await;
        info!(users = raw_ids.len(), "Collected distinct user ids");

        let mappings = self.resolve(&raw_ids).await;

        let body = render_csv(&mappings)?;
        self.upload(body).await?;
        let location = format!("s3://{}/{}", self.bucket, MAPPING_KEY);
        info!(location = %location, rows = mappings.len(), "Uploaded user mapping");

        let table = self.register_table().await?;

        let preview = self.verify().await;

        Ok(SyncReport {
            mappings,
            skipped_tables,
            location,
            table,
            preview,
        })
    }

    /// Distinct non-empty raw ids across the source tables, in sorted order
    async fn collect_user_ids(&self) -> (BTreeSet<String>, Vec<String>) {
        let mut raw_ids = BTreeSet::new();
        let mut skipped = Vec::new();

        for table in SOURCE_TABLES {
            let sql = format!("SELECT DISTINCT userid FROM {}.{}", self.database, table);
            match self.runner.run_query(&sql).await {
                Ok(rows) => {
                    raw_ids.extend(
                        rows.into_iter()
                            .filter_map(|row| row.into_iter().next())
                            .filter(|id| !id.is_empty()),
                    );
                }
                Err(e) => {
                    warn!(table = %table, error = %e, "Skipping source table");
                    skipped.push(table.to_string());
                }
            }
        }

        (raw_ids, skipped)
    }

    async fn resolve(&self, raw_ids: &BTreeSet<String>) -> Vec<UserMapping> {
        let mut mappings = Vec::with_capacity(raw_ids.len());

        for raw in raw_ids {
            let clean = clean_user_id(raw);
            if clean.is_empty() {
                continue;
            }

            let display_name = match self.directory.display_name(clean).await {
                Ok(Some(name)) => name,
                Ok(None) => clean.to_string(),
                Err(e) => {
                    debug!(user_id = clean, error = %e, "Identity lookup failed, using id");
                    clean.to_string()
                }
            };
            debug!(user_id = %raw, name = %display_name, "Resolved user");

            mappings.push(UserMapping {
                user_id: raw.clone(),
                display_name,
            });
        }

        mappings
    }

    async fn upload(&self, body: Vec<u8>) -> Result<(), SyncError> {
        let mut write = self.store.write_with(MAPPING_KEY, body);
        if self.store.info().full_capability().write_with_content_type {
            write = write.content_type("text/csv");
        }
        write.await.map_err(|source| SyncError::Upload {
            key: MAPPING_KEY.to_string(),
            source,
        })?;
        Ok(())
    }

    async fn register_table(&self) -> Result<Reconciled, SyncError> {
        let catalog = self.catalog;
        let database = self.database.as_str();

        reconcile(
            "table",
            MAPPING_TABLE,
            mapping_table_input(&self.bucket),
            |input| async move { catalog.create_table(database, &input).await },
            |input| async move { catalog.update_table(database, &input).await },
            AwsError::is_already_exists,
        )
        .await
        .map_err(|source| SyncError::Table {
            table: format!("{}.{}", database, MAPPING_TABLE),
            source,
        })
    }

    /// Read a few rows back; failures are only logged
    async fn verify(&self) -> Vec<Vec<String>> {
        let sql = format!("SELECT * FROM {}.{} LIMIT 5", self.database, MAPPING_TABLE);
        match self.runner.run_query(&sql).await {
            Ok(rows) => {
                for row in &rows {
                    info!(row = %row.join(" -> "), "Mapping table row");
                }
                rows
            }
            Err(e) => {
                warn!(error = %e, "Could not verify mapping table");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fake::{rows, FakeQueryService, Script};
    use crate::query::PollPolicy;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Directory that knows some users and fails for the rest
    struct FakeDirectory {
        names: HashMap<&'static str, Option<&'static str>>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeDirectory {
        fn new(names: &[(&'static str, Option<&'static str>)]) -> Self {
            Self {
                names: names.iter().copied().collect(),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IdentityDirectory for FakeDirectory {
        async fn display_name(&self, user_id: &str) -> Result<Option<String>, AwsError> {
            self.lookups.lock().unwrap().push(user_id.to_string());
            match self.names.get(user_id) {
                Some(name) => Ok(name.map(str::to_string)),
                None => Err(AwsError::service(
                    "identitystore",
                    "DescribeUser",
                    400,
                    "ResourceNotFoundException",
                    "no such user",
                )),
            }
        }
    }

    /// Catalog where the table may already exist
    #[derive(Default)]
    struct FakeCatalog {
        exists: bool,
        calls: Mutex<Vec<(&'static str, TableInput)>>,
    }

    #[async_trait]
    impl TableCatalog for FakeCatalog {
        async fn create_table(&self, _database: &str, table: &TableInput) -> Result<(), AwsError> {
            self.calls.lock().unwrap().push(("create", table.clone()));
            if self.exists {
                return Err(AwsError::service("glue", "CreateTable", 400, "AlreadyExistsException", ""));
            }
            Ok(())
        }

        async fn update_table(&self, _database: &str, table: &TableInput) -> Result<(), AwsError> {
            self.calls.lock().unwrap().push(("update", table.clone()));
            Ok(())
        }
    }

    fn memory_store() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish()
    }

    fn runner(scripts: Vec<Script>) -> QueryRunner<FakeQueryService> {
        QueryRunner::new(
            FakeQueryService::new(scripts),
            PollPolicy {
                interval: Duration::from_secs(2),
                timeout: None,
            },
        )
    }

    fn read_csv(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_clean_user_id() {
        assert_eq!(clean_user_id("u1"), "u1");
        assert_eq!(clean_user_id("\"u2\""), "u2");
        assert_eq!(clean_user_id(" \" u3 \" "), "\" u3 \"");
        assert_eq!(clean_user_id("\"  \""), "");
    }

    #[test]
    fn test_table_input_shape() {
        let value = serde_json::to_value(mapping_table_input("kiro-reports")).unwrap();
        assert_eq!(value["Name"], "user_mapping");
        assert_eq!(value["TableType"], "EXTERNAL_TABLE");
        assert_eq!(value["Parameters"]["skip.header.line.count"], "1");
        let sd = &value["StorageDescriptor"];
        assert_eq!(sd["Location"], "s3://kiro-reports/user-mapping/");
        assert_eq!(sd["Columns"][1], serde_json::json!({"Name": "username", "Type": "string"}));
        assert_eq!(
            sd["SerdeInfo"]["SerializationLibrary"],
            "org.apache.hadoop.hive.serde2.OpenCSVSerde"
        );
        assert_eq!(sd["SerdeInfo"]["Parameters"]["escapeChar"], "\\");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_resolves_and_uploads() {
        let runner = runner(vec![
            Script::Rows {
                running_polls: 1,
                pages: vec![rows(&[&["userid"], &["u1"], &["\"u2\""], &["u3"], &[""]])],
            },
            Script::Rows {
                running_polls: 0,
                pages: vec![rows(&[&["userid"], &["u1"]])],
            },
            Script::Rows {
                running_polls: 0,
                pages: vec![rows(&[&["userid", "username"], &["u1", "Alice"]])],
            },
        ]);
        let directory = FakeDirectory::new(&[("u1", Some("Alice")), ("u2", Some("Bob"))]);
        let catalog = FakeCatalog::default();
        let store = memory_store();

        let sync = UserMappingSync::new(&runner, &directory, &catalog, &store, "kiro_analytics", "kiro-reports");
        let report = sync.run().await.unwrap();

        assert_eq!(
            *directory.lookups.lock().unwrap(),
            vec!["u2".to_string(), "u1".to_string(), "u3".to_string()]
        );
        assert_eq!(
            report.mappings,
            vec![
                UserMapping { user_id: "\"u2\"".to_string(), display_name: "Bob".to_string() },
                UserMapping { user_id: "u1".to_string(), display_name: "Alice".to_string() },
                UserMapping { user_id: "u3".to_string(), display_name: "u3".to_string() },
            ]
        );
        assert!(report.skipped_tables.is_empty());
        assert_eq!(report.table, Reconciled::Created);
        assert_eq!(report.location, "s3://kiro-reports/user-mapping/user_mapping.csv");
        assert_eq!(report.preview, rows(&[&["u1", "Alice"]]));

        let uploaded = store.read(MAPPING_KEY).await.unwrap().to_vec();
        assert_eq!(
            read_csv(&uploaded),
            rows(&[&["userid", "username"], &["\"u2\"", "Bob"], &["u1", "Alice"], &["u3", "u3"]])
        );

        let submitted = runner_sql(&runner);
        assert_eq!(submitted[0], "SELECT DISTINCT userid FROM kiro_analytics.by_user_analytic");
        assert_eq!(submitted[1], "SELECT DISTINCT userid FROM kiro_analytics.user_report");
        assert_eq!(submitted[2], "SELECT * FROM kiro_analytics.user_mapping LIMIT 5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ids_across_tables_yield_one_row_each() {
        let runner = runner(vec![
            Script::Rows {
                running_polls: 0,
                pages: vec![rows(&[&["userid"], &["A"], &["B"]])],
            },
            Script::Rows {
                running_polls: 0,
                pages: vec![rows(&[&["userid"], &["A"]])],
            },
        ]);
        let directory = FakeDirectory::new(&[("A", None), ("B", Some("Bea"))]);
        let catalog = FakeCatalog::default();
        let store = memory_store();

        let report = UserMappingSync::new(&runner, &directory, &catalog, &store, "db", "bucket")
            .run()
            .await
            .unwrap();

        assert_eq!(report.mappings.len(), 2);
        assert_eq!(report.mappings[0].display_name, "A");
        assert_eq!(report.mappings[1].display_name, "Bea");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_table_is_skipped_and_table_updated() {
        let runner = runner(vec![
            Script::Fail("TABLE_NOT_FOUND".to_string()),
            Script::Rows {
                running_polls: 0,
                pages: vec![rows(&[&["userid"], &["u9"]])],
            },
            Script::Fail("verification failed".to_string()),
        ]);
        let directory = FakeDirectory::new(&[]);
        let catalog = FakeCatalog {
            exists: true,
            ..Default::default()
        };
        let store = memory_store();

        let report = UserMappingSync::new(&runner, &directory, &catalog, &store, "db", "bucket")
            .run()
            .await
            .unwrap();

        assert_eq!(report.skipped_tables, vec!["by_user_analytic".to_string()]);
        assert_eq!(report.mappings[0].display_name, "u9");
        assert_eq!(report.table, Reconciled::Updated);
        assert!(report.preview.is_empty());

        let calls = catalog.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "update");
        assert_eq!(calls[1].1, mapping_table_input("bucket"));
    }

    fn runner_sql(runner: &QueryRunner<FakeQueryService>) -> Vec<String> {
        runner.service().submitted()
    }
}
