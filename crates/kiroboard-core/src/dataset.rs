//! Direct-query datasets joined with the user mapping table
//!
//! Both datasets follow the same layout: the source table, the mapping table
//! with `userid` renamed to `map_userid`, and a LEFT join projecting the
//! source columns plus `username`.

use crate::definition::data_source_arn;
use crate::mapping::MAPPING_TABLE;
use crate::permissions::{PermissionSet, ResourcePermission};
use crate::reconcile::{reconcile, Reconciled};
use crate::AccountScope;
use kiroboard_aws::{AwsError, HttpClient, QuickSightClient};
use serde::Serialize;
use std::collections::BTreeMap;

pub const ACTIVITY_DATASET_ID: &str = "kiro-user-activity-dataset";
pub const CREDITS_DATASET_ID: &str = "kiro-user-credits-dataset";
pub const CREDITS_DATASET_NAME: &str = "KiroUserCreditsDataset";

pub const ACTIVITY_TABLE: &str = "by_user_analytic";
pub const CREDITS_TABLE: &str = "user_report";

const CATALOG: &str = "AwsDataCatalog";
const JOIN_KEY: &str = "map_userid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
}

const ACTIVITY_COLUMNS: &[(&str, ColumnType)] = &[
    ("date", ColumnType::String),
    ("userid", ColumnType::String),
    ("chat_aicodelines", ColumnType::Integer),
    ("chat_messagesinteracted", ColumnType::Integer),
    ("chat_messagessent", ColumnType::Integer),
    ("inline_aicodelines", ColumnType::Integer),
    ("inline_acceptancecount", ColumnType::Integer),
    ("inline_suggestionscount", ColumnType::Integer),
    ("codefix_generationeventcount", ColumnType::Integer),
    ("codefix_acceptanceeventcount", ColumnType::Integer),
    ("codereview_findingscount", ColumnType::Integer),
    ("codereview_succeededeventcount", ColumnType::Integer),
    ("dev_generationeventcount", ColumnType::Integer),
    ("dev_acceptanceeventcount", ColumnType::Integer),
    ("dev_generatedlines", ColumnType::Integer),
    ("testgeneration_eventcount", ColumnType::Integer),
    ("testgeneration_acceptedtests", ColumnType::Integer),
    ("inlinechat_totaleventcount", ColumnType::Integer),
    ("inlinechat_acceptanceeventcount", ColumnType::Integer),
    ("docgeneration_eventcount", ColumnType::Integer),
    ("docgeneration_acceptedfilescreations", ColumnType::Integer),
    ("transformation_eventcount", ColumnType::Integer),
    ("transformation_linesgenerated", ColumnType::Integer),
];

const CREDITS_COLUMNS: &[(&str, ColumnType)] = &[
    ("date", ColumnType::String),
    ("userid", ColumnType::String),
    ("client_type", ColumnType::String),
    ("subscription_tier", ColumnType::String),
    ("total_messages", ColumnType::Integer),
    ("chat_conversations", ColumnType::Integer),
    ("credits_used", ColumnType::Decimal),
    ("overage_cap", ColumnType::Decimal),
    ("overage_credits_used", ColumnType::Decimal),
    ("overage_enabled", ColumnType::String),
    ("profileid", ColumnType::String),
];

const MAPPING_COLUMNS: &[(&str, ColumnType)] = &[
    ("userid", ColumnType::String),
    ("username", ColumnType::String),
];

/// Everything but the id; this is also the update body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetDocument {
    pub name: String,
    pub physical_table_map: BTreeMap<String, PhysicalTable>,
    pub logical_table_map: BTreeMap<String, LogicalTable>,
    pub import_mode: ImportMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    DirectQuery,
    Spice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalTable {
    pub relational_table: RelationalTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationalTable {
    pub data_source_arn: String,
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub input_columns: Vec<InputColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputColumn {
    pub name: String,
    #[serde(rename = "Type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogicalTable {
    pub alias: String,
    pub source: LogicalTableSource,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_transforms: Vec<TransformOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LogicalTableSource {
    #[serde(rename = "PhysicalTableId")]
    PhysicalTable(String),
    #[serde(rename = "JoinInstruction")]
    Join(JoinInstruction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JoinInstruction {
    pub left_operand: String,
    pub right_operand: String,
    #[serde(rename = "Type")]
    pub join_type: JoinType,
    pub on_clause: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransformOperation {
    #[serde(rename = "RenameColumnOperation", rename_all = "PascalCase")]
    RenameColumn {
        column_name: String,
        new_column_name: String,
    },
    #[serde(rename = "ProjectOperation", rename_all = "PascalCase")]
    Project { projected_columns: Vec<String> },
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateDataSetRequest<'a> {
    data_set_id: &'a str,
    #[serde(flatten)]
    document: &'a DataSetDocument,
    permissions: &'a [ResourcePermission],
}

/// Layout of one source table joined with the mapping table
struct JoinedSource {
    /// Physical table id, also the prefix of the logical ids and aliases
    key: &'static str,
    mapping_key: &'static str,
    table: &'static str,
    columns: &'static [(&'static str, ColumnType)],
}

const ACTIVITY: JoinedSource = JoinedSource {
    key: "activity",
    mapping_key: "mapping",
    table: ACTIVITY_TABLE,
    columns: ACTIVITY_COLUMNS,
};

const CREDITS: JoinedSource = JoinedSource {
    key: "credits",
    mapping_key: "mapping2",
    table: CREDITS_TABLE,
    columns: CREDITS_COLUMNS,
};

fn relational_table(
    data_source_arn: &str,
    database: &str,
    table: &str,
    columns: &[(&str, ColumnType)],
) -> PhysicalTable {
    PhysicalTable {
        relational_table: RelationalTable {
            data_source_arn: data_source_arn.to_string(),
            catalog: CATALOG.to_string(),
            schema: database.to_string(),
            name: table.to_string(),
            input_columns: columns
                .iter()
                .map(|(name, column_type)| InputColumn {
                    name: name.to_string(),
                    column_type: *column_type,
                })
                .collect(),
        },
    }
}

/// Source columns with `username` inserted right after `userid`
fn projected_columns(columns: &[(&str, ColumnType)]) -> Vec<String> {
    let mut projected = Vec::with_capacity(columns.len() + 1);
    for (name, _) in columns {
        projected.push(name.to_string());
        if *name == "userid" {
            projected.push("username".to_string());
        }
    }
    projected
}

fn joined_dataset(
    source: &JoinedSource,
    name: &str,
    data_source_arn: &str,
    database: &str,
) -> DataSetDocument {
    let base_id = format!("{}-base", source.key);
    let mapping_base_id = format!("{}-base", source.mapping_key);

    let physical_table_map = BTreeMap::from([
        (
            source.key.to_string(),
            relational_table(data_source_arn, database, source.table, source.columns),
        ),
        (
            source.mapping_key.to_string(),
            relational_table(data_source_arn, database, MAPPING_TABLE, MAPPING_COLUMNS),
        ),
    ]);

    let logical_table_map = BTreeMap::from([
        (
            base_id.clone(),
            LogicalTable {
                alias: format!("{}_data", source.key),
                source: LogicalTableSource::PhysicalTable(source.key.to_string()),
                data_transforms: Vec::new(),
            },
        ),
        (
            mapping_base_id.clone(),
            LogicalTable {
                alias: format!("user_{}", source.mapping_key),
                source: LogicalTableSource::PhysicalTable(source.mapping_key.to_string()),
                data_transforms: vec![TransformOperation::RenameColumn {
                    column_name: "userid".to_string(),
                    new_column_name: JOIN_KEY.to_string(),
                }],
            },
        ),
        (
            format!("{}-joined", source.key),
            LogicalTable {
                alias: format!("{}_with_username", source.key),
                source: LogicalTableSource::Join(JoinInstruction {
                    left_operand: base_id,
                    right_operand: mapping_base_id,
                    join_type: JoinType::Left,
                    on_clause: format!("userid = {}", JOIN_KEY),
                }),
                data_transforms: vec![TransformOperation::Project {
                    projected_columns: projected_columns(source.columns),
                }],
            },
        ),
    ]);

    DataSetDocument {
        name: name.to_string(),
        physical_table_map,
        logical_table_map,
        import_mode: ImportMode::DirectQuery,
    }
}

/// Behavioral dataset over `by_user_analytic`
pub fn activity_dataset(
    scope: &AccountScope,
    name: &str,
    data_source_id: &str,
    database: &str,
) -> DataSetDocument {
    let arn = data_source_arn(scope, data_source_id);
    joined_dataset(&ACTIVITY, name, &arn, database)
}

/// Credits dataset over `user_report`
pub fn credits_dataset(scope: &AccountScope, data_source_id: &str, database: &str) -> DataSetDocument {
    let arn = data_source_arn(scope, data_source_id);
    joined_dataset(&CREDITS, CREDITS_DATASET_NAME, &arn, database)
}

pub async fn reconcile_dataset<H: HttpClient>(
    quicksight: &QuickSightClient<H>,
    data_set_id: &str,
    document: DataSetDocument,
    principal: &str,
) -> Result<Reconciled, AwsError> {
    let permissions = PermissionSet::DataSet.grant(principal);

    reconcile(
        "dataset",
        data_set_id,
        document,
        |document| async move {
            quicksight
                .create_data_set(&CreateDataSetRequest {
                    data_set_id,
                    document: &document,
                    permissions: &permissions,
                })
                .await
        },
        |document| async move { quicksight.update_data_set(data_set_id, &document).await },
        AwsError::is_already_exists,
    )
    .await
}
