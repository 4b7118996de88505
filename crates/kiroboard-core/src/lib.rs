//! kiroboard-core - Resource definitions and orchestration
//!
//! Everything here is independent of how requests reach AWS: QuickSight
//! payloads are plain serde documents, and the query runner and user
//! mapping sync work against small traits that the `kiroboard-aws`
//! clients implement.

pub mod analysis;
pub mod dashboard;
pub mod dataset;
pub mod datasource;
pub mod definition;
pub mod mapping;
pub mod permissions;
pub mod query;
pub mod reconcile;
pub mod views;
pub mod visual;

pub use definition::{
    data_source_arn, dataset_arn, DataSetIdentifierDeclaration, Definition, DefinitionError, Sheet,
};
pub use mapping::{
    IdentityDirectory, IdentityStoreDirectory, SyncError, SyncReport, TableCatalog, UserMapping,
    UserMappingSync,
};
pub use permissions::{PermissionSet, ResourcePermission};
pub use query::{AthenaQueryService, PollPolicy, QueryError, QueryRunner, QueryService};
pub use reconcile::{reconcile, Reconciled};
pub use views::{ViewReport, ViewStatement};
pub use visual::{Aggregation, Measure, NumericAggregation, Visual};

/// Region and account that every ARN is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountScope {
    pub region: String,
    pub account_id: String,
}

impl AccountScope {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
        }
    }
}
