//! Principal grants attached to newly created QuickSight resources

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourcePermission {
    pub principal: String,
    pub actions: Vec<String>,
}

/// Full-control action sets per resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSet {
    DataSource,
    DataSet,
    Analysis,
    Dashboard,
}

const DATA_SOURCE_ACTIONS: &[&str] = &[
    "quicksight:DescribeDataSource",
    "quicksight:DescribeDataSourcePermissions",
    "quicksight:PassDataSource",
    "quicksight:UpdateDataSource",
    "quicksight:DeleteDataSource",
    "quicksight:UpdateDataSourcePermissions",
];

const DATA_SET_ACTIONS: &[&str] = &[
    "quicksight:DescribeDataSet",
    "quicksight:DescribeDataSetPermissions",
    "quicksight:PassDataSet",
    "quicksight:DescribeIngestion",
    "quicksight:ListIngestions",
    "quicksight:UpdateDataSet",
    "quicksight:DeleteDataSet",
    "quicksight:CreateIngestion",
    "quicksight:CancelIngestion",
    "quicksight:UpdateDataSetPermissions",
];

const ANALYSIS_ACTIONS: &[&str] = &[
    "quicksight:RestoreAnalysis",
    "quicksight:UpdateAnalysisPermissions",
    "quicksight:DeleteAnalysis",
    "quicksight:DescribeAnalysisPermissions",
    "quicksight:QueryAnalysis",
    "quicksight:DescribeAnalysis",
    "quicksight:UpdateAnalysis",
];

const DASHBOARD_ACTIONS: &[&str] = &[
    "quicksight:DescribeDashboard",
    "quicksight:ListDashboardVersions",
    "quicksight:UpdateDashboardPermissions",
    "quicksight:QueryDashboard",
    "quicksight:UpdateDashboard",
    "quicksight:DeleteDashboard",
    "quicksight:DescribeDashboardPermissions",
    "quicksight:UpdateDashboardPublishedVersion",
];

impl PermissionSet {
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            PermissionSet::DataSource => DATA_SOURCE_ACTIONS,
            PermissionSet::DataSet => DATA_SET_ACTIONS,
            PermissionSet::Analysis => ANALYSIS_ACTIONS,
            PermissionSet::Dashboard => DASHBOARD_ACTIONS,
        }
    }

    /// Single grant of this set to `principal`
    pub fn grant(self, principal: &str) -> Vec<ResourcePermission> {
        vec![ResourcePermission {
            principal: principal.to_string(),
            actions: self.actions().iter().map(|a| a.to_string()).collect(),
        }]
    }
}
