//! Analysis and dashboard definitions

use crate::visual::Visual;
use crate::AccountScope;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Duplicate sheet id '{0}'")]
    DuplicateSheetId(String),

    #[error("Duplicate visual id '{visual_id}' in sheet '{sheet_id}'")]
    DuplicateVisualId { sheet_id: String, visual_id: String },

    #[error("Duplicate field id '{field_id}' in visual '{visual_id}'")]
    DuplicateFieldId { visual_id: String, field_id: String },

    #[error("Visual '{visual_id}' references undeclared dataset '{identifier}'")]
    UndeclaredDataSet { visual_id: String, identifier: String },
}

/// Binds a short local identifier to a dataset ARN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetIdentifierDeclaration {
    pub identifier: String,
    pub data_set_arn: String,
}

impl DataSetIdentifierDeclaration {
    pub fn new(identifier: impl Into<String>, data_set_arn: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            data_set_arn: data_set_arn.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sheet {
    pub sheet_id: String,
    pub name: String,
    pub visuals: Vec<Visual>,
}

impl Sheet {
    pub fn new(sheet_id: impl Into<String>, name: impl Into<String>, visuals: Vec<Visual>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            name: name.into(),
            visuals,
        }
    }
}

/// `Definition` member shared by analyses and dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Definition {
    pub data_set_identifier_declarations: Vec<DataSetIdentifierDeclaration>,
    pub sheets: Vec<Sheet>,
}

impl Definition {
    /// Check id uniqueness and dataset references before anything is sent
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let declared: HashSet<&str> = self
            .data_set_identifier_declarations
            .iter()
            .map(|d| d.identifier.as_str())
            .collect();

        let mut sheet_ids = HashSet::new();
        for sheet in &self.sheets {
            if !sheet_ids.insert(sheet.sheet_id.as_str()) {
                return Err(DefinitionError::DuplicateSheetId(sheet.sheet_id.clone()));
            }

            let mut visual_ids = HashSet::new();
            for visual in &sheet.visuals {
                let visual_id = visual.visual_id();
                if !visual_ids.insert(visual_id) {
                    return Err(DefinitionError::DuplicateVisualId {
                        sheet_id: sheet.sheet_id.clone(),
                        visual_id: visual_id.to_string(),
                    });
                }

                let mut field_ids = HashSet::new();
                for field_id in visual.field_ids() {
                    if !field_ids.insert(field_id) {
                        return Err(DefinitionError::DuplicateFieldId {
                            visual_id: visual_id.to_string(),
                            field_id: field_id.to_string(),
                        });
                    }
                }

                if let Some(column) = visual
                    .columns()
                    .into_iter()
                    .find(|c| !declared.contains(c.data_set_identifier.as_str()))
                {
                    return Err(DefinitionError::UndeclaredDataSet {
                        visual_id: visual_id.to_string(),
                        identifier: column.data_set_identifier.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn visual_count(&self) -> usize {
        self.sheets.iter().map(|s| s.visuals.len()).sum()
    }
}

pub fn dataset_arn(scope: &AccountScope, data_set_id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:dataset/{}",
        scope.region, scope.account_id, data_set_id
    )
}

pub fn data_source_arn(scope: &AccountScope, data_source_id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:datasource/{}",
        scope.region, scope.account_id, data_source_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{bar, kpi, Aggregation, Measure};

    fn definition(sheets: Vec<Sheet>) -> Definition {
        Definition {
            data_set_identifier_declarations: vec![DataSetIdentifierDeclaration::new(
                "dataset1",
                "arn:aws:quicksight:us-east-1:123456789012:dataset/kiro-user-credits-dataset",
            )],
            sheets,
        }
    }

    #[test]
    fn test_valid_definition() {
        let def = definition(vec![Sheet::new(
            "sheet1",
            "Overview",
            vec![
                kpi("kpi-users", "Users", "dataset1", "userid", Aggregation::DistinctCount),
                kpi("kpi-credits", "Credits", "dataset1", "credits_used", Aggregation::SUM),
            ],
        )]);
        assert_eq!(def.validate(), Ok(()));
        assert_eq!(def.visual_count(), 2);
    }

    #[test]
    fn test_duplicate_visual_id() {
        let def = definition(vec![Sheet::new(
            "sheet1",
            "Overview",
            vec![
                kpi("kpi", "Users", "dataset1", "userid", Aggregation::DistinctCount),
                kpi("kpi", "Credits", "dataset1", "credits_used", Aggregation::SUM),
            ],
        )]);
        assert_eq!(
            def.validate(),
            Err(DefinitionError::DuplicateVisualId {
                sheet_id: "sheet1".to_string(),
                visual_id: "kpi".to_string(),
            })
        );
    }

    #[test]
    fn test_same_visual_id_in_different_sheets() {
        let def = definition(vec![
            Sheet::new("a", "A", vec![kpi("kpi", "t", "dataset1", "userid", Aggregation::SUM)]),
            Sheet::new("b", "B", vec![kpi("kpi", "t", "dataset1", "userid", Aggregation::SUM)]),
        ]);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_duplicate_field_id() {
        let def = definition(vec![Sheet::new(
            "sheet1",
            "Overview",
            vec![bar(
                "bar",
                "Tiers",
                "dataset1",
                "subscription_tier",
                &[
                    Measure::new("m", "credits_used", Aggregation::SUM),
                    Measure::new("m", "overage_cap", Aggregation::AVERAGE),
                ],
                None,
            )],
        )]);
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::DuplicateFieldId { field_id, .. }) if field_id == "m"
        ));
    }

    #[test]
    fn test_undeclared_dataset() {
        let def = definition(vec![Sheet::new(
            "sheet1",
            "Overview",
            vec![kpi("kpi", "t", "activity", "userid", Aggregation::SUM)],
        )]);
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::UndeclaredDataSet { identifier, .. }) if identifier == "activity"
        ));
    }

    #[test]
    fn test_arns() {
        let scope = AccountScope::new("us-east-1", "123456789012");
        assert_eq!(
            dataset_arn(&scope, "kiro-user-activity-dataset"),
            "arn:aws:quicksight:us-east-1:123456789012:dataset/kiro-user-activity-dataset"
        );
        assert_eq!(
            data_source_arn(&scope, "kiro-athena-datasource"),
            "arn:aws:quicksight:us-east-1:123456789012:datasource/kiro-athena-datasource"
        );
    }
}
