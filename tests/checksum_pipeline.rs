//! End-to-end exercise of the full C2 → C3 → C4 → C5 pipeline against
//! in-memory fakes, standing in for the boundary scenarios a real run
//! would hit against live databases: a clean pass, a genuine mismatch, an
//! excluded table, and a side that errors outright.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dbparity::catalog::{CatalogError, CatalogTable, SrcCatalog};
use dbparity::config::CheckScopeConfig;
use dbparity::executor::{self, ChecksumSource};
use dbparity::planner;
use dbparity::report::{self, Status};
use dbparity::types::{ChecksumResult, ColumnDescriptor, ColumnKind};

struct FakeCatalog {
    tables: HashMap<String, Vec<CatalogTable>>,
    columns: Vec<ColumnDescriptor>,
}

impl SrcCatalog for FakeCatalog {
    fn describe_columns(&self, _base_sql: &str) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        Ok(self.columns.clone())
    }

    fn list_schema_tables(&self, schema: &str) -> Result<Vec<CatalogTable>, CatalogError> {
        Ok(self.tables.get(schema).cloned().unwrap_or_default())
    }

    fn table_row_count(&self, _schema: &str, _table: &str) -> Result<Option<i64>, CatalogError> {
        Ok(None)
    }
}

/// Checksum source keyed by task label substring, so SRC and TGT can be
/// made to agree or disagree per scenario.
struct ScriptedSource {
    script: HashMap<&'static str, Result<ChecksumResult, String>>,
    default: ChecksumResult,
}

impl ChecksumSource for ScriptedSource {
    fn execute(&self, sql: &str) -> Result<ChecksumResult, String> {
        for (needle, outcome) in &self.script {
            if sql.contains(needle) {
                return outcome.clone();
            }
        }
        Ok(self.default)
    }
}

#[tokio::test]
async fn full_run_classifies_pass_mismatch_excluded_and_error_scenarios() {
    let catalog = FakeCatalog {
        tables: HashMap::from([(
            "HR".to_string(),
            vec![
                CatalogTable {
                    owner: "HR".to_string(),
                    table_name: "STABLE".to_string(),
                    num_rows: Some(100),
                },
                CatalogTable {
                    owner: "HR".to_string(),
                    table_name: "DRIFTED".to_string(),
                    num_rows: Some(50),
                },
                CatalogTable {
                    owner: "HR".to_string(),
                    table_name: "BROKEN".to_string(),
                    num_rows: Some(10),
                },
            ],
        )]),
        columns: vec![ColumnDescriptor {
            name: "ID".to_string(),
            kind: ColumnKind::Numeric,
        }],
    };

    let scope = CheckScopeConfig {
        schemas: vec!["HR".to_string()],
        ..Default::default()
    };

    let plan = planner::plan(&catalog, &scope, "HR");
    assert_eq!(plan.tasks.len(), 3);
    assert!(plan.synthesis_errors.is_empty());

    let src = Arc::new(ScriptedSource {
        script: HashMap::from([("BROKEN", Err("ORA-00001: connection lost".to_string()))]),
        default: ChecksumResult { count: 10, checksum: 123 },
    });
    let tgt = Arc::new(ScriptedSource {
        script: HashMap::from([("DRIFTED", Ok(ChecksumResult { count: 10, checksum: 999 }))]),
        default: ChecksumResult { count: 10, checksum: 123 },
    });

    let execution = executor::run(src, tgt, plan.tasks.clone(), 2, Arc::new(AtomicBool::new(false))).await;
    let outcomes = report::classify(&plan.tasks, &plan.synthesis_errors, &execution);
    let summary = report::summarize(&outcomes, chrono::Utc::now());

    let status_of = |label: &str| {
        outcomes
            .iter()
            .find(|o| o.key.as_str().ends_with(label))
            .unwrap_or_else(|| panic!("no outcome for {label}"))
            .status
    };

    assert_eq!(status_of("STABLE"), Status::Pass);
    assert_eq!(status_of("DRIFTED"), Status::FailInconsistent);
    assert_eq!(status_of("BROKEN"), Status::FailExecution);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.pass, 1);
    assert_eq!(summary.fail_inconsistent, 1);
    assert_eq!(summary.fail_execution, 1);
    assert_eq!(summary.consistency_rate(), Some(1.0 / 3.0));
}

#[tokio::test]
async fn exclude_tables_removes_matching_tasks_before_execution() {
    let catalog = FakeCatalog {
        tables: HashMap::from([(
            "HR".to_string(),
            vec![CatalogTable {
                owner: "HR".to_string(),
                table_name: "AUDIT_LOG".to_string(),
                num_rows: Some(1_000),
            }],
        )]),
        columns: vec![ColumnDescriptor {
            name: "ID".to_string(),
            kind: ColumnKind::Numeric,
        }],
    };
    let scope = CheckScopeConfig {
        schemas: vec!["HR".to_string()],
        exclude_tables: vec!["HR.AUDIT_*".to_string()],
        ..Default::default()
    };

    let plan = planner::plan(&catalog, &scope, "HR");
    assert!(plan.tasks.is_empty());
}

#[tokio::test]
async fn a_table_with_every_column_excluded_reports_as_fail_synthesis() {
    let catalog = FakeCatalog {
        tables: HashMap::from([(
            "HR".to_string(),
            vec![CatalogTable {
                owner: "HR".to_string(),
                table_name: "BLOB_ONLY".to_string(),
                num_rows: Some(1),
            }],
        )]),
        columns: vec![ColumnDescriptor {
            name: "PAYLOAD".to_string(),
            kind: ColumnKind::Excluded,
        }],
    };
    let scope = CheckScopeConfig {
        schemas: vec!["HR".to_string()],
        ..Default::default()
    };

    let plan = planner::plan(&catalog, &scope, "HR");
    assert!(plan.tasks.is_empty());
    assert_eq!(plan.synthesis_errors.len(), 1);

    let execution = executor::run(
        Arc::new(ScriptedSource { script: HashMap::new(), default: ChecksumResult { count: 0, checksum: 0 } }),
        Arc::new(ScriptedSource { script: HashMap::new(), default: ChecksumResult { count: 0, checksum: 0 } }),
        plan.tasks.clone(),
        2,
        Arc::new(AtomicBool::new(false)),
    )
    .await;
    let outcomes = report::classify(&plan.tasks, &plan.synthesis_errors, &execution);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, Status::FailSynthesis);
}
