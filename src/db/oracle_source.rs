use std::sync::Mutex;

use oracle::sql_type::OracleType;
use oracle::Connection;

use crate::catalog::{CatalogError, CatalogTable, SrcCatalog};
use crate::config::ConnectionConfig;
use crate::types::{ChecksumResult, ColumnDescriptor, ColumnKind};

/// SRC's describe-columns and checksum-execution facility.
///
/// `conn` is one long-lived connection reserved for the Planner's catalog
/// role (§5: "The Planner separately acquires one SRC connection for
/// catalog work, held only for the duration of planning") — every
/// `SrcCatalog` call below shares it. `ChecksumSource::execute`, by
/// contrast, opens and closes a fresh connection per call, since §4.4
/// step 1 requires each worker's connection to be per-task-per-side with
/// no cross-task sharing; sharing `conn` there would serialize every
/// checksum query behind one lock regardless of pool size.
///
/// The `oracle` crate has no describe-only mode, so `describe_columns`
/// queries through a `WHERE 1=0` wrapper that Oracle never has to
/// materialize rows for; column metadata comes back the same either way.
pub struct OracleSource {
    conn: Mutex<Connection>,
    config: ConnectionConfig,
}

impl OracleSource {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, CatalogError> {
        let conn = Connection::connect(&config.user, &config.password, &config.url)
            .map_err(|e| CatalogError::ConnectionFailed(e.to_string()))?;
        Ok(OracleSource { conn: Mutex::new(conn), config: config.clone() })
    }

    fn classify(oracle_type: &OracleType) -> ColumnKind {
        match oracle_type {
            OracleType::Number(_, _) | OracleType::Float(_) => ColumnKind::Numeric,
            OracleType::BinaryFloat => ColumnKind::BinaryFloat,
            OracleType::BinaryDouble => ColumnKind::BinaryDouble,
            OracleType::Date => ColumnKind::Date,
            OracleType::Timestamp(_) => ColumnKind::Timestamp,
            OracleType::TimestampTZ(_) => ColumnKind::TimestampTz,
            OracleType::TimestampLTZ(_) => ColumnKind::TimestampLocalTz,
            OracleType::Char(_, _) | OracleType::NChar(_, _) => ColumnKind::CharFixed,
            OracleType::Varchar2(_, _) | OracleType::NVarchar2(_, _) => ColumnKind::CharVar,
            // LOBs, LONG, RAW, ROWID and anything else this crate doesn't
            // have a canonicalization rule for are dropped from the
            // checksum projection rather than guessed at.
            _ => ColumnKind::Excluded,
        }
    }
}

impl SrcCatalog for OracleSource {
    fn describe_columns(&self, base_sql: &str) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        let conn = self.conn.lock().expect("oracle connection mutex poisoned");
        let describe_sql = format!("SELECT * FROM ({base_sql}) dbparity_describe WHERE 1 = 0");
        let rows = conn
            .query(&describe_sql, &[])
            .map_err(|e| CatalogError::DescribeFailed(e.to_string()))?;

        Ok(rows
            .column_info()
            .iter()
            .map(|info| ColumnDescriptor {
                name: info.name().to_string(),
                kind: Self::classify(info.oracle_type()),
            })
            .collect())
    }

    fn list_schema_tables(&self, schema: &str) -> Result<Vec<CatalogTable>, CatalogError> {
        let conn = self.conn.lock().expect("oracle connection mutex poisoned");
        let rows = conn
            .query(
                "SELECT table_name, num_rows FROM all_tables WHERE owner = :1",
                &[&schema.to_uppercase()],
            )
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        let mut tables = Vec::new();
        for row in rows {
            let row = row.map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            let table_name: String = row.get(0).map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            let num_rows: Option<i64> = row.get(1).map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            tables.push(CatalogTable {
                owner: schema.to_string(),
                table_name,
                num_rows,
            });
        }
        Ok(tables)
    }

    fn table_row_count(&self, schema: &str, table: &str) -> Result<Option<i64>, CatalogError> {
        let conn = self.conn.lock().expect("oracle connection mutex poisoned");
        let rows = conn
            .query(
                "SELECT num_rows FROM all_tables WHERE owner = :1 AND table_name = :2",
                &[&schema.to_uppercase(), &table.to_uppercase()],
            )
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        for row in rows {
            let row = row.map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            let num_rows: Option<i64> = row.get(0).map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            return Ok(num_rows);
        }
        Ok(None)
    }
}

impl crate::executor::ChecksumSource for OracleSource {
    fn execute(&self, sql: &str) -> Result<ChecksumResult, String> {
        // Fresh per-call connection, dropped at the end of this scope —
        // see the struct-level doc comment on why this can't reuse `conn`.
        let conn = Connection::connect(&self.config.user, &self.config.password, &self.config.url)
            .map_err(|e| e.to_string())?;
        let row = conn.query_row(sql, &[]).map_err(|e| e.to_string())?;
        let count: i64 = row.get(0).map_err(|e| e.to_string())?;
        let checksum: i64 = row.get(1).map_err(|e| e.to_string())?;
        Ok(ChecksumResult { count, checksum })
    }
}
