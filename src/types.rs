//! Core data model shared by every component: column descriptors, task
//! identity, and the paired checksum result a comparison produces.

use std::collections::HashMap;
use std::fmt;

/// How a column's declared type maps onto the canonicalization policy
/// (`SPEC_FULL.md` §4.1). `Excluded` columns are dropped from the checksum
/// projection entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    CharFixed,
    CharVar,
    Date,
    Timestamp,
    TimestampTz,
    TimestampLocalTz,
    BinaryFloat,
    BinaryDouble,
    Excluded,
}

impl ColumnKind {
    /// Columns dropped from the checksum projection entirely.
    pub fn is_excluded(self) -> bool {
        matches!(self, ColumnKind::Excluded)
    }
}

/// A single projected column as discovered by SRC's describe-columns
/// facility. Name casing is preserved exactly as SRC reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
}

/// Stable identifier for one comparison unit.
///
/// Two shapes: `TABLE:<schema>.<name>` for table-driven tasks and
/// `CUSTOM:<user-label>` for ad-hoc queries from `check_scope.custom_sqls`.
/// TaskKey preserves the user's original casing; matching against catalog
/// metadata happens on an ASCII-uppercased copy, never on the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(String);

impl Default for TaskKey {
    fn default() -> Self {
        TaskKey::custom("")
    }
}

impl TaskKey {
    pub fn table(schema: &str, name: &str) -> Self {
        TaskKey(format!("TABLE:{schema}.{name}"))
    }

    pub fn custom(label: &str) -> Self {
        TaskKey(format!("CUSTOM:{label}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user-facing SQL whose result multiset is being compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseQuery {
    /// `SELECT * FROM <qualified>`, synthesized from a planned table.
    Table { schema: String, name: String },
    /// A verbatim custom query supplied in configuration.
    Custom { label: String, sql: String },
}

impl BaseQuery {
    pub fn key(&self) -> TaskKey {
        match self {
            BaseQuery::Table { schema, name } => TaskKey::table(schema, name),
            BaseQuery::Custom { label, .. } => TaskKey::custom(label),
        }
    }

    /// The SQL text to hand to C2's column-discovery step.
    pub fn sql(&self) -> String {
        match self {
            BaseQuery::Table { schema, name } => {
                format!("SELECT * FROM {schema}.{name}")
            }
            BaseQuery::Custom { sql, .. } => sql.clone(),
        }
    }
}

/// SRC schema identifier → TGT schema identifier. Keys and values are
/// lowercased on construction so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
    mapping: HashMap<String, String>,
}

impl SchemaMap {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mapping = pairs
            .into_iter()
            .map(|(src, tgt)| (src.to_lowercase(), tgt.to_lowercase()))
            .collect();
        SchemaMap { mapping }
    }

    pub fn get(&self, src_schema: &str) -> Option<&str> {
        self.mapping.get(&src_schema.to_lowercase()).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A fully synthesized, immutable comparison unit. Created by C2, owned by
/// C3, then passed by reference into C4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTask {
    pub key: TaskKey,
    pub src_sql: String,
    pub tgt_sql: String,
}

/// The `(count, checksum)` pair a single side of a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumResult {
    pub count: i64,
    pub checksum: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_key_preserves_casing() {
        let key = TaskKey::table("Hr", "Emp");
        assert_eq!(key.as_str(), "TABLE:Hr.Emp");
    }

    #[test]
    fn custom_key_shape() {
        let key = TaskKey::custom("yesterday_count");
        assert_eq!(key.as_str(), "CUSTOM:yesterday_count");
    }

    #[test]
    fn schema_map_is_case_insensitive() {
        let map = SchemaMap::new([("HR".to_string(), "hr_tgt".to_string())]);
        assert_eq!(map.get("hr"), Some("hr_tgt"));
        assert_eq!(map.get("Hr"), Some("hr_tgt"));
        assert_eq!(map.get("finance"), None);
    }

    #[test]
    fn base_query_table_sql() {
        let bq = BaseQuery::Table {
            schema: "HR".to_string(),
            name: "EMP".to_string(),
        };
        assert_eq!(bq.sql(), "SELECT * FROM HR.EMP");
        assert_eq!(bq.key().as_str(), "TABLE:HR.EMP");
    }
}
