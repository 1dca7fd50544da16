//! Query Synthesizer (C2).
//!
//! Turns one [`BaseQuery`](crate::types::BaseQuery) into a paired SRC/TGT
//! SQL statement, each reducing its result multiset to a single
//! `(row_count, checksum)` row. See `SPEC_FULL.md` §4.2 for the algorithm
//! this module is a direct transcription of.

use regex::Regex;
use thiserror::Error;

use crate::canon::Dialect;
use crate::catalog::{CatalogError, SrcCatalog};
use crate::types::{ColumnDescriptor, SchemaMap};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("describe-columns failed: {0}")]
    DescribeFailed(#[from] CatalogError),

    #[error("every column in the projection is ColumnKind::Excluded")]
    EmptyProjection,

    #[error("synthesized SQL was empty")]
    EmptyEmission,
}

/// Column discovery plus both sides' checksum SQL for one base query.
///
/// `base_sql` is the verbatim text C2 hands to SRC's describe-columns
/// facility (never executed, only described). `schema_map` rewrites
/// `<src_schema>.` qualifiers to their TGT equivalent in the emitted TGT
/// statement; it does not affect the SRC statement at all.
pub fn synthesize(
    catalog: &dyn SrcCatalog,
    schema_map: &SchemaMap,
    base_sql: &str,
) -> Result<(String, String), SynthesisError> {
    let columns = catalog.describe_columns(base_sql)?;
    let projected: Vec<&ColumnDescriptor> = columns.iter().filter(|c| !c.kind.is_excluded()).collect();
    if projected.is_empty() {
        return Err(SynthesisError::EmptyProjection);
    }

    let src_sql = emit_checksum_sql(Dialect::Oracle, base_sql, &projected);
    let tgt_sql = rewrite_schema(&emit_checksum_sql(Dialect::Postgres, base_sql, &projected), schema_map);

    if src_sql.trim().is_empty() || tgt_sql.trim().is_empty() {
        return Err(SynthesisError::EmptyEmission);
    }

    Ok((src_sql, tgt_sql))
}

/// Builds the row-source subquery, aliased `t`, that both the hashing step
/// and (on Postgres) `row_to_json` read from: each projected column
/// canonicalized and aliased back to its original, double-quoted name, in
/// describe-order.
fn row_source_sql(dialect: Dialect, base_sql: &str, columns: &[&ColumnDescriptor]) -> String {
    let projection: Vec<String> = columns
        .iter()
        .filter_map(|c| {
            let quoted = dialect.quote_identifier(&c.name);
            let rendered = dialect.render(&quoted, c)?;
            Some(format!("{rendered} AS {quoted}"))
        })
        .collect();
    format!("(SELECT {} FROM ({base_sql}) src_row) t", projection.join(", "))
}

/// One row's canonicalized columns folded into a single 32-hex-char MD5
/// digest, read from the `t`-aliased row source. Oracle builds the row as
/// a JSON object (`RETURNING CLOB` so a wide row doesn't truncate at
/// `JSON_OBJECT`'s default 4000-byte `VARCHAR2` return) and hashes the
/// text with `STANDARD_HASH`; Postgres composes the row with
/// `row_to_json(t)` and hashes it with the built-in `md5()`.
fn row_hash_expr(dialect: Dialect, columns: &[&ColumnDescriptor]) -> String {
    match dialect {
        Dialect::Oracle => {
            let members: Vec<String> = columns
                .iter()
                .filter(|c| !c.kind.is_excluded())
                .map(|c| format!("'{}' VALUE t.{}", c.name, dialect.quote_identifier(&c.name)))
                .collect();
            format!(
                "RAWTOHEX(STANDARD_HASH(JSON_OBJECT({} RETURNING CLOB), 'MD5'))",
                members.join(", ")
            )
        }
        Dialect::Postgres => "MD5(ROW_TO_JSON(t)::text)".to_string(),
    }
}

fn emit_checksum_sql(dialect: Dialect, base_sql: &str, columns: &[&ColumnDescriptor]) -> String {
    let row_source = row_source_sql(dialect, base_sql, columns);
    let row_hash = row_hash_expr(dialect, columns);
    let lane_sum = lane_sum_expr(dialect, "hash_hex");

    format!(
        "SELECT COUNT(*) AS row_count, SUM(lane_avg) AS checksum FROM (\
           SELECT ({lane_sum}) / 4 AS lane_avg FROM (\
             SELECT {row_hash} AS hash_hex FROM {row_source}\
           ) hashed\
         ) laned"
    )
}

/// Splits the 32-hex-character MD5 digest named by `hash_col` into four
/// lanes and sums them.
///
/// TGT slices the digest into four even, contiguous 8-hex-char (4-byte)
/// lanes starting at hex positions 1/9/17/25. SRC, exactly as specified,
/// instead starts its lanes at hex positions 0/5/9/13 (1-indexed: 1/6/10/14)
/// — character offsets that are *not* multiples of 8, so SRC's lanes
/// overlap TGT's byte boundaries instead of lining up with them. This is
/// carried over unchanged from the system being reconciled against, not a
/// bug introduced here: fixing the arithmetic would make every historical
/// SRC checksum stop matching every historical TGT checksum for rows that
/// still agree.
fn lane_sum_expr(dialect: Dialect, hash_col: &str) -> String {
    match dialect {
        Dialect::Oracle => {
            let lane = |start: usize| {
                format!("TO_NUMBER(SUBSTR({hash_col}, {start}, 8), 'XXXXXXXX')")
            };
            format!("{} + {} + {} + {}", lane(1), lane(6), lane(10), lane(14))
        }
        Dialect::Postgres => {
            let lane = |start: usize| format!("('x' || SUBSTR({hash_col}, {start}, 8))::bit(32)::bigint");
            format!("{} + {} + {} + {}", lane(1), lane(9), lane(17), lane(25))
        }
    }
}

fn schema_qualifier_pattern(schema: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\.", regex::escape(schema))).expect("escaped schema is always valid regex")
}

/// Rewrites every `<src_schema>.` qualifier in `sql` to `<tgt_schema>.`,
/// case-insensitively, for each pair in `schema_map`. Leaves text with no
/// matching qualifier untouched.
fn rewrite_schema(sql: &str, schema_map: &SchemaMap) -> String {
    let mut out = sql.to_string();
    for (src_schema, tgt_schema) in schema_map.iter() {
        let pattern = schema_qualifier_pattern(src_schema);
        out = pattern.replace_all(&out, format!("{tgt_schema}.")).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;

    struct FakeCatalog(Vec<ColumnDescriptor>);

    impl SrcCatalog for FakeCatalog {
        fn describe_columns(&self, _base_sql: &str) -> Result<Vec<ColumnDescriptor>, CatalogError> {
            Ok(self.0.clone())
        }

        fn list_schema_tables(&self, _schema: &str) -> Result<Vec<crate::catalog::CatalogTable>, CatalogError> {
            Ok(vec![])
        }

        fn table_row_count(&self, _schema: &str, _table: &str) -> Result<Option<i64>, CatalogError> {
            Ok(None)
        }
    }

    fn col(name: &str, kind: ColumnKind) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn all_excluded_columns_is_an_error() {
        let catalog = FakeCatalog(vec![col("ID", ColumnKind::Excluded)]);
        let err = synthesize(&catalog, &SchemaMap::default(), "SELECT * FROM HR.EMP").unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyProjection));
    }

    #[test]
    fn schema_rewrite_is_case_insensitive_and_word_bounded() {
        let map = SchemaMap::new([("HR".to_string(), "hr_tgt".to_string())]);
        let rewritten = rewrite_schema("SELECT * FROM hr.emp, theHR.other", &map);
        assert_eq!(rewritten, "SELECT * FROM hr_tgt.emp, theHR.other");
    }

    #[test]
    fn src_and_tgt_sql_both_project_every_included_column() {
        let catalog = FakeCatalog(vec![
            col("ID", ColumnKind::Numeric),
            col("NAME", ColumnKind::CharVar),
            col("SECRET", ColumnKind::Excluded),
        ]);
        let (src_sql, tgt_sql) = synthesize(&catalog, &SchemaMap::default(), "SELECT * FROM HR.EMP").unwrap();
        for sql in [&src_sql, &tgt_sql] {
            assert!(sql.contains("\"ID\""));
            assert!(sql.contains("\"NAME\""));
            assert!(!sql.contains("SECRET"));
        }
    }

    #[test]
    fn synthesis_is_deterministic() {
        let catalog = FakeCatalog(vec![col("ID", ColumnKind::Numeric)]);
        let first = synthesize(&catalog, &SchemaMap::default(), "SELECT * FROM HR.EMP").unwrap();
        let second = synthesize(&catalog, &SchemaMap::default(), "SELECT * FROM HR.EMP").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn oracle_projection_uses_runtime_clob_to_avoid_truncation() {
        let catalog = FakeCatalog(vec![col("ID", ColumnKind::Numeric)]);
        let (src_sql, _) = synthesize(&catalog, &SchemaMap::default(), "SELECT * FROM HR.EMP").unwrap();
        assert!(src_sql.contains("RETURNING CLOB"));
    }

    #[test]
    fn lane_offsets_differ_between_dialects_by_design() {
        let src = lane_sum_expr(Dialect::Oracle, "h");
        let tgt = lane_sum_expr(Dialect::Postgres, "h");
        assert!(src.contains("SUBSTR(h, 6, 8)"));
        assert!(tgt.contains("SUBSTR(h, 9, 8)"));
        assert_ne!(src, tgt);
    }
}
