//! Task Planner (C3).
//!
//! Expands configured schemas and explicit tables into a concrete,
//! size-ordered list of [`BaseQuery`]s, then drives each one through C2 to
//! produce a [`CheckTask`]. See `SPEC_FULL.md` §4.3.

use regex::Regex;
use std::collections::HashSet;

use crate::catalog::{CatalogTable, PlanError, SrcCatalog};
use crate::config::CheckScopeConfig;
use crate::synth::{synthesize, SynthesisError};
use crate::types::{BaseQuery, CheckTask, SchemaMap, TaskKey};

/// Output of planning: the ordered, materialized tasks plus any
/// non-fatal problems encountered along the way.
#[derive(Debug, Default)]
pub struct Plan {
    pub tasks: Vec<CheckTask>,
    /// Tasks whose base query failed to synthesize (e.g. every column
    /// excluded). Carried forward so C5 can report them as
    /// `FAIL_SYNTHESIS` instead of silently dropping them.
    pub synthesis_errors: Vec<(TaskKey, SynthesisError)>,
    /// Non-fatal catalog problems (schema expansion failures, missing
    /// row-count lookups) surfaced for the run log.
    pub warnings: Vec<PlanError>,
}

/// Compile the configured exclude patterns into matchers once, rather than
/// per table. Each pattern matches a fully-qualified `schema.table`
/// identifier case-insensitively; `*` is a wildcard, anything else is an
/// exact match. The translated regex is anchored so `EMP` never matches
/// `HR.EMPLOYEE_AUDIT`.
fn compile_exclude_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            let escaped = regex::escape(p).replace(r"\*", ".*");
            Regex::new(&format!("(?i)^{escaped}$")).expect("escaped pattern is always valid regex")
        })
        .collect()
}

fn is_excluded(qualified: &str, excludes: &[Regex]) -> bool {
    excludes.iter().any(|re| re.is_match(qualified))
}

/// Expand `scope` into the ordered list of base queries: every
/// schema-expanded and explicitly-declared table with a known (possibly
/// null) row count sorted descending by size across the *whole* effective
/// set — not just within its own schema or list — so that the largest
/// tasks across the entire run start first (§4.3 step 3); tables whose
/// row-count lookup itself failed are appended afterward in declaration
/// order; then custom SQLs. Tables removed by `exclude_tables` never
/// reach the output.
///
/// `default_schema` qualifies bare entries in `check_scope.tables` (no
/// `.` separator) — SRC's connection user, the same default Oracle itself
/// applies to an unqualified table reference.
pub fn plan_base_queries(
    catalog: &dyn SrcCatalog,
    scope: &CheckScopeConfig,
    default_schema: &str,
) -> (Vec<BaseQuery>, Vec<PlanError>) {
    let excludes = compile_exclude_patterns(&scope.exclude_tables);
    let mut warnings = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut sized: Vec<CatalogTable> = Vec::new();
    let mut catalog_misses: Vec<BaseQuery> = Vec::new();

    for schema in &scope.schemas {
        match catalog.list_schema_tables(schema) {
            Ok(tables) => {
                for t in tables {
                    push_sized(t, &excludes, &mut seen, &mut sized);
                }
            }
            Err(source) => warnings.push(PlanError::SchemaExpansionFailed {
                schema: schema.clone(),
                source,
            }),
        }
    }

    for declared in &scope.tables {
        let (schema, name) = match declared.split_once('.') {
            Some((schema, name)) => (schema, name),
            None => (default_schema, declared.as_str()),
        };
        let qualified = format!("{schema}.{name}");
        if is_excluded(&qualified, &excludes) || !seen.insert(qualified.to_lowercase()) {
            continue;
        }
        match catalog.table_row_count(schema, name) {
            Ok(num_rows) => push_sized(
                CatalogTable {
                    owner: schema.to_string(),
                    table_name: name.to_string(),
                    num_rows,
                },
                &excludes,
                &mut seen,
                &mut sized,
            ),
            Err(source) => {
                warnings.push(PlanError::RowCountLookupFailed(source));
                catalog_misses.push(BaseQuery::Table {
                    schema: schema.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }

    sized.sort_by(|a, b| b.num_rows.cmp(&a.num_rows));

    let mut queries: Vec<BaseQuery> = sized
        .into_iter()
        .map(|t| BaseQuery::Table {
            schema: t.owner,
            name: t.table_name,
        })
        .collect();
    queries.extend(catalog_misses);

    for custom in &scope.custom_sqls {
        queries.push(BaseQuery::Custom {
            label: custom.name.clone(),
            sql: custom.sql.clone(),
        });
    }

    (queries, warnings)
}

fn push_sized(
    table: CatalogTable,
    excludes: &[Regex],
    seen: &mut HashSet<String>,
    out: &mut Vec<CatalogTable>,
) {
    let qualified = format!("{}.{}", table.owner, table.table_name);
    if is_excluded(&qualified, excludes) || !seen.insert(qualified.to_lowercase()) {
        return;
    }
    out.push(table);
}

/// Drive every base query through C2, partitioning the results into
/// successfully materialized tasks and synthesis failures.
pub fn materialize(
    catalog: &dyn SrcCatalog,
    schema_map: &SchemaMap,
    queries: &[BaseQuery],
) -> Plan {
    let mut plan = Plan::default();
    for query in queries {
        let key = query.key();
        match synthesize(catalog, schema_map, &query.sql()) {
            Ok((src_sql, tgt_sql)) => plan.tasks.push(CheckTask {
                key,
                src_sql,
                tgt_sql,
            }),
            Err(err) => plan.synthesis_errors.push((key, err)),
        }
    }
    plan
}

/// Run the full planning pipeline: expand scope, then materialize.
///
/// `default_schema` is used to qualify bare `check_scope.tables` entries;
/// callers pass SRC's connection user.
pub fn plan(catalog: &dyn SrcCatalog, scope: &CheckScopeConfig, default_schema: &str) -> Plan {
    let (queries, warnings) = plan_base_queries(catalog, scope, default_schema);
    let mut result = materialize(catalog, &scope.schema_map(), &queries);
    result.warnings.extend(warnings);
    result
}
