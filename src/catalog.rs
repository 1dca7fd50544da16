//! SRC's schema-discovery and describe-columns facilities, described only
//! at their interface (`SPEC_FULL.md` treats catalog queries and driver
//! loading as external collaborators). `src/db` holds the one real,
//! Oracle-backed implementation; everything else in this crate only
//! depends on the trait.

use thiserror::Error;

use crate::types::ColumnDescriptor;

/// Recoverable planning error: a catalog lookup failed, but the planner
/// can fall back to the explicit declaration rather than abort.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("schema expansion failed for '{schema}': {source}")]
    SchemaExpansionFailed {
        schema: String,
        #[source]
        source: CatalogError,
    },

    #[error("row-count lookup failed: {0}")]
    RowCountLookupFailed(#[source] CatalogError),
}

/// Errors surfaced by the catalog/describe-columns facility itself.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection to SRC failed: {0}")]
    ConnectionFailed(String),

    #[error("catalog query failed: {0}")]
    QueryFailed(String),

    #[error("describe-columns failed for query: {0}")]
    DescribeFailed(String),
}

/// A table discovered via schema expansion, with its catalog row-count
/// estimate (used for size-descending scheduling in C3).
#[derive(Debug, Clone)]
pub struct CatalogTable {
    pub owner: String,
    pub table_name: String,
    pub num_rows: Option<i64>,
}

/// SRC's describe-columns and catalog-discovery facility (C3/C2's only
/// dependency on a live connection).
pub trait SrcCatalog {
    /// Submit `base_sql` to SRC's describe-columns facility *without
    /// executing it*, returning the ordered projected column list.
    fn describe_columns(&self, base_sql: &str) -> Result<Vec<ColumnDescriptor>, CatalogError>;

    /// List `owner.table_name` pairs for a schema (ASCII-uppercased for
    /// catalog matching).
    fn list_schema_tables(&self, schema: &str) -> Result<Vec<CatalogTable>, CatalogError>;

    /// Look up `num_rows` for an explicitly-declared table, for size
    /// ordering. `None` if the table isn't present in the catalog.
    fn table_row_count(&self, schema: &str, table: &str) -> Result<Option<i64>, CatalogError>;
}
