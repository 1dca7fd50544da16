//! dbparity compares an Oracle-family source database against a
//! PostgreSQL-compatible target by reducing each table (or custom query)
//! to a row count and a row-order-independent checksum on both sides, and
//! reporting where they disagree.
//!
//! ```text
//!  config.yml ──▶ RunConfig
//!                     │
//!                     ▼
//!   SrcCatalog ──▶ C3 Task Planner ──▶ C2 Query Synthesizer ──▶ C1 Canon
//!   (describe,        │                       │
//!    list tables)      ▼                       │
//!              CheckTask { src_sql, tgt_sql } ◀─┘
//!                     │
//!                     ▼
//!           C4 Dual Executor (bounded SRC/TGT pools)
//!                     │
//!                     ▼
//!           C5 Comparator & Reporter ──▶ detail/summary reports
//! ```
//!
//! C3 drives C2 for every planned table or custom query; C2 is the only
//! component that consults C1. C4 never calls back into C1–C3 and only
//! knows how to run the SQL text it was handed.

pub mod canon;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod planner;
pub mod report;
pub mod synth;
pub mod types;

pub mod prelude {
    pub use crate::canon::Dialect;
    pub use crate::catalog::{CatalogError, CatalogTable, PlanError, SrcCatalog};
    pub use crate::config::RunConfig;
    pub use crate::error::AppError;
    pub use crate::executor::{ChecksumSource, ExecutionReport};
    pub use crate::planner::{plan, Plan};
    pub use crate::report::{classify, summarize, write_reports, RunSummary, Status, TaskOutcome};
    pub use crate::types::{BaseQuery, CheckTask, ChecksumResult, ColumnDescriptor, ColumnKind, SchemaMap, TaskKey};
}
