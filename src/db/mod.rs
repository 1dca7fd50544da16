//! The one place this crate talks to an actual database. Everything
//! upstream (`canon`, `synth`, `planner`, `executor`, `report`) depends
//! only on the [`SrcCatalog`](crate::catalog::SrcCatalog) and
//! [`ChecksumSource`](crate::executor::ChecksumSource) traits; this
//! module is the thin, reviewed seam that implements them against the
//! `oracle` and `postgres` crates.

mod oracle_source;
mod postgres_source;

pub use oracle_source::OracleSource;
pub use postgres_source::PostgresSource;
