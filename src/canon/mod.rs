//! Type Canonicalizer (C1).
//!
//! Maps a [`ColumnKind`] to a dialect-specific SQL fragment that renders
//! the column to a canonical text form, so the same logical value produces
//! byte-identical text on SRC and TGT regardless of native type quirks
//! (NaN, collation, timezone normalization). See `SPEC_FULL.md` §4.1.
//!
//! Modeled after `mantis::sql::dialect::SqlDialect`: a trait with one
//! method per rendering concern, a `Dialect` enum that dispatches to a
//! `&'static dyn CanonDialect`, and one zero-sized struct per dialect.

mod oracle;
mod postgres;

pub use oracle::OracleCanon;
pub use postgres::PostgresCanon;

use crate::types::ColumnDescriptor;

/// Renders a column reference to the canonical text form for one engine.
///
/// Implementations only need to agree with their counterpart dialect on
/// output, not on syntax — `numeric_mask` may use `TO_CHAR` on one side and
/// `to_char` on the other as long as the produced strings match for equal
/// values.
pub trait CanonDialect: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quote an identifier, preserving case.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// `NUMERIC` / `BINARY_FLOAT` / `BINARY_DOUBLE`: fixed-format numeric
    /// render, leading-zero suppression, exactly 8 fractional digits.
    fn numeric(&self, column: &str) -> String;

    /// `DATE`: `YYYYMMDDHH24MISS` followed by literal `"000000"`.
    fn date(&self, column: &str) -> String;

    /// `TIMESTAMP` / `TIMESTAMP_TZ` / `TIMESTAMP_LOCAL_TZ`:
    /// `YYYYMMDDHH24MISSFF6`.
    fn timestamp(&self, column: &str) -> String;

    /// `CHAR_FIXED`: right-trim trailing spaces.
    fn char_fixed(&self, column: &str) -> String;

    /// `CHAR_VAR`: identity.
    fn char_var(&self, column: &str) -> String {
        column.to_string()
    }
}

/// The two engines this crate ever canonicalizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Oracle,
    Postgres,
}

impl Dialect {
    fn dialect(self) -> &'static dyn CanonDialect {
        match self {
            Dialect::Oracle => &OracleCanon,
            Dialect::Postgres => &PostgresCanon,
        }
    }

    pub fn name(self) -> &'static str {
        self.dialect().name()
    }

    pub fn quote_identifier(self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    /// Render the canonicalizing expression for one column, referenced by
    /// its quoted name against an already-qualified row source (the `column`
    /// argument is the expression to read from, e.g. a quoted alias).
    pub fn render(self, column_ref: &str, descriptor: &ColumnDescriptor) -> Option<String> {
        use crate::types::ColumnKind::*;
        let d = self.dialect();
        Some(match descriptor.kind {
            Numeric | BinaryFloat | BinaryDouble => d.numeric(column_ref),
            Date => d.date(column_ref),
            Timestamp | TimestampTz | TimestampLocalTz => d.timestamp(column_ref),
            CharFixed => d.char_fixed(column_ref),
            CharVar => d.char_var(column_ref),
            Excluded => return None,
        })
    }
}
