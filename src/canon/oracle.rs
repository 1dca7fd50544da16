use super::CanonDialect;

/// Mask shared with [`super::postgres::PostgresCanon`]: leading-zero
/// suppression, width up to 20 integer digits, exactly 8 fractional digits.
pub(super) const NUMERIC_MASK: &str = "99999999999999999999999999999.00000000";

#[derive(Debug)]
pub struct OracleCanon;

impl CanonDialect for OracleCanon {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn numeric(&self, column: &str) -> String {
        format!("TO_CHAR({column}, '{NUMERIC_MASK}')")
    }

    fn date(&self, column: &str) -> String {
        format!("TO_CHAR({column}, 'YYYYMMDDHH24MISS') || '000000'")
    }

    fn timestamp(&self, column: &str) -> String {
        format!("TO_CHAR({column}, 'YYYYMMDDHH24MISSFF6')")
    }

    fn char_fixed(&self, column: &str) -> String {
        format!("RTRIM({column})")
    }
}
