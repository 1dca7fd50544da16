use postgres::{Client, NoTls};

use crate::config::ConnectionConfig;
use crate::executor::ChecksumSource;
use crate::types::ChecksumResult;

/// TGT's checksum-execution facility. TGT is never described (C2 only
/// describes SRC); this side only ever runs the synthesized checksum SQL.
///
/// Holds no live connection between calls: §4.4 step 1 requires each
/// worker to open a fresh, per-task-per-side connection with no
/// cross-task sharing, so `ChecksumSource::execute` dials in fresh every
/// time rather than serializing every task behind one shared `Client`.
/// `connect` still opens (and immediately drops) one connection up front
/// purely to fail fast on bad credentials/unreachable hosts, matching the
/// "both pools failing to start" fatal-init case in §6/§7.
pub struct PostgresSource {
    config: ConnectionConfig,
}

impl PostgresSource {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, String> {
        Client::connect(&connection_string(config), NoTls).map_err(|e| e.to_string())?;
        Ok(PostgresSource { config: config.clone() })
    }
}

/// Appends `user`/`password` as key=value parameters onto the configured
/// URL, the same libpq connection-string format `postgres::Config`
/// accepts alongside (or instead of) a `postgres://` URI.
fn connection_string(config: &ConnectionConfig) -> String {
    format!("{} user={} password={}", config.url, config.user, config.password)
}

impl ChecksumSource for PostgresSource {
    fn execute(&self, sql: &str) -> Result<ChecksumResult, String> {
        // Fresh per-call connection, dropped at the end of this scope —
        // see the struct-level doc comment on why this can't reuse a
        // shared client.
        let mut client = Client::connect(&connection_string(&self.config), NoTls).map_err(|e| e.to_string())?;
        let row = client.query_one(sql, &[]).map_err(|e| e.to_string())?;
        let count: i64 = row.try_get(0).map_err(|e| e.to_string())?;
        let checksum: i64 = row.try_get(1).map_err(|e| e.to_string())?;
        Ok(ChecksumResult { count, checksum })
    }
}
