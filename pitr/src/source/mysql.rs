use pitr_config::shared::SourceConfig;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::source::BinlogSource;
use crate::types::{BinlogName, GtidSet};

/// All queries run sequentially, one connection is enough.
const NUM_POOL_CONNECTIONS: u32 = 1;

/// [`BinlogSource`] reading from a Percona XtraDB Cluster member.
///
/// Relies on the `get_gtid_set_by_binlog` and `get_binlog_by_gtid_set` functions that Percona
/// Server ships to map binlogs to GTID sets.
#[derive(Debug, Clone)]
pub struct MySqlBinlogSource {
    pool: MySqlPool,
    host: String,
}

impl MySqlBinlogSource {
    /// Connects to `host` with the credentials of `config`.
    pub async fn connect(host: String, config: &SourceConfig) -> PitrResult<MySqlBinlogSource> {
        info!(host, port = config.port, username = config.username, "connecting to cluster member");

        let options = MySqlConnectOptions::new()
            .host(&host)
            .port(config.port)
            .username(&config.username)
            .password(config.password.expose_secret());

        let pool = MySqlPoolOptions::new()
            .max_connections(NUM_POOL_CONNECTIONS)
            .min_connections(NUM_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::SourceConnectionFailed,
                    "Failed to connect to cluster member",
                    format!("{host}: {err}")
                )
            })?;

        Ok(MySqlBinlogSource { pool, host })
    }

    /// Closes the connections to the server.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl BinlogSource for MySqlBinlogSource {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_binlogs(&self) -> PitrResult<Vec<BinlogName>> {
        let rows = sqlx::query("SHOW BINARY LOGS")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                pitr_error!(ErrorKind::SourceQueryFailed, "Failed to list binary logs", err)
            })?;

        let mut binlogs = rows
            .iter()
            .map(|row| decode_text(row).map(|name| BinlogName::new(name.unwrap_or_default())))
            .collect::<PitrResult<Vec<_>>>()?;
        binlogs.retain(|name| !name.as_str().is_empty());
        binlogs.sort();

        debug!(count = binlogs.len(), "listed binary logs");

        Ok(binlogs)
    }

    async fn gtid_set(&self, binlog: &BinlogName) -> PitrResult<GtidSet> {
        let row = sqlx::query("SELECT get_gtid_set_by_binlog(?)")
            .bind(binlog.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::SourceQueryFailed,
                    "Failed to get GTID set of binlog",
                    format!("{binlog}: {err}")
                )
            })?;

        let gtid_set = decode_text(&row)?.unwrap_or_default();

        Ok(GtidSet::new(gtid_set.trim()))
    }

    async fn binlog_name(&self, gtid_set: &GtidSet) -> PitrResult<Option<BinlogName>> {
        if gtid_set.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query("SELECT get_binlog_by_gtid_set(?)")
            .bind(gtid_set.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::SourceQueryFailed,
                    "Failed to get binlog by GTID set",
                    format!("{gtid_set}: {err}")
                )
            })?;

        let name = decode_text(&row)?
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .map(BinlogName::new);

        Ok(name)
    }
}

/// Decodes the first column of `row` as UTF-8 text.
///
/// The server reports function results and `SHOW` columns either as text or as binary strings
/// depending on its version, so the raw bytes are decoded.
fn decode_text(row: &MySqlRow) -> PitrResult<Option<String>> {
    let bytes: Option<Vec<u8>> = row.try_get(0).map_err(|err| {
        pitr_error!(ErrorKind::InvalidData, "Failed to decode query result", err)
    })?;

    bytes.map(String::from_utf8).transpose().map_err(Into::into)
}
