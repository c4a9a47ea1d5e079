use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{self, params, ErrorCode, OpenFlags, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::TierError;
use crate::storage::area::{AreaResult, StorageArea};
use crate::storage::types::serialized_len;

/// SQLite-based durable storage area.
///
/// Several areas can share one database file; rows are scoped by the area
/// name given at construction.
pub struct SqliteLocalStore {
    pool: Pool<SqliteConnectionManager>,
    area: String,
    quota: Option<usize>,
}

impl SqliteLocalStore {
    /// Opens (or creates) the database at `path` and binds to the `area` scope.
    pub fn new(path: &str, area: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(std::time::Duration::from_millis(500))?;
                c.pragma_update(None, "journal_mode", "WAL")?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS local_storage (
                        area TEXT NOT NULL,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                        PRIMARY KEY(area, key)
                    );"
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(std::time::Duration::from_secs(5))
            .build(manager)
            .with_context(|| format!("cannot open sqlite storage at {path}"))?;

        log::debug!("sqlite storage area '{area}' opened at {path}");

        Ok(Self {
            pool,
            area: area.to_string(),
            quota: None,
        })
    }

    /// Rejects writes that would grow the area past `units` UTF-16 code units.
    pub fn with_quota(mut self, units: usize) -> Self {
        self.quota = Some(units);
        self
    }

    fn conn(&self) -> AreaResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            log::warn!("sqlite storage area '{}' has no connection: {e}", self.area);
            TierError::Unavailable
        })
    }

    fn used_units(&self, conn: &rusqlite::Connection, except: &str) -> AreaResult<usize> {
        let mut stmt = conn
            .prepare("SELECT key, value FROM local_storage WHERE area=?1 AND key<>?2")
            .map_err(map_sql)?;
        let rows = stmt
            .query_map(params![self.area, except], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(map_sql)?;

        let mut used = 0;
        for row in rows {
            let (k, v) = row.map_err(map_sql)?;
            used += serialized_len(&k) + serialized_len(&v);
        }
        Ok(used)
    }
}

fn map_sql(err: rusqlite::Error) -> TierError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DiskFull) => TierError::QuotaExceeded,
        Some(ErrorCode::ReadOnly) | Some(ErrorCode::CannotOpen) => TierError::Unavailable,
        _ => TierError::Backend(err.into()),
    }
}

impl StorageArea for SqliteLocalStore {
    fn get_item(&self, key: &str) -> AreaResult<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM local_storage WHERE area=?1 AND key=?2",
            params![self.area, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(map_sql)
    }

    fn set_item(&self, key: &str, value: &str) -> AreaResult<()> {
        let conn = self.conn()?;
        if let Some(quota) = self.quota {
            let after = self.used_units(&conn, key)? + serialized_len(key) + serialized_len(value);
            if after > quota {
                return Err(TierError::QuotaExceeded);
            }
        }
        conn.execute(
            "INSERT INTO local_storage(area,key,value) VALUES (?1,?2,?3)
             ON CONFLICT(area,key) DO UPDATE
             SET value=excluded.value, updated_at=strftime('%s','now')",
            params![self.area, key, value],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AreaResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM local_storage WHERE area=?1 AND key=?2",
            params![self.area, key],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    fn clear(&self) -> AreaResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM local_storage WHERE area=?1", params![self.area])
            .map_err(map_sql)?;
        Ok(())
    }

    fn len(&self) -> usize {
        let conn = match self.conn() { Ok(c) => c, Err(_) => return 0 };
        conn.query_row::<u32, _, _>(
            "SELECT COUNT(*) FROM local_storage WHERE area=?1",
            params![self.area],
            |row| row.get(0),
        ).unwrap_or(0) as usize
    }

    fn keys(&self) -> AreaResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT key FROM local_storage WHERE area=?1 ORDER BY key")
            .map_err(map_sql)?;
        let rows = stmt
            .query_map(params![self.area], |row| row.get::<_, String>(0))
            .map_err(map_sql)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(map_sql)
    }

    fn usage_bytes(&self, prefix: &str) -> Option<u64> {
        let conn = self.conn().ok()?;
        // length() counts characters for TEXT; two bytes each approximates UTF-16.
        // substr() rather than LIKE, which would treat '_' in a namespace as a wildcard.
        conn.query_row::<i64, _, _>(
            "SELECT COALESCE(SUM(length(key) + length(value)), 0) FROM local_storage
             WHERE area=?1 AND substr(key, 1, length(?2)) = ?2",
            params![self.area, prefix],
            |row| row.get(0),
        )
        .ok()
        .map(|chars| chars as u64 * 2)
    }
}
