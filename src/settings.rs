use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Result, params};

/// Settings keys, one per surface that persists state.
pub mod keys {
    /// Albums overview grid span count.
    pub const ALBUMS_SPAN: &str = "albums_span_count";
    /// Photo grid span count.
    pub const PHOTOS_SPAN: &str = "photos_span_count";
    pub const LAST_FOLDER: &str = "last_folder";
    pub const FILMSTRIP_ENABLED: &str = "filmstrip_enabled";
}

/// Durable key/value store backing span counts and small app state.
/// Writes are best-effort; reads fall back to the caller's default.
pub struct Settings {
    conn: Connection,
}

impl Settings {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        let settings = Settings { conn };
        settings.init_schema()?;
        Ok(settings)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM settings WHERE key = ?1")
            .ok()?;
        stmt.query_row(params![key], |row| row.get(0))
            .optional()
            .ok()
            .flatten()
    }

    fn set_raw(&self, key: &str, value: &str) {
        let result = self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        );
        if let Err(e) = result {
            log::warn!("Failed to persist setting {}: {}", key, e);
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get_raw(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.set_raw(key, &value.to_string());
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_int(key, default as i64) != 0
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.set_int(key, value as i64);
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_raw(key)
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.set_raw(key, value);
    }
}
