use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Durable key-value storage holding one blob per named slot.
pub trait SlotStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

// --- SQLite ---

pub struct SqliteSlots {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSlots {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let slots = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        slots.init()?;
        Ok(slots)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let slots = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        slots.init()?;
        Ok(slots)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl SlotStore for SqliteSlots {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self.conn.query_row(
            "SELECT value FROM slots WHERE key = ?1",
            [key],
            |row| row.get::<_, Vec<u8>>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read slot '{}'", key)),
        }
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO slots (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .with_context(|| format!("Failed to write slot '{}'", key))?;
        Ok(())
    }
}

// --- In memory ---

#[derive(Debug, Default, Clone)]
pub struct MemorySlots {
    slots: HashMap<String, Vec<u8>>,
    #[cfg(test)]
    writes: usize,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_slot(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let mut slots = Self::default();
        slots.slots.insert(key.to_string(), value.into());
        slots
    }

    /// Number of writes seen so far.
    #[cfg(test)]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SlotStore for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_vec());
        #[cfg(test)]
        {
            self.writes += 1;
        }
        Ok(())
    }
}
