//! SQLite storage for chunk metadata

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// A metadata row correlating a generated id to its source and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: i64,
    pub source: String,
    pub content: String,
}

/// SQLite-backed metadata store.
///
/// Owns chunk id generation: ids come from the AUTOINCREMENT column and
/// are strictly monotonic, so ascending id order is insertion order.
pub struct MetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl MetadataStore {
    /// Open (or create) the metadata database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a chunk row and return its generated id
    pub fn insert_chunk(&self, source: &str, content: &str) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| Error::store(e.to_string()))?;

        conn.execute(
            "INSERT INTO chunks (file_name, content) VALUES (?1, ?2)",
            params![source, content],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a chunk row by id
    pub fn get_chunk(&self, id: i64) -> Result<Option<ChunkRecord>> {
        let conn = self.conn.lock().map_err(|e| Error::store(e.to_string()))?;

        conn.query_row(
            "SELECT id, file_name, content FROM chunks WHERE id = ?1",
            params![id],
            |row| {
                Ok(ChunkRecord {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    content: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Read all chunk ids in insertion order.
    ///
    /// This is what rebuilds the position-to-id mapping for the vector
    /// index at load time.
    pub fn ids_in_insertion_order(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().map_err(|e| Error::store(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT id FROM chunks ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Number of chunk rows
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| Error::store(e.to_string()))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, MetadataStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(&dir.path().join("metadata.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_generates_strictly_monotonic_ids() {
        let (_dir, store) = open_store();

        let a = store.insert_chunk("a.txt", "alpha").unwrap();
        let b = store.insert_chunk("b.txt", "beta").unwrap();
        let c = store.insert_chunk("c.txt", "gamma").unwrap();

        assert!(a < b && b < c);
        assert_eq!(store.ids_in_insertion_order().unwrap(), vec![a, b, c]);
        assert_eq!(store.chunk_count().unwrap(), 3);
    }

    #[test]
    fn get_chunk_returns_inserted_row() {
        let (_dir, store) = open_store();

        let id = store.insert_chunk("notes.txt", "hello world").unwrap();
        let record = store.get_chunk(id).unwrap().unwrap();

        assert_eq!(record.source, "notes.txt");
        assert_eq!(record.content, "hello world");
    }

    #[test]
    fn get_chunk_missing_id_is_none() {
        let (_dir, store) = open_store();
        assert!(store.get_chunk(42).unwrap().is_none());
    }

    #[test]
    fn ids_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.db");

        let ids = {
            let store = MetadataStore::open(&path).unwrap();
            vec![
                store.insert_chunk("a.txt", "one").unwrap(),
                store.insert_chunk("a.txt", "two").unwrap(),
            ]
        };

        let store = MetadataStore::open(&path).unwrap();
        assert_eq!(store.ids_in_insertion_order().unwrap(), ids);
    }
}
