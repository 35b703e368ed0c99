use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use papershelf_domain::{PaperRecord, PdfRef};

use crate::store::{RecordStore, StoreError};

/// SQLite-backed implementation of the [`RecordStore`] trait.
///
/// Three tables: `papers` (metadata JSON), `pdf_blobs` (opaque PDF bytes
/// keyed by paper id), `thumbnails` (inline images keyed by paper id).
pub struct SqlitePaperStore {
    conn: Mutex<Connection>,
}

impl SqlitePaperStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Unavailable(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS papers (
                id TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pdf_blobs (
                paper_id TEXT PRIMARY KEY,
                data BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS thumbnails (
                paper_id TEXT PRIMARY KEY,
                image TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| StoreError::Unavailable(format!("init_schema: {}", e)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("connection mutex poisoned".into()))
    }

    /// The JSON persisted in the `papers` row: thumbnails live in their own
    /// table, and session blob keys do not survive a restart.
    fn row_json(record: &PaperRecord) -> Result<String, StoreError> {
        let mut row = record.clone();
        row.thumbnail = None;
        if matches!(row.pdf, PdfRef::Session(_)) {
            row.pdf = PdfRef::None;
        }
        serde_json::to_string(&row).map_err(|e| StoreError::Storage(format!("serialize: {}", e)))
    }
}

impl RecordStore for SqlitePaperStore {
    fn put(&self, record: &PaperRecord, binary: Option<&[u8]>) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let json = Self::row_json(record)?;
        conn.execute(
            "INSERT OR REPLACE INTO papers (id, record) VALUES (?1, ?2)",
            params![record.id, json],
        )
        .map_err(|e| StoreError::Write {
            id: record.id.clone(),
            message: format!("record: {}", e),
        })?;

        // Best-effort dual write: the record row above is NOT rolled back
        // when the blob write fails.
        if let Some(bytes) = binary {
            if let Err(e) = conn.execute(
                "INSERT OR REPLACE INTO pdf_blobs (paper_id, data) VALUES (?1, ?2)",
                params![record.id, bytes],
            ) {
                tracing::warn!(paper = %record.id, error = %e, "pdf blob write failed");
                return Err(StoreError::Write {
                    id: record.id.clone(),
                    message: format!("binary: {}", e),
                });
            }
        }

        Ok(())
    }

    fn get_all(&self) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT p.record, t.image FROM papers p
                 LEFT JOIN thumbnails t ON t.paper_id = p.id
                 ORDER BY p.id",
            )
            .map_err(|e| StoreError::Storage(format!("get_all: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let json: String = row.get(0)?;
                let image: Option<String> = row.get(1)?;
                Ok((json, image))
            })
            .map_err(|e| StoreError::Storage(format!("get_all: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (json, image) = row.map_err(|e| StoreError::Storage(format!("get_all: {}", e)))?;
            let mut record: PaperRecord = serde_json::from_str(&json)
                .map_err(|e| StoreError::Storage(format!("deserialize: {}", e)))?;
            record.thumbnail = image;
            records.push(record);
        }
        Ok(records)
    }

    fn get_binary(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT data FROM pdf_blobs WHERE paper_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Storage(format!("get_binary: {}", e)))
    }

    fn put_thumbnail(&self, id: &str, image: Option<&str>) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let result = match image {
            Some(image) => conn.execute(
                "INSERT OR REPLACE INTO thumbnails (paper_id, image) VALUES (?1, ?2)",
                params![id, image],
            ),
            None => conn.execute("DELETE FROM thumbnails WHERE paper_id = ?1", params![id]),
        };
        result.map_err(|e| StoreError::Write {
            id: id.to_string(),
            message: format!("thumbnail: {}", e),
        })?;
        Ok(())
    }

    fn get_thumbnail(&self, id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT image FROM thumbnails WHERE paper_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Storage(format!("get_thumbnail: {}", e)))
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let affected = conn
            .execute("DELETE FROM papers WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("delete: {}", e)))?;
        conn.execute("DELETE FROM pdf_blobs WHERE paper_id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("delete blob: {}", e)))?;
        conn.execute("DELETE FROM thumbnails WHERE paper_id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("delete thumbnail: {}", e)))?;
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
