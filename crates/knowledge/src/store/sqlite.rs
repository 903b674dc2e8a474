//! SQLite-backed vector store.
//!
//! Chunks of every collection share one `chunks` table keyed by
//! `(collection, id)`. Similarity search is a full scan with cosine scoring.

use super::{
    bytes_to_embedding, check_dimensions, cosine_similarity, embedding_to_bytes, rank,
    StoredChunk, VectorStore,
};
use crate::chunk::Chunk;
use crate::types::SearchResult;
use async_trait::async_trait;
use chrono::Utc;
use ragline_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    hash TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source_id);

CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    signature TEXT NOT NULL
);
"#;

fn db_error(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Retrieval(format!("{}: {}", context, e))
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    collection: String,
}

impl SqliteStore {
    /// Open (or create) the index database at `path`.
    pub fn open(path: &Path, collection: impl Into<String>) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(db_error("Failed to open SQLite index"))?;
        tracing::debug!("Opened SQLite index at {:?}", path);
        Self::with_connection(conn, collection.into())
    }

    /// A throwaway database that lives in memory.
    pub fn in_memory(collection: impl Into<String>) -> AppResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(db_error("Failed to open SQLite index"))?;
        Self::with_connection(conn, collection.into())
    }

    fn with_connection(conn: Connection, collection: String) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(db_error("Failed to create tables"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            collection,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("SQLite connection lock poisoned".to_string()))
    }

    fn stored_dimensions(&self, conn: &Connection) -> AppResult<Option<usize>> {
        conn.query_row(
            "SELECT dimensions FROM chunks WHERE collection = ?1 LIMIT 1",
            params![self.collection],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map(|d| d.map(|d| d as usize))
        .map_err(db_error("Failed to read index dimensions"))
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, chunks: Vec<StoredChunk>) -> AppResult<usize> {
        let mut conn = self.lock()?;

        let mut dimensions = self.stored_dimensions(&conn)?;
        for chunk in &chunks {
            match dimensions {
                Some(expected) => check_dimensions(expected, chunk.embedding.len())?,
                None => dimensions = Some(chunk.embedding.len()),
            }
        }

        let indexed_at = Utc::now().to_rfc3339();
        let tx = conn
            .transaction()
            .map_err(db_error("Failed to start transaction"))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO chunks
                     (collection, id, source_id, position, text, start_offset, end_offset,
                      hash, dimensions, embedding, metadata, indexed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                )
                .map_err(db_error("Failed to prepare insert"))?;

            for stored in &chunks {
                let metadata = serde_json::to_string(&stored.metadata)?;
                stmt.execute(params![
                    self.collection,
                    stored.chunk.id,
                    stored.chunk.source_id,
                    stored.chunk.index as i64,
                    stored.chunk.text,
                    stored.chunk.start as i64,
                    stored.chunk.end as i64,
                    stored.chunk.hash,
                    stored.embedding.len() as i64,
                    embedding_to_bytes(&stored.embedding),
                    metadata,
                    indexed_at,
                ])
                .map_err(db_error("Failed to insert chunk"))?;
            }
        }
        tx.commit().map_err(db_error("Failed to commit chunks"))?;

        Ok(chunks.len())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchResult>> {
        let conn = self.lock()?;
        if let Some(expected) = self.stored_dimensions(&conn)? {
            check_dimensions(expected, embedding.len())?;
        }

        let mut stmt = conn
            .prepare(
                "SELECT id, source_id, position, text, start_offset, end_offset, hash,
                        embedding, metadata
                 FROM chunks WHERE collection = ?1",
            )
            .map_err(db_error("Failed to prepare query"))?;

        let rows = stmt
            .query_map(params![self.collection], |row| {
                let chunk = Chunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    index: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    start: row.get::<_, i64>(4)? as usize,
                    end: row.get::<_, i64>(5)? as usize,
                    hash: row.get(6)?,
                };
                let bytes: Vec<u8> = row.get(7)?;
                let metadata: String = row.get(8)?;
                Ok((chunk, bytes, metadata))
            })
            .map_err(db_error("Failed to query chunks"))?;

        let mut results = Vec::new();
        for row in rows {
            let (chunk, bytes, metadata) = row.map_err(db_error("Failed to read chunk"))?;
            let stored = bytes_to_embedding(&bytes)?;
            let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)?;
            results.push(SearchResult {
                chunk,
                score: cosine_similarity(&stored, embedding),
                metadata,
            });
        }

        rank(&mut results, top_k);
        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );
        Ok(results)
    }

    async fn hashes(&self, source_id: &str) -> AppResult<HashMap<String, String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, hash FROM chunks WHERE collection = ?1 AND source_id = ?2")
            .map_err(db_error("Failed to prepare hash lookup"))?;

        let rows = stmt
            .query_map(params![self.collection, source_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_error("Failed to read chunk hashes"))?;

        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(db_error("Failed to read chunk hashes"))
    }

    async fn prune_source(&self, source_id: &str, keep: &HashSet<String>) -> AppResult<usize> {
        let stored: Vec<String> = self.hashes(source_id).await?.into_keys().collect();
        let stale: Vec<&String> = stored.iter().filter(|id| !keep.contains(*id)).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(db_error("Failed to start transaction"))?;
        for id in &stale {
            tx.execute(
                "DELETE FROM chunks WHERE collection = ?1 AND id = ?2",
                params![self.collection, id],
            )
            .map_err(db_error("Failed to delete chunk"))?;
        }
        tx.commit().map_err(db_error("Failed to commit pruning"))?;

        Ok(stale.len())
    }

    async fn sources(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT source_id FROM chunks WHERE collection = ?1 ORDER BY source_id",
            )
            .map_err(db_error("Failed to prepare source listing"))?;

        let rows = stmt
            .query_map(params![self.collection], |row| row.get::<_, String>(0))
            .map_err(db_error("Failed to list sources"))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to list sources"))
    }

    async fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.collection],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(db_error("Failed to count chunks"))
    }

    async fn signature(&self) -> AppResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT signature FROM collections WHERE name = ?1",
            params![self.collection],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(db_error("Failed to read collection signature"))
    }

    async fn set_signature(&self, signature: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO collections (name, signature) VALUES (?1, ?2)",
            params![self.collection, signature],
        )
        .map_err(db_error("Failed to write collection signature"))?;
        Ok(())
    }

    async fn reset(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM chunks WHERE collection = ?1",
            params![self.collection],
        )
        .map_err(db_error("Failed to delete chunks"))?;
        conn.execute(
            "DELETE FROM collections WHERE name = ?1",
            params![self.collection],
        )
        .map_err(db_error("Failed to delete collection"))?;

        tracing::info!("Reset collection '{}'", self.collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stored(source: &str, index: u32, text: &str, embedding: Vec<f32>) -> StoredChunk {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), source.to_string());
        StoredChunk {
            chunk: Chunk::new(source, index, text.to_string(), (0, text.len())),
            embedding,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".ragline").join("index.sqlite");

        {
            let store = SqliteStore::open(&path, "docs").unwrap();
            store
                .upsert(vec![
                    stored("a.txt", 0, "alpha", vec![1.0, 0.0]),
                    stored("b.txt", 0, "beta", vec![0.0, 1.0]),
                ])
                .await
                .unwrap();
            store.set_signature("trigram/trigram-v1/2").await.unwrap();
        }

        let store = SqliteStore::open(&path, "docs").unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.signature().await.unwrap().as_deref(),
            Some("trigram/trigram-v1/2")
        );

        let results = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.text, "beta");
        assert_eq!(results[0].chunk.end, 4);
        assert_eq!(results[0].metadata.get("title").map(String::as_str), Some("b.txt"));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");

        let docs = SqliteStore::open(&path, "docs").unwrap();
        let notes = SqliteStore::open(&path, "notes").unwrap();
        docs.upsert(vec![stored("a.txt", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(docs.count().await.unwrap(), 1);
        assert_eq!(notes.count().await.unwrap(), 0);

        notes.reset().await.unwrap();
        assert_eq!(docs.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = SqliteStore::in_memory("docs").unwrap();
        store
            .upsert(vec![stored("a.txt", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();

        let result = store
            .upsert(vec![stored("a.txt", 1, "beta", vec![1.0, 0.0, 0.0])])
            .await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
        assert!(matches!(
            store.query(&[1.0, 0.0, 0.0], 1).await,
            Err(AppError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_prune_source() {
        let store = SqliteStore::in_memory("docs").unwrap();
        store
            .upsert(vec![
                stored("a.txt", 0, "one", vec![1.0, 0.0]),
                stored("a.txt", 1, "two", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let keep: HashSet<String> = store
            .hashes("a.txt")
            .await
            .unwrap()
            .into_keys()
            .filter(|id| *id == crate::chunk::chunk_id("a.txt", 0))
            .collect();

        assert_eq!(store.prune_source("a.txt", &keep).await.unwrap(), 1);
        assert_eq!(store.prune_source("a.txt", &keep).await.unwrap(), 0);
        assert_eq!(store.sources().await.unwrap(), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_ties_ordered_by_id() {
        let store = SqliteStore::in_memory("docs").unwrap();
        store
            .upsert(vec![
                stored("a.txt", 0, "same", vec![1.0, 0.0]),
                stored("b.txt", 0, "same", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert!(results[0].chunk.id < results[1].chunk.id);
    }
}
