use std::{cmp::Ordering, fs, path::PathBuf, str::FromStr};

use anyhow::{bail, Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::domain::{EntryId, EMBEDDING_DIM};

/// SQLite-backed store of reference photos and their embeddings.
#[derive(Clone)]
pub struct GalleryStore {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub entry_id: EntryId,
    pub name: String,
    pub photo_url: String,
    pub embedding: Vec<f32>,
}

impl GalleryStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gallery_entries (
                entry_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                photo_url  TEXT NOT NULL,
                embedding  BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure gallery_entries table exists")?;
        Ok(())
    }

    pub async fn insert_entry(
        &self,
        name: &str,
        photo_url: &str,
        embedding: &[f32],
    ) -> Result<EntryId> {
        if embedding.len() != EMBEDDING_DIM {
            bail!(
                "embedding for '{name}' has {} dimensions, expected {EMBEDDING_DIM}",
                embedding.len()
            );
        }
        let result = sqlx::query(
            "INSERT INTO gallery_entries (name, photo_url, embedding) VALUES (?1, ?2, ?3)",
        )
        .bind(name)
        .bind(photo_url)
        .bind(encode_embedding(embedding))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert gallery entry '{name}'"))?;
        Ok(EntryId(result.last_insert_rowid()))
    }

    pub async fn load_entries(&self) -> Result<Vec<GalleryEntry>> {
        let rows = sqlx::query(
            "SELECT entry_id, name, photo_url, embedding FROM gallery_entries ORDER BY entry_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load gallery entries")?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_id: i64 = row.try_get("entry_id")?;
            let name: String = row.try_get("name")?;
            let photo_url: String = row.try_get("photo_url")?;
            let blob: Vec<u8> = row.try_get("embedding")?;
            let embedding = decode_embedding(&blob)
                .with_context(|| format!("corrupt embedding blob for entry {entry_id}"))?;
            entries.push(GalleryEntry {
                entry_id: EntryId(entry_id),
                name,
                photo_url,
                embedding,
            });
        }
        Ok(entries)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gallery_entries")
            .fetch_one(&self.pool)
            .await
            .context("failed to count gallery entries")?;
        Ok(count as u64)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for component in embedding {
        blob.extend_from_slice(&component.to_le_bytes());
    }
    blob
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        bail!("embedding blob length {} is not a multiple of 4", blob.len());
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;
    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Name and photo reference carried alongside each vector in the index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub name: String,
    pub photo_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub name: String,
    pub score: f32,
    pub photo_url: String,
}

/// Flat inner-product index over the loaded gallery.
///
/// Vectors are stored row-major in one contiguous buffer; a search is a full
/// scan. Gallery sizes here are small enough that anything cleverer would be
/// wasted.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dim: usize,
    vectors: Vec<f32>,
    entries: Vec<IndexEntry>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn from_entries(dim: usize, gallery: Vec<GalleryEntry>) -> Result<Self> {
        let mut index = Self::new(dim);
        for entry in gallery {
            index.insert(
                IndexEntry {
                    name: entry.name,
                    photo_url: entry.photo_url,
                },
                &entry.embedding,
            )?;
        }
        Ok(index)
    }

    pub fn insert(&mut self, entry: IndexEntry, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            bail!(
                "vector for '{}' has {} dimensions, expected {}",
                entry.name,
                vector.len(),
                self.dim
            );
        }
        self.vectors.extend_from_slice(vector);
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `top_k` entries by inner product, descending; entries scoring
    /// below `score_floor` are dropped. Ties keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize, score_floor: f32) -> Vec<ScoredEntry> {
        if query.len() != self.dim || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, vector)| (inner_product(query, vector), row))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        scored
            .into_iter()
            .take(top_k)
            .filter(|(score, _)| *score >= score_floor)
            .map(|(score, row)| {
                let entry = &self.entries[row];
                ScoredEntry {
                    name: entry.name.clone(),
                    score,
                    photo_url: entry.photo_url.clone(),
                }
            })
            .collect()
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
