//! Long-term memory vectors stored in LanceDB

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lance_arrow::FixedSizeListArrayExt;
use lancedb::connect;
use lancedb::query::{ExecutableQuery, QueryBase};

use crate::error::{Error, Result};
use crate::memory::MemoryEntry;

const TABLE_NAME: &str = "long_term_memory";

/// LanceDB backend for long-term memory entries.
///
/// This store lives at its own path and holds vectors from its own
/// embedding space; it is never merged with the document index.
pub struct MemoryBackend {
    db: lancedb::Connection,
    dimensions: usize,
}

impl MemoryBackend {
    /// Open (or create) the memory database at the given path
    pub async fn open(path: &Path, dimensions: usize) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| Error::config(format!("Non-UTF8 memory path: {}", path.display())))?;

        let db = connect(path)
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        let backend = Self { db, dimensions };
        backend.ensure_table().await?;

        Ok(backend)
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("timestamp", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimensions as i32,
                ),
                false,
            ),
        ])
    }

    async fn ensure_table(&self) -> Result<()> {
        let tables = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        if !tables.contains(&TABLE_NAME.to_string()) {
            let schema = Arc::new(self.schema());
            let empty_batch = RecordBatch::new_empty(schema.clone());
            let batches = vec![empty_batch];
            let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);

            self.db
                .create_table(TABLE_NAME, Box::new(reader))
                .execute()
                .await
                .map_err(|e| Error::vector_db(e.to_string()))?;
        }

        Ok(())
    }

    /// Append a memory entry with its embedding. Entries are immutable
    /// once written; there is no update path.
    pub async fn insert(&self, entry: &MemoryEntry, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        let id_array = StringArray::from(vec![entry.id.to_string()]);
        let text_array = StringArray::from(vec![entry.text.clone()]);
        let user_array = StringArray::from(vec![entry.user_id.clone()]);
        let kind_array = StringArray::from(vec![entry.kind.clone()]);
        let timestamp_array = StringArray::from(vec![entry.timestamp.to_rfc3339()]);

        let values = Float32Array::from(embedding.to_vec());
        let vector_array = FixedSizeListArray::try_new_from_values(values, self.dimensions as i32)
            .map_err(|e: arrow_schema::ArrowError| Error::vector_db(e.to_string()))?;

        let schema = Arc::new(self.schema());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(id_array) as Arc<dyn Array>,
                Arc::new(text_array),
                Arc::new(user_array),
                Arc::new(kind_array),
                Arc::new(timestamp_array),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| Error::vector_db(e.to_string()))?;

        let batches = vec![batch];
        let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        table
            .add(Box::new(reader))
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        Ok(())
    }

    /// Search for similar entries, restricted to one user's partition.
    ///
    /// Entries belonging to other users are never returned, regardless
    /// of score.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
        user_id: &str,
    ) -> Result<Vec<ScoredMemory>> {
        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?;

        let filter = format!("user_id = '{}'", user_id.replace('\'', "''"));

        let query = table
            .vector_search(query_embedding.to_vec())
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?
            .limit(limit)
            .only_if(filter);

        let stream = query
            .execute()
            .await
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?;

        let mut results = Vec::new();

        for batch in batches {
            let texts = string_column(&batch, "text")?;
            let users = string_column(&batch, "user_id")?;
            let kinds = string_column(&batch, "kind")?;
            let timestamps = string_column(&batch, "timestamp")?;

            let distance_col: &Arc<dyn Array> = batch
                .column_by_name("_distance")
                .ok_or_else(|| Error::vector_db("Missing _distance column"))?;
            let distances = distance_col
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| Error::vector_db("_distance column is not Float32Array"))?;

            for i in 0..batch.num_rows() {
                if users.value(i) != user_id {
                    continue;
                }

                // LanceDB returns L2 distance, convert to similarity score
                let distance = distances.value(i);
                let score = 1.0 / (1.0 + distance);

                if score >= min_score {
                    results.push(ScoredMemory {
                        text: texts.value(i).to_string(),
                        user_id: users.value(i).to_string(),
                        kind: kinds.value(i).to_string(),
                        timestamp: parse_timestamp(timestamps.value(i)),
                        score,
                    });
                }
            }
        }

        Ok(results)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let col: &Arc<dyn Array> = batch
        .column_by_name(name)
        .ok_or_else(|| Error::vector_db(format!("Missing {} column", name)))?;
    col.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::vector_db(format!("{} column is not StringArray", name)))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Result from a long-term memory search
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub text: String,
    pub user_id: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub score: f32,
}
