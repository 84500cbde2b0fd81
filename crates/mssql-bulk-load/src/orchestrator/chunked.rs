//! Chunked loading: one dataset split into row ranges, each loaded and
//! committed in its own transaction on a single connection.
//!
//! The first chunk applies the caller's existence policy and creates the
//! table; every later chunk appends to it.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{load_table, LoadOptions};
use crate::core::identifier::clean_identifier;
use crate::core::traits::LoadConnection;
use crate::dataset::Dataset;
use crate::error::{LoadError, Result};
use crate::target::{IfExists, TableAction};

/// Name of the row id column added by [`full_load`].
pub const ROW_ID_COLUMN: &str = "id";

/// Column type of the row id column added by [`full_load`].
pub const ROW_ID_TYPE: &str = "INT PRIMARY KEY";

/// How a chunk treats the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAction {
    /// First chunk: apply the policy, creating the table as needed.
    CreateOrReplace { if_exists: IfExists },
    /// Later chunks: insert into the table the first chunk prepared.
    Append,
}

impl ChunkAction {
    fn policy(&self) -> IfExists {
        match self {
            ChunkAction::CreateOrReplace { if_exists } => *if_exists,
            ChunkAction::Append => IfExists::Append,
        }
    }
}

/// A contiguous row range and how to load it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub range: Range<usize>,
    pub action: ChunkAction,
}

/// Ordered chunks covering every row exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Split `total_rows` into chunks of at most `chunk_size` rows.
    ///
    /// An empty dataset still yields one empty chunk so the table gets
    /// created.
    pub fn new(total_rows: usize, chunk_size: usize, if_exists: IfExists) -> Self {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + chunk_size).min(total_rows);
            let index = chunks.len();
            let action = if index == 0 {
                ChunkAction::CreateOrReplace { if_exists }
            } else {
                ChunkAction::Append
            };
            chunks.push(Chunk {
                index,
                range: start..end,
                action,
            });
            if end >= total_rows {
                break;
            }
            start = end;
        }
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Result of a chunked load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedLoadResult {
    /// Rendered destination table.
    pub table: String,

    /// Action taken by the first chunk.
    pub action: TableAction,

    /// CREATE TABLE text executed by the first chunk, if any.
    pub ddl: String,

    /// Chunks committed.
    pub chunks: usize,

    /// Rows written across all chunks.
    pub rows_inserted: u64,
}

impl ChunkedLoadResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load `dataset` chunk by chunk, committing after each chunk.
///
/// A chunk whose load or commit fails is rolled back and its error
/// returned; chunks committed before it stay in place.
pub async fn load_chunked<C>(
    conn: &mut C,
    dataset: &Dataset,
    table: &str,
    options: &LoadOptions,
    chunk_size: usize,
) -> Result<ChunkedLoadResult>
where
    C: LoadConnection + ?Sized,
{
    let plan = ChunkPlan::new(dataset.num_rows(), chunk_size, options.if_exists);
    info!(
        "{}: loading {} rows in {} chunk(s)",
        table,
        dataset.num_rows(),
        plan.len()
    );

    let mut result: Option<ChunkedLoadResult> = None;
    for chunk in plan.chunks() {
        let slice = dataset.slice(chunk.range.clone());
        let chunk_options = LoadOptions {
            if_exists: chunk.action.policy(),
            ..options.clone()
        };

        conn.begin().await?;
        let loaded = match load_table(conn, &slice, table, &chunk_options).await {
            Ok(outcome) => conn.commit().await.map(|()| outcome),
            Err(e) => Err(e),
        };
        let outcome = match loaded {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback_err) = conn.rollback().await {
                    warn!(
                        "{}: rollback of chunk {} failed: {}",
                        table, chunk.index, rollback_err
                    );
                }
                return Err(e);
            }
        };

        match result.as_mut() {
            Some(r) => {
                r.chunks += 1;
                r.rows_inserted += outcome.rows_inserted;
            }
            None => {
                result = Some(ChunkedLoadResult {
                    table: outcome.table,
                    action: outcome.action,
                    ddl: outcome.ddl,
                    chunks: 1,
                    rows_inserted: outcome.rows_inserted,
                })
            }
        }
    }

    // a plan always has at least one chunk
    result.ok_or_else(|| LoadError::Dataset("no chunks to load".to_string()))
}

/// Load a whole dataset as a fresh table with a 1-based `id` primary key.
///
/// Durations are converted to seconds, the table is replaced, and
/// `id INT PRIMARY KEY` is added to the caller's overrides unless the caller
/// already typed `id` under any spelling that sanitizes to it.
pub async fn full_load<C>(
    conn: &mut C,
    dataset: Dataset,
    table: &str,
    options: &LoadOptions,
    chunk_size: usize,
) -> Result<ChunkedLoadResult>
where
    C: LoadConnection + ?Sized,
{
    let dataset = dataset.with_row_id(ROW_ID_COLUMN).durations_to_seconds();

    let mut options = options.clone();
    options.if_exists = IfExists::Replace;
    if !options.custom.keys().any(|k| clean_identifier(k) == ROW_ID_COLUMN) {
        options.custom.insert(ROW_ID_COLUMN.to_string(), ROW_ID_TYPE.to_string());
    }

    load_chunked(conn, &dataset, table, &options, chunk_size).await
}
