//! Flat squared-L2 index backed by LanceDB.
//!
//! Entries are rows of a Lance table (`position`, `id`, `vector`). Queries run
//! LanceDB's exhaustive vector search with the L2 distance type, which scores
//! squared euclidean distance; hits are reported as `1 / (1 + d)`.
//!
//! The working table lives in a private temporary directory. `save` writes a
//! fresh `entries.lance` dataset into the target directory next to the
//! metadata file, and `load` copies such a dataset back into a working table.

use super::store::{self, EntryTable};
use super::{hits_from_ranked, IndexKind, IndexedEntry, SearchHit, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use rulegen_core::{AppError, AppResult};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const TABLE_NAME: &str = "entries";
const TABLE_DIR: &str = "entries.lance";
const POSITION_COLUMN: &str = "position";
const ID_COLUMN: &str = "id";
const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

/// Working table and the directory holding it.
struct WorkingTable {
    table: Table,
    dir: TempDir,
}

#[derive(Default)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    entries: EntryTable,
    working: Option<WorkingTable>,
}

impl fmt::Debug for FlatL2Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatL2Index")
            .field("dimension", &self.dimension)
            .field("len", &self.entries.len())
            .field("table_dir", &self.working.as_ref().map(|w| w.dir.path()))
            .finish()
    }
}

impl FlatL2Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of a table, in no particular order.
    async fn scan(table: &Table, rows: usize) -> AppResult<Vec<RecordBatch>> {
        table
            .query()
            .limit(rows)
            .execute()
            .await
            .map_err(index_error("Failed to scan LanceDB table"))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(index_error("Failed to read LanceDB rows"))
    }
}

fn index_error<E: fmt::Display>(context: &'static str) -> impl FnOnce(E) -> AppError {
    move |e| AppError::Index(format!("{}: {}", context, e))
}

fn vector_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, true))
}

fn width(dimension: usize) -> AppResult<i32> {
    i32::try_from(dimension)
        .map_err(|_| AppError::Index(format!("Vector dimension {} is too large", dimension)))
}

fn table_schema(dimension: usize) -> AppResult<SchemaRef> {
    Ok(Arc::new(Schema::new(vec![
        Field::new(POSITION_COLUMN, DataType::UInt64, false),
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(vector_field(), width(dimension)?),
            false,
        ),
    ])))
}

/// Rows for `entries`, numbered from `first_position`.
fn entries_to_batch(
    dimension: usize,
    first_position: usize,
    entries: &[IndexedEntry],
) -> AppResult<RecordBatch> {
    let positions = UInt64Array::from_iter_values(
        (first_position..first_position + entries.len()).map(|p| p as u64),
    );
    let ids = StringArray::from_iter_values(entries.iter().map(|e| e.id.as_str()));
    let values =
        Float32Array::from_iter_values(entries.iter().flat_map(|e| e.vector.iter().copied()));
    let vectors =
        FixedSizeListArray::try_new(vector_field(), width(dimension)?, Arc::new(values), None)
            .map_err(index_error("Failed to build vector column"))?;

    RecordBatch::try_new(
        table_schema(dimension)?,
        vec![Arc::new(positions), Arc::new(ids), Arc::new(vectors)],
    )
    .map_err(index_error("Failed to build record batch"))
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| AppError::Index(format!("LanceDB rows are missing column '{}'", name)))
}

async fn create_table(dir: &Path, batches: Vec<RecordBatch>, schema: SchemaRef) -> AppResult<Table> {
    let uri = dir.to_string_lossy().to_string();
    let conn = lancedb::connect(&uri)
        .execute()
        .await
        .map_err(index_error("Failed to connect to LanceDB"))?;

    conn.create_table(
        TABLE_NAME,
        RecordBatchIterator::new(batches.into_iter().map(Ok), schema),
    )
    .execute()
    .await
    .map_err(index_error("Failed to create LanceDB table"))
}

#[async_trait]
impl VectorIndex for FlatL2Index {
    fn kind(&self) -> IndexKind {
        IndexKind::FlatL2
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn insert(&mut self, entries: Vec<IndexedEntry>) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let dimension = store::validate_batch(self.dimension, &entries)?;
        let batch = entries_to_batch(dimension, self.entries.len(), &entries)?;

        if let Some(working) = self.working.as_ref() {
            let schema = batch.schema();
            working
                .table
                .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
                .execute()
                .await
                .map_err(index_error("Failed to add rows"))?;
        } else {
            let dir = TempDir::new()?;
            let schema = batch.schema();
            let table = create_table(dir.path(), vec![batch], schema).await?;
            tracing::debug!("Created LanceDB working table at {:?}", dir.path());
            self.working = Some(WorkingTable { table, dir });
        }

        self.dimension = Some(dimension);
        for entry in entries {
            self.entries.push(entry.id, entry.text);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        store::check_query(self.dimension, vector)?;
        let Some(working) = self.working.as_ref() else {
            return Ok(Vec::new());
        };

        // Rank every row so exact ties can fall back to insertion position.
        let batches = working
            .table
            .vector_search(vector.to_vec())
            .map_err(index_error("Failed to create query"))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::L2)
            .limit(self.len())
            .execute()
            .await
            .map_err(index_error("Failed to execute search"))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(index_error("Failed to collect results"))?;

        let mut ranked: Vec<(usize, f32)> = Vec::with_capacity(self.len());
        for batch in &batches {
            let positions = column::<UInt64Array>(batch, POSITION_COLUMN)?;
            let distances = column::<Float32Array>(batch, DISTANCE_COLUMN)?;
            for row in 0..batch.num_rows() {
                let position = positions.value(row) as usize;
                ranked.push((position, 1.0 / (1.0 + distances.value(row))));
            }
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(hits_from_ranked(ranked, &self.entries))
    }

    fn source_text(&self, position: usize) -> Option<&str> {
        self.entries.text(position)
    }

    async fn save(&self, dir: &Path) -> AppResult<()> {
        fs::create_dir_all(dir)?;
        let table_dir = dir.join(TABLE_DIR);
        if table_dir.exists() {
            fs::remove_dir_all(&table_dir)?;
        }

        if let (Some(working), Some(dimension)) = (self.working.as_ref(), self.dimension) {
            let batches = Self::scan(&working.table, self.len()).await?;
            let schema = match batches.first() {
                Some(batch) => batch.schema(),
                None => table_schema(dimension)?,
            };
            create_table(dir, batches, schema).await?;
        }
        self.entries.write_metadata(dir)?;

        tracing::info!("Saved flat index with {} vectors to {:?}", self.len(), dir);
        Ok(())
    }

    async fn load(&mut self, dir: &Path) -> AppResult<()> {
        let metadata = EntryTable::read_metadata(dir)?;
        let table_dir = dir.join(TABLE_DIR);
        if !table_dir.exists() {
            if !metadata.is_empty() {
                return Err(AppError::Index(format!(
                    "Metadata lists {} entries but {:?} has no vector table",
                    metadata.len(),
                    dir
                )));
            }
            self.reset();
            return Ok(());
        }

        let uri = dir.to_string_lossy().to_string();
        let saved = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(index_error("Failed to connect to LanceDB"))?
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(index_error("Failed to open LanceDB table"))?;

        let count = saved
            .count_rows(None)
            .await
            .map_err(index_error("Failed to count rows"))?;
        if count != metadata.len() {
            return Err(AppError::Index(format!(
                "Metadata lists {} entries but the table holds {}",
                metadata.len(),
                count
            )));
        }

        let mut rows: Vec<(usize, Vec<f32>)> = Vec::with_capacity(count);
        for batch in Self::scan(&saved, count).await? {
            let positions = column::<UInt64Array>(&batch, POSITION_COLUMN)?;
            let vectors = column::<FixedSizeListArray>(&batch, VECTOR_COLUMN)?;
            for row in 0..batch.num_rows() {
                let list = vectors.value(row);
                let values = list
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| AppError::Index("Vector column is not f32".to_string()))?;
                rows.push((positions.value(row) as usize, values.values().to_vec()));
            }
        }
        rows.sort_by_key(|(position, _)| *position);

        let mut entries = Vec::with_capacity(rows.len());
        for (expected, (position, vector)) in rows.into_iter().enumerate() {
            let (Some(id), Some(text)) = (metadata.id(position), metadata.text(position)) else {
                return Err(AppError::Index(format!(
                    "Table row at position {} has no metadata entry",
                    position
                )));
            };
            if position != expected {
                return Err(AppError::Index(format!(
                    "Table positions are not contiguous at {}",
                    expected
                )));
            }
            entries.push(IndexedEntry::new(id, vector, text));
        }

        let mut fresh = FlatL2Index::new();
        fresh.insert(entries).await?;
        *self = fresh;

        tracing::info!("Loaded flat index with {} vectors from {:?}", count, dir);
        Ok(())
    }

    fn reset(&mut self) {
        self.dimension = None;
        self.entries.clear();
        self.working = None;
    }
}
