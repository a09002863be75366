
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ChunkRecord;
use crate::AssistantError;
use crate::retrieval::{ChunkMetadata, DocumentChunk};

/// Read handle over the persisted plan index
pub struct VectorStore {
    table: Table,
    table_name: String,
    vector_dimension: usize,
}

/// One row returned by a similarity search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open an existing index
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB dataset
    /// * `table_name` - Table with the embedded chunks
    ///
    /// # Returns
    /// * `Result<Self, AssistantError>` - Store handle, or a retrieval error when the
    ///   directory or table does not exist
    #[inline]
    pub async fn open(db_path: &Path, table_name: &str) -> crate::Result<Self> {
        if !db_path.exists() {
            return Err(AssistantError::Retrieval(format!(
                "Vector index not found at {}",
                db_path.display()
            )));
        }

        let connection = connect(db_path).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| index_error("Failed to list tables", &e))?;

        if !table_names.iter().any(|name| name == table_name) {
            return Err(AssistantError::Retrieval(format!(
                "Table '{}' not found in vector index at {}",
                table_name,
                db_path.display()
            )));
        }

        let table = connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| index_error("Failed to open table", &e))?;

        let vector_dimension = detect_vector_dimension(&table).await?;

        info!(
            "Opened vector index at {} (table '{}', {} dimensions)",
            db_path.display(),
            table_name,
            vector_dimension
        );

        Ok(Self {
            table,
            table_name: table_name.to_string(),
            vector_dimension,
        })
    }

    /// Append records to an index, creating the directory and table when missing.
    ///
    /// The production index is produced by the ingestion pipeline; this exists for
    /// fixtures and small imports.
    #[inline]
    pub async fn write_chunks(
        db_path: &Path,
        table_name: &str,
        records: &[ChunkRecord],
    ) -> crate::Result<Self> {
        let first = records.first().ok_or_else(|| {
            AssistantError::Retrieval("Cannot write an empty set of chunks".to_string())
        })?;
        let vector_dim = first.vector.len();

        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(AssistantError::Retrieval(format!(
                "Record {} has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                vector_dim
            )));
        }

        std::fs::create_dir_all(db_path)?;
        let connection = connect(db_path).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| index_error("Failed to list tables", &e))?;

        if !table_names.iter().any(|name| name == table_name) {
            debug!(
                "Creating table '{}' with {} dimensions",
                table_name, vector_dim
            );
            connection
                .create_empty_table(table_name, create_schema(vector_dim))
                .execute()
                .await
                .map_err(|e| index_error("Failed to create table", &e))?;
        }

        let table = connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| index_error("Failed to open table", &e))?;

        let existing_dim = detect_vector_dimension(&table).await?;
        if existing_dim != vector_dim {
            return Err(AssistantError::Retrieval(format!(
                "Table '{}' stores {} dimensions, records have {}",
                table_name, existing_dim, vector_dim
            )));
        }

        let record_batch = create_record_batch(records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| index_error("Failed to insert chunks", &e))?;

        info!("Stored {} chunks in '{}'", records.len(), table_name);

        Ok(Self {
            table,
            table_name: table_name.to_string(),
            vector_dimension: vector_dim,
        })
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Nearest-neighbour search, nearest first
    ///
    /// # Arguments
    /// * `query_vector` - Embedding of the query, same model as the index
    /// * `limit` - Maximum number of hits to return
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> crate::Result<Vec<SearchHit>> {
        if query_vector.len() != self.vector_dimension {
            return Err(AssistantError::Retrieval(format!(
                "Query embedding has {} dimensions but the index stores {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching '{}' with limit {}", self.table_name, limit);

        let results = self
            .table
            .vector_search(query_vector)
            .map_err(|e| index_error("Failed to create vector search", &e))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| index_error("Failed to execute search", &e))?;

        let mut hits = parse_search_results_stream(results).await?;

        // Keep nearest first whatever order the batches arrived in
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    /// Get the total number of chunks stored
    #[inline]
    pub async fn count_chunks(&self) -> crate::Result<u64> {
        let count = self
            .table
            .count_rows(None)
            .await
            .map_err(|e| index_error("Failed to count rows", &e))?;

        Ok(count as u64)
    }
}

async fn connect(db_path: &Path) -> crate::Result<Connection> {
    let uri = db_path.to_string_lossy().to_string();
    debug!("Connecting to LanceDB at {}", uri);

    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| index_error("Failed to connect to LanceDB", &e))
}

fn index_error(context: &str, error: &dyn std::fmt::Display) -> AssistantError {
    AssistantError::Retrieval(format!("{}: {}", context, error))
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("page_label", DataType::Utf8, true),
        Field::new("source", DataType::Utf8, true),
        Field::new("page", DataType::UInt32, true),
    ]))
}

async fn detect_vector_dimension(table: &Table) -> crate::Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| index_error("Failed to get table schema", &e))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return Ok(*size as usize);
            }
        }
    }

    Err(AssistantError::Retrieval(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

fn create_record_batch(records: &[ChunkRecord], vector_dim: usize) -> crate::Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut texts = Vec::with_capacity(len);
    let mut page_labels = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        texts.push(record.chunk.text.as_str());
        page_labels.push(record.chunk.metadata.page_label.as_deref());
        sources.push(record.chunk.metadata.source.as_deref());
        pages.push(record.chunk.metadata.page);
    }

    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| AssistantError::Retrieval(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(page_labels)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| AssistantError::Retrieval(format!("Failed to create record batch: {}", e)))
}

async fn parse_search_results_stream(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> crate::Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| index_error("Failed to read result stream", &e))?
    {
        hits.extend(parse_search_batch(&batch)?);
    }

    Ok(hits)
}

/// Parse a single record batch from search results.
///
/// `text` is required; metadata columns missing from older indexes read as absent.
fn parse_search_batch(batch: &RecordBatch) -> crate::Result<Vec<SearchHit>> {
    let texts = batch
        .column_by_name("text")
        .ok_or_else(|| AssistantError::Retrieval("Missing text column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AssistantError::Retrieval("Invalid text column type".to_string()))?;

    let page_labels = optional_column::<StringArray>(batch, "page_label")?;
    let sources = optional_column::<StringArray>(batch, "source")?;
    let pages = optional_column::<UInt32Array>(batch, "page")?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    if distances.is_none() {
        warn!("Search results carry no _distance column");
    }

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let metadata = ChunkMetadata {
            page_label: string_value(page_labels, row),
            source: string_value(sources, row),
            page: pages.and_then(|p| (!p.is_null(row)).then(|| p.value(row))),
        };

        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(SearchHit {
            chunk: DocumentChunk {
                text: texts.value(row).to_string(),
                metadata,
            },
            // Cosine distance, so this is the cosine similarity
            similarity_score: 1.0 - distance,
            distance,
        });
    }

    Ok(hits)
}

fn optional_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> crate::Result<Option<&'a T>> {
    batch
        .column_by_name(name)
        .map(|column| {
            column
                .as_any()
                .downcast_ref::<T>()
                .ok_or_else(|| AssistantError::Retrieval(format!("Invalid {} column type", name)))
        })
        .transpose()
}

fn string_value(column: Option<&StringArray>, row: usize) -> Option<String> {
    column.and_then(|c| (!c.is_null(row)).then(|| c.value(row).to_string()))
}
