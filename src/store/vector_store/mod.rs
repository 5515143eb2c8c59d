
use super::{ChunkMetadata, EmbeddingRecord, IndexManifest, MANIFEST_FILE};
use crate::QaError;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";

/// Persisted vector index backed by LanceDB
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// Result of a similarity search, most similar first
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Build a new index at `index_dir` from embedding records.
    ///
    /// Any stale index data at the location is dropped first. The manifest,
    /// recording the embedding model and dimension, is written only after
    /// every record has been inserted, so its presence marks a fully built
    /// index.
    #[inline]
    pub async fn build(
        index_dir: &Path,
        embedding_model: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<Self, QaError> {
        let Some(first) = records.first() else {
            return Err(QaError::Index(
                "Cannot build an index from zero chunks; is the docs directory empty?".to_string(),
            ));
        };

        let dimension = first.vector.len();
        if dimension == 0 {
            return Err(QaError::Index("Embedding vectors are empty".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(QaError::Index(format!(
                "Inconsistent embedding dimensions: expected {}, got {} for record {}",
                dimension,
                bad.vector.len(),
                bad.id
            )));
        }

        std::fs::create_dir_all(index_dir).map_err(|e| {
            QaError::Index(format!(
                "Failed to create index directory {}: {}",
                index_dir.display(),
                e
            ))
        })?;
        // A leftover manifest from a previous build no longer describes the
        // data once we start rewriting it
        let stale_manifest = index_dir.join(MANIFEST_FILE);
        if stale_manifest.exists() {
            std::fs::remove_file(&stale_manifest)
                .map_err(|e| QaError::Index(format!("Failed to remove stale manifest: {}", e)))?;
        }

        let connection = connect(index_dir).await?;
        drop_table_if_exists(&connection).await?;

        let schema = create_schema(dimension);
        connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to create table: {}", e)))?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        };

        let entry_count = records.len();
        store.insert_records(&records).await?;

        let manifest = IndexManifest {
            embedding_model: embedding_model.to_string(),
            dimension,
            entry_count,
            created_at: Utc::now().to_rfc3339(),
        };
        manifest
            .write(index_dir)
            .map_err(|e| QaError::Index(format!("Failed to write index manifest: {}", e)))?;

        info!(
            "Built index at {} with {} entries ({} dimensions)",
            index_dir.display(),
            entry_count,
            dimension
        );
        Ok(store)
    }

    /// Reopen an existing index at `index_dir` without recomputing
    /// embeddings.
    ///
    /// Fails fast if `embedding_model` differs from the model recorded at
    /// build time; vectors from different models are not comparable.
    #[inline]
    pub async fn open(index_dir: &Path, embedding_model: &str) -> Result<Self, QaError> {
        let manifest = IndexManifest::read(index_dir)
            .map_err(|e| QaError::Index(format!("Failed to read index manifest: {}", e)))?;

        if manifest.embedding_model != embedding_model {
            return Err(QaError::Index(format!(
                "Index at {} was built with embedding model '{}' but '{}' is configured; \
                 rebuild the index or restore the original model",
                index_dir.display(),
                manifest.embedding_model,
                embedding_model
            )));
        }

        let connection = connect(index_dir).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to list tables: {}", e)))?;
        if !table_names.contains(&TABLE_NAME.to_string()) {
            return Err(QaError::Index(format!(
                "Index at {} has a manifest but no data table; delete the directory and rebuild",
                index_dir.display()
            )));
        }

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension: manifest.dimension,
        };

        let stored_dimension = store.detect_vector_dimension().await?;
        if stored_dimension != manifest.dimension {
            return Err(QaError::Index(format!(
                "Index manifest declares {} dimensions but the table stores {}",
                manifest.dimension, stored_dimension
            )));
        }

        info!(
            "Opened index at {} ({} entries, {} dimensions)",
            index_dir.display(),
            manifest.entry_count,
            manifest.dimension
        );
        Ok(store)
    }

    /// Vector dimension of the entries in this index
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Search for the `limit` entries nearest to the query vector,
    /// most similar first
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, QaError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if query_vector.len() != self.dimension {
            return Err(QaError::Index(format!(
                "Query vector has {} dimensions but the index stores {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to open table: {}", e)))?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| QaError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let mut stream = query
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| QaError::Index(format!("Failed to read result stream: {}", e)))?
        {
            results.extend(parse_search_batch(&batch)?);
        }

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Total number of entries stored in this index
    #[inline]
    pub async fn count_entries(&self) -> Result<u64, QaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn insert_records(&self, records: &[EmbeddingRecord]) -> Result<(), QaError> {
        debug!("Inserting {} embedding records", records.len());

        let record_batch = create_record_batch(records, self.dimension)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to insert embeddings: {}", e)))?;

        Ok(())
    }

    /// Read the vector dimension back from the stored table schema
    async fn detect_vector_dimension(&self) -> Result<usize, QaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Index(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| QaError::Index(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(QaError::Index(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }
}

async fn connect(index_dir: &Path) -> Result<Connection, QaError> {
    // file:// URIs require an absolute path
    let absolute = if index_dir.is_absolute() {
        index_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| QaError::Index(format!("Failed to resolve working directory: {}", e)))?
            .join(index_dir)
    };

    let uri = format!("file://{}", absolute.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| QaError::Index(format!("Failed to connect to LanceDB at {}: {}", uri, e)))
}

async fn drop_table_if_exists(connection: &Connection) -> Result<(), QaError> {
    let table_names = connection
        .table_names()
        .execute()
        .await
        .map_err(|e| QaError::Index(format!("Failed to list tables: {}", e)))?;

    if table_names.contains(&TABLE_NAME.to_string()) {
        debug!("Dropping stale table before rebuild");
        connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| QaError::Index(format!("Failed to drop table: {}", e)))?;
    }

    Ok(())
}

fn create_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, true),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(
    records: &[EmbeddingRecord],
    dimension: usize,
) -> Result<RecordBatch, QaError> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        sources.push(record.metadata.source.as_str());
        pages.push(record.metadata.page);
        chunk_indices.push(record.metadata.chunk_index);
        contents.push(record.metadata.content.as_str());
        created_ats.push(record.metadata.created_at.as_str());
    }

    let mut flat_values = Vec::with_capacity(len * dimension);
    for record in records {
        flat_values.extend_from_slice(&record.vector);
    }
    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| QaError::Index(format!("Failed to create vector array: {}", e)))?;

    let schema = create_schema(dimension);
    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| QaError::Index(format!("Failed to create record batch: {}", e)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, QaError> {
    let num_rows = batch.num_rows();
    let mut results = Vec::with_capacity(num_rows);

    let sources = string_column(batch, "source")?;
    let contents = string_column(batch, "content")?;
    let created_ats = string_column(batch, "created_at")?;
    let pages = uint32_column(batch, "page")?;
    let chunk_indices = uint32_column(batch, "chunk_index")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let metadata = ChunkMetadata {
            source: sources.value(row).to_string(),
            page: if pages.is_null(row) {
                None
            } else {
                Some(pages.value(row))
            },
            chunk_index: chunk_indices.value(row),
            content: contents.value(row).to_string(),
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(SearchResult {
            metadata,
            similarity_score: 1.0 - distance,
            distance,
        });
    }

    Ok(results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, QaError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| QaError::Index(format!("Invalid {} column type", name)))
}

fn uint32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, QaError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| QaError::Index(format!("Invalid {} column type", name)))
}
