//! LanceDB-backed vector store.
//!
//! One table per collection with columns `id`, `text`, `tags_json`, `hash` and
//! a fixed-size `vector`. Upserts go through `merge_insert` keyed on `id`, so
//! re-inserting a point overwrites it in place.
use std::fmt::Display;

use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use tracing::{debug, info};

use ragdb_core::traits::VectorStore;
use ragdb_core::types::{StoredPoint, VectorPoint};
use ragdb_core::{Error, Result};

use crate::schema::{batch_to_points, build_points_schema, points_to_batch, schema_dim, ID};

fn store_err(e: impl Display) -> Error { Error::collaborator("vector store", e) }

pub async fn open_db(uri: &str) -> Result<Connection> { connect(uri).execute().await.map_err(store_err) }

/// Create `name` with the points schema unless it already exists.
pub async fn ensure_table(conn: &Connection, name: &str, dim: i32) -> Result<Table> {
    let names = conn.table_names().execute().await.map_err(store_err)?;
    if !names.iter().any(|n| n == name) {
        let schema = build_points_schema(dim);
        // create empty table with 0 rows
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
        conn.create_table(name, Box::new(iter)).execute().await.map_err(store_err)?;
        info!(table = name, dim, "created collection");
    }
    let table = conn.open_table(name).execute().await.map_err(store_err)?;
    let existing = schema_dim(&table.schema().await.map_err(store_err)?);
    if existing != Some(dim) {
        return Err(Error::InvalidConfig(format!(
            "collection {name} stores vectors of width {existing:?}, embedder produces {dim}"
        )));
    }
    Ok(table)
}

pub struct LanceVectorStore {
    table: Table,
    name: String,
    dim: i32,
}

impl LanceVectorStore {
    pub async fn open(uri: &str, name: &str, dim: usize) -> Result<Self> {
        let dim = i32::try_from(dim).map_err(|_| Error::invalid("vector dimension", dim.to_string()))?;
        let conn = open_db(uri).await?;
        let table = ensure_table(&conn, name, dim).await?;
        Ok(Self { table, name: name.to_string(), dim })
    }

    pub fn name(&self) -> &str { &self.name }
}

fn id_filter(id: &str) -> String { format!("{ID} = '{}'", id.replace('\'', "''")) }

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let n = self.table.count_rows(Some(id_filter(id))).await.map_err(store_err)?;
        Ok(n > 0)
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let batch = points_to_batch(&points, self.dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = self.table.merge_insert(&[ID]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await.map_err(store_err)?;
        debug!(table = %self.name, points = points.len(), "upserted");
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoredPoint>> {
        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(vector.to_vec())
            .map_err(store_err)?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            out.extend(batch_to_points(&batch)?);
        }
        out.truncate(top_k);
        Ok(out)
    }

    async fn count(&self) -> Result<usize> { self.table.count_rows(None).await.map_err(store_err) }

    /// Deletes every point; the empty table and its schema remain.
    async fn drop_collection(&self) -> Result<()> {
        self.table.delete("true").await.map_err(store_err)?;
        info!(table = %self.name, "collection dropped");
        Ok(())
    }
}
