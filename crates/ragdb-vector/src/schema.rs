use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};

use ragdb_core::types::{PointPayload, StoredPoint, Tags, VectorPoint};
use ragdb_core::{Error, Result};

pub const ID: &str = "id";
pub const TEXT: &str = "text";
pub const TAGS_JSON: &str = "tags_json";
pub const HASH: &str = "hash";
pub const VECTOR: &str = "vector";
const DISTANCE: &str = "_distance";

pub fn build_points_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(TEXT, DataType::Utf8, false),
        Field::new(TAGS_JSON, DataType::Utf8, false),
        Field::new(HASH, DataType::Utf8, false),
        Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

/// Vector width declared by a points schema.
pub fn schema_dim(schema: &Schema) -> Option<i32> {
    match schema.field_with_name(VECTOR).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n),
        _ => None,
    }
}

pub fn points_to_batch(points: &[VectorPoint], dim: i32) -> Result<RecordBatch> {
    let mut ids = Vec::with_capacity(points.len());
    let mut texts = Vec::with_capacity(points.len());
    let mut tags = Vec::with_capacity(points.len());
    let mut hashes = Vec::with_capacity(points.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());
    for p in points {
        if p.vector.len() != dim as usize {
            return Err(Error::invalid("vector dimension", format!("{} (collection expects {dim})", p.vector.len())));
        }
        ids.push(p.id.clone());
        texts.push(p.payload.text.clone());
        tags.push(serde_json::to_string(&p.payload.tags)?);
        hashes.push(p.payload.hash.clone());
        vectors.push(Some(p.vector.iter().map(|&x| Some(x)).collect()));
    }
    RecordBatch::try_new(
        build_points_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(tags)),
            Arc::new(StringArray::from(hashes)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
        ],
    )
    .map_err(|e| Error::collaborator("vector store", e))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::collaborator("vector store", format!("column {name} missing")))
}

/// Decode a search result batch. Similarity is `1 - _distance` (cosine).
pub fn batch_to_points(batch: &RecordBatch) -> Result<Vec<StoredPoint>> {
    let ids = string_column(batch, ID)?;
    let texts = string_column(batch, TEXT)?;
    let tags = string_column(batch, TAGS_JSON)?;
    let hashes = string_column(batch, HASH)?;
    let distances = batch.column_by_name(DISTANCE).and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let tags: Tags = serde_json::from_str(tags.value(i))?;
        let similarity = distances.filter(|d| !d.is_null(i)).map_or(0.0, |d| 1.0 - d.value(i));
        out.push(StoredPoint {
            id: ids.value(i).to_string(),
            payload: PointPayload { text: texts.value(i).to_string(), tags, hash: hashes.value(i).to_string() },
            similarity,
        });
    }
    Ok(out)
}
