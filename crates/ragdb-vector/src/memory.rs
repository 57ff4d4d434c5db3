use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use ragdb_core::traits::VectorStore;
use ragdb_core::types::{StoredPoint, VectorPoint};
use ragdb_core::{Error, Result};

#[derive(Default)]
struct Points {
    order: Vec<VectorPoint>,
    by_id: HashMap<String, usize>,
}

/// Brute-force cosine store held in process memory.
///
/// Overwriting a point keeps its original position, so equal similarities
/// rank in first-insertion order.
#[derive(Default)]
pub struct MemoryVectorStore {
    points: RwLock<Points>,
}

impl MemoryVectorStore {
    pub fn new() -> Self { Self::default() }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn contains(&self, id: &str) -> Result<bool> { Ok(self.points.read().by_id.contains_key(id)) }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        let mut guard = self.points.write();
        for point in points {
            if let Some(existing) = guard.order.first() {
                if existing.vector.len() != point.vector.len() {
                    return Err(Error::invalid(
                        "vector dimension",
                        format!("{} (collection expects {})", point.vector.len(), existing.vector.len()),
                    ));
                }
            }
            match guard.by_id.get(&point.id).copied() {
                Some(i) => guard.order[i] = point,
                None => {
                    let i = guard.order.len();
                    guard.by_id.insert(point.id.clone(), i);
                    guard.order.push(point);
                }
            }
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoredPoint>> {
        let guard = self.points.read();
        let mut scored: Vec<(usize, f32)> = guard.order.iter().enumerate().map(|(i, p)| (i, cosine(vector, &p.vector))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, similarity)| {
                let p = &guard.order[i];
                StoredPoint { id: p.id.clone(), payload: p.payload.clone(), similarity }
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> { Ok(self.points.read().order.len()) }

    async fn drop_collection(&self) -> Result<()> {
        *self.points.write() = Points::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::types::{PointPayload, Tags};

    fn point(id: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint { id: id.into(), vector, payload: PointPayload { text: id.into(), tags: Tags::new(), hash: id.into() } }
    }

    #[tokio::test]
    async fn nearest_first_and_ties_in_insertion_order() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![point("far", vec![0.0, 1.0]), point("a", vec![1.0, 0.0]), point("b", vec![2.0, 0.0])])
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "far"]);
    }

    #[tokio::test]
    async fn overwrite_keeps_count() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![point("a", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(vec![point("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.contains("a").await.unwrap());
        assert!(store.upsert(vec![point("c", vec![1.0])]).await.is_err());
        store.drop_collection().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }
}
