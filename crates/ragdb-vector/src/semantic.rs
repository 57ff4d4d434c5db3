use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ragdb_core::content;
use ragdb_core::traits::{Embedder, VectorStore};
use ragdb_core::types::{PointPayload, TextUnit, VectorPoint};
use ragdb_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub points_count: usize,
}

/// Embeds text units and keeps them in a vector store, one point per
/// distinct text.
///
/// Writers are serialized: the presence check and the store write of one
/// `upsert` never interleave with another, so each new id is reported to
/// exactly one caller. Clones share the lock.
#[derive(Clone)]
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    write_lock: Arc<Mutex<()>>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Store every unit whose text is not yet present. Returns the ids that
    /// were written, in input order. Only those texts are embedded.
    pub async fn upsert(&self, units: &[TextUnit]) -> Result<Vec<String>> {
        let _writer = self.write_lock.lock().await;
        let mut seen = HashSet::new();
        let mut fresh: Vec<(String, &TextUnit)> = Vec::new();
        for unit in units {
            let id = content::point_id(&unit.text);
            if !seen.insert(id.clone()) || self.store.contains(&id).await? {
                continue;
            }
            fresh.push((id, unit));
        }
        if fresh.is_empty() {
            debug!(requested = units.len(), "semantic upsert: nothing new");
            return Ok(Vec::new());
        }

        let max_len = self.embedder.max_len();
        let over = fresh.iter().filter(|(_, u)| u.text.split_whitespace().count() > max_len).count();
        if over > 0 {
            warn!(units = over, max_len, "texts exceed the embedder window and will be truncated");
        }

        let texts: Vec<String> = fresh.iter().map(|(_, u)| u.text.clone()).collect();
        let vectors = self.embed(texts).await?;
        if vectors.len() != fresh.len() {
            return Err(Error::collaborator("embedder", format!("returned {} vectors for {} texts", vectors.len(), fresh.len())));
        }

        let ids: Vec<String> = fresh.iter().map(|(id, _)| id.clone()).collect();
        let points = fresh
            .into_iter()
            .zip(vectors)
            .map(|((id, unit), vector)| VectorPoint {
                id,
                vector,
                payload: PointPayload { text: unit.text.clone(), tags: unit.tags.clone(), hash: content::digest_text(&unit.text).into_string() },
            })
            .collect();
        self.store.upsert(points).await?;
        debug!(requested = units.len(), written = ids.len(), "semantic upsert");
        Ok(ids)
    }

    /// Nearest units to `query`, best first.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<TextUnit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let mut vectors = self.embed(vec![query.to_string()]).await?;
        let Some(vector) = vectors.pop() else {
            return Err(Error::collaborator("embedder", "no vector for query"));
        };
        let hits = self.store.search(&vector, top_k).await?;
        Ok(hits.into_iter().map(|p| p.payload.into_unit(p.id)).collect())
    }

    pub async fn stats(&self) -> Result<CollectionStats> { Ok(CollectionStats { points_count: self.store.count().await? }) }

    pub async fn drop_collection(&self) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        self.store.drop_collection().await
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::collaborator("embedder", e))?
    }
}
