//! ragdb-vector
//!
//! Semantic index over a pluggable vector store: an in-memory brute-force
//! store and a LanceDB table.
use std::sync::Arc;

use tracing::info;

use ragdb_core::config::{expand_path, VectorSettings, MEMORY_LOCATION};
use ragdb_core::traits::VectorStore;
use ragdb_core::Result;

pub mod memory;
pub mod schema;
pub mod semantic;
pub mod table;

pub use memory::MemoryVectorStore;
pub use semantic::{CollectionStats, SemanticIndex};
pub use table::LanceVectorStore;

/// Open the store named by `settings.location` for vectors of width `dim`.
pub async fn open_store(settings: &VectorSettings, dim: usize) -> Result<Arc<dyn VectorStore>> {
    if settings.location == MEMORY_LOCATION {
        info!("using in-memory vector store");
        return Ok(Arc::new(MemoryVectorStore::new()));
    }
    let path = expand_path(&settings.location);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let uri = path.to_string_lossy();
    info!(uri = %uri, collection = %settings.collection, "opening lancedb store");
    Ok(Arc::new(LanceVectorStore::open(&uri, &settings.collection, dim).await?))
}
