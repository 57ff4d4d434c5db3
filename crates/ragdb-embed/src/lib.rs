//! Embedding backends behind [`ragdb_core::traits::Embedder`].
//!
//! `hash` is always available. The XLM-RoBERTa model needs the `candle`
//! feature (add `metal` for Apple GPUs or `cuda` for NVIDIA GPUs).
use std::sync::Arc;

use tracing::info;

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::traits::Embedder;
use ragdb_core::{Error, Result};

pub mod hash;
#[cfg(feature = "candle")]
pub mod model;

pub use hash::HashEmbedder;
#[cfg(feature = "candle")]
pub use model::{masked_mean_l2, CandleEmbedder};

pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend.as_str() {
        "hash" => {
            info!(dim = settings.dim, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dim, settings.max_len)))
        }
        "candle" => load_candle(settings),
        other => Err(Error::InvalidConfig(format!("unknown embedding backend {other:?}"))),
    }
}

#[cfg(feature = "candle")]
fn load_candle(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dir = model::resolve_model_dir(settings.model_dir.as_deref()).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let embedder = CandleEmbedder::load(&dir, settings.max_len).map_err(|e| Error::collaborator("embedder", e))?;
    if embedder.dim() != settings.dim {
        return Err(Error::InvalidConfig(format!(
            "embedding.dim = {} but the model produces {} dimensions",
            settings.dim,
            embedder.dim()
        )));
    }
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "candle"))]
fn load_candle(_settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Err(Error::InvalidConfig("embedding backend \"candle\" requires building with the `candle` feature".into()))
}
