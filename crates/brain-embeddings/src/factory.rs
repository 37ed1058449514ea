//! Embedder selection from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use brain_types::{EmbedderProvider, EmbedderSettings};
use tracing::info;

use crate::cache::ModelCache;
use crate::candle::CandleEmbedder;
use crate::error::EmbeddingError;
use crate::hashing::HashingEmbedder;
use crate::model::EmbeddingModel;

/// Build the embedder named by `settings`.
///
/// `cache_dir` overrides the platform cache directory for Candle model files.
/// A Candle model whose hidden size differs from the configured dimension is
/// rejected so that stored vectors never mix dimensions.
pub fn embedder_from_settings(
    settings: &EmbedderSettings,
    cache_dir: Option<PathBuf>,
) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
    let embedder: Arc<dyn EmbeddingModel> = match settings.provider {
        EmbedderProvider::Candle => {
            let cache = ModelCache::for_repo(settings.model_repo.clone(), cache_dir);
            Arc::new(CandleEmbedder::load(&cache)?)
        }
        EmbedderProvider::Hashing => Arc::new(HashingEmbedder::new(settings.dimension)?),
    };

    let actual = embedder.info().dimension;
    if actual != settings.dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: settings.dimension,
            actual,
        });
    }

    info!(model = %embedder.info().name, dim = actual, "Embedder selected");
    Ok(embedder)
}
