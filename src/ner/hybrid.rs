//! Per-file choice between the learned, structural and pattern extractors

use std::path::Path;

use super::EntityExtractor;
use super::learned::LearnedExtractor;
use super::pattern::PatternExtractor;
use super::structural::StructuralExtractor;
use crate::config::NerConfig;
use crate::core::types::NamedEntity;

/// Picks the learned extractor for content above the size threshold, the
/// structural one otherwise, and patterns when neither is available.
///
/// A backend that fails to construct stays unavailable for the dispatcher's
/// lifetime.
#[derive(Debug)]
pub struct HybridDispatcher {
    learned: Option<LearnedExtractor>,
    structural: Option<StructuralExtractor>,
    pattern: PatternExtractor,
    learned_size_threshold: u64,
}

impl HybridDispatcher {
    pub fn new(config: &NerConfig) -> Self {
        let learned = if config.hybrid_use_learned {
            LearnedExtractor::from_config(config)
                .map_err(|e| tracing::warn!("Hybrid entity recognition without learned model: {}", e))
                .ok()
        } else {
            None
        };
        let structural = if config.hybrid_use_structural {
            StructuralExtractor::new()
                .map_err(|e| tracing::warn!("Hybrid entity recognition without parser: {}", e))
                .ok()
        } else {
            None
        };
        Self::from_parts(learned, structural, config.learned_size_threshold)
    }

    pub fn from_parts(
        learned: Option<LearnedExtractor>,
        structural: Option<StructuralExtractor>,
        learned_size_threshold: u64,
    ) -> Self {
        Self {
            learned,
            structural,
            pattern: PatternExtractor,
            learned_size_threshold,
        }
    }

    pub fn has_learned(&self) -> bool {
        self.learned.is_some()
    }

    pub fn has_structural(&self) -> bool {
        self.structural.is_some()
    }

    /// Extractor that handles content of `size` bytes.
    pub fn select(&self, size: u64) -> &dyn EntityExtractor {
        if let Some(learned) = &self.learned {
            if size > self.learned_size_threshold {
                return learned;
            }
        }
        if let Some(structural) = &self.structural {
            return structural;
        }
        &self.pattern
    }
}

impl EntityExtractor for HybridDispatcher {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn extract_entities(&self, content: &str, path: &Path) -> Vec<NamedEntity> {
        let extractor = self.select(content.len() as u64);
        tracing::debug!("Extracting entities of {} with {}", path.display(), extractor.name());
        extractor.extract_entities(content, path)
    }
}
