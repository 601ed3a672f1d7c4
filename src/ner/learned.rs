//! Learned sequence-labeling entity extraction
//!
//! Content is labeled one line at a time and BIO spans are decoded into
//! entities. The time budget is checked after the work completes: an
//! extraction that overran is discarded, never interrupted.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use super::EntityExtractor;
use super::pattern::PatternExtractor;
use crate::config::NerConfig;
use crate::core::pool::lock;
use crate::core::types::{EntityType, NamedEntity};
use crate::error::NerError;

/// Token classifier producing one BIO label per input word.
pub trait SequenceLabeler: Send + Sync {
    fn label(&self, words: &[&str]) -> Result<Vec<String>, NerError>;
}

type LabelerLoader = Box<dyn Fn() -> Result<Box<dyn SequenceLabeler>, NerError> + Send + Sync>;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[A-Za-z_$][\w$]*|\d+|\S").expect("valid token regex");
}

/// Byte spans of the word tokens of one line.
pub fn tokenize_line(line: &str) -> Vec<(usize, usize)> {
    TOKEN.find_iter(line).map(|m| (m.start(), m.end())).collect()
}

/// Decodes `B-<type> I-<type>*` runs into entities named by the source text
/// they cover. A stray `I-` tag opens a new span.
pub fn decode_bio(line: &str, spans: &[(usize, usize)], labels: &[String]) -> Vec<NamedEntity> {
    let mut entities = Vec::new();
    let mut current: Option<(String, usize, usize)> = None;

    let flush = |span: Option<(String, usize, usize)>, out: &mut Vec<NamedEntity>| {
        if let Some((kind, start, end)) = span {
            let name = line[start..end].trim();
            if !name.is_empty() {
                out.push(NamedEntity::new(name, EntityType::from_label(&kind)));
            }
        }
    };

    for (&(start, end), label) in spans.iter().zip(labels) {
        let (prefix, kind) = match label.split_once('-') {
            Some((prefix, kind)) => (prefix, kind),
            None => (label.as_str(), ""),
        };
        match prefix {
            "B" => {
                flush(current.take(), &mut entities);
                current = Some((kind.to_string(), start, end));
            }
            "I" => {
                let continues = matches!(&current, Some((open, _, _)) if open.as_str() == kind);
                if continues {
                    if let Some((_, _, open_end)) = current.as_mut() {
                        *open_end = end;
                    }
                } else {
                    flush(current.take(), &mut entities);
                    current = Some((kind.to_string(), start, end));
                }
            }
            _ => flush(current.take(), &mut entities),
        }
    }
    flush(current.take(), &mut entities);
    entities
}

/// Model-backed extractor with a soft time budget and a per-path cache.
///
/// The labeler is materialized on first use. If it cannot be loaded, every
/// call uses the pattern extractor instead.
pub struct LearnedExtractor {
    labeler: OnceLock<Option<Box<dyn SequenceLabeler>>>,
    loader: Option<LabelerLoader>,
    time_budget: Duration,
    cache_enabled: bool,
    /// One slot per path; concurrent callers for the same path wait on the
    /// slot instead of running the model twice.
    cache: Mutex<HashMap<String, Arc<OnceLock<Vec<NamedEntity>>>>>,
    fallback: PatternExtractor,
}

impl std::fmt::Debug for LearnedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedExtractor")
            .field("loaded", &self.labeler.get().map(Option::is_some))
            .field("time_budget", &self.time_budget)
            .field("cache_enabled", &self.cache_enabled)
            .field("cached", &self.cache_len())
            .finish()
    }
}

impl LearnedExtractor {
    fn with_parts(loader: Option<LabelerLoader>, config: &NerConfig) -> Self {
        Self {
            labeler: OnceLock::new(),
            loader,
            time_budget: Duration::from_millis(config.learned_time_budget_ms),
            cache_enabled: config.cache,
            cache: Mutex::new(HashMap::new()),
            fallback: PatternExtractor,
        }
    }

    /// Validates the model directory; the model itself loads on first use.
    #[cfg(feature = "onnx")]
    pub fn from_config(config: &NerConfig) -> Result<Self, NerError> {
        use super::onnx::{MODEL_FILES, OnnxLabeler};

        let dir = config
            .model_path
            .clone()
            .ok_or_else(|| NerError::BackendUnavailable("no model_path configured".into()))?;
        for file in MODEL_FILES {
            if !dir.join(file).is_file() {
                return Err(NerError::ModelLoad(format!(
                    "{} is missing from {}",
                    file,
                    dir.display()
                )));
            }
        }
        let loader: LabelerLoader = Box::new(move || {
            OnnxLabeler::load(&dir).map(|l| Box::new(l) as Box<dyn SequenceLabeler>)
        });
        Ok(Self::with_parts(Some(loader), config))
    }

    #[cfg(not(feature = "onnx"))]
    pub fn from_config(_config: &NerConfig) -> Result<Self, NerError> {
        Err(NerError::BackendUnavailable(
            "built without the `onnx` feature".into(),
        ))
    }

    /// Extractor over an already constructed labeler.
    pub fn with_labeler<L: SequenceLabeler + 'static>(labeler: L, config: &NerConfig) -> Self {
        let extractor = Self::with_parts(None, config);
        let _ = extractor
            .labeler
            .set(Some(Box::new(labeler) as Box<dyn SequenceLabeler>));
        extractor
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
    }

    fn labeler(&self) -> Option<&dyn SequenceLabeler> {
        self.labeler
            .get_or_init(|| {
                let loader = self.loader.as_ref()?;
                match loader() {
                    Ok(labeler) => Some(labeler),
                    Err(e) => {
                        tracing::warn!("Learned entity model unavailable, using patterns: {}", e);
                        None
                    }
                }
            })
            .as_deref()
    }

    fn label_content(&self, labeler: &dyn SequenceLabeler, content: &str) -> Result<Vec<NamedEntity>, NerError> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for line in content.lines() {
            let spans = tokenize_line(line);
            if spans.is_empty() {
                continue;
            }
            let words: Vec<&str> = spans.iter().map(|&(s, e)| &line[s..e]).collect();
            let labels = labeler.label(&words)?;
            if labels.len() != words.len() {
                return Err(NerError::Inference(format!(
                    "{} labels for {} tokens",
                    labels.len(),
                    words.len()
                )));
            }
            for entity in decode_bio(line, &spans, &labels) {
                if seen.insert(entity.clone()) {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    fn extract_uncached(&self, content: &str, path: &Path) -> Vec<NamedEntity> {
        let Some(labeler) = self.labeler() else {
            return self.fallback.extract_entities(content, path);
        };

        let started = Instant::now();
        let result = self.label_content(labeler, content);
        let elapsed = started.elapsed();

        match result {
            Ok(_) if elapsed > self.time_budget => {
                tracing::warn!(
                    "Learned extraction for {} took {:?} (budget {:?}), using patterns",
                    path.display(),
                    elapsed,
                    self.time_budget
                );
                self.fallback.extract_entities(content, path)
            }
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!("Learned extraction failed for {}: {}", path.display(), e);
                self.fallback.extract_entities(content, path)
            }
        }
    }
}

impl EntityExtractor for LearnedExtractor {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn extract_entities(&self, content: &str, path: &Path) -> Vec<NamedEntity> {
        if !self.cache_enabled {
            return self.extract_uncached(content, path);
        }
        let key = path.to_string_lossy().into_owned();
        let slot = Arc::clone(lock(&self.cache).entry(key).or_default());
        slot.get_or_init(|| self.extract_uncached(content, path)).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tags capitalized words as classes and `fn`-prefixed names as functions.
    struct RuleLabeler {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl RuleLabeler {
        fn new(delay: Duration) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    delay,
                },
                calls,
            )
        }
    }

    impl SequenceLabeler for RuleLabeler {
        fn label(&self, words: &[&str]) -> Result<Vec<String>, NerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let mut labels = Vec::with_capacity(words.len());
            for (i, word) in words.iter().enumerate() {
                let label = if i > 0 && words[i - 1] == "fn" {
                    "B-FUNC"
                } else if word.chars().next().is_some_and(char::is_uppercase) {
                    "B-CLASS"
                } else {
                    "O"
                };
                labels.push(label.to_string());
            }
            Ok(labels)
        }
    }

    struct BrokenLabeler;

    impl SequenceLabeler for BrokenLabeler {
        fn label(&self, _words: &[&str]) -> Result<Vec<String>, NerError> {
            Err(NerError::Inference("boom".into()))
        }
    }

    fn config(budget_ms: u64, cache: bool) -> NerConfig {
        NerConfig {
            learned_time_budget_ms: budget_ms,
            cache,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_bio_spans() {
        let line = "let total_count = Foo Bar;";
        let spans = tokenize_line(line);
        let words: Vec<&str> = spans.iter().map(|&(s, e)| &line[s..e]).collect();
        assert_eq!(words, vec!["let", "total_count", "=", "Foo", "Bar", ";"]);

        let labels: Vec<String> = ["O", "B-VAR", "O", "B-CLASS", "I-CLASS", "O"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let entities = decode_bio(line, &spans, &labels);
        assert_eq!(
            entities,
            vec![
                NamedEntity::new("total_count", EntityType::Variable),
                NamedEntity::new("Foo Bar", EntityType::Class),
            ]
        );
    }

    #[test]
    fn test_stray_inside_tag_opens_span() {
        let line = "a b";
        let spans = tokenize_line(line);
        let labels = vec!["I-FUNC".to_string(), "B-CLASS".to_string()];
        let entities = decode_bio(line, &spans, &labels);
        assert_eq!(entities[0], NamedEntity::new("a", EntityType::Function));
        assert_eq!(entities[1], NamedEntity::new("b", EntityType::Class));
    }

    #[test]
    fn test_learned_extraction_and_cache() {
        let (labeler, calls) = RuleLabeler::new(Duration::ZERO);
        let extractor = LearnedExtractor::with_labeler(labeler, &config(60_000, true));
        let content = "struct Parser;\nfn parse() {}\n";
        let path = Path::new("src/parser.rs");

        let first = extractor.extract_entities(content, path);
        assert!(first.contains(&NamedEntity::new("Parser", EntityType::Class)));
        assert!(first.contains(&NamedEntity::new("parse", EntityType::Function)));
        let after_first = calls.load(Ordering::SeqCst);
        assert_eq!(after_first, 2);

        let second = extractor.extract_entities("changed", path);
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), after_first);
        assert_eq!(extractor.cache_len(), 1);
    }

    #[test]
    fn test_budget_overrun_falls_back_to_patterns() {
        let (labeler, calls) = RuleLabeler::new(Duration::from_millis(5));
        let extractor = LearnedExtractor::with_labeler(labeler, &config(0, false));
        let content = "pub struct Slow;\n";
        let entities = extractor.extract_entities(content, Path::new("slow.rs"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(entities, vec![NamedEntity::new("Slow", EntityType::Class)]);
    }

    #[test]
    fn test_labeler_error_falls_back_to_patterns() {
        let extractor = LearnedExtractor::with_labeler(BrokenLabeler, &config(1_000, false));
        let entities = extractor.extract_entities("def run():\n    pass\n", Path::new("job.py"));
        assert_eq!(entities, vec![NamedEntity::new("run", EntityType::Function)]);
        assert_eq!(extractor.cache_len(), 0);
    }

    #[test]
    fn test_concurrent_callers_share_one_extraction() {
        let (labeler, calls) = RuleLabeler::new(Duration::from_millis(20));
        let extractor = Arc::new(LearnedExtractor::with_labeler(labeler, &config(60_000, true)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let extractor = Arc::clone(&extractor);
                std::thread::spawn(move || extractor.extract_entities("struct A;\n", Path::new("a.rs")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_backend_unavailable_without_feature() {
        assert!(matches!(
            LearnedExtractor::from_config(&NerConfig::default()),
            Err(NerError::BackendUnavailable(_))
        ));
    }
}
