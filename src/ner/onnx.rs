//! ONNX Runtime token classifier backing the learned extractor

use ndarray::{Array, Ix3, s};
use ort::session::{Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

use super::learned::SequenceLabeler;
use crate::core::pool::lock;
use crate::error::NerError;

/// Files a model directory must contain
pub const MODEL_FILES: [&str; 3] = ["model.onnx", "tokenizer.json", "labels.json"];

pub struct OnnxLabeler {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    /// BIO label of each output class index
    labels: Vec<String>,
}

fn load_err(what: &str, e: impl std::fmt::Display) -> NerError {
    NerError::ModelLoad(format!("{}: {}", what, e))
}

fn infer_err(what: &str, e: impl std::fmt::Display) -> NerError {
    NerError::Inference(format!("{}: {}", what, e))
}

impl OnnxLabeler {
    pub fn load(dir: &Path) -> Result<Self, NerError> {
        let raw = std::fs::read_to_string(dir.join("labels.json")).map_err(|e| load_err("labels.json", e))?;
        let labels: Vec<String> = serde_json::from_str(&raw).map_err(|e| load_err("labels.json", e))?;
        if labels.is_empty() {
            return Err(NerError::ModelLoad("labels.json has no labels".into()));
        }

        let tokenizer =
            Tokenizer::from_file(dir.join("tokenizer.json")).map_err(|e| load_err("tokenizer.json", e))?;
        let session = Session::builder()
            .map_err(|e| load_err("session builder", e))?
            .commit_from_file(dir.join("model.onnx"))
            .map_err(|e| load_err("model.onnx", e))?;

        tracing::info!(
            "Loaded entity model from {} ({} labels)",
            dir.display(),
            labels.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
        })
    }
}

impl SequenceLabeler for OnnxLabeler {
    fn label(&self, words: &[&str]) -> Result<Vec<String>, NerError> {
        let encoding = self
            .tokenizer
            .encode(words.to_vec(), true)
            .map_err(|e| infer_err("tokenization", e))?;
        let len = encoding.len();
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let ids = Array::from_shape_vec((1, len), ids).map_err(|e| infer_err("ids shape", e))?;
        let mask = Array::from_shape_vec((1, len), mask).map_err(|e| infer_err("mask shape", e))?;
        let types = Array::<i64, _>::zeros((1, len));

        let mut available: HashMap<&str, DynTensor> = HashMap::new();
        available.insert(
            "input_ids",
            Tensor::from_array(ids.into_dyn())
                .map_err(|e| infer_err("ids tensor", e))?
                .upcast(),
        );
        available.insert(
            "attention_mask",
            Tensor::from_array(mask.into_dyn())
                .map_err(|e| infer_err("mask tensor", e))?
                .upcast(),
        );
        available.insert(
            "token_type_ids",
            Tensor::from_array(types.into_dyn())
                .map_err(|e| infer_err("type tensor", e))?
                .upcast(),
        );

        let logits = {
            let mut session = lock(&self.session);
            let mut feed: HashMap<String, DynTensor> = HashMap::new();
            for input in &session.inputs {
                match available.remove(input.name.as_str()) {
                    Some(tensor) => {
                        feed.insert(input.name.clone(), tensor);
                    }
                    None => {
                        return Err(NerError::Inference(format!(
                            "unsupported model input '{}'",
                            input.name
                        )));
                    }
                }
            }
            let outputs = session
                .run(SessionInputs::from(feed))
                .map_err(|e| infer_err("forward", e))?;
            if outputs.len() == 0 {
                return Err(NerError::Inference("model returned no outputs".into()));
            }
            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| infer_err("logits", e))?
                .to_owned()
        };
        let logits = logits
            .into_dimensionality::<Ix3>()
            .map_err(|e| infer_err("logits shape", e))?;

        let positions = logits.shape()[1];
        let mut labels = vec!["O".to_string(); words.len()];
        let mut assigned = vec![false; words.len()];
        for (pos, word) in encoding.get_word_ids().iter().enumerate() {
            let Some(word) = word.map(|w| w as usize) else {
                continue;
            };
            // first sub-token of a word carries its label
            if pos >= positions || word >= words.len() || assigned[word] {
                continue;
            }
            let best = logits
                .slice(s![0, pos, ..])
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(class, _)| class);
            if let Some(label) = best.and_then(|class| self.labels.get(class)) {
                labels[word] = label.clone();
            }
            assigned[word] = true;
        }
        Ok(labels)
    }
}
