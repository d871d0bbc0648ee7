//! Named-entity recognition with a BERT token-classification model on Candle

use crate::error::{Result, ResumeShortlisterError};
use crate::extraction::entities::EntityKind;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

/// Smallest token window a model is run with, [CLS] and [SEP] included.
pub const MIN_WINDOW_TOKENS: usize = 8;

/// Token window actually used: the configured size, bounded by the model's
/// position table.
pub fn window_tokens(requested: usize, max_positions: usize) -> usize {
    requested.min(max_positions).max(MIN_WINDOW_TOKENS)
}

/// A typed span of the input text.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpan {
    pub text: String,
    pub kind: EntityKind,
    /// Byte offsets into the recognized text
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// Anything that can tag spans of free text with entity kinds.
///
/// Implementations are shared across concurrent parse calls, so `recognize`
/// takes `&self` and must be safe to call from several threads at once.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Entity kinds this recognizer can emit.
    fn kinds(&self) -> &[EntityKind];
}

/// Map a model label (`B-PER`, `I-ORG`, `GPE`, ...) to an entity kind.
pub fn label_to_kind(label: &str) -> Option<EntityKind> {
    let bare = label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label);

    match bare.to_uppercase().as_str() {
        "PER" | "PERSON" => Some(EntityKind::Person),
        "ORG" => Some(EntityKind::Org),
        "LOC" | "GPE" | "LOCATION" => Some(EntityKind::Location),
        "DATE" => Some(EntityKind::Date),
        "EMAIL" => Some(EntityKind::Email),
        "PHONE" => Some(EntityKind::Phone),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tag {
    Begin(EntityKind),
    Inside(EntityKind),
    Outside,
}

fn parse_tag(label: &str) -> Tag {
    match label_to_kind(label) {
        Some(kind) if label.starts_with("I-") => Tag::Inside(kind),
        Some(kind) => Tag::Begin(kind),
        None => Tag::Outside,
    }
}

/// Per-token model output, aligned with the tokenizer encoding.
#[derive(Debug, Clone)]
pub(crate) struct TokenPrediction {
    pub label: usize,
    pub score: f32,
    pub offsets: (usize, usize),
    pub word: Option<u32>,
}

struct PendingSpan {
    kind: EntityKind,
    start: usize,
    end: usize,
    score_sum: f32,
    tokens: usize,
}

impl PendingSpan {
    fn finish(self, text: &str) -> Option<EntitySpan> {
        let surface = text.get(self.start..self.end)?.trim();
        if surface.is_empty() {
            return None;
        }
        Some(EntitySpan {
            text: surface.to_string(),
            kind: self.kind,
            start: self.start,
            end: self.end,
            score: self.score_sum / self.tokens as f32,
        })
    }
}

/// Group BIO-tagged tokens into spans.
///
/// Word-piece continuations follow the tag of their word's first piece.
pub(crate) fn decode_spans(
    text: &str,
    predictions: &[TokenPrediction],
    id2label: &[String],
) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut current: Option<PendingSpan> = None;
    let mut previous_word: Option<u32> = None;

    for prediction in predictions {
        let (start, end) = prediction.offsets;
        if start == end {
            continue;
        }

        let continuation = prediction.word.is_some() && prediction.word == previous_word;
        previous_word = prediction.word;

        if continuation {
            if let Some(span) = current.as_mut() {
                span.end = end;
                span.score_sum += prediction.score;
                span.tokens += 1;
            }
            continue;
        }

        let label = id2label.get(prediction.label).map(String::as_str).unwrap_or("O");
        match parse_tag(label) {
            Tag::Inside(kind) if current.as_ref().is_some_and(|span| span.kind == kind) => {
                if let Some(span) = current.as_mut() {
                    span.end = end;
                    span.score_sum += prediction.score;
                    span.tokens += 1;
                }
            }
            Tag::Begin(kind) | Tag::Inside(kind) => {
                if let Some(span) = current.take().and_then(|s| s.finish(text)) {
                    spans.push(span);
                }
                current = Some(PendingSpan {
                    kind,
                    start,
                    end,
                    score_sum: prediction.score,
                    tokens: 1,
                });
            }
            Tag::Outside => {
                if let Some(span) = current.take().and_then(|s| s.finish(text)) {
                    spans.push(span);
                }
            }
        }
    }

    if let Some(span) = current.take().and_then(|s| s.finish(text)) {
        spans.push(span);
    }

    spans
}

#[derive(Debug, Deserialize)]
struct LabelConfig {
    hidden_size: usize,
    #[serde(default = "default_max_positions")]
    max_position_embeddings: usize,
    id2label: HashMap<String, String>,
}

fn default_max_positions() -> usize {
    512
}

/// BERT encoder plus a linear classification head, loaded once at startup.
///
/// Immutable after `load`; `recognize` only reads weights, so one instance is
/// shared behind an `Arc` by every parse task.
pub struct NerModel {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    id2label: Vec<String>,
    kinds: Vec<EntityKind>,
    device: Device,
    max_tokens: usize,
    cls_id: u32,
    sep_id: u32,
    model_name: String,
}

impl NerModel {
    /// Load from a directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`.
    pub fn load(model_dir: &Path, max_tokens: usize) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading NER model from: {}", model_dir.display());

        let device = get_device_with_override()?;

        let config_content = std::fs::read_to_string(model_dir.join("config.json")).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to read NER config: {}", e))
        })?;
        let bert_config: BertConfig = serde_json::from_str(&config_content).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to parse BERT config: {}", e))
        })?;
        let label_config: LabelConfig = serde_json::from_str(&config_content).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to parse NER labels: {}", e))
        })?;

        let id2label = ordered_labels(&label_config.id2label)?;
        let mut kinds: Vec<EntityKind> = Vec::new();
        for kind in id2label.iter().filter_map(|label| label_to_kind(label)) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to load tokenizer: {}", e))
        })?;
        tokenizer.with_padding(None);
        tokenizer.with_truncation(None).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to configure tokenizer: {}", e))
        })?;

        let cls_id = tokenizer.token_to_id("[CLS]").ok_or_else(|| {
            ResumeShortlisterError::ModelLoading("Tokenizer has no [CLS] token".to_string())
        })?;
        let sep_id = tokenizer.token_to_id("[SEP]").ok_or_else(|| {
            ResumeShortlisterError::ModelLoading("Tokenizer has no [SEP] token".to_string())
        })?;

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(ResumeShortlisterError::ModelLoading(format!(
                "Model weights not found: {}",
                weights_path.display()
            )));
        }

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device).map_err(|e| {
                ResumeShortlisterError::ModelLoading(format!("Failed to load safetensors: {}", e))
            })?
        };

        let model = BertModel::load(vb.pp("bert"), &bert_config).map_err(|e| {
            ResumeShortlisterError::ModelLoading(format!("Failed to load BERT encoder: {}", e))
        })?;
        let classifier = candle_nn::linear(label_config.hidden_size, id2label.len(), vb.pp("classifier"))
            .map_err(|e| {
                ResumeShortlisterError::ModelLoading(format!("Failed to load classifier head: {}", e))
            })?;

        if !kinds.contains(&EntityKind::Date) {
            debug!("NER model has no DATE label; dates will come from pattern rules");
        }

        let window = window_tokens(max_tokens, label_config.max_position_embeddings);
        if window != max_tokens {
            warn!(
                "NER window of {} tokens adjusted to {} (model supports {} positions)",
                max_tokens, window, label_config.max_position_embeddings
            );
        }

        info!(
            "NER model loaded in {:.2?} ({} labels)",
            start_time.elapsed(),
            id2label.len()
        );

        Ok(Self {
            model,
            classifier,
            tokenizer,
            id2label,
            kinds,
            device,
            max_tokens: window,
            cls_id,
            sep_id,
            model_name: model_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Run one window of token ids through the network and return, per input
    /// token, the best label and its probability.
    fn classify_window(&self, ids: &[u32]) -> Result<Vec<(usize, f32)>> {
        let mut input = Vec::with_capacity(ids.len() + 2);
        input.push(self.cls_id);
        input.extend_from_slice(ids);
        input.push(self.sep_id);

        let input_ids = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        let logits = self.classifier.forward(&hidden)?;
        let probs = candle_nn::ops::softmax_last_dim(&logits)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()?;

        // Skip [CLS] and [SEP]
        let best = probs[1..probs.len() - 1]
            .iter()
            .map(|row| {
                row.iter()
                    .copied()
                    .enumerate()
                    .fold((0usize, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best })
            })
            .collect();

        Ok(best)
    }
}

impl EntityRecognizer for NerModel {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| ResumeShortlisterError::Inference(format!("Tokenization failed: {}", e)))?;

        let ids = encoding.get_ids();
        let offsets = encoding.get_offsets();
        let words = encoding.get_word_ids();

        let window = self.max_tokens - 2;
        let mut predictions = Vec::with_capacity(ids.len());

        for (chunk_idx, chunk) in ids.chunks(window).enumerate() {
            let labels = self.classify_window(chunk)?;
            if labels.len() != chunk.len() {
                return Err(ResumeShortlisterError::Inference(format!(
                    "NER output length {} does not match window length {}",
                    labels.len(),
                    chunk.len()
                )));
            }

            let base = chunk_idx * window;
            for (i, (label, score)) in labels.into_iter().enumerate() {
                predictions.push(TokenPrediction {
                    label,
                    score,
                    offsets: offsets[base + i],
                    word: words[base + i],
                });
            }
        }

        let spans = decode_spans(text, &predictions, &self.id2label);
        debug!("NER found {} spans in {} tokens", spans.len(), ids.len());
        Ok(spans)
    }

    fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }
}

fn ordered_labels(id2label: &HashMap<String, String>) -> Result<Vec<String>> {
    let mut labels = vec![String::new(); id2label.len()];
    for (id, label) in id2label {
        let idx: usize = id.parse().map_err(|_| {
            ResumeShortlisterError::ModelLoading(format!("Invalid label id in config: {}", id))
        })?;
        let slot = labels.get_mut(idx).ok_or_else(|| {
            ResumeShortlisterError::ModelLoading(format!("Label id {} out of range", idx))
        })?;
        *slot = label.clone();
    }
    Ok(labels)
}

/// Get the best available device for inference (GPU if available, CPU fallback)
pub fn get_best_device() -> Result<Device> {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA GPU for NER inference");
            return Ok(device);
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU for NER inference");
                return Ok(device);
            }
            Err(e) => warn!("Metal GPU initialization failed: {}", e),
        }
    }

    Ok(Device::Cpu)
}

/// Get device with optional user override from `RESUME_SHORTLISTER_DEVICE`
pub fn get_device_with_override() -> Result<Device> {
    if let Ok(device_preference) = std::env::var("RESUME_SHORTLISTER_DEVICE") {
        match device_preference.to_lowercase().as_str() {
            "cuda" => {
                #[cfg(feature = "cuda")]
                {
                    return Device::new_cuda(0).map_err(|e| {
                        ResumeShortlisterError::ModelLoading(format!("Failed to initialize CUDA: {}", e))
                    });
                }
                #[cfg(not(feature = "cuda"))]
                {
                    return Err(ResumeShortlisterError::ModelLoading(
                        "CUDA support not compiled in".to_string(),
                    ));
                }
            }
            "metal" => {
                #[cfg(feature = "metal")]
                {
                    return Device::new_metal(0).map_err(|e| {
                        ResumeShortlisterError::ModelLoading(format!("Failed to initialize Metal: {}", e))
                    });
                }
                #[cfg(not(feature = "metal"))]
                {
                    return Err(ResumeShortlisterError::ModelLoading(
                        "Metal support not compiled in".to_string(),
                    ));
                }
            }
            "cpu" => return Ok(Device::Cpu),
            other => warn!("Unknown device '{}', falling back to auto-detection", other),
        }
    }

    get_best_device()
}
