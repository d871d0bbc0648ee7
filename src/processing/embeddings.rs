//! Embeddings generation using Model2Vec

use crate::error::{Result, ResumeShortlisterError};
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use std::path::Path;
use std::time::Instant;

/// Turns texts into fixed-length vectors, one per input, in input order.
///
/// Shared across concurrent ranking calls, hence `&self` and `Send + Sync`.
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}

pub struct EmbeddingEngine {
    model: StaticModel,
    batch_size: usize,
    model_name: String,
}

impl EmbeddingEngine {
    pub fn load(model_path: &Path, model_name: &str, batch_size: usize) -> Result<Self> {
        let start_time = Instant::now();

        info!("Loading Model2Vec embedding model from: {}", model_path.display());

        let model = StaticModel::from_pretrained(
            model_path,
            None, // token
            None, // normalize
            None, // subfolder
        )
        .map_err(|e| ResumeShortlisterError::ModelLoading(format!("Failed to load model: {}", e)))?;

        info!("Embedding model loaded in {:.2?}", start_time.elapsed());

        Ok(Self {
            model,
            batch_size: batch_size.max(1),
            model_name: model_name.to_string(),
        })
    }
}

impl Embedder for EmbeddingEngine {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start_time = Instant::now();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let batch_embeddings = self.model.encode(batch);
            if batch_embeddings.len() != batch.len() {
                return Err(ResumeShortlisterError::Inference(format!(
                    "Embedding model returned {} vectors for {} texts",
                    batch_embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(batch_embeddings);
        }

        debug!(
            "Encoded {} texts in {}ms",
            texts.len(),
            start_time.elapsed().as_millis()
        );

        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Zero-norm vectors score 0.0. A length mismatch means the vectors came
/// from different models and is reported as an inference failure.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ResumeShortlisterError::Inference(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}
