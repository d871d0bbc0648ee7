//! Configuration management for the resume shortlister

use crate::error::{Result, ResumeShortlisterError};
use crate::extraction::ner::MIN_WINDOW_TOKENS;
use crate::extraction::work_history::{DEFAULT_BULLET_SCAN_LINES, DEFAULT_FALLBACK_WINDOW_CHARS};
use crate::processing::ranker::TopPercent;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub extraction: ExtractionConfig,
    pub ranking: RankingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub embedding_model: String,
    pub ner_model: String,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub kind: ModelKind,
    pub size_mb: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Embedding,
    Ner,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Embedding => write!(f, "embedding"),
            ModelKind::Ner => write!(f, "ner"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub bullet_scan_lines: usize,
    pub fallback_window_chars: usize,
    pub ner_max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub default_top_percent: f64,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resume-shortlister")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: "potion-base-8M".to_string(),
                ner_model: "bert-base-ner".to_string(),
                available_models: vec![
                    // Model2Vec embedding models
                    AvailableModel {
                        name: "potion-base-8M".to_string(),
                        repo_id: "minishlab/potion-base-8M".to_string(),
                        kind: ModelKind::Embedding,
                        size_mb: 33,
                        description: "Model2Vec static embeddings, 256 dimensions".to_string(),
                    },
                    AvailableModel {
                        name: "m2v-base".to_string(),
                        repo_id: "minishlab/M2V_base_output".to_string(),
                        kind: ModelKind::Embedding,
                        size_mb: 90,
                        description: "Legacy Model2Vec base embeddings model".to_string(),
                    },
                    // Token-classification models
                    AvailableModel {
                        name: "bert-base-ner".to_string(),
                        repo_id: "dslim/bert-base-NER".to_string(),
                        kind: ModelKind::Ner,
                        size_mb: 430,
                        description: "BERT base fine-tuned on CoNLL-2003 (PER, ORG, LOC, MISC)".to_string(),
                    },
                    AvailableModel {
                        name: "bert-large-ner".to_string(),
                        repo_id: "dslim/bert-large-NER".to_string(),
                        kind: ModelKind::Ner,
                        size_mb: 1330,
                        description: "BERT large fine-tuned on CoNLL-2003, slower but more accurate".to_string(),
                    },
                ],
            },
            extraction: ExtractionConfig {
                bullet_scan_lines: DEFAULT_BULLET_SCAN_LINES,
                fallback_window_chars: DEFAULT_FALLBACK_WINDOW_CHARS,
                ner_max_tokens: 512,
            },
            ranking: RankingConfig {
                default_top_percent: 10.0,
                batch_size: 32,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Read the config at `path`, writing the defaults there on first run.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ResumeShortlisterError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ResumeShortlisterError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-shortlister")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        TopPercent::new(self.ranking.default_top_percent)?;

        if self.ranking.batch_size == 0 {
            return Err(ResumeShortlisterError::Configuration(
                "ranking.batch_size must be at least 1".to_string(),
            ));
        }
        if self.extraction.ner_max_tokens < MIN_WINDOW_TOKENS {
            return Err(ResumeShortlisterError::Configuration(format!(
                "extraction.ner_max_tokens must be at least {}",
                MIN_WINDOW_TOKENS
            )));
        }
        Ok(())
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<&AvailableModel> {
        self.models.available_models.iter().find(|m| m.name == name)
    }

    pub fn list_models(&self, kind: ModelKind) -> Vec<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .filter(|m| m.kind == kind)
            .collect()
    }

    /// Directory holding the configured model of `kind`.
    ///
    /// The configured value is either a registry name under `models_dir` or
    /// a path to a model directory.
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        let configured = match kind {
            ModelKind::Embedding => &self.models.embedding_model,
            ModelKind::Ner => &self.models.ner_model,
        };
        let as_path = Path::new(configured);
        if as_path.is_absolute() || as_path.is_dir() {
            as_path.to_path_buf()
        } else {
            self.models.models_dir.join(configured)
        }
    }
}
