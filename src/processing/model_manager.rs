//! Local model directory management and Hugging Face Hub downloads

use crate::config::{AvailableModel, Config, ModelKind};
use crate::error::{Result, ResumeShortlisterError};
use crate::extraction::ner::NerModel;
use crate::processing::embeddings::EmbeddingEngine;
use hf_hub::api::tokio::Api;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// A file to fetch from a model repo. The first source that exists is
/// copied to `dest`.
struct RemoteFile {
    dest: &'static str,
    sources: &'static [&'static str],
    required: bool,
}

const EMBEDDING_FILES: &[RemoteFile] = &[
    RemoteFile { dest: "model.safetensors", sources: &["model.safetensors"], required: true },
    RemoteFile { dest: "tokenizer.json", sources: &["tokenizer.json"], required: true },
    RemoteFile { dest: "config.json", sources: &["config.json"], required: false },
    RemoteFile { dest: "README.md", sources: &["README.md"], required: false },
];

// Some NER repos only ship a fast tokenizer with their ONNX export
const NER_FILES: &[RemoteFile] = &[
    RemoteFile { dest: "config.json", sources: &["config.json"], required: true },
    RemoteFile { dest: "tokenizer.json", sources: &["tokenizer.json", "onnx/tokenizer.json"], required: true },
    RemoteFile { dest: "model.safetensors", sources: &["model.safetensors"], required: true },
    RemoteFile { dest: "tokenizer_config.json", sources: &["tokenizer_config.json"], required: false },
];

fn files_for(kind: ModelKind) -> &'static [RemoteFile] {
    match kind {
        ModelKind::Embedding => EMBEDDING_FILES,
        ModelKind::Ner => NER_FILES,
    }
}

/// True when `path` holds every required file for a model of `kind`.
pub async fn is_valid_model_directory(path: &Path, kind: ModelKind) -> bool {
    for file in files_for(kind).iter().filter(|f| f.required) {
        if fs::metadata(path.join(file.dest)).await.is_err() {
            return false;
        }
    }
    true
}

/// Manager for local models: handles download, scanning and removal
pub struct ModelManager {
    models_dir: PathBuf,
    available_models: HashMap<String, AvailableModel>,
    downloaded_models: HashSet<String>,
}

impl ModelManager {
    pub async fn new(models_dir: PathBuf, available: &[AvailableModel]) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                ResumeShortlisterError::ModelError(format!("Failed to create models directory: {}", e))
            })?;
        }

        let mut manager = Self {
            models_dir,
            available_models: available.iter().map(|m| (m.name.clone(), m.clone())).collect(),
            downloaded_models: HashSet::new(),
        };

        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.models.models_dir.clone(), &config.models.available_models).await
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        self.downloaded_models.clear();

        for (name, model) in &self.available_models {
            let path = self.models_dir.join(name);
            if is_valid_model_directory(&path, model.kind).await {
                self.downloaded_models.insert(name.clone());
            }
        }

        Ok(())
    }

    /// Download a registered model from Hugging Face Hub.
    ///
    /// Returns the existing directory without network access when the model
    /// is already present, unless `force` is set.
    pub async fn download_model(&mut self, name: &str, force: bool) -> Result<PathBuf> {
        let model = self
            .available_models
            .get(name)
            .cloned()
            .ok_or_else(|| ResumeShortlisterError::ModelNotFound(format!("Unknown model: {}", name)))?;

        let model_dir = self.models_dir.join(name);

        if self.downloaded_models.contains(name) && !force {
            return Ok(model_dir);
        }

        println!("📥 Downloading {} model: {} ({} MB)", model.kind, model.name, model.size_mb);
        println!("📍 Repository: {}", model.repo_id);

        fs::create_dir_all(&model_dir).await.map_err(|e| {
            ResumeShortlisterError::ModelError(format!("Failed to create model directory: {}", e))
        })?;

        let api = Api::new()
            .map_err(|e| ResumeShortlisterError::ModelError(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(hf_hub::Repo::model(model.repo_id.clone()));

        for file in files_for(model.kind) {
            let mut fetched = None;
            let mut last_error = String::new();

            for source in file.sources {
                match repo.get(source).await {
                    Ok(path) => {
                        fetched = Some(path);
                        break;
                    }
                    Err(e) => last_error = e.to_string(),
                }
            }

            match fetched {
                Some(cached_path) => {
                    fs::copy(&cached_path, model_dir.join(file.dest)).await.map_err(|e| {
                        ResumeShortlisterError::ModelError(format!("Failed to copy {}: {}", file.dest, e))
                    })?;
                    println!("  ✅ Downloaded: {}", file.dest);
                }
                None if file.required => {
                    return Err(ResumeShortlisterError::ModelError(format!(
                        "Failed to download required file {}: {}",
                        file.dest, last_error
                    )));
                }
                None => {
                    warn!("Optional file {} not found in {}: {}", file.dest, model.repo_id, last_error);
                }
            }
        }

        self.downloaded_models.insert(name.to_string());

        println!("✅ Model {} downloaded successfully!", model.name);
        Ok(model_dir)
    }

    pub async fn remove_model(&mut self, name: &str) -> Result<()> {
        if !self.available_models.contains_key(name) {
            return Err(ResumeShortlisterError::ModelNotFound(format!("Unknown model: {}", name)));
        }

        let model_dir = self.models_dir.join(name);
        if fs::metadata(&model_dir).await.is_ok() {
            fs::remove_dir_all(&model_dir).await?;
            info!("Removed {}", model_dir.display());
        }

        self.downloaded_models.remove(name);
        Ok(())
    }

    pub fn get_model_path(&self, name: &str) -> Option<PathBuf> {
        if self.downloaded_models.contains(name) {
            Some(self.models_dir.join(name))
        } else {
            None
        }
    }

    /// Registered models sorted by kind then name
    pub fn list_available_models(&self) -> Vec<&AvailableModel> {
        let mut models: Vec<_> = self.available_models.values().collect();
        models.sort_by(|a, b| {
            (a.kind == ModelKind::Ner, &a.name).cmp(&(b.kind == ModelKind::Ner, &b.name))
        });
        models
    }

    pub fn get_model_info(&self, name: &str) -> Option<&AvailableModel> {
        self.available_models.get(name)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        self.downloaded_models.contains(name)
    }

    /// Resolve a model name from a registry name, repo id, or any casing of either.
    pub fn resolve_model_name(&self, input: &str) -> Option<String> {
        if self.available_models.contains_key(input) {
            return Some(input.to_string());
        }

        let input_lower = input.to_lowercase();
        self.available_models
            .values()
            .find(|m| m.repo_id == input || m.name.to_lowercase() == input_lower || m.repo_id.to_lowercase() == input_lower)
            .map(|m| m.name.clone())
    }
}

/// The process-wide inference resources, loaded once at startup.
///
/// Only the kinds a command needs are loaded; asking for one that was not
/// loaded is an error rather than a lazy load.
#[derive(Clone, Default)]
pub struct Models {
    ner: Option<Arc<NerModel>>,
    embedder: Option<Arc<EmbeddingEngine>>,
}

impl Models {
    pub fn load(config: &Config, kinds: &[ModelKind]) -> Result<Self> {
        let mut models = Self::default();

        for kind in kinds {
            let path = config.model_path(*kind);
            if !path.is_dir() {
                return Err(ResumeShortlisterError::ModelNotFound(format!(
                    "{} model not found at {}. Run `resume-shortlister models download <name>` first",
                    kind,
                    path.display()
                )));
            }

            match kind {
                ModelKind::Ner => {
                    models.ner = Some(Arc::new(NerModel::load(&path, config.extraction.ner_max_tokens)?));
                }
                ModelKind::Embedding => {
                    models.embedder = Some(Arc::new(EmbeddingEngine::load(
                        &path,
                        &config.models.embedding_model,
                        config.ranking.batch_size,
                    )?));
                }
            }
        }

        Ok(models)
    }

    pub fn ner(&self) -> Result<Arc<NerModel>> {
        self.ner
            .clone()
            .ok_or_else(|| ResumeShortlisterError::ModelLoading("NER model was not loaded".to_string()))
    }

    pub fn embedder(&self) -> Result<Arc<EmbeddingEngine>> {
        self.embedder
            .clone()
            .ok_or_else(|| ResumeShortlisterError::ModelLoading("Embedding model was not loaded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn manager(dir: &TempDir) -> ModelManager {
        ModelManager::new(dir.path().to_path_buf(), &Config::default().models.available_models)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_model_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        assert_eq!(manager.list_available_models().len(), 4);
        assert_eq!(manager.list_available_models()[0].kind, ModelKind::Embedding);
        assert!(!manager.is_model_downloaded("potion-base-8M"));
        assert!(manager.get_model_path("potion-base-8M").is_none());
    }

    #[tokio::test]
    async fn test_scan_finds_complete_directories_only() {
        let temp_dir = TempDir::new().unwrap();

        let ner_dir = temp_dir.path().join("bert-base-ner");
        std::fs::create_dir_all(&ner_dir).unwrap();
        for file in ["config.json", "tokenizer.json", "model.safetensors"] {
            std::fs::write(ner_dir.join(file), b"{}").unwrap();
        }

        let partial = temp_dir.path().join("potion-base-8M");
        std::fs::create_dir_all(&partial).unwrap();
        std::fs::write(partial.join("tokenizer.json"), b"{}").unwrap();

        let manager = manager(&temp_dir).await;
        assert!(manager.is_model_downloaded("bert-base-ner"));
        assert!(!manager.is_model_downloaded("potion-base-8M"));
        assert_eq!(manager.get_model_path("bert-base-ner"), Some(ner_dir));
    }

    #[tokio::test]
    async fn test_resolve_model_name() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        assert_eq!(manager.resolve_model_name("potion-base-8M"), Some("potion-base-8M".to_string()));
        assert_eq!(manager.resolve_model_name("minishlab/potion-base-8M"), Some("potion-base-8M".to_string()));
        assert_eq!(manager.resolve_model_name("dslim/bert-base-ner"), Some("bert-base-ner".to_string()));
        assert_eq!(manager.resolve_model_name("BERT-BASE-NER"), Some("bert-base-ner".to_string()));
        assert_eq!(manager.resolve_model_name("gpt-2"), None);
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager(&temp_dir).await;

        let err = manager.download_model("gpt-2", false).await.unwrap_err();
        assert!(matches!(err, ResumeShortlisterError::ModelNotFound(_)));

        let err = manager.remove_model("gpt-2").await.unwrap_err();
        assert!(matches!(err, ResumeShortlisterError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_model() {
        let temp_dir = TempDir::new().unwrap();
        let model_dir = temp_dir.path().join("m2v-base");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("model.safetensors"), b"").unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), b"{}").unwrap();

        let mut manager = manager(&temp_dir).await;
        assert!(manager.is_model_downloaded("m2v-base"));

        manager.remove_model("m2v-base").await.unwrap();
        assert!(!manager.is_model_downloaded("m2v-base"));
        assert!(!model_dir.exists());
    }

    #[test]
    fn test_load_reports_missing_model_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.models.models_dir = temp_dir.path().to_path_buf();

        let err = Models::load(&config, &[ModelKind::Embedding]).err().unwrap();
        assert!(matches!(err, ResumeShortlisterError::ModelNotFound(_)));

        let models = Models::load(&config, &[]).unwrap();
        assert!(models.ner().is_err());
        assert!(models.embedder().is_err());
    }
}
