//! Input manager for loading resume files from disk

use crate::error::{Result, ResumeShortlisterError};
use crate::input::file_detector::DocumentFormat;
use crate::input::text_extractor::{extract_text, RawDocument};
use log::info;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Default)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    /// Read a file into a `RawDocument`, using `format` when given and the
    /// file extension otherwise.
    pub async fn load(&self, path: &Path, format: Option<DocumentFormat>) -> Result<RawDocument> {
        if !path.exists() {
            return Err(ResumeShortlisterError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let format = match format {
            Some(format) => format,
            None => self.detect_format(path)?,
        };

        let content = fs::read(path).await?;
        Ok(RawDocument::new(content, format))
    }

    /// Load a file and extract its text.
    pub async fn extract_text(&self, path: &Path) -> Result<String> {
        let document = self.load(path, None).await?;
        info!("Extracting text from {} file: {}", document.format, path.display());
        Ok(extract_text(&document)?)
    }

    fn detect_format(&self, path: &Path) -> Result<DocumentFormat> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ResumeShortlisterError::InvalidInput(format!(
                    "File has no extension: {}",
                    path.display()
                ))
            })?;

        DocumentFormat::from_tag(extension).ok_or_else(|| {
            ResumeShortlisterError::UnsupportedFormat(format!(
                "Unsupported file type for: {} (supported: {})",
                path.display(),
                DocumentFormat::SUPPORTED.join(", ")
            ))
        })
    }
}
