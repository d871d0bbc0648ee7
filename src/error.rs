//! Error handling for the resume shortlister

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeShortlisterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction failure: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid top_percent: {0}")]
    InvalidTopPercent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

/// Why no text could be obtained from a document.
///
/// Fatal to the one document only; callers processing a batch keep going.
#[derive(Error, Debug)]
pub enum ExtractionFailure {
    #[error("document is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("no text could be extracted")]
    EmptyText,
}

pub type Result<T> = std::result::Result<T, ResumeShortlisterError>;

/// Model2Vec reports load failures through anyhow
impl From<anyhow::Error> for ResumeShortlisterError {
    fn from(err: anyhow::Error) -> Self {
        ResumeShortlisterError::ModelLoading(err.to_string())
    }
}

/// Candle errors only surface from forward passes and tensor plumbing
impl From<candle_core::Error> for ResumeShortlisterError {
    fn from(err: candle_core::Error) -> Self {
        ResumeShortlisterError::Inference(err.to_string())
    }
}

impl ResumeShortlisterError {
    /// True for failures caused by the model runtime rather than by the input.
    pub fn is_inference_failure(&self) -> bool {
        matches!(
            self,
            ResumeShortlisterError::Inference(_) | ResumeShortlisterError::ModelLoading(_)
        )
    }
}
