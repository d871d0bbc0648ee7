//! Input processing module
//! Handles format detection, loading and text extraction

pub mod file_detector;
pub mod text_extractor;
pub mod manager;

pub use file_detector::DocumentFormat;
pub use text_extractor::{extract_text, RawDocument};
