//! Résumé parsing and candidate shortlisting library

pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod input;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{ExtractionFailure, Result, ResumeShortlisterError};
pub use extraction::{CandidateProfile, ResumeParser};
pub use processing::{SimilarityRanker, TopPercent};
