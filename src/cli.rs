//! CLI interface for the resume shortlister

use crate::config::OutputFormat;
use crate::input::file_detector::DocumentFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resume-shortlister")]
#[command(about = "Résumé parsing and job-description shortlisting")]
#[command(long_about = "Extract structured candidate profiles from résumés with a local NER model, then rank them against a job description by embedding similarity")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse résumés into candidate profiles
    Parse {
        /// Résumé files (PDF, DOCX, DOC, TXT)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Format tag applied to every file instead of the extension
        #[arg(short, long)]
        format: Option<String>,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,

        /// Write the parsed profiles as JSON
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Rank parsed profiles against a job description
    Rank {
        /// Path to job description file (TXT)
        #[arg(short, long)]
        job: PathBuf,

        /// JSON file with an array of candidate profiles
        #[arg(short, long)]
        profiles: PathBuf,

        /// Share of candidates to keep, in (0, 100]
        #[arg(short, long)]
        top_percent: Option<String>,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List available models
    List {
        /// Show only embedding models
        #[arg(long)]
        embeddings: bool,

        /// Show only NER models
        #[arg(long)]
        ner: bool,
    },

    /// Download a model
    Download {
        /// Model name or HuggingFace repo ID
        model: String,

        /// Force re-download if model exists
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a downloaded model
    Remove {
        /// Model name to remove
        model: String,
    },

    /// Show model information
    Info {
        /// Model name
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!("Invalid output format: {}. Supported: console, json, markdown", format)),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}

/// Validate a `--format` override
pub fn parse_format_tag(tag: &str) -> Result<DocumentFormat, String> {
    DocumentFormat::from_tag(tag).ok_or_else(|| {
        format!(
            "Unsupported format tag: {}. Supported: {}",
            tag,
            DocumentFormat::SUPPORTED.join(", ")
        )
    })
}
