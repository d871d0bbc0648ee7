//! Resume shortlister: résumé parsing and job-description shortlisting

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_shortlister::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use resume_shortlister::config::{Config, ModelKind, OutputFormat};
use resume_shortlister::error::{Result, ResumeShortlisterError};
use resume_shortlister::extraction::ner::EntityRecognizer;
use resume_shortlister::extraction::profile::{CandidateProfile, ParserOptions, ResumeParser};
use resume_shortlister::input::file_detector::DocumentFormat;
use resume_shortlister::input::manager::InputManager;
use resume_shortlister::output::formatter::{save_report_to_file, JsonFormatter, OutputFormatter};
use resume_shortlister::output::{ParsedResume, ReportGenerator, Shortlist};
use resume_shortlister::processing::embeddings::Embedder;
use resume_shortlister::processing::model_manager::{ModelManager, Models};
use resume_shortlister::processing::ranker::{SimilarityRanker, TopPercent};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Parse {
            files,
            format,
            output,
            save,
        } => {
            let output_format = resolve_output_format(output.as_deref(), &config)?;
            let format = format
                .as_deref()
                .map(cli::parse_format_tag)
                .transpose()
                .map_err(ResumeShortlisterError::InvalidInput)?;

            let chatty = output_format == OutputFormat::Console;
            if chatty {
                println!("🚀 Parsing {} résumé(s)", files.len());
            }

            let models = Models::load(&config, &[ModelKind::Ner])?;
            let recognizer: Arc<dyn EntityRecognizer> = models.ner()?;
            let parser = Arc::new(ResumeParser::with_options(
                recognizer,
                ParserOptions {
                    bullet_scan_lines: config.extraction.bullet_scan_lines,
                    fallback_window_chars: config.extraction.fallback_window_chars,
                },
            ));

            let (parsed, failed) = parse_all(parser, files, format).await;

            if parsed.is_empty() {
                return Err(ResumeShortlisterError::InvalidInput(format!(
                    "None of the {} document(s) could be parsed",
                    failed
                )));
            }

            let generator = ReportGenerator::new(config.output.color_output, false);
            println!("{}", generator.profiles(&parsed, output_format)?);

            if let Some(save_path) = save {
                let json = JsonFormatter::new(true).format_profiles(&parsed)?;
                save_report_to_file(&json, &save_path)?;
                info!("Saved {} profile(s) to {}", parsed.len(), save_path.display());
            }

            if chatty {
                println!("\n✅ Parsed {} document(s), {} failed", parsed.len(), failed);
            }
        }

        Commands::Rank {
            job,
            profiles,
            top_percent,
            output,
        } => {
            // Reject a bad percentage before any model work starts
            let top_percent = match top_percent {
                Some(raw) => raw.parse::<TopPercent>()?,
                None => TopPercent::new(config.ranking.default_top_percent)?,
            };
            let output_format = resolve_output_format(output.as_deref(), &config)?;

            cli::validate_file_extension(&profiles, &["json"])
                .map_err(|e| ResumeShortlisterError::InvalidInput(format!("Profiles file: {}", e)))?;

            let job_text = InputManager::new().extract_text(&job).await?;
            let content = tokio::fs::read_to_string(&profiles).await?;
            let candidates: Vec<CandidateProfile> = serde_json::from_str(&content)?;
            info!("Loaded {} candidate profile(s) from {}", candidates.len(), profiles.display());

            let models = Models::load(&config, &[ModelKind::Embedding])?;
            let embedder: Arc<dyn Embedder> = models.embedder()?;
            let embedding_model = embedder.model_name().to_string();
            let ranker = SimilarityRanker::new(embedder);

            let total_candidates = candidates.len();
            let results = tokio::task::spawn_blocking(move || ranker.rank(&job_text, &candidates, top_percent))
                .await
                .map_err(|e| ResumeShortlisterError::Inference(format!("Ranking task failed: {}", e)))??;

            let shortlist = Shortlist {
                job_source: job.display().to_string(),
                total_candidates,
                top_percent,
                embedding_model,
                generated_at: chrono::Utc::now(),
                results,
            };

            let generator = ReportGenerator::new(config.output.color_output, false);
            println!("{}", generator.shortlist(&shortlist, output_format)?);
        }

        Commands::Models { action } => run_models_command(action, &config).await?,

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration ({})\n", config_path.display());
                println!("Models Directory: {}", config.models_dir().display());
                println!("Embedding Model: {}", config.models.embedding_model);
                println!("NER Model: {}", config.models.ner_model);
                println!("\nExtraction:");
                println!("  Bullet scan lines: {}", config.extraction.bullet_scan_lines);
                println!("  Fallback window: {} chars", config.extraction.fallback_window_chars);
                println!("  NER window: {} tokens", config.extraction.ner_max_tokens);
                println!("\nRanking:");
                println!("  Default top percent: {}%", config.ranking.default_top_percent);
                println!("  Batch size: {}", config.ranking.batch_size);
                println!("\nOutput: {:?} (colors: {})", config.output.format, config.output.color_output);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(config_path)?;
                println!("✅ Configuration reset successfully!");
            }
        },
    }

    Ok(())
}

/// Parse every file on its own blocking task.
///
/// Returns the successes in input order and the number of failures.
async fn parse_all(
    parser: Arc<ResumeParser>,
    files: Vec<PathBuf>,
    format: Option<DocumentFormat>,
) -> (Vec<ParsedResume>, usize) {
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let parser = Arc::clone(&parser);
            tokio::spawn(async move {
                let document = InputManager::new().load(&path, format).await;
                let result = match document {
                    Ok(document) => tokio::task::spawn_blocking(move || parser.parse(&document))
                        .await
                        .unwrap_or_else(|e| {
                            Err(ResumeShortlisterError::Inference(format!("Parse task failed: {}", e)))
                        }),
                    Err(e) => Err(e),
                };
                (path, result)
            })
        })
        .collect();

    let mut parsed = Vec::new();
    let mut failed = 0;

    for handle in handles {
        match handle.await {
            Ok((path, Ok(profile))) => {
                progress.set_message(path.display().to_string());
                parsed.push(ParsedResume {
                    source: path.display().to_string(),
                    profile,
                });
            }
            Ok((path, Err(e))) => {
                warn!("Skipping {}: {}", path.display(), e);
                failed += 1;
            }
            Err(e) => {
                warn!("Parse task panicked: {}", e);
                failed += 1;
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    (parsed, failed)
}

fn resolve_output_format(requested: Option<&str>, config: &Config) -> Result<OutputFormat> {
    match requested {
        Some(format) => cli::parse_output_format(format).map_err(ResumeShortlisterError::InvalidInput),
        None => Ok(config.output.format),
    }
}

async fn run_models_command(action: ModelAction, config: &Config) -> Result<()> {
    let mut model_manager = ModelManager::from_config(config).await?;

    match action {
        ModelAction::List { embeddings, ner } => {
            println!("📚 Available Models\n");

            let kinds: Vec<ModelKind> = match (embeddings, ner) {
                (true, false) => vec![ModelKind::Embedding],
                (false, true) => vec![ModelKind::Ner],
                _ => vec![ModelKind::Embedding, ModelKind::Ner],
            };

            for kind in kinds {
                let heading = match kind {
                    ModelKind::Embedding => "🧠 Embedding Models:",
                    ModelKind::Ner => "🏷️  NER Models:",
                };
                println!("{}", heading);

                for model in model_manager.list_available_models().into_iter().filter(|m| m.kind == kind) {
                    let status = if model_manager.is_model_downloaded(&model.name) {
                        "✅ Downloaded"
                    } else {
                        "⬇️  Available"
                    };
                    println!("  • {} ({}) - {} MB [{}]", model.name, model.repo_id, model.size_mb, status);
                    println!("    {}", model.description);
                }
                println!();
            }
        }

        ModelAction::Download { model, force } => {
            let name = model_manager
                .resolve_model_name(&model)
                .ok_or_else(|| ResumeShortlisterError::ModelNotFound(model.clone()))?;

            if !force && model_manager.is_model_downloaded(&name) {
                println!("✅ Model '{}' is already downloaded!", name);
                println!("💡 Use --force to re-download");
                return Ok(());
            }

            let model_path = model_manager.download_model(&name, force).await?;
            println!("📁 Location: {}", model_path.display());
        }

        ModelAction::Remove { model } => {
            let name = model_manager
                .resolve_model_name(&model)
                .ok_or_else(|| ResumeShortlisterError::ModelNotFound(model.clone()))?;

            if !model_manager.is_model_downloaded(&name) {
                println!("⚠️  Model '{}' is not downloaded", name);
                return Ok(());
            }

            model_manager.remove_model(&name).await?;
            println!("✅ Model '{}' removed successfully!", name);
        }

        ModelAction::Info { model } => {
            let name = model_manager
                .resolve_model_name(&model)
                .ok_or_else(|| ResumeShortlisterError::ModelNotFound(model.clone()))?;
            let info = model_manager
                .get_model_info(&name)
                .ok_or_else(|| ResumeShortlisterError::ModelNotFound(name.clone()))?;

            println!("📋 Model Information for '{}'\n", name);
            println!("Repository: {}", info.repo_id);
            println!("Type: {}", info.kind);
            println!("Size: {} MB", info.size_mb);
            println!("Description: {}", info.description);

            match model_manager.get_model_path(&name) {
                Some(path) => println!("Status: ✅ Downloaded\nLocation: {}", path.display()),
                None => {
                    println!("Status: ⬇️  Available for download");
                    println!("\n💡 To download this model, run:");
                    println!("   resume-shortlister models download {}", name);
                }
            }
        }
    }

    Ok(())
}
