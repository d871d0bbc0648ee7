//! Output formatters for parsed profiles and ranked shortlists

use crate::config::OutputFormat;
use crate::error::{Result, ResumeShortlisterError};
use crate::extraction::profile::CandidateProfile;
use crate::processing::ranker::{MatchResult, TopPercent};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::Serialize;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

const BULLET_PREVIEW_GRAPHEMES: usize = 80;

/// A profile together with the file it was parsed from.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedResume {
    pub source: String,
    pub profile: CandidateProfile,
}

/// The outcome of one ranking call, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Shortlist {
    pub job_source: String,
    pub total_candidates: usize,
    pub top_percent: TopPercent,
    pub embedding_model: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<MatchResult>,
}

pub trait OutputFormatter {
    fn format_profiles(&self, resumes: &[ParsedResume]) -> Result<String>;
    fn format_shortlist(&self, shortlist: &Shortlist) -> Result<String>;
}

/// Cut `text` to at most `max` grapheme clusters, marking the cut with `...`.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        text.to_string()
    } else {
        format!("{}...", graphemes[..max].concat().trim_end())
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn skill_names(profile: &CandidateProfile) -> String {
    profile
        .skills
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Console formatter with colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_similarity(&self, similarity: f32) -> String {
        let color = match similarity {
            s if s >= 0.75 => Color::Green,
            s if s >= 0.5 => Color::Yellow,
            _ => Color::Red,
        };
        self.colorize(&format!("{:.3}", similarity), color)
    }

    fn format_profile(&self, resume: &ParsedResume) -> String {
        let profile = &resume.profile;
        let mut output = String::new();

        output.push_str(&self.format_header(&format!("📄 {}", resume.source), 2));
        output.push_str(&format!("Name: {}\n", self.colorize(or_dash(&profile.full_name), Color::Cyan)));
        output.push_str(&format!("Email: {}\n", or_dash(&profile.email)));
        output.push_str(&format!("Phone: {}\n", or_dash(&profile.phone)));
        output.push_str(&format!("Location: {}\n", or_dash(&profile.location)));
        output.push_str(&format!("Experience: {} years\n", profile.years_experience));
        output.push_str(&format!("Skills: {}\n", or_dash(&skill_names(profile))));

        if !profile.work_experience.is_empty() {
            output.push_str(&self.format_header("Work Experience", 3));
            for entry in &profile.work_experience {
                output.push_str(&format!(
                    "• {} at {} ({})\n",
                    self.colorize(&entry.title, Color::White),
                    entry.company,
                    entry.date_range
                ));
                for bullet in &entry.description {
                    let line = if self.detailed {
                        bullet.clone()
                    } else {
                        truncate_graphemes(bullet, BULLET_PREVIEW_GRAPHEMES)
                    };
                    output.push_str(&format!("    - {}\n", line));
                }
            }
        }

        output
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_profiles(&self, resumes: &[ParsedResume]) -> Result<String> {
        let mut output = self.format_header(&format!("📋 PARSED PROFILES ({})", resumes.len()), 1);
        for resume in resumes {
            output.push_str(&self.format_profile(resume));
        }
        Ok(output)
    }

    fn format_shortlist(&self, shortlist: &Shortlist) -> Result<String> {
        let mut output = self.format_header("🎯 CANDIDATE SHORTLIST", 1);
        output.push_str(&format!(
            "Job: {} | Candidates: {} | Top {} | Model: {}\n",
            shortlist.job_source, shortlist.total_candidates, shortlist.top_percent, shortlist.embedding_model
        ));
        output.push_str(&format!(
            "Generated: {}\n",
            shortlist.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if shortlist.results.is_empty() {
            output.push_str(&format!("\n{}\n", self.colorize("No candidates to rank", Color::Yellow)));
            return Ok(output);
        }

        output.push_str(&self.format_header("Ranking", 2));
        for result in &shortlist.results {
            output.push_str(&format!(
                "{:>3}. {} <{}> similarity {}\n",
                result.rank,
                self.colorize(or_dash(&result.name), Color::Cyan),
                or_dash(&result.candidate_key),
                self.format_similarity(result.similarity)
            ));
        }

        Ok(output)
    }
}

/// JSON formatter; profile output is the same array `rank --profiles` reads
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_profiles(&self, resumes: &[ParsedResume]) -> Result<String> {
        let profiles: Vec<&CandidateProfile> = resumes.iter().map(|r| &r.profile).collect();
        self.to_json(&profiles)
    }

    fn format_shortlist(&self, shortlist: &Shortlist) -> Result<String> {
        self.to_json(shortlist)
    }
}

pub struct MarkdownFormatter;

impl MarkdownFormatter {
    fn escape_cell(text: &str) -> String {
        or_dash(text).replace('|', "\\|")
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_profiles(&self, resumes: &[ParsedResume]) -> Result<String> {
        let mut output = String::from("# Parsed Profiles\n");

        for resume in resumes {
            let profile = &resume.profile;
            output.push_str(&format!("\n## {}\n\n", or_dash(&profile.full_name)));
            output.push_str(&format!("- **Source:** {}\n", resume.source));
            output.push_str(&format!("- **Email:** {}\n", or_dash(&profile.email)));
            output.push_str(&format!("- **Phone:** {}\n", or_dash(&profile.phone)));
            output.push_str(&format!("- **Location:** {}\n", or_dash(&profile.location)));
            output.push_str(&format!("- **Experience:** {} years\n", profile.years_experience));
            output.push_str(&format!("- **Skills:** {}\n", or_dash(&skill_names(profile))));

            if !profile.work_experience.is_empty() {
                output.push_str("\n### Work Experience\n");
                for entry in &profile.work_experience {
                    output.push_str(&format!(
                        "\n**{}**, {} ({})\n\n",
                        entry.title, entry.company, entry.date_range
                    ));
                    for bullet in &entry.description {
                        output.push_str(&format!("- {}\n", bullet));
                    }
                }
            }
        }

        Ok(output)
    }

    fn format_shortlist(&self, shortlist: &Shortlist) -> Result<String> {
        let mut output = String::from("# Candidate Shortlist\n\n");
        output.push_str(&format!(
            "Job: `{}` | Candidates: {} | Top {} | Model: {}\n\n",
            shortlist.job_source, shortlist.total_candidates, shortlist.top_percent, shortlist.embedding_model
        ));

        if shortlist.results.is_empty() {
            output.push_str("_No candidates to rank._\n");
            return Ok(output);
        }

        output.push_str("| Rank | Name | Email | Similarity |\n");
        output.push_str("|-----:|------|-------|-----------:|\n");
        for result in &shortlist.results {
            output.push_str(&format!(
                "| {} | {} | {} | {:.3} |\n",
                result.rank,
                Self::escape_cell(&result.name),
                Self::escape_cell(&result.candidate_key),
                result.similarity
            ));
        }

        Ok(output)
    }
}

/// Dispatches to the formatter for the requested format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

impl ReportGenerator {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(true),
            markdown_formatter: MarkdownFormatter,
        }
    }

    fn formatter(&self, format: OutputFormat) -> &dyn OutputFormatter {
        match format {
            OutputFormat::Console => &self.console_formatter,
            OutputFormat::Json => &self.json_formatter,
            OutputFormat::Markdown => &self.markdown_formatter,
        }
    }

    pub fn profiles(&self, resumes: &[ParsedResume], format: OutputFormat) -> Result<String> {
        self.formatter(format).format_profiles(resumes)
    }

    pub fn shortlist(&self, shortlist: &Shortlist, format: OutputFormat) -> Result<String> {
        self.formatter(format).format_shortlist(shortlist)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(true, false)
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(file_path, content).map_err(|e| {
        ResumeShortlisterError::OutputFormatting(format!("Failed to write {}: {}", file_path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::profile::Skill;
    use crate::extraction::work_history::{WorkEntryRule, WorkExperienceEntry};
    use tempfile::TempDir;

    fn resume() -> ParsedResume {
        ParsedResume {
            source: "jane.pdf".to_string(),
            profile: CandidateProfile {
                full_name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                years_experience: 6,
                skills: vec![Skill {
                    name: "AWS".to_string(),
                    category: "technical".to_string(),
                    proficiency: None,
                }],
                work_experience: vec![WorkExperienceEntry {
                    title: "Senior Engineer".to_string(),
                    company: "Acme Corp".to_string(),
                    date_range: "2019-2022".to_string(),
                    description: vec!["x".repeat(120)],
                    rule: WorkEntryRule::PipeSeparated,
                }],
                ..Default::default()
            },
        }
    }

    fn shortlist(results: Vec<MatchResult>) -> Shortlist {
        Shortlist {
            job_source: "job.txt".to_string(),
            total_candidates: 3,
            top_percent: TopPercent::new(50.0).unwrap(),
            embedding_model: "potion-base-8M".to_string(),
            generated_at: Utc::now(),
            results,
        }
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("short", 10), "short");
        assert_eq!(truncate_graphemes("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_graphemes("e\u{301}e\u{301}e\u{301}", 2), "e\u{301}e\u{301}...");
    }

    #[test]
    fn test_console_profiles_without_colors() {
        let output = ConsoleFormatter::new(false, false).format_profiles(&[resume()]).unwrap();

        assert!(output.contains("PARSED PROFILES (1)"));
        assert!(output.contains("Name: Jane Doe"));
        assert!(output.contains("Phone: -"));
        assert!(output.contains("Skills: AWS"));
        assert!(output.contains("Senior Engineer at Acme Corp (2019-2022)"));
        assert!(output.contains(&format!("{}...", "x".repeat(80))));
        assert!(!output.contains(&"x".repeat(81)));
    }

    #[test]
    fn test_json_profiles_are_rank_input() {
        let output = JsonFormatter::new(false).format_profiles(&[resume()]).unwrap();
        let profiles: Vec<CandidateProfile> = serde_json::from_str(&output).unwrap();
        assert_eq!(profiles, vec![resume().profile]);
    }

    #[test]
    fn test_shortlist_formats() {
        let results = vec![MatchResult {
            index: 2,
            candidate_key: "a|b@example.com".to_string(),
            name: "Alice".to_string(),
            similarity: 0.8123,
            rank: 1,
        }];
        let generator = ReportGenerator::new(false, false);

        let console = generator.shortlist(&shortlist(results.clone()), OutputFormat::Console).unwrap();
        assert!(console.contains("  1. Alice <a|b@example.com> similarity 0.812"));
        assert!(console.contains("Top 50%"));

        let markdown = generator.shortlist(&shortlist(results.clone()), OutputFormat::Markdown).unwrap();
        assert!(markdown.contains("| 1 | Alice | a\\|b@example.com | 0.812 |"));

        let json = generator.shortlist(&shortlist(results), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["top_percent"], 50.0);
        assert_eq!(value["results"][0]["rank"], 1);
    }

    #[test]
    fn test_empty_shortlist() {
        let output = ConsoleFormatter::new(false, false)
            .format_shortlist(&shortlist(Vec::new()))
            .unwrap();
        assert!(output.contains("No candidates to rank"));
    }

    #[test]
    fn test_save_report_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("profiles.json");

        save_report_to_file("[]", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
