//! Work-history segmentation
//!
//! Two strategies share the `WorkHistoryStrategy` contract. The line scan runs
//! first; the windowed scan only runs when the line scan finds nothing.
//!
//! The windowed scan reads a fixed number of raw characters after each role
//! match, ignoring line structure. When two jobs sit closer together than the
//! window, bullets of the second job are attributed to the first as well.

use log::debug;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BULLET_SCAN_LINES: usize = 10;
pub const DEFAULT_FALLBACK_WINDOW_CHARS: usize = 500;

/// Glyphs that open a bullet line. Dash and asterisk lines are plain text.
const BULLET_GLYPHS: &[char] = &['•', '●', '▪', '◦', '‣', '∙'];

/// Which rule produced a work entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkEntryRule {
    /// `Title | Company | Date`
    PipeSeparated,
    /// `Title at Company (Date)`
    TitleAtCompany,
    /// Role keyword followed by the pipe shape, anywhere in the text
    WindowedFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperienceEntry {
    pub title: String,
    pub company: String,
    pub date_range: String,
    pub description: Vec<String>,
    pub rule: WorkEntryRule,
}

pub trait WorkHistoryStrategy: Send + Sync {
    fn extract(&self, text: &str) -> Vec<WorkExperienceEntry>;
}

/// Strip a leading bullet marker, returning the bullet text.
fn strip_bullet(line: &str) -> Option<&str> {
    line.trim().strip_prefix(BULLET_GLYPHS).map(str::trim)
}

/// Header-line scan: each non-blank line may open one entry, and the bullets
/// right below it become the description.
pub struct LineScanStrategy {
    rules: Vec<(WorkEntryRule, Regex)>,
    scan_lines: usize,
}

impl LineScanStrategy {
    pub fn new(scan_lines: usize) -> Self {
        let pipe = Regex::new(r"^(.+?)\s*\|\s*(.+?)\s*\|\s*([^•]+?)\s*(?:•.*)?$")
            .expect("Invalid pipe-separated regex");
        let at = Regex::new(r"^(.+?)\s+at\s+(.+?)\s+\(([^)]*)\)")
            .expect("Invalid title-at-company regex");

        Self {
            rules: vec![
                (WorkEntryRule::PipeSeparated, pipe),
                (WorkEntryRule::TitleAtCompany, at),
            ],
            scan_lines,
        }
    }

    fn match_header<'t>(&self, line: &'t str) -> Option<(WorkEntryRule, Captures<'t>)> {
        self.rules
            .iter()
            .find_map(|(rule, regex)| regex.captures(line).map(|caps| (*rule, caps)))
    }

    fn collect_bullets(&self, lines: &[&str], header_idx: usize) -> Vec<String> {
        let mut bullets = Vec::new();
        let end = (header_idx + 1 + self.scan_lines).min(lines.len());

        for line in &lines[header_idx + 1..end] {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match strip_bullet(line) {
                Some(bullet) => {
                    if !bullet.is_empty() {
                        bullets.push(bullet.to_string());
                    }
                }
                None if !bullets.is_empty() => break,
                None => {}
            }
        }

        bullets
    }
}

impl WorkHistoryStrategy for LineScanStrategy {
    fn extract(&self, text: &str) -> Vec<WorkExperienceEntry> {
        let lines: Vec<&str> = text.lines().collect();
        let mut entries = Vec::new();

        for (idx, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((rule, caps)) = self.match_header(line) {
                entries.push(WorkExperienceEntry {
                    title: caps[1].trim().to_string(),
                    company: caps[2].trim().to_string(),
                    date_range: caps[3].trim().to_string(),
                    description: self.collect_bullets(&lines, idx),
                    rule,
                });
            }
        }

        entries
    }
}

/// Keyword search over the raw text with a fixed-size description window.
pub struct WindowedStrategy {
    role_regex: Regex,
    bullet_regex: Regex,
    window_chars: usize,
}

impl WindowedStrategy {
    pub fn new(window_chars: usize) -> Self {
        let role_regex = Regex::new(
            r"(?i)((?:Senior |Junior |Lead )?(?:Software Engineer|Developer|Analyst|Manager|Director|Consultant)[^\n]*)\s*\|\s*([^\n]*)\s*\|\s*([^\n]*)",
        )
        .expect("Invalid role regex");
        let glyphs: String = BULLET_GLYPHS.iter().collect();
        let bullet_regex = Regex::new(&format!(r"[{glyphs}]\s*([^\n{glyphs}]+)")).expect("Invalid bullet regex");

        Self {
            role_regex,
            bullet_regex,
            window_chars,
        }
    }

    fn window<'t>(&self, text: &'t str, start: usize) -> &'t str {
        let tail = &text[start..];
        let end = tail
            .char_indices()
            .nth(self.window_chars)
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        &tail[..end]
    }
}

impl WorkHistoryStrategy for WindowedStrategy {
    fn extract(&self, text: &str) -> Vec<WorkExperienceEntry> {
        self.role_regex
            .captures_iter(text)
            .map(|caps| {
                let start = caps.get(1).map(|m| m.start()).unwrap_or(0);
                let description = self
                    .bullet_regex
                    .captures_iter(self.window(text, start))
                    .map(|b| b[1].trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect();

                WorkExperienceEntry {
                    title: caps[1].trim().to_string(),
                    company: caps[2].trim().to_string(),
                    date_range: caps[3].trim().to_string(),
                    description,
                    rule: WorkEntryRule::WindowedFallback,
                }
            })
            .collect()
    }
}

/// Runs the line scan, falling back to the windowed scan on zero entries.
pub struct WorkHistoryExtractor {
    primary: Box<dyn WorkHistoryStrategy>,
    fallback: Box<dyn WorkHistoryStrategy>,
}

impl Default for WorkHistoryExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_BULLET_SCAN_LINES, DEFAULT_FALLBACK_WINDOW_CHARS)
    }
}

impl WorkHistoryExtractor {
    pub fn new(scan_lines: usize, window_chars: usize) -> Self {
        Self::with_strategies(
            Box::new(LineScanStrategy::new(scan_lines)),
            Box::new(WindowedStrategy::new(window_chars)),
        )
    }

    pub fn with_strategies(
        primary: Box<dyn WorkHistoryStrategy>,
        fallback: Box<dyn WorkHistoryStrategy>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn extract(&self, text: &str) -> Vec<WorkExperienceEntry> {
        let entries = self.primary.extract(text);
        if !entries.is_empty() {
            debug!("Line scan found {} work entries", entries.len());
            return entries;
        }

        let entries = self.fallback.extract(text);
        debug!("Windowed fallback found {} work entries", entries.len());
        entries
    }
}
