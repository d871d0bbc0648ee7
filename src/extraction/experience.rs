//! Years-of-experience estimate from DATE mentions

use chrono::Datelike;
use regex::Regex;

pub const MAX_YEARS_EXPERIENCE: u32 = 30;

/// Approximates tenure from the earliest plausible year mentioned anywhere.
///
/// Explicit durations ("5 years") are not read; only four-digit years count.
pub struct ExperienceEstimator {
    year_regex: Regex,
    current_year: i32,
}

impl Default for ExperienceEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperienceEstimator {
    pub fn new() -> Self {
        Self::with_current_year(chrono::Local::now().year())
    }

    pub fn with_current_year(current_year: i32) -> Self {
        Self {
            year_regex: Regex::new(r"\d{4}").expect("Invalid year regex"),
            current_year,
        }
    }

    /// The first four-digit run in each date string, if it lies strictly
    /// between 1900 and the current year, contributes `current_year - year`.
    /// Returns the largest contribution, capped at `MAX_YEARS_EXPERIENCE`.
    pub fn estimate<S: AsRef<str>>(&self, dates: &[S]) -> u32 {
        let max_found = dates
            .iter()
            .filter_map(|date| self.year_regex.find(date.as_ref()))
            .filter_map(|m| m.as_str().parse::<i32>().ok())
            .filter(|year| 1900 < *year && *year < self.current_year)
            .map(|year| (self.current_year - year) as u32)
            .max()
            .unwrap_or(0);

        max_found.min(MAX_YEARS_EXPERIENCE)
    }
}
