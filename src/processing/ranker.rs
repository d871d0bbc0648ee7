//! Embedding-based candidate ranking against a job description

use crate::error::{Result, ResumeShortlisterError};
use crate::extraction::profile::CandidateProfile;
use crate::processing::embeddings::{cosine_similarity, Embedder};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const NOT_SPECIFIED: &str = "Not specified";

/// Share of candidates to keep, as a percentage in (0, 100].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TopPercent(f64);

impl TopPercent {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 || value > 100.0 {
            return Err(ResumeShortlisterError::InvalidTopPercent(format!(
                "{} is outside (0, 100]",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl FromStr for TopPercent {
    type Err = ResumeShortlisterError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ResumeShortlisterError::InvalidTopPercent(format!("'{}' is not a number", s)))?;
        Self::new(value)
    }
}

impl fmt::Display for TopPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Position of the candidate in the ranked input slice
    pub index: usize,
    /// The candidate's normalized email, empty when none was found
    pub candidate_key: String,
    pub name: String,
    pub similarity: f32,
    /// 1-based
    pub rank: usize,
}

/// Number of candidates kept for `total` candidates at `top_percent`.
///
/// Rounds half away from zero, so 20 candidates at 12.5% keep 3. At least
/// one candidate is kept whenever any exist.
pub fn top_k(total: usize, top_percent: TopPercent) -> usize {
    if total == 0 {
        return 0;
    }
    let k = (total as f64 * top_percent.value() / 100.0).round() as usize;
    k.clamp(1, total)
}

/// The text embedded for a candidate.
pub fn render_summary(profile: &CandidateProfile) -> String {
    let skills = profile
        .skills
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let degrees: Vec<&str> = profile
        .education
        .iter()
        .filter_map(|e| e.degree.as_deref())
        .collect();
    let education = if degrees.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        degrees.join(", ")
    };

    format!(
        "Candidate Profile:\nName: {}\nSkills: {}\nExperience: {} years\nEducation: {}",
        profile.full_name, skills, profile.years_experience, education
    )
}

pub struct SimilarityRanker {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityRanker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Score every candidate against `job_description` and keep the top share.
    ///
    /// Ties keep their input order. An embedder failure aborts the whole call;
    /// it never turns into an empty result.
    pub fn rank(
        &self,
        job_description: &str,
        candidates: &[CandidateProfile],
        top_percent: TopPercent,
    ) -> Result<Vec<MatchResult>> {
        if candidates.is_empty() {
            info!("No candidates to rank");
            return Ok(Vec::new());
        }

        let job_embedding = self
            .embedder
            .encode(&[job_description.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ResumeShortlisterError::Inference("Embedding model returned no vector for the job description".to_string())
            })?;

        let summaries: Vec<String> = candidates.iter().map(render_summary).collect();
        let embeddings = self.embedder.encode(&summaries)?;
        if embeddings.len() != summaries.len() {
            return Err(ResumeShortlisterError::Inference(format!(
                "Embedding model returned {} vectors for {} candidates",
                embeddings.len(),
                summaries.len()
            )));
        }

        let mut scored = candidates
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(index, (profile, embedding))| {
                Ok(MatchResult {
                    index,
                    candidate_key: profile.email.clone(),
                    name: profile.full_name.clone(),
                    similarity: cosine_similarity(&job_embedding, embedding)?,
                    rank: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let k = top_k(scored.len(), top_percent);
        scored.truncate(k);
        for (position, result) in scored.iter_mut().enumerate() {
            result.rank = position + 1;
        }

        debug!(
            "Ranked {} candidates with {}, keeping {} at {}",
            candidates.len(),
            self.embedder.model_name(),
            k,
            top_percent
        );

        Ok(scored)
    }
}
