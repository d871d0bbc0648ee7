//! Candidate profile assembly and the end-to-end parse pipeline

use crate::error::{ExtractionFailure, Result};
use crate::extraction::entities::{EntityBag, EntityExtractor, EntityKind};
use crate::extraction::experience::{ExperienceEstimator, MAX_YEARS_EXPERIENCE};
use crate::extraction::ner::EntityRecognizer;
use crate::extraction::work_history::{WorkExperienceEntry, WorkHistoryExtractor};
use crate::input::text_extractor::{extract_text, RawDocument};
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

pub const TECHNICAL_CATEGORY: &str = "technical";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<String>,
}

/// The structured result of parsing one résumé.
///
/// `email` is lowercased and trimmed; downstream stores key candidates on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    #[serde(deserialize_with = "bounded_years")]
    pub years_experience: u32,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperienceEntry>,
}

fn bounded_years<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let years = u32::deserialize(deserializer)?;
    if years > MAX_YEARS_EXPERIENCE {
        return Err(serde::de::Error::custom(format!(
            "years_experience {} exceeds the maximum of {}",
            years, MAX_YEARS_EXPERIENCE
        )));
    }
    Ok(years)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Combines entities and work history into a `CandidateProfile`.
#[derive(Default)]
pub struct ProfileBuilder {
    estimator: ExperienceEstimator,
}

impl ProfileBuilder {
    pub fn new(estimator: ExperienceEstimator) -> Self {
        Self { estimator }
    }

    /// The first value of each kind is taken for the scalar fields.
    ///
    /// Skills are seeded from ORG entities, so employers and schools show up
    /// as skills alongside technologies.
    pub fn build(&self, entities: &EntityBag, work_experience: Vec<WorkExperienceEntry>) -> CandidateProfile {
        let first = |kind| entities.first(kind).unwrap_or_default().to_string();

        let skills = entities
            .get(EntityKind::Org)
            .iter()
            .map(|org| Skill {
                name: org.clone(),
                category: TECHNICAL_CATEGORY.to_string(),
                proficiency: None,
            })
            .collect();

        CandidateProfile {
            full_name: first(EntityKind::Person),
            email: normalize_email(entities.first(EntityKind::Email).unwrap_or_default()),
            phone: first(EntityKind::Phone),
            location: first(EntityKind::Location),
            years_experience: self.estimator.estimate(entities.get(EntityKind::Date)),
            education: Vec::new(),
            skills,
            work_experience,
        }
    }
}

/// Settings for the parse pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub bullet_scan_lines: usize,
    pub fallback_window_chars: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            bullet_scan_lines: crate::extraction::work_history::DEFAULT_BULLET_SCAN_LINES,
            fallback_window_chars: crate::extraction::work_history::DEFAULT_FALLBACK_WINDOW_CHARS,
        }
    }
}

/// Document → text → entities + work history → profile.
///
/// Holds no per-call state. One parser can serve concurrent parse calls as
/// long as its recognizer can, which `EntityRecognizer: Send + Sync` requires.
pub struct ResumeParser {
    entities: EntityExtractor,
    work_history: WorkHistoryExtractor,
    builder: ProfileBuilder,
}

impl ResumeParser {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self::with_options(recognizer, ParserOptions::default())
    }

    pub fn with_options(recognizer: Arc<dyn EntityRecognizer>, options: ParserOptions) -> Self {
        Self {
            entities: EntityExtractor::new(recognizer),
            work_history: WorkHistoryExtractor::new(options.bullet_scan_lines, options.fallback_window_chars),
            builder: ProfileBuilder::default(),
        }
    }

    pub fn with_builder(mut self, builder: ProfileBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn parse(&self, document: &RawDocument) -> Result<CandidateProfile> {
        let text = extract_text(document)?;
        info!("Parsing {} document ({} characters)", document.format, text.len());
        self.parse_text(&text)
    }

    pub fn parse_text(&self, text: &str) -> Result<CandidateProfile> {
        if text.trim().is_empty() {
            return Err(ExtractionFailure::EmptyText.into());
        }

        let entities = self.entities.extract(text)?;
        for phone in entities.phone_matches() {
            debug!("Phone '{}' matched by {:?}", phone.value, phone.rule);
        }
        let work_experience = self.work_history.extract(text);
        let profile = self.builder.build(&entities, work_experience);

        debug!(
            "Built profile: name='{}' skills={} jobs={} years={}",
            profile.full_name,
            profile.skills.len(),
            profile.work_experience.len(),
            profile.years_experience
        );

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResumeShortlisterError;
    use crate::extraction::ner::EntitySpan;
    use crate::input::file_detector::DocumentFormat;

    struct NoEntities;

    impl EntityRecognizer for NoEntities {
        fn recognize(&self, _text: &str) -> Result<Vec<EntitySpan>> {
            Ok(Vec::new())
        }

        fn kinds(&self) -> &[EntityKind] {
            &[EntityKind::Date]
        }
    }

    fn bag(values: &[(EntityKind, &str)]) -> EntityBag {
        let mut bag = EntityBag::new();
        for (kind, value) in values {
            bag.push(*kind, *value);
        }
        bag
    }

    #[test]
    fn test_build_takes_first_of_each_kind() {
        let entities = bag(&[
            (EntityKind::Person, "Jane Doe"),
            (EntityKind::Person, "John Smith"),
            (EntityKind::Email, "  Jane.Doe@Example.COM "),
            (EntityKind::Phone, "555-123-4567"),
            (EntityKind::Location, "Berlin"),
            (EntityKind::Location, "Paris"),
            (EntityKind::Org, "AWS"),
            (EntityKind::Org, "Docker"),
            (EntityKind::Date, "2014"),
        ]);

        let builder = ProfileBuilder::new(ExperienceEstimator::with_current_year(2024));
        let profile = builder.build(&entities, Vec::new());

        assert_eq!(profile.full_name, "Jane Doe");
        assert_eq!(profile.email, "jane.doe@example.com");
        assert_eq!(profile.phone, "555-123-4567");
        assert_eq!(profile.location, "Berlin");
        assert_eq!(profile.years_experience, 10);
        assert!(profile.education.is_empty());
        assert_eq!(
            profile.skills,
            vec![
                Skill { name: "AWS".into(), category: "technical".into(), proficiency: None },
                Skill { name: "Docker".into(), category: "technical".into(), proficiency: None },
            ]
        );
    }

    #[test]
    fn test_no_entities_still_builds_profile() {
        let parser = ResumeParser::new(Arc::new(NoEntities));
        let profile = parser.parse_text("lorem ipsum dolor sit amet").unwrap();

        assert_eq!(profile, CandidateProfile::default());
    }

    #[test]
    fn test_parse_fails_on_empty_document() {
        let parser = ResumeParser::new(Arc::new(NoEntities));
        let doc = RawDocument::new(b"  \n ".to_vec(), DocumentFormat::Txt);

        let err = parser.parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            ResumeShortlisterError::Extraction(ExtractionFailure::EmptyText)
        ));
    }

    #[test]
    fn test_parse_pipeline_on_text_document() {
        let parser = ResumeParser::new(Arc::new(NoEntities));
        let text = "Contact: JANE@EXAMPLE.COM, jane@example.com\n\
                    Senior Engineer | Acme Corp | 2019-2022\n\
                    • Built pipelines\n\
                    • Led team\n";
        let doc = RawDocument::new(text.as_bytes().to_vec(), DocumentFormat::Txt);

        let profile = parser.parse(&doc).unwrap();
        assert_eq!(profile.email, "jane@example.com");
        assert_eq!(profile.work_experience.len(), 1);
        assert_eq!(profile.work_experience[0].description, vec!["Built pipelines", "Led team"]);
    }

    #[test]
    fn test_profile_json_roundtrip_accepts_minimal_input() {
        let json = r#"{"full_name":"A","email":"a@b.co","phone":"","location":"","years_experience":3}"#;
        let profile: CandidateProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.years_experience, 3);
        assert!(profile.skills.is_empty());
    }

    #[test]
    fn test_profile_json_rejects_out_of_range_years() {
        for years in ["31", "-1", "4.5"] {
            let json = format!(
                r#"{{"full_name":"A","email":"a@b.co","phone":"","location":"","years_experience":{}}}"#,
                years
            );
            assert!(serde_json::from_str::<CandidateProfile>(&json).is_err(), "accepted {}", years);
        }

        let json = r#"{"full_name":"A","email":"a@b.co","phone":"","location":"","years_experience":30}"#;
        assert_eq!(serde_json::from_str::<CandidateProfile>(json).unwrap().years_experience, 30);
    }
}
