//! Integration tests for the resume shortlister

use resume_shortlister::error::{ExtractionFailure, Result, ResumeShortlisterError};
use resume_shortlister::extraction::experience::ExperienceEstimator;
use resume_shortlister::extraction::ner::{EntityRecognizer, EntitySpan};
use resume_shortlister::extraction::profile::{CandidateProfile, ProfileBuilder, ResumeParser};
use resume_shortlister::extraction::work_history::WorkEntryRule;
use resume_shortlister::extraction::EntityKind;
use resume_shortlister::input::file_detector::DocumentFormat;
use resume_shortlister::input::manager::InputManager;
use resume_shortlister::input::RawDocument;
use resume_shortlister::processing::embeddings::Embedder;
use resume_shortlister::processing::ranker::{SimilarityRanker, TopPercent};
use std::path::Path;
use std::sync::Arc;

const SAMPLE_RESUME: &str = "tests/fixtures/sample_resume.txt";
const JOB_DESCRIPTION: &str = "tests/fixtures/job_description.txt";

/// Tags the first occurrence of each known phrase.
struct Gazetteer {
    entries: Vec<(&'static str, EntityKind)>,
}

impl Gazetteer {
    fn new() -> Self {
        Self {
            entries: vec![
                ("Jane Doe", EntityKind::Person),
                ("Berlin", EntityKind::Location),
                ("Acme Corp", EntityKind::Org),
                ("Python", EntityKind::Org),
                ("AWS", EntityKind::Org),
                ("Globex", EntityKind::Org),
                ("Flask", EntityKind::Org),
                ("Java", EntityKind::Org),
                ("Spring", EntityKind::Org),
                ("Django", EntityKind::Org),
            ],
        }
    }
}

impl EntityRecognizer for Gazetteer {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let mut spans: Vec<EntitySpan> = self
            .entries
            .iter()
            .filter_map(|(needle, kind)| {
                text.find(needle).map(|start| EntitySpan {
                    text: needle.to_string(),
                    kind: *kind,
                    start,
                    end: start + needle.len(),
                    score: 1.0,
                })
            })
            .collect();
        spans.sort_by_key(|s| s.start);
        Ok(spans)
    }

    fn kinds(&self) -> &[EntityKind] {
        &[EntityKind::Person, EntityKind::Org, EntityKind::Location]
    }
}

struct BagOfWords;

impl Embedder for BagOfWords {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        const VOCAB: &[&str] = &["python", "flask", "aws", "java", "spring", "django"];
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCAB
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

fn parser() -> ResumeParser {
    ResumeParser::new(Arc::new(Gazetteer::new()))
        .with_builder(ProfileBuilder::new(ExperienceEstimator::with_current_year(2024)))
}

async fn sample_document() -> RawDocument {
    InputManager::new()
        .load(Path::new(SAMPLE_RESUME), None)
        .await
        .unwrap()
}

fn text_document(text: &str) -> RawDocument {
    RawDocument::new(text.as_bytes().to_vec(), DocumentFormat::Txt)
}

#[tokio::test]
async fn test_text_extraction_from_txt() {
    let manager = InputManager::new();
    let text = manager.extract_text(Path::new(SAMPLE_RESUME)).await.unwrap();

    assert!(text.contains("Jane Doe"));
    assert!(text.contains("Senior Software Engineer"));
}

#[tokio::test]
async fn test_unsupported_file_type() {
    let manager = InputManager::new();
    let err = manager
        .extract_text(Path::new("tests/fixtures/unsupported.xyz"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResumeShortlisterError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_nonexistent_file() {
    let manager = InputManager::new();
    let result = manager.extract_text(Path::new("tests/fixtures/nonexistent.txt")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_full_parse_pipeline() {
    let profile = parser().parse(&sample_document().await).unwrap();

    assert_eq!(profile.full_name, "Jane Doe");
    assert_eq!(profile.email, "jane.doe@example.com");
    assert_eq!(profile.phone, "(555) 123-4567");
    assert_eq!(profile.location, "Berlin");
    assert_eq!(profile.years_experience, 10);
    assert!(profile.education.is_empty());

    let skills: Vec<&str> = profile.skills.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(skills, vec!["Acme Corp", "Python", "AWS", "Globex", "Flask"]);
    assert!(profile.skills.iter().all(|s| s.category == "technical"));

    assert_eq!(profile.work_experience.len(), 2);

    let first = &profile.work_experience[0];
    assert_eq!(first.title, "Senior Software Engineer");
    assert_eq!(first.company, "Acme Corp");
    assert_eq!(first.date_range, "Jan 2019 - Present");
    assert_eq!(
        first.description,
        vec!["Built data pipelines in Python and AWS", "Led a team of five engineers"]
    );
    assert_eq!(first.rule, WorkEntryRule::PipeSeparated);

    let second = &profile.work_experience[1];
    assert_eq!(second.company, "Globex");
    assert_eq!(second.date_range, "2015 - 2018");
    assert_eq!(second.description, vec!["Maintained Flask services", "Migrated CI to GitHub Actions"]);
    assert_eq!(second.rule, WorkEntryRule::TitleAtCompany);
}

#[tokio::test]
async fn test_empty_document_fails_extraction() {
    let err = parser().parse(&text_document("\n   \n")).unwrap_err();
    assert!(matches!(err, ResumeShortlisterError::Extraction(ExtractionFailure::EmptyText)));

    let invalid = RawDocument::new(vec![0xff, 0xfe, 0x00], DocumentFormat::Txt);
    let err = parser().parse(&invalid).unwrap_err();
    assert!(matches!(err, ResumeShortlisterError::Extraction(ExtractionFailure::Decode(_))));
}

#[tokio::test]
async fn test_concurrent_parses_share_one_parser() {
    let parser = Arc::new(parser());
    let document = Arc::new(sample_document().await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let parser = Arc::clone(&parser);
            let document = Arc::clone(&document);
            tokio::task::spawn_blocking(move || parser.parse(&document))
        })
        .collect();

    let mut profiles = Vec::new();
    for handle in handles {
        profiles.push(handle.await.unwrap().unwrap());
    }

    assert!(profiles.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_parse_then_rank() {
    let parser = parser();
    let candidates: Vec<CandidateProfile> = vec![
        parser.parse(&sample_document().await).unwrap(),
        parser
            .parse(&text_document("John Smith\nExperienced with Java and Spring since 2012"))
            .unwrap(),
        parser
            .parse(&text_document("Ann Lee\nPython and Django work from 2020"))
            .unwrap(),
    ];

    let job = InputManager::new()
        .extract_text(Path::new(JOB_DESCRIPTION))
        .await
        .unwrap();

    let ranker = SimilarityRanker::new(Arc::new(BagOfWords));
    let all = ranker.rank(&job, &candidates, TopPercent::new(100.0).unwrap()).unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(all[0].candidate_key, "jane.doe@example.com");
    assert_eq!(all[0].index, 0);
    assert!(all[0].similarity > all[1].similarity);
    assert!(all[0].similarity > all[2].similarity);
    assert_eq!(all[1].index, 2);

    let top = ranker.rank(&job, &candidates, "10".parse().unwrap()).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0], all[0]);
}

#[test]
fn test_rank_rejects_invalid_top_percent_text() {
    for raw in ["0", "-5", "150", "ten"] {
        let err = raw.parse::<TopPercent>().unwrap_err();
        assert!(matches!(err, ResumeShortlisterError::InvalidTopPercent(_)));
    }
}
