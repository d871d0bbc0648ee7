//! Résumé text → structured candidate profile

pub mod entities;
pub mod experience;
pub mod ner;
pub mod profile;
pub mod work_history;

pub use entities::{EntityBag, EntityExtractor, EntityKind, PhoneRule};
pub use experience::ExperienceEstimator;
pub use ner::{EntityRecognizer, EntitySpan, NerModel};
pub use profile::{CandidateProfile, Education, ParserOptions, ProfileBuilder, ResumeParser, Skill};
pub use work_history::{WorkEntryRule, WorkExperienceEntry, WorkHistoryExtractor};
