//! Entity extraction: NER spans plus deterministic contact-detail rules

use crate::error::Result;
use crate::extraction::ner::EntityRecognizer;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Person,
    Email,
    Phone,
    Org,
    Location,
    Date,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Person,
        EntityKind::Email,
        EntityKind::Phone,
        EntityKind::Org,
        EntityKind::Location,
        EntityKind::Date,
    ];

    /// EMAIL and PHONE hold unique values; the rest keep duplicates.
    pub fn is_unique(&self) -> bool {
        matches!(self, EntityKind::Email | EntityKind::Phone)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Person => "PERSON",
            EntityKind::Email => "EMAIL",
            EntityKind::Phone => "PHONE",
            EntityKind::Org => "ORG",
            EntityKind::Location => "LOCATION",
            EntityKind::Date => "DATE",
        };
        f.write_str(name)
    }
}

/// Phone shapes, in the priority order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneRule {
    /// `+1-555-0123`
    InternationalDashed,
    /// `+44 555 0123`, `+1.555.0123`
    InternationalFlexible,
    /// `(555) 123-4567`
    ParenthesizedAreaCode,
    /// `555-123-4567`, `555 123 4567`
    PlainTenDigit,
    /// `+1-(555)-123-4567`
    ParenthesizedInternational,
}

impl PhoneRule {
    pub const PRIORITY: [PhoneRule; 5] = [
        PhoneRule::InternationalDashed,
        PhoneRule::InternationalFlexible,
        PhoneRule::ParenthesizedAreaCode,
        PhoneRule::PlainTenDigit,
        PhoneRule::ParenthesizedInternational,
    ];

    fn pattern(&self) -> &'static str {
        match self {
            PhoneRule::InternationalDashed => r"\+1-\d{3}-\d{4}",
            PhoneRule::InternationalFlexible => r"\+\d{1,3}[-.\s]?\d{3}[-.\s]?\d{4}",
            PhoneRule::ParenthesizedAreaCode => r"\(\d{3}\)\s?\d{3}[-.\s]?\d{4}",
            PhoneRule::PlainTenDigit => r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}",
            PhoneRule::ParenthesizedInternational => r"\+\d{1,3}[-.\s]?\(\d{3}\)[-.\s]?\d{3}[-.\s]?\d{4}",
        }
    }
}

/// A phone number together with the first rule that matched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneMatch {
    pub value: String,
    pub rule: PhoneRule,
}

/// Entity kind → surface strings, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityBag {
    entities: BTreeMap<EntityKind, Vec<String>>,
    #[serde(default)]
    phone_matches: Vec<PhoneMatch>,
}

impl EntityBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EntityKind) -> &[String] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, kind: EntityKind) -> Option<&str> {
        self.get(kind).first().map(String::as_str)
    }

    /// Append a value, skipping repeats for the unique kinds.
    pub fn push(&mut self, kind: EntityKind, value: impl Into<String>) {
        let value = value.into();
        let values = self.entities.entry(kind).or_default();
        if kind.is_unique() && values.contains(&value) {
            return;
        }
        values.push(value);
    }

    fn replace(&mut self, kind: EntityKind, values: Vec<String>) {
        self.entities.insert(kind, values);
    }

    /// How each phone value was matched; empty when phones came from the model.
    pub fn phone_matches(&self) -> &[PhoneMatch] {
        &self.phone_matches
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.get(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.values().all(Vec::is_empty)
    }
}

/// Produces an `EntityBag` from plain text.
///
/// Runs the shared recognizer for names, organizations, locations and dates,
/// then applies pattern rules for email and phone directly to the raw text;
/// rule output replaces whatever the recognizer reported for those kinds.
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    email_regex: Regex,
    phone_rules: Vec<(PhoneRule, Regex)>,
    date_regex: Regex,
}

impl EntityExtractor {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        let email_regex = Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("Invalid email regex");

        let phone_rules = PhoneRule::PRIORITY
            .iter()
            .map(|rule| (*rule, Regex::new(rule.pattern()).expect("Invalid phone regex")))
            .collect();

        let date_regex = Regex::new(
            r"(?i)\b(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+)?(?:19|20)\d{2}\b",
        )
        .expect("Invalid date regex");

        Self {
            recognizer,
            email_regex,
            phone_rules,
            date_regex,
        }
    }

    /// Extract every entity kind from `text`.
    ///
    /// Missing kinds come back as empty lists. The only error is a failure of
    /// the recognizer itself.
    pub fn extract(&self, text: &str) -> Result<EntityBag> {
        let mut bag = EntityBag::new();

        for span in self.recognizer.recognize(text)? {
            bag.push(span.kind, span.text);
        }

        if !self.recognizer.kinds().contains(&EntityKind::Date) {
            for date in self.extract_dates(text) {
                bag.push(EntityKind::Date, date);
            }
        }

        let emails = self.extract_emails(text);
        if !emails.is_empty() {
            bag.replace(EntityKind::Email, emails);
        }

        let phones = self.extract_phones(text);
        if !phones.is_empty() {
            bag.replace(EntityKind::Phone, phones.iter().map(|p| p.value.clone()).collect());
            bag.phone_matches = phones;
        }

        debug!(
            "Entities: {}",
            EntityKind::ALL
                .iter()
                .map(|kind| format!("{}={}", kind, bag.len(*kind)))
                .collect::<Vec<_>>()
                .join(" ")
        );

        Ok(bag)
    }

    /// Unique email addresses in order of appearance.
    pub fn extract_emails(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.email_regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|email| seen.insert(email.clone()))
            .collect()
    }

    /// Unique phone numbers, ordered by rule priority then position.
    pub fn extract_phones(&self, text: &str) -> Vec<PhoneMatch> {
        let mut seen = HashSet::new();
        let mut phones = Vec::new();

        for (rule, regex) in &self.phone_rules {
            for m in regex.find_iter(text) {
                let value = m.as_str().to_string();
                if seen.insert(value.clone()) {
                    phones.push(PhoneMatch { value, rule: *rule });
                }
            }
        }

        phones
    }

    /// Month-year and bare year mentions, for recognizers without a DATE label.
    pub fn extract_dates(&self, text: &str) -> Vec<String> {
        self.date_regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
