use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::entity::{is_valid, EntityType};
use crate::ner::NerModel;
use crate::text::tokenize;

/// Raw per-document metadata, before corpus-wide consolidation (§4.4) rewrites
/// entity strings to their canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMetadata {
    pub doc_id: String,
    pub word_count: usize,
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub dates: HashSet<String>,
    pub emails: HashSet<String>,
}

fn date_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
            Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").unwrap(),
            Regex::new(r"\b\d{1,2}-\d{1,2}-\d{4}\b").unwrap(),
            Regex::new(
                r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b",
            )
            .unwrap(),
        ]
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
    })
}

/// Produces `ExtractedMetadata` for a single document.
///
/// NER is only run over the first `ner_char_bound` characters to cap latency on
/// pathological documents; documents longer than the bound still get metadata for
/// their prefix. Dates and emails are extracted via regex over the full text.
pub fn extract(doc_id: &str, raw_text: &str, ner: &dyn NerModel, ner_char_bound: usize) -> ExtractedMetadata {
    let bound = ner_char_bound.min(raw_text.len());
    let ner_slice = char_prefix(raw_text, bound);
    let spans = ner.extract(ner_slice);

    let mut people = Vec::new();
    let mut organizations = Vec::new();
    let mut locations = Vec::new();

    for span in spans {
        let valid = match span.entity_type {
            EntityType::Person => is_valid(&span.text, EntityType::Person),
            EntityType::Org => is_valid(&span.text, EntityType::Org),
            EntityType::Loc => is_valid(&span.text, EntityType::Loc),
        };
        if !valid {
            continue;
        }
        match span.entity_type {
            EntityType::Person => people.push(span.text),
            EntityType::Org => organizations.push(span.text),
            EntityType::Loc => locations.push(span.text),
        }
    }

    let mut dates = HashSet::new();
    for re in date_res() {
        for m in re.find_iter(raw_text) {
            dates.insert(m.as_str().to_string());
        }
    }

    let mut emails = HashSet::new();
    for m in email_re().find_iter(raw_text) {
        emails.insert(m.as_str().to_string());
    }

    let word_count = tokenize(raw_text).len();

    ExtractedMetadata {
        doc_id: doc_id.to_string(),
        word_count,
        people,
        organizations,
        locations,
        dates,
        emails,
    }
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ner::{EntitySpan, HeuristicNer};

    #[test]
    fn extracts_dates_in_multiple_formats() {
        let meta = extract(
            "d1",
            "Filed on 2020-01-15 and again on 3/4/2021 and on January 5, 2022.",
            &HeuristicNer,
            100_000,
        );
        assert!(meta.dates.contains("2020-01-15"));
        assert!(meta.dates.contains("3/4/2021"));
        assert!(meta.dates.contains("January 5, 2022"));
    }

    #[test]
    fn extracts_emails() {
        let meta = extract(
            "d1",
            "Contact person at jane.doe@example.com for details.",
            &HeuristicNer,
            100_000,
        );
        assert!(meta.emails.contains("jane.doe@example.com"));
    }

    #[test]
    fn validator_filters_ner_noise() {
        struct NoisyNer;
        impl NerModel for NoisyNer {
            fn extract(&self, _text: &str) -> Vec<EntitySpan> {
                vec![
                    EntitySpan {
                        text: "Jeffrey Epstein".to_string(),
                        entity_type: EntityType::Person,
                    },
                    EntitySpan {
                        text: "Page 33".to_string(),
                        entity_type: EntityType::Person,
                    },
                ]
            }
        }
        let meta = extract("d1", "irrelevant", &NoisyNer, 100_000);
        assert_eq!(meta.people, vec!["Jeffrey Epstein".to_string()]);
    }

    #[test]
    fn ner_char_bound_limits_scan() {
        struct RecordingNer {
            seen_len: std::cell::Cell<usize>,
        }
        impl NerModel for RecordingNer {
            fn extract(&self, text: &str) -> Vec<EntitySpan> {
                self.seen_len.set(text.chars().count());
                vec![]
            }
        }
        let ner = RecordingNer {
            seen_len: std::cell::Cell::new(0),
        };
        let long_text = "word ".repeat(100);
        extract("d1", &long_text, &ner, 10);
        assert_eq!(ner.seen_len.get(), 10);
    }

    #[test]
    fn word_count_excludes_punctuation_tokens() {
        let meta = extract("d1", "Hello, world!!!", &HeuristicNer, 100_000);
        assert_eq!(meta.word_count, 2);
    }
}
