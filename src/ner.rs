use crate::entity::EntityType;

/// A typed span produced by a named-entity recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpan {
    pub text: String,
    pub entity_type: EntityType,
}

/// Collaborator interface for the external named-entity recognizer.
///
/// The retrieval engine treats NER as an external model: constructed once at startup
/// and shared by reference into the extractor and the query entity extractor (§9,
/// "global mutable singletons" design note). Implementations must be deterministic —
/// the engine's determinism guarantee depends on it.
pub trait NerModel: Send + Sync {
    fn extract(&self, text: &str) -> Vec<EntitySpan>;
}

/// Heuristic capitalization-run recognizer used when no external model is configured.
///
/// Spans consecutive runs of capitalized words as PERSON/ORG/LOC candidates based on a
/// small closed set of organization and location cue words; everything else capitalized
/// falls back to PERSON. This is a deliberately simple stand-in for a real statistical or
/// transformer-based recognizer — it exists so the pipeline is runnable end-to-end; the
/// Entity Validator downstream absorbs most of its false positives.
pub struct HeuristicNer;

const ORG_CUES: &[&str] = &[
    "inc", "inc.", "corp", "corp.", "llc", "ltd", "ltd.", "company", "associates", "group",
    "foundation", "institute", "university", "partners", "international", "bank",
];

const LOC_CUES: &[&str] = &[
    "city", "island", "islands", "county", "state", "republic", "kingdom",
];

impl NerModel for HeuristicNer {
    fn extract(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans = Vec::new();
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut i = 0;
        while i < words.len() {
            if !starts_capitalized(words[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < words.len() && starts_capitalized(words[i]) {
                i += 1;
            }
            let run = &words[start..i];
            if run.is_empty() {
                continue;
            }
            let joined = run
                .iter()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '.'))
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                continue;
            }
            let lower = joined.to_lowercase();
            let entity_type = if ORG_CUES.iter().any(|cue| lower.ends_with(cue)) {
                EntityType::Org
            } else if LOC_CUES.iter().any(|cue| lower.ends_with(cue)) {
                EntityType::Loc
            } else if run.len() >= 2 {
                EntityType::Person
            } else {
                EntityType::Loc
            };
            spans.push(EntitySpan {
                text: joined,
                entity_type,
            });
        }
        spans
    }
}

fn starts_capitalized(word: &str) -> bool {
    word.chars()
        .find(|c| c.is_alphabetic())
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multi_word_person_span() {
        let ner = HeuristicNer;
        let spans = ner.extract("Jeffrey Epstein met with Maxwell in Paris.");
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&"Jeffrey Epstein"));
    }

    #[test]
    fn recognizes_org_cue_suffix() {
        let ner = HeuristicNer;
        let spans = ner.extract("He worked at Acme Corp before retiring.");
        let org = spans.iter().find(|s| s.text.contains("Acme"));
        assert_eq!(org.unwrap().entity_type, EntityType::Org);
    }

    #[test]
    fn recognizes_loc_cue_suffix() {
        let ner = HeuristicNer;
        let spans = ner.extract("They flew through Rhode Island yesterday.");
        let loc = spans.iter().find(|s| s.text.contains("Island"));
        assert_eq!(loc.unwrap().entity_type, EntityType::Loc);
    }

    #[test]
    fn ignores_lowercase_text() {
        let ner = HeuristicNer;
        let spans = ner.extract("this sentence has no capitals except none");
        assert!(spans.is_empty());
    }

    #[test]
    fn deterministic_across_calls() {
        let ner = HeuristicNer;
        let text = "Jeffrey Epstein met with Maxwell in Paris.";
        assert_eq!(ner.extract(text), ner.extract(text));
    }
}
