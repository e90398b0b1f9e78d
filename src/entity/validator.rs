use regex::Regex;
use std::sync::OnceLock;

/// Entity type as produced by NER, used to select type-specific rejection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Person,
    Org,
    Loc,
}

fn leading_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}").unwrap())
}

const STRUCTURED_KEYS: &[&str] = &["textStyle", "layout", "identifier"];

const HTML_ENTITY_TOKENS: &[&str] = &[
    "&lt;", "&gt;", "&nbsp;", "&amp;", "&quot;", "&apos;", "&#",
];

const WEEKDAYS: &[&str] = &[
    "mon", "tue", "wed", "thu", "fri", "sat", "sun", "monday", "tuesday", "wednesday",
    "thursday", "friday", "saturday", "sunday",
];

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
    "dec", "january", "february", "march", "april", "june", "july", "august", "september",
    "october", "november", "december",
];

const PERSON_STOP_WORDS: &[&str] = &["the", "and", "page", "chapter", "section"];

/// Filters already-extracted entity surface forms. Does not invoke NER itself.
///
/// Pure and deterministic: repeated calls on the same input return the same result.
pub fn is_valid(candidate: &str, entity_type: EntityType) -> bool {
    let len = candidate.chars().count();
    if !(3..=100).contains(&len) {
        return false;
    }

    if candidate
        .chars()
        .any(|c| matches!(c, '{' | '}' | '[' | ']' | '<' | '>'))
    {
        return false;
    }

    if leading_date_re().is_match(candidate) {
        return false;
    }

    if candidate
        .chars()
        .next()
        .map(|c| matches!(c, '%' | '&' | '@' | '#' | '$'))
        .unwrap_or(false)
    {
        return false;
    }

    if candidate.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let lower = candidate.to_lowercase();
    if STRUCTURED_KEYS.iter().any(|k| lower.contains(&k.to_lowercase())) {
        return false;
    }

    if HTML_ENTITY_TOKENS.iter().any(|t| lower.contains(t)) {
        return false;
    }

    if candidate.contains('\n') {
        return false;
    }

    let lower_trimmed = lower.trim();
    if WEEKDAYS.contains(&lower_trimmed) || MONTHS.contains(&lower_trimmed) {
        return false;
    }

    if !candidate.chars().any(|c| c.is_alphabetic()) {
        return false;
    }

    match entity_type {
        EntityType::Person => {
            if len > 5 && candidate.chars().all(|c| !c.is_lowercase()) {
                return false;
            }
            if lower_trimmed
                .split_whitespace()
                .any(|token| PERSON_STOP_WORDS.contains(&token))
            {
                return false;
            }
        }
        EntityType::Org => {
            let total = candidate.chars().count().max(1);
            let noisy = candidate
                .chars()
                .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
                .count();
            if noisy as f32 / total as f32 > 0.30 {
                return false;
            }
        }
        EntityType::Loc => {
            if candidate
                .chars()
                .next()
                .map(|c| matches!(c, '&' | '%' | '#' | '@'))
                .unwrap_or(false)
            {
                return false;
            }
            let noisy = candidate
                .chars()
                .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && *c != '-' && *c != '.')
                .count();
            if noisy > 2 {
                return false;
            }
        }
    }

    true
}
