/// Strips control characters, collapses whitespace and excess blank lines from raw text.
///
/// Control characters other than `\n`/`\t` are dropped outright. Runs of horizontal
/// whitespace collapse to a single space; three or more consecutive newlines collapse
/// to two. Deterministic, never fails.
pub fn normalize_text(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();

    let mut out = String::with_capacity(stripped.len());
    let mut newline_run = 0usize;
    let mut pending_space = false;

    for c in stripped.chars() {
        if c == '\n' {
            if pending_space {
                pending_space = false;
            }
            newline_run += 1;
            if newline_run <= 2 {
                out.push('\n');
            }
            continue;
        }
        newline_run = 0;
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    out
}

/// Tokenizes text per the retrieval engine's rules: lowercase, non-alphanumeric
/// (excluding `_`) becomes whitespace, split on whitespace, discard tokens shorter
/// than two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut scrubbed = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_alphanumeric() || c == '_' {
            scrubbed.push(c);
        } else {
            scrubbed.push(' ');
        }
    }
    scrubbed
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_horizontal_whitespace() {
        let result = normalize_text("hello   \t  world");
        assert_eq!(result, "hello world");
    }

    #[test]
    fn collapses_excess_newlines() {
        let result = normalize_text("para one\n\n\n\n\npara two");
        assert_eq!(result, "para one\n\npara two");
    }

    #[test]
    fn strips_control_characters() {
        let result = normalize_text("hello\u{0001}world");
        assert_eq!(result, "helloworld");
    }

    #[test]
    fn preserves_tab() {
        let result = normalize_text("a\tb");
        assert_eq!(result, "a b");
    }

    #[test]
    fn tokenize_lowercases_and_splits_punctuation() {
        let tokens = tokenize("Jeffrey Epstein met with Maxwell, in Paris.");
        assert_eq!(
            tokens,
            vec!["jeffrey", "epstein", "met", "with", "maxwell", "in", "paris"]
        );
    }

    #[test]
    fn tokenize_discards_short_tokens() {
        let tokens = tokenize("a I of it is");
        assert_eq!(tokens, vec!["of", "it", "is"]);
    }

    #[test]
    fn tokenize_underscore_is_word_char() {
        let tokens = tokenize("file_name.txt");
        assert_eq!(tokens, vec!["file_name", "txt"]);
    }

    #[test]
    fn tokenize_idempotent_through_normalize() {
        let raw = "Maxwell  sent \u{0001} emails!!";
        let direct = tokenize(raw);
        let via_normalize = tokenize(&normalize_text(raw));
        assert_eq!(direct, via_normalize);
    }

    #[test]
    fn tokenize_empty_string() {
        assert!(tokenize("").is_empty());
    }
}
