//! Small string helpers shared by the extraction stages.

use crate::constants::REGEXPS;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(quot|amp|apos|lt|gt);").unwrap_or_else(|e| panic!("{e}")));
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)&#(?:x([0-9a-f]{1,6})|([0-9]{1,7}));").unwrap_or_else(|e| panic!("{e}"))
});

/// Collapse runs of two or more whitespace characters into a single space.
pub fn normalize_whitespace(text: &str) -> String {
    REGEXPS.normalize.replace_all(text, " ").into_owned()
}

/// Number of whitespace separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Length of a string in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Similarity of `text_b` to `text_a` in `[0, 1]`.
///
/// Both strings are lower-cased and split on non-word characters. The result is
/// one minus the share of `text_b` (by joined length) made up of tokens that do
/// not occur in `text_a`. Returns 0 when either side has no tokens.
pub fn text_similarity(text_a: &str, text_b: &str) -> f64 {
    let lower_a = text_a.to_lowercase();
    let lower_b = text_b.to_lowercase();
    let tokens_a: Vec<&str> = REGEXPS
        .tokenize
        .split(&lower_a)
        .filter(|t| !t.is_empty())
        .collect();
    let tokens_b: Vec<&str> = REGEXPS
        .tokenize
        .split(&lower_b)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let unique_b: Vec<&str> = tokens_b
        .iter()
        .copied()
        .filter(|token| !tokens_a.contains(token))
        .collect();

    let distance = char_len(&unique_b.join(" ")) as f64 / char_len(&tokens_b.join(" ")) as f64;
    1.0 - distance
}

/// Decode the five basic named entities and numeric character references.
/// Invalid code points are replaced with U+FFFD.
pub fn unescape_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let named = NAMED_ENTITY.replace_all(text, |caps: &Captures| {
        match &caps[1] {
            "quot" => "\"",
            "amp" => "&",
            "apos" => "'",
            "lt" => "<",
            _ => ">",
        }
        .to_string()
    });

    NUMERIC_ENTITY
        .replace_all(&named, |caps: &Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a  b\n\n c"), "a b c");
        assert_eq!(normalize_whitespace("a b"), "a b");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\tthree "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_text_similarity_identical() {
        assert!((text_similarity("Hello World", "hello, world!") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_similarity_disjoint() {
        assert_eq!(text_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_text_similarity_partial() {
        // "extra" is the only unique token: 1 - 5/19
        let sim = text_similarity("breaking news story", "breaking news extra");
        assert!((sim - (1.0 - 5.0 / 19.0)).abs() < 1e-9);
    }

    #[test]
    fn test_text_similarity_empty() {
        assert_eq!(text_similarity("", "anything"), 0.0);
        assert_eq!(text_similarity("anything", "!!!"), 0.0);
    }

    #[test]
    fn test_unescape_html_entities() {
        assert_eq!(unescape_html_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_html_entities("&quot;hi&quot; &lt;b&gt;"), "\"hi\" <b>");
        assert_eq!(unescape_html_entities("&#39;&#x41;"), "'A");
        assert_eq!(unescape_html_entities("plain"), "plain");
    }
}
