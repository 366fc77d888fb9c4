//! Content scoring algorithms for determining article quality.

use crate::constants::{ParseFlags, REGEXPS, SCORE_ANCESTOR_DEPTH};
use crate::dom::{Document, NodeId};
use crate::dom_utils;
use crate::utils::char_len;
use std::collections::HashMap;

/// Content scores of the elements touched by one extraction pass.
pub type ScoreMap = HashMap<NodeId, f64>;

/// Get an element's class/ID weight using regular expressions.
/// Uses positive/negative patterns to determine if an element looks good or bad.
///
/// # Arguments
/// * `doc` - The owning document
/// * `node` - The element to get the weight for
/// * `flags` - Current parsing flags (weights are 0 unless `WEIGHT_CLASSES` is active)
///
/// # Returns
/// Weight in steps of 25, between -50 and +50
pub fn get_class_weight(doc: &Document, node: NodeId, flags: ParseFlags) -> i32 {
    if !flags.contains(ParseFlags::WEIGHT_CLASSES) {
        return 0;
    }

    let mut weight = 0;

    for value in [doc.class_name(node), doc.id_attr(node)] {
        if value.is_empty() {
            continue;
        }
        if REGEXPS.negative.is_match(value) {
            weight -= 25;
        }
        if REGEXPS.positive.is_match(value) {
            weight += 25;
        }
    }

    weight
}

/// Initial content score for an element, from its tag and class weight.
pub fn initialize_node_score(doc: &Document, node: NodeId, flags: ParseFlags) -> f64 {
    let base = match doc.tag_name(node).unwrap_or("") {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };

    base + get_class_weight(doc, node, flags) as f64
}

/// Score contributed by a paragraph-like element to its ancestors.
///
/// `1 + commas + min(floor(length / 100), 3)`, or `None` when the element has
/// less than 25 characters of text.
pub fn calculate_content_score(doc: &Document, node: NodeId) -> Option<f64> {
    let inner_text = dom_utils::get_inner_text(doc, node, true);
    let length = char_len(&inner_text);
    if length < 25 {
        return None;
    }

    let comma_count = REGEXPS.commas.find_iter(&inner_text).count();
    let length_bonus = (length / 100).min(3);

    Some(1.0 + comma_count as f64 + length_bonus as f64)
}

/// Share of a paragraph's score given to the ancestor `level` steps up.
pub fn score_divider(level: usize) -> f64 {
    match level {
        0 => 1.0,
        1 => 2.0,
        _ => level as f64 * 3.0,
    }
}

/// Propagate paragraph scores to their ancestors.
///
/// Every ancestor that receives a score for the first time is initialized from
/// its tag and class weight and appended to the returned candidate list.
///
/// # Arguments
/// * `elements_to_score` - Paragraph-like elements collected by the node walk
/// * `scores` - Side map receiving the scores
pub fn score_elements(
    doc: &Document,
    elements_to_score: &[NodeId],
    flags: ParseFlags,
    scores: &mut ScoreMap,
) -> Vec<NodeId> {
    let mut candidates = Vec::new();

    for &element in elements_to_score {
        let Some(parent) = doc.parent(element) else {
            continue;
        };
        if !doc.is_element(parent) {
            continue;
        }

        let Some(content_score) = calculate_content_score(doc, element) else {
            continue;
        };

        let ancestors = dom_utils::get_node_ancestors(doc, element, SCORE_ANCESTOR_DEPTH);
        if ancestors.is_empty() {
            continue;
        }

        for (level, &ancestor) in ancestors.iter().enumerate() {
            let has_element_parent = doc
                .parent(ancestor)
                .is_some_and(|p| doc.is_element(p));
            if !doc.is_element(ancestor) || !has_element_parent {
                continue;
            }

            let score = scores.entry(ancestor).or_insert_with(|| {
                candidates.push(ancestor);
                initialize_node_score(doc, ancestor, flags)
            });
            *score += content_score / score_divider(level);
        }
    }

    candidates
}

/// Check if an element is a valid byline.
///
/// A valid byline has `rel="author"`, an `itemprop` containing "author", or a
/// class/id matching the byline pattern, and between 1 and 99 characters of text.
///
/// # Arguments
/// * `match_string` - Class and id of the element joined by a space
pub fn is_valid_byline(doc: &Document, node: NodeId, match_string: &str) -> bool {
    let rel = doc.attr(node, "rel").unwrap_or("");
    let itemprop = doc.attr(node, "itemprop").unwrap_or("");

    if !(rel == "author" || itemprop.contains("author") || REGEXPS.byline.is_match(match_string)) {
        return false;
    }

    let byline_length = char_len(&dom_utils::get_inner_text(doc, node, true));
    byline_length > 0 && byline_length < 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &Document, tag: &str) -> NodeId {
        doc.elements_by_tag(doc.root(), &[tag])[0]
    }

    #[test]
    fn test_get_class_weight() {
        let doc = Document::parse_fragment(
            r#"
            <div class="article content">Positive</div>
            <div class="sidebar ad">Negative</div>
            <div id="main-content">Positive ID</div>
            <div class="post-share">Both</div>
        "#,
        );
        let divs = doc.elements_by_tag(doc.root(), &["div"]);
        let flags = ParseFlags::WEIGHT_CLASSES;

        assert_eq!(get_class_weight(&doc, divs[0], flags), 25);
        assert_eq!(get_class_weight(&doc, divs[1], flags), -25);
        assert_eq!(get_class_weight(&doc, divs[2], flags), 25);
        assert_eq!(get_class_weight(&doc, divs[3], flags), 0);
        assert_eq!(get_class_weight(&doc, divs[1], ParseFlags::empty()), 0);
    }

    #[test]
    fn test_initialize_node_score() {
        let doc = Document::parse_fragment(
            "<div>a</div><blockquote>b</blockquote><ul><li>c</li></ul><h1>d</h1><p>e</p><article>f</article>",
        );
        let flags = ParseFlags::WEIGHT_CLASSES;

        assert_eq!(initialize_node_score(&doc, first(&doc, "div"), flags), 5.0);
        assert_eq!(initialize_node_score(&doc, first(&doc, "blockquote"), flags), 3.0);
        assert_eq!(initialize_node_score(&doc, first(&doc, "ul"), flags), -3.0);
        assert_eq!(initialize_node_score(&doc, first(&doc, "h1"), flags), -5.0);
        assert_eq!(initialize_node_score(&doc, first(&doc, "p"), flags), 0.0);
        assert_eq!(initialize_node_score(&doc, first(&doc, "article"), flags), 0.0);
    }

    #[test]
    fn test_initialize_node_score_with_class() {
        let doc = Document::parse_fragment(r#"<div class="comment">x</div>"#);
        let div = first(&doc, "div");
        assert_eq!(initialize_node_score(&doc, div, ParseFlags::all()), -20.0);
        assert_eq!(initialize_node_score(&doc, div, ParseFlags::empty()), 5.0);
    }

    #[test]
    fn test_calculate_content_score() {
        let text = "word ".repeat(50);
        let doc = Document::parse_fragment(&format!("<p>{text}, and, more</p>"));
        // 2 commas, 262 chars -> length bonus 2
        assert_eq!(calculate_content_score(&doc, first(&doc, "p")), Some(5.0));
    }

    #[test]
    fn test_length_bonus_is_capped() {
        let text = "x".repeat(1000);
        let doc = Document::parse_fragment(&format!("<p>{text}</p>"));
        assert_eq!(calculate_content_score(&doc, first(&doc, "p")), Some(4.0));
    }

    #[test]
    fn test_short_content_score() {
        let doc = Document::parse_fragment("<p>Short</p>");
        assert_eq!(calculate_content_score(&doc, first(&doc, "p")), None);
    }

    #[test]
    fn test_score_divider() {
        assert_eq!(score_divider(0), 1.0);
        assert_eq!(score_divider(1), 2.0);
        assert_eq!(score_divider(2), 6.0);
        assert_eq!(score_divider(4), 12.0);
    }

    #[test]
    fn test_score_elements_propagates_to_ancestors() {
        let text = "a".repeat(120);
        let doc = Document::parse(&format!(
            "<html><body><article><section><p>{text}</p></section></article></body></html>"
        ));
        let p = first(&doc, "p");
        let mut scores = ScoreMap::new();
        let candidates = score_elements(&doc, &[p], ParseFlags::all(), &mut scores);

        let section = first(&doc, "section");
        let article = first(&doc, "article");
        let body = doc.body().unwrap();
        assert_eq!(candidates, vec![section, article, body]);
        // base score 1 + 0 commas + 1 length bonus = 2
        assert_eq!(scores[&section], 2.0);
        assert_eq!(scores[&article], 1.0);
        assert!((scores[&body] - 2.0 / 6.0).abs() < 1e-9);
        assert!(!scores.contains_key(&doc.document_element().unwrap()));
    }

    #[test]
    fn test_is_valid_byline() {
        let doc = Document::parse_fragment(
            r#"<span rel="author">Jane Doe</span><div class="byline"></div><p>Plain</p>"#,
        );
        assert!(is_valid_byline(&doc, first(&doc, "span"), " "));
        assert!(!is_valid_byline(&doc, first(&doc, "div"), "byline "));
        assert!(!is_valid_byline(&doc, first(&doc, "p"), " "));
    }
}
