//! Metadata extraction from HTML documents (JSON-LD, meta tags, title heuristics).

use crate::constants::{REGEXPS, TITLE_SIMILARITY_THRESHOLD};
use crate::dom::{Document, NodeId};
use crate::dom_utils::get_inner_text;
use crate::error::Result;
use crate::utils::{char_len, normalize_whitespace, text_similarity, unescape_html_entities, word_count};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata extracted from the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub lang: Option<String>,
}

/// Extract article metadata from the first usable JSON-LD block.
///
/// Only schema.org objects of an Article-like type are considered. Blocks that
/// fail to parse are logged and skipped.
pub fn get_json_ld(doc: &Document) -> Metadata {
    let raw_title = document_title(doc);

    for script in doc.elements_by_tag(doc.root(), &["script"]) {
        if doc.attr(script, "type") != Some("application/ld+json") {
            continue;
        }

        let content = doc.text_content(script);
        match parse_json_ld(&content, &raw_title) {
            Ok(Some(metadata)) => return metadata,
            Ok(None) => {}
            Err(err) => tracing::debug!("Reader: (Readability) {err}"),
        }
    }

    Metadata::default()
}

fn parse_json_ld(content: &str, raw_title: &str) -> Result<Option<Metadata>> {
    let content = REGEXPS.cdata.replace_all(content, "");
    let parsed: Value = serde_json::from_str(&content)?;

    let roots: Vec<&Value> = match &parsed {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for root in roots {
        if !has_schema_org_context(root) {
            continue;
        }

        let article = if root.get("@type").is_none() {
            root.get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find(|item| is_article_type(item)))
        } else {
            Some(root)
        };

        if let Some(article) = article.filter(|a| is_article_type(a)) {
            return Ok(Some(json_ld_metadata(article, raw_title)));
        }
    }

    Ok(None)
}

fn has_schema_org_context(value: &Value) -> bool {
    match value.get("@context") {
        Some(Value::String(context)) => REGEXPS.schema_org_context.is_match(context),
        Some(Value::Object(context)) => context
            .get("@vocab")
            .and_then(Value::as_str)
            .is_some_and(|vocab| REGEXPS.schema_org_context.is_match(vocab)),
        _ => false,
    }
}

fn is_article_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => REGEXPS.json_ld_article_types.is_match(kind),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| REGEXPS.json_ld_article_types.is_match(kind)),
        _ => false,
    }
}

fn json_ld_metadata(article: &Value, raw_title: &str) -> Metadata {
    let string_field = |key: &str| article.get(key).and_then(Value::as_str).map(str::trim);

    let title = match (string_field("name"), string_field("headline")) {
        (Some(name), Some(headline)) if name != headline => {
            // Some sites put their own name in "name"; prefer the field that
            // looks like the page title.
            let name_matches = text_similarity(name, raw_title) > TITLE_SIMILARITY_THRESHOLD;
            let headline_matches =
                text_similarity(headline, raw_title) > TITLE_SIMILARITY_THRESHOLD;
            if headline_matches && !name_matches {
                Some(headline)
            } else {
                Some(name)
            }
        }
        (Some(name), _) => Some(name),
        (None, headline) => headline,
    };

    let byline = article.get("author").and_then(|author| match author {
        Value::Array(authors) => {
            let names: Vec<&str> = authors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::trim)
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        other => other
            .get("name")
            .and_then(Value::as_str)
            .map(|name| name.trim().to_string()),
    });

    Metadata {
        title: title.map(str::to_string),
        byline,
        excerpt: string_field("description").map(str::to_string),
        site_name: article
            .get("publisher")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(|name| name.trim().to_string()),
        published_time: string_field("datePublished").map(str::to_string),
        lang: None,
    }
}

/// Collect metadata from `<meta>` tags, merged over `json_ld`.
///
/// JSON-LD values win; otherwise the first matching meta tag in document
/// order supplies each field. The title falls back to [`get_article_title`].
pub fn get_article_metadata(doc: &Document, json_ld: Metadata) -> Metadata {
    let values = collect_meta_values(doc);
    let lookup = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|key| values.get(*key).cloned())
    };

    let title = json_ld
        .title
        .or_else(|| {
            lookup(&[
                "dc:title",
                "dcterm:title",
                "og:title",
                "weibo:article:title",
                "weibo:webpage:title",
                "title",
                "twitter:title",
            ])
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| get_article_title(doc));

    let byline = json_ld
        .byline
        .or_else(|| lookup(&["dc:creator", "dcterm:creator", "author"]));

    let excerpt = json_ld.excerpt.or_else(|| {
        lookup(&[
            "dc:description",
            "dcterm:description",
            "og:description",
            "weibo:article:description",
            "weibo:webpage:description",
            "description",
            "twitter:description",
        ])
    });

    let site_name = json_ld.site_name.or_else(|| lookup(&["og:site_name"]));
    let published_time = json_ld
        .published_time
        .or_else(|| lookup(&["article:published_time"]));

    Metadata {
        title: Some(unescape_html_entities(&title)),
        byline: byline.map(|v| unescape_html_entities(&v)),
        excerpt: excerpt.map(|v| unescape_html_entities(&v)),
        site_name: site_name.map(|v| unescape_html_entities(&v)),
        published_time: published_time.map(|v| unescape_html_entities(&v)),
        lang: get_document_language(doc),
    }
}

fn collect_meta_values(doc: &Document) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for meta in doc.elements_by_tag(doc.root(), &["meta"]) {
        let content = match doc.attr(meta, "content") {
            Some(content) if !content.is_empty() => content.trim().to_string(),
            _ => continue,
        };

        let mut matched = false;
        if let Some(property) = doc.attr(meta, "property") {
            // property is a space-separated list
            for found in REGEXPS.meta_property.find_iter(property) {
                matched = true;
                let name: String = found
                    .as_str()
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                values.entry(name).or_insert_with(|| content.clone());
            }
        }

        if matched {
            continue;
        }

        if let Some(name) = doc.attr(meta, "name") {
            if REGEXPS.meta_name.is_match(name) {
                let name: String = name
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| if c == '.' { ':' } else { c })
                    .collect();
                values.entry(name).or_insert(content);
            }
        }
    }

    values
}

/// Text of the first `<title>` element with whitespace collapsed.
pub fn document_title(doc: &Document) -> String {
    doc.elements_by_tag(doc.root(), &["title"])
        .first()
        .map(|&title| {
            doc.text_content(title)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Derive the article title from the document `<title>`.
///
/// Site names separated by `|`, `-`, `\`, `/`, `>` or `»` and prefixes before
/// `": "` are trimmed; very long or short titles defer to a lone `<h1>`. Short
/// results that dropped too little are reverted to the original.
pub fn get_article_title(doc: &Document) -> String {
    let orig_title = document_title(doc);
    let mut cur_title = orig_title.clone();
    let mut had_separator = false;

    if let Some(separator) = REGEXPS.title_separator.find_iter(&orig_title).last() {
        had_separator = true;
        let head = orig_title[..separator.start()].trim();
        let tail = orig_title[separator.end()..].trim();
        let (kept, other) = if char_len(tail) > char_len(head) {
            (tail, head)
        } else {
            (head, tail)
        };

        cur_title = if word_count(kept) >= 3 {
            kept.to_string()
        } else if word_count(other) >= 3 {
            other.to_string()
        } else {
            orig_title.clone()
        };
    } else if orig_title.contains(": ") {
        let heading_matches = doc
            .elements_by_tag(doc.root(), &["h1", "h2"])
            .into_iter()
            .any(|heading| doc.text_content(heading).trim() == orig_title);

        if !heading_matches {
            if let (Some(first), Some(last)) = (orig_title.find(':'), orig_title.rfind(':')) {
                let after_last = orig_title[last + 1..].trim();
                cur_title = if word_count(after_last) >= 3 {
                    after_last.to_string()
                } else if word_count(&orig_title[..first]) > 5 {
                    orig_title.clone()
                } else {
                    orig_title[first + 1..].trim().to_string()
                };
            }
        }
    } else if char_len(&orig_title) > 150 || char_len(&orig_title) < 15 {
        let h1s = doc.elements_by_tag(doc.root(), &["h1"]);
        if h1s.len() == 1 {
            cur_title = get_inner_text(doc, h1s[0], true);
        }
    }

    cur_title = normalize_whitespace(cur_title.trim());

    let cur_words = word_count(&cur_title);
    let stripped_words = word_count(&REGEXPS.title_separator_chars.replace_all(&orig_title, ""));
    if cur_words <= 4 && (!had_separator || stripped_words.saturating_sub(cur_words) <= 1) {
        cur_title = orig_title;
    }

    cur_title
}

/// Language from `<html lang>`, then `content-language`/`language` meta tags.
pub fn get_document_language(doc: &Document) -> Option<String> {
    let from_html = doc
        .document_element()
        .and_then(|html| doc.attr(html, "lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty());
    if let Some(lang) = from_html {
        return Some(lang.to_string());
    }

    let metas: Vec<NodeId> = doc.elements_by_tag(doc.root(), &["meta"]);
    let meta_content = |matches: &dyn Fn(NodeId) -> bool| {
        metas
            .iter()
            .copied()
            .filter(|&meta| matches(meta))
            .find_map(|meta| doc.attr(meta, "content"))
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    };

    meta_content(&|meta| {
        doc.attr(meta, "http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("content-language"))
    })
    .or_else(|| {
        meta_content(&|meta| {
            doc.attr(meta, "name")
                .is_some_and(|v| v.eq_ignore_ascii_case("language"))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_title(title: &str, body: &str) -> Document {
        Document::parse(&format!(
            "<html><head><title>{title}</title></head><body>{body}</body></html>"
        ))
    }

    #[test]
    fn test_title_keeps_tail_after_last_separator() {
        let doc = doc_with_title("Acme Corp | News | Q3 Earnings Beat Estimates", "");
        assert_eq!(get_article_title(&doc), "Q3 Earnings Beat Estimates");
    }

    #[test]
    fn test_title_keeps_longer_head() {
        let doc = doc_with_title("How Rust Manages Memory Safely - The Blog", "");
        assert_eq!(get_article_title(&doc), "How Rust Manages Memory Safely");
    }

    #[test]
    fn test_title_with_two_short_sides_is_kept_whole() {
        let doc = doc_with_title("Article Title | Site Name", "");
        assert_eq!(get_article_title(&doc), "Article Title | Site Name");
    }

    #[test]
    fn test_title_after_colon() {
        let doc = doc_with_title("Site: A Long Article Headline Right Here", "");
        assert_eq!(get_article_title(&doc), "A Long Article Headline Right Here");
    }

    #[test]
    fn test_title_colon_kept_when_heading_matches() {
        let title = "Rust: A Long Article Headline Right Here";
        let doc = doc_with_title(title, &format!("<h1>{title}</h1>"));
        assert_eq!(get_article_title(&doc), title);
    }

    #[test]
    fn test_short_title_uses_single_h1() {
        let doc = doc_with_title("Home", "<h1>The Real Headline Of This Article</h1>");
        assert_eq!(get_article_title(&doc), "The Real Headline Of This Article");
    }

    #[test]
    fn test_json_ld_article() {
        let doc = doc_with_title(
            "Ignored",
            r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "NewsArticle",
             "headline": "Big News", "description": "What happened",
             "author": [{"name": "Ann"}, {"name": "Bob"}],
             "publisher": {"name": "Daily"}, "datePublished": "2024-01-02"}
            </script>"#,
        );
        let metadata = get_json_ld(&doc);
        assert_eq!(metadata.title.as_deref(), Some("Big News"));
        assert_eq!(metadata.byline.as_deref(), Some("Ann, Bob"));
        assert_eq!(metadata.excerpt.as_deref(), Some("What happened"));
        assert_eq!(metadata.site_name.as_deref(), Some("Daily"));
        assert_eq!(metadata.published_time.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_json_ld_graph_and_headline_preference() {
        let doc = doc_with_title(
            "Markets Rally On Rate Cut | Daily",
            r#"<script type="application/ld+json">
            {"@context": "http://schema.org", "@graph": [
                {"@type": "WebSite", "name": "Daily"},
                {"@type": "Article", "name": "Daily", "headline": "Markets Rally On Rate Cut"}
            ]}
            </script>"#,
        );
        let metadata = get_json_ld(&doc);
        assert_eq!(metadata.title.as_deref(), Some("Markets Rally On Rate Cut"));
    }

    #[test]
    fn test_json_ld_rejects_other_context_and_bad_json() {
        let doc = doc_with_title(
            "T",
            r#"<script type="application/ld+json">{ not json</script>
            <script type="application/ld+json">{"@context": "https://example.org", "@type": "Article", "name": "No"}</script>
            <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Article", "name": "Yes"}</script>"#,
        );
        assert_eq!(get_json_ld(&doc).title.as_deref(), Some("Yes"));
    }

    #[test]
    fn test_json_ld_non_article_type() {
        let doc = doc_with_title(
            "T",
            r#"<script type="application/ld+json">{"@context": "https://schema.org", "@type": "Recipe", "name": "Soup"}</script>"#,
        );
        assert_eq!(get_json_ld(&doc), Metadata::default());
    }

    #[test]
    fn test_meta_tags_first_match_wins() {
        let doc = Document::parse(
            r#"<html lang="en"><head>
            <title>Doc Title</title>
            <meta property="og:title" content="OG Title">
            <meta name="dc.title" content="DC Title">
            <meta property="og:site_name" content="Example">
            <meta property="og:site_name" content="Second">
            <meta name="author" content="Jane &amp; John">
            <meta property="article:published_time" content="2024-05-06">
            <meta name="twitter:description" content="Tweet text">
            </head><body></body></html>"#,
        );
        let metadata = get_article_metadata(&doc, Metadata::default());
        assert_eq!(metadata.title.as_deref(), Some("DC Title"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example"));
        assert_eq!(metadata.byline.as_deref(), Some("Jane & John"));
        assert_eq!(metadata.published_time.as_deref(), Some("2024-05-06"));
        assert_eq!(metadata.excerpt.as_deref(), Some("Tweet text"));
        assert_eq!(metadata.lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_meta_property_list() {
        let doc = Document::parse(
            r#"<html><head><meta property="og:description twitter:description" content="Shared"></head></html>"#,
        );
        let values = collect_meta_values(&doc);
        assert_eq!(values.get("og:description").map(String::as_str), Some("Shared"));
        assert_eq!(values.get("twitter:description").map(String::as_str), Some("Shared"));
    }

    #[test]
    fn test_json_ld_takes_precedence() {
        let doc = Document::parse(
            r#"<html><head><meta property="og:title" content="OG Title"></head></html>"#,
        );
        let json_ld = Metadata {
            title: Some("JSON Title".into()),
            ..Metadata::default()
        };
        let metadata = get_article_metadata(&doc, json_ld);
        assert_eq!(metadata.title.as_deref(), Some("JSON Title"));
    }

    #[test]
    fn test_language_from_meta() {
        let doc = Document::parse(
            r#"<html><head><meta http-equiv="Content-Language" content="de"></head></html>"#,
        );
        assert_eq!(get_document_language(&doc).as_deref(), Some("de"));
    }
}
