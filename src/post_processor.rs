//! Post-processing of the cleaned article: absolute URIs, wrapper
//! simplification and class stripping.

use crate::constants::REGEXPS;
use crate::dom::{Document, NodeId};
use crate::dom_utils::{
    get_next_node, has_single_tag_inside_element, is_element_without_content, remove_and_get_next,
};
use crate::options::ReadabilityOptions;
use regex::Captures;
use url::Url;

const MEDIA_TAGS: &[&str] = &["img", "picture", "figure", "video", "audio", "source"];

/// Run every post-processing step on the article container.
///
/// # Arguments
/// * `content` - The detached article container
/// * `document_uri` - URL the document was loaded from, if known
pub fn post_process_content(
    doc: &mut Document,
    content: NodeId,
    document_uri: Option<&Url>,
    options: &ReadabilityOptions,
) {
    let base_uri = base_uri(doc, document_uri);
    fix_relative_uris(doc, content, base_uri.as_ref(), document_uri);

    simplify_nested_elements(doc, content, options.debug);

    if !options.keep_classes {
        clean_classes(doc, content, options);
    }
}

/// The document's base URI: `<base href>` resolved against the document URI,
/// or the document URI itself.
pub fn base_uri(doc: &Document, document_uri: Option<&Url>) -> Option<Url> {
    let href = doc
        .elements_by_tag(doc.root(), &["base"])
        .into_iter()
        .find_map(|base| doc.attr(base, "href"));

    match (href, document_uri) {
        (Some(href), Some(document_uri)) => document_uri.join(href).ok(),
        (Some(href), None) => Url::parse(href).ok(),
        (None, document_uri) => document_uri.cloned(),
    }
}

fn to_absolute_uri(uri: &str, base_uri: Option<&Url>, document_uri: Option<&Url>) -> String {
    let Some(base) = base_uri else {
        return uri.to_string();
    };

    // Hash links stay relative when they point into this very document.
    if document_uri == Some(base) && uri.starts_with('#') {
        return uri.to_string();
    }

    base.join(uri)
        .map(String::from)
        .unwrap_or_else(|_| uri.to_string())
}

/// Convert every link and media URI under `root` to an absolute URI.
///
/// `javascript:` links are replaced by their content, since scripts are gone.
pub fn fix_relative_uris(
    doc: &mut Document,
    root: NodeId,
    base_uri: Option<&Url>,
    document_uri: Option<&Url>,
) {
    for link in doc.elements_by_tag(root, &["a"]) {
        let Some(href) = doc.attr(link, "href").filter(|href| !href.is_empty()) else {
            continue;
        };

        if href.starts_with("javascript:") {
            let children = doc.children(link);
            let replacement = if children.len() == 1 && doc.is_text(children[0]) {
                let text = doc.text_content(link);
                doc.create_text(&text)
            } else {
                let container = doc.create_element("span");
                doc.move_children(link, container);
                container
            };
            doc.replace(link, replacement);
        } else {
            let absolute = to_absolute_uri(href, base_uri, document_uri);
            doc.set_attr(link, "href", &absolute);
        }
    }

    for media in doc.elements_by_tag(root, MEDIA_TAGS) {
        for name in ["src", "poster"] {
            if let Some(value) = doc.attr(media, name).filter(|value| !value.is_empty()) {
                let absolute = to_absolute_uri(value, base_uri, document_uri);
                doc.set_attr(media, name, &absolute);
            }
        }

        if let Some(srcset) = doc.attr(media, "srcset").filter(|value| !value.is_empty()) {
            let absolute = REGEXPS
                .srcset_url
                .replace_all(srcset, |caps: &Captures| {
                    format!(
                        "{}{}{}",
                        to_absolute_uri(&caps[1], base_uri, document_uri),
                        caps.get(2).map_or("", |m| m.as_str()),
                        &caps[3]
                    )
                })
                .into_owned();
            doc.set_attr(media, "srcset", &absolute);
        }
    }
}

/// Remove empty `div`/`section` wrappers and collapse wrappers around a
/// single `div`/`section`, moving their attributes onto the child.
///
/// Elements with an id starting with `readability` are left in place.
pub fn simplify_nested_elements(doc: &mut Document, root: NodeId, debug: bool) {
    let mut node = Some(root);

    while let Some(current) = node {
        let is_wrapper = doc.parent(current).is_some()
            && matches!(doc.tag_name(current), Some("div" | "section"))
            && !doc.id_attr(current).starts_with("readability");

        if is_wrapper {
            if is_element_without_content(doc, current) {
                node = remove_and_get_next(doc, current);
                continue;
            }

            if has_single_tag_inside_element(doc, current, "div")
                || has_single_tag_inside_element(doc, current, "section")
            {
                if let Some(child) = doc.first_element_child(current) {
                    for attr in doc.attrs(current).to_vec() {
                        if !doc.try_set_attr(child, &attr.name, &attr.value) && debug {
                            tracing::debug!(
                                "Reader: (Readability) skipping attribute {:?} while simplifying",
                                attr.name
                            );
                        }
                    }
                    doc.replace(current, child);
                    node = Some(child);
                    continue;
                }
            }
        }

        node = get_next_node(doc, current, false);
    }
}

/// Strip `class` attributes under (and including) `node`, keeping preserved
/// classes.
pub fn clean_classes(doc: &mut Document, node: NodeId, options: &ReadabilityOptions) {
    let elements: Vec<NodeId> = std::iter::once(node)
        .chain(doc.descendants(node))
        .filter(|&element| doc.is_element(element))
        .collect();

    for element in elements {
        let class_name = doc
            .class_name(element)
            .split_whitespace()
            .filter(|class| options.preserves_class(class))
            .collect::<Vec<_>>()
            .join(" ");

        if class_name.is_empty() {
            doc.remove_attr(element, "class");
        } else {
            doc.set_attr(element, "class", &class_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessor;

    fn content_of(html: &str) -> (Document, NodeId) {
        let mut doc = Document::parse(html);
        let content = doc.create_element("div");
        let body = doc.body().unwrap();
        doc.move_children(body, content);
        (doc, content)
    }

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn test_fix_relative_uris() {
        let (mut doc, content) = content_of(
            r##"<a href="/about">About</a><a href="#notes">Notes</a>
                <img src="img/a.png" srcset="img/a.png 1x, img/b.png 2x">
                <video poster="poster.jpg"><source src="clip.mp4"></video>"##,
        );
        let page = url("https://example.com/news/story.html");
        fix_relative_uris(&mut doc, content, Some(&page), Some(&page));
        let html = doc.inner_html(content);

        assert!(html.contains(r#"href="https://example.com/about""#));
        assert!(html.contains(r##"href="#notes""##));
        assert!(html.contains(r#"src="https://example.com/news/img/a.png""#));
        assert!(html.contains(
            r#"srcset="https://example.com/news/img/a.png 1x, https://example.com/news/img/b.png 2x""#
        ));
        assert!(html.contains(r#"poster="https://example.com/news/poster.jpg""#));
        assert!(html.contains(r#"src="https://example.com/news/clip.mp4""#));
    }

    #[test]
    fn test_hash_links_resolved_against_other_base() {
        let (mut doc, content) = content_of(
            r##"<html><head><base href="https://cdn.example.org/"></head><body><a href="#top">Top</a></body></html>"##,
        );
        let page = url("https://example.com/story");
        let base = base_uri(&doc, Some(&page));
        assert_eq!(base, Some(url("https://cdn.example.org/")));

        fix_relative_uris(&mut doc, content, base.as_ref(), Some(&page));
        assert!(doc
            .inner_html(content)
            .contains(r#"href="https://cdn.example.org/#top""#));
    }

    #[test]
    fn test_relative_uris_untouched_without_base() {
        let (mut doc, content) = content_of(r#"<a href="/about">About</a>"#);
        let base = base_uri(&doc, None);
        fix_relative_uris(&mut doc, content, base.as_ref(), None);
        assert_eq!(doc.inner_html(content), r#"<a href="/about">About</a>"#);
    }

    #[test]
    fn test_javascript_links_are_unwrapped() {
        let (mut doc, content) = content_of(
            r#"<p><a href="javascript:void(0)">Plain</a> and <a href="javascript:go()"><b>Bold</b> text</a></p>"#,
        );
        fix_relative_uris(&mut doc, content, None, None);
        assert_eq!(
            doc.inner_html(content),
            "<p>Plain and <span><b>Bold</b> text</span></p>"
        );
    }

    #[test]
    fn test_simplify_nested_elements() {
        let (mut doc, content) = content_of(
            r#"<div id="readability-page-1" class="page"><div class="outer" data-x="1"><section id="inner"><p>Text</p></section></div><div> </div></div>"#,
        );
        simplify_nested_elements(&mut doc, content, false);
        assert_eq!(
            doc.inner_html(content),
            r#"<div id="readability-page-1" class="page"><section id="inner" class="outer" data-x="1"><p>Text</p></section></div>"#
        );
    }

    #[test]
    fn test_clean_classes() {
        let (mut doc, content) = content_of(
            r#"<div class="page extra"><p class="lead keep">Text</p><span class="x">y</span></div>"#,
        );
        let options = ReadabilityOptions::builder()
            .classes_to_preserve(vec!["keep".to_string()])
            .build();
        clean_classes(&mut doc, content, &options);
        assert_eq!(
            doc.inner_html(content),
            r#"<div class="page"><p class="keep">Text</p><span>y</span></div>"#
        );
    }

    #[test]
    fn test_clean_classes_on_deep_nesting() {
        let depth = 5000;
        let (mut doc, content) = content_of(&format!(
            "{}x{}",
            "<span class='a'>".repeat(depth),
            "</span>".repeat(depth)
        ));
        clean_classes(&mut doc, content, &ReadabilityOptions::default());
        assert!(doc.elements_by_tag(content, &["span"])
            .iter()
            .all(|&span| !doc.has_attr(span, "class")));
    }

    #[test]
    fn test_keep_classes_option() {
        let (mut doc, content) = content_of(r#"<p class="lead">Text</p>"#);
        let options = ReadabilityOptions::builder().keep_classes(true).build();
        post_process_content(&mut doc, content, None, &options);
        assert_eq!(doc.inner_html(content), r#"<p class="lead">Text</p>"#);
    }

    #[test]
    fn test_processed_markup_is_a_fixed_point() {
        let (mut doc, content) = content_of(
            r#"<div id="readability-page-1" class="page"><div class="wrap"><div><h2>Heading</h2>
               <p class="intro">See <a href="/more">more</a> &amp; <img src="a.png"></p></div></div>
               <section></section></div>"#,
        );
        let page = url("https://example.com/a/b");
        let options = ReadabilityOptions::default();
        post_process_content(&mut doc, content, Some(&page), &options);
        let first = doc.inner_html(content);

        let mut again = Document::parse(&format!("<html><body>{first}</body></html>"));
        preprocessor::prepare(&mut again);
        let body = again.body().unwrap();
        let content = again.create_element("div");
        again.move_children(body, content);
        post_process_content(&mut again, content, Some(&page), &options);

        assert_eq!(again.inner_html(content), first);
    }
}
