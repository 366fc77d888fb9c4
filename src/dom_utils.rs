//! DOM measurement and traversal utilities.

use crate::constants::{DIV_TO_P_ELEMS, PHRASING_ELEMS, REGEXPS};
use crate::dom::{Document, NodeId};
use crate::utils::{char_len, normalize_whitespace};

const MAX_ROWSPAN: usize = 65534;
const MAX_COLSPAN: usize = 1000;

/// Get inner text of a node.
/// This also strips out any excess whitespace to be found.
///
/// # Arguments
/// * `doc` - The owning document
/// * `node` - The node to extract text from
/// * `normalize_spaces` - Whether to collapse whitespace runs into one space
pub fn get_inner_text(doc: &Document, node: NodeId, normalize_spaces: bool) -> String {
    let text = doc.text_content(node);
    let trimmed = text.trim();

    if normalize_spaces {
        normalize_whitespace(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Number of commas (any script) in the normalized inner text.
pub fn get_comma_count(doc: &Document, node: NodeId) -> usize {
    REGEXPS
        .commas
        .find_iter(&get_inner_text(doc, node, true))
        .count()
}

/// Get the density of links as a percentage of the content.
/// This is the amount of text that is inside a link divided by the total text in the node.
/// Links to in-page fragments only count for 30% of their text.
///
/// # Returns
/// The link density as a float between 0.0 and 1.0
pub fn get_link_density(doc: &Document, node: NodeId) -> f64 {
    let text_length = char_len(&get_inner_text(doc, node, true));
    if text_length == 0 {
        return 0.0;
    }

    let mut link_length = 0.0;

    for link in doc.elements_by_tag(node, &["a"]) {
        let coefficient = match doc.attr(link, "href") {
            Some(href) if REGEXPS.hash_url.is_match(href) => 0.3,
            _ => 1.0,
        };
        link_length += char_len(&get_inner_text(doc, link, true)) as f64 * coefficient;
    }

    link_length / text_length as f64
}

/// Share of a node's text that sits inside descendants with one of `tags`.
pub fn get_text_density(doc: &Document, node: NodeId, tags: &[&str]) -> f64 {
    let text_length = char_len(&get_inner_text(doc, node, true));
    if text_length == 0 {
        return 0.0;
    }

    let children_length: usize = doc
        .elements_by_tag(node, tags)
        .into_iter()
        .map(|child| char_len(&get_inner_text(doc, child, true)))
        .sum();

    children_length as f64 / text_length as f64
}

/// Check if a node is phrasing content (text or an inline element).
///
/// `a`, `del` and `ins` only count when all of their children are phrasing.
pub fn is_phrasing_content(doc: &Document, node: NodeId) -> bool {
    let mut stack = vec![node];

    while let Some(node) = stack.pop() {
        if doc.is_text(node) {
            continue;
        }

        let Some(tag) = doc.tag_name(node) else {
            return false;
        };

        if PHRASING_ELEMS.contains(&tag) {
            continue;
        }

        if matches!(tag, "a" | "del" | "ins") {
            stack.extend_from_slice(doc.children(node));
            continue;
        }

        return false;
    }

    true
}

/// A whitespace-only text node or a `<br>`.
pub fn is_whitespace(doc: &Document, node: NodeId) -> bool {
    match doc.text(node) {
        Some(text) => text.trim().is_empty(),
        None => doc.has_tag(node, "br"),
    }
}

/// Check if an element is probably visible to the reader.
///
/// Looks at inline `display`/`visibility` styles, the `hidden` attribute and
/// `aria-hidden="true"`. Wikimedia math fallback images stay visible.
pub fn is_probably_visible(doc: &Document, node: NodeId) -> bool {
    if let Some(style) = doc.attr(node, "style") {
        for declaration in style.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            if property == "display" && value.starts_with("none") {
                return false;
            }
            if property == "visibility" && value.starts_with("hidden") {
                return false;
            }
        }
    }

    if doc.has_attr(node, "hidden") {
        return false;
    }

    if doc.attr(node, "aria-hidden") == Some("true")
        && !doc.class_name(node).contains("fallback-image")
    {
        return false;
    }

    true
}

/// Collect ancestors of a node, nearest first.
///
/// # Arguments
/// * `max_depth` - Stop after this many levels (0 means no limit)
pub fn get_node_ancestors(doc: &Document, node: NodeId, max_depth: usize) -> Vec<NodeId> {
    doc.ancestors(node)
        .take(if max_depth == 0 { usize::MAX } else { max_depth })
        .collect()
}

/// Whether some ancestor has tag `tag` (and passes `filter`).
///
/// # Arguments
/// * `max_depth` - Levels to look up; `None` searches to the root
pub fn has_ancestor_tag<F>(
    doc: &Document,
    node: NodeId,
    tag: &str,
    max_depth: Option<usize>,
    filter: F,
) -> bool
where
    F: Fn(NodeId) -> bool,
{
    doc.ancestors(node)
        .take(max_depth.unwrap_or(usize::MAX))
        .any(|ancestor| doc.has_tag(ancestor, tag) && filter(ancestor))
}

/// Check if the node has any block-level descendant.
pub fn has_child_block_element(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node).into_iter().any(|child| {
        doc.tag_name(child)
            .is_some_and(|tag| DIV_TO_P_ELEMS.contains(&tag))
    })
}

/// The element has exactly one element child, with tag `tag`, and no text
/// of its own.
pub fn has_single_tag_inside_element(doc: &Document, node: NodeId, tag: &str) -> bool {
    let elements = doc.element_children(node);
    if elements.len() != 1 || !doc.has_tag(elements[0], tag) {
        return false;
    }

    !doc.children(node).iter().any(|&child| {
        doc.text(child)
            .is_some_and(|text| REGEXPS.has_content.is_match(text))
    })
}

/// An element with no text whose only children (if any) are `<br>`/`<hr>`.
pub fn is_element_without_content(doc: &Document, node: NodeId) -> bool {
    if !doc.is_element(node) || !doc.text_content(node).trim().is_empty() {
        return false;
    }

    let children = doc.element_children(node).len();
    children == 0 || children == doc.elements_by_tag(node, &["br", "hr"]).len()
}

/// The node is an `<img>`, or wraps exactly one through a chain of
/// single-child elements without text.
pub fn is_single_image(doc: &Document, node: NodeId) -> bool {
    let mut current = node;
    loop {
        if doc.has_tag(current, "img") {
            return true;
        }
        let children = doc.element_children(current);
        if children.len() != 1 || !doc.text_content(current).trim().is_empty() {
            return false;
        }
        current = children[0];
    }
}

/// Depth-first traversal over elements.
///
/// # Arguments
/// * `ignore_self_and_kids` - Skip the subtree of `node`
pub fn get_next_node(doc: &Document, node: NodeId, ignore_self_and_kids: bool) -> Option<NodeId> {
    if !ignore_self_and_kids {
        if let Some(child) = doc.first_element_child(node) {
            return Some(child);
        }
    }

    if let Some(sibling) = doc.next_element_sibling(node) {
        return Some(sibling);
    }

    let mut current = doc.parent(node);
    while let Some(parent) = current {
        if let Some(sibling) = doc.next_element_sibling(parent) {
            return Some(sibling);
        }
        current = doc.parent(parent);
    }
    None
}

/// Detach `node` and return the next node in traversal order.
pub fn remove_and_get_next(doc: &mut Document, node: NodeId) -> Option<NodeId> {
    let next = get_next_node(doc, node, true);
    doc.detach(node);
    next
}

/// First node from `node` onwards (along siblings) that is an element or
/// non-whitespace text.
pub fn skip_whitespace_siblings(doc: &Document, node: Option<NodeId>) -> Option<NodeId> {
    let mut next = node;
    while let Some(current) = next {
        match doc.text(current) {
            Some(text) if REGEXPS.whitespace.is_match(text) => next = doc.next_sibling(current),
            _ => break,
        }
    }
    next
}

/// Remove every node in `nodes` for which `filter` returns true.
///
/// Nodes are visited last to first and already detached nodes are skipped.
pub fn remove_nodes<F>(doc: &mut Document, nodes: &[NodeId], mut filter: F)
where
    F: FnMut(&Document, NodeId) -> bool,
{
    for &node in nodes.iter().rev() {
        if doc.parent(node).is_some() && filter(doc, node) {
            doc.detach(node);
        }
    }
}

/// Count rows (honoring `rowspan`) and the widest row (honoring `colspan`).
///
/// Spans are clamped to the limits browsers apply.
pub fn get_row_and_column_count(doc: &Document, table: NodeId) -> (usize, usize) {
    let mut rows: usize = 0;
    let mut columns = 0;

    for tr in doc.elements_by_tag(table, &["tr"]) {
        rows = rows.saturating_add(parse_span(doc.attr(tr, "rowspan"), MAX_ROWSPAN));

        let columns_in_row = doc
            .elements_by_tag(tr, &["td"])
            .into_iter()
            .map(|cell| parse_span(doc.attr(cell, "colspan"), MAX_COLSPAN))
            .fold(0usize, usize::saturating_add);
        columns = columns.max(columns_in_row);
    }

    (rows, columns)
}

// Leading digits of a span attribute; missing, zero or garbage counts as 1.
fn parse_span(value: Option<&str>, max: usize) -> usize {
    let digits: String = value
        .unwrap_or("")
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return 1;
    }
    match digits.parse::<usize>() {
        Ok(0) => 1,
        Ok(n) => n.min(max),
        // Only overflow is left once the digits are non-empty.
        Err(_) => max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &Document, tag: &str) -> NodeId {
        doc.elements_by_tag(doc.root(), &[tag])[0]
    }

    #[test]
    fn test_get_inner_text() {
        let doc = Document::parse_fragment("<p>  Hello   world </p>");
        let p = first(&doc, "p");

        assert_eq!(get_inner_text(&doc, p, false), "Hello   world");
        assert_eq!(get_inner_text(&doc, p, true), "Hello world");
    }

    #[test]
    fn test_get_link_density() {
        let doc = Document::parse_fragment(
            r##"<div>0123456789<a href="/x">0123456789</a><a href="#top">0123456789</a></div>"##,
        );
        let div = first(&doc, "div");
        let density = get_link_density(&doc, div);
        assert!((density - (10.0 + 3.0) / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_link_density_of_empty_node() {
        let doc = Document::parse_fragment("<div></div>");
        assert_eq!(get_link_density(&doc, first(&doc, "div")), 0.0);
    }

    #[test]
    fn test_is_phrasing_content() {
        let doc = Document::parse_fragment(
            "<span>inline</span><div>block</div><a href='#'><b>x</b></a><a href='#'><div>y</div></a>",
        );
        let links = doc.elements_by_tag(doc.root(), &["a"]);

        assert!(is_phrasing_content(&doc, first(&doc, "span")));
        assert!(!is_phrasing_content(&doc, first(&doc, "div")));
        assert!(is_phrasing_content(&doc, links[0]));
        assert!(!is_phrasing_content(&doc, links[1]));
    }

    #[test]
    fn test_is_probably_visible() {
        let doc = Document::parse_fragment(
            r#"
            <div id="visible">Visible</div>
            <div id="display" style="color: red; display : none">Hidden</div>
            <div id="visibility" style="visibility:hidden">Hidden</div>
            <div id="attr" hidden>Hidden</div>
            <div id="aria" aria-hidden="true">Hidden</div>
            <div id="math" aria-hidden="true" class="mwe-math-fallback-image-inline">x</div>
        "#,
        );
        let visible: Vec<_> = doc
            .elements_by_tag(doc.root(), &["div"])
            .into_iter()
            .filter(|&d| is_probably_visible(&doc, d))
            .map(|d| doc.id_attr(d).to_string())
            .collect();
        assert_eq!(visible, vec!["visible", "math"]);
    }

    #[test]
    fn test_has_child_block_element() {
        let doc = Document::parse_fragment(
            "<div id='a'><span><p>x</p></span></div><div id='b'><span>x</span></div>",
        );
        let divs = doc.elements_by_tag(doc.root(), &["div"]);
        assert!(has_child_block_element(&doc, divs[0]));
        assert!(!has_child_block_element(&doc, divs[1]));
    }

    #[test]
    fn test_has_single_tag_inside_element() {
        let doc = Document::parse_fragment(
            "<div id='a'> <p>x</p> </div><div id='b'>text<p>x</p></div>",
        );
        let divs = doc.elements_by_tag(doc.root(), &["div"]);
        assert!(has_single_tag_inside_element(&doc, divs[0], "p"));
        assert!(!has_single_tag_inside_element(&doc, divs[1], "p"));
    }

    #[test]
    fn test_is_element_without_content() {
        let doc = Document::parse_fragment(
            "<div id='a'><br><hr></div><div id='b'> </div><div id='c'>x</div>",
        );
        let divs = doc.elements_by_tag(doc.root(), &["div"]);
        assert!(is_element_without_content(&doc, divs[0]));
        assert!(is_element_without_content(&doc, divs[1]));
        assert!(!is_element_without_content(&doc, divs[2]));
    }

    #[test]
    fn test_is_single_image() {
        let doc = Document::parse_fragment(
            "<div id='a'><span><img src='x.jpg'></span></div><div id='b'>cap<img src='y.jpg'></div>",
        );
        let divs = doc.elements_by_tag(doc.root(), &["div"]);
        assert!(is_single_image(&doc, divs[0]));
        assert!(!is_single_image(&doc, divs[1]));
    }

    #[test]
    fn test_has_ancestor_tag_depth() {
        let doc = Document::parse_fragment(
            "<table><tbody><tr><td><div><span><b>x</b></span></div></td></tr></tbody></table>",
        );
        let b = first(&doc, "b");
        assert!(!has_ancestor_tag(&doc, b, "table", Some(3), |_| true));
        assert!(has_ancestor_tag(&doc, b, "table", None, |_| true));
        assert!(has_ancestor_tag(&doc, b, "div", Some(3), |_| true));
    }

    #[test]
    fn test_get_next_node_walks_depth_first() {
        let doc = Document::parse_fragment("<div><p>a</p><p>b</p></div><section></section>");
        let div = first(&doc, "div");
        let ps = doc.elements_by_tag(div, &["p"]);
        assert_eq!(get_next_node(&doc, div, false), Some(ps[0]));
        assert_eq!(get_next_node(&doc, ps[0], false), Some(ps[1]));
        assert_eq!(get_next_node(&doc, ps[1], false), Some(first(&doc, "section")));
        assert_eq!(get_next_node(&doc, div, true), Some(first(&doc, "section")));
    }

    #[test]
    fn test_get_row_and_column_count() {
        let doc = Document::parse_fragment(
            "<table><tr><td colspan='3'>a</td><td>b</td></tr><tr rowspan='2'><td>c</td></tr></table>",
        );
        assert_eq!(get_row_and_column_count(&doc, first(&doc, "table")), (3, 4));
    }

    #[test]
    fn test_row_and_column_spans_are_clamped() {
        let huge = "18446744073709551615";
        let doc = Document::parse_fragment(&format!(
            "<table><tr rowspan='{huge}'><td colspan='{huge}'>a</td><td colspan='99999999999999999999999'>b</td></tr>\
             <tr rowspan='{huge}'><td>c</td></tr></table>"
        ));
        assert_eq!(
            get_row_and_column_count(&doc, first(&doc, "table")),
            (2 * MAX_ROWSPAN, 2 * MAX_COLSPAN)
        );
    }

    #[test]
    fn test_garbage_spans_count_as_one() {
        let doc = Document::parse_fragment(
            "<table><tr rowspan='0'><td colspan='x'>a</td><td colspan='2px'>b</td></tr></table>",
        );
        assert_eq!(get_row_and_column_count(&doc, first(&doc, "table")), (1, 3));
    }

    #[test]
    fn test_deeply_nested_phrasing_content() {
        let depth = 5000;
        let html = format!("{}text{}", "<del>".repeat(depth), "</del>".repeat(depth));
        let doc = Document::parse_fragment(&html);
        assert!(is_phrasing_content(&doc, first(&doc, "del")));
    }
}
