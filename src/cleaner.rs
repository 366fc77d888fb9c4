//! Content cleaning applied to the extracted article container.

use crate::constants::{
    ParseFlags, ANCESTOR_TAG_DEPTH, DEPRECATED_SIZE_ATTRIBUTE_ELEMS, PRESENTATIONAL_ATTRIBUTES,
    REGEXPS, SHARE_ELEMENT_THRESHOLD,
};
use crate::dom::{Document, NodeId};
use crate::dom_utils::{
    get_comma_count, get_inner_text, get_link_density, get_next_node, get_row_and_column_count,
    get_text_density, has_ancestor_tag, has_single_tag_inside_element, is_phrasing_content,
    remove_and_get_next, remove_nodes, skip_whitespace_siblings,
};
use crate::options::ReadabilityOptions;
use crate::preprocessor::fix_lazy_images;
use crate::scoring::get_class_weight;
use crate::utils::char_len;
use regex::Regex;
use std::collections::HashSet;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Clean the article container for presentation.
///
/// Strips presentational attributes, removes junk elements, conditionally
/// removes low quality blocks and collapses trivial structure.
///
/// # Arguments
/// * `content` - The detached container built from the top candidate and its siblings
/// * `flags` - Flags of the current pass
pub fn prep_article(
    doc: &mut Document,
    content: NodeId,
    flags: ParseFlags,
    options: &ReadabilityOptions,
) {
    clean_styles(doc, content);

    // Tables are classified before anything is removed around them.
    let data_tables = mark_data_tables(doc, content);

    fix_lazy_images(doc, content);

    let cleaner = ConditionalCleaner {
        flags,
        data_tables: &data_tables,
        options,
    };

    cleaner.clean_conditionally(doc, content, "form");
    cleaner.clean_conditionally(doc, content, "fieldset");
    for tag in ["object", "embed", "footer", "link", "aside"] {
        clean(doc, content, tag, &options.allowed_video_regex);
    }

    // Small share widgets below the top level children; the children
    // themselves are never removed here.
    for child in doc.element_children(content) {
        clean_matched_nodes(doc, child, |doc, node, match_string| {
            REGEXPS.share_elements.is_match(match_string)
                && char_len(&doc.text_content(node)) < SHARE_ELEMENT_THRESHOLD
        });
    }

    for tag in ["iframe", "input", "textarea", "select", "button"] {
        clean(doc, content, tag, &options.allowed_video_regex);
    }

    cleaner.clean_conditionally(doc, content, "table");
    cleaner.clean_conditionally(doc, content, "ul");
    cleaner.clean_conditionally(doc, content, "div");

    for h1 in doc.elements_by_tag(content, &["h1"]) {
        doc.set_tag_name(h1, "h2");
    }

    remove_empty_paragraphs(doc, content);

    for br in doc.elements_by_tag(content, &["br"]) {
        let next = skip_whitespace_siblings(doc, doc.next_sibling(br));
        if next.is_some_and(|node| doc.has_tag(node, "p")) {
            doc.detach(br);
        }
    }

    collapse_single_cell_tables(doc, content);
    clean_headers(doc, content, flags, options.debug);
}

/// Remove presentational attributes from `node` and its descendants.
/// `<svg>` subtrees are left alone.
pub fn clean_styles(doc: &mut Document, node: NodeId) {
    let mut stack = vec![node];

    while let Some(node) = stack.pop() {
        if doc.has_tag(node, "svg") {
            continue;
        }

        for attribute in PRESENTATIONAL_ATTRIBUTES {
            doc.remove_attr(node, attribute);
        }

        if doc
            .tag_name(node)
            .is_some_and(|tag| DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(&tag))
        {
            doc.remove_attr(node, "width");
            doc.remove_attr(node, "height");
        }

        stack.extend(doc.element_children(node));
    }
}

/// Classify every table below `root` as data or layout.
///
/// # Returns
/// The tables that carry data
pub fn mark_data_tables(doc: &Document, root: NodeId) -> HashSet<NodeId> {
    doc.elements_by_tag(root, &["table"])
        .into_iter()
        .filter(|&table| is_data_table(doc, table))
        .collect()
}

fn is_data_table(doc: &Document, table: NodeId) -> bool {
    if doc.attr(table, "role") == Some("presentation") {
        return false;
    }
    if doc.attr(table, "datatable") == Some("0") {
        return false;
    }
    if doc.attr(table, "summary").is_some_and(|summary| !summary.is_empty()) {
        return true;
    }

    let caption = doc.elements_by_tag(table, &["caption"]).into_iter().next();
    if caption.is_some_and(|caption| !doc.children(caption).is_empty()) {
        return true;
    }

    if !doc
        .elements_by_tag(table, &["col", "colgroup", "tfoot", "thead", "th"])
        .is_empty()
    {
        return true;
    }

    // Nested tables indicate a layout table.
    if !doc.elements_by_tag(table, &["table"]).is_empty() {
        return false;
    }

    let (rows, columns) = get_row_and_column_count(doc, table);
    if rows >= 10 || columns > 4 {
        return true;
    }
    rows * columns > 10
}

/// An embed whose attributes (or, for `<object>`, inner markup) point at an
/// allowed video host.
fn is_allowed_video(doc: &Document, node: NodeId, allowed_video_regex: &Regex) -> bool {
    if doc
        .attrs(node)
        .iter()
        .any(|attr| allowed_video_regex.is_match(&attr.value))
    {
        return true;
    }

    doc.has_tag(node, "object") && allowed_video_regex.is_match(&doc.inner_html(node))
}

/// Remove every `tag` element below `root`. Embeds of allowed videos stay.
pub fn clean(doc: &mut Document, root: NodeId, tag: &str, allowed_video_regex: &Regex) {
    let is_embed = matches!(tag, "object" | "embed" | "iframe");
    let nodes = doc.elements_by_tag(root, &[tag]);

    remove_nodes(doc, &nodes, |doc, node| {
        !(is_embed && is_allowed_video(doc, node, allowed_video_regex))
    });
}

/// Remove descendants of `root` for which `filter` returns true. The filter
/// receives the class and id joined by a space.
fn clean_matched_nodes<F>(doc: &mut Document, root: NodeId, filter: F)
where
    F: Fn(&Document, NodeId, &str) -> bool,
{
    let end_of_search = get_next_node(doc, root, true);
    let mut next = get_next_node(doc, root, false);

    while let Some(node) = next {
        if Some(node) == end_of_search {
            break;
        }

        let match_string = format!("{} {}", doc.class_name(node), doc.id_attr(node));
        next = if filter(doc, node, &match_string) {
            remove_and_get_next(doc, node)
        } else {
            get_next_node(doc, node, false)
        };
    }
}

/// Conditional removal of suspicious blocks ("fishy" content).
struct ConditionalCleaner<'a> {
    flags: ParseFlags,
    data_tables: &'a HashSet<NodeId>,
    options: &'a ReadabilityOptions,
}

impl ConditionalCleaner<'_> {
    /// Remove `tag` elements below `root` that look like boilerplate. Does
    /// nothing unless `CLEAN_CONDITIONALLY` is active.
    fn clean_conditionally(&self, doc: &mut Document, root: NodeId, tag: &str) {
        if !self.flags.contains(ParseFlags::CLEAN_CONDITIONALLY) {
            return;
        }

        let nodes = doc.elements_by_tag(root, &[tag]);
        remove_nodes(doc, &nodes, |doc, node| self.should_remove(doc, node, tag));
    }

    fn should_remove(&self, doc: &Document, node: NodeId, tag: &str) -> bool {
        let inner_text = get_inner_text(doc, node, true);
        let content_length = char_len(&inner_text);

        let mut is_list = matches!(tag, "ul" | "ol");
        if !is_list {
            let list_length: usize = doc
                .elements_by_tag(node, &["ul", "ol"])
                .into_iter()
                .map(|list| char_len(&get_inner_text(doc, list, true)))
                .sum();
            is_list = content_length > 0 && list_length as f64 / content_length as f64 > 0.9;
        }

        if tag == "table" && self.data_tables.contains(&node) {
            return false;
        }

        if has_ancestor_tag(doc, node, "table", None, |table| {
            self.data_tables.contains(&table)
        }) {
            return false;
        }

        if has_ancestor_tag(doc, node, "code", Some(ANCESTOR_TAG_DEPTH), |_| true) {
            return false;
        }

        let weight = get_class_weight(doc, node, self.flags);
        if self.options.debug {
            tracing::debug!("Reader: (Readability) Cleaning conditionally {tag} with weight {weight}");
        }

        if weight < 0 {
            return true;
        }

        if get_comma_count(doc, node) >= 10 {
            return false;
        }

        let count = |tag: &str| doc.elements_by_tag(node, &[tag]).len();
        let p = count("p");
        let img = count("img");
        let li = count("li") as i64 - 100;
        let input = count("input");
        let heading_density = get_text_density(doc, node, HEADING_TAGS);

        let mut embed_count = 0;
        for embed in doc.elements_by_tag(node, &["object", "embed", "iframe"]) {
            if is_allowed_video(doc, embed, &self.options.allowed_video_regex) {
                return false;
            }
            embed_count += 1;
        }

        let link_density = get_link_density(doc, node);
        let is_figure_child =
            has_ancestor_tag(doc, node, "figure", Some(ANCESTOR_TAG_DEPTH), |_| true);

        let have_to_remove = (img > 1 && (p as f64 / img as f64) < 0.5 && !is_figure_child)
            || (!is_list && li > p as i64)
            || (input > p / 3)
            || (!is_list
                && heading_density < 0.9
                && content_length < 25
                && (img == 0 || img > 2)
                && !is_figure_child)
            || (!is_list && weight < 25 && link_density > 0.2)
            || (weight >= 25 && link_density > 0.5)
            || (embed_count == 1 && content_length < 75)
            || embed_count > 1;

        // Simple image galleries stay.
        if is_list && have_to_remove {
            let has_complex_item = doc
                .element_children(node)
                .into_iter()
                .any(|item| doc.element_children(item).len() > 1);
            if has_complex_item {
                return true;
            }
            if img == count("li") {
                return false;
            }
        }

        have_to_remove
    }
}

/// Drop paragraphs without text or embedded media.
fn remove_empty_paragraphs(doc: &mut Document, root: NodeId) {
    let paragraphs = doc.elements_by_tag(root, &["p"]);
    remove_nodes(doc, &paragraphs, |doc, paragraph| {
        doc.elements_by_tag(paragraph, &["img", "embed", "object", "iframe"])
            .is_empty()
            && get_inner_text(doc, paragraph, false).is_empty()
    });
}

/// Replace tables with a single cell by that cell, retagged as `<p>` when it
/// only holds phrasing content and as `<div>` otherwise.
fn collapse_single_cell_tables(doc: &mut Document, root: NodeId) {
    for table in doc.elements_by_tag(root, &["table"]) {
        let tbody = if has_single_tag_inside_element(doc, table, "tbody") {
            doc.first_element_child(table)
        } else {
            Some(table)
        };
        let Some(tbody) = tbody else { continue };
        if !has_single_tag_inside_element(doc, tbody, "tr") {
            continue;
        }
        let Some(row) = doc.first_element_child(tbody) else { continue };
        if !has_single_tag_inside_element(doc, row, "td") {
            continue;
        }
        let Some(cell) = doc.first_element_child(row) else { continue };

        let phrasing = doc
            .children(cell)
            .iter()
            .all(|&child| is_phrasing_content(doc, child));
        doc.set_tag_name(cell, if phrasing { "p" } else { "div" });
        doc.replace(table, cell);
    }
}

/// Remove `<h1>`/`<h2>` with a negative class weight.
fn clean_headers(doc: &mut Document, root: NodeId, flags: ParseFlags, debug: bool) {
    let headings = doc.elements_by_tag(root, &["h1", "h2"]);
    remove_nodes(doc, &headings, |doc, heading| {
        let remove = get_class_weight(doc, heading, flags) < 0;
        if remove && debug {
            tracing::debug!(
                "Reader: (Readability) Removing header with low class weight: {}",
                doc.text_content(heading).trim()
            );
        }
        remove
    });
}
