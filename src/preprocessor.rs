//! Document preparation run once before content extraction.

use crate::constants::REGEXPS;
use crate::dom::{Document, NodeId};
use crate::dom_utils::{is_phrasing_content, is_single_image, is_whitespace, skip_whitespace_siblings};

/// Prepare a document for scoring, after noscript images are unwrapped and
/// structured data has been read.
///
/// Removes scripts, styles and `<br>` chains, renames `<font>` to `<span>`
/// and upgrades lazily loaded images.
pub fn prepare(doc: &mut Document) {
    remove_scripts(doc);
    prep_document(doc);
    let root = doc.root();
    fix_lazy_images(doc, root);
}

/// Remove styles, replace `<br>` chains inside the body and rename fonts.
pub fn prep_document(doc: &mut Document) {
    let root = doc.root();
    for style in doc.elements_by_tag(root, &["style"]) {
        doc.detach(style);
    }

    if let Some(body) = doc.body() {
        replace_brs(doc, body);
    }

    for font in doc.elements_by_tag(root, &["font"]) {
        doc.set_tag_name(font, "span");
    }
}

/// Remove every `<script>` and `<noscript>`.
pub fn remove_scripts(doc: &mut Document) {
    let root = doc.root();
    for node in doc.elements_by_tag(root, &["script", "noscript"]) {
        doc.detach(node);
    }
}

/// Replace runs of two or more `<br>` with a `<p>` holding the phrasing
/// content that follows.
///
/// `foo<br>bar<br><br><br>abc` becomes `foo<br>bar<p>abc</p>`.
pub fn replace_brs(doc: &mut Document, root: NodeId) {
    for br in doc.elements_by_tag(root, &["br"]) {
        if doc.parent(br).is_none() {
            continue;
        }

        // Drop the rest of the chain, keeping the first <br> to be replaced.
        let mut replaced = false;
        let mut next = skip_whitespace_siblings(doc, doc.next_sibling(br));
        while let Some(node) = next {
            if !doc.has_tag(node, "br") {
                break;
            }
            replaced = true;
            let sibling = doc.next_sibling(node);
            doc.detach(node);
            next = skip_whitespace_siblings(doc, sibling);
        }

        if !replaced {
            continue;
        }

        let p = doc.create_element("p");
        doc.replace(br, p);

        let mut next = doc.next_sibling(p);
        while let Some(node) = next {
            if doc.has_tag(node, "br") {
                let after = skip_whitespace_siblings(doc, doc.next_sibling(node));
                if after.is_some_and(|n| doc.has_tag(n, "br")) {
                    break;
                }
            }

            if !is_phrasing_content(doc, node) {
                break;
            }

            let sibling = doc.next_sibling(node);
            doc.append_child(p, node);
            next = sibling;
        }

        while let Some(&last) = doc.children(p).last() {
            if !is_whitespace(doc, last) {
                break;
            }
            doc.detach(last);
        }

        if let Some(parent) = doc.parent(p) {
            if doc.has_tag(parent, "p") {
                doc.set_tag_name(parent, "div");
            }
        }
    }
}

/// Replace placeholder images with the real image found in the `<noscript>`
/// that follows them.
///
/// Images with no source and no image-like attribute are removed first so a
/// placeholder is never mistaken for content.
pub fn unwrap_noscript_images(doc: &mut Document) {
    let root = doc.root();

    for img in doc.elements_by_tag(root, &["img"]) {
        let has_source = doc.attrs(img).iter().any(|attr| {
            matches!(attr.name.as_str(), "src" | "srcset" | "data-src" | "data-srcset")
                || REGEXPS.image_extension.is_match(&attr.value)
        });
        if !has_source {
            doc.detach(img);
        }
    }

    for noscript in doc.elements_by_tag(root, &["noscript"]) {
        if doc.parent(noscript).is_none() {
            continue;
        }

        let markup = noscript_markup(doc, noscript);
        let holder = doc.import_fragment(&markup);
        if !is_single_image(doc, holder) {
            continue;
        }

        let Some(prev_element) = doc.previous_element_sibling(noscript) else {
            continue;
        };
        if !is_single_image(doc, prev_element) {
            continue;
        }

        let prev_img = if doc.has_tag(prev_element, "img") {
            Some(prev_element)
        } else {
            doc.elements_by_tag(prev_element, &["img"]).first().copied()
        };
        let new_img = doc.elements_by_tag(holder, &["img"]).first().copied();
        let (Some(prev_img), Some(new_img)) = (prev_img, new_img) else {
            continue;
        };

        for attr in doc.attrs(prev_img).to_vec() {
            if attr.value.is_empty() {
                continue;
            }

            let image_like = attr.name == "src"
                || attr.name == "srcset"
                || REGEXPS.image_extension.is_match(&attr.value);
            if !image_like || doc.attr(new_img, &attr.name) == Some(attr.value.as_str()) {
                continue;
            }

            let name = if doc.has_attr(new_img, &attr.name) {
                format!("data-old-{}", attr.name)
            } else {
                attr.name.clone()
            };
            if !doc.try_set_attr(new_img, &name, &attr.value) {
                tracing::debug!("Reader: (Readability) skipping attribute {name:?} on unwrapped image");
            }
        }

        if let Some(replacement) = doc.first_element_child(holder) {
            doc.replace(prev_element, replacement);
        }
    }
}

// The parser keeps noscript content as raw text when scripting is enabled.
fn noscript_markup(doc: &Document, noscript: NodeId) -> String {
    let children = doc.children(noscript);
    if children.iter().all(|&child| doc.is_text(child)) {
        children.iter().filter_map(|&child| doc.text(child)).collect()
    } else {
        doc.inner_html(noscript)
    }
}

/// Promote image URLs from lazy-loading attributes to `src`/`srcset`.
///
/// Tiny base64 placeholders are dropped first when another attribute already
/// points at an image file.
pub fn fix_lazy_images(doc: &mut Document, root: NodeId) {
    for elem in doc.elements_by_tag(root, &["img", "picture", "figure"]) {
        let is_img = doc.has_tag(elem, "img");

        if is_img {
            if let Some(src) = doc.attr(elem, "src").map(str::to_string) {
                if let Some(caps) = REGEXPS.b64_data_url.captures(&src) {
                    if &caps[1] == "image/svg+xml" {
                        continue;
                    }

                    let src_could_be_removed = doc
                        .attrs(elem)
                        .iter()
                        .any(|attr| attr.name != "src" && REGEXPS.image_extension.is_match(&attr.value));

                    if src_could_be_removed {
                        let b64_starts = src
                            .to_ascii_lowercase()
                            .find("base64")
                            .map_or(0, |pos| pos + 7);
                        if src.len().saturating_sub(b64_starts) < 133 {
                            doc.remove_attr(elem, "src");
                        }
                    }
                }
            }

            let has_src = doc.attr(elem, "src").is_some_and(|s| !s.is_empty());
            let has_srcset = doc
                .attr(elem, "srcset")
                .is_some_and(|s| !s.is_empty() && s != "null");
            if (has_src || has_srcset) && !doc.class_name(elem).to_lowercase().contains("lazy") {
                continue;
            }
        }

        for attr in doc.attrs(elem).to_vec() {
            if matches!(attr.name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }

            let copy_to = if REGEXPS.lazy_srcset.is_match(&attr.value) {
                "srcset"
            } else if REGEXPS.lazy_src.is_match(&attr.value) {
                "src"
            } else {
                continue;
            };

            match doc.tag_name(elem) {
                Some("img") | Some("picture") => doc.set_attr(elem, copy_to, &attr.value),
                Some("figure") if doc.elements_by_tag(elem, &["img", "picture"]).is_empty() => {
                    let img = doc.create_element("img");
                    doc.set_attr(img, copy_to, &attr.value);
                    doc.append_child(elem, img);
                }
                _ => {}
            }
        }
    }
}
