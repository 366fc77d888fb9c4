//! Core content extraction algorithm (_grabArticle implementation).
//!
//! One pass prepares the nodes of a pristine copy of the page, scores them,
//! picks the best container and gathers its related siblings. Passes that
//! yield too little text are retried with relaxed flags.

use crate::cleaner;
use crate::constants::{
    ParseFlags, ALTER_TO_DIV_EXCEPTIONS, ANCESTOR_TAG_DEPTH, CLASSES_TO_PRESERVE,
    DEFAULT_TAGS_TO_SCORE, FLAG_RELAXATION_ORDER, PAGE_WRAPPER_ID, REGEXPS,
    SHARED_ANCESTOR_MIN_CANDIDATES, SHARED_ANCESTOR_SCORE_RATIO, TITLE_SIMILARITY_THRESHOLD,
    UNLIKELY_ROLES,
};
use crate::dom::{Document, NodeId};
use crate::dom_utils::{
    get_inner_text, get_link_density, get_next_node, get_node_ancestors, has_ancestor_tag,
    has_child_block_element, has_single_tag_inside_element, is_element_without_content,
    is_phrasing_content, is_probably_visible, is_whitespace, remove_and_get_next,
};
use crate::options::ReadabilityOptions;
use crate::scoring::{self, ScoreMap};
use crate::utils::{char_len, text_similarity};
use std::fmt;

/// Content found by a successful extraction.
#[derive(Debug)]
pub struct Extraction {
    /// The pass document that owns `content`
    pub document: Document,
    /// Detached `div` holding the page wrapper
    pub content: NodeId,
    pub dir: Option<String>,
    /// Byline captured from the DOM while scoring
    pub byline: Option<String>,
}

/// Represents an extraction attempt
#[derive(Debug)]
struct Attempt {
    document: Document,
    content: NodeId,
    text_length: usize,
    dir: Option<String>,
}

/// Where the retry loop goes after a pass.
#[derive(Debug)]
enum RetryState {
    /// Run another pass with these flags
    Retry(ParseFlags),
    Done(Attempt),
    Failed,
}

/// Relaxes one flag per failed pass and remembers the failed attempts.
#[derive(Debug)]
struct RetryController {
    flags: ParseFlags,
    char_threshold: usize,
    attempts: Vec<Attempt>,
}

impl RetryController {
    fn new(char_threshold: usize) -> Self {
        Self {
            flags: ParseFlags::all(),
            char_threshold,
            attempts: Vec::new(),
        }
    }

    fn flags(&self) -> ParseFlags {
        self.flags
    }

    fn advance(&mut self, attempt: Attempt) -> RetryState {
        if attempt.text_length >= self.char_threshold {
            return RetryState::Done(attempt);
        }

        let next_flag = FLAG_RELAXATION_ORDER
            .iter()
            .copied()
            .find(|flag| self.flags.contains(*flag));

        if let Some(flag) = next_flag {
            self.flags.remove(flag);
            self.attempts.push(attempt);
            return RetryState::Retry(self.flags);
        }

        // Every flag is off: fall back to the longest text seen, earliest first.
        let mut best: Option<Attempt> = None;
        for candidate in self.attempts.drain(..).chain(std::iter::once(attempt)) {
            if best
                .as_ref()
                .map_or(true, |best| candidate.text_length > best.text_length)
            {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) if best.text_length > 0 => RetryState::Done(best),
            _ => RetryState::Failed,
        }
    }
}

/// Main content extraction algorithm with retry logic
///
/// Implements Mozilla's Readability algorithm with adaptive flag removal.
/// Every pass works on a fresh clone of `document`. If a pass yields fewer
/// than `char_threshold` characters, one flag is relaxed and the page is
/// scanned again; when no flag is left the longest attempt wins.
///
/// # Arguments
/// * `document` - The prepared document (scripts removed, `<br>` chains replaced)
/// * `options` - Parser options
/// * `article_title` - Title used to detect headings that repeat it
///
/// # Returns
/// `None` when the document has no body or no pass found any text
pub fn grab_article(
    document: &Document,
    options: &ReadabilityOptions,
    article_title: &str,
) -> Option<Extraction> {
    tracing::debug!("Reader: (Readability) **** grabArticle ****");

    if document.body().is_none() {
        tracing::debug!("Reader: (Readability) No body found in document. Abort.");
        return None;
    }

    let mut byline = None;
    let mut controller = RetryController::new(options.char_threshold);

    loop {
        let attempt = {
            let pass = Pass {
                doc: document.clone(),
                options,
                flags: controller.flags(),
                scores: ScoreMap::new(),
                article_title,
                byline: &mut byline,
            };
            pass.run()
        };

        match controller.advance(attempt) {
            RetryState::Retry(flags) => {
                tracing::debug!("Reader: (Readability) Retrying with flags {flags:?}");
            }
            RetryState::Done(attempt) => {
                return Some(Extraction {
                    document: attempt.document,
                    content: attempt.content,
                    dir: attempt.dir,
                    byline,
                });
            }
            RetryState::Failed => {
                tracing::debug!("Reader: (Readability) No content found after relaxing every flag");
                return None;
            }
        }
    }
}

/// State of a single extraction pass.
struct Pass<'a> {
    doc: Document,
    options: &'a ReadabilityOptions,
    flags: ParseFlags,
    scores: ScoreMap,
    article_title: &'a str,
    byline: &'a mut Option<String>,
}

impl Pass<'_> {
    fn log(&self, args: fmt::Arguments<'_>) {
        if self.options.debug {
            tracing::debug!("Reader: (Readability) {args}");
        }
    }

    fn run(mut self) -> Attempt {
        let Some(page) = self.doc.body() else {
            let content = self.doc.create_element("div");
            return Attempt {
                document: self.doc,
                content,
                text_length: 0,
                dir: None,
            };
        };

        let elements_to_score = self.prepare_nodes();
        let candidates = scoring::score_elements(
            &self.doc,
            &elements_to_score,
            self.flags,
            &mut self.scores,
        );
        let top_candidates = self.rank_candidates(&candidates);

        let (top_candidate, needed_to_create_top_candidate) =
            self.select_top_candidate(&top_candidates, page);
        let dir = self.article_direction(top_candidate);

        let content = self.aggregate_siblings(top_candidate);
        if self.options.debug {
            self.log(format_args!(
                "Article content pre-prep: {}",
                self.doc.inner_html(content)
            ));
        }

        cleaner::prep_article(&mut self.doc, content, self.flags, self.options);

        if needed_to_create_top_candidate {
            self.doc.set_attr(top_candidate, "id", PAGE_WRAPPER_ID);
            self.doc.set_attr(top_candidate, "class", CLASSES_TO_PRESERVE[0]);
        } else {
            let wrapper = self.doc.create_element("div");
            self.doc.set_attr(wrapper, "id", PAGE_WRAPPER_ID);
            self.doc.set_attr(wrapper, "class", CLASSES_TO_PRESERVE[0]);
            self.doc.move_children(content, wrapper);
            self.doc.append_child(content, wrapper);
        }

        let text_length = char_len(&get_inner_text(&self.doc, content, true));
        self.log(format_args!(
            "Pass with flags {:?} found {text_length} characters",
            self.flags
        ));

        Attempt {
            document: self.doc,
            content,
            text_length,
            dir,
        }
    }

    /// Walk the page once, removing junk and turning paragraph-like divs into
    /// `<p>`.
    ///
    /// # Returns
    /// The elements whose text should be scored
    fn prepare_nodes(&mut self) -> Vec<NodeId> {
        let strip_unlikely = self.flags.contains(ParseFlags::STRIP_UNLIKELYS);
        let mut elements_to_score = Vec::new();
        let mut should_remove_title_header = true;

        let mut node = self.doc.document_element();
        while let Some(current) = node {
            let match_string = format!(
                "{} {}",
                self.doc.class_name(current),
                self.doc.id_attr(current)
            );

            if !is_probably_visible(&self.doc, current) {
                self.log(format_args!("Removing hidden node - {match_string}"));
                node = remove_and_get_next(&mut self.doc, current);
                continue;
            }

            // Modal dialogs are never visible in the reading view.
            if self.doc.attr(current, "aria-modal") == Some("true")
                && self.doc.attr(current, "role") == Some("dialog")
            {
                node = remove_and_get_next(&mut self.doc, current);
                continue;
            }

            if self.check_byline(current, &match_string) {
                node = remove_and_get_next(&mut self.doc, current);
                continue;
            }

            if should_remove_title_header && self.header_duplicates_title(current) {
                self.log(format_args!(
                    "Removing header: {}",
                    self.doc.text_content(current).trim()
                ));
                should_remove_title_header = false;
                node = remove_and_get_next(&mut self.doc, current);
                continue;
            }

            if strip_unlikely {
                if self.is_unlikely_candidate(current, &match_string) {
                    self.log(format_args!("Removing unlikely candidate - {match_string}"));
                    node = remove_and_get_next(&mut self.doc, current);
                    continue;
                }

                if let Some(role) = self
                    .doc
                    .attr(current, "role")
                    .filter(|role| UNLIKELY_ROLES.contains(role))
                {
                    self.log(format_args!(
                        "Removing content with role {role} - {match_string}"
                    ));
                    node = remove_and_get_next(&mut self.doc, current);
                    continue;
                }
            }

            let tag = self.doc.tag_name(current).unwrap_or("");

            if matches!(
                tag,
                "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            ) && is_element_without_content(&self.doc, current)
            {
                node = remove_and_get_next(&mut self.doc, current);
                continue;
            }

            if DEFAULT_TAGS_TO_SCORE.contains(&tag) {
                elements_to_score.push(current);
            }

            let mut current = current;
            if tag == "div" {
                self.wrap_phrasing_children(current);

                if has_single_tag_inside_element(&self.doc, current, "p")
                    && get_link_density(&self.doc, current) < 0.25
                {
                    if let Some(paragraph) = self.doc.first_element_child(current) {
                        self.doc.replace(current, paragraph);
                        current = paragraph;
                        elements_to_score.push(current);
                    }
                } else if !has_child_block_element(&self.doc, current) {
                    self.doc.set_tag_name(current, "p");
                    elements_to_score.push(current);
                }
            }

            node = get_next_node(&self.doc, current, false);
        }

        elements_to_score
    }

    fn is_unlikely_candidate(&self, node: NodeId, match_string: &str) -> bool {
        REGEXPS.unlikely_candidates.is_match(match_string)
            && !REGEXPS.ok_maybe_its_a_candidate.is_match(match_string)
            && !has_ancestor_tag(&self.doc, node, "table", Some(ANCESTOR_TAG_DEPTH), |_| true)
            && !has_ancestor_tag(&self.doc, node, "code", Some(ANCESTOR_TAG_DEPTH), |_| true)
            && !self.doc.has_tag(node, "body")
            && !self.doc.has_tag(node, "a")
    }

    /// Capture the first valid byline of the extraction.
    ///
    /// # Returns
    /// Whether `node` is the byline and should be removed
    fn check_byline(&mut self, node: NodeId, match_string: &str) -> bool {
        if self.byline.is_some() {
            return false;
        }

        if scoring::is_valid_byline(&self.doc, node, match_string) {
            *self.byline = Some(self.doc.text_content(node).trim().to_string());
            return true;
        }

        false
    }

    /// An `<h1>`/`<h2>` whose text is nearly the article title.
    fn header_duplicates_title(&self, node: NodeId) -> bool {
        if !matches!(self.doc.tag_name(node), Some("h1" | "h2")) {
            return false;
        }
        let heading = get_inner_text(&self.doc, node, false);
        text_similarity(self.article_title, &heading) > TITLE_SIMILARITY_THRESHOLD
    }

    /// Put runs of phrasing content directly inside `div` into paragraphs.
    fn wrap_phrasing_children(&mut self, div: NodeId) {
        let mut paragraph: Option<NodeId> = None;

        for child in self.doc.children(div).to_vec() {
            if is_phrasing_content(&self.doc, child) {
                if let Some(p) = paragraph {
                    self.doc.append_child(p, child);
                } else if !is_whitespace(&self.doc, child) {
                    let p = self.doc.create_element("p");
                    self.doc.replace(child, p);
                    self.doc.append_child(p, child);
                    paragraph = Some(p);
                }
            } else if let Some(p) = paragraph.take() {
                while let Some(&last) = self.doc.children(p).last() {
                    if !is_whitespace(&self.doc, last) {
                        break;
                    }
                    self.doc.detach(last);
                }
            }
        }
    }

    /// Scale candidate scores by link density and keep the best few.
    ///
    /// # Returns
    /// Up to `nb_top_candidates` candidates, best first
    fn rank_candidates(&mut self, candidates: &[NodeId]) -> Vec<NodeId> {
        let limit = self.options.nb_top_candidates;
        let mut top_candidates: Vec<NodeId> = Vec::with_capacity(limit + 1);

        for &candidate in candidates {
            let raw_score = self.scores.get(&candidate).copied().unwrap_or(0.0);
            let score = raw_score * (1.0 - get_link_density(&self.doc, candidate));
            self.scores.insert(candidate, score);
            self.log(format_args!("Candidate {candidate:?} with score {score}"));

            let position = (0..limit).find(|&index| {
                top_candidates
                    .get(index)
                    .map_or(true, |other| score > self.scores[other])
            });
            if let Some(index) = position {
                top_candidates.insert(index, candidate);
                top_candidates.truncate(limit);
            }
        }

        top_candidates
    }

    /// Choose the element holding the article.
    ///
    /// # Returns
    /// The candidate, and whether it had to be synthesized from the whole page
    fn select_top_candidate(&mut self, top_candidates: &[NodeId], page: NodeId) -> (NodeId, bool) {
        let leader = top_candidates
            .first()
            .copied()
            .filter(|&candidate| !self.doc.has_tag(candidate, "body"));

        let Some(mut top_candidate) = leader else {
            let container = self.doc.create_element("div");
            self.log(format_args!("Moving every child of the page into a new container"));
            self.doc.move_children(page, container);
            self.doc.append_child(page, container);
            self.initialize(container);
            return (container, true);
        };

        top_candidate = self.promote_shared_top_candidate_parent(top_candidate, top_candidates);
        self.initialize(top_candidate);
        top_candidate = self.promote_high_scoring_parents(top_candidate);
        top_candidate = self.promote_single_child_parents(top_candidate);
        self.initialize(top_candidate);

        (top_candidate, false)
    }

    fn initialize(&mut self, node: NodeId) {
        if !self.scores.contains_key(&node) {
            let score = scoring::initialize_node_score(&self.doc, node, self.flags);
            self.scores.insert(node, score);
        }
    }

    fn score(&self, node: NodeId) -> f64 {
        self.scores.get(&node).copied().unwrap_or(0.0)
    }

    /// Parents of the candidate that are not the body.
    fn parent_below_body(&self, node: NodeId) -> Option<NodeId> {
        self.doc
            .parent(node)
            .filter(|&parent| self.doc.is_element(parent) && !self.doc.has_tag(parent, "body"))
    }

    /// Move up to an ancestor shared by several near-equal candidates.
    fn promote_shared_top_candidate_parent(
        &self,
        top_candidate: NodeId,
        top_candidates: &[NodeId],
    ) -> NodeId {
        let leader_score = self.score(top_candidate);
        let alternative_ancestors: Vec<Vec<NodeId>> = top_candidates
            .iter()
            .skip(1)
            .filter(|&&candidate| {
                self.score(candidate) / leader_score >= SHARED_ANCESTOR_SCORE_RATIO
            })
            .map(|&candidate| get_node_ancestors(&self.doc, candidate, 0))
            .collect();

        if alternative_ancestors.len() < SHARED_ANCESTOR_MIN_CANDIDATES {
            return top_candidate;
        }

        let mut parent = self.parent_below_body(top_candidate);
        while let Some(ancestor) = parent {
            let lists_containing_ancestor = alternative_ancestors
                .iter()
                .filter(|ancestors| ancestors.contains(&ancestor))
                .count();
            if lists_containing_ancestor >= SHARED_ANCESTOR_MIN_CANDIDATES {
                self.log(format_args!("Promoting shared ancestor {ancestor:?}"));
                return ancestor;
            }
            parent = self.parent_below_body(ancestor);
        }

        top_candidate
    }

    /// Climb while scored parents keep scoring above a third of the candidate,
    /// taking every parent that beats the one below it.
    fn promote_high_scoring_parents(&self, mut top_candidate: NodeId) -> NodeId {
        let mut last_score = self.score(top_candidate);
        let score_threshold = last_score / 3.0;

        let mut parent = self.parent_below_body(top_candidate);
        while let Some(ancestor) = parent {
            parent = self.parent_below_body(ancestor);

            let Some(&parent_score) = self.scores.get(&ancestor) else {
                continue;
            };
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top_candidate = ancestor;
            }
            last_score = parent_score;
        }

        top_candidate
    }

    /// Replace the candidate by its parent while it is an only child.
    fn promote_single_child_parents(&self, mut top_candidate: NodeId) -> NodeId {
        while let Some(parent) = self.parent_below_body(top_candidate) {
            if self.doc.element_children(parent).len() != 1 {
                break;
            }
            top_candidate = parent;
        }
        top_candidate
    }

    /// Text direction from the candidate's parent, the candidate, then the
    /// parent's ancestors.
    fn article_direction(&self, top_candidate: NodeId) -> Option<String> {
        let parent = self.doc.parent(top_candidate)?;
        [parent, top_candidate]
            .into_iter()
            .chain(self.doc.ancestors(parent))
            .filter(|&node| self.doc.is_element(node))
            .find_map(|node| {
                self.doc
                    .attr(node, "dir")
                    .filter(|dir| !dir.is_empty())
                    .map(str::to_string)
            })
    }

    /// Gather the candidate and its related siblings into a new container.
    ///
    /// # Returns
    /// A detached `div` holding the article content
    fn aggregate_siblings(&mut self, top_candidate: NodeId) -> NodeId {
        let content = self.doc.create_element("div");
        let top_score = self.score(top_candidate);
        let sibling_score_threshold = f64::max(10.0, top_score * 0.2);

        let Some(parent) = self.doc.parent(top_candidate) else {
            self.doc.append_child(content, top_candidate);
            return content;
        };
        let top_class = self.doc.class_name(top_candidate).to_string();

        for sibling in self.doc.element_children(parent) {
            let append = if sibling == top_candidate {
                true
            } else {
                let mut content_bonus = 0.0;
                if !top_class.is_empty() && self.doc.class_name(sibling) == top_class {
                    content_bonus += top_score * 0.2;
                }

                match self.scores.get(&sibling) {
                    Some(&score) if score + content_bonus >= sibling_score_threshold => true,
                    _ => {
                        self.doc.has_tag(sibling, "p")
                            && is_good_sibling_paragraph(&self.doc, sibling)
                    }
                }
            };

            if !append {
                continue;
            }

            self.log(format_args!("Appending node {sibling:?}"));
            let tag = self.doc.tag_name(sibling).unwrap_or("");
            if !ALTER_TO_DIV_EXCEPTIONS.contains(&tag) {
                self.log(format_args!("Altering sibling {sibling:?} to div"));
                self.doc.set_tag_name(sibling, "div");
            }
            self.doc.append_child(content, sibling);
        }

        content
    }
}

/// A `<p>` sibling is kept when it is long with few links, or short, link
/// free and ends a sentence.
fn is_good_sibling_paragraph(doc: &Document, node: NodeId) -> bool {
    let link_density = get_link_density(doc, node);
    let node_content = get_inner_text(doc, node, true);
    let node_length = char_len(&node_content);

    if node_length > 80 && link_density < 0.25 {
        return true;
    }

    node_length < 80 && node_length > 0 && link_density == 0.0 && has_sentence_boundary(&node_content)
}

fn has_sentence_boundary(text: &str) -> bool {
    REGEXPS.sentence_end.is_match(text)
}
