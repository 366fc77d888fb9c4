//! Configuration options for Readability.

use crate::constants::{
    DEFAULT_CHAR_THRESHOLD, DEFAULT_MAX_ELEMS_TO_PARSE, DEFAULT_N_TOP_CANDIDATES, REGEXPS,
};
use crate::dom::{Document, NodeId};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Renders the extracted content container into the `content` string of an
/// [`Article`](crate::Article).
pub type Serializer = Arc<dyn Fn(&Document, NodeId) -> String + Send + Sync>;

/// Options for configuring the Readability parser.
#[derive(Clone)]
pub struct ReadabilityOptions {
    /// Emit per-node diagnostics through `tracing`
    pub debug: bool,

    /// Maximum number of elements to parse (0 = no limit)
    pub max_elems_to_parse: usize,

    /// Number of top candidates to consider when selecting the article container
    pub nb_top_candidates: usize,

    /// Minimum number of characters an article must have
    pub char_threshold: usize,

    /// Classes kept when stripping classes from the output
    pub classes_to_preserve: Vec<String>,

    /// Keep every class attribute in the output
    pub keep_classes: bool,

    /// Skip JSON-LD metadata
    pub disable_json_ld: bool,

    /// Embeds whose attributes match this pattern are kept
    pub allowed_video_regex: Regex,

    /// Custom content serializer; defaults to the container's inner markup
    pub serializer: Option<Serializer>,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_elems_to_parse: DEFAULT_MAX_ELEMS_TO_PARSE,
            nb_top_candidates: DEFAULT_N_TOP_CANDIDATES,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            classes_to_preserve: Vec::new(),
            keep_classes: false,
            disable_json_ld: false,
            allowed_video_regex: REGEXPS.videos.clone(),
            serializer: None,
        }
    }
}

impl fmt::Debug for ReadabilityOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadabilityOptions")
            .field("debug", &self.debug)
            .field("max_elems_to_parse", &self.max_elems_to_parse)
            .field("nb_top_candidates", &self.nb_top_candidates)
            .field("char_threshold", &self.char_threshold)
            .field("classes_to_preserve", &self.classes_to_preserve)
            .field("keep_classes", &self.keep_classes)
            .field("disable_json_ld", &self.disable_json_ld)
            .field("allowed_video_regex", &self.allowed_video_regex.as_str())
            .field("serializer", &self.serializer.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ReadabilityOptions {
    /// Create a new options builder
    pub fn builder() -> ReadabilityOptionsBuilder {
        ReadabilityOptionsBuilder::default()
    }

    /// Whether `class` survives class stripping.
    pub(crate) fn preserves_class(&self, class: &str) -> bool {
        crate::constants::CLASSES_TO_PRESERVE.contains(&class)
            || self.classes_to_preserve.iter().any(|c| c == class)
    }
}

/// Builder for ReadabilityOptions
#[derive(Debug, Default)]
pub struct ReadabilityOptionsBuilder {
    options: ReadabilityOptions,
}

impl ReadabilityOptionsBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    pub fn max_elems_to_parse(mut self, max: usize) -> Self {
        self.options.max_elems_to_parse = max;
        self
    }

    pub fn nb_top_candidates(mut self, n: usize) -> Self {
        self.options.nb_top_candidates = n;
        self
    }

    pub fn char_threshold(mut self, threshold: usize) -> Self {
        self.options.char_threshold = threshold;
        self
    }

    pub fn classes_to_preserve(mut self, classes: Vec<String>) -> Self {
        self.options.classes_to_preserve = classes;
        self
    }

    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.options.keep_classes = keep;
        self
    }

    pub fn disable_json_ld(mut self, disable: bool) -> Self {
        self.options.disable_json_ld = disable;
        self
    }

    pub fn allowed_video_regex(mut self, regex: Regex) -> Self {
        self.options.allowed_video_regex = regex;
        self
    }

    /// Use `serializer` to render the extracted content.
    pub fn serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Document, NodeId) -> String + Send + Sync + 'static,
    {
        self.options.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn build(self) -> ReadabilityOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReadabilityOptions::default();
        assert_eq!(options.nb_top_candidates, 5);
        assert_eq!(options.char_threshold, 500);
        assert_eq!(options.max_elems_to_parse, 0);
        assert!(!options.keep_classes);
        assert!(options.serializer.is_none());
    }

    #[test]
    fn test_builder() {
        let options = ReadabilityOptions::builder()
            .char_threshold(100)
            .nb_top_candidates(3)
            .classes_to_preserve(vec!["keep".to_string()])
            .debug(true)
            .build();
        assert_eq!(options.char_threshold, 100);
        assert_eq!(options.nb_top_candidates, 3);
        assert!(options.debug);
        assert!(options.preserves_class("keep"));
        assert!(options.preserves_class("page"));
        assert!(!options.preserves_class("other"));
    }

    #[test]
    fn test_default_video_pattern() {
        let options = ReadabilityOptions::default();
        assert!(options
            .allowed_video_regex
            .is_match("https://www.youtube.com/embed/abc"));
        assert!(!options.allowed_video_regex.is_match("https://ads.example.com/x"));
    }
}
