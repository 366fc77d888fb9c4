//! # readability-engine
//!
//! Heuristic extraction of the main article from an HTML page, modelled on
//! Mozilla's Readability.
//!
//! The engine parses the page into an in-memory tree, strips scripts and
//! presentational markup, scores block elements by how much they look like
//! prose, and keeps the best scoring subtree together with related siblings.
//! The result is cleaned once more and returned as an [`Article`] with its
//! title, byline, excerpt and the remaining metadata.
//!
//! ## Example
//!
//! ```
//! use readability_engine::{Readability, ReadabilityOptions};
//!
//! let html = r#"<html><head><title>My Article</title></head>
//!     <body><article><p>This is the article body, long enough to be kept.</p></article></body></html>"#;
//!
//! let options = ReadabilityOptions::builder().char_threshold(20).build();
//! let article = Readability::new(html, Some("https://example.com/article"), Some(options))
//!     .unwrap()
//!     .parse()
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(article.title, "My Article");
//! assert!(article.text_content.contains("article body"));
//! ```
//!
//! Each [`Readability`] works on its own copy of the document, so independent
//! parses can run on separate threads.

mod article;
mod cleaner;
mod constants;
mod content_extractor;
pub mod dom;
mod dom_utils;
mod error;
mod metadata;
mod options;
mod post_processor;
mod preprocessor;
mod readability;
mod scoring;
mod utils;

pub use article::Article;
pub use dom::{Document, NodeId};
pub use error::{ReadabilityError, Result};
pub use options::{ReadabilityOptions, ReadabilityOptionsBuilder, Serializer};
pub use readability::Readability;
