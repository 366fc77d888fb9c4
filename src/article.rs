//! The extracted article.

use serde::{Deserialize, Serialize};

/// Article extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Article title
    pub title: String,

    /// Author metadata
    pub byline: Option<String>,

    /// Text direction of the content (`ltr`, `rtl`, ...)
    pub dir: Option<String>,

    /// Content language
    pub lang: Option<String>,

    /// Cleaned article markup
    pub content: String,

    /// Text of the article with all markup removed
    pub text_content: String,

    /// Length of `text_content` in characters
    pub length: usize,

    /// Short description of the article
    pub excerpt: Option<String>,

    /// Name of the site
    pub site_name: Option<String>,

    /// Published time as written in the page's metadata
    pub published_time: Option<String>,
}
