//! The `Readability` parser: runs every stage of the pipeline on one document.

use crate::article::Article;
use crate::content_extractor::{self, Extraction};
use crate::dom::Document;
use crate::error::{ReadabilityError, Result};
use crate::metadata::{self, Metadata};
use crate::options::ReadabilityOptions;
use crate::utils::char_len;
use crate::{post_processor, preprocessor};
use url::Url;

/// Extracts the main article from an HTML document.
///
/// The parser owns a private copy of the document, so the caller's tree is
/// never modified.
///
/// # Example
/// ```
/// use readability_engine::Readability;
///
/// let html = "<html><head><title>Hello</title></head><body><p>World</p></body></html>";
/// let article = Readability::new(html, Some("https://example.com/"), None)
///     .unwrap()
///     .parse()
///     .unwrap();
/// assert!(article.is_some());
/// ```
#[derive(Debug)]
pub struct Readability {
    document: Document,
    url: Option<Url>,
    options: ReadabilityOptions,
}

impl Readability {
    /// Parse `html` and create a parser for it.
    ///
    /// # Arguments
    /// * `html` - The page markup
    /// * `url` - Absolute URL of the page, used to resolve relative links
    /// * `options` - Parser options (defaults when `None`)
    pub fn new(html: &str, url: Option<&str>, options: Option<ReadabilityOptions>) -> Result<Self> {
        Self::from_document(&Document::parse(html), url, options)
    }

    /// Create a parser for an already parsed document.
    pub fn from_document(
        document: &Document,
        url: Option<&str>,
        options: Option<ReadabilityOptions>,
    ) -> Result<Self> {
        let url = url
            .map(|url| {
                Url::parse(url).map_err(|err| ReadabilityError::InvalidUrl(format!("{url}: {err}")))
            })
            .transpose()?;

        Ok(Self {
            document: document.clone(),
            url,
            options: options.unwrap_or_default(),
        })
    }

    /// Run the extraction.
    ///
    /// # Returns
    /// `Ok(None)` when no article content could be found
    ///
    /// # Errors
    /// [`ReadabilityError::TooManyElements`] when the document exceeds
    /// `max_elems_to_parse`
    pub fn parse(self) -> Result<Option<Article>> {
        let Self {
            mut document,
            url,
            options,
        } = self;

        if options.max_elems_to_parse > 0 {
            let found = document.element_count();
            if found > options.max_elems_to_parse {
                return Err(ReadabilityError::TooManyElements {
                    found,
                    limit: options.max_elems_to_parse,
                });
            }
        }

        preprocessor::unwrap_noscript_images(&mut document);

        let json_ld = if options.disable_json_ld {
            Metadata::default()
        } else {
            metadata::get_json_ld(&document)
        };

        preprocessor::prepare(&mut document);

        let metadata = metadata::get_article_metadata(&document, json_ld);
        let title = metadata.title.clone().unwrap_or_default();

        let Some(Extraction {
            document: mut article_document,
            content,
            dir,
            byline,
        }) = content_extractor::grab_article(&document, &options, &title)
        else {
            tracing::debug!("Reader: (Readability) No article content found");
            return Ok(None);
        };

        if options.debug {
            tracing::debug!(
                "Reader: (Readability) Grabbed: {}",
                article_document.inner_html(content)
            );
        }

        post_processor::post_process_content(
            &mut article_document,
            content,
            url.as_ref(),
            &options,
        );

        // Without a description, the first paragraph stands in.
        let excerpt = metadata.excerpt.or_else(|| {
            article_document
                .elements_by_tag(content, &["p"])
                .first()
                .map(|&p| article_document.text_content(p).trim().to_string())
                .filter(|text| !text.is_empty())
        });

        let text_content = article_document.text_content(content);
        let content_html = match &options.serializer {
            Some(serializer) => serializer(&article_document, content),
            None => article_document.inner_html(content),
        };

        Ok(Some(Article {
            title,
            byline: metadata.byline.or(byline),
            dir,
            lang: metadata.lang,
            length: char_len(&text_content),
            content: content_html,
            text_content,
            excerpt,
            site_name: metadata.site_name,
            published_time: metadata.published_time,
        }))
    }
}
