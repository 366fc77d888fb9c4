//! Constants, regular expressions, and static data used throughout the library.

use once_cell::sync::Lazy;
use regex::Regex;

// Bitflags for parsing strategies
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParseFlags: u32 {
        const STRIP_UNLIKELYS = 0x1;
        const WEIGHT_CLASSES = 0x2;
        const CLEAN_CONDITIONALLY = 0x4;
    }
}

/// Flags are relaxed in this order when a pass yields too little text.
pub const FLAG_RELAXATION_ORDER: [ParseFlags; 3] = [
    ParseFlags::STRIP_UNLIKELYS,
    ParseFlags::WEIGHT_CLASSES,
    ParseFlags::CLEAN_CONDITIONALLY,
];

pub const DEFAULT_MAX_ELEMS_TO_PARSE: usize = 0;
pub const DEFAULT_N_TOP_CANDIDATES: usize = 5;
pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

/// Ancestors of the leading candidate are promoted once at least this many
/// close competitors share them.
pub const SHARED_ANCESTOR_MIN_CANDIDATES: usize = 3;
/// A competitor is close when its score is at least this fraction of the leader's.
pub const SHARED_ANCESTOR_SCORE_RATIO: f64 = 0.75;

/// Levels of ancestors that receive a share of a paragraph's score.
pub const SCORE_ANCESTOR_DEPTH: usize = 5;

/// Levels searched when looking for an enclosing table, code or figure.
pub const ANCESTOR_TAG_DEPTH: usize = 4;

/// Share-button containers are only removed below this text length.
pub const SHARE_ELEMENT_THRESHOLD: usize = 500;

/// Token similarity above which a heading is treated as a copy of the title.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Id given to the wrapper around extracted content.
pub const PAGE_WRAPPER_ID: &str = "readability-page-1";

// Classes that survive class stripping regardless of options
pub const CLASSES_TO_PRESERVE: &[&str] = &["page"];

// Element tags scored as paragraphs
pub const DEFAULT_TAGS_TO_SCORE: &[&str] = &["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

pub const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

// Regular expressions (compiled once)
pub static REGEXPS: Lazy<RegexPatterns> = Lazy::new(RegexPatterns::new);

pub struct RegexPatterns {
    pub unlikely_candidates: Regex,
    pub ok_maybe_its_a_candidate: Regex,
    pub positive: Regex,
    pub negative: Regex,
    pub byline: Regex,
    pub normalize: Regex,
    pub videos: Regex,
    pub share_elements: Regex,
    pub tokenize: Regex,
    pub whitespace: Regex,
    pub has_content: Regex,
    pub hash_url: Regex,
    pub srcset_url: Regex,
    pub b64_data_url: Regex,
    pub commas: Regex,
    pub json_ld_article_types: Regex,
    pub schema_org_context: Regex,
    pub image_extension: Regex,
    pub lazy_srcset: Regex,
    pub lazy_src: Regex,
    pub sentence_end: Regex,
    pub title_separator: Regex,
    pub title_separator_chars: Regex,
    pub cdata: Regex,
    pub meta_property: Regex,
    pub meta_name: Regex,
}

// Every pattern below is a literal that is known to compile.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid built-in pattern {pattern}: {err}"))
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            unlikely_candidates: compile(
                r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
            ),
            ok_maybe_its_a_candidate: compile(r"(?i)and|article|body|column|content|main|shadow"),
            positive: compile(
                r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story",
            ),
            negative: compile(
                r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
            ),
            byline: compile(r"(?i)byline|author|dateline|writtenby|p-author"),
            normalize: compile(r"\s{2,}"),
            videos: compile(
                r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)",
            ),
            share_elements: compile(r"(?i)(\b|_)(share|sharedaddy)(\b|_)"),
            tokenize: compile(r"\W+"),
            whitespace: compile(r"^\s*$"),
            has_content: compile(r"\S$"),
            hash_url: compile(r"^#.+"),
            srcset_url: compile(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))"),
            b64_data_url: compile(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,"),
            commas: compile(
                "[\u{002C}\u{060C}\u{FE50}\u{FE10}\u{FE11}\u{2E41}\u{2E34}\u{2E32}\u{FF0C}]",
            ),
            json_ld_article_types: compile(
                r"^Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference$",
            ),
            schema_org_context: compile(r"^https?://schema\.org/?$"),
            image_extension: compile(r"(?i)\.(jpg|jpeg|png|webp)"),
            lazy_srcset: compile(r"\.(jpg|jpeg|png|webp)\s+\d"),
            lazy_src: compile(r"^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$"),
            sentence_end: compile(r"\.( |$)"),
            title_separator: compile(r" [\|\-\\/>»] "),
            title_separator_chars: compile(r"[\|\-\\/>»]+"),
            cdata: compile(r"^\s*<!\[CDATA\[|\]\]>\s*$"),
            meta_property: compile(
                r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*",
            ),
            meta_name: compile(
                r"(?i)^\s*(?:(dc|dcterm|og|twitter|weibo:(article|webpage))\s*[\.:]\s*)?(author|creator|description|title|site_name)\s*$",
            ),
        }
    }
}

// Elements that keep a DIV from being turned into a P
pub const DIV_TO_P_ELEMS: &[&str] = &[
    "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul",
];

// Siblings with these tags keep their tag when appended to the article
pub const ALTER_TO_DIV_EXCEPTIONS: &[&str] = &["div", "article", "section", "p"];

pub const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

pub const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: &[&str] = &["table", "th", "td", "hr", "pre"];

// Phrasing (inline) elements
pub const PHRASING_ELEMS: &[&str] = &[
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn",
    "em", "embed", "i", "img", "input", "kbd", "label", "mark", "math", "meter", "noscript",
    "object", "output", "progress", "q", "ruby", "samp", "script", "select", "small", "span",
    "strong", "sub", "sup", "textarea", "time", "var", "wbr",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        Lazy::force(&REGEXPS);
    }

    #[test]
    fn test_unlikely_candidates() {
        assert!(REGEXPS.unlikely_candidates.is_match("sidebar"));
        assert!(REGEXPS.unlikely_candidates.is_match("comment-section"));
        assert!(!REGEXPS.unlikely_candidates.is_match("article-body"));
        assert!(REGEXPS.ok_maybe_its_a_candidate.is_match("main-sidebar"));
    }

    #[test]
    fn test_commas_cover_variants() {
        assert_eq!(REGEXPS.commas.find_iter("a, b，c،d").count(), 3);
    }

    #[test]
    fn test_share_elements() {
        assert!(REGEXPS.share_elements.is_match("post share"));
        assert!(REGEXPS.share_elements.is_match("sharedaddy"));
        assert!(!REGEXPS.share_elements.is_match("shares-count"));
    }

    #[test]
    fn test_title_separators() {
        assert!(REGEXPS.title_separator.is_match("Site | Title"));
        assert!(REGEXPS.title_separator.is_match("Site » Title"));
        assert!(!REGEXPS.title_separator.is_match("well-known"));
        assert_eq!(
            REGEXPS.title_separator_chars.replace_all("a | b - c", ""),
            "a  b  c"
        );
    }

    #[test]
    fn test_relaxation_order_covers_all_flags() {
        let all = FLAG_RELAXATION_ORDER
            .iter()
            .fold(ParseFlags::empty(), |acc, flag| acc | *flag);
        assert_eq!(all, ParseFlags::all());
    }
}
