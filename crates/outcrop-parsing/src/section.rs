use once_cell::sync::Lazy;
use regex::Regex;

/// Headings that open the back matter of a paper.
pub const ENDING_KEYWORDS: &[&str] = &[
    "acknowledgments",
    "author contribution",
    "declarations",
    "references",
];

/// Base of the logarithm that sizes the trailing window of checked pages.
const THRESHOLD_LOG_BASE: f64 = 1.9;

/// First page index (0-based) that is checked for back-matter headings.
///
/// Pages before `floor(n - log_1.9(n))` are read in full. The checked tail
/// grows logarithmically, so long documents get a larger untouched prefix.
///
/// ```
/// assert_eq!(outcrop_parsing::section::ending_page_threshold(20), 15);
/// ```
pub fn ending_page_threshold(total_pages: usize) -> usize {
    if total_pages == 0 {
        return 0;
    }
    let n = total_pages as f64;
    (n - n.ln() / THRESHOLD_LOG_BASE.ln()).floor().max(0.0) as usize
}

/// Matches back-matter headings anywhere in a page's text.
#[derive(Debug, Clone)]
pub struct EndingMatcher {
    re: Option<Regex>,
}

impl Default for EndingMatcher {
    fn default() -> Self {
        static DEFAULT: Lazy<EndingMatcher> = Lazy::new(|| {
            let keywords: Vec<String> = ENDING_KEYWORDS.iter().map(|k| k.to_string()).collect();
            EndingMatcher::new(&keywords)
        });
        DEFAULT.clone()
    }
}

impl EndingMatcher {
    /// Build a case-insensitive, word-bounded matcher for `keywords`.
    /// An empty list never matches.
    pub fn new(keywords: &[String]) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k))
            .collect();
        if alternatives.is_empty() {
            return Self { re: None };
        }
        let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        Self {
            re: Regex::new(&pattern).ok(),
        }
    }

    /// Byte offset just past the earliest heading in `text`.
    pub fn find_end(&self, text: &str) -> Option<usize> {
        self.re.as_ref()?.find(text).map(|m| m.end())
    }

    /// `text` cut right after the earliest heading, if there is one.
    pub fn truncate<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.find_end(text).map(|end| &text[..end])
    }
}

/// Cut `text` after its first back-matter heading using the default headings.
pub fn truncate_at_back_matter(text: &str) -> Option<&str> {
    static MATCHER: Lazy<EndingMatcher> = Lazy::new(EndingMatcher::default);
    MATCHER.truncate(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_twenty_pages() {
        assert_eq!(ending_page_threshold(20), 15);
    }

    #[test]
    fn test_threshold_small_documents() {
        assert_eq!(ending_page_threshold(0), 0);
        assert_eq!(ending_page_threshold(1), 1);
        assert_eq!(ending_page_threshold(2), 0);
        assert_eq!(ending_page_threshold(4), 1);
    }

    #[test]
    fn test_threshold_grows_sublinearly() {
        let short = 10 - ending_page_threshold(10);
        let long = 200 - ending_page_threshold(200);
        assert!(long > short);
        assert!(long < 10);
    }

    #[test]
    fn test_truncate_at_references() {
        let text = "... results are promising. references [1] a. author, b. author";
        assert_eq!(
            truncate_at_back_matter(text),
            Some("... results are promising. references")
        );
    }

    #[test]
    fn test_earliest_heading_wins_case_insensitive() {
        let text = "Thanks. Acknowledgments We thank the survey. References [1]";
        assert_eq!(
            truncate_at_back_matter(text),
            Some("Thanks. Acknowledgments")
        );
    }

    #[test]
    fn test_word_boundary_required() {
        assert_eq!(truncate_at_back_matter("cross-referenced samples"), None);
        assert_eq!(truncate_at_back_matter("see the preferences panel"), None);
        assert_eq!(
            truncate_at_back_matter("Author contributions: all"),
            None,
            "'author contribution' must end on a word boundary"
        );
        assert_eq!(
            truncate_at_back_matter("Author contribution: all"),
            Some("Author contribution")
        );
    }

    #[test]
    fn test_custom_keywords() {
        let matcher = EndingMatcher::new(&["bibliografía".to_string()]);
        assert_eq!(matcher.truncate("texto Bibliografía 1."), Some("texto Bibliografía"));
        assert_eq!(EndingMatcher::new(&[]).find_end("references"), None);
    }
}
