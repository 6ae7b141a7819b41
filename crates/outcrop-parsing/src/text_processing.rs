use once_cell::sync::Lazy;
use regex::Regex;

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Remove line-break hyphens and parenthetical author-year citations.
///
/// - `"sedi- mentary"` → `"sedimentary"`: every hyphen followed by a space is
///   dropped, without trying to tell syllable breaks from compounds
/// - `"(Smith et al., 2001)"` → `""`: any innermost parenthetical containing
///   four consecutive digits is removed
pub fn strip_references(text: &str) -> String {
    static HYPHEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- ").unwrap());
    static CITATION_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\([^()]*\d{4}[^()]*\)").unwrap());

    let joined = HYPHEN_RE.replace_all(text, "");
    CITATION_RE.replace_all(&joined, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("ﬁeld area ﬂow"), "field area flow");
        assert_eq!(expand_ligatures("eﬃcient oﬄine"), "efficient offline");
        assert_eq!(expand_ligatures("no ligatures here"), "no ligatures here");
    }

    #[test]
    fn test_hyphen_space_removed() {
        assert_eq!(strip_references("sedi- mentary basin"), "sedimentary basin");
        assert_eq!(strip_references("north-east"), "north-east");
    }

    #[test]
    fn test_hyphen_then_space_is_always_dropped() {
        // Compounds broken at a line end lose their hyphen too.
        assert_eq!(strip_references("fault- bounded"), "faultbounded");
    }

    #[test]
    fn test_author_year_citations_removed() {
        assert_eq!(
            strip_references("the basin (Smith et al., 2001) was mapped"),
            "the basin  was mapped"
        );
        assert_eq!(
            strip_references("dated (e.g. Jones 1999; Lee 2003a) rocks"),
            "dated  rocks"
        );
    }

    #[test]
    fn test_parentheses_without_year_kept() {
        assert_eq!(
            strip_references("samples (n = 12) from the range (Fig. 3)"),
            "samples (n = 12) from the range (Fig. 3)"
        );
    }

    #[test]
    fn test_nested_parentheses_only_inner_removed() {
        assert_eq!(
            strip_references("outcrop (see map (Brown, 1987) for detail)"),
            "outcrop (see map  for detail)"
        );
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(strip_references(""), "");
    }
}
