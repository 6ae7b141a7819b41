use once_cell::sync::Lazy;
use regex::Regex;

/// DOI shapes, most general first.
static DOI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // General
        r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+",
        // Wiley
        r"(?i)10\.1002/[^\s]+",
        // SICI-style
        r"(?i)10\.\d{4}/\d+-\d+X?(\d+)\d+<[\d\w]+:[\d\w]*>\d+\.\d+\.\w+;\d",
        // ACS
        r"(?i)10\.1021/\w\w\d+",
        // Erlbaum
        r"(?i)10\.1207/[\w\d]+&\d+_\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Strip trailing sentence punctuation and closers that have no opener.
fn clean_doi(doi: &str) -> String {
    const TRAILING: [char; 4] = ['.', ',', ';', ':'];
    let mut doi = doi.trim_end_matches(TRAILING);

    for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
        while doi.ends_with(close) && doi.matches(close).count() > doi.matches(open).count() {
            doi = doi[..doi.len() - 1].trim_end_matches(TRAILING);
        }
    }

    doi.to_string()
}

/// First DOI in `text`.
///
/// Patterns are tried in order. Each one is run over the trimmed lines first
/// and then over the whole text, so a DOI broken across lines is only found
/// when no pattern matches a single line.
pub fn find_doi(text: &str) -> Option<String> {
    for re in DOI_PATTERNS.iter() {
        let in_line = text.split('\n').find_map(|line| re.find(line.trim()));
        if let Some(m) = in_line.or_else(|| re.find(text)) {
            return Some(clean_doi(m.as_str()));
        }
    }
    None
}
