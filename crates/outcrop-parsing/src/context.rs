use std::ops::Range;

use regex::Regex;

/// Phrases that tend to sit next to place names in geoscience papers.
pub const DEFAULT_CONTEXT_KEYWORDS: &[&str] = &[
    // Direct location indicators
    "study area",
    "study site",
    "field area",
    "sampling site",
    "sample location",
    // Administrative divisions
    "province of",
    "district of",
    "county of",
    "city of",
    "town of",
    "village of",
    // Geological units usually named after places
    "basin",
    "formation",
    "complex",
    "range",
    // Common phrasing
    "outcrop at",
    "exposed at",
    "collected from",
    "located in",
    "situated in",
    // Regional context
    "region of",
    "area of",
];

/// Margin, in characters, kept on each side of a keyword match.
pub const CONTEXT_WINDOW_CHARS: usize = 4000;

/// Cuts a body text down to the neighbourhoods of trigger phrases.
#[derive(Debug, Clone)]
pub struct KeywordContextFinder {
    pattern: Option<Regex>,
    window: usize,
}

impl KeywordContextFinder {
    /// Compile a case-insensitive, word-bounded matcher for `keywords`.
    ///
    /// The requested window is not used: every finder works with
    /// [`CONTEXT_WINDOW_CHARS`], which is what extraction output has always
    /// been produced with.
    pub fn new<S: AsRef<str>>(keywords: &[S], _window: usize) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        let pattern = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
        };
        Self {
            pattern,
            window: CONTEXT_WINDOW_CHARS,
        }
    }

    /// Finder over [`DEFAULT_CONTEXT_KEYWORDS`].
    pub fn with_default_keywords() -> Self {
        Self::new(DEFAULT_CONTEXT_KEYWORDS, CONTEXT_WINDOW_CHARS)
    }

    /// The margin actually applied around each match.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Byte spans of every keyword match, left to right.
    pub fn matches(&self, text: &str) -> Vec<Range<usize>> {
        match &self.pattern {
            Some(re) => re.find_iter(text).map(|m| m.range()).collect(),
            None => Vec::new(),
        }
    }

    /// Merged windows around all matches, as byte ranges into `text`.
    ///
    /// Each match is widened by the window on both sides (in characters,
    /// clipped to the text). Sweeping left to right, a window that starts at
    /// or before the end of the current merged range extends it; otherwise
    /// the current range is closed. The result is sorted and non-overlapping.
    pub fn context_windows(&self, text: &str) -> Vec<Range<usize>> {
        let matches = self.matches(text);
        if matches.is_empty() {
            return Vec::new();
        }

        let offsets = CharOffsets::new(text);
        let mut windows: Vec<Range<usize>> = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for m in matches {
            let start = offsets.char_index(m.start).saturating_sub(self.window);
            let end = offsets
                .char_index(m.end)
                .saturating_add(self.window)
                .min(offsets.char_len());

            current = match current {
                None => Some(start..end),
                Some(open) if start <= open.end => Some(open.start..open.end.max(end)),
                Some(open) => {
                    windows.push(open);
                    Some(start..end)
                }
            };
        }
        windows.extend(current);

        windows
            .into_iter()
            .map(|w| offsets.byte_index(w.start)..offsets.byte_index(w.end))
            .collect()
    }

    /// The text of all merged windows, joined by single spaces, with newlines
    /// flattened to spaces. Empty when nothing matches.
    pub fn find_contexts(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        self.context_windows(text)
            .into_iter()
            .map(|w| text[w].replace('\n', " "))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Applies one finder to many texts.
#[derive(Debug, Clone)]
pub struct KeywordContextProcessor {
    finder: KeywordContextFinder,
}

impl KeywordContextProcessor {
    pub fn new<S: AsRef<str>>(keywords: &[S], window: usize) -> Self {
        Self {
            finder: KeywordContextFinder::new(keywords, window),
        }
    }

    pub fn process_texts(&self, texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| self.finder.find_contexts(t)).collect()
    }
}

/// Window around the default trigger phrases.
pub fn find_text_surrounding_keywords(text: &str) -> String {
    KeywordContextFinder::with_default_keywords().find_contexts(text)
}

/// Conversion between character positions and byte offsets of one string.
struct CharOffsets {
    /// Byte offset of every char boundary, including the end of the string.
    boundaries: Vec<usize>,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { boundaries }
    }

    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Character position of a byte offset that sits on a char boundary.
    fn char_index(&self, byte: usize) -> usize {
        self.boundaries
            .binary_search(&byte)
            .unwrap_or_else(|insert_at| insert_at)
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.boundaries[char_pos.min(self.char_len())]
    }
}
