use outcrop_core::{BBox, Word};

/// Vertical band of a page whose words count as body text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    /// Words must start strictly below this y.
    pub min_y: f32,
    /// Words must start strictly above this y.
    pub max_y: f32,
}

impl PageMargins {
    /// Margins as fractions of the page height.
    pub fn from_fractions(page_height: f32, header: f32, footer: f32) -> Self {
        Self {
            min_y: page_height * header,
            max_y: page_height * footer,
        }
    }

    pub fn contains(&self, y: f32) -> bool {
        self.min_y < y && y < self.max_y
    }
}

/// Keep the words of a page that are body text.
///
/// A word survives when its top edge lies strictly inside `margins` (which
/// strips running headers and footers) and no table box strictly contains it.
/// Words that only touch or straddle a table edge are kept.
pub fn filter_page_words<'a>(
    words: &'a [Word],
    tables: &[BBox],
    margins: PageMargins,
) -> Vec<&'a str> {
    words
        .iter()
        .filter(|w| margins.contains(w.bbox.y0))
        .filter(|w| !tables.iter().any(|t| t.strictly_contains(&w.bbox)))
        .map(|w| w.text.as_str())
        .collect()
}
