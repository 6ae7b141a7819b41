use outcrop_core::Word;

/// Words that introduce an abstract, tried in order.
pub const ABSTRACT_KEYWORDS: &[&str] = &["abstract", "resumen"];

/// Horizontal jump (page units) between consecutive words that, together with
/// [`BLOCK_BREAK_DY`], marks the end of the abstract block.
const BLOCK_BREAK_DX: f32 = 20.0;
const BLOCK_BREAK_DY: f32 = 5.0;

/// Isolate the abstract from the words of the first page.
///
/// Returns an empty string when no abstract keyword is present.
pub fn extract_abstract(words: &[Word]) -> String {
    let keywords: Vec<String> = ABSTRACT_KEYWORDS.iter().map(|k| k.to_string()).collect();
    let Some(start) = find_abstract_start(words, &keywords) else {
        return String::new();
    };

    let candidates = &words[start + 1..];
    let Some(end) = abstract_end_index(candidates) else {
        return String::new();
    };

    candidates[..=end]
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Index of the word that closes the abstract heading.
///
/// For each keyword in turn, first look for a word containing it
/// (case-insensitive), then for a run of words spelling it out letter by
/// letter ("A B S T R A C T"). In the spaced case the returned index is the
/// last letter of the run.
pub fn find_abstract_start(words: &[Word], keywords: &[String]) -> Option<usize> {
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if keyword.is_empty() {
            continue;
        }

        if let Some(i) = words
            .iter()
            .position(|w| w.text.to_lowercase().contains(&keyword))
        {
            return Some(i);
        }

        let len = keyword.chars().count();
        if words.len() >= len {
            for i in 0..=(words.len() - len) {
                let spelled: String = words[i..i + len]
                    .iter()
                    .map(|w| w.text.to_lowercase())
                    .collect();
                if spelled == keyword {
                    return Some(i + len - 1);
                }
            }
        }
    }
    None
}

/// Index of the last word of the abstract within `candidates`.
///
/// The abstract ends before the first pair of consecutive words whose boxes
/// jump both sideways and downwards, which is how a column break or a new
/// heading block shows up in reading order. `None` for an empty slice.
pub fn abstract_end_index(candidates: &[Word]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let boundary = candidates.windows(2).position(|pair| {
        let (current, next) = (&pair[0].bbox, &pair[1].bbox);
        (current.x1 - next.x0).abs() > BLOCK_BREAK_DX && (next.y0 - current.y1).abs() > BLOCK_BREAK_DY
    });
    Some(boundary.unwrap_or(candidates.len() - 1))
}
