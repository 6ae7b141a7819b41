use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("max_tokens_per_part must be positive")]
    InvalidMaxTokens,
    #[error("overlap fraction must be in [0, 1), got {0}")]
    InvalidOverlap(f64),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("failed to decode tokens {range:?}: {message}")]
    Decode { range: Range<usize>, message: String },
}

/// Token encoding used to measure and cut text.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Text of `tokens`. A slice that starts or ends inside a character must
    /// still decode; the broken bytes become U+FFFD.
    fn decode(&self, tokens: &[u32]) -> Result<String, String>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// The `cl100k_base` BPE used by current OpenAI chat models.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    pub fn new() -> Result<Self, ChunkError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| ChunkError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl fmt::Debug for Cl100kTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cl100kTokenizer")
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, String> {
        // Byte-level tokens routinely split multibyte characters at part edges.
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The process-wide cl100k tokenizer, loaded on first use.
pub fn cl100k() -> Result<Arc<dyn Tokenizer>, ChunkError> {
    static SHARED: OnceCell<Arc<Cl100kTokenizer>> = OnceCell::new();
    let tokenizer = SHARED.get_or_try_init(|| Cl100kTokenizer::new().map(Arc::new))?;
    let shared: Arc<dyn Tokenizer> = tokenizer.clone();
    Ok(shared)
}

/// Token ranges of a balanced, overlapping split of `total` tokens.
///
/// With `overlap = floor(max * fraction)` and `step = max - overlap`, the
/// number of parts is `ceil((total - overlap) / step)`. Part sizes are then
/// evened out: every part gets `floor((total + (parts - 1) * overlap) / parts)`
/// tokens and the remainder of that division is handed out one token each to
/// the leading parts. Consecutive parts share exactly `overlap` tokens, the
/// last part ends at `total`, and no part is longer than `max`.
pub fn plan_parts(total: usize, max_tokens: usize, overlap: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    if total <= max_tokens {
        return vec![0..total];
    }

    let step = max_tokens - overlap;
    let parts = (total - overlap).div_ceil(step);
    let covered = total + (parts - 1) * overlap;
    let balanced = covered / parts;
    let remainder = covered % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = balanced + usize::from(i < remainder);
        let end = (start + size).min(total);
        ranges.push(start..end);
        start = end - overlap;
    }
    ranges
}

/// Splits text into overlapping parts that each fit a token budget.
#[derive(Clone)]
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenChunker")
            .field("max_tokens", &self.max_tokens)
            .field("overlap_tokens", &self.overlap_tokens)
            .finish()
    }
}

impl TokenChunker {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        max_tokens: usize,
        overlap_fraction: f64,
    ) -> Result<Self, ChunkError> {
        if max_tokens == 0 {
            return Err(ChunkError::InvalidMaxTokens);
        }
        if !(0.0..1.0).contains(&overlap_fraction) {
            return Err(ChunkError::InvalidOverlap(overlap_fraction));
        }
        let overlap_tokens = (max_tokens as f64 * overlap_fraction).floor() as usize;
        Ok(Self {
            tokenizer,
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Split `text` into parts. Empty text gives no parts; text within budget
    /// comes back unchanged as a single part.
    pub fn split(&self, text: &str) -> Result<Vec<String>, ChunkError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let tokens = self.tokenizer.encode(text);
        if tokens.len() <= self.max_tokens {
            return Ok(vec![text.to_string()]);
        }

        plan_parts(tokens.len(), self.max_tokens, self.overlap_tokens)
            .into_iter()
            .map(|range| {
                self.tokenizer
                    .decode(&tokens[range.clone()])
                    .map_err(|message| ChunkError::Decode { range, message })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per character.
    struct CharTokenizer;

    impl Tokenizer for CharTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.chars().map(u32::from).collect()
        }

        fn decode(&self, tokens: &[u32]) -> Result<String, String> {
            tokens
                .iter()
                .map(|&t| char::from_u32(t).ok_or_else(|| format!("bad token {t}")))
                .collect()
        }
    }

    fn chunker(max: usize, fraction: f64) -> TokenChunker {
        TokenChunker::new(Arc::new(CharTokenizer), max, fraction).unwrap()
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let tok: Arc<dyn Tokenizer> = Arc::new(CharTokenizer);
        assert!(matches!(
            TokenChunker::new(tok.clone(), 0, 0.1),
            Err(ChunkError::InvalidMaxTokens)
        ));
        assert!(matches!(
            TokenChunker::new(tok.clone(), 10, 1.0),
            Err(ChunkError::InvalidOverlap(_))
        ));
        assert!(matches!(
            TokenChunker::new(tok, 10, -0.1),
            Err(ChunkError::InvalidOverlap(_))
        ));
    }

    #[test]
    fn test_empty_and_small_text() {
        let c = chunker(10, 0.2);
        assert!(c.split("").unwrap().is_empty());
        assert_eq!(c.split("short").unwrap(), vec!["short"]);
        assert_eq!(c.split("exactly10!").unwrap(), vec!["exactly10!"]);
    }

    #[test]
    fn test_plan_twenty_five_tokens() {
        // overlap 2, step 8: ceil(23 / 8) = 3 parts of (25 + 4) / 3 = 9 or 10.
        assert_eq!(plan_parts(25, 10, 2), vec![0..10, 8..18, 16..25]);
    }

    #[test]
    fn test_plan_remainder_stays_within_budget() {
        // Plain floor division would leave a last part of 11 here.
        let plan = plan_parts(29, 10, 3);
        assert_eq!(plan, vec![0..10, 7..17, 14..23, 20..29]);
        assert!(plan.iter().all(|r| r.len() <= 10));
    }

    #[test]
    fn test_plan_invariants_over_many_sizes() {
        for max in [1usize, 2, 7, 10, 64] {
            for overlap in 0..max {
                for total in 1..200 {
                    let plan = plan_parts(total, max, overlap);
                    assert_eq!(plan.first().map(|r| r.start), Some(0));
                    assert_eq!(plan.last().map(|r| r.end), Some(total));
                    for r in &plan {
                        assert!(r.len() <= max, "{total}/{max}/{overlap}: {r:?}");
                        assert!(!r.is_empty());
                    }
                    for pair in plan.windows(2) {
                        assert_eq!(pair[0].end - pair[1].start, overlap);
                    }
                }
            }
        }
    }

    #[test]
    fn test_split_text_overlaps() {
        let c = chunker(10, 0.2);
        let text: String = ('a'..='y').collect();
        let parts = c.split(&text).unwrap();
        assert_eq!(parts, vec!["abcdefghij", "ijklmnopqr", "qrstuvwxy"]);
    }

    #[test]
    fn test_zero_overlap_partitions_text() {
        let c = chunker(4, 0.0);
        let parts = c.split("abcdefghij").unwrap();
        assert_eq!(parts.concat(), "abcdefghij");
        assert!(parts.iter().all(|p| p.chars().count() <= 4));
    }

    #[test]
    fn test_cl100k_split_inside_multibyte_characters() {
        let text = "𝛿18O values ".repeat(200);
        let c = TokenChunker::new(cl100k().unwrap(), 37, 0.15).unwrap();
        let parts = c.split(&text).unwrap();
        assert!(parts.len() > 1);
        assert!(parts[0].starts_with("𝛿18O values"));
        assert!(parts.last().unwrap().ends_with("values "));
        assert!(parts.iter().any(|p| p.contains('\u{FFFD}')));
    }

    #[test]
    fn test_cl100k_decodes_whole_text_exactly() {
        let tok = cl100k().unwrap();
        let text = "δ18O ‰ in the 北京 basin";
        assert_eq!(tok.decode(&tok.encode(text)).unwrap(), text);
    }

    #[test]
    fn test_overlap_rounds_down() {
        assert_eq!(chunker(10, 0.15).overlap_tokens(), 1);
        assert_eq!(chunker(10_000, 0.15).overlap_tokens(), 1500);
    }
}
