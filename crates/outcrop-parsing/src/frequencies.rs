use regex::Regex;

use outcrop_core::PageSource;

/// How often a location name occurs in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFrequency {
    pub name: String,
    pub count: usize,
}

/// Case-insensitive, whole-word matcher for one location name.
fn name_pattern(name: &str) -> Option<Regex> {
    if name.trim().is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))).ok()
}

/// Count whole-word occurrences of each name over `texts`.
///
/// Names keep their first-seen order; repeated names are counted once.
pub fn count_locations<'a, S: AsRef<str>>(
    texts: impl IntoIterator<Item = &'a str>,
    names: &[S],
) -> Vec<LocationFrequency> {
    let mut counters: Vec<(LocationFrequency, Option<Regex>)> = Vec::new();
    for name in names {
        let name = name.as_ref();
        if counters.iter().any(|(f, _)| f.name == name) {
            continue;
        }
        counters.push((
            LocationFrequency {
                name: name.to_string(),
                count: 0,
            },
            name_pattern(name),
        ));
    }

    for text in texts {
        for (freq, re) in &mut counters {
            if let Some(re) = re {
                freq.count += re.find_iter(text).count();
            }
        }
    }

    counters.into_iter().map(|(f, _)| f).collect()
}

/// Count location names over the raw text of every page of `source`.
///
/// Pages that fail to load contribute nothing.
pub fn page_location_frequencies<S: AsRef<str>>(
    source: &dyn PageSource,
    names: &[S],
) -> Vec<LocationFrequency> {
    let mut texts = Vec::with_capacity(source.page_count());
    for index in 0..source.page_count() {
        match source.load_page(index) {
            Ok(page) => texts.push(page.raw_text),
            Err(e) => {
                tracing::warn!(page = index, error = %e, "skipping page in frequency count");
            }
        }
    }
    count_locations(texts.iter().map(String::as_str), names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcrop_core::{InMemoryPages, PageLayout};

    fn page(index: usize, raw: &str) -> PageLayout {
        let mut page = PageLayout::new(index, 612.0, 792.0);
        page.raw_text = raw.to_string();
        page
    }

    #[test]
    fn test_counts_whole_words_case_insensitive() {
        let counts = count_locations(
            ["The Karoo Basin and the KAROO", "karoostad is elsewhere"],
            &["Karoo"],
        );
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_order_kept_and_duplicates_collapsed() {
        let names = ["Oslo", "Bergen", "Oslo", "Tromsø"];
        let counts = count_locations(["Oslo, Bergen, Oslo"], &names);
        let pairs: Vec<(&str, usize)> = counts.iter().map(|f| (f.name.as_str(), f.count)).collect();
        assert_eq!(pairs, vec![("Oslo", 2), ("Bergen", 1), ("Tromsø", 0)]);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let counts = count_locations(["St. Helena (UK) and St Helena"], &["St. Helena"]);
        assert_eq!(counts[0].count, 1);
    }

    #[test]
    fn test_every_page_is_counted_and_broken_pages_skipped() {
        let mut source = InMemoryPages::new(vec![page(0, "Atacama Desert"), page(1, "the Atacama")]);
        source.push_broken("bad xref");
        source.push(page(3, "north of Atacama"));
        let counts = page_location_frequencies(&source, &["Atacama".to_string()]);
        assert_eq!(counts[0].count, 3);
    }
}
