use std::io::Write;

use outcrop_parsing::{LocationFrequency, PreparedText};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print every prepared part followed by the token total.
///
/// An empty result prints nothing.
pub fn print_prepared(
    w: &mut dyn Write,
    file_name: &str,
    prepared: &PreparedText,
    color: ColorMode,
) -> std::io::Result<()> {
    if prepared.parts.is_empty() {
        return Ok(());
    }

    let count = prepared.parts.len();
    for (i, part) in prepared.parts.iter().enumerate() {
        let header = format!("--- {} part {}/{} ---", file_name, i + 1, count);
        if color.enabled() {
            writeln!(w, "{}", header.bold().cyan())?;
        } else {
            writeln!(w, "{}", header)?;
        }
        writeln!(w, "{}", part)?;
        writeln!(w)?;
    }

    let total = format!("Total tokens across all parts: {}", prepared.total_tokens);
    if color.enabled() {
        writeln!(w, "{}", total.green())?;
    } else {
        writeln!(w, "{}", total)?;
    }

    if !prepared.page_failures.is_empty() {
        let pages: Vec<String> = prepared
            .page_failures
            .iter()
            .map(|f| (f.page + 1).to_string())
            .collect();
        let note = format!("(Skipped unreadable pages: {})", pages.join(", "));
        if color.enabled() {
            writeln!(w, "{}", note.yellow())?;
        } else {
            writeln!(w, "{}", note)?;
        }
    }
    Ok(())
}

/// Print a single optional value, or nothing when it is absent or empty.
pub fn print_value(w: &mut dyn Write, value: Option<&str>) -> std::io::Result<()> {
    match value {
        Some(v) if !v.is_empty() => writeln!(w, "{}", v),
        _ => Ok(()),
    }
}

/// Print one `name<TAB>count` line per location, most frequent first.
pub fn print_frequencies(
    w: &mut dyn Write,
    frequencies: &[LocationFrequency],
    color: ColorMode,
) -> std::io::Result<()> {
    let mut sorted: Vec<&LocationFrequency> = frequencies.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    for f in sorted {
        if color.enabled() && f.count == 0 {
            writeln!(w, "{}\t{}", f.name.dimmed(), f.count.dimmed())?;
        } else {
            writeln!(w, "{}\t{}", f.name, f.count)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcrop_parsing::PageFailure;

    fn render(prepared: &PreparedText) -> String {
        let mut buf = Vec::new();
        print_prepared(&mut buf, "paper.pdf", prepared, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_empty_result_prints_nothing() {
        assert_eq!(render(&PreparedText::default()), "");
    }

    #[test]
    fn test_parts_and_total() {
        let prepared = PreparedText {
            parts: vec!["first".into(), "second".into()],
            total_tokens: 2,
            page_failures: vec![PageFailure {
                page: 4,
                message: "bad stream".into(),
            }],
            ..Default::default()
        };
        let out = render(&prepared);
        assert!(out.starts_with("--- paper.pdf part 1/2 ---\nfirst\n\n"));
        assert!(out.contains("--- paper.pdf part 2/2 ---\nsecond\n"));
        assert!(out.contains("Total tokens across all parts: 2\n"));
        assert!(out.ends_with("(Skipped unreadable pages: 5)\n"));
    }

    #[test]
    fn test_frequencies_sorted_stably() {
        let freqs = vec![
            LocationFrequency {
                name: "Oslo".into(),
                count: 1,
            },
            LocationFrequency {
                name: "Bergen".into(),
                count: 3,
            },
            LocationFrequency {
                name: "Tromsø".into(),
                count: 1,
            },
        ];
        let mut buf = Vec::new();
        print_frequencies(&mut buf, &freqs, ColorMode(false)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Bergen\t3\nOslo\t1\nTromsø\t1\n");
    }

    #[test]
    fn test_print_value_skips_empty() {
        let mut buf = Vec::new();
        print_value(&mut buf, Some("")).unwrap();
        print_value(&mut buf, None).unwrap();
        print_value(&mut buf, Some("10.1000/xyz")).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "10.1000/xyz\n");
    }
}
