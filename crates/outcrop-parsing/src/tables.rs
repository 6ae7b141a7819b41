use once_cell::sync::Lazy;
use regex::Regex;

use outcrop_core::{BBox, PageLayout, TextDirection, VectorPrimitive};

/// Default caption pattern: "Table 3" or "Table 3:" as a span of its own.
pub const DEFAULT_CAPTION_PATTERN: &str = r"^Table \d[:]?\s*";

/// Rules above this y (page units) are running-header decoration.
const RULE_MIN_Y: f32 = 50.0;
/// Rules below this y are footer decoration.
const RULE_MAX_Y: f32 = 720.0;
/// A primitive taller than this is a border or a cell, not a rule.
const RULE_MAX_HEIGHT: f32 = 10.0;
/// Rule fragments this close vertically form one band.
const BAND_MERGE_TOLERANCE: f32 = 2.0;
/// Bands this close vertically belong to the same box edge.
const BOX_GROUP_TOLERANCE: f32 = 3.0;

static DEFAULT_CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| caption_regex(DEFAULT_CAPTION_PATTERN).unwrap());

/// Compile a caption pattern so that it must match a whole span.
///
/// "Table 2 shows the samples" is body text that happens to start like a
/// caption; only a span consisting of the caption itself anchors a table.
pub fn caption_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// A "Table N" caption, where a table region starts vertically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableAnchor {
    pub y: f32,
    pub page: usize,
}

/// A horizontal band built from one or more rule fragments at the same height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleBand {
    pub x0: f32,
    pub x1: f32,
    pub y: f32,
}

/// A detected table region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableBox {
    pub bbox: BBox,
    pub page: usize,
}

/// Outcome of table detection on one page.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDetection {
    NoTables,
    /// The page is dominated by rotated text and is treated as one big table.
    FullPage(TableBox),
    Tables(Vec<TableBox>),
}

impl TableDetection {
    /// Boxes whose contents should be dropped from the page text.
    pub fn boxes(&self) -> Vec<BBox> {
        match self {
            TableDetection::NoTables => Vec::new(),
            TableDetection::FullPage(t) => vec![t.bbox],
            TableDetection::Tables(tables) => tables.iter().map(|t| t.bbox).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TableDetection::NoTables => true,
            TableDetection::FullPage(_) => false,
            TableDetection::Tables(tables) => tables.is_empty(),
        }
    }
}

/// Detect table regions on a page with the default caption pattern.
pub fn detect_tables(page: &PageLayout) -> TableDetection {
    detect_tables_with_pattern(page, &DEFAULT_CAPTION_RE)
}

/// Detect table regions on a page.
///
/// A table needs both a caption and horizontal rules below it; rules alone
/// never produce a table. `caption_re` is tested against each trimmed span
/// and should come from [`caption_regex`].
pub fn detect_tables_with_pattern(page: &PageLayout, caption_re: &Regex) -> TableDetection {
    if !page.raw_text.contains("Table") {
        return TableDetection::NoTables;
    }

    let mut horizontal = 0usize;
    let mut vertical = 0usize;
    let mut anchors = Vec::new();
    for span in &page.spans {
        match span.direction {
            TextDirection::Horizontal => horizontal += 1,
            TextDirection::Vertical => vertical += 1,
            TextDirection::Other => {}
        }
        if caption_re.is_match(span.text.trim()) {
            anchors.push(TableAnchor {
                y: span.bbox.y0,
                page: page.index,
            });
        }
    }

    if anchors.is_empty() {
        return TableDetection::NoTables;
    }

    if horizontal < vertical {
        return TableDetection::FullPage(TableBox {
            bbox: page.bounds(),
            page: page.index,
        });
    }

    let rules = collect_rule_segments(&page.primitives);
    if rules.is_empty() {
        return TableDetection::NoTables;
    }

    let bands = merge_rule_bands(&rules);
    let tables: Vec<TableBox> = bands_per_anchor(&anchors, &bands)
        .iter()
        .filter_map(|(anchor, bands)| {
            build_table_box(bands).map(|bbox| TableBox {
                bbox,
                page: anchor.page,
            })
        })
        .collect();

    if tables.is_empty() {
        TableDetection::NoTables
    } else {
        TableDetection::Tables(tables)
    }
}

/// Keep the flat primitives that can be table rules.
///
/// Each primitive is grown by one unit on every side to absorb rounding, then
/// kept if its top edge lies strictly inside the body band of the page and it
/// is flatter than [`RULE_MAX_HEIGHT`].
pub fn collect_rule_segments(primitives: &[VectorPrimitive]) -> Vec<BBox> {
    primitives
        .iter()
        .map(|p| p.bbox.inflate(1.0))
        .filter(|b| b.is_finite())
        .filter(|b| {
            RULE_MIN_Y < b.y0 && b.y0 < RULE_MAX_Y && (b.y0 - b.y1).abs() < RULE_MAX_HEIGHT
        })
        .collect()
}

/// Merge rule fragments into horizontal bands.
///
/// Segments are sorted by top edge; every segment within
/// [`BAND_MERGE_TOLERANCE`] of the first segment of the current band joins it,
/// and the band spans the combined horizontal extent at that first height.
pub fn merge_rule_bands(rules: &[BBox]) -> Vec<RuleBand> {
    let mut sorted = rules.to_vec();
    sorted.sort_by(|a, b| a.y0.total_cmp(&b.y0));

    let mut bands = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let y = sorted[i].y0;
        let mut x0 = sorted[i].x0;
        let mut x1 = sorted[i].x1;
        let mut j = i + 1;
        while j < sorted.len() && (sorted[j].y0 - y).abs() <= BAND_MERGE_TOLERANCE {
            x0 = x0.min(sorted[j].x0);
            x1 = x1.max(sorted[j].x1);
            j += 1;
        }
        bands.push(RuleBand { x0, x1, y });
        i = j;
    }
    bands
}

/// Assign bands to the caption above them.
///
/// A caption owns the bands strictly between its own height and the next
/// caption on the same page (or the page bottom). Captions that own no band
/// are dropped.
pub fn bands_per_anchor(
    anchors: &[TableAnchor],
    bands: &[RuleBand],
) -> Vec<(TableAnchor, Vec<RuleBand>)> {
    let mut sorted = anchors.to_vec();
    sorted.sort_by(|a, b| a.page.cmp(&b.page).then(a.y.total_cmp(&b.y)));

    let mut out = Vec::new();
    for (i, anchor) in sorted.iter().enumerate() {
        let next_y = sorted
            .get(i + 1)
            .filter(|next| next.page == anchor.page)
            .map_or(f32::INFINITY, |next| next.y);
        let owned: Vec<RuleBand> = bands
            .iter()
            .filter(|band| anchor.y < band.y && band.y < next_y)
            .copied()
            .collect();
        if !owned.is_empty() {
            out.push((*anchor, owned));
        }
    }
    out
}

/// Turn one caption's bands into a bounding box.
///
/// Bands are ordered top to bottom (then left to right) and grouped when
/// consecutive heights differ by at most [`BOX_GROUP_TOLERANCE`]. The box takes
/// its horizontal extent from the first band of the first group and runs from
/// the first group's height down to the last group's height.
pub fn build_table_box(bands: &[RuleBand]) -> Option<BBox> {
    let mut sorted = bands.to_vec();
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x0.total_cmp(&b.x0)));

    let mut groups: Vec<Vec<RuleBand>> = Vec::new();
    for band in sorted {
        let joins_last = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|last| (band.y - last.y).abs() <= BOX_GROUP_TOLERANCE);
        if joins_last {
            let n = groups.len();
            groups[n - 1].push(band);
        } else {
            groups.push(vec![band]);
        }
    }

    let first = groups.first()?.first()?;
    let last = groups.last()?.first()?;
    Some(BBox::new(first.x0, first.y, first.x1, last.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcrop_core::TextSpan;

    fn span(text: &str, y: f32, direction: TextDirection) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            bbox: BBox::new(72.0, y, 300.0, y + 10.0),
            direction,
        }
    }

    fn page_with(spans: Vec<TextSpan>, primitives: Vec<VectorPrimitive>) -> PageLayout {
        let raw_text = spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        PageLayout {
            index: 3,
            width: 612.0,
            height: 792.0,
            spans,
            primitives,
            raw_text,
            ..Default::default()
        }
    }

    #[test]
    fn test_page_without_table_word_is_skipped() {
        let page = page_with(
            vec![span("Results of the survey", 100.0, TextDirection::Horizontal)],
            vec![VectorPrimitive::line(72.0, 200.0, 540.0, 200.0)],
        );
        assert_eq!(detect_tables(&page), TableDetection::NoTables);
    }

    #[test]
    fn test_caption_with_rules_builds_box() {
        let page = page_with(
            vec![
                span("Table 2: ", 100.0, TextDirection::Horizontal),
                span("Sample locations", 100.0, TextDirection::Horizontal),
                span("Body text continues", 400.0, TextDirection::Horizontal),
            ],
            vec![
                VectorPrimitive::line(72.0, 120.0, 300.0, 120.0),
                VectorPrimitive::line(300.0, 120.5, 540.0, 120.5),
                VectorPrimitive::line(72.0, 140.0, 540.0, 140.0),
                VectorPrimitive::line(72.0, 300.0, 540.0, 300.0),
            ],
        );
        match detect_tables(&page) {
            TableDetection::Tables(tables) => {
                assert_eq!(tables.len(), 1);
                assert_eq!(tables[0].page, 3);
                assert_eq!(tables[0].bbox, BBox::new(71.0, 119.0, 541.0, 299.0));
            }
            other => panic!("expected tables, got {other:?}"),
        }
    }

    #[test]
    fn test_rules_without_caption_yield_nothing() {
        let page = page_with(
            vec![span("See Table 4 below", 100.0, TextDirection::Horizontal)],
            vec![VectorPrimitive::line(72.0, 200.0, 540.0, 200.0)],
        );
        assert_eq!(detect_tables(&page), TableDetection::NoTables);
    }

    #[test]
    fn test_body_line_starting_with_table_is_not_a_caption() {
        let page = page_with(
            vec![span(
                "Table 2 shows the samples from the basin.",
                100.0,
                TextDirection::Horizontal,
            )],
            vec![
                VectorPrimitive::line(72.0, 120.0, 540.0, 120.0),
                VectorPrimitive::line(72.0, 500.0, 540.0, 500.0),
            ],
        );
        assert_eq!(detect_tables(&page), TableDetection::NoTables);
    }

    #[test]
    fn test_custom_caption_pattern_matches_whole_span() {
        let re = caption_regex(r"Tab\. \d+").unwrap();
        let rules = vec![
            VectorPrimitive::line(72.0, 120.0, 540.0, 120.0),
            VectorPrimitive::line(72.0, 300.0, 540.0, 300.0),
        ];
        let mut page = page_with(
            vec![span("Tab. 12 lists the sites", 100.0, TextDirection::Horizontal)],
            rules.clone(),
        );
        page.raw_text.push_str("\nTable of sites");
        assert!(detect_tables_with_pattern(&page, &re).is_empty());

        page.spans = vec![span("  Tab. 12 ", 100.0, TextDirection::Horizontal)];
        assert!(!detect_tables_with_pattern(&page, &re).is_empty());
    }

    #[test]
    fn test_caption_without_rules_yields_nothing() {
        let page = page_with(
            vec![span("Table 1", 100.0, TextDirection::Horizontal)],
            vec![VectorPrimitive::rect(BBox::new(72.0, 100.0, 540.0, 400.0))],
        );
        assert_eq!(detect_tables(&page), TableDetection::NoTables);
    }

    #[test]
    fn test_vertical_page_is_full_page_box() {
        let page = page_with(
            vec![
                span("Table 5", 100.0, TextDirection::Vertical),
                span("Site A 12.3", 150.0, TextDirection::Vertical),
                span("Site B 14.1", 200.0, TextDirection::Horizontal),
            ],
            vec![],
        );
        match detect_tables(&page) {
            TableDetection::FullPage(t) => {
                assert_eq!(t.bbox, BBox::new(0.0, 0.0, 612.0, 792.0));
            }
            other => panic!("expected full page, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_filter_rejects_margins_and_tall_shapes() {
        let rules = collect_rule_segments(&[
            VectorPrimitive::line(72.0, 30.0, 540.0, 30.0),
            VectorPrimitive::line(72.0, 750.0, 540.0, 750.0),
            VectorPrimitive::line(300.0, 100.0, 300.0, 400.0),
            VectorPrimitive::rect(BBox::new(72.0, 200.0, 540.0, 201.0)),
        ]);
        assert_eq!(rules, vec![BBox::new(71.0, 199.0, 541.0, 202.0)]);
    }

    #[test]
    fn test_merge_bands_uses_first_height_of_group() {
        let bands = merge_rule_bands(&[
            BBox::new(300.0, 101.5, 500.0, 102.0),
            BBox::new(80.0, 100.0, 290.0, 101.0),
            BBox::new(90.0, 101.8, 200.0, 102.3),
            BBox::new(80.0, 160.0, 500.0, 161.0),
        ]);
        assert_eq!(
            bands,
            vec![
                RuleBand { x0: 80.0, x1: 500.0, y: 100.0 },
                RuleBand { x0: 80.0, x1: 500.0, y: 160.0 },
            ]
        );
    }

    #[test]
    fn test_two_captions_split_bands() {
        let anchors = [
            TableAnchor { y: 400.0, page: 1 },
            TableAnchor { y: 100.0, page: 1 },
        ];
        let bands = [
            RuleBand { x0: 70.0, x1: 540.0, y: 120.0 },
            RuleBand { x0: 70.0, x1: 540.0, y: 380.0 },
            RuleBand { x0: 70.0, x1: 300.0, y: 420.0 },
            RuleBand { x0: 70.0, x1: 300.0, y: 600.0 },
        ];
        let owned = bands_per_anchor(&anchors, &bands);
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].0.y, 100.0);
        assert_eq!(owned[0].1.len(), 2);
        assert_eq!(owned[1].0.y, 400.0);
        assert_eq!(owned[1].1[0].y, 420.0);
    }

    #[test]
    fn test_build_box_groups_close_bands() {
        let bbox = build_table_box(&[
            RuleBand { x0: 80.0, x1: 500.0, y: 300.0 },
            RuleBand { x0: 70.0, x1: 540.0, y: 120.0 },
            RuleBand { x0: 90.0, x1: 200.0, y: 122.0 },
        ])
        .unwrap();
        assert_eq!(bbox, BBox::new(70.0, 120.0, 540.0, 300.0));
        assert!(build_table_box(&[]).is_none());
    }
}
