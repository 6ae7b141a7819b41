use std::path::Path;
use std::sync::{Arc, Mutex};

use mupdf::{
    ColorParams, Colorspace, Device, Document, Matrix, NativeDevice, PathWalker, Quad,
    StrokeState, TextPageFlags,
};

use outcrop_core::{
    BBox, BackendError, PageLayout, PageSource, PdfBackend, TextDirection, TextSpan,
    VectorPrimitive, Word,
};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the pipeline crates do not transitively
/// depend on it.
///
/// Each page is turned into words with boxes, spans (runs of same-size
/// glyphs within a line) with a writing direction, the raw page text, and the straight vector segments
/// that tables are ruled with. Header and footer filtering happens later in
/// the pipeline, not here.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        Ok(Box::new(MupdfPages {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

/// An open MuPDF document. Dropping it closes the file.
struct MupdfPages {
    document: Document,
    page_count: usize,
}

impl PageSource for MupdfPages {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn load_page(&self, index: usize) -> Result<PageLayout, BackendError> {
        let page_error = |message: String| BackendError::PageError {
            page: index,
            message,
        };

        let number = i32::try_from(index).map_err(|e| page_error(e.to_string()))?;
        let page = self
            .document
            .load_page(number)
            .map_err(|e| page_error(e.to_string()))?;
        let bounds = page.bounds().map_err(|e| page_error(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| page_error(e.to_string()))?;

        let mut layout = PageLayout::new(index, bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);

        // Use block/line iteration to match PyMuPDF's get_text() behavior
        for block in text_page.blocks() {
            for line in block.lines() {
                let mut line_text = String::new();
                let mut word = WordBuilder::default();
                let mut run = SpanBuilder::default();

                for ch in line.chars() {
                    let c = ch.char().unwrap_or('\u{FFFD}');
                    let origin = ch.origin();
                    let bbox = quad_bbox(&ch.quad());
                    line_text.push(c);

                    if run.breaks_at(ch.size()) {
                        layout.spans.extend(run.finish());
                    }
                    run.push(c, ch.size(), (origin.x, origin.y), bbox);

                    if c.is_whitespace() {
                        layout.words.extend(word.finish(index));
                    } else {
                        word.push(c, bbox);
                    }
                }
                layout.words.extend(word.finish(index));
                layout.spans.extend(run.finish());

                layout.raw_text.push_str(&line_text);
                layout.raw_text.push('\n');
            }
        }

        layout.primitives = collect_primitives(&page).map_err(page_error)?;
        Ok(layout)
    }
}

/// Accumulates characters of one word and the union of their boxes.
#[derive(Default)]
struct WordBuilder {
    text: String,
    bbox: Option<BBox>,
}

impl WordBuilder {
    fn push(&mut self, c: char, bbox: BBox) {
        self.text.push(c);
        self.bbox = Some(match self.bbox {
            Some(b) => b.union(&bbox),
            None => bbox,
        });
    }

    fn finish(&mut self, page: usize) -> Option<Word> {
        let text = std::mem::take(&mut self.text);
        let bbox = self.bbox.take()?;
        Some(Word::new(text, bbox, page))
    }
}

/// Accumulates one run of same-size characters within a line.
///
/// MuPDF's text page does not expose the font of a character, so a change of
/// glyph size is what separates a bold "Table 1" caption from the title set
/// after it on the same line.
#[derive(Default)]
struct SpanBuilder {
    text: String,
    size: f32,
    origins: Vec<(f32, f32)>,
    bbox: Option<BBox>,
}

/// Glyph sizes closer than this belong to the same run.
const SIZE_TOLERANCE: f32 = 0.05;

impl SpanBuilder {
    fn breaks_at(&self, size: f32) -> bool {
        !self.text.is_empty() && (self.size - size).abs() > SIZE_TOLERANCE
    }

    fn push(&mut self, c: char, size: f32, origin: (f32, f32), bbox: BBox) {
        self.text.push(c);
        self.size = size;
        self.origins.push(origin);
        self.bbox = Some(match self.bbox {
            Some(b) => b.union(&bbox),
            None => bbox,
        });
    }

    fn finish(&mut self) -> Option<TextSpan> {
        let text = std::mem::take(&mut self.text);
        let origins = std::mem::take(&mut self.origins);
        let bbox = self.bbox.take()?;
        Some(TextSpan {
            direction: direction_of(&origins),
            text,
            bbox,
        })
    }
}

fn quad_bbox(q: &Quad) -> BBox {
    let xs = [q.ul.x, q.ur.x, q.ll.x, q.lr.x];
    let ys = [q.ul.y, q.ur.y, q.ll.y, q.lr.y];
    BBox::new(
        xs.iter().copied().fold(f32::INFINITY, f32::min),
        ys.iter().copied().fold(f32::INFINITY, f32::min),
        xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    )
}

/// Writing direction from how character origins progress along a line.
fn direction_of(origins: &[(f32, f32)]) -> TextDirection {
    let (Some(first), Some(last)) = (origins.first(), origins.last()) else {
        return TextDirection::Horizontal;
    };
    let dx = last.0 - first.0;
    let dy = last.1 - first.1;
    if origins.len() == 1 || (dx > 0.0 && dx.abs() >= dy.abs()) {
        TextDirection::Horizontal
    } else if dy < 0.0 && dy.abs() > dx.abs() {
        TextDirection::Vertical
    } else {
        TextDirection::Other
    }
}

// ---------------------------------------------------------------------------
// Vector primitives
// ---------------------------------------------------------------------------

/// Run the page through a device that records filled and stroked paths.
fn collect_primitives(page: &mupdf::Page) -> Result<Vec<VectorPrimitive>, String> {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let device = Device::from_native(PathCollector {
        sink: Arc::clone(&sink),
    })
    .map_err(|e| e.to_string())?;
    page.run(&device, &Matrix::IDENTITY).map_err(|e| e.to_string())?;
    drop(device);

    let primitives = match sink.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    Ok(primitives)
}

struct PathCollector {
    sink: Arc<Mutex<Vec<VectorPrimitive>>>,
}

impl PathCollector {
    fn record(&self, path: &mupdf::Path, ctm: &Matrix) {
        let mut walker = SegmentWalker::new(ctm);
        if path.walk(&mut walker).is_err() {
            return;
        }
        walker.flush();
        if let Ok(mut sink) = self.sink.lock() {
            sink.extend(walker.primitives);
        }
    }
}

impl NativeDevice for PathCollector {
    fn fill_path(
        &mut self,
        path: &mupdf::Path,
        _even_odd: bool,
        ctm: Matrix,
        _color_space: &Colorspace,
        _color: &[f32],
        _alpha: f32,
        _cp: ColorParams,
    ) {
        self.record(path, &ctm);
    }

    fn stroke_path(
        &mut self,
        path: &mupdf::Path,
        _stroke_state: &StrokeState,
        ctm: Matrix,
        _color_space: &Colorspace,
        _color: &[f32],
        _alpha: f32,
        _cp: ColorParams,
    ) {
        self.record(path, &ctm);
    }
}

/// Flattens a path into page-space segments.
///
/// A closed subpath of exactly four axis-aligned corners becomes one rect;
/// everything else becomes one line per straight segment. Curves are skipped.
struct SegmentWalker {
    ctm: [f32; 6],
    points: Vec<(f32, f32)>,
    straight: bool,
    primitives: Vec<VectorPrimitive>,
}

impl SegmentWalker {
    fn new(m: &Matrix) -> Self {
        Self {
            ctm: [m.a, m.b, m.c, m.d, m.e, m.f],
            points: Vec::new(),
            straight: true,
            primitives: Vec::new(),
        }
    }

    fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.ctm;
        (x * a + y * c + e, x * b + y * d + f)
    }

    fn emit_lines(&mut self, closed: bool) {
        let pts = &self.points;
        let mut lines: Vec<VectorPrimitive> = pts
            .windows(2)
            .map(|w| VectorPrimitive::line(w[0].0, w[0].1, w[1].0, w[1].1))
            .collect();
        if closed && pts.len() > 2 {
            let (first, last) = (pts[0], pts[pts.len() - 1]);
            if first != last {
                lines.push(VectorPrimitive::line(last.0, last.1, first.0, first.1));
            }
        }
        self.primitives.extend(lines);
    }

    fn as_rect(&self) -> Option<BBox> {
        let mut pts = self.points.clone();
        if pts.len() == 5 && pts[0] == pts[4] {
            pts.pop();
        }
        if pts.len() != 4 {
            return None;
        }
        let axis_aligned = (0..4).all(|i| {
            let (p, q) = (pts[i], pts[(i + 1) % 4]);
            p.0 == q.0 || p.1 == q.1
        });
        if !axis_aligned {
            return None;
        }
        let bbox = pts.iter().fold(
            BBox::new(f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            |acc, &(x, y)| acc.union(&BBox::new(x, y, x, y)),
        );
        Some(bbox)
    }

    fn finish_subpath(&mut self, closed: bool) {
        if self.points.len() >= 2 {
            match self.as_rect().filter(|_| closed && self.straight) {
                Some(bbox) => self.primitives.push(VectorPrimitive::rect(bbox)),
                None => self.emit_lines(closed),
            }
        }
        self.points.clear();
        self.straight = true;
    }

    fn flush(&mut self) {
        self.finish_subpath(false);
    }
}

impl PathWalker for SegmentWalker {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish_subpath(false);
        let p = self.transform(x, y);
        self.points.push(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.transform(x, y);
        self.points.push(p);
    }

    fn curve_to(&mut self, _cx1: f32, _cy1: f32, _cx2: f32, _cy2: f32, ex: f32, ey: f32) {
        // Curves are never table rules; restart from the curve's end point.
        self.finish_subpath(false);
        self.straight = false;
        let p = self.transform(ex, ey);
        self.points.push(p);
    }

    fn close(&mut self) {
        self.finish_subpath(true);
    }
}
