pub mod backend;
pub mod config_file;

pub use backend::{BackendError, InMemoryPages, PageSource, PdfBackend};

/// An axis-aligned rectangle in page units, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when all four edges of `inner` lie strictly inside `self`.
    /// A box that merely touches an edge is not contained.
    pub fn strictly_contains(&self, inner: &BBox) -> bool {
        inner.x0 > self.x0 && inner.y0 > self.y0 && inner.x1 < self.x1 && inner.y1 < self.y1
    }

    /// Grow the box by `d` units on every side.
    pub fn inflate(&self, d: f32) -> BBox {
        BBox::new(self.x0 - d, self.y0 - d, self.x1 + d, self.y1 + d)
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

/// A single word token with its box and the page it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub bbox: BBox,
    pub text: String,
    pub page: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BBox, page: usize) -> Self {
        Self {
            bbox,
            text: text.into(),
            page,
        }
    }
}

/// Writing direction of a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    /// Left to right.
    #[default]
    Horizontal,
    /// Rotated a quarter turn, text running bottom to top.
    Vertical,
    Other,
}

/// A run of text sharing one baseline, as the layout engine grouped it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub bbox: BBox,
    pub direction: TextDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Line,
    Rect,
}

/// A straight line or rectangle drawn as vector graphics on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorPrimitive {
    pub kind: PrimitiveKind,
    pub bbox: BBox,
}

impl VectorPrimitive {
    pub fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            kind: PrimitiveKind::Line,
            bbox: BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
        }
    }

    pub fn rect(bbox: BBox) -> Self {
        Self {
            kind: PrimitiveKind::Rect,
            bbox,
        }
    }
}

/// Everything the pipeline needs to know about one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// 0-based page index.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Words in the order the backend produced them.
    pub words: Vec<Word>,
    pub spans: Vec<TextSpan>,
    pub primitives: Vec<VectorPrimitive>,
    pub raw_text: String,
}

impl PageLayout {
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            ..Default::default()
        }
    }

    /// The full page rectangle.
    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }
}
