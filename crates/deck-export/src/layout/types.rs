//! Layout data types
//!
//! These are the page descriptors handed from the layout engine to the
//! composer. Lengths are millimetres, origin at the page's top-left corner,
//! y growing downward.

use deck_model::CardKind;

use crate::types::{FoldAxis, LayoutMode, Rotation};

/// Which physical side of the printed sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSide {
    /// Front of the sheet (printed first in duplex)
    Front,
    /// Back of the sheet (printed second in duplex)
    Back,
}

/// Which face of the card a placement shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFace {
    Front,
    Back,
}

/// Artwork drawn into a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// The card's front image
    CardFront,
    /// The card's own back image
    CardBack,
    /// The deck's back for one card kind
    KindBack(CardKind),
    /// The deck's shared back image
    SharedBack,
}

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A rectangular area in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (top edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Grow the rect by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Smallest rect containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Card cell grid shared by every page of one layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Columns per block (per half in fold-and-glue mode)
    pub cols: usize,
    /// Rows per block (per half in fold-and-glue mode)
    pub rows: usize,
    /// Trimmed card size
    pub card_width_mm: f32,
    pub card_height_mm: f32,
    /// Bleed added on every side of each card
    pub bleed_mm: f32,
    /// Gap between neighbouring cells
    pub spacing_mm: f32,
}

impl GridLayout {
    /// Cell width including bleed
    pub fn cell_width_mm(&self) -> f32 {
        self.card_width_mm + 2.0 * self.bleed_mm
    }

    pub fn cell_height_mm(&self) -> f32 {
        self.card_height_mm + 2.0 * self.bleed_mm
    }

    /// Horizontal distance between neighbouring cell origins
    pub fn pitch_x_mm(&self) -> f32 {
        self.cell_width_mm() + self.spacing_mm
    }

    pub fn pitch_y_mm(&self) -> f32 {
        self.cell_height_mm() + self.spacing_mm
    }

    /// Size of the whole block of cells
    pub fn block_width_mm(&self) -> f32 {
        self.cols as f32 * self.cell_width_mm() + self.cols.saturating_sub(1) as f32 * self.spacing_mm
    }

    pub fn block_height_mm(&self) -> f32 {
        self.rows as f32 * self.cell_height_mm()
            + self.rows.saturating_sub(1) as f32 * self.spacing_mm
    }

    /// Cards (or fold pairs) per page
    pub fn slots_per_page(&self) -> usize {
        self.cols * self.rows
    }

    /// Row-major grid position of a slot
    pub fn position(&self, slot: usize) -> GridPosition {
        GridPosition::new(slot / self.cols, slot % self.cols)
    }
}

/// Final placement of one card image on a sheet face
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlacement {
    /// Index of the card in deck order
    pub card_index: usize,
    pub face: CardFace,
    /// Artwork to draw (None = blank back)
    pub source: Option<ImageSource>,
    /// Cell position within the face's grid
    pub grid_pos: GridPosition,
    /// Nominal card rectangle, the cut line
    pub trim_rect: Rect,
    /// Trim rect grown by the sheet bleed
    pub bleed_rect: Rect,
    pub rotation: Rotation,
    /// False when the artwork carries less bleed than the sheet asks for
    pub bleed_covered: bool,
}

/// All placements printed on one side of a sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFace {
    pub side: SheetSide,
    pub placements: Vec<CardPlacement>,
}

impl SheetFace {
    pub fn new(side: SheetSide) -> Self {
        Self {
            side,
            placements: Vec::new(),
        }
    }

    /// Bounds of all trim rects on this face
    pub fn trim_bounds(&self) -> Option<Rect> {
        self.placements
            .iter()
            .map(|p| p.trim_rect)
            .reduce(|a, b| a.union(&b))
    }
}

/// Where a fold-and-glue sheet is folded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldLine {
    pub axis: FoldAxis,
    /// x of a vertical line, y of a horizontal one
    pub position_mm: f32,
}

/// Page descriptor for one physical sheet
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Zero-based sheet number
    pub page_index: usize,
    pub mode: LayoutMode,
    /// Card fronts; in fold-and-glue mode also the rotated backs
    pub front: SheetFace,
    /// Card backs for two-sided printing
    pub back: Option<SheetFace>,
    pub fold_line: Option<FoldLine>,
    pub grid: GridLayout,
}

impl PageLayout {
    /// Faces in print order
    pub fn faces(&self) -> impl Iterator<Item = &SheetFace> {
        std::iter::once(&self.front).chain(self.back.as_ref())
    }

    /// Number of cards on this sheet
    pub fn card_count(&self) -> usize {
        self.front
            .placements
            .iter()
            .filter(|p| p.face == CardFace::Front)
            .count()
    }
}
