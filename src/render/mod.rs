/// Adaptive grid renderer - builds a backend-neutral scene in screen space
///
/// Grid levels are spaced `4^i` world units apart. A level is drawn only once
/// its on-screen spacing reaches `GRID_VISIBLE_PX`, fading in until
/// `GRID_OPAQUE_PX`. Lines are generated only for the visible part of the
/// canvas, so the cost depends on the screen size and not on the canvas size.
use crate::config::GridConfig;
use crate::fractal::{nested_boxes, CellBox, NoteSymbol};
use crate::viewport::{Point, Viewport};

pub const GRID_VISIBLE_PX: f64 = 5.0;
pub const GRID_OPAQUE_PX: f64 = 15.0;

pub const LIGHTEST_GRIDLINE: f32 = 0.9;
pub const DARKEST_GRIDLINE: f32 = 0.1;
pub const BACKGROUND: f32 = 1.0;

pub const GRID_LINE_WIDTH: f32 = 1.0;
pub const OUTLINE_WIDTH: f32 = 2.0;
pub const NOTE_FILL_ALPHA: f32 = 0.25;

// Screen-space slack kept around the view when clipping rectangles
const CLIP_MARGIN: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(level: f32) -> Self {
        Self::new(level, level, level, 1.0)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }
}

/// Outline/fill colour for a digit's symbol. Unknown digits get a neutral gray.
pub fn note_color(symbol: Option<NoteSymbol>) -> Rgba {
    match symbol {
        Some(NoteSymbol::Bass) => Rgba::new(0.8, 0.2, 0.2, 1.0),
        Some(NoteSymbol::Snare) => Rgba::new(0.2, 0.8, 0.2, 1.0),
        Some(NoteSymbol::HiHat) => Rgba::new(0.2, 0.2, 0.8, 1.0),
        Some(NoteSymbol::Rest) => Rgba::new(1.0, 0.48, 0.0, 1.0),
        None => Rgba::new(0.5, 0.5, 0.5, 1.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    fn from_corners(min: Point, max: Point) -> Self {
        Self {
            x: min.x,
            y: min.y,
            w: max.x - min.x,
            h: max.y - min.y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    fn clipped(&self, width: f64, height: f64) -> Self {
        let x0 = self.x.max(-CLIP_MARGIN);
        let y0 = self.y.max(-CLIP_MARGIN);
        let x1 = (self.x + self.w).min(width + CLIP_MARGIN);
        let y1 = (self.y + self.h).min(height + CLIP_MARGIN);
        Self::from_corners(Point::new(x0, y0), Point::new(x1, y1))
    }
}

/// One level of the grid that passed the visibility threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLevel {
    /// Line spacing in world units.
    pub spacing: u64,
    pub color: Rgba,
    pub lines: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteBox {
    /// Position of the digit in the address.
    pub index: usize,
    pub digit: u8,
    pub cell: CellBox,
    pub rect: ScreenRect,
    pub fill: Rgba,
    pub outline: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: ScreenRect,
    pub grid: Vec<GridLevel>,
    pub border: ScreenRect,
    pub border_color: Rgba,
    /// Outermost box first.
    pub notes: Vec<NoteBox>,
}

/// Spacing and gray tone of every grid level visible at `zoom`, finest first.
pub fn visible_levels(canvas_size: u64, zoom: f64) -> Vec<(u64, f32)> {
    let mut sizes = Vec::new();
    let mut size = 1u64;
    while size <= canvas_size {
        sizes.push(size);
        size *= 4;
    }

    let n = sizes.len();
    sizes
        .iter()
        .enumerate()
        .filter_map(|(i, &spacing)| {
            let spacing_px = spacing as f64 * zoom;
            if spacing_px < GRID_VISIBLE_PX {
                return None;
            }
            let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
            let mut tone = LIGHTEST_GRIDLINE * (1.0 - t) + DARKEST_GRIDLINE * t;
            if spacing_px < GRID_OPAQUE_PX {
                let fade = ((spacing_px - GRID_VISIBLE_PX) / (GRID_OPAQUE_PX - GRID_VISIBLE_PX)) as f32;
                tone = tone * fade + BACKGROUND * (1.0 - fade);
            }
            Some((spacing, tone))
        })
        .collect()
}

/// Build the frame for a `width` x `height` view.
pub fn render(
    viewport: &Viewport,
    config: &GridConfig,
    revealed: &[u8],
    width: f64,
    height: f64,
) -> Scene {
    let canvas = config.canvas_size();
    let canvas_rect = ScreenRect::from_corners(
        viewport.world_to_screen(Point::new(0.0, 0.0)),
        viewport.world_to_screen(Point::new(canvas as f64, canvas as f64)),
    )
    .clipped(width, height);

    let grid = visible_levels(canvas, viewport.zoom())
        .into_iter()
        .map(|(spacing, tone)| GridLevel {
            spacing,
            color: Rgba::gray(tone),
            // y is never split below 4 units when the last level is x-only
            lines: grid_lines(
                viewport,
                spacing,
                width,
                height,
                !(config.has_partial_level() && spacing == 1),
            ),
        })
        .collect();

    let notes = nested_boxes(revealed, canvas)
        .into_iter()
        .enumerate()
        .filter_map(|(index, (digit, cell))| {
            let rect = cell_rect(viewport, &cell).clipped(width, height);
            if rect.is_empty() {
                return None;
            }
            let color = note_color(NoteSymbol::from_digit(digit));
            Some(NoteBox {
                index,
                digit,
                cell,
                rect,
                fill: color.with_alpha(NOTE_FILL_ALPHA),
                outline: color,
            })
        })
        .collect();

    Scene {
        background: canvas_rect,
        grid,
        border: canvas_rect,
        border_color: Rgba::gray(DARKEST_GRIDLINE),
        notes,
    }
}

fn cell_rect(viewport: &Viewport, cell: &CellBox) -> ScreenRect {
    ScreenRect::from_corners(
        viewport.world_to_screen(Point::new(cell.x as f64, cell.y as f64)),
        viewport.world_to_screen(Point::new(cell.right() as f64, cell.bottom() as f64)),
    )
}

fn grid_lines(
    viewport: &Viewport,
    spacing: u64,
    width: f64,
    height: f64,
    horizontal: bool,
) -> Vec<Segment> {
    let visible = viewport.visible_world(width, height);
    if visible.right <= visible.left || visible.bottom <= visible.top {
        return Vec::new();
    }

    let first_x = (visible.left / spacing as f64).ceil() as u64 * spacing;
    let first_y = (visible.top / spacing as f64).ceil() as u64 * spacing;
    let top = viewport.world_to_screen(Point::new(0.0, visible.top)).y;
    let bottom = viewport.world_to_screen(Point::new(0.0, visible.bottom)).y;
    let left = viewport.world_to_screen(Point::new(visible.left, 0.0)).x;
    let right = viewport.world_to_screen(Point::new(visible.right, 0.0)).x;

    let mut lines = Vec::new();
    let mut x = first_x;
    while x as f64 <= visible.right {
        let sx = viewport.world_to_screen(Point::new(x as f64, 0.0)).x;
        lines.push(Segment {
            from: Point::new(sx, top),
            to: Point::new(sx, bottom),
        });
        x += spacing;
    }
    if horizontal {
        let mut y = first_y;
        while y as f64 <= visible.bottom {
            let sy = viewport.world_to_screen(Point::new(0.0, y as f64)).y;
            lines.push(Segment {
                from: Point::new(left, sy),
                to: Point::new(right, sy),
            });
            y += spacing;
        }
    }
    lines
}
