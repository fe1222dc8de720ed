/// Fractal addressing - maps canvas points to drum note digits and back
///
/// The canvas is a square of side `4^levels`. Each level quarters the current
/// cell along both axes and contributes two base-4 digits: the x quadrant
/// followed by the y quadrant. Both digits of a level share the same divisor,
/// so an address is the pairwise interleave of the base-4 expansions of x and y.
use std::fmt;

use crate::config::GridConfig;

/// Drum voice selected by a digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteSymbol {
    Bass,
    Snare,
    HiHat,
    Rest,
}

impl NoteSymbol {
    pub const ALL: [NoteSymbol; 4] = [Self::Bass, Self::Snare, Self::HiHat, Self::Rest];

    /// `None` for digits outside 0..=3.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Bass),
            1 => Some(Self::Snare),
            2 => Some(Self::HiHat),
            3 => Some(Self::Rest),
            _ => None,
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            Self::Bass => 0,
            Self::Snare => 1,
            Self::HiHat => 2,
            Self::Rest => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Bass => 'B',
            Self::Snare => 'S',
            Self::HiHat => 'H',
            Self::Rest => '-',
        }
    }

    pub fn is_audible(self) -> bool {
        self != Self::Rest
    }
}

/// Letter for a raw digit, `?` when it has no symbol.
pub fn digit_letter(digit: u8) -> char {
    NoteSymbol::from_digit(digit).map_or('?', NoteSymbol::letter)
}

/// Ordered digits from the coarsest level to the finest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap raw digits without checking their range.
    pub fn from_digits(digits: Vec<u8>) -> Self {
        Self(digits)
    }

    pub fn digits(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    pub fn prefix(&self, len: usize) -> &[u8] {
        &self.0[..len.min(self.0.len())]
    }

    pub fn symbols(&self) -> impl Iterator<Item = Option<NoteSymbol>> + '_ {
        self.0.iter().map(|&d| NoteSymbol::from_digit(d))
    }

    /// `B`/`S`/`H`/`-` per digit, `?` for malformed ones.
    pub fn notation(&self) -> String {
        self.0.iter().map(|&d| digit_letter(d)).collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}

/// Decode a world-space point into a full address.
///
/// The point is clamped to `[0, canvas_size)` on both axes. On grids with an
/// odd digit count the last level yields only its x digit.
pub fn decode(x: f64, y: f64, config: &GridConfig) -> Address {
    let canvas = config.canvas_size();
    let length = config.address_length();
    let mut tx = clamp_axis(x, canvas);
    let mut ty = clamp_axis(y, canvas);

    let mut digits = Vec::with_capacity(length);
    let mut cell = canvas / 4;
    while cell >= 1 && digits.len() < length {
        digits.push((tx / cell) as u8);
        if digits.len() < length {
            digits.push((ty / cell) as u8);
        }
        tx %= cell;
        ty %= cell;
        cell /= 4;
    }
    Address(digits)
}

fn clamp_axis(value: f64, canvas: u64) -> u64 {
    // max() also maps NaN to zero
    value.floor().max(0.0).min((canvas - 1) as f64) as u64
}

/// Axis-aligned cell in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBox {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

impl CellBox {
    pub fn right(&self) -> u64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u64 {
        self.y + self.height
    }

    pub fn contains_point(&self, x: u64, y: u64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains(&self, other: &CellBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Bounding box denoted by an address prefix.
///
/// Even digit indices narrow the x axis, odd ones the y axis. The empty prefix
/// is the whole canvas. Digits above 3 are treated as 3 so the box never
/// leaves its parent; digits beyond the finest level are ignored.
pub fn prefix_box(prefix: &[u8], canvas_size: u64) -> CellBox {
    let mut cell = CellBox {
        x: 0,
        y: 0,
        width: canvas_size,
        height: canvas_size,
    };
    for (i, &digit) in prefix.iter().enumerate() {
        narrow(&mut cell, i, digit);
    }
    cell
}

/// The box after each digit of `prefix`, outermost first.
pub fn nested_boxes(prefix: &[u8], canvas_size: u64) -> Vec<(u8, CellBox)> {
    let mut cell = prefix_box(&[], canvas_size);
    prefix
        .iter()
        .enumerate()
        .map(|(i, &digit)| {
            narrow(&mut cell, i, digit);
            (digit, cell)
        })
        .collect()
}

fn narrow(cell: &mut CellBox, index: usize, digit: u8) {
    let quadrant = u64::from(digit.min(3));
    if index % 2 == 0 {
        if cell.width >= 4 {
            cell.width /= 4;
            cell.x += quadrant * cell.width;
        }
    } else if cell.height >= 4 {
        cell.height /= 4;
        cell.y += quadrant * cell.height;
    }
}

/// `"x,y"` form of a world coordinate for the clipboard.
pub fn coords_text(x: u64, y: u64) -> String {
    format!("{},{}", x, y)
}
