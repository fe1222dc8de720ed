/// Hover and committed-selection state
use crate::config::GridConfig;
use crate::fractal::{coords_text, decode, Address};
use crate::viewport::Point;

/// Address under the pointer, refreshed on every move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerState {
    world: Option<Point>,
    address: Address,
}

impl PointerState {
    pub fn update(&mut self, world: Point, config: &GridConfig) {
        self.address = decode(world.x, world.y, config);
        self.world = Some(world);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn world(&self) -> Option<Point> {
        self.world
    }

    /// Integer world cell under the pointer.
    pub fn cell(&self) -> Option<(u64, u64)> {
        self.world.map(|p| (p.x.max(0.0) as u64, p.y.max(0.0) as u64))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn label(&self) -> String {
        match self.cell() {
            Some((x, y)) => format!("Mouse: ({}, {})  Notes: {}", x, y, self.address),
            None => "Mouse: ...".to_string(),
        }
    }
}

/// The measure the user committed to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    coords: Option<(u64, u64)>,
    address: Address,
}

impl Selection {
    /// Select the cell containing `world`. On grids whose last level only
    /// splits x, y is snapped to the start of its unsplit 4-unit band.
    pub fn at(world: Point, config: &GridConfig) -> Self {
        let max = config.canvas_size() - 1;
        let x = (world.x.max(0.0) as u64).min(max);
        let mut y = (world.y.max(0.0) as u64).min(max);
        if config.has_partial_level() {
            y = y / 4 * 4;
        }
        Self {
            coords: Some((x, y)),
            address: decode(x as f64, y as f64, config),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn coords(&self) -> Option<(u64, u64)> {
        self.coords
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// `"x,y"`, empty when nothing is selected.
    pub fn coords_text(&self) -> String {
        self.coords
            .map(|(x, y)| coords_text(x, y))
            .unwrap_or_default()
    }

    pub fn notes_text(&self) -> String {
        self.address.notation()
    }

    pub fn label(&self) -> String {
        match self.coords {
            Some((x, y)) => format!("Selection: ({}, {})  Notes: {}", x, y, self.address),
            None => "Selection: ...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_tracks_address() {
        let config = GridConfig::new(4, 120).unwrap();
        let mut pointer = PointerState::default();
        assert_eq!(pointer.label(), "Mouse: ...");
        pointer.update(Point::new(5.7, 9.2), &config);
        assert_eq!(pointer.cell(), Some((5, 9)));
        assert_eq!(pointer.address().digits(), &[1, 2, 1, 1]);
        assert_eq!(pointer.label(), "Mouse: (5, 9)  Notes: SHSS");
        pointer.clear();
        assert!(pointer.world().is_none());
    }

    #[test]
    fn test_selection_exports() {
        let config = GridConfig::new(4, 120).unwrap();
        let selection = Selection::at(Point::new(5.5, 9.9), &config);
        assert_eq!(selection.coords_text(), "5,9");
        assert_eq!(selection.notes_text(), "SHSS");
        assert_eq!(selection.label(), "Selection: (5, 9)  Notes: SHSS");

        let empty = Selection::default();
        assert!(empty.is_empty());
        assert_eq!(empty.coords_text(), "");
        assert_eq!(empty.notes_text(), "");
    }

    #[test]
    fn test_selection_snaps_y_on_partial_level() {
        let config = GridConfig::new(5, 120).unwrap();
        let selection = Selection::at(Point::new(13.0, 22.0), &config);
        assert_eq!(selection.coords(), Some((13, 20)));
        assert_eq!(selection.address().len(), 5);
        assert_eq!(selection.address(), &decode(13.0, 22.0, &config));
    }

    #[test]
    fn test_selection_clamps_to_canvas() {
        let config = GridConfig::new(4, 120).unwrap();
        let selection = Selection::at(Point::new(99.0, -3.0), &config);
        assert_eq!(selection.coords(), Some((15, 0)));
    }
}
