/// Pan/zoom viewport - screen pixels <-> canvas world units
///
/// `screen = (world - offset) * zoom`, where `offset` is the world point shown
/// at the screen origin.

pub const MIN_ZOOM: f64 = 0.00001;
pub const MAX_ZOOM: f64 = 60.0;

/// Zoom multiplier per scroll step.
pub const ZOOM_STEP: f64 = 1.1;

/// Nominal viewport used for the initial placement.
pub const DEFAULT_VIEW_WIDTH: f64 = 800.0;
pub const DEFAULT_VIEW_HEIGHT: f64 = 600.0;

// Calibration anchors for the initial zoom: canvas side -> zoom
const SMALL_CANVAS: (f64, f64) = (256.0, 2.0);
const LARGE_CANVAS: (f64, f64) = (65535.0, 0.008);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// World-space rectangle, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: f64,
    offset: Point,
    canvas_size: u64,
}

impl Viewport {
    /// Whole canvas visible and centred in the nominal 800x600 view.
    pub fn new(canvas_size: u64) -> Self {
        Self::initial(canvas_size, DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT)
    }

    pub fn initial(canvas_size: u64, view_width: f64, view_height: f64) -> Self {
        let zoom = initial_zoom(canvas_size);
        let half = canvas_size as f64 / 2.0;
        Self {
            zoom,
            offset: Point::new(half - (view_width / 2.0) / zoom, half - (view_height / 2.0) / zoom),
            canvas_size,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.canvas_size);
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn canvas_size(&self) -> u64 {
        self.canvas_size
    }

    /// Screen point to world point, clamped to `[0, canvas_size - 1]`.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        let world = self.screen_to_world_unclamped(screen);
        let max = self.canvas_size.saturating_sub(1) as f64;
        Point::new(world.x.clamp(0.0, max), world.y.clamp(0.0, max))
    }

    pub fn screen_to_world_unclamped(&self, screen: Point) -> Point {
        Point::new(
            screen.x / self.zoom + self.offset.x,
            screen.y / self.zoom + self.offset.y,
        )
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            (world.x - self.offset.x) * self.zoom,
            (world.y - self.offset.y) * self.zoom,
        )
    }

    /// Drag the view by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset.x -= dx / self.zoom;
        self.offset.y -= dy / self.zoom;
    }

    /// Set the zoom while keeping the world point under `pivot` fixed.
    /// Out-of-range zoom is clamped.
    pub fn zoom_at(&mut self, zoom: f64, pivot: Point) {
        if zoom.is_nan() {
            return;
        }
        let anchor = self.screen_to_world_unclamped(pivot);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = Point::new(
            anchor.x - pivot.x / self.zoom,
            anchor.y - pivot.y / self.zoom,
        );
    }

    /// Positive steps zoom in by `ZOOM_STEP` each, negative steps zoom out.
    pub fn scroll(&mut self, steps: i32, pivot: Point) {
        if steps != 0 {
            self.zoom_at(self.zoom * ZOOM_STEP.powi(steps), pivot);
        }
    }

    /// World area covered by a `width` x `height` screen, intersected with the canvas.
    pub fn visible_world(&self, width: f64, height: f64) -> WorldRect {
        let top_left = self.screen_to_world_unclamped(Point::new(0.0, 0.0));
        let bottom_right = self.screen_to_world_unclamped(Point::new(width, height));
        let canvas = self.canvas_size as f64;
        WorldRect {
            left: top_left.x.clamp(0.0, canvas),
            top: top_left.y.clamp(0.0, canvas),
            right: bottom_right.x.clamp(0.0, canvas),
            bottom: bottom_right.y.clamp(0.0, canvas),
        }
    }
}

/// Log-linear interpolation between the calibration anchors, clamped to the zoom bounds.
pub fn initial_zoom(canvas_size: u64) -> f64 {
    let (small_c, small_z) = SMALL_CANVAS;
    let (large_c, large_z) = LARGE_CANVAS;
    let t = ((canvas_size as f64).ln() - small_c.ln()) / (large_c.ln() - small_c.ln());
    let log_zoom = small_z.ln() + t * (large_z.ln() - small_z.ln());
    log_zoom.exp().clamp(MIN_ZOOM, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_initial_zoom_anchors() {
        assert!(close(initial_zoom(256), 2.0));
        assert!(close(initial_zoom(65535), 0.008));
        assert!(initial_zoom(16) > 2.0 && initial_zoom(16) <= MAX_ZOOM);
        assert!(initial_zoom(4u64.pow(16)) >= MIN_ZOOM);
    }

    #[test]
    fn test_initial_placement_centres_canvas() {
        for canvas in [16u64, 256, 65536, 4u64.pow(12)] {
            let view = Viewport::new(canvas);
            let half = canvas as f64 / 2.0;
            let centre = view.world_to_screen(Point::new(half, half));
            assert!(close(centre.x, DEFAULT_VIEW_WIDTH / 2.0));
            assert!(close(centre.y, DEFAULT_VIEW_HEIGHT / 2.0));
        }
    }

    #[test]
    fn test_screen_to_world_clamps() {
        let view = Viewport::new(256);
        let far = view.screen_to_world(Point::new(1e9, -1e9));
        assert_eq!(far, Point::new(255.0, 0.0));
    }

    #[test]
    fn test_inverse_transform() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut view = Viewport::new(65536);
            let zoom = rng.gen_range(MIN_ZOOM..=MAX_ZOOM);
            view.zoom_at(zoom, Point::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0)));
            view.pan(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0));
            let screen = Point::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0));
            let back = view.world_to_screen(view.screen_to_world_unclamped(screen));
            assert!((back.x - screen.x).abs() < 1e-6, "{:?} vs {:?}", back, screen);
            assert!((back.y - screen.y).abs() < 1e-6, "{:?} vs {:?}", back, screen);
        }
    }

    #[test]
    fn test_pan_moves_world_under_cursor() {
        let mut view = Viewport::new(256);
        let before = view.screen_to_world_unclamped(Point::new(100.0, 100.0));
        view.pan(20.0, -10.0);
        let after = view.screen_to_world_unclamped(Point::new(120.0, 90.0));
        assert!(close(before.x, after.x));
        assert!(close(before.y, after.y));
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let mut view = Viewport::new(1024);
        let pivot = Point::new(312.0, 77.0);
        let before = view.screen_to_world_unclamped(pivot);
        view.scroll(3, pivot);
        let after = view.screen_to_world_unclamped(pivot);
        assert!(close(before.x, after.x));
        assert!(close(before.y, after.y));
        assert!(close(view.zoom(), initial_zoom(1024) * 1.1f64.powi(3)));
    }

    #[test]
    fn test_zoom_stays_in_bounds() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut view = Viewport::new(4096);
        for _ in 0..2000 {
            let steps = rng.gen_range(-40..=40);
            view.scroll(steps, Point::new(400.0, 300.0));
            assert!(view.zoom() >= MIN_ZOOM && view.zoom() <= MAX_ZOOM);
        }
        view.zoom_at(1e12, Point::default());
        assert_eq!(view.zoom(), MAX_ZOOM);
        view.zoom_at(0.0, Point::default());
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_visible_world_is_clipped_to_canvas() {
        let view = Viewport::new(16);
        let rect = view.visible_world(800.0, 600.0);
        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.right, 16.0);
        assert_eq!(rect.bottom, 16.0);
    }

    #[test]
    fn test_reset_restores_initial_placement() {
        let mut view = Viewport::new(256);
        view.pan(50.0, 50.0);
        view.scroll(-5, Point::new(10.0, 10.0));
        view.reset();
        assert_eq!(view, Viewport::new(256));
    }
}
