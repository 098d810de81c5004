//! Axis-aligned rectangles in stimulus coordinates.

/// Axis-aligned rectangle with half-open extent.
///
/// Coordinates use the screen convention: `x` grows to the right, `y` grows
/// downward, and `(start_x, start_y)` is the top-left corner.
///
/// # Examples
///
/// ```
/// use gazekit_core::Rect;
///
/// let rect = Rect::from_size(10.0, 20.0, 5.0, 5.0);
/// assert!(rect.contains(10.0, 20.0));
/// assert!(!rect.contains(15.0, 25.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Rect {
    #[inline]
    #[must_use = "creates a new rectangle"]
    pub const fn from_corners(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    #[inline]
    #[must_use = "creates a new rectangle"]
    pub fn from_size(start_x: f64, start_y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(start_x, start_y, start_x + width, start_y + height)
    }

    #[inline]
    #[must_use = "returns the width of the rectangle"]
    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    #[inline]
    #[must_use = "returns the height of the rectangle"]
    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }

    /// Whether all four coordinates are finite.
    #[inline]
    #[must_use = "returns whether the rectangle is finite"]
    pub fn is_finite(&self) -> bool {
        self.start_x.is_finite()
            && self.start_y.is_finite()
            && self.end_x.is_finite()
            && self.end_y.is_finite()
    }

    /// Half-open containment: the start edges belong to the rectangle, the
    /// end edges do not. Adjacent AOIs therefore never both contain a point
    /// on their shared edge.
    #[inline]
    #[must_use = "returns whether the point lies inside the rectangle"]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.start_x <= x && x < self.end_x && self.start_y <= y && y < self.end_y
    }
}
