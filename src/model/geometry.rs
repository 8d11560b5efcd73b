//! Pixel-space rectangles.

use serde::{Deserialize, Serialize};

use crate::units;

/// Axis-aligned rectangle in layout pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-size placeholder at the origin.
    pub const fn placeholder() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// A rectangle with no area carries no position signal.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Whether two rectangles share interior area.
    ///
    /// Edges are half-open, so boxes that only touch do not intersect, and an
    /// empty rectangle never intersects anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: i32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }

    /// Cut off any part lying left of or above the origin.
    pub fn clamp_to_origin(&self) -> Rect {
        let x = self.x.max(0);
        let y = self.y.max(0);
        Rect::new(
            x,
            y,
            (self.right() - x).max(0),
            (self.bottom() - y).max(0),
        )
    }

    /// Map from one resolution to another, truncating every edge.
    pub fn rescale(&self, from_dpi: f32, to_dpi: f32) -> Rect {
        let scale = |v: i32| units::rescale(v, from_dpi, to_dpi);
        Rect::new(
            scale(self.x),
            scale(self.y),
            scale(self.width),
            scale(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(Rect::placeholder().is_empty());
        assert!(Rect::new(5, 5, 0, 10).is_empty());
        assert!(Rect::new(5, 5, 10, -1).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let c = Rect::new(10, 0, 5, 5);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        // Touching edges only
        assert!(!a.intersects(&c));
        // Placeholders never relate
        assert!(!a.intersects(&Rect::placeholder()));
        assert!(!Rect::placeholder().intersects(&Rect::placeholder()));
    }

    #[test]
    fn test_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 5, 5, 20);
        assert_eq!(a.union(&b), Rect::new(0, 0, 25, 25));
        assert_eq!(a.union(&Rect::placeholder()), a);
    }

    #[test]
    fn test_expand_and_clamp() {
        let r = Rect::new(30, 100, 40, 10).expand(50);
        assert_eq!(r, Rect::new(-20, 50, 140, 110));
        assert_eq!(r.clamp_to_origin(), Rect::new(0, 50, 120, 110));
    }

    #[test]
    fn test_rescale() {
        let r = Rect::new(150, 300, 75, 150);
        assert_eq!(r.rescale(150.0, 96.0), Rect::new(96, 192, 48, 96));
        assert_eq!(r.rescale(0.0, 96.0), Rect::placeholder());
    }
}
