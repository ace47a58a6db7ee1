//! Integer geometry primitives shared by the topology, planner and platform layers.
//!
//! Widths and heights are signed: the planner uses `-1` as an "unset" marker in a
//! few bookkeeping records, matching how the windowing system reports them.

use serde::{Deserialize, Serialize};

/// A point in root-window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Rectangle for window and monitor geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Overlapping area, if any
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rectangle::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Manhattan distance from `point` to the nearest edge; zero when inside
    pub fn distance_to(&self, point: Point) -> i64 {
        let dx = if point.x < self.x {
            self.x - point.x
        } else if point.x >= self.right() {
            point.x - self.right() + 1
        } else {
            0
        };
        let dy = if point.y < self.y {
            self.y - point.y
        } else if point.y >= self.bottom() {
            point.y - self.bottom() + 1
        } else {
            0
        };
        i64::from(dx) + i64::from(dy)
    }
}

/// Clamp a span `[base, base + extent)` into `[clamp_base, clamp_base + clamp_extent)`.
///
/// A span larger than the target is centered on it; otherwise it is pushed in
/// from whichever edge it overflows, preferring the leading edge.
pub fn clamp_span(base: i32, extent: i32, clamp_base: i32, clamp_extent: i32) -> i32 {
    if extent > clamp_extent {
        clamp_base + clamp_extent / 2 - extent / 2
    } else if base < clamp_base {
        clamp_base
    } else if base + extent > clamp_base + clamp_extent {
        clamp_base + clamp_extent - extent
    } else {
        base
    }
}

/// Clamp a window at `origin` with `size` onto `area` along both axes
pub fn clamp_window_to_rectangle(origin: Point, size: Size, area: &Rectangle) -> Point {
    Point::new(
        clamp_span(origin.x, size.width, area.x, area.width),
        clamp_span(origin.y, size.height, area.y, area.height),
    )
}
