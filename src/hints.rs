//! Geometry hints: the resize constraints a toplevel advertises to the window manager.
//!
//! Hints are rebuilt from scratch on every configure pass and compared against the
//! last set sent, so the platform only hears about them when something changed.

use bitflags::bitflags;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::geometry::Size;
use crate::layout::{LayoutEngine, WidgetId};

bitflags! {
    /// Which fields of a [`GeometryHints`] record are meaningful
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HintFlags: u32 {
        const POS = 1 << 0;
        const MIN_SIZE = 1 << 1;
        const MAX_SIZE = 1 << 2;
        const BASE_SIZE = 1 << 3;
        const ASPECT = 1 << 4;
        const RESIZE_INC = 1 << 5;
        const WIN_GRAVITY = 1 << 6;
        const USER_POS = 1 << 7;
        const USER_SIZE = 1 << 8;
    }
}

/// Reference point of a window that a requested position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

/// A geometry hints record as sent to the platform
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryHints {
    pub flags: HintFlags,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub win_gravity: Gravity,
}

/// `x` clamped to `[low, high]`, with `high` winning when the bounds cross
pub(crate) fn clamp_high_wins(x: i32, low: i32, high: i32) -> i32 {
    if x > high {
        high
    } else if x < low {
        low
    } else {
        x
    }
}

/// `value` rounded toward zero to a multiple of `base`
fn floor_to(value: f64, base: i32) -> i32 {
    (value / f64::from(base)) as i32 * base
}

impl GeometryHints {
    pub fn with_min_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::MIN_SIZE;
        self.min_width = width;
        self.min_height = height;
        self
    }

    pub fn with_max_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::MAX_SIZE;
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_base_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::BASE_SIZE;
        self.base_width = width;
        self.base_height = height;
        self
    }

    pub fn with_resize_inc(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::RESIZE_INC;
        self.width_inc = width;
        self.height_inc = height;
        self
    }

    pub fn with_aspect(mut self, min_aspect: f64, max_aspect: f64) -> Self {
        self.flags |= HintFlags::ASPECT;
        self.min_aspect = min_aspect;
        self.max_aspect = max_aspect;
        self
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.flags |= HintFlags::WIN_GRAVITY;
        self.win_gravity = gravity;
        self
    }

    /// Two records are equivalent when their flag sets match and every field
    /// covered by a present flag matches exactly. Fields under absent flags are
    /// ignored.
    pub fn equivalent(&self, other: &GeometryHints) -> bool {
        if self.flags != other.flags {
            return false;
        }

        let flags = self.flags;
        if flags.contains(HintFlags::MIN_SIZE)
            && (self.min_width != other.min_width || self.min_height != other.min_height)
        {
            return false;
        }
        if flags.contains(HintFlags::MAX_SIZE)
            && (self.max_width != other.max_width || self.max_height != other.max_height)
        {
            return false;
        }
        if flags.contains(HintFlags::BASE_SIZE)
            && (self.base_width != other.base_width || self.base_height != other.base_height)
        {
            return false;
        }
        if flags.contains(HintFlags::ASPECT)
            && (self.min_aspect != other.min_aspect || self.max_aspect != other.max_aspect)
        {
            return false;
        }
        if flags.contains(HintFlags::RESIZE_INC)
            && (self.width_inc != other.width_inc || self.height_inc != other.height_inc)
        {
            return false;
        }
        if flags.contains(HintFlags::WIN_GRAVITY) && self.win_gravity != other.win_gravity {
            return false;
        }

        true
    }

    /// Convert a size in geometry units (for example character cells) to pixels:
    /// `units * increment + base`, floored at the minimum size and saturating at
    /// `i32::MAX`.
    pub fn units_to_pixels(&self, width: Option<i32>, height: Option<i32>) -> (Option<i32>, Option<i32>) {
        let (base_width, base_height) = if self.flags.contains(HintFlags::BASE_SIZE) {
            (self.base_width, self.base_height)
        } else {
            (0, 0)
        };
        let (min_width, min_height) = if self.flags.contains(HintFlags::MIN_SIZE) {
            (self.min_width, self.min_height)
        } else {
            (0, 0)
        };
        let (width_inc, height_inc) = if self.flags.contains(HintFlags::RESIZE_INC) {
            (self.width_inc, self.height_inc)
        } else {
            (1, 1)
        };

        (
            width.map(|w| {
                w.saturating_mul(width_inc)
                    .saturating_add(base_width)
                    .max(min_width)
            }),
            height.map(|h| {
                h.saturating_mul(height_inc)
                    .saturating_add(base_height)
                    .max(min_height)
            }),
        )
    }

    /// Constrain a size the way an ICCCM window manager would: clamp to the
    /// min/max bounds, snap to `base + n * increment`, then pull the result into
    /// the aspect ratio range without leaving the size bounds.
    pub fn constrain_size(&self, width: i32, height: i32) -> Size {
        let flags = self.flags;
        let mut min_width = 0;
        let mut min_height = 0;
        let mut base_width = 0;
        let mut base_height = 0;
        let mut xinc = 1;
        let mut yinc = 1;
        let mut max_width = i32::MAX;
        let mut max_height = i32::MAX;

        if flags.contains(HintFlags::BASE_SIZE | HintFlags::MIN_SIZE) {
            base_width = self.base_width;
            base_height = self.base_height;
            min_width = self.min_width;
            min_height = self.min_height;
        } else if flags.contains(HintFlags::BASE_SIZE) {
            base_width = self.base_width;
            base_height = self.base_height;
            min_width = self.base_width;
            min_height = self.base_height;
        } else if flags.contains(HintFlags::MIN_SIZE) {
            base_width = self.min_width;
            base_height = self.min_height;
            min_width = self.min_width;
            min_height = self.min_height;
        }

        if flags.contains(HintFlags::MAX_SIZE) {
            max_width = self.max_width;
            max_height = self.max_height;
        }

        if flags.contains(HintFlags::RESIZE_INC) {
            xinc = xinc.max(self.width_inc);
            yinc = yinc.max(self.height_inc);
        }

        let mut width = clamp_high_wins(width, min_width, max_width);
        let mut height = clamp_high_wins(height, min_height, max_height);

        width = base_width + floor_to(f64::from(width - base_width), xinc);
        height = base_height + floor_to(f64::from(height - base_height), yinc);

        if flags.contains(HintFlags::ASPECT) && self.min_aspect > 0.0 && self.max_aspect > 0.0 {
            let with_base = flags.contains(HintFlags::BASE_SIZE);
            if with_base {
                width -= base_width;
                height -= base_height;
                min_width -= base_width;
                min_height -= base_height;
                max_width = max_width.saturating_sub(base_width);
                max_height = max_height.saturating_sub(base_height);
            }

            if self.min_aspect * f64::from(height) > f64::from(width) {
                let delta = floor_to(f64::from(height) - f64::from(width) / self.min_aspect, yinc);
                if height - delta >= min_height {
                    height -= delta;
                } else {
                    let delta = floor_to(f64::from(height) * self.min_aspect - f64::from(width), xinc);
                    if width + delta <= max_width {
                        width += delta;
                    }
                }
            }

            if self.max_aspect * f64::from(height) < f64::from(width) {
                let delta = floor_to(f64::from(width) - f64::from(height) * self.max_aspect, xinc);
                if width - delta >= min_width {
                    width -= delta;
                } else {
                    let delta = floor_to(f64::from(width) / self.max_aspect - f64::from(height), yinc);
                    if height + delta <= max_height {
                        height += delta;
                    }
                }
            }

            if with_base {
                width += base_width;
                height += base_height;
            }
        }

        Size::new(width, height)
    }
}

/// Everything [`compute_hints`] needs to know about the window
#[derive(Debug, Clone, Copy)]
pub struct HintInputs<'a> {
    /// Hints set by the application, gravity already stripped
    pub app_hints: Option<&'a GeometryHints>,
    /// Widget the app hints describe, if not the whole window
    pub geometry_widget: Option<WidgetId>,
    pub window_widget: WidgetId,
    pub gravity: Gravity,
    /// Size to pin as both requisition and maximum for non-resizable windows
    pub fixed_size: Option<Size>,
    /// Sentinel forced onto the geometry widget while measuring chrome
    pub probe_size: i32,
}

/// Pixel overhead the rest of the window adds around the geometry widget
fn geometry_widget_overhead(
    layout: &mut dyn LayoutEngine,
    window: WidgetId,
    geometry_widget: WidgetId,
    probe: i32,
) -> (i32, i32) {
    let (saved_width, saved_height) = layout.size_request(geometry_widget);
    layout.set_size_request(geometry_widget, probe, probe);
    let requisition = layout.measure(window);
    layout.set_size_request(geometry_widget, saved_width, saved_height);

    let extra_width = requisition.min_width - probe;
    let extra_height = requisition.min_height - probe;
    if extra_width < 0 || extra_height < 0 {
        warn!(
            "Window size does not track geometry widget {} (overhead {}x{}); is it packed into the window?",
            geometry_widget, extra_width, extra_height
        );
    }
    (extra_width.max(0), extra_height.max(0))
}

/// Build the hints record for a window from its app-set hints and current size request
pub fn compute_hints(inputs: &HintInputs<'_>, layout: &mut dyn LayoutEngine) -> GeometryHints {
    let measured = layout.measure(inputs.window_widget);
    let mut requisition = Size::new(measured.min_width, measured.min_height);

    let mut hints = inputs.app_hints.copied().unwrap_or_default();

    let (extra_width, extra_height) = match inputs.geometry_widget {
        Some(widget) => {
            geometry_widget_overhead(layout, inputs.window_widget, widget, inputs.probe_size)
        }
        None => (0, 0),
    };

    if hints.flags.contains(HintFlags::BASE_SIZE) {
        hints.base_width += extra_width;
        hints.base_height += extra_height;
    } else {
        hints.flags |= HintFlags::BASE_SIZE;
        hints.base_width = extra_width;
        hints.base_height = extra_height;

        // Without a base size the window manager measures increments from the minimum
        if hints.flags.contains(HintFlags::MIN_SIZE) {
            if hints.min_width > 0 {
                hints.base_width += hints.min_width;
            }
            if hints.min_height > 0 {
                hints.base_height += hints.min_height;
            }
        }
    }

    if let Some(fixed) = inputs.fixed_size {
        requisition = fixed;
    }

    if hints.flags.contains(HintFlags::MIN_SIZE) {
        hints.min_width = if hints.min_width < 0 {
            requisition.width
        } else {
            requisition.width.max(hints.min_width + extra_width)
        };
        hints.min_height = if hints.min_height < 0 {
            requisition.height
        } else {
            requisition.height.max(hints.min_height + extra_height)
        };
    } else {
        hints.flags |= HintFlags::MIN_SIZE;
        hints.min_width = requisition.width;
        hints.min_height = requisition.height;
    }

    if hints.flags.contains(HintFlags::MAX_SIZE) {
        hints.max_width = if hints.max_width < 0 {
            requisition.width
        } else {
            hints.max_width + extra_width
        };
        hints.max_height = if hints.max_height < 0 {
            requisition.height
        } else {
            hints.max_height + extra_height
        };
    } else if inputs.fixed_size.is_some() {
        hints.flags |= HintFlags::MAX_SIZE;
        hints.max_width = requisition.width;
        hints.max_height = requisition.height;
    }

    hints.flags |= HintFlags::WIN_GRAVITY;
    hints.win_gravity = inputs.gravity;
    hints
}

#[cfg(test)]
mod tests;
