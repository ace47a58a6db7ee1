//! Configure request planning
//!
//! Decides the next position, size and hints to ask the platform for. The plan
//! is rebuilt from scratch on every pass and compared against the last request
//! actually sent, which is the only record the state machine trusts when it
//! decides whether to talk to the platform at all.

use log::{debug, trace};
use serde::Serialize;

use super::{PositionPolicy, ToplevelWindow};
use crate::error::{CasementError, Result};
use crate::geometry::{clamp_window_to_rectangle, Point, Rectangle, Size};
use crate::hints::{clamp_high_wins, compute_hints, GeometryHints, Gravity, HintFlags, HintInputs};
use crate::layout::{RequestMode, WidgetId};
use crate::platform::{query_live, SurfaceHandle};
use crate::registry::{window_entry, Services, WindowRegistry};
use crate::window::WindowId;

/// The last configure request sent to the platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LastConfigure {
    /// Width and height are `-1` until the first request
    pub request: Rectangle,
    /// Hints as computed, without the transient position flag
    pub hints: GeometryHints,
}

impl Default for LastConfigure {
    fn default() -> Self {
        Self {
            request: Rectangle::new(0, 0, -1, -1),
            hints: GeometryHints::default(),
        }
    }
}

/// Geometry bookkeeping of one window, created by the first call that needs it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryInfo {
    /// Hints set by the application, gravity stripped
    pub app_hints: Option<GeometryHints>,
    /// Widget the app hints describe
    pub widget: Option<WidgetId>,

    /// `-1` when unset; applied on first show only
    pub default_width: i32,
    pub default_height: i32,
    pub default_is_geometry: bool,

    /// One-shot resize; `-1` when none is pending
    pub resize_width: i32,
    pub resize_height: i32,
    pub resize_is_geometry: bool,

    pub initial_x: i32,
    pub initial_y: i32,
    pub initial_pos_set: bool,

    /// The position policy changed to or from always-centered
    pub position_constraints_changed: bool,

    pub last: LastConfigure,
}

impl Default for GeometryInfo {
    fn default() -> Self {
        Self {
            app_hints: None,
            widget: None,
            default_width: -1,
            default_height: -1,
            default_is_geometry: false,
            resize_width: -1,
            resize_height: -1,
            resize_is_geometry: false,
            initial_x: 0,
            initial_y: 0,
            initial_pos_set: false,
            position_constraints_changed: false,
            last: LastConfigure::default(),
        }
    }
}

/// A planned request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfigureRequest {
    pub rect: Rectangle,
    pub hints: GeometryHints,
}

/// What the planner needs to know about a transient parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ParentInfo {
    pub mapped: bool,
    pub surface: Option<SurfaceHandle>,
    pub allocation: Rectangle,
}

/// Center `size` on the monitor under the pointer, else the middle monitor
fn center_on_monitor(services: &Services, size: Size) -> Point {
    let topology = &services.topology;
    let monitor = match services.platform.pointer_position() {
        Some(pointer) => topology.monitor_at_point(pointer),
        None => topology.center_monitor(),
    };
    let area = topology.monitor_workarea(monitor).unwrap_or_default();

    Point::new(
        ((area.width - size.width) / 2 + area.x).max(area.x),
        ((area.height - size.height) / 2 + area.y).max(area.y),
    )
}

fn center_on_parent(services: &Services, parent: &ParentInfo, size: Size) -> Option<Point> {
    let surface = parent.surface?;
    // The parent may have been destroyed on the platform side since we looked
    let parent_geometry = query_live(services.platform.as_ref(), surface, |p, s| p.geometry(s))?;

    let origin = Point::new(
        parent_geometry.x + (parent.allocation.width - size.width) / 2,
        parent_geometry.y + (parent.allocation.height - size.height) / 2,
    );
    let monitor = services.topology.monitor_at_rect(&parent_geometry);
    Some(match services.topology.monitor_geometry(monitor) {
        Some(area) => clamp_window_to_rectangle(origin, size, &area),
        None => origin,
    })
}

fn center_on_pointer(services: &Services, pointer: Point, size: Size) -> Point {
    let screen = services.topology.screen_size();
    let origin = Point::new(
        clamp_high_wins(pointer.x - size.width / 2, 0, screen.width - size.width),
        clamp_high_wins(pointer.y - size.height / 2, 0, screen.height - size.height),
    );

    // Popups get no help from the window manager here
    let monitor = services.topology.monitor_at_point(pointer);
    match services.topology.monitor_geometry(monitor) {
        Some(area) => clamp_window_to_rectangle(origin, size, &area),
        None => origin,
    }
}

impl ToplevelWindow {
    /// Position policy after accounting for an absent or unmapped parent
    pub(crate) fn effective_position(&self, parent: Option<&ParentInfo>) -> PositionPolicy {
        match self.position {
            PositionPolicy::CenterOnParent if !parent.map_or(false, |p| p.mapped) => {
                PositionPolicy::None
            }
            policy => policy,
        }
    }

    fn compute_hints(&self, services: &mut Services) -> GeometryHints {
        let info = self.geometry.as_deref();
        let app_hints = info.and_then(|info| info.app_hints);
        let fixed_size = if self.resizable {
            None
        } else {
            let measured = services.layout.measure(self.widget);
            Some(Size::new(measured.natural_width, measured.natural_height))
        };

        let inputs = HintInputs {
            app_hints: app_hints.as_ref(),
            geometry_widget: info.and_then(|info| info.widget),
            window_widget: self.widget,
            gravity: self.gravity,
            fixed_size,
            probe_size: services.config.window.geometry_widget_probe_size,
        };
        compute_hints(&inputs, services.layout.as_mut())
    }

    /// A reasonable first size: the natural size, bounded by a box that fits the screen
    pub(crate) fn guess_default_size(&self, services: &Services) -> Size {
        let limits = &services.config.window;
        let screen = services.topology.screen_size();
        let (mut width, mut height) = if screen.width >= screen.height {
            (
                screen.width.min(limits.max_default_width),
                screen.height.min(limits.max_default_height),
            )
        } else {
            (
                screen.width.min(limits.max_default_height),
                screen.height.min(limits.max_default_width),
            )
        };

        let layout = services.layout.as_ref();
        let measured = layout.measure(self.widget);
        if layout.request_mode(self.widget) == RequestMode::WidthForHeight {
            height = measured.min_height.max(height.min(measured.natural_height));
            let (minimum, natural) = layout.preferred_width_for_height(self.widget, height);
            width = minimum.max(width.min(natural));
        } else {
            width = measured.min_width.max(width.min(measured.natural_width));
            let (minimum, natural) = layout.preferred_height_for_width(self.widget, width);
            height = minimum.max(height.min(natural));
        }

        Size::new(width, height)
    }

    /// Guessed size with empty windows bumped to the configured fallback
    pub(crate) fn initial_size(&self, services: &Services) -> Size {
        let guessed = self.guess_default_size(services);
        if guessed.width == 0 && guessed.height == 0 {
            let fallback = services.config.window.empty_window_size;
            Size::new(fallback, fallback)
        } else {
            guessed
        }
    }

    fn request_size(&self, services: &Services, hints: &GeometryHints) -> Size {
        let info = self.geometry.as_deref();

        let mut size = if self.state.need_default_size {
            let mut size = self.initial_size(services);
            if let Some(info) = info {
                let width = (info.default_width > 0).then_some(info.default_width);
                let height = (info.default_height > 0).then_some(info.default_height);
                let (width, height) = if info.default_is_geometry {
                    hints.units_to_pixels(width, height)
                } else {
                    (width, height)
                };
                size.width = width.unwrap_or(size.width);
                size.height = height.unwrap_or(size.height);
            }
            size
        } else {
            self.allocation.map(|a| a.size()).unwrap_or_default()
        };

        if let Some(info) = info {
            let width = (info.resize_width > 0).then_some(info.resize_width);
            let height = (info.resize_height > 0).then_some(info.resize_height);
            let (width, height) = if info.resize_is_geometry {
                hints.units_to_pixels(width, height)
            } else {
                (width, height)
            };
            size.width = width.unwrap_or(size.width);
            size.height = height.unwrap_or(size.height);
        }

        Size::new(size.width.max(1), size.height.max(1))
    }

    /// Plan the next configure request from the window's current state
    pub(crate) fn compute_configure_request(
        &self,
        services: &mut Services,
        parent: Option<&ParentInfo>,
    ) -> ConfigureRequest {
        let hints = self.compute_hints(services);
        let size = self.request_size(services, &hints);
        let size = hints.constrain_size(size.width, size.height);

        let info = self.geometry.as_deref();
        let mut origin = info.map_or(Point::default(), |info| info.last.request.origin());

        if self.state.need_default_position {
            match self.effective_position(parent) {
                PositionPolicy::Center | PositionPolicy::CenterAlways => {
                    origin = center_on_monitor(services, size);
                }
                PositionPolicy::CenterOnParent => {
                    if let Some(centered) = parent.and_then(|p| center_on_parent(services, p, size)) {
                        origin = centered;
                    }
                }
                PositionPolicy::Mouse => {
                    if let Some(pointer) = services.platform.pointer_position() {
                        origin = center_on_pointer(services, pointer, size);
                    }
                }
                PositionPolicy::None => {}
            }

            if let Some(info) = info.filter(|info| info.initial_pos_set) {
                origin = self.constrain_position(
                    services,
                    size,
                    Point::new(info.initial_x, info.initial_y),
                );
            }
        }

        trace!(
            "Window {} planned {}x{}+{}+{}",
            self.id,
            size.width,
            size.height,
            origin.x,
            origin.y
        );
        ConfigureRequest {
            rect: Rectangle::new(origin.x, origin.y, size.width, size.height),
            hints,
        }
    }

    /// Re-center always-centered windows; other policies leave the position alone
    pub(crate) fn constrain_position(&self, services: &Services, size: Size, origin: Point) -> Point {
        if self.position == PositionPolicy::CenterAlways {
            center_on_monitor(services, size)
        } else {
            origin
        }
    }
}

impl WindowRegistry {
    /// Ask for a new size; takes effect on the next check-resize pass
    pub fn resize(&mut self, id: WindowId, width: i32, height: i32) -> Result<()> {
        self.set_resize(id, width, height, false)
    }

    /// Like [`resize`](Self::resize), in units of the window's resize increments
    pub fn resize_to_geometry(&mut self, id: WindowId, width: i32, height: i32) -> Result<()> {
        self.set_resize(id, width, height, true)
    }

    fn set_resize(&mut self, id: WindowId, width: i32, height: i32, is_geometry: bool) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(CasementError::InvalidSize { width, height });
        }

        let window = window_entry(&mut self.windows, id)?;
        let info = window.geometry_info_mut();
        info.resize_width = width;
        info.resize_height = height;
        info.resize_is_geometry = is_geometry;
        debug!("Window {} resize requested: {}x{}", id, width, height);

        self.schedule_resize(id);
        Ok(())
    }

    /// Move the window. Unmapped windows record the position for their next show;
    /// mapped ones are moved directly.
    pub fn move_to(&mut self, id: WindowId, x: i32, y: i32) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;

        if window.is_mapped() {
            window.geometry_info_mut().position_constraints_changed = false;
            let size = window.allocation.map(|a| a.size()).unwrap_or_default();
            let origin = window.constrain_position(&self.services, size, Point::new(x, y));
            if let Some(surface) = window.surface {
                // Bypasses the request bookkeeping; to the planner this looks
                // like a window-manager initiated move
                self.services.platform.move_to(surface, origin.x, origin.y);
            }
        } else {
            let info = window.geometry_info_mut();
            info.initial_x = x;
            info.initial_y = y;
            info.initial_pos_set = true;
            debug!("Window {} initial position set to {},{}", id, x, y);
        }
        Ok(())
    }

    /// Size used on first show. `-1` unsets a dimension, `0` is treated as `1`.
    pub fn set_default_size(&mut self, id: WindowId, width: i32, height: i32) -> Result<()> {
        if width < -1 || height < -1 {
            return Err(CasementError::InvalidSize { width, height });
        }
        self.set_default_size_internal(id, Some(width), Some(height), false)
    }

    /// Like [`set_default_size`](Self::set_default_size), in geometry units
    pub fn set_default_geometry(&mut self, id: WindowId, width: i32, height: i32) -> Result<()> {
        if width < -1 || height < -1 {
            return Err(CasementError::InvalidSize { width, height });
        }
        self.set_default_size_internal(id, Some(width), Some(height), true)
    }

    pub(crate) fn set_default_size_internal(
        &mut self,
        id: WindowId,
        width: Option<i32>,
        height: Option<i32>,
        is_geometry: bool,
    ) -> Result<()> {
        fn normalize(value: i32) -> i32 {
            match value {
                0 => 1,
                v if v < 0 => -1,
                v => v,
            }
        }

        let window = window_entry(&mut self.windows, id)?;
        let info = window.geometry_info_mut();
        info.default_is_geometry = is_geometry;
        if let Some(width) = width {
            info.default_width = normalize(width);
        }
        if let Some(height) = height {
            info.default_height = normalize(height);
        }

        self.schedule_resize(id);
        Ok(())
    }

    /// `(width, height)` of the default size, `-1` for unset dimensions
    pub fn default_size(&self, id: WindowId) -> Result<(i32, i32)> {
        let window = self.window(id).ok_or(CasementError::NoSuchWindow(id))?;
        Ok(window
            .geometry_info()
            .map_or((-1, -1), |info| (info.default_width, info.default_height)))
    }

    /// Set the application's geometry hints. A gravity in the hints moves to the window.
    pub fn set_geometry_hints(
        &mut self,
        id: WindowId,
        geometry_widget: Option<WidgetId>,
        hints: Option<GeometryHints>,
    ) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if let Some(gravity) = hints
            .filter(|h| h.flags.contains(HintFlags::WIN_GRAVITY))
            .map(|h| h.win_gravity)
        {
            window.gravity = gravity;
        }

        let info = window.geometry_info_mut();
        info.widget = geometry_widget;
        info.app_hints = hints.map(|mut h| {
            h.flags.remove(HintFlags::WIN_GRAVITY);
            h
        });

        self.schedule_resize(id);
        Ok(())
    }

    pub fn set_gravity(&mut self, id: WindowId, gravity: Gravity) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.gravity != gravity {
            window.gravity = gravity;
            self.schedule_resize(id);
        }
        Ok(())
    }

    pub fn set_position(&mut self, id: WindowId, policy: PositionPolicy) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        let recenter =
            policy == PositionPolicy::CenterAlways || window.position == PositionPolicy::CenterAlways;
        window.position = policy;

        if recenter {
            window.geometry_info_mut().position_constraints_changed = true;
            self.schedule_resize(id);
        }
        Ok(())
    }

    pub fn set_resizable(&mut self, id: WindowId, resizable: bool) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.resizable != resizable {
            window.resizable = resizable;
            self.schedule_resize(id);
        }
        Ok(())
    }

    /// The next configure request as it would be planned right now
    pub fn plan(&mut self, id: WindowId) -> Result<ConfigureRequest> {
        let parent = self.parent_info(id);
        let window = self.windows.get(&id).ok_or(CasementError::NoSuchWindow(id))?;
        Ok(window.compute_configure_request(&mut self.services, parent.as_ref()))
    }

    /// Current size: the platform's for mapped windows, the planned one otherwise
    pub fn size(&mut self, id: WindowId) -> Result<Size> {
        let window = self.windows.get(&id).ok_or(CasementError::NoSuchWindow(id))?;
        if window.is_mapped() {
            let platform = self.services.platform.as_ref();
            let live = window.surface.and_then(|s| query_live(platform, s, |p, s| p.geometry(s)));
            if let Some(geometry) = live {
                return Ok(geometry.size());
            }
        }
        Ok(self.plan(id)?.rect.size())
    }

    /// Root position of the window's gravity reference point
    pub fn position(&mut self, id: WindowId) -> Result<Point> {
        let window = self.windows.get(&id).ok_or(CasementError::NoSuchWindow(id))?;
        let gravity = window.gravity;
        let mapped_surface = window.surface.filter(|_| window.is_mapped());

        if gravity == Gravity::Static {
            let platform = self.services.platform.as_ref();
            let live = mapped_surface.and_then(|s| query_live(platform, s, |p, s| p.geometry(s)));
            if let Some(geometry) = live {
                return Ok(geometry.origin());
            }
            return Ok(self.plan(id)?.rect.origin());
        }

        let platform = self.services.platform.as_ref();
        let frame = mapped_surface.and_then(|s| query_live(platform, s, |p, s| p.frame_extents(s)));
        let (frame, size) = match frame {
            Some(frame) => (frame, self.size(id)?),
            None => {
                let planned = self.plan(id)?.rect;
                (planned, planned.size())
            }
        };

        let mut x = frame.x;
        let mut y = frame.y;
        match gravity {
            Gravity::North | Gravity::Center | Gravity::South => {
                x += frame.width / 2 - size.width / 2;
            }
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => {
                x += frame.width - size.width;
            }
            _ => {}
        }
        match gravity {
            Gravity::West | Gravity::Center | Gravity::East => {
                y += frame.height / 2 - size.height / 2;
            }
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => {
                y += frame.height - size.height;
            }
            _ => {}
        }
        Ok(Point::new(x, y))
    }
}
