//! Platform abstraction: native surfaces, monitor queries and incoming events.
//!
//! Each windowing backend provides one [`PlatformSurface`] implementation. All
//! calls are fire-and-forget; results come back later as [`PlatformEvent`]s
//! through a [`PlatformEventSource`].

use bitflags::bitflags;
use log::trace;
use serde::Serialize;
use std::fmt;

use crate::display::MonitorSource;
use crate::geometry::{Point, Rectangle};
use crate::hints::GeometryHints;
use crate::window::WindowStateFlags;

pub mod headless;

/// Native window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Whether the window manager mediates a surface's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SurfaceKind {
    #[default]
    Managed,
    /// Override-redirect: geometry requests take effect immediately
    OverrideRedirect,
}

/// Semantic window type advertised to the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TypeHint {
    #[default]
    Normal,
    Dialog,
    Menu,
    Toolbar,
    Splashscreen,
    Utility,
    Dock,
    Desktop,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
}

bitflags! {
    /// Window-manager decorations
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct Decorations: u32 {
        const ALL = 1 << 0;
        const BORDER = 1 << 1;
        const RESIZEH = 1 << 2;
        const TITLE = 1 << 3;
        const MENU = 1 << 4;
        const MINIMIZE = 1 << 5;
        const MAXIMIZE = 1 << 6;
    }
}

bitflags! {
    /// Window-manager functions. With `ALL` set the other bits are exclusions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct Functions: u32 {
        const ALL = 1 << 0;
        const RESIZE = 1 << 1;
        const MOVE = 1 << 2;
        const MINIMIZE = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE = 1 << 5;
    }
}

/// One image of an icon list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IconImage {
    pub width: i32,
    pub height: i32,
    /// Where the pixels came from, e.g. a file name
    pub source: String,
}

/// Icon handed to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Icon {
    Images(Vec<IconImage>),
    Themed(String),
}

/// Hints that only matter to the window manager's task switcher and focus policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowHints {
    pub skip_taskbar: bool,
    pub skip_pager: bool,
    pub urgent: bool,
    pub accept_focus: bool,
    pub focus_on_map: bool,
    pub opacity: f64,
}

impl Default for WindowHints {
    fn default() -> Self {
        Self {
            skip_taskbar: false,
            skip_pager: false,
            urgent: false,
            accept_focus: true,
            focus_on_map: true,
            opacity: 1.0,
        }
    }
}

/// Attributes for a new native surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAttributes {
    pub geometry: Rectangle,
    pub title: Option<String>,
    pub type_hint: TypeHint,
}

/// Native window operations for one backend
pub trait PlatformSurface {
    fn create(
        &mut self,
        parent: Option<SurfaceHandle>,
        kind: SurfaceKind,
        attributes: &SurfaceAttributes,
    ) -> SurfaceHandle;
    fn destroy(&mut self, surface: SurfaceHandle);

    /// False once the surface has been destroyed on the platform side
    fn is_valid(&self, surface: SurfaceHandle) -> bool;

    fn move_to(&mut self, surface: SurfaceHandle, x: i32, y: i32);
    fn resize(&mut self, surface: SurfaceHandle, width: i32, height: i32);
    fn move_resize(&mut self, surface: SurfaceHandle, geometry: Rectangle);
    fn show(&mut self, surface: SurfaceHandle);
    /// Withdraw the surface from the screen
    fn hide(&mut self, surface: SurfaceHandle);

    fn set_geometry_hints(&mut self, surface: SurfaceHandle, hints: &GeometryHints);
    fn set_decorations(&mut self, surface: SurfaceHandle, decorations: Decorations);
    fn set_functions(&mut self, surface: SurfaceHandle, functions: Functions);
    /// Ask the window manager to turn `state` on or off
    fn set_state(&mut self, surface: SurfaceHandle, state: WindowStateFlags, enabled: bool);
    fn set_title(&mut self, surface: SurfaceHandle, title: &str);
    fn set_role(&mut self, surface: SurfaceHandle, role: Option<&str>);
    fn set_icon(&mut self, surface: SurfaceHandle, icon: Option<&Icon>);
    fn set_transient_for(&mut self, surface: SurfaceHandle, parent: Option<SurfaceHandle>);
    fn set_modal_hint(&mut self, surface: SurfaceHandle, modal: bool);
    fn set_type_hint(&mut self, surface: SurfaceHandle, hint: TypeHint);
    fn set_window_hints(&mut self, surface: SurfaceHandle, hints: &WindowHints);

    fn freeze_updates(&mut self, surface: SurfaceHandle);
    fn thaw_updates(&mut self, surface: SurfaceHandle);

    /// Root-relative rectangle of the surface including window-manager decorations
    fn frame_extents(&self, surface: SurfaceHandle) -> Option<Rectangle>;
    /// Root-relative client geometry as last known to the platform
    fn geometry(&self, surface: SurfaceHandle) -> Option<Rectangle>;
    /// State flags as last confirmed by the window manager
    fn state(&self, surface: SurfaceHandle) -> Option<WindowStateFlags>;
    fn pointer_position(&self) -> Option<Point>;

    fn monitor_source(&self) -> &dyn MonitorSource;
}

/// Run `query` against `surface` and drop the answer if the surface was destroyed
/// on the platform side in the meantime
pub fn query_live<T>(
    platform: &dyn PlatformSurface,
    surface: SurfaceHandle,
    query: impl FnOnce(&dyn PlatformSurface, SurfaceHandle) -> Option<T>,
) -> Option<T> {
    let answer = query(platform, surface)?;
    if platform.is_valid(surface) {
        Some(answer)
    } else {
        trace!("Surface {} went away during a query", surface);
        None
    }
}

/// Events reported by the windowing system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlatformEvent {
    /// The surface's actual, possibly window-manager adjusted, geometry
    ConfigureNotify {
        surface: SurfaceHandle,
        geometry: Rectangle,
    },
    MapNotify {
        surface: SurfaceHandle,
    },
    UnmapNotify {
        surface: SurfaceHandle,
    },
    StateChanged {
        surface: SurfaceHandle,
        state: WindowStateFlags,
    },
    /// Outputs were added, removed or reconfigured
    TopologyChanged,
    /// The compositing-manager selection changed hands
    SelectionOwnerChanged,
}

impl PlatformEvent {
    /// Surface the event is addressed to, if any
    pub fn surface(&self) -> Option<SurfaceHandle> {
        match self {
            PlatformEvent::ConfigureNotify { surface, .. }
            | PlatformEvent::MapNotify { surface }
            | PlatformEvent::UnmapNotify { surface }
            | PlatformEvent::StateChanged { surface, .. } => Some(*surface),
            PlatformEvent::TopologyChanged | PlatformEvent::SelectionOwnerChanged => None,
        }
    }
}

/// Pull-style source of platform events
pub trait PlatformEventSource {
    fn poll_event(&mut self) -> Option<PlatformEvent>;
}
