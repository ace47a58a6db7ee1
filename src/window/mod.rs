//! Toplevel windows
//!
//! A [`ToplevelWindow`] holds everything the toolkit knows about one window:
//! its decoration and type hints, transient relationships, icon sources, the
//! geometry bookkeeping used by the configure planner, and the lifecycle state
//! driven by the state machine. Windows never reference each other directly;
//! relationships are stored as [`WindowId`]s and resolved through the
//! [`WindowRegistry`](crate::registry::WindowRegistry).

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::geometry::Rectangle;
use crate::group::GroupId;
use crate::hints::Gravity;
use crate::layout::WidgetId;
use crate::platform::{IconImage, SurfaceHandle, TypeHint, WindowHints};

mod machine;
pub mod parse;
pub mod planner;
mod state;

pub use planner::{ConfigureRequest, GeometryInfo, LastConfigure};
pub use state::{Lifecycle, WindowState, WindowStateFlags};

/// Registry-assigned window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Managed toplevel or unmanaged popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WindowKind {
    #[default]
    Toplevel,
    /// Override-redirect: placed directly, no window-manager round trip
    Popup,
}

/// Placement policy applied while a window has no established position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PositionPolicy {
    #[default]
    None,
    /// Center on the monitor under the pointer
    Center,
    /// Center on the pointer, clamped to its monitor
    Mouse,
    /// Keep centered whenever the size changes
    CenterAlways,
    /// Center over the transient parent; needs a mapped parent
    CenterOnParent,
}

/// Where the icon currently handed to the platform came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IconSource {
    OwnList,
    OwnName,
    ParentList,
    DefaultList,
    DefaultName,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IconInfo {
    pub list: Vec<IconImage>,
    pub name: Option<String>,
    /// Set once the icon has been resolved and sent to the platform
    pub realized: bool,
    pub source: Option<IconSource>,
}

/// One toplevel window
#[derive(Debug, Clone)]
pub struct ToplevelWindow {
    pub(crate) id: WindowId,
    pub(crate) widget: WidgetId,
    pub(crate) kind: WindowKind,
    pub(crate) title: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) icon: IconInfo,

    pub(crate) transient_parent: Option<WindowId>,
    pub(crate) transient_children: BTreeSet<WindowId>,
    /// Group membership was inherited from the transient parent
    pub(crate) transient_parent_group: bool,
    pub(crate) group: Option<GroupId>,

    pub(crate) decorated: bool,
    pub(crate) deletable: bool,
    pub(crate) modal: bool,
    pub(crate) resizable: bool,
    pub(crate) destroy_with_parent: bool,
    pub(crate) type_hint: TypeHint,
    /// Type hint changed after realization; resent on the next map
    pub(crate) reset_type_hint: bool,
    pub(crate) gravity: Gravity,
    pub(crate) position: PositionPolicy,
    pub(crate) hints: WindowHints,

    pub(crate) state: WindowState,
    pub(crate) geometry: Option<Box<GeometryInfo>>,
    pub(crate) focus_widget: Option<WidgetId>,
    pub(crate) surface: Option<SurfaceHandle>,
    /// Size handed to the layout engine; `None` before the first allocation
    pub(crate) allocation: Option<Rectangle>,
    pub(crate) alloc_needed: bool,
    /// Queued for the next check-resize pass
    pub(crate) resize_pending: bool,
}

impl ToplevelWindow {
    pub(crate) fn new(id: WindowId, widget: WidgetId, kind: WindowKind) -> Self {
        Self {
            id,
            widget,
            kind,
            title: None,
            role: None,
            icon: IconInfo::default(),
            transient_parent: None,
            transient_children: BTreeSet::new(),
            transient_parent_group: false,
            group: None,
            decorated: true,
            deletable: true,
            modal: false,
            resizable: true,
            destroy_with_parent: false,
            type_hint: TypeHint::Normal,
            reset_type_hint: false,
            gravity: Gravity::NorthWest,
            position: PositionPolicy::None,
            hints: WindowHints::default(),
            state: WindowState::default(),
            geometry: None,
            focus_widget: None,
            surface: None,
            allocation: None,
            alloc_needed: true,
            resize_pending: false,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn icon(&self) -> &IconInfo {
        &self.icon
    }

    pub fn transient_parent(&self) -> Option<WindowId> {
        self.transient_parent
    }

    pub fn transient_children(&self) -> &BTreeSet<WindowId> {
        &self.transient_children
    }

    /// Explicit group, `None` for members of the default group
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn is_decorated(&self) -> bool {
        self.decorated
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    pub fn is_modal(&self) -> bool {
        self.modal
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn destroys_with_parent(&self) -> bool {
        self.destroy_with_parent
    }

    pub fn type_hint(&self) -> TypeHint {
        self.type_hint
    }

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub fn position_policy(&self) -> PositionPolicy {
        self.position
    }

    pub fn window_hints(&self) -> &WindowHints {
        &self.hints
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn is_realized(&self) -> bool {
        self.state.is_realized()
    }

    pub fn is_mapped(&self) -> bool {
        self.state.is_mapped()
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn geometry_info(&self) -> Option<&GeometryInfo> {
        self.geometry.as_deref()
    }

    pub fn focus(&self) -> Option<WidgetId> {
        self.focus_widget
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    pub fn allocation(&self) -> Option<Rectangle> {
        self.allocation
    }

    pub fn is_resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Geometry bookkeeping, created on first use
    pub(crate) fn geometry_info_mut(&mut self) -> &mut GeometryInfo {
        self.geometry.get_or_insert_with(Box::default)
    }

    /// Mark the window for the next check-resize pass
    pub(crate) fn queue_resize(&mut self) {
        self.resize_pending = true;
        self.alloc_needed = true;
    }

    /// Serializable summary for diagnostics
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            id: self.id,
            title: self.title.clone(),
            kind: self.kind,
            lifecycle: self.state.lifecycle,
            visible: self.state.visible,
            surface: self.surface,
            allocation: self.allocation,
            last_request: self.geometry.as_ref().map(|info| info.last.request),
            confirmed_state: self.state.confirmed,
            requested_state: self.state.requested,
            configure_request_count: self.state.configure_request_count,
            transient_parent: self.transient_parent,
            group: self.group,
            icon_source: self.icon.source,
        }
    }
}

/// Point-in-time view of a window, as printed by the `casement` binary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub title: Option<String>,
    pub kind: WindowKind,
    pub lifecycle: Lifecycle,
    pub visible: bool,
    pub surface: Option<SurfaceHandle>,
    pub allocation: Option<Rectangle>,
    pub last_request: Option<Rectangle>,
    pub confirmed_state: WindowStateFlags,
    pub requested_state: WindowStateFlags,
    pub configure_request_count: u32,
    pub transient_parent: Option<WindowId>,
    pub group: Option<GroupId>,
    pub icon_source: Option<IconSource>,
}
