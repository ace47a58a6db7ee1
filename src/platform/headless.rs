//! In-process platform backend.
//!
//! Simulates a window manager well enough to exercise geometry negotiation
//! without a display server: configure requests are answered with notifies
//! after a configurable policy is applied, maps and state changes echo back as
//! events, and every call is recorded for inspection. Clones share one state,
//! so a test can hand one clone to the registry and drive the other.

use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::{
    Decorations, Functions, Icon, PlatformEvent, PlatformEventSource, PlatformSurface,
    SurfaceAttributes, SurfaceHandle, SurfaceKind, TypeHint, WindowHints,
};
use crate::display::{MonitorSource, MultiheadVariant, OutputId, OutputInfo, OutputQuery};
use crate::geometry::{Point, Rectangle, Size};
use crate::hints::GeometryHints;
use crate::window::WindowStateFlags;

/// How the simulated window manager answers configure requests from managed surfaces
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WmPolicy {
    /// Grant every request as asked
    #[default]
    Grant,
    /// Grant, but never beyond this size
    Clamp(Size),
    /// Apply the surface's geometry hints before granting
    Constrain,
    /// Refuse everything; the notify repeats the current geometry
    Ignore,
}

/// Decoration size around a managed surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInsets {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// One recorded call into the backend
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Create {
        surface: SurfaceHandle,
        kind: SurfaceKind,
        geometry: Rectangle,
    },
    Destroy(SurfaceHandle),
    MoveTo {
        surface: SurfaceHandle,
        x: i32,
        y: i32,
    },
    Resize {
        surface: SurfaceHandle,
        width: i32,
        height: i32,
    },
    MoveResize {
        surface: SurfaceHandle,
        geometry: Rectangle,
    },
    Show(SurfaceHandle),
    Hide(SurfaceHandle),
    SetGeometryHints {
        surface: SurfaceHandle,
        hints: GeometryHints,
    },
    SetDecorations(SurfaceHandle, Decorations),
    SetFunctions(SurfaceHandle, Functions),
    SetState {
        surface: SurfaceHandle,
        state: WindowStateFlags,
        enabled: bool,
    },
    SetTitle(SurfaceHandle, String),
    SetRole(SurfaceHandle, Option<String>),
    SetIcon(SurfaceHandle, Option<Icon>),
    SetTransientFor(SurfaceHandle, Option<SurfaceHandle>),
    SetModalHint(SurfaceHandle, bool),
    SetTypeHint(SurfaceHandle, TypeHint),
    SetWindowHints(SurfaceHandle, WindowHints),
    Freeze(SurfaceHandle),
    Thaw(SurfaceHandle),
}

impl PlatformCall {
    /// Whether the call asks for a new position or size
    pub fn is_configure(&self) -> bool {
        matches!(
            self,
            PlatformCall::MoveTo { .. } | PlatformCall::Resize { .. } | PlatformCall::MoveResize { .. }
        )
    }

    pub fn surface(&self) -> SurfaceHandle {
        match self {
            PlatformCall::Create { surface, .. }
            | PlatformCall::MoveTo { surface, .. }
            | PlatformCall::Resize { surface, .. }
            | PlatformCall::MoveResize { surface, .. }
            | PlatformCall::SetGeometryHints { surface, .. }
            | PlatformCall::SetState { surface, .. } => *surface,
            PlatformCall::Destroy(surface)
            | PlatformCall::Show(surface)
            | PlatformCall::Hide(surface)
            | PlatformCall::SetDecorations(surface, _)
            | PlatformCall::SetFunctions(surface, _)
            | PlatformCall::SetTitle(surface, _)
            | PlatformCall::SetRole(surface, _)
            | PlatformCall::SetIcon(surface, _)
            | PlatformCall::SetTransientFor(surface, _)
            | PlatformCall::SetModalHint(surface, _)
            | PlatformCall::SetTypeHint(surface, _)
            | PlatformCall::SetWindowHints(surface, _)
            | PlatformCall::Freeze(surface)
            | PlatformCall::Thaw(surface) => *surface,
        }
    }
}

#[derive(Debug, Clone)]
struct HeadlessSurface {
    kind: SurfaceKind,
    geometry: Rectangle,
    mapped: bool,
    state: WindowStateFlags,
    hints: Option<GeometryHints>,
    frozen: u32,
}

#[derive(Debug)]
struct HeadlessState {
    screen: Size,
    screen_mm: Size,
    monitors: Vec<(String, Rectangle)>,
    primary: Option<usize>,
    workarea: Option<Rectangle>,
    composited: bool,
    pointer: Option<Point>,
    policy: WmPolicy,
    frame: FrameInsets,
    surfaces: HashMap<SurfaceHandle, HeadlessSurface>,
    next_surface: u64,
    calls: Vec<PlatformCall>,
    events: VecDeque<PlatformEvent>,
}

impl HeadlessState {
    fn surface_mut(&mut self, surface: SurfaceHandle) -> Option<&mut HeadlessSurface> {
        self.surfaces.get_mut(&surface)
    }

    /// Geometry the window manager grants for `requested`
    fn grant(&self, surface: &HeadlessSurface, requested: Rectangle) -> Rectangle {
        if surface.kind == SurfaceKind::OverrideRedirect {
            return requested;
        }
        match self.policy {
            WmPolicy::Grant => requested,
            WmPolicy::Clamp(max) => Rectangle::new(
                requested.x,
                requested.y,
                requested.width.min(max.width),
                requested.height.min(max.height),
            ),
            WmPolicy::Constrain => match surface.hints {
                Some(hints) => {
                    let size = hints.constrain_size(requested.width, requested.height);
                    Rectangle::new(requested.x, requested.y, size.width, size.height)
                }
                None => requested,
            },
            WmPolicy::Ignore => surface.geometry,
        }
    }

    fn configure(&mut self, handle: SurfaceHandle, requested: Rectangle) {
        let Some(surface) = self.surfaces.get(&handle) else {
            return;
        };
        let granted = self.grant(surface, requested);
        if let Some(surface) = self.surface_mut(handle) {
            surface.geometry = granted;
        }
        trace!("Headless surface {} configured to {:?}", handle, granted);
        self.events.push_back(PlatformEvent::ConfigureNotify {
            surface: handle,
            geometry: granted,
        });
    }
}

/// Headless [`PlatformSurface`] with a simulated window manager
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    state: Arc<Mutex<HeadlessState>>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new(Size::new(1920, 1080))
    }
}

impl HeadlessPlatform {
    /// One monitor covering the whole screen
    pub fn new(screen: Size) -> Self {
        Self::with_monitors(screen, vec![("HDMI-1".to_string(), Rectangle::from_size(screen))])
    }

    pub fn with_monitors(screen: Size, monitors: Vec<(String, Rectangle)>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                screen,
                // 96 dpi
                screen_mm: Size::new(screen.width * 254 / 960, screen.height * 254 / 960),
                monitors,
                primary: None,
                workarea: None,
                composited: false,
                pointer: None,
                policy: WmPolicy::Grant,
                frame: FrameInsets::default(),
                surfaces: HashMap::new(),
                next_surface: 0x400001,
                calls: Vec::new(),
                events: VecDeque::new(),
            })),
        }
    }

    /// Replace the outputs, as a hotplug would; queues a topology change
    pub fn set_outputs(&self, screen: Size, monitors: Vec<(String, Rectangle)>) {
        let mut state = self.state.lock();
        state.screen = screen;
        state.monitors = monitors;
        state.primary = None;
        state.events.push_back(PlatformEvent::TopologyChanged);
    }

    /// Designate the output at `index` as primary
    pub fn set_primary(&self, index: Option<usize>) {
        self.state.lock().primary = index;
    }

    pub fn set_workarea(&self, workarea: Option<Rectangle>) {
        self.state.lock().workarea = workarea;
    }

    pub fn set_pointer(&self, pointer: Option<Point>) {
        self.state.lock().pointer = pointer;
    }

    /// Hand the compositing-manager selection over; queues an owner-change event
    pub fn set_composited(&self, composited: bool) {
        let mut state = self.state.lock();
        if state.composited != composited {
            state.composited = composited;
            state.events.push_back(PlatformEvent::SelectionOwnerChanged);
        }
    }

    pub fn set_policy(&self, policy: WmPolicy) {
        self.state.lock().policy = policy;
    }

    pub fn set_frame(&self, frame: FrameInsets) {
        self.state.lock().frame = frame;
    }

    /// Resize or move a surface on the window manager's own initiative
    pub fn wm_configure(&self, surface: SurfaceHandle, geometry: Rectangle) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(s) = state.surfaces.get_mut(&surface) {
            s.geometry = geometry;
            state.events.push_back(PlatformEvent::ConfigureNotify { surface, geometry });
        }
    }

    /// Change a surface's states on the window manager's own initiative
    pub fn wm_set_state(&self, surface: SurfaceHandle, flags: WindowStateFlags) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(s) = state.surfaces.get_mut(&surface) {
            s.state = flags;
            state.events.push_back(PlatformEvent::StateChanged { surface, state: flags });
        }
    }

    /// Queue an arbitrary event
    pub fn emit(&self, event: PlatformEvent) {
        self.state.lock().events.push_back(event);
    }

    /// Drop queued events, as if the notifies were lost
    pub fn discard_events(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.events.len();
        state.events.clear();
        dropped
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Calls recorded so far, clearing the record
    pub fn take_calls(&self) -> Vec<PlatformCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_mapped(&self, surface: SurfaceHandle) -> bool {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .map_or(false, |s| s.mapped)
    }

    pub fn frozen_count(&self, surface: SurfaceHandle) -> u32 {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .map_or(0, |s| s.frozen)
    }

    pub fn last_hints(&self, surface: SurfaceHandle) -> Option<GeometryHints> {
        self.state.lock().surfaces.get(&surface).and_then(|s| s.hints)
    }

    fn record(&self, call: PlatformCall) {
        self.state.lock().calls.push(call);
    }
}

impl PlatformSurface for HeadlessPlatform {
    fn create(
        &mut self,
        _parent: Option<SurfaceHandle>,
        kind: SurfaceKind,
        attributes: &SurfaceAttributes,
    ) -> SurfaceHandle {
        let mut state = self.state.lock();
        let surface = SurfaceHandle(state.next_surface);
        state.next_surface += 1;
        state.surfaces.insert(
            surface,
            HeadlessSurface {
                kind,
                geometry: attributes.geometry,
                mapped: false,
                state: WindowStateFlags::empty(),
                hints: None,
                frozen: 0,
            },
        );
        state.calls.push(PlatformCall::Create {
            surface,
            kind,
            geometry: attributes.geometry,
        });
        debug!("Headless surface {} created at {:?}", surface, attributes.geometry);
        surface
    }

    fn destroy(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.lock();
        state.surfaces.remove(&surface);
        state.calls.push(PlatformCall::Destroy(surface));
    }

    fn is_valid(&self, surface: SurfaceHandle) -> bool {
        self.state.lock().surfaces.contains_key(&surface)
    }

    fn move_to(&mut self, surface: SurfaceHandle, x: i32, y: i32) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::MoveTo { surface, x, y });
        if let Some(current) = state.surfaces.get(&surface).map(|s| s.geometry) {
            state.configure(surface, Rectangle::new(x, y, current.width, current.height));
        }
    }

    fn resize(&mut self, surface: SurfaceHandle, width: i32, height: i32) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::Resize {
            surface,
            width,
            height,
        });
        if let Some(current) = state.surfaces.get(&surface).map(|s| s.geometry) {
            state.configure(surface, Rectangle::new(current.x, current.y, width, height));
        }
    }

    fn move_resize(&mut self, surface: SurfaceHandle, geometry: Rectangle) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::MoveResize { surface, geometry });
        state.configure(surface, geometry);
    }

    fn show(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::Show(surface));
        let Some(s) = state.surfaces.get(&surface).cloned() else {
            return;
        };
        if s.mapped {
            return;
        }

        // Managed surfaces are placed by the window manager as they map
        let granted = state.grant(&s, s.geometry);
        if let Some(s) = state.surface_mut(surface) {
            s.mapped = true;
            s.geometry = granted;
        }
        if granted != s.geometry {
            state.events.push_back(PlatformEvent::ConfigureNotify {
                surface,
                geometry: granted,
            });
        }
        state.events.push_back(PlatformEvent::MapNotify { surface });
    }

    fn hide(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::Hide(surface));
        let was_mapped = match state.surface_mut(surface) {
            Some(s) => std::mem::replace(&mut s.mapped, false),
            None => false,
        };
        if was_mapped {
            state.events.push_back(PlatformEvent::UnmapNotify { surface });
        }
    }

    fn set_geometry_hints(&mut self, surface: SurfaceHandle, hints: &GeometryHints) {
        let mut state = self.state.lock();
        if let Some(s) = state.surface_mut(surface) {
            s.hints = Some(*hints);
        }
        state.calls.push(PlatformCall::SetGeometryHints {
            surface,
            hints: *hints,
        });
    }

    fn set_decorations(&mut self, surface: SurfaceHandle, decorations: Decorations) {
        self.record(PlatformCall::SetDecorations(surface, decorations));
    }

    fn set_functions(&mut self, surface: SurfaceHandle, functions: Functions) {
        self.record(PlatformCall::SetFunctions(surface, functions));
    }

    fn set_state(&mut self, surface: SurfaceHandle, flag: WindowStateFlags, enabled: bool) {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::SetState {
            surface,
            state: flag,
            enabled,
        });
        let Some(s) = state.surface_mut(surface) else {
            return;
        };
        let before = s.state;
        s.state.set(flag, enabled);
        let after = s.state;
        if after != before {
            state.events.push_back(PlatformEvent::StateChanged { surface, state: after });
        }
    }

    fn set_title(&mut self, surface: SurfaceHandle, title: &str) {
        self.record(PlatformCall::SetTitle(surface, title.to_string()));
    }

    fn set_role(&mut self, surface: SurfaceHandle, role: Option<&str>) {
        self.record(PlatformCall::SetRole(surface, role.map(str::to_string)));
    }

    fn set_icon(&mut self, surface: SurfaceHandle, icon: Option<&Icon>) {
        self.record(PlatformCall::SetIcon(surface, icon.cloned()));
    }

    fn set_transient_for(&mut self, surface: SurfaceHandle, parent: Option<SurfaceHandle>) {
        self.record(PlatformCall::SetTransientFor(surface, parent));
    }

    fn set_modal_hint(&mut self, surface: SurfaceHandle, modal: bool) {
        self.record(PlatformCall::SetModalHint(surface, modal));
    }

    fn set_type_hint(&mut self, surface: SurfaceHandle, hint: TypeHint) {
        self.record(PlatformCall::SetTypeHint(surface, hint));
    }

    fn set_window_hints(&mut self, surface: SurfaceHandle, hints: &WindowHints) {
        self.record(PlatformCall::SetWindowHints(surface, *hints));
    }

    fn freeze_updates(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.lock();
        if let Some(s) = state.surface_mut(surface) {
            s.frozen += 1;
        }
        state.calls.push(PlatformCall::Freeze(surface));
    }

    fn thaw_updates(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.lock();
        if let Some(s) = state.surface_mut(surface) {
            s.frozen = s.frozen.saturating_sub(1);
        }
        state.calls.push(PlatformCall::Thaw(surface));
    }

    fn frame_extents(&self, surface: SurfaceHandle) -> Option<Rectangle> {
        let state = self.state.lock();
        let s = state.surfaces.get(&surface)?;
        if s.kind == SurfaceKind::OverrideRedirect {
            return Some(s.geometry);
        }
        let frame = state.frame;
        Some(Rectangle::new(
            s.geometry.x - frame.left,
            s.geometry.y - frame.top,
            s.geometry.width + frame.left + frame.right,
            s.geometry.height + frame.top + frame.bottom,
        ))
    }

    fn geometry(&self, surface: SurfaceHandle) -> Option<Rectangle> {
        self.state.lock().surfaces.get(&surface).map(|s| s.geometry)
    }

    fn state(&self, surface: SurfaceHandle) -> Option<WindowStateFlags> {
        self.state.lock().surfaces.get(&surface).map(|s| s.state)
    }

    fn pointer_position(&self) -> Option<Point> {
        self.state.lock().pointer
    }

    fn monitor_source(&self) -> &dyn MonitorSource {
        self
    }
}

impl MonitorSource for HeadlessPlatform {
    fn screen_size(&self) -> Size {
        self.state.lock().screen
    }

    fn screen_size_mm(&self) -> Size {
        self.state.lock().screen_mm
    }

    fn outputs(&self) -> Option<OutputQuery> {
        let state = self.state.lock();
        let outputs: Vec<OutputInfo> = state
            .monitors
            .iter()
            .enumerate()
            .map(|(index, (name, region))| OutputInfo {
                id: OutputId(index as u32 + 1),
                name: name.clone(),
                connected: true,
                region: Some(*region),
                width_mm: region.width * 254 / 960,
                height_mm: region.height * 254 / 960,
            })
            .collect();
        Some(OutputQuery {
            primary: state.primary.map(|index| OutputId(index as u32 + 1)),
            outputs,
        })
    }

    fn has_multihead_extension(&self) -> bool {
        false
    }

    fn multihead_screens(&self, _variant: MultiheadVariant) -> Option<Vec<Rectangle>> {
        None
    }

    fn workarea(&self) -> Option<Rectangle> {
        self.state.lock().workarea
    }

    fn is_composited(&self) -> bool {
        self.state.lock().composited
    }
}

impl PlatformEventSource for HeadlessPlatform {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.state.lock().events.pop_front()
    }
}
