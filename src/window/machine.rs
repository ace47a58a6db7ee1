//! Window state machine
//!
//! Drives windows through realize, map, unmap and unrealize, and reconciles the
//! configure requests we send against the notifies the window manager sends
//! back. Requests are fire-and-forget: an outstanding request is tracked by the
//! in-flight counter and no further request is sent until it is answered.

use log::{debug, trace, warn};

use super::planner::{LastConfigure, ParentInfo};
use super::{Lifecycle, PositionPolicy, ToplevelWindow, WindowId, WindowKind, WindowStateFlags};
use crate::error::{CasementError, Result};
use crate::geometry::{Rectangle, Size};
use crate::hints::HintFlags;
use crate::platform::{
    query_live, Decorations, Functions, PlatformEvent, SurfaceAttributes, SurfaceHandle,
    SurfaceKind,
};
use crate::registry::{window_entry, Services, WindowRegistry};

impl ToplevelWindow {
    /// Hand `size` to the layout engine as the window's allocation
    pub(crate) fn allocate(&mut self, services: &mut Services, size: Size) {
        let allocation = Rectangle::from_size(size);
        self.allocation = Some(allocation);
        self.alloc_needed = false;
        services.layout.allocate(self.widget, allocation);
    }

    pub(crate) fn freeze(&mut self, services: &mut Services) {
        if let Some(surface) = self.surface {
            services.platform.freeze_updates(surface);
            self.state.freeze_count += 1;
        }
    }

    pub(crate) fn thaw(&mut self, services: &mut Services) {
        let Some(surface) = self.surface else {
            return;
        };
        if self.state.freeze_count == 0 {
            return;
        }

        services.platform.thaw_updates(surface);
        self.state.freeze_count -= 1;
        if self.state.freeze_count == 0 && self.state.pending_draw {
            self.state.pending_draw = false;
            services.renderer.invalidate(surface, None);
        }
    }

    /// Repaint the whole window, or hold the request while updates are frozen
    pub(crate) fn queue_draw(&mut self, services: &mut Services) {
        let Some(surface) = self.surface else {
            return;
        };
        if self.state.freeze_count > 0 {
            self.state.pending_draw = true;
        } else {
            services.renderer.invalidate(surface, None);
        }
    }

    /// Create the native surface and push every deferred attribute to it
    pub(crate) fn realize_surface(
        &mut self,
        services: &mut Services,
        transient_for: Option<SurfaceHandle>,
    ) -> SurfaceHandle {
        if let Some(surface) = self.surface {
            return surface;
        }

        let allocation = match self.allocation {
            Some(allocation) => allocation,
            None => {
                let size = self.initial_size(services);
                self.allocate(services, size);
                Rectangle::from_size(size)
            }
        };

        let kind = match self.kind {
            WindowKind::Toplevel => SurfaceKind::Managed,
            WindowKind::Popup => SurfaceKind::OverrideRedirect,
        };
        let attributes = SurfaceAttributes {
            geometry: allocation,
            title: self.title.clone(),
            type_hint: self.type_hint,
        };

        let platform = services.platform.as_mut();
        let surface = platform.create(None, kind, &attributes);
        self.surface = Some(surface);
        self.state.lifecycle = Lifecycle::Realized;
        self.reset_type_hint = false;

        if let Some(parent) = transient_for {
            platform.set_transient_for(surface, Some(parent));
        }

        if self.kind == WindowKind::Toplevel {
            if self.role.is_some() {
                platform.set_role(surface, self.role.as_deref());
            }
            if !self.decorated {
                platform.set_decorations(surface, Decorations::empty());
            }
            if !self.deletable {
                platform.set_functions(surface, Functions::ALL | Functions::CLOSE);
            }
            platform.set_window_hints(surface, &self.hints);
            if self.modal {
                platform.set_modal_hint(surface, true);
            }
        }

        debug!(
            "Realized window {} as surface {} at {}x{}",
            self.id, surface, allocation.width, allocation.height
        );
        surface
    }

    /// Destroy the native surface; the next show starts from default sizing again
    pub(crate) fn unrealize_surface(&mut self, services: &mut Services) -> Option<SurfaceHandle> {
        let surface = self.surface.take()?;

        self.state.need_default_size = true;
        if let Some(info) = self.geometry.as_deref_mut() {
            info.resize_width = -1;
            info.resize_height = -1;
            // Hints must be resent to the next surface
            info.last = LastConfigure::default();
        }
        self.icon.realized = false;
        self.icon.source = None;
        self.state.freeze_count = 0;
        self.state.pending_draw = false;
        self.state.lifecycle = Lifecycle::Unrealized;
        self.alloc_needed = true;

        services.platform.destroy(surface);
        debug!("Unrealized window {} (surface {})", self.id, surface);
        Some(surface)
    }

    pub(crate) fn map_surface(&mut self, services: &mut Services) {
        let Some(surface) = self.surface else {
            return;
        };
        self.state.lifecycle = Lifecycle::Mapped;

        let platform = services.platform.as_mut();
        for flag in WindowStateFlags::REPLAYED {
            platform.set_state(surface, flag, self.state.requested.contains(flag));
        }

        // Defaults have been used; later shows keep the current size and place
        self.state.need_default_size = false;
        self.state.need_default_position = false;

        if self.reset_type_hint {
            platform.set_type_hint(surface, self.type_hint);
            self.reset_type_hint = false;
        }

        platform.show(surface);
        debug!("Mapped window {}", self.id);
    }

    pub(crate) fn unmap_surface(&mut self, services: &mut Services) {
        if !self.is_mapped() {
            return;
        }
        let Some(surface) = self.surface else {
            return;
        };

        self.state.lifecycle = Lifecycle::Realized;
        services.platform.hide(surface);

        self.state.configure_request_count = 0;
        self.state.configure_notify_received = false;
        while self.state.freeze_count > 0 {
            self.thaw(services);
        }

        // Place again on the next show, but remember the size
        self.state.need_default_position = true;
        if let Some(info) = self.geometry.as_deref_mut() {
            info.initial_pos_set = false;
            info.position_constraints_changed = false;
        }

        if let Some(current) = query_live(services.platform.as_ref(), surface, |p, s| p.state(s)) {
            let fullscreen = self.state.requested & WindowStateFlags::FULLSCREEN;
            self.state.requested = current.difference(WindowStateFlags::FULLSCREEN) | fullscreen;
        }
        debug!("Unmapped window {}", self.id);
    }

    /// One check-resize pass: plan, compare with the last request and decide
    /// whether and how to talk to the platform.
    pub(crate) fn move_resize(&mut self, services: &mut Services, parent: Option<&ParentInfo>) {
        let Some(surface) = self.surface else {
            return;
        };

        let mut plan = self.compute_configure_request(services, parent);
        let policy = self.effective_position(parent);
        let info = self.geometry_info_mut();
        let saved_last = info.last;
        let constraints_changed = info.position_constraints_changed;
        let initial_pos_set = info.initial_pos_set;

        let mut pos_changed = plan.rect.origin() != saved_last.request.origin();
        let size_changed = plan.rect.size() != saved_last.request.size();
        let computed_hints_changed = !saved_last.hints.equivalent(&plan.hints);
        let mut hints_changed = computed_hints_changed;

        if pos_changed || size_changed || hints_changed || constraints_changed {
            let origin = self.constrain_position(services, plan.rect.size(), plan.rect.origin());
            plan.rect.x = origin.x;
            plan.rect.y = origin.y;
            pos_changed = origin != saved_last.request.origin();
        }

        let platform = services.platform.as_mut();

        if self.state.awaiting_notify() {
            // Wait for the outstanding notify; the request is planned again once it arrives
            if computed_hints_changed {
                platform.set_geometry_hints(surface, &plan.hints);
            }
            self.geometry_info_mut().last.hints = plan.hints;
            trace!(
                "Window {} holding {:?} until {} configure notify(s) arrive",
                self.id,
                plan.rect,
                self.state.configure_request_count
            );
            return;
        }

        self.geometry_info_mut().last = LastConfigure {
            request: plan.rect,
            hints: plan.hints,
        };

        let mut sent_hints = plan.hints;
        if (pos_changed
            || initial_pos_set
            || (self.state.need_default_position && policy != PositionPolicy::None))
            && !sent_hints.flags.contains(HintFlags::POS)
        {
            sent_hints.flags |= HintFlags::POS;
            hints_changed = true;
        }

        if hints_changed {
            platform.set_geometry_hints(surface, &sent_hints);
        }

        let allocation_size = self.allocation.map(|a| a.size()).unwrap_or_default();

        if self.state.configure_notify_received {
            self.state.configure_notify_received = false;
            self.allocate(services, allocation_size);

            // A widget changed its request while we were allocating. Forget that
            // we sent this plan and look again on the next pass instead of
            // fighting the window manager now.
            if pos_changed || size_changed {
                self.geometry_info_mut().last = saved_last;
                self.queue_resize();
            }
            return;
        }

        if (size_changed || hints_changed) && allocation_size != plan.rect.size() {
            if pos_changed {
                platform.move_resize(surface, plan.rect);
            } else {
                platform.resize(surface, plan.rect.width, plan.rect.height);
            }
            debug!(
                "Window {} requested {}x{}+{}+{}",
                self.id, plan.rect.width, plan.rect.height, plan.rect.x, plan.rect.y
            );

            if self.kind == WindowKind::Popup {
                self.allocate(services, plan.rect.size());
                self.queue_draw(services);
            } else {
                self.state.configure_request_count += 1;
                self.freeze(services);
            }
        } else {
            if pos_changed {
                platform.move_to(surface, plan.rect.x, plan.rect.y);
            }
            if self.alloc_needed || services.layout.needs_allocation(self.widget) {
                self.allocate(services, allocation_size);
            }
        }

        let info = self.geometry_info_mut();
        info.position_constraints_changed = false;
        info.initial_pos_set = false;
        info.resize_width = -1;
        info.resize_height = -1;
    }

    /// Accept a geometry reported by the platform
    pub(crate) fn configure_event(&mut self, services: &mut Services, geometry: Rectangle) {
        let expected = self.state.configure_request_count > 0;
        if expected {
            self.state.configure_request_count -= 1;
            self.thaw(services);
        }

        if !expected && self.allocation.map(|a| a.size()) == Some(geometry.size()) {
            trace!("Window {} moved to {},{}", self.id, geometry.x, geometry.y);
            return;
        }

        debug!(
            "Window {} configured to {}x{} ({})",
            self.id,
            geometry.width,
            geometry.height,
            if expected { "reply" } else { "window manager" }
        );
        self.state.configure_notify_received = true;
        self.allocation = Some(Rectangle::from_size(geometry.size()));
        self.queue_draw(services);
        self.queue_resize();
    }

    pub(crate) fn state_event(&mut self, state: WindowStateFlags) {
        let changed = self.state.confirmed ^ state;
        self.state.confirmed = state;
        if changed.contains(WindowStateFlags::FULLSCREEN) {
            self.state
                .requested
                .set(WindowStateFlags::FULLSCREEN, state.contains(WindowStateFlags::FULLSCREEN));
        }
        trace!("Window {} state now {:?}", self.id, state);
    }
}

impl WindowRegistry {
    /// Parent geometry for the planner, if the window has a transient parent
    pub(crate) fn parent_info(&self, id: WindowId) -> Option<ParentInfo> {
        let parent = self
            .windows
            .get(&id)?
            .transient_parent
            .and_then(|parent| self.windows.get(&parent))?;
        Some(ParentInfo {
            mapped: parent.is_mapped(),
            surface: parent.surface,
            allocation: parent.allocation.unwrap_or_default(),
        })
    }

    fn parent_surface(&self, id: WindowId) -> Option<SurfaceHandle> {
        let parent = self.windows.get(&id)?.transient_parent?;
        self.windows.get(&parent)?.surface
    }

    /// Create the window's native surface without showing it
    pub fn realize(&mut self, id: WindowId) -> Result<()> {
        let transient_for = self.parent_surface(id);
        let window = window_entry(&mut self.windows, id)?;
        if window.is_realized() {
            return Ok(());
        }

        let surface = window.realize_surface(&mut self.services, transient_for);
        let children: Vec<WindowId> = window.transient_children.iter().copied().collect();
        self.surfaces.insert(surface, id);
        self.realize_icon(id);

        for child in children {
            if let Some(child_surface) = self.windows.get(&child).and_then(|c| c.surface) {
                self.services
                    .platform
                    .set_transient_for(child_surface, Some(surface));
            }
        }
        Ok(())
    }

    /// Destroy the native surface of an unmapped window
    pub fn unrealize(&mut self, id: WindowId) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.is_mapped() {
            return Err(CasementError::StillMapped(id));
        }

        let children: Vec<WindowId> = window.transient_children.iter().copied().collect();
        let Some(surface) = window.unrealize_surface(&mut self.services) else {
            return Ok(());
        };
        self.surfaces.remove(&surface);
        self.subscriptions.retain(|s| s.surface != Some(surface));

        for child in children {
            if let Some(child_surface) = self.windows.get(&child).and_then(|c| c.surface) {
                self.services.platform.set_transient_for(child_surface, None);
            }
        }
        Ok(())
    }

    /// Show the window: size it, realize it if needed, run a check-resize pass and map it
    pub fn show(&mut self, id: WindowId) -> Result<()> {
        let parent = self.parent_info(id);
        let window = window_entry(&mut self.windows, id)?;
        if window.state.visible {
            return Ok(());
        }
        window.state.visible = true;

        if window.alloc_needed || !window.is_realized() {
            let request = window.compute_configure_request(&mut self.services, parent.as_ref());

            // Applied directly below rather than queued
            let last = &mut window.geometry_info_mut().last.request;
            last.width = request.rect.width;
            last.height = request.rect.height;
            window.allocate(&mut self.services, request.rect.size());

            let surface = window.surface;
            match surface {
                // A fresh surface is created at the allocated size already
                Some(surface) => self.services.platform.move_resize(surface, request.rect),
                None => self.realize(id)?,
            }
        }

        self.check_resize(id);

        let window = window_entry(&mut self.windows, id)?;
        window.map_surface(&mut self.services);

        if window.focus_widget.is_none() && self.services.config.window.focus_on_show {
            window.focus_widget = self.services.layout.first_focusable(window.widget);
        }

        let (modal, widget) = (window.modal, window.widget);
        if modal {
            self.add_grab(widget)?;
        }
        Ok(())
    }

    pub fn hide(&mut self, id: WindowId) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if !window.state.visible {
            return Ok(());
        }
        window.state.visible = false;
        window.unmap_surface(&mut self.services);

        let (modal, widget) = (window.modal, window.widget);
        if modal {
            self.remove_grab(widget)?;
        }
        Ok(())
    }

    /// Show, or bring back from iconified if already shown
    pub fn present(&mut self, id: WindowId) -> Result<()> {
        let window = self.window(id).ok_or(CasementError::NoSuchWindow(id))?;
        if !window.is_visible() {
            return self.show(id);
        }

        let surface = window.surface;
        self.deiconify(id)?;
        if let Some(surface) = surface {
            self.services.platform.show(surface);
        }
        Ok(())
    }

    /// Hide, drop the surface and show again, so default size and position apply anew
    pub fn reshow_with_initial_size(&mut self, id: WindowId) -> Result<()> {
        self.hide(id)?;
        self.unrealize(id)?;
        self.show(id)
    }

    /// Run the window's pending check-resize pass now
    pub(crate) fn check_resize(&mut self, id: WindowId) {
        let parent = self.parent_info(id);
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        window.resize_pending = false;
        if window.state.visible {
            window.move_resize(&mut self.services, parent.as_ref());
        }
    }

    /// Whether the window needs a check-resize pass: queued explicitly, or shown
    /// with content that changed its size request since the last allocation
    fn needs_check_resize(&self, window: &ToplevelWindow) -> bool {
        window.resize_pending
            || (window.state.visible
                && window.surface.is_some()
                && !window.state.awaiting_notify()
                && self.services.layout.needs_allocation(window.widget))
    }

    /// Run every queued check-resize pass. Windows queued while this runs wait for the
    /// next call.
    pub fn run_idle(&mut self) -> usize {
        let queued: Vec<WindowId> = self
            .toplevels
            .iter()
            .copied()
            .filter(|id| self.windows.get(id).map_or(false, |w| self.needs_check_resize(w)))
            .collect();

        for id in &queued {
            self.check_resize(*id);
        }
        if !queued.is_empty() {
            trace!("Idle pass handled {} window(s)", queued.len());
        }
        queued.len()
    }

    pub fn has_pending_resizes(&self) -> bool {
        self.windows.values().any(|w| self.needs_check_resize(w))
    }

    /// Deliver one platform event: subscribed filters first, then the window or topology
    pub fn handle_event(&mut self, event: PlatformEvent) {
        if self.run_filters(&event) {
            trace!("Event consumed by filter: {:?}", event);
            return;
        }

        match event {
            PlatformEvent::ConfigureNotify { surface, geometry } => {
                if let Some(window) = self.event_window(surface).and_then(|id| self.windows.get_mut(&id)) {
                    window.configure_event(&mut self.services, geometry);
                }
            }
            PlatformEvent::MapNotify { surface } => {
                if let Some(window) = self.event_window(surface).and_then(|id| self.windows.get(&id)) {
                    if !window.is_mapped() {
                        // Mapped behind our back after we asked for an unmap
                        debug!("Window {} mapped while hidden, withdrawing again", window.id);
                        self.services.platform.hide(surface);
                    }
                }
            }
            PlatformEvent::UnmapNotify { surface } => {
                trace!("Surface {} unmapped", surface);
            }
            PlatformEvent::StateChanged { surface, state } => {
                if let Some(window) = self.event_window(surface).and_then(|id| self.windows.get_mut(&id)) {
                    window.state_event(state);
                }
            }
            PlatformEvent::TopologyChanged => {
                let change = self
                    .services
                    .topology
                    .refresh(self.services.platform.monitor_source());
                if change.monitors_changed {
                    debug!("Topology now has {} monitor(s)", self.services.topology.n_monitors());
                }
            }
            PlatformEvent::SelectionOwnerChanged => {
                let changed = self
                    .services
                    .topology
                    .update_composited(self.services.platform.monitor_source());
                if changed {
                    for window in self.windows.values_mut() {
                        window.queue_draw(&mut self.services);
                    }
                }
            }
        }
    }

    /// Window owning `surface`; events for destroyed surfaces are dropped
    fn event_window(&self, surface: SurfaceHandle) -> Option<WindowId> {
        let id = self.surfaces.get(&surface).copied();
        if id.is_none() {
            warn!("Event for unknown surface {}, ignoring", surface);
        }
        id
    }
}
