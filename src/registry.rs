//! Window registry
//!
//! Owns every toplevel window of one display connection together with the
//! collaborators they talk to. All cross-window work happens here: transient
//! relationships, group membership and grabs, icon inheritance, event routing
//! and the scheduling of check-resize passes. Windows refer to each other by
//! [`WindowId`] only, so a destroyed window simply stops resolving.

use log::{debug, info, trace, warn};
use std::collections::HashMap;

use crate::config::{CasementConfig, ResizeMode};
use crate::display::DisplayTopology;
use crate::error::{CasementError, Result};
use crate::group::{DeviceId, DevicePairs, GroupId, WindowGroup};
use crate::layout::{LayoutEngine, Renderer, WidgetId};
use crate::platform::{
    Decorations, Functions, Icon, IconImage, PlatformEvent, PlatformEventSource, PlatformSurface,
    SurfaceHandle, TypeHint, WindowHints,
};
use crate::window::{IconSource, ToplevelWindow, WindowId, WindowKind, WindowStateFlags};

/// Collaborators shared by every window
pub(crate) struct Services {
    pub config: CasementConfig,
    pub platform: Box<dyn PlatformSurface>,
    pub layout: Box<dyn LayoutEngine>,
    pub renderer: Box<dyn Renderer>,
    pub topology: DisplayTopology,
}

/// What an event filter wants done with the event it saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Let later filters and the default handling see it
    Continue,
    /// Consume the event
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

pub(crate) struct Subscription {
    pub id: SubscriptionId,
    /// `None` for display-wide filters that see every event
    pub surface: Option<SurfaceHandle>,
    pub filter: Box<dyn FnMut(&PlatformEvent) -> FilterResult>,
}

/// Look a window up in `windows`, borrowing only that map
pub(crate) fn window_entry(
    windows: &mut HashMap<WindowId, ToplevelWindow>,
    id: WindowId,
) -> Result<&mut ToplevelWindow> {
    windows.get_mut(&id).ok_or(CasementError::NoSuchWindow(id))
}

pub struct WindowRegistry {
    pub(crate) services: Services,
    pub(crate) windows: HashMap<WindowId, ToplevelWindow>,
    /// Creation order; idle passes walk windows in this order
    pub(crate) toplevels: Vec<WindowId>,
    pub(crate) surfaces: HashMap<SurfaceHandle, WindowId>,
    pub(crate) widgets: HashMap<WidgetId, WindowId>,
    pub(crate) groups: HashMap<GroupId, WindowGroup>,
    /// Group of windows without an explicit one, created on first use
    pub(crate) default_group: Option<GroupId>,
    pub(crate) devices: DevicePairs,
    pub(crate) default_icon_list: Vec<IconImage>,
    pub(crate) default_icon_name: Option<String>,
    pub(crate) subscriptions: Vec<Subscription>,
    next_window: u64,
    next_group: u64,
    next_subscription: u64,
}

impl WindowRegistry {
    pub fn new(
        config: CasementConfig,
        platform: Box<dyn PlatformSurface>,
        layout: Box<dyn LayoutEngine>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        let topology = DisplayTopology::new(config.display.clone(), platform.monitor_source());
        info!(
            "Window registry ready ({} monitor(s), resize mode {:?})",
            topology.n_monitors(),
            config.window.resize_mode
        );
        Self {
            services: Services {
                config,
                platform,
                layout,
                renderer,
                topology,
            },
            windows: HashMap::new(),
            toplevels: Vec::new(),
            surfaces: HashMap::new(),
            widgets: HashMap::new(),
            groups: HashMap::new(),
            default_group: None,
            devices: DevicePairs::default(),
            default_icon_list: Vec::new(),
            default_icon_name: None,
            subscriptions: Vec::new(),
            next_window: 1,
            next_group: 1,
            next_subscription: 1,
        }
    }

    pub fn config(&self) -> &CasementConfig {
        &self.services.config
    }

    pub fn topology(&self) -> &DisplayTopology {
        &self.services.topology
    }

    /// For connecting topology listeners
    pub fn topology_mut(&mut self) -> &mut DisplayTopology {
        &mut self.services.topology
    }

    pub fn platform(&self) -> &dyn PlatformSurface {
        self.services.platform.as_ref()
    }

    pub fn layout(&self) -> &dyn LayoutEngine {
        self.services.layout.as_ref()
    }

    /// Create a window around the root widget `widget`. The window starts unrealized.
    pub fn create_window(&mut self, kind: WindowKind, widget: WidgetId) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;

        self.windows.insert(id, ToplevelWindow::new(id, widget, kind));
        self.toplevels.push(id);
        self.widgets.insert(widget, id);
        debug!("Created {:?} window {} for widget {}", kind, id, widget);
        id
    }

    /// Hide, unrealize and forget the window. Transient children either go with it
    /// or are detached, depending on their destroy-with-parent setting.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        self.hide(id)?;
        self.unrealize(id)?;
        self.unset_transient_for(id);

        let children = match self.windows.get_mut(&id) {
            Some(window) => std::mem::take(&mut window.transient_children),
            None => return Ok(()),
        };
        for child in children {
            let cascade = self
                .windows
                .get(&child)
                .map_or(false, |c| c.destroy_with_parent);
            if cascade {
                self.destroy_window(child)?;
            } else {
                self.unset_transient_for(child);
            }
        }

        if let Some(window) = self.windows.get(&id) {
            let (widget, group) = (window.widget, window.group.or(self.default_group));
            if let Some(group) = group.and_then(|g| self.groups.get_mut(&g)) {
                group.cleanup_grabs(widget, self.services.layout.as_ref());
            }
            self.widgets.remove(&widget);
        }
        self.windows.remove(&id);
        self.toplevels.retain(|w| *w != id);
        debug!("Destroyed window {}", id);
        Ok(())
    }

    pub fn window(&self, id: WindowId) -> Option<&ToplevelWindow> {
        self.windows.get(&id)
    }

    pub fn window_for_surface(&self, surface: SurfaceHandle) -> Option<WindowId> {
        self.surfaces.get(&surface).copied()
    }

    /// Window containing `widget`, found through its outermost ancestor
    pub fn window_for_widget(&self, widget: WidgetId) -> Option<WindowId> {
        let root = self.services.layout.toplevel_of(widget);
        self.widgets.get(&root).copied()
    }

    /// Every live window in creation order
    pub fn list_toplevels(&self) -> &[WindowId] {
        &self.toplevels
    }

    /// Mark the window's geometry dirty after its content changed size. The next
    /// check-resize pass recomputes hints and asks for a new size if needed.
    pub fn queue_resize(&mut self, id: WindowId) -> Result<()> {
        if !self.windows.contains_key(&id) {
            return Err(CasementError::NoSuchWindow(id));
        }
        self.schedule_resize(id);
        Ok(())
    }

    /// Queue a check-resize pass, or run it now in immediate mode
    pub(crate) fn schedule_resize(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        window.queue_resize();
        if self.services.config.window.resize_mode == ResizeMode::Immediate {
            self.check_resize(id);
        }
    }

    pub fn queue_draw(&mut self, id: WindowId) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        window.queue_draw(&mut self.services);
        Ok(())
    }

    // Decoration and window-manager properties

    pub fn set_title(&mut self, id: WindowId, title: &str) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        window.title = Some(title.to_string());
        if let Some(surface) = window.surface {
            self.services.platform.set_title(surface, title);
        }
        Ok(())
    }

    /// Session-management role; ignored for popups
    pub fn set_role(&mut self, id: WindowId, role: Option<&str>) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        window.role = role.map(str::to_string);
        if let Some(surface) = window.surface.filter(|_| window.kind == WindowKind::Toplevel) {
            self.services.platform.set_role(surface, role);
        }
        Ok(())
    }

    pub fn set_decorated(&mut self, id: WindowId, decorated: bool) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.decorated == decorated {
            return Ok(());
        }
        window.decorated = decorated;
        if let Some(surface) = window.surface.filter(|_| window.kind == WindowKind::Toplevel) {
            let decorations = if decorated {
                Decorations::ALL
            } else {
                Decorations::empty()
            };
            self.services.platform.set_decorations(surface, decorations);
        }
        Ok(())
    }

    pub fn set_deletable(&mut self, id: WindowId, deletable: bool) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.deletable == deletable {
            return Ok(());
        }
        window.deletable = deletable;
        if let Some(surface) = window.surface.filter(|_| window.kind == WindowKind::Toplevel) {
            // With ALL set the other bits are exclusions
            let functions = if deletable {
                Functions::ALL
            } else {
                Functions::ALL | Functions::CLOSE
            };
            self.services.platform.set_functions(surface, functions);
        }
        Ok(())
    }

    /// A shown modal window holds a grab on its group
    pub fn set_modal(&mut self, id: WindowId, modal: bool) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.modal == modal {
            return Ok(());
        }
        window.modal = modal;
        let (widget, visible, kind) = (window.widget, window.state.visible, window.kind);
        if let Some(surface) = window.surface.filter(|_| kind == WindowKind::Toplevel) {
            self.services.platform.set_modal_hint(surface, modal);
        }

        if visible {
            if modal {
                self.add_grab(widget)?;
            } else {
                self.remove_grab(widget)?;
            }
        }
        Ok(())
    }

    pub fn set_destroy_with_parent(&mut self, id: WindowId, setting: bool) -> Result<()> {
        window_entry(&mut self.windows, id)?.destroy_with_parent = setting;
        Ok(())
    }

    /// Only valid while unmapped; a realized window resends the hint on its next map
    pub fn set_type_hint(&mut self, id: WindowId, hint: TypeHint) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.is_mapped() {
            return Err(CasementError::StillMapped(id));
        }
        window.type_hint = hint;
        window.reset_type_hint = window.is_realized();
        Ok(())
    }

    fn update_window_hints<F>(&mut self, id: WindowId, update: F) -> Result<()>
    where
        F: FnOnce(&mut WindowHints),
    {
        let window = window_entry(&mut self.windows, id)?;
        let before = window.hints;
        update(&mut window.hints);
        if window.hints == before {
            return Ok(());
        }
        if let Some(surface) = window.surface.filter(|_| window.kind == WindowKind::Toplevel) {
            self.services.platform.set_window_hints(surface, &window.hints);
        }
        Ok(())
    }

    pub fn set_skip_taskbar_hint(&mut self, id: WindowId, setting: bool) -> Result<()> {
        self.update_window_hints(id, |hints| hints.skip_taskbar = setting)
    }

    pub fn set_skip_pager_hint(&mut self, id: WindowId, setting: bool) -> Result<()> {
        self.update_window_hints(id, |hints| hints.skip_pager = setting)
    }

    pub fn set_urgency_hint(&mut self, id: WindowId, setting: bool) -> Result<()> {
        self.update_window_hints(id, |hints| hints.urgent = setting)
    }

    pub fn set_accept_focus(&mut self, id: WindowId, setting: bool) -> Result<()> {
        self.update_window_hints(id, |hints| hints.accept_focus = setting)
    }

    pub fn set_focus_on_map(&mut self, id: WindowId, setting: bool) -> Result<()> {
        self.update_window_hints(id, |hints| hints.focus_on_map = setting)
    }

    /// Clamped to `0.0..=1.0`
    pub fn set_opacity(&mut self, id: WindowId, opacity: f64) -> Result<()> {
        let opacity = opacity.clamp(0.0, 1.0);
        self.update_window_hints(id, |hints| hints.opacity = opacity)
    }

    /// Move focus to `widget`, which must live inside the window
    pub fn set_focus(&mut self, id: WindowId, widget: Option<WidgetId>) -> Result<()> {
        if let Some(widget) = widget {
            if self.window_for_widget(widget) != Some(id) {
                return Err(CasementError::DetachedWidget(widget));
            }
        }
        window_entry(&mut self.windows, id)?.focus_widget = widget;
        Ok(())
    }

    // Window-manager states

    fn request_state(&mut self, id: WindowId, states: &[(WindowStateFlags, bool)]) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        for &(state, enabled) in states {
            window.state.request(state, enabled);
            if let Some(surface) = window.surface {
                self.services.platform.set_state(surface, state, enabled);
            }
        }
        Ok(())
    }

    pub fn iconify(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::ICONIFIED, true)])
    }

    pub fn deiconify(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::ICONIFIED, false)])
    }

    pub fn maximize(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::MAXIMIZED, true)])
    }

    pub fn unmaximize(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::MAXIMIZED, false)])
    }

    pub fn stick(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::STICKY, true)])
    }

    pub fn unstick(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::STICKY, false)])
    }

    pub fn fullscreen(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::FULLSCREEN, true)])
    }

    pub fn unfullscreen(&mut self, id: WindowId) -> Result<()> {
        self.request_state(id, &[(WindowStateFlags::FULLSCREEN, false)])
    }

    /// Keeping above also stops keeping below
    pub fn set_keep_above(&mut self, id: WindowId, setting: bool) -> Result<()> {
        if setting {
            self.request_state(
                id,
                &[(WindowStateFlags::ABOVE, true), (WindowStateFlags::BELOW, false)],
            )
        } else {
            self.request_state(id, &[(WindowStateFlags::ABOVE, false)])
        }
    }

    pub fn set_keep_below(&mut self, id: WindowId, setting: bool) -> Result<()> {
        if setting {
            self.request_state(
                id,
                &[(WindowStateFlags::BELOW, true), (WindowStateFlags::ABOVE, false)],
            )
        } else {
            self.request_state(id, &[(WindowStateFlags::BELOW, false)])
        }
    }

    // Transient relationships

    /// Make `id` transient for `parent`, joining the parent's group if it has one
    pub fn set_transient_for(&mut self, id: WindowId, parent: Option<WindowId>) -> Result<()> {
        if parent == Some(id) {
            return Err(CasementError::SelfTransient(id));
        }
        if let Some(parent) = parent {
            if !self.windows.contains_key(&parent) {
                return Err(CasementError::NoSuchWindow(parent));
            }
        }

        let window = window_entry(&mut self.windows, id)?;
        let old_parent = window.transient_parent;
        if old_parent == parent {
            return Ok(());
        }
        let surface = window.surface;

        if let Some(old_parent) = old_parent {
            let surface_of = |w: Option<WindowId>| {
                w.and_then(|w| self.windows.get(&w)).and_then(|w| w.surface)
            };
            let old_realized = surface_of(Some(old_parent)).is_some();
            // A realized new parent overwrites the hint below
            if let (Some(surface), true, None) = (surface, old_realized, surface_of(parent)) {
                self.services.platform.set_transient_for(surface, None);
            }
            self.unset_transient_for(id);
        }

        let Some(parent) = parent else {
            return Ok(());
        };
        let parent_window = window_entry(&mut self.windows, parent)?;
        parent_window.transient_children.insert(id);
        let (parent_surface, parent_group) = (parent_window.surface, parent_window.group);

        if let Some(window) = self.windows.get_mut(&id) {
            window.transient_parent = Some(parent);
        }
        if let (Some(surface), Some(parent_surface)) = (surface, parent_surface) {
            self.services
                .platform
                .set_transient_for(surface, Some(parent_surface));
        }
        if let Some(group) = parent_group {
            self.group_add_window(group, id)?;
            if let Some(window) = self.windows.get_mut(&id) {
                window.transient_parent_group = true;
            }
        }
        debug!("Window {} is now transient for {}", id, parent);
        Ok(())
    }

    /// Detach `id` from its parent, leaving an inherited group
    fn unset_transient_for(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        let Some(parent) = window.transient_parent.take() else {
            return;
        };
        let inherited_group = std::mem::take(&mut window.transient_parent_group)
            .then_some(window.group)
            .flatten();

        if let Some(parent) = self.windows.get_mut(&parent) {
            parent.transient_children.remove(&id);
        }
        if let Some(group) = inherited_group {
            if let Err(err) = self.group_remove_window(group, id) {
                warn!("Leaving inherited group failed: {}", err);
            }
        }
        trace!("Window {} no longer transient for {}", id, parent);
    }

    // Icons

    /// Icon for the window: its own list, its own name, the parent's list, then the defaults
    fn resolve_icon(&self, id: WindowId) -> Option<(Icon, IconSource)> {
        let window = self.windows.get(&id)?;
        if !window.icon.list.is_empty() {
            return Some((Icon::Images(window.icon.list.clone()), IconSource::OwnList));
        }
        if let Some(name) = &window.icon.name {
            return Some((Icon::Themed(name.clone()), IconSource::OwnName));
        }
        if let Some(parent) = window.transient_parent.and_then(|p| self.windows.get(&p)) {
            if !parent.icon.list.is_empty() {
                return Some((Icon::Images(parent.icon.list.clone()), IconSource::ParentList));
            }
        }
        if !self.default_icon_list.is_empty() {
            return Some((Icon::Images(self.default_icon_list.clone()), IconSource::DefaultList));
        }
        self.default_icon_name
            .as_ref()
            .map(|name| (Icon::Themed(name.clone()), IconSource::DefaultName))
    }

    /// Resolve the icon and hand it to the window's surface
    pub(crate) fn realize_icon(&mut self, id: WindowId) {
        let resolved = self.resolve_icon(id);
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        if window.kind == WindowKind::Popup {
            return;
        }
        let Some(surface) = window.surface else {
            return;
        };

        self.services
            .platform
            .set_icon(surface, resolved.as_ref().map(|(icon, _)| icon));
        window.icon.realized = true;
        window.icon.source = resolved.map(|(_, source)| source);
        trace!("Window {} icon from {:?}", id, window.icon.source);
    }

    fn refresh_icon(&mut self, id: WindowId) {
        if self.windows.get(&id).map_or(false, |w| w.icon.realized) {
            self.realize_icon(id);
        }
        let children: Vec<WindowId> = self
            .windows
            .get(&id)
            .map(|w| w.transient_children.iter().copied().collect())
            .unwrap_or_default();
        for child in children {
            let inherits = self.windows.get(&child).map_or(false, |c| {
                c.icon.realized
                    && !matches!(c.icon.source, Some(IconSource::OwnList | IconSource::OwnName))
            });
            if inherits {
                self.realize_icon(child);
            }
        }
    }

    pub fn set_icon_list(&mut self, id: WindowId, list: Vec<IconImage>) -> Result<()> {
        window_entry(&mut self.windows, id)?.icon.list = list;
        self.refresh_icon(id);
        Ok(())
    }

    /// Themed icon; replaces any explicit icon list
    pub fn set_icon_name(&mut self, id: WindowId, name: Option<&str>) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        window.icon.name = name.map(str::to_string);
        window.icon.list.clear();
        self.refresh_icon(id);
        Ok(())
    }

    pub fn set_default_icon_list(&mut self, list: Vec<IconImage>) {
        self.default_icon_list = list;
        self.refresh_default_icons();
    }

    pub fn set_default_icon_name(&mut self, name: Option<&str>) {
        self.default_icon_name = name.map(str::to_string);
        self.refresh_default_icons();
    }

    /// Re-resolve windows whose icon came from the defaults, or that had none
    fn refresh_default_icons(&mut self) {
        let affected: Vec<WindowId> = self
            .toplevels
            .iter()
            .copied()
            .filter(|id| {
                self.windows.get(id).map_or(false, |w| {
                    w.icon.realized
                        && matches!(
                            w.icon.source,
                            None | Some(IconSource::DefaultList) | Some(IconSource::DefaultName)
                        )
                })
            })
            .collect();
        for id in affected {
            self.realize_icon(id);
        }
    }

    // Groups and grabs

    pub fn create_group(&mut self) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        self.groups.insert(id, WindowGroup::new(id));
        id
    }

    fn default_group_id(&mut self) -> GroupId {
        match self.default_group {
            Some(id) => id,
            None => {
                let id = self.create_group();
                self.default_group = Some(id);
                id
            }
        }
    }

    /// Group the window belongs to; the shared default group if none was set
    pub fn window_group(&mut self, id: WindowId) -> Result<GroupId> {
        let explicit = self
            .windows
            .get(&id)
            .ok_or(CasementError::NoSuchWindow(id))?
            .group;
        Ok(match explicit {
            Some(group) => group,
            None => self.default_group_id(),
        })
    }

    /// Whether the window was put into a group explicitly
    pub fn has_group(&self, id: WindowId) -> Result<bool> {
        let window = self.window(id).ok_or(CasementError::NoSuchWindow(id))?;
        Ok(window.group.is_some())
    }

    pub fn group(&self, id: GroupId) -> Option<&WindowGroup> {
        self.groups.get(&id)
    }

    /// Move the window into `group`, dropping its grabs in the group it leaves
    pub fn group_add_window(&mut self, group: GroupId, id: WindowId) -> Result<()> {
        if !self.groups.contains_key(&group) {
            return Err(CasementError::NoSuchGroup(group));
        }
        let window = window_entry(&mut self.windows, id)?;
        if window.group == Some(group) {
            return Ok(());
        }

        let (widget, old) = (window.widget, window.group.or(self.default_group));
        window.group = Some(group);
        if let Some(old) = old.and_then(|g| self.groups.get_mut(&g)) {
            old.cleanup_grabs(widget, self.services.layout.as_ref());
        }
        debug!("Window {} joined group {}", id, group);
        Ok(())
    }

    /// Return the window to the default group
    pub fn group_remove_window(&mut self, group: GroupId, id: WindowId) -> Result<()> {
        let window = window_entry(&mut self.windows, id)?;
        if window.group != Some(group) {
            return Err(CasementError::NotInGroup { window: id, group });
        }
        window.group = None;
        let widget = window.widget;
        if let Some(group) = self.groups.get_mut(&group) {
            group.cleanup_grabs(widget, self.services.layout.as_ref());
        }
        debug!("Window {} left group {}", id, group);
        Ok(())
    }

    /// Members of `group`, in creation order
    pub fn list_group_windows(&self, group: GroupId) -> Result<Vec<WindowId>> {
        if !self.groups.contains_key(&group) {
            return Err(CasementError::NoSuchGroup(group));
        }
        let is_default = self.default_group == Some(group);
        Ok(self
            .toplevels
            .iter()
            .copied()
            .filter(|id| {
                self.windows.get(id).map_or(false, |w| match w.group {
                    Some(g) => g == group,
                    None => is_default,
                })
            })
            .collect())
    }

    /// Group of the window containing `widget`
    fn widget_group(&mut self, widget: WidgetId) -> Result<GroupId> {
        let id = self
            .window_for_widget(widget)
            .ok_or(CasementError::DetachedWidget(widget))?;
        self.window_group(id)
    }

    fn group_entry(&mut self, group: GroupId) -> Result<&mut WindowGroup> {
        self.groups
            .get_mut(&group)
            .ok_or(CasementError::NoSuchGroup(group))
    }

    pub fn add_grab(&mut self, widget: WidgetId) -> Result<()> {
        let group = self.widget_group(widget)?;
        self.group_entry(group)?.add_grab(widget);
        Ok(())
    }

    pub fn remove_grab(&mut self, widget: WidgetId) -> Result<()> {
        let group = self.widget_group(widget)?;
        self.group_entry(group)?.remove_grab(widget);
        Ok(())
    }

    pub fn current_grab(&self, group: GroupId) -> Result<Option<WidgetId>> {
        self.groups
            .get(&group)
            .map(WindowGroup::current_grab)
            .ok_or(CasementError::NoSuchGroup(group))
    }

    pub fn add_device(&mut self, device: DeviceId) {
        self.devices.add(device);
    }

    /// Pair a pointer with its keyboard; grabs on one then apply to both
    pub fn associate_devices(&mut self, a: DeviceId, b: DeviceId) -> Result<()> {
        for device in [a, b] {
            if !self.devices.contains(device) {
                return Err(CasementError::NoSuchDevice(device));
            }
        }
        self.devices.associate(a, b);
        Ok(())
    }

    pub fn add_device_grab(&mut self, widget: WidgetId, device: DeviceId, block_others: bool) -> Result<()> {
        if !self.devices.contains(device) {
            return Err(CasementError::NoSuchDevice(device));
        }
        let group = self.widget_group(widget)?;
        self.group_entry(group)?
            .add_device_grab(widget, device, block_others);
        Ok(())
    }

    pub fn remove_device_grab(&mut self, widget: WidgetId, device: DeviceId) -> Result<()> {
        let group = self.widget_group(widget)?;
        let pairs = self.devices.clone();
        self.group_entry(group)?
            .remove_device_grab(widget, device, &pairs);
        Ok(())
    }

    pub fn current_device_grab(&self, group: GroupId, device: DeviceId) -> Result<Option<WidgetId>> {
        self.groups
            .get(&group)
            .map(|g| g.current_device_grab(device, &self.devices))
            .ok_or(CasementError::NoSuchGroup(group))
    }

    pub fn widget_is_blocked_for_device(
        &self,
        group: GroupId,
        widget: WidgetId,
        device: DeviceId,
    ) -> Result<bool> {
        self.groups
            .get(&group)
            .map(|g| {
                g.widget_is_blocked_for_device(
                    widget,
                    device,
                    &self.devices,
                    self.services.layout.as_ref(),
                )
            })
            .ok_or(CasementError::NoSuchGroup(group))
    }

    // Event filters

    /// Register a filter for one surface's events, or for every event with `None`
    pub fn subscribe<F>(&mut self, surface: Option<SurfaceHandle>, filter: F) -> SubscriptionId
    where
        F: FnMut(&PlatformEvent) -> FilterResult + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription {
            id,
            surface,
            filter: Box::new(filter),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Run matching filters in registration order; true if one consumed the event
    pub(crate) fn run_filters(&mut self, event: &PlatformEvent) -> bool {
        let target = event.surface();
        self.subscriptions
            .iter_mut()
            .filter(|s| s.surface.is_none() || s.surface == target)
            .any(|s| (s.filter)(event) == FilterResult::Remove)
    }

    /// Deliver every event `source` has ready; returns how many were handled
    pub fn dispatch_pending(&mut self, source: &mut dyn PlatformEventSource) -> usize {
        let mut handled = 0;
        while let Some(event) = source.poll_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }
}
