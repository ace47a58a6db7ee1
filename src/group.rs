//! Window groups
//!
//! A group scopes input grabs to a cluster of related windows: a modal dialog
//! only blocks the windows of its own group. Each group keeps two stacks, one of
//! widget grabs and one of per-device grabs; the most recent entry is first.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::layout::{LayoutEngine, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known input devices and their associations, e.g. a pointer and its keyboard
#[derive(Debug, Clone, Default)]
pub struct DevicePairs {
    devices: HashMap<DeviceId, Option<DeviceId>>,
}

impl DevicePairs {
    pub fn add(&mut self, device: DeviceId) {
        self.devices.entry(device).or_insert(None);
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.devices.contains_key(&device)
    }

    /// Pair two known devices, breaking any previous pairing of either
    pub fn associate(&mut self, a: DeviceId, b: DeviceId) {
        for device in [a, b] {
            if let Some(Some(old)) = self.devices.insert(device, None) {
                self.devices.insert(old, None);
            }
        }
        self.devices.insert(a, Some(b));
        self.devices.insert(b, Some(a));
    }

    pub fn associated(&self, device: DeviceId) -> Option<DeviceId> {
        self.devices.get(&device).copied().flatten()
    }

    /// Whether a grab held by `grab_device` applies to `device`
    fn same_pair(&self, grab_device: DeviceId, device: DeviceId) -> bool {
        grab_device == device || self.associated(device) == Some(grab_device)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceGrab {
    pub widget: WidgetId,
    pub device: DeviceId,
    /// Block events from all other devices for widgets inside the grab
    pub block_others: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowGroup {
    id: GroupId,
    grabs: Vec<WidgetId>,
    device_grabs: Vec<DeviceGrab>,
}

impl WindowGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            grabs: Vec::new(),
            device_grabs: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Widget grabs, most recent first
    pub fn grabs(&self) -> &[WidgetId] {
        &self.grabs
    }

    pub fn device_grabs(&self) -> &[DeviceGrab] {
        &self.device_grabs
    }

    /// Push a grab; a widget already holding one is left where it is
    pub fn add_grab(&mut self, widget: WidgetId) -> bool {
        if self.grabs.contains(&widget) {
            return false;
        }
        self.grabs.insert(0, widget);
        debug!("Group {} grab added for widget {}", self.id, widget);
        true
    }

    pub fn remove_grab(&mut self, widget: WidgetId) -> bool {
        match self.grabs.iter().position(|w| *w == widget) {
            Some(index) => {
                self.grabs.remove(index);
                debug!("Group {} grab removed for widget {}", self.id, widget);
                true
            }
            None => false,
        }
    }

    pub fn current_grab(&self) -> Option<WidgetId> {
        self.grabs.first().copied()
    }

    pub fn add_device_grab(&mut self, widget: WidgetId, device: DeviceId, block_others: bool) {
        self.device_grabs.insert(
            0,
            DeviceGrab {
                widget,
                device,
                block_others,
            },
        );
    }

    /// Remove the newest grab of `widget` on `device` or its associated device
    pub fn remove_device_grab(
        &mut self,
        widget: WidgetId,
        device: DeviceId,
        pairs: &DevicePairs,
    ) -> bool {
        match self
            .device_grabs
            .iter()
            .position(|g| g.widget == widget && pairs.same_pair(g.device, device))
        {
            Some(index) => {
                self.device_grabs.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn current_device_grab(&self, device: DeviceId, pairs: &DevicePairs) -> Option<WidgetId> {
        self.device_grabs
            .iter()
            .find(|g| pairs.same_pair(g.device, device))
            .map(|g| g.widget)
    }

    /// Whether a blocking grab held by another device pair covers `widget`
    pub fn widget_is_blocked_for_device(
        &self,
        widget: WidgetId,
        device: DeviceId,
        pairs: &DevicePairs,
        layout: &dyn LayoutEngine,
    ) -> bool {
        self.device_grabs.iter().any(|g| {
            g.block_others
                && !pairs.same_pair(g.device, device)
                && (g.widget == widget || layout.is_ancestor(widget, g.widget))
        })
    }

    /// Drop every grab held by a widget inside the window rooted at `window_widget`
    pub(crate) fn cleanup_grabs(&mut self, window_widget: WidgetId, layout: &dyn LayoutEngine) -> usize {
        let before = self.grabs.len() + self.device_grabs.len();
        self.grabs
            .retain(|widget| layout.toplevel_of(*widget) != window_widget);
        self.device_grabs
            .retain(|grab| layout.toplevel_of(grab.widget) != window_widget);
        let removed = before - self.grabs.len() - self.device_grabs.len();
        if removed > 0 {
            debug!(
                "Group {} dropped {} grab(s) of window widget {}",
                self.id, removed, window_widget
            );
        }
        removed
    }
}
