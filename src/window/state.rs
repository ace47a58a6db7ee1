//! Per-window state flags and lifecycle bookkeeping.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Window-manager controlled states
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct WindowStateFlags: u32 {
        const ICONIFIED = 1 << 0;
        const MAXIMIZED = 1 << 1;
        const STICKY = 1 << 2;
        const FULLSCREEN = 1 << 3;
        const ABOVE = 1 << 4;
        const BELOW = 1 << 5;
    }
}

impl WindowStateFlags {
    /// The states replayed to the platform every time a window maps
    pub const REPLAYED: [WindowStateFlags; 6] = [
        WindowStateFlags::MAXIMIZED,
        WindowStateFlags::STICKY,
        WindowStateFlags::ICONIFIED,
        WindowStateFlags::FULLSCREEN,
        WindowStateFlags::ABOVE,
        WindowStateFlags::BELOW,
    ];
}

/// Native-surface lifecycle of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Lifecycle {
    /// No native surface
    #[default]
    Unrealized,
    /// Surface exists but is withdrawn
    Realized,
    /// Surface is shown
    Mapped,
}

impl Lifecycle {
    pub fn is_realized(self) -> bool {
        !matches!(self, Lifecycle::Unrealized)
    }

    pub fn is_mapped(self) -> bool {
        matches!(self, Lifecycle::Mapped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowState {
    pub lifecycle: Lifecycle,
    /// Shown by the application, whether or not the platform has mapped it yet
    pub visible: bool,
    /// States as last reported by the platform
    pub confirmed: WindowStateFlags,
    /// States the application asked for; replayed on every map
    pub requested: WindowStateFlags,
    /// Configure requests sent and not yet answered by a notify
    pub configure_request_count: u32,
    /// A notify was accepted and the next pass must reconcile against it
    pub configure_notify_received: bool,
    pub need_default_size: bool,
    pub need_default_position: bool,
    /// Outstanding freeze_updates calls on the surface
    pub freeze_count: u32,
    /// A redraw was requested while frozen
    pub pending_draw: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Unrealized,
            visible: false,
            confirmed: WindowStateFlags::empty(),
            requested: WindowStateFlags::empty(),
            configure_request_count: 0,
            configure_notify_received: false,
            need_default_size: true,
            need_default_position: true,
            freeze_count: 0,
            pending_draw: false,
        }
    }
}

impl WindowState {
    pub fn is_realized(&self) -> bool {
        self.lifecycle.is_realized()
    }

    pub fn is_mapped(&self) -> bool {
        self.lifecycle.is_mapped()
    }

    /// Whether a sent configure request is still unanswered
    pub fn awaiting_notify(&self) -> bool {
        self.configure_request_count > 0 && !self.configure_notify_received
    }

    /// Record the intended value of one state
    pub fn request(&mut self, state: WindowStateFlags, enabled: bool) {
        self.requested.set(state, enabled);
    }
}
