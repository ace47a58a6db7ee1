//! Errors surfaced for API misuse.
//!
//! Geometry negotiation itself never fails: window-manager behaviour and
//! platform query failures are handled where they are detected. These errors
//! only cover calls that reference things which do not exist or are invalid.

use thiserror::Error;

use crate::group::{DeviceId, GroupId};
use crate::layout::WidgetId;
use crate::window::WindowId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CasementError {
    #[error("Window {0} not found")]
    NoSuchWindow(WindowId),

    #[error("Window {window} is not a member of group {group}")]
    NotInGroup { window: WindowId, group: GroupId },

    #[error("Window group {0} not found")]
    NoSuchGroup(GroupId),

    #[error("Widget {0} does not belong to any window")]
    DetachedWidget(WidgetId),

    #[error("Device {0} is not known")]
    NoSuchDevice(DeviceId),

    #[error("Window {0} cannot be transient for itself")]
    SelfTransient(WindowId),

    #[error("Invalid size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: i32, height: i32 },

    #[error("Invalid geometry string: {0}")]
    InvalidGeometry(String),

    #[error("Operation not valid while window {0} is mapped")]
    StillMapped(WindowId),
}

pub type Result<T> = std::result::Result<T, CasementError>;
