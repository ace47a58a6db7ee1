//! # Casement
//!
//! Toplevel window lifecycle and geometry negotiation for a windowing toolkit.
//!
//! Windows ask an asynchronous window manager for positions and sizes, the
//! window manager answers with whatever it decides to grant, and Casement
//! reconciles the two without feedback loops or redundant requests.
//!
//! ## Architecture
//!
//! - `display`: Monitor discovery and the display topology
//! - `hints`: Geometry hints and ICCCM-style size constraints
//! - `window`: Toplevel windows, the configure planner and the state machine
//! - `group`: Window groups and their grab stacks
//! - `registry`: Owner of all windows, groups and event filters
//! - `platform`: Native surface abstraction and the headless backend
//! - `layout`: Layout and renderer seams of the widget tree
//! - `event_loop`: calloop integration
//! - `config`: Configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use casement::platform::headless::HeadlessPlatform;
//! use casement::layout::{BoxLayout, DamageLog, SizeRequest, WidgetId};
//! use casement::{CasementConfig, EventPump, WindowKind, WindowRegistry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut platform = HeadlessPlatform::default();
//!     let layout = BoxLayout::new();
//!     layout.add_container(WidgetId(1), None, 0, 0);
//!     layout.add_leaf(WidgetId(2), Some(WidgetId(1)), SizeRequest::fixed(320, 240), true);
//!
//!     let mut registry = WindowRegistry::new(
//!         CasementConfig::default(),
//!         Box::new(platform.clone()),
//!         Box::new(layout),
//!         Box::new(DamageLog::new()),
//!     );
//!     let window = registry.create_window(WindowKind::Toplevel, WidgetId(1));
//!     registry.show(window)?;
//!
//!     let mut pump = EventPump::new()?;
//!     pump.run_until_idle(&mut registry, &mut platform)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod group;
pub mod hints;
pub mod layout;
pub mod platform;
pub mod registry;
pub mod window;

#[cfg(test)]
mod testing;

// Re-export main types for easy access
pub use config::CasementConfig;
pub use display::{DisplayTopology, Monitor, MonitorSource};
pub use error::{CasementError, Result};
pub use event_loop::EventPump;
pub use geometry::{Point, Rectangle, Size};
pub use group::{DeviceId, GroupId, WindowGroup};
pub use hints::{GeometryHints, Gravity, HintFlags};
pub use platform::{PlatformEvent, PlatformEventSource, PlatformSurface, SurfaceHandle};
pub use registry::{FilterResult, SubscriptionId, WindowRegistry};
pub use window::{PositionPolicy, ToplevelWindow, WindowId, WindowKind, WindowStateFlags};

/// Version information for Casement
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
