//! Shared harness for the integration tests: a registry over the headless
//! platform, driven through the calloop event pump.

#![allow(dead_code)]

use anyhow::Result;
use casement::geometry::{Rectangle, Size};
use casement::layout::{BoxLayout, DamageLog, SizeRequest, WidgetId};
use casement::platform::headless::{HeadlessPlatform, PlatformCall};
use casement::{CasementConfig, EventPump, WindowId, WindowKind, WindowRegistry};

pub struct Harness {
    pub registry: WindowRegistry,
    pub platform: HeadlessPlatform,
    pub layout: BoxLayout,
    pub damage: DamageLog,
    pub pump: EventPump,
    next_widget: u64,
}

impl Harness {
    pub fn new() -> Result<Self> {
        Self::with_platform(CasementConfig::default(), HeadlessPlatform::default())
    }

    pub fn with_platform(config: CasementConfig, platform: HeadlessPlatform) -> Result<Self> {
        let layout = BoxLayout::new();
        let damage = DamageLog::new();
        let registry = WindowRegistry::new(
            config,
            Box::new(platform.clone()),
            Box::new(layout.clone()),
            Box::new(damage.clone()),
        );
        Ok(Self {
            registry,
            platform,
            layout,
            damage,
            pump: EventPump::new()?,
            next_widget: 1,
        })
    }

    /// Two 1920x1080 monitors side by side
    pub fn dual_head() -> Result<Self> {
        let platform = HeadlessPlatform::with_monitors(
            Size::new(3840, 1080),
            vec![
                ("DP-1".to_string(), Rectangle::new(0, 0, 1920, 1080)),
                ("DP-2".to_string(), Rectangle::new(1920, 0, 1920, 1080)),
            ],
        );
        Self::with_platform(CasementConfig::default(), platform)
    }

    /// Window with one focusable child of the given size
    pub fn window(&mut self, kind: WindowKind, width: i32, height: i32) -> WindowId {
        let root = WidgetId(self.next_widget);
        let child = WidgetId(self.next_widget + 1);
        self.next_widget += 2;
        self.layout.add_container(root, None, 0, 0);
        self.layout
            .add_leaf(child, Some(root), SizeRequest::fixed(width, height), true);
        self.registry.create_window(kind, root)
    }

    pub fn toplevel(&mut self, width: i32, height: i32) -> WindowId {
        self.window(WindowKind::Toplevel, width, height)
    }

    /// Pump events and idle passes until nothing is left to do
    pub fn settle(&mut self) -> Result<usize> {
        self.pump.run_until_idle(&mut self.registry, &mut self.platform)
    }

    pub fn configure_calls(&self) -> Vec<PlatformCall> {
        self.platform
            .take_calls()
            .into_iter()
            .filter(PlatformCall::is_configure)
            .collect()
    }

    pub fn allocated_size(&self, id: WindowId) -> Option<Size> {
        self.registry
            .window(id)
            .and_then(|w| w.allocation())
            .map(|a| a.size())
    }
}
