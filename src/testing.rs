//! Fixtures shared by the unit tests.

use crate::config::CasementConfig;
use crate::geometry::Size;
use crate::layout::{BoxLayout, DamageLog, SizeRequest, WidgetId};
use crate::platform::headless::HeadlessPlatform;
use crate::platform::SurfaceHandle;
use crate::registry::WindowRegistry;
use crate::window::{WindowId, WindowKind};

pub(crate) struct Fixture {
    pub registry: WindowRegistry,
    pub platform: HeadlessPlatform,
    pub layout: BoxLayout,
    pub damage: DamageLog,
    next_widget: u64,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(CasementConfig::default())
    }

    pub fn with_config(config: CasementConfig) -> Self {
        Self::with_platform(config, HeadlessPlatform::new(Size::new(1920, 1080)))
    }

    pub fn with_platform(config: CasementConfig, platform: HeadlessPlatform) -> Self {
        let layout = BoxLayout::new();
        let damage = DamageLog::new();
        let registry = WindowRegistry::new(
            config,
            Box::new(platform.clone()),
            Box::new(layout.clone()),
            Box::new(damage.clone()),
        );
        Self {
            registry,
            platform,
            layout,
            damage,
            next_widget: 1,
        }
    }

    fn widget(&mut self) -> WidgetId {
        let widget = WidgetId(self.next_widget);
        self.next_widget += 1;
        widget
    }

    /// Window holding one focusable leaf of the given size
    pub fn window_with(&mut self, kind: WindowKind, content: SizeRequest) -> (WindowId, WidgetId) {
        let root = self.widget();
        let leaf = self.widget();
        self.layout.add_container(root, None, 0, 0);
        self.layout.add_leaf(leaf, Some(root), content, true);
        (self.registry.create_window(kind, root), leaf)
    }

    pub fn toplevel(&mut self, width: i32, height: i32) -> WindowId {
        self.window_with(WindowKind::Toplevel, SizeRequest::fixed(width, height))
            .0
    }

    pub fn surface(&self, id: WindowId) -> SurfaceHandle {
        self.registry
            .window(id)
            .and_then(|w| w.surface())
            .expect("window is realized")
    }

    /// Deliver events and run idle passes until both run dry
    pub fn settle(&mut self) -> usize {
        let mut rounds = 0;
        for _ in 0..64 {
            let events = self.registry.dispatch_pending(&mut self.platform);
            let resized = self.registry.run_idle();
            if events == 0 && resized == 0 {
                break;
            }
            rounds += 1;
        }
        rounds
    }
}
