//! # Casement scenario runner
//!
//! Drives the window machinery against the headless platform and reports how
//! the negotiation went: which requests were sent, what each window ended up
//! with and how the monitors were discovered. Handy for reproducing
//! window-manager interactions without a display server.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use serde::Serialize;

use casement::display::DiscoveryMethod;
use casement::geometry::{Rectangle, Size};
use casement::layout::{BoxLayout, DamageLog, SizeRequest, WidgetId};
use casement::platform::headless::{HeadlessPlatform, WmPolicy};
use casement::window::parse::{self, GeometryMask};
use casement::window::WindowSnapshot;
use casement::{
    CasementConfig, EventPump, Monitor, PositionPolicy, WindowId, WindowKind, WindowRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Show a single window
    Show,
    /// Fire a burst of resizes at one window
    ResizeStorm,
    /// Plug a second monitor in while a window is up
    Hotplug,
    /// Show a modal dialog centered over its parent
    Modal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    Grant,
    Clamp,
    Constrain,
    Ignore,
}

#[derive(Parser)]
#[command(name = "casement")]
#[command(about = "Replay toplevel window scenarios against a simulated window manager")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/casement/casement.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "show")]
    scenario: Scenario,

    /// Comma-separated monitor geometries, e.g. `1920x1080+0+0,1280x1024+1920+0`
    #[arg(short, long, default_value = "1920x1080+0+0")]
    monitors: String,

    /// How the simulated window manager answers configure requests
    #[arg(long, value_enum, default_value = "grant")]
    wm_policy: Policy,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    scenario: String,
    discovery: DiscoveryMethod,
    monitors: Vec<Monitor>,
    primary_monitor: usize,
    configure_requests: usize,
    windows: Vec<WindowSnapshot>,
}

/// Headless world: platform, widget tree and the registry on top of them
struct World {
    platform: HeadlessPlatform,
    layout: BoxLayout,
    registry: WindowRegistry,
    pump: EventPump,
    next_widget: u64,
    configure_requests: usize,
}

impl World {
    fn new(config: CasementConfig, monitors: Vec<(String, Rectangle)>) -> Result<Self> {
        let platform = HeadlessPlatform::with_monitors(bounding_size(&monitors), monitors);
        let layout = BoxLayout::new();
        let registry = WindowRegistry::new(
            config,
            Box::new(platform.clone()),
            Box::new(layout.clone()),
            Box::new(DamageLog::new()),
        );

        Ok(Self {
            platform,
            layout,
            registry,
            pump: EventPump::new()?,
            next_widget: 1,
            configure_requests: 0,
        })
    }

    /// Toplevel holding one focusable child of `width`x`height`
    fn window(&mut self, width: i32, height: i32) -> WindowId {
        let root = WidgetId(self.next_widget);
        let child = WidgetId(self.next_widget + 1);
        self.next_widget += 2;
        self.layout.add_container(root, None, 6, 0);
        self.layout
            .add_leaf(child, Some(root), SizeRequest::fixed(width, height), true);
        self.registry.create_window(WindowKind::Toplevel, root)
    }

    fn settle(&mut self) -> Result<()> {
        let rounds = self.pump.run_until_idle(&mut self.registry, &mut self.platform)?;
        self.configure_requests += self
            .platform
            .take_calls()
            .iter()
            .filter(|call| call.is_configure())
            .count();
        if rounds >= casement::event_loop::MAX_SETTLE_ROUNDS {
            warn!("Negotiation did not settle");
        }
        Ok(())
    }

    fn report(&self, scenario: Scenario) -> Report {
        let topology = self.registry.topology();
        Report {
            scenario: format!("{:?}", scenario),
            discovery: topology.method(),
            monitors: topology.monitors().to_vec(),
            primary_monitor: topology.primary_index(),
            configure_requests: self.configure_requests,
            windows: self
                .registry
                .list_toplevels()
                .iter()
                .filter_map(|id| self.registry.window(*id))
                .map(|window| window.snapshot())
                .collect(),
        }
    }
}

/// Parse `--monitors`; each entry is an X geometry string with both dimensions
fn parse_monitors(spec: &str) -> Result<Vec<(String, Rectangle)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| {
            let parsed = parse::parse(entry);
            let sized = GeometryMask::WIDTH_VALUE | GeometryMask::HEIGHT_VALUE;
            if !parsed.mask.contains(sized) || parsed.width <= 0 || parsed.height <= 0 {
                bail!("Invalid monitor geometry {:?}: expected WIDTHxHEIGHT+X+Y", entry);
            }
            Ok((
                format!("DP-{}", index + 1),
                Rectangle::new(parsed.x, parsed.y, parsed.width, parsed.height),
            ))
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|monitors| {
            if monitors.is_empty() {
                bail!("No monitors given");
            }
            Ok(monitors)
        })
}

/// Screen size covering every monitor
fn bounding_size(monitors: &[(String, Rectangle)]) -> Size {
    monitors.iter().fold(Size::default(), |size, (_, rect)| {
        Size::new(size.width.max(rect.right()), size.height.max(rect.bottom()))
    })
}

fn run(world: &mut World, scenario: Scenario) -> Result<()> {
    match scenario {
        Scenario::Show => {
            let id = world.window(320, 240);
            world.registry.set_title(id, "Casement")?;
            world.registry.set_position(id, PositionPolicy::Center)?;
            world.registry.show(id)?;
            world.settle()?;
        }
        Scenario::ResizeStorm => {
            let id = world.window(320, 240);
            world.registry.show(id)?;
            world.settle()?;
            for step in 1..=20 {
                world.registry.resize(id, 320 + step * 40, 240 + step * 30)?;
                world.registry.run_idle();
            }
            world.settle()?;
        }
        Scenario::Hotplug => {
            let id = world.window(640, 480);
            world.registry.show(id)?;
            world.settle()?;

            // Plug a 1920x1080 output in to the right of everything else
            let mut outputs: Vec<(String, Rectangle)> = world
                .registry
                .topology()
                .monitors()
                .iter()
                .enumerate()
                .map(|(index, monitor)| {
                    let name = monitor.name.clone().unwrap_or_else(|| format!("DP-{}", index + 1));
                    (name, monitor.geometry)
                })
                .collect();
            let right = bounding_size(&outputs).width;
            outputs.push((
                format!("DP-{}", outputs.len() + 1),
                Rectangle::new(right, 0, 1920, 1080),
            ));
            world.platform.set_outputs(bounding_size(&outputs), outputs);
            world.settle()?;
            info!(
                "Topology now has {} monitor(s)",
                world.registry.topology().n_monitors()
            );
        }
        Scenario::Modal => {
            let parent = world.window(800, 600);
            world.registry.set_position(parent, PositionPolicy::Center)?;
            world.registry.show(parent)?;
            world.settle()?;

            let dialog = world.window(300, 120);
            world.registry.set_transient_for(dialog, Some(parent))?;
            world.registry.set_modal(dialog, true)?;
            world
                .registry
                .set_position(dialog, PositionPolicy::CenterOnParent)?;
            world.registry.show(dialog)?;
            world.settle()?;

            let group = world.registry.window_group(dialog)?;
            info!("Group {} grab: {:?}", group, world.registry.current_grab(group)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting Casement {}", casement::VERSION);
    info!(
        "📄 Built {} for {} ({})",
        env!("CASEMENT_BUILD_DATE"),
        env!("CASEMENT_TARGET"),
        env!("CASEMENT_REVISION")
    );

    // Load configuration
    let config = match CasementConfig::load(&cli.config) {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            info!("📝 Using default configuration");
            CasementConfig::default()
        }
    };

    let monitors = parse_monitors(&cli.monitors)?;
    let mut world = World::new(config, monitors)?;
    world.platform.set_policy(match cli.wm_policy {
        Policy::Grant => WmPolicy::Grant,
        Policy::Clamp => WmPolicy::Clamp(Size::new(1024, 768)),
        Policy::Constrain => WmPolicy::Constrain,
        Policy::Ignore => WmPolicy::Ignore,
    });

    run(&mut world, cli.scenario)
        .with_context(|| format!("Scenario {:?} failed", cli.scenario))?;

    let report = world.report(cli.scenario);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            "Scenario {} finished: {} monitor(s) via {:?}, {} configure request(s)",
            report.scenario,
            report.monitors.len(),
            report.discovery,
            report.configure_requests
        );
        for window in &report.windows {
            match window.allocation {
                Some(allocation) => info!(
                    "  window {} {:?}: {}x{}, state {:?}",
                    window.id, window.lifecycle, allocation.width, allocation.height, window.confirmed_state
                ),
                None => info!("  window {} {:?}: never allocated", window.id, window.lifecycle),
            }
        }
    }

    Ok(())
}
