//! Display topology: the monitors attached to a display connection.
//!
//! Discovery runs a strict fallback chain and always ends with at least one
//! monitor. The monitor list is immutable once published; a refresh builds a new
//! list, compares it against the old one and swaps it in whole, so snapshots held
//! by consumers never change underneath them.

use log::{debug, info, trace};
use serde::Serialize;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::config::DisplayConfig;
use crate::geometry::{Point, Rectangle, Size};

/// Platform identifier of a video output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OutputId(pub u32);

/// One output as enumerated by the per-output query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    pub connected: bool,
    /// Region scanned out by the output's controller; `None` when it has none
    pub region: Option<Rectangle>,
    pub width_mm: i32,
    pub height_mm: i32,
}

/// Result of the per-output query, in platform enumeration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputQuery {
    pub outputs: Vec<OutputInfo>,
    /// Output the platform designates as primary
    pub primary: Option<OutputId>,
}

/// The two legacy multi-head extension flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiheadVariant {
    VendorA,
    VendorB,
}

/// Raw monitor information offered by a display connection
pub trait MonitorSource {
    fn screen_size(&self) -> Size;
    fn screen_size_mm(&self) -> Size;

    /// Per-output enumeration, `None` when the platform cannot provide it
    fn outputs(&self) -> Option<OutputQuery>;

    fn has_multihead_extension(&self) -> bool;

    /// Screen rectangles reported by a legacy multi-head extension, `None` when inactive
    fn multihead_screens(&self, variant: MultiheadVariant) -> Option<Vec<Rectangle>>;

    /// Usable area of the screen after panels and docks, when advertised
    fn workarea(&self) -> Option<Rectangle> {
        None
    }

    /// Whether a compositing manager currently owns the selection
    fn is_composited(&self) -> bool;
}

/// A physical monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Monitor {
    pub geometry: Rectangle,
    /// Physical size, `-1` when unknown
    pub width_mm: i32,
    pub height_mm: i32,
    pub output: Option<OutputId>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub primary: bool,
}

impl Monitor {
    fn from_rectangle(geometry: Rectangle) -> Self {
        Self {
            geometry,
            width_mm: -1,
            height_mm: -1,
            output: None,
            name: None,
            manufacturer: None,
            primary: false,
        }
    }

    /// Equality on everything a consumer can observe about the monitor
    pub fn same_as(&self, other: &Monitor) -> bool {
        self.geometry == other.geometry
            && self.width_mm == other.width_mm
            && self.height_mm == other.height_mm
            && self.name == other.name
            && self.manufacturer == other.manufacturer
    }
}

/// Which step of the fallback chain produced the current topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiscoveryMethod {
    FakeGrid,
    PerOutput,
    MultiheadVendorA,
    MultiheadVendorB,
    SingleScreen,
}

/// What a refresh found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopologyChange {
    pub monitors_changed: bool,
    pub size_changed: bool,
}

struct Discovery {
    monitors: Vec<Monitor>,
    primary: usize,
    method: DiscoveryMethod,
}

type MonitorsListener = Box<dyn FnMut(&[Monitor], usize)>;
type SizeListener = Box<dyn FnMut(Size)>;
type CompositedListener = Box<dyn FnMut(bool)>;

/// Monitor layout of one display connection
pub struct DisplayTopology {
    config: DisplayConfig,
    monitors: Rc<[Monitor]>,
    primary: usize,
    method: DiscoveryMethod,
    screen_size: Size,
    screen_size_mm: Size,
    workarea: Option<Rectangle>,
    composited: bool,
    monitors_listeners: Vec<MonitorsListener>,
    size_listeners: Vec<SizeListener>,
    composited_listeners: Vec<CompositedListener>,
}

impl std::fmt::Debug for DisplayTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayTopology")
            .field("monitors", &self.monitors)
            .field("primary", &self.primary)
            .field("method", &self.method)
            .field("screen_size", &self.screen_size)
            .field("composited", &self.composited)
            .finish()
    }
}

/// Leftmost, then topmost; co-located monitors put the taller, then wider, one first
fn compare_monitors(a: &Monitor, b: &Monitor) -> Ordering {
    a.geometry
        .x
        .cmp(&b.geometry.x)
        .then(a.geometry.y.cmp(&b.geometry.y))
        .then(b.geometry.height.cmp(&a.geometry.height))
        .then(b.geometry.width.cmp(&a.geometry.width))
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

fn discover_fake_grid(screen: Size) -> Discovery {
    let (w, h) = (screen.width / 2, screen.height / 2);
    let monitors = vec![
        Monitor::from_rectangle(Rectangle::new(0, 0, w, h)),
        Monitor::from_rectangle(Rectangle::new(w, 0, w, h)),
        Monitor::from_rectangle(Rectangle::new(0, h, w, h)),
        Monitor::from_rectangle(Rectangle::new(w, h, w, h)),
    ];
    Discovery {
        monitors,
        primary: 0,
        method: DiscoveryMethod::FakeGrid,
    }
}

fn discover_per_output(config: &DisplayConfig, source: &dyn MonitorSource) -> Option<Discovery> {
    let query = source.outputs()?;

    // Old drivers without real per-output data report a single placeholder name
    if query
        .outputs
        .iter()
        .any(|output| output.name == config.legacy_default_output_name)
    {
        debug!("Per-output query reported legacy output name, falling back");
        return None;
    }

    let mut monitors: Vec<Monitor> = query
        .outputs
        .iter()
        .filter(|output| output.connected)
        .filter_map(|output| {
            output.region.map(|region| Monitor {
                geometry: region,
                width_mm: output.width_mm,
                height_mm: output.height_mm,
                output: Some(output.id),
                name: Some(output.name.clone()),
                manufacturer: None,
                primary: false,
            })
        })
        .collect();

    if monitors.is_empty() {
        return None;
    }

    monitors.sort_by(compare_monitors);

    let first_output = query.outputs.first().map(|output| output.id);
    let mut primary = 0;
    for (index, monitor) in monitors.iter().enumerate() {
        if monitor.output.is_some() && monitor.output == query.primary {
            primary = index;
            break;
        }

        if query.primary.is_none()
            && monitor
                .name
                .as_deref()
                .map_or(false, |name| has_prefix_ignore_case(name, &config.builtin_panel_prefix))
        {
            primary = index;
            break;
        }

        if monitor.output.is_some() && monitor.output == first_output {
            primary = index;
        }
    }

    Some(Discovery {
        monitors,
        primary,
        method: DiscoveryMethod::PerOutput,
    })
}

fn discover_multihead(source: &dyn MonitorSource, variant: MultiheadVariant) -> Option<Discovery> {
    let screens = source.multihead_screens(variant)?;
    if screens.is_empty() {
        return None;
    }

    Some(Discovery {
        monitors: screens.into_iter().map(Monitor::from_rectangle).collect(),
        primary: 0,
        method: match variant {
            MultiheadVariant::VendorA => DiscoveryMethod::MultiheadVendorA,
            MultiheadVariant::VendorB => DiscoveryMethod::MultiheadVendorB,
        },
    })
}

fn discover(config: &DisplayConfig, source: &dyn MonitorSource) -> Discovery {
    let screen = source.screen_size();

    let mut found = if config.fake_multihead {
        Some(discover_fake_grid(screen))
    } else {
        None
    };

    if found.is_none() {
        found = discover_per_output(config, source);
    }

    if found.is_none() && source.has_multihead_extension() {
        found = discover_multihead(source, MultiheadVariant::VendorA)
            .or_else(|| discover_multihead(source, MultiheadVariant::VendorB));
    }

    let mut discovery = found.unwrap_or_else(|| Discovery {
        monitors: vec![Monitor::from_rectangle(Rectangle::from_size(screen))],
        primary: 0,
        method: DiscoveryMethod::SingleScreen,
    });

    if let Some(monitor) = discovery.monitors.get_mut(discovery.primary) {
        monitor.primary = true;
    }
    trace!(
        "Discovered {} monitor(s) via {:?}, primary {}",
        discovery.monitors.len(),
        discovery.method,
        discovery.primary
    );
    discovery
}

impl DisplayTopology {
    /// Run discovery for a freshly opened display connection
    pub fn new(config: DisplayConfig, source: &dyn MonitorSource) -> Self {
        let discovery = discover(&config, source);
        info!(
            "Display has {} monitor(s), primary {} ({:?})",
            discovery.monitors.len(),
            discovery.primary,
            discovery.method
        );
        Self {
            config,
            monitors: discovery.monitors.into(),
            primary: discovery.primary,
            method: discovery.method,
            screen_size: source.screen_size(),
            screen_size_mm: source.screen_size_mm(),
            workarea: source.workarea(),
            composited: source.is_composited(),
            monitors_listeners: Vec::new(),
            size_listeners: Vec::new(),
            composited_listeners: Vec::new(),
        }
    }

    /// Rediscover after a topology-change signal and notify listeners of real differences
    pub fn refresh(&mut self, source: &dyn MonitorSource) -> TopologyChange {
        let old_monitors = Rc::clone(&self.monitors);
        let old_primary = self.primary;
        let old_size = self.screen_size;

        let discovery = discover(&self.config, source);
        let monitors_changed = old_monitors.len() != discovery.monitors.len()
            || old_monitors
                .iter()
                .zip(discovery.monitors.iter())
                .any(|(old, new)| !old.same_as(new))
            || old_primary != discovery.primary;

        self.monitors = discovery.monitors.into();
        self.primary = discovery.primary;
        self.method = discovery.method;
        self.screen_size = source.screen_size();
        self.screen_size_mm = source.screen_size_mm();
        self.workarea = source.workarea();
        let size_changed = self.screen_size != old_size;

        if monitors_changed {
            debug!(
                "Monitors changed: {} -> {} monitor(s), primary {} -> {}",
                old_monitors.len(),
                self.monitors.len(),
                old_primary,
                self.primary
            );
            let snapshot = Rc::clone(&self.monitors);
            for listener in self.monitors_listeners.iter_mut() {
                listener(&snapshot, self.primary);
            }
        }

        if size_changed {
            debug!(
                "Screen size changed: {}x{} -> {}x{}",
                old_size.width, old_size.height, self.screen_size.width, self.screen_size.height
            );
            let size = self.screen_size;
            for listener in self.size_listeners.iter_mut() {
                listener(size);
            }
        }

        TopologyChange {
            monitors_changed,
            size_changed,
        }
    }

    /// Re-read compositing-manager presence; returns whether it changed
    pub fn update_composited(&mut self, source: &dyn MonitorSource) -> bool {
        let composited = source.is_composited();
        if composited == self.composited {
            return false;
        }

        debug!("Composited changed: {}", composited);
        self.composited = composited;
        for listener in self.composited_listeners.iter_mut() {
            listener(composited);
        }
        true
    }

    pub fn connect_monitors_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&[Monitor], usize) + 'static,
    {
        self.monitors_listeners.push(Box::new(listener));
    }

    pub fn connect_size_changed<F>(&mut self, listener: F)
    where
        F: FnMut(Size) + 'static,
    {
        self.size_listeners.push(Box::new(listener));
    }

    pub fn connect_composited_changed<F>(&mut self, listener: F)
    where
        F: FnMut(bool) + 'static,
    {
        self.composited_listeners.push(Box::new(listener));
    }

    /// Shared snapshot of the current monitor list
    pub fn monitors(&self) -> Rc<[Monitor]> {
        Rc::clone(&self.monitors)
    }

    pub fn n_monitors(&self) -> usize {
        self.monitors.len()
    }

    pub fn monitor(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn primary_monitor(&self) -> Option<&Monitor> {
        self.monitors.get(self.primary)
    }

    pub fn method(&self) -> DiscoveryMethod {
        self.method
    }

    pub fn screen_size(&self) -> Size {
        self.screen_size
    }

    pub fn screen_size_mm(&self) -> Size {
        self.screen_size_mm
    }

    pub fn is_composited(&self) -> bool {
        self.composited
    }

    pub fn monitor_geometry(&self, index: usize) -> Option<Rectangle> {
        self.monitors.get(index).map(|m| m.geometry)
    }

    /// Monitor geometry minus the areas reserved by panels and docks
    pub fn monitor_workarea(&self, index: usize) -> Option<Rectangle> {
        let geometry = self.monitor_geometry(index)?;
        Some(
            self.workarea
                .and_then(|workarea| workarea.intersection(&geometry))
                .unwrap_or(geometry),
        )
    }

    pub fn monitor_width_mm(&self, index: usize) -> Option<i32> {
        self.monitors.get(index).map(|m| m.width_mm)
    }

    pub fn monitor_height_mm(&self, index: usize) -> Option<i32> {
        self.monitors.get(index).map(|m| m.height_mm)
    }

    pub fn monitor_output_name(&self, index: usize) -> Option<&str> {
        self.monitors.get(index).and_then(|m| m.name.as_deref())
    }

    /// Monitor containing `point`, else the nearest one
    pub fn monitor_at_point(&self, point: Point) -> usize {
        let mut nearest = 0;
        let mut nearest_distance = i64::MAX;
        for (index, monitor) in self.monitors.iter().enumerate() {
            let distance = monitor.geometry.distance_to(point);
            if distance == 0 {
                return index;
            }
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = index;
            }
        }
        nearest
    }

    /// Monitor showing most of `rect`, else the one nearest its center
    pub fn monitor_at_rect(&self, rect: &Rectangle) -> usize {
        let mut best = None;
        let mut best_area = 0i64;
        for (index, monitor) in self.monitors.iter().enumerate() {
            if let Some(overlap) = monitor.geometry.intersection(rect) {
                let area = i64::from(overlap.width) * i64::from(overlap.height);
                if area > best_area {
                    best_area = area;
                    best = Some(index);
                }
            }
        }
        best.unwrap_or_else(|| self.monitor_at_point(rect.center()))
    }

    /// Middle monitor, assuming the monitors form a row or a column
    pub fn center_monitor(&self) -> usize {
        self.monitors.len() / 2
    }
}

#[cfg(test)]
mod tests;
