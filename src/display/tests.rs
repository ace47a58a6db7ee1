//! Unit and property tests for monitor discovery

use super::*;
use proptest::prelude::*;
use std::cell::RefCell;

#[derive(Debug, Clone, Default)]
struct FakeSource {
    screen: Size,
    outputs: Option<OutputQuery>,
    extension: bool,
    vendor_a: Option<Vec<Rectangle>>,
    vendor_b: Option<Vec<Rectangle>>,
    workarea: Option<Rectangle>,
    composited: bool,
}

impl MonitorSource for FakeSource {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn screen_size_mm(&self) -> Size {
        Size::new(self.screen.width / 4, self.screen.height / 4)
    }

    fn outputs(&self) -> Option<OutputQuery> {
        self.outputs.clone()
    }

    fn has_multihead_extension(&self) -> bool {
        self.extension
    }

    fn multihead_screens(&self, variant: MultiheadVariant) -> Option<Vec<Rectangle>> {
        match variant {
            MultiheadVariant::VendorA => self.vendor_a.clone(),
            MultiheadVariant::VendorB => self.vendor_b.clone(),
        }
    }

    fn workarea(&self) -> Option<Rectangle> {
        self.workarea
    }

    fn is_composited(&self) -> bool {
        self.composited
    }
}

fn output(id: u32, name: &str, region: Option<Rectangle>) -> OutputInfo {
    OutputInfo {
        id: OutputId(id),
        name: name.to_string(),
        connected: true,
        region,
        width_mm: 510,
        height_mm: 290,
    }
}

fn dual_head() -> FakeSource {
    FakeSource {
        screen: Size::new(3840, 1080),
        outputs: Some(OutputQuery {
            outputs: vec![
                output(1, "DP-1", Some(Rectangle::new(0, 0, 1920, 1080))),
                output(2, "DP-2", Some(Rectangle::new(1920, 0, 1920, 1080))),
            ],
            primary: None,
        }),
        ..FakeSource::default()
    }
}

#[test]
fn test_primary_falls_back_to_first_enumerated_output() {
    let topology = DisplayTopology::new(DisplayConfig::default(), &dual_head());
    assert_eq!(topology.method(), DiscoveryMethod::PerOutput);
    assert_eq!(topology.n_monitors(), 2);
    assert_eq!(topology.primary_index(), 0);
    assert!(topology.monitor(0).map_or(false, |m| m.primary));
}

#[test]
fn test_platform_primary_wins() {
    let mut source = dual_head();
    if let Some(query) = source.outputs.as_mut() {
        query.primary = Some(OutputId(2));
    }
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.primary_index(), 1);
    assert_eq!(topology.monitor_output_name(1), Some("DP-2"));
}

#[test]
fn test_builtin_panel_preferred_without_platform_primary() {
    let source = FakeSource {
        screen: Size::new(3840, 1080),
        outputs: Some(OutputQuery {
            outputs: vec![
                output(7, "HDMI-1", Some(Rectangle::new(0, 0, 1920, 1080))),
                output(3, "lvds1", Some(Rectangle::new(1920, 0, 1366, 768))),
            ],
            primary: None,
        }),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.primary_index(), 1);
}

#[test]
fn test_first_output_found_after_sorting() {
    // Enumeration order puts the right-hand output first
    let source = FakeSource {
        screen: Size::new(3840, 1080),
        outputs: Some(OutputQuery {
            outputs: vec![
                output(2, "DP-2", Some(Rectangle::new(1920, 0, 1920, 1080))),
                output(1, "DP-1", Some(Rectangle::new(0, 0, 1920, 1080))),
            ],
            primary: None,
        }),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.monitor_output_name(0), Some("DP-1"));
    assert_eq!(topology.primary_index(), 1);
}

#[test]
fn test_disconnected_and_unscanned_outputs_are_skipped() {
    let mut disconnected = output(3, "VGA-1", Some(Rectangle::new(0, 0, 800, 600)));
    disconnected.connected = false;
    let source = FakeSource {
        screen: Size::new(1920, 1080),
        outputs: Some(OutputQuery {
            outputs: vec![
                disconnected,
                output(4, "DP-3", None),
                output(5, "DP-4", Some(Rectangle::new(0, 0, 1920, 1080))),
            ],
            primary: None,
        }),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.n_monitors(), 1);
    assert_eq!(topology.monitor_output_name(0), Some("DP-4"));
}

#[test]
fn test_cloned_outputs_sort_taller_then_wider_first() {
    let source = FakeSource {
        screen: Size::new(1920, 1200),
        outputs: Some(OutputQuery {
            outputs: vec![
                output(1, "A", Some(Rectangle::new(0, 0, 1280, 1024))),
                output(2, "B", Some(Rectangle::new(0, 0, 1920, 1080))),
                output(3, "C", Some(Rectangle::new(0, 0, 1600, 1200))),
                output(4, "D", Some(Rectangle::new(0, 0, 1920, 1200))),
            ],
            primary: None,
        }),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    let names: Vec<_> = topology
        .monitors()
        .iter()
        .filter_map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["D", "C", "B", "A"]);
}

#[test]
fn test_legacy_output_name_rejects_per_output_query() {
    let source = FakeSource {
        screen: Size::new(1024, 768),
        outputs: Some(OutputQuery {
            outputs: vec![output(1, "default", Some(Rectangle::new(0, 0, 1024, 768)))],
            primary: None,
        }),
        extension: true,
        vendor_b: Some(vec![
            Rectangle::new(0, 0, 512, 768),
            Rectangle::new(512, 0, 512, 768),
        ]),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.method(), DiscoveryMethod::MultiheadVendorB);
    assert_eq!(topology.n_monitors(), 2);
    assert_eq!(topology.monitor_width_mm(0), Some(-1));
    assert_eq!(topology.monitor_output_name(0), None);
}

#[test]
fn test_vendor_a_tried_before_vendor_b() {
    let source = FakeSource {
        screen: Size::new(1024, 768),
        extension: true,
        vendor_a: Some(vec![Rectangle::new(0, 0, 1024, 768)]),
        vendor_b: Some(vec![Rectangle::new(0, 0, 512, 768)]),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.method(), DiscoveryMethod::MultiheadVendorA);
}

#[test]
fn test_multihead_ignored_without_extension() {
    let source = FakeSource {
        screen: Size::new(1024, 768),
        extension: false,
        vendor_a: Some(vec![Rectangle::new(0, 0, 512, 768)]),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.method(), DiscoveryMethod::SingleScreen);
    assert_eq!(topology.monitor_geometry(0), Some(Rectangle::new(0, 0, 1024, 768)));
}

#[test]
fn test_empty_multihead_result_falls_through() {
    let source = FakeSource {
        screen: Size::new(800, 600),
        extension: true,
        vendor_a: Some(Vec::new()),
        vendor_b: Some(Vec::new()),
        ..FakeSource::default()
    };
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.method(), DiscoveryMethod::SingleScreen);
}

#[test]
fn test_fake_grid_splits_screen() {
    let config = DisplayConfig {
        fake_multihead: true,
        ..DisplayConfig::default()
    };
    let topology = DisplayTopology::new(config, &dual_head());
    assert_eq!(topology.method(), DiscoveryMethod::FakeGrid);
    assert_eq!(topology.n_monitors(), 4);
    assert_eq!(topology.monitor_geometry(3), Some(Rectangle::new(1920, 540, 1920, 540)));
}

#[test]
fn test_refresh_without_change_is_silent() {
    let source = dual_head();
    let mut topology = DisplayTopology::new(DisplayConfig::default(), &source);
    let fired = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&fired);
    topology.connect_monitors_changed(move |_, _| *counter.borrow_mut() += 1);

    let change = topology.refresh(&source);
    assert_eq!(change, TopologyChange::default());
    assert_eq!(*fired.borrow(), 0);
}

#[test]
fn test_refresh_reports_hotplug_and_keeps_old_snapshot_intact() {
    let mut source = dual_head();
    let mut topology = DisplayTopology::new(DisplayConfig::default(), &source);
    let before = topology.monitors();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    topology.connect_monitors_changed(move |monitors, primary| {
        sink.borrow_mut().push((monitors.len(), primary));
    });

    if let Some(query) = source.outputs.as_mut() {
        query.outputs.pop();
    }
    source.screen = Size::new(1920, 1080);
    let change = topology.refresh(&source);

    assert!(change.monitors_changed);
    assert!(change.size_changed);
    assert_eq!(*seen.borrow(), vec![(1, 0)]);
    assert_eq!(before.len(), 2);
    assert_eq!(topology.n_monitors(), 1);
}

#[test]
fn test_primary_change_alone_is_a_change() {
    let mut source = dual_head();
    let mut topology = DisplayTopology::new(DisplayConfig::default(), &source);
    if let Some(query) = source.outputs.as_mut() {
        query.primary = Some(OutputId(2));
    }
    assert!(topology.refresh(&source).monitors_changed);
}

#[test]
fn test_composited_tracking() {
    let mut source = dual_head();
    let mut topology = DisplayTopology::new(DisplayConfig::default(), &source);
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&states);
    topology.connect_composited_changed(move |on| sink.borrow_mut().push(on));

    assert!(!topology.update_composited(&source));
    source.composited = true;
    assert!(topology.update_composited(&source));
    assert!(!topology.update_composited(&source));
    assert!(topology.is_composited());
    assert_eq!(*states.borrow(), vec![true]);
}

#[test]
fn test_monitor_lookup_by_point_and_rect() {
    let topology = DisplayTopology::new(DisplayConfig::default(), &dual_head());
    assert_eq!(topology.monitor_at_point(Point::new(100, 100)), 0);
    assert_eq!(topology.monitor_at_point(Point::new(2000, 10)), 1);
    // Below both monitors, nearest to the right one
    assert_eq!(topology.monitor_at_point(Point::new(3000, 2000)), 1);
    assert_eq!(topology.monitor_at_rect(&Rectangle::new(1800, 0, 400, 300)), 1);
    assert_eq!(topology.monitor_at_rect(&Rectangle::new(-900, -900, 10, 10)), 0);
    assert_eq!(topology.center_monitor(), 1);
}

#[test]
fn test_workarea_is_clipped_to_monitor() {
    let mut source = dual_head();
    source.workarea = Some(Rectangle::new(0, 32, 3840, 1048));
    let topology = DisplayTopology::new(DisplayConfig::default(), &source);
    assert_eq!(topology.monitor_workarea(1), Some(Rectangle::new(1920, 32, 1920, 1048)));
}

fn source_from(regions: &[(i32, i32, i32, i32)], names: &[String]) -> FakeSource {
    FakeSource {
        screen: Size::new(8000, 8000),
        outputs: Some(OutputQuery {
            outputs: regions
                .iter()
                .zip(names.iter())
                .enumerate()
                .map(|(i, (&(x, y, w, h), name))| {
                    output(i as u32 + 1, name, Some(Rectangle::new(x, y, w, h)))
                })
                .collect(),
            primary: None,
        }),
        ..FakeSource::default()
    }
}

prop_compose! {
    fn arb_layout()(
        regions in prop::collection::vec((0i32..4, 0i32..4, 1i32..4, 1i32..4), 1..6)
    ) -> (Vec<(i32, i32, i32, i32)>, Vec<String>) {
        let regions: Vec<_> = regions
            .into_iter()
            .map(|(x, y, w, h)| (x * 1000, y * 1000, w * 500, h * 500))
            .collect();
        let names = (0..regions.len()).map(|i| format!("OUT-{}", i)).collect();
        (regions, names)
    }
}

proptest! {
    #[test]
    fn test_discovery_is_deterministic((regions, names) in arb_layout()) {
        let source = source_from(&regions, &names);
        let first = DisplayTopology::new(DisplayConfig::default(), &source);
        let second = DisplayTopology::new(DisplayConfig::default(), &source);
        prop_assert_eq!(&*first.monitors(), &*second.monitors());
        prop_assert_eq!(first.primary_index(), second.primary_index());

        let monitors = first.monitors();
        for pair in monitors.windows(2) {
            prop_assert_ne!(compare_monitors(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn test_any_single_field_mutation_is_detected(
        (regions, names) in arb_layout(),
        index in any::<prop::sample::Index>(),
        field in 0usize..7,
    ) {
        let source = source_from(&regions, &names);
        let mut topology = DisplayTopology::new(DisplayConfig::default(), &source);
        prop_assert!(!topology.refresh(&source).monitors_changed);

        let mut mutated = source.clone();
        if let Some(query) = mutated.outputs.as_mut() {
            let target = index.index(query.outputs.len());
            let out = &mut query.outputs[target];
            match field {
                0 => if let Some(r) = out.region.as_mut() { r.x += 1 },
                1 => if let Some(r) = out.region.as_mut() { r.y += 1 },
                2 => if let Some(r) = out.region.as_mut() { r.width += 1 },
                3 => if let Some(r) = out.region.as_mut() { r.height += 1 },
                4 => out.width_mm += 1,
                5 => out.height_mm += 1,
                _ => out.name.push('X'),
            }
        }
        prop_assert!(topology.refresh(&mutated).monitors_changed);
    }
}
