use super::*;
use crate::layout::{MockLayoutEngine, SizeRequest};
use mockall::predicate::eq;
use proptest::prelude::*;

fn inputs(app_hints: Option<&GeometryHints>) -> HintInputs<'_> {
    HintInputs {
        app_hints,
        geometry_widget: None,
        window_widget: WidgetId(1),
        gravity: Gravity::NorthWest,
        fixed_size: None,
        probe_size: 10000,
    }
}

fn layout_measuring(width: i32, height: i32) -> MockLayoutEngine {
    let mut layout = MockLayoutEngine::new();
    layout
        .expect_measure()
        .returning(move |_| SizeRequest::fixed(width, height));
    layout
}

#[test]
fn test_equivalence_ignores_fields_under_absent_flags() {
    let a = GeometryHints::default().with_min_size(10, 10);
    let mut b = a;
    b.max_width = 999;
    b.width_inc = 7;
    assert!(a.equivalent(&b));

    b.flags |= HintFlags::RESIZE_INC;
    assert!(!a.equivalent(&b));
}

#[test]
fn test_equivalence_detects_gravity_change() {
    let a = GeometryHints::default().with_gravity(Gravity::NorthWest);
    let b = GeometryHints::default().with_gravity(Gravity::SouthEast);
    assert!(!a.equivalent(&b));
}

#[test]
fn test_units_to_pixels() {
    let hints = GeometryHints::default()
        .with_base_size(4, 6)
        .with_resize_inc(8, 16)
        .with_min_size(100, 0);
    assert_eq!(hints.units_to_pixels(Some(80), Some(24)), (Some(644), Some(390)));
    // Floored at the minimum
    assert_eq!(hints.units_to_pixels(Some(1), None), (Some(100), None));
    // Without flags the units are pixels
    assert_eq!(
        GeometryHints::default().units_to_pixels(Some(33), Some(44)),
        (Some(33), Some(44))
    );
}

#[test]
fn test_units_to_pixels_saturates() {
    let hints = GeometryHints::default()
        .with_base_size(5, 5)
        .with_resize_inc(10, 10);
    assert_eq!(
        hints.units_to_pixels(Some(300_000_000), Some(3)),
        (Some(i32::MAX), Some(35))
    );
    assert_eq!(hints.units_to_pixels(Some(i32::MAX), None), (Some(i32::MAX), None));
}

#[test]
fn test_constrain_size_clamps_to_bounds() {
    let hints = GeometryHints::default()
        .with_min_size(200, 100)
        .with_max_size(800, 600);
    assert_eq!(hints.constrain_size(50, 50), Size::new(200, 100));
    assert_eq!(hints.constrain_size(1000, 1000), Size::new(800, 600));
    assert_eq!(hints.constrain_size(300, 300), Size::new(300, 300));
}

#[test]
fn test_constrain_size_snaps_to_increments() {
    let hints = GeometryHints::default()
        .with_base_size(10, 20)
        .with_min_size(10, 20)
        .with_resize_inc(8, 16);
    assert_eq!(hints.constrain_size(100, 100), Size::new(10 + 88, 20 + 80));
}

#[test]
fn test_constrain_size_applies_aspect_range() {
    let hints = GeometryHints::default().with_aspect(1.0, 1.0);
    let size = hints.constrain_size(400, 200);
    assert_eq!(size.width, size.height);

    let tall = hints.constrain_size(200, 400);
    assert_eq!(tall.width, tall.height);
}

#[test]
fn test_compute_without_app_hints() {
    let mut layout = layout_measuring(120, 80);
    let hints = compute_hints(&inputs(None), &mut layout);

    assert!(hints.flags.contains(HintFlags::MIN_SIZE | HintFlags::BASE_SIZE | HintFlags::WIN_GRAVITY));
    assert!(!hints.flags.contains(HintFlags::MAX_SIZE));
    assert_eq!((hints.min_width, hints.min_height), (120, 80));
    assert_eq!((hints.base_width, hints.base_height), (0, 0));
    assert_eq!(hints.win_gravity, Gravity::NorthWest);
}

#[test]
fn test_compute_folds_app_minimum_into_base_and_min() {
    let mut layout = layout_measuring(50, 50);
    let app = GeometryHints::default().with_min_size(200, 100);
    let hints = compute_hints(&inputs(Some(&app)), &mut layout);

    assert_eq!((hints.min_width, hints.min_height), (200, 100));
    assert_eq!((hints.base_width, hints.base_height), (200, 100));
}

#[test]
fn test_compute_negative_app_bounds_use_requisition() {
    let mut layout = layout_measuring(150, 90);
    let app = GeometryHints::default()
        .with_min_size(-1, -1)
        .with_max_size(-1, -1);
    let hints = compute_hints(&inputs(Some(&app)), &mut layout);

    assert_eq!((hints.min_width, hints.min_height), (150, 90));
    assert_eq!((hints.max_width, hints.max_height), (150, 90));
}

#[test]
fn test_compute_pins_non_resizable_windows() {
    let mut layout = layout_measuring(40, 30);
    let mut window = inputs(None);
    window.fixed_size = Some(Size::new(300, 200));
    let hints = compute_hints(&window, &mut layout);

    assert!(hints.flags.contains(HintFlags::MAX_SIZE));
    assert_eq!((hints.min_width, hints.min_height), (300, 200));
    assert_eq!((hints.max_width, hints.max_height), (300, 200));
}

#[test]
fn test_compute_measures_geometry_widget_overhead() {
    let mut layout = MockLayoutEngine::new();
    let mut calls = 0;
    layout.expect_measure().returning(move |_| {
        calls += 1;
        if calls == 1 {
            SizeRequest::fixed(500, 400)
        } else {
            SizeRequest::fixed(10000 + 12, 10000 + 34)
        }
    });
    layout
        .expect_size_request()
        .with(eq(WidgetId(5)))
        .return_const((-1, -1));
    layout
        .expect_set_size_request()
        .with(eq(WidgetId(5)), eq(10000), eq(10000))
        .times(1)
        .return_const(());
    layout
        .expect_set_size_request()
        .with(eq(WidgetId(5)), eq(-1), eq(-1))
        .times(1)
        .return_const(());

    let app = GeometryHints::default()
        .with_resize_inc(8, 16)
        .with_base_size(2, 2)
        .with_max_size(1000, 1000);
    let mut window = inputs(Some(&app));
    window.geometry_widget = Some(WidgetId(5));
    let hints = compute_hints(&window, &mut layout);

    assert_eq!((hints.base_width, hints.base_height), (14, 36));
    assert_eq!((hints.max_width, hints.max_height), (1012, 1034));
    assert_eq!((hints.width_inc, hints.height_inc), (8, 16));
}

#[test]
fn test_compute_clamps_negative_overhead() {
    let mut layout = MockLayoutEngine::new();
    layout
        .expect_measure()
        .returning(|_| SizeRequest::fixed(300, 300));
    layout.expect_size_request().return_const((-1, -1));
    layout.expect_set_size_request().return_const(());

    let mut window = inputs(None);
    window.geometry_widget = Some(WidgetId(9));
    let hints = compute_hints(&window, &mut layout);

    assert_eq!((hints.base_width, hints.base_height), (0, 0));
}

prop_compose! {
    fn arb_hints()(
        flags in 0u32..(1 << 9),
        sizes in prop::array::uniform8(-10i32..2000),
        min_aspect in 0.1f64..4.0,
        max_aspect in 0.1f64..4.0,
        gravity in 0usize..10,
    ) -> GeometryHints {
        let gravities = [
            Gravity::NorthWest, Gravity::North, Gravity::NorthEast, Gravity::West,
            Gravity::Center, Gravity::East, Gravity::SouthWest, Gravity::South,
            Gravity::SouthEast, Gravity::Static,
        ];
        GeometryHints {
            flags: HintFlags::from_bits_truncate(flags),
            min_width: sizes[0],
            min_height: sizes[1],
            max_width: sizes[2],
            max_height: sizes[3],
            base_width: sizes[4],
            base_height: sizes[5],
            width_inc: sizes[6],
            height_inc: sizes[7],
            min_aspect,
            max_aspect,
            win_gravity: gravities[gravity],
        }
    }
}

proptest! {
    #[test]
    fn test_equivalence_is_reflexive(hints in arb_hints()) {
        prop_assert!(hints.equivalent(&hints));
    }

    #[test]
    fn test_flipping_a_present_field_breaks_equivalence(hints in arb_hints(), field in 0usize..11) {
        let mut other = hints;
        let flag = match field {
            0 => {
                other.min_width += 1;
                HintFlags::MIN_SIZE
            }
            1 => {
                other.min_height += 1;
                HintFlags::MIN_SIZE
            }
            2 => {
                other.max_width += 1;
                HintFlags::MAX_SIZE
            }
            3 => {
                other.max_height += 1;
                HintFlags::MAX_SIZE
            }
            4 => {
                other.base_width += 1;
                HintFlags::BASE_SIZE
            }
            5 => {
                other.base_height += 1;
                HintFlags::BASE_SIZE
            }
            6 => {
                other.width_inc += 1;
                HintFlags::RESIZE_INC
            }
            7 => {
                other.height_inc += 1;
                HintFlags::RESIZE_INC
            }
            8 => {
                other.min_aspect += 0.5;
                HintFlags::ASPECT
            }
            9 => {
                other.max_aspect += 0.5;
                HintFlags::ASPECT
            }
            _ => {
                other.win_gravity = if hints.win_gravity == Gravity::Static {
                    Gravity::NorthWest
                } else {
                    Gravity::Static
                };
                HintFlags::WIN_GRAVITY
            }
        };
        prop_assert_eq!(hints.equivalent(&other), !hints.flags.contains(flag));
    }

    #[test]
    fn test_constrained_size_respects_bounds(
        min in (1i32..500, 1i32..500),
        extra in (0i32..500, 0i32..500),
        request in (1i32..3000, 1i32..3000),
    ) {
        let hints = GeometryHints::default()
            .with_min_size(min.0, min.1)
            .with_max_size(min.0 + extra.0, min.1 + extra.1);
        let size = hints.constrain_size(request.0, request.1);
        prop_assert!(size.width >= min.0 && size.width <= min.0 + extra.0);
        prop_assert!(size.height >= min.1 && size.height <= min.1 + extra.1);
    }
}
