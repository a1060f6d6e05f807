use simulacra_core::{Event, PerspectiveId, Vec3};
use simulacra_system_boundary_space::{AxisRange, BoundarySpace, PerspectiveDirector};

fn top_down() -> BoundarySpace {
    BoundarySpace::new(
        AxisRange::new(-8.0, 8.0),
        AxisRange::new(0.0, 0.0),
        AxisRange::new(-5.0, 5.0),
    )
}

fn side_scroller() -> BoundarySpace {
    BoundarySpace::new(
        AxisRange::new(-12.0, 12.0),
        AxisRange::new(0.0, 6.0),
        AxisRange::new(0.0, 0.0),
    )
    .with_padding(0.5)
}

#[test]
fn switching_perspective_emits_a_single_change() {
    let mut director = PerspectiveDirector::new();
    director.register(PerspectiveId::new(1), top_down());
    director.register(PerspectiveId::new(2), side_scroller());

    let mut events = Vec::new();
    assert!(director.set_perspective(PerspectiveId::new(1), &mut events));
    assert!(director.set_perspective(PerspectiveId::new(2), &mut events));
    assert!(!director.set_perspective(PerspectiveId::new(2), &mut events));

    assert_eq!(
        events,
        vec![
            Event::PerspectiveChanged {
                from: None,
                to: PerspectiveId::new(1),
            },
            Event::PerspectiveChanged {
                from: Some(PerspectiveId::new(1)),
                to: PerspectiveId::new(2),
            },
        ]
    );
    assert_eq!(director.active(), Some(PerspectiveId::new(2)));
    assert_eq!(director.active_space(), side_scroller());
}

#[test]
fn unknown_perspective_is_ignored() {
    let mut director = PerspectiveDirector::new();
    director.register(PerspectiveId::new(1), top_down());
    let mut events = Vec::new();
    assert!(director.set_perspective(PerspectiveId::new(1), &mut events));
    events.clear();

    assert!(!director.set_perspective(PerspectiveId::new(9), &mut events));
    assert!(events.is_empty(), "unknown perspectives must not emit events");
    assert_eq!(director.active(), Some(PerspectiveId::new(1)));
}

#[test]
fn active_space_defaults_before_any_switch() {
    let director = PerspectiveDirector::new();
    let space = director.active_space();
    assert_eq!(space, BoundarySpace::default());
    assert_eq!(space.remap_unclamped(Vec3::ONE), Vec3::ONE);
}

#[test]
fn flat_axes_collapse_every_point() {
    let space = top_down();
    let remapped = space.remap_unclamped(Vec3::new(0.5, 0.9, -0.5));
    assert_eq!(remapped, Vec3::new(4.0, 0.0, -2.5));
    assert!(space.is_in_boundary(remapped));
}
