//! Frame step ordering

use glengine::pipeline::{FrameScheduler, FrameStep};
use glengine::Error;

#[test]
fn full_frame_in_order_is_accepted() {
    let mut scheduler = FrameScheduler::new();
    for frame in 1..=3 {
        scheduler.begin_frame();
        for step in FrameStep::ALL {
            scheduler.record(step).unwrap();
        }
        assert_eq!(scheduler.steps(), &FrameStep::ALL[..]);
        assert_eq!(scheduler.frame(), frame);
    }
}

#[test]
fn lighting_requires_blurred_occlusion() {
    let mut scheduler = FrameScheduler::new();
    scheduler.begin_frame();
    scheduler.record(FrameStep::GeometryFill).unwrap();
    scheduler.record(FrameStep::OcclusionEstimate).unwrap();
    let err = scheduler.record(FrameStep::Lighting).unwrap_err();
    assert!(matches!(err, Error::PassOrder { step: "lighting", .. }), "{err}");
    assert!(!scheduler.completed(FrameStep::Lighting));
}

#[test]
fn forward_draws_require_depth_copy() {
    let mut scheduler = FrameScheduler::new();
    scheduler.begin_frame();
    for step in [
        FrameStep::GeometryFill,
        FrameStep::OcclusionEstimate,
        FrameStep::OcclusionBlur,
        FrameStep::Lighting,
    ] {
        scheduler.record(step).unwrap();
    }
    assert!(scheduler.record(FrameStep::MarkerDraw).is_err());
    assert!(scheduler.record(FrameStep::CubemapDraw).is_err());
    scheduler.record(FrameStep::DepthCopy).unwrap();
    scheduler.record(FrameStep::MarkerDraw).unwrap();
    scheduler.record(FrameStep::CubemapDraw).unwrap();
}

#[test]
fn previous_frame_does_not_count() {
    let mut scheduler = FrameScheduler::new();
    scheduler.begin_frame();
    for step in FrameStep::ALL {
        scheduler.record(step).unwrap();
    }
    scheduler.begin_frame();
    assert!(scheduler.record(FrameStep::Lighting).is_err());
    assert!(scheduler.steps().is_empty());
}

#[test]
fn going_backwards_is_rejected() {
    let mut scheduler = FrameScheduler::new();
    scheduler.begin_frame();
    scheduler.record(FrameStep::GeometryFill).unwrap();
    scheduler.record(FrameStep::OcclusionEstimate).unwrap();
    assert!(scheduler.record(FrameStep::GeometryFill).is_err());
}
