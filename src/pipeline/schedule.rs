//! Per-frame pass ordering.
//!
//! A frame is a fixed sequence of [`FrameStep`]s grouped into six timed
//! [`PassKind`]s. [`FrameScheduler::record`] is called before each step is
//! encoded and refuses steps whose inputs were not produced earlier in the
//! same frame, so a reordering bug surfaces as an error instead of a frame
//! that reads stale buffers.

use crate::util::{Error, Result};

/// Timed pass groups, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Geometry,
    Ssao,
    Lighting,
    Forward,
    Cubemap,
    Gui,
}

impl PassKind {
    pub const ALL: [PassKind; 6] = [
        PassKind::Geometry,
        PassKind::Ssao,
        PassKind::Lighting,
        PassKind::Forward,
        PassKind::Cubemap,
        PassKind::Gui,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Geometry => "Geometry",
            PassKind::Ssao => "SSAO",
            PassKind::Lighting => "Lighting",
            PassKind::Forward => "Forward",
            PassKind::Cubemap => "Cubemap",
            PassKind::Gui => "GUI",
        }
    }
}

/// One encoded unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameStep {
    GeometryFill,
    OcclusionEstimate,
    OcclusionBlur,
    Lighting,
    DepthCopy,
    MarkerDraw,
    CubemapDraw,
    GuiDraw,
}

impl FrameStep {
    pub const ALL: [FrameStep; 8] = [
        FrameStep::GeometryFill,
        FrameStep::OcclusionEstimate,
        FrameStep::OcclusionBlur,
        FrameStep::Lighting,
        FrameStep::DepthCopy,
        FrameStep::MarkerDraw,
        FrameStep::CubemapDraw,
        FrameStep::GuiDraw,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// The timed pass this step belongs to.
    pub fn pass(self) -> PassKind {
        match self {
            FrameStep::GeometryFill => PassKind::Geometry,
            FrameStep::OcclusionEstimate | FrameStep::OcclusionBlur => PassKind::Ssao,
            FrameStep::Lighting => PassKind::Lighting,
            FrameStep::DepthCopy | FrameStep::MarkerDraw => PassKind::Forward,
            FrameStep::CubemapDraw => PassKind::Cubemap,
            FrameStep::GuiDraw => PassKind::Gui,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FrameStep::GeometryFill => "geometry fill",
            FrameStep::OcclusionEstimate => "occlusion estimate",
            FrameStep::OcclusionBlur => "occlusion blur",
            FrameStep::Lighting => "lighting",
            FrameStep::DepthCopy => "depth copy",
            FrameStep::MarkerDraw => "marker draw",
            FrameStep::CubemapDraw => "cubemap draw",
            FrameStep::GuiDraw => "gui draw",
        }
    }

    /// Steps whose outputs this step reads.
    pub fn prerequisites(self) -> &'static [FrameStep] {
        match self {
            FrameStep::GeometryFill => &[],
            FrameStep::OcclusionEstimate => &[FrameStep::GeometryFill],
            FrameStep::OcclusionBlur => &[FrameStep::OcclusionEstimate],
            FrameStep::Lighting => &[FrameStep::GeometryFill, FrameStep::OcclusionBlur],
            FrameStep::DepthCopy => &[FrameStep::GeometryFill, FrameStep::Lighting],
            FrameStep::MarkerDraw => &[FrameStep::DepthCopy],
            FrameStep::CubemapDraw => &[FrameStep::DepthCopy, FrameStep::MarkerDraw],
            FrameStep::GuiDraw => &[FrameStep::CubemapDraw],
        }
    }
}

const STEP_COUNT: usize = FrameStep::ALL.len();

/// Tracks which steps ran in the current frame.
#[derive(Debug, Default, Clone)]
pub struct FrameScheduler {
    frame: u64,
    completed: [bool; STEP_COUNT],
    last: Option<FrameStep>,
    order: Vec<FrameStep>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame's steps.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.completed = [false; STEP_COUNT];
        self.last = None;
        self.order.clear();
        tracing::trace!(frame = self.frame, "begin frame");
    }

    /// Admit `step` if every prerequisite ran this frame and it does not go backwards.
    pub fn record(&mut self, step: FrameStep) -> Result<()> {
        if self.completed[step.ordinal()] {
            return Err(Error::pass_order(step.label(), "already recorded this frame"));
        }
        if let Some(last) = self.last {
            if step < last {
                return Err(Error::pass_order(step.label(), format!("recorded after {}", last.label())));
            }
        }
        if let Some(missing) = step.prerequisites().iter().find(|p| !self.completed[p.ordinal()]) {
            return Err(Error::pass_order(step.label(), format!("{} has not run this frame", missing.label())));
        }

        self.completed[step.ordinal()] = true;
        self.last = Some(step);
        self.order.push(step);
        Ok(())
    }

    pub fn completed(&self, step: FrameStep) -> bool {
        self.completed[step.ordinal()]
    }

    /// Steps recorded this frame, in order.
    pub fn steps(&self) -> &[FrameStep] {
        &self.order
    }

    /// Number of frames begun so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_in_order() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin_frame();
        for step in FrameStep::ALL {
            scheduler.record(step).unwrap();
        }
        assert_eq!(scheduler.steps(), &FrameStep::ALL);
        assert_eq!(scheduler.frame(), 1);
    }

    #[test]
    fn test_lighting_needs_blur() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin_frame();
        scheduler.record(FrameStep::GeometryFill).unwrap();
        scheduler.record(FrameStep::OcclusionEstimate).unwrap();
        let err = scheduler.record(FrameStep::Lighting).unwrap_err();
        assert!(matches!(err, Error::PassOrder { step: "lighting", .. }));
        assert!(!scheduler.completed(FrameStep::Lighting));
    }

    #[test]
    fn test_rejects_backwards_and_repeats() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin_frame();
        scheduler.record(FrameStep::GeometryFill).unwrap();
        assert!(scheduler.record(FrameStep::GeometryFill).is_err());
        scheduler.record(FrameStep::OcclusionEstimate).unwrap();
        scheduler.record(FrameStep::OcclusionBlur).unwrap();
        scheduler.record(FrameStep::Lighting).unwrap();
        scheduler.record(FrameStep::DepthCopy).unwrap();
        scheduler.record(FrameStep::CubemapDraw).unwrap_err();
        scheduler.record(FrameStep::MarkerDraw).unwrap();
        scheduler.record(FrameStep::CubemapDraw).unwrap();
        assert!(scheduler.record(FrameStep::Lighting).is_err());
    }

    #[test]
    fn test_state_resets_per_frame() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin_frame();
        scheduler.record(FrameStep::GeometryFill).unwrap();
        scheduler.begin_frame();
        assert!(scheduler.steps().is_empty());
        assert!(scheduler.record(FrameStep::OcclusionEstimate).is_err());
    }

    #[test]
    fn test_pass_grouping() {
        assert_eq!(FrameStep::OcclusionBlur.pass(), PassKind::Ssao);
        assert_eq!(FrameStep::DepthCopy.pass(), PassKind::Forward);
        assert_eq!(PassKind::Gui.index(), 5);
        let passes: Vec<_> = FrameStep::ALL.iter().map(|s| s.pass()).collect();
        assert!(passes.windows(2).all(|w| w[0] <= w[1]));
    }
}
