//! Frame planning: how many frames to capture and how far apart.

use log::info;

/// Page measurements taken once, right after navigation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub full_content_height: u32,
    pub viewport_height: u32,
}

impl PageGeometry {
    /// Distance the page can scroll before the viewport hits the bottom.
    pub fn scrollable_distance(&self) -> u32 {
        self.full_content_height.saturating_sub(self.viewport_height)
    }
}

/// Number of frames and the scroll distance between consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub frame_count: u32,
    pub step: u32,
    /// Scrollable distance the plan covers; the last frame lands here
    pub distance: u32,
}

impl FramePlan {
    /// A page that fits in one viewport: one frame, no scrolling.
    pub fn single() -> Self {
        Self { frame_count: 1, step: 0, distance: 0 }
    }

    pub fn is_single(&self) -> bool {
        self.step == 0
    }

    /// Scroll offset of frame `index`.
    ///
    /// Frames sit `step` apart from the top, except the last one of a
    /// multi-frame plan, which is pinned to the bottom of the page. The first
    /// frame is always at offset 0.
    pub fn offset(&self, index: u32) -> u32 {
        if index == 0 {
            0
        } else if index + 1 >= self.frame_count {
            self.distance
        } else {
            index.saturating_mul(self.step).min(self.distance)
        }
    }

    /// Offsets of every frame, top to bottom.
    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.frame_count).map(move |i| self.offset(i))
    }
}

/// Plan the scroll capture for `distance` scrollable pixels.
///
/// The frame cap is never relaxed: when the requested step would need more
/// than `max_frames` frames, the step is enlarged to `ceil(distance / max_frames)`
/// and the count recomputed from it. Both divisions round up, so
/// `frame_count * step >= distance` always holds, and with more than one
/// frame the last offset is exactly `distance`.
///
/// `step` and `max_frames` must be non-zero.
pub fn plan_frames(distance: u32, step: u32, max_frames: u32) -> FramePlan {
    debug_assert!(step > 0 && max_frames > 0);
    if distance == 0 {
        return FramePlan::single();
    }

    let step = step.max(1);
    let max_frames = max_frames.max(1);

    let frame_count = distance.div_ceil(step);
    if frame_count <= max_frames {
        info!("Capturing {} frames with scroll step: {}px", frame_count, step);
        return FramePlan { frame_count, step, distance };
    }

    let step = distance.div_ceil(max_frames);
    let frame_count = distance.div_ceil(step);
    info!(
        "Limiting to {} frames with adjusted scroll step: {}px",
        frame_count, step
    );
    FramePlan { frame_count, step, distance }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_enlarges_step() {
        let plan = plan_frames(2000, 10, 120);
        assert_eq!(plan, FramePlan { frame_count: 118, step: 17, distance: 2000 });
    }

    #[test]
    fn under_cap_keeps_requested_step() {
        let plan = plan_frames(500, 10, 120);
        assert_eq!(plan, FramePlan { frame_count: 50, step: 10, distance: 500 });
        assert_eq!(plan.offset(48), 480);
        assert_eq!(plan.offsets().last(), Some(500));
    }

    #[test]
    fn short_page_is_single_frame() {
        let geometry = PageGeometry { full_content_height: 700, viewport_height: 1080 };
        assert_eq!(geometry.scrollable_distance(), 0);
        let plan = plan_frames(geometry.scrollable_distance(), 10, 120);
        assert_eq!(plan.frame_count, 1);
        assert!(plan.is_single());
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn exact_fit_page_is_single_frame() {
        let geometry = PageGeometry { full_content_height: 1080, viewport_height: 1080 };
        assert_eq!(plan_frames(geometry.scrollable_distance(), 10, 120), FramePlan::single());
    }

    #[test]
    fn step_larger_than_distance() {
        assert_eq!(plan_frames(5, 10, 120), FramePlan { frame_count: 1, step: 10, distance: 5 });
    }

    #[test]
    fn cap_of_one() {
        let plan = plan_frames(9_999, 3, 1);
        assert_eq!(plan, FramePlan { frame_count: 1, step: 9_999, distance: 9_999 });
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn never_exceeds_cap_and_always_covers() {
        for distance in [1u32, 2, 7, 99, 100, 101, 1_079, 2_000, 12_345, 250_000] {
            for step in [1u32, 3, 10, 17, 64, 1_000] {
                for cap in [1u32, 2, 5, 60, 120, 500] {
                    let plan = plan_frames(distance, step, cap);
                    assert!(plan.frame_count >= 1);
                    assert!(plan.frame_count <= cap, "{:?} for d={} s={} c={}", plan, distance, step, cap);
                    assert!(
                        plan.frame_count as u64 * plan.step as u64 >= distance as u64,
                        "{:?} does not cover d={}",
                        plan,
                        distance
                    );
                    assert!(plan.step >= step);

                    let offsets: Vec<u32> = plan.offsets().collect();
                    assert_eq!(offsets[0], 0);
                    assert!(offsets.windows(2).all(|w| w[0] < w[1]), "{:?} not ascending", plan);
                    if plan.frame_count > 1 {
                        assert_eq!(*offsets.last().unwrap(), distance);
                    }
                }
            }
        }
    }

    #[test]
    fn offsets_ascend() {
        let plan = plan_frames(2000, 10, 120);
        let offsets: Vec<u32> = plan.offsets().collect();
        assert_eq!(offsets.len(), 118);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[116], 116 * 17);
        assert_eq!(*offsets.last().unwrap(), 2000);
    }
}
