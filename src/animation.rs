//! Host-paced frame driver.
//!
//! The host calls [`AnimationDriver::frame`] from whatever frame callback it
//! has (here, winit redraw requests). The driver turns absolute timestamps
//! into per-frame deltas and hands them to the renderer.

use crate::render::camera::Viewport;
use crate::render::context::RenderContext;
use crate::render::pipeline::{FrameOutcome, FrameRenderer};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct AnimationDriver {
    last: Option<Instant>,
    frame_index: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call. The first call always reports zero so
    /// the cube does not jump on its first frame.
    pub fn elapsed_since_last(&mut self, now: Instant) -> f32 {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        elapsed
    }

    /// Runs one renderer tick for a frame presented at `now`.
    pub fn frame<C: RenderContext>(
        &mut self,
        now: Instant,
        renderer: &mut FrameRenderer<C>,
        ctx: &C,
        viewport: Viewport,
    ) -> FrameOutcome {
        let elapsed = self.elapsed_since_last(now);
        self.frame_index = self.frame_index.wrapping_add(1);
        renderer.tick(ctx, viewport, elapsed)
    }

    /// Number of frames driven so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_frame_has_zero_elapsed() {
        let mut driver = AnimationDriver::new();
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert_eq!(driver.elapsed_since_last(far_future), 0.0);
    }

    #[test]
    fn later_frames_measure_the_gap() {
        let mut driver = AnimationDriver::new();
        let start = Instant::now();
        driver.elapsed_since_last(start);
        assert_eq!(driver.elapsed_since_last(start + Duration::from_millis(250)), 0.25);
        assert_eq!(driver.elapsed_since_last(start + Duration::from_millis(750)), 0.5);
    }

    #[test]
    fn clock_going_backwards_yields_zero() {
        let mut driver = AnimationDriver::new();
        let start = Instant::now() + Duration::from_secs(1);
        driver.elapsed_since_last(start);
        assert_eq!(driver.elapsed_since_last(start - Duration::from_millis(10)), 0.0);
    }
}
