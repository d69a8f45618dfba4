//! Frame scheduler driving the per-frame scene callback

use std::time::{Duration, Instant};

/// Longest frame delta handed to the callback, so a stalled window does not
/// make damping or auto-rotate jump
const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Timing for one scheduled frame
#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    /// Seconds since the previous tick (0 on the first)
    pub dt: f32,
    /// Frames run since start
    pub frame: u64,
}

/// Runs a single callback, bound at construction, once per tick while started
pub struct FrameScheduler<S, C> {
    callback: fn(&mut S, &C, FrameTick),
    running: bool,
    last_tick: Option<Instant>,
    frames: u64,
}

impl<S, C> FrameScheduler<S, C> {
    pub fn new(callback: fn(&mut S, &C, FrameTick)) -> Self {
        Self {
            callback,
            running: false,
            last_tick: None,
            frames: 0,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_tick = None;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run the callback once if started; returns whether it ran
    pub fn tick(&mut self, state: &mut S, ctx: &C, now: Instant) -> bool {
        if !self.running {
            return false;
        }

        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).min(MAX_FRAME_DELTA))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        self.frames += 1;

        (self.callback)(
            state,
            ctx,
            FrameTick {
                dt: dt.as_secs_f32(),
                frame: self.frames,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulate(total: &mut f32, scale: &f32, tick: FrameTick) {
        *total += tick.dt * scale;
    }

    #[test]
    fn test_only_runs_while_started() {
        let mut scheduler = FrameScheduler::new(accumulate);
        let mut total = 0.0;
        let t0 = Instant::now();

        assert!(!scheduler.tick(&mut total, &1.0, t0));
        scheduler.start();
        assert!(scheduler.tick(&mut total, &1.0, t0));
        assert!(scheduler.tick(&mut total, &1.0, t0 + Duration::from_millis(16)));
        assert!((total - 0.016).abs() < 1e-6);
        assert_eq!(scheduler.frames(), 2);

        scheduler.stop();
        assert!(!scheduler.tick(&mut total, &1.0, t0 + Duration::from_millis(32)));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut scheduler = FrameScheduler::new(accumulate);
        let mut total = 0.0;
        let t0 = Instant::now();
        scheduler.start();
        scheduler.tick(&mut total, &1.0, t0);
        scheduler.tick(&mut total, &1.0, t0 + Duration::from_secs(5));
        assert!((total - 0.1).abs() < 1e-6);
    }
}
