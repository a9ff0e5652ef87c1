use std::time::{Duration, Instant};

/// Wall-clock model driving `iTime`, `iAnimation`, and `iFrame`.
///
/// Two states, Running and Paused. Pausing captures the pause instant;
/// resuming folds the paused interval into `accumulated_pause`, so shader
/// time is frozen while paused and continuous across a pause/resume cycle.
/// All methods take `now` explicitly so the model stays deterministic under
/// test.
#[derive(Debug, Clone)]
pub struct TimingModel {
    start: Instant,
    accumulated_pause: Duration,
    pause_start: Option<Instant>,
    animation_reset_offset: f64,
    frame: u32,
}

impl TimingModel {
    pub fn new(now: Instant) -> Self {
        Self {
            start: now,
            accumulated_pause: Duration::ZERO,
            pause_start: None,
            animation_reset_offset: 0.0,
            frame: 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_start.is_some()
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        if self.is_paused() {
            self.resume(now);
        } else {
            self.pause(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if self.pause_start.is_none() {
            self.pause_start = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(pause_start) = self.pause_start.take() {
            self.accumulated_pause += now.saturating_duration_since(pause_start);
        }
    }

    /// Seconds of shader time: wall clock minus every paused interval. Frozen
    /// at the pause instant while paused.
    pub fn shader_time(&self, now: Instant) -> f64 {
        let effective = self.pause_start.unwrap_or(now);
        effective
            .saturating_duration_since(self.start)
            .saturating_sub(self.accumulated_pause)
            .as_secs_f64()
    }

    /// Seconds since the last animation reset, clamped to zero so floating
    /// point jitter around the reset instant never yields a negative value.
    pub fn animation_time(&self, now: Instant) -> f64 {
        (self.shader_time(now) - self.animation_reset_offset).max(0.0)
    }

    pub fn reset_animation(&mut self, now: Instant) {
        self.animation_reset_offset = self.shader_time(now);
    }

    /// Increments the frame counter, but only while running.
    pub fn advance_frame(&mut self) {
        if !self.is_paused() {
            self.frame = self.frame.saturating_add(1);
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(origin: Instant, millis: u64) -> Instant {
        origin + Duration::from_millis(millis)
    }

    #[test]
    fn shader_time_is_non_decreasing_while_running() {
        let origin = Instant::now();
        let timing = TimingModel::new(origin);
        let mut last = 0.0;
        for millis in [0, 10, 250, 1000, 5000] {
            let t = timing.shader_time(at(origin, millis));
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn shader_time_is_frozen_while_paused() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.pause(at(origin, 1000));
        let frozen = timing.shader_time(at(origin, 1000));
        assert_eq!(timing.shader_time(at(origin, 1500)), frozen);
        assert_eq!(timing.shader_time(at(origin, 9000)), frozen);
    }

    #[test]
    fn resume_is_continuous_with_the_pause_instant() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.pause(at(origin, 1000));
        let before = timing.shader_time(at(origin, 1000));
        timing.resume(at(origin, 1500));
        let after = timing.shader_time(at(origin, 1500));
        assert!((after - before).abs() < 1e-9);
        // Clock advances again after resume.
        assert!(timing.shader_time(at(origin, 1600)) > after);
    }

    #[test]
    fn accumulated_pause_grows_across_cycles() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.pause(at(origin, 100));
        timing.resume(at(origin, 200));
        timing.pause(at(origin, 300));
        timing.resume(at(origin, 500));
        // 400ms elapsed minus 300ms paused.
        let t = timing.shader_time(at(origin, 500));
        assert!((t - 0.2).abs() < 1e-9);
    }

    #[test]
    fn animation_time_tracks_reset_offset() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.reset_animation(at(origin, 2000));
        let t = timing.animation_time(at(origin, 3500));
        assert!((t - 1.5).abs() < 1e-9);
    }

    #[test]
    fn animation_time_never_negative() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.reset_animation(at(origin, 2000));
        assert_eq!(timing.animation_time(at(origin, 0)), 0.0);
    }

    #[test]
    fn frame_counter_holds_while_paused() {
        let origin = Instant::now();
        let mut timing = TimingModel::new(origin);
        timing.advance_frame();
        timing.advance_frame();
        assert_eq!(timing.frame(), 2);
        timing.pause(at(origin, 100));
        timing.advance_frame();
        timing.advance_frame();
        assert_eq!(timing.frame(), 2);
        timing.resume(at(origin, 200));
        timing.advance_frame();
        assert_eq!(timing.frame(), 3);
    }
}
