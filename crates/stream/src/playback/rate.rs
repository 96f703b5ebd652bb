use std::time::{Duration, Instant};

const SMOOTHING: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct PlaybackRate {
    fps: f32,
    last: Option<Instant>,
}

impl PlaybackRate {
    pub fn new(initial_fps: f32) -> Self {
        Self {
            fps: initial_fps,
            last: None,
        }
    }

    pub fn record_frame(&mut self, now: Instant) {
        if let Some(last) = self.last.replace(now) {
            self.record_interval(now.duration_since(last));
        }
    }

    pub fn record_interval(&mut self, dt: Duration) {
        let secs = dt.as_secs_f32();
        if secs <= 0.0 {
            return;
        }
        self.fps = SMOOTHING * self.fps + (1.0 - SMOOTHING) / secs;
    }

    /// Forget the last timestamp so a pause is not counted as a slow frame.
    pub fn resume(&mut self) {
        self.last = None;
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_interval() {
        let mut rate = PlaybackRate::new(30.0);
        rate.record_interval(Duration::from_millis(100));
        assert!((rate.fps() - 28.0).abs() < 1e-4);

        for _ in 0..200 {
            rate.record_interval(Duration::from_millis(100));
        }
        assert!((rate.fps() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn first_frame_only_sets_timestamp() {
        let mut rate = PlaybackRate::new(30.0);
        let now = Instant::now();
        rate.record_frame(now);
        assert_eq!(rate.fps(), 30.0);

        rate.record_frame(now + Duration::from_millis(50));
        assert!((rate.fps() - 29.0).abs() < 1e-3);
    }
}
