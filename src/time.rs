//! Frame timing for the windowed host.
//!
//! The simulation itself is frame-stepped, not time-stepped; this only
//! feeds the FPS and frame-time readout in the window title.

use std::time::{Duration, Instant};

/// Frame counter with a periodically refreshed FPS estimate.
#[derive(Debug)]
pub struct Time {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Time since last frame in seconds.
    delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Record a frame. Returns `true` when the FPS estimate was refreshed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        self.delta_secs = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            true
        } else {
            false
        }
    }

    /// Time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// FPS and last frame time, e.g. `60 fps, 16.7 ms`.
    pub fn readout(&self) -> String {
        format!("{:.0} fps, {:.1} ms", self.fps, self.delta() * 1000.0)
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.fps(), 0.0);
    }

    #[test]
    fn test_tick_counts_frames() {
        let mut time = Time::new();
        let start = time.last_frame;
        for i in 1..=3 {
            time.tick_at(start + Duration::from_millis(10 * i));
        }
        assert_eq!(time.frame(), 3);
        assert!((time.delta() - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_fps_refresh() {
        let mut time = Time::new();
        let start = time.fps_update_time;
        let mut refreshed = false;
        for i in 1..=30u64 {
            refreshed |= time.tick_at(start + Duration::from_millis(20 * i));
        }
        assert!(refreshed);
        assert!((time.fps() - 50.0).abs() < 1.0, "fps {}", time.fps());
    }

    #[test]
    fn test_readout_shows_frame_time() {
        let mut time = Time::new();
        let start = time.fps_update_time;
        for i in 1..=30u64 {
            time.tick_at(start + Duration::from_millis(20 * i));
        }
        assert_eq!(time.readout(), "50 fps, 20.0 ms");
    }
}
