//! Adaptive time budgets for work done in idle slices.

use std::time::Duration;

/// Smoothed estimate of how long one unit of work takes.
///
/// Each sample contributes a quarter of the new estimate. Samples covering
/// only a handful of units are too noisy and are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionDuration {
  duration:     f64,
  min_duration: f64,
  max_duration: f64,
}

impl Default for ActionDuration {
  fn default() -> Self {
    Self::new(Self::MIN_DURATION, Self::MIN_DURATION, Self::MAX_DURATION)
  }
}

impl ActionDuration {
  pub const MIN_DURATION: f64 = 1e-6;
  pub const MAX_DURATION: f64 = 1.0;
  const ALPHA: f64 = 0.25;
  const MIN_SAMPLE_ACTIONS: usize = 8;

  /// All values are in seconds.
  pub fn new(duration: f64, min_duration: f64, max_duration: f64) -> Self {
    Self {
      duration: duration.clamp(min_duration, max_duration),
      min_duration,
      max_duration,
    }
  }

  pub fn add_sample(&mut self, number_actions: usize, duration_of_actions: Duration) {
    if number_actions < Self::MIN_SAMPLE_ACTIONS {
      return;
    }
    let duration_one = duration_of_actions.as_secs_f64() / number_actions as f64;
    self.duration = (Self::ALPHA * duration_one + (1.0 - Self::ALPHA) * self.duration)
      .clamp(self.min_duration, self.max_duration);
  }

  /// Seconds per action.
  #[inline]
  pub fn duration(&self) -> f64 {
    self.duration
  }

  pub fn actions_in_allowed_time(&self, seconds_allowed: f64) -> usize {
    (seconds_allowed / self.duration).round().max(0.0) as usize
  }
}
