#![forbid(unsafe_code)]

//! Time-based animation support.
//!
//! A [`Timeline`] maps elapsed time to a normalized `f32` in `[0, 1]`
//! through an easing function. Callers advance it with [`Timeline::tick`]
//! from their own clock; the timeline itself never reads wall time.

use std::time::Duration;

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
#[must_use]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
#[must_use]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
#[must_use]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
#[must_use]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// A finite progress timeline.
#[derive(Debug, Clone)]
pub struct Timeline {
    elapsed: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Timeline {
    /// Create a timeline of the given duration with linear easing.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
            easing: linear,
        }
    }

    /// Set the easing function.
    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Advance the timeline by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    /// Raw progress in [0, 1], before easing.
    #[must_use]
    pub fn raw_progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Eased output value in [0, 1].
    #[must_use]
    pub fn value(&self) -> f32 {
        (self.easing)(self.raw_progress())
    }

    /// Whether the timeline has reached its end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Rewind to the start.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_bounds() {
        for f in [linear, ease_in, ease_out, ease_in_out] {
            assert_eq!(f(0.0), 0.0);
            assert!((f(1.0) - 1.0).abs() < f32::EPSILON);
            assert_eq!(f(-1.0), f(0.0));
            assert!((f(2.0) - f(1.0)).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn ease_in_out_midpoint() {
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn timeline_progress() {
        let mut t = Timeline::new(Duration::from_millis(100));
        assert_eq!(t.value(), 0.0);
        assert!(!t.is_complete());

        t.tick(Duration::from_millis(50));
        assert!((t.raw_progress() - 0.5).abs() < 1e-6);

        t.tick(Duration::from_millis(60));
        assert!(t.is_complete());
        assert!((t.value() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn timeline_zero_duration_completes_immediately() {
        let t = Timeline::new(Duration::ZERO);
        assert!(t.is_complete());
        assert_eq!(t.raw_progress(), 1.0);
    }

    #[test]
    fn timeline_reset() {
        let mut t = Timeline::new(Duration::from_millis(10));
        t.tick(Duration::from_millis(10));
        assert!(t.is_complete());
        t.reset();
        assert!(!t.is_complete());
        assert_eq!(t.value(), 0.0);
    }
}
