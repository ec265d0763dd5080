use std::time::Duration;

use keyframe::functions::{EaseOutCubic, EaseOutQuad};
use keyframe::EasingFunction;

mod clock;
pub use clock::Clock;

/// Fixed-duration eased transition of a single value.
#[derive(Debug, Clone)]
pub struct Animation {
    from: f64,
    to: f64,
    duration: Duration,
    start_time: Duration,
    clock: Clock,
    curve: Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutExpo,
}

impl Animation {
    pub fn new(clock: Clock, from: f64, to: f64, config: policyangel_config::Animation) -> Self {
        let duration_ms = if config.off { 0 } else { config.duration_ms };
        Self::ease(clock, from, to, u64::from(duration_ms), Curve::from(config.curve))
    }

    pub fn ease(clock: Clock, from: f64, to: f64, duration_ms: u64, curve: Curve) -> Self {
        Self {
            from,
            to,
            duration: Duration::from_millis(duration_ms),
            start_time: clock.now(),
            clock,
            curve,
        }
    }

    pub fn is_done(&self) -> bool {
        if self.clock.should_complete_instantly() {
            return true;
        }

        self.clock.now() >= self.end_time()
    }

    pub fn value_at(&self, at: Duration) -> f64 {
        if at <= self.start_time {
            // Return `from` at the start time even for zero-length animations so that the
            // behavior within a single event dispatch does not depend on the duration.
            return self.from;
        } else if self.end_time() <= at {
            return self.to;
        }

        if self.clock.should_complete_instantly() {
            return self.to;
        }

        let passed = at.saturating_sub(self.start_time).as_secs_f64();
        let total = self.duration.as_secs_f64();
        let x = (passed / total).clamp(0., 1.);
        self.curve.y(x) * (self.to - self.from) + self.from
    }

    pub fn value(&self) -> f64 {
        self.value_at(self.clock.now())
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    pub fn end_time(&self) -> Duration {
        self.start_time + self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Curve {
    pub fn y(self, x: f64) -> f64 {
        match self {
            Curve::Linear => x,
            Curve::EaseOutQuad => EaseOutQuad.y(x),
            Curve::EaseOutCubic => EaseOutCubic.y(x),
            Curve::EaseOutExpo => 1. - 2f64.powf(-10. * x),
        }
    }
}

impl From<policyangel_config::Curve> for Curve {
    fn from(value: policyangel_config::Curve) -> Self {
        match value {
            policyangel_config::Curve::Linear => Curve::Linear,
            policyangel_config::Curve::EaseOutQuad => Curve::EaseOutQuad,
            policyangel_config::Curve::EaseOutCubic => Curve::EaseOutCubic,
            policyangel_config::Curve::EaseOutExpo => Curve::EaseOutExpo,
        }
    }
}
