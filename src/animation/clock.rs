use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::utils::get_monotonic_time;

/// Shareable animation clock.
///
/// The clock samples the monotonic time once and keeps returning it until [`Clock::clear`] is
/// called, so that everything happening within one event dispatch sees the same instant. Time
/// handed out by [`Clock::now`] runs at an adjustable rate, which is how animation slowdown is
/// implemented.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug)]
struct Inner {
    /// Cached unadjusted time, `None` until next sampled.
    sampled: Option<Duration>,
    /// Unadjusted time at the last call to `now()`.
    last_seen: Duration,
    /// Adjusted time at the last call to `now()`.
    current: Duration,
    rate: f64,
    complete_instantly: bool,
}

impl Clock {
    /// Creates a new clock frozen at the given time.
    pub fn with_time(time: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner::new(Some(time)))),
        }
    }

    /// Returns the current time, adjusted for rate.
    pub fn now(&self) -> Duration {
        self.inner.borrow_mut().now()
    }

    /// Returns the underlying time not adjusted for rate change.
    pub fn now_unadjusted(&self) -> Duration {
        self.inner.borrow_mut().sample()
    }

    /// Sets the unadjusted clock time.
    pub fn set_unadjusted(&mut self, time: Duration) {
        self.inner.borrow_mut().sampled = Some(time);
    }

    /// Clears the stored time so it's re-fetched again next.
    pub fn clear(&mut self) {
        self.inner.borrow_mut().sampled = None;
    }

    pub fn rate(&self) -> f64 {
        self.inner.borrow().rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        // Bring the adjusted time up to date so the new rate only applies from here on.
        let mut inner = self.inner.borrow_mut();
        inner.now();
        inner.rate = rate.clamp(0., 1000.);
    }

    /// Returns whether animations should complete instantly.
    pub fn should_complete_instantly(&self) -> bool {
        self.inner.borrow().complete_instantly
    }

    pub fn set_complete_instantly(&mut self, value: bool) {
        self.inner.borrow_mut().complete_instantly = value;
    }

    /// Converts a span of adjusted time into the wall-clock time it takes to elapse.
    pub fn unadjusted_span(&self, span: Duration) -> Duration {
        let rate = self.rate();
        if rate <= 0. {
            return Duration::MAX;
        }

        Duration::try_from_secs_f64(span.as_secs_f64() / rate).unwrap_or(Duration::MAX)
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Clock {}

impl Inner {
    fn new(sampled: Option<Duration>) -> Self {
        let mut rv = Self {
            sampled,
            last_seen: Duration::ZERO,
            current: Duration::ZERO,
            rate: 1.,
            complete_instantly: false,
        };

        let time = rv.sample();
        rv.last_seen = time;
        rv.current = time;
        rv
    }

    fn sample(&mut self) -> Duration {
        *self.sampled.get_or_insert_with(get_monotonic_time)
    }

    fn now(&mut self) -> Duration {
        let time = self.sample();

        if self.last_seen < time {
            let delta = (time - self.last_seen).mul_f64(self.rate);
            self.current = self.current.saturating_add(delta);
        } else if time < self.last_seen {
            let delta = (self.last_seen - time).mul_f64(self.rate);
            self.current = self.current.saturating_sub(delta);
        }

        self.last_seen = time;
        self.current
    }
}

impl Default for Inner {
    fn default() -> Self {
        Self::new(None)
    }
}
