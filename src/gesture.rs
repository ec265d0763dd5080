//! Horizontal drag sampling.
//!
//! The platform gesture recognizer delivers drags already normalized to horizontal logical pixels.
//! [`GestureSampler`] binds at most one of them to a card and turns the event stream into a
//! final displacement and release velocity.

use std::collections::VecDeque;
use std::time::Duration;

use crate::card_stack::CardId;
use crate::utils::id::IdCounter;

const HISTORY_LIMIT: Duration = Duration::from_millis(150);

static DRAG_ID_COUNTER: IdCounter = IdCounter::new();

/// Identifier of one drag, from begin to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DragId(u64);

impl DragId {
    fn next() -> DragId {
        DragId(DRAG_ID_COUNTER.next())
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Positions of one drag over the last 150 ms, for estimating its velocity.
#[derive(Debug)]
pub struct DragHistory {
    drag: DragId,
    samples: VecDeque<Sample>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    displacement: f64,
    timestamp: Duration,
}

/// Finalized drag, handed to the dismissal policy.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSample {
    pub card_id: CardId,
    pub displacement_x: f64,
    pub velocity_x: f64,
}

#[derive(Debug)]
struct ActiveDrag {
    card_id: CardId,
    history: DragHistory,
}

/// Tracks the single drag that may be in progress.
#[derive(Debug, Default)]
pub struct GestureSampler {
    active: Option<ActiveDrag>,
}

impl DragHistory {
    /// Starts the history of `drag` at rest.
    pub fn new(drag: DragId, timestamp: Duration) -> Self {
        Self {
            drag,
            samples: VecDeque::from([Sample {
                displacement: 0.,
                timestamp,
            }]),
        }
    }

    pub fn drag(&self) -> DragId {
        self.drag
    }

    /// Moves the drag by `delta` at `timestamp`.
    ///
    /// Non-finite deltas and samples older than the latest one are dropped.
    pub fn push(&mut self, delta: f64, timestamp: Duration) {
        if !delta.is_finite() {
            trace!("drag {}: ignoring non-finite delta {delta}", self.drag.get());
            return;
        }

        let last = self.last();
        if timestamp < last.timestamp {
            trace!(
                "drag {}: ignoring sample at {timestamp:?} earlier than {:?}",
                self.drag.get(),
                last.timestamp
            );
            return;
        }

        self.samples.push_back(Sample {
            displacement: last.displacement + delta,
            timestamp,
        });

        // Keep one sample at or before the window start so the window is always spanned.
        while self
            .samples
            .get(1)
            .is_some_and(|next| next.timestamp + HISTORY_LIMIT <= timestamp)
        {
            self.samples.pop_front();
        }
    }

    /// Displacement from where the drag started.
    pub fn displacement(&self) -> f64 {
        self.last().displacement
    }

    /// Average velocity in px/s over the retained samples.
    pub fn velocity(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.;
        };

        let elapsed = last.timestamp.saturating_sub(first.timestamp).as_secs_f64();
        if elapsed == 0. {
            return 0.;
        }

        (last.displacement - first.displacement) / elapsed
    }

    fn last(&self) -> Sample {
        self.samples.back().copied().unwrap_or(Sample {
            displacement: 0.,
            timestamp: Duration::ZERO,
        })
    }
}

impl GestureSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a drag on `card_id`.
    ///
    /// The caller is responsible for only passing the front card. Any previous drag is dropped.
    pub fn begin(&mut self, card_id: CardId, timestamp: Duration) -> DragId {
        if let Some(prev) = self.active.take() {
            debug!(
                "drag {} on {} replaced before it ended",
                prev.history.drag().get(),
                prev.card_id
            );
        }

        let id = DragId::next();
        self.active = Some(ActiveDrag {
            card_id,
            history: DragHistory::new(id, timestamp),
        });
        id
    }

    /// Accumulates signed horizontal movement since the previous update.
    ///
    /// Returns `false` when no drag is active, which covers updates arriving after `end()`.
    pub fn update(&mut self, delta_x: f64, timestamp: Duration) -> bool {
        let Some(drag) = &mut self.active else {
            trace!("ignoring drag update without an active drag");
            return false;
        };

        drag.history.push(delta_x, timestamp);
        true
    }

    /// Finishes the drag, clearing the sampler state unconditionally.
    pub fn end(
        &mut self,
        final_displacement_x: f64,
        release_velocity_x: f64,
    ) -> Option<GestureSample> {
        let drag = self.active.take()?;

        Some(GestureSample {
            card_id: drag.card_id,
            displacement_x: final_displacement_x,
            velocity_x: release_velocity_x,
        })
    }

    /// Drops the drag without producing a sample.
    pub fn reset(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn drag_id(&self) -> Option<DragId> {
        self.active.as_ref().map(|drag| drag.history.drag())
    }

    pub fn card_id(&self) -> Option<&CardId> {
        self.active.as_ref().map(|drag| &drag.card_id)
    }

    /// Displacement accumulated so far by the active drag.
    pub fn displacement(&self) -> f64 {
        self.active.as_ref().map_or(0., |drag| drag.history.displacement())
    }

    /// Velocity of the active drag estimated from its recent history.
    ///
    /// For hosts whose recognizer does not report a release velocity.
    pub fn velocity(&self) -> f64 {
        self.active.as_ref().map_or(0., |drag| drag.history.velocity())
    }
}
