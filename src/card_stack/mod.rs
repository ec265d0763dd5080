//! Swipeable depth-stacked card deck.
//!
//! The deck is an ordered list of cards, front to back. Only the front card can be dragged. When a
//! drag ends far enough (or, optionally, fast enough), the front card is committed for removal: it
//! stays in the list while its exit animation plays, but the next card takes over as the front
//! card right away. Once the exit animation duration elapses the card leaves the list.
//!
//! Everything that can go wrong here (drags on the wrong card, events out of order, a second
//! removal while one is in flight, an empty deck) is ignored rather than reported. There is no
//! external resource behind the deck, so the worst outcome of a dropped event is a card that
//! springs back.

use std::fmt;
use std::time::Duration;

use policyangel_config::{CardStack, Config};
use serde::Serialize;

use crate::animation::{Animation, Clock};
use crate::gesture::{DragId, GestureSampler};
use crate::utils::id::IdCounter;

pub mod dismissal;
pub mod transform;

#[cfg(test)]
mod tests;

pub use dismissal::{decide, Decision, Direction, Thresholds};
pub use transform::{transform, CardTransform};

static REMOVAL_ID_COUNTER: IdCounter = IdCounter::new();

/// Text announced when the deck runs out of cards.
pub const EMPTY_ANNOUNCEMENT: &str = "No more cards";

/// Unique key of a card within its deck.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

#[derive(Debug, Clone, PartialEq)]
pub struct Card<P> {
    pub id: CardId,
    /// Caller-owned display data, never looked at by the deck.
    pub payload: P,
}

/// Identifier of a committed removal, used to key its exit timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemovalId(u64);

/// Card that is animating out of the deck.
#[derive(Debug, Clone)]
pub struct RemovalRecord {
    pub id: RemovalId,
    pub card_id: CardId,
    pub direction: Direction,
    pub started_at: Duration,
    /// Position among the active cards at the time the removal was committed.
    pub from_index: usize,
    anim: Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Dragging,
    Committing,
}

#[derive(Debug)]
enum State {
    Idle,
    Dragging(DragId),
    Committing(RemovalRecord),
}

/// Per-deck settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Number of cards drawn with non-zero opacity, front card included.
    pub visible_depth: u8,
    /// Vertical step between consecutive cards.
    pub card_offset: f64,
    pub thresholds: Thresholds,
    /// Horizontal distance a committed card travels before it is gone.
    pub exit_distance: f64,
    pub exit_anim: policyangel_config::Animation,
    pub snap_back_anim: policyangel_config::Animation,
}

/// One card prepared for drawing.
#[derive(Debug)]
pub struct RenderCard<'a, P> {
    pub card: &'a Card<P>,
    pub transform: CardTransform,
    /// Horizontal offset from the rest position, from a drag or an animation.
    pub offset_x: f64,
    /// Whether this is the committed card playing its exit animation.
    pub exiting: bool,
}

type IndexListener = Box<dyn FnMut(usize)>;

pub struct CardStackController<P> {
    /// Cards front to back, including the one being removed.
    cards: Vec<Card<P>>,
    state: State,
    sampler: GestureSampler,
    /// Front card returning to rest after a cancelled drag.
    snap_back: Option<Animation>,
    on_current_index_changed: Option<IndexListener>,
    clock: Clock,
    options: Options,
}

impl CardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(String::from(value))
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<P> Card<P> {
    pub fn new(id: impl Into<CardId>, payload: P) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

impl RemovalId {
    fn next() -> Self {
        Self(REMOVAL_ID_COUNTER.next())
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl RemovalRecord {
    /// Current horizontal offset of the exiting card.
    pub fn offset_x(&self) -> f64 {
        self.anim.value()
    }

    /// Adjusted clock time at which the card leaves the deck.
    pub fn deadline(&self) -> Duration {
        self.anim.end_time()
    }
}

impl Default for Options {
    fn default() -> Self {
        let animations = policyangel_config::Animations::default();
        Self::from_parts(&CardStack::default(), &animations)
    }
}

impl Options {
    /// Resolves the settings of the named deck.
    pub fn from_config(config: &Config, name: &str) -> Self {
        Self::from_parts(&config.card_stack(name), &config.animations)
    }

    fn from_parts(stack: &CardStack, animations: &policyangel_config::Animations) -> Self {
        let mut exit_anim = animations.card_exit.0;
        if let Some(duration_ms) = stack.exit_duration_ms {
            exit_anim.duration_ms = duration_ms;
        }
        let mut snap_back_anim = animations.card_snap_back.0;
        if animations.off {
            exit_anim.off = true;
            snap_back_anim.off = true;
        }

        Self {
            visible_depth: stack.visible_depth,
            card_offset: stack.card_offset,
            thresholds: Thresholds {
                distance: stack.distance_threshold,
                velocity: stack.velocity_threshold,
            },
            exit_distance: 500.,
            exit_anim,
            snap_back_anim,
        }
    }

    pub fn with_visible_depth(mut self, depth: u8) -> Self {
        self.visible_depth = depth;
        self
    }

    pub fn with_distance_threshold(mut self, distance: f64) -> Self {
        self.thresholds.distance = distance;
        self
    }

    pub fn with_velocity_threshold(mut self, velocity: Option<f64>) -> Self {
        self.thresholds.velocity = velocity;
        self
    }

    pub fn with_exit_duration_ms(mut self, duration_ms: u32) -> Self {
        self.exit_anim.duration_ms = duration_ms;
        self
    }
}

impl<P> CardStackController<P> {
    pub fn new(clock: Clock, options: Options) -> Self {
        Self {
            cards: Vec::new(),
            state: State::Idle,
            sampler: GestureSampler::new(),
            snap_back: None,
            on_current_index_changed: None,
            clock,
            options,
        }
    }

    pub fn with_cards(
        clock: Clock,
        options: Options,
        cards: impl IntoIterator<Item = Card<P>>,
    ) -> Self {
        let mut rv = Self::new(clock, options);
        for card in cards {
            rv.push_card(card);
        }
        rv
    }

    /// Appends a card to the back of the deck.
    ///
    /// Returns `false` and drops the card if its id is already in the deck.
    pub fn push_card(&mut self, card: Card<P>) -> bool {
        if self.contains(&card.id) {
            warn!("ignoring card with duplicate id {}", card.id);
            return false;
        }

        self.cards.push(card);
        true
    }

    /// Registers the listener notified with the new current index after each removal.
    ///
    /// The deck always resets to its front card, so the index is always 0.
    pub fn set_on_current_index_changed(&mut self, listener: impl FnMut(usize) + 'static) {
        self.on_current_index_changed = Some(Box::new(listener));
    }

    pub fn update_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Cards front to back, including a card that is still animating out.
    pub fn current_stack(&self) -> &[Card<P>] {
        &self.cards
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.cards.iter().any(|card| card.id == *id)
    }

    /// Cards that are not being removed, front to back.
    pub fn active_cards(&self) -> impl Iterator<Item = &Card<P>> + '_ {
        let exiting = self.removal().map(|record| &record.card_id);
        self.cards
            .iter()
            .filter(move |card| Some(&card.id) != exiting)
    }

    pub fn active_len(&self) -> usize {
        self.active_cards().count()
    }

    /// Returns `true` once every card has been dismissed.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The card that accepts drags.
    ///
    /// While a removal is in flight this is already the card after the removed one.
    pub fn front_card(&self) -> Option<&Card<P>> {
        self.active_cards().next()
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Dragging(_) => Phase::Dragging,
            State::Committing(_) => Phase::Committing,
        }
    }

    pub fn removal(&self) -> Option<&RemovalRecord> {
        match &self.state {
            State::Committing(record) => Some(record),
            _ => None,
        }
    }

    /// Horizontal offset of the front card.
    pub fn front_offset(&self) -> f64 {
        match self.state {
            State::Dragging(_) => self.sampler.displacement(),
            _ => self.snap_back.as_ref().map_or(0., Animation::value),
        }
    }

    /// Velocity of the current drag estimated from its samples.
    pub fn drag_velocity(&self) -> f64 {
        self.sampler.velocity()
    }

    /// Binds a new drag to `card_id`.
    ///
    /// Ignored unless `card_id` is the front card and no removal is in flight.
    pub fn on_drag_begin(&mut self, card_id: &CardId) -> bool {
        if let State::Committing(record) = &self.state {
            trace!("ignoring drag begin during removal of {}", record.card_id);
            return false;
        }

        let Some(front) = self.front_card() else {
            trace!("ignoring drag begin on empty deck");
            return false;
        };

        if front.id != *card_id {
            trace!("ignoring drag begin on {card_id}, front card is {}", front.id);
            return false;
        }

        let id = self
            .sampler
            .begin(card_id.clone(), self.clock.now_unadjusted());
        self.state = State::Dragging(id);
        self.snap_back = None;
        true
    }

    /// Moves the front card to `displacement_x` from where the drag started.
    pub fn on_drag_update(&mut self, displacement_x: f64) -> bool {
        let State::Dragging(_) = self.state else {
            trace!("ignoring drag update outside of a drag");
            return false;
        };

        if !displacement_x.is_finite() {
            trace!("ignoring non-finite drag displacement");
            return false;
        }

        let delta = displacement_x - self.sampler.displacement();
        self.sampler.update(delta, self.clock.now_unadjusted())
    }

    /// Ends the current drag and acts on the dismissal decision.
    ///
    /// Returns `None` when there was no drag to end.
    pub fn on_drag_end(&mut self, displacement_x: f64, velocity_x: f64) -> Option<Decision> {
        let _span = tracy_client::span!("CardStackController::on_drag_end");

        let State::Dragging(drag_id) = self.state else {
            trace!("ignoring drag end outside of a drag");
            return None;
        };

        let sample = self.sampler.end(displacement_x, velocity_x)?;
        self.state = State::Idle;

        let decision = decide(sample.displacement_x, sample.velocity_x, &self.options.thresholds);
        debug!(
            "drag {} on {} ended at {:.1} px, {:.1} px/s: {decision:?}",
            drag_id.get(),
            sample.card_id,
            sample.displacement_x,
            sample.velocity_x,
        );

        match decision {
            Decision::Commit(direction) => {
                self.start_removal(sample.card_id, direction, sample.displacement_x);
            }
            Decision::Cancel => {
                if sample.displacement_x.is_finite() && sample.displacement_x != 0. {
                    self.snap_back = Some(Animation::new(
                        self.clock.clone(),
                        sample.displacement_x,
                        0.,
                        self.options.snap_back_anim,
                    ));
                }
            }
        }

        Some(decision)
    }

    /// Removes a card without a gesture, playing the same exit animation.
    ///
    /// Ignored if the card is not in the deck or another removal is in flight.
    pub fn remove_card(&mut self, card_id: &CardId) -> bool {
        if let State::Committing(record) = &self.state {
            trace!("ignoring removal of {card_id} during removal of {}", record.card_id);
            return false;
        }

        if !self.contains(card_id) {
            trace!("ignoring removal of unknown card {card_id}");
            return false;
        }

        let mut from = 0.;
        if let State::Dragging(_) = self.state {
            let displacement = self.sampler.displacement();
            if self.sampler.card_id() == Some(card_id) {
                from = displacement;
            } else if displacement != 0. {
                // A removal elsewhere in the deck ends the drag; let the front card settle.
                self.snap_back = Some(Animation::new(
                    self.clock.clone(),
                    displacement,
                    0.,
                    self.options.snap_back_anim,
                ));
            }
            self.sampler.reset();
            self.state = State::Idle;
        }
        if self.front_card().is_some_and(|front| front.id == *card_id) {
            // Fly off from wherever the card is settling.
            if let Some(anim) = self.snap_back.take() {
                from = anim.value();
            }
        }

        self.start_removal(card_id.clone(), Direction::Left, from);
        true
    }

    /// Returns the pending exit timer and the wall-clock time until it should fire.
    pub fn exit_timer(&self) -> Option<(RemovalId, Duration)> {
        let record = self.removal()?;
        let remaining = record.deadline().saturating_sub(self.clock.now());
        Some((record.id, self.clock.unadjusted_span(remaining)))
    }

    /// Completes the removal keyed by `id`.
    ///
    /// Timers of removals that already completed are ignored.
    pub fn on_exit_timer(&mut self, id: RemovalId) -> bool {
        match &self.state {
            State::Committing(record) if record.id == id => {
                self.finish_removal();
                true
            }
            _ => {
                trace!("ignoring stale exit timer {}", id.get());
                false
            }
        }
    }

    /// Advances animations to the current clock time.
    ///
    /// Completes a removal whose exit animation is over, so the deck makes progress even if the
    /// exit timer callback was lost.
    pub fn advance_animations(&mut self) {
        let _span = tracy_client::span!("CardStackController::advance_animations");

        if self.snap_back.as_ref().is_some_and(Animation::is_done) {
            self.snap_back = None;
        }

        if let State::Committing(record) = &self.state {
            if record.anim.is_done() {
                self.finish_removal();
            }
        }
    }

    /// Returns whether something is still animating.
    pub fn are_animations_ongoing(&self) -> bool {
        self.snap_back.is_some() || matches!(self.state, State::Committing(_))
    }

    /// Prepares every card for drawing, in deck order.
    ///
    /// A visible exiting card takes one of the `visible_depth` slots until it is gone. With a
    /// depth of 1 this leaves the next card hidden and non-interactive while the old front card
    /// flies off; it takes over once the removal completes.
    pub fn render_elements(&self) -> Vec<RenderCard<'_, P>> {
        let removal = self.removal();
        let exiting = removal.map(|record| &record.card_id);
        let active_len = self.active_len();

        let exiting_transform = removal.map(|record| {
            let mut resting = transform(record.from_index, active_len + 1, &self.options);
            // Drawn above the rest of the deck while it flies off.
            resting.z_order = u32::try_from(active_len + 1).unwrap_or(u32::MAX);
            resting.interactive = false;
            resting
        });

        // A visible exiting card keeps its slot until it is gone.
        let visible = usize::from(self.options.visible_depth).saturating_sub(usize::from(
            exiting_transform.is_some_and(|t| t.is_visible()),
        ));

        let mut rv = Vec::with_capacity(self.cards.len());
        let mut idx = 0;
        for card in &self.cards {
            if let (Some(resting), true) = (exiting_transform, Some(&card.id) == exiting) {
                rv.push(RenderCard {
                    card,
                    transform: resting,
                    offset_x: removal.map_or(0., RemovalRecord::offset_x),
                    exiting: true,
                });
                continue;
            }

            let mut resting = if idx < visible {
                transform(idx, active_len, &self.options)
            } else {
                transform::hidden(idx, active_len, &self.options)
            };
            // The next card takes over as soon as a removal is committed, as long as it has a slot.
            resting.interactive = idx == 0 && idx < visible;

            rv.push(RenderCard {
                card,
                transform: resting,
                offset_x: if idx == 0 { self.front_offset() } else { 0. },
                exiting: false,
            });
            idx += 1;
        }

        rv
    }

    /// Text for the accessibility live region describing the front card.
    pub fn live_region_text<T: fmt::Display>(&self, title: impl FnOnce(&P) -> T) -> String {
        match self.front_card() {
            Some(card) => format!(
                "Card 1 of {}: {}",
                self.active_len(),
                title(&card.payload)
            ),
            None => String::from(EMPTY_ANNOUNCEMENT),
        }
    }

    fn start_removal(&mut self, card_id: CardId, direction: Direction, from: f64) {
        let from_index = self
            .active_cards()
            .position(|card| card.id == card_id)
            .unwrap_or(0);
        let to = direction.signum() * self.options.exit_distance;
        let anim = Animation::new(self.clock.clone(), from, to, self.options.exit_anim);

        let record = RemovalRecord {
            id: RemovalId::next(),
            card_id,
            direction,
            started_at: self.clock.now(),
            from_index,
            anim,
        };
        debug!(
            "removing {} towards {direction:?} over {:?}",
            record.card_id,
            record.anim.duration()
        );

        let instant = record.anim.duration().is_zero() || self.clock.should_complete_instantly();
        self.state = State::Committing(record);

        if instant {
            self.finish_removal();
        }
    }

    fn finish_removal(&mut self) {
        let State::Committing(record) = std::mem::replace(&mut self.state, State::Idle) else {
            return;
        };

        let Some(idx) = self.cards.iter().position(|card| card.id == record.card_id) else {
            warn!("removed card {} is no longer in the deck", record.card_id);
            return;
        };

        self.cards.remove(idx);
        debug!("removed {}, {} cards left", record.card_id, self.cards.len());

        if let Some(listener) = &mut self.on_current_index_changed {
            listener(0);
        }
    }

    #[cfg(test)]
    pub fn verify_invariants(&self) {
        use std::collections::HashSet;

        let ids: HashSet<_> = self.cards.iter().map(|card| &card.id).collect();
        assert_eq!(ids.len(), self.cards.len(), "card ids must be unique");

        match &self.state {
            State::Idle => assert!(!self.sampler.is_active()),
            State::Dragging(id) => {
                assert_eq!(self.sampler.drag_id(), Some(*id));
                let front = self.front_card().expect("drag requires a front card");
                assert_eq!(self.sampler.card_id(), Some(&front.id));
            }
            State::Committing(record) => {
                assert!(!self.sampler.is_active());
                assert!(
                    self.contains(&record.card_id),
                    "exiting card must stay in the deck until its removal completes"
                );
            }
        }

        let elements = self.render_elements();
        assert_eq!(elements.len(), self.cards.len());

        let visible = elements
            .iter()
            .filter(|elem| elem.transform.is_visible())
            .count();
        assert!(visible <= usize::from(self.options.visible_depth));

        let interactive: Vec<_> = elements
            .iter()
            .filter(|elem| elem.transform.interactive)
            .collect();
        let front_visible = elements
            .iter()
            .find(|elem| !elem.exiting)
            .is_some_and(|elem| elem.transform.is_visible());
        match self.front_card() {
            Some(front) if front_visible => {
                assert_eq!(interactive.len(), 1);
                assert_eq!(interactive[0].card.id, front.id);
            }
            Some(_) => {
                assert!(interactive.is_empty(), "hidden front card must not be interactive");
                assert!(self.removal().is_some(), "front card can only be hidden by a removal");
            }
            None => assert!(interactive.is_empty()),
        }

        assert!(elements.iter().filter(|elem| elem.exiting).count() <= 1);
    }
}

impl<P> fmt::Debug for CardStackController<P>
where
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardStackController")
            .field("cards", &self.cards)
            .field("state", &self.state)
            .field("sampler", &self.sampler)
            .field("snap_back", &self.snap_back)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
