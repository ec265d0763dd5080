//! Scripted replay of deck interactions, for trying out settings without a UI.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context as _};
use policyangel_config::Config;
use serde::Serialize;

use crate::animation::Clock;
use crate::card_stack::{
    Card, CardId, CardStackController, CardTransform, Decision, Options, Phase,
};

/// Number of intermediate updates a scripted drag is split into.
const DRAG_UPDATES: u32 = 4;
/// Time between consecutive drag updates, one frame at 60 Hz.
const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Drag the front card to `displacement` and release it.
    ///
    /// Without an explicit velocity the one measured from the drag updates is used.
    Drag {
        displacement: f64,
        velocity: Option<f64>,
    },
    Remove(CardId),
    Wait(Duration),
    /// Fire the pending exit timer once it is due.
    Timer,
}

/// Deck state after one step.
#[derive(Debug, Serialize)]
pub struct Frame {
    pub step: String,
    pub time_ms: u64,
    pub phase: Phase,
    pub decision: Option<Decision>,
    pub cards: Vec<FrameCard>,
    pub live_region: String,
}

#[derive(Debug, Serialize)]
pub struct FrameCard {
    pub id: CardId,
    pub title: String,
    #[serde(flatten)]
    pub transform: CardTransform,
    pub offset_x: f64,
    pub exiting: bool,
}

pub struct Simulation {
    clock: Clock,
    stack: CardStackController<String>,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };

        match (kind, arg) {
            ("drag", Some(arg)) => {
                let (displacement, velocity) = match arg.split_once('@') {
                    Some((displacement, velocity)) => (displacement, Some(velocity)),
                    None => (arg, None),
                };
                let displacement = displacement
                    .parse()
                    .with_context(|| format!("invalid drag displacement {displacement:?}"))?;
                let velocity = velocity
                    .map(|v| v.parse().with_context(|| format!("invalid drag velocity {v:?}")))
                    .transpose()?;
                Ok(Step::Drag {
                    displacement,
                    velocity,
                })
            }
            ("remove", Some(id)) if !id.is_empty() => Ok(Step::Remove(CardId::from(id))),
            ("wait", Some(ms)) => {
                let ms = ms
                    .parse()
                    .with_context(|| format!("invalid wait duration {ms:?}"))?;
                Ok(Step::Wait(Duration::from_millis(ms)))
            }
            ("timer", None) => Ok(Step::Timer),
            _ => bail!("unknown step {s:?}, expected drag:<px>[@<px/s>], remove:<id>, wait:<ms> or timer"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Drag {
                displacement,
                velocity: None,
            } => write!(f, "drag:{displacement}"),
            Step::Drag {
                displacement,
                velocity: Some(velocity),
            } => write!(f, "drag:{displacement}@{velocity}"),
            Step::Remove(id) => write!(f, "remove:{id}"),
            Step::Wait(duration) => write!(f, "wait:{}", duration.as_millis()),
            Step::Timer => f.write_str("timer"),
        }
    }
}

impl Simulation {
    /// Creates a deck of `count` cards named `card1`, `card2` and so on.
    pub fn new(options: Options, count: usize) -> Self {
        let clock = Clock::with_time(Duration::ZERO);
        let cards = (1..=count).map(|n| Card::new(format!("card{n}"), format!("Card {n}")));
        let stack = CardStackController::with_cards(clock.clone(), options, cards);
        Self { clock, stack }
    }

    /// Creates a deck with the settings of the named deck, running at the configured slowdown.
    pub fn from_config(config: &Config, name: &str, count: usize) -> Self {
        let mut rv = Self::new(Options::from_config(config, name), count);
        rv.clock.set_rate(1. / config.animations.slowdown.max(0.001));
        rv
    }

    pub fn stack(&self) -> &CardStackController<String> {
        &self.stack
    }

    /// Runs all steps, returning the initial frame followed by one frame per step.
    pub fn run(&mut self, steps: &[Step]) -> Vec<Frame> {
        let mut frames = vec![self.frame(String::from("start"), None)];
        for step in steps {
            let decision = self.apply(step);
            self.stack.advance_animations();
            frames.push(self.frame(step.to_string(), decision));
        }
        frames
    }

    pub fn apply(&mut self, step: &Step) -> Option<Decision> {
        debug!("applying {step}");

        match *step {
            Step::Drag {
                displacement,
                velocity,
            } => {
                let front = self.stack.front_card()?.id.clone();
                if !self.stack.on_drag_begin(&front) {
                    return None;
                }

                for i in 1..=DRAG_UPDATES {
                    self.advance(FRAME);
                    self.stack
                        .on_drag_update(displacement * f64::from(i) / f64::from(DRAG_UPDATES));
                }

                let velocity = velocity.unwrap_or_else(|| self.stack.drag_velocity());
                self.stack.on_drag_end(displacement, velocity)
            }
            Step::Remove(ref id) => {
                self.stack.remove_card(id);
                None
            }
            Step::Wait(duration) => {
                self.advance(duration);
                None
            }
            Step::Timer => {
                if let Some((id, remaining)) = self.stack.exit_timer() {
                    self.advance(remaining);
                    self.stack.on_exit_timer(id);
                }
                None
            }
        }
    }

    fn advance(&mut self, by: Duration) {
        let now = self.clock.now_unadjusted();
        self.clock.set_unadjusted(now.saturating_add(by));
    }

    fn frame(&self, step: String, decision: Option<Decision>) -> Frame {
        let cards = self
            .stack
            .render_elements()
            .into_iter()
            .map(|elem| FrameCard {
                id: elem.card.id.clone(),
                title: elem.card.payload.clone(),
                transform: elem.transform,
                offset_x: elem.offset_x,
                exiting: elem.exiting,
            })
            .collect();

        Frame {
            step,
            time_ms: u64::try_from(self.clock.now_unadjusted().as_millis()).unwrap_or(u64::MAX),
            phase: self.stack.phase(),
            decision,
            cards,
            live_region: self.stack.live_region_text(String::clone),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} ms] {}: {:?}", self.time_ms, self.step, self.phase)?;
        if let Some(decision) = self.decision {
            write!(f, ", {decision:?}")?;
        }
        writeln!(f)?;

        for card in &self.cards {
            let t = &card.transform;
            write!(
                f,
                "  {}: opacity {:.2} scale {:.2} offset {:.0} z {} x {:.1}",
                card.id, t.opacity, t.scale, t.vertical_offset, t.z_order, card.offset_x,
            )?;
            if card.exiting {
                f.write_str(" exiting")?;
            }
            if t.interactive {
                f.write_str(" interactive")?;
            }
            writeln!(f)?;
        }

        write!(f, "  live region: {}", self.live_region)
    }
}
