use serde::Serialize;

/// Side the front card leaves the deck towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Left,
    Right,
}

/// Outcome of a finished drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Remove the front card, animating it off towards the given side.
    Commit(Direction),
    /// Return the front card to rest.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Displacement in px that must be exceeded to commit.
    pub distance: f64,
    /// Release velocity in px/s that must be exceeded to commit, if velocity dismissal is on.
    pub velocity: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            distance: 100.,
            velocity: None,
        }
    }
}

impl Direction {
    /// Returns the direction of a signed movement, `None` for zero.
    pub fn from_sign(value: f64) -> Option<Self> {
        if value > 0. {
            Some(Direction::Right)
        } else if value < 0. {
            Some(Direction::Left)
        } else {
            None
        }
    }

    pub fn signum(self) -> f64 {
        match self {
            Direction::Left => -1.,
            Direction::Right => 1.,
        }
    }
}

impl Decision {
    pub fn is_commit(self) -> bool {
        matches!(self, Decision::Commit(_))
    }
}

/// Decides whether a drag released at `displacement_x` with `velocity_x` dismisses the card.
///
/// Thresholds are strict: a drag of exactly the distance threshold snaps back. When both signals
/// trigger, the displacement sign wins.
pub fn decide(displacement_x: f64, velocity_x: f64, thresholds: &Thresholds) -> Decision {
    // Non-finite readings come from a broken recognizer and never dismiss.
    if displacement_x.is_finite() && displacement_x.abs() > thresholds.distance {
        if let Some(direction) = Direction::from_sign(displacement_x) {
            return Decision::Commit(direction);
        }
    }

    if let Some(velocity) = thresholds.velocity {
        if velocity_x.is_finite() && velocity_x.abs() > velocity {
            if let Some(direction) = Direction::from_sign(velocity_x) {
                return Decision::Commit(direction);
            }
        }
    }

    Decision::Cancel
}
