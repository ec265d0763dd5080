use serde::Serialize;

use super::Options;

// Per-depth visual parameters. The first three entries are the deck look at the default depth;
// deeper decks continue the same steps.
const DEPTH_OPACITY: [f64; 5] = [1., 0.8, 0.6, 0.4, 0.2];
const DEPTH_SCALE: [f64; 5] = [1., 0.98, 0.96, 0.94, 0.92];

const HIDDEN_SCALE: f64 = 0.8;

/// Visual parameters of one card at rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardTransform {
    pub opacity: f64,
    pub scale: f64,
    /// Offset from the front card position, negative is up.
    pub vertical_offset: f64,
    /// Paint order, higher is drawn on top.
    pub z_order: u32,
    /// Whether the card accepts drags.
    pub interactive: bool,
}

impl CardTransform {
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.
    }
}

/// Computes the resting transform of the card at `index` positions behind the front card, in a
/// deck of `total` cards.
pub fn transform(index: usize, total: usize, options: &Options) -> CardTransform {
    let depth = usize::from(options.visible_depth).clamp(1, DEPTH_OPACITY.len());
    let z_order = u32::try_from(total.saturating_sub(index)).unwrap_or(u32::MAX);

    if index < depth {
        CardTransform {
            opacity: DEPTH_OPACITY[index],
            scale: DEPTH_SCALE[index],
            vertical_offset: 0. - index as f64 * options.card_offset,
            z_order,
            interactive: index == 0,
        }
    } else {
        hidden(index, total, options)
    }
}

/// Transform of a card that is in the deck but not drawn.
pub fn hidden(index: usize, total: usize, options: &Options) -> CardTransform {
    let depth = usize::from(options.visible_depth).clamp(1, DEPTH_OPACITY.len());

    CardTransform {
        opacity: 0.,
        scale: HIDDEN_SCALE,
        vertical_offset: 0. - depth as f64 * options.card_offset,
        z_order: u32::try_from(total.saturating_sub(index)).unwrap_or(u32::MAX),
        interactive: false,
    }
}
