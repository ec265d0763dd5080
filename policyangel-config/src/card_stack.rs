use knuffel::errors::DecodeError;

use crate::utils::MergeWith;
use crate::FloatOrInt;

/// Deepest deck the presentation layer knows how to draw.
pub const MAX_VISIBLE_DEPTH: u8 = 5;

/// Resolved settings of one card deck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardStack {
    /// Number of cards drawn with non-zero opacity, front card included.
    pub visible_depth: u8,
    /// Vertical step between consecutive cards in logical pixels.
    pub card_offset: f64,
    /// Horizontal drag distance that must be exceeded to dismiss the front card.
    pub distance_threshold: f64,
    /// Release velocity in px/s that dismisses the front card regardless of distance.
    ///
    /// Velocity dismissal is disabled when unset.
    pub velocity_threshold: Option<f64>,
    /// Overrides the global card exit animation duration for this deck.
    pub exit_duration_ms: Option<u32>,
}

impl Default for CardStack {
    fn default() -> Self {
        Self {
            visible_depth: 3,
            card_offset: 40.,
            distance_threshold: 100.,
            velocity_threshold: None,
            exit_duration_ms: None,
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct CardStackPart {
    #[knuffel(argument)]
    pub name: String,
    #[knuffel(child, unwrap(argument))]
    pub visible_depth: Option<VisibleDepth>,
    #[knuffel(child, unwrap(argument))]
    pub card_offset: Option<FloatOrInt<0, 65535>>,
    #[knuffel(child, unwrap(argument))]
    pub distance_threshold: Option<FloatOrInt<0, 65535>>,
    #[knuffel(child, unwrap(argument))]
    pub velocity_threshold: Option<FloatOrInt<0, 1_000_000>>,
    #[knuffel(child)]
    pub no_velocity_threshold: bool,
    #[knuffel(child, unwrap(argument))]
    pub exit_duration_ms: Option<u32>,
}

impl MergeWith<CardStackPart> for CardStack {
    fn merge_with(&mut self, part: &CardStackPart) {
        merge!(
            (self, part),
            card_offset,
            distance_threshold,
            velocity_threshold,
        );

        if part.no_velocity_threshold {
            self.velocity_threshold = None;
        }
        if let Some(depth) = part.visible_depth {
            self.visible_depth = depth.0;
        }
        if part.exit_duration_ms.is_some() {
            self.exit_duration_ms = part.exit_duration_ms;
        }
    }
}

/// A card stack settings block together with the screen it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCardStack {
    pub name: String,
    pub stack: CardStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleDepth(pub u8);

impl<S: knuffel::traits::ErrorSpan> knuffel::DecodeScalar<S> for VisibleDepth {
    fn type_check(
        type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        ctx: &mut knuffel::decode::Context<S>,
    ) {
        if let Some(type_name) = &type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }
    }

    fn raw_decode(
        val: &knuffel::span::Spanned<knuffel::ast::Literal, S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let default = VisibleDepth(CardStack::default().visible_depth);

        match &**val {
            knuffel::ast::Literal::Int(ref value) => match u8::try_from(value) {
                Ok(v) if (1..=MAX_VISIBLE_DEPTH).contains(&v) => Ok(VisibleDepth(v)),
                Ok(_) => {
                    ctx.emit_error(DecodeError::conversion(
                        val,
                        format!("visible-depth must be between 1 and {MAX_VISIBLE_DEPTH}"),
                    ));
                    Ok(default)
                }
                Err(e) => {
                    ctx.emit_error(DecodeError::conversion(val, e));
                    Ok(default)
                }
            },
            _ => {
                ctx.emit_error(DecodeError::unsupported(
                    val,
                    "Unsupported value, only integers are recognized",
                ));
                Ok(default)
            }
        }
    }
}
