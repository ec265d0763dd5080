use knuffel::errors::DecodeError;

use crate::utils::{expect_only_children, parse_arg_node, MergeWith};
use crate::FloatOrInt;

#[derive(Debug, Clone, PartialEq)]
pub struct Animations {
    pub off: bool,
    pub slowdown: f64,
    pub card_exit: CardExitAnim,
    pub card_snap_back: CardSnapBackAnim,
}

impl Default for Animations {
    fn default() -> Self {
        Self {
            off: false,
            slowdown: 1.,
            card_exit: Default::default(),
            card_snap_back: Default::default(),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct AnimationsPart {
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child)]
    pub on: bool,
    #[knuffel(child, unwrap(argument))]
    pub slowdown: Option<FloatOrInt<0, { i32::MAX }>>,
    #[knuffel(child)]
    pub card_exit: Option<CardExitAnim>,
    #[knuffel(child)]
    pub card_snap_back: Option<CardSnapBackAnim>,
}

impl MergeWith<AnimationsPart> for Animations {
    fn merge_with(&mut self, part: &AnimationsPart) {
        self.off |= part.off;
        if part.on {
            self.off = false;
        }

        merge!((self, part), slowdown);

        // Duration and curve only make sense together, so individual animations are replaced
        // wholesale.
        merge_clone!((self, part), card_exit, card_snap_back);
    }
}

/// Fixed-duration easing animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub off: bool,
    pub duration_ms: u32,
    pub curve: Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutExpo,
}

/// Animation of a committed card leaving the deck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardExitAnim(pub Animation);

impl Default for CardExitAnim {
    fn default() -> Self {
        Self(Animation {
            off: false,
            duration_ms: 300,
            curve: Curve::EaseOutCubic,
        })
    }
}

/// Animation of the front card returning to rest after a cancelled swipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardSnapBackAnim(pub Animation);

impl Default for CardSnapBackAnim {
    fn default() -> Self {
        Self(Animation {
            off: false,
            duration_ms: 200,
            curve: Curve::EaseOutQuad,
        })
    }
}

impl<S> knuffel::Decode<S> for CardExitAnim
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let default = Self::default().0;
        Ok(Self(Animation::decode_node(node, ctx, default)?))
    }
}

impl<S> knuffel::Decode<S> for CardSnapBackAnim
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let default = Self::default().0;
        Ok(Self(Animation::decode_node(node, ctx, default)?))
    }
}

impl Animation {
    pub fn new_off() -> Self {
        Self {
            off: true,
            duration_ms: 0,
            curve: Curve::Linear,
        }
    }

    fn decode_node<S: knuffel::traits::ErrorSpan>(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
        default: Self,
    ) -> Result<Self, DecodeError<S>> {
        expect_only_children(node, ctx);

        let mut off = false;
        let mut duration_ms = None;
        let mut curve = None;

        for child in node.children() {
            match &**child.node_name {
                "off" => {
                    knuffel::decode::check_flag_node(child, ctx);
                    if off {
                        ctx.emit_error(DecodeError::unexpected(
                            &child.node_name,
                            "node",
                            "duplicate node `off`, single node expected",
                        ));
                    } else {
                        off = true;
                    }
                }
                "duration-ms" => {
                    if duration_ms.is_some() {
                        ctx.emit_error(DecodeError::unexpected(
                            &child.node_name,
                            "node",
                            "duplicate node `duration-ms`, single node expected",
                        ));
                    }

                    duration_ms = Some(parse_arg_node("duration-ms", child, ctx)?);
                }
                "curve" => {
                    if curve.is_some() {
                        ctx.emit_error(DecodeError::unexpected(
                            &child.node_name,
                            "node",
                            "duplicate node `curve`, single node expected",
                        ));
                    }

                    let name: String = parse_arg_node("curve", child, ctx)?;
                    curve = match name.as_str() {
                        "linear" => Some(Curve::Linear),
                        "ease-out-quad" => Some(Curve::EaseOutQuad),
                        "ease-out-cubic" => Some(Curve::EaseOutCubic),
                        "ease-out-expo" => Some(Curve::EaseOutExpo),
                        unexpected_curve => {
                            ctx.emit_error(DecodeError::conversion(
                                child,
                                format!(
                                    "unexpected animation curve `{unexpected_curve}`. \
                                    Supported curves are \
                                    `ease-out-quad`, `ease-out-cubic`, `ease-out-expo` and `linear`."
                                ),
                            ));
                            None
                        }
                    };
                }
                name_str => {
                    ctx.emit_error(DecodeError::unexpected(
                        child,
                        "node",
                        format!("unexpected node `{}`", name_str.escape_default()),
                    ));
                }
            }
        }

        Ok(Self {
            off,
            duration_ms: duration_ms.unwrap_or(default.duration_ms),
            curve: curve.unwrap_or(default.curve),
        })
    }
}
