use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use insta::assert_snapshot;
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use super::*;

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn deck(clock: &Clock, options: Options, ids: &[&str]) -> CardStackController<String> {
    let cards = ids
        .iter()
        .map(|id| Card::new(*id, format!("Card {}", id.to_uppercase())));
    CardStackController::with_cards(clock.clone(), options, cards)
}

fn ids<P>(stack: &CardStackController<P>) -> Vec<&str> {
    stack
        .current_stack()
        .iter()
        .map(|card| card.id.as_str())
        .collect()
}

fn front_id<P>(stack: &CardStackController<P>) -> Option<&str> {
    stack.front_card().map(|card| card.id.as_str())
}

fn swipe<P>(stack: &mut CardStackController<P>, displacement: f64) -> Option<Decision> {
    let front = stack.front_card()?.id.clone();
    stack.on_drag_begin(&front);
    stack.on_drag_update(displacement);
    stack.on_drag_end(displacement, 0.)
}

fn index_log<P>(stack: &mut CardStackController<P>) -> Rc<RefCell<Vec<usize>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_ = log.clone();
    stack.set_on_current_index_changed(move |idx| log_.borrow_mut().push(idx));
    log
}

fn format_render<P>(stack: &CardStackController<P>) -> String {
    stack
        .render_elements()
        .iter()
        .map(|elem| {
            let t = elem.transform;
            format!(
                "{}: opacity {:.2} scale {:.2} offset {:>4} z {} x {:>4}{}{}",
                elem.card.id,
                t.opacity,
                t.scale,
                t.vertical_offset,
                t.z_order,
                elem.offset_x,
                if elem.exiting { " exiting" } else { "" },
                if t.interactive { " interactive" } else { "" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn swipe_right_removes_front_card() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);
    let log = index_log(&mut stack);

    assert!(stack.on_drag_begin(&CardId::from("a")));
    assert_eq!(stack.phase(), Phase::Dragging);
    assert!(stack.on_drag_update(150.));
    assert_eq!(stack.front_offset(), 150.);

    let decision = stack.on_drag_end(150., 0.);
    assert_eq!(decision, Some(Decision::Commit(Direction::Right)));
    stack.verify_invariants();

    // The next card takes over right away while the removed one animates out.
    assert_eq!(stack.phase(), Phase::Committing);
    assert_eq!(front_id(&stack), Some("b"));
    assert_eq!(ids(&stack), ["a", "b", "c"]);
    let removal = stack.removal().unwrap();
    assert_eq!(removal.card_id, CardId::from("a"));
    assert_eq!(removal.direction, Direction::Right);
    assert!(log.borrow().is_empty());

    clock.set_unadjusted(ms(299));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["a", "b", "c"]);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    stack.verify_invariants();
    assert_eq!(ids(&stack), ["b", "c"]);
    assert_eq!(stack.phase(), Phase::Idle);
    assert!(!stack.are_animations_ongoing());
    assert_eq!(*log.borrow(), [0]);
}

#[test]
fn swipe_left_removes_front_card() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    let decision = swipe(&mut stack, -120.);
    assert_eq!(decision, Some(Decision::Commit(Direction::Left)));

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b"]);
}

#[test]
fn short_drag_snaps_back() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);
    let log = index_log(&mut stack);

    assert_eq!(swipe(&mut stack, 50.), Some(Decision::Cancel));
    stack.verify_invariants();
    assert_eq!(stack.phase(), Phase::Idle);
    assert!(stack.removal().is_none());
    assert_eq!(ids(&stack), ["a", "b", "c"]);

    // The card starts returning from where it was released.
    assert_eq!(stack.front_offset(), 50.);
    assert!(stack.are_animations_ongoing());

    clock.set_unadjusted(ms(100));
    let offset = stack.front_offset();
    assert!(0. < offset && offset < 50., "{offset}");

    clock.set_unadjusted(ms(200));
    stack.advance_animations();
    assert_eq!(stack.front_offset(), 0.);
    assert!(!stack.are_animations_ongoing());
    assert!(log.borrow().is_empty());
}

#[test]
fn drag_at_exact_threshold_snaps_back() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);
    assert_eq!(swipe(&mut stack, 100.), Some(Decision::Cancel));
    assert_eq!(swipe(&mut stack, -100.), Some(Decision::Cancel));
    assert_eq!(ids(&stack), ["a", "b"]);
}

#[test]
fn new_drag_interrupts_snap_back() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    swipe(&mut stack, 80.);
    clock.set_unadjusted(ms(50));
    assert!(stack.on_drag_begin(&CardId::from("a")));
    assert_eq!(stack.front_offset(), 0.);
    assert!(!stack.are_animations_ongoing());
}

#[test]
fn second_drag_end_is_ignored() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);
    let log = index_log(&mut stack);

    assert!(swipe(&mut stack, 150.).unwrap().is_commit());
    assert_eq!(stack.on_drag_end(150., 0.), None);
    stack.verify_invariants();

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b", "c"]);
    assert_eq!(*log.borrow(), [0]);
}

#[test]
fn drag_end_without_begin_is_ignored() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a"]);
    assert_eq!(stack.on_drag_end(500., 5000.), None);
    assert_eq!(stack.phase(), Phase::Idle);
    assert_eq!(ids(&stack), ["a"]);
}

#[test]
fn update_after_end_is_ignored() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    swipe(&mut stack, 30.);
    assert!(!stack.on_drag_update(400.));
    assert_eq!(stack.front_offset(), 30.);
    assert_eq!(stack.on_drag_end(400., 0.), None);
    assert_eq!(ids(&stack), ["a", "b"]);
}

#[test]
fn drag_on_back_card_is_ignored() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);

    assert!(!stack.on_drag_begin(&CardId::from("b")));
    assert!(!stack.on_drag_begin(&CardId::from("missing")));
    assert_eq!(stack.phase(), Phase::Idle);
    assert!(!stack.on_drag_update(200.));
    assert_eq!(stack.on_drag_end(200., 0.), None);
    assert_eq!(ids(&stack), ["a", "b", "c"]);
}

#[test]
fn repeated_drag_begin_restarts_drag() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    assert!(stack.on_drag_begin(&CardId::from("a")));
    stack.on_drag_update(60.);
    assert!(stack.on_drag_begin(&CardId::from("a")));
    assert_eq!(stack.front_offset(), 0.);
    stack.verify_invariants();
}

#[test]
fn no_drag_during_removal() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);

    swipe(&mut stack, 150.);
    assert_eq!(front_id(&stack), Some("b"));
    assert!(!stack.on_drag_begin(&CardId::from("b")));
    assert!(!stack.on_drag_begin(&CardId::from("a")));
    assert_eq!(stack.phase(), Phase::Committing);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert!(stack.on_drag_begin(&CardId::from("b")));
}

#[test]
fn removal_during_removal_is_ignored() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);

    assert!(stack.remove_card(&CardId::from("a")));
    assert!(!stack.remove_card(&CardId::from("b")));
    assert_eq!(stack.removal().unwrap().card_id, CardId::from("a"));

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b", "c"]);
}

#[test]
fn remove_card_plays_exit_animation() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);
    let log = index_log(&mut stack);

    assert!(!stack.remove_card(&CardId::from("missing")));
    assert!(stack.remove_card(&CardId::from("a")));
    let removal = stack.removal().unwrap();
    assert_eq!(removal.direction, Direction::Left);
    assert_eq!(removal.offset_x(), 0.);

    clock.set_unadjusted(ms(300));
    assert_eq!(stack.removal().unwrap().offset_x(), -500.);
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b"]);
    assert_eq!(*log.borrow(), [0]);
}

#[test]
fn remove_back_card_while_dragging() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);

    stack.on_drag_begin(&CardId::from("a"));
    stack.on_drag_update(40.);
    assert!(stack.remove_card(&CardId::from("b")));
    stack.verify_invariants();

    // The drag is over and the front card settles back.
    assert_eq!(stack.on_drag_end(40., 0.), None);
    assert_eq!(front_id(&stack), Some("a"));
    assert_eq!(stack.front_offset(), 40.);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    stack.verify_invariants();
    assert_eq!(ids(&stack), ["a", "c"]);
    assert_eq!(stack.front_offset(), 0.);
}

#[test]
fn remove_dragged_card_continues_from_drag() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    stack.on_drag_begin(&CardId::from("a"));
    stack.on_drag_update(40.);
    assert!(stack.remove_card(&CardId::from("a")));
    stack.verify_invariants();
    assert_eq!(stack.removal().unwrap().offset_x(), 40.);
    assert_eq!(front_id(&stack), Some("b"));
}

#[test]
fn stale_exit_timer_is_ignored() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);
    let log = index_log(&mut stack);

    swipe(&mut stack, 150.);
    let (first, remaining) = stack.exit_timer().unwrap();
    assert_abs_diff_eq!(remaining.as_secs_f64(), 0.3, epsilon = 1e-6);

    clock.set_unadjusted(ms(300));
    assert!(stack.on_exit_timer(first));
    assert_eq!(ids(&stack), ["b", "c"]);

    swipe(&mut stack, 150.);
    let (second, _) = stack.exit_timer().unwrap();
    assert_ne!(first, second);

    // The first timer firing again must not complete the second removal.
    assert!(!stack.on_exit_timer(first));
    assert_eq!(ids(&stack), ["b", "c"]);
    assert_eq!(stack.removal().unwrap().card_id, CardId::from("b"));

    assert!(stack.on_exit_timer(second));
    assert!(!stack.on_exit_timer(second));
    assert_eq!(ids(&stack), ["c"]);
    assert_eq!(*log.borrow(), [0, 0]);
}

#[test]
fn timer_after_advance_is_ignored() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    swipe(&mut stack, -150.);
    let (id, _) = stack.exit_timer().unwrap();
    clock.set_unadjusted(ms(400));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b"]);

    assert!(!stack.on_exit_timer(id));
    assert_eq!(ids(&stack), ["b"]);
    assert_eq!(stack.exit_timer(), None);
}

#[test]
fn exit_timer_follows_slowdown() {
    let mut clock = Clock::with_time(Duration::ZERO);
    clock.set_rate(0.5);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    swipe(&mut stack, 150.);
    let (_, remaining) = stack.exit_timer().unwrap();
    assert_abs_diff_eq!(remaining.as_secs_f64(), 0.6, epsilon = 1e-6);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["a", "b"]);

    clock.set_unadjusted(ms(600));
    stack.advance_animations();
    assert_eq!(ids(&stack), ["b"]);
}

#[test]
fn zero_exit_duration_removes_immediately() {
    let clock = Clock::with_time(Duration::ZERO);
    let options = Options::default().with_exit_duration_ms(0);
    let mut stack = deck(&clock, options, &["a", "b"]);
    let log = index_log(&mut stack);

    assert!(swipe(&mut stack, 150.).unwrap().is_commit());
    assert_eq!(stack.phase(), Phase::Idle);
    assert_eq!(ids(&stack), ["b"]);
    assert_eq!(*log.borrow(), [0]);
}

#[test]
fn complete_instantly_removes_immediately() {
    let mut clock = Clock::with_time(Duration::ZERO);
    clock.set_complete_instantly(true);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    swipe(&mut stack, 150.);
    assert_eq!(ids(&stack), ["b"]);
    assert!(!stack.are_animations_ongoing());
}

#[test]
fn velocity_dismissal_is_opt_in() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    stack.on_drag_begin(&CardId::from("a"));
    stack.on_drag_update(20.);
    assert_eq!(stack.on_drag_end(20., -2000.), Some(Decision::Cancel));

    let options = Options::default().with_velocity_threshold(Some(800.));
    stack.update_options(options);
    stack.on_drag_begin(&CardId::from("a"));
    stack.on_drag_update(20.);
    assert_eq!(
        stack.on_drag_end(20., -2000.),
        Some(Decision::Commit(Direction::Left))
    );
}

#[test]
fn non_finite_drag_never_commits() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a"]);

    stack.on_drag_begin(&CardId::from("a"));
    assert!(!stack.on_drag_update(f64::NAN));
    assert_eq!(
        stack.on_drag_end(f64::INFINITY, f64::NAN),
        Some(Decision::Cancel)
    );
    stack.verify_invariants();
    assert_eq!(ids(&stack), ["a"]);
    assert_eq!(stack.front_offset(), 0.);
}

#[test]
fn dismissing_last_card_empties_deck() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a"]);
    let log = index_log(&mut stack);

    assert_eq!(stack.live_region_text(|title| title.clone()), "Card 1 of 1: Card A");

    swipe(&mut stack, 200.);
    // The last card is still drawn while it leaves, but there is no front card anymore.
    assert_eq!(stack.front_card(), None);
    assert_eq!(stack.live_region_text(|title| title.clone()), EMPTY_ANNOUNCEMENT);
    assert_eq!(stack.render_elements().len(), 1);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    stack.verify_invariants();
    assert!(stack.is_empty());
    assert!(stack.render_elements().is_empty());
    assert_eq!(stack.live_region_text(|title| title.clone()), "No more cards");
    assert_eq!(*log.borrow(), [0]);

    assert!(!stack.on_drag_begin(&CardId::from("a")));
    assert_eq!(stack.on_drag_end(200., 0.), None);
    assert!(!stack.remove_card(&CardId::from("a")));
}

#[test]
fn live_region_follows_front_card() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c"]);
    assert_eq!(stack.live_region_text(|title| title.clone()), "Card 1 of 3: Card A");

    swipe(&mut stack, 150.);
    assert_eq!(stack.live_region_text(|title| title.clone()), "Card 1 of 2: Card B");
}

#[test]
fn duplicate_ids_are_rejected() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "a"]);
    assert_eq!(ids(&stack), ["a", "b"]);

    assert!(!stack.push_card(Card::new("b", String::from("Again"))));
    assert!(stack.push_card(Card::new("c", String::from("Card C"))));
    assert_eq!(ids(&stack), ["a", "b", "c"]);
    stack.verify_invariants();
}

#[test]
fn options_from_config() {
    let config = policyangel_config::Config::parse(
        "test.kdl",
        r#"
        animations {
            card-exit {
                duration-ms 400
            }
        }

        card-stack "stacked-carousel" {
            visible-depth 2
            distance-threshold 80
            velocity-threshold 600
        }

        card-stack "action-cards" {
            exit-duration-ms 150
        }
        "#,
    )
    .unwrap();

    let carousel = Options::from_config(&config, policyangel_config::STACKED_CAROUSEL);
    assert_eq!(carousel.visible_depth, 2);
    assert_eq!(carousel.thresholds.distance, 80.);
    assert_eq!(carousel.thresholds.velocity, Some(600.));
    assert_eq!(carousel.exit_anim.duration_ms, 400);

    let actions = Options::from_config(&config, policyangel_config::ACTION_CARDS);
    assert_eq!(actions.visible_depth, 3);
    assert_eq!(actions.exit_anim.duration_ms, 150);
    assert_eq!(actions.thresholds.velocity, None);
}

#[test]
fn render_idle_deck() {
    let clock = Clock::with_time(Duration::ZERO);
    let stack = deck(&clock, Options::default(), &["a", "b", "c", "d"]);
    assert_snapshot!(format_render(&stack), @r"
    a: opacity 1.00 scale 1.00 offset    0 z 4 x    0 interactive
    b: opacity 0.80 scale 0.98 offset  -40 z 3 x    0
    c: opacity 0.60 scale 0.96 offset  -80 z 2 x    0
    d: opacity 0.00 scale 0.80 offset -120 z 1 x    0
    ");
}

#[test]
fn render_during_removal() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b", "c", "d"]);
    swipe(&mut stack, 150.);

    // The exiting card keeps its slot, so only two resting cards are drawn.
    assert_snapshot!(format_render(&stack), @r"
    a: opacity 1.00 scale 1.00 offset    0 z 4 x  150 exiting
    b: opacity 1.00 scale 1.00 offset    0 z 3 x    0 interactive
    c: opacity 0.80 scale 0.98 offset  -40 z 2 x    0
    d: opacity 0.00 scale 0.80 offset -120 z 1 x    0
    ");

    clock.set_unadjusted(ms(150));
    let elements = stack.render_elements();
    let exiting = &elements[0];
    assert!(exiting.exiting);
    // Ease-out cubic is at 87.5% halfway through.
    assert_abs_diff_eq!(exiting.offset_x, 150. + 0.875 * 350., epsilon = 1e-6);

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    assert_snapshot!(format_render(&stack), @r"
    b: opacity 1.00 scale 1.00 offset    0 z 3 x    0 interactive
    c: opacity 0.80 scale 0.98 offset  -40 z 2 x    0
    d: opacity 0.60 scale 0.96 offset  -80 z 1 x    0
    ");
}

#[test]
fn render_while_dragging() {
    let clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default().with_visible_depth(2), &["a", "b", "c"]);
    stack.on_drag_begin(&CardId::from("a"));
    stack.on_drag_update(-64.);

    assert_snapshot!(format_render(&stack), @r"
    a: opacity 1.00 scale 1.00 offset    0 z 3 x  -64 interactive
    b: opacity 0.80 scale 0.98 offset  -40 z 2 x    0
    c: opacity 0.00 scale 0.80 offset  -80 z 1 x    0
    ");
}

#[test]
fn render_single_card_depth_during_removal() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default().with_visible_depth(1), &["a", "b", "c"]);
    swipe(&mut stack, 150.);
    stack.verify_invariants();

    // The only slot belongs to the exiting card, so nothing can be dragged until it is gone.
    assert_eq!(front_id(&stack), Some("b"));
    assert!(!stack.on_drag_begin(&CardId::from("b")));
    assert_snapshot!(format_render(&stack), @r"
    a: opacity 1.00 scale 1.00 offset    0 z 3 x  150 exiting
    b: opacity 0.00 scale 0.80 offset  -40 z 2 x    0
    c: opacity 0.00 scale 0.80 offset  -40 z 1 x    0
    ");

    clock.set_unadjusted(ms(300));
    stack.advance_animations();
    stack.verify_invariants();
    assert_snapshot!(format_render(&stack), @r"
    b: opacity 1.00 scale 1.00 offset    0 z 2 x    0 interactive
    c: opacity 0.00 scale 0.80 offset  -40 z 1 x    0
    ");
    assert!(stack.on_drag_begin(&CardId::from("b")));
}

#[test]
fn remove_card_during_snap_back_continues_from_offset() {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = deck(&clock, Options::default(), &["a", "b"]);

    assert_eq!(swipe(&mut stack, 50.), Some(Decision::Cancel));
    clock.set_unadjusted(ms(100));
    let settling = stack.front_offset();
    // Ease-out quad is at 75% halfway through.
    assert_abs_diff_eq!(settling, 12.5, epsilon = 1e-9);

    assert!(stack.remove_card(&CardId::from("a")));
    stack.verify_invariants();
    assert_abs_diff_eq!(stack.removal().unwrap().offset_x(), settling, epsilon = 1e-9);
    assert_eq!(stack.front_offset(), 0.);
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Op {
    AddCard(#[proptest(strategy = "0..8usize")] usize),
    DragBeginFront,
    DragBegin(#[proptest(strategy = "0..8usize")] usize),
    DragUpdate(#[proptest(strategy = "arbitrary_displacement()")] f64),
    DragEnd {
        #[proptest(strategy = "arbitrary_displacement()")]
        displacement: f64,
        #[proptest(strategy = "-3000f64..3000.")]
        velocity: f64,
    },
    RemoveCard(#[proptest(strategy = "0..8usize")] usize),
    AdvanceTime(#[proptest(strategy = "0..400u64")] u64),
    FireExitTimer,
    SetVelocityThreshold(#[proptest(strategy = "prop::option::of(100f64..2000.)")] Option<f64>),
}

fn arbitrary_displacement() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -300f64..300.,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

impl Op {
    fn apply(self, stack: &mut CardStackController<usize>, clock: &mut Clock) {
        match self {
            Op::AddCard(id) => {
                stack.push_card(Card::new(format!("card{id}"), id));
            }
            Op::DragBeginFront => {
                if let Some(id) = stack.front_card().map(|card| card.id.clone()) {
                    stack.on_drag_begin(&id);
                }
            }
            Op::DragBegin(id) => {
                stack.on_drag_begin(&CardId::from(format!("card{id}")));
            }
            Op::DragUpdate(displacement) => {
                stack.on_drag_update(displacement);
            }
            Op::DragEnd {
                displacement,
                velocity,
            } => {
                stack.on_drag_end(displacement, velocity);
            }
            Op::RemoveCard(id) => {
                stack.remove_card(&CardId::from(format!("card{id}")));
            }
            Op::AdvanceTime(msec) => {
                let now = clock.now_unadjusted();
                clock.set_unadjusted(now + ms(msec));
                stack.advance_animations();
            }
            Op::FireExitTimer => {
                if let Some((id, _)) = stack.exit_timer() {
                    stack.on_exit_timer(id);
                }
            }
            Op::SetVelocityThreshold(velocity) => {
                let options = stack.options().clone().with_velocity_threshold(velocity);
                stack.update_options(options);
            }
        }
    }
}

#[track_caller]
fn check_ops_with_options(options: Options, ops: impl IntoIterator<Item = Op>) {
    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = CardStackController::new(clock.clone(), options);
    for id in 0..4 {
        stack.push_card(Card::new(format!("card{id}"), id));
    }
    stack.verify_invariants();

    for op in ops {
        op.apply(&mut stack, &mut clock);
        stack.verify_invariants();
    }
}

#[track_caller]
fn check_ops(ops: impl IntoIterator<Item = Op>) {
    check_ops_with_options(Options::default(), ops);
}

#[test]
fn operations_dont_panic() {
    let every_op = [
        Op::AddCard(0),
        Op::AddCard(5),
        Op::DragBeginFront,
        Op::DragBegin(1),
        Op::DragUpdate(50.),
        Op::DragUpdate(-150.),
        Op::DragUpdate(f64::NAN),
        Op::DragEnd {
            displacement: 150.,
            velocity: 0.,
        },
        Op::DragEnd {
            displacement: 30.,
            velocity: 0.,
        },
        Op::RemoveCard(0),
        Op::RemoveCard(2),
        Op::AdvanceTime(100),
        Op::AdvanceTime(300),
        Op::FireExitTimer,
    ];

    for first in every_op {
        for second in every_op {
            for third in every_op {
                check_ops([first, second, third]);
            }
        }
    }
}

#[test]
fn dismiss_everything() {
    let ops = (0..4).flat_map(|_| {
        [
            Op::DragBeginFront,
            Op::DragUpdate(-200.),
            Op::DragEnd {
                displacement: -200.,
                velocity: 0.,
            },
            Op::FireExitTimer,
        ]
    });

    let mut clock = Clock::with_time(Duration::ZERO);
    let mut stack = CardStackController::new(clock.clone(), Options::default());
    for id in 0..4 {
        stack.push_card(Card::new(format!("card{id}"), id));
    }
    for op in ops {
        op.apply(&mut stack, &mut clock);
        stack.verify_invariants();
    }
    assert!(stack.is_empty());
}

proptest! {
    #[test]
    fn random_operations_dont_panic(
        ops: Vec<Op>,
        visible_depth in 1..=5u8,
        exit_duration_ms in prop_oneof![Just(0u32), 1..600u32],
    ) {
        let options = Options::default()
            .with_visible_depth(visible_depth)
            .with_exit_duration_ms(exit_duration_ms);
        check_ops_with_options(options, ops);
    }
}
