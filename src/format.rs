use crate::budget::fill_with_budget;
use crate::random::RandomSource;

/// Draws spent on random distractors before the deterministic fill.
pub const DISTRACTOR_ATTEMPTS: usize = 20;
pub const DEFAULT_SPREAD: i64 = 5;
pub const DEFAULT_DISTRACTOR_COUNT: usize = 3;

/// From 2^52 on every `f64` is a whole number.
const WHOLE_NUMBERS_FROM: f64 = 4_503_599_627_370_496.0;

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Integers render without a decimal point, everything else with exactly
/// two decimals.
pub fn format_number(value: f64) -> String {
    let rounded = if value.abs() >= WHOLE_NUMBERS_FROM {
        value
    } else {
        round_to_cents(value)
    };
    // adding 0.0 turns -0.0 into 0.0
    let rounded = rounded + 0.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.2}", rounded)
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// `count` distinct positive numbers near `correct`, none rendering the
/// same as `correct` itself.
///
/// Offsets in `1..=spread` are drawn up to [`DISTRACTOR_ATTEMPTS`] times;
/// any slots still empty are filled with `correct + k` for increasing `k`
/// (counting from zero when `correct` is not positive). Where adding 1 no
/// longer changes `correct`, the fill steps to the neighbouring
/// representable values instead, downwards once upwards overflows.
pub fn plausible_distractors<R: RandomSource>(
    correct: f64,
    count: usize,
    spread: i64,
    rng: &mut R,
) -> Vec<String> {
    let correct = if correct.is_finite() { correct } else { 0.0 };
    let correct_text = format_number(correct);
    let spread = spread.max(1);

    let drawn = fill_with_budget(
        Vec::with_capacity(count),
        count,
        DISTRACTOR_ATTEMPTS,
        |accepted: &[String]| {
            let offset = rng.int_in(1, spread) as f64;
            let wrong = if rng.chance(0.5) {
                correct + offset
            } else {
                correct - offset
            };
            let text = format_number(wrong);
            (round_to_cents(wrong) > 0.0 && text != correct_text && !accepted.contains(&text))
                .then_some(text)
        },
    );

    let mut answers = drawn.accepted;
    let base = correct.max(0.0);
    let mut above = base;
    let mut below = base;
    while answers.len() < count {
        let next = step_up(above);
        let candidate = if next.is_finite() {
            above = next;
            next
        } else {
            below = step_down(below);
            below
        };
        let text = format_number(candidate);
        if candidate > 0.0 && text != correct_text && !answers.contains(&text) {
            answers.push(text);
        }
    }
    answers
}

/// `value + 1`, or the next representable value when that rounds back to
/// `value`. Expects a finite, non-negative `value`.
fn step_up(value: f64) -> f64 {
    let next = value + 1.0;
    if next > value {
        next
    } else {
        f64::from_bits(value.to_bits() + 1)
    }
}

/// Mirror of [`step_up`] for finite, positive values.
fn step_down(value: f64) -> f64 {
    let next = value - 1.0;
    if next < value {
        next
    } else {
        f64::from_bits(value.to_bits() - 1)
    }
}
