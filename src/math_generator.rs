use tracing::debug;

use crate::budget::redraw;
use crate::errors::QuizError;
use crate::format::{
    DEFAULT_DISTRACTOR_COUNT, DEFAULT_SPREAD, format_number, plausible_distractors,
    round_to_cents,
};
use crate::grade::{Grade, GradeBand, GradeConfig, Operation};
use crate::log_generation;
use crate::models::{Difficulty, Question, Subject};
use crate::random::RandomSource;

/// Operand draws per question before giving up on an operation.
pub const OPERAND_REDRAWS: usize = 25;
/// Share of batch items rendered as word problems.
pub const WORD_PROBLEM_SHARE: f64 = 0.3;

const MULTIPLIER_CAP: i64 = 12;
const POWER_BASE_CAP: i64 = 12;
const ROOT_CAP: i64 = 12;

/// Known-good question used when generation cannot finish.
pub fn fallback_question() -> Question {
    Question {
        prompt: "What is 5 + 3?".to_string(),
        correct_answer: "8".to_string(),
        incorrect_answers: vec!["6".to_string(), "7".to_string(), "9".to_string()],
        difficulty: Difficulty::Easy,
        grade: Grade::FIRST,
        hint: "Count up from 5: 6, 7, 8".to_string(),
        subject: Subject::Math,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Problem {
    prompt: String,
    answer: f64,
    hint: String,
}

/// Direct arithmetic question using an operation from the grade's set.
pub fn generate_basic<R: RandomSource>(grade: Grade, rng: &mut R) -> Result<Question, QuizError> {
    let config = grade.config();
    let operation = *rng
        .choose(config.operations)
        .ok_or_else(|| QuizError::NoTemplatesForGrade(grade.band().to_string()))?;
    generate_basic_with(grade, operation, rng)
}

/// Direct arithmetic question for a fixed operation.
pub fn generate_basic_with<R: RandomSource>(
    grade: Grade,
    operation: Operation,
    rng: &mut R,
) -> Result<Question, QuizError> {
    let config = grade.config();
    if !config.supports(operation) {
        return Err(QuizError::UnsupportedOperation {
            operation: operation.to_string(),
            grade: grade.get(),
        });
    }

    let ceiling = config.magnitude_ceiling();
    let problem = redraw(OPERAND_REDRAWS, || {
        let problem = draw_basic(operation, config, rng);
        within_ceiling(problem.answer, ceiling).then_some(problem)
    })
    .ok_or(QuizError::BudgetExhausted(OPERAND_REDRAWS))?;

    Ok(into_question(grade, problem, rng))
}

fn within_ceiling(answer: f64, ceiling: f64) -> bool {
    answer.is_finite() && answer.abs() <= ceiling
}

fn into_question<R: RandomSource>(grade: Grade, problem: Problem, rng: &mut R) -> Question {
    let answer = round_to_cents(problem.answer);
    Question {
        prompt: problem.prompt,
        correct_answer: format_number(answer),
        incorrect_answers: plausible_distractors(
            answer,
            DEFAULT_DISTRACTOR_COUNT,
            DEFAULT_SPREAD,
            rng,
        ),
        difficulty: grade.difficulty(),
        grade,
        hint: problem.hint,
        subject: Subject::Math,
    }
}

/// Two operands in `1..=max_number`, optionally turned into two-decimal
/// fractions and negated when the band allows it.
fn draw_pair<R: RandomSource>(config: &GradeConfig, rng: &mut R) -> (f64, f64) {
    let mut a = rng.int_in(1, config.max_number) as f64;
    let mut b = rng.int_in(1, config.max_number) as f64;

    if config.allow_decimals && rng.chance(0.3) {
        a = round_to_cents(a / rng.int_in(1, 9) as f64);
        b = round_to_cents(b / rng.int_in(1, 9) as f64);
    }

    if config.allow_negatives && rng.chance(0.3) {
        if rng.chance(0.5) {
            a = -a;
        }
        if rng.chance(0.5) {
            b = -b;
        }
    }

    (a, b)
}

fn operand(value: f64) -> String {
    if value < 0.0 {
        format!("({})", format_number(value))
    } else {
        format_number(value)
    }
}

fn draw_basic<R: RandomSource>(operation: Operation, config: &GradeConfig, rng: &mut R) -> Problem {
    match operation {
        Operation::Add => {
            let (a, b) = draw_pair(config, rng);
            Problem {
                prompt: format!("{} + {} = ?", format_number(a), operand(b)),
                answer: a + b,
                hint: "Add the numbers together".to_string(),
            }
        }
        Operation::Subtract => {
            let (a, b) = draw_pair(config, rng);
            Problem {
                prompt: format!("{} - {} = ?", format_number(a), operand(b)),
                answer: a - b,
                hint: "Subtract the second number from the first".to_string(),
            }
        }
        Operation::Multiply => {
            let (a, _) = draw_pair(config, rng);
            // second factor stays times-table sized
            let mut b = rng.int_in(2, config.max_number.min(MULTIPLIER_CAP)) as f64;
            if config.allow_negatives && rng.chance(0.3) {
                b = -b;
            }
            Problem {
                prompt: format!("{} × {} = ?", format_number(a), operand(b)),
                answer: a * b,
                hint: "Multiply the numbers together".to_string(),
            }
        }
        Operation::Divide => {
            // built backwards from the quotient so the division is exact
            let (_, b) = draw_pair(config, rng);
            let divisor = b.abs().max(1.0);
            let quotient = rng.int_in(1, 10) as f64;
            let dividend = round_to_cents(divisor * quotient);
            Problem {
                prompt: format!(
                    "{} ÷ {} = ?",
                    format_number(dividend),
                    format_number(divisor)
                ),
                answer: quotient,
                hint: "Divide the first number by the second".to_string(),
            }
        }
        Operation::Power => {
            let mut base = rng.int_in(1, config.max_number.min(POWER_BASE_CAP)) as f64;
            if config.allow_negatives && rng.chance(0.3) {
                base = -base;
            }
            let exponent = rng.int_in(2, 4) as i32;
            Problem {
                prompt: format!("{}^{} = ?", operand(base), exponent),
                answer: base.powi(exponent),
                hint: format!(
                    "Multiply {} by itself {} times",
                    format_number(base),
                    exponent
                ),
            }
        }
        Operation::Root => {
            let degree: i32 = if rng.chance(0.5) { 2 } else { 3 };
            let root = rng.int_in(2, ROOT_CAP) as f64;
            let radicand = root.powi(degree);
            let name = if degree == 2 { "square" } else { "cube" };
            Problem {
                prompt: format!("Find the {} root of {}", name, format_number(radicand)),
                answer: root,
                hint: format!(
                    "Find the number that, multiplied by itself {} times, equals {}",
                    degree,
                    format_number(radicand)
                ),
            }
        }
        Operation::Log => {
            let exponent = rng.int_in(1, 3) as i32;
            let value = 10f64.powi(exponent);
            Problem {
                prompt: format!("log₁₀({}) = ?", format_number(value)),
                answer: exponent as f64,
                hint: "Find the power of 10 that equals this number".to_string(),
            }
        }
    }
}

/// Arithmetic carried by a word-problem narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Doubling,
    SquareRoot,
    CubeRoot,
    Log,
    PercentGrowth,
}

/// A narrative with `{a}` and `{b}` placeholders for the operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordTemplate {
    pub operation: WordOperation,
    pub text: &'static str,
    pub hint: &'static str,
}

impl WordTemplate {
    fn render(&self, pattern: &str, a: f64, b: f64) -> String {
        pattern
            .replace("{a}", &format_number(a))
            .replace("{b}", &format_number(b))
    }
}

static ELEMENTARY_1_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::Add,
        text: "You have {a} marbles and find {b} more. How many marbles do you have now?",
        hint: "Add the new marbles to what you had",
    },
    WordTemplate {
        operation: WordOperation::Subtract,
        text: "If you have {a} stickers and give {b} to your friend, how many stickers do you have left?",
        hint: "Subtract the stickers you gave away",
    },
];

static ELEMENTARY_2_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::Multiply,
        text: "A bakery makes {a} rows of cookies with {b} cookies in each row. How many cookies are there in total?",
        hint: "Multiply rows by cookies per row",
    },
    WordTemplate {
        operation: WordOperation::Divide,
        text: "You need to put {a} candies into {b} party bags equally. How many candies go in each bag?",
        hint: "Divide total candies by number of bags",
    },
];

static INTERMEDIATE_1_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::Multiply,
        text: "A recipe needs {a} cups of flour. If you want to make {b} batches, how many cups of flour do you need?",
        hint: "Multiply the cups needed by number of batches",
    },
    WordTemplate {
        operation: WordOperation::Divide,
        text: "You have ${a} to share among {b} people. How much does each person get?",
        hint: "Divide the total money by number of people",
    },
];

static INTERMEDIATE_2_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::SquareRoot,
        text: "A square garden has an area of {a} square meters. What is the length of each side?",
        hint: "Find the square root of the area",
    },
    WordTemplate {
        operation: WordOperation::Doubling,
        text: "If a number doubles {b} times starting from {a}, what is the final number?",
        hint: "Multiply {a} by 2, {b} times",
    },
];

static ADVANCED_1_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::CubeRoot,
        text: "A cube has a volume of {a} cubic units. What is the length of each edge?",
        hint: "Find the cube root of the volume",
    },
    WordTemplate {
        operation: WordOperation::Doubling,
        text: "A population of {a} bacteria doubles every hour. How many bacteria will there be after {b} hours?",
        hint: "Multiply {a} by 2 raised to the power of {b}",
    },
];

static ADVANCED_2_WORDS: &[WordTemplate] = &[
    WordTemplate {
        operation: WordOperation::Log,
        text: "A quantity increases from 1 to {a} on a logarithmic scale. What is the log base 10 of the final quantity?",
        hint: "Find the power of 10 that equals this number",
    },
    WordTemplate {
        operation: WordOperation::PercentGrowth,
        text: "If an investment of ${a} grows at {b}% interest annually, what will it be worth after 1 year?",
        hint: "Multiply {a} by (1 + {b}/100)",
    },
];

pub fn word_templates(band: GradeBand) -> &'static [WordTemplate] {
    match band {
        GradeBand::Elementary1 => ELEMENTARY_1_WORDS,
        GradeBand::Elementary2 => ELEMENTARY_2_WORDS,
        GradeBand::Intermediate1 => INTERMEDIATE_1_WORDS,
        GradeBand::Intermediate2 => INTERMEDIATE_2_WORDS,
        GradeBand::Advanced1 => ADVANCED_1_WORDS,
        GradeBand::Advanced2 => ADVANCED_2_WORDS,
    }
}

/// Operands and answer for one word problem, adjusted per operation so
/// the result is clean.
fn draw_word_operands<R: RandomSource>(
    operation: WordOperation,
    config: &GradeConfig,
    rng: &mut R,
) -> (f64, f64, f64) {
    let max = config.max_number;
    match operation {
        WordOperation::Add => {
            let a = rng.int_in(1, max) as f64;
            let b = rng.int_in(1, max) as f64;
            (a, b, a + b)
        }
        WordOperation::Subtract => {
            let first = rng.int_in(1, max) as f64;
            let second = rng.int_in(1, max) as f64;
            let (a, b) = if second > first {
                (second, first)
            } else {
                (first, second)
            };
            (a, b, a - b)
        }
        WordOperation::Multiply => {
            let mut a = rng.int_in(1, max.min(20)) as f64;
            if config.allow_decimals && rng.chance(0.3) {
                a += 0.5;
            }
            let b = rng.int_in(1, max.min(12)) as f64;
            (a, b, a * b)
        }
        WordOperation::Divide => {
            let b = rng.int_in(1, 10) as f64;
            let quotient = rng.int_in(1, 10) as f64;
            (b * quotient, b, quotient)
        }
        WordOperation::Doubling => {
            let a = rng.int_in(1, max.min(100)) as f64;
            let b = rng.int_in(1, 4) as f64;
            (a, b, a * 2f64.powi(b as i32))
        }
        WordOperation::SquareRoot => {
            let side = (rng.int_in(1, max) as f64).sqrt().floor().max(1.0);
            (side * side, 0.0, side)
        }
        WordOperation::CubeRoot => {
            let edge = (rng.int_in(1, max) as f64).cbrt().floor().max(1.0);
            (edge.powi(3), 0.0, edge)
        }
        WordOperation::Log => {
            let exponent = rng.int_in(1, 3);
            (10f64.powi(exponent as i32), 0.0, exponent as f64)
        }
        WordOperation::PercentGrowth => {
            let a = rng.int_in(1, max) as f64;
            let rate = rng.int_in(1, 12) as f64;
            (a, rate, a * (1.0 + rate / 100.0))
        }
    }
}

/// Word problem drawn from the narratives of the grade's band.
pub fn generate_word_problem<R: RandomSource>(
    grade: Grade,
    rng: &mut R,
) -> Result<Question, QuizError> {
    let template = *rng
        .choose(word_templates(grade.band()))
        .ok_or_else(|| QuizError::NoTemplatesForGrade(grade.band().to_string()))?;
    generate_word_problem_with(grade, &template, rng)
}

pub fn generate_word_problem_with<R: RandomSource>(
    grade: Grade,
    template: &WordTemplate,
    rng: &mut R,
) -> Result<Question, QuizError> {
    let config = grade.config();
    let ceiling = config.magnitude_ceiling();
    let problem = redraw(OPERAND_REDRAWS, || {
        let (a, b, answer) = draw_word_operands(template.operation, config, rng);
        within_ceiling(answer, ceiling).then(|| Problem {
            prompt: template.render(template.text, a, b),
            answer,
            hint: template.render(template.hint, a, b),
        })
    })
    .ok_or(QuizError::BudgetExhausted(OPERAND_REDRAWS))?;

    Ok(into_question(grade, problem, rng))
}

/// One question for the grade: a word problem with probability
/// [`WORD_PROBLEM_SHARE`], otherwise a direct expression.
pub fn generate<R: RandomSource>(grade: Grade, rng: &mut R) -> Result<Question, QuizError> {
    if rng.chance(WORD_PROBLEM_SHARE) {
        generate_word_problem(grade, rng)
    } else {
        generate_basic(grade, rng)
    }
}

/// `count` questions, each at an independently drawn grade. Items that
/// cannot be generated are replaced by [`fallback_question`].
pub fn generate_batch<R: RandomSource>(count: usize, rng: &mut R) -> Vec<Question> {
    (0..count)
        .map(|_| {
            let grade = Grade::random(rng);
            generate(grade, rng).unwrap_or_else(|error| {
                log_generation!(fallback, subject = Subject::Math, error = error);
                fallback_question()
            })
        })
        .inspect(|question| {
            debug!(
                grade = %question.grade,
                prompt = %question.prompt,
                "Generated math question"
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, SequenceSource};
    use crate::validator;

    fn grade(value: i64) -> Grade {
        Grade::new(value).unwrap()
    }

    #[test]
    fn test_square_root_of_sixteen() {
        // first value picks "square", second gives root 2 + 2 % 11 = 4
        let mut rng = SequenceSource::new(vec![0, 2]);
        let question = generate_basic_with(grade(9), Operation::Root, &mut rng).unwrap();

        assert_eq!(question.prompt, "Find the square root of 16");
        assert_eq!(question.correct_answer, "4");
        assert_eq!(question.difficulty, Difficulty::Hard);
        assert!(validator::validate(&question));
    }

    #[test]
    fn test_log_question_is_exact() {
        let mut rng = SequenceSource::new(vec![1]);
        let question = generate_basic_with(grade(12), Operation::Log, &mut rng).unwrap();
        assert_eq!(question.prompt, "log₁₀(100) = ?");
        assert_eq!(question.correct_answer, "2");
    }

    #[test]
    fn test_operation_outside_band_is_rejected() {
        let mut rng = RngSource::seeded(1);
        let result = generate_basic_with(grade(1), Operation::Log, &mut rng);
        assert!(matches!(result, Err(QuizError::UnsupportedOperation { .. })));
    }

    #[test]
    fn test_division_is_exact() {
        let mut rng = RngSource::seeded(3);
        for _ in 0..200 {
            let question = generate_basic_with(grade(4), Operation::Divide, &mut rng).unwrap();
            let quotient: f64 = question.correct_answer.parse().unwrap();
            assert_eq!(quotient.fract(), 0.0);
            assert!((1.0..=10.0).contains(&quotient));
        }
    }

    #[test]
    fn test_answers_respect_magnitude_ceiling() {
        let mut rng = RngSource::seeded(5);
        for g in Grade::all() {
            let ceiling = g.config().magnitude_ceiling();
            for _ in 0..50 {
                if let Ok(question) = generate(g, &mut rng) {
                    let answer: f64 = question.correct_answer.parse().unwrap();
                    assert!(answer.abs() <= ceiling, "{} exceeds {}", answer, ceiling);
                }
            }
        }
    }

    #[test]
    fn test_generated_questions_are_valid() {
        let mut rng = RngSource::seeded(9);
        for question in generate_batch(300, &mut rng) {
            assert_eq!(question.subject, Subject::Math);
            assert!(
                validator::validate(&question),
                "invalid question: {:?}",
                question
            );
            assert_eq!(question.difficulty, question.grade.difficulty());
        }
    }

    #[test]
    fn test_word_problem_substitution() {
        let template = ADVANCED_2_WORDS[1];
        // a = 1 + 199 % 500 = 200, rate = 1 + 4 % 12 = 5
        let mut rng = SequenceSource::new(vec![199, 4]);
        let question = generate_word_problem_with(grade(11), &template, &mut rng).unwrap();
        assert_eq!(
            question.prompt,
            "If an investment of $200 grows at 5% interest annually, what will it be worth after 1 year?"
        );
        assert_eq!(question.correct_answer, "210");
        assert_eq!(question.hint, "Multiply 200 by (1 + 5/100)");
    }

    #[test]
    fn test_doubling_word_problem() {
        let template = INTERMEDIATE_2_WORDS[1];
        // a = 1 + 2 % 100 = 3, b = 1 + 2 % 4 = 3
        let mut rng = SequenceSource::new(vec![2]);
        let question = generate_word_problem_with(grade(7), &template, &mut rng).unwrap();
        assert_eq!(
            question.prompt,
            "If a number doubles 3 times starting from 3, what is the final number?"
        );
        assert_eq!(question.correct_answer, "24");
    }

    #[test]
    fn test_every_band_has_word_templates() {
        for g in Grade::all() {
            assert!(!word_templates(g.band()).is_empty());
        }
    }

    #[test]
    fn test_fallback_question_is_valid() {
        let question = fallback_question();
        assert!(validator::validate(&question));
        assert_eq!(question.correct_answer, "8");
    }
}
