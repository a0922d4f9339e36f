use crate::errors::QuestionDefect;
use crate::grade::{MAX_GRADE, MIN_GRADE};
use crate::models::Question;

/// Structural soundness check. Reports the first defect found, checking
/// prompt, correct answer, incorrect answers, hint and grade in that order.
pub fn check(question: &Question) -> Result<(), QuestionDefect> {
    if question.prompt.trim().is_empty() {
        return Err(QuestionDefect::EmptyPrompt);
    }
    if question.correct_answer.trim().is_empty() {
        return Err(QuestionDefect::EmptyCorrectAnswer);
    }
    if question.incorrect_answers.is_empty() {
        return Err(QuestionDefect::NoIncorrectAnswers);
    }
    for (index, answer) in question.incorrect_answers.iter().enumerate() {
        if answer.trim().is_empty() {
            return Err(QuestionDefect::BlankIncorrectAnswer(index));
        }
        if answer == &question.correct_answer {
            return Err(QuestionDefect::CorrectAnswerAmongIncorrect);
        }
        if question.incorrect_answers[..index].contains(answer) {
            return Err(QuestionDefect::DuplicateIncorrectAnswer(answer.clone()));
        }
    }
    if question.hint.trim().is_empty() {
        return Err(QuestionDefect::EmptyHint);
    }
    let grade = question.grade.get();
    if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(QuestionDefect::GradeOutOfRange(grade));
    }
    Ok(())
}

pub fn validate(question: &Question) -> bool {
    check(question).is_ok()
}
