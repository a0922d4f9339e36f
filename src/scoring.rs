use serde::Serialize;

use crate::errors::QuizError;
use crate::models::{PresentedQuestion, QuestionBatch};

pub const HINTS_PER_SESSION: u32 = 3;
pub const HINT_COST: u32 = 50;
pub const POINTS_PER_STREAK_STEP: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub points: u32,
    pub correct_answer: String,
    pub streak: u32,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResults {
    pub score: u32,
    pub correct: u32,
    pub wrong: u32,
    pub total: usize,
    /// Share of answered questions that were right, 0-100.
    pub percentage: f64,
    pub best_streak: u32,
}

/// One learner working through one batch, front to back.
///
/// A correct answer is worth `(streak + 1) * 10` points and extends the
/// streak; a wrong answer resets it. Hints cost 50 points each (the score
/// never goes below zero) and there are three per session. Asking again
/// for the hint of a question already hinted is free.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    batch: QuestionBatch,
    position: usize,
    score: u32,
    streak: u32,
    best_streak: u32,
    correct: u32,
    wrong: u32,
    hints_left: u32,
    hinted: Option<usize>,
}

impl PracticeSession {
    pub fn new(batch: QuestionBatch) -> Self {
        Self {
            batch,
            position: 0,
            score: 0,
            streak: 0,
            best_streak: 0,
            correct: 0,
            wrong: 0,
            hints_left: HINTS_PER_SESSION,
            hinted: None,
        }
    }

    pub fn current(&self) -> Option<&PresentedQuestion> {
        self.batch.items.get(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.batch.items.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn hints_left(&self) -> u32 {
        self.hints_left
    }

    /// Percentage of the batch already answered.
    pub fn progress(&self) -> f64 {
        if self.batch.items.is_empty() {
            return 100.0;
        }
        self.position as f64 / self.batch.items.len() as f64 * 100.0
    }

    pub fn answer(&mut self, answer: &str) -> Result<AnswerOutcome, QuizError> {
        let question = &self.current().ok_or(QuizError::SessionFinished)?.question;
        let correct = question.is_correct(answer.trim());
        let correct_answer = question.correct_answer.clone();

        let points = if correct {
            let points = (self.streak + 1) * POINTS_PER_STREAK_STEP;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
            self.correct += 1;
            self.score += points;
            points
        } else {
            self.streak = 0;
            self.wrong += 1;
            0
        };

        self.position += 1;
        Ok(AnswerOutcome {
            correct,
            points,
            correct_answer,
            streak: self.streak,
            finished: self.is_finished(),
        })
    }

    /// Reveals the current question's hint.
    pub fn use_hint(&mut self) -> Result<&str, QuizError> {
        if self.is_finished() {
            return Err(QuizError::SessionFinished);
        }
        if self.hinted != Some(self.position) {
            if self.hints_left == 0 {
                return Err(QuizError::NoHintsLeft);
            }
            self.hints_left -= 1;
            self.score = self.score.saturating_sub(HINT_COST);
            self.hinted = Some(self.position);
        }
        self.current()
            .map(|item| item.question.hint.as_str())
            .ok_or(QuizError::SessionFinished)
    }

    pub fn results(&self) -> SessionResults {
        let answered = self.correct + self.wrong;
        let percentage = if answered == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(answered) * 100.0
        };
        SessionResults {
            score: self.score,
            correct: self.correct,
            wrong: self.wrong,
            total: self.batch.items.len(),
            percentage,
            best_streak: self.best_streak,
        }
    }
}
