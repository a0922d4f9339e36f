use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::budget::fill_with_budget;
use crate::errors::{ParseError, QuizError};
use crate::grade::Grade;
use crate::models::{BatchStats, PresentedQuestion, Question, QuestionBatch, Subject};
use crate::question_source::QuestionSource;
use crate::random::RandomSource;
use crate::{english_generator, math_generator, validator};
use crate::{
    log_generation, log_performance, log_service_start, log_service_success, log_service_warn,
    log_source_operation,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Generator attempts allowed per missing question.
pub const ATTEMPTS_PER_MISSING: usize = 2;

/// One generated question for `subject` at `grade`.
pub fn generate_question<R: RandomSource>(
    subject: Subject,
    grade: Grade,
    rng: &mut R,
) -> Result<Question, QuizError> {
    match subject {
        Subject::Math => math_generator::generate(grade, rng),
        Subject::English => english_generator::generate(grade, rng),
    }
}

pub fn fallback_question(subject: Subject) -> Question {
    match subject {
        Subject::Math => math_generator::fallback_question(),
        Subject::English => english_generator::fallback_question(),
    }
}

/// Pairs a question with a freshly shuffled answer order.
pub fn present<R: RandomSource>(question: Question, rng: &mut R) -> PresentedQuestion {
    let mut answers = question.all_answers();
    rng.shuffle(&mut answers);
    PresentedQuestion { question, answers }
}

/// Builds practice batches: stored questions first, generated ones for
/// whatever is missing.
#[derive(Clone)]
pub struct SessionAssembler {
    source: Arc<dyn QuestionSource>,
    fetch_timeout: Duration,
}

impl SessionAssembler {
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self {
            source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Exactly `count` validated questions for `subject`, answers shuffled.
    ///
    /// Source failures never fail the batch; they only mean more questions
    /// get generated. Generated questions never repeat a prompt already in
    /// the batch. When the attempt budget runs out the batch is padded with
    /// the subject's fallback question.
    pub async fn build_batch<R: RandomSource>(
        &self,
        subject: Subject,
        count: usize,
        rng: &mut R,
    ) -> Result<QuestionBatch, QuizError> {
        if count < 1 {
            return Err(QuizError::InvalidCount(count));
        }
        let start = Instant::now();
        log_service_start!("session_assembler", "build_batch", subject = subject, count = count);

        let mut stats = BatchStats::default();
        let mut questions = self.fetch_external(subject, count).await;
        questions.truncate(count);
        stats.external = questions.len();

        if questions.len() < count {
            let remaining = count - questions.len();
            let filled = fill_with_budget(
                questions,
                count,
                ATTEMPTS_PER_MISSING * remaining,
                |accepted: &[Question]| {
                    let grade = Grade::random(rng);
                    let candidate = match generate_question(subject, grade, rng) {
                        Ok(candidate) => candidate,
                        Err(e) => {
                            log_generation!(rejected, subject = subject, grade = grade, reason = e);
                            return None;
                        }
                    };
                    if let Err(defect) = validator::check(&candidate) {
                        log_generation!(
                            rejected,
                            subject = subject,
                            grade = grade,
                            reason = defect
                        );
                        return None;
                    }
                    if accepted.iter().any(|q| q.prompt == candidate.prompt) {
                        log_generation!(
                            rejected,
                            subject = subject,
                            grade = grade,
                            reason = "duplicate prompt"
                        );
                        return None;
                    }
                    Some(candidate)
                },
            );

            stats.attempts = filled.attempts;
            let shortfall = filled.shortfall(count);
            questions = filled.accepted;
            stats.generated = questions.len() - stats.external;

            if shortfall > 0 {
                log_generation!(
                    exhausted,
                    subject = subject,
                    attempts = stats.attempts,
                    shortfall = shortfall
                );
                questions.extend(std::iter::repeat_n(fallback_question(subject), shortfall));
                stats.fallback = shortfall;
            }
        }

        let items = questions
            .into_iter()
            .map(|question| present(question, rng))
            .collect::<Vec<_>>();

        log_service_success!(
            "session_assembler",
            "build_batch",
            subject = subject,
            count = items.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(QuestionBatch {
            subject,
            items,
            stats,
        })
    }

    /// Parsed, validated, prompt-unique questions from the source. Empty on
    /// any source failure or timeout.
    async fn fetch_external(&self, subject: Subject, count: usize) -> Vec<Question> {
        let source = self.source.name();
        let start = Instant::now();
        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.source.fetch_questions(subject, count),
        )
        .await;

        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                log_service_warn!(
                    "session_assembler",
                    "fetch_external",
                    format!("{} source failed, generating locally: {}", source, e)
                );
                return Vec::new();
            }
            Err(_) => {
                log_service_warn!(
                    "session_assembler",
                    "fetch_external",
                    format!(
                        "{} source timed out after {:?}, generating locally",
                        source, self.fetch_timeout
                    )
                );
                return Vec::new();
            }
        };

        log_performance!(
            "fetch_external",
            duration_ms = start.elapsed().as_millis() as u64,
            count = records.len()
        );

        let mut questions: Vec<Question> = Vec::with_capacity(records.len());
        for raw in records {
            let parsed = Question::try_from(raw.or_subject(subject)).and_then(|question| {
                if question.subject != subject {
                    Err(ParseError::SubjectMismatch {
                        expected: subject.to_string(),
                        found: question.subject.to_string(),
                    })
                } else {
                    Ok(question)
                }
            });
            match parsed {
                Ok(question) if questions.iter().any(|q| q.prompt == question.prompt) => {
                    log_source_operation!(
                        dropped,
                        source,
                        subject = subject,
                        error = "duplicate prompt"
                    );
                }
                Ok(question) => questions.push(question),
                Err(e) => {
                    log_source_operation!(dropped, source, subject = subject, error = e);
                }
            }
        }
        questions
    }
}
