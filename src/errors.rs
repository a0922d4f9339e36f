use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Errors raised by the question generators, the session assembler and
/// the question sources.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuizError {
    #[error("Grade {0} is outside the supported range 1-12")]
    GradeOutOfRange(i64),

    #[error("Question count must be at least 1, got {0}")]
    InvalidCount(usize),

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("No grammar templates configured for grade band {0}")]
    NoTemplatesForGrade(String),

    #[error("Operation {operation} is not available for grade {grade}")]
    UnsupportedOperation { operation: String, grade: u8 },

    #[error("Malformed question: {0}")]
    MalformedQuestion(#[from] QuestionDefect),

    #[error("Question source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Attempt budget of {0} exhausted")]
    BudgetExhausted(usize),

    #[error("Practice session is already finished")]
    SessionFinished,

    #[error("No hints left in this practice session")]
    NoHintsLeft,
}

/// Reasons a question fails structural validation, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionDefect {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("correct answer is empty")]
    EmptyCorrectAnswer,

    #[error("no incorrect answers")]
    NoIncorrectAnswers,

    #[error("incorrect answer {0:?} is blank")]
    BlankIncorrectAnswer(usize),

    #[error("incorrect answers contain the correct answer")]
    CorrectAnswerAmongIncorrect,

    #[error("incorrect answer {0:?} appears more than once")]
    DuplicateIncorrectAnswer(String),

    #[error("hint is empty")]
    EmptyHint,

    #[error("grade {0} is outside 1-12")]
    GradeOutOfRange(u8),
}

/// Shape problems found while converting an externally stored record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("incorrect answers could not be decoded: {0}")]
    UndecodableAnswers(String),

    #[error("grade {0} is outside 1-12")]
    GradeOutOfRange(i64),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("record is for {found}, expected {expected}")]
    SubjectMismatch { expected: String, found: String },

    #[error("record failed validation: {0}")]
    Invalid(#[from] QuestionDefect),
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Question source error: {0}")]
    SourceError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::GradeOutOfRange(_)
            | QuizError::InvalidCount(_)
            | QuizError::UnknownSubject(_)
            | QuizError::UnsupportedOperation { .. }
            | QuizError::SessionFinished
            | QuizError::NoHintsLeft => ApiError::ValidationError(err.to_string()),
            QuizError::SourceUnavailable(_) => ApiError::SourceError(err.to_string()),
            QuizError::NoTemplatesForGrade(_)
            | QuizError::MalformedQuestion(_)
            | QuizError::BudgetExhausted(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub subject: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            subject: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    subject = ?context.subject,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(format!("{} not found", context.resource_type))),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    subject = ?context.subject,
                    error = %self,
                    "Validation error"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::SourceError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    subject = ?context.subject,
                    error = %self,
                    "Question source error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        "Question service temporarily unavailable. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    subject = ?context.subject,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }

    /// Simple conversion without context
    pub fn to_response(self) -> (StatusCode, Json<ApiResponse<()>>) {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}
