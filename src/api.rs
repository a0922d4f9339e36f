use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::BATCH_SIZE_LIMIT,
    errors::{ApiError, ErrorContext, QuizError},
    grade::Grade,
    models::{PresentedQuestion, QuestionBatch, Subject},
    random::RngSource,
    session_assembler::{generate_question, present, SessionAssembler},
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Clone)]
pub struct AppState {
    pub assembler: SessionAssembler,
    pub default_batch_size: usize,
    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(assembler: SessionAssembler) -> Self {
        Self {
            assembler,
            default_batch_size: 10,
            max_batch_size: BATCH_SIZE_LIMIT,
        }
    }

    pub fn with_batch_sizes(mut self, default_batch_size: usize, max_batch_size: usize) -> Self {
        self.default_batch_size = default_batch_size;
        self.max_batch_size = max_batch_size;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchParams {
    pub count: Option<i64>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub question_source: &'static str,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    log_api_start!("health");
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        question_source: state.assembler.source_name(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

fn parse_subject(
    operation: &str,
    raw: &str,
) -> Result<Subject, (StatusCode, Json<ApiResponse<()>>)> {
    raw.parse::<Subject>().map_err(|e| {
        log_api_warn!(operation, format!("unknown subject '{}'", raw));
        ApiError::from(e).to_response_with_context(ErrorContext::new(operation, "subject"))
    })
}

pub async fn get_question_batch(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(params): Query<BatchParams>,
) -> ApiResult<QuestionBatch> {
    let subject = parse_subject("get_question_batch", &subject)?;
    log_api_start!("get_question_batch", subject = subject);

    let requested = params.count.unwrap_or(state.default_batch_size as i64);
    let count = match usize::try_from(requested) {
        Ok(count) if (1..=state.max_batch_size).contains(&count) => count,
        _ => {
            let error = ApiError::ValidationError(format!(
                "count must be between 1 and {}, got {}",
                state.max_batch_size, requested
            ));
            let context = ErrorContext::new("get_question_batch", "question batch")
                .with_subject(subject.as_str());
            return Err(error.to_response_with_context(context));
        }
    };

    let mut rng = RngSource::from_entropy();
    match state.assembler.build_batch(subject, count, &mut rng).await {
        Ok(batch) => {
            log_api_success!(
                "get_question_batch",
                subject = subject,
                count = batch.len(),
                format!(
                    "{} external, {} generated, {} fallback",
                    batch.stats.external, batch.stats.generated, batch.stats.fallback
                )
            );
            Ok(Json(ApiResponse::success(batch)))
        }
        Err(e) => {
            log_api_error!(
                "get_question_batch",
                subject = subject,
                error = e,
                "batch assembly failed"
            );
            let context = ErrorContext::new("get_question_batch", "question batch")
                .with_subject(subject.as_str());
            Err(ApiError::from(e).to_response_with_context(context))
        }
    }
}

pub async fn get_question_for_grade(
    Path((subject, grade)): Path<(String, i64)>,
) -> ApiResult<PresentedQuestion> {
    let subject = parse_subject("get_question_for_grade", &subject)?;
    log_api_start!("get_question_for_grade", subject = subject);

    let context = || {
        ErrorContext::new("get_question_for_grade", "question").with_subject(subject.as_str())
    };
    let grade =
        Grade::new(grade).map_err(|e| ApiError::from(e).to_response_with_context(context()))?;

    let mut rng = RngSource::from_entropy();
    let question = generate_question(subject, grade, &mut rng).map_err(|e: QuizError| {
        log_api_error!("get_question_for_grade", subject = subject, error = e, "generation failed");
        ApiError::from(e).to_response_with_context(context())
    })?;

    log_api_success!("get_question_for_grade", subject = subject, "question generated");
    Ok(Json(ApiResponse::success(present(question, &mut rng))))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/questions/:subject", get(get_question_batch))
        .route(
            "/api/questions/:subject/grade/:grade",
            get(get_question_for_grade),
        )
        .with_state(state)
}
