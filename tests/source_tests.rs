use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use practice_arena::{
    Question, QuestionSource, QuizError, RestQuestionSource, RngSource, SessionAssembler,
    SqliteQuestionSource, Subject,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

async fn questions_table(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let authorized = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some("anon-key")
        && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer anon-key");
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let rows = vec![
        json!({
            "id": 1,
            "text": "What is 7 + 5?",
            "question": "What is 7 + 5?",
            "correctAnswer": "12",
            "correct_answer": "12",
            "options": ["12", "11", "13", "14"],
            "incorrect_answers": "[\"11\",\"13\",\"14\"]",
            "difficulty": "easy",
            "grade": 2,
            "hint": "Make ten first",
            "subject": "math"
        }),
        json!({
            "id": 2,
            "question": "Choose the correct verb: They _____ home.",
            "correct_answer": "walk",
            "incorrect_answers": "{walks,walking}",
            "grade": 2,
            "hint": "They takes the base form",
            "subject": "english"
        }),
    ];

    let subject = params
        .get("subject")
        .and_then(|filter| filter.strip_prefix("eq."))
        .unwrap_or_default()
        .to_string();
    let limit = params
        .get("limit")
        .and_then(|limit| limit.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let matching: Vec<Value> = rows
        .into_iter()
        .filter(|row| row["subject"] == subject.as_str())
        .take(limit)
        .collect();
    Ok(Json(Value::Array(matching)))
}

/// One sound row among rows with wrongly typed columns.
async fn mixed_table() -> Json<Value> {
    Json(json!([
        {
            "question": "What is 9 + 3?",
            "correct_answer": "12",
            "incorrect_answers": ["11", "13", "14"],
            "grade": 2,
            "hint": "Make ten first",
            "subject": "math"
        },
        {
            "question": "What is 8 + 3?",
            "correct_answer": "11",
            "incorrect_answers": ["10", "12"],
            "grade": "5",
            "hint": "Count on",
            "subject": "math"
        },
        {
            "question": "What is 4 + 4?",
            "correct_answer": 8,
            "incorrect_answers": ["7", "9"],
            "grade": 1,
            "hint": "Double 4",
            "subject": "math"
        },
        {
            "question": "What is 5 + 2?",
            "correct_answer": "7",
            "incorrect_answers": ["6", "8"],
            "grade": 1,
            "hint": { "text": "Count on" },
            "subject": "math"
        }
    ]))
}

async fn spawn_table_server() -> String {
    let app = Router::new()
        .route("/rest/v1/questions", get(questions_table))
        .route("/rest/v1/mixed", get(mixed_table))
        .route(
            "/rest/v1/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!([]))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_rest_source_filters_by_subject() {
    let base_url = spawn_table_server().await;
    let source =
        RestQuestionSource::new(&base_url, "anon-key", "questions", Duration::from_secs(5)).unwrap();

    let records = source.fetch_questions(Subject::Math, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    let question = Question::try_from(records[0].clone()).unwrap();
    assert_eq!(question.prompt, "What is 7 + 5?");
    assert_eq!(question.incorrect_answers, vec!["11", "13", "14"]);

    let records = source.fetch_questions(Subject::English, 10).await.unwrap();
    let question = Question::try_from(records[0].clone()).unwrap();
    assert_eq!(question.correct_answer, "walk");
    assert_eq!(question.incorrect_answers, vec!["walks", "walking"]);
}

#[tokio::test]
async fn test_rest_source_keeps_sound_rows_among_mistyped_ones() {
    let base_url = spawn_table_server().await;
    let source =
        RestQuestionSource::new(&base_url, "anon-key", "mixed", Duration::from_secs(5)).unwrap();

    let records = source.fetch_questions(Subject::Math, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].question.as_deref(), Some("What is 9 + 3?"));

    let assembler = SessionAssembler::new(Arc::new(source));
    let mut rng = RngSource::seeded(12);
    let batch = assembler.build_batch(Subject::Math, 2, &mut rng).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.stats.external, 1);
    assert_eq!(batch.stats.generated + batch.stats.fallback, 1);
    assert_eq!(batch.items[0].question.prompt, "What is 9 + 3?");
}

#[tokio::test]
async fn test_rest_source_rejected_key() {
    let base_url = spawn_table_server().await;
    let source =
        RestQuestionSource::new(&base_url, "wrong-key", "questions", Duration::from_secs(5)).unwrap();

    let result = source.fetch_questions(Subject::Math, 10).await;
    assert!(matches!(result, Err(QuizError::SourceUnavailable(msg)) if msg.contains("401")));
}

#[tokio::test]
async fn test_rest_source_timeout() {
    let base_url = spawn_table_server().await;
    let source =
        RestQuestionSource::new(&base_url, "anon-key", "slow", Duration::from_millis(100)).unwrap();

    let result = source.fetch_questions(Subject::Math, 10).await;
    assert!(matches!(result, Err(QuizError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_rest_source_unreachable() {
    // nothing listens on the discard port
    let source =
        RestQuestionSource::new("http://127.0.0.1:9", "anon-key", "questions", Duration::from_secs(2))
            .unwrap();
    let result = source.fetch_questions(Subject::English, 5).await;
    assert!(matches!(result, Err(QuizError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_sqlite_rows_written_by_other_clients() {
    let db = SqliteQuestionSource::new("sqlite::memory:").await.unwrap();
    let raw = serde_json::from_value(json!({
        "prompt": "Which word is a noun?",
        "correct_answer": "table",
        "incorrect_answers": "{quickly,run,blue}",
        "difficulty": "easy",
        "grade": 2,
        "hint": "A noun names a thing"
    }))
    .unwrap();
    assert!(db.insert_raw(Subject::English, &raw).await.unwrap());

    let records = db.fetch_questions(Subject::English, 5).await.unwrap();
    let question = Question::try_from(records[0].clone()).unwrap();
    assert_eq!(question.incorrect_answers, vec!["quickly", "run", "blue"]);
    assert_eq!(question.subject, Subject::English);
}
