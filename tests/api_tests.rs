use axum::http::StatusCode;
use axum_test::TestServer;
use practice_arena::api::{create_router, AppState};
use practice_arena::{NoQuestionSource, SessionAssembler, StaticQuestionBank};
use serde_json::Value;
use std::sync::Arc;

fn create_test_server() -> TestServer {
    let assembler = SessionAssembler::new(Arc::new(NoQuestionSource));
    let app = create_router(AppState::new(assembler).with_batch_sizes(10, 50));
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = create_test_server();
    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["question_source"], "none");
}

#[tokio::test]
async fn test_batch_uses_default_count() {
    let server = create_test_server();
    let response = server.get("/api/questions/math").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["subject"], "math");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"]["stats"]["external"], 0);
}

#[tokio::test]
async fn test_batch_with_explicit_count() {
    let server = create_test_server();
    let response = server
        .get("/api/questions/english")
        .add_query_param("count", 7)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 7);
    for item in items {
        let answers = item["answers"].as_array().unwrap();
        let correct = &item["question"]["correct_answer"];
        assert!(answers.contains(correct));
        assert!(!item["question"]["hint"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_batch_count_out_of_range() {
    let server = create_test_server();

    for count in ["0", "-4", "51"] {
        let response = server
            .get("/api/questions/math")
            .add_query_param("count", count)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("count"));
    }
}

#[tokio::test]
async fn test_unknown_subject() {
    let server = create_test_server();
    let response = server.get("/api/questions/history").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_question_for_grade() {
    let server = create_test_server();

    let response = server.get("/api/questions/math/grade/9").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["question"]["grade"], 9);
    assert_eq!(body["data"]["question"]["difficulty"], "hard");

    let response = server.get("/api/questions/english/grade/1").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["question"]["subject"], "english");
    assert_eq!(body["data"]["question"]["difficulty"], "easy");
}

#[tokio::test]
async fn test_question_for_grade_out_of_range() {
    let server = create_test_server();

    for grade in ["0", "13"] {
        let response = server
            .get(&format!("/api/questions/math/grade/{}", grade))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_batch_from_static_bank() {
    let bank = StaticQuestionBank::built_in().unwrap();
    let assembler = SessionAssembler::new(Arc::new(bank));
    let server = TestServer::new(create_router(AppState::new(assembler))).unwrap();

    let response = server
        .get("/api/questions/math")
        .add_query_param("count", 8)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["stats"]["external"], 6);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 8);
}
