use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use crate::errors::{ParseError, QuizError};
use crate::grade::Grade;
use crate::models::{Difficulty, Question, Subject};
use crate::{log_source_operation, validator};

/// Anything that can hand back stored questions for a subject.
///
/// Implementations return loosely typed [`RawQuestion`] records; turning
/// them into [`Question`]s is the caller's job.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_questions(
        &self,
        subject: Subject,
        limit: usize,
    ) -> Result<Vec<RawQuestion>, QuizError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// A question record as stored externally. Every field is optional and the
/// incorrect answers may be an array, a JSON string or a Postgres array
/// literal. Rows written by different clients spell some columns
/// differently, and often carry both spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default, rename = "correctAnswer")]
    pub correct_answer_camel: Option<String>,
    #[serde(default)]
    pub incorrect_answers: Option<Value>,
    #[serde(default, rename = "incorrectAnswers")]
    pub incorrect_answers_camel: Option<Value>,
    /// All options including the correct one; used when
    /// `incorrect_answers` is absent.
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub grade: Option<i64>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl RawQuestion {
    /// Fills in the subject when the record does not carry one.
    pub fn or_subject(mut self, subject: Subject) -> Self {
        if self.subject.as_deref().is_none_or(|s| s.trim().is_empty()) {
            self.subject = Some(subject.to_string());
        }
        self
    }
}

fn first_present(candidates: [Option<String>; 3]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

fn required(field: Option<String>, name: &'static str) -> Result<String, ParseError> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ParseError::MissingField(name))
}

/// Decodes fetched JSON items one by one. Items whose fields have the wrong
/// type are logged and dropped; the rest survive.
pub fn decode_records(source: &str, subject: Subject, items: Vec<Value>) -> Vec<RawQuestion> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawQuestion>(item) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log_source_operation!(dropped, source, subject = subject, error = e);
                None
            }
        })
        .collect()
}

/// Grade a record falls back to when only its difficulty is stored.
pub fn grade_for_difficulty(difficulty: Difficulty) -> Grade {
    let value = match difficulty {
        Difficulty::Easy => 3,
        Difficulty::Medium => 6,
        Difficulty::Hard => 10,
    };
    Grade::new(value).unwrap_or(Grade::FIRST)
}

impl TryFrom<RawQuestion> for Question {
    type Error = ParseError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let prompt = required(first_present([raw.prompt, raw.question, raw.text]), "prompt")?;
        let correct_answer = required(
            first_present([raw.correct_answer, raw.correct_answer_camel, None]),
            "correct_answer",
        )?;

        let stored_incorrect = [&raw.incorrect_answers, &raw.incorrect_answers_camel]
            .into_iter()
            .flatten()
            .find(|value| !value.is_null());
        let incorrect_answers = match (stored_incorrect, &raw.options) {
            (Some(value), _) => decode_answers(value)?,
            (_, Some(options)) if !options.is_null() => decode_answers(options)?
                .into_iter()
                .filter(|option| option != &correct_answer)
                .collect(),
            _ => return Err(ParseError::MissingField("incorrect_answers")),
        };

        let difficulty = raw
            .difficulty
            .as_deref()
            .map(|text| text.parse::<Difficulty>().map_err(ParseError::UnknownDifficulty))
            .transpose()?;

        let grade = match (raw.grade, difficulty) {
            (Some(value), _) => Grade::new(value).map_err(|_| ParseError::GradeOutOfRange(value))?,
            (None, Some(difficulty)) => grade_for_difficulty(difficulty),
            (None, None) => return Err(ParseError::MissingField("grade")),
        };
        let difficulty = difficulty.unwrap_or_else(|| grade.difficulty());

        let subject_text = required(raw.subject, "subject")?;
        let subject = subject_text
            .parse::<Subject>()
            .map_err(|_| ParseError::UnknownSubject(subject_text))?;

        let question = Question {
            prompt,
            correct_answer,
            incorrect_answers: incorrect_answers
                .into_iter()
                .map(|answer| answer.trim().to_string())
                .collect(),
            difficulty,
            grade,
            hint: required(first_present([raw.hint, raw.explanation, None]), "hint")?,
            subject,
        };
        validator::check(&question)?;
        Ok(question)
    }
}

static PG_ARRAY_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"|([^,{}"]+)"#).expect("array element pattern is valid")
});

/// Decodes a Postgres text-array literal such as `{a,"b c"}`.
pub fn parse_pg_array(literal: &str) -> Option<Vec<String>> {
    let inner = literal.trim().strip_prefix('{')?.strip_suffix('}')?;
    let elements = PG_ARRAY_ELEMENT
        .captures_iter(inner)
        .filter_map(|caps| {
            if let Some(quoted) = caps.get(1) {
                Some(quoted.as_str().replace("\\\"", "\"").replace("\\\\", "\\"))
            } else {
                caps.get(2)
                    .map(|bare| bare.as_str().trim().to_string())
                    .filter(|bare| !bare.is_empty())
            }
        })
        .collect();
    Some(elements)
}

fn decode_answers(value: &Value) -> Result<Vec<String>, ParseError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                Value::Number(number) => Ok(number.to_string()),
                other => Err(ParseError::UndecodableAnswers(other.to_string())),
            })
            .collect(),
        Value::String(text) => decode_answer_text(text),
        other => Err(ParseError::UndecodableAnswers(other.to_string())),
    }
}

fn decode_answer_text(text: &str) -> Result<Vec<String>, ParseError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| ParseError::UndecodableAnswers(e.to_string()))?;
        return match value {
            Value::Array(_) => decode_answers(&value),
            _ => Err(ParseError::UndecodableAnswers(trimmed.to_string())),
        };
    }
    parse_pg_array(trimmed).ok_or_else(|| ParseError::UndecodableAnswers(trimmed.to_string()))
}

/// A hosted PostgREST-style `questions` table.
#[derive(Debug, Clone)]
pub struct RestQuestionSource {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestQuestionSource {
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        log_source_operation!(info, "rest", format!("client created for {}", base_url));
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl QuestionSource for RestQuestionSource {
    async fn fetch_questions(
        &self,
        subject: Subject,
        limit: usize,
    ) -> Result<Vec<RawQuestion>, QuizError> {
        let start = Instant::now();
        let subject_filter = format!("eq.{}", subject);
        let limit_text = limit.to_string();

        let response = self
            .client
            .get(self.endpoint())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[
                ("select", "*"),
                ("subject", subject_filter.as_str()),
                ("limit", limit_text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| QuizError::SourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QuizError::SourceUnavailable(format!("{}: {}", status, body)));
        }

        let items: Vec<Value> = response
            .json()
            .await
            .map_err(|e| QuizError::SourceUnavailable(e.to_string()))?;
        let records = decode_records(self.name(), subject, items);

        log_source_operation!(
            debug,
            self.name(),
            subject = subject,
            count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// Used when no source is configured; every fetch fails so the assembler
/// generates the whole batch locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuestionSource;

#[async_trait]
impl QuestionSource for NoQuestionSource {
    async fn fetch_questions(
        &self,
        _subject: Subject,
        _limit: usize,
    ) -> Result<Vec<RawQuestion>, QuizError> {
        Err(QuizError::SourceUnavailable(
            "no question source configured".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuestionDefect;
    use serde_json::json;

    fn record(value: Value) -> RawQuestion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parses_supabase_style_record() {
        let raw = record(json!({
            "question": "What is 6 x 7?",
            "correctAnswer": "42",
            "incorrect_answers": ["36", "48", "54"],
            "difficulty": "easy",
            "grade": 3,
            "hint": "Think of 6 groups of 7",
            "subject": "math"
        }));
        let question = Question::try_from(raw).unwrap();
        assert_eq!(question.prompt, "What is 6 x 7?");
        assert_eq!(question.correct_answer, "42");
        assert_eq!(question.incorrect_answers, vec!["36", "48", "54"]);
        assert_eq!(question.grade.get(), 3);
        assert_eq!(question.subject, Subject::Math);
    }

    #[test]
    fn test_record_with_both_spellings() {
        let raw = record(json!({
            "id": 7,
            "text": "What is 2 + 2?",
            "question": "What is 2 + 2?",
            "correctAnswer": "4",
            "correct_answer": "4",
            "options": ["4", "3", "5"],
            "incorrect_answers": "{3,5}",
            "grade": 1,
            "hint": "Count on your fingers",
            "subject": "math",
            "created_at": "2024-01-01T00:00:00Z"
        }));
        let question = Question::try_from(raw).unwrap();
        assert_eq!(question.prompt, "What is 2 + 2?");
        assert_eq!(question.incorrect_answers, vec!["3", "5"]);
    }

    #[test]
    fn test_record_with_both_incorrect_answer_spellings() {
        let raw = record(json!({
            "prompt": "What is 9 - 4?",
            "correct_answer": "5",
            "incorrect_answers": null,
            "incorrectAnswers": ["4", "6"],
            "grade": 1,
            "hint": "Count back from 9",
            "subject": "math"
        }));
        let question = Question::try_from(raw).unwrap();
        assert_eq!(question.incorrect_answers, vec!["4", "6"]);
    }

    #[test]
    fn test_decode_records_drops_mistyped_items() {
        let items = vec![
            json!({
                "prompt": "What is 3 + 3?",
                "correct_answer": "6",
                "incorrect_answers": ["5", "7"],
                "grade": 1,
                "hint": "Double 3",
                "subject": "math"
            }),
            json!({ "prompt": "What is 4 + 4?", "grade": "5" }),
            json!({ "prompt": "What is 5 + 5?", "correct_answer": 10 }),
            json!({ "prompt": "What is 6 + 6?", "hint": ["twelve"] }),
            json!("not a record"),
        ];
        let records = decode_records("rest", Subject::Math, items);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt.as_deref(), Some("What is 3 + 3?"));
    }

    #[test]
    fn test_incorrect_answers_encodings() {
        let base = json!({
            "prompt": "Pick one",
            "correct_answer": "a",
            "grade": 5,
            "hint": "first letter",
            "subject": "english"
        });

        for encoded in [
            json!(["b", "c d"]),
            json!("[\"b\", \"c d\"]"),
            json!("{b,\"c d\"}"),
        ] {
            let mut value = base.clone();
            value["incorrect_answers"] = encoded.clone();
            let question = Question::try_from(record(value)).unwrap();
            assert_eq!(question.incorrect_answers, vec!["b", "c d"], "{}", encoded);
        }
    }

    #[test]
    fn test_options_without_incorrect_answers() {
        let raw = record(json!({
            "text": "What is 15 / 3?",
            "options": ["3", "4", "5", "6"],
            "correctAnswer": "5",
            "difficulty": "medium",
            "explanation": "15 split into 3 groups"
        }))
        .or_subject(Subject::Math);
        let question = Question::try_from(raw).unwrap();
        assert_eq!(question.incorrect_answers, vec!["3", "4", "6"]);
        assert_eq!(question.grade.get(), 6);
        assert_eq!(question.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_shape_errors() {
        let raw = record(json!({ "correct_answer": "1" }));
        assert_eq!(
            Question::try_from(raw),
            Err(ParseError::MissingField("prompt"))
        );

        let raw = record(json!({
            "prompt": "p", "correct_answer": "1", "incorrect_answers": "not a list",
            "grade": 2, "hint": "h", "subject": "math"
        }));
        assert!(matches!(
            Question::try_from(raw),
            Err(ParseError::UndecodableAnswers(_))
        ));

        let raw = record(json!({
            "prompt": "p", "correct_answer": "1", "incorrect_answers": ["2"],
            "grade": 13, "hint": "h", "subject": "math"
        }));
        assert_eq!(Question::try_from(raw), Err(ParseError::GradeOutOfRange(13)));

        let raw = record(json!({
            "prompt": "p", "correct_answer": "1", "incorrect_answers": ["1", "2"],
            "grade": 2, "hint": "h", "subject": "math"
        }));
        assert_eq!(
            Question::try_from(raw),
            Err(ParseError::Invalid(QuestionDefect::CorrectAnswerAmongIncorrect))
        );
    }

    #[test]
    fn test_record_subject_wins_over_default() {
        let raw = RawQuestion {
            subject: Some("english".to_string()),
            ..Default::default()
        }
        .or_subject(Subject::Math);
        assert_eq!(raw.subject.as_deref(), Some("english"));
    }

    #[test]
    fn test_pg_array_literal() {
        assert_eq!(
            parse_pg_array(r#"{plain,"with space","with \"quote\""}"#),
            Some(vec![
                "plain".to_string(),
                "with space".to_string(),
                "with \"quote\"".to_string()
            ])
        );
        assert_eq!(parse_pg_array("{}"), Some(vec![]));
        assert_eq!(parse_pg_array("plain"), None);
    }

    #[tokio::test]
    async fn test_no_source_is_unavailable() {
        let result = NoQuestionSource.fetch_questions(Subject::Math, 5).await;
        assert!(matches!(result, Err(QuizError::SourceUnavailable(_))));
    }
}
