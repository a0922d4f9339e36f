use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use crate::errors::QuizError;
use crate::log_source_operation;
use crate::models::{Question, Subject};
use crate::question_source::{QuestionSource, RawQuestion};

/// A question bank stored in SQLite.
#[derive(Clone)]
pub struct SqliteQuestionSource {
    pool: SqlitePool,
}

impl SqliteQuestionSource {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every connection to an in-memory database is a separate database
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let db = SqliteQuestionSource { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                prompt TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                incorrect_answers TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                grade INTEGER NOT NULL,
                hint TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (subject, prompt)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions (subject)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Stores a question. Returns `None` when the subject already has a
    /// question with the same prompt.
    pub async fn insert_question(&self, question: &Question) -> Result<Option<Uuid>> {
        let id = Uuid::new_v4();
        let incorrect_json = serde_json::to_string(&question.incorrect_answers)?;
        let difficulty = serde_json::to_value(question.difficulty)?
            .as_str()
            .map(str::to_string)
            .unwrap_or_default();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO questions (id, subject, prompt, correct_answer,
                                             incorrect_answers, difficulty, grade, hint, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(id.to_string())
        .bind(question.subject.as_str())
        .bind(&question.prompt)
        .bind(&question.correct_answer)
        .bind(incorrect_json)
        .bind(difficulty)
        .bind(i64::from(question.grade.get()))
        .bind(&question.hint)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() > 0).then_some(id))
    }

    pub async fn count_questions(&self, subject: Option<Subject>) -> Result<i64> {
        let count = match subject {
            Some(subject) => {
                sqlx::query("SELECT COUNT(*) AS count FROM questions WHERE subject = ?1")
                    .bind(subject.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS count FROM questions")
                    .fetch_one(&self.pool)
                    .await?
            }
        }
        .try_get::<i64, _>("count")?;
        Ok(count)
    }

    /// Stores an imported record exactly as given, without parsing it, the
    /// way other clients write rows. Returns `false` when the prompt is
    /// already stored for the subject.
    pub async fn insert_raw(&self, subject: Subject, raw: &RawQuestion) -> Result<bool> {
        let stored_incorrect = raw
            .incorrect_answers
            .as_ref()
            .or(raw.incorrect_answers_camel.as_ref());
        let incorrect = match stored_incorrect {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let prompt = [&raw.prompt, &raw.question, &raw.text]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_default();
        let correct_answer = raw
            .correct_answer
            .as_ref()
            .or(raw.correct_answer_camel.as_ref())
            .cloned()
            .unwrap_or_default();
        let hint = raw
            .hint
            .as_ref()
            .or(raw.explanation.as_ref())
            .cloned()
            .unwrap_or_default();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO questions (id, subject, prompt, correct_answer,
                                   incorrect_answers, difficulty, grade, hint, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subject.as_str())
        .bind(prompt)
        .bind(correct_answer)
        .bind(incorrect)
        .bind(raw.difficulty.clone().unwrap_or_default())
        .bind(raw.grade.unwrap_or_default())
        .bind(hint)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn random_rows(&self, subject: Subject, limit: usize) -> Result<Vec<RawQuestion>> {
        let rows = sqlx::query(
            r#"
            SELECT subject, prompt, correct_answer, incorrect_answers, difficulty, grade, hint
            FROM questions
            WHERE subject = ?1
            ORDER BY RANDOM()
            LIMIT ?2
            "#,
        )
        .bind(subject.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .filter_map(|row| match row_to_raw(row) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    log_source_operation!(dropped, "sqlite", subject = subject, error = e);
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

/// Rows written by other clients may hold a mistyped column; those come
/// back as an error instead of a panic.
fn row_to_raw(row: &SqliteRow) -> Result<RawQuestion, sqlx::Error> {
    let non_empty = |text: String| (!text.trim().is_empty()).then_some(text);
    Ok(RawQuestion {
        prompt: Some(row.try_get("prompt")?),
        correct_answer: Some(row.try_get("correct_answer")?),
        incorrect_answers: Some(Value::String(row.try_get("incorrect_answers")?)),
        difficulty: non_empty(row.try_get("difficulty")?),
        grade: Some(row.try_get("grade")?),
        hint: Some(row.try_get("hint")?),
        subject: Some(row.try_get("subject")?),
        ..Default::default()
    })
}

#[async_trait]
impl QuestionSource for SqliteQuestionSource {
    async fn fetch_questions(
        &self,
        subject: Subject,
        limit: usize,
    ) -> Result<Vec<RawQuestion>, QuizError> {
        let start = Instant::now();
        let records = self.random_rows(subject, limit).await.map_err(|e| {
            log_source_operation!(error, "sqlite", error = e);
            QuizError::SourceUnavailable(e.to_string())
        })?;
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
        "sqlite"
    }
}
