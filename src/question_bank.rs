use async_trait::async_trait;

use crate::errors::QuizError;
use crate::log_source_operation;
use crate::models::Subject;
use crate::question_source::{QuestionSource, RawQuestion};

const BUILT_IN_BANK: &str = include_str!("../data/question_bank.json");

/// The small curated bank shipped with the binary.
#[derive(Debug, Clone)]
pub struct StaticQuestionBank {
    records: Vec<RawQuestion>,
}

impl StaticQuestionBank {
    pub fn built_in() -> Result<Self, QuizError> {
        Self::from_json(BUILT_IN_BANK)
    }

    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        let records: Vec<RawQuestion> = serde_json::from_str(json)
            .map_err(|e| QuizError::SourceUnavailable(format!("question bank: {}", e)))?;
        log_source_operation!(info, "static", format!("loaded {} records", records.len()));
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_for(&self, subject: Subject) -> impl Iterator<Item = &RawQuestion> {
        self.records.iter().filter(move |record| {
            record
                .subject
                .as_deref()
                .and_then(|text| text.parse::<Subject>().ok())
                == Some(subject)
        })
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionBank {
    async fn fetch_questions(
        &self,
        subject: Subject,
        limit: usize,
    ) -> Result<Vec<RawQuestion>, QuizError> {
        Ok(self.records_for(subject).take(limit).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Question};
    use crate::validator;

    #[test]
    fn test_built_in_bank_parses_and_validates() {
        let bank = StaticQuestionBank::built_in().unwrap();
        assert_eq!(bank.len(), 12);

        for subject in [Subject::Math, Subject::English] {
            let questions: Vec<Question> = bank
                .records_for(subject)
                .cloned()
                .map(|raw| Question::try_from(raw).unwrap())
                .collect();
            assert_eq!(questions.len(), 6);
            for question in &questions {
                assert!(validator::validate(question), "{}", question.prompt);
                assert_eq!(question.subject, subject);
                assert_eq!(question.incorrect_answers.len(), 3);
            }
        }
    }

    #[test]
    fn test_grade_follows_difficulty() {
        let bank = StaticQuestionBank::built_in().unwrap();
        for raw in bank.records_for(Subject::Math).cloned() {
            let question = Question::try_from(raw).unwrap();
            let expected = match question.difficulty {
                Difficulty::Easy => 3,
                Difficulty::Medium => 6,
                Difficulty::Hard => 10,
            };
            assert_eq!(question.grade.get(), expected);
        }
    }

    #[tokio::test]
    async fn test_fetch_filters_by_subject_and_limit() {
        let bank = StaticQuestionBank::built_in().unwrap();
        let records = bank.fetch_questions(Subject::English, 4).await.unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.subject.as_deref() == Some("english")));
    }

    #[test]
    fn test_bad_json_is_unavailable() {
        assert!(matches!(
            StaticQuestionBank::from_json("not json"),
            Err(QuizError::SourceUnavailable(_))
        ));
    }
}
