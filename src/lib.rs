pub mod api;
pub mod budget;
pub mod config;
pub mod database;
pub mod english_generator;
pub mod errors;
pub mod format;
pub mod grade;
pub mod logging;
pub mod math_generator;
pub mod models;
pub mod question_bank;
pub mod question_source;
pub mod random;
pub mod scoring;
pub mod session_assembler;
pub mod validator;

#[cfg(test)]
mod tests {
    mod practice_flow_test;
}

pub use database::SqliteQuestionSource;
pub use errors::*;
pub use grade::{Grade, GradeBand, Operation};
pub use models::*;
pub use question_bank::StaticQuestionBank;
pub use question_source::{NoQuestionSource, QuestionSource, RawQuestion, RestQuestionSource};
pub use random::{RandomSource, RngSource, SequenceSource};
pub use scoring::PracticeSession;
pub use session_assembler::SessionAssembler;
