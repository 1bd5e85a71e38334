//! # CogniScreen Core - Domain model and session collaborators
//!
//! Domain types for the voice-only cognitive assessment interview (profile,
//! questions, answers, results) plus the collaborators the session controller
//! depends on: the question bank, the answer evaluator, and the result store.
//! No audio I/O lives here; everything in this crate is testable without a
//! microphone or speaker.

pub mod domain;
pub mod error;
pub mod evaluator;
pub mod questions;
pub mod store;

pub use domain::{AgeGroup, Answer, Gender, ProfileDraft, Question, QuestionKind, TestResult, UserProfile, NO_ANSWER_TRANSCRIPT};
pub use error::{CoreError, CoreResult};
pub use evaluator::{AnswerEvaluator, Evaluation, KeywordEvaluator, RemoteEvaluator};
pub use questions::{BuiltinQuestionBank, QuestionBank};
pub use store::{MemoryResultStore, ResultStore, SledResultStore};
