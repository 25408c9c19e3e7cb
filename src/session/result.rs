use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::grading::{GradedQuiz, QuestionResult};
use crate::quiz::{Difficulty, QuizSource};
use crate::session::quiz::QuizSession;

/// One finished quiz as kept in local history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_source")]
    pub source: QuizSource,
    pub score: f64,
    pub correct: usize,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub elapsed_secs: f64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub results: Vec<QuestionResult>,
}

fn default_source() -> QuizSource {
    QuizSource::PracticeBank
}

impl AttemptRecord {
    pub fn from_session(session: &QuizSession, graded: &GradedQuiz) -> Self {
        let elapsed = session
            .finished_at
            .map(|end| end.saturating_duration_since(session.started_at))
            .unwrap_or_default();

        Self {
            id: session.quiz.quiz_id.clone(),
            subject: session.quiz.subject.clone(),
            difficulty: session.quiz.difficulty,
            source: session.quiz.source,
            score: graded.score,
            correct: graded.correct,
            total: graded.total,
            timestamp: Utc::now(),
            elapsed_secs: elapsed.as_secs_f64(),
            timed_out: session.timed_out,
            results: graded.results.clone(),
        }
    }
}
