use std::time::{Duration, Instant};

use thiserror::Error;

use crate::engine::grading::{self, GradeError, GradedQuiz};
use crate::quiz::{OPTION_COUNT, Quiz};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{unanswered} question(s) still unanswered")]
    Incomplete { unanswered: usize },
    /// The backend only grades complete quizzes, so a timed-out remote quiz
    /// stays open until every question has an answer.
    #[error("the backend grades complete quizzes only; {unanswered} question(s) still unanswered")]
    RemoteIncomplete { unanswered: usize },
    #[error("quiz {0} has no local answer key; submit it to the backend")]
    RemoteQuiz(String),
    #[error("option {0} does not exist")]
    InvalidOption(usize),
    #[error(transparent)]
    Grade(#[from] GradeError),
}

/// What the session hands back on submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Graded locally from the quiz's embedded answer key.
    Graded(GradedQuiz),
    /// Needs the backend to grade; carries the answers to send.
    Remote { quiz_id: String, answers: Vec<u8> },
}

pub struct QuizSession {
    pub quiz: Quiz,
    pub answers: Vec<Option<u8>>,
    pub current: usize,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
    pub time_limit: Option<Duration>,
    pub timed_out: bool,
}

impl QuizSession {
    pub fn new(quiz: Quiz, time_limit_minutes: Option<u32>) -> Self {
        Self::starting_at(quiz, time_limit_minutes, Instant::now())
    }

    pub fn starting_at(quiz: Quiz, time_limit_minutes: Option<u32>, started_at: Instant) -> Self {
        let answers = vec![None; quiz.len()];
        Self {
            quiz,
            answers,
            current: 0,
            started_at,
            finished_at: None,
            time_limit: time_limit_minutes.map(|m| Duration::from_secs(u64::from(m) * 60)),
            timed_out: false,
        }
    }

    pub fn total(&self) -> usize {
        self.quiz.len()
    }

    pub fn select(&mut self, option: usize) -> Result<(), SessionError> {
        let available = self
            .quiz
            .questions
            .get(self.current)
            .map_or(OPTION_COUNT, |q| q.options.len());
        if option >= available {
            return Err(SessionError::InvalidOption(option));
        }
        if let Some(slot) = self.answers.get_mut(self.current) {
            *slot = Some(option as u8);
        }
        Ok(())
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.total() {
            self.current += 1;
        }
    }

    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn jump(&mut self, index: usize) {
        if index < self.total() {
            self.current = index;
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn all_answered(&self) -> bool {
        self.answered_count() == self.total()
    }

    /// Position of the current question as a percentage of the quiz.
    pub fn progress(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.current + 1) as f64 / self.total() as f64 * 100.0
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.finished_at
            .unwrap_or(now)
            .saturating_duration_since(self.started_at)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.time_limit
            .map(|limit| limit.saturating_sub(self.elapsed(now)))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|r| r.is_zero())
    }

    /// Submit a fully answered quiz.
    pub fn submit(&mut self, now: Instant) -> Result<Submission, SessionError> {
        let unanswered = self.total() - self.answered_count();
        if unanswered > 0 {
            return Err(SessionError::Incomplete { unanswered });
        }
        self.finish(now)
    }

    /// Submit regardless of unanswered questions; used when the time limit
    /// runs out and auto-submit is on. Remote quizzes cannot be graded with
    /// gaps, so those come back as `RemoteIncomplete` and the session stays
    /// open.
    pub fn force_submit(&mut self, now: Instant) -> Result<Submission, SessionError> {
        let unanswered = self.total() - self.answered_count();
        if !self.quiz.is_local() && unanswered > 0 {
            return Err(SessionError::RemoteIncomplete { unanswered });
        }
        self.timed_out = unanswered > 0;
        self.finish(now)
    }

    fn finish(&mut self, now: Instant) -> Result<Submission, SessionError> {
        if !self.quiz.is_local() {
            self.finished_at = Some(now);
            return Ok(Submission::Remote {
                quiz_id: self.quiz.quiz_id.clone(),
                answers: self.answers.iter().flatten().copied().collect(),
            });
        }

        let key = self
            .quiz
            .answer_key()
            .ok_or_else(|| SessionError::RemoteQuiz(self.quiz.quiz_id.clone()))?;
        let graded = grading::grade_partial(&key, &self.answers)?;
        self.finished_at = Some(now);
        Ok(Submission::Graded(graded))
    }
}
