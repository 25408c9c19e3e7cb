use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::{OPTION_COUNT, Question};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("cannot score a quiz with no questions")]
    EmptyQuiz,
    #[error("expected {expected} answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },
    #[error("answer index {answer} for question {question} is out of range [0, 3]")]
    AnswerOutOfRange { question: usize, answer: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    pub options: Vec<String>,
    /// `None` when the quiz was submitted before this question was answered.
    pub selected_index: Option<u8>,
    pub correct_index: u8,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedQuiz {
    pub score: f64,
    pub total: usize,
    pub correct: usize,
    pub results: Vec<QuestionResult>,
}

/// `round(100 * correct / total)`; undefined for an empty quiz.
pub fn percent_score(correct: usize, total: usize) -> Result<u32, GradeError> {
    if total == 0 {
        return Err(GradeError::EmptyQuiz);
    }
    Ok((100.0 * correct as f64 / total as f64).round() as u32)
}

/// Grade a fully answered quiz. `answers[i]` is the option chosen for
/// `questions[i]`.
pub fn grade(questions: &[Question], answers: &[u8]) -> Result<GradedQuiz, GradeError> {
    let answers: Vec<Option<u8>> = answers.iter().copied().map(Some).collect();
    grade_inner(questions, &answers)
}

/// Grade a quiz that may have unanswered questions; those count as wrong.
pub fn grade_partial(
    questions: &[Question],
    answers: &[Option<u8>],
) -> Result<GradedQuiz, GradeError> {
    grade_inner(questions, answers)
}

fn grade_inner(questions: &[Question], answers: &[Option<u8>]) -> Result<GradedQuiz, GradeError> {
    if questions.is_empty() {
        return Err(GradeError::EmptyQuiz);
    }
    if answers.len() != questions.len() {
        return Err(GradeError::AnswerCountMismatch {
            expected: questions.len(),
            actual: answers.len(),
        });
    }
    if let Some((question, answer)) = answers
        .iter()
        .enumerate()
        .find_map(|(i, a)| a.filter(|&a| usize::from(a) >= OPTION_COUNT).map(|a| (i, a)))
    {
        return Err(GradeError::AnswerOutOfRange { question, answer });
    }

    let results: Vec<QuestionResult> = questions
        .iter()
        .zip(answers)
        .map(|(q, &selected)| QuestionResult {
            question: q.question.clone(),
            options: q.options.to_vec(),
            selected_index: selected,
            correct_index: q.correct_index,
            is_correct: selected == Some(q.correct_index),
            explanation: q.explanation.clone(),
        })
        .collect();

    let correct = results.iter().filter(|r| r.is_correct).count();
    let total = results.len();
    let score = f64::from(percent_score(correct, total)?);

    Ok(GradedQuiz {
        score,
        total,
        correct,
        results,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

pub fn headline(score: f64) -> &'static str {
    if score >= 80.0 {
        "Excellent!"
    } else if score >= 60.0 {
        "Good Job!"
    } else if score >= 40.0 {
        "Keep Practicing"
    } else {
        "Don't Give Up!"
    }
}
