use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPTION_COUNT: usize = 4;
pub const LOCAL_QUIZ_PREFIX: &str = "local-";

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown difficulty '{0}' (expected beginner, intermediate or advanced)")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizSource {
    Ai,
    PracticeBank,
}

impl QuizSource {
    pub fn as_str(self) -> &'static str {
        match self {
            QuizSource::Ai => "ai",
            QuizSource::PracticeBank => "practice_bank",
        }
    }
}

/// Reasons an untrusted question is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyQuestion,
    #[error("expected exactly 4 options, got {0}")]
    OptionCount(usize),
    #[error("correct_index {0} is out of range [0, 3]")]
    CorrectIndexOutOfRange(i64),
    #[error("explanation is empty")]
    EmptyExplanation,
}

/// A four-option multiple-choice item together with its answer key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    pub question: String,
    pub options: [String; OPTION_COUNT],
    pub correct_index: u8,
    pub explanation: String,
}

/// Loosely-typed question as it arrives from JSON before validation.
#[derive(Clone, Debug, Deserialize)]
pub struct RawQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: String,
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuestionError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        if raw.question.trim().is_empty() {
            return Err(QuestionError::EmptyQuestion);
        }
        if !(0..OPTION_COUNT as i64).contains(&raw.correct_index) {
            return Err(QuestionError::CorrectIndexOutOfRange(raw.correct_index));
        }
        if raw.explanation.trim().is_empty() {
            return Err(QuestionError::EmptyExplanation);
        }
        let count = raw.options.len();
        let options: [String; OPTION_COUNT] = raw
            .options
            .try_into()
            .map_err(|_| QuestionError::OptionCount(count))?;

        Ok(Self {
            question: raw.question,
            options,
            correct_index: raw.correct_index as u8,
            explanation: raw.explanation,
        })
    }
}

/// One question as presented to the quiz taker. Quizzes that came from the
/// backend carry no answer key; locally sampled quizzes always do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_source")]
    pub source: QuizSource,
    pub questions: Vec<QuizItem>,
}

fn default_source() -> QuizSource {
    QuizSource::Ai
}

impl Quiz {
    /// Wrap locally sampled bank questions so they can be taken exactly like
    /// a quiz served by the backend.
    pub fn from_bank<R: Rng + ?Sized>(
        questions: Vec<Question>,
        subject: &str,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Self {
        let quiz_id = local_quiz_id(rng);
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| QuizItem {
                index: i,
                id: Some(format!("{quiz_id}-q{i}")),
                question: q.question,
                options: q.options.to_vec(),
                correct_index: Some(q.correct_index),
                explanation: Some(q.explanation),
            })
            .collect();

        Self {
            quiz_id,
            subject: subject.to_string(),
            difficulty,
            source: QuizSource::PracticeBank,
            questions,
        }
    }

    pub fn is_local(&self) -> bool {
        self.quiz_id.starts_with(LOCAL_QUIZ_PREFIX)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Rebuild full questions from the embedded answer key. Returns `None`
    /// as soon as one item lacks a key or is malformed.
    pub fn answer_key(&self) -> Option<Vec<Question>> {
        self.questions
            .iter()
            .map(|item| {
                let correct_index = item
                    .correct_index
                    .filter(|&i| usize::from(i) < OPTION_COUNT)?;
                let options: [String; OPTION_COUNT] = item.options.clone().try_into().ok()?;
                Some(Question {
                    question: item.question.clone(),
                    options,
                    correct_index,
                    explanation: item.explanation.clone().unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// `local-<unix millis>-<5 base36 chars>`
pub fn local_quiz_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..5)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!(
        "{LOCAL_QUIZ_PREFIX}{}-{suffix}",
        Utc::now().timestamp_millis()
    )
}
