use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::bank::{BankError, QuestionBank};
use crate::generator::QuizGenerator;
use crate::quiz::{Difficulty, Quiz, QuizSource};
use crate::remote::QuizBackend;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("No questions available for this subject/difficulty.")]
    NoQuestions,
    #[error(transparent)]
    Bank(#[from] BankError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuizRequest {
    pub subject: String,
    pub difficulty: Difficulty,
    pub count: usize,
}

/// Build the quiz to take.
///
/// With a backend: use its quiz, except that a `practice_bank` answer is
/// swapped for a local sample whenever the local bank covers the exact
/// subject and difficulty, since local quizzes carry their own answer key.
/// If the backend fails or hands back a quiz with no questions, sample
/// locally instead.
///
/// Without a backend: ask the generator (direct LLM, then the bank's
/// fallback chain).
pub fn start_quiz<R: Rng + ?Sized>(
    request: &QuizRequest,
    backend: Option<&dyn QuizBackend>,
    generator: &QuizGenerator<'_>,
    bank: &QuestionBank,
    rng: &mut R,
) -> Result<Quiz, StartError> {
    let QuizRequest {
        subject,
        difficulty,
        count,
    } = request;

    let Some(backend) = backend else {
        let (questions, source) = generator.generate(subject, *difficulty, *count, rng)?;
        let mut quiz = Quiz::from_bank(questions, subject, *difficulty, rng);
        quiz.source = source;
        return Ok(quiz);
    };

    match backend.generate_quiz(subject, *difficulty, *count) {
        Ok(quiz) if quiz.questions.is_empty() => {
            warn!(quiz_id = %quiz.quiz_id, "backend returned an empty quiz, sampling locally");
            sample_locally(request, bank, rng)
        }
        Ok(quiz) if quiz.source == QuizSource::PracticeBank => {
            let local = bank.sample_from_bank(subject, *difficulty, *count, rng);
            if local.is_empty() {
                info!(%subject, %difficulty, "backend served its practice bank, no local match");
                Ok(quiz)
            } else {
                info!(%subject, %difficulty, "backend served its practice bank, using local sample");
                Ok(Quiz::from_bank(local, subject, *difficulty, rng))
            }
        }
        Ok(quiz) => Ok(quiz),
        Err(e) => {
            if e.is_unreachable() {
                warn!(error = %e, "backend unreachable, sampling locally");
            } else {
                warn!(error = %e, "backend refused to generate a quiz, sampling locally");
            }
            sample_locally(request, bank, rng)
        }
    }
}

fn sample_locally<R: Rng + ?Sized>(
    request: &QuizRequest,
    bank: &QuestionBank,
    rng: &mut R,
) -> Result<Quiz, StartError> {
    let local = bank.sample_from_bank(&request.subject, request.difficulty, request.count, rng);
    if local.is_empty() {
        return Err(StartError::NoQuestions);
    }
    Ok(Quiz::from_bank(local, &request.subject, request.difficulty, rng))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::quiz::QuizItem;
    use crate::remote::{ApiError, RecordAttempt, RecordResponse, SubmitResponse};

    struct FakeBackend {
        reply: fn() -> Result<Quiz, ApiError>,
    }

    impl QuizBackend for FakeBackend {
        fn generate_quiz(&self, _: &str, _: Difficulty, _: usize) -> Result<Quiz, ApiError> {
            (self.reply)()
        }

        fn submit_quiz(&self, _: &str, _: &[u8]) -> Result<SubmitResponse, ApiError> {
            Err(ApiError::NetworkDisabled)
        }

        fn record_attempt(&self, _: &RecordAttempt<'_>) -> Result<RecordResponse, ApiError> {
            Err(ApiError::NetworkDisabled)
        }
    }

    fn remote_quiz(source: QuizSource) -> Quiz {
        Quiz {
            quiz_id: "0b8e6f3a".to_string(),
            subject: "Physics".to_string(),
            difficulty: Difficulty::Beginner,
            source,
            questions: vec![QuizItem {
                index: 0,
                id: None,
                question: "Remote question?".to_string(),
                options: ["a", "b", "c", "d"].map(String::from).to_vec(),
                correct_index: None,
                explanation: None,
            }],
        }
    }

    fn request(subject: &str, count: usize) -> QuizRequest {
        QuizRequest {
            subject: subject.to_string(),
            difficulty: Difficulty::Beginner,
            count,
        }
    }

    #[test]
    fn ai_quiz_from_backend_is_used_as_is() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || Ok(remote_quiz(QuizSource::Ai)),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz = start_quiz(&request("Physics", 5), Some(&backend), &generator, &bank, &mut rng)
            .unwrap();
        assert_eq!(quiz.quiz_id, "0b8e6f3a");
        assert!(!quiz.is_local());
    }

    #[test]
    fn practice_bank_reply_swapped_for_local_sample() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || Ok(remote_quiz(QuizSource::PracticeBank)),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz = start_quiz(&request("Physics", 5), Some(&backend), &generator, &bank, &mut rng)
            .unwrap();
        assert!(quiz.is_local());
        assert_eq!(quiz.len(), 5);
        assert!(quiz.answer_key().is_some());
    }

    #[test]
    fn practice_bank_reply_kept_when_no_local_match() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || Ok(remote_quiz(QuizSource::PracticeBank)),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz = start_quiz(
            &request("Marine Biology", 5),
            Some(&backend),
            &generator,
            &bank,
            &mut rng,
        )
        .unwrap();
        assert_eq!(quiz.quiz_id, "0b8e6f3a");
    }

    #[test]
    fn backend_failure_samples_locally() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || Err(ApiError::NotAuthenticated),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz = start_quiz(
            &request("Mathematics", 4),
            Some(&backend),
            &generator,
            &bank,
            &mut rng,
        )
        .unwrap();
        assert!(quiz.is_local());
        assert_eq!(quiz.source, QuizSource::PracticeBank);
        assert_eq!(quiz.len(), 4);
    }

    #[test]
    fn backend_failure_without_local_match_is_an_error() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || {
                Err(ApiError::Request {
                    path: "/quiz/generate".to_string(),
                    message: "connection refused".to_string(),
                })
            },
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let err = start_quiz(
            &request("Marine Biology", 4),
            Some(&backend),
            &generator,
            &bank,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, StartError::NoQuestions));
        assert_eq!(err.to_string(), "No questions available for this subject/difficulty.");
    }

    #[test]
    fn no_backend_uses_generator_fallback_chain() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz =
            start_quiz(&request("Marine Biology", 4), None, &generator, &bank, &mut rng).unwrap();
        assert!(quiz.is_local());
        assert_eq!(quiz.subject, "Marine Biology");
        assert_eq!(quiz.len(), 4);
    }

    #[test]
    fn empty_backend_quiz_is_replaced_by_local_sample() {
        let bank = QuestionBank::embedded().unwrap();
        let generator = QuizGenerator::new(None, &bank);
        let backend = FakeBackend {
            reply: || {
                let mut quiz = remote_quiz(QuizSource::Ai);
                quiz.questions.clear();
                Ok(quiz)
            },
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let quiz = start_quiz(&request("Physics", 5), Some(&backend), &generator, &bank, &mut rng)
            .unwrap();
        assert!(quiz.is_local());
        assert_eq!(quiz.len(), 5);

        let err = start_quiz(
            &request("Marine Biology", 5),
            Some(&backend),
            &generator,
            &bank,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, StartError::NoQuestions));
    }
}
