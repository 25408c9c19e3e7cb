pub mod llm;
pub mod prompts;
pub mod validator;

use rand::Rng;
use tracing::{error, info, warn};

use crate::bank::{BankError, QuestionBank};
use crate::quiz::{Difficulty, Question, QuizSource};

use llm::LlmProvider;

/// Initial attempt plus two retries.
pub const MAX_ATTEMPTS: usize = 3;

/// Asks the model for questions and falls back to the bank when the model is
/// unreachable or keeps producing output that fails validation.
pub struct QuizGenerator<'a> {
    provider: Option<&'a dyn LlmProvider>,
    bank: &'a QuestionBank,
}

impl<'a> QuizGenerator<'a> {
    pub fn new(provider: Option<&'a dyn LlmProvider>, bank: &'a QuestionBank) -> Self {
        Self { provider, bank }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
        rng: &mut R,
    ) -> Result<(Vec<Question>, QuizSource), BankError> {
        let Some(provider) = self.provider else {
            info!("no LLM provider configured, using the practice bank");
            return self.fallback(subject, difficulty, count, rng);
        };

        if !provider.check_health() {
            warn!(model = provider.model(), "LLM provider is unreachable, using the practice bank");
            return self.fallback(subject, difficulty, count, rng);
        }

        let temperature = prompts::temperature(difficulty);
        let user_prompt = prompts::user_prompt(subject, difficulty, count);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            info!(attempt, max = MAX_ATTEMPTS, %subject, %difficulty, count, "LLM generation attempt");
            let outcome = provider
                .generate(prompts::SYSTEM_PROMPT, &user_prompt, temperature)
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    validator::validate_quiz_output(&raw, count).map_err(|e| e.to_string())
                });
            match outcome {
                Ok(questions) => {
                    info!(attempt, valid = questions.len(), "LLM generation succeeded");
                    return Ok((questions, QuizSource::Ai));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "LLM generation attempt failed");
                    last_error = e;
                }
            }
        }

        error!(
            attempts = MAX_ATTEMPTS,
            last_error = %last_error,
            "quiz generation failed, falling back to the practice bank"
        );
        self.fallback(subject, difficulty, count, rng)
    }

    fn fallback<R: Rng + ?Sized>(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
        rng: &mut R,
    ) -> Result<(Vec<Question>, QuizSource), BankError> {
        let questions = self
            .bank
            .fallback_questions(subject, difficulty, count, rng)?;
        Ok((questions, QuizSource::PracticeBank))
    }
}
