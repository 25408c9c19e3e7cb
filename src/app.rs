use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::bank::QuestionBank;
use crate::config::Config;
use crate::engine::analytics::{self, DashboardSummary, Performance};
use crate::engine::grading::GradedQuiz;
use crate::generator::QuizGenerator;
use crate::generator::llm::{ChatCompletionsProvider, LlmProvider};
use crate::quiz::Quiz;
use crate::remote::{ApiClient, QuizBackend, RecordAttempt};
use crate::session::quiz::{QuizSession, Submission};
use crate::session::result::AttemptRecord;
use crate::session::start::{self, QuizRequest};
use crate::store::json_store::{ImportLeftover, JsonStore};
use crate::store::schema::AttemptHistoryData;

pub struct App {
    pub config: Config,
    pub bank: QuestionBank,
    pub history: AttemptHistoryData,
    pub store: Option<JsonStore>,
    backend: Option<Box<dyn QuizBackend>>,
    llm: Option<Box<dyn LlmProvider>>,
    rng: SmallRng,
}

impl App {
    /// Wire everything up from config. `store` is `None` for a session that
    /// should not touch disk.
    pub fn new(config: Config, store: Option<JsonStore>) -> Result<Self> {
        let mut bank = QuestionBank::embedded()?;
        if let Some(dir) = &config.bank_dir {
            let added = bank
                .load_dir(dir)
                .with_context(|| format!("loading question bank from {}", dir.display()))?;
            tracing::info!(files = added, dir = %dir.display(), "merged extra bank files");
        }

        let history = match &store {
            Some(store) => {
                match store.check_interrupted_import() {
                    Some(ImportLeftover::Restored) => {
                        tracing::warn!("restored history from an interrupted import's backup")
                    }
                    Some(ImportLeftover::Discarded) => {
                        tracing::info!("removed a stale backup from an interrupted import")
                    }
                    Some(ImportLeftover::Stranded) => {
                        tracing::warn!("history backup from an interrupted import left in place")
                    }
                    None => {}
                }
                store.load_history()
            }
            None => AttemptHistoryData::default(),
        };

        let backend: Option<Box<dyn QuizBackend>> = config.backend_configured().then(|| {
            Box::new(ApiClient::new(&config.api_base, Config::api_token())) as Box<dyn QuizBackend>
        });
        let llm: Option<Box<dyn LlmProvider>> = config
            .provider_settings()
            .map(|s| Box::new(ChatCompletionsProvider::new(s)) as Box<dyn LlmProvider>);

        Ok(Self {
            config,
            bank,
            history,
            store,
            backend,
            llm,
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn with_backend(mut self, backend: Box<dyn QuizBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn default_request(&self) -> QuizRequest {
        QuizRequest {
            subject: self.config.subject.clone(),
            difficulty: self.config.difficulty,
            count: self.config.question_count,
        }
    }

    pub fn start_quiz(&mut self, request: &QuizRequest) -> Result<Quiz> {
        let generator = QuizGenerator::new(self.llm.as_deref(), &self.bank);
        let quiz = start::start_quiz(
            request,
            self.backend.as_deref(),
            &generator,
            &self.bank,
            &mut self.rng,
        )?;
        tracing::info!(
            quiz_id = %quiz.quiz_id,
            source = quiz.source.as_str(),
            questions = quiz.len(),
            "quiz ready"
        );
        Ok(quiz)
    }

    pub fn begin(&self, quiz: Quiz) -> QuizSession {
        QuizSession::new(quiz, self.config.time_limit)
    }

    /// Resolve a submission to a graded result, record it in local history,
    /// and mirror locally graded attempts to the backend when there is one.
    pub fn finish(&mut self, session: &QuizSession, submission: Submission) -> Result<AttemptRecord> {
        let graded = match submission {
            Submission::Graded(graded) => {
                self.mirror_attempt(session, &graded);
                graded
            }
            Submission::Remote { quiz_id, answers } => {
                let backend = self
                    .backend
                    .as_deref()
                    .context("quiz needs the backend to grade it, but none is configured")?;
                let response = backend
                    .submit_quiz(&quiz_id, &answers)
                    .context("Submission failed")?;
                GradedQuiz {
                    score: response.score,
                    total: response.total,
                    correct: response.correct,
                    results: response.results,
                }
            }
        };

        let record = AttemptRecord::from_session(session, &graded);
        self.history
            .push_capped(record.clone(), self.config.history_limit);
        if let Some(store) = &self.store {
            store.save_history(&self.history)?;
        }
        Ok(record)
    }

    fn mirror_attempt(&self, session: &QuizSession, graded: &GradedQuiz) {
        let Some(backend) = self.backend.as_deref() else {
            return;
        };
        let attempt = RecordAttempt {
            subject: &session.quiz.subject,
            difficulty: session.quiz.difficulty,
            score: graded.score,
            total: graded.total,
            correct: graded.correct,
        };
        match backend.record_attempt(&attempt) {
            Ok(resp) => tracing::debug!(id = %resp.id, "attempt recorded on backend"),
            Err(e) => tracing::warn!(error = %e, "could not record attempt on backend"),
        }
    }

    pub fn performance(&self) -> Performance {
        analytics::performance(&self.history.attempts)
    }

    pub fn dashboard(&self) -> DashboardSummary<'_> {
        analytics::dashboard(&self.history.attempts)
    }
}
