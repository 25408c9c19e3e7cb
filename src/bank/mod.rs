pub mod sampler;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use rust_embed::RustEmbed;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::quiz::{Difficulty, Question};

pub const GENERAL_KNOWLEDGE: &str = "General Knowledge";

/// Subjects offered for quiz generation. The embedded bank covers a subset;
/// the rest are served by the remote generator or resolve through
/// [`QuestionBank::fallback_questions`].
pub const KNOWN_SUBJECTS: &[&str] = &[
    "Computer Science",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Geography",
    "English Literature",
    "Economics",
    "Psychology",
    "General Knowledge",
    "Data Science",
    "Machine Learning",
    "Networking",
    "Cybersecurity",
    "Software Engineering",
];

#[derive(RustEmbed)]
#[folder = "assets/bank/"]
struct BankAssets;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("no fallback questions available for {subject}/{difficulty}")]
    NoQuestions {
        subject: String,
        difficulty: Difficulty,
    },
    #[error("failed to parse bank file {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read bank directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk shape of one subject: `{"subject": "...", "beginner": [...], ...}`.
#[derive(Debug, Deserialize)]
struct SubjectFile {
    subject: String,
    #[serde(default)]
    beginner: Vec<Question>,
    #[serde(default)]
    intermediate: Vec<Question>,
    #[serde(default)]
    advanced: Vec<Question>,
}

#[derive(Debug, Default, Clone)]
struct SubjectBank {
    name: String,
    tiers: BTreeMap<Difficulty, Vec<Question>>,
}

impl SubjectBank {
    fn tier(&self, difficulty: Difficulty) -> &[Question] {
        self.tiers.get(&difficulty).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-memory question bank keyed by lowercase subject name.
#[derive(Debug, Default, Clone)]
pub struct QuestionBank {
    subjects: BTreeMap<String, SubjectBank>,
}

impl QuestionBank {
    /// Bank built from the JSON files compiled into the binary.
    pub fn embedded() -> Result<Self, BankError> {
        let mut bank = Self::default();
        for name in BankAssets::iter() {
            let Some(file) = BankAssets::get(&name) else {
                continue;
            };
            bank.add_json(&name, &file.data)?;
        }
        debug!(subjects = bank.subjects.len(), "loaded embedded question bank");
        Ok(bank)
    }

    /// Merge every `*.json` file from `dir` into the bank. Questions for a
    /// subject/difficulty already present are appended.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, BankError> {
        let io_err = |source| BankError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path).map_err(io_err)?;
            self.add_json(&path.display().to_string(), &content)?;
            loaded += 1;
        }
        debug!(dir = %dir.display(), files = loaded, "merged extra bank files");
        Ok(loaded)
    }

    fn add_json(&mut self, name: &str, content: &[u8]) -> Result<(), BankError> {
        let file: SubjectFile = serde_json::from_slice(content).map_err(|source| BankError::Parse {
            name: name.to_string(),
            source,
        })?;
        let entry = self
            .subjects
            .entry(file.subject.to_lowercase())
            .or_insert_with(|| SubjectBank {
                name: file.subject.clone(),
                tiers: BTreeMap::new(),
            });
        for (difficulty, questions) in [
            (Difficulty::Beginner, file.beginner),
            (Difficulty::Intermediate, file.intermediate),
            (Difficulty::Advanced, file.advanced),
        ] {
            entry.tiers.entry(difficulty).or_default().extend(questions);
        }
        Ok(())
    }

    /// Display names of every subject in the bank, alphabetically.
    pub fn subjects(&self) -> Vec<&str> {
        self.subjects.values().map(|s| s.name.as_str()).collect()
    }

    pub fn question_count(&self, subject: &str, difficulty: Difficulty) -> usize {
        self.pool(subject, difficulty).len()
    }

    /// Exact (case-insensitive) lookup of one subject's tier.
    pub fn pool(&self, subject: &str, difficulty: Difficulty) -> &[Question] {
        self.subjects
            .get(&subject.trim().to_lowercase())
            .map(|s| s.tier(difficulty))
            .unwrap_or(&[])
    }

    /// Sample from the exact subject/difficulty tier. An unknown subject or an
    /// empty tier yields no questions.
    pub fn sample_from_bank<R: Rng + ?Sized>(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        sampler::sample(self.pool(subject, difficulty), count, rng)
    }

    /// Resolve the widest sensible pool for a subject: exact match, then the
    /// first subject whose name contains the request, then General Knowledge,
    /// then every subject's questions at that difficulty.
    pub fn resolve_pool(&self, subject: &str, difficulty: Difficulty) -> Vec<&Question> {
        let exact = self.pool(subject, difficulty);
        if !exact.is_empty() {
            return exact.iter().collect();
        }

        let needle = subject.trim().to_lowercase();
        if !needle.is_empty()
            && let Some(loose) = self
                .subjects
                .iter()
                .filter(|(key, _)| key.contains(&needle))
                .map(|(_, s)| s.tier(difficulty))
                .find(|tier| !tier.is_empty())
        {
            return loose.iter().collect();
        }

        let general = self.pool(GENERAL_KNOWLEDGE, difficulty);
        if !general.is_empty() {
            return general.iter().collect();
        }

        self.subjects
            .values()
            .flat_map(|s| s.tier(difficulty))
            .collect()
    }

    /// Sample `count` questions through [`Self::resolve_pool`], clamping the
    /// request to the pool size.
    pub fn fallback_questions<R: Rng + ?Sized>(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>, BankError> {
        let pool = self.resolve_pool(subject, difficulty);
        if pool.len() < count {
            warn!(
                available = pool.len(),
                requested = count,
                %subject,
                %difficulty,
                "not enough fallback questions"
            );
        }
        let count = count.min(pool.len());
        if count == 0 {
            return Err(BankError::NoQuestions {
                subject: subject.to_string(),
                difficulty,
            });
        }
        Ok(sampler::sample(&pool, count, rng)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn question(text: &str) -> Question {
        Question {
            question: text.to_string(),
            options: ["a", "b", "c", "d"].map(String::from),
            correct_index: 0,
            explanation: "because".to_string(),
        }
    }

    fn small_bank() -> QuestionBank {
        let mut bank = QuestionBank::default();
        let chem = serde_json::json!({
            "subject": "Organic Chemistry",
            "beginner": [
                {"question": "c1", "options": ["a","b","c","d"], "correct_index": 1, "explanation": "e"}
            ]
        });
        bank.add_json("chem", chem.to_string().as_bytes()).unwrap();
        bank
    }

    #[test]
    fn embedded_bank_has_every_tier() {
        let bank = QuestionBank::embedded().unwrap();
        let subjects = bank.subjects();
        for name in ["Computer Science", "Mathematics", "Physics", GENERAL_KNOWLEDGE] {
            assert!(subjects.contains(&name), "missing {name}");
            for d in Difficulty::ALL {
                assert!(bank.question_count(name, d) >= 7, "{name}/{d} too small");
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let bank = QuestionBank::embedded().unwrap();
        assert_eq!(
            bank.question_count("computer science", Difficulty::Beginner),
            bank.question_count("Computer Science", Difficulty::Beginner)
        );
    }

    #[test]
    fn sample_from_bank_unknown_subject_is_empty() {
        let bank = QuestionBank::embedded().unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(
            bank.sample_from_bank("Astrology", Difficulty::Beginner, 5, &mut rng)
                .is_empty()
        );
    }

    #[test]
    fn sample_from_bank_respects_count() {
        let bank = QuestionBank::embedded().unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let picked = bank.sample_from_bank("Physics", Difficulty::Advanced, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        let pool = bank.pool("Physics", Difficulty::Advanced);
        assert!(picked.iter().all(|q| pool.contains(q)));
    }

    #[test]
    fn fallback_uses_substring_match() {
        let bank = small_bank();
        let mut rng = SmallRng::seed_from_u64(5);
        let picked = bank
            .fallback_questions("chemistry", Difficulty::Beginner, 3, &mut rng)
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].question, "c1");
    }

    #[test]
    fn fallback_prefers_general_knowledge_then_everything() {
        let bank = QuestionBank::embedded().unwrap();
        let pool = bank.resolve_pool("Astrology", Difficulty::Intermediate);
        let general = bank.pool(GENERAL_KNOWLEDGE, Difficulty::Intermediate);
        assert_eq!(pool.len(), general.len());

        // No general knowledge: every subject's tier is pooled.
        let mut bank = small_bank();
        let other = serde_json::json!({
            "subject": "Art",
            "beginner": [
                {"question": "a1", "options": ["a","b","c","d"], "correct_index": 0, "explanation": "e"}
            ]
        });
        bank.add_json("art", other.to_string().as_bytes()).unwrap();
        let pool = bank.resolve_pool("Zoology", Difficulty::Beginner);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn fallback_with_nothing_available_errors() {
        let bank = small_bank();
        let mut rng = SmallRng::seed_from_u64(5);
        let err = bank
            .fallback_questions("chemistry", Difficulty::Advanced, 3, &mut rng)
            .unwrap_err();
        assert!(matches!(err, BankError::NoQuestions { .. }));
    }

    #[test]
    fn merging_appends_to_existing_subject() {
        let mut bank = small_bank();
        let more = serde_json::json!({
            "subject": "ORGANIC CHEMISTRY",
            "beginner": [serde_json::to_value(question("c2")).unwrap()]
        });
        bank.add_json("more", more.to_string().as_bytes()).unwrap();
        assert_eq!(bank.question_count("Organic Chemistry", Difficulty::Beginner), 2);
        assert_eq!(bank.subjects(), vec!["Organic Chemistry"]);
    }

    #[test]
    fn invalid_bank_file_is_rejected() {
        let mut bank = QuestionBank::default();
        let bad = br#"{"subject": "X", "beginner": [{"question": "q", "options": ["a"], "correct_index": 0, "explanation": "e"}]}"#;
        assert!(matches!(
            bank.add_json("bad", bad),
            Err(BankError::Parse { .. })
        ));
    }

    #[test]
    fn load_dir_merges_json_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = serde_json::json!({
            "subject": "Biology",
            "advanced": [serde_json::to_value(question("b1")).unwrap()]
        });
        fs::write(dir.path().join("biology.json"), file.to_string()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut bank = QuestionBank::embedded().unwrap();
        assert_eq!(bank.load_dir(dir.path()).unwrap(), 1);
        assert_eq!(bank.question_count("biology", Difficulty::Advanced), 1);
    }
}
