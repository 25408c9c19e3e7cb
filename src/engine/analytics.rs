use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quiz::Difficulty;
use crate::session::result::AttemptRecord;

const RECENT_TREND: usize = 10;
const DASHBOARD_RECENT: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_quizzes: usize,
    pub avg_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub subject: String,
    pub attempts: usize,
    pub avg_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub difficulty: Difficulty,
    pub attempts: usize,
    pub avg_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecentAttempt {
    pub subject: String,
    pub difficulty: Difficulty,
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub overall: OverallStats,
    pub by_subject: Vec<SubjectStats>,
    pub by_difficulty: Vec<DifficultyStats>,
    pub recent: Vec<RecentAttempt>,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

pub fn performance(history: &[AttemptRecord]) -> Performance {
    if history.is_empty() {
        return Performance::default();
    }

    let scores: Vec<f64> = history.iter().map(|a| a.score).collect();
    let overall = OverallStats {
        total_quizzes: history.len(),
        avg_score: round_to(mean(&scores), 2),
        best_score: scores.iter().copied().fold(f64::MIN, f64::max),
        worst_score: scores.iter().copied().fold(f64::MAX, f64::min),
    };

    // Keyed by lowercase name; the first spelling seen is displayed.
    let mut subjects: BTreeMap<String, (String, Vec<f64>)> = BTreeMap::new();
    let mut difficulties: BTreeMap<Difficulty, Vec<f64>> = BTreeMap::new();
    for attempt in history {
        subjects
            .entry(attempt.subject.to_lowercase())
            .or_insert_with(|| (attempt.subject.clone(), Vec::new()))
            .1
            .push(attempt.score);
        difficulties
            .entry(attempt.difficulty)
            .or_default()
            .push(attempt.score);
    }

    let mut by_subject: Vec<SubjectStats> = subjects
        .into_values()
        .map(|(subject, scores)| SubjectStats {
            subject,
            attempts: scores.len(),
            avg_score: round_to(mean(&scores), 2),
        })
        .collect();
    // Stable sort keeps alphabetical order among equal attempt counts.
    by_subject.sort_by(|a, b| b.attempts.cmp(&a.attempts));

    let by_difficulty = difficulties
        .into_iter()
        .map(|(difficulty, scores)| DifficultyStats {
            difficulty,
            attempts: scores.len(),
            avg_score: round_to(mean(&scores), 2),
        })
        .collect();

    let mut newest_first: Vec<&AttemptRecord> = history.iter().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let recent = newest_first
        .into_iter()
        .take(RECENT_TREND)
        .map(|a| RecentAttempt {
            subject: a.subject.clone(),
            difficulty: a.difficulty,
            score: a.score,
            created_at: a.timestamp,
        })
        .collect();

    Performance {
        overall,
        by_subject,
        by_difficulty,
        recent,
    }
}

/// Headline numbers for the landing summary.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardSummary<'a> {
    pub total_quizzes: usize,
    /// One decimal place; `None` until a quiz has been scored.
    pub avg_score: Option<f64>,
    pub recent: Vec<&'a AttemptRecord>,
}

pub fn dashboard(history: &[AttemptRecord]) -> DashboardSummary<'_> {
    let scores: Vec<f64> = history.iter().map(|a| a.score).collect();
    let avg_score = (!scores.is_empty()).then(|| round_to(mean(&scores), 1));

    let mut recent: Vec<&AttemptRecord> = history.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(DASHBOARD_RECENT);

    DashboardSummary {
        total_quizzes: history.len(),
        avg_score,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::quiz::QuizSource;

    fn attempt(subject: &str, difficulty: Difficulty, score: f64, minute: i64) -> AttemptRecord {
        AttemptRecord {
            id: format!("local-{minute}-aaaaa"),
            subject: subject.to_string(),
            difficulty,
            source: QuizSource::PracticeBank,
            score,
            correct: 0,
            total: 10,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minute),
            elapsed_secs: 0.0,
            timed_out: false,
            results: Vec::new(),
        }
    }

    #[test]
    fn empty_history_is_all_zero() {
        let perf = performance(&[]);
        assert_eq!(perf.overall, OverallStats::default());
        assert!(perf.by_subject.is_empty());
        assert!(perf.recent.is_empty());
        assert_eq!(dashboard(&[]).avg_score, None);
    }

    #[test]
    fn overall_stats() {
        let history = vec![
            attempt("Physics", Difficulty::Beginner, 80.0, 0),
            attempt("Physics", Difficulty::Advanced, 40.0, 1),
            attempt("History", Difficulty::Beginner, 67.0, 2),
        ];
        let perf = performance(&history);
        assert_eq!(perf.overall.total_quizzes, 3);
        assert_eq!(perf.overall.avg_score, 62.33);
        assert_eq!(perf.overall.best_score, 80.0);
        assert_eq!(perf.overall.worst_score, 40.0);
    }

    #[test]
    fn subjects_sorted_by_attempts() {
        let history = vec![
            attempt("History", Difficulty::Beginner, 50.0, 0),
            attempt("Physics", Difficulty::Beginner, 80.0, 1),
            attempt("physics", Difficulty::Beginner, 90.0, 2),
            attempt("Biology", Difficulty::Beginner, 10.0, 3),
        ];
        let perf = performance(&history);
        let names: Vec<&str> = perf.by_subject.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["Physics", "Biology", "History"]);
        assert_eq!(perf.by_subject[0].attempts, 2);
        assert_eq!(perf.by_subject[0].avg_score, 85.0);
    }

    #[test]
    fn difficulties_in_tier_order() {
        let history = vec![
            attempt("A", Difficulty::Advanced, 30.0, 0),
            attempt("A", Difficulty::Beginner, 90.0, 1),
            attempt("A", Difficulty::Advanced, 35.0, 2),
        ];
        let perf = performance(&history);
        let tiers: Vec<Difficulty> = perf.by_difficulty.iter().map(|d| d.difficulty).collect();
        assert_eq!(tiers, vec![Difficulty::Beginner, Difficulty::Advanced]);
        assert_eq!(perf.by_difficulty[1].avg_score, 32.5);
    }

    #[test]
    fn recent_is_newest_first_and_capped() {
        let history: Vec<AttemptRecord> = (0..14)
            .map(|i| attempt("A", Difficulty::Beginner, i as f64, i))
            .collect();
        let perf = performance(&history);
        assert_eq!(perf.recent.len(), 10);
        assert_eq!(perf.recent[0].score, 13.0);
        assert_eq!(perf.recent[9].score, 4.0);

        let summary = dashboard(&history);
        assert_eq!(summary.total_quizzes, 14);
        assert_eq!(summary.recent.len(), 5);
        assert_eq!(summary.recent[0].score, 13.0);
        assert_eq!(summary.avg_score, Some(6.5));
    }
}
