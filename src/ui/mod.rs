//! Plain-terminal rendering. Every function returns the text to print so the
//! caller decides where it goes.

use std::fmt::Write;
use std::time::Duration;

use crossterm::style::{Color, Stylize};

use crate::engine::analytics::{DashboardSummary, Performance};
use crate::engine::grading::{self, ScoreBand};
use crate::session::quiz::QuizSession;
use crate::session::result::AttemptRecord;

const BAR_WIDTH: usize = 30;
const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

pub fn score_color(score: f64) -> Color {
    match ScoreBand::from_score(score) {
        ScoreBand::Good => Color::Green,
        ScoreBand::Fair => Color::Yellow,
        ScoreBand::Poor => Color::Red,
    }
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// `mm:ss`
pub fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn question(session: &QuizSession, remaining: Option<Duration>) -> String {
    let quiz = &session.quiz;
    let Some(item) = quiz.questions.get(session.current) else {
        return format!("{}\n", "This quiz has no questions.".red());
    };
    let mut out = String::new();

    let _ = write!(
        out,
        "{} · {}   {}/{} answered",
        quiz.subject.as_str().bold(),
        quiz.difficulty,
        session.answered_count(),
        session.total()
    );
    if let Some(left) = remaining {
        let timer = clock(left);
        let timer = if left <= Duration::from_secs(60) {
            timer.red().bold()
        } else {
            timer.stylize()
        };
        let _ = write!(out, "   ⏱ {timer}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", progress_bar(session.progress() / 100.0, BAR_WIDTH).cyan());
    let _ = writeln!(
        out,
        "\n{}",
        format!("Question {} of {}", session.current + 1, session.total()).dim()
    );
    let _ = writeln!(out, "{}\n", item.question.as_str().bold());

    let selected = session.answers.get(session.current).copied().flatten().map(usize::from);
    for (i, option) in item.options.iter().enumerate() {
        let label = OPTION_LABELS.get(i).copied().unwrap_or('?');
        if selected == Some(i) {
            let _ = writeln!(out, "  {} {}", format!("[{label}]").cyan().bold(), option.as_str().cyan());
        } else {
            let _ = writeln!(out, "  [{label}] {option}");
        }
    }
    out
}

pub fn help() -> &'static str {
    "1-4 or a-d: choose   n: next   p: previous   g <n>: go to question   s: submit   q: quit"
}

pub fn results(record: &AttemptRecord, show_explanations: bool) -> String {
    let mut out = String::new();
    let color = score_color(record.score);
    let _ = writeln!(
        out,
        "{}  {}",
        format!("{:.0}%", record.score).with(color).bold(),
        grading::headline(record.score).bold()
    );
    let _ = writeln!(
        out,
        "{} · {}   {} of {} correct   {}",
        record.subject,
        record.difficulty,
        record.correct,
        record.total,
        clock(Duration::from_secs_f64(record.elapsed_secs.max(0.0)))
    );
    if record.timed_out {
        let _ = writeln!(out, "{}", "Time ran out; unanswered questions count as wrong.".yellow());
    }

    for (i, result) in record.results.iter().enumerate() {
        let mark = if result.is_correct {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        let _ = writeln!(out, "\n{mark} {}. {}", i + 1, result.question);
        for (j, option) in result.options.iter().enumerate() {
            let label = OPTION_LABELS.get(j).copied().unwrap_or('?');
            let is_correct = usize::from(result.correct_index) == j;
            let is_selected = result.selected_index.map(usize::from) == Some(j);
            let line = format!("    [{label}] {option}");
            match (is_correct, is_selected) {
                (true, _) => {
                    let _ = writeln!(out, "{}", line.green());
                }
                (false, true) => {
                    let _ = writeln!(out, "{}", line.red());
                }
                _ => {
                    let _ = writeln!(out, "{line}");
                }
            }
        }
        if result.selected_index.is_none() {
            let _ = writeln!(out, "    {}", "(not answered)".dim());
        }
        if show_explanations && !result.explanation.is_empty() {
            let _ = writeln!(out, "    {}", result.explanation.as_str().italic());
        }
    }
    out
}

pub fn history(attempts: &[AttemptRecord], limit: usize) -> String {
    if attempts.is_empty() {
        return "No quizzes taken yet.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{:<17} {:<24} {:<13} {:>6} {:>7}",
            "Date", "Subject", "Difficulty", "Score", "Correct"
        )
        .bold()
    );
    for attempt in attempts.iter().rev().take(limit) {
        let score = format!("{:>5.0}%", attempt.score).with(score_color(attempt.score));
        let _ = writeln!(
            out,
            "{:<17} {:<24} {:<13} {score} {:>7}",
            attempt.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&attempt.subject, 24),
            attempt.difficulty.as_str(),
            format!("{}/{}", attempt.correct, attempt.total)
        );
    }
    out
}

pub fn dashboard(summary: &DashboardSummary<'_>) -> String {
    let avg = summary
        .avg_score
        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.1}%"));
    format!(
        "{} quizzes taken   average {}\n",
        summary.total_quizzes.to_string().bold(),
        avg.bold()
    )
}

pub fn performance(perf: &Performance) -> String {
    let mut out = String::new();
    let overall = &perf.overall;
    if overall.total_quizzes == 0 {
        return "No quizzes taken yet.\n".to_string();
    }
    let _ = writeln!(out, "{}", "Overall".bold().underlined());
    let _ = writeln!(
        out,
        "  quizzes {}   average {:.2}%   best {:.0}%   worst {:.0}%",
        overall.total_quizzes, overall.avg_score, overall.best_score, overall.worst_score
    );

    let _ = writeln!(out, "\n{}", "By subject".bold().underlined());
    for s in &perf.by_subject {
        let _ = writeln!(
            out,
            "  {:<24} {:>3} attempts  {} {}",
            truncate(&s.subject, 24),
            s.attempts,
            progress_bar(s.avg_score / 100.0, 20).with(score_color(s.avg_score)),
            format!("{:.2}%", s.avg_score)
        );
    }

    let _ = writeln!(out, "\n{}", "By difficulty".bold().underlined());
    for d in &perf.by_difficulty {
        let _ = writeln!(
            out,
            "  {:<24} {:>3} attempts  {} {}",
            d.difficulty.as_str(),
            d.attempts,
            progress_bar(d.avg_score / 100.0, 20).with(score_color(d.avg_score)),
            format!("{:.2}%", d.avg_score)
        );
    }

    if !perf.recent.is_empty() {
        let _ = writeln!(out, "\n{}", "Recent".bold().underlined());
        for r in &perf.recent {
            let _ = writeln!(
                out,
                "  {}  {:<24} {:<13} {}",
                r.created_at.format("%Y-%m-%d %H:%M"),
                truncate(&r.subject, 24),
                r.difficulty.as_str(),
                format!("{:.0}%", r.score).with(score_color(r.score))
            );
        }
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
