use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub enum AppEvent {
    Line(String),
    /// No input within the tick; lets the caller check the timer.
    Tick,
    Eof,
}

/// Reads stdin on a background thread so the quiz loop can keep an eye on
/// the clock while waiting for the next answer.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let event = match line {
                    Ok(line) => AppEvent::Line(line),
                    Err(_) => break,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(AppEvent::Eof);
        });

        Self { rx, tick_rate }
    }

    pub fn next(&self) -> AppEvent {
        match self.rx.recv_timeout(self.tick_rate) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => AppEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => AppEvent::Eof,
        }
    }
}

/// One line of input while taking a quiz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizCommand {
    /// Zero-based option index.
    Select(usize),
    Next,
    Prev,
    /// Zero-based question index.
    Jump(usize),
    Submit,
    Help,
    Quit,
}

/// Options are `1`-`4` or `a`-`d`; `g 3` jumps to question three.
pub fn parse_command(line: &str) -> Option<QuizCommand> {
    let line = line.trim().to_ascii_lowercase();
    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let arg = parts.next();

    let command = match (head, arg) {
        ("n" | "next", None) => QuizCommand::Next,
        ("p" | "prev", None) => QuizCommand::Prev,
        ("s" | "submit", None) => QuizCommand::Submit,
        ("q" | "quit", None) => QuizCommand::Quit,
        ("h" | "?" | "help", None) => QuizCommand::Help,
        ("g" | "go", Some(n)) => QuizCommand::Jump(n.parse::<usize>().ok()?.checked_sub(1)?),
        (single, None) if single.len() == 1 => {
            let c = single.chars().next()?;
            match c {
                '1'..='4' => QuizCommand::Select(c as usize - '1' as usize),
                'a'..='d' => QuizCommand::Select(c as usize - 'a' as usize),
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_keys() {
        assert_eq!(parse_command("1"), Some(QuizCommand::Select(0)));
        assert_eq!(parse_command(" D "), Some(QuizCommand::Select(3)));
        assert_eq!(parse_command("5"), None);
        assert_eq!(parse_command("e"), None);
    }

    #[test]
    fn navigation() {
        assert_eq!(parse_command("n"), Some(QuizCommand::Next));
        assert_eq!(parse_command("prev"), Some(QuizCommand::Prev));
        assert_eq!(parse_command("g 3"), Some(QuizCommand::Jump(2)));
        assert_eq!(parse_command("g 0"), None);
        assert_eq!(parse_command("g x"), None);
        assert_eq!(parse_command("submit"), Some(QuizCommand::Submit));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("n 2"), None);
    }
}
