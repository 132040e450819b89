// src/monitor/detect.rs

//! Log-driven completion and error detection.
//!
//! Detection is a pure function of the recent log window, so it can be
//! tested without spawning anything. A [`Detector`] combines an optional
//! success predicate and an optional error predicate with an explicit
//! [`TieBreak`] for the case where both fire in the same poll.

use std::fmt;

use regex::Regex;

use crate::types::TieBreak;

/// The most recent lines of a task's log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogWindow {
    lines: Vec<String>,
}

impl LogWindow {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split raw log text into display lines, keeping at most `max_lines`.
    ///
    /// Carriage-return progress updates (`50%\r60%\r70%`) collapse to the
    /// text a terminal would show last, and blank lines are dropped.
    pub fn from_text(text: &str, max_lines: usize) -> Self {
        let lines: Vec<String> = text
            .split('\n')
            .map(|raw| {
                let raw = raw.trim_end_matches('\r');
                raw.rsplit('\r').next().unwrap_or(raw)
            })
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        let skip = lines.len().saturating_sub(max_lines);
        Self {
            lines: lines.into_iter().skip(skip).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A predicate over the recent log window.
pub trait LogPredicate: Send + Sync {
    /// The line that satisfied the predicate, if any.
    fn matched<'w>(&self, window: &'w LogWindow) -> Option<&'w str>;
}

/// Any `Fn(&LogWindow) -> bool` is a predicate; it reports the last line
/// as the match.
impl<F> LogPredicate for F
where
    F: Fn(&LogWindow) -> bool + Send + Sync,
{
    fn matched<'w>(&self, window: &'w LogWindow) -> Option<&'w str> {
        if self(window) {
            Some(window.last_line().unwrap_or(""))
        } else {
            None
        }
    }
}

/// Matches only the most recent line.
#[derive(Debug, Clone)]
pub struct LastLineMatches(pub Regex);

impl LogPredicate for LastLineMatches {
    fn matched<'w>(&self, window: &'w LogWindow) -> Option<&'w str> {
        window.last_line().filter(|line| self.0.is_match(line))
    }
}

/// Matches any line in the window, reporting the newest match.
///
/// Scanning the whole window means an error line that scrolled by between
/// two polls is still caught.
#[derive(Debug, Clone)]
pub struct AnyLineMatches(pub Regex);

impl LogPredicate for AnyLineMatches {
    fn matched<'w>(&self, window: &'w LogWindow) -> Option<&'w str> {
        window
            .lines()
            .iter()
            .rev()
            .find(|line| self.0.is_match(line))
            .map(String::as_str)
    }
}

/// Verdict for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Nothing,
    Success,
    Error { line: String },
}

#[derive(Default)]
pub struct Detector {
    success: Option<Box<dyn LogPredicate>>,
    error: Option<Box<dyn LogPredicate>>,
    tie_break: TieBreak,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("tie_break", &self.tie_break)
            .finish()
    }
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual configuration: success on the last line, error anywhere in
    /// the window.
    pub fn from_patterns(
        success: Option<Regex>,
        error: Option<Regex>,
        tie_break: TieBreak,
    ) -> Self {
        let mut detector = Self::new().with_tie_break(tie_break);
        if let Some(re) = success {
            detector = detector.with_success(LastLineMatches(re));
        }
        if let Some(re) = error {
            detector = detector.with_error(AnyLineMatches(re));
        }
        detector
    }

    pub fn with_success(mut self, predicate: impl LogPredicate + 'static) -> Self {
        self.success = Some(Box::new(predicate));
        self
    }

    pub fn with_error(mut self, predicate: impl LogPredicate + 'static) -> Self {
        self.error = Some(Box::new(predicate));
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn evaluate(&self, window: &LogWindow) -> Detection {
        let success = self
            .success
            .as_ref()
            .is_some_and(|p| p.matched(window).is_some());
        let error = self
            .error
            .as_ref()
            .and_then(|p| p.matched(window))
            .map(str::to_string);

        match (success, error) {
            (true, Some(line)) => match self.tie_break {
                TieBreak::Success => Detection::Success,
                TieBreak::Error => Detection::Error { line },
            },
            (true, None) => Detection::Success,
            (false, Some(line)) => Detection::Error { line },
            (false, None) => Detection::Nothing,
        }
    }
}
