use crate::error::{ProgressError, Result};
use crate::lines;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// The character between the brackets of a task checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    #[serde(rename = " ")]
    NotStarted,
    #[serde(rename = "/")]
    InProgress,
    #[serde(rename = "x")]
    Done,
    #[serde(rename = "-")]
    NotApplicable,
    #[serde(rename = "!")]
    Blocked,
    #[serde(rename = "?")]
    Unclear,
}

impl Marker {
    /// All markers in number-key order (`1` through `6`).
    pub fn all() -> &'static [Marker] {
        &[
            Marker::NotStarted,
            Marker::InProgress,
            Marker::Done,
            Marker::NotApplicable,
            Marker::Blocked,
            Marker::Unclear,
        ]
    }

    pub fn as_char(self) -> char {
        match self {
            Marker::NotStarted => ' ',
            Marker::InProgress => '/',
            Marker::Done => 'x',
            Marker::NotApplicable => '-',
            Marker::Blocked => '!',
            Marker::Unclear => '?',
        }
    }

    pub fn from_char(c: char) -> Option<Marker> {
        Marker::all().iter().copied().find(|m| m.as_char() == c)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Marker::NotStarted => "☐",
            Marker::InProgress => "🔄",
            Marker::Done => "☑",
            Marker::NotApplicable => "➖",
            Marker::Blocked => "❌",
            Marker::Unclear => "❓",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Marker::NotStarted => "not started",
            Marker::InProgress => "in progress",
            Marker::Done => "done",
            Marker::NotApplicable => "not applicable",
            Marker::Blocked => "blocked",
            Marker::Unclear => "needs decision",
        }
    }

    /// Left-click cycle: ☐ → 🔄 → ☑ → ☐.
    ///
    /// The other three markers are only reachable by explicit selection, so
    /// asking for their successor is an error rather than a guess.
    pub fn next_primary(self) -> Result<Marker> {
        match self {
            Marker::NotStarted => Ok(Marker::InProgress),
            Marker::InProgress => Ok(Marker::Done),
            Marker::Done => Ok(Marker::NotStarted),
            other => Err(ProgressError::NotInPrimaryCycle(other.as_char())),
        }
    }

    pub fn is_primary(self) -> bool {
        matches!(
            self,
            Marker::NotStarted | Marker::InProgress | Marker::Done
        )
    }

    /// Number keys `1`..`6` select a marker directly.
    pub fn from_key(key: &str) -> Result<Marker> {
        let idx = match key {
            "1" => 0,
            "2" => 1,
            "3" => 2,
            "4" => 3,
            "5" => 4,
            "6" => 5,
            _ => return Err(ProgressError::UnsupportedKey(key.to_string())),
        };
        Ok(Marker::all()[idx])
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl std::str::FromStr for Marker {
    type Err = ProgressError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Marker::from_char(c).ok_or_else(|| ProgressError::UnsupportedMarker(s.to_string()))
            }
            _ => Err(ProgressError::UnsupportedMarker(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkbox detection
// ---------------------------------------------------------------------------

static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| Regex::new(r"^[ \t]*-[ \t]*\[([ /x\-!?])\]").unwrap())
}

/// A checkbox line as seen in the canonical split of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckboxLine {
    pub index: usize,
    pub marker: Marker,
    pub text: String,
}

/// Parse `line` as a checkbox. Bracketed content other than the six markers
/// (`[X]`, `[参考]`, `[]`) is not a checkbox.
pub fn detect(index: usize, line: &str) -> Option<CheckboxLine> {
    let (body, _) = lines::strip_ending(line);
    let caps = checkbox_re().captures(body)?;
    let marker_match = caps.get(1)?;
    let marker = Marker::from_char(marker_match.as_str().chars().next()?)?;
    let rest = &body[marker_match.end() + 1..];
    let text = rest.strip_prefix(' ').unwrap_or(rest).to_string();
    Some(CheckboxLine {
        index,
        marker,
        text,
    })
}

/// Rewrite the marker of a checkbox line, keeping every other byte
/// (indentation, text, line ending) as it was. `None` if `line` is not a
/// checkbox.
pub fn render(line: &str, marker: Marker) -> Option<String> {
    let caps = checkbox_re().captures(line)?;
    let span = caps.get(1)?.range();
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..span.start]);
    out.push(marker.as_char());
    out.push_str(&line[span.end..]);
    Some(out)
}

/// Every checkbox line of `content`, indexed by the canonical split.
pub fn checkbox_lines(content: &str) -> Vec<CheckboxLine> {
    lines::split(content)
        .into_iter()
        .enumerate()
        .filter_map(|(i, line)| detect(i, line))
        .collect()
}

/// Per-marker counts for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub not_started: usize,
    pub in_progress: usize,
    pub done: usize,
    pub not_applicable: usize,
    pub blocked: usize,
    pub unclear: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.not_started
            + self.in_progress
            + self.done
            + self.not_applicable
            + self.blocked
            + self.unclear
    }

    fn bump(&mut self, marker: Marker) {
        match marker {
            Marker::NotStarted => self.not_started += 1,
            Marker::InProgress => self.in_progress += 1,
            Marker::Done => self.done += 1,
            Marker::NotApplicable => self.not_applicable += 1,
            Marker::Blocked => self.blocked += 1,
            Marker::Unclear => self.unclear += 1,
        }
    }
}

pub fn tally(content: &str) -> Tally {
    let mut t = Tally::default();
    for cb in checkbox_lines(content) {
        t.bump(cb.marker);
    }
    t
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
