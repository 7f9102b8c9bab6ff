//! User-facing text shaping for progress updates and final answers.
//!
//! A [`ProgressView`] is the rolling status display for one turn: a header
//! line plus the last few tool calls, each with a state icon and a short
//! argument summary. The view is pure state; the throttle decides when a
//! render actually goes out.

use std::collections::HashMap;

use ferry_core::{AutonomyLevel, truncate_chars};

/// How many tool lines the progress view shows.
const VISIBLE_TOOL_LINES: usize = 5;

/// Appended when a final answer is cut at the response limit.
const TRUNCATION_MARKER: &str = "\n\n[Response truncated]";

/// Stands in for a final answer when the agent produced no text.
const EMPTY_ANSWER: &str = "No response from the agent";

/// Status text for conversations with progress updates disabled.
pub const THINKING_STATUS: &str = "Thinking...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ToolState {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct ToolLine {
    name: String,
    detail: Option<String>,
    state: ToolState,
}

impl ToolLine {
    fn format(&self) -> String {
        let icon = match self.state {
            ToolState::Running => "⏳ ",
            ToolState::Succeeded => "✓ ",
            ToolState::Failed => "",
        };
        match &self.detail {
            Some(detail) => format!("{icon}{}: {detail}", self.name),
            None => format!("{icon}{}", self.name),
        }
    }
}

/// Rolling progress display for one turn.
#[derive(Debug)]
pub struct ProgressView {
    header: String,
    lines: Vec<ToolLine>,
    by_call: HashMap<String, usize>,
}

impl ProgressView {
    /// Create a view for a turn.
    ///
    /// `resuming` marks turns continuing an existing agent session; the
    /// header carries an indicator for that, or for a fully autonomous run.
    #[must_use]
    pub fn new(resuming: bool, autonomy: AutonomyLevel) -> Self {
        let header = if autonomy.skips_permission_checks() {
            "Working... (unsafe)".to_owned()
        } else if resuming {
            "Working... (continuing)".to_owned()
        } else {
            "Working...".to_owned()
        };
        Self {
            header,
            lines: Vec::new(),
            by_call: HashMap::new(),
        }
    }

    /// Add a running tool line.
    pub fn tool_started(&mut self, call_id: &str, name: &str, detail: Option<&str>) {
        let line = ToolLine {
            name: name.to_owned(),
            detail: detail.map(|d| shape_detail(name, d)),
            state: ToolState::Running,
        };
        self.lines.push(line);
        let _ = self.by_call.insert(call_id.to_owned(), self.lines.len() - 1);
    }

    /// Mark a tool line finished, flipping its icon in place.
    pub fn tool_finished(&mut self, call_id: &str, ok: bool) {
        if let Some(&index) = self.by_call.get(call_id) {
            self.lines[index].state = if ok {
                ToolState::Succeeded
            } else {
                ToolState::Failed
            };
        }
    }

    /// Render the current display text.
    #[must_use]
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return self.header.clone();
        }
        let visible = self
            .lines
            .iter()
            .rev()
            .take(VISIBLE_TOOL_LINES)
            .collect::<Vec<_>>();
        let tail = visible
            .into_iter()
            .rev()
            .map(ToolLine::format)
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{tail}", self.header)
    }
}

/// Shape the final answer for display.
///
/// The terminal event's text wins over the accumulated fragments; an empty
/// answer gets a fixed placeholder; anything over `limit_chars` is cut with
/// a truncation marker.
#[must_use]
pub fn final_answer(terminal_text: Option<&str>, accumulated: &str, limit_chars: usize) -> String {
    let text = match terminal_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => accumulated,
    };
    let text = text.trim();
    if text.is_empty() {
        return EMPTY_ANSWER.to_owned();
    }
    truncate_chars(text, limit_chars, TRUNCATION_MARKER).into_owned()
}

/// Shorten a tool's argument summary the way each tool reads best: paths
/// keep their tail, commands and patterns keep their head.
fn shape_detail(name: &str, detail: &str) -> String {
    match name {
        "read" | "write" | "edit" => path_detail(detail),
        "bash" | "glob" => truncate_chars(detail, 40, "...").into_owned(),
        "grep" | "web_search" => format!("'{}'", truncate_chars(detail, 25, "...")),
        _ => truncate_chars(detail, 50, "...").into_owned(),
    }
}

fn path_detail(path: &str) -> String {
    let count = path.chars().count();
    if count > 50 {
        let tail: String = path.chars().skip(count - 47).collect();
        format!("...{tail}")
    } else {
        path.to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
