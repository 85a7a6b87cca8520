//! Failed-transition records and user-facing diagnostics.
//!
//! Every rejected transition attempt leaves a `FailedParseReason` keyed by
//! input position. When no head reaches the goal, the reasons at the
//! furthest position are distilled into one located issue carrying the
//! full set of terminals that would have been accepted there.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use espalier_runtime::{LookaheadSet, RuleIndex, RuntimeRuleSet};

/// Why one transition attempt was dropped.
#[derive(Debug, Clone)]
pub enum FailedParseReason {
    /// WIDTH: the terminal did not match the text at this position.
    WidthMismatch { position: usize, terminal: RuleIndex },
    /// A lookahead guard rejected the continuation.
    LookaheadRejected { position: usize, expected: LookaheadSet },
    /// GRAFT: the precedence rules rejected the extension.
    GraftRejected { position: usize, parent: RuleIndex, child: RuleIndex },
    /// An embedded sub-parse failed; its own diagnostics are wrapped, not
    /// flattened.
    Embedded {
        position: usize,
        expected: BTreeSet<String>,
        message: String,
    },
}

impl FailedParseReason {
    pub fn position(&self) -> usize {
        match self {
            FailedParseReason::WidthMismatch { position, .. }
            | FailedParseReason::LookaheadRejected { position, .. }
            | FailedParseReason::GraftRejected { position, .. }
            | FailedParseReason::Embedded { position, .. } => *position,
        }
    }

    /// The terminal tags this attempt would have accepted.
    pub fn expected_tags(&self, rules: &RuntimeRuleSet) -> BTreeSet<String> {
        match self {
            FailedParseReason::WidthMismatch { terminal, .. } => {
                BTreeSet::from([rules.rule(*terminal).tag.clone()])
            }
            FailedParseReason::LookaheadRejected { expected, .. } => {
                expected.tags(rules).into_iter().collect()
            }
            FailedParseReason::GraftRejected { .. } => BTreeSet::new(),
            FailedParseReason::Embedded { expected, .. } => expected.clone(),
        }
    }
}

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    Error,
    AmbiguityWarning,
}

/// Line/column location within the sentence (1-based, computed from a
/// line-start index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLocation {
    pub position: usize,
    pub line: u32,
    pub column: u32,
}

/// One reported problem: a location, a context snippet (the offending
/// line), and the terminals that were expected there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseIssue {
    pub kind: IssueKind,
    pub location: InputLocation,
    pub context: String,
    pub expected: BTreeSet<String>,
    pub message: String,
}

/// Byte offsets of every line start, for position → line/column mapping.
pub fn line_starts(sentence: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in sentence.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

pub fn location_of(sentence: &str, position: usize) -> InputLocation {
    let starts = line_starts(sentence);
    let line_idx = match starts.binary_search(&position) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    InputLocation {
        position,
        line: line_idx as u32 + 1,
        column: (position - starts[line_idx]) as u32 + 1,
    }
}

/// The text of the line containing `position`.
pub fn context_line(sentence: &str, position: usize) -> String {
    let starts = line_starts(sentence);
    let line_idx = match starts.binary_search(&position) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    let start = starts[line_idx];
    let end = starts
        .get(line_idx + 1)
        .map(|&e| e.saturating_sub(1))
        .unwrap_or(sentence.len());
    sentence[start..end].to_string()
}

/// Distill all recorded failures into the single issue at the furthest
/// position.
pub fn failure_issue(
    sentence: &str,
    rules: &RuntimeRuleSet,
    failures: &[FailedParseReason],
) -> ParseIssue {
    let furthest = failures.iter().map(|f| f.position()).max().unwrap_or(0);
    let mut expected = BTreeSet::new();
    for f in failures.iter().filter(|f| f.position() == furthest) {
        expected.extend(f.expected_tags(rules));
    }
    let location = location_of(sentence, furthest);
    let message = if expected.is_empty() {
        format!("parse failed at line {}, column {}", location.line, location.column)
    } else {
        format!(
            "parse failed at line {}, column {}: expected one of {}",
            location.line,
            location.column,
            expected.iter().cloned().collect::<Vec<_>>().join(", ")
        )
    };
    ParseIssue {
        kind: IssueKind::Error,
        location,
        context: context_line(sentence, furthest),
        expected,
        message,
    }
}
