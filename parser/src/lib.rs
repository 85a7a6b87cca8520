//! Left-corner GSS parsing engine for Espalier rule sets.
//!
//! A [`Parser`] wraps one compiled [`RuntimeRuleSet`] and owns the cache
//! of parsing automatons built from it (one per goal rule and automaton
//! kind, built lazily, at most once). Parsing itself runs a
//! graph-structured-stack engine over the automaton: all candidate
//! derivations grow in lock-step rounds, ambiguous derivations merge, and
//! skip rules and embedded grammars are handled transparently.
//!
//! ```no_run
//! use espalier_runtime::RuleSetBuilder;
//! use espalier_parser::Parser;
//!
//! let rules = RuleSetBuilder::new("abc")
//!     .literal("'a'", "a")
//!     .literal("'b'", "b")
//!     .concatenation("S", &["'a'", "'b'"])
//!     .build();
//! let parser = Parser::new(rules);
//! let result = parser.parse_for_goal("S", "ab").unwrap();
//! assert!(result.tree.is_some());
//! ```

mod automaton;
mod closure;
mod gss;
mod scanner;

#[cfg(test)]
mod tests;

pub use automaton::{Automata, AutomatonKind, ParseAction, ParserStateSet, StateNumber, Transition};
pub use closure::{ClosureCache, RuleFirst};
pub use gss::{FailedParseReason, InputLocation, IssueKind, ParseIssue};
pub use scanner::{Scanner, TextScanner};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use espalier_runtime::{ParseTree, RuntimeRuleSet};

use gss::{failure_issue, location_of, EngineConfig, RuntimeParser};

/// Errors that abort a parse call outright. A failed parse is not an
/// error: it comes back as an issue-bearing [`ParseResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// The cooperative interrupt flag was set.
    Interrupted(String),
    /// No rule with the requested tag exists as a parse goal.
    UnknownGoalRule(String),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Interrupted(m) => write!(f, "parse interrupted: {m}"),
            ParserError::UnknownGoalRule(g) => write!(f, "unknown goal rule '{g}'"),
        }
    }
}

impl std::error::Error for ParserError {}

/// Configuration of one parse call.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub goal_rule: String,
    pub kind: AutomatonKind,
    /// Attach a located error issue to failed parses.
    pub report_errors: bool,
    /// Attach warnings for spans where ambiguous derivations merged.
    pub report_grammar_ambiguities: bool,
    /// Memoize skip-rule matches per input position.
    pub cache_skip: bool,
}

impl ParseOptions {
    pub fn for_goal(goal: &str) -> Self {
        ParseOptions {
            goal_rule: goal.to_string(),
            kind: AutomatonKind::LookaheadOne,
            report_errors: true,
            report_grammar_ambiguities: false,
            cache_skip: true,
        }
    }
}

/// Outcome of a parse call: the shared tree (absent on failure), run
/// metadata, and any issues.
#[derive(Debug)]
pub struct ParseResult {
    pub tree: Option<ParseTree>,
    /// Number of grow rounds the engine ran.
    pub rounds: u32,
    /// Largest number of simultaneously growing heads.
    pub max_heads: usize,
    pub issues: Vec<ParseIssue>,
}

/// One way the input could legally continue at a position: the expected
/// terminal and the chain of rules leading down to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spine {
    pub terminal: String,
    pub rule_path: Vec<String>,
}

/// Cooperative cancellation: a flag checked at the top of every engine
/// round. There is no internal timeout; callers drive interruption
/// externally (e.g. from a watchdog thread).
#[derive(Debug, Default)]
pub struct InterruptFlag {
    flag: AtomicBool,
    message: Mutex<String>,
}

impl InterruptFlag {
    pub fn interrupt(&self, message: &str) {
        *self.message.lock().expect("interrupt message poisoned") = message.to_string();
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub(crate) fn taken_message(&self) -> Option<String> {
        if self.flag.load(Ordering::SeqCst) {
            Some(self.message.lock().expect("interrupt message poisoned").clone())
        } else {
            None
        }
    }
}

/// A parser over one compiled rule set.
///
/// The rule set and its automatons are immutable once built and may be
/// shared; all per-parse state is private to each call.
pub struct Parser {
    rules: Arc<RuntimeRuleSet>,
    automata: Automata,
    interrupt: Arc<InterruptFlag>,
}

impl Parser {
    pub fn new(rules: Arc<RuntimeRuleSet>) -> Self {
        Parser {
            rules,
            automata: Automata::new(),
            interrupt: Arc::new(InterruptFlag::default()),
        }
    }

    pub fn rule_set(&self) -> &Arc<RuntimeRuleSet> {
        &self.rules
    }

    /// Request cancellation of the parse currently running (if any); it
    /// aborts at its next round with [`ParserError::Interrupted`].
    pub fn interrupt(&self, message: &str) {
        self.interrupt.interrupt(message);
    }

    /// Pre-build the automaton for a goal rule without parsing anything.
    /// Subsequent builds for the same goal and kind are no-ops.
    pub fn build_for(&self, goal: &str, kind: AutomatonKind) -> Result<(), ParserError> {
        let automaton = self.automaton_for(goal, kind)?;
        automaton.build_all();
        automaton::dump_if_requested(&automaton);
        Ok(())
    }

    /// Parse with default options for the given goal rule.
    pub fn parse_for_goal(&self, goal: &str, sentence: &str) -> Result<ParseResult, ParserError> {
        self.parse(sentence, &ParseOptions::for_goal(goal))
    }

    pub fn parse(&self, sentence: &str, options: &ParseOptions) -> Result<ParseResult, ParserError> {
        self.interrupt.clear();
        let automaton = self.automaton_for(&options.goal_rule, options.kind)?;
        let engine = RuntimeParser::new(
            automaton,
            &self.automata,
            sentence,
            EngineConfig {
                start_pos: 0,
                possible_eot: None,
                skip_enabled: true,
                cache_skip: options.cache_skip,
                collect_expected_at: None,
            },
            Arc::clone(&self.interrupt),
        );
        let outcome = engine.run()?;
        let mut issues = Vec::new();
        let tree = match outcome.root {
            Some(root) => {
                if options.report_grammar_ambiguities {
                    let mut spans = outcome.ambiguous.clone();
                    spans.sort_unstable();
                    spans.dedup();
                    for (rule, start, _end) in spans {
                        let location = location_of(sentence, start);
                        issues.push(ParseIssue {
                            kind: IssueKind::AmbiguityWarning,
                            location,
                            context: gss::context_line(sentence, start),
                            expected: BTreeSet::new(),
                            message: format!(
                                "ambiguous derivations of '{}' merged",
                                self.rules.rule(rule).tag
                            ),
                        });
                    }
                }
                Some(ParseTree::new(outcome.tree_nodes, root, outcome.trailing_skip))
            }
            None => {
                if options.report_errors {
                    issues.push(failure_issue(sentence, &self.rules, &outcome.failures));
                }
                None
            }
        };
        Ok(ParseResult {
            tree,
            rounds: outcome.rounds,
            max_heads: outcome.max_heads,
            issues,
        })
    }

    /// What could legally appear at `position`: expected terminals, each
    /// with the chain of rules leading to it. Used for editor completion.
    pub fn expected_at(
        &self,
        sentence: &str,
        position: usize,
        options: &ParseOptions,
    ) -> Result<Vec<Spine>, ParserError> {
        self.interrupt.clear();
        let position = position.min(sentence.len());
        let prefix = &sentence[..position];
        let automaton = self.automaton_for(&options.goal_rule, options.kind)?;
        let engine = RuntimeParser::new(
            automaton,
            &self.automata,
            prefix,
            EngineConfig {
                start_pos: 0,
                possible_eot: None,
                skip_enabled: true,
                cache_skip: options.cache_skip,
                collect_expected_at: Some(position),
            },
            Arc::clone(&self.interrupt),
        );
        let outcome = engine.run()?;
        Ok(outcome.expected)
    }

    /// Terminal-only projection of [`Parser::expected_at`].
    pub fn expected_terminals_at(
        &self,
        sentence: &str,
        position: usize,
        options: &ParseOptions,
    ) -> Result<BTreeSet<String>, ParserError> {
        Ok(self
            .expected_at(sentence, position, options)?
            .into_iter()
            .map(|s| s.terminal)
            .collect())
    }

    fn automaton_for(
        &self,
        goal: &str,
        kind: AutomatonKind,
    ) -> Result<Arc<ParserStateSet>, ParserError> {
        let goal_rule = self
            .rules
            .goal_rule_for(goal)
            .ok_or_else(|| ParserError::UnknownGoalRule(goal.to_string()))?;
        Ok(self.automata.for_goal(&self.rules, goal_rule, kind))
    }
}
