//! Automaton transitions.

use espalier_runtime::{LookaheadSet, RuleIndex, RulePosition};

use super::StateNumber;

/// The five transition kinds of the left-corner automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParseAction {
    /// Scan a terminal.
    Width,
    /// Reduce a completed child into a newly-created parent.
    Height,
    /// Extend the parent instance already on the stack.
    Graft,
    /// Accept: the user start rule completed under the initial context.
    Goal,
    /// Delegate into a nested grammar.
    Embed,
}

/// One memoized transition between two states.
///
/// Built lazily the first time its from-state's successors are requested
/// and never recomputed within one automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StateNumber,
    pub to: StateNumber,
    pub action: ParseAction,
    /// Lookahead required after taking this transition. May carry RT; the
    /// engine resolves it against the runtime context before matching.
    pub lookahead: LookaheadSet,
    /// WIDTH/EMBED: the terminal or embedded rule to match.
    pub terminal: Option<RuleIndex>,
    /// HEIGHT/GRAFT/GOAL: the parent rule being entered or extended.
    pub parent: Option<RuleIndex>,
    /// GRAFT/GOAL: the previous node's positions this transition applies
    /// to. HEIGHT instead checks the parent against the previous state's
    /// closure-reachable rules.
    pub prev_guard: Option<Vec<RulePosition>>,
    /// Options of the parent positions entered by this transition; the
    /// smallest becomes the new node's priority.
    pub to_options: Vec<u32>,
    /// GRAFT: evaluate the precedence rules before extending.
    pub runtime_guard: bool,
}
