//! Terminal matching against the sentence text.
//!
//! The engine never inspects terminal internals; it only asks, through the
//! [`Scanner`] contract, whether a terminal rule matches at a position and
//! how much text it covers. The provided [`TextScanner`] matches literals
//! and regular expressions on demand, memoizing per (position, terminal)
//! for the duration of one parse.

use regex::Regex;
use rustc_hash::FxHashMap;

use espalier_runtime::{RuleIndex, RuntimeRuleRhs, RuntimeRuleSet, TerminalRhs};

/// The matching contract consumed by the parsing engine.
pub trait Scanner {
    /// Does the terminal match at this position?
    fn is_looking_at(&mut self, position: usize, terminal: RuleIndex) -> bool {
        self.try_match_text(position, terminal).is_some()
    }

    /// Length of the match at this position, or `None`.
    fn try_match_text(&mut self, position: usize, terminal: RuleIndex) -> Option<usize>;
}

/// On-demand literal/regex scanner over one sentence.
///
/// Regexes compile once per terminal and are anchored at the match
/// position. Match results are memoized; the memo lives and dies with the
/// scanner, i.e. with one parse.
pub struct TextScanner<'s> {
    sentence: &'s str,
    rules: std::sync::Arc<RuntimeRuleSet>,
    regexes: FxHashMap<RuleIndex, Regex>,
    memo: FxHashMap<(usize, RuleIndex), Option<usize>>,
}

impl<'s> TextScanner<'s> {
    pub fn new(sentence: &'s str, rules: std::sync::Arc<RuntimeRuleSet>) -> Self {
        TextScanner {
            sentence,
            rules,
            regexes: FxHashMap::default(),
            memo: FxHashMap::default(),
        }
    }

    pub fn sentence(&self) -> &'s str {
        self.sentence
    }

    fn match_uncached(&mut self, position: usize, terminal: RuleIndex) -> Option<usize> {
        let rhs = match &self.rules.rule(terminal).rhs {
            RuntimeRuleRhs::Terminal(t) => t.clone(),
            other => panic!("scanner asked to match non-terminal rule: {other:?}"),
        };
        match rhs {
            TerminalRhs::Literal(text) => {
                if self.sentence[position..].starts_with(&text) {
                    Some(text.len())
                } else {
                    None
                }
            }
            TerminalRhs::Pattern(pattern) => {
                let re = self.regexes.entry(terminal).or_insert_with(|| {
                    // Anchor so the match starts exactly at `position`.
                    Regex::new(&format!("\\A(?:{pattern})")).unwrap_or_else(|e| {
                        panic!("terminal pattern {pattern:?} does not compile: {e}")
                    })
                });
                re.find(&self.sentence[position..]).map(|m| m.end())
            }
            TerminalRhs::EndOfText => {
                if position >= self.sentence.len() {
                    Some(0)
                } else {
                    None
                }
            }
            TerminalRhs::Empty | TerminalRhs::EmptyList => Some(0),
        }
    }
}

impl Scanner for TextScanner<'_> {
    fn try_match_text(&mut self, position: usize, terminal: RuleIndex) -> Option<usize> {
        if position > self.sentence.len() {
            return None;
        }
        if let Some(&hit) = self.memo.get(&(position, terminal)) {
            return hit;
        }
        let result = self.match_uncached(position, terminal);
        self.memo.insert((position, terminal), result);
        result
    }
}
