//! The parsing automaton: states, transitions, and the per-goal builder.
//!
//! One `ParserStateSet` exists per (goal rule, automaton kind); states and
//! transitions are created on demand and memoized. The `Automata` registry
//! caches built state sets per rule set so a grammar is compiled at most
//! once per goal, however many parses run over it.

mod build;
mod dump;
mod transition;

pub use build::ParserStateSet;
pub use dump::dump_if_requested;
pub use transition::{ParseAction, Transition};

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use espalier_runtime::{RuleIndex, RuntimeRuleSet};

/// Stable identifier of an automaton state.
pub type StateNumber = u32;

/// How much lookahead the automaton's guards use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AutomatonKind {
    /// Guards check one token of lookahead.
    LookaheadOne,
    /// Guards are not checked; ambiguity is resolved by the runtime only.
    LookaheadNone,
}

/// Cache of built automatons, keyed by (rule-set number, goal rule,
/// kind). Population is check-then-set under one lock, so each automaton
/// is built at most once even when parses run in parallel.
#[derive(Default)]
pub struct Automata {
    cache: Mutex<FxHashMap<(u32, RuleIndex, AutomatonKind), Arc<ParserStateSet>>>,
}

impl Automata {
    pub fn new() -> Self {
        Automata::default()
    }

    /// Get the automaton for (rule set, goal rule, kind), building it on
    /// first use.
    pub fn for_goal(
        &self,
        rules: &Arc<RuntimeRuleSet>,
        goal_rule: RuleIndex,
        kind: AutomatonKind,
    ) -> Arc<ParserStateSet> {
        let key = (rules.number(), goal_rule, kind);
        let mut cache = self.cache.lock().expect("automata cache poisoned");
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }
        let built = Arc::new(ParserStateSet::new(Arc::clone(rules), goal_rule, kind));
        cache.insert(key, Arc::clone(&built));
        built
    }
}
