//! A compiled grammar: the ordered collection of runtime rules plus
//! lazily-derived indexes.
//!
//! Rule sets are immutable after construction and safely shared across
//! parses. The derived indexes (terminals by tag, skip rules, goal rules)
//! are computed at most once through `OnceCell`. Skip rules are compiled
//! by the builder into a synthesized "choice of all skip rules, one or
//! more times" pseudo-rule pair with its own goal.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::position::{RuleIndex, RulePosition};
use crate::precedence::PrecedenceRule;
use crate::rhs::RuntimeRuleRhs;
use crate::rule::{RuntimeRule, EMPTY, EMPTY_LIST, END_OF_TEXT, RULE_EMPTY, RULE_EMPTY_LIST, RULE_EOT};

static NEXT_RULE_SET_NUMBER: AtomicU32 = AtomicU32::new(0);

pub(crate) fn next_rule_set_number() -> u32 {
    NEXT_RULE_SET_NUMBER.fetch_add(1, Ordering::Relaxed)
}

pub struct RuntimeRuleSet {
    pub(crate) number: u32,
    pub(crate) name: String,
    pub(crate) rules: Vec<RuntimeRule>,
    pub(crate) precedence_rules: Vec<PrecedenceRule>,
    /// Goal pseudo-rule of the synthesized skip rule, when the grammar has
    /// skip rules.
    pub(crate) skip_goal: Option<RuleIndex>,

    terminal_by_tag: OnceCell<BTreeMap<String, RuleIndex>>,
    goal_by_tag: OnceCell<BTreeMap<String, RuleIndex>>,
    skip_rules: OnceCell<Vec<RuleIndex>>,
    skip_terminals: OnceCell<Vec<RuleIndex>>,
}

impl RuntimeRuleSet {
    pub(crate) fn new(
        name: String,
        rules: Vec<RuntimeRule>,
        precedence_rules: Vec<PrecedenceRule>,
        skip_goal: Option<RuleIndex>,
    ) -> Self {
        RuntimeRuleSet {
            number: next_rule_set_number(),
            name,
            rules,
            precedence_rules,
            skip_goal,
            terminal_by_tag: OnceCell::new(),
            goal_by_tag: OnceCell::new(),
            skip_rules: OnceCell::new(),
            skip_terminals: OnceCell::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[RuntimeRule] {
        &self.rules
    }

    /// Resolve a rule index. Negative indexes resolve to the process-wide
    /// sentinel rules. An unknown index is a broken rule model.
    pub fn rule(&self, index: RuleIndex) -> &RuntimeRule {
        match index {
            RULE_EOT => &END_OF_TEXT,
            RULE_EMPTY => &EMPTY,
            RULE_EMPTY_LIST => &EMPTY_LIST,
            i if i >= 0 && (i as usize) < self.rules.len() => &self.rules[i as usize],
            i => panic!("rule set '{}' has no rule {i}", self.name),
        }
    }

    /// Find a rule by tag.
    pub fn find_rule(&self, tag: &str) -> Option<RuleIndex> {
        self.rules
            .iter()
            .position(|r| r.tag == tag)
            .map(|i| i as RuleIndex)
    }

    /// Terminal rules indexed by tag.
    pub fn terminal_by_tag(&self, tag: &str) -> Option<RuleIndex> {
        self.terminal_by_tag
            .get_or_init(|| {
                self.rules
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.is_terminal())
                    .map(|(i, r)| (r.tag.clone(), i as RuleIndex))
                    .collect()
            })
            .get(tag)
            .copied()
    }

    /// The synthesized goal rule for the given user rule tag.
    pub fn goal_rule_for(&self, tag: &str) -> Option<RuleIndex> {
        self.goal_by_tag
            .get_or_init(|| {
                let mut map = BTreeMap::new();
                for (i, r) in self.rules.iter().enumerate() {
                    if let RuntimeRuleRhs::Goal { item } = r.rhs {
                        map.insert(self.rule(item).tag.clone(), i as RuleIndex);
                    }
                }
                map
            })
            .get(tag)
            .copied()
    }

    /// All skip rules of this set (excluding the synthesized pair).
    pub fn skip_rules(&self) -> &[RuleIndex] {
        self.skip_rules.get_or_init(|| {
            self.rules
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_skip && !r.is_pseudo)
                .map(|(i, _)| i as RuleIndex)
                .collect()
        })
    }

    /// Terminal rules reachable from skip rules.
    pub fn skip_terminals(&self) -> &[RuleIndex] {
        self.skip_terminals.get_or_init(|| {
            let mut out = Vec::new();
            let mut frontier: Vec<RuleIndex> = self.skip_rules().to_vec();
            let mut seen = frontier.clone();
            while let Some(r) = frontier.pop() {
                let rule = self.rule(r);
                if rule.is_terminal() {
                    out.push(r);
                    continue;
                }
                for rp in self.all_rule_positions(r) {
                    for item in rp.items(self) {
                        if !seen.contains(&item) {
                            seen.push(item);
                            frontier.push(item);
                        }
                    }
                }
            }
            out.sort_unstable();
            out
        })
    }

    /// Goal of the synthesized skip automaton, if the grammar has skip
    /// rules.
    pub fn skip_goal(&self) -> Option<RuleIndex> {
        self.skip_goal
    }

    pub fn precedence_rules(&self) -> &[PrecedenceRule] {
        &self.precedence_rules
    }

    /// The precedence rule whose context is the given rule, if any.
    pub fn precedence_for(&self, context_tag: &str) -> Option<&PrecedenceRule> {
        self.precedence_rules.iter().find(|p| p.context_tag == context_tag)
    }

    /// Every non-end position of a rule, across all of its options.
    pub fn all_rule_positions(&self, rule: RuleIndex) -> Vec<RulePosition> {
        let rhs = &self.rule(rule).rhs;
        let mut out = Vec::new();
        for option in rhs.start_options() {
            let start = RulePosition::start(rule, option);
            let mut frontier = vec![start];
            out.push(start);
            while let Some(rp) = frontier.pop() {
                for n in rp.next(self) {
                    if !n.is_at_end() && !out.contains(&n) {
                        out.push(n);
                        frontier.push(n);
                    }
                }
            }
        }
        out
    }

    /// All rule sets reachable through embedded rules, this set excluded.
    /// Embedded sets may reference each other; traversal is cycle-safe.
    pub fn embedded_rule_sets(&self) -> Vec<Arc<RuntimeRuleSet>> {
        let mut out: Vec<Arc<RuntimeRuleSet>> = Vec::new();
        let mut visited = vec![self.number];
        let mut frontier: Vec<Arc<RuntimeRuleSet>> = self.direct_embedded();
        while let Some(set) = frontier.pop() {
            if visited.contains(&set.number) {
                continue;
            }
            visited.push(set.number);
            frontier.extend(set.direct_embedded());
            out.push(set);
        }
        out
    }

    fn direct_embedded(&self) -> Vec<Arc<RuntimeRuleSet>> {
        self.rules
            .iter()
            .filter_map(|r| match &r.rhs {
                RuntimeRuleRhs::Embedded { rule_set, .. } => Some(Arc::clone(rule_set)),
                _ => None,
            })
            .collect()
    }

    /// A fully independent copy with fresh (empty) derived indexes, under
    /// a new rule-set number. Exists for isolated comparison runs in
    /// tests; embedded rule sets stay shared (they are immutable).
    pub fn deep_clone(&self) -> RuntimeRuleSet {
        RuntimeRuleSet::new(
            self.name.clone(),
            self.rules.clone(),
            self.precedence_rules.clone(),
            self.skip_goal,
        )
    }
}

impl fmt::Debug for RuntimeRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeRuleSet")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish()
    }
}
