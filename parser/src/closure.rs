//! Closure and first/follow computation over a rule set.
//!
//! Answers the two questions the automaton builder needs:
//! - from a rule position, which terminals can appear next, and with what
//!   lookahead after them (`first_terminals`);
//! - for a rule, every position in the grammar that expects it
//!   (`parents_of`) — the parent-in-context projection HEIGHT/GRAFT
//!   transitions are built from.
//!
//! Left- and right-recursive grammars terminate by cycle detection: each
//! query keeps an explicit visited table keyed by rule position, and a
//! position is only re-expanded when its inherited follow grew (lookahead
//! sets grow monotonically, so the worklist converges).

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};

use espalier_runtime::{
    LookaheadSet, RuleIndex, RuleKind, RulePosition, RuntimeRuleSet,
};

/// FIRST of a single rule: the terminals a derivation can start with, and
/// whether the rule can derive zero-width text only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFirst {
    pub terminals: BTreeSet<RuleIndex>,
    pub nullable: bool,
}

impl RuleFirst {
    fn union_in_place(&mut self, other: &RuleFirst) {
        self.terminals.extend(other.terminals.iter().copied());
        self.nullable |= other.nullable;
    }
}

/// Memoizing closure engine, scoped to one rule set.
///
/// All tables are private to one automaton build; [`ClosureCache::clear`]
/// resets them, and recomputation yields identical results regardless of
/// prior unrelated queries.
pub struct ClosureCache {
    rules: std::sync::Arc<RuntimeRuleSet>,
    rule_first: FxHashMap<RuleIndex, RuleFirst>,
    first_terminals: FxHashMap<(RulePosition, LookaheadSet), Vec<(RuleIndex, LookaheadSet)>>,
    parents: Option<FxHashMap<RuleIndex, Vec<RulePosition>>>,
}

impl ClosureCache {
    pub fn new(rules: std::sync::Arc<RuntimeRuleSet>) -> Self {
        ClosureCache {
            rules,
            rule_first: FxHashMap::default(),
            first_terminals: FxHashMap::default(),
            parents: None,
        }
    }

    pub fn rules(&self) -> &RuntimeRuleSet {
        &self.rules
    }

    /// Empty all memo tables.
    pub fn clear(&mut self) {
        self.rule_first.clear();
        self.first_terminals.clear();
        self.parents = None;
    }

    /// FIRST of a rule, memoized.
    pub fn first_of_rule(&mut self, rule: RuleIndex) -> RuleFirst {
        if let Some(hit) = self.rule_first.get(&rule) {
            return hit.clone();
        }
        let mut open = FxHashSet::default();
        let result = self.first_of_rule_rec(rule, &mut open);
        self.rule_first.insert(rule, result.clone());
        result
    }

    fn first_of_rule_rec(&mut self, rule: RuleIndex, open: &mut FxHashSet<RuleIndex>) -> RuleFirst {
        if let Some(hit) = self.rule_first.get(&rule) {
            return hit.clone();
        }
        if !open.insert(rule) {
            // Already expanding this rule higher up the same query: the
            // cycle contributes nothing new.
            return RuleFirst::default();
        }
        let rules = std::sync::Arc::clone(&self.rules);
        let r = rules.rule(rule);
        let result = match r.kind() {
            RuleKind::Terminal => RuleFirst {
                terminals: BTreeSet::from([rule]),
                nullable: r.is_zero_width(),
            },
            RuleKind::Embedded => RuleFirst {
                terminals: BTreeSet::from([rule]),
                nullable: false,
            },
            RuleKind::Goal | RuleKind::NonTerminal => {
                let mut out = RuleFirst::default();
                for option in r.rhs.start_options() {
                    let start = RulePosition::start(rule, option);
                    let mut seen = FxHashSet::default();
                    let suffix = self.first_of_suffix(start, open, &mut seen);
                    out.union_in_place(&suffix);
                }
                out
            }
        };
        open.remove(&rule);
        result
    }

    /// FIRST of the rule suffix starting at `rp`; nullable when every item
    /// on some path from `rp` to end-of-rule is nullable.
    fn first_of_suffix(
        &mut self,
        rp: RulePosition,
        open: &mut FxHashSet<RuleIndex>,
        seen: &mut FxHashSet<RulePosition>,
    ) -> RuleFirst {
        if rp.is_at_end() {
            return RuleFirst { terminals: BTreeSet::new(), nullable: true };
        }
        if !seen.insert(rp) {
            return RuleFirst::default();
        }
        let mut out = RuleFirst::default();
        for item in rp.items(&self.rules) {
            let f = self.first_of_rule_rec(item, open);
            out.terminals.extend(f.terminals.iter().copied());
            if f.nullable {
                for n in rp.next(&self.rules) {
                    let g = self.first_of_suffix(n, open, seen);
                    out.union_in_place(&g);
                }
            }
        }
        out
    }

    /// The lookahead valid after consuming one item at `rp`: FIRST of the
    /// continuation, falling through to `follow` at end-of-rule and across
    /// nullable items. Zero-width sentinel terminals are skipped (they
    /// constrain nothing); their nullability still propagates.
    pub fn follow_after(&mut self, rp: RulePosition, follow: &LookaheadSet) -> LookaheadSet {
        let mut out = LookaheadSet::empty();
        let mut seen = FxHashSet::default();
        for n in rp.next(&self.rules) {
            self.follow_at_into(n, follow, &mut out, &mut seen);
        }
        out
    }

    fn follow_at_into(
        &mut self,
        rp: RulePosition,
        follow: &LookaheadSet,
        out: &mut LookaheadSet,
        seen: &mut FxHashSet<RulePosition>,
    ) {
        if rp.is_at_end() {
            out.union_in_place(follow);
            return;
        }
        if !seen.insert(rp) {
            return;
        }
        for item in rp.items(&self.rules) {
            let f = self.first_of_rule(item);
            for t in &f.terminals {
                if !self.rules.rule(*t).is_zero_width() {
                    out.insert(*t);
                }
            }
            if f.nullable {
                for n in rp.next(&self.rules) {
                    self.follow_at_into(n, follow, out, seen);
                }
            }
        }
    }

    /// The terminals reachable from `rp` without crossing a terminal
    /// boundary, each with the lookahead valid after it. `follow` stands
    /// in for whatever may follow the rule `rp` belongs to.
    ///
    /// One entry per terminal; lookaheads from different expansion paths
    /// merge. Memoized per (position, follow).
    pub fn first_terminals(
        &mut self,
        rp: RulePosition,
        follow: &LookaheadSet,
    ) -> Vec<(RuleIndex, LookaheadSet)> {
        let key = (rp, follow.clone());
        if let Some(hit) = self.first_terminals.get(&key) {
            return hit.clone();
        }
        let mut out: BTreeMap<RuleIndex, LookaheadSet> = BTreeMap::new();
        let mut visited: FxHashMap<RulePosition, LookaheadSet> = FxHashMap::default();
        self.first_terminals_into(rp, follow, &mut out, &mut visited);
        let result: Vec<(RuleIndex, LookaheadSet)> = out.into_iter().collect();
        self.first_terminals.insert(key, result.clone());
        result
    }

    fn first_terminals_into(
        &mut self,
        rp: RulePosition,
        follow: &LookaheadSet,
        out: &mut BTreeMap<RuleIndex, LookaheadSet>,
        visited: &mut FxHashMap<RulePosition, LookaheadSet>,
    ) {
        if rp.is_at_end() {
            return;
        }
        // Re-expand only when the inherited follow grew; convergence is
        // guaranteed because lookahead sets grow monotonically.
        if let Some(prior) = visited.get_mut(&rp) {
            let merged = prior.union(follow);
            if merged == *prior {
                return;
            }
            *prior = merged;
        } else {
            visited.insert(rp, follow.clone());
        }
        let rules = std::sync::Arc::clone(&self.rules);
        for item in rp.items(&rules) {
            let r = rules.rule(item);
            match r.kind() {
                RuleKind::Terminal | RuleKind::Embedded => {
                    let after = self.follow_after_resolving(rp, follow);
                    out.entry(item)
                        .and_modify(|la| la.union_in_place(&after))
                        .or_insert(after);
                }
                RuleKind::NonTerminal | RuleKind::Goal => {
                    let child_follow = self.follow_after_resolving(rp, follow);
                    for option in r.rhs.start_options() {
                        self.first_terminals_into(
                            RulePosition::start(item, option),
                            &child_follow,
                            out,
                            visited,
                        );
                    }
                }
            }
        }
    }

    /// `follow_after` with the end-of-rule fallthrough taken from the
    /// caller's inherited follow rather than a fixed set.
    fn follow_after_resolving(&mut self, rp: RulePosition, follow: &LookaheadSet) -> LookaheadSet {
        let mut out = LookaheadSet::empty();
        let mut seen = FxHashSet::default();
        for n in rp.next(&self.rules) {
            self.follow_at_into(n, follow, &mut out, &mut seen);
        }
        out
    }

    /// Every position in the rule set that expects `rule` as an item.
    pub fn parents_of(&mut self, rule: RuleIndex) -> Vec<RulePosition> {
        if self.parents.is_none() {
            let mut map: FxHashMap<RuleIndex, Vec<RulePosition>> = FxHashMap::default();
            let rules = std::sync::Arc::clone(&self.rules);
            for (i, _) in rules.rules().iter().enumerate() {
                for rp in rules.all_rule_positions(i as RuleIndex) {
                    for item in rp.items(&rules) {
                        map.entry(item).or_default().push(rp);
                    }
                }
            }
            for v in map.values_mut() {
                v.sort_unstable();
                v.dedup();
            }
            self.parents = Some(map);
        }
        self.parents
            .as_ref()
            .and_then(|m| m.get(&rule))
            .cloned()
            .unwrap_or_default()
    }
}
