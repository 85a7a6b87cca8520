//! Lazy construction of parser states and transitions.
//!
//! A `ParserStateSet` owns the states reachable for one goal rule. The
//! start state holds the goal rule at start-of-rule, the accept state the
//! goal at end-of-rule; every other state is created the first time a
//! transition targets it. Transition computation per from-state happens
//! once and is memoized; the mutable core sits behind a `Mutex` so a
//! shared rule set stays safe if parses run in parallel (population is
//! check-then-set, at most once per state).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rustc_hash::{FxHashMap, FxHashSet};

use espalier_runtime::{
    LookaheadSet, RuleIndex, RuleKind, RulePosition, RuntimeRuleRhs, RuntimeRuleSet,
    POSITION_START,
};

use crate::closure::ClosureCache;

use super::{AutomatonKind, ParseAction, StateNumber, Transition};

pub struct ParserStateSet {
    rules: Arc<RuntimeRuleSet>,
    goal_rule: RuleIndex,
    kind: AutomatonKind,
    core: Mutex<Core>,
}

struct Core {
    closure: ClosureCache,
    states: Vec<Vec<RulePosition>>,
    state_by_key: FxHashMap<Vec<RulePosition>, StateNumber>,
    transitions: FxHashMap<StateNumber, Arc<Vec<Arc<Transition>>>>,
    reachable: FxHashMap<StateNumber, Arc<FxHashSet<RuleIndex>>>,
}

impl ParserStateSet {
    pub fn new(rules: Arc<RuntimeRuleSet>, goal_rule: RuleIndex, kind: AutomatonKind) -> Self {
        assert!(
            matches!(rules.rule(goal_rule).rhs, RuntimeRuleRhs::Goal { .. }),
            "automaton goal must be a goal rule, got '{}'",
            rules.rule(goal_rule).tag
        );
        let mut core = Core {
            closure: ClosureCache::new(Arc::clone(&rules)),
            states: Vec::new(),
            state_by_key: FxHashMap::default(),
            transitions: FxHashMap::default(),
            reachable: FxHashMap::default(),
        };
        // State 0: goal at start. State 1: goal at end (accept).
        core.state_for(vec![RulePosition::start(goal_rule, 0)]);
        core.state_for(vec![RulePosition::end(goal_rule, 0)]);
        ParserStateSet { rules, goal_rule, kind, core: Mutex::new(core) }
    }

    pub fn rules(&self) -> &Arc<RuntimeRuleSet> {
        &self.rules
    }

    pub fn goal_rule(&self) -> RuleIndex {
        self.goal_rule
    }

    pub fn kind(&self) -> AutomatonKind {
        self.kind
    }

    pub fn start_state(&self) -> StateNumber {
        0
    }

    pub fn accept_state(&self) -> StateNumber {
        1
    }

    pub fn positions_of(&self, state: StateNumber) -> Vec<RulePosition> {
        self.lock().states[state as usize].clone()
    }

    /// A complete state holds only end-of-rule positions (of one rule).
    pub fn is_complete(&self, state: StateNumber) -> bool {
        self.lock().states[state as usize][0].is_at_end()
    }

    /// The rule all of this state's positions belong to.
    pub fn rule_of(&self, state: StateNumber) -> RuleIndex {
        self.lock().states[state as usize][0].rule
    }

    pub fn state_count(&self) -> usize {
        self.lock().states.len()
    }

    /// Outgoing transitions, computed on first request.
    pub fn transitions_from(&self, state: StateNumber) -> Arc<Vec<Arc<Transition>>> {
        let mut core = self.lock();
        core.transitions_from(state, self.goal_rule, &self.rules)
    }

    /// Rules whose derivations can start at this state's expected items,
    /// transitively. HEIGHT applies only when the stack context could
    /// start the parent here.
    pub fn reachable_rules(&self, state: StateNumber) -> Arc<FxHashSet<RuleIndex>> {
        let mut core = self.lock();
        core.reachable_rules(state, &self.rules)
    }

    /// Force every reachable state and transition into existence.
    pub fn build_all(&self) {
        let mut frontier = vec![self.start_state()];
        let mut seen: FxHashSet<StateNumber> = frontier.iter().copied().collect();
        while let Some(s) = frontier.pop() {
            for tr in self.transitions_from(s).iter() {
                if seen.insert(tr.to) {
                    frontier.push(tr.to);
                }
            }
        }
    }

    /// Canonical textual form of every built transition, for comparing a
    /// pre-built automaton against an on-demand-built one.
    pub fn transition_signature(&self) -> std::collections::BTreeSet<String> {
        let core = self.lock();
        let mut out = std::collections::BTreeSet::new();
        for trs in core.transitions.values() {
            for tr in trs.iter() {
                out.insert(core.describe(tr, &self.rules));
            }
        }
        out
    }

    /// Human-readable dump of all built states and transitions.
    pub fn dump_text(&self) -> String {
        let core = self.lock();
        let mut out = String::new();
        out.push_str(&format!(
            "automaton '{}' goal '{}' ({} states)\n",
            self.rules.name(),
            self.rules.rule(self.goal_rule).tag,
            core.states.len()
        ));
        for (i, positions) in core.states.iter().enumerate() {
            out.push_str(&format!("state {i}: {}\n", core.positions_text(positions, &self.rules)));
            if let Some(trs) = core.transitions.get(&(i as StateNumber)) {
                for tr in trs.iter() {
                    out.push_str(&format!("  {}\n", core.describe(tr, &self.rules)));
                }
            }
        }
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Core> {
        self.core.lock().expect("automaton core poisoned")
    }
}

impl Core {
    fn state_for(&mut self, mut positions: Vec<RulePosition>) -> StateNumber {
        positions.sort_unstable();
        positions.dedup();
        if let Some(&n) = self.state_by_key.get(&positions) {
            return n;
        }
        let n = self.states.len() as StateNumber;
        self.states.push(positions.clone());
        self.state_by_key.insert(positions, n);
        n
    }

    fn transitions_from(
        &mut self,
        state: StateNumber,
        goal_rule: RuleIndex,
        rules: &Arc<RuntimeRuleSet>,
    ) -> Arc<Vec<Arc<Transition>>> {
        if let Some(hit) = self.transitions.get(&state) {
            return Arc::clone(hit);
        }
        let positions = self.states[state as usize].clone();
        let built = if positions[0].is_at_end() {
            if positions[0].rule == goal_rule {
                Vec::new() // accept state
            } else {
                self.reduction_transitions(state, &positions, goal_rule, rules)
            }
        } else {
            self.scan_transitions(state, &positions, rules)
        };
        let built = Arc::new(built.into_iter().map(Arc::new).collect::<Vec<_>>());
        self.transitions.insert(state, Arc::clone(&built));
        built
    }

    /// WIDTH and EMBED transitions of a state that still expects items.
    fn scan_transitions(
        &mut self,
        state: StateNumber,
        positions: &[RulePosition],
        rules: &Arc<RuntimeRuleSet>,
    ) -> Vec<Transition> {
        let mut firsts: BTreeMap<RuleIndex, LookaheadSet> = BTreeMap::new();
        for rp in positions {
            for (t, la) in self.closure.first_terminals(*rp, &LookaheadSet::rt()) {
                firsts
                    .entry(t)
                    .and_modify(|prior| prior.union_in_place(&la))
                    .or_insert(la);
            }
        }
        firsts
            .into_iter()
            .map(|(t, lookahead)| {
                let to = self.state_for(vec![RulePosition::end(t, 0)]);
                let action = if rules.rule(t).is_embedded() {
                    ParseAction::Embed
                } else {
                    ParseAction::Width
                };
                Transition {
                    from: state,
                    to,
                    action,
                    lookahead,
                    terminal: Some(t),
                    parent: None,
                    prev_guard: None,
                    to_options: vec![0],
                    runtime_guard: false,
                }
            })
            .collect()
    }

    /// HEIGHT/GRAFT/GOAL transitions of a completed rule's state.
    fn reduction_transitions(
        &mut self,
        state: StateNumber,
        positions: &[RulePosition],
        goal_rule: RuleIndex,
        rules: &Arc<RuntimeRuleSet>,
    ) -> Vec<Transition> {
        let rule = positions[0].rule;
        let mut out = Vec::new();

        if let RuntimeRuleRhs::Goal { item } = rules.rule(goal_rule).rhs {
            if item == rule {
                let to = 1; // accept
                out.push(Transition {
                    from: state,
                    to,
                    action: ParseAction::Goal,
                    lookahead: LookaheadSet::eot(),
                    terminal: None,
                    parent: Some(goal_rule),
                    prev_guard: Some(vec![RulePosition::start(goal_rule, 0)]),
                    to_options: vec![0],
                    runtime_guard: false,
                });
            }
        }

        // Group the expecting positions by (parent rule, position); options
        // of the same rule at the same spot merge into one target state.
        let mut groups: BTreeMap<(RuleIndex, i32), Vec<RulePosition>> = BTreeMap::new();
        for q in self.closure.parents_of(rule) {
            if rules.rule(q.rule).kind() == RuleKind::Goal {
                continue; // goal parents are covered by the GOAL action
            }
            groups.entry((q.rule, q.position)).or_default().push(q);
        }

        let has_precedence = !rules.precedence_rules().is_empty();
        for ((parent_rule, parent_pos), qs) in groups {
            let mut lookahead = LookaheadSet::empty();
            let mut advanced: Vec<RulePosition> = Vec::new();
            for q in &qs {
                lookahead.union_in_place(&self.closure.follow_after(*q, &LookaheadSet::rt()));
                advanced.extend(q.next(rules.as_ref()));
            }
            advanced.sort_unstable();
            advanced.dedup();
            let action = if parent_pos == POSITION_START {
                ParseAction::Height
            } else {
                ParseAction::Graft
            };
            // A parent may both continue and complete here (lists); those
            // targets are distinct states, hence distinct transitions.
            let (done, growing): (Vec<_>, Vec<_>) =
                advanced.into_iter().partition(|p| p.is_at_end());
            for subset in [growing, done] {
                if subset.is_empty() {
                    continue;
                }
                let to_options = {
                    let mut o: Vec<u32> = subset.iter().map(|p| p.option).collect();
                    o.sort_unstable();
                    o.dedup();
                    o
                };
                let to = self.state_for(subset);
                out.push(Transition {
                    from: state,
                    to,
                    action,
                    lookahead: lookahead.clone(),
                    terminal: None,
                    parent: Some(parent_rule),
                    prev_guard: if action == ParseAction::Graft {
                        Some(qs.clone())
                    } else {
                        None
                    },
                    to_options,
                    runtime_guard: has_precedence,
                });
            }
        }
        out
    }

    fn reachable_rules(
        &mut self,
        state: StateNumber,
        rules: &Arc<RuntimeRuleSet>,
    ) -> Arc<FxHashSet<RuleIndex>> {
        if let Some(hit) = self.reachable.get(&state) {
            return Arc::clone(hit);
        }
        let mut set = FxHashSet::default();
        let mut frontier: Vec<RuleIndex> = Vec::new();
        for rp in &self.states[state as usize] {
            if !rp.is_at_end() {
                frontier.extend(rp.items(rules.as_ref()));
            }
        }
        while let Some(r) = frontier.pop() {
            if !set.insert(r) {
                continue;
            }
            let rr = rules.rule(r);
            if matches!(rr.kind(), RuleKind::NonTerminal) {
                for option in rr.rhs.start_options() {
                    frontier.extend(RulePosition::start(r, option).items(rules.as_ref()));
                }
            }
        }
        let set = Arc::new(set);
        self.reachable.insert(state, Arc::clone(&set));
        set
    }

    fn positions_text(&self, positions: &[RulePosition], rules: &RuntimeRuleSet) -> String {
        positions
            .iter()
            .map(|p| format!("({}|{}@{})", rules.rule(p.rule).tag, p.option, p.position))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn describe(&self, tr: &Transition, rules: &RuntimeRuleSet) -> String {
        let from = self.positions_text(&self.states[tr.from as usize], rules);
        let to = self.positions_text(&self.states[tr.to as usize], rules);
        let mut la = tr.lookahead.tags(rules);
        if tr.lookahead.includes_rt {
            la.push("<RT>".to_string());
        }
        format!("[{from}] --{:?}[{}]--> [{to}]", tr.action, la.join(","))
    }
}
