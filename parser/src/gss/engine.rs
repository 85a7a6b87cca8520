//! The left-corner GSS parsing engine.
//!
//! All growing heads advance in synchronized rounds: within a round every
//! reduction (HEIGHT/GRAFT/GOAL) at the current input position is
//! processed before any head scans further text, so lookahead decisions
//! observe a consistent position across heads. WIDTH and EMBED results
//! enter the next round.
//!
//! Skip rules are interleaved transparently: before any scan, and inside
//! lookahead tests, the synthesized skip automaton is consulted; matched
//! skip text becomes leading trivia on the following leaf. Embedded
//! grammars run as fresh, independent engine instances whose best complete
//! match is spliced back as one terminal-like leaf.

use std::collections::VecDeque;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use espalier_runtime::{
    ChoiceKind, LookaheadSet, RuleIndex, RulePosition, RuntimeRuleRhs, RuntimeRuleSet, TreeNode,
    TreeNodeId, TreeNodeKind,
};

use crate::automaton::{Automata, AutomatonKind, ParseAction, ParserStateSet, Transition};
use crate::scanner::{Scanner, TextScanner};
use crate::{InterruptFlag, ParserError, Spine};

use super::failure::FailedParseReason;
use super::node::{GrowingNodeIndex, NodeId, ParseGraph};

static TRACE: Lazy<bool> =
    Lazy::new(|| matches!(std::env::var("ESPALIER_TRACE_PARSE").as_deref(), Ok("1")));

/// Per-run configuration of one engine instance.
pub struct EngineConfig {
    pub start_pos: usize,
    /// `None`: whole-sentence mode (accept only when all input is
    /// consumed). `Some`: embedded mode — accept any goal whose end
    /// satisfies this set; the longest wins.
    pub possible_eot: Option<LookaheadSet>,
    /// Off inside the skip engine itself.
    pub skip_enabled: bool,
    pub cache_skip: bool,
    /// Collect expected-terminal spines for scan attempts at this
    /// position.
    pub collect_expected_at: Option<usize>,
}

/// What one engine run produced.
pub struct RunOutcome {
    pub tree_nodes: Vec<TreeNode>,
    pub root: Option<TreeNodeId>,
    /// End position of the accepted goal (start position when none).
    pub matched_end: usize,
    pub trailing_skip: Vec<TreeNodeId>,
    pub rounds: u32,
    pub max_heads: usize,
    pub failures: Vec<FailedParseReason>,
    /// Spans where derivations were merged ambiguously.
    pub ambiguous: Vec<(RuleIndex, usize, usize)>,
    pub expected: Vec<Spine>,
}

pub struct RuntimeParser<'a> {
    rules: Arc<RuntimeRuleSet>,
    automaton: Arc<ParserStateSet>,
    automata: &'a Automata,
    skip_automaton: Option<Arc<ParserStateSet>>,
    scanner: TextScanner<'a>,
    sentence: &'a str,
    kind: AutomatonKind,
    config: EngineConfig,
    interrupt: Arc<InterruptFlag>,
    /// Every terminal of the rule set plus EOT; the resolution context for
    /// RT/UP when the attachment point is not yet on the stack.
    any_la: LookaheadSet,

    graph: ParseGraph,
    current: VecDeque<NodeId>,
    next_round: Vec<NodeId>,
    queued: FxHashSet<NodeId>,

    tree_nodes: Vec<TreeNode>,
    complete_trees: FxHashMap<(RuleIndex, usize, usize), TreeNodeId>,
    skip_cache: FxHashMap<usize, (usize, Vec<TreeNodeId>)>,

    failures: Vec<FailedParseReason>,
    ambiguous: Vec<(RuleIndex, usize, usize)>,
    expected: Vec<Spine>,
    accepted: Vec<NodeId>,
    trailing_skip: Vec<TreeNodeId>,
    rounds: u32,
    max_heads: usize,
}

impl<'a> RuntimeParser<'a> {
    pub fn new(
        automaton: Arc<ParserStateSet>,
        automata: &'a Automata,
        sentence: &'a str,
        config: EngineConfig,
        interrupt: Arc<InterruptFlag>,
    ) -> Self {
        let rules = Arc::clone(automaton.rules());
        let kind = automaton.kind();
        let skip_automaton = if config.skip_enabled {
            rules
                .skip_goal()
                .map(|goal| automata.for_goal(&rules, goal, kind))
        } else {
            None
        };
        let mut any_la = LookaheadSet::eot();
        for (i, r) in rules.rules().iter().enumerate() {
            if r.is_terminal() || r.is_embedded() {
                any_la.insert(i as RuleIndex);
            }
        }
        let scanner = TextScanner::new(sentence, Arc::clone(&rules));
        RuntimeParser {
            rules,
            automaton,
            automata,
            skip_automaton,
            scanner,
            sentence,
            kind,
            config,
            interrupt,
            any_la,
            graph: ParseGraph::new(),
            current: VecDeque::new(),
            next_round: Vec::new(),
            queued: FxHashSet::default(),
            tree_nodes: Vec::new(),
            complete_trees: FxHashMap::default(),
            skip_cache: FxHashMap::default(),
            failures: Vec::new(),
            ambiguous: Vec::new(),
            expected: Vec::new(),
            accepted: Vec::new(),
            trailing_skip: Vec::new(),
            rounds: 0,
            max_heads: 0,
        }
    }

    /// Grow all heads round by round until no head can grow further.
    pub fn run(mut self) -> Result<RunOutcome, ParserError> {
        let seed = GrowingNodeIndex {
            state: self.automaton.start_state(),
            start: self.config.start_pos,
            end: self.config.start_pos,
            priority: 0,
        };
        let merged = self.graph.merge(seed, std::iter::empty(), Vec::new(), None);
        self.enqueue_current(merged.id);

        loop {
            self.rounds += 1;
            self.check_interrupt()?;
            self.max_heads = self.max_heads.max(self.current.len());
            if *TRACE {
                eprintln!(
                    "espalier: round {} heads {} nodes {}",
                    self.rounds,
                    self.current.len(),
                    self.graph.len()
                );
            }
            while let Some(id) = self.current.pop_front() {
                self.queued.remove(&id);
                self.grow(id)?;
            }
            if self.next_round.is_empty() {
                break;
            }
            for id in std::mem::take(&mut self.next_round) {
                self.current.push_back(id);
            }
        }

        Ok(self.into_outcome())
    }

    fn into_outcome(mut self) -> RunOutcome {
        // Best accepted goal: the one covering the most input.
        let best = self
            .accepted
            .iter()
            .map(|&id| self.graph.node(id))
            .max_by_key(|n| n.index.end)
            .map(|n| (n.tree, n.index.end));
        let (root, matched_end) = match best {
            Some((tree, end)) => (tree, end),
            None => (None, self.config.start_pos),
        };
        RunOutcome {
            tree_nodes: std::mem::take(&mut self.tree_nodes),
            root,
            matched_end,
            trailing_skip: std::mem::take(&mut self.trailing_skip),
            rounds: self.rounds,
            max_heads: self.max_heads,
            failures: std::mem::take(&mut self.failures),
            ambiguous: std::mem::take(&mut self.ambiguous),
            expected: std::mem::take(&mut self.expected),
        }
    }

    fn check_interrupt(&self) -> Result<(), ParserError> {
        if let Some(message) = self.interrupt.taken_message() {
            return Err(ParserError::Interrupted(message));
        }
        Ok(())
    }

    fn enqueue_current(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.current.push_back(id);
            self.note_heads();
        }
    }

    fn enqueue_next(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.next_round.push(id);
            self.note_heads();
        }
    }

    fn note_heads(&mut self) {
        let live = self.current.len() + self.next_round.len();
        self.max_heads = self.max_heads.max(live);
    }

    fn grow(&mut self, id: NodeId) -> Result<(), ParserError> {
        let state = self.graph.node(id).index.state;
        if state == self.automaton.accept_state() {
            return Ok(());
        }
        let transitions = self.automaton.transitions_from(state);
        for tr in transitions.iter() {
            match tr.action {
                ParseAction::Width => self.try_width(id, tr)?,
                ParseAction::Embed => self.try_embed(id, tr)?,
                ParseAction::Height => self.try_height(id, tr)?,
                ParseAction::Graft => self.try_graft(id, tr)?,
                ParseAction::Goal => self.try_goal(id, tr)?,
            }
        }
        Ok(())
    }

    // ── WIDTH ──────────────────────────────────────────────────────────

    fn try_width(&mut self, head: NodeId, tr: &Transition) -> Result<(), ParserError> {
        let pos = self.graph.node(head).index.end;
        let (skip_len, trivia) = self.match_skip(pos)?;
        let tpos = pos + skip_len;
        let terminal = tr.terminal.expect("WIDTH transition without terminal");
        if self.config.collect_expected_at == Some(tpos) {
            self.record_spine(head, terminal);
        }
        let matched = self.scanner.try_match_text(tpos, terminal);
        let len = match matched {
            Some(len) => len,
            None => {
                self.failures
                    .push(FailedParseReason::WidthMismatch { position: tpos, terminal });
                return Ok(());
            }
        };
        let after = tpos + len;
        if !self.lookahead_ok(after, &tr.lookahead)? {
            self.record_lookahead_failure(after, &tr.lookahead)?;
            return Ok(());
        }
        let leaf = self.leaf_tree(terminal, tpos, after, trivia);
        let index = GrowingNodeIndex { state: tr.to, start: tpos, end: after, priority: 0 };
        let merged = self.graph.merge(index, [head], Vec::new(), Some(leaf));
        if merged.created {
            self.enqueue_next(merged.id);
        } else if merged.grew_links {
            self.enqueue_current(merged.id);
        }
        Ok(())
    }

    // ── HEIGHT ─────────────────────────────────────────────────────────

    fn try_height(&mut self, child_id: NodeId, tr: &Transition) -> Result<(), ParserError> {
        let child = self.graph.node(child_id).clone();
        let child_tree = match child.tree {
            Some(t) => t,
            None => return Ok(()),
        };
        let parent_rule = tr.parent.expect("HEIGHT transition without parent");
        for prev_id in child.previous.iter().copied() {
            let prev_state = self.graph.node(prev_id).index.state;
            if !self
                .automaton
                .reachable_rules(prev_state)
                .contains(&parent_rule)
            {
                continue;
            }
            if !self.lookahead_ok(child.index.end, &tr.lookahead)? {
                self.record_lookahead_failure(child.index.end, &tr.lookahead)?;
                continue;
            }
            let priority = tr.to_options.first().copied().unwrap_or(0);
            if tr.runtime_guard && !self.precedence_allows(parent_rule, priority, child_tree, tr) {
                self.failures.push(FailedParseReason::GraftRejected {
                    position: child.index.end,
                    parent: parent_rule,
                    child: child.index_rule(&self.automaton),
                });
                continue;
            }
            let index = GrowingNodeIndex {
                state: tr.to,
                start: child.index.start,
                end: child.index.end,
                priority,
            };
            let (children, tree) = if self.automaton.is_complete(tr.to) {
                let t = self.complete_tree(
                    parent_rule,
                    priority,
                    child.index.start,
                    child.index.end,
                    vec![child_tree],
                );
                (Vec::new(), Some(t))
            } else {
                (vec![child_tree], None)
            };
            let merged = self.graph.merge(index, [prev_id], children, tree);
            if merged.created || merged.grew_links {
                self.enqueue_current(merged.id);
            }
        }
        Ok(())
    }

    // ── GRAFT ──────────────────────────────────────────────────────────

    fn try_graft(&mut self, child_id: NodeId, tr: &Transition) -> Result<(), ParserError> {
        let child = self.graph.node(child_id).clone();
        let child_tree = match child.tree {
            Some(t) => t,
            None => return Ok(()),
        };
        let parent_rule = tr.parent.expect("GRAFT transition without parent");
        let guard = tr.prev_guard.as_ref().expect("GRAFT transition without prev guard");
        for prev_id in child.previous.iter().copied() {
            let prev = self.graph.node(prev_id).clone();
            let prev_positions = self.automaton.positions_of(prev.index.state);
            let matched: Vec<RulePosition> = guard
                .iter()
                .filter(|q| prev_positions.contains(q))
                .copied()
                .collect();
            if matched.is_empty() {
                continue;
            }
            if !self.lookahead_ok(child.index.end, &tr.lookahead)? {
                self.record_lookahead_failure(child.index.end, &tr.lookahead)?;
                continue;
            }
            let priority = matched.iter().map(|q| q.option).min().unwrap_or(0);
            if tr.runtime_guard && !self.precedence_allows(parent_rule, priority, child_tree, tr) {
                self.failures.push(FailedParseReason::GraftRejected {
                    position: child.index.end,
                    parent: parent_rule,
                    child: child.index_rule(&self.automaton),
                });
                continue;
            }
            let index = GrowingNodeIndex {
                state: tr.to,
                start: prev.index.start,
                end: child.index.end,
                priority,
            };
            let mut children = prev.children.clone();
            children.push(child_tree);
            let (children, tree) = if self.automaton.is_complete(tr.to) {
                let t = self.complete_tree(
                    parent_rule,
                    priority,
                    prev.index.start,
                    child.index.end,
                    children,
                );
                (Vec::new(), Some(t))
            } else {
                (children, None)
            };
            // The advanced parent replaces the previous node on the
            // stack: it inherits the previous node's own links.
            let merged = self
                .graph
                .merge(index, prev.previous.iter().copied(), children, tree);
            if merged.created || merged.grew_links {
                self.enqueue_current(merged.id);
            }
        }
        Ok(())
    }

    // ── GOAL ───────────────────────────────────────────────────────────

    fn try_goal(&mut self, child_id: NodeId, tr: &Transition) -> Result<(), ParserError> {
        let child = self.graph.node(child_id).clone();
        let child_tree = match child.tree {
            Some(t) => t,
            None => return Ok(()),
        };
        for prev_id in child.previous.iter().copied() {
            let prev = self.graph.node(prev_id).clone();
            if prev.index.state != self.automaton.start_state()
                || prev.index.start != self.config.start_pos
            {
                continue;
            }
            if !self.goal_end_ok(child.index.end)? {
                self.failures.push(FailedParseReason::LookaheadRejected {
                    position: child.index.end,
                    expected: self
                        .config
                        .possible_eot
                        .clone()
                        .unwrap_or_else(LookaheadSet::eot),
                });
                continue;
            }
            let index = GrowingNodeIndex {
                state: tr.to,
                start: prev.index.start,
                end: child.index.end,
                priority: 0,
            };
            let merged = self.graph.merge(index, [prev_id], Vec::new(), Some(child_tree));
            if merged.created {
                self.accepted.push(merged.id);
            }
        }
        Ok(())
    }

    /// In whole-sentence mode the goal must span the entire input,
    /// trailing skip tolerated. In embedded mode any end satisfying the
    /// possible-end-of-text set is acceptable.
    fn goal_end_ok(&mut self, end: usize) -> Result<bool, ParserError> {
        match self.config.possible_eot.clone() {
            Some(la) => self.lookahead_ok(end, &la),
            None => {
                if end == self.sentence.len() {
                    return Ok(true);
                }
                let (k, trivia) = self.match_skip(end)?;
                if k > 0 && end + k == self.sentence.len() {
                    self.trailing_skip = trivia;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    // ── EMBED ──────────────────────────────────────────────────────────

    fn try_embed(&mut self, head: NodeId, tr: &Transition) -> Result<(), ParserError> {
        let pos = self.graph.node(head).index.end;
        let (skip_len, trivia) = self.match_skip(pos)?;
        let tpos = pos + skip_len;
        let embedded = tr.terminal.expect("EMBED transition without rule");
        let (inner_rules, inner_goal_tag) = match &self.rules.rule(embedded).rhs {
            RuntimeRuleRhs::Embedded { rule_set, goal_tag } => {
                (Arc::clone(rule_set), goal_tag.clone())
            }
            other => panic!("EMBED on non-embedded rule: {other:?}"),
        };
        let inner_goal = inner_rules.goal_rule_for(&inner_goal_tag).unwrap_or_else(|| {
            panic!(
                "embedded rule set '{}' has no goal rule '{inner_goal_tag}'",
                inner_rules.name()
            )
        });
        let possible_eot = tr.lookahead.resolve(&self.any_la, &self.any_la);
        let inner_automaton = self.automata.for_goal(&inner_rules, inner_goal, self.kind);
        let inner = RuntimeParser::new(
            inner_automaton,
            self.automata,
            self.sentence,
            EngineConfig {
                start_pos: tpos,
                possible_eot: Some(possible_eot),
                skip_enabled: true,
                cache_skip: self.config.cache_skip,
                collect_expected_at: None,
            },
            Arc::clone(&self.interrupt),
        );
        let outcome = inner.run()?;
        match outcome.root {
            Some(inner_root) => {
                let end = outcome.matched_end;
                let spliced = self.splice(outcome.tree_nodes, inner_root);
                let tree = self.complete_tree(embedded, 0, tpos, end, vec![spliced]);
                if let Some(node) = self.tree_nodes.get_mut(tree) {
                    if node.leading_skip.is_empty() {
                        node.leading_skip = trivia;
                    }
                }
                let index = GrowingNodeIndex { state: tr.to, start: tpos, end, priority: 0 };
                let merged = self.graph.merge(index, [head], Vec::new(), Some(tree));
                if merged.created {
                    self.enqueue_next(merged.id);
                } else if merged.grew_links {
                    self.enqueue_current(merged.id);
                }
            }
            None => {
                let mut expected = std::collections::BTreeSet::new();
                let furthest = outcome.failures.iter().map(|f| f.position()).max();
                for f in &outcome.failures {
                    if Some(f.position()) == furthest {
                        expected.extend(f.expected_tags(&inner_rules));
                    }
                }
                self.failures.push(FailedParseReason::Embedded {
                    position: tpos,
                    expected,
                    message: format!(
                        "embedded '{}' failed at {}",
                        inner_rules.name(),
                        furthest.unwrap_or(tpos)
                    ),
                });
            }
        }
        Ok(())
    }

    // ── Skip handling ──────────────────────────────────────────────────

    /// Longest skip match at `position`: consumed length plus the trivia
    /// nodes to attach to whatever follows.
    fn match_skip(&mut self, position: usize) -> Result<(usize, Vec<TreeNodeId>), ParserError> {
        let skip_automaton = match &self.skip_automaton {
            Some(a) => Arc::clone(a),
            None => return Ok((0, Vec::new())),
        };
        if self.config.cache_skip {
            if let Some(hit) = self.skip_cache.get(&position) {
                return Ok(hit.clone());
            }
        }
        let inner = RuntimeParser::new(
            skip_automaton,
            self.automata,
            self.sentence,
            EngineConfig {
                start_pos: position,
                possible_eot: Some(self.any_la.clone()),
                skip_enabled: false,
                cache_skip: false,
                collect_expected_at: None,
            },
            Arc::clone(&self.interrupt),
        );
        let outcome = inner.run()?;
        let result = match outcome.root {
            Some(inner_root) if outcome.matched_end > position => {
                let spliced = self.splice(outcome.tree_nodes, inner_root);
                (outcome.matched_end - position, vec![spliced])
            }
            _ => (0, Vec::new()),
        };
        if self.config.cache_skip {
            self.skip_cache.insert(position, result.clone());
        }
        Ok(result)
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Test a guard against the actual input at `position`, skip text
    /// tolerated between the position and the matching terminal.
    fn lookahead_ok(&mut self, position: usize, guard: &LookaheadSet) -> Result<bool, ParserError> {
        if self.kind == AutomatonKind::LookaheadNone {
            return Ok(true);
        }
        // When collecting expected terminals the text at and beyond the
        // cursor is unknowable; guards there cannot reject.
        if let Some(p) = self.config.collect_expected_at {
            if position >= p {
                return Ok(true);
            }
        }
        let resolved = guard.resolve(&self.any_la, &self.any_la);
        resolved.assert_resolved();
        if resolved.is_empty() {
            return Ok(true);
        }
        if self.lookahead_direct(position, &resolved) {
            return Ok(true);
        }
        let (k, _) = self.match_skip(position)?;
        if k > 0 && self.lookahead_direct(position + k, &resolved) {
            return Ok(true);
        }
        Ok(false)
    }

    /// Lookahead rejections are attributed to the first non-skip position,
    /// so diagnostics land on the offending token rather than on trivia.
    fn record_lookahead_failure(
        &mut self,
        position: usize,
        guard: &LookaheadSet,
    ) -> Result<(), ParserError> {
        let (k, _) = self.match_skip(position)?;
        self.failures.push(FailedParseReason::LookaheadRejected {
            position: position + k,
            expected: guard.resolve(&self.any_la, &self.any_la),
        });
        Ok(())
    }

    fn lookahead_direct(&mut self, position: usize, resolved: &LookaheadSet) -> bool {
        if resolved.includes_eot && position >= self.sentence.len() {
            return true;
        }
        for t in resolved.terminals().collect::<Vec<_>>() {
            let rule = self.rules.rule(t);
            if rule.is_zero_width() || rule.is_embedded() {
                return true;
            }
            if self.scanner.is_looking_at(position, t) {
                return true;
            }
        }
        false
    }

    // ── Precedence ─────────────────────────────────────────────────────

    fn precedence_allows(
        &self,
        parent_rule: RuleIndex,
        parent_option: u32,
        child_tree: TreeNodeId,
        tr: &Transition,
    ) -> bool {
        let child_node = &self.tree_nodes[child_tree];
        let child_option = match &child_node.kind {
            TreeNodeKind::Branch { option, .. } => *option,
            TreeNodeKind::Leaf => 0,
        };
        let parent_tag = &self.rules.rule(parent_rule).tag;
        let rightmost = self.automaton.is_complete(tr.to);
        self.rules.precedence_rules().iter().all(|p| {
            p.allows_graft(parent_tag, parent_option, &child_node.tag, child_option, rightmost)
        })
    }

    // ── Tree construction ──────────────────────────────────────────────

    fn push_tree_node(&mut self, node: TreeNode) -> TreeNodeId {
        let id = self.tree_nodes.len();
        self.tree_nodes.push(node);
        id
    }

    fn leaf_tree(
        &mut self,
        terminal: RuleIndex,
        start: usize,
        end: usize,
        trivia: Vec<TreeNodeId>,
    ) -> TreeNodeId {
        let key = (terminal, start, end);
        if let Some(&id) = self.complete_trees.get(&key) {
            return id;
        }
        let node = TreeNode {
            rule: terminal,
            tag: self.rules.rule(terminal).tag.clone(),
            span: (start, end),
            kind: TreeNodeKind::Leaf,
            leading_skip: trivia,
        };
        let id = self.push_tree_node(node);
        self.complete_trees.insert(key, id);
        id
    }

    /// The packed tree node for a completed rule over a span. Competing
    /// derivations of the same span resolve here: ambiguous choices pack
    /// alternatives; priority choices keep the stronger option.
    fn complete_tree(
        &mut self,
        rule: RuleIndex,
        option: u32,
        start: usize,
        end: usize,
        children: Vec<TreeNodeId>,
    ) -> TreeNodeId {
        let key = (rule, start, end);
        let existing = self.complete_trees.get(&key).copied();
        let id = match existing {
            None => {
                let node = TreeNode {
                    rule,
                    tag: self.rules.rule(rule).tag.clone(),
                    span: (start, end),
                    kind: TreeNodeKind::Branch { option, children, alternatives: Vec::new() },
                    leading_skip: Vec::new(),
                };
                let id = self.push_tree_node(node);
                self.complete_trees.insert(key, id);
                return id;
            }
            Some(id) => id,
        };
        let choice_kind = match &self.rules.rule(rule).rhs {
            RuntimeRuleRhs::Choice { kind, .. } => Some(*kind),
            _ => None,
        };
        let mut newly_ambiguous = false;
        if let TreeNodeKind::Branch {
            option: cur_option,
            children: cur_children,
            alternatives,
        } = &mut self.tree_nodes[id].kind
        {
            let known = (*cur_option == option && *cur_children == children)
                || alternatives.iter().any(|(o, c)| *o == option && *c == children);
            if !known {
                match choice_kind {
                    Some(ChoiceKind::PriorityLongest) | Some(ChoiceKind::LongestPriority)
                        if *cur_option != option =>
                    {
                        // Same span, so the priority decides; later
                        // options bind looser and win at this level.
                        if option > *cur_option {
                            *cur_option = option;
                            *cur_children = children;
                        }
                    }
                    _ => {
                        alternatives.push((option, children));
                        alternatives.sort();
                        newly_ambiguous = true;
                    }
                }
            }
        }
        if newly_ambiguous {
            self.ambiguous.push((rule, start, end));
        }
        id
    }

    /// Append another engine's tree arena to ours, remapping ids; returns
    /// the new id of `root`.
    fn splice(&mut self, nested: Vec<TreeNode>, root: TreeNodeId) -> TreeNodeId {
        let base = self.tree_nodes.len();
        for mut node in nested {
            if let TreeNodeKind::Branch { children, alternatives, .. } = &mut node.kind {
                for c in children.iter_mut() {
                    *c += base;
                }
                for (_, cs) in alternatives.iter_mut() {
                    for c in cs.iter_mut() {
                        *c += base;
                    }
                }
            }
            for s in node.leading_skip.iter_mut() {
                *s += base;
            }
            self.tree_nodes.push(node);
        }
        base + root
    }

    // ── Expected-terminal spines ───────────────────────────────────────

    fn record_spine(&mut self, head: NodeId, terminal: RuleIndex) {
        let tag = self.rules.rule(terminal).tag.clone();
        if self.expected.iter().any(|s| s.terminal == tag) {
            return;
        }
        let mut path = Vec::new();
        let mut seen = FxHashSet::default();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            let node = self.graph.node(id);
            let rule = self.automaton.positions_of(node.index.state)[0].rule;
            let rule = self.rules.rule(rule);
            if !rule.is_pseudo {
                path.push(rule.tag.clone());
            }
            cursor = node.previous.iter().next().copied();
        }
        self.expected.push(Spine { terminal: tag, rule_path: path });
    }
}

trait NodeRuleExt {
    fn index_rule(&self, automaton: &ParserStateSet) -> RuleIndex;
}

impl NodeRuleExt for super::node::GrowingNode {
    fn index_rule(&self, automaton: &ParserStateSet) -> RuleIndex {
        automaton.positions_of(self.index.state)[0].rule
    }
}
