//! Lookahead sets: which terminals may legally appear next.
//!
//! A `LookaheadSet` is an immutable set of terminal rule indexes plus
//! three independent flags:
//! - `includes_eot` — end of text is acceptable;
//! - `includes_rt` — the set depends on the runtime stack context and must
//!   be resolved before terminal matching;
//! - `includes_up` — the set defers to the enclosing (parent) context.
//!
//! A set still carrying RT or UP must never be compared against input;
//! use sites assert this via [`LookaheadSet::assert_resolved`].

use std::collections::BTreeSet;

use crate::position::RuleIndex;
use crate::rule_set::RuntimeRuleSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookaheadSet {
    pub includes_eot: bool,
    pub includes_rt: bool,
    pub includes_up: bool,
    content: BTreeSet<RuleIndex>,
}

impl LookaheadSet {
    pub fn empty() -> Self {
        LookaheadSet::default()
    }

    pub fn eot() -> Self {
        LookaheadSet { includes_eot: true, ..LookaheadSet::default() }
    }

    pub fn rt() -> Self {
        LookaheadSet { includes_rt: true, ..LookaheadSet::default() }
    }

    pub fn up() -> Self {
        LookaheadSet { includes_up: true, ..LookaheadSet::default() }
    }

    pub fn from_terminals<I: IntoIterator<Item = RuleIndex>>(terminals: I) -> Self {
        LookaheadSet {
            content: terminals.into_iter().collect(),
            ..LookaheadSet::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && !self.includes_eot && !self.includes_rt && !self.includes_up
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn contains(&self, terminal: RuleIndex) -> bool {
        self.content.contains(&terminal)
    }

    pub fn terminals(&self) -> impl Iterator<Item = RuleIndex> + '_ {
        self.content.iter().copied()
    }

    pub fn insert(&mut self, terminal: RuleIndex) {
        self.content.insert(terminal);
    }

    pub fn union(&self, other: &LookaheadSet) -> LookaheadSet {
        LookaheadSet {
            includes_eot: self.includes_eot || other.includes_eot,
            includes_rt: self.includes_rt || other.includes_rt,
            includes_up: self.includes_up || other.includes_up,
            content: self.content.union(&other.content).copied().collect(),
        }
    }

    pub fn union_in_place(&mut self, other: &LookaheadSet) {
        self.includes_eot |= other.includes_eot;
        self.includes_rt |= other.includes_rt;
        self.includes_up |= other.includes_up;
        self.content.extend(other.content.iter().copied());
    }

    pub fn intersection(&self, other: &LookaheadSet) -> LookaheadSet {
        LookaheadSet {
            includes_eot: self.includes_eot && other.includes_eot,
            includes_rt: self.includes_rt && other.includes_rt,
            includes_up: self.includes_up && other.includes_up,
            content: self.content.intersection(&other.content).copied().collect(),
        }
    }

    /// True once the set carries only concrete terminals and/or EOT.
    pub fn is_resolved(&self) -> bool {
        !self.includes_rt && !self.includes_up
    }

    pub fn assert_resolved(&self) {
        assert!(
            self.is_resolved(),
            "lookahead set used for matching before RT/UP resolution: {self:?}"
        );
    }

    /// Replace the RT and UP flags with concrete terminals drawn from the
    /// enclosing context. `runtime` stands in for RT, `parent` for UP;
    /// both must themselves be resolved.
    pub fn resolve(&self, runtime: &LookaheadSet, parent: &LookaheadSet) -> LookaheadSet {
        if self.is_resolved() {
            return self.clone();
        }
        runtime.assert_resolved();
        parent.assert_resolved();
        let mut out = LookaheadSet {
            includes_eot: self.includes_eot,
            includes_rt: false,
            includes_up: false,
            content: self.content.clone(),
        };
        if self.includes_rt {
            out.union_in_place(runtime);
        }
        if self.includes_up {
            out.union_in_place(parent);
        }
        out
    }

    /// Tag names of the member terminals, for diagnostics. EOT renders as
    /// its sentinel tag.
    pub fn tags(&self, rules: &RuntimeRuleSet) -> Vec<String> {
        let mut tags: Vec<String> = self
            .content
            .iter()
            .map(|&t| rules.rule(t).tag.clone())
            .collect();
        if self.includes_eot {
            tags.push(crate::rule::END_OF_TEXT.tag.clone());
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merges_terminals_and_flags() {
        let a = LookaheadSet::from_terminals([1, 2]);
        let mut b = LookaheadSet::eot();
        b.insert(2);
        b.insert(3);
        let u = a.union(&b);
        assert!(u.includes_eot);
        assert_eq!(u.terminals().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn intersection_keeps_common_members() {
        let a = LookaheadSet::from_terminals([1, 2, 3]);
        let b = LookaheadSet::from_terminals([2, 3, 4]);
        assert_eq!(a.intersection(&b).terminals().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn resolve_replaces_rt_with_runtime_context() {
        let mut guard = LookaheadSet::rt();
        guard.insert(1);
        let runtime = LookaheadSet::from_terminals([7]).union(&LookaheadSet::eot());
        let resolved = guard.resolve(&runtime, &LookaheadSet::empty());
        assert!(resolved.is_resolved());
        assert!(resolved.includes_eot);
        assert_eq!(resolved.terminals().collect::<Vec<_>>(), vec![1, 7]);
    }

    #[test]
    #[should_panic]
    fn matching_an_unresolved_set_is_fatal() {
        LookaheadSet::rt().assert_resolved();
    }
}
