//! Property tests: termination, idempotence, and the GSS work bound.

use std::sync::Arc;

use proptest::prelude::*;

use espalier_runtime::{
    LookaheadSet, RulePosition, RuleSetBuilder, RuntimeRuleRhs, POSITION_END,
};

use crate::automaton::{AutomatonKind, ParserStateSet};
use crate::closure::ClosureCache;
use crate::tests::{ambiguous_rules, arithmetic_rules, left_recursive_rules};
use crate::Parser;

proptest! {
    /// Walking `next_positions` from start always reaches end-of-rule,
    /// whatever the list multiplicity bounds.
    #[test]
    fn list_positions_terminate(min in 0u32..4, extra in 0u32..4, bounded: bool, separated: bool) {
        let max = if bounded { Some(min.max(1) + extra) } else { None };
        let mut builder = RuleSetBuilder::new("lists");
        builder.literal("'x'", "x").literal("','", ",");
        if separated {
            builder.separated_list("L", min, max, "'x'", "','");
        } else {
            builder.list("L", min, max, "'x'");
        }
        let rules = builder.build();
        let l = rules.find_rule("L").unwrap();
        let rhs = &rules.rule(l).rhs;
        for option in rhs.start_options() {
            let mut frontier = vec![RulePosition::start(l, option)];
            let mut seen = frontier.clone();
            let mut reached_end = false;
            let mut steps = 0;
            while let Some(rp) = frontier.pop() {
                steps += 1;
                prop_assert!(steps < 200, "position walk must stay finite");
                for n in rp.next(&rules) {
                    if n.position == POSITION_END {
                        reached_end = true;
                    } else if !seen.contains(&n) {
                        seen.push(n);
                        frontier.push(n);
                    }
                }
            }
            prop_assert!(reached_end, "option {option} never completes");
        }
    }

    /// Left-recursive lists of any length parse, unambiguously.
    #[test]
    fn left_recursive_lists_always_parse(n in 1usize..40) {
        let parser = Parser::new(left_recursive_rules());
        let text = "a".repeat(n);
        let result = parser.parse_for_goal("S", &text).unwrap();
        let tree = result.tree.expect("must parse");
        prop_assert!(!tree.is_ambiguous());
        prop_assert_eq!(tree.root().span, (0, n));
    }

    /// Head counts stay polynomial in the input length even for an
    /// exponentially ambiguous grammar: merged identities bound the work
    /// by states x positions^2, not by the derivation count.
    #[test]
    fn gss_work_is_bounded_by_merging(n in 1usize..9) {
        let rules = ambiguous_rules();
        let goal = rules.goal_rule_for("A").unwrap();
        let automaton = ParserStateSet::new(Arc::clone(&rules), goal, AutomatonKind::LookaheadOne);
        automaton.build_all();
        let states = automaton.state_count();

        let parser = Parser::new(Arc::clone(&rules));
        let text = "a".repeat(n);
        let result = parser.parse_for_goal("A", &text).unwrap();
        prop_assert!(result.tree.is_some());
        let bound = states * (n + 2) * (n + 2);
        prop_assert!(
            result.max_heads <= bound,
            "{} heads exceeds the merge bound {}",
            result.max_heads,
            bound
        );
    }

    /// Closure queries are order-independent: any interleaving of prior
    /// queries yields the same answer as a fresh cache.
    #[test]
    fn closure_results_ignore_query_order(script in prop::collection::vec(0usize..6, 0..12)) {
        let rules = arithmetic_rules();
        let goal = rules.goal_rule_for("S").unwrap();
        let probe = RulePosition::start(goal, 0);

        let mut scrambled = ClosureCache::new(Arc::clone(&rules));
        for step in script {
            match step {
                0 => { scrambled.first_of_rule(rules.find_rule("E").unwrap()); }
                1 => { scrambled.first_of_rule(rules.find_rule("M").unwrap()); }
                2 => { scrambled.parents_of(rules.find_rule("R").unwrap()); }
                3 => { scrambled.first_terminals(probe, &LookaheadSet::rt()); }
                4 => { scrambled.clear(); }
                _ => { scrambled.first_of_rule(rules.terminal_by_tag("'v'").unwrap()); }
            }
        }
        let seen = scrambled.first_terminals(probe, &LookaheadSet::eot());

        let mut fresh = ClosureCache::new(Arc::clone(&rules));
        let expected = fresh.first_terminals(probe, &LookaheadSet::eot());
        prop_assert_eq!(seen, expected);
    }
}

#[test]
fn goal_rules_have_two_positions() {
    let rules = arithmetic_rules();
    let goal = rules.goal_rule_for("S").unwrap();
    match &rules.rule(goal).rhs {
        RuntimeRuleRhs::Goal { item } => {
            assert_eq!(*item, rules.find_rule("S").unwrap());
        }
        other => panic!("expected a goal rhs, got {other:?}"),
    }
    let positions = rules.all_rule_positions(goal);
    assert_eq!(positions, vec![RulePosition::start(goal, 0)]);
}
