//! Automaton-build and parse benchmarks.
//!
//! Covers the two costs a host pays: compiling a rule set's automaton
//! (once per goal) and parsing sentences of growing length (per call),
//! for an unambiguous concatenation, a left-recursive list, and a
//! priority-choice expression grammar.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use espalier_parser::{AutomatonKind, Parser, ParserStateSet};
use espalier_runtime::{ChoiceKind, RuleSetBuilder, RuntimeRuleSet};

fn arithmetic_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("arith")
        .skip_pattern("WS", r"\s+")
        .literal("'v'", "v")
        .literal("'m'", "m")
        .literal("'a'", "a")
        .concatenation("R", &["'v'"])
        .separated_list("M", 2, None, "E", "'m'")
        .separated_list("A", 2, None, "E", "'a'")
        .choice("E", ChoiceKind::PriorityLongest, &[&["R"], &["M"], &["A"]])
        .concatenation("S", &["E"])
        .build()
}

fn left_recursive_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("leftrec")
        .literal("'a'", "a")
        .choice("S", ChoiceKind::LongestPriority, &[&["'a'"], &["S", "'a'"]])
        .build()
}

/// `v m v a v m v a ...` with `n` operands.
fn expression_sentence(n: usize) -> String {
    let mut out = String::with_capacity(2 * n);
    for i in 0..n {
        if i > 0 {
            out.push(if i % 2 == 0 { 'a' } else { 'm' });
        }
        out.push('v');
    }
    out
}

fn bench_automaton_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("automaton/build_all");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));

    let specs = [("arithmetic", arithmetic_rules()), ("leftrec", left_recursive_rules())];
    for (name, rules) in &specs {
        let goal = rules.goal_rule_for("S").unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), rules, |b, rules| {
            b.iter(|| {
                let automaton =
                    ParserStateSet::new(Arc::clone(rules), goal, AutomatonKind::LookaheadOne);
                automaton.build_all();
                automaton.state_count()
            });
        });
    }
    group.finish();
}

fn bench_parse_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse/expression");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));

    let parser = Parser::new(arithmetic_rules());
    parser.build_for("S", AutomatonKind::LookaheadOne).unwrap();
    for n in [4usize, 16, 64] {
        let sentence = expression_sentence(n);
        group.throughput(Throughput::Bytes(sentence.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &sentence, |b, sentence| {
            b.iter(|| {
                let result = parser.parse_for_goal("S", sentence).unwrap();
                assert!(result.tree.is_some());
                result.rounds
            });
        });
    }
    group.finish();
}

fn bench_parse_left_recursive(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse/left_recursive");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));

    let parser = Parser::new(left_recursive_rules());
    parser.build_for("S", AutomatonKind::LookaheadOne).unwrap();
    for n in [8usize, 64, 256] {
        let sentence = "a".repeat(n);
        group.throughput(Throughput::Bytes(sentence.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &sentence, |b, sentence| {
            b.iter(|| {
                let result = parser.parse_for_goal("S", sentence).unwrap();
                assert!(result.tree.is_some());
                result.max_heads
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_automaton_build,
    bench_parse_expression,
    bench_parse_left_recursive
);
criterion_main!(benches);
