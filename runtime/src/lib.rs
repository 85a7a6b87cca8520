//! Runtime rule model for the Espalier grammar-driven parser.
//!
//! This crate holds everything the parser machinery consumes but never
//! mutates: the normalized rule model ([`RuntimeRule`]/[`RuntimeRuleRhs`]
//! and [`RuntimeRuleSet`]), the rule-position calculus
//! ([`RulePosition`]), lookahead sets ([`LookaheadSet`]), precedence
//! rules, the rule-set builder, and the parse-tree output types.
//!
//! Rule sets are built once per grammar (via [`RuleSetBuilder`]) and
//! shared read-only across parses. The parsing machinery itself lives in
//! the `espalier-parser` crate.

mod builder;
mod display;
mod lookahead;
mod position;
mod precedence;
mod rhs;
mod rule;
mod rule_set;
mod tree;

pub use builder::RuleSetBuilder;
pub use display::{format_rhs, format_rule_set};
pub use lookahead::LookaheadSet;
pub use position::{
    RuleIndex, RuleOption, RulePosition, POSITION_END, POSITION_MULTI_ITEM,
    POSITION_MULTI_SEPARATOR, POSITION_START,
};
pub use precedence::{Associativity, PrecedenceEntry, PrecedenceRule};
pub use rhs::{ChoiceKind, RuntimeRuleRhs, TerminalRhs, OPTION_EMPTY, OPTION_ITEMS};
pub use rule::{
    RuleKind, RuntimeRule, EMPTY, EMPTY_LIST, END_OF_TEXT, RULE_EMPTY, RULE_EMPTY_LIST, RULE_EOT,
    SENTINEL_RULE_SET,
};
pub use rule_set::RuntimeRuleSet;
pub use tree::{ParseTree, TreeNode, TreeNodeId, TreeNodeKind};
