//! Precedence/associativity rules for disambiguation.
//!
//! Precedence disambiguation is a policy layered on top of the base GSS
//! algorithm: it never changes closure or lookahead computation, it only
//! decides, at GRAFT time, whether a completed child derivation may extend
//! a parent operator derivation. The decision function lives here so it
//! can be specified and tested independently of the engine.

/// Associativity of an operator entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// One operator row of a precedence rule: the target rule option it
/// governs, the operator terminals that identify it, its level (higher
/// binds tighter), and its associativity.
#[derive(Debug, Clone)]
pub struct PrecedenceEntry {
    pub target_tag: String,
    /// Restrict the entry to one option of the target rule, or cover all.
    pub option: Option<u32>,
    pub operator_tags: Vec<String>,
    pub associativity: Associativity,
    pub level: u32,
}

/// Precedence rules scoped to one context rule (typically the expression
/// choice rule of the grammar).
#[derive(Debug, Clone)]
pub struct PrecedenceRule {
    pub context_tag: String,
    pub entries: Vec<PrecedenceEntry>,
}

impl PrecedenceRule {
    pub fn new(context_tag: &str) -> Self {
        PrecedenceRule { context_tag: context_tag.to_string(), entries: Vec::new() }
    }

    pub fn entry(
        mut self,
        target_tag: &str,
        option: Option<u32>,
        operator_tags: &[&str],
        associativity: Associativity,
        level: u32,
    ) -> Self {
        self.entries.push(PrecedenceEntry {
            target_tag: target_tag.to_string(),
            option,
            operator_tags: operator_tags.iter().map(|s| s.to_string()).collect(),
            associativity,
            level,
        });
        self
    }

    fn level_of(&self, tag: &str, option: u32) -> Option<&PrecedenceEntry> {
        self.entries
            .iter()
            .find(|e| e.target_tag == tag && e.option.map_or(true, |o| o == option))
    }

    /// May a completed `(child_tag, child_option)` derivation become an
    /// operand of `(parent_tag, parent_option)`?
    ///
    /// A child with no entry is an atom and always allowed. A governed
    /// child must bind tighter than the parent; at equal level the
    /// parent's associativity decides: a left-associative operator rejects
    /// itself as its rightmost operand (and symmetrically for right).
    pub fn allows_graft(
        &self,
        parent_tag: &str,
        parent_option: u32,
        child_tag: &str,
        child_option: u32,
        child_is_rightmost: bool,
    ) -> bool {
        let parent = match self.level_of(parent_tag, parent_option) {
            Some(p) => p,
            None => return true,
        };
        let child = match self.level_of(child_tag, child_option) {
            Some(c) => c,
            None => return true,
        };
        if child.level > parent.level {
            return true;
        }
        if child.level < parent.level {
            return false;
        }
        match parent.associativity {
            Associativity::Left => !child_is_rightmost,
            Associativity::Right => child_is_rightmost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic() -> PrecedenceRule {
        PrecedenceRule::new("E")
            .entry("add", None, &["'+'"], Associativity::Left, 1)
            .entry("mul", None, &["'*'"], Associativity::Left, 2)
    }

    #[test]
    fn tighter_child_is_allowed_under_looser_parent() {
        let p = arithmetic();
        assert!(p.allows_graft("add", 0, "mul", 0, true));
        assert!(!p.allows_graft("mul", 0, "add", 0, true));
    }

    #[test]
    fn left_associativity_rejects_self_on_the_right() {
        let p = arithmetic();
        assert!(p.allows_graft("add", 0, "add", 0, false));
        assert!(!p.allows_graft("add", 0, "add", 0, true));
    }

    #[test]
    fn ungoverned_rules_are_atoms() {
        let p = arithmetic();
        assert!(p.allows_graft("add", 0, "var", 0, true));
        assert!(p.allows_graft("var", 0, "add", 0, true));
    }
}
