//! # Custom-Syntax Engine
//!
//! Implements the per-scope, copy-on-write trie of user-defined grammar
//! productions. Where the reference runtime crate has no analogous
//! concept (its grammar is fixed), this module is grounded directly in
//! its "Lifetime & ownership" note on `ParserSyntaxTable`/
//! `ParserSyntaxClass`: reference-counted copy-on-write, where a `vfork`
//! operation shallow-clones the structure when its refcount exceeds 1.
//!
//! Rust already has exactly this primitive: [`std::rc::Rc::make_mut`] forks
//! a shared value on first mutation and is a no-op when the `Rc` is
//! uniquely held. Entering a new lexical scope is `Rc::clone` (O(1));
//! extending a scope's rules calls `Rc::make_mut` down the spine of
//! classes/nodes being changed, which is precisely the same
//! shallow-clone-on-refcount-exceeds-1 behavior, done via structural
//! sharing plus a clone-on-write helper.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::symbol::Symbol;
use crate::value::Value;

/// Maximum pattern depth a single rule may have.
pub const MAX_PATTERN_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repetition {
    None,
    Opt,
    Star,
    Plus,
}

impl Repetition {
    fn is_repeating(self) -> bool {
        !matches!(self, Repetition::None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    None,
    Comma,
    Semicolon,
}

/// One element of a rule's pattern, prior to trie insertion.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternElem {
    /// A literal keyword/identifier that must match verbatim.
    Terminal(Symbol),
    /// A reference to another syntax class, optionally bound to a
    /// template variable, with an optional repetition/separator.
    Nonterminal {
        class: Symbol,
        binding: Option<Symbol>,
        repetition: Repetition,
        separator: Separator,
    },
}

impl PatternElem {
    fn key(&self) -> Symbol {
        match self {
            PatternElem::Terminal(s) => *s,
            PatternElem::Nonterminal { class, .. } => *class,
        }
    }

    fn is_nonterminal(&self) -> bool {
        matches!(self, PatternElem::Nonterminal { .. })
    }

    fn repetition(&self) -> Repetition {
        match self {
            PatternElem::Terminal(_) => Repetition::None,
            PatternElem::Nonterminal { repetition, .. } => *repetition,
        }
    }

    fn separator(&self) -> Separator {
        match self {
            PatternElem::Terminal(_) => Separator::None,
            PatternElem::Nonterminal { separator, .. } => *separator,
        }
    }
}

/// A single trie node: one matched pattern element, its possible
/// continuations, and (if this node terminates a rule) the replacement
/// template.
#[derive(Clone, Debug)]
pub struct SyntaxNode {
    pub name: Symbol,
    pub variable: Option<Symbol>,
    pub repetition: Repetition,
    pub separator: Separator,
    pub next: HashMap<Symbol, Rc<SyntaxNode>>,
    pub is_nonterminal: bool,
    pub replacement: Option<Value>,
    pub replacement_variables: Vec<Symbol>,
}

impl SyntaxNode {
    fn new(elem: &PatternElem, binding: Option<Symbol>) -> SyntaxNode {
        SyntaxNode {
            name: elem.key(),
            variable: binding,
            repetition: elem.repetition(),
            separator: elem.separator(),
            next: HashMap::new(),
            is_nonterminal: elem.is_nonterminal(),
            replacement: None,
            replacement_variables: Vec::new(),
        }
    }
}

/// The rules defined for one grammar nonterminal.
#[derive(Clone, Debug)]
pub struct SyntaxClass {
    /// Marked true for a class whose root contains exactly one child node
    /// (invariant 4); enforced at rule-insertion time rather than checked
    /// after the fact.
    pub is_nonterminal: bool,
    pub children: HashMap<Symbol, Rc<SyntaxNode>>,
    /// Classes this class's rules may start with, used to detect cycles in
    /// the "first-nonterminal-of-rule" graph.
    pub first_nonterminal: HashSet<Symbol>,
}

impl SyntaxClass {
    fn new() -> SyntaxClass {
        SyntaxClass {
            is_nonterminal: true,
            children: HashMap::new(),
            first_nonterminal: HashSet::new(),
        }
    }
}

impl Default for SyntaxClass {
    fn default() -> Self {
        SyntaxClass::new()
    }
}

/// A process of scopes' syntax rules: `class-symbol → SyntaxClass`.
#[derive(Clone, Debug, Default)]
pub struct SyntaxTable {
    pub classes: HashMap<Symbol, Rc<SyntaxClass>>,
}

impl SyntaxTable {
    pub fn new() -> Rc<SyntaxTable> {
        Rc::new(SyntaxTable::default())
    }

    /// Enter a new lexical scope: O(1), just bumps the `Rc`'s refcount.
    /// Divergence happens lazily the first time [`insert_rule`] forks a
    /// node on this clone.
    pub fn fork_scope(table: &Rc<SyntaxTable>) -> Rc<SyntaxTable> {
        Rc::clone(table)
    }

    pub fn class(&self, class: Symbol) -> Option<&Rc<SyntaxClass>> {
        self.classes.get(&class)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntaxError {
    PatternTooDeep,
    RepetitionOnFirstElement,
    SeparatorWithoutRepetition,
    /// "cannot fork on nonterminal".
    AmbiguousNonterminalFork,
    AmbiguousTerminalFork,
    DuplicatePattern,
    NullReplacement,
    CyclicNonterminal,
    ReservedClassViolation(&'static str),
    EmptyPattern,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::PatternTooDeep => write!(f, "pattern exceeds maximum depth of {}", MAX_PATTERN_DEPTH),
            SyntaxError::RepetitionOnFirstElement => write!(f, "'?'/'*'/'+' are forbidden on a rule's first element"),
            SyntaxError::SeparatorWithoutRepetition => write!(f, "a separator requires a repetition marker"),
            SyntaxError::AmbiguousNonterminalFork => write!(f, "cannot fork on nonterminal"),
            SyntaxError::AmbiguousTerminalFork => write!(f, "cannot add a terminal where a nonterminal rule already matches"),
            SyntaxError::DuplicatePattern => write!(f, "duplicate syntax pattern"),
            SyntaxError::NullReplacement => write!(f, "syntax rule replacement must not be null"),
            SyntaxError::CyclicNonterminal => write!(f, "rule would create left-recursive nonterminal cycle"),
            SyntaxError::ReservedClassViolation(msg) => write!(f, "{}", msg),
            SyntaxError::EmptyPattern => write!(f, "syntax rule pattern must not be empty"),
        }
    }
}

/// Insert one `#syntax CLASS: [pattern] => template` rule into `table`,
/// forking only the nodes on the affected path. On any rejection the table is left completely unchanged —
/// callers should pass `&mut Rc<SyntaxTable>` that hasn't been partially
/// mutated, which holds here because we validate everything before the
/// first `Rc::make_mut` call.
pub fn insert_rule(
    table: &mut Rc<SyntaxTable>,
    class: Symbol,
    pattern: &[PatternElem],
    replacement: Value,
    replacement_variables: Vec<Symbol>,
) -> Result<(), SyntaxError> {
    if pattern.is_empty() {
        return Err(SyntaxError::EmptyPattern);
    }
    if pattern.len() > MAX_PATTERN_DEPTH {
        return Err(SyntaxError::PatternTooDeep);
    }
    if pattern[0].repetition().is_repeating() {
        return Err(SyntaxError::RepetitionOnFirstElement);
    }
    for elem in pattern {
        if elem.separator() != Separator::None && !elem.repetition().is_repeating() {
            return Err(SyntaxError::SeparatorWithoutRepetition);
        }
    }
    if matches!(replacement, Value::Null) {
        return Err(SyntaxError::NullReplacement);
    }
    validate_reserved_class_constraints(class, pattern)?;

    if let PatternElem::Nonterminal { class: first_class, .. } = &pattern[0] {
        if would_cycle(table, class, *first_class) {
            return Err(SyntaxError::CyclicNonterminal);
        }
    }

    // Validate the whole path up front (without mutating) so rejection
    // leaves `table` untouched.
    validate_path(table, class, pattern)?;

    if Rc::strong_count(table) > 1 {
        tracing::debug!(class = ?class, "vfork: table shared, cloning spine before rule insertion");
    }
    let table_mut = Rc::make_mut(table);
    let class_rc = table_mut.classes.entry(class).or_insert_with(|| Rc::new(SyntaxClass::new()));
    let class_mut = Rc::make_mut(class_rc);
    if let PatternElem::Nonterminal { class: first_class, .. } = &pattern[0] {
        class_mut.first_nonterminal.insert(*first_class);
    }
    insert_into(&mut class_mut.children, pattern, replacement, replacement_variables);
    tracing::debug!(class = ?class, pattern_len = pattern.len(), "syntax rule installed");
    Ok(())
}

/// Walk the trie without mutating anything, checking the ambiguity rules
/// and the duplicate-pattern rule (step 6) so that
/// [`insert_rule`] never has to unwind a partial mutation.
fn validate_path(table: &Rc<SyntaxTable>, class: Symbol, pattern: &[PatternElem]) -> Result<(), SyntaxError> {
    let mut children: Option<&HashMap<Symbol, Rc<SyntaxNode>>> =
    table.classes.get(&class).map(|c| &c.children);

    for (i, elem) in pattern.iter().enumerate() {
        let Some(map) = children else { return Ok(()) };
        check_fork_ambiguity(map, elem)?;
        match map.get(&elem.key()) {
            Some(existing) => {
                if i + 1 == pattern.len() && existing.replacement.is_some() {
                    return Err(SyntaxError::DuplicatePattern);
                }
                children = Some(&existing.next);
            }
            None => return Ok(()),
        }
    }
    Ok(())
}

fn check_fork_ambiguity(children: &HashMap<Symbol, Rc<SyntaxNode>>, elem: &PatternElem) -> Result<(), SyntaxError> {
    if children.is_empty() {
        return Ok(());
    }
    let existing_is_nonterminal = children.values().next().map(|n| n.is_nonterminal()).unwrap_or(false);
    let existing_key_matches = children.contains_key(&elem.key());

    if elem.is_nonterminal() {
        // A parent with a single nonterminal child accepts only an exact
        // match; a parent with terminal children rejects nonterminal
        // injection entirely (invariant 4, step 2).
        if existing_is_nonterminal && !existing_key_matches {
            return Err(SyntaxError::AmbiguousNonterminalFork);
        }
        if !existing_is_nonterminal {
            return Err(SyntaxError::AmbiguousNonterminalFork);
        }
    } else if existing_is_nonterminal {
        return Err(SyntaxError::AmbiguousTerminalFork);
    }
    Ok(())
}

fn insert_into(
    children: &mut HashMap<Symbol, Rc<SyntaxNode>>,
    pattern: &[PatternElem],
    replacement: Value,
    replacement_variables: Vec<Symbol>,
) {
    let elem = &pattern[0];
    let binding = match elem {
        PatternElem::Nonterminal { binding, .. } => *binding,
        PatternElem::Terminal(_) => None,
    };
    let node_rc = children
        .entry(elem.key())
        .or_insert_with(|| Rc::new(SyntaxNode::new(elem, binding)));
    let node = Rc::make_mut(node_rc);

    if pattern.len() == 1 {
        node.replacement = Some(replacement);
        node.replacement_variables = replacement_variables;
    } else {
        insert_into(&mut node.next, &pattern[1..], replacement, replacement_variables);
    }
}

/// Detect whether adding an edge `class -> start_class` would close a
/// cycle in the first-nonterminal graph.
fn would_cycle(table: &Rc<SyntaxTable>, class: Symbol, start_class: Symbol) -> bool {
    if class == start_class {
        return true;
    }
    let mut seen = HashSet::new();
    let mut stack = vec![start_class];
    while let Some(cur) = stack.pop() {
        if cur == class {
            return true;
        }
        if !seen.insert(cur) {
            continue;
        }
        if let Some(syntax_class) = table.classes.get(&cur) {
            for next in &syntax_class.first_nonterminal {
                stack.push(*next);
            }
        }
    }
    false
}

/// Reserved classes impose additional pattern-shape constraints. Class
/// names containing a hyphen are always user-defined and unconstrained.
fn validate_reserved_class_constraints(class: Symbol, pattern: &[PatternElem]) -> Result<(), SyntaxError> {
    let name = class.name();
    if name.contains('-') {
        return Ok(());
    }
    if class == crate::symbol::reserved::class_cmpexpr() {
        let starts_with_keyword = matches!(pattern[0], PatternElem::Terminal(_));
        let starts_with_addexpr = matches!(
            &pattern[0],
            PatternElem::Nonterminal { class, .. } if *class == crate::symbol::reserved::class_addexpr()
        );
        if !starts_with_keyword && !starts_with_addexpr {
            return Err(SyntaxError::ReservedClassViolation(
                "_cmpexpr rules must start with a keyword or an ADDEXPR nonterminal",
            ));
        }
    } else if class == crate::symbol::reserved::class_term() {
        if !matches!(pattern[0], PatternElem::Terminal(_)) {
            return Err(SyntaxError::ReservedClassViolation("_term rules must start with a keyword"));
        }
    }
    Ok(())
}

/// What a successful rule application produces: the substituted
/// replacement tree plus the variable bindings used to build it, kept
/// mainly for diagnostics/tests.
pub struct MatchResult {
    pub tree: Value,
}

/// Minimal interface the parser implements so the syntax engine can drive
/// token lookahead and recursive nonterminal parsing without depending on
/// `crate::parser` directly (keeps the dependency edge one-directional:
/// `parser` depends on `syntax`, not the reverse).
pub trait RuleCursor {
    /// The symbol the current token would contribute if consumed as a
    /// terminal (an identifier's text, or a fixed punctuation symbol);
    /// `None` at end of input or for a token that can't name a terminal.
    fn peek_terminal(&self) -> Option<Symbol>;
    fn consume_terminal(&mut self) -> Symbol;
    /// Attempt to parse nonterminal `class` at the cursor. Returns `None`
    /// (without consuming input) if nothing in `class` matches here.
    fn parse_nonterminal(&mut self, class: Symbol) -> Option<Value>;
    /// Whether the next token is the given separator.
    fn at_separator(&self, sep: Separator) -> bool;
    fn consume_separator(&mut self);
    fn mark(&self) -> usize;
    fn reset(&mut self, mark: usize);
}

/// Try to apply the longest matching rule of `class` at the cursor.
/// Returns `None` if no rule matches, leaving the cursor untouched.
pub fn try_apply(table: &SyntaxTable, class: Symbol, cursor: &mut dyn RuleCursor) -> Option<MatchResult> {
    let root = table.class(class)?;
    let mark = cursor.mark();
    let mut bindings: HashMap<Symbol, Value> = HashMap::new();
    match match_trie(&root.children, cursor, &mut bindings) {
        Some((replacement, vars)) => {
            let tree = substitute(&replacement, &vars, &bindings);
            Some(MatchResult { tree })
        }
        None => {
            cursor.reset(mark);
            None
        }
    }
}

fn match_trie(
    children: &HashMap<Symbol, Rc<SyntaxNode>>,
    cursor: &mut dyn RuleCursor,
    bindings: &mut HashMap<Symbol, Value>,
) -> Option<(Value, Vec<Symbol>)> {
    // Longest-match: try every candidate node whose key matches the
    // lookahead, preferring whichever continuation goes deepest. With the
    // ambiguity invariants enforced at insertion time, at most one
    // candidate can ever apply at any given cursor position.
    for node in children.values() {
        let mark = cursor.mark();
        if node.is_nonterminal() {
            if try_match_nonterminal(node, cursor, bindings) {
                if let Some(found) = descend(node, cursor, bindings) {
                    return Some(found);
                }
            }
        } else if cursor.peek_terminal() == Some(node.name) {
            cursor.consume_terminal();
            if let Some(found) = descend(node, cursor, bindings) {
                return Some(found);
            }
        }
        cursor.reset(mark);
    }
    None
}

fn try_match_nonterminal(node: &SyntaxNode, cursor: &mut dyn RuleCursor, bindings: &mut HashMap<Symbol, Value>) -> bool {
    match node.repetition {
        Repetition::None => match cursor.parse_nonterminal(node.name) {
            Some(v) => {
                if let Some(var) = node.variable {
                    bindings.insert(var, v);
                }
                true
            }
            None => false,
        },
        Repetition::Opt => {
            if let Some(v) = cursor.parse_nonterminal(node.name) {
                if let Some(var) = node.variable {
                    bindings.insert(var, v);
                }
            } else if let Some(var) = node.variable {
                bindings.insert(var, Value::Null);
            }
            true
        }
        Repetition::Star | Repetition::Plus => {
            let mut items = Vec::new();
            loop {
                let mark = cursor.mark();
                match cursor.parse_nonterminal(node.name) {
                    Some(v) => {
                        items.push(v);
                        if cursor.at_separator(node.separator) {
                            cursor.consume_separator();
                        } else {
                            break;
                        }
                    }
                    None => {
                        cursor.reset(mark);
                        break;
                    }
                }
            }
            if node.repetition == Repetition::Plus && items.is_empty() {
                return false;
            }
            if let Some(var) = node.variable {
                bindings.insert(var, crate::value::pair_list::list_of(&items));
            }
            true
        }
    }
}

fn descend(node: &SyntaxNode, cursor: &mut dyn RuleCursor, bindings: &mut HashMap<Symbol, Value>) -> Option<(Value, Vec<Symbol>)> {
    if let Some(replacement) = &node.replacement {
        if node.next.is_empty() {
            return Some((replacement.clone(), node.replacement_variables.clone()));
        }
    }
    if !node.next.is_empty() {
        if let Some(found) = match_trie(&node.next, cursor, bindings) {
            return Some(found);
        }
    }
    node.replacement
        .as_ref()
        .map(|r| (r.clone(), node.replacement_variables.clone()))
}

/// Substitute bound nonterminal variables into a replacement template.
/// Templates are restricted at rule-install time to constants, nonterminal
/// references, `[$quote x]`, `[List.cons() a b]`, `[List.of..]`, and
/// `[List.combine..]`, so
/// substitution never needs to invoke user code — it's a pure tree walk.
fn substitute(template: &Value, vars: &[Symbol], bindings: &HashMap<Symbol, Value>) -> Value {
    match template {
        Value::Symbol(s) if vars.contains(s) => bindings.get(s).cloned().unwrap_or(Value::Null),
        Value::List(_) => {
            let items = crate::value::pair_list::to_vec(template);
            let substituted: Vec<Value> = items.iter().map(|v| substitute(v, vars, bindings)).collect();
            crate::value::pair_list::list_of(&substituted)
        }
        Value::Pair(p) => Value::Pair(Rc::new(crate::value::Pair::new(
            substitute(&p.left, vars, bindings),
            substitute(&p.right, vars, bindings),
        ))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        crate::symbol::intern(s)
    }

    #[test]
    fn insert_and_fetch_single_rule() {
        let mut table = SyntaxTable::new();
        let class = sym("_stmt-test-1");
        let pattern = vec![PatternElem::Terminal(sym("my-if"))];
        insert_rule(&mut table, class, &pattern, Value::int64(1), vec![]).unwrap();
        assert!(table.class(class).unwrap().children.contains_key(&sym("my-if")));
    }

    #[test]
    fn duplicate_pattern_is_rejected() {
        let mut table = SyntaxTable::new();
        let class = sym("_stmt-test-2");
        let pattern = vec![PatternElem::Terminal(sym("dup"))];
        insert_rule(&mut table, class, &pattern, Value::int64(1), vec![]).unwrap();
        let err = insert_rule(&mut table, class, &pattern, Value::int64(2), vec![]).unwrap_err();
        assert_eq!(err, SyntaxError::DuplicatePattern);
    }

    #[test]
    fn ambiguous_terminal_then_nonterminal_fork_is_rejected() {
        let mut table = SyntaxTable::new();
        let class = sym("FOO-test");
        let bar = sym("bar");
        let p1 = vec![PatternElem::Terminal(bar), PatternElem::Terminal(sym("baz"))];
        insert_rule(&mut table, class, &p1, Value::int64(1), vec![]).unwrap();

        // second rule: [bar [OTHER x]] — same first terminal `bar`, but now
        // the *second* position forks between a terminal and a nonterminal.
        let p2 = vec![
            PatternElem::Terminal(bar),
            PatternElem::Nonterminal {
                class: sym("OTHER-test"),
                binding: Some(sym("x")),
                repetition: Repetition::None,
                separator: Separator::None,
            },
        ];
        let err = insert_rule(&mut table, class, &p2, Value::int64(2), vec![]).unwrap_err();
        assert_eq!(err, SyntaxError::AmbiguousNonterminalFork);
    }

    #[test]
    fn vfork_does_not_mutate_shared_parent_scope() {
        let mut parent = SyntaxTable::new();
        let class = sym("_stmt-test-3");
        insert_rule(
            &mut parent,
            class,
            &[PatternElem::Terminal(sym("parent-rule"))],
            Value::int64(1),
            vec![],
        )
            .unwrap();

        let mut child = SyntaxTable::fork_scope(&parent);
        insert_rule(
            &mut child,
            class,
            &[PatternElem::Terminal(sym("child-only-rule"))],
            Value::int64(2),
            vec![],
        )
            .unwrap();

        assert!(!parent.class(class).unwrap().children.contains_key(&sym("child-only-rule")));
        assert!(child.class(class).unwrap().children.contains_key(&sym("child-only-rule")));
        assert!(child.class(class).unwrap().children.contains_key(&sym("parent-rule")));
    }

    #[test]
    fn cyclic_nonterminal_chain_is_rejected_without_mutation() {
        let mut table = SyntaxTable::new();
        let a = sym("A-test");
        let b = sym("B-test");
        // A -> [B..]
        insert_rule(
            &mut table,
            a,
            &[PatternElem::Nonterminal {
                class: b,
                binding: Some(sym("x")),
                repetition: Repetition::None,
                separator: Separator::None,
            }],
            Value::int64(1),
            vec![sym("x")],
        )
            .unwrap();
        // B -> [A..] would close a cycle A -> B -> A.
        let before = table.classes.get(&b).cloned();
        let err = insert_rule(
            &mut table,
            b,
            &[PatternElem::Nonterminal {
                class: a,
                binding: Some(sym("y")),
                repetition: Repetition::None,
                separator: Separator::None,
            }],
            Value::int64(2),
            vec![sym("y")],
        )
            .unwrap_err();
        assert_eq!(err, SyntaxError::CyclicNonterminal);
        assert_eq!(table.classes.get(&b).is_none(), before.is_none());
    }

    #[test]
    fn repetition_on_first_element_is_rejected() {
        let mut table = SyntaxTable::new();
        let pattern = vec![PatternElem::Nonterminal {
            class: sym("EXPR-test"),
            binding: Some(sym("x")),
            repetition: Repetition::Star,
            separator: Separator::None,
        }];
        let err = insert_rule(&mut table, sym("FOO-test-2"), &pattern, Value::int64(1), vec![sym("x")]).unwrap_err();
        assert_eq!(err, SyntaxError::RepetitionOnFirstElement);
    }
}



