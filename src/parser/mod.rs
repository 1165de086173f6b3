//! # Parser
//!
//! Pratt-style recursive-descent parser producing a list-structured
//! s-expression tree, following the grammar layering table laid out for
//! this language and `navicore-cem3`'s parser/lexer split, generalized
//! with a custom-syntax hook at every precedence level.
//!
//! Tokens are materialized into a `Vec<Token>` up front rather than pulled
//! lazily from the lexer, because the custom-syntax engine's longest-match
//! trie walk (`crate::syntax::try_apply`) needs backtracking lookahead —
//! `mark`/`reset` over an index into that vector is the natural fit.

pub mod diagnostics;
mod lexer;

use std::rc::Rc;

use crate::error::{Diagnostic, Position, Severity};
use crate::symbol::{reserved, Symbol};
use crate::syntax::{Repetition, RuleCursor, Separator, SyntaxTable};
use crate::value::pair_list::list_of;
use crate::value::Value;
use diagnostics::DiagnosticList;
use lexer::{Lexer, Token, TokenKind};

/// `BINARYLINEBREAKS` axis of the parser's mode bitfield: whether a binary operator appearing first on a line continues
/// the previous expression.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineBreakMode {
    Allowed,
    Disallowed,
}

/// `COLONMODE` axis: inside a `new` body, `:` separates a member name from
/// its value rather than forming a property access.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColonMode {
    MemberAccess,
    MemberDecl,
}

/// `COMMAMODE` axis: whether a comma continues an argument list at the
/// current binary-operator level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommaMode {
    Normal,
    Nested,
}

#[derive(Clone, Copy, Debug)]
pub struct ParseMode {
    pub line_breaks: LineBreakMode,
    pub colon: ColonMode,
    pub comma: CommaMode,
}

impl Default for ParseMode {
    fn default() -> Self {
        ParseMode {
            line_breaks: LineBreakMode::Allowed,
            colon: ColonMode::MemberAccess,
            comma: CommaMode::Normal,
        }
    }
}

/// Result of [`Parser::parse`].
pub struct ParseOutput {
    pub tree: Value,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    filename: Rc<str>,
    diagnostics: DiagnosticList,
    /// Scoped custom-syntax table; `#syntax` declarations fork it
    /// copy-on-write, and the fork becomes current for the rest of this
    /// (sub-)scope.
    syntax: Rc<SyntaxTable>,
    mode: ParseMode,
}

/// Entry point.
pub fn parse(source: &str, filename: &str) -> ParseOutput {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        filename: Rc::from(filename),
        diagnostics: DiagnosticList::new(),
        syntax: SyntaxTable::new(),
        mode: ParseMode::default(),
    };
    let tree = parser.parse_program();
    ParseOutput {
        tree,
        diagnostics: parser.diagnostics.into_vec(),
    }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn error(&mut self, msg: impl Into<String>) {
        let pos = self.position();
        self.diagnostics.error(pos, msg);
    }

    /// Panic-mode recovery: advance to the next `}`, `]`, or `)`.
    fn recover(&mut self) {
        while !self.at_eof() {
            let is_closer = matches!(self.peek().kind, TokenKind::Punct("}" | "]" | ")"));
            self.advance();
            if is_closer {
                break;
            }
        }
    }

    fn eat_punct(&mut self, p: &'static str) -> bool {
        if self.peek().kind.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &'static str) {
        if !self.eat_punct(p) {
            self.error(format!("expected '{}'", p));
        }
    }

    // ------------------------------------------------------------------
    // Program / statements
    // ------------------------------------------------------------------

    fn parse_program(&mut self) -> Value {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            if self.try_eat_syntax_decl() {
                continue;
            }
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                // Guard against an infinite loop on unrecoverable input.
                self.advance();
            }
        }
        list_of(&[Value::Symbol(reserved::progn()), list_of(&stmts)])
    }

    /// A `#syntax` declaration lexes as the symbol literal `#syntax` (the
    /// lexer treats a leading `#` as introducing a `Symbol` token uniformly,
    /// "Symbol"), not as separate `#`/`syntax` tokens.
    fn at_syntax_decl(&self) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(s) if s == "syntax")
    }

    fn try_eat_syntax_decl(&mut self) -> bool {
        if !self.at_syntax_decl() {
            return false;
        }
        self.parse_syntax_decl();
        true
    }

    /// `#syntax CLASS: [pattern] => template`.
    fn parse_syntax_decl(&mut self) {
        self.advance(); // 'syntax'
        let class_name = match self.advance().kind {
            TokenKind::Ident(name) => name,
            _ => {
                self.error("expected syntax class name");
                self.recover();
                return;
            }
        };
        self.expect_punct(":");
        let class_sym = resolve_class_name(&class_name);

        let mut bindings = Vec::new();
        let pattern = match self.parse_syntax_pattern(&mut bindings) {
            Some(p) => p,
            None => {
                self.error("malformed syntax pattern");
                self.recover();
                return;
            }
        };

        if !self.eat_punct("=") || !self.eat_punct(">") {
            self.error("expected '=>' after syntax pattern");
            self.recover();
            return;
        }

        let replacement = self.parse_expr_toplevel();
        match crate::syntax::insert_rule(&mut self.syntax, class_sym, &pattern, replacement, bindings) {
            Ok(()) => {}
            Err(e) => self.error(e.to_string()),
        }
    }

    fn parse_syntax_pattern(&mut self, bindings: &mut Vec<Symbol>) -> Option<Vec<crate::syntax::PatternElem>> {
        self.expect_punct("[");
        let mut elems = Vec::new();
        while !self.peek().kind.is_punct("]") && !self.at_eof() {
            if self.peek().kind.is_punct("[") {
                self.advance();
                let class_name = match self.advance().kind {
                    TokenKind::Ident(n) => n,
                    _ => return None,
                };
                let binding = match self.advance().kind {
                    TokenKind::Ident(n) => Some(crate::symbol::intern(&n)),
                    _ => None,
                };
                self.expect_punct("]");
                let (repetition, separator) = self.parse_repetition_suffix();
                let class = resolve_class_name(&class_name);
                if let Some(b) = binding {
                    bindings.push(b);
                }
                elems.push(crate::syntax::PatternElem::Nonterminal {
                    class,
                    binding,
                    repetition,
                    separator,
                });
            } else if let TokenKind::Ident(name) = self.peek().kind.clone() {
                self.advance();
                elems.push(crate::syntax::PatternElem::Terminal(crate::symbol::intern(&name)));
            } else {
                return None;
            }
        }
        self.expect_punct("]");
        Some(elems)
    }

    fn parse_repetition_suffix(&mut self) -> (Repetition, Separator) {
        let repetition = if self.eat_punct("*") {
            Repetition::Star
        } else if self.eat_punct("+") {
            Repetition::Plus
        } else if self.peek().kind.is_ident("opt") {
            self.advance();
            Repetition::Opt
        } else {
            return (Repetition::None, Separator::None);
        };
        let separator = if self.eat_punct(",") {
            Separator::Comma
        } else if self.eat_punct(";") {
            Separator::Semicolon
        } else {
            Separator::None
        };
        (repetition, separator)
    }

    /// `stmt → decl | scope | custom(STMT) | assign`.
    fn parse_stmt(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_stmt()) {
            return tree;
        }
        if self.eat_punct("{") {
            return self.parse_scope_body();
        }
        self.parse_assign()
    }

    fn parse_scope_body(&mut self) -> Value {
        let mut stmts = Vec::new();
        while !self.peek().kind.is_punct("}") && !self.at_eof() {
            if self.try_eat_syntax_decl() {
                continue;
            }
            stmts.push(self.parse_stmt());
        }
        self.expect_punct("}");
        list_of(&[Value::Symbol(reserved::progn()), list_of(&stmts)])
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr_toplevel(&mut self) -> Value {
        self.parse_assign()
    }

    /// `assign → opequals`: `lhs = rhs` and the `+=`/`-=`/..
    /// family, lowered to `[$set lhs rhs]` / `[$set lhs [[$dot lhs op] rhs]]`.
    fn parse_assign(&mut self) -> Value {
        let lhs = self.parse_or();
        if self.eat_punct("=") {
            let rhs = self.parse_assign();
            return list_of(&[Value::Symbol(reserved::set()), lhs, rhs]);
        }
        for (tok, op) in [("+=", "+"), ("-=", "-"), ("*=", "*"), ("/=", "/")] {
            if self.peek().kind.is_punct(tok) {
                self.advance();
                let rhs = self.parse_assign();
                let op_sym = crate::symbol::intern(op);
                let combined = dot_call(lhs.clone(), op_sym, rhs);
                return list_of(&[Value::Symbol(reserved::set()), lhs, combined]);
            }
        }
        lhs
    }

    fn parse_or(&mut self) -> Value {
        let mut lhs = self.parse_and();
        while self.peek().kind.is_ident("or") {
            self.advance();
            let rhs = self.parse_and();
            lhs = list_of(&[Value::Symbol(reserved::or_()), lhs, rhs]);
        }
        lhs
    }

    fn parse_and(&mut self) -> Value {
        let mut lhs = self.parse_not();
        while self.peek().kind.is_ident("and") {
            self.advance();
            let rhs = self.parse_not();
            lhs = list_of(&[Value::Symbol(reserved::and_()), lhs, rhs]);
        }
        lhs
    }

    fn parse_not(&mut self) -> Value {
        if self.peek().kind.is_ident("not") {
            self.advance();
            let operand = self.parse_not();
            return list_of(&[Value::Symbol(reserved::not_()), operand]);
        }
        self.parse_cmp()
    }

    const CMP_OPS: &'static [&'static str] = &["<=", ">=", "==", "!=", "===", "!==", "<", ">"];

    /// `cmp → add (cmpop add)*`. Chains lower pairwise, left to
    /// right; `is` is handled as its own comparison keyword.
    fn parse_cmp(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_cmpexpr()) {
            return tree;
        }
        let mut lhs = self.parse_add();
        loop {
            if self.peek().kind.is_ident("is") {
                self.advance();
                let rhs = self.parse_add();
                lhs = list_of(&[Value::Symbol(reserved::is_()), lhs, rhs]);
                continue;
            }
            let matched = Self::CMP_OPS.iter().find(|op| self.peek().kind.is_punct(op)).copied();
            match matched {
                Some(op) => {
                    self.advance();
                    let rhs = self.parse_add();
                    lhs = list_of(&[Value::Symbol(crate::symbol::intern(op)), lhs, rhs]);
                }
                None => break,
            }
        }
        lhs
    }

    /// `add → mul (('+'|'-') mul)*`.
    fn parse_add(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_addexpr()) {
            return tree;
        }
        let mut lhs = self.parse_mul();
        loop {
            let op = if self.peek().kind.is_punct("+") {
                Some(reserved::plus())
            } else if self.peek().kind.is_punct("-") && !self.at_line_broken_operator() {
                Some(reserved::minus())
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.advance();
                    let rhs = self.parse_mul();
                    lhs = dot_call(lhs, op, rhs);
                }
                None => break,
            }
        }
        lhs
    }

    /// When `BINARYLINEBREAKS` is disallowed and a binary operator is the
    /// first token on its line, it does not continue the previous
    /// expression. Inside any ``/`[]`/`{}`
    /// grouping the mode resets to `Allowed` (tracked via `self.mode`
    /// while recursing into `parse_group`), so this only ever bites at the
    /// statement level.
    fn at_line_broken_operator(&self) -> bool {
        matches!(self.mode.line_breaks, LineBreakMode::Disallowed) && self.peek().at_line_start
    }

    /// `mul → binary (('*'|'/') binary)*`.
    fn parse_mul(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_mulexpr()) {
            return tree;
        }
        let mut lhs = self.parse_binary();
        loop {
            let op = if self.peek().kind.is_punct("*") {
                Some(reserved::star())
            } else if self.peek().kind.is_punct("/") {
                Some(reserved::slash())
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.advance();
                    let rhs = self.parse_binary();
                    lhs = dot_call(lhs, op, rhs);
                }
                None => break,
            }
        }
        lhs
    }

    /// `binary → colon ( <arbitrary-identifier> colon (',' colon)* )*`
    /// — a user-named infix operator, e.g. `a xor b`. Lowers to
    /// the same `[[$dot lhs op] rhs,..]` shape as built-in operators.
    ///
    /// Also handles juxtaposition calls, `callee arg1 arg2..` with no
    /// parentheses (e.g. `List.of 1 2 3`): once the named-infix-operator
    /// loop above has nothing left to consume, a same-line term-start token
    /// that isn't an `Ident` (so it can't be mistaken for another named
    /// operator) starts a bare argument list for `lhs`.
    fn parse_binary(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_binary()) {
            return tree;
        }
        let mut lhs = self.parse_colon();
        loop {
            if let TokenKind::Ident(name) = self.peek().kind.clone() {
                if is_reserved_keyword(&name) {
                    break;
                }
                self.advance();
                let op = crate::symbol::intern(&name);
                let mut args = vec![self.parse_colon()];
                while self.eat_punct(",") {
                    args.push(self.parse_colon());
                }
                let mut call = vec![dot_access(lhs, op)];
                call.extend(args);
                lhs = list_of(&call);
                continue;
            }
            if self.starts_juxtaposed_arg() {
                let mut call = vec![lhs];
                while self.starts_juxtaposed_arg() {
                    call.push(self.parse_colon());
                }
                lhs = list_of(&call);
                continue;
            }
            break;
        }
        lhs
    }

    /// True when the next token can begin a juxtaposition-call argument:
    /// on the same source line (a new line starts a new statement) and
    /// a "simple term start" that cannot be confused with the
    /// named-infix-operator loop above (which claims bare `Ident`s) or with
    /// a binary/postfix operator continuing the current expression.
    fn starts_juxtaposed_arg(&self) -> bool {
        let tok = self.peek();
        if tok.at_line_start {
            return false;
        }
        matches!(
            tok.kind,
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Char(_)
            | TokenKind::Symbol(_)
            | TokenKind::Punct("(")
            | TokenKind::Punct("[")
        )
    }

    /// `colon → range (':' range)*`. Outside a `new` body this
    /// is the generic "pair with a label" operator; inside one, `:`
    /// separates a member name from its value instead (`COLONMODE`).
    fn parse_colon(&mut self) -> Value {
        let mut lhs = self.parse_range();
        while matches!(self.mode.colon, ColonMode::MemberAccess) && self.peek().kind.is_punct(":") {
            self.advance();
            let rhs = self.parse_range();
            lhs = list_of(&[Value::Symbol(crate::symbol::intern(":")), lhs, rhs]);
        }
        lhs
    }

    /// `range → unary ('.' unary)?`.
    fn parse_range(&mut self) -> Value {
        let lhs = self.parse_unary();
        if self.eat_punct(".") {
            let rhs = self.parse_unary();
            return list_of(&[Value::Symbol(crate::symbol::intern(".")), lhs, rhs]);
        }
        lhs
    }

    const PREFIX_OPS: &'static [&'static str] = &["-", "!", "~"];

    /// `unary → <arbitrary-prefix-op>* new`.
    fn parse_unary(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_unary()) {
            return tree;
        }
        if let Some(op) = Self::PREFIX_OPS.iter().find(|op| self.peek().kind.is_punct(op)).copied() {
            self.advance();
            let operand = self.parse_unary();
            return list_of(&[Value::Symbol(crate::symbol::intern(op)), operand]);
        }
        self.parse_new()
    }

    /// `new → 'new' (dot)? '{' members '}' | doublehash`.
    fn parse_new(&mut self) -> Value {
        if self.peek().kind.is_ident("new") {
            self.advance();
            let base = if !self.peek().kind.is_punct("{") {
                Some(self.parse_dot())
            } else {
                None
            };
            self.expect_punct("{");
            let saved_colon = self.mode.colon;
            self.mode.colon = ColonMode::MemberDecl;
            let mut members = Vec::new();
            while !self.peek().kind.is_punct("}") && !self.at_eof() {
                let name = match self.advance().kind {
                    TokenKind::Ident(n) => crate::symbol::intern(&n),
                    _ => {
                        self.error("expected member name in 'new' block");
                        break;
                    }
                };
                self.expect_punct(":");
                let value = self.parse_assign();
                members.push(list_of(&[Value::Symbol(name), value]));
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}");
            self.mode.colon = saved_colon;
            let members_list = list_of(&members);
            return match base {
                Some(b) => list_of(&[Value::Symbol(crate::symbol::intern("new")), b, members_list]),
                None => list_of(&[Value::Symbol(crate::symbol::intern("new")), members_list]),
            };
        }
        self.parse_doublehash()
    }

    /// `doublehash → dot ( '##' dot )*` — Smile's template/splice
    /// concatenation operator.
    fn parse_doublehash(&mut self) -> Value {
        let mut lhs = self.parse_dot();
        while self.eat_punct("##") {
            let rhs = self.parse_dot();
            lhs = list_of(&[Value::Symbol(crate::symbol::intern("##")), lhs, rhs]);
        }
        lhs
    }

    /// `dot → term ( '.' name )*`: plain (non-call) property
    /// access, `[$dot base name]`.
    fn parse_dot(&mut self) -> Value {
        let mut lhs = self.parse_postfix();
        while self.eat_punct(".") {
            let name = match self.advance().kind {
                TokenKind::Ident(n) => crate::symbol::intern(&n),
                _ => {
                    self.error("expected property name after '.'");
                    continue;
                }
            };
            lhs = dot_access(lhs, name);
        }
        lhs
    }

    fn parse_postfix(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_postfix()) {
            return tree;
        }
        let mut expr = self.parse_term();
        // Direct function-call postfix: `f(a, b)`.
        while self.peek().kind.is_punct("(") {
            self.advance();
            let mut args = vec![expr];
            if !self.peek().kind.is_punct(")") {
                args.push(self.parse_assign());
                while self.eat_punct(",") {
                    args.push(self.parse_assign());
                }
            }
            self.expect_punct(")");
            expr = list_of(&args);
        }
        expr
    }

    /// `term → primitives | '(' expr ')' | '[' raw-list ']' | ...`
    fn parse_term(&mut self) -> Value {
        if let Some(tree) = self.try_custom(reserved::class_term()) {
            return tree;
        }
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.advance();
                Value::int64(n)
            }
            TokenKind::Float(f) => {
                self.advance();
                Value::Float64(crate::value::numeric::Float64Value(f))
            }
            TokenKind::Str(s) => {
                self.advance();
                Value::from_str(&s)
            }
            TokenKind::Char(c) => {
                self.advance();
                Value::Char(c)
            }
            TokenKind::Symbol(name) => {
                self.advance();
                Value::Symbol(crate::symbol::intern(&name))
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "null" => Value::Null,
                    "true" => Value::bool(true),
                    "false" => Value::bool(false),
                    _ => Value::Symbol(crate::symbol::intern(&name)),
                }
            }
            TokenKind::Punct("(") => {
                self.advance();
                let saved = self.mode.line_breaks;
                self.mode.line_breaks = LineBreakMode::Allowed;
                let inner = self.parse_assign();
                self.mode.line_breaks = saved;
                self.expect_punct(")");
                inner
            }
            TokenKind::Punct("[") => {
                self.advance();
                let saved = self.mode.line_breaks;
                self.mode.line_breaks = LineBreakMode::Allowed;
                let mut items = Vec::new();
                while !self.peek().kind.is_punct("]") && !self.at_eof() {
                    items.push(self.parse_assign());
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.mode.line_breaks = saved;
                self.expect_punct("]");
                // Tagged with `$list` so the compiler can tell a bracket
                // literal apart from a call-shaped bare list.
                list_of(&[Value::Symbol(reserved::list_lit()), list_of(&items)])
            }
            TokenKind::Eof => {
                self.error("unexpected end of input");
                Value::Null
            }
            _ => {
                self.error(format!("unexpected token {:?}", tok.kind));
                self.advance();
                Value::Null
            }
        }
    }

    /// Try the custom-syntax rule table for `class` before falling back to
    /// the built-in rule at this precedence level.
    fn try_custom(&mut self, class: Symbol) -> Option<Value> {
        if self.syntax.class(class).is_none() {
            return None;
        }
        let syntax = Rc::clone(&self.syntax);
        let mut cursor = Cursor { parser: self };
        crate::syntax::try_apply(&syntax, class, &mut cursor).map(|m| m.tree)
    }
}

/// Adapts [`Parser`] to [`crate::syntax::RuleCursor`] so the syntax engine
/// can drive lookahead and recursive nonterminal parsing without knowing
/// about token streams directly.
struct Cursor<'p> {
    parser: &'p mut Parser,
}

impl<'p> RuleCursor for Cursor<'p> {
    fn peek_terminal(&self) -> Option<Symbol> {
        match &self.parser.peek().kind {
            TokenKind::Ident(name) => Some(crate::symbol::intern(name)),
            TokenKind::Punct(p) => Some(crate::symbol::intern(p)),
            _ => None,
        }
    }

    fn consume_terminal(&mut self) -> Symbol {
        let sym = self.peek_terminal().unwrap_or_else(|| crate::symbol::intern(""));
        self.parser.advance();
        sym
    }

    fn parse_nonterminal(&mut self, class: Symbol) -> Option<Value> {
        let mark = self.mark();
        let value = dispatch_nonterminal(self.parser, class);
        if self.parser.pos == mark {
            // No progress: treat as "did not match" only when the class
            // genuinely produced nothing (e.g. immediate EOF); otherwise a
            // single-token nonterminal legitimately advances by exactly
            // enough, so we still return it.
            if self.parser.at_eof() {
                return None;
            }
        }
        Some(value)
    }

    fn at_separator(&self, sep: Separator) -> bool {
        match sep {
            Separator::None => false,
            Separator::Comma => self.parser.peek().kind.is_punct(","),
            Separator::Semicolon => self.parser.peek().kind.is_punct(";"),
        }
    }

    fn consume_separator(&mut self) {
        self.parser.advance();
    }

    fn mark(&self) -> usize {
        self.parser.pos
    }

    fn reset(&mut self, mark: usize) {
        self.parser.pos = mark;
    }
}

/// Map a syntax-class symbol to the parser entry point that implements its
/// built-in grammar level, used both when
/// the syntax engine recurses into a nonterminal and when resolving a
/// pattern's `[CLASSNAME..]` element to a concrete class symbol.
fn dispatch_nonterminal(parser: &mut Parser, class: Symbol) -> Value {
    let r = &reserved::syntax_classes();
    if class == r[0] {
        parser.parse_stmt()
    } else if class == r[1] {
        parser.parse_assign()
    } else if class == r[2] {
        parser.parse_cmp()
    } else if class == r[3] {
        parser.parse_add()
    } else if class == r[4] {
        parser.parse_mul()
    } else if class == r[5] {
        parser.parse_binary()
    } else if class == r[6] {
        parser.parse_unary()
    } else if class == r[7] {
        parser.parse_postfix()
    } else if class == r[8] {
        parser.parse_term()
    } else {
        // A user-defined class with no built-in grammar level of its own
        // can still be referenced as a nonterminal by another rule; it
        // only ever matches via its own custom rules.
        parser.parse_term()
    }
}

fn resolve_class_name(name: &str) -> Symbol {
    match name {
        "STMT" => reserved::class_stmt(),
        "EXPR" => reserved::class_expr(),
        "CMPEXPR" => reserved::class_cmpexpr(),
        "ADDEXPR" => reserved::class_addexpr(),
        "MULEXPR" => reserved::class_mulexpr(),
        "BINARY" => reserved::class_binary(),
        "UNARY" => reserved::class_unary(),
        "POSTFIX" => reserved::class_postfix(),
        "TERM" => reserved::class_term(),
        other => crate::symbol::intern(other),
    }
}

fn is_reserved_keyword(name: &str) -> bool {
    matches!(name, "and" | "or" | "not" | "is" | "new" | "null" | "true" | "false")
}

fn dot_access(base: Value, name: Symbol) -> Value {
    list_of(&[Value::Symbol(reserved::dot()), base, Value::Symbol(name)])
}

fn dot_call(lhs: Value, op: Symbol, rhs: Value) -> Value {
    list_of(&[dot_access(lhs, op), rhs])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_lowering_matches_spec_scenario_1() {
        let out = parse("1 + 2 * 3", "test");
        assert!(out.diagnostics.is_empty());
        let stmts = match &out.tree {
            Value::List(_) => crate::value::pair_list::to_vec(&out.tree),
            _ => panic!("expected progn list"),
        };
        assert_eq!(stmts[0], Value::Symbol(reserved::progn()));
        let body = crate::value::pair_list::to_vec(&stmts[1])[0].clone();
        // [[$dot 1 +] [[$dot 2 *] 3]]
        let expected = dot_call(Value::int64(1), reserved::plus(), dot_call(Value::int64(2), reserved::star(), Value::int64(3)));
        assert_eq!(body, expected);
    }

    #[test]
    fn juxtaposition_call_matches_spec_scenario_2() {
        let out = parse("List.of 1 2 3", "test");
        assert!(out.diagnostics.is_empty());
        let stmts = crate::value::pair_list::to_vec(&out.tree);
        let body = crate::value::pair_list::to_vec(&stmts[1])[0].clone();
        let callee = dot_access(Value::Symbol(crate::symbol::intern("List")), crate::symbol::intern("of"));
        assert_eq!(
            crate::value::pair_list::to_vec(&body),
            vec![callee, Value::int64(1), Value::int64(2), Value::int64(3)]
        );
    }

    #[test]
    fn juxtaposition_call_accepts_a_tagged_bracket_literal_argument() {
        let out = parse("List.cons() 1 [2, 3]", "test");
        assert!(out.diagnostics.is_empty());
        let stmts = crate::value::pair_list::to_vec(&out.tree);
        let body = crate::value::pair_list::to_vec(&stmts[1])[0].clone();
        let items = crate::value::pair_list::to_vec(&body);
        assert_eq!(items.len(), 3);
        let tagged = crate::value::pair_list::to_vec(&items[2]);
        assert_eq!(tagged[0], Value::Symbol(reserved::list_lit()));
        assert_eq!(
            crate::value::pair_list::to_vec(&tagged[1]),
            vec![Value::int64(2), Value::int64(3)]
        );
    }

    #[test]
    fn juxtaposition_call_does_not_cross_a_line_break() {
        let out = parse("f\n1", "test");
        assert!(out.diagnostics.is_empty());
        let stmts = crate::value::pair_list::to_vec(&out.tree);
        let body = crate::value::pair_list::to_vec(&stmts[1]);
        assert_eq!(body.len(), 2);
        assert_eq!(body[0], Value::Symbol(crate::symbol::intern("f")));
        assert_eq!(body[1], Value::int64(1));
    }

    #[test]
    fn parses_bracket_list_literal() {
        let out = parse("[1, 2, 3]", "test");
        let stmts = crate::value::pair_list::to_vec(&out.tree);
        let body = crate::value::pair_list::to_vec(&stmts[1])[0].clone();
        let tagged = crate::value::pair_list::to_vec(&body);
        assert_eq!(tagged[0], Value::Symbol(reserved::list_lit()));
        assert_eq!(
            crate::value::pair_list::to_vec(&tagged[1]),
            vec![Value::int64(1), Value::int64(2), Value::int64(3)]
        );
    }

    #[test]
    fn custom_syntax_rule_applies_only_in_its_scope() {
        let mut lexer_src = String::new();
        lexer_src.push_str("#syntax STMT: [my-if [EXPR c] then [STMT t] else [STMT e]] => [$if c t e]\n");
        lexer_src.push_str("my-if x then 1 else 2");
        let out = parse(&lexer_src, "test");
        assert!(out.diagnostics.iter().all(|d| d.severity < Severity::Error), "{:?}", out.diagnostics);

        let out2 = parse("my-if x then 1 else 2", "test");
        assert!(out2.diagnostics.iter().any(|d| d.severity >= Severity::Error));
    }

    #[test]
    fn unterminated_group_recovers_with_diagnostic() {
        let out = parse("(1 + 2", "test");
        assert!(out.diagnostics.iter().any(|d| d.severity >= Severity::Error));
    }
}



