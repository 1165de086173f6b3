//! # Global Symbol Table
//!
//! Smile identifiers, keywords, and operator names are interned once into a
//! process-wide table and thereafter compared by a 32-bit integer id rather
//! than by string contents, for cheap, `Copy`-able handles. `once_cell`
//! backs the table: a lazily-initialized process-wide singleton without
//! unsafe statics.
//!
//! ## Design
//! - Insertion is monotonic: symbols are never removed, so an id, once
//! handed out, is valid for the remaining lifetime of the process.
//! - A fixed set of [`reserved`] symbols is guaranteed to be interned before
//! any user source is parsed, so the parser and VM can refer to them by
//! `const Symbol` rather than re-interning strings on every lookup.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

/// A 32-bit id naming an interned string. Two symbols are equal iff their
/// ids are equal; comparison is integer equality.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(pub u32);

impl Symbol {
    pub fn id(self) -> u32 {
        self.0
    }

    pub fn name(self) -> String {
        SymbolTable::global().name_of(self)
    }
}

struct SymbolTable {
    by_name: HashMap<String, Symbol>,
    by_id: Vec<String>,
}

impl SymbolTable {
    fn new() -> Self {
        SymbolTable {
            by_name: HashMap::new(),
            by_id: Vec::new(),
        }
    }

    fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.by_name.get(name) {
            return *sym;
        }
        let id = self.by_id.len() as u32;
        let sym = Symbol(id);
        self.by_id.push(name.to_string());
        self.by_name.insert(name.to_string(), sym);
        sym
    }

    fn name_of(&self, sym: Symbol) -> String {
        self.by_id
            .get(sym.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("<unknown-symbol-{}>", sym.0))
    }

    fn global() -> std::sync::MutexGuard<'static, SymbolTable> {
        TABLE.lock().expect("symbol table poisoned")
    }
}

static TABLE: Lazy<Mutex<SymbolTable>> = Lazy::new(|| Mutex::new(SymbolTable::new()));

/// Intern `name`, returning its (possibly newly-allocated) [`Symbol`].
pub fn intern(name: &str) -> Symbol {
    SymbolTable::global().intern(name)
}

/// Look up the interned text for a symbol. Every reachable symbol id is
/// present in the table, so this never fails for a
/// `Symbol` obtained from [`intern`] or from [`reserved`].
pub fn name_of(sym: Symbol) -> String {
    SymbolTable::global().name_of(sym)
}

/// Number of distinct symbols interned so far. Exposed for diagnostics and
/// tests; not part of the language surface.
pub fn count() -> usize {
    SymbolTable::global().by_id.len()
}

/// Macro generating a `reserved` module of lazily-interned, fixed-identity
/// symbols known to the parser, syntax engine, and VM ahead of any user
/// source. Each constant is a zero-argument function rather than a `const`
/// because interning requires taking the table lock exactly once, the first
/// time each reserved symbol is touched.
macro_rules! reserved_symbols {
    ( $( $fn_name:ident => $text:expr ),+ $(,)? ) => {
        $(
            pub fn $fn_name() -> Symbol {
                static SYM: Lazy<Symbol> = Lazy::new(|| intern($text));
                *SYM
            }
        )+
    };
}

/// Symbols with a fixed, well-known identity, used by the parser's built-in
/// precedence ladder, the custom-syntax engine's reserved classes, and the
/// interpreter's intrinsic forms.
pub mod reserved {
    use super::{intern, Symbol};
    use once_cell::sync::Lazy;

    reserved_symbols! {
        set => "$set",
        progn => "$progn",
        quote => "$quote",
        dot => "$dot",
        if_ => "$if",
        list_lit => "$list",

        class_stmt => "_stmt",
        class_expr => "_expr",
        class_cmpexpr => "_cmpexpr",
        class_addexpr => "_addexpr",
        class_mulexpr => "_mulexpr",
        class_binary => "_binary",
        class_unary => "_unary",
        class_postfix => "_postfix",
        class_term => "_term",

        plus => "+",
        minus => "-",
        star => "*",
        slash => "/",
        percent => "%",
        caret => "^",

        and_ => "and",
        or_ => "or",
        not_ => "not",
        is_ => "is",

        eq_ => "==",
        ne_ => "!=",
        lt_ => "<",
        le_ => "<=",
        gt_ => ">",
        ge_ => ">=",
        eqeqeq => "===",
        neeqeq => "!==",
    }

    /// All nine reserved syntax-class symbols, in precedence-ladder order
    ///.
    pub fn syntax_classes() -> [Symbol; 9] {
        [
            class_stmt(),
            class_expr(),
            class_cmpexpr(),
            class_addexpr(),
            class_mulexpr(),
            class_binary(),
            class_unary(),
            class_postfix(),
            class_term(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern("hello");
        let b = intern("hello");
        assert_eq!(a, b);
        assert_eq!(name_of(a), "hello");
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let a = intern("distinct-one");
        let b = intern("distinct-two");
        assert_ne!(a, b);
    }

    #[test]
    fn reserved_symbols_have_stable_identity() {
        assert_eq!(reserved::plus(), reserved::plus());
        assert_eq!(reserved::plus().name(), "+");
        assert_ne!(reserved::plus(), reserved::minus());
    }

    #[test]
    fn syntax_classes_are_distinct() {
        let classes = reserved::syntax_classes();
        for i in 0..classes.len() {
            for j in 0..classes.len() {
                if i != j {
                    assert_ne!(classes[i], classes[j]);
                }
            }
        }
    }
}



