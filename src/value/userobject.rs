//! # UserObject — prototypical property bags
//!
//! An insertion-ordered mapping from [`Symbol`] to [`Value`] with an
//! optional `base` pointer for prototypical inheritance. Property lookup
//! walks `base` until a symbol is found or `base` is `Null`.
//!
//! Security bits (`READABLE | WRITABLE | APPENDABLE | REMOVABLE`) gate
//! mutation: clearing `WRITABLE` on an object (e.g. an imported module's
//! namespace) makes every `set_property`/`remove_property` call fail with
//! [`RuntimeError::SecurityError`].

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::symbol::Symbol;
use crate::value::Value;

/// A small hand-rolled bitflags macro, used instead of pulling in a crate
/// for a handful of constant bits.
macro_rules! bitflags_lite {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $( const $flag:ident = $value:expr; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub struct $name($repr);

        impl $name {
            $( pub const $flag: $name = $name($value); )+

            pub const fn empty() -> Self {
                $name(0)
            }
            pub const fn all() -> Self {
                $name($( $value )|+)
            }
            pub fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::all()
            }
        }
    };
}

bitflags_lite! {
    /// Security bits gating mutation of a [`UserObject`].
    pub struct SecurityFlags: u8 {
        const READABLE = 0b0001;
        const WRITABLE = 0b0010;
        const APPENDABLE = 0b0100;
        const REMOVABLE = 0b1000;
    }
}

#[derive(Clone, Debug)]
pub struct UserObject {
    /// Insertion-ordered so that `to_string`/iteration produce stable,
    /// predictable output.
    keys: Vec<Symbol>,
    values: std::collections::HashMap<Symbol, Value>,
    pub base: Option<Rc<UserObject>>,
    pub security: SecurityFlags,
}

impl UserObject {
    pub fn new() -> Self {
        UserObject {
            keys: Vec::new(),
            values: std::collections::HashMap::new(),
            base: None,
            security: SecurityFlags::all(),
        }
    }

    pub fn with_base(base: Rc<UserObject>) -> Self {
        let mut obj = Self::new();
        obj.base = Some(base);
        obj
    }

    /// Insert or overwrite a property directly, bypassing security checks.
    /// Used by the loader/compiler to construct literal `UserObject`s
    /// before they're exposed to running code.
    pub fn define(&mut self, key: Symbol, value: Value) {
        if !self.values.contains_key(&key) {
            self.keys.push(key);
        }
        self.values.insert(key, value);
    }

    /// Property lookup walking the `base` chain.
    pub fn get_property(&self, key: Symbol) -> Option<Value> {
        if let Some(v) = self.values.get(&key) {
            return Some(v.clone());
        }
        self.base.as_ref().and_then(|base| base.get_property(key))
    }

    /// Set a property on `self` only (never on `base`), honoring security
    /// bits: a new key requires `APPENDABLE`, an existing key requires
    /// `WRITABLE`.
    pub fn set_property(&mut self, key: Symbol, value: Value) -> Result<(), RuntimeError> {
        let exists = self.values.contains_key(&key);
        if exists && !self.security.contains(SecurityFlags::WRITABLE) {
            return Err(RuntimeError::SecurityError(format!(
                "cannot write property '{}': object is not writable",
                key.name()
            )));
        }
        if !exists && !self.security.contains(SecurityFlags::APPENDABLE) {
            return Err(RuntimeError::SecurityError(format!(
                "cannot add property '{}': object is not appendable",
                key.name()
            )));
        }
        self.define(key, value);
        Ok(())
    }

    pub fn remove_property(&mut self, key: Symbol) -> Result<(), RuntimeError> {
        if !self.security.contains(SecurityFlags::REMOVABLE) {
            return Err(RuntimeError::SecurityError(format!(
                "cannot remove property '{}': object is not removable",
                key.name()
            )));
        }
        if self.values.remove(&key).is_some() {
            self.keys.retain(|k| *k != key);
        }
        Ok(())
    }

    /// Freeze the object: clear every mutation bit.
    pub fn freeze(&mut self) {
        self.security = SecurityFlags::READABLE;
    }

    pub fn keys(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.keys.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for UserObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for UserObject {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;

    #[test]
    fn property_lookup_walks_base_chain() {
        let mut base = UserObject::new();
        base.define(intern("greeting"), Value::from_str("hello"));
        let base = Rc::new(base);

        let mut child = UserObject::with_base(base);
        child.define(intern("name"), Value::from_str("world"));

        assert_eq!(child.get_property(intern("name")), Some(Value::from_str("world")));
        assert_eq!(child.get_property(intern("greeting")), Some(Value::from_str("hello")));
        assert_eq!(child.get_property(intern("missing")), None);
    }

    #[test]
    fn child_override_shadows_base() {
        let mut base = UserObject::new();
        base.define(intern("x"), Value::int64(1));
        let base = Rc::new(base);

        let mut child = UserObject::with_base(base);
        child.set_property(intern("x"), Value::int64(2)).unwrap();

        assert_eq!(child.get_property(intern("x")), Some(Value::int64(2)));
    }

    #[test]
    fn frozen_object_rejects_writes() {
        let mut obj = UserObject::new();
        obj.define(intern("x"), Value::int64(1));
        obj.freeze();
        assert!(obj.set_property(intern("x"), Value::int64(2)).is_err());
        assert!(obj.set_property(intern("y"), Value::int64(2)).is_err());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut obj = UserObject::new();
        let a = intern("a-key");
        let b = intern("b-key");
        obj.define(b, Value::int64(1));
        obj.define(a, Value::int64(2));
        let keys: Vec<Symbol> = obj.keys().collect();
        assert_eq!(keys, vec![b, a]);
    }
}



