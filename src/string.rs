//! # The Smile String Type
//!
//! [`SmileString`] is an immutable `(length, bytes)` sequence with a
//! trailing NUL byte for FFI convenience. NUL is a legal
//! interior byte; `length`, not the NUL, bounds every operation. Instances
//! are reference-counted (`Rc<[u8]>`) so that cloning a `SmileString` is a
//! pointer-and-refcount bump, matching the reference preference for `Rc`
//! over deep copies on its own mutable collection types (`Value::List`,
//! `Value::Dict` in `value.rs`).
//!
//! Unicode-aware operations (case mapping, normalization, wildcard
//! matching) delegate to [`crate::unicode`]; this module owns byte-level
//! operations (slicing, search, padding, hashing, splitting/joining,
//! formatting, encoding).

use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::unicode::{self, wildcard::WildcardOptions};

/// An immutable, reference-counted, NUL-terminated byte sequence.
#[derive(Clone)]
pub struct SmileString {
    /// Backing storage, `len + 1` bytes long; `data[len] == 0`.
    data: Rc<[u8]>,
    len: usize,
}

static EMPTY: Lazy<SmileString> = Lazy::new(|| SmileString::from_bytes(&[]));

impl SmileString {
    /// The shared empty-string singleton.
    pub fn empty() -> SmileString {
        EMPTY.clone()
    }

    /// Build a `SmileString` from raw bytes, appending the trailing NUL.
    /// `bytes` need not be valid UTF-8: Smile strings are byte sequences,
    /// not code-point sequences, for most operations.
    pub fn from_bytes(bytes: &[u8]) -> SmileString {
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.extend_from_slice(bytes);
        buf.push(0);
        SmileString {
            data: Rc::from(buf.into_boxed_slice()),
            len: bytes.len(),
        }
    }

    pub fn from_str(s: &str) -> SmileString {
        SmileString::from_bytes(s.as_bytes())
    }

    /// Logical length in bytes (excludes the trailing NUL).
    pub fn length(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw bytes, excluding the trailing NUL.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Lossy UTF-8 view, substituting U+FFFD for invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    /// `byte_at(s, i)` from testable property. Panics on
    /// out-of-range `i` exactly like indexing a `Vec` would; callers that
    /// need a checked variant should check `length` first, matching how
    /// the VM's fast-path opcodes (`LdA`, `LdD`, etc.) are specified to fail
    /// with a typed `IndexError` rather than panicking (see `vm::ops_struct`).
    pub fn byte_at(&self, i: usize) -> u8 {
        self.as_bytes()[i]
    }

    pub fn try_byte_at(&self, i: usize) -> Option<u8> {
        self.as_bytes().get(i).copied()
    }

    /// Iterate decoded `char`s using lossy UTF-8 decoding.
    pub fn chars(&self) -> Vec<char> {
        unicode::chars_lossy(self.as_bytes())
    }

    // ---- comparison -----------------------------------------------------

    /// Byte-wise lexicographic comparison. Reflexive and anti-symmetric
    ///: `compare(s, t) == -compare(t, s)`.
    pub fn compare(&self, other: &SmileString) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }

    pub fn compare_ci(&self, other: &SmileString) -> std::cmp::Ordering {
        unicode::fold(&self.to_string_lossy()).cmp(&unicode::fold(&other.to_string_lossy()))
    }

    pub fn equals(&self, other: &SmileString) -> bool {
        self.as_bytes() == other.as_bytes()
    }

    pub fn equals_ci(&self, other: &SmileString) -> bool {
        self.compare_ci(other) == std::cmp::Ordering::Equal
    }

    // ---- concatenation / slicing -----------------------------------------

    pub fn concat(&self, other: &SmileString) -> SmileString {
        let mut buf = Vec::with_capacity(self.len + other.len);
        buf.extend_from_slice(self.as_bytes());
        buf.extend_from_slice(other.as_bytes());
        SmileString::from_bytes(&buf)
    }

    /// `[start, start+length)` substring, clamped to the string bounds.
    pub fn substring(&self, start: usize, length: usize) -> SmileString {
        let bytes = self.as_bytes();
        if start >= bytes.len() {
            return SmileString::empty();
        }
        let end = (start + length).min(bytes.len());
        SmileString::from_bytes(&bytes[start..end])
    }

    /// Python-style `[start, end, step)` slice with negative `step`
    /// supported. Indices may be negative (counted from the
    /// end) exactly as in Python's slice semantics.
    pub fn slice(&self, start: i64, end: i64, step: i64) -> SmileString {
        assert_ne!(step, 0, "slice step must not be zero");
        let bytes = self.as_bytes();
        let n = bytes.len() as i64;
        let clamp = |idx: i64, for_end: bool| -> i64 {
            let idx = if idx < 0 { idx + n } else { idx };
            if step > 0 {
                idx.clamp(0, n)
            } else {
                // For negative steps, the conventional Python clamp allows
                // -1 as "one past the last element going backwards".
                if for_end {
                    idx.clamp(-1, n - 1)
                } else {
                    idx.clamp(-1, n - 1)
                }
            }
        };
        let start = clamp(start, false);
        let end = clamp(end, true);
        let mut out = Vec::new();
        if step > 0 {
            let mut i = start;
            while i < end {
                out.push(bytes[i as usize]);
                i += step;
            }
        } else {
            let mut i = start;
            while i > end {
                if i >= 0 && i < n {
                    out.push(bytes[i as usize]);
                }
                i += step;
            }
        }
        SmileString::from_bytes(&out)
    }

    // ---- search -----------------------------------------------------------

    pub fn index_of(&self, needle: &SmileString, from: usize) -> Option<usize> {
        let h = self.as_bytes();
        let n = needle.as_bytes();
        if n.is_empty() {
            return Some(from.min(h.len()));
        }
        if from >= h.len() {
            return None;
        }
        h[from..]
            .windows(n.len())
            .position(|w| w == n)
            .map(|p| p + from)
    }

    pub fn last_index_of(&self, needle: &SmileString) -> Option<usize> {
        let h = self.as_bytes();
        let n = needle.as_bytes();
        if n.is_empty() {
            return Some(h.len());
        }
        h.windows(n.len()).rposition(|w| w == n)
    }

    pub fn contains(&self, needle: &SmileString) -> bool {
        self.index_of(needle, 0).is_some()
    }

    pub fn contains_any_of(&self, set: &[u8]) -> bool {
        self.as_bytes().iter().any(|b| set.contains(b))
    }

    pub fn starts_with(&self, prefix: &SmileString, case_insensitive: bool) -> bool {
        if case_insensitive {
            self.to_string_lossy()
                .to_ascii_lowercase()
                .starts_with(&prefix.to_string_lossy().to_ascii_lowercase())
        } else {
            self.as_bytes().starts_with(prefix.as_bytes())
        }
    }

    pub fn ends_with(&self, suffix: &SmileString, case_insensitive: bool) -> bool {
        if case_insensitive {
            self.to_string_lossy()
                .to_ascii_lowercase()
                .ends_with(&suffix.to_string_lossy().to_ascii_lowercase())
        } else {
            self.as_bytes().ends_with(suffix.as_bytes())
        }
    }

    // ---- padding / trimming ------------------------------------------------

    pub fn pad_start(&self, width: usize, pad: u8) -> SmileString {
        if self.len >= width {
            return self.clone();
        }
        let mut buf = vec![pad; width - self.len];
        buf.extend_from_slice(self.as_bytes());
        SmileString::from_bytes(&buf)
    }

    pub fn pad_end(&self, width: usize, pad: u8) -> SmileString {
        if self.len >= width {
            return self.clone();
        }
        let mut buf = self.as_bytes().to_vec();
        buf.extend(std::iter::repeat(pad).take(width - self.len));
        SmileString::from_bytes(&buf)
    }

    pub fn trim(&self) -> SmileString {
        let bytes = self.as_bytes();
        let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
        let end = bytes
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map(|p| p + 1)
            .unwrap_or(start);
        SmileString::from_bytes(&bytes[start..end])
    }

    // ---- reverse / repeat ---------------------------------------------------

    /// Reverse raw bytes. `reverse(reverse(s)) == s`.
    pub fn reverse_bytes(&self) -> SmileString {
        let mut buf = self.as_bytes().to_vec();
        buf.reverse();
        SmileString::from_bytes(&buf)
    }

    /// Reverse by code point, so multi-byte UTF-8 sequences aren't
    /// scrambled.
    pub fn reverse_utf8(&self) -> SmileString {
        let s: String = self.chars().into_iter().rev().collect();
        SmileString::from_str(&s)
    }

    pub fn repeat(&self, n: usize) -> SmileString {
        SmileString::from_bytes(&self.as_bytes().repeat(n))
    }

    // ---- hashing --------------------------------------------------------

    /// FNV-1a 32-bit hash, consistent with [`SmileString::equals`].
    pub fn hash32(&self) -> u32 {
        let mut h: u32 = 0x811c9dc5;
        for &b in self.as_bytes() {
            h ^= b as u32;
            h = h.wrapping_mul(0x01000193);
        }
        h
    }

    /// FNV-1a 64-bit hash.
    pub fn hash64(&self) -> u64 {
        let mut h: u64 = 0xcbf29ce484222325;
        for &b in self.as_bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        h
    }

    // ---- split / replace --------------------------------------------------

    pub fn split(&self, sep: &SmileString, remove_empty: bool) -> Vec<SmileString> {
        let haystack = self.to_string_lossy();
        let needle = sep.to_string_lossy();
        let parts: Vec<&str> = if needle.is_empty() {
            haystack.split("").filter(|p| !p.is_empty()).collect()
        } else {
            haystack.split(needle.as_str()).collect()
        };
        parts
            .into_iter()
            .filter(|p| !remove_empty || !p.is_empty())
            .map(SmileString::from_str)
            .collect()
    }

    pub fn replace(&self, from: &SmileString, to: &SmileString, limit: Option<usize>) -> SmileString {
        let haystack = self.to_string_lossy();
        let from_s = from.to_string_lossy();
        let to_s = to.to_string_lossy();
        if from_s.is_empty() {
            return self.clone();
        }
        let result = match limit {
            None => haystack.replace(&from_s, &to_s),
            Some(n) => haystack.replacen(&from_s, &to_s, n),
        };
        SmileString::from_str(&result)
    }

    // ---- case mapping / normalization --------------------------------------

    pub fn to_lower(&self) -> SmileString {
        SmileString::from_str(&self.to_string_lossy().chars().map(unicode::to_lower).collect::<String>())
    }

    pub fn to_upper(&self) -> SmileString {
        SmileString::from_str(&self.to_string_lossy().chars().map(unicode::to_upper).collect::<String>())
    }

    pub fn to_title(&self) -> SmileString {
        let s = self.to_string_lossy();
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if c.is_whitespace() {
                at_word_start = true;
                out.push(c);
            } else if at_word_start {
                out.push(unicode::to_title(c));
                at_word_start = false;
            } else {
                out.push(unicode::to_lower(c));
            }
        }
        SmileString::from_str(&out)
    }

    pub fn fold(&self) -> SmileString {
        SmileString::from_str(&unicode::fold(&self.to_string_lossy()))
    }

    pub fn normalize_nfc(&self) -> SmileString {
        SmileString::from_str(&unicode::normalize_nfc(&self.to_string_lossy()))
    }

    // ---- wildcard match -----------------------------------------------------

    pub fn wildcard_match(&self, pattern: &SmileString, opts: WildcardOptions) -> bool {
        unicode::wildcard_match(&pattern.to_string_lossy(), &self.to_string_lossy(), opts)
    }

    // ---- format (printf subset) ---------------------------------------------

    /// `%s %S %d %u %x %X %c` printf-style formatting. `%s`
    /// consumes a string argument, `%S` an uppercased string, `%d`/`%u` a
    /// signed/unsigned integer, `%x`/`%X` lower/uppercase hex, `%c` a single
    /// character (from a codepoint argument).
    pub fn format(template: &str, args: &[FormatArg]) -> SmileString {
        let mut out = String::new();
        let mut arg_iter = args.iter();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some('s') => {
                    if let Some(FormatArg::Str(s)) = arg_iter.next() {
                        out.push_str(s);
                    }
                }
                Some('S') => {
                    if let Some(FormatArg::Str(s)) = arg_iter.next() {
                        out.push_str(&s.to_uppercase());
                    }
                }
                Some('d') => {
                    if let Some(FormatArg::Int(i)) = arg_iter.next() {
                        out.push_str(&i.to_string());
                    }
                }
                Some('u') => {
                    if let Some(FormatArg::Int(i)) = arg_iter.next() {
                        out.push_str(&(*i as u64).to_string());
                    }
                }
                Some('x') => {
                    if let Some(FormatArg::Int(i)) = arg_iter.next() {
                        out.push_str(&format!("{:x}", *i as u64));
                    }
                }
                Some('X') => {
                    if let Some(FormatArg::Int(i)) = arg_iter.next() {
                        out.push_str(&format!("{:X}", *i as u64));
                    }
                }
                Some('c') => {
                    if let Some(FormatArg::Int(i)) = arg_iter.next() {
                        if let Some(ch) = char::from_u32(*i as u32) {
                            out.push(ch);
                        }
                    }
                }
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        SmileString::from_str(&out)
    }

    // ---- escaping / encoding ------------------------------------------------

    /// Add C-style backslash escapes for control characters, backslash, and
    /// double quote.
    pub fn c_escape_add(&self) -> SmileString {
        let mut out = String::new();
        for c in self.to_string_lossy().chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
                c => out.push(c),
            }
        }
        SmileString::from_str(&out)
    }

    /// Strip C-style backslash escapes, inverse of [`c_escape_add`].
    pub fn c_escape_strip(&self) -> SmileString {
        let s = self.to_string_lossy();
        let mut out = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('x') => {
                    let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                    if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                        out.push(byte as char);
                    }
                }
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        SmileString::from_str(&out)
    }

    pub fn html_encode(&self) -> SmileString {
        let mut out = String::new();
        for c in self.to_string_lossy().chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                c => out.push(c),
            }
        }
        SmileString::from_str(&out)
    }

    pub fn html_decode(&self) -> SmileString {
        let s = self.to_string_lossy();
        let s = s
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");
        SmileString::from_str(&s)
    }

    pub fn url_encode(&self) -> SmileString {
        let mut out = String::new();
        for b in self.as_bytes() {
            let c = *b as char;
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                out.push(c);
            } else {
                out.push_str(&format!("%{:02X}", b));
            }
        }
        SmileString::from_str(&out)
    }

    pub fn url_decode(&self) -> SmileString {
        let bytes = self.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                if let Ok(byte) =
                u8::from_str_radix(&String::from_utf8_lossy(&bytes[i + 1..i + 3]), 16)
                {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
            if bytes[i] == b'+' {
                out.push(b' ');
            } else {
                out.push(bytes[i]);
            }
            i += 1;
        }
        SmileString::from_bytes(&out)
    }

    pub fn rot13(&self) -> SmileString {
        let out: String = self
            .to_string_lossy()
            .chars()
            .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
            c => c,
        })
            .collect();
        SmileString::from_str(&out)
    }

    /// Escape characters with special meaning in a regular-expression
    /// pattern, so arbitrary text can be embedded as a literal.
    pub fn regex_escape(&self) -> SmileString {
        const SPECIAL: &str = r".^$*+?[]{}|\";
        let mut out = String::new();
        for c in self.to_string_lossy().chars() {
            if SPECIAL.contains(c) {
                out.push('\\');
            }
            out.push(c);
        }
        SmileString::from_str(&out)
    }

    /// Join a list of strings into an English prose list: "a, b, and c"
    ///. Two items join with "and" and no comma; zero or one
    /// items degenerate naturally.
    pub fn join_english(items: &[SmileString]) -> SmileString {
        let strs: Vec<String> = items.iter().map(|s| s.to_string_lossy()).collect();
        let joined = match strs.len() {
            0 => String::new(),
            1 => strs[0].clone(),
            2 => format!("{} and {}", strs[0], strs[1]),
            _ => {
                let (last, rest) = strs.split_last().unwrap();
                format!("{}, and {}", rest.join(", "), last)
            }
        };
        SmileString::from_str(&joined)
    }
}

/// A single formatted argument for [`SmileString::format`].
pub enum FormatArg {
    Str(String),
    Int(i64),
}

impl fmt::Debug for SmileString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SmileString({:?})", self.to_string_lossy())
    }
}

impl PartialEq for SmileString {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
impl Eq for SmileString {}

impl From<&str> for SmileString {
    fn from(s: &str) -> Self {
        SmileString::from_str(s)
    }
}

impl From<String> for SmileString {
    fn from(s: String) -> Self {
        SmileString::from_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_at_matches_raw_bytes_and_trailing_nul_is_present() {
        let s = SmileString::from_str("abc");
        assert_eq!(s.byte_at(0), b'a');
        assert_eq!(s.data[s.length()], 0);
    }

    #[test]
    fn reverse_bytes_round_trips() {
        let s = SmileString::from_str("hello");
        assert_eq!(s.reverse_bytes().reverse_bytes(), s);
    }

    #[test]
    fn reverse_utf8_preserves_codepoints() {
        let s = SmileString::from_str("ab€cd");
        let rev = s.reverse_utf8();
        assert_eq!(rev.to_string_lossy(), "dc€ba");
        assert_eq!(rev.reverse_utf8(), s);
    }

    #[test]
    fn compare_is_anti_symmetric_and_reflexive() {
        let a = SmileString::from_str("abc");
        let b = SmileString::from_str("abd");
        assert_eq!(a.compare(&a), std::cmp::Ordering::Equal);
        assert_eq!(a.compare(&b).reverse(), b.compare(&a));
    }

    #[test]
    fn slice_supports_negative_step() {
        let s = SmileString::from_str("abcdef");
        let rev = s.slice(-1, -7, -1);
        assert_eq!(rev.to_string_lossy(), "fedcba");
    }

    #[test]
    fn slice_handles_simple_forward_range() {
        let s = SmileString::from_str("abcdef");
        assert_eq!(s.slice(1, 4, 1).to_string_lossy(), "bcd");
    }

    #[test]
    fn split_and_remove_empty() {
        let s = SmileString::from_str("a,,b,c");
        let sep = SmileString::from_str(",");
        let parts: Vec<String> = s.split(&sep, true).iter().map(|p| p.to_string_lossy()).collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_respects_limit() {
        let s = SmileString::from_str("a-a-a");
        let from = SmileString::from_str("a");
        let to = SmileString::from_str("X");
        assert_eq!(s.replace(&from, &to, Some(1)).to_string_lossy(), "X-a-a");
        assert_eq!(s.replace(&from, &to, None).to_string_lossy(), "X-X-X");
    }

    #[test]
    fn format_subset() {
        let out = SmileString::format(
            "%s is %d years (0x%x)",
            &[
                FormatArg::Str("Ann".to_string()),
                FormatArg::Int(30),
                FormatArg::Int(30),
            ],
        );
        assert_eq!(out.to_string_lossy(), "Ann is 30 years (0x1e)");
    }

    #[test]
    fn join_english_matches_spec_example() {
        let items = vec!["a", "b", "c"].into_iter().map(SmileString::from_str).collect::<Vec<_>>();
        assert_eq!(SmileString::join_english(&items).to_string_lossy(), "a, b, and c");
    }

    #[test]
    fn join_english_two_items_uses_and_only() {
        let items = vec!["a", "b"].into_iter().map(SmileString::from_str).collect::<Vec<_>>();
        assert_eq!(SmileString::join_english(&items).to_string_lossy(), "a and b");
    }

    #[test]
    fn c_escape_round_trips() {
        let s = SmileString::from_str("line1\nline2\t\"quoted\"");
        let escaped = s.c_escape_add();
        assert_eq!(escaped.c_escape_strip(), s);
    }

    #[test]
    fn url_encode_round_trips() {
        let s = SmileString::from_str("a b/c?d");
        assert_eq!(s.url_encode().url_decode(), s);
    }

    #[test]
    fn rot13_is_its_own_inverse() {
        let s = SmileString::from_str("Hello, World!");
        assert_eq!(s.rot13().rot13(), s);
    }

    #[test]
    fn hash_is_consistent_with_equality() {
        let a = SmileString::from_str("same");
        let b = SmileString::from_str("same");
        assert_eq!(a, b);
        assert_eq!(a.hash32(), b.hash32());
        assert_eq!(a.hash64(), b.hash64());
    }

    #[test]
    fn empty_is_shared_singleton_content() {
        let a = SmileString::empty();
        let b = SmileString::from_str("");
        assert_eq!(a, b);
        assert_eq!(a.length(), 0);
    }
}



