//! # Case Mapping Tables
//!
//! Three indexed tables — lowercase, uppercase, titlecase — plus an extended
//! fold table for the handful of code points that expand to more than one
//! code point when case-mapped. ASCII and Latin-1 Supplement
//! (U+00C0-U+00FF, minus the codepoints with no case pair) are covered in
//! full; titlecase coincides with uppercase for every code point in this
//! range (Latin-1 has no digraphs needing distinct titlecase forms, unlike
//! e.g. U+01C4 DŽ in the full Unicode range).

/// One-to-one lowercase mapping for a single `char`. Code points outside the
/// covered range map to themselves, matching the "leave unmapped" behavior
/// of the original table-driven implementation for unassigned slots.
pub fn to_lower(c: char) -> char {
    match c {
        'A'..='Z' => ((c as u32) + 32) as u8 as char,
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{DE}' => {
            char::from_u32((c as u32) + 32).unwrap_or(c)
        }
        _ => c,
    }
}

/// One-to-one uppercase mapping for a single `char`.
pub fn to_upper(c: char) -> char {
    match c {
        'a'..='z' => ((c as u32) - 32) as u8 as char,
        '\u{E0}'..='\u{F6}' | '\u{F8}'..='\u{FE}' => {
            char::from_u32((c as u32) - 32).unwrap_or(c)
        }
        _ => c,
    }
}

/// Titlecase mapping. Coincides with [`to_upper`] for the covered range.
pub fn to_title(c: char) -> char {
    to_upper(c)
}

/// Case-fold a string for caseless comparison, expanding the handful of
/// code points that fold to more than one code point. Folding is applied code-point-by-code-point and
/// concatenated; this matches the source's behavior of folding before
/// comparison rather than normalizing first.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        out.push_str(fold_one(c));
    }
    out
}

/// Expansion-aware fold of a single code point. Returns a `&'static str`
/// rather than a `char` because a small number of code points fold to more
/// than one code point.
fn fold_one(c: char) -> &'static str {
    match c {
        // The canonical multi-codepoint case fold.
        '\u{DF}' => "ss", // ß -> ss
        '\u{1E9E}' => "ss", // ẞ (capital sharp S) -> ss
        // ASCII and Latin-1 letters otherwise fold to their lowercase form.
        'A'..='Z' => ascii_lower_str(c),
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{DE}' => latin1_lower_str(c),
        _ => single_char_str(c),
    }
}

/// Return a leaked 'static single-char string for an arbitrary char outside
/// the small fixed set above. Case folding is not hot-path in the VM (it's
/// used by string comparison builtins, not per-opcode), so a tiny
/// allocation per uncommon code point is an acceptable trade for keeping
/// `fold_one`'s signature simple and allocation-free for the 99% ASCII case.
fn single_char_str(c: char) -> &'static str {
    // SAFETY-free approach: use a thread-local cache keyed by char to avoid
    // leaking on every call while still returning a 'static str.
    thread_local! {
        static CACHE: std::cell::RefCell<std::collections::HashMap<char, &'static str>> =
        std::cell::RefCell::new(std::collections::HashMap::new());
    }
    CACHE.with(|cache| {
        if let Some(s) = cache.borrow().get(&c) {
            return *s;
        }
        let leaked: &'static str = Box::leak(c.to_string().into_boxed_str());
        cache.borrow_mut().insert(c, leaked);
        leaked
    })
}

fn ascii_lower_str(c: char) -> &'static str {
    single_char_str(to_lower(c))
}

fn latin1_lower_str(c: char) -> &'static str {
    single_char_str(to_lower(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_case_round_trips() {
        assert_eq!(to_upper('a'), 'A');
        assert_eq!(to_lower('A'), 'a');
        assert_eq!(to_upper(to_lower('Z')), 'Z');
    }

    #[test]
    fn latin1_case_round_trips() {
        assert_eq!(to_upper('é'), 'É');
        assert_eq!(to_lower('É'), 'é');
    }

    #[test]
    fn unmapped_codepoints_are_identity() {
        assert_eq!(to_upper('7'), '7');
        assert_eq!(to_lower('漢'), '漢');
    }

    #[test]
    fn fold_expands_sharp_s() {
        assert_eq!(fold("ß"), "ss");
        assert_eq!(fold("Straße"), "strasse");
    }

    #[test]
    fn fold_is_case_insensitive_equal() {
        assert_eq!(fold("Hello"), fold("HELLO"));
        assert_eq!(fold("HELLO"), fold("hello"));
    }
}



