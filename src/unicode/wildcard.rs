//! # Wildcard (glob) Matching
//!
//! Implements the `*`/`?` wildcard matcher used by `String.matches` and
//! friends, with three independent options:
//! - `filename_mode`: `*` and `?` do not match a path separator (`/`).
//! - `escape`: a backslash in the pattern escapes the following character,
//! matching it literally instead of as a wildcard.
//! - `case_insensitive`: compares folded code points (delegates to
//! [`super::case::fold`]).
//!
//! The algorithm is the classic two-pointer backtracking glob matcher
//! (pattern pointer + text pointer, with a saved "last star" position to
//! backtrack to), since a regex-engine dependency would be overkill for
//! this small, well-understood grammar.

use super::case::fold;

#[derive(Clone, Copy, Debug, Default)]
pub struct WildcardOptions {
    pub filename_mode: bool,
    pub escape: bool,
    pub case_insensitive: bool,
}

/// Match `text` against `pattern` under the given options.
pub fn wildcard_match(pattern: &str, text: &str, opts: WildcardOptions) -> bool {
    let pat: Vec<char> = expand_pattern(pattern, opts).into_iter().collect();
    let txt: Vec<char> = if opts.case_insensitive {
        fold(text).chars().collect()
    } else {
        text.chars().collect()
    };
    match_from(&pat, &txt, opts)
}

/// A pattern token: a literal char (possibly escaped) or a wildcard marker.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tok {
    Lit(char),
    Star,
    Any,
}

fn expand_pattern(pattern: &str, opts: WildcardOptions) -> Vec<Tok> {
    let mut out = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if opts.escape && c == '\\' {
            if let Some(next) = chars.next() {
                out.push(Tok::Lit(fold_if_needed(next, opts)));
            } else {
                out.push(Tok::Lit('\\'));
            }
        } else if c == '*' {
            out.push(Tok::Star);
        } else if c == '?' {
            out.push(Tok::Any);
        } else {
            out.push(Tok::Lit(fold_if_needed(c, opts)));
        }
    }
    out
}

fn fold_if_needed(c: char, opts: WildcardOptions) -> char {
    if opts.case_insensitive {
        fold(&c.to_string()).chars().next().unwrap_or(c)
    } else {
        c
    }
}

fn match_from(pat: &[Tok], txt: &[char], opts: WildcardOptions) -> bool {
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star_pi, mut star_ti): (Option<usize>, usize) = (None, 0);

    while ti < txt.len() {
        if pi < pat.len() {
            match pat[pi] {
                Tok::Lit(c) if c == txt[ti] => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                Tok::Any if !(opts.filename_mode && txt[ti] == '/') => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                Tok::Star => {
                    star_pi = Some(pi);
                    star_ti = ti;
                    pi += 1;
                    continue;
                }
                _ => {}
            }
        }
        if let Some(spi) = star_pi {
            // Backtrack: let the last `*` consume one more character, unless
            // filename_mode forbids crossing a path separator.
            if opts.filename_mode && txt[star_ti] == '/' {
                return false;
            }
            pi = spi + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }
    while pi < pat.len() && pat[pi] == Tok::Star {
        pi += 1;
    }
    pi == pat.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> WildcardOptions {
        WildcardOptions::default()
    }

    #[test]
    fn star_matches_any_run() {
        assert!(wildcard_match("*.txt", "report.txt", opts));
        assert!(!wildcard_match("*.txt", "report.md", opts));
    }

    #[test]
    fn question_matches_single_char() {
        assert!(wildcard_match("a?c", "abc", opts));
        assert!(!wildcard_match("a?c", "abbc", opts));
    }

    #[test]
    fn filename_mode_blocks_star_crossing_separator() {
        let o = WildcardOptions {
            filename_mode: true,
                .Default::default()
        };
        assert!(!wildcard_match("*.rs", "src/main.rs", o));
        assert!(wildcard_match("*/*.rs", "src/main.rs", o));
    }

    #[test]
    fn escape_makes_star_literal() {
        let o = WildcardOptions {
            escape: true,
                .Default::default()
        };
        assert!(wildcard_match(r"a\*b", "a*b", o));
        assert!(!wildcard_match(r"a\*b", "axb", o));
    }

    #[test]
    fn case_insensitive_folds_both_sides() {
        let o = WildcardOptions {
            case_insensitive: true,
                .Default::default()
        };
        assert!(wildcard_match("HELLO*", "hello world", o));
    }
}



