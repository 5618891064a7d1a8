//! LIKE pattern conversion. `%` becomes `.*` and `_` becomes `.`; every
//! regex metacharacter in the literal portion is escaped, and the result is
//! anchored unless the pattern already starts or ends with `%`. Regexes are
//! produced only as output here; input recognition is token-driven.

/// Convert a LIKE pattern into a `$regex` source string. A backslash
/// escapes the following wildcard, matching the dialect's default escape.
pub(crate) fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('%') {
        out.push('^');
    }

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped @ ('%' | '_')) => push_escaped(&mut out, escaped),
                Some(other) => {
                    push_escaped(&mut out, '\\');
                    push_escaped(&mut out, other);
                }
                None => push_escaped(&mut out, '\\'),
            },
            other => push_escaped(&mut out, other),
        }
    }

    if !pattern.ends_with('%') {
        out.push('$');
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    if matches!(
        c,
        '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' | '/'
    ) {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod test {
    use super::like_to_regex;

    #[test]
    fn literal_pattern_is_fully_anchored_and_escaped() {
        assert_eq!(like_to_regex("a.b"), r"^a\.b$");
    }

    #[test]
    fn percent_wildcards() {
        assert_eq!(like_to_regex("abc%"), "^abc");
        assert_eq!(like_to_regex("%abc"), "abc$");
        assert_eq!(like_to_regex("%abc%"), "abc");
        assert_eq!(like_to_regex("a%b"), "^a.*b$");
    }

    #[test]
    fn underscore_wildcard() {
        assert_eq!(like_to_regex("a_c"), "^a.c$");
    }

    #[test]
    fn metacharacters_escaped_inside_anchored_pattern() {
        assert_eq!(like_to_regex("%(a+b)%"), r"\(a\+b\)");
    }

    #[test]
    fn backslash_escapes_wildcards() {
        assert_eq!(like_to_regex(r"100\%"), r"^100%$");
        assert_eq!(like_to_regex(r"a\_b"), "^a_b$");
    }
}
