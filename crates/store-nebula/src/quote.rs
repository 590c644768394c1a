//! nGQL string literal escaping.
//!
//! Every key and value that reaches an nGQL statement, single-item or
//! batched, goes through [`quote`].

/// Renders `value` as a double-quoted nGQL string literal.
///
/// Backslash, double quote, newline, carriage return and tab are
/// backslash-escaped; everything else is emitted verbatim.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use stateplug_store::testutil::{Token, tokenize};

    use super::*;

    #[rstest]
    #[case::plain("user:1", r#""user:1""#)]
    #[case::empty("", r#""""#)]
    #[case::double_quote(r#"say "hi""#, r#""say \"hi\"""#)]
    #[case::backslash(r"C:\tmp", r#""C:\\tmp""#)]
    #[case::control("a\nb\rc\td", r#""a\nb\rc\td""#)]
    #[case::single_quote("it's", r#""it's""#)]
    fn test_quote(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote(input), expected);
    }

    proptest! {
        /// The statement lexer recovers exactly what was quoted.
        #[test]
        fn quote_round_trips_through_lexer(value in "(?s).*") {
            let tokens = tokenize(&quote(&value)).expect("quoted literal should lex");
            prop_assert_eq!(tokens, vec![Token::Str(value)]);
        }
    }
}
